//! Error types for the fetch and parse layers
//!
//! These stay internal to the pipeline: the orchestrator collapses every
//! variant into its fallback policy, so callers of
//! [`crate::pipeline::RealtorPipeline::fetch_region_data`] never see them.

use thiserror::Error;

/// HTTP statuses that are retried with backoff
pub const RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Terminal outcome of a fetch after the retry policy is exhausted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("upstream server error {status} after {attempts} attempt(s)")]
    Server { status: u16, attempts: u32 },

    #[error("upstream rejected request with status {status}")]
    Status { status: u16 },

    #[error("request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("transport error after {attempts} attempt(s): {message}")]
    Transport { message: String, attempts: u32 },

    #[error("upstream returned an empty body")]
    EmptyBody,
}

impl FetchError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Server { .. } | Self::Timeout { .. } | Self::Transport { .. }
        )
    }

    /// HTTP status to report to a proxied client
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Server { status, .. } | Self::Status { status } => *status,
            Self::Timeout { .. } => 504,
            Self::Transport { .. } | Self::EmptyBody => 500,
        }
    }
}

/// Structured payload could not be read or reported failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    #[error("malformed XML payload: {0}")]
    Xml(String),

    #[error("malformed JSON payload: {0}")]
    Json(String),

    #[error("payload has no response header")]
    MissingHeader,

    #[error("upstream result code {code}: {message}")]
    ResultCode { code: String, message: String },
}

impl From<serde_json::Error> for PayloadError {
    fn from(error: serde_json::Error) -> Self {
        PayloadError::Json(error.to_string())
    }
}

impl From<quick_xml::Error> for PayloadError {
    fn from(error: quick_xml::Error) -> Self {
        PayloadError::Xml(error.to_string())
    }
}

/// Any failure on the way from region name to records
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("unsupported region: {0}")]
    UnknownRegion(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::Server {
            status: 503,
            attempts: 1
        }
        .is_retryable());
        assert!(FetchError::Timeout { attempts: 1 }.is_retryable());
        assert!(FetchError::Transport {
            message: "reset".into(),
            attempts: 1
        }
        .is_retryable());
        assert!(!FetchError::Status { status: 404 }.is_retryable());
        assert!(!FetchError::EmptyBody.is_retryable());
    }

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            FetchError::Server {
                status: 502,
                attempts: 3
            }
            .status_code(),
            502
        );
        assert_eq!(FetchError::Status { status: 401 }.status_code(), 401);
        assert_eq!(FetchError::Timeout { attempts: 3 }.status_code(), 504);
        assert_eq!(FetchError::EmptyBody.status_code(), 500);
    }

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::from(PayloadError::ResultCode {
            code: "30".into(),
            message: "SERVICE KEY IS NOT REGISTERED ERROR.".into(),
        });
        assert_eq!(
            err.to_string(),
            "upstream result code 30: SERVICE KEY IS NOT REGISTERED ERROR."
        );
        assert_eq!(
            PipelineError::UnknownRegion("해운대구".into()).to_string(),
            "unsupported region: 해운대구"
        );
    }
}
