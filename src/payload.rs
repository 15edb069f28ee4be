//! Upstream payload parsing
//!
//! The registry answers in XML; a proxy in front of it may already have
//! converted that to JSON with the same keys. Both are read into a
//! [`serde_json::Value`] tree so the rest of the pipeline handles one shape.
//!
//! XML conversion rules:
//! - an element with only text becomes a string (`<floor>5</floor>` → `"5"`)
//! - an element with children becomes an object
//! - repeated child elements become an array
//! - attributes become `@_name` keys, with element text under `#text`
//!
//! The repeated-element rule is why `items.item` is an object when the
//! upstream returns exactly one record and an array otherwise.

use crate::error::PayloadError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

/// Result codes the upstream uses to signal success
pub const SUCCESS_CODES: [&str; 2] = ["00", "000"];

/// One page of upstream items plus the paging metadata that came with it
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePage {
    pub items: Vec<Value>,
    pub result_message: String,
    pub num_of_rows: Option<u64>,
    pub page_no: Option<u64>,
    pub total_count: Option<u64>,
}

impl ResponsePage {
    /// Whether the upstream holds more records than this page returned
    pub fn is_truncated(&self) -> bool {
        self.total_count
            .is_some_and(|total| total > self.items.len() as u64)
    }
}

/// Parse a raw response body and extract its items.
pub fn parse_response(body: &str) -> Result<ResponsePage, PayloadError> {
    let document = parse_document(body)?;
    extract_page(&document)
}

/// Parse XML or JSON, detected from the first non-whitespace character.
pub fn parse_document(body: &str) -> Result<Value, PayloadError> {
    let trimmed = body.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with('<') {
        xml_to_value(trimmed)
    } else {
        Ok(serde_json::from_str(trimmed)?)
    }
}

/// Whether `code` is one of the accepted success values: `"00"`, `"000"` or numeric `0`.
pub fn is_success_code(code: &Value) -> bool {
    match code {
        Value::String(s) => SUCCESS_CODES.contains(&s.trim()),
        Value::Number(n) => n.as_i64() == Some(0) || n.as_u64() == Some(0),
        Value::Object(map) => map.get("#text").is_some_and(is_success_code),
        _ => false,
    }
}

/// Validate the response header and pull out `response.body.items.item`.
pub fn extract_page(document: &Value) -> Result<ResponsePage, PayloadError> {
    if let Some(gateway) = document.pointer("/OpenAPI_ServiceResponse/cmmMsgHeader") {
        // Gateway-level rejection (bad service key, quota) uses its own envelope
        return Err(PayloadError::ResultCode {
            code: text_of(gateway.get("returnReasonCode")),
            message: text_of(
                gateway
                    .get("returnAuthMsg")
                    .or_else(|| gateway.get("errMsg")),
            ),
        });
    }

    let header = document
        .pointer("/response/header")
        .filter(|h| h.is_object())
        .ok_or(PayloadError::MissingHeader)?;
    let result_message = text_of(header.get("resultMsg"));

    match header.get("resultCode") {
        Some(code) if is_success_code(code) => {}
        other => {
            return Err(PayloadError::ResultCode {
                code: text_of(other),
                message: result_message,
            })
        }
    }

    let body = document.pointer("/response/body");
    let items = body
        .and_then(|b| b.get("items"))
        .and_then(|items| items.get("item"))
        .map(coerce_items)
        .unwrap_or_default();

    Ok(ResponsePage {
        items,
        result_message,
        num_of_rows: body.and_then(|b| count_of(b.get("numOfRows"))),
        page_no: body.and_then(|b| count_of(b.get("pageNo"))),
        total_count: body.and_then(|b| count_of(b.get("totalCount"))),
    })
}

/// Single object → one-element list; drop null, scalar and empty entries.
pub fn coerce_items(item: &Value) -> Vec<Value> {
    let candidates: Vec<&Value> = match item {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    candidates
        .into_iter()
        .filter(|v| v.as_object().is_some_and(|map| !map.is_empty()))
        .cloned()
        .collect()
}

fn text_of(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Object(map)) => text_of(map.get("#text")),
        _ => String::new(),
    }
}

fn count_of(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => count_of(map.get("#text")),
        _ => None,
    }
}

// =============================================================================
// XML → Value
// =============================================================================

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn root() -> Self {
        Self {
            name: String::new(),
            children: Map::new(),
            text: String::new(),
        }
    }

    fn open(start: &BytesStart<'_>) -> Result<Self, PayloadError> {
        let mut children = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| PayloadError::Xml(e.to_string()))?;
            let key = format!("@_{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr.unescape_value()?.into_owned();
            children.insert(key, Value::String(value));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            children,
            text: String::new(),
        })
    }

    fn finish(self) -> (String, Value) {
        let Frame {
            name,
            mut children,
            text,
        } = self;
        if children.is_empty() {
            return (name, Value::String(text));
        }
        if !text.is_empty() {
            children.insert("#text".to_string(), Value::String(text));
        }
        (name, Value::Object(children))
    }

    fn insert_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::Array(existing)) => existing.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }
}

/// Convert an XML document into a JSON-like tree keyed by element names.
pub fn xml_to_value(xml: &str) -> Result<Value, PayloadError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack = vec![Frame::root()];
    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Frame::open(&start)?.finish();
                current(&mut stack)?.insert_child(name, value);
            }
            Event::Text(text) => {
                let unescaped = text.unescape()?;
                current(&mut stack)?.text.push_str(&unescaped);
            }
            Event::CData(data) => {
                let raw = data.into_inner();
                current(&mut stack)?.text.push_str(&String::from_utf8_lossy(&raw));
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(PayloadError::Xml("unbalanced closing tag".to_string()));
                }
                if let Some(frame) = stack.pop() {
                    let (name, value) = frame.finish();
                    current(&mut stack)?.insert_child(name, value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(root), true) if !root.children.is_empty() => Ok(Value::Object(root.children)),
        (Some(_), true) => Err(PayloadError::Xml("document has no root element".to_string())),
        _ => Err(PayloadError::Xml("unexpected end of document".to_string())),
    }
}

fn current(stack: &mut [Frame]) -> Result<&mut Frame, PayloadError> {
    stack
        .last_mut()
        .ok_or_else(|| PayloadError::Xml("element outside document".to_string()))
}
