//! Deterministic string hashing
//!
//! Maps text to a stable value in `[0, 1)`. Used to place records without a
//! real coordinate at a repeatable point near their region centroid, so the
//! hash must be bit-identical on every platform for the same input.

/// Fold `text` into a 32-bit signed polynomial hash (`h * 31 + unit`).
///
/// Iterates UTF-16 code units so that values match hashes already
/// computed by browser clients for the same strings.
pub fn polynomial_hash(text: &str) -> i32 {
    text.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(i32::from(unit))
    })
}

/// Hash `text` to a value in `[0, 1)` with three decimal digits of resolution.
pub fn unit_hash(text: &str) -> f64 {
    // Widen before abs so i32::MIN does not overflow
    let magnitude = i64::from(polynomial_hash(text)).abs();
    (magnitude % 1000) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_string_hashes_to_zero() {
        assert_eq!(polynomial_hash(""), 0);
        assert_eq!(unit_hash(""), 0.0);
    }

    #[test]
    fn test_polynomial_hash_known_values() {
        // "a" = 97, "ab" = 97 * 31 + 98
        assert_eq!(polynomial_hash("a"), 97);
        assert_eq!(polynomial_hash("ab"), 3105);
        assert_eq!(polynomial_hash("hello"), 99_162_322);
    }

    #[test]
    fn test_polynomial_hash_wraps_to_32_bits() {
        let long = "the quick brown fox jumps over the lazy dog";
        let expected = long
            .encode_utf16()
            .fold(0i64, |h, c| ((h * 31 + i64::from(c)) as i32) as i64);
        assert_eq!(i64::from(polynomial_hash(long)), expected);
    }

    #[test]
    fn test_unit_hash_uses_absolute_value() {
        // "hello" = 99162322 -> 322
        assert_eq!(unit_hash("hello"), 0.322);
        let negative = (0..64)
            .map(|i| format!("seed-{i}"))
            .find(|s| polynomial_hash(s) < 0)
            .expect("some seed hashes negative");
        let value = unit_hash(&negative);
        assert!((0.0..1.0).contains(&value));
        assert_eq!(
            value,
            (i64::from(polynomial_hash(&negative)).abs() % 1000) as f64 / 1000.0
        );
    }

    #[test]
    fn test_hangul_hashes_by_code_unit() {
        // 일 = U+C77C, single UTF-16 unit
        assert_eq!(polynomial_hash("일"), 0xC77C);
        assert_eq!(polynomial_hash("일원동"), {
            let units: Vec<i32> = "일원동".encode_utf16().map(i32::from).collect();
            units
                .iter()
                .fold(0i32, |h, u| h.wrapping_mul(31).wrapping_add(*u))
        });
    }

    proptest! {
        #[test]
        fn prop_unit_hash_in_range(s in ".*") {
            let v = unit_hash(&s);
            prop_assert!((0.0..1.0).contains(&v));
        }

        #[test]
        fn prop_unit_hash_is_deterministic(s in ".*") {
            prop_assert_eq!(unit_hash(&s), unit_hash(&s.clone()));
        }
    }
}
