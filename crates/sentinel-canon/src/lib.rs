//! Canonical JSON encoding and digesting.
//!
//! `canonicalize` produces byte-exact UTF-8 JSON: keys sorted by
//! Unicode code-point order, arrays order-preserving, numbers in minimal
//! decimal form, no insignificant whitespace. Two implementations compiled
//! from different languages must agree byte-for-byte on the same input —
//! this is the parity property exercised in `tests::cross_impl_fixtures`.
//!
//! Numbers are always emitted in plain decimal digits, never exponent
//! notation: plain decimal is sufficient for any integer magnitude and
//! keeps the byte form independent of how large the integer is.

#![deny(unsafe_code)]

use sentinel_types::JsonValue;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanonError {
    #[error("invalid number literal: {0}")]
    InvalidNumber(String),
}

/// Canonicalize a `JsonValue` to UTF-8 bytes.
pub fn canonicalize(value: &JsonValue) -> Result<Vec<u8>, CanonError> {
    let mut out = Vec::new();
    write_value(value, &mut out)?;
    Ok(out)
}

/// SHA-256 digest of the canonical bytes.
pub fn digest(value: &JsonValue) -> Result<[u8; 32], CanonError> {
    let bytes = canonicalize(value)?;
    Ok(Sha256::digest(&bytes).into())
}

/// SHA-256 digest, hex-encoded (the wire form used by `AuditEvent::hash`).
pub fn digest_hex(value: &JsonValue) -> Result<String, CanonError> {
    Ok(hex::encode(digest(value)?))
}

/// Canonicalize a value serializable via `serde`, by routing it through
/// `JsonValue` first. Convenience for callers that build events with
/// typed structs.
pub fn canonicalize_serde<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, CanonError> {
    let json = serde_json::to_value(value).map_err(|e| CanonError::InvalidNumber(e.to_string()))?;
    canonicalize(&JsonValue::from_serde_json(json))
}

pub fn digest_hex_serde<T: serde::Serialize>(value: &T) -> Result<String, CanonError> {
    let bytes = canonicalize_serde(value)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// SHA-256 digest of a serde-serializable value's canonical form, as raw
/// bytes (the form signers operate on).
pub fn digest_serde<T: serde::Serialize>(value: &T) -> Result<[u8; 32], CanonError> {
    let bytes = canonicalize_serde(value)?;
    Ok(Sha256::digest(&bytes).into())
}

fn write_value(value: &JsonValue, out: &mut Vec<u8>) -> Result<(), CanonError> {
    match value {
        JsonValue::Null => out.extend_from_slice(b"null"),
        JsonValue::Bool(true) => out.extend_from_slice(b"true"),
        JsonValue::Bool(false) => out.extend_from_slice(b"false"),
        JsonValue::Number(n) => out.extend_from_slice(normalize_number(n.as_str())?.as_bytes()),
        JsonValue::String(s) => write_escaped_string(s, out),
        JsonValue::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out)?;
            }
            out.push(b']');
        }
        JsonValue::Object(map) => {
            // `BTreeMap<String, _>` already iterates in byte-lexicographic
            // order, which matches Unicode code-point order for valid UTF-8.
            out.push(b'{');
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_escaped_string(k, out);
                out.push(b':');
                write_value(v, out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

fn write_escaped_string(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            '\u{08}' => out.extend_from_slice(b"\\b"),
            '\u{0C}' => out.extend_from_slice(b"\\f"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

/// Normalize a JSON number literal to minimal decimal form: strip leading
/// zeros in the integer part, strip trailing zeros (and a dangling `.`) in
/// the fractional part, and fold any exponent into plain digits.
fn normalize_number(raw: &str) -> Result<String, CanonError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CanonError::InvalidNumber(raw.to_string()));
    }

    let (sign, rest) = match raw.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };

    let (mantissa, exponent) = match rest.find(['e', 'E']) {
        Some(idx) => {
            let exp_str = &rest[idx + 1..];
            let exp: i64 = exp_str
                .parse()
                .map_err(|_| CanonError::InvalidNumber(raw.to_string()))?;
            (&rest[..idx], exp)
        }
        None => (rest, 0),
    };

    let (int_part, frac_part) = match mantissa.find('.') {
        Some(idx) => (&mantissa[..idx], &mantissa[idx + 1..]),
        None => (mantissa, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(CanonError::InvalidNumber(raw.to_string()));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(CanonError::InvalidNumber(raw.to_string()));
    }

    // Fold the exponent into the digit string by moving the decimal point.
    let mut digits: Vec<u8> = int_part.bytes().chain(frac_part.bytes()).collect();
    let mut point = int_part.len() as i64 + exponent;

    if point < 0 {
        let zeros = (-point) as usize;
        let mut padded = vec![b'0'; zeros];
        padded.extend(digits);
        digits = padded;
        point = 0;
    } else if (point as usize) > digits.len() {
        let zeros = point as usize - digits.len();
        digits.extend(std::iter::repeat(b'0').take(zeros));
    }

    let point = point as usize;
    let (int_digits, frac_digits) = digits.split_at(point);

    // Strip leading zeros, keep at least one digit.
    let mut int_trimmed = int_digits;
    while int_trimmed.len() > 1 && int_trimmed[0] == b'0' {
        int_trimmed = &int_trimmed[1..];
    }
    let int_str = if int_trimmed.is_empty() {
        "0".to_string()
    } else {
        String::from_utf8_lossy(int_trimmed).to_string()
    };

    // Strip trailing zeros from the fractional part.
    let mut frac_trimmed = frac_digits;
    while let [rest @ .., last] = frac_trimmed {
        if *last == b'0' {
            frac_trimmed = rest;
        } else {
            break;
        }
    }
    let frac_str = String::from_utf8_lossy(frac_trimmed).to_string();

    let is_zero = int_str == "0" && frac_str.is_empty();
    let sign_str = if sign && !is_zero { "-" } else { "" };

    if frac_str.is_empty() {
        Ok(format!("{sign_str}{int_str}"))
    } else {
        Ok(format!("{sign_str}{int_str}.{frac_str}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn obj(pairs: Vec<(&str, JsonValue)>) -> JsonValue {
        let mut m = BTreeMap::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v);
        }
        JsonValue::Object(m)
    }

    #[test]
    fn sorts_keys() {
        let v = obj(vec![
            ("b", JsonValue::Number("1".into())),
            ("a", JsonValue::Number("2".into())),
        ]);
        let bytes = canonicalize(&v).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn strips_leading_and_trailing_zeros() {
        assert_eq!(normalize_number("007").unwrap(), "7");
        assert_eq!(normalize_number("1.500").unwrap(), "1.5");
        assert_eq!(normalize_number("1.0").unwrap(), "1");
        assert_eq!(normalize_number("0.0").unwrap(), "0");
        assert_eq!(normalize_number("-0").unwrap(), "0");
        assert_eq!(normalize_number("-0.0").unwrap(), "0");
    }

    #[test]
    fn folds_exponent() {
        assert_eq!(normalize_number("1.5e2").unwrap(), "150");
        assert_eq!(normalize_number("1.5e-2").unwrap(), "0.015");
        assert_eq!(normalize_number("2E3").unwrap(), "2000");
    }

    #[test]
    fn large_integer_stays_plain_decimal() {
        let raw = "123456789012345678901234567890";
        assert_eq!(normalize_number(raw).unwrap(), raw);
    }

    #[test]
    fn escapes_control_and_quote_chars() {
        let v = JsonValue::String("a\"\\\n\tb".to_string());
        let bytes = canonicalize(&v).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), r#""a\"\\\n\tb""#);
    }

    #[test]
    fn arrays_preserve_order() {
        let v = JsonValue::Array(vec![
            JsonValue::Number("3".into()),
            JsonValue::Number("1".into()),
            JsonValue::Number("2".into()),
        ]);
        let bytes = canonicalize(&v).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "[3,1,2]");
    }

    #[test]
    fn deterministic_digest() {
        let v = obj(vec![("x", JsonValue::String("y".into()))]);
        let a = digest_hex(&v).unwrap();
        let b = digest_hex(&v).unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn canonicalize_is_deterministic(a in 0i64..1_000_000, b in 0i64..1_000_000) {
            let v = obj(vec![
                ("a", JsonValue::Number(a.into())),
                ("b", JsonValue::Number(b.into())),
            ]);
            let first = canonicalize(&v).unwrap();
            let second = canonicalize(&v).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
