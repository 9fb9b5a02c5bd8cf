//! Canonical, order-preserving value text.
//!
//! Index keys are compared as strings, so every scalar kind is rendered such
//! that string order equals value order within the kind.

use crate::{key::KEY_MAX_CHAR, model::KindTag};
use serde_json::{Number, Value};

/// Widest decimal magnitude an `i64` can hold.
pub const MAX_INT_DIGITS: usize = 19;

/// Widest decimal magnitude a `u64` can hold.
pub const MAX_UINT_DIGITS: usize = 20;

///
/// CanonicalError
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CanonicalError {
    KindMismatch {
        expected: KindTag,
        found: &'static str,
    },
    IntegerOverflow {
        digits: usize,
    },
    SentinelText,
}

/// Render `value` as the canonical text of `kind`.
pub fn canonical_text(kind: KindTag, value: &Value) -> Result<String, CanonicalError> {
    let mismatch = || CanonicalError::KindMismatch {
        expected: kind,
        found: value_kind(value),
    };

    match (kind, value) {
        (KindTag::Bool, Value::Bool(b)) => Ok(b.to_string()),
        // KEY_MAX_CHAR closes every scan range, so no key text may hold it
        (KindTag::Text, Value::String(s)) if s.contains(KEY_MAX_CHAR) => {
            Err(CanonicalError::SentinelText)
        }
        (KindTag::Text, Value::String(s)) => Ok(s.clone()),
        (KindTag::Int, Value::Number(n)) => int_text(n).ok_or_else(mismatch)?,
        (KindTag::Uint, Value::Number(n)) => uint_text(n).ok_or_else(mismatch)?,
        (KindTag::Float, Value::Number(n)) => n.as_f64().map(encode_f64).ok_or_else(mismatch),
        _ => Err(mismatch()),
    }
}

/// Name of a JSON value's structural kind, for error messages.
#[must_use]
pub const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// None means the number is not an integer at all
fn int_text(n: &Number) -> Option<Result<String, CanonicalError>> {
    if let Some(i) = n.as_i64() {
        return Some(encode_i64(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Err(CanonicalError::IntegerOverflow {
            digits: u.to_string().len(),
        }));
    }

    integral_float(n).map(|f| {
        let digits = whole_digits(f);
        if digits > MAX_INT_DIGITS || f.abs() >= 9.223_372_036_854_776e18 {
            return Err(CanonicalError::IntegerOverflow { digits });
        }
        #[allow(clippy::cast_possible_truncation)]
        let whole = f as i64;
        encode_i64(whole)
    })
}

fn uint_text(n: &Number) -> Option<Result<String, CanonicalError>> {
    if let Some(u) = n.as_u64() {
        return Some(encode_u64(u));
    }
    if n.is_i64() {
        // negative
        return None;
    }

    integral_float(n).filter(|f| *f >= 0.0).map(|f| {
        let digits = whole_digits(f);
        if digits > MAX_UINT_DIGITS || f >= 1.844_674_407_370_955_2e19 {
            return Err(CanonicalError::IntegerOverflow { digits });
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let whole = f as u64;
        encode_u64(whole)
    })
}

fn integral_float(n: &Number) -> Option<f64> {
    n.as_f64().filter(|f| f.is_finite() && f.fract() == 0.0)
}

fn whole_digits(f: f64) -> usize {
    format!("{:.0}", f.abs()).len()
}

/// `p{len:02}{digits}`; rejects magnitudes wider than `max` digits.
fn positive(digits: &str, max: usize) -> Result<String, CanonicalError> {
    if digits.len() > max {
        return Err(CanonicalError::IntegerOverflow {
            digits: digits.len(),
        });
    }

    Ok(format!("p{:02}{digits}", digits.len()))
}

/// `n{99 - len:02}{9's complement}` so larger magnitudes sort first.
fn negative(digits: &str, max: usize) -> Result<String, CanonicalError> {
    if digits.len() > max {
        return Err(CanonicalError::IntegerOverflow {
            digits: digits.len(),
        });
    }

    let complement: String = digits
        .bytes()
        .map(|b| char::from(b'9' - (b - b'0')))
        .collect();

    Ok(format!("n{:02}{complement}", 99 - digits.len()))
}

pub fn encode_i64(i: i64) -> Result<String, CanonicalError> {
    let digits = i.unsigned_abs().to_string();
    if i < 0 {
        negative(&digits, MAX_INT_DIGITS)
    } else {
        positive(&digits, MAX_INT_DIGITS)
    }
}

pub fn encode_u64(u: u64) -> Result<String, CanonicalError> {
    positive(&u.to_string(), MAX_UINT_DIGITS)
}

/// IEEE-754 bits flipped into unsigned order, as 16 hex digits.
#[must_use]
pub fn encode_f64(f: f64) -> String {
    // -0.0 and 0.0 are the same value
    let f = if f == 0.0 { 0.0 } else { f };
    let bits = f.to_bits();
    let ordered = if bits >> 63 == 1 {
        !bits
    } else {
        bits | (1 << 63)
    };

    format!("{ordered:016x}")
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn integers_have_stable_text() {
        assert_eq!(encode_i64(0).unwrap(), "p010");
        assert_eq!(encode_i64(42).unwrap(), "p0242");
        assert_eq!(encode_i64(-5).unwrap(), "n984");
        assert_eq!(encode_i64(-12).unwrap(), "n9787");
        assert_eq!(encode_u64(u64::MAX).unwrap(), "p2018446744073709551615");
    }

    #[test]
    fn values_outside_the_target_integer_are_rejected() {
        assert_eq!(
            canonical_text(KindTag::Int, &json!(u64::MAX)),
            Err(CanonicalError::IntegerOverflow { digits: 20 })
        );
        assert_eq!(
            canonical_text(KindTag::Int, &json!(1e30)),
            Err(CanonicalError::IntegerOverflow { digits: 31 })
        );
        assert_eq!(
            canonical_text(KindTag::Uint, &json!(1e20)),
            Err(CanonicalError::IntegerOverflow { digits: 21 })
        );
        assert_eq!(canonical_text(KindTag::Int, &json!(3.0)), Ok("p013".into()));
    }

    #[test]
    fn kind_mismatches_are_reported() {
        assert_eq!(
            canonical_text(KindTag::Uint, &json!(-1)),
            Err(CanonicalError::KindMismatch {
                expected: KindTag::Uint,
                found: "number"
            })
        );
        assert_eq!(
            canonical_text(KindTag::Int, &json!(1.5)),
            Err(CanonicalError::KindMismatch {
                expected: KindTag::Int,
                found: "number"
            })
        );
        assert_eq!(
            canonical_text(KindTag::Text, &json!(true)),
            Err(CanonicalError::KindMismatch {
                expected: KindTag::Text,
                found: "bool"
            })
        );
        assert!(canonical_text(KindTag::List, &json!("x")).is_err());
    }

    #[test]
    fn text_holding_the_scan_sentinel_is_rejected() {
        for text in ["\u{10FFFF}z", "a\u{10FFFF}", "\u{10FFFF}"] {
            assert_eq!(
                canonical_text(KindTag::Text, &json!(text)),
                Err(CanonicalError::SentinelText),
                "{text:?}"
            );
        }
        assert_eq!(
            canonical_text(KindTag::Text, &json!("\u{10FFFE}")),
            Ok("\u{10FFFE}".into())
        );
    }

    #[test]
    fn negative_zero_is_zero() {
        assert_eq!(encode_f64(-0.0), encode_f64(0.0));
    }

    proptest! {
        #[test]
        fn int_text_preserves_order(a: i64, b: i64) {
            let (ea, eb) = (encode_i64(a).unwrap(), encode_i64(b).unwrap());
            prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        }

        #[test]
        fn uint_text_preserves_order(a: u64, b: u64) {
            let (ea, eb) = (encode_u64(a).unwrap(), encode_u64(b).unwrap());
            prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        }

        #[test]
        fn float_text_preserves_order(a in -1e300f64..1e300, b in -1e300f64..1e300) {
            let (ea, eb) = (encode_f64(a), encode_f64(b));
            prop_assert_eq!(a.partial_cmp(&b).unwrap(), ea.cmp(&eb));
        }
    }
}
