#![forbid(unsafe_code)]

//! Typed views of store values.
//!
//! The store holds untyped [`Value`]s; attributes are typed. [`FromValue`]
//! bridges the two for bound attributes (`Func::bind`) and for document
//! constants.

use serde_json::Value;

use crate::error::{Result, StoreError};

/// Conversion from a borrowed store value.
pub trait FromValue: Sized {
    /// Human-readable name of the accepted shape, used in `TypeMismatch`.
    const EXPECTED: &'static str;

    fn from_value(value: &Value) -> Option<Self>;

    /// Convert or fail with a `TypeMismatch` naming `context`.
    fn convert(value: &Value, context: &str) -> Result<Self> {
        Self::from_value(value).ok_or_else(|| StoreError::mismatch(context, Self::EXPECTED))
    }
}

impl FromValue for Value {
    const EXPECTED: &'static str = "any value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

/// Strings accept numbers and booleans too, rendered as text; a title bound
/// to a port number should just show the number.
impl FromValue for String {
    const EXPECTED: &'static str = "a string";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(_) | Value::Bool(_) => Some(value.to_string()),
            _ => None,
        }
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "an integer";

    fn from_value(value: &Value) -> Option<Self> {
        // 2^63 is exactly representable; i64::MAX is not.
        const LIMIT: f64 = 9_223_372_036_854_775_808.0;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && (-LIMIT..LIMIT).contains(f))
                .map(|f| f as i64)
        })
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "a number";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "a list";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_array()?.iter().map(T::from_value).collect()
    }
}

/// Render a value as plain text: strings unquoted, `null` empty, everything
/// else as JSON.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_accept_scalars() {
        assert_eq!(String::from_value(&json!("x")), Some("x".into()));
        assert_eq!(String::from_value(&json!(8080)), Some("8080".into()));
        assert_eq!(String::from_value(&json!(true)), Some("true".into()));
        assert_eq!(String::from_value(&json!([1])), None);
    }

    #[test]
    fn integers_accept_integral_floats() {
        assert_eq!(i64::from_value(&json!(3)), Some(3));
        assert_eq!(i64::from_value(&json!(3.0)), Some(3));
        assert_eq!(i64::from_value(&json!(3.5)), None);
        assert_eq!(i64::from_value(&json!("3")), None);
    }

    #[test]
    fn integers_reject_out_of_range_floats() {
        assert_eq!(i64::from_value(&json!(1e300)), None);
        assert_eq!(i64::from_value(&json!(-1e300)), None);
        assert_eq!(i64::from_value(&json!(9.223372036854775808e18)), None);
        assert_eq!(i64::from_value(&json!(-9.223372036854775808e18)), Some(i64::MIN));
        assert_eq!(i64::from_value(&json!(4.0e18)), Some(4_000_000_000_000_000_000));
        let err = i64::convert(&json!(1e300), "port").unwrap_err();
        assert_eq!(err.to_string(), "port: expected an integer");
    }

    #[test]
    fn option_maps_null_to_none() {
        assert_eq!(Option::<String>::from_value(&Value::Null), Some(None));
        assert_eq!(
            Option::<String>::from_value(&json!("tip")),
            Some(Some("tip".into()))
        );
        assert_eq!(Option::<bool>::from_value(&json!("no")), None);
    }

    #[test]
    fn vec_requires_every_element() {
        assert_eq!(Vec::<i64>::from_value(&json!([1, 2])), Some(vec![1, 2]));
        assert_eq!(Vec::<i64>::from_value(&json!([1, "x"])), None);
    }

    #[test]
    fn convert_reports_context() {
        let err = bool::convert(&json!(1), "visible").unwrap_err();
        assert_eq!(err.to_string(), "visible: expected a boolean");
    }

    #[test]
    fn display_value_unquotes_strings() {
        assert_eq!(display_value(&json!("a")), "a");
        assert_eq!(display_value(&json!(1.5)), "1.5");
        assert_eq!(display_value(&Value::Null), "");
    }
}
