//! Forgiving field deserializers for generated dashboard definitions.
//!
//! A malformed optional field falls back to its default instead of failing
//! the whole dashboard.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `null` reads as the type's default
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Row limit from an integer, a whole float or a numeric string. Anything
/// else, negative or fractional, means no limit.
pub(crate) fn row_limit<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(limit_from_value))
}

fn limit_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(whole_non_negative)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<u64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(whole_non_negative))
        }
        _ => None,
    }
}

fn whole_non_negative(f: f64) -> Option<u64> {
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_limit_shapes() {
        assert_eq!(limit_from_value(&json!(10)), Some(10));
        assert_eq!(limit_from_value(&json!(10.0)), Some(10));
        assert_eq!(limit_from_value(&json!(" 25 ")), Some(25));
        assert_eq!(limit_from_value(&json!("5.0")), Some(5));
        assert_eq!(limit_from_value(&json!(-3)), None);
        assert_eq!(limit_from_value(&json!(2.5)), None);
        assert_eq!(limit_from_value(&json!("many")), None);
        assert_eq!(limit_from_value(&json!(true)), None);
    }
}
