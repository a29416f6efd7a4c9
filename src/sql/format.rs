//! Literal formatting for generated SQL.
//!
//! Values are embedded as text; string literals only get their single quotes
//! doubled. Nothing here defends against hostile input.

use serde_json::Value;

/// Quote a string as a SQL literal, doubling embedded single quotes
pub fn quote_string(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

/// Render a scalar JSON value as a SQL literal.
///
/// Strings are quoted, numbers and booleans are emitted bare; null and
/// compound values have no literal form.
pub fn format_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(quote_string(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Read a value as a finite number; numeric strings are accepted
pub fn parse_finite(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

pub fn format_number(n: f64) -> String {
    format!("{}", n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_string_doubles_quotes() {
        assert_eq!(quote_string("O'Brien"), "'O''Brien'");
        assert_eq!(quote_string(""), "''");
    }

    #[test]
    fn test_format_value_by_type() {
        assert_eq!(format_value(&json!("EU")), Some("'EU'".to_string()));
        assert_eq!(format_value(&json!(42)), Some("42".to_string()));
        assert_eq!(format_value(&json!(true)), Some("TRUE".to_string()));
        assert_eq!(format_value(&Value::Null), None);
        assert_eq!(format_value(&json!(["a"])), None);
    }

    #[test]
    fn test_parse_finite() {
        assert_eq!(parse_finite(&json!(" 10.5 ")), Some(10.5));
        assert_eq!(parse_finite(&json!(3)), Some(3.0));
        assert_eq!(parse_finite(&json!("abc")), None);
        assert_eq!(parse_finite(&json!("")), None);
        assert_eq!(parse_finite(&json!("inf")), None);
        assert_eq!(parse_finite(&json!("NaN")), None);
    }

    #[test]
    fn test_format_number_drops_trailing_zero() {
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(2.5), "2.5");
    }
}
