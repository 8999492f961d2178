//! Helpers for checking loosely-typed JSON request bodies.
//!
//! Handlers receive `serde_json::Value` so that every violated field can be
//! reported at once instead of failing on the first deserialization error.
//! Numeric fields accept either JSON numbers or numeric strings, and several
//! fields have legacy aliases (`user_id`, `procent`, ...).

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::db::models::Percentage;
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::i18n;

pub type JsonObject = Map<String, Value>;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|e| panic!("email regex: {e}"))
    })
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\+[1-9]\d{1,14}$").unwrap_or_else(|e| panic!("phone regex: {e}"))
    })
}

pub fn is_valid_email(value: &str) -> bool {
    email_regex().is_match(value.trim())
}

/// `+` followed by the country code and number, 2 to 15 digits in total.
pub fn is_valid_phone(value: &str) -> bool {
    phone_regex().is_match(value.trim())
}

/// The request body as a JSON object, or a validation error on `body`.
pub fn as_object(body: &Value) -> AppResult<&JsonObject> {
    body.as_object()
        .ok_or_else(|| AppError::invalid_field("body", i18n::t("validation.object")))
}

/// First non-null value among `names` (the canonical name and its aliases).
pub fn field<'a>(obj: &'a JsonObject, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|v| !v.is_null())
}

pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()
        }
        _ => None,
    }
}

/// A positive integer id given as a number or a numeric string.
pub fn parse_id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    (id > 0).then_some(id)
}

pub fn parse_percentage(value: &Value) -> Option<Percentage> {
    parse_decimal(value).and_then(Percentage::from_decimal)
}

/// Accepts booleans, the strings `true/1/yes/on` (and their negatives) and numbers.
pub fn parse_bool_lenient(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// A trimmed, non-blank string field. Records an error when missing or blank.
pub fn required_string(
    obj: &JsonObject,
    names: &[&str],
    errors: &mut ValidationErrors,
) -> Option<String> {
    let label = names[0];
    match field(obj, names) {
        None => {
            errors.add(label, i18n::t("validation.required"));
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.add(label, i18n::t("validation.not_blank"));
            None
        }
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            errors.add(label, i18n::t("validation.string"));
            None
        }
    }
}

/// A trimmed string field; blank strings become `None`.
pub fn optional_string(
    obj: &JsonObject,
    names: &[&str],
    errors: &mut ValidationErrors,
) -> Option<String> {
    match field(obj, names) {
        None => None,
        Some(Value::String(s)) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Some(_) => {
            errors.add(names[0], i18n::t("validation.string"));
            None
        }
    }
}

pub fn check_min_length(
    value: Option<&str>,
    field: &str,
    min: usize,
    errors: &mut ValidationErrors,
) {
    if let Some(v) = value {
        if v.chars().count() < min {
            errors.add(
                field,
                i18n::t_with("validation.min_length", &[("min", min.to_string().as_str())]),
            );
        }
    }
}

pub fn check_max_length(
    value: Option<&str>,
    field: &str,
    max: usize,
    errors: &mut ValidationErrors,
) {
    if let Some(v) = value {
        if v.chars().count() > max {
            errors.add(
                field,
                i18n::t_with("validation.max_length", &[("max", max.to_string().as_str())]),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn percentage_accepts_numbers_and_numeric_strings() {
        assert_eq!(
            parse_percentage(&json!(60)).map(|p| p.basis_points()),
            Some(6000)
        );
        assert_eq!(
            parse_percentage(&json!("33.5")).map(|p| p.basis_points()),
            Some(3350)
        );
        assert_eq!(
            parse_percentage(&json!(12.345)).map(|p| p.basis_points()),
            Some(1235)
        );
        assert!(parse_percentage(&json!(100.01)).is_none());
        assert!(parse_percentage(&json!(-1)).is_none());
        assert!(parse_percentage(&json!("abc")).is_none());
        assert!(parse_percentage(&json!(true)).is_none());
    }

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id(&json!(5)), Some(5));
        assert_eq!(parse_id(&json!("7")), Some(7));
        assert_eq!(parse_id(&json!(0)), None);
        assert_eq!(parse_id(&json!(1.5)), None);
    }

    #[test]
    fn field_prefers_first_non_null_alias() {
        let body = json!({"userId": null, "user_id": 3});
        let obj = body.as_object().unwrap();
        assert_eq!(field(obj, &["userId", "user_id"]), Some(&json!(3)));
    }

    #[test]
    fn lenient_bool_parsing() {
        assert_eq!(parse_bool_lenient(&json!("on")), Some(true));
        assert_eq!(parse_bool_lenient(&json!(0)), Some(false));
        assert_eq!(parse_bool_lenient(&json!("maybe")), None);
    }

    #[test]
    fn phone_and_email_formats() {
        assert!(is_valid_phone("+48123456789"));
        assert!(!is_valid_phone("48123456789"));
        assert!(!is_valid_phone("+0123"));
        assert!(is_valid_email("jan@example.com"));
        assert!(!is_valid_email("jan@example"));
    }

    #[test]
    fn required_string_reports_missing_and_blank() {
        let body = json!({"name": "  ", "other": 1});
        let obj = body.as_object().unwrap();
        let mut errors = ValidationErrors::new();
        assert!(required_string(obj, &["name"], &mut errors).is_none());
        assert!(required_string(obj, &["surname"], &mut errors).is_none());
        assert!(required_string(obj, &["other"], &mut errors).is_none());
        assert_eq!(errors.fields().len(), 3);
    }
}
