//! Coercion of loosely typed JSON request fields.
//!
//! `null`, an absent key and (for non-text fields) a blank string all mean
//! "not provided" and come back as `Ok(None)`.

use serde_json::Value;
use time::{
    format_description::well_known::{Iso8601, Rfc3339},
    macros::format_description,
    OffsetDateTime, PrimitiveDateTime,
};

use crate::error::ValidationError;

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

pub fn string(value: Option<&Value>) -> Result<Option<String>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(ValidationError::NotAString),
    }
}

pub fn integer(value: Option<&Value>) -> Result<Option<i64>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
                _ => Err(ValidationError::InvalidInteger),
            }
        }
        Some(Value::String(s)) if blank(s) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            // "5.00" is accepted as 5
            let digits = match s.split_once('.') {
                Some((int, frac)) if frac.chars().all(|c| c == '0') => int,
                Some(_) => return Err(ValidationError::InvalidInteger),
                None => s,
            };
            digits
                .parse::<i64>()
                .map(Some)
                .map_err(|_| ValidationError::InvalidInteger)
        }
        Some(_) => Err(ValidationError::InvalidInteger),
    }
}

pub fn boolean(value: Option<&Value>) -> Result<Option<bool>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(1) => Ok(Some(true)),
            Some(0) => Ok(Some(false)),
            _ => Err(ValidationError::InvalidBoolean),
        },
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "true" | "t" | "yes" | "y" | "on" | "1" => Ok(Some(true)),
            "false" | "f" | "no" | "n" | "off" | "0" => Ok(Some(false)),
            _ => Err(ValidationError::InvalidBoolean),
        },
        Some(_) => Err(ValidationError::InvalidBoolean),
    }
}

/// RFC 3339, or ISO 8601 without an offset (read as UTC). Date and time may
/// be separated by a space instead of `T`, and seconds may be omitted.
pub fn datetime(value: Option<&Value>) -> Result<Option<OffsetDateTime>, ValidationError> {
    let s = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if blank(s) => return Ok(None),
        Some(Value::String(s)) => s.trim(),
        Some(_) => return Err(ValidationError::InvalidDatetime),
    };
    let spaced;
    let s = match s.as_bytes().get(10) {
        Some(b' ') => {
            spaced = format!("{}T{}", &s[..10], s[11..].trim_start());
            spaced.as_str()
        }
        _ => s,
    };
    OffsetDateTime::parse(s, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(s, &Iso8601::DEFAULT))
        .or_else(|_| PrimitiveDateTime::parse(s, &Iso8601::DEFAULT).map(|p| p.assume_utc()))
        .or_else(|_| {
            PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
                .map(|p| p.assume_utc())
        })
        .map(Some)
        .map_err(|_| ValidationError::InvalidDatetime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn integers_accept_integral_numbers_and_strings() {
        assert_eq!(integer(Some(&json!(5))), Ok(Some(5)));
        assert_eq!(integer(Some(&json!(5.0))), Ok(Some(5)));
        assert_eq!(integer(Some(&json!("17"))), Ok(Some(17)));
        assert_eq!(integer(Some(&json!(" 3.00 "))), Ok(Some(3)));
        assert_eq!(integer(Some(&json!(null))), Ok(None));
        assert_eq!(integer(None), Ok(None));
        assert_eq!(integer(Some(&json!(""))), Ok(None));
    }

    #[test]
    fn integers_reject_fractions_and_junk() {
        assert_eq!(integer(Some(&json!(1.1))), Err(ValidationError::InvalidInteger));
        assert_eq!(integer(Some(&json!("1.5"))), Err(ValidationError::InvalidInteger));
        assert_eq!(integer(Some(&json!("abc"))), Err(ValidationError::InvalidInteger));
        assert_eq!(integer(Some(&json!(true))), Err(ValidationError::InvalidInteger));
        assert_eq!(integer(Some(&json!([1]))), Err(ValidationError::InvalidInteger));
    }

    #[test]
    fn booleans() {
        assert_eq!(boolean(Some(&json!(true))), Ok(Some(true)));
        assert_eq!(boolean(Some(&json!("False"))), Ok(Some(false)));
        assert_eq!(boolean(Some(&json!(1))), Ok(Some(true)));
        assert_eq!(boolean(Some(&json!(2))), Err(ValidationError::InvalidBoolean));
        assert_eq!(boolean(Some(&json!("maybe"))), Err(ValidationError::InvalidBoolean));
        assert_eq!(boolean(None), Ok(None));
    }

    #[test]
    fn strings() {
        assert_eq!(string(Some(&json!("x"))), Ok(Some("x".to_string())));
        assert_eq!(string(Some(&json!(12))), Ok(Some("12".to_string())));
        assert_eq!(string(Some(&json!({"a": 1}))), Err(ValidationError::NotAString));
        assert_eq!(string(Some(&json!(false))), Err(ValidationError::NotAString));
    }

    #[test]
    fn datetimes_with_and_without_offset() {
        assert_eq!(
            datetime(Some(&json!("2023-08-26T17:44:00Z"))),
            Ok(Some(datetime!(2023-08-26 17:44:00 UTC)))
        );
        assert_eq!(
            datetime(Some(&json!("2023-08-26T17:44:00+03:00"))),
            Ok(Some(datetime!(2023-08-26 14:44:00 UTC)))
        );
        assert_eq!(
            datetime(Some(&json!("2023-08-26T17:44:00"))),
            Ok(Some(datetime!(2023-08-26 17:44:00 UTC)))
        );
    }

    #[test]
    fn datetimes_with_space_separator() {
        assert_eq!(
            datetime(Some(&json!("2023-08-26 17:44:00"))),
            Ok(Some(datetime!(2023-08-26 17:44:00 UTC)))
        );
        assert_eq!(
            datetime(Some(&json!("2023-08-26 17:44"))),
            Ok(Some(datetime!(2023-08-26 17:44:00 UTC)))
        );
        assert_eq!(
            datetime(Some(&json!("2023-08-26 17:44:00+03:00"))),
            Ok(Some(datetime!(2023-08-26 14:44:00 UTC)))
        );
        assert_eq!(
            datetime(Some(&json!("2023-08-26T17:44"))),
            Ok(Some(datetime!(2023-08-26 17:44:00 UTC)))
        );
    }

    #[test]
    fn datetimes_in_wrong_format_are_rejected() {
        assert_eq!(
            datetime(Some(&json!("26-08-2023 17:44:00"))),
            Err(ValidationError::InvalidDatetime)
        );
        assert_eq!(datetime(Some(&json!(20230826))), Err(ValidationError::InvalidDatetime));
        assert_eq!(
            datetime(Some(&json!("2023-08-26 noon"))),
            Err(ValidationError::InvalidDatetime)
        );
        assert_eq!(datetime(Some(&json!(null))), Ok(None));
    }
}
