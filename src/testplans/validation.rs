//! Field-level checks for plan requests. Everything here is pure; rules that
//! need stored data live in `services`.

use serde_json::Value;

use crate::error::{FieldErrors, ValidationError};
use crate::fields;
use crate::testplans::dto::TestPlanInput;
use crate::testplans::repo_types::{TestPlanFields, UpdateTestPlan};

pub const TITLE_MAX_CHARS: usize = 150;

fn record<T>(
    errors: &mut FieldErrors,
    field: &'static str,
    parsed: Result<T, ValidationError>,
) -> Option<T> {
    parsed.map_err(|e| errors.add(field, e)).ok()
}

fn title(value: Option<&Value>) -> Result<String, ValidationError> {
    let title = fields::string(value)?
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ValidationError::TitleRequired)?;
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(title)
}

fn test_plan_id(value: Option<&Value>) -> Result<i64, ValidationError> {
    fields::integer(value)?.ok_or(ValidationError::IdRequired)
}

fn plan_fields(input: &TestPlanInput, errors: &mut FieldErrors) -> Option<TestPlanFields> {
    let title = record(errors, "title", title(input.title.as_ref()));
    let description = record(errors, "description", fields::string(input.description.as_ref()));
    let author = record(errors, "author", fields::integer(input.author.as_ref()));
    let start_date = record(errors, "start_date", fields::datetime(input.start_date.as_ref()));
    let end_date = record(errors, "end_date", fields::datetime(input.end_date.as_ref()));
    let is_current = record(errors, "is_current", fields::boolean(input.is_current.as_ref()));

    Some(TestPlanFields {
        title: title?,
        description: description?.map(|d| d.trim().to_string()),
        author: author?,
        start_date: start_date?,
        end_date: end_date?,
        is_current: is_current?.unwrap_or(false),
    })
}

/// Start may equal end but must not come after it.
pub fn check_dates(fields: &TestPlanFields) -> Result<(), ValidationError> {
    match (fields.start_date, fields.end_date) {
        (Some(start), Some(end)) if start > end => Err(ValidationError::IncorrectDate),
        _ => Ok(()),
    }
}

pub fn parse_create(input: &TestPlanInput) -> Result<TestPlanFields, FieldErrors> {
    let mut errors = FieldErrors::new();
    match plan_fields(input, &mut errors) {
        Some(fields) => errors.into_result(fields),
        None => Err(errors),
    }
}

pub fn parse_update(input: &TestPlanInput) -> Result<UpdateTestPlan, FieldErrors> {
    let mut errors = FieldErrors::new();
    let id = record(&mut errors, "test_plan_id", test_plan_id(input.test_plan_id.as_ref()));
    let fields = plan_fields(input, &mut errors);
    match (id, fields) {
        (Some(test_plan_id), Some(fields)) => errors.into_result(UpdateTestPlan {
            test_plan_id,
            fields,
        }),
        _ => Err(errors),
    }
}

pub fn parse_delete(input: &TestPlanInput) -> Result<i64, FieldErrors> {
    test_plan_id(input.test_plan_id.as_ref())
        .map_err(|e| FieldErrors::single("test_plan_id", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn input(value: serde_json::Value) -> TestPlanInput {
        serde_json::from_value(value).expect("valid input shape")
    }

    #[test]
    fn create_with_only_title_defaults_the_rest() {
        let fields = parse_create(&input(json!({"title": "Release 1.0"}))).unwrap();
        assert_eq!(fields.title, "Release 1.0");
        assert_eq!(fields.description, None);
        assert_eq!(fields.author, None);
        assert_eq!(fields.start_date, None);
        assert_eq!(fields.end_date, None);
        assert!(!fields.is_current);
    }

    #[test]
    fn create_keeps_every_field() {
        let fields = parse_create(&input(json!({
            "title": "T",
            "description": "smoke",
            "author": 1,
            "start_date": "2023-08-26T17:44:00Z",
            "end_date": "2023-08-30T17:44:00Z",
            "is_current": true,
            "unknown": "ignored"
        })))
        .unwrap();
        assert_eq!(fields.description.as_deref(), Some("smoke"));
        assert_eq!(fields.author, Some(1));
        assert_eq!(fields.start_date, Some(datetime!(2023-08-26 17:44:00 UTC)));
        assert_eq!(fields.end_date, Some(datetime!(2023-08-30 17:44:00 UTC)));
        assert!(fields.is_current);
    }

    #[test]
    fn missing_or_blank_title_is_required() {
        for body in [json!({}), json!({"title": ""}), json!({"title": "   "}), json!({"title": null})] {
            let errors = parse_create(&input(body)).unwrap_err();
            assert_eq!(errors.get("title"), &[ValidationError::TitleRequired]);
        }
    }

    #[test]
    fn overlong_title_is_rejected() {
        let long = "x".repeat(TITLE_MAX_CHARS + 1);
        let errors = parse_create(&input(json!({ "title": long }))).unwrap_err();
        assert_eq!(errors.get("title"), &[ValidationError::TitleTooLong]);

        let exact = "x".repeat(TITLE_MAX_CHARS);
        assert!(parse_create(&input(json!({ "title": exact }))).is_ok());
    }

    #[test]
    fn field_errors_are_collected_together() {
        let errors = parse_create(&input(json!({
            "title": "T",
            "author": 1.1,
            "start_date": "26-08-2023 17:44:00",
            "end_date": "30-08-2023 17:44:00"
        })))
        .unwrap_err();
        assert_eq!(errors.get("author")[0].to_string(), "A valid integer is required.");
        assert_eq!(errors.get("start_date"), &[ValidationError::InvalidDatetime]);
        assert_eq!(errors.get("end_date"), &[ValidationError::InvalidDatetime]);
        assert!(errors.get("title").is_empty());
    }

    #[test]
    fn equal_dates_are_allowed() {
        let mut fields = parse_create(&input(json!({"title": "T"}))).unwrap();
        let at = datetime!(2023-08-26 17:44:00 UTC);
        fields.start_date = Some(at);
        fields.end_date = Some(at);
        assert_eq!(check_dates(&fields), Ok(()));

        fields.start_date = Some(at + time::Duration::seconds(1));
        assert_eq!(check_dates(&fields), Err(ValidationError::IncorrectDate));
    }

    #[test]
    fn one_sided_date_range_is_fine() {
        let fields = parse_create(&input(json!({
            "title": "T",
            "start_date": "2023-08-26T17:44:00Z"
        })))
        .unwrap();
        assert_eq!(check_dates(&fields), Ok(()));
    }

    #[test]
    fn update_requires_an_integer_id() {
        let errors = parse_update(&input(json!({"title": "T"}))).unwrap_err();
        assert_eq!(errors.get("test_plan_id"), &[ValidationError::IdRequired]);

        let errors = parse_update(&input(json!({"title": "T", "test_plan_id": ""}))).unwrap_err();
        assert_eq!(errors.get("test_plan_id"), &[ValidationError::IdRequired]);

        let errors = parse_update(&input(json!({"title": "T", "test_plan_id": "abc"}))).unwrap_err();
        assert_eq!(errors.get("test_plan_id"), &[ValidationError::InvalidInteger]);

        let update = parse_update(&input(json!({"title": "T", "test_plan_id": "4"}))).unwrap();
        assert_eq!(update.test_plan_id, 4);
    }

    #[test]
    fn update_reports_id_and_title_together() {
        let errors = parse_update(&input(json!({}))).unwrap_err();
        assert_eq!(errors.get("test_plan_id"), &[ValidationError::IdRequired]);
        assert_eq!(errors.get("title"), &[ValidationError::TitleRequired]);
    }

    #[test]
    fn delete_needs_only_the_id() {
        assert_eq!(parse_delete(&input(json!({"test_plan_id": 9}))), Ok(9));
        let errors = parse_delete(&input(json!({"test_plan_id": 1.5}))).unwrap_err();
        assert_eq!(errors.get("test_plan_id"), &[ValidationError::InvalidInteger]);
        let errors = parse_delete(&input(json!({}))).unwrap_err();
        assert_eq!(errors.get("test_plan_id"), &[ValidationError::IdRequired]);
    }
}
