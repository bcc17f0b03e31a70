//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every helper reports failures as the domain validation error so clients
//! see the same `errors` list and `details.field` no matter which request
//! part was wrong.

use serde_json::json;

use crate::domain::{Error, Identnr, RecordId, VALIDATION_FAILED};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    EmptyList,
    InvalidNumber,
    InvalidIdentnr,
    InvalidRecordId,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            Self::EmptyList => "empty_list",
            Self::InvalidNumber => "invalid_number",
            Self::InvalidIdentnr => "invalid_identnr",
            Self::InvalidRecordId => "invalid_record_id",
        }
    }
}

/// Wire name of a request field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: FieldName,
    message: String,
}

impl ValidationError {
    fn new(field: FieldName, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(VALIDATION_FAILED)
            .with_errors(vec![self.message])
            .with_details(json!({
                "field": self.field.as_str(),
                "code": code.as_str(),
            }))
    }

    fn with_value(self, code: ErrorCode, value: &str) -> Error {
        Error::invalid_request(VALIDATION_FAILED)
            .with_errors(vec![self.message])
            .with_details(json!({
                "field": self.field.as_str(),
                "value": value,
                "code": code.as_str(),
            }))
    }

    fn with_index(self, code: ErrorCode, index: usize, value: &str) -> Error {
        Error::invalid_request(VALIDATION_FAILED)
            .with_errors(vec![self.message])
            .with_details(json!({
                "field": self.field.as_str(),
                "index": index,
                "value": value,
                "code": code.as_str(),
            }))
    }
}

/// Parse an optional integer query value; blank text counts as absent.
pub(crate) fn parse_optional_number(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<i32>, Error> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<i32>().map(Some).map_err(|_| {
        ValidationError::new(field, format!("{} must be a whole number", field.as_str()))
            .with_value(ErrorCode::InvalidNumber, raw)
    })
}

/// Reject an empty list.
pub(crate) fn require_non_empty<T>(values: &[T], field: FieldName) -> Result<(), Error> {
    if values.is_empty() {
        return Err(ValidationError::new(
            field,
            format!("{} must contain at least one entry", field.as_str()),
        )
        .with_code(ErrorCode::EmptyList));
    }
    Ok(())
}

/// Validate a list of identnrs, reporting the first bad entry by index.
pub(crate) fn parse_identnr_list(
    values: &[String],
    field: FieldName,
) -> Result<Vec<Identnr>, Error> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            Identnr::new(value).map_err(|err| {
                ValidationError::new(field, format!("{}[{index}]: {err}", field.as_str()))
                    .with_index(ErrorCode::InvalidIdentnr, index, value)
            })
        })
        .collect()
}

/// Validate a list of record ids: each must be a positive 32-bit integer.
pub(crate) fn parse_record_ids(values: &[i64], field: FieldName) -> Result<Vec<RecordId>, Error> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            i32::try_from(*value)
                .ok()
                .filter(|id| *id > 0)
                .map(RecordId::new)
                .ok_or_else(|| {
                    ValidationError::new(
                        field,
                        format!("{}[{index}] must be a positive record id", field.as_str()),
                    )
                    .with_index(ErrorCode::InvalidRecordId, index, &value.to_string())
                })
        })
        .collect()
}
