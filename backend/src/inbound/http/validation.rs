//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every malformed input, whether caught by an extractor or by a handler,
//! becomes an `invalid_request` domain error whose details name the field.

use std::str::FromStr;

use actix_web::web;
use chrono::{DateTime, Utc};
use pagination::{PageRequest, PaginationError};
use serde_json::json;

use crate::domain::{Error, IdParseError};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidId,
    InvalidTimestamp,
    InvalidValue,
    InvalidPagination,
    MalformedBody,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidId => "invalid_id",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
            ErrorCode::InvalidValue => "invalid_value",
            ErrorCode::InvalidPagination => "invalid_pagination",
            ErrorCode::MalformedBody => "malformed_body",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: String,
    message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: impl Into<String>) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value.into(),
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("missing required field: {field}"))
        .with_code(ErrorCode::MissingField)
}

pub(crate) fn invalid_value_error(field: FieldName, message: &str, value: &str) -> Error {
    ValidationError::new(field.as_str(), message).with_value(ErrorCode::InvalidValue, value)
}

/// Parse a positive identifier from a path segment or body field.
pub(crate) fn parse_id<T>(value: &str, field: FieldName) -> Result<T, Error>
where
    T: FromStr<Err = IdParseError>,
{
    value.parse::<T>().map_err(|_| {
        let name = field.as_str();
        ValidationError::new(name, format!("{name} must be a positive integer"))
            .with_value(ErrorCode::InvalidId, value)
    })
}

/// Validate an identifier supplied as a JSON number.
pub(crate) fn parse_raw_id<T>(value: i64, field: FieldName) -> Result<T, Error>
where
    T: FromStr<Err = IdParseError>,
{
    parse_id(&value.to_string(), field)
}

pub(crate) fn invalid_timestamp_error(field: FieldName, value: &str) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("{field} must be an RFC 3339 timestamp"))
        .with_value(ErrorCode::InvalidTimestamp, value)
}

pub(crate) fn parse_optional_rfc3339_timestamp(
    value: Option<String>,
    field: FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|_| invalid_timestamp_error(field, &raw))
        })
        .transpose()
}

/// Parse an optional wire enum, naming the accepted values on failure.
pub(crate) fn parse_optional_enum<T: FromStr>(
    value: Option<String>,
    field: FieldName,
    accepted: &str,
) -> Result<Option<T>, Error> {
    value
        .map(|raw| {
            raw.parse::<T>().map_err(|_| {
                invalid_value_error(
                    field,
                    &format!("{} must be one of {accepted}", field.as_str()),
                    &raw,
                )
            })
        })
        .transpose()
}

/// Validate `page` and `pageSize` query parameters.
pub(crate) fn page_request(
    page: Option<u32>,
    page_size: Option<u32>,
) -> Result<PageRequest, Error> {
    PageRequest::from_query(page, page_size).map_err(|err| {
        let field = match err {
            PaginationError::InvalidPage => "page",
            PaginationError::InvalidPageSize { .. } => "pageSize",
        };
        ValidationError::new(field, err.to_string()).with_code(ErrorCode::InvalidPagination)
    })
}

fn malformed(kind: &'static str, detail: String) -> actix_web::Error {
    ValidationError::new(kind, format!("malformed {kind}: {detail}"))
        .with_code(ErrorCode::MalformedBody)
        .into()
}

/// JSON extractor configuration mapping parse failures to `invalid_request`.
#[must_use]
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| malformed("body", err.to_string()))
}

/// Query extractor configuration mapping parse failures to `invalid_request`.
#[must_use]
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| malformed("query", err.to_string()))
}

/// Path extractor configuration mapping parse failures to `invalid_request`.
#[must_use]
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| malformed("path", err.to_string()))
}
