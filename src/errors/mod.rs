use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::models::upload::WebhookResponse;

#[derive(Debug)]
pub enum AppError {
    MissingBody,
    Unauthorized(String),
    InvalidPayload(String),
    MissingFields(Vec<&'static str>),
    InvalidSize(String),
    InvalidTimestamp(String),
    NotFound(String),
    MethodNotAllowed(String),
    PayloadTooLarge(String),
    PersistenceError(String),
    InternalServerError(String),
}

impl AppError {
    /// Short machine-readable tag, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::MissingBody => "missing_body",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::InvalidPayload(_) => "invalid_payload",
            AppError::MissingFields(_) => "missing_fields",
            AppError::InvalidSize(_) => "invalid_size",
            AppError::InvalidTimestamp(_) => "invalid_timestamp",
            AppError::NotFound(_) => "not_found",
            AppError::MethodNotAllowed(_) => "method_not_allowed",
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::PersistenceError(_) => "persistence_failure",
            AppError::InternalServerError(_) => "internal_error",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MissingBody => write!(f, "Bad Request: request body is empty"),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::InvalidPayload(msg) => write!(f, "Bad Request: invalid JSON payload: {}", msg),
            AppError::MissingFields(fields) => {
                write!(f, "Bad Request: missing required fields: {}", fields.join(", "))
            }
            AppError::InvalidSize(value) => {
                write!(f, "Bad Request: fileSize is not a valid non-negative integer: {}", value)
            }
            AppError::InvalidTimestamp(value) => {
                write!(f, "Bad Request: timeCreated is not a valid RFC 3339 timestamp: {}", value)
            }
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::MethodNotAllowed(msg) => write!(f, "Method Not Allowed: {}", msg),
            AppError::PayloadTooLarge(msg) => write!(f, "Payload Too Large: {}", msg),
            AppError::PersistenceError(msg) => write!(f, "Internal Server Error: failed to record upload: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingBody
            | AppError::InvalidPayload(_)
            | AppError::MissingFields(_)
            | AppError::InvalidSize(_)
            | AppError::InvalidTimestamp(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::PersistenceError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(WebhookResponse::error(self.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(AppError::MissingBody.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MissingFields(vec!["source"]).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::PersistenceError("down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn missing_fields_message_lists_every_field() {
        let err = AppError::MissingFields(vec!["fileName", "source"]);
        assert_eq!(err.to_string(), "Bad Request: missing required fields: fileName, source");
        assert_eq!(err.kind(), "missing_fields");
    }
}
