use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::errors::AppError;
use crate::store::Cell;

/// Rust field name to wire name, in the order fields are reported as missing.
pub const REQUIRED_FIELDS: [(&str, &str); 6] = [
    ("file_name", "fileName"),
    ("bucket_name", "bucketName"),
    ("file_size", "fileSize"),
    ("content_type", "contentType"),
    ("time_created", "timeCreated"),
    ("source", "source"),
];

const CREATED_AT_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Body posted by the storage relay. Every field is optional here so that
/// absence is reported by validation rather than by serde.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadPayload {
    #[validate(required, length(min = 1))]
    pub file_name: Option<String>,
    #[validate(required, length(min = 1))]
    pub bucket_name: Option<String>,
    #[validate(required, custom = "validate_size_present")]
    pub file_size: Option<Value>,
    #[validate(required, length(min = 1))]
    pub content_type: Option<String>,
    #[validate(required, length(min = 1))]
    pub time_created: Option<String>,
    #[validate(required, length(min = 1))]
    pub source: Option<String>,
}

// A size may arrive as a string or a number; only an empty string counts as absent.
fn validate_size_present(size: &Value) -> Result<(), validator::ValidationError> {
    match size {
        Value::String(s) if s.is_empty() => Err(validator::ValidationError::new("required")),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileUploadRecord {
    pub file_name: String,
    pub bucket_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub time_created: DateTime<FixedOffset>,
    pub source: String,
}

impl FileUploadRecord {
    /// Builds a record from a payload that already passed presence validation.
    pub fn from_payload(payload: UploadPayload) -> Result<Self, AppError> {
        let missing = |name: &'static str| AppError::MissingFields(vec![name]);

        let file_size = payload.file_size.ok_or_else(|| missing("fileSize"))?;
        let file_size = parse_file_size(&file_size)?;

        let time_created = payload.time_created.ok_or_else(|| missing("timeCreated"))?;
        let time_created = DateTime::parse_from_rfc3339(time_created.trim())
            .map_err(|_| AppError::InvalidTimestamp(time_created.clone()))?;

        Ok(FileUploadRecord {
            file_name: payload.file_name.ok_or_else(|| missing("fileName"))?,
            bucket_name: payload.bucket_name.ok_or_else(|| missing("bucketName"))?,
            file_size,
            content_type: payload.content_type.ok_or_else(|| missing("contentType"))?,
            time_created,
            source: payload.source.ok_or_else(|| missing("source"))?,
        })
    }

    pub fn created_at_display(&self) -> String {
        self.time_created
            .with_timezone(&Utc)
            .format(CREATED_AT_FORMAT)
            .to_string()
    }

    /// Row cells in header order: Name, Bucket, Size, ContentType, CreatedAt, Source.
    pub fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.file_name.clone()),
            Cell::Text(self.bucket_name.clone()),
            Cell::Integer(self.file_size),
            Cell::Text(self.content_type.clone()),
            Cell::Text(self.created_at_display()),
            Cell::Text(self.source.clone()),
        ]
    }
}

pub fn parse_file_size(value: &Value) -> Result<i64, AppError> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };

    match parsed {
        Some(size) if size >= 0 => Ok(size),
        _ => Err(AppError::InvalidSize(value.to_string())),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
    pub message: String,
}

impl WebhookResponse {
    pub fn success(message: impl Into<String>) -> Self {
        WebhookResponse { status: "success".to_string(), message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        WebhookResponse { status: "error".to_string(), message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(body: Value) -> UploadPayload {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn parses_size_from_string_or_number() {
        assert_eq!(parse_file_size(&json!("1024")).unwrap(), 1024);
        assert_eq!(parse_file_size(&json!(" 42 ")).unwrap(), 42);
        assert_eq!(parse_file_size(&json!(2048)).unwrap(), 2048);
        assert_eq!(parse_file_size(&json!("0")).unwrap(), 0);
    }

    #[test]
    fn rejects_invalid_sizes() {
        for bad in [json!("abc"), json!("-1"), json!(-5), json!(1.5), json!(true), json!("12kb")] {
            assert!(matches!(parse_file_size(&bad), Err(AppError::InvalidSize(_))), "{bad}");
        }
    }

    #[test]
    fn builds_record_and_row() {
        let record = FileUploadRecord::from_payload(payload(json!({
            "fileName": "a.txt",
            "bucketName": "b1",
            "fileSize": "1024",
            "contentType": "text/plain",
            "timeCreated": "2024-01-01T00:00:00Z",
            "source": "gcs"
        })))
        .unwrap();

        assert_eq!(record.file_size, 1024);
        assert_eq!(record.created_at_display(), "1/1/2024, 12:00:00 AM");
        assert_eq!(
            record.to_row(),
            vec![
                Cell::Text("a.txt".into()),
                Cell::Text("b1".into()),
                Cell::Integer(1024),
                Cell::Text("text/plain".into()),
                Cell::Text("1/1/2024, 12:00:00 AM".into()),
                Cell::Text("gcs".into()),
            ]
        );
    }

    #[test]
    fn created_at_is_rendered_in_utc() {
        let record = FileUploadRecord::from_payload(payload(json!({
            "fileName": "a.txt",
            "bucketName": "b1",
            "fileSize": 1,
            "contentType": "text/plain",
            "timeCreated": "2024-03-05T18:30:15-05:00",
            "source": "gcs"
        })))
        .unwrap();

        assert_eq!(record.created_at_display(), "3/5/2024, 11:30:15 PM");
    }

    #[test]
    fn rejects_unparseable_timestamp() {
        let result = FileUploadRecord::from_payload(payload(json!({
            "fileName": "a.txt",
            "bucketName": "b1",
            "fileSize": 1,
            "contentType": "text/plain",
            "timeCreated": "yesterday",
            "source": "gcs"
        })));

        assert!(matches!(result, Err(AppError::InvalidTimestamp(_))));
    }
}
