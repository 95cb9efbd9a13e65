//! Upload notifications. Delivery is best effort: callers log failures and
//! carry on.

pub mod memory;
pub mod smtp;

use async_trait::async_trait;
use log::info;
use std::fmt;

use crate::models::upload::FileUploadRecord;

pub use memory::RecordingNotifier;
pub use smtp::SmtpNotifier;

#[derive(Debug)]
pub enum NotifyError {
    InvalidAddress(String),
    Build(String),
    Transport(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::InvalidAddress(msg) => write!(f, "invalid address: {}", msg),
            NotifyError::Build(msg) => write!(f, "could not build message: {}", msg),
            NotifyError::Transport(msg) => write!(f, "delivery failed: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a plaintext message.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

pub fn compose_upload_message(record: &FileUploadRecord) -> Message {
    Message {
        subject: format!("New file uploaded: {}", record.file_name),
        body: format!(
            "A new file was uploaded to Cloud Storage.\n\n\
             File: {}\n\
             Bucket: {}\n\
             Size: {} bytes\n\
             Content type: {}\n\
             Created: {}\n",
            record.file_name,
            record.bucket_name,
            record.file_size,
            record.content_type,
            record.created_at_display(),
        ),
    }
}

/// Used when no SMTP relay is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        info!("Notification for {} (no SMTP relay configured): {}\n{}", to, subject, body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn message_names_every_upload_detail() {
        let record = FileUploadRecord {
            file_name: "report.csv".to_string(),
            bucket_name: "incoming".to_string(),
            file_size: 2048,
            content_type: "text/csv".to_string(),
            time_created: DateTime::parse_from_rfc3339("2024-06-01T14:05:09Z").unwrap(),
            source: "CloudStorage".to_string(),
        };

        let message = compose_upload_message(&record);

        assert_eq!(message.subject, "New file uploaded: report.csv");
        assert!(message.body.contains("File: report.csv\n"));
        assert!(message.body.contains("Bucket: incoming\n"));
        assert!(message.body.contains("Size: 2048 bytes\n"));
        assert!(message.body.contains("Content type: text/csv\n"));
        assert!(message.body.contains("Created: 6/1/2024, 2:05:09 PM\n"));
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        assert!(LogNotifier.send("ops@example.com", "s", "b").await.is_ok());
    }
}
