use actix_web::error::PayloadError;
use actix_web::{web, HttpRequest, HttpResponse};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::upload::{FileUploadRecord, UploadPayload, WebhookResponse, REQUIRED_FIELDS};
use crate::notify::{compose_upload_message, Notifier};
use crate::store::{TableStore, HEADER};
use crate::utils::validation::validate_payload;

const LARGE_FILE_BYTES: i64 = 10 * 1024 * 1024;

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Records one upload notification from the storage relay.
///
/// Every check short-circuits before any side effect. Once the row is
/// appended the request has succeeded; the email is best effort.
pub async fn handle_upload(
    req: HttpRequest,
    config: web::Data<Config>,
    store: web::Data<dyn TableStore>,
    notifier: web::Data<dyn Notifier>,
    body: Result<web::Bytes, actix_web::Error>,
) -> Result<HttpResponse, AppError> {
    let request_id = Uuid::new_v4();

    let result = match body {
        Ok(body) => process_upload(request_id, &req, &config, &**store, &**notifier, &body).await,
        Err(err) => Err(body_error(err)),
    };

    match &result {
        Ok(_) => {}
        Err(err @ (AppError::PersistenceError(_) | AppError::InternalServerError(_))) => {
            error!("[{}] Upload rejected ({}): {}", request_id, err.kind(), err)
        }
        Err(err) => warn!("[{}] Upload rejected ({}): {}", request_id, err.kind(), err),
    }
    result
}

async fn process_upload(
    request_id: Uuid,
    req: &HttpRequest,
    config: &Config,
    store: &dyn TableStore,
    notifier: &dyn Notifier,
    body: &[u8],
) -> Result<HttpResponse, AppError> {
    if body.is_empty() {
        return Err(AppError::MissingBody);
    }

    let token = web::Query::<TokenQuery>::from_query(req.query_string())
        .ok()
        .and_then(|query| query.into_inner().token);
    match token {
        Some(token) if token == config.secret_token => {}
        Some(_) => return Err(AppError::Unauthorized("invalid token".to_string())),
        None => return Err(AppError::Unauthorized("missing token".to_string())),
    }

    let value: Value = serde_json::from_slice(body).map_err(|err| AppError::InvalidPayload(err.to_string()))?;
    if !value.is_object() {
        return Err(AppError::InvalidPayload("expected a JSON object".to_string()));
    }
    let payload: UploadPayload =
        serde_json::from_value(value).map_err(|err| AppError::InvalidPayload(err.to_string()))?;

    validate_payload(&payload, &REQUIRED_FIELDS)?;
    let record = FileUploadRecord::from_payload(payload)?;

    info!(
        "[{}] Processing '{}' from bucket '{}' ({} bytes, {}, source {})",
        request_id, record.file_name, record.bucket_name, record.file_size, record.content_type, record.source
    );
    log_advisories(request_id, &record);

    let created = store
        .ensure_tab(&config.sheet_tab, &HEADER)
        .await
        .map_err(|err| AppError::PersistenceError(err.to_string()))?;
    if created {
        info!("[{}] Created tab '{}' with header row", request_id, config.sheet_tab);
    }
    store
        .append_row(&config.sheet_tab, &record.to_row())
        .await
        .map_err(|err| AppError::PersistenceError(err.to_string()))?;
    info!("[{}] Row appended to '{}'", request_id, config.sheet_tab);

    let message = compose_upload_message(&record);
    match notifier.send(&config.notify_recipient, &message.subject, &message.body).await {
        Ok(()) => info!("[{}] Notification sent to {}", request_id, config.notify_recipient),
        Err(err) => error!(
            "[{}] Notification to {} failed, upload already recorded: {}",
            request_id, config.notify_recipient, err
        ),
    }

    Ok(HttpResponse::Ok().json(WebhookResponse::success(format!(
        "Upload '{}' recorded",
        record.file_name
    ))))
}

fn log_advisories(request_id: Uuid, record: &FileUploadRecord) {
    if !record.content_type.starts_with("text/") && !record.content_type.starts_with("application/") {
        warn!(
            "[{}] '{}' has content type '{}', not a text or application type",
            request_id, record.file_name, record.content_type
        );
    }
    if record.file_size > LARGE_FILE_BYTES {
        warn!(
            "[{}] '{}' is large ({} bytes); downstream processing may need to be asynchronous",
            request_id, record.file_name, record.file_size
        );
    }
}

// Body-read failures happen before any gate; an oversized body is the caller's fault.
fn body_error(err: actix_web::Error) -> AppError {
    match err.as_error::<PayloadError>() {
        Some(PayloadError::Overflow) => AppError::PayloadTooLarge(err.to_string()),
        _ => AppError::InternalServerError(err.to_string()),
    }
}

pub async fn method_not_allowed(req: HttpRequest) -> Result<HttpResponse, AppError> {
    Err(AppError::MethodNotAllowed(format!("{} is not supported on {}, use POST", req.method(), req.path())))
}

pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, AppError> {
    Err(AppError::NotFound(format!("no route for {} {}", req.method(), req.path())))
}
