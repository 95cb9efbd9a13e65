use validator::Validate;

use crate::errors::AppError;

/// Runs derive-based validation and reports every failing field by its wire
/// name, in the order given by `fields` (rust name, wire name).
pub fn validate_payload<T: Validate>(
    payload: &T,
    fields: &[(&'static str, &'static str)],
) -> Result<(), AppError> {
    let errors = match payload.validate() {
        Ok(()) => return Ok(()),
        Err(errors) => errors,
    };

    let failed = errors.field_errors();
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(rust_name, wire_name)| failed.contains_key(rust_name) || failed.contains_key(wire_name))
        .map(|(_, wire_name)| *wire_name)
        .collect();

    if missing.is_empty() {
        return Err(AppError::InvalidPayload(errors.to_string()));
    }
    Err(AppError::MissingFields(missing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::upload::{UploadPayload, REQUIRED_FIELDS};
    use serde_json::json;

    fn check(body: serde_json::Value) -> Result<(), AppError> {
        let payload: UploadPayload = serde_json::from_value(body).unwrap();
        validate_payload(&payload, &REQUIRED_FIELDS)
    }

    #[test]
    fn accepts_complete_payload_with_zero_size() {
        let result = check(json!({
            "fileName": "a.txt",
            "bucketName": "b1",
            "fileSize": 0,
            "contentType": "text/plain",
            "timeCreated": "2024-01-01T00:00:00Z",
            "source": "gcs"
        }));
        assert!(result.is_ok());
    }

    #[test]
    fn reports_absent_null_and_empty_fields_in_order() {
        let result = check(json!({
            "fileName": "",
            "fileSize": "",
            "contentType": null,
            "timeCreated": "2024-01-01T00:00:00Z",
            "source": "gcs"
        }));

        match result {
            Err(AppError::MissingFields(fields)) => {
                assert_eq!(fields, vec!["fileName", "bucketName", "fileSize", "contentType"])
            }
            other => panic!("expected MissingFields, got {:?}", other),
        }
    }
}
