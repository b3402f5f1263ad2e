//! Input validation helpers
//!
//! Request DTOs carry `validator` attributes; handlers call [`validate_payload`]
//! before touching the database. Failures become `ValidationFailed` with a
//! per-field `fields` array in `details`.

use serde_json::{Value, json};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::utils::{AppError, AppResult};

/// Validate a request body
pub fn validate_payload<T: Validate>(payload: &T) -> AppResult<()> {
    payload.validate().map_err(into_app_error)
}

/// Convert `validator` errors into a 400 with the failing fields listed
pub fn into_app_error(errors: ValidationErrors) -> AppError {
    let mut fields = Vec::new();
    collect_fields(&errors, "", &mut fields);

    let message = match fields.first() {
        Some(first) => format!(
            "Invalid value for {}",
            first["field"].as_str().unwrap_or("request")
        ),
        None => "Request validation failed".to_string(),
    };

    AppError::validation(message).with_detail("fields", Value::Array(fields))
}

fn collect_fields(errors: &ValidationErrors, prefix: &str, out: &mut Vec<Value>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    out.push(json!({
                        "field": path,
                        "code": error.code,
                        "message": error.message.as_deref().unwrap_or_default(),
                    }));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_fields(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_fields(inner, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

/// Emails are compared case-insensitively; store them lowercased and trimmed
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ErrorCode;
    use shared::models::{DeliveryAddress, PaymentMethod, PlaceOrderRequest};

    #[test]
    fn test_nested_field_paths() {
        let req = PlaceOrderRequest {
            payment_method: PaymentMethod::Cash,
            delivery_address: DeliveryAddress {
                hostel_block: None,
                room_number: String::new(),
                floor: None,
                landmark: None,
            },
            special_instructions: None,
            discount: None,
        };

        let err = validate_payload(&req).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let details = err.details.unwrap();
        let fields = details["fields"].as_array().unwrap();
        assert_eq!(fields[0]["field"], "delivery_address.room_number");
        assert_eq!(fields[0]["code"], "length");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Asha@Example.COM "), "asha@example.com");
    }
}
