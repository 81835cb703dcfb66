//! Validated JSON extractor - Combines deserialization with validation.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::errors::AppError;

pub const BODY_NOT_AN_OBJECT: &str = "Request body must be a JSON object";

/// JSON body that has passed `validator` checks.
///
/// Unknown fields are dropped by deserialization. Payload fields are
/// [`Input`](crate::domain::Input)s, so missing or mistyped values surface
/// as validation errors and every violated rule is reported in one 400
/// response.
///
/// ```rust,ignore
/// async fn create_call(ValidatedJson(payload): ValidatedJson<NewCall>) { /* ... */ }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|e| AppError::operational(e.status(), e.body_text()))?;

        if !body.is_object() {
            return Err(AppError::validation(BODY_NOT_AN_OBJECT));
        }
        let value = T::deserialize(body).map_err(|e| AppError::validation(e.to_string()))?;

        value
            .validate()
            .map_err(|e| AppError::validation(format_validation_errors(&e)))?;

        Ok(ValidatedJson(value))
    }
}

/// All violations, ordered by field name, joined with `"; "`.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            let name = wire_name(field);
            errs.iter().map(move |e| describe(&name, e))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe(field: &str, error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    match error.code.as_ref() {
        "required" => format!("{} is required", field),
        "not_blank" => format!("{} must not be empty", field),
        _ => format!("{} is invalid", field),
    }
}

/// `password_confirm` -> `passwordConfirm`
fn wire_name(field: &str) -> String {
    let mut name = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            name.extend(c.to_uppercase());
            upper = false;
        } else {
            name.push(c);
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "name is too short"))]
        name: String,
        #[validate(email(message = "email must be a valid email"))]
        email: String,
    }

    #[test]
    fn test_all_violations_joined() {
        let sample = Sample {
            name: "x".into(),
            email: "nope".into(),
        };
        let errors = sample.validate().unwrap_err();
        assert_eq!(
            format_validation_errors(&errors),
            "email must be a valid email; name is too short"
        );
    }

    #[test]
    fn test_messages_fall_back_to_code_and_wire_name() {
        let mut errors = ValidationErrors::new();
        errors.add("customer_id", ValidationError::new("required"));
        errors.add("call_details", ValidationError::new("invalid"));
        errors.add("name", ValidationError::new("not_blank"));

        assert_eq!(
            format_validation_errors(&errors),
            "callDetails is invalid; customerId is required; name must not be empty"
        );
    }
}
