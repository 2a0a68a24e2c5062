//! Request body validation
//!
//! [`ValidatedJson`] parses a JSON body into a schema type, runs its
//! `validator` rules and hands the handler the schema's typed output. Any
//! failure short-circuits with `400 Bad Request`:
//!
//! ```json
//! { "message": "invalid body", "errors": { "email": "email is required" } }
//! ```
//!
//! Only the first message for each field is reported. A field whose value
//! has the wrong JSON type is treated as missing.

use std::collections::BTreeMap;

use axum::{
    Json,
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::warn;
use validator::{Validate, ValidationErrors};

/// Field name to first error message
pub type FieldErrors = BTreeMap<String, String>;

/// A body schema: what the client sends, and what the handler gets once the
/// rules pass
pub trait BodySchema: DeserializeOwned + Validate + Send {
    /// Typed data handed to the handler
    type Output: Send;

    /// Convert a validated schema into its output
    fn into_output(self) -> Self::Output;
}

/// Rejection produced when a body does not satisfy its schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationRejection {
    pub errors: FieldErrors,
}

impl ValidationRejection {
    /// A rejection carrying one field error
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), message.into());
        Self { errors }
    }
}

impl From<&ValidationErrors> for ValidationRejection {
    fn from(errors: &ValidationErrors) -> Self {
        let errors = errors
            .field_errors()
            .into_iter()
            .filter_map(|(field, field_errors)| {
                let first = field_errors.first()?;
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| first.code.to_string());
                Some((field.to_string(), message))
            })
            .collect();

        Self { errors }
    }
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "message": "invalid body",
            "errors": self.errors,
        }));

        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

/// Extractor that validates a JSON body against schema `T`
///
/// An empty body is read as `{}` so that missing fields are reported by the
/// schema's own "required" messages.
pub struct ValidatedJson<T: BodySchema>(pub T::Output);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: BodySchema,
{
    type Rejection = ValidationRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ValidationRejection::single("body", rejection.body_text()))?;

        let schema: T = parse_body(&bytes)?;

        if let Err(errors) = schema.validate() {
            let rejection = ValidationRejection::from(&errors);
            warn!(fields = ?rejection.errors.keys().collect::<Vec<_>>(), "Rejected invalid body");
            return Err(rejection);
        }

        Ok(Self(schema.into_output()))
    }
}

fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ValidationRejection> {
    let value = if bytes.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice::<Value>(bytes)
            .map_err(|e| ValidationRejection::single("body", format!("malformed JSON: {}", e)))?
    };

    let Value::Object(mut fields) = value else {
        return Err(ValidationRejection::single("body", "expected a JSON object"));
    };

    let error = match serde_json::from_value::<T>(Value::Object(fields.clone())) {
        Ok(schema) => return Ok(schema),
        Err(e) => e,
    };

    // A field of the wrong type reads as absent, so the schema's own rules
    // report it under its name. Needs a schema that accepts `{}`.
    if serde_json::from_value::<T>(Value::Object(Map::new())).is_err() {
        return Err(ValidationRejection::single("body", error.to_string()));
    }

    let mistyped: Vec<String> = fields
        .iter()
        .filter(|(name, value)| !fits_schema::<T>(name, value))
        .map(|(name, _)| name.clone())
        .collect();
    if mistyped.is_empty() {
        return Err(ValidationRejection::single("body", error.to_string()));
    }

    warn!(fields = ?mistyped, "Dropping mistyped body fields");
    for name in &mistyped {
        fields.remove(name);
    }

    serde_json::from_value(Value::Object(fields))
        .map_err(|e| ValidationRejection::single("body", e.to_string()))
}

fn fits_schema<T: DeserializeOwned>(name: &str, value: &Value) -> bool {
    let mut single = Map::new();
    single.insert(name.to_string(), value.clone());
    serde_json::from_value::<T>(Value::Object(single)).is_ok()
}
