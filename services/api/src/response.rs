//! Success envelope shared by every endpoint

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiResult;

/// `{ "success": true, "message"?: ..., <key>: <payload> }`
#[derive(Debug)]
pub struct Envelope {
    status: StatusCode,
    body: Map<String, Value>,
}

impl Envelope {
    fn with_status(status: StatusCode) -> Self {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(true));
        Self { status, body }
    }

    /// 200 OK
    pub fn ok() -> Self {
        Self::with_status(StatusCode::OK)
    }

    /// 201 Created
    pub fn created() -> Self {
        Self::with_status(StatusCode::CREATED)
    }

    /// Attach a human-readable message
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.body
            .insert("message".to_string(), Value::String(message.into()));
        self
    }

    /// Attach a payload under `key`
    pub fn with(mut self, key: &str, payload: &impl Serialize) -> ApiResult<Self> {
        let value = serde_json::to_value(payload)
            .map_err(|e| anyhow::anyhow!("Failed to serialize {}: {}", key, e))?;
        self.body.insert(key.to_string(), value);
        Ok(self)
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.status, Json(Value::Object(self.body))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let envelope = Envelope::created()
            .message("Skill added.")
            .with("skill", &json!({ "title": "Rust" }))
            .unwrap();

        assert_eq!(envelope.status, StatusCode::CREATED);
        assert_eq!(
            Value::Object(envelope.body),
            json!({ "success": true, "message": "Skill added.", "skill": { "title": "Rust" } })
        );
    }
}
