use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Numeric code families carried in every JSON response.
pub mod codes {
    /// Success
    pub const OK: i64 = 0;
    /// Click coordinates out of range
    pub const CLICK_NEGATIVE: i64 = 40002;
    /// Swipe coordinates out of range
    pub const SWIPE_NEGATIVE: i64 = 40012;
    /// Input text empty
    pub const INPUT_EMPTY: i64 = 40032;
    /// Input text over the length cap
    pub const INPUT_TOO_LONG: i64 = 40033;
    /// Unknown enter action
    pub const INPUT_BAD_ACTION: i64 = 40035;
    /// Upstream produced output of an unexpected shape
    pub const UPSTREAM_SHAPE: i64 = 50001;
    /// The ADB dispatch itself failed
    pub const UPSTREAM_ADB: i64 = 50002;
}

/// The `{code, message, data}` JSON envelope.
#[derive(Debug, Serialize)]
pub struct Envelope {
    /// Numeric code (`0` on success, `400xx`/`500xx` otherwise)
    pub code: i64,
    /// Short human-readable summary
    pub message: String,
    /// Payload, omitted when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    /// A 200 envelope with payload.
    pub fn ok(data: Value) -> Response {
        (
            StatusCode::OK,
            Json(Self {
                code: codes::OK,
                message: "ok".to_string(),
                data: Some(data),
            }),
        )
            .into_response()
    }

    /// A 400 validation envelope.
    pub fn validation(code: i64, message: impl Into<String>) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(Self {
                code,
                message: message.into(),
                data: None,
            }),
        )
            .into_response()
    }

    /// A 503 envelope for ADB/device failures.
    pub fn upstream(message: impl Into<String>) -> Response {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(Self {
                code: codes::UPSTREAM_ADB,
                message: message.into(),
                data: None,
            }),
        )
            .into_response()
    }

    /// A 500 envelope with a diagnostic payload for unexpected output.
    pub fn unexpected_shape(message: impl Into<String>, diagnostic: Value) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self {
                code: codes::UPSTREAM_SHAPE,
                message: message.into(),
                data: Some(diagnostic),
            }),
        )
            .into_response()
    }
}
