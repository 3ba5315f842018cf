//! API error payload and status mapping.
//!
//! One error shape for every endpoint: `{code, message, traceId?, details?}`.
//! The `code` enum is the stable machine-readable contract; the three
//! credential-rejection codes keep their upper-case wire spelling because
//! clients dispatch on them.

use crate::middleware::trace::{TRACE_ID_HEADER, TraceId};
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;
use utoipa::ToSchema;

/// Stable machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// A credential is required but none was presented.
    Unauthorized,
    /// The presented credential has expired.
    #[serde(rename = "TOKEN_EXPIRED")]
    TokenExpired,
    /// The presented credential failed cryptographic verification.
    #[serde(rename = "INVALID_TOKEN")]
    TokenInvalid,
    /// The presented credential has been revoked by the identity authority.
    #[serde(rename = "TOKEN_REVOKED")]
    TokenRevoked,
    /// The requested resource does not exist.
    NotFound,
    /// The request conflicts with existing state.
    Conflict,
    /// The payment gateway rejected an upstream call.
    BadGateway,
    /// The payment gateway did not answer within the deadline.
    GatewayTimeout,
    /// A dependency is temporarily unavailable.
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    InternalError,
}

/// API error response payload.
///
/// # Examples
/// ```
/// use backend::models::{Error, ErrorCode};
///
/// let err = Error::not_found("missing");
/// assert_eq!(err.code, ErrorCode::NotFound);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    /// Stable machine-readable error code.
    #[schema(example = "invalid_request")]
    pub code: ErrorCode,
    /// Human-readable error message.
    #[schema(example = "Something went wrong")]
    pub message: String,
    /// Correlation identifier for tracing this error across systems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Supplementary structured details, e.g. field-level validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Error {
    /// Create a new error, capturing the active trace identifier when one is
    /// in scope.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            trace_id: TraceId::current().map(|id| id.to_string()),
            details: None,
        }
    }

    /// Attach structured details to the error.
    ///
    /// # Examples
    /// ```
    /// use backend::models::Error;
    /// use serde_json::json;
    ///
    /// let err = Error::invalid_request("bad").with_details(json!({ "field": "amount" }));
    /// assert!(err.details.is_some());
    /// ```
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Convenience constructor for [`ErrorCode::TokenExpired`].
    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TokenExpired, message)
    }

    /// Convenience constructor for [`ErrorCode::TokenInvalid`].
    pub fn token_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TokenInvalid, message)
    }

    /// Convenience constructor for [`ErrorCode::TokenRevoked`].
    pub fn token_revoked(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TokenRevoked, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Convenience constructor for [`ErrorCode::BadGateway`].
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadGateway, message)
    }

    /// Convenience constructor for [`ErrorCode::GatewayTimeout`].
    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::GatewayTimeout, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        // Do not leak framework internals to clients.
        error!(error = %err, "actix error promoted to API error");
        Self::internal("Internal server error")
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

impl ErrorCode {
    fn as_status_code(self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid | Self::TokenRevoked => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::BadGateway => StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        self.code.as_status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = &self.trace_id {
            builder.insert_header((TRACE_ID_HEADER, id.clone()));
        }
        if matches!(self.code, ErrorCode::InternalError) {
            let mut redacted = self.clone();
            redacted.message = "Internal server error".to_owned();
            redacted.details = None;
            return builder.json(redacted);
        }
        builder.json(self)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for status mapping and wire formats.

    use super::*;
    use actix_web::body::to_bytes;
    use rstest::rstest;
    use serde_json::{Value, json};

    #[rstest]
    #[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
    #[case(Error::unauthorized("no credential"), StatusCode::UNAUTHORIZED)]
    #[case(Error::token_expired("stale"), StatusCode::UNAUTHORIZED)]
    #[case(Error::token_invalid("forged"), StatusCode::UNAUTHORIZED)]
    #[case(Error::token_revoked("revoked"), StatusCode::UNAUTHORIZED)]
    #[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
    #[case(Error::conflict("dup"), StatusCode::CONFLICT)]
    #[case(Error::bad_gateway("refused"), StatusCode::BAD_GATEWAY)]
    #[case(Error::gateway_timeout("slow"), StatusCode::GATEWAY_TIMEOUT)]
    #[case(Error::service_unavailable("down"), StatusCode::SERVICE_UNAVAILABLE)]
    #[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn status_codes_follow_the_error_code(#[case] err: Error, #[case] expected: StatusCode) {
        assert_eq!(err.status_code(), expected);
    }

    #[rstest]
    #[case(ErrorCode::TokenExpired, "TOKEN_EXPIRED")]
    #[case(ErrorCode::TokenInvalid, "INVALID_TOKEN")]
    #[case(ErrorCode::TokenRevoked, "TOKEN_REVOKED")]
    #[case(ErrorCode::InvalidRequest, "invalid_request")]
    #[case(ErrorCode::GatewayTimeout, "gateway_timeout")]
    fn codes_serialise_to_their_wire_spelling(#[case] code: ErrorCode, #[case] wire: &str) {
        let serialised = serde_json::to_value(code).expect("serialise code");
        assert_eq!(serialised, Value::String(wire.to_owned()));
    }

    #[actix_web::test]
    async fn internal_errors_are_redacted() {
        let err = Error::internal("secret stack trace").with_details(json!({"secret": true}));
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body()).await.expect("body bytes");
        let payload: Value = serde_json::from_slice(&bytes).expect("error JSON");
        assert_eq!(
            payload.get("message").and_then(Value::as_str),
            Some("Internal server error")
        );
        assert!(payload.get("details").is_none());
    }

    #[actix_web::test]
    async fn client_errors_keep_message_and_details() {
        let err = Error::invalid_request("amount must be positive")
            .with_details(json!({"field": "amount"}));
        let response = err.error_response();
        let bytes = to_bytes(response.into_body()).await.expect("body bytes");
        let payload: Value = serde_json::from_slice(&bytes).expect("error JSON");
        assert_eq!(
            payload.get("message").and_then(Value::as_str),
            Some("amount must be positive")
        );
        assert_eq!(
            payload.pointer("/details/field").and_then(Value::as_str),
            Some("amount")
        );
    }

    #[tokio::test]
    async fn new_captures_the_active_trace_id() {
        let trace_id = crate::middleware::trace::TraceId::generate();
        let expected = trace_id.to_string();
        let err = crate::middleware::trace::TraceId::scope(trace_id, async move {
            Error::internal("boom")
        })
        .await;
        assert_eq!(err.trace_id.as_deref(), Some(expected.as_str()));
    }
}
