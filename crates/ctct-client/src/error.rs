//! Error types for Constant Contact API operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for client operations.
pub type CtctResult<T> = std::result::Result<T, CtctError>;

/// Errors returned by the Constant Contact client.
#[derive(Debug, Error)]
pub enum CtctError {
    /// Token endpoint failure, or the API rejected our credentials twice.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// No token has been stored yet.
    #[error("no OAuth token stored; complete the authorization code flow first")]
    NoToken,

    /// A value violates a vendor or local constraint. Raised before any
    /// request is sent (outbound) or before anything is stored (inbound).
    #[error(transparent)]
    Validation(#[from] FieldError),

    /// 429 from the API.
    #[error("rate limited by Constant Contact (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other 4xx, with the vendor's payload preserved.
    #[error("Constant Contact rejected the request ({status}): {payload}")]
    Client { status: u16, payload: ApiErrorPayload },

    /// 5xx from the API.
    #[error("Constant Contact server error ({status}): {payload}")]
    Server { status: u16, payload: ApiErrorPayload },

    #[error("resource not found: {0}")]
    NotFound(String),

    /// Connection failure or request timeout.
    #[error("Constant Contact unreachable: {0}")]
    Unreachable(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The resource does not support the requested verb.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The token store could not load or persist a token.
    #[error("token store error: {0}")]
    TokenStore(String),

    #[error("{operation} failed after {attempts} attempt(s): {last}")]
    MaxRetriesExceeded {
        operation: String,
        attempts: u32,
        #[source]
        last: Box<CtctError>,
    },
}

impl CtctError {
    /// Transient failures worth retrying as-is.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Unreachable(_))
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// HTTP status of the failed call, if there was one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::NotFound(_) => Some(404),
            Self::MaxRetriesExceeded { last, .. } => last.status(),
            _ => None,
        }
    }

    /// The vendor's error payload, looking through retry wrappers.
    #[must_use]
    pub fn payload(&self) -> Option<&ApiErrorPayload> {
        match self {
            Self::Client { payload, .. } | Self::Server { payload, .. } => Some(payload),
            Self::MaxRetriesExceeded { last, .. } => last.payload(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CtctError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::Unreachable(err.to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CtctError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Direction in which a field constraint was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Local value is too long for the vendor.
    Outbound,
    /// Vendor value is too long for local storage.
    Inbound,
}

/// A single field that failed a length or count constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{resource}.{field}: {detail}")]
pub struct FieldError {
    pub resource: &'static str,
    pub field: String,
    pub direction: Direction,
    pub detail: String,
}

impl FieldError {
    #[must_use]
    pub fn too_long(
        resource: &'static str,
        field: impl Into<String>,
        max: usize,
        actual: usize,
    ) -> Self {
        Self {
            resource,
            field: field.into(),
            direction: Direction::Outbound,
            detail: format!("{actual} characters exceeds the vendor maximum of {max}"),
        }
    }

    #[must_use]
    pub fn too_many(
        resource: &'static str,
        field: impl Into<String>,
        max: usize,
        actual: usize,
    ) -> Self {
        Self {
            resource,
            field: field.into(),
            direction: Direction::Outbound,
            detail: format!("{actual} entries exceeds the vendor maximum of {max}"),
        }
    }

    /// Convert local validation failures on an inbound record.
    #[must_use]
    pub fn inbound(resource: &'static str, errors: &validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Self {
            resource,
            field: if field.is_empty() { "<nested>".into() } else { field },
            direction: Direction::Inbound,
            detail: format!("vendor value does not fit local schema: {errors}"),
        }
    }
}

/// Error body returned by the API or the OAuth server.
///
/// The API answers with a list of `{error_key, error_message}` objects, the
/// OAuth server with `{error, error_description}`. Both shapes are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorPayload {
    pub error_key: Option<String>,
    pub error_message: Option<String>,
    /// The untouched body.
    pub raw: serde_json::Value,
}

impl ApiErrorPayload {
    /// Parse an error body, keeping non-JSON bodies as a string.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        let raw: serde_json::Value = serde_json::from_str(body)
            .unwrap_or_else(|_| serde_json::Value::String(body.to_string()));

        let first = match &raw {
            serde_json::Value::Array(items) => items.first(),
            other => Some(other),
        };

        let field = |keys: &[&str]| {
            first.and_then(|obj| {
                keys.iter()
                    .find_map(|k| obj.get(*k).and_then(|v| v.as_str()))
                    .map(str::to_string)
            })
        };

        Self {
            error_key: field(&["error_key", "error"]),
            error_message: field(&["error_message", "error_description"]),
            raw,
        }
    }

    /// Best human readable message.
    #[must_use]
    pub fn message(&self) -> String {
        if let Some(message) = &self.error_message {
            return message.clone();
        }
        match &self.raw {
            serde_json::Value::String(s) if !s.is_empty() => s.clone(),
            serde_json::Value::Null => "<no body>".to_string(),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for ApiErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_key {
            Some(key) => write!(f, "[{key}] {}", self.message()),
            None => f.write_str(&self.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_from_api_list() {
        let payload = ApiErrorPayload::from_body(
            r#"[{"error_key":"contacts.api.validation.error","error_message":"Email is invalid"}]"#,
        );
        assert_eq!(payload.error_key.as_deref(), Some("contacts.api.validation.error"));
        assert_eq!(payload.message(), "Email is invalid");
    }

    #[test]
    fn test_payload_from_oauth_dict() {
        let payload = ApiErrorPayload::from_body(
            r#"{"error":"invalid_grant","error_description":"The refresh token is invalid."}"#,
        );
        assert_eq!(payload.error_key.as_deref(), Some("invalid_grant"));
        assert_eq!(payload.message(), "The refresh token is invalid.");
    }

    #[test]
    fn test_payload_from_plain_text() {
        let payload = ApiErrorPayload::from_body("Bad Gateway");
        assert!(payload.error_key.is_none());
        assert_eq!(payload.message(), "Bad Gateway");
    }

    #[test]
    fn test_retry_wrapper_exposes_payload() {
        let inner = CtctError::Server {
            status: 503,
            payload: ApiErrorPayload::from_body(r#"[{"error_message":"down"}]"#),
        };
        let err = CtctError::MaxRetriesExceeded {
            operation: "GET /contacts".into(),
            attempts: 4,
            last: Box::new(inner),
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.payload().unwrap().message(), "down");
    }

    #[test]
    fn test_classification() {
        assert!(CtctError::RateLimited { retry_after_secs: None }.is_retryable());
        assert!(CtctError::Unreachable("x".into()).is_retryable());
        assert!(!CtctError::NotFound("x".into()).is_retryable());
        assert!(CtctError::Server {
            status: 500,
            payload: ApiErrorPayload::default()
        }
        .is_server_error());
    }
}
