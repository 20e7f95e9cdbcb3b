//! OAuth2 tokens issued by Constant Contact.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An access/refresh token pair. The most recently inserted token is the
/// current one.
///
/// The [`Debug`] impl redacts both tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub scope: Option<String>,
    pub inserted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Token {
    /// Build a token from a token endpoint response received at `now`.
    #[must_use]
    pub fn issued(
        access_token: String,
        refresh_token: String,
        token_type: Option<String>,
        scope: Option<String>,
        expires_in_secs: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: token_type.unwrap_or_else(default_token_type),
            scope,
            inserted_at: now,
            expires_at: now + Duration::seconds(expires_in_secs),
        }
    }

    /// Whether the access token expires within `margin` of `now`.
    #[must_use]
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin >= self.expires_at
    }

    /// Value of the `Authorization` header.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("inserted_at", &self.inserted_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
