//! Constant Contact v3 API client.
//!
//! Wraps the REST API behind a rate-limited, retrying [`CtctClient`]:
//!
//! - OAuth2 authorization code flow with single-flight token refresh
//!   ([`CredentialProvider`], [`TokenStore`])
//! - process-wide request throttling ([`RateLimiter`])
//! - exponential backoff for 429, 5xx and network failures ([`RetryPolicy`])
//! - per-resource metadata and vendor field limits ([`ResourceDescriptor`])
//! - conversion between local records and vendor JSON ([`RemoteResource`])

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod resource;
pub mod retry;
pub mod serializer;

pub use auth::{CredentialProvider, MemoryTokenStore, TokenStore};
pub use client::{CtctClient, DeleteOutcome};
pub use config::{ClientConfig, OAuthConfig};
pub use error::{ApiErrorPayload, CtctError, CtctResult, Direction, FieldError};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use resource::{ResourceDescriptor, ResourceKind, Verb};
pub use retry::RetryPolicy;
pub use serializer::{apply_summary, extract_remote_id, RemoteRefs, RemoteResource};
