//! CLI error types and exit codes

use crate::config::ConfigError;
use ctct_client::CtctError;
use ctct_sync::{StoreError, SyncError};
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error
/// - 2: Authentication required
/// - 3: Network error
/// - 4: Validation error
/// - 5: Server error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

impl From<CtctError> for CliError {
    fn from(e: CtctError) -> Self {
        Self::Sync(SyncError::Remote(e))
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::Sync(SyncError::Store(e))
    }
}

impl CliError {
    fn remote(&self) -> Option<&CtctError> {
        match self {
            Self::Sync(SyncError::Remote(e)) => Some(e),
            _ => None,
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match (self, self.remote()) {
            (_, Some(CtctError::Auth(_) | CtctError::NoToken)) => 2,
            (_, Some(CtctError::Unreachable(_))) => 3,
            (_, Some(CtctError::Validation(_))) => 4,
            (_, Some(e)) if e.status().is_some_and(|s| s >= 500) => 5,
            (Self::Sync(SyncError::Validation { .. }), _) => 4,
            (Self::Config(_), _) => 4,
            _ => 1,
        }
    }

    /// Print the error (and a suggested action) to stderr
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {self}");
        } else {
            eprintln!("Error: {self}");
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {suggestion}");
            } else {
                eprintln!("\nSuggestion: {suggestion}");
            }
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match (self, self.remote()) {
            (_, Some(CtctError::NoToken | CtctError::Auth(_))) => {
                Some("Run 'ctct auth-url', authorize the app, then 'ctct exchange-code <CODE>'.")
            }
            (Self::Config(_), _) => Some("Check the CTCT_* and DATABASE_URL environment variables."),
            (Self::Sync(SyncError::NotSynced { .. }), _) => {
                Some("Push the record (or the records it references) first.")
            }
            _ => None,
        }
    }
}
