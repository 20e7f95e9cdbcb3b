//! Authorization code flow commands

use super::Context;
use crate::config::Config;
use crate::error::CliResult;
use clap::Args;
use ctct_client::{CredentialProvider, MemoryTokenStore};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Arguments for the auth-url command
#[derive(Args)]
pub struct AuthUrlArgs {
    /// Opaque value echoed back to the redirect URI (random if omitted)
    #[arg(long)]
    pub state: Option<String>,
}

/// Print the URL the account owner visits to grant access.
pub async fn auth_url(args: AuthUrlArgs, config: Config) -> CliResult<()> {
    let state = args
        .state
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    // Building the URL needs no stored token, so skip the database.
    let provider = CredentialProvider::new(
        config.client.oauth,
        reqwest::Client::new(),
        Arc::new(MemoryTokenStore::new()),
    );
    println!("{}", provider.authorization_url(&state)?);
    Ok(())
}

/// Arguments for the exchange-code command
#[derive(Args)]
pub struct ExchangeCodeArgs {
    /// The `code` query parameter received on the redirect URI
    pub code: String,
}

/// Trade an authorization code for tokens and store them.
pub async fn exchange_code(args: ExchangeCodeArgs, config: Config) -> CliResult<()> {
    let context = Context::connect(config).await?;
    let token = context
        .client
        .credentials()
        .exchange_code(args.code.trim())
        .await?;
    info!(expires_at = %token.expires_at, "Authorization complete");
    println!("Token stored; expires at {}", token.expires_at);
    Ok(())
}
