//! Command implementations

pub mod auth;
pub mod import;
pub mod migrate;
pub mod records;

use crate::config::Config;
use crate::error::CliResult;
use ctct_client::CtctClient;
use ctct_sync::{Importer, PgStore, SyncManager};
use serde::Serialize;
use std::sync::Arc;

/// Database-backed client and store shared by the sync commands.
pub struct Context {
    pub store: Arc<PgStore>,
    pub client: CtctClient,
    config: Config,
}

impl Context {
    pub async fn connect(config: Config) -> CliResult<Self> {
        let store = Arc::new(PgStore::connect(&config.database_url).await?);
        let client = CtctClient::new(config.client.clone(), store.clone())?;
        Ok(Self {
            store,
            client,
            config,
        })
    }

    pub fn manager(&self) -> SyncManager<PgStore> {
        SyncManager::new(self.client.clone(), Arc::clone(&self.store))
            .with_preview(self.config.preview.clone())
    }

    pub fn importer(&self) -> Importer<PgStore> {
        Importer::new(self.client.clone(), Arc::clone(&self.store))
    }
}

/// Print a command result as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
