//! Migrate command - Apply the database schema

use crate::config::Config;
use crate::error::CliResult;
use ctct_sync::PgStore;

pub async fn execute(config: Config) -> CliResult<()> {
    let store = PgStore::connect(&config.database_url).await?;
    store.run_migrations().await?;
    println!("Migrations applied");
    Ok(())
}
