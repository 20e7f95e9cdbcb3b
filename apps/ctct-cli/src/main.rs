//! ctct CLI - Operator interface for Constant Contact synchronization
//!
//! This CLI enables operators to:
//! - Authorize the application (authorization URL, code exchange)
//! - Apply the database schema
//! - Import the account, refresh campaign statistics and opt-outs
//! - Push, pull and delete single records and reconcile list memberships

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod error;
mod logging;

use commands::{auth, import, migrate, records, Context};
use config::Config;
use error::CliResult;
use logging::LogFormat;

/// ctct CLI - Constant Contact synchronization
#[derive(Parser)]
#[command(name = "ctct")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, global = true, env = "CTCT_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the URL that grants this application access
    AuthUrl(commands::auth::AuthUrlArgs),

    /// Exchange an authorization code for tokens
    ExchangeCode(commands::auth::ExchangeCodeArgs),

    /// Apply database migrations
    Migrate,

    /// Import lists, custom fields, contacts and campaigns
    Import,

    /// Refresh campaign statistics
    Stats,

    /// Record contacts who unsubscribed
    OptOuts,

    /// Create or update a stored record remotely
    Push(commands::records::LocalArgs),

    /// Fetch a record by Constant Contact id
    Pull(commands::records::PullArgs),

    /// Delete a record remotely, then locally
    Delete(commands::records::LocalArgs),

    /// Reconcile a list's remote members with local memberships
    Memberships(commands::records::MembershipsArgs),

    /// Run a sync job given as JSON
    Run(commands::records::RunArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level, cli.log_format);

    match run(cli.command).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(command: Commands) -> CliResult<()> {
    let config = Config::from_env()?;

    match command {
        Commands::AuthUrl(args) => auth::auth_url(args, config).await,
        Commands::ExchangeCode(args) => auth::exchange_code(args, config).await,
        Commands::Migrate => migrate::execute(config).await,
        Commands::Import => import::import(&Context::connect(config).await?).await,
        Commands::Stats => import::stats(&Context::connect(config).await?).await,
        Commands::OptOuts => import::opt_outs(&Context::connect(config).await?).await,
        Commands::Push(args) => run_job(config, records::push_job(&args)).await,
        Commands::Pull(args) => run_job(config, records::pull_job(&args)).await,
        Commands::Delete(args) => run_job(config, records::delete_job(&args)).await,
        Commands::Memberships(args) => run_job(config, records::memberships_job(&args)).await,
        Commands::Run(args) => {
            let job = records::parse_job(&args)?;
            run_job(config, job).await
        }
    }
}

async fn run_job(config: Config, job: ctct_sync::SyncJob) -> CliResult<()> {
    records::run(&Context::connect(config).await?, job).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_push_parses_kind_and_id() {
        let id = ctct_core::LocalId::new();
        let cli = Cli::try_parse_from(["ctct", "push", "contact", &id.to_string()]).unwrap();
        match cli.command {
            Commands::Push(args) => {
                assert_eq!(args.kind, commands::records::Kind::Contact);
                assert_eq!(args.id, id);
            }
            _ => panic!("expected push"),
        }
    }

    #[test]
    fn test_log_format_flag() {
        let cli = Cli::try_parse_from(["ctct", "--log-format", "json", "stats"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_malformed_id() {
        assert!(Cli::try_parse_from(["ctct", "delete", "list", "not-a-uuid"]).is_err());
    }
}
