use anyhow::{Context, Result};
use asset_lifecycle::{config, migrator::Migrator};
use clap::{Parser, Subcommand};
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "ams-migrate", about = "Manage the asset store schema", version)]
struct Cli {
    /// Store URL; falls back to the loaded configuration
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Option<MigrateCommand>,
}

#[derive(Subcommand, Default)]
enum MigrateCommand {
    /// Apply pending migrations (default)
    #[default]
    Up,
    /// Roll back the last `steps` migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Drop every table and re-apply all migrations
    Fresh,
    /// Show applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let app_config = config::load_config().context("failed to load application config")?;
    config::init_tracing(app_config.log_level(), app_config.log_json);

    let database_url = cli.database_url.unwrap_or(app_config.database_url);
    info!("Connecting to database for migrations");

    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(2)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .context("failed to connect to database")?;

    match cli.command.unwrap_or_default() {
        MigrateCommand::Up => {
            Migrator::up(&db, None).await?;
            info!("Migrations applied");
        }
        MigrateCommand::Down { steps } => {
            Migrator::down(&db, Some(steps)).await?;
            info!(steps, "Migrations rolled back");
        }
        MigrateCommand::Fresh => {
            Migrator::fresh(&db).await?;
            info!("Schema recreated");
        }
        MigrateCommand::Status => Migrator::status(&db).await?,
    }

    Ok(())
}
