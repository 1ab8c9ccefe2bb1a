use backoffice::{app, config::AppConfig, migration::Migrator, telemetry};
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "backoffice")]
#[command(about = "Multi-tenant back-office API")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (defaults to ./backoffice.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database URL override
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Port override
    #[arg(short, long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations and serve the API (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate {
        /// Roll back every migration instead
        #[arg(long)]
        down: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    let command = cli.command.unwrap_or(Commands::Serve);
    config.validate()?;
    telemetry::init(&config.logging);

    let db = app::connect(&config.database).await?;

    match command {
        Commands::Migrate { down: true } => {
            Migrator::down(&db, None).await?;
            tracing::info!("Rolled back all migrations");
        }
        Commands::Migrate { down: false } => {
            Migrator::up(&db, None).await?;
            tracing::info!("Migrations applied");
        }
        Commands::Serve => {
            Migrator::up(&db, None).await?;
            let address = config.bind_address();
            let listener = tokio::net::TcpListener::bind(&address).await?;
            tracing::info!(%address, "Serving back-office API");
            axum::serve(listener, app::build_router(db)).await?;
        }
    }
    Ok(())
}
