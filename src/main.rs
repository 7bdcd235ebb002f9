//! Kindergarten administration service
//!
//! Main application entry point

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};

use kindergarten::{
    config::Settings,
    database::{create_pool, run_migrations, DatabaseService},
    http::{create_router, AppState},
    services::ServiceFactory,
    utils::logging,
};

#[derive(Debug, Parser)]
#[command(name = "kindergarten", version, about = "Kindergarten administration service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run migrations and serve the HTTP API (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Create a superuser account
    CreateSuperuser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        email: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    settings.validate()?;

    // Held until exit so buffered file logs are flushed
    let _log_guard = logging::init_logging(&settings.logging)?;
    info!("Starting {}", kindergarten::info());

    info!("Connecting to database...");
    let pool = create_pool(&settings.database).await?;

    info!("Running database migrations...");
    run_migrations(&pool).await?;

    let db = DatabaseService::new(pool);
    let services = ServiceFactory::new(db, &settings);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => {
            info!("Migrations applied");
        }
        Command::CreateSuperuser { username, password, email } => {
            let account = services
                .accounts
                .create_superuser(&username, &password, email.as_deref())
                .await?;
            info!(account_id = account.id, username = %account.username, "Superuser created");
        }
        Command::Serve => serve(services, settings).await?,
    }

    Ok(())
}

async fn serve(services: ServiceFactory, settings: Settings) -> anyhow::Result<()> {
    let health = services.health_check().await;
    for issue in health.get_issues() {
        warn!("Health check issue: {}", issue);
    }

    let address = settings.bind_address();
    let router = create_router(AppState::new(services, settings));

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!("Listening on http://{}", address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
    }
}
