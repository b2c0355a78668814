// ============================
// crates/backend-bin/src/main.rs
// ============================
//! Tokio / Axum entry-point for the auth server.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use backend_lib::{
    config::{LogFormat, LogSettings, Settings},
    mailer,
    router::create_router,
    storage::{CredentialStore, MemoryStore, PgStore},
    AppState,
};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "auth-server", version, about = "Credential and session authentication server")]
struct Cli {
    /// Config file; defaults to ./config.toml when present
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Keep all data in process memory instead of Postgres
        #[arg(long)]
        in_memory: bool,
    },
    /// Apply database migrations and exit
    Migrate,
    /// Delete expired sessions and verification tokens, then exit
    PurgeExpired,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    init_tracing(&settings.log);

    match cli.command.unwrap_or(Command::Serve { in_memory: false }) {
        Command::Serve { in_memory: true } => {
            tracing::warn!("running with the in-memory store; data is lost on exit");
            serve(MemoryStore::new(), settings).await
        },
        Command::Serve { in_memory: false } => {
            let store = PgStore::connect(&settings.database).await?;
            if settings.database.run_migrations {
                store.migrate().await?;
            }
            serve(store, settings).await
        },
        Command::Migrate => {
            PgStore::connect(&settings.database).await?.migrate().await?;
            Ok(())
        },
        Command::PurgeExpired => {
            let store = PgStore::connect(&settings.database).await?;
            let stats = store.purge_expired(chrono::Utc::now()).await?;
            tracing::info!(
                sessions = stats.sessions,
                verifications = stats.verifications,
                "purged expired rows"
            );
            Ok(())
        },
    }
}

fn init_tracing(log: &LogSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve<S: CredentialStore + 'static>(store: S, settings: Settings) -> anyhow::Result<()> {
    let addr = settings.bind_addr()?;
    let transport = mailer::from_settings(&settings.mail).context("failed to build mailer")?;

    let (state, mail_worker) = AppState::new(store, settings, transport)?;
    let app = create_router(Arc::new(state));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // the router (and every mail handle) is gone; let the backlog drain
    if let Err(e) = mail_worker.await {
        tracing::error!(error = %e, "mail worker panicked");
    }
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
