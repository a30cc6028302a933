//! # Binge Server
//!
//! GraphQL service for tracking what you watch.
//!
//! - **Search**: TMDB series search with on-demand import of whole series trees
//! - **Watch-throughs**: ordered passes over a series with next-episode and
//!   unfinished-episode tracking
//! - **History**: watches and skips, with or without a watch-through
//!
//! Built on axum and async-graphql, backed by PostgreSQL.

use std::sync::Arc;

use anyhow::Context;
use binge_core::{PostgresDatabase, TmdbClient};
use binge_server::{
    AppState,
    infra::config::{Config, ServeArgs},
    routes,
};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "binge-server")]
#[command(about = "GraphQL service for TV series watch tracking")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file_loaded = dotenvy::dotenv().is_ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if env_file_loaded {
        info!("Loaded environment from .env");
    }

    match cli.command {
        Some(Command::Db(DbCommand::Migrate)) => {
            run_db_migrate(&cli.serve).await
        }
        Some(Command::Serve) | None => run_server(cli.serve).await,
    }
}

async fn run_db_migrate(args: &ServeArgs) -> anyhow::Result<()> {
    let db =
        PostgresDatabase::connect(&args.database_url, args.db_max_connections)
            .await
            .context("failed to connect to PostgreSQL for migration")?;
    db.migrate().await.context("database migration failed")?;
    info!("Database migrations applied successfully");
    Ok(())
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let config = Config::from_args(args).context("invalid configuration")?;
    let addr = config.bind_addr()?;

    let db = PostgresDatabase::connect(
        &config.database.url,
        config.database.max_connections,
    )
    .await
    .context("failed to connect to PostgreSQL")?;

    if config.run_migrations {
        db.migrate().await.context("database migration failed")?;
    } else {
        info!("Skipping migrations");
    }

    let stats = db.pool_stats();
    info!(
        "Database pool ready: {} connections ({} idle, max {})",
        stats.size, stats.idle, stats.max_size
    );

    let provider = Arc::new(TmdbClient::with_base_url(
        config.tmdb.access_token.clone(),
        config.tmdb.api_base.clone(),
    ));
    let state = AppState::new(db.unit_of_work(), provider);
    let router = routes::create_router(state);

    info!(
        "Starting Binge server on {}:{}",
        config.server.host, config.server.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", err);
    }
    info!("Shutdown signal received");
}
