//! Lead-generation gate server.
//!
//! Serves the registration-gated download API backed by PostgreSQL, with
//! JWT authentication and optional SMTP welcome emails.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Error;
use ctrlc::set_handler;
use leadflow::{
    AuthManager, Database, FileManager, Mailer,
};
use lf_server::{api, config::ServerConfig, logging};
use pico_args::Arguments;
use tracing::info;

const HELP: &str = "\
Run the lead-generation gate server

USAGE:
  lf_server [OPTIONS]

OPTIONS:
  --bind         IP:PORT    Server socket bind address   [default: env SERVER_BIND or 127.0.0.1:5000]
  --db-url       URL        Database connection string   [default: env DATABASE_URL]
  --content-dir  PATH       Upload storage directory     [default: env CONTENT_DIR or uploads]
  --reset-admin-password PW Reset the admin password and exit

FLAGS:
  -h, --help                Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:5000)
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               JWT signing secret (required)
  PASSWORD_PEPPER          Password hashing pepper (required)
  CONTENT_DIR              Upload storage directory
  PUBLIC_URL               External base URL for download links
  SMTP_HOST                Mail relay hostname (email disabled when unset)
  EMAIL_FROM               Sender address for welcome emails
  SMTP_USERNAME            Mail relay username (optional)
  SMTP_PASSWORD            Mail relay password (optional)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    content_dir: Option<PathBuf>,
    reset_admin_password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        content_dir: pargs.opt_value_from_str("--content-dir")?,
        reset_admin_password: pargs.opt_value_from_str("--reset-admin-password")?,
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.content_dir)?;
    config.validate()?;

    info!("Connecting to database: {}", config.database.database_url);
    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    db.migrate()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database connected and migrated");

    let pool = Arc::new(db.pool().clone());
    let auth_manager = Arc::new(AuthManager::new(
        pool.clone(),
        config.security.password_pepper.clone(),
        config.security.jwt_secret.clone(),
    ));

    // Maintenance path: rotate the admin credential and exit.
    if let Some(new_password) = args.reset_admin_password {
        let admin = auth_manager
            .reset_admin_password(&new_password)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to reset admin password: {}", e))?;
        info!("Admin password reset for {}", admin.email);
        return Ok(());
    }

    tokio::fs::create_dir_all(&config.content_dir)
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to create content directory {}: {}",
                config.content_dir.display(),
                e
            )
        })?;

    let file_manager = Arc::new(FileManager::new(
        pool.clone(),
        config.content_dir.clone(),
    ));

    let mailer = Mailer::from_env().map(Arc::new);
    match &mailer {
        Some(_) => info!("SMTP configured, welcome emails enabled"),
        None => info!("SMTP not configured, welcome emails disabled"),
    }

    let state = api::AppState {
        auth_manager,
        file_manager,
        mailer,
        pool,
        public_url: config.public_url.clone(),
    };

    let app = api::create_router(state);

    info!("Starting HTTP server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("Failed to install CTRL+C signal handler");
    }
}
