//! epic-server - EPIC survey backend
//!
//! Serves the REST API, admin spreadsheet import and PDF report over a
//! single SQLite database in the root folder.

use anyhow::Result;
use clap::Parser;
use epic_common::config::{CliOverrides, ServerConfig};
use epic_common::db::init_database;
use epic_server::db::users;
use epic_server::{build_router, AppState};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "epic-server", version, about = "EPIC survey backend")]
struct Args {
    /// Root folder holding epic.db
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Staff account created at startup if missing
    #[arg(long, env = "EPIC_ADMIN_USERNAME", requires = "admin_password")]
    admin_username: Option<String>,

    #[arg(long, env = "EPIC_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Resolved before tracing so `[logging] level` can seed the filter
    let config = ServerConfig::resolve(CliOverrides {
        root_folder: args.root_folder,
        host: args.host,
        port: args.port,
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "Starting EPIC server (epic-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    config.ensure_root_folder()?;
    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    if let (Some(username), Some(password)) = (&args.admin_username, &args.admin_password) {
        let admin = users::ensure_staff_user(&pool, username, password).await?;
        info!("Staff account '{}' available (id {})", admin.username, admin.id);
    }

    let app = build_router(AppState::new(pool));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("epic-server listening on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app).await?;

    Ok(())
}
