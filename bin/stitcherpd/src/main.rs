//! `stitcherpd` — the garment factory production server.
//!
//! Usage:
//!   stitcherpd --data-dir /var/lib/stitcherp [--listen 0.0.0.0:8080]

mod routes;

use std::sync::Arc;

use clap::Parser;
use stitcherp_core::Module;
use tracing::info;

/// Garment production tracking server.
#[derive(Parser, Debug)]
#[command(name = "stitcherpd", about = "Garment production tracking server")]
struct Cli {
    /// Directory holding all persistent data.
    #[arg(long = "data-dir")]
    data_dir: Option<std::path::PathBuf>,

    /// Path to the SQLite database file (defaults to {data-dir}/data.sqlite).
    #[arg(long = "sqlite")]
    sqlite: Option<std::path::PathBuf>,

    /// Listen address.
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = stitcherp_core::ServiceConfig {
        data_dir: cli.data_dir.clone(),
        sqlite_path: cli.sqlite.clone(),
        listen: cli.listen.clone(),
    };

    if let Some(dir) = &config.data_dir {
        std::fs::create_dir_all(dir)?;
    }

    let sql: Arc<dyn stitcherp_sql::SQLStore> = Arc::new(
        stitcherp_sql::SqliteStore::open(&config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );

    let mfg_module = stitcherp_mfg::MfgModule::new(Arc::clone(&sql))
        .map_err(|e| anyhow::anyhow!("failed to initialize mfg module: {}", e))?;
    info!("Manufacturing module initialized");

    let module_routes = vec![(mfg_module.name().to_string(), mfg_module.routes())];
    let app = routes::build_router(module_routes);

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    info!("stitcherpd listening on {}", config.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
