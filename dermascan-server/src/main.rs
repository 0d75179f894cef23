use clap::Parser;
use dermascan_core::DermascanConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use dermascan_server::server;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "dermascan.toml")]
    config: String,

    /// Check record store connectivity and exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match DermascanConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging: RUST_LOG wins over service.log_level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    if args.health {
        let store = match dermascan_core::create_store(&config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Record store unavailable: {}", e);
                std::process::exit(1);
            }
        };

        match store.health_check().await {
            Ok(v) => println!("✅ Record store ({}) reachable: {}", store.name(), v),
            Err(e) => {
                println!("❌ Record store ({}) check failed: {}", store.name(), e);
                std::process::exit(1);
            }
        }

        println!("✅ Dermascan health check passed");
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    if let Err(e) = server::run(config, tx.subscribe()).await {
        tracing::error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
