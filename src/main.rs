mod challenges;
mod config;
mod providers;
mod server;
mod store;
mod traits;
mod types;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Handle CLI arguments
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--version" | "-V" => {
                println!("shelfmark {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                println!("shelfmark {}", env!("CARGO_PKG_VERSION"));
                println!("{}\n", env!("CARGO_PKG_DESCRIPTION"));
                println!("Usage: shelfmark\n");
                println!("Configuration is read from config.toml in the working directory");
                println!("(all keys optional). GEMINI_API_KEY overrides provider.api_key.\n");
                println!("Options:");
                println!("  -h, --help       Print help");
                println!("  -V, --version    Print version");
                return Ok(());
            }
            _ => {}
        }
    }

    let config = config::AppConfig::load_or_default(&PathBuf::from("config.toml"))?;

    // Run async
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config))
}

async fn run(config: config::AppConfig) -> anyhow::Result<()> {
    if config.provider.api_key.is_empty() {
        tracing::warn!(
            "No Gemini API key configured; challenge compilation will fail until \
             provider.api_key or GEMINI_API_KEY is set"
        );
    }

    let store = Arc::new(store::SqliteStore::new(&config.database.db_path).await?);
    let generator = providers::build_generator(&config.provider)?;
    let challenges = challenges::ChallengeService::new(store.clone(), generator);

    let state = server::AppState { store, challenges };
    server::start_server(state, &config.server.bind_addr, config.server.port).await
}
