mod auth;
mod config;
mod error;
mod store;
mod voting;
mod web;

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use config::{Config, StoreKind};
use store::{MemoryStore, StoreError, VotingStore};
use web::db::{self, PgStore};
use web::AppState;

fn open_store(config: &Config) -> Result<Arc<dyn VotingStore>, StoreError> {
    match (config.store, config.database_url.as_deref()) {
        (StoreKind::Memory, _) => {
            warn!("using the in-memory store; nothing survives a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        (StoreKind::Postgres, Some(url)) => {
            let pool = db::connect(url, config.db_pool_size)?;
            if config.run_migrations {
                db::run_migrations(&pool)?;
            }
            Ok(Arc::new(PgStore::new(pool)))
        }
        (StoreKind::Postgres, None) => Err(StoreError::Backend(String::from("DATABASE_URL is not set"))),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let store = match tokio::task::block_in_place(|| open_store(&config)) {
        Ok(store) => store,
        Err(err) => {
            error!(error = %err, "could not open the store");
            return ExitCode::FAILURE;
        }
    };

    web::serve(AppState::new(store, config)).await;
    ExitCode::SUCCESS
}
