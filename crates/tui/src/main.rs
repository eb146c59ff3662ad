mod app;
mod config;
mod error;
mod logging;
mod ui;

use std::sync::Arc;

use client::{
    ApiClient, CommandToken, FileStorage, Persister, QueryCache, QueryOptions, StaticToken,
    TokenProvider, Transactions,
};

use crate::{config::AppConfig, error::Result};

/// Exported to the token command so it can pick the right identity instance.
const IDENTITY_KEY_ENV: &str = "KUDI_IDENTITY_KEY";

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;
    logging::init(&config)?;
    tracing::info!(api_url = %config.api_url, "starting kudi");

    let cache = Arc::new(QueryCache::with_persister(
        QueryOptions::default(),
        Persister::new(Arc::new(FileStorage::new(&config.cache_dir))),
    ));
    if let Err(err) = cache.restore().await {
        tracing::warn!("could not restore query cache: {err}");
    }

    let api = ApiClient::new(&config.api_url, token_provider(&config))?;
    let transactions = Transactions::new(api, cache.clone(), config.user_id.clone());

    let mut app = app::App::new(config, transactions)?;
    let result = app.run().await;

    cache.collect_garbage();
    cache.persist().await;
    result
}

fn token_provider(config: &AppConfig) -> Arc<dyn TokenProvider> {
    match &config.token_command {
        Some(command) if !command.trim().is_empty() => Arc::new(
            CommandToken::new(command.clone()).env(IDENTITY_KEY_ENV, config.identity_key.clone()),
        ),
        _ => Arc::new(StaticToken::new(config.session_token.clone())),
    }
}
