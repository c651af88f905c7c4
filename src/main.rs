use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

use crowdsense::classifier::VisionClassifier;
use crowdsense::config::{Config, StoreBackend};
use crowdsense::ingest::Ingestor;
use crowdsense::server::{self, AppState};
use crowdsense::store::{FileStore, MemoryStore, RecordStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config_path = std::env::var("CROWDSENSE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("crowdsense.json"));
    let config = Config::load(&config_path)?;

    info!(
        "crowdsense starting: {:?} store, {:?} reads, {:?} classifier flow",
        config.store.backend, config.read_mode, config.classifier.flow
    );

    let store: Arc<dyn RecordStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new(config.store.max_records)),
        StoreBackend::File => Arc::new(FileStore::new(
            &config.store.path,
            config.store.max_records,
        )),
    };

    let api_key = std::env::var("CROWDSENSE_API_KEY").ok();
    let classifier = VisionClassifier::new(
        config.classifier.base_url.clone(),
        config.classifier.model.clone(),
        api_key,
        config.classifier.flow,
        Duration::from_secs(config.classifier.timeout_secs),
    )
    .context("failed to build vision classifier")?;

    let ingestor = Arc::new(Ingestor::new(Arc::new(classifier), Arc::clone(&store)));

    server::serve(
        AppState {
            store,
            ingestor,
            read_mode: config.read_mode,
        },
        &config.bind_addr,
    )
    .await
}
