// Smoke run against a real bucket:
//   aws s3api create-bucket --bucket unstorage-test-bucket --region us-east-1
//   TTL_STORE_BUCKET=unstorage-test-bucket TTL_STORE_PREFIX=prefix/ TTL_STORE_TTL=30 \
//   TTL_STORE_TTL_UPDATE_LAST_MODIFIED=true cargo run -p ttl-store-demo
//   aws s3 ls s3://unstorage-test-bucket/prefix/
//
// Set TTL_STORE_BACKEND=memory to run without AWS.

use shared::config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;
use ttl_store::{KeyValueStore, SetOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env()?;
    let store = storage_engine::adapter_from_config(&config)?;
    info!(
        "Using {:?} backend, bucket {:?}, prefix '{}', ttl {}s",
        config.backend, config.bucket, config.prefix, config.ttl.0
    );

    store
        .set_item("key1", "value1".into(), SetOptions::default())
        .await?;

    for _ in 0..2 {
        let value = store.get_item("key1").await?;
        info!(
            "getItem(key1) = {:?}",
            value.as_ref().map(|v| v.as_str()).transpose()?
        );
    }

    info!("getKeys() = {:?}", store.get_keys().await?);
    info!("getMeta(key1) = {:?}", store.get_meta("key1").await?);

    store.remove_item("key1").await?;
    info!("hasItem(key1) after remove = {}", store.has_item("key1").await?);

    Ok(())
}
