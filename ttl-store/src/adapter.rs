use crate::clock::SystemClock;
use crate::codec::KeyCodec;
use crate::domain::{AdapterOptions, ObjectMeta, SetOptions, StoredValue};
use crate::expiry::{ExpiryPolicy, ExpiryStrategy};
use crate::ports::{BackendFactory, Clock, KeyValueStore, ObjectBackend};
use async_trait::async_trait;
use shared::{Result, TtlSecs};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

enum ClientSource {
    Injected,
    Factory(Arc<dyn BackendFactory>),
}

/// Key-value store over an object backend, with TTL enforced by the adapter.
///
/// Note that reads are not always read-only: with the expires-marker strategy
/// a `get_item` that finds an expired object deletes it.
pub struct TtlObjectAdapter {
    pub(crate) options: AdapterOptions,
    pub(crate) bucket: String,
    pub(crate) codec: KeyCodec,
    pub(crate) policy: ExpiryPolicy,
    pub(crate) clock: Arc<dyn Clock>,
    client: OnceCell<Arc<dyn ObjectBackend>>,
    source: ClientSource,
}

impl TtlObjectAdapter {
    /// Adapter over an already constructed backend client.
    pub fn with_client(options: AdapterOptions, client: Arc<dyn ObjectBackend>) -> Result<Self> {
        let mut adapter = Self::build(options, ClientSource::Injected)?;
        adapter.client = OnceCell::new_with(Some(client));
        Ok(adapter)
    }

    /// Adapter whose client is created by `factory` on first use.
    pub fn with_factory(options: AdapterOptions, factory: Arc<dyn BackendFactory>) -> Result<Self> {
        Self::build(options, ClientSource::Factory(factory))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn build(options: AdapterOptions, source: ClientSource) -> Result<Self> {
        let bucket = options.required_bucket()?.to_string();
        let ttl = match options.ttl {
            Some(raw) => TtlSecs::validate(raw)?,
            None => TtlSecs::NONE,
        };
        let strategy = ExpiryStrategy::from_update_last_modified(options.ttl_update_last_modified);

        Ok(Self {
            bucket,
            codec: KeyCodec::new(options.prefix.clone()),
            policy: ExpiryPolicy::new(ttl, strategy),
            clock: Arc::new(SystemClock),
            client: OnceCell::new(),
            source,
            options,
        })
    }

    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }

    pub fn policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    /// The shared client, created once even under concurrent first use.
    pub(crate) async fn client(&self) -> Result<&Arc<dyn ObjectBackend>> {
        self.client
            .get_or_try_init(|| async {
                match &self.source {
                    ClientSource::Factory(factory) => {
                        debug!("Connecting backend client for bucket '{}'", self.bucket);
                        factory.connect(&self.options).await
                    }
                    // with_client always fills the cell
                    ClientSource::Injected => Err(shared::Error::Backend(
                        "injected client missing".to_string(),
                    )),
                }
            })
            .await
    }
}

#[async_trait]
impl KeyValueStore for TtlObjectAdapter {
    async fn has_item(&self, key: &str) -> Result<bool> {
        Ok(self.fetch_item(key).await?.is_some())
    }

    async fn get_item(&self, key: &str) -> Result<Option<StoredValue>> {
        self.fetch_item(key).await
    }

    async fn set_item(&self, key: &str, value: StoredValue, options: SetOptions) -> Result<()> {
        self.store_item(key, value, options).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.delete_item(key).await
    }

    async fn get_keys(&self) -> Result<Vec<String>> {
        self.list_keys().await
    }

    async fn clear(&self) -> Result<()> {
        self.clear_all().await
    }

    async fn get_meta(&self, key: &str) -> Result<Option<ObjectMeta>> {
        self.item_meta(key).await
    }
}

impl Debug for TtlObjectAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlObjectAdapter")
            .field("bucket", &self.bucket)
            .field("prefix", &self.codec.prefix())
            .field("policy", &self.policy)
            .field("client_ready", &self.client.initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use shared::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFactory {
        connects: AtomicUsize,
    }

    #[async_trait]
    impl BackendFactory for CountingFactory {
        async fn connect(&self, _options: &AdapterOptions) -> Result<Arc<dyn ObjectBackend>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(Arc::new(MemoryBackend::new(Arc::new(SystemClock))))
        }
    }

    struct FailingFactory;

    #[async_trait]
    impl BackendFactory for FailingFactory {
        async fn connect(&self, _options: &AdapterOptions) -> Result<Arc<dyn ObjectBackend>> {
            Err(Error::Backend("no route to host".to_string()))
        }
    }

    #[test]
    fn test_missing_bucket_fails_at_construction() {
        let factory = Arc::new(FailingFactory);
        let err = TtlObjectAdapter::with_factory(AdapterOptions::default(), factory).unwrap_err();
        assert!(matches!(err, Error::MissingOption("bucket")));
    }

    #[test]
    fn test_negative_ttl_fails_at_construction() {
        let factory = Arc::new(FailingFactory);
        let err = TtlObjectAdapter::with_factory(AdapterOptions::new("b").ttl(-1), factory)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { name: "ttl", .. }));
    }

    #[test]
    fn test_strategy_follows_flag() {
        let factory = Arc::new(FailingFactory);
        let adapter = TtlObjectAdapter::with_factory(
            AdapterOptions::new("b").ttl(10).ttl_update_last_modified(true),
            factory,
        )
        .unwrap();
        assert_eq!(adapter.policy().strategy(), ExpiryStrategy::ConditionalRead);
        assert_eq!(adapter.policy().ttl(), TtlSecs(10));
    }

    #[tokio::test]
    async fn test_client_created_once_under_concurrent_use() {
        let factory = Arc::new(CountingFactory {
            connects: AtomicUsize::new(0),
        });
        let adapter = TtlObjectAdapter::with_factory(AdapterOptions::new("b"), factory.clone())
            .unwrap();

        let lookups = (0..16).map(|i| {
            let adapter = &adapter;
            async move { adapter.has_item(&format!("k{i}")).await }
        });
        for found in futures::future::join_all(lookups).await {
            assert!(!found.unwrap());
        }

        assert_eq!(factory.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_factory_error_propagates_and_retries_next_call() {
        let adapter =
            TtlObjectAdapter::with_factory(AdapterOptions::new("b"), Arc::new(FailingFactory))
                .unwrap();
        assert!(matches!(adapter.get_item("k").await, Err(Error::Backend(_))));
        assert!(matches!(adapter.get_item("k").await, Err(Error::Backend(_))));
    }
}
