use crate::adapter::TtlObjectAdapter;
use crate::domain::request::{GetObjectRequest, PutObjectRequest};
use crate::domain::response::GetObjectOutcome;
use crate::domain::{ObjectMeta, SetOptions, StoredValue};
use crate::expiry::Liveness;
use shared::{Result, TtlSecs};
use tracing::debug;

impl TtlObjectAdapter {
    /// Fetch a live value. An expired object under the expires-marker
    /// strategy is deleted here, before `None` is returned.
    pub(crate) async fn fetch_item(&self, key: &str) -> Result<Option<StoredValue>> {
        let name = self.codec.object_name(key)?;
        let now = self.clock.now();
        let client = self.client().await?;

        let request = GetObjectRequest {
            bucket: self.bucket.clone(),
            name: name.clone(),
            if_modified_since: self.policy.read_condition(now),
        };

        let object = match client.get_object(request).await? {
            GetObjectOutcome::Found(object) => object,
            GetObjectOutcome::Missing => return Ok(None),
            GetObjectOutcome::NotModified => {
                debug!("Object '{}' not modified within TTL, treating as expired", name);
                return Ok(None);
            }
        };

        match self.policy.judge(&object.meta, now) {
            Liveness::Live => Ok(Some(StoredValue::from(object.body))),
            Liveness::Expired { purge } => {
                debug!("Object '{}' expired (purge: {})", name, purge);
                if purge {
                    client.delete_object(&self.bucket, &name).await?;
                }
                Ok(None)
            }
        }
    }

    pub(crate) async fn store_item(
        &self,
        key: &str,
        value: StoredValue,
        options: SetOptions,
    ) -> Result<()> {
        // validated before anything reaches the backend
        let ttl = match options.ttl {
            Some(raw) => TtlSecs::validate(raw)?,
            None => self.policy.ttl(),
        };
        let name = self.codec.object_name(key)?;
        let plan = self.policy.write_plan(ttl, self.clock.now());
        let client = self.client().await?;

        if plan.delete_first {
            debug!("Deleting '{}' before write to reset last-modified", name);
            client.delete_object(&self.bucket, &name).await?;
        }

        client
            .put_object(PutObjectRequest {
                bucket: self.bucket.clone(),
                name,
                body: value.into_bytes(),
                expires: plan.expires,
            })
            .await
    }

    pub(crate) async fn delete_item(&self, key: &str) -> Result<()> {
        let name = self.codec.object_name(key)?;
        self.client().await?.delete_object(&self.bucket, &name).await
    }

    /// Metadata of a live item. Never deletes, whatever the strategy.
    pub(crate) async fn item_meta(&self, key: &str) -> Result<Option<ObjectMeta>> {
        let name = self.codec.object_name(key)?;
        let now = self.clock.now();
        let Some(meta) = self.client().await?.head_object(&self.bucket, &name).await? else {
            return Ok(None);
        };
        match self.policy.judge(&meta, now) {
            Liveness::Live => Ok(Some(meta)),
            Liveness::Expired { .. } => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::adapter::TtlObjectAdapter;
    use crate::clock::ManualClock;
    use crate::domain::{AdapterOptions, SetOptions, StoredValue};
    use crate::memory::{BackendStats, MemoryBackend};
    use crate::ports::{Clock, KeyValueStore};
    use chrono::{DateTime, TimeDelta};
    use shared::Error;
    use std::sync::Arc;

    const BUCKET: &str = "mocked";

    struct Fixture {
        clock: Arc<ManualClock>,
        backend: Arc<MemoryBackend>,
        adapter: TtlObjectAdapter,
    }

    fn fixture(options: AdapterOptions) -> Fixture {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let backend = Arc::new(MemoryBackend::new(clock.clone()));
        let adapter = TtlObjectAdapter::with_client(options, backend.clone())
            .unwrap()
            .with_clock(clock.clone());
        Fixture {
            clock,
            backend,
            adapter,
        }
    }

    fn text(value: Option<StoredValue>) -> Option<String> {
        value.map(|v| v.as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_set_get_remove() {
        let f = fixture(AdapterOptions::new(BUCKET).prefix("prefix/"));
        let store = &f.adapter;

        assert!(!store.has_item("s1:a").await.unwrap());
        store
            .set_item("s1:a", "test_data".into(), SetOptions::default())
            .await
            .unwrap();
        assert!(store.has_item("s1:a").await.unwrap());
        assert_eq!(text(store.get_item("s1:a").await.unwrap()).as_deref(), Some("test_data"));

        // object name is prefix + base64(key)
        assert_eq!(f.backend.object_names(BUCKET).await, vec!["prefix/czE6YQ=="]);

        store.remove_item("s1:a").await.unwrap();
        assert_eq!(store.get_item("s1:a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_key_is_none_not_error() {
        let f = fixture(AdapterOptions::new(BUCKET).ttl(10));
        assert_eq!(f.adapter.get_item("nope").await.unwrap(), None);
        assert!(!f.adapter.has_item("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_ok() {
        let f = fixture(AdapterOptions::new(BUCKET));
        f.adapter.remove_item("never-written").await.unwrap();
        f.adapter.remove_item("never-written").await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_value_is_present() {
        let f = fixture(AdapterOptions::new(BUCKET));
        f.adapter
            .set_item("empty", "".into(), SetOptions::default())
            .await
            .unwrap();
        assert!(f.adapter.has_item("empty").await.unwrap());
        assert_eq!(text(f.adapter.get_item("empty").await.unwrap()).as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_binary_value_round_trips() {
        let f = fixture(AdapterOptions::new(BUCKET));
        let payload = vec![0u8, 159, 146, 150, 255];
        f.adapter
            .set_item("bin", payload.clone().into(), SetOptions::default())
            .await
            .unwrap();
        let value = f.adapter.get_item("bin").await.unwrap().unwrap();
        assert_eq!(value.as_bytes(), payload.as_slice());
        assert!(matches!(value.as_str(), Err(Error::InvalidUtf8(_))));
    }

    #[tokio::test]
    async fn test_zero_ttl_is_immortal() {
        for flag in [false, true] {
            let f = fixture(AdapterOptions::new(BUCKET).ttl(0).ttl_update_last_modified(flag));
            f.adapter
                .set_item("k", "v".into(), SetOptions::default())
                .await
                .unwrap();

            f.clock.advance(TimeDelta::days(3650));
            assert_eq!(text(f.adapter.get_item("k").await.unwrap()).as_deref(), Some("v"));

            let stats = f.backend.stats();
            assert_eq!(BackendStats::read(&stats.conditional_gets), 0);
            // no delete-before-write either
            assert_eq!(BackendStats::read(&stats.deletes), 0);
            let meta = f.adapter.get_meta("k").await.unwrap().unwrap();
            assert_eq!(meta.expires, None);
        }
    }

    #[tokio::test]
    async fn test_expires_marker_expiry_deletes_object() {
        let f = fixture(AdapterOptions::new(BUCKET).prefix("prefix/").ttl(10));
        f.adapter
            .set_item("s1:ttl", "value".into(), SetOptions::default())
            .await
            .unwrap();

        let meta = f.adapter.get_meta("s1:ttl").await.unwrap().unwrap();
        assert_eq!(meta.expires, Some(f.clock.now() + TimeDelta::seconds(10)));

        f.clock.advance_secs(9);
        assert!(f.adapter.has_item("s1:ttl").await.unwrap());
        assert_eq!(BackendStats::read(&f.backend.stats().deletes), 0);

        f.clock.advance_secs(2);
        assert_eq!(f.adapter.get_item("s1:ttl").await.unwrap(), None);
        // the read removed the underlying object
        assert!(f.backend.object_names(BUCKET).await.is_empty());
        assert_eq!(BackendStats::read(&f.backend.stats().deletes), 1);
    }

    #[tokio::test]
    async fn test_get_meta_does_not_delete() {
        let f = fixture(AdapterOptions::new(BUCKET).ttl(10));
        f.adapter
            .set_item("k", "v".into(), SetOptions::default())
            .await
            .unwrap();
        f.clock.advance_secs(30);

        assert_eq!(f.adapter.get_meta("k").await.unwrap(), None);
        assert_eq!(f.backend.object_names(BUCKET).await.len(), 1);
        assert_eq!(f.adapter.get_meta("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_per_write_ttl_override() {
        let f = fixture(AdapterOptions::new(BUCKET).ttl(10));
        f.adapter
            .set_item("short", "v".into(), SetOptions::with_ttl(3))
            .await
            .unwrap();
        f.adapter
            .set_item("default", "v".into(), SetOptions::default())
            .await
            .unwrap();

        f.clock.advance_secs(4);
        assert_eq!(f.adapter.get_item("short").await.unwrap(), None);
        assert!(f.adapter.has_item("default").await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_ttl_ignores_per_write_marker_like_listing() {
        let f = fixture(AdapterOptions::new(BUCKET).ttl(0));
        f.adapter
            .set_item("short", "v".into(), SetOptions::with_ttl(5))
            .await
            .unwrap();
        let meta = f.adapter.get_meta("short").await.unwrap().unwrap();
        assert_eq!(meta.expires, Some(f.clock.now() + TimeDelta::seconds(5)));

        f.clock.advance_secs(6);
        assert_eq!(f.adapter.get_keys().await.unwrap(), vec!["short"]);
        assert!(f.adapter.has_item("short").await.unwrap());
        assert_eq!(f.adapter.get_keys().await.unwrap(), vec!["short"]);
        assert_eq!(BackendStats::read(&f.backend.stats().deletes), 0);
    }

    #[tokio::test]
    async fn test_empty_key_without_prefix_is_rejected() {
        let f = fixture(AdapterOptions::new(BUCKET));
        let err = f
            .adapter
            .set_item("", "v".into(), SetOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyObjectName));
        assert!(matches!(f.adapter.get_item("").await, Err(Error::EmptyObjectName)));
        assert_eq!(BackendStats::read(&f.backend.stats().puts), 0);
        assert_eq!(BackendStats::read(&f.backend.stats().gets), 0);

        let prefixed = fixture(AdapterOptions::new(BUCKET).prefix("p/"));
        prefixed
            .adapter
            .set_item("", "v".into(), SetOptions::default())
            .await
            .unwrap();
        assert!(prefixed.adapter.has_item("").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_override_fails_before_backend_call() {
        let f = fixture(AdapterOptions::new(BUCKET).ttl(10));
        let err = f
            .adapter
            .set_item("k", "v".into(), SetOptions::with_ttl(-5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { name: "ttl", .. }));

        let stats = f.backend.stats();
        assert_eq!(BackendStats::read(&stats.puts), 0);
        assert_eq!(BackendStats::read(&stats.deletes), 0);
    }

    #[tokio::test]
    async fn test_conditional_read_sends_condition_and_never_deletes_on_read() {
        let f = fixture(AdapterOptions::new(BUCKET).ttl(10).ttl_update_last_modified(true));
        f.adapter
            .set_item("k", "v".into(), SetOptions::default())
            .await
            .unwrap();
        let deletes_after_write = BackendStats::read(&f.backend.stats().deletes);

        assert!(f.adapter.has_item("k").await.unwrap());
        f.clock.advance_secs(11);
        assert_eq!(f.adapter.get_item("k").await.unwrap(), None);

        let stats = f.backend.stats();
        assert_eq!(BackendStats::read(&stats.conditional_gets), 2);
        assert_eq!(BackendStats::read(&stats.deletes), deletes_after_write);
        assert_eq!(f.backend.object_names(BUCKET).await.len(), 1);
    }

    #[tokio::test]
    async fn test_write_resets_expiry_window() {
        let f = fixture(AdapterOptions::new(BUCKET).ttl(10).ttl_update_last_modified(true));
        f.adapter
            .set_item("k", "same".into(), SetOptions::default())
            .await
            .unwrap();
        f.clock.advance_secs(8);
        f.adapter
            .set_item("k", "same".into(), SetOptions::default())
            .await
            .unwrap();

        // 16s after the first write, 8s after the second
        f.clock.advance_secs(8);
        assert_eq!(text(f.adapter.get_item("k").await.unwrap()).as_deref(), Some("same"));
    }

    #[tokio::test]
    async fn test_identical_rewrite_without_reset_keeps_original_schedule() {
        let f = fixture(AdapterOptions::new(BUCKET).ttl(10));
        f.adapter
            .set_item("k", "same".into(), SetOptions::default())
            .await
            .unwrap();
        f.clock.advance_secs(8);
        f.adapter
            .set_item("k", "same".into(), SetOptions::default())
            .await
            .unwrap();

        f.clock.advance_secs(8);
        assert_eq!(f.adapter.get_item("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_last_modified_scenario() {
        let f = fixture(
            AdapterOptions::new(BUCKET)
                .prefix("p/")
                .ttl(10)
                .ttl_update_last_modified(true),
        );
        let store = &f.adapter;

        store.set_item("a", "v1".into(), SetOptions::default()).await.unwrap();
        assert_eq!(text(store.get_item("a").await.unwrap()).as_deref(), Some("v1"));

        f.clock.advance_secs(11);
        assert_eq!(store.get_item("a").await.unwrap(), None);

        store.set_item("a", "v1".into(), SetOptions::default()).await.unwrap();
        f.clock.advance_secs(5);
        assert_eq!(text(store.get_item("a").await.unwrap()).as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_clock_is_shared_with_backend() {
        let f = fixture(AdapterOptions::new(BUCKET));
        f.adapter
            .set_item("k", "v".into(), SetOptions::default())
            .await
            .unwrap();
        let meta = f.adapter.get_meta("k").await.unwrap().unwrap();
        assert_eq!(meta.last_modified, Some(f.clock.now()));
    }
}
