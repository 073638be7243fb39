use crate::domain::ObjectMeta;
use crate::domain::request::{GetObjectRequest, ListObjectsRequest, PutObjectRequest};
use crate::domain::response::{GetObjectOutcome, ListPage, ObjectEntry, StoredObject};
use crate::ports::{Clock, ObjectBackend};
use async_trait::async_trait;
use bytes::Bytes;
use shared::Result;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Clone, Debug)]
struct MemoryObject {
    body: Bytes,
    meta: ObjectMeta,
}

/// Call counters, for asserting what the adapter sent.
#[derive(Debug, Default)]
pub struct BackendStats {
    pub gets: AtomicUsize,
    pub conditional_gets: AtomicUsize,
    pub heads: AtomicUsize,
    pub puts: AtomicUsize,
    pub deletes: AtomicUsize,
    pub lists: AtomicUsize,
}

impl BackendStats {
    pub fn read(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// In-memory object store with S3's observable behavior:
/// - last-modified comes from the shared clock at put time
/// - a put with byte-identical content leaves the object untouched
/// - `If-Modified-Since` answers not-modified when last-modified <= the condition
/// - listing is lexicographic and paginated with continuation tokens
pub struct MemoryBackend {
    // (bucket, name) -> object
    objects: RwLock<BTreeMap<(String, String), MemoryObject>>,
    clock: Arc<dyn Clock>,
    page_size: usize,
    stats: BackendStats,
}

impl MemoryBackend {
    /// S3's default `max-keys`.
    pub const DEFAULT_PAGE_SIZE: usize = 1000;

    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_page_size(clock, Self::DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(clock: Arc<dyn Clock>, page_size: usize) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            clock,
            page_size: page_size.max(1),
            stats: BackendStats::default(),
        }
    }

    pub fn stats(&self) -> &BackendStats {
        &self.stats
    }

    /// Object names currently stored in `bucket`, in listing order.
    pub async fn object_names(&self, bucket: &str) -> Vec<String> {
        self.objects
            .read()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Insert an object as-is, bypassing put semantics.
    #[cfg(test)]
    pub(crate) async fn insert_raw(
        &self,
        bucket: &str,
        name: &str,
        body: impl Into<Bytes>,
        meta: ObjectMeta,
    ) {
        self.objects.write().await.insert(
            (bucket.to_string(), name.to_string()),
            MemoryObject {
                body: body.into(),
                meta,
            },
        );
    }
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    async fn get_object(&self, request: GetObjectRequest) -> Result<GetObjectOutcome> {
        self.stats.gets.fetch_add(1, Ordering::SeqCst);
        if request.if_modified_since.is_some() {
            self.stats.conditional_gets.fetch_add(1, Ordering::SeqCst);
        }

        let objects = self.objects.read().await;
        let Some(object) = objects.get(&(request.bucket, request.name)) else {
            return Ok(GetObjectOutcome::Missing);
        };

        if let (Some(since), Some(modified)) = (request.if_modified_since, object.meta.last_modified) {
            if modified <= since {
                return Ok(GetObjectOutcome::NotModified);
            }
        }

        Ok(GetObjectOutcome::Found(StoredObject {
            body: object.body.clone(),
            meta: object.meta,
        }))
    }

    async fn head_object(&self, bucket: &str, name: &str) -> Result<Option<ObjectMeta>> {
        self.stats.heads.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.read().await;
        Ok(objects
            .get(&(bucket.to_string(), name.to_string()))
            .map(|object| object.meta))
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<()> {
        self.stats.puts.fetch_add(1, Ordering::SeqCst);
        let mut objects = self.objects.write().await;
        let key = (request.bucket, request.name);

        if objects.get(&key).is_some_and(|existing| existing.body == request.body) {
            return Ok(());
        }

        objects.insert(
            key,
            MemoryObject {
                body: request.body,
                meta: ObjectMeta {
                    last_modified: Some(self.clock.now()),
                    expires: request.expires,
                },
            },
        );
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, name: &str) -> Result<()> {
        self.stats.deletes.fetch_add(1, Ordering::SeqCst);
        self.objects
            .write()
            .await
            .remove(&(bucket.to_string(), name.to_string()));
        Ok(())
    }

    async fn list_objects(&self, request: ListObjectsRequest) -> Result<ListPage> {
        self.stats.lists.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.read().await;
        let prefix = request.prefix.unwrap_or_default();

        // The token is the last name of the previous page.
        let lower = match request.continuation_token {
            Some(token) => Bound::Excluded((request.bucket.clone(), token)),
            None => Bound::Included((request.bucket.clone(), prefix.clone())),
        };

        let mut matching = objects
            .range((lower, Bound::Unbounded))
            .take_while(|((bucket, _), _)| *bucket == request.bucket)
            .filter(|((_, name), _)| name.starts_with(&prefix));

        let entries: Vec<ObjectEntry> = matching
            .by_ref()
            .take(self.page_size)
            .map(|((_, name), object)| ObjectEntry {
                name: name.clone(),
                last_modified: object.meta.last_modified,
            })
            .collect();

        let next_continuation_token = match matching.next() {
            Some(_) => entries.last().map(|entry| entry.name.clone()),
            None => None,
        };

        Ok(ListPage {
            entries,
            next_continuation_token,
        })
    }
}

impl Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("page_size", &self.page_size)
            .field("stats", &self.stats)
            .finish()
    }
}
