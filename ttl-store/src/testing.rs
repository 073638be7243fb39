use crate::domain::ObjectMeta;
use crate::domain::request::{GetObjectRequest, ListObjectsRequest, PutObjectRequest};
use crate::domain::response::{GetObjectOutcome, ListPage};
use crate::memory::MemoryBackend;
use crate::ports::{Clock, ObjectBackend};
use async_trait::async_trait;
use shared::{Error, Result};
use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Memory backend that records deletes and can be told to fail some of them.
pub(crate) struct RecordingBackend {
    inner: MemoryBackend,
    failing_deletes: RwLock<HashSet<String>>,
    deleted: RwLock<Vec<String>>,
}

impl RecordingBackend {
    pub(crate) fn with_page_size(clock: Arc<dyn Clock>, page_size: usize) -> Self {
        Self {
            inner: MemoryBackend::with_page_size(clock, page_size),
            failing_deletes: RwLock::new(HashSet::new()),
            deleted: RwLock::new(Vec::new()),
        }
    }

    pub(crate) async fn fail_deletes_for(&self, name: impl Into<String>) {
        self.failing_deletes.write().await.insert(name.into());
    }

    /// Successful deletes, in call order.
    pub(crate) async fn deleted_names(&self) -> Vec<String> {
        self.deleted.read().await.clone()
    }
}

impl Deref for RecordingBackend {
    type Target = MemoryBackend;

    fn deref(&self) -> &MemoryBackend {
        &self.inner
    }
}

#[async_trait]
impl ObjectBackend for RecordingBackend {
    async fn get_object(&self, request: GetObjectRequest) -> Result<GetObjectOutcome> {
        self.inner.get_object(request).await
    }

    async fn head_object(&self, bucket: &str, name: &str) -> Result<Option<ObjectMeta>> {
        self.inner.head_object(bucket, name).await
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<()> {
        self.inner.put_object(request).await
    }

    async fn delete_object(&self, bucket: &str, name: &str) -> Result<()> {
        if self.failing_deletes.read().await.contains(name) {
            return Err(Error::Backend(format!("AccessDenied: delete {bucket}/{name}")));
        }
        self.inner.delete_object(bucket, name).await?;
        self.deleted.write().await.push(name.to_string());
        Ok(())
    }

    async fn list_objects(&self, request: ListObjectsRequest) -> Result<ListPage> {
        self.inner.list_objects(request).await
    }
}
