#![deny(clippy::all)]

use crate::domain::request::{GetObjectRequest, ListObjectsRequest, PutObjectRequest};
use crate::domain::response::{GetObjectOutcome, ListPage};
use crate::domain::{AdapterOptions, ObjectMeta, SetOptions, StoredValue};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::Result;
use std::sync::Arc;

// Ports are the pluggable extension points for object storage backends

/// Port for object storage primitives (e.g., S3)
#[async_trait]
pub trait ObjectBackend: Send + Sync + 'static {
    async fn get_object(&self, request: GetObjectRequest) -> Result<GetObjectOutcome>;
    /// Metadata only. `None` when the object does not exist.
    async fn head_object(&self, bucket: &str, name: &str) -> Result<Option<ObjectMeta>>;
    async fn put_object(&self, request: PutObjectRequest) -> Result<()>;
    /// Deleting a missing object succeeds.
    async fn delete_object(&self, bucket: &str, name: &str) -> Result<()>;
    async fn list_objects(&self, request: ListObjectsRequest) -> Result<ListPage>;
}

/// Port for creating a backend client from connection options
/// Called at most once per adapter, on first use
#[async_trait]
pub trait BackendFactory: Send + Sync + 'static {
    async fn connect(&self, options: &AdapterOptions) -> Result<Arc<dyn ObjectBackend>>;
}

/// Source of "now" for expiry decisions
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Port for the generic key-value storage interface
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn has_item(&self, key: &str) -> Result<bool>;
    async fn get_item(&self, key: &str) -> Result<Option<StoredValue>>;
    async fn set_item(&self, key: &str, value: StoredValue, options: SetOptions) -> Result<()>;
    async fn remove_item(&self, key: &str) -> Result<()>;
    async fn get_keys(&self) -> Result<Vec<String>>;
    async fn clear(&self) -> Result<()>;
    async fn get_meta(&self, key: &str) -> Result<Option<ObjectMeta>>;
}
