use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::config::Config;
use shared::{Error, Result};
use std::fmt;

pub mod request {
    use bytes::Bytes;
    use chrono::{DateTime, Utc};

    #[derive(Clone, Debug)]
    pub struct GetObjectRequest {
        pub bucket: String,
        pub name: String,
        /// Only return the body if the object changed after this instant.
        pub if_modified_since: Option<DateTime<Utc>>,
    }

    #[derive(Clone, Debug)]
    pub struct PutObjectRequest {
        pub bucket: String,
        pub name: String,
        pub body: Bytes,
        pub expires: Option<DateTime<Utc>>,
    }

    #[derive(Clone, Debug)]
    pub struct ListObjectsRequest {
        pub bucket: String,
        pub prefix: Option<String>,
        pub continuation_token: Option<String>,
    }
}

pub mod response {
    use super::ObjectMeta;
    use bytes::Bytes;
    use chrono::{DateTime, Utc};

    #[derive(Clone, Debug)]
    pub struct StoredObject {
        pub body: Bytes,
        pub meta: ObjectMeta,
    }

    /// Result of a fetch. A conditional miss is a value, not an error.
    #[derive(Clone, Debug)]
    pub enum GetObjectOutcome {
        Found(StoredObject),
        Missing,
        NotModified,
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct ObjectEntry {
        pub name: String,
        pub last_modified: Option<DateTime<Utc>>,
    }

    #[derive(Clone, Debug, Default)]
    pub struct ListPage {
        pub entries: Vec<ObjectEntry>,
        /// Present only when the backend has more pages.
        pub next_continuation_token: Option<String>,
    }
}

/// Backend-supplied object metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObjectMeta {
    pub last_modified: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
}

/// Opaque payload. Text accessors assume UTF-8.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoredValue(Bytes);

impl StoredValue {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.0)?)
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Bytes> for StoredValue {
    fn from(value: Bytes) -> Self {
        Self(value)
    }
}

impl From<Vec<u8>> for StoredValue {
    fn from(value: Vec<u8>) -> Self {
        Self(Bytes::from(value))
    }
}

impl From<String> for StoredValue {
    fn from(value: String) -> Self {
        Self(Bytes::from(value))
    }
}

impl From<&str> for StoredValue {
    fn from(value: &str) -> Self {
        Self(Bytes::copy_from_slice(value.as_bytes()))
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SetOptions {
    /// Overrides the adapter TTL for this write.
    pub ttl: Option<i64>,
}

impl SetOptions {
    pub fn with_ttl(ttl: i64) -> Self {
        Self { ttl: Some(ttl) }
    }
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Construction options, accepted in the camelCase form used by driver configs.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterOptions {
    pub bucket: Option<String>,
    pub prefix: String,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub credentials: Option<StaticCredentials>,
    pub ttl: Option<i64>,
    pub ttl_update_last_modified: bool,
    /// Upper bound on concurrent deletes issued by `clear`. Unbounded when unset.
    pub clear_concurrency: Option<usize>,
}

impl AdapterOptions {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: Some(bucket.into()),
            ..Self::default()
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn ttl(mut self, ttl: i64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn ttl_update_last_modified(mut self, enabled: bool) -> Self {
        self.ttl_update_last_modified = enabled;
        self
    }

    pub fn clear_concurrency(mut self, limit: usize) -> Self {
        self.clear_concurrency = Some(limit);
        self
    }

    /// The bucket, or a configuration error when it is missing or blank.
    pub fn required_bucket(&self) -> Result<&str> {
        match self.bucket.as_deref().map(str::trim) {
            Some(bucket) if !bucket.is_empty() => Ok(bucket),
            _ => Err(Error::MissingOption("bucket")),
        }
    }
}

impl From<&Config> for AdapterOptions {
    fn from(config: &Config) -> Self {
        Self {
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            region: config.region.clone(),
            endpoint_url: config.endpoint_url.clone(),
            credentials: None,
            ttl: Some(i64::try_from(config.ttl.0).unwrap_or(i64::MAX)),
            ttl_update_last_modified: config.ttl_update_last_modified,
            clear_concurrency: config.clear_concurrency,
        }
    }
}
