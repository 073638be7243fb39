//! Backend implementations for `ttl-store`.

pub mod s3;

pub use s3::{S3Backend, S3BackendFactory};

use shared::config::{BackendKind, Config};
use shared::Result;
use std::sync::Arc;
use ttl_store::{AdapterOptions, Clock, MemoryBackend, SystemClock, TtlObjectAdapter};

/// Adapter over S3. The client is built on first use.
pub fn s3_adapter(options: AdapterOptions) -> Result<TtlObjectAdapter> {
    TtlObjectAdapter::with_factory(options, Arc::new(S3BackendFactory))
}

/// Adapter over a fresh in-memory backend sharing `clock`.
pub fn memory_adapter(options: AdapterOptions, clock: Arc<dyn Clock>) -> Result<TtlObjectAdapter> {
    let backend = Arc::new(MemoryBackend::new(clock.clone()));
    Ok(TtlObjectAdapter::with_client(options, backend)?.with_clock(clock))
}

/// Adapter for the backend selected in `config`.
pub fn adapter_from_config(config: &Config) -> Result<TtlObjectAdapter> {
    let options = AdapterOptions::from(config);
    match config.backend {
        BackendKind::S3 => s3_adapter(options),
        BackendKind::Memory => memory_adapter(options, Arc::new(SystemClock)),
    }
}
