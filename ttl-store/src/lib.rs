//! TTL-aware key-value storage over an object store.
//!
//! Logical keys map to `prefix + base64(key)` object names. Expiry is enforced
//! by the adapter on reads, listings and writes, using one of the strategies in
//! [`expiry::ExpiryStrategy`].

pub mod adapter;
pub mod clock;
pub mod codec;
pub mod domain;
pub mod expiry;
pub mod memory;
pub mod planes;
pub mod ports;

#[cfg(test)]
mod testing;

pub use adapter::TtlObjectAdapter;
pub use clock::{ManualClock, SystemClock};
pub use codec::KeyCodec;
pub use domain::{AdapterOptions, ObjectMeta, SetOptions, StaticCredentials, StoredValue};
pub use expiry::{ExpiryPolicy, ExpiryStrategy};
pub use memory::MemoryBackend;
pub use ports::{BackendFactory, Clock, KeyValueStore, ObjectBackend};
pub use shared::{Error, Result, TtlSecs};
