// shared/src/lib.rs

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("[ttl-store] Missing required option `{0}`.")]
    MissingOption(&'static str),
    #[error("[ttl-store] Invalid option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },
    #[error("invalid object name: {0}")]
    InvalidObjectName(String),
    #[error("the empty key needs a non-empty prefix to form an object name")]
    EmptyObjectName,
    #[error("stored value is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("backend: {0}")]
    Backend(String),
    #[error("clear failed for {failed} of {total} objects, first error: {first}")]
    ClearFailed {
        failed: usize,
        total: usize,
        first: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Time-to-live in whole seconds. Zero disables expiry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TtlSecs(pub u64);

impl TtlSecs {
    pub const NONE: TtlSecs = TtlSecs(0);

    /// Validate a raw TTL value, rejecting negatives.
    pub fn validate(raw: i64) -> Result<Self> {
        u64::try_from(raw).map(TtlSecs).map_err(|_| Error::InvalidOption {
            name: "ttl",
            reason: format!("expected a non-negative integer, got {raw}"),
        })
    }

    /// Parse a TTL from text, as found in env vars or config files.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let value = trimmed.parse::<i64>().map_err(|_| Error::InvalidOption {
            name: "ttl",
            reason: format!("expected a non-negative integer, got {trimmed:?}"),
        })?;
        Self::validate(value)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// TTL as a signed delta, saturating for values chrono cannot represent.
    pub fn as_delta(&self) -> chrono::TimeDelta {
        i64::try_from(self.0)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .unwrap_or(chrono::TimeDelta::MAX)
    }
}

pub mod config;
