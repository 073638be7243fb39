use crate::{Error, Result, TtlSecs};
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    S3,
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub backend: BackendKind,
    pub bucket: Option<String>,
    pub prefix: String,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub ttl: TtlSecs,
    pub ttl_update_last_modified: bool,
    pub clear_concurrency: Option<usize>,
}

impl Config {
    const ENV_BACKEND: &str = "TTL_STORE_BACKEND";
    const ENV_BUCKET: &str = "TTL_STORE_BUCKET";
    const ENV_PREFIX: &str = "TTL_STORE_PREFIX";
    const ENV_REGION: &str = "AWS_REGION";
    const ENV_ENDPOINT_URL: &str = "TTL_STORE_ENDPOINT_URL";
    const ENV_TTL: &str = "TTL_STORE_TTL";
    const ENV_TTL_UPDATE_LAST_MODIFIED: &str = "TTL_STORE_TTL_UPDATE_LAST_MODIFIED";
    const ENV_CLEAR_CONCURRENCY: &str = "TTL_STORE_CLEAR_CONCURRENCY";

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let backend = match non_empty(Self::ENV_BACKEND).as_deref().map(str::trim) {
            None | Some("s3") => BackendKind::S3,
            Some("memory") => BackendKind::Memory,
            Some(other) => {
                return Err(Error::InvalidOption {
                    name: "backend",
                    reason: format!("expected `s3` or `memory`, got {other:?}"),
                });
            }
        };

        let ttl = match non_empty(Self::ENV_TTL) {
            Some(raw) => TtlSecs::parse(&raw)?,
            None => TtlSecs::NONE,
        };

        let ttl_update_last_modified = match non_empty(Self::ENV_TTL_UPDATE_LAST_MODIFIED) {
            Some(raw) => parse_flag(&raw)?,
            None => false,
        };

        let clear_concurrency = match non_empty(Self::ENV_CLEAR_CONCURRENCY) {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|_| Error::InvalidOption {
                name: "clearConcurrency",
                reason: format!("expected a positive integer, got {raw:?}"),
            })?),
            None => None,
        };

        let region = non_empty(Self::ENV_REGION);
        if backend == BackendKind::S3 && region.is_none() {
            warn!("{} not set, region will come from the AWS profile chain", Self::ENV_REGION);
        }

        Ok(Self {
            backend,
            bucket: non_empty(Self::ENV_BUCKET),
            prefix: lookup(Self::ENV_PREFIX).unwrap_or_default(),
            region,
            endpoint_url: non_empty(Self::ENV_ENDPOINT_URL),
            ttl,
            ttl_update_last_modified,
            clear_concurrency,
        })
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::InvalidOption {
            name: "ttlUpdateLastModified",
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}
