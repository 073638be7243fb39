use crate::domain::ObjectMeta;
use chrono::{DateTime, Utc};
use shared::TtlSecs;

/// How TTL is enforced against a backend that has no native per-object expiry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpiryStrategy {
    /// Writes carry `Expires = now + ttl`. Reads that find an expired object
    /// delete it before reporting it missing.
    ExpiresMarker,
    /// Reads are sent with `If-Modified-Since = now - ttl`, and a not-modified
    /// answer means expired. Writes delete the old object first so that the
    /// put gets a fresh last-modified even when the bytes are unchanged.
    ConditionalRead,
}

impl ExpiryStrategy {
    pub fn from_update_last_modified(enabled: bool) -> Self {
        if enabled {
            ExpiryStrategy::ConditionalRead
        } else {
            ExpiryStrategy::ExpiresMarker
        }
    }
}

/// Verdict on an object the backend returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Liveness {
    Live,
    /// `purge` asks the caller to delete the object as well.
    Expired { purge: bool },
}

/// What a write must do besides the put itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WritePlan {
    pub delete_first: bool,
    pub expires: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug)]
pub struct ExpiryPolicy {
    ttl: TtlSecs,
    strategy: ExpiryStrategy,
}

impl ExpiryPolicy {
    pub fn new(ttl: TtlSecs, strategy: ExpiryStrategy) -> Self {
        Self { ttl, strategy }
    }

    pub fn ttl(&self) -> TtlSecs {
        self.ttl
    }

    pub fn strategy(&self) -> ExpiryStrategy {
        self.strategy
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Last-modified instants at or before this are expired. `None` when TTL is off.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.is_enabled().then(|| {
            now.checked_sub_signed(self.ttl.as_delta())
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        })
    }

    /// Conditional header for reads.
    pub fn read_condition(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.strategy {
            ExpiryStrategy::ConditionalRead => self.cutoff(now),
            ExpiryStrategy::ExpiresMarker => None,
        }
    }

    /// `effective` is the per-write TTL, already validated.
    pub fn write_plan(&self, effective: TtlSecs, now: DateTime<Utc>) -> WritePlan {
        if effective.is_zero() {
            return WritePlan::default();
        }
        match self.strategy {
            ExpiryStrategy::ExpiresMarker => WritePlan {
                delete_first: false,
                expires: Some(
                    now.checked_add_signed(effective.as_delta())
                        .unwrap_or(DateTime::<Utc>::MAX_UTC),
                ),
            },
            ExpiryStrategy::ConditionalRead => WritePlan {
                delete_first: true,
                expires: None,
            },
        }
    }

    pub fn judge(&self, meta: &ObjectMeta, now: DateTime<Utc>) -> Liveness {
        match self.strategy {
            // With TTL off nothing is checked, markers from per-write TTLs included.
            ExpiryStrategy::ExpiresMarker => {
                let Some(expires) = meta.expires.filter(|_| self.is_enabled()) else {
                    return Liveness::Live;
                };
                let marker_passed = expires < now;
                let too_old = meta.last_modified.is_some_and(|modified| {
                    modified
                        .checked_add_signed(self.ttl.as_delta())
                        .is_some_and(|deadline| now > deadline)
                });
                if marker_passed || too_old {
                    Liveness::Expired { purge: true }
                } else {
                    Liveness::Live
                }
            }
            // The backend already applied the condition on get; this covers
            // head requests and backends that ignore If-Modified-Since.
            ExpiryStrategy::ConditionalRead => {
                if self.is_listed_live(meta.last_modified, now) {
                    Liveness::Live
                } else {
                    Liveness::Expired { purge: false }
                }
            }
        }
    }

    /// Listing filter: keep entries modified strictly after the cutoff.
    pub fn is_listed_live(&self, last_modified: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match (self.cutoff(now), last_modified) {
            (Some(cutoff), Some(modified)) => modified > cutoff,
            _ => true,
        }
    }
}
