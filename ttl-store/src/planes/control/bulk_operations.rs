use crate::adapter::TtlObjectAdapter;
use crate::domain::request::ListObjectsRequest;
use crate::domain::response::ObjectEntry;
use futures::StreamExt;
use futures::future::join_all;
use futures::stream;
use shared::{Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};

impl TtlObjectAdapter {
    /// Every object under the prefix, all pages, in backend order.
    async fn scan(&self) -> Result<Vec<ObjectEntry>> {
        let client = self.client().await?;
        let mut entries = Vec::new();
        let mut continuation_token = None;
        let mut pages = 0usize;

        loop {
            let page = client
                .list_objects(ListObjectsRequest {
                    bucket: self.bucket.clone(),
                    prefix: self.codec.listing_prefix(),
                    continuation_token: continuation_token.take(),
                })
                .await?;
            pages += 1;
            entries.extend(page.entries);

            match page.next_continuation_token {
                Some(next) => continuation_token = Some(next),
                None => break,
            }
        }

        debug!(
            "Listed {} object(s) under '{}' in {} page(s)",
            entries.len(),
            self.codec.prefix(),
            pages
        );
        Ok(entries)
    }

    /// Live logical keys. Expired entries and names that do not decode are left out.
    pub(crate) async fn list_keys(&self) -> Result<Vec<String>> {
        let now = self.clock.now();
        let entries = self.scan().await?;

        let keys = entries
            .into_iter()
            .filter(|entry| self.policy.is_listed_live(entry.last_modified, now))
            .filter_map(|entry| match self.codec.decode(&entry.name) {
                Ok(key) => Some(key),
                Err(err) => {
                    warn!("Skipping object '{}' during listing: {}", entry.name, err);
                    None
                }
            })
            .collect();
        Ok(keys)
    }

    /// Delete everything under the prefix, expired leftovers included.
    ///
    /// All deletes are attempted. If any failed, the error reports how many
    /// and the first failure in listing order.
    pub(crate) async fn clear_all(&self) -> Result<()> {
        let names: Vec<String> = self.scan().await?.into_iter().map(|e| e.name).collect();
        let total = names.len();
        let client = self.client().await?;

        let deletes: Vec<_> = names
            .into_iter()
            .map(|name| {
                let client = Arc::clone(client);
                let bucket = self.bucket.clone();
                async move {
                    let result = client.delete_object(&bucket, &name).await;
                    result.map_err(|err| (name, err))
                }
            })
            .collect();

        let results: Vec<std::result::Result<(), (String, Error)>> =
            match self.options.clear_concurrency {
                Some(limit) => stream::iter(deletes).buffered(limit.max(1)).collect().await,
                None => join_all(deletes).await,
            };

        let failures: Vec<(String, Error)> =
            results.into_iter().filter_map(|r| r.err()).collect();
        for (name, err) in &failures {
            warn!("Failed to delete '{}' during clear: {}", name, err);
        }

        match failures.first() {
            None => {
                debug!("Cleared {} object(s) under '{}'", total, self.codec.prefix());
                Ok(())
            }
            Some((name, err)) => Err(Error::ClearFailed {
                failed: failures.len(),
                total,
                first: format!("{name}: {err}"),
            }),
        }
    }
}
