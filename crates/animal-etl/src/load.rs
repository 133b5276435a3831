//! Batched delivery to the home endpoint
//!
//! Unlike extraction, delivery is strict: the first batch that cannot be
//! posted aborts the run and later batches are never attempted.

use crate::config::EtlConfig;
use crate::error::Result;
use crate::http::{HttpRequest, Transport};
use crate::record::Record;
use crate::retry::RetryPolicy;
use std::time::Duration;
use tracing::info;

/// Posts transformed records in fixed-size batches
pub struct Loader<T> {
    retry: RetryPolicy<T>,
    url: String,
    batch_size: usize,
    timeout: Duration,
}

impl<T: Transport> Loader<T> {
    /// `batch_size` below 1 is raised to 1
    pub fn new(
        retry: RetryPolicy<T>,
        url: impl Into<String>,
        batch_size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            retry,
            url: url.into(),
            batch_size: batch_size.max(1),
            timeout,
        }
    }

    pub fn from_config(transport: T, config: &EtlConfig) -> Self {
        Self::new(
            RetryPolicy::from_config(transport, config),
            config.home_url.clone(),
            config.batch_size,
            config.timeout(),
        )
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Post every record, one batch at a time and in order
    ///
    /// Returns the number of batches posted. An empty slice makes no calls.
    pub async fn post_all(&self, records: &[Record]) -> Result<usize> {
        let mut posted = 0;
        for batch in records.chunks(self.batch_size) {
            self.post_batch(batch).await?;
            posted += 1;
        }
        Ok(posted)
    }

    /// Post one batch as a single JSON array
    pub async fn post_batch(&self, batch: &[Record]) -> Result<()> {
        info!("Posting batch of {} animals...", batch.len());

        let body = serde_json::to_value(batch)?;
        let request = HttpRequest::post_json(&self.url, body, self.timeout);
        self.retry.execute_with_retry(&request).await?;

        info!("Posted batch successfully.");
        Ok(())
    }
}
