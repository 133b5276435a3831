//! Paginated extraction
//!
//! Walks the listing endpoint page by page and fetches the full record for
//! every listed id. A page whose listing or any detail fetch fails is dropped
//! as a whole and the walk moves on, so the result is best-effort.

use crate::config::EtlConfig;
use crate::error::Result;
use crate::http::{HttpRequest, Transport};
use crate::record::{id_segment, ListingItem, Page, Record};
use crate::retry::RetryPolicy;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fetches every animal from the listing and detail endpoints
pub struct Extractor<T> {
    retry: RetryPolicy<T>,
    base_url: String,
    timeout: Duration,
    max_pages: Option<u32>,
}

impl<T: Transport> Extractor<T> {
    pub fn new(retry: RetryPolicy<T>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            retry,
            base_url: base_url.into(),
            timeout,
            max_pages: None,
        }
    }

    pub fn from_config(transport: T, config: &EtlConfig) -> Self {
        Self::new(
            RetryPolicy::from_config(transport, config),
            config.animals_url.clone(),
            config.timeout(),
        )
        .with_max_pages(config.max_pages)
    }

    /// Never request a page number above `max_pages`
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// URL of one animal's detail record
    pub fn detail_url(&self, id: &Value) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), id_segment(id))
    }

    /// Fetch a single animal by id
    pub async fn fetch_detail(&self, id: &Value) -> Result<Record> {
        let url = self.detail_url(id);
        let response = self
            .retry
            .execute_with_retry(&HttpRequest::get(&url, self.timeout))
            .await?;
        response.json(&url)
    }

    /// Fetch one listing page
    pub async fn fetch_page(&self, page: u32) -> Result<Page> {
        let request = HttpRequest::get(&self.base_url, self.timeout).with_query("page", page);
        let response = self.retry.execute_with_retry(&request).await?;
        response.json(&self.base_url)
    }

    /// Fetch every animal, in page order then listing order
    ///
    /// Paging stops at the first page with no items or, once the first
    /// successful listing has reported `total_pages`, after that page.
    pub async fn fetch_all(&self) -> Vec<Record> {
        let mut records = Vec::new();
        let mut total_pages: Option<u32> = None;
        let mut seen_listing = false;
        let mut page: u32 = 1;

        loop {
            if total_pages.is_some_and(|total| page > total) {
                debug!(page, "Passed the last reported page");
                break;
            }

            if self.max_pages.is_some_and(|max| page > max) {
                info!(max_pages = ?self.max_pages, "Reached page limit, stopping");
                break;
            }

            let listing = match self.fetch_page(page).await {
                Ok(listing) => listing,
                Err(err) => {
                    warn!("Failed to fetch page {}: {}. Skipping page.", page, err);
                    page += 1;
                    continue;
                }
            };

            if !seen_listing {
                seen_listing = true;
                total_pages = listing.total_pages;
                debug!(total_pages = ?total_pages, "First listing received");
            }

            if listing.items.is_empty() {
                debug!(page, "Empty page, no more animals");
                break;
            }

            match self.fetch_details(&listing.items).await {
                Ok(details) => {
                    info!("Fetched {} animals from page {}", details.len(), page);
                    records.extend(details);
                }
                Err(err) => {
                    warn!("Failed to fetch animals on page {}: {}. Skipping page.", page, err);
                }
            }

            page += 1;
        }

        records
    }

    /// All or nothing: the first failed detail fetch fails the page
    async fn fetch_details(&self, items: &[ListingItem]) -> Result<Vec<Record>> {
        let mut details = Vec::with_capacity(items.len());
        for item in items {
            details.push(self.fetch_detail(&item.id).await?);
        }
        Ok(details)
    }
}
