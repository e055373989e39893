//! Page-number pagination over GitHub list endpoints.

use std::time::Duration;

use metrics::counter;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::client::{GitHubClient, GitHubError};
use crate::config::SyncConfig;

/// Limits for a multi-page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Soft cap: no page is requested once this many items have accumulated
    pub max_items: usize,
    /// `per_page` sent with every request
    pub page_size: u32,
    /// Pause between consecutive page requests
    pub page_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_items: 2000,
            page_size: 100,
            page_delay: Duration::from_millis(100),
        }
    }
}

impl FetchOptions {
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items,
            ..Default::default()
        }
    }

    /// Page size and delay from configuration, with the given cap
    pub fn from_sync_config(config: &SyncConfig, max_items: usize) -> Self {
        Self {
            max_items,
            page_size: config.page_size,
            page_delay: config.page_delay(),
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }
}

impl GitHubClient {
    /// Fetch every page of `path`, starting at page 1, and concatenate the items.
    ///
    /// Stops after an empty page, after a page shorter than `page_size`, or once the
    /// accumulated count reaches `max_items`. The last page is kept whole, so the
    /// result may exceed the cap by up to one page. Any failed request aborts the
    /// whole fetch.
    pub async fn fetch_all_pages(
        &self,
        path: &str,
        options: &FetchOptions,
    ) -> Result<Vec<Value>, GitHubError> {
        let page_size = options.page_size.max(1);
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let batch = self.get_page(path, page, page_size).await?;
            let received = batch.len();
            items.extend(batch);

            if received == 0 {
                break;
            }

            if items.len() >= options.max_items {
                warn!(
                    path,
                    fetched = items.len(),
                    max_items = options.max_items,
                    "item cap reached, stopping pagination"
                );
                counter!("github_fetch_cap_reached_total").increment(1);
                break;
            }

            if received < page_size as usize {
                break;
            }

            page += 1;
            if !options.page_delay.is_zero() {
                sleep(options.page_delay).await;
            }
        }

        debug!(path, pages = page, count = items.len(), "pagination complete");
        Ok(items)
    }
}
