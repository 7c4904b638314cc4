//! Pagination types
//!
//! Page metadata and links as reported by the server, plus the options
//! that drive multi-page drains.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for fetching many pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationOptions {
    /// Items per page; `None` uses the server default
    pub page_size: Option<u32>,
    /// Stop after this many items across all pages
    pub max_items: Option<usize>,
    /// Expected result size, used to pre-size buffers
    pub estimated_total_count: usize,
    /// Pause before each follow-up page request
    pub delay_between_pages: Option<Duration>,
    /// Fetch the next page in the background while the current one is consumed
    pub prefetch_next_page: bool,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            page_size: None,
            max_items: None,
            estimated_total_count: 1000,
            delay_between_pages: None,
            prefetch_next_page: false,
        }
    }
}

impl PaginationOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Small pages, nothing held ahead of the consumer
    pub fn memory_efficient() -> Self {
        Self {
            page_size: Some(25),
            estimated_total_count: 100,
            ..Default::default()
        }
    }

    /// Large pages with the next one fetched ahead
    pub fn speed_optimized() -> Self {
        Self {
            page_size: Some(100),
            prefetch_next_page: true,
            ..Default::default()
        }
    }

    /// Large pages, throttled to stay under rate limits
    pub fn large_dataset() -> Self {
        Self {
            page_size: Some(100),
            estimated_total_count: 10_000,
            delay_between_pages: Some(Duration::from_millis(100)),
            ..Default::default()
        }
    }

    /// Set the page size
    #[must_use]
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Cap the number of items
    #[must_use]
    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    /// Pause between page requests
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay_between_pages = Some(delay);
        self
    }

    /// Enable or disable background prefetch
    #[must_use]
    pub fn prefetch(mut self, enabled: bool) -> Self {
        self.prefetch_next_page = enabled;
        self
    }

    /// Reject a zero page size
    pub fn validate(&self) -> Result<()> {
        if self.page_size == Some(0) {
            return Err(Error::validation("page size must be at least 1"));
        }
        Ok(())
    }

    /// Initial buffer capacity for a full drain
    pub fn initial_capacity(&self) -> usize {
        self.max_items
            .map_or(self.estimated_total_count, |max| {
                max.min(self.estimated_total_count)
            })
    }
}

/// Position of a page within the full result set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagedResponseMeta {
    pub total_count: u32,
    pub per_page: u32,
    pub current_page: u32,
    pub total_pages: u32,
    pub offset: u32,
    pub count: u32,
}

impl PagedResponseMeta {
    pub fn is_first_page(&self) -> bool {
        self.current_page == 1
    }

    pub fn is_last_page(&self) -> bool {
        self.current_page == self.total_pages
    }

    /// Percentage of pages seen so far (0 when the page count is unknown)
    pub fn progress_percentage(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        f64::from(self.current_page) / f64::from(self.total_pages) * 100.0
    }
}

/// Navigation links reported by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagedResponseLinks {
    pub first: Option<String>,
    #[serde(alias = "prev")]
    pub previous: Option<String>,
    #[serde(rename = "self")]
    pub self_link: Option<String>,
    pub next: Option<String>,
    pub last: Option<String>,
}

impl PagedResponseLinks {
    pub fn can_navigate_next(&self) -> bool {
        self.next.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn can_navigate_previous(&self) -> bool {
        self.previous.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// JSON:API list envelope
#[derive(Debug, Deserialize)]
pub(crate) struct PagedEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: PagedResponseMeta,
    #[serde(default)]
    pub links: PagedResponseLinks,
}
