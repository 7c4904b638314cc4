//! Paged responses and page navigation
//!
//! A `PagedResponse` is either unbound (built by hand) or bound to the
//! connection, endpoint and parameters that produced it. Only bound pages
//! can navigate; unbound pages report "no page" instead of failing.
//!
//! Link presence gates navigation; the follow-up offset is computed from
//! `meta.offset` and the page size, so parameter overrides carry over to
//! every page. Navigation never requests the offset it is already on.

use super::stream::{item_stream, page_stream};
use super::types::{PagedResponseLinks, PagedResponseMeta, PaginationOptions};
use crate::error::{Error, Result};
use crate::http::ApiConnection;
use crate::query::QueryParameters;
use futures::Stream;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Where a page came from
#[derive(Debug, Clone)]
pub struct PageContext {
    connection: ApiConnection,
    endpoint: String,
    parameters: QueryParameters,
}

impl PageContext {
    pub fn new(
        connection: ApiConnection,
        endpoint: impl Into<String>,
        parameters: QueryParameters,
    ) -> Self {
        Self {
            connection,
            endpoint: endpoint.into(),
            parameters,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn parameters(&self) -> &QueryParameters {
        &self.parameters
    }
}

/// A ready-to-send request for an adjacent page
#[derive(Debug, Clone)]
pub struct PageRequest {
    context: PageContext,
    offset: u32,
}

impl PageRequest {
    /// Offset the request will ask for
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Send the request
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<PagedResponse<T>> {
        let mut parameters = self.context.parameters;
        parameters.offset = Some(self.offset);
        debug!(endpoint = %self.context.endpoint, offset = self.offset, "Fetching page");
        self.context
            .connection
            .get_paged(&self.context.endpoint, &parameters)
            .await
    }
}

/// One page of results
#[derive(Debug, Clone)]
pub struct PagedResponse<T> {
    data: Vec<T>,
    meta: PagedResponseMeta,
    links: PagedResponseLinks,
    context: Option<PageContext>,
}

impl<T> PagedResponse<T> {
    /// An unbound page; navigation always reports no page
    pub fn new(data: Vec<T>, meta: PagedResponseMeta, links: PagedResponseLinks) -> Self {
        Self {
            data,
            meta,
            links,
            context: None,
        }
    }

    /// A page bound to its fetch context
    pub fn bound(
        data: Vec<T>,
        meta: PagedResponseMeta,
        links: PagedResponseLinks,
        context: PageContext,
    ) -> Self {
        Self {
            data,
            meta,
            links,
            context: Some(context),
        }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn meta(&self) -> &PagedResponseMeta {
        &self.meta
    }

    pub fn links(&self) -> &PagedResponseLinks {
        &self.links
    }

    pub fn context(&self) -> Option<&PageContext> {
        self.context.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.context.is_some()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn has_next_page(&self) -> bool {
        self.links.can_navigate_next()
    }

    pub fn has_previous_page(&self) -> bool {
        self.links.can_navigate_previous()
    }

    /// Page size used for offset math
    ///
    /// Falls back to the bound `per_page` parameter and then to the number
    /// of items on this page when `meta.per_page` is missing.
    pub fn page_size(&self) -> u32 {
        if self.meta.per_page > 0 {
            return self.meta.per_page;
        }
        self.context
            .as_ref()
            .and_then(|context| context.parameters.per_page)
            .filter(|&size| size > 0)
            .unwrap_or_else(|| u32::try_from(self.data.len()).unwrap_or(u32::MAX))
    }

    /// Furthest of the requested and reported offsets of this page
    fn current_offset(&self) -> u32 {
        self.context
            .as_ref()
            .and_then(|context| context.parameters.offset)
            .map_or(self.meta.offset, |requested| requested.max(self.meta.offset))
    }

    /// Offset of the following page
    pub fn next_offset(&self) -> u32 {
        self.meta.offset.saturating_add(self.page_size())
    }

    /// Offset of the preceding page, clamped at zero
    pub fn previous_offset(&self) -> u32 {
        self.meta.offset.saturating_sub(self.page_size())
    }

    /// Request for the next page, if one exists and this page is bound
    ///
    /// A next offset that does not move past this page means there is no
    /// way forward, whatever the links say.
    pub fn next_request(&self) -> Option<PageRequest> {
        if !self.has_next_page() {
            return None;
        }
        let offset = self.next_offset();
        if offset <= self.current_offset() {
            debug!(offset, "Next link present but page size is unknown; stopping");
            return None;
        }
        self.context.as_ref().map(|context| PageRequest {
            context: context.clone(),
            offset,
        })
    }

    /// Request for the previous page, if one exists and this page is bound
    pub fn previous_request(&self) -> Option<PageRequest> {
        if !self.has_previous_page() {
            return None;
        }
        let offset = self.previous_offset();
        if offset >= self.meta.offset {
            return None;
        }
        self.context.as_ref().map(|context| PageRequest {
            context: context.clone(),
            offset,
        })
    }
}

impl<T: DeserializeOwned> PagedResponse<T> {
    /// Fetch the next page; `None` when there is none or this page is unbound
    pub async fn next_page(&self) -> Result<Option<PagedResponse<T>>> {
        match self.next_request() {
            Some(request) => request.fetch().await.map(Some),
            None => Ok(None),
        }
    }

    /// Fetch the previous page; `None` when there is none or this page is unbound
    pub async fn previous_page(&self) -> Result<Option<PagedResponse<T>>> {
        match self.previous_request() {
            Some(request) => request.fetch().await.map(Some),
            None => Ok(None),
        }
    }

    /// Collect this page and every following page into memory
    pub async fn all_remaining(self, cancel: &CancellationToken) -> Result<Vec<T>> {
        let mut next = self.next_request();
        let mut items = self.data;

        while let Some(request) = next {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let page = tokio::select! {
                () = cancel.cancelled() => return Err(Error::Cancelled),
                page = request.fetch::<T>() => page?,
            };
            next = page.next_request();
            items.extend(page.data);
        }

        Ok(items)
    }
}

impl<T: DeserializeOwned + Send + 'static> PagedResponse<T> {
    /// Lazily yield this page and every following page
    ///
    /// Each call to this method on a fresh first page issues its own
    /// requests; nothing is cached between streams.
    pub fn into_page_stream(
        self,
        options: PaginationOptions,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<PagedResponse<T>>> + Send {
        page_stream(self, options, cancel)
    }

    /// Lazily yield every item of this page and the following pages
    pub fn into_stream(
        self,
        options: PaginationOptions,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<T>> + Send {
        item_stream(self, options, cancel)
    }
}
