//! Fluent resource queries

use crate::error::Result;
use crate::http::ApiConnection;
use crate::pagination::{PagedResponse, PaginationOptions};
use crate::query::{FilterOperator, QueryParameters};
use crate::types::Resource;
use futures::Stream;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;

/// Builder for a list or single-item query against one endpoint
///
/// `A` is the attributes type of the returned resources.
#[derive(Debug, Clone)]
pub struct ResourceQuery<A> {
    connection: ApiConnection,
    endpoint: String,
    parameters: QueryParameters,
    options: PaginationOptions,
    _attributes: PhantomData<fn() -> A>,
}

impl<A: DeserializeOwned + Send + 'static> ResourceQuery<A> {
    pub(crate) fn new(connection: ApiConnection, endpoint: impl Into<String>) -> Self {
        Self {
            connection,
            endpoint: endpoint.into(),
            parameters: QueryParameters::new(),
            options: PaginationOptions::default(),
            _attributes: PhantomData,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn parameters(&self) -> &QueryParameters {
        &self.parameters
    }

    /// Equality filter
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, value: impl Display) -> Self {
        self.parameters.add_filter(field, value);
        self
    }

    /// Operator filter
    #[must_use]
    pub fn filter_op(
        mut self,
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Display,
    ) -> Self {
        self.parameters.add_filter_op(field, value, operator);
        self
    }

    #[must_use]
    pub fn include(mut self, name: impl Into<String>) -> Self {
        self.parameters.add_include(name);
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.parameters.order_by(field);
        self
    }

    #[must_use]
    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.parameters.order_by_desc(field);
        self
    }

    #[must_use]
    pub fn select_fields<I, S>(mut self, resource_type: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters.select_fields(resource_type, fields);
        self
    }

    /// Page size for every request this query makes
    #[must_use]
    pub fn per_page(mut self, size: u32) -> Self {
        self.parameters.per_page = Some(size);
        self.options.page_size = Some(size);
        self
    }

    /// Start at a 1-based page
    pub fn with_page(mut self, page: u32, page_size: u32) -> Result<Self> {
        self.parameters.set_pagination(page, page_size)?;
        self.options.page_size = Some(page_size);
        Ok(self)
    }

    /// Arbitrary extra parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.parameters.add_custom(key, value);
        self
    }

    /// Stop `all` and `stream` after this many items
    #[must_use]
    pub fn max_items(mut self, max: usize) -> Self {
        self.options.max_items = Some(max);
        self
    }

    /// Replace the pagination options; an explicit page size is kept
    #[must_use]
    pub fn pagination(mut self, options: PaginationOptions) -> Self {
        let page_size = self.options.page_size;
        self.options = options;
        if self.options.page_size.is_none() {
            self.options.page_size = page_size;
        }
        self
    }

    /// Fetch a single page
    pub async fn fetch(&self) -> Result<PagedResponse<Resource<A>>> {
        self.connection
            .get_paged(&self.endpoint, &self.parameters)
            .await
    }

    /// Fetch the first matching resource
    pub async fn first(&self) -> Result<Option<Resource<A>>> {
        let mut parameters = self.parameters.clone();
        parameters.per_page = Some(1);
        let page = self
            .connection
            .get_paged::<Resource<A>>(&self.endpoint, &parameters)
            .await?;
        Ok(page.into_data().into_iter().next())
    }

    /// Fetch every matching resource
    pub async fn all(&self, cancel: &CancellationToken) -> Result<Vec<Resource<A>>> {
        self.connection
            .get_all(&self.endpoint, &self.parameters, &self.options, cancel)
            .await
    }

    /// Stream every matching resource
    pub fn stream(
        &self,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<Resource<A>>> + Send + 'static {
        self.connection
            .stream_all(&self.endpoint, &self.parameters, self.options.clone(), cancel)
    }
}
