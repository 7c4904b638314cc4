//! API connection with retry, auth and error classification
//!
//! `ApiConnection` is the single point of HTTP traffic. It handles:
//! - Credential injection from an `Authenticator`
//! - Automatic retries of transient failures with capped backoff
//! - Classification of error statuses into typed errors
//! - JSON:API envelope parsing and page binding
//! - Optional read-through caching of GET responses
//!
//! Cloning is cheap; clones share one HTTP client, authenticator and cache.

use super::retry::RetryPolicy;
use crate::auth::{authenticator_from_options, Authenticator};
use crate::cache::{cache_key, CacheProvider, MemoryCacheProvider};
use crate::config::ClientOptions;
use crate::error::{Error, ErrorContext, Result};
use crate::pagination::{
    PageContext, PagedEnvelope, PagedResponse, PaginationOptions,
};
use crate::query::QueryParameters;
use crate::types::{Document, Method, Resource, JSON_API_MEDIA_TYPE};
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

struct Inner {
    client: Client,
    options: ClientOptions,
    base_url: String,
    authenticator: Arc<dyn Authenticator>,
    cache: Option<Arc<dyn CacheProvider>>,
    retry: RetryPolicy,
}

/// Connection to the API
#[derive(Clone)]
pub struct ApiConnection {
    inner: Arc<Inner>,
}

/// Builder for an API connection
pub struct ApiConnectionBuilder {
    options: ClientOptions,
    authenticator: Option<Arc<dyn Authenticator>>,
    cache: Option<Arc<dyn CacheProvider>>,
    retry: Option<RetryPolicy>,
    client: Option<Client>,
}

impl ApiConnectionBuilder {
    /// Use a custom authenticator instead of the one the options select
    #[must_use]
    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Use a custom cache (enables caching)
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn CacheProvider>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Override the retry policy derived from the options
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Use a preconfigured reqwest client
    #[must_use]
    pub fn http_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Validate the options and build the connection
    pub fn build(self) -> Result<ApiConnection> {
        let options = self.options;
        if self.authenticator.is_some() {
            options.validate_transport()?;
        } else {
            options.validate()?;
        }

        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .timeout(options.request_timeout())
                .user_agent(&options.user_agent)
                .build()?,
        };

        let authenticator = match self.authenticator {
            Some(auth) => auth,
            None => authenticator_from_options(&options, client.clone())?,
        };

        let cache = self.cache.or_else(|| {
            options.enable_caching.then(|| {
                Arc::new(MemoryCacheProvider::new(
                    options.max_cache_size,
                    options.default_cache_expiration(),
                )) as Arc<dyn CacheProvider>
            })
        });

        let retry = self
            .retry
            .unwrap_or_else(|| RetryPolicy::from_options(&options));

        Ok(ApiConnection {
            inner: Arc::new(Inner {
                base_url: options.normalized_base_url(),
                client,
                options,
                authenticator,
                cache,
                retry,
            }),
        })
    }
}

impl ApiConnection {
    /// Create a connection from options
    pub fn new(options: ClientOptions) -> Result<Self> {
        Self::builder(options).build()
    }

    /// Start building a connection
    pub fn builder(options: ClientOptions) -> ApiConnectionBuilder {
        ApiConnectionBuilder {
            options,
            authenticator: None,
            cache: None,
            retry: None,
            client: None,
        }
    }

    /// Options the connection was built with
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Normalized base URL
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Retry policy in effect
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry
    }

    /// Attached cache, if any
    pub fn cache(&self) -> Option<&Arc<dyn CacheProvider>> {
        self.inner.cache.as_ref()
    }

    // ------------------------------------------------------------------------
    // Verbs
    // ------------------------------------------------------------------------

    /// GET a document
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.get_with_query(endpoint, &QueryParameters::default())
            .await
    }

    /// GET a document with query parameters
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &QueryParameters,
    ) -> Result<T> {
        let body = self.fetch_cached(endpoint, &params.to_query_string()).await?;
        parse_body(&body)
    }

    /// GET a single resource and unwrap its `data` member
    pub async fn get_resource<A: DeserializeOwned>(&self, endpoint: &str) -> Result<Resource<A>> {
        let document: Document<Resource<A>> = self.get(endpoint).await?;
        Ok(document.data)
    }

    /// POST a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        self.write(Method::POST, endpoint, Some(encode_body(body)?))
            .await
    }

    /// PUT a JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        self.write(Method::PUT, endpoint, Some(encode_body(body)?))
            .await
    }

    /// PATCH a JSON body
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        self.write(Method::PATCH, endpoint, Some(encode_body(body)?))
            .await
    }

    /// DELETE a resource
    pub async fn delete(&self, endpoint: &str) -> Result<()> {
        self.write::<Value>(Method::DELETE, endpoint, None).await?;
        Ok(())
    }

    /// GET one page of a list endpoint
    ///
    /// The returned page is bound to this connection, `endpoint` and
    /// `params` so it can fetch its neighbours.
    pub async fn get_paged<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &QueryParameters,
    ) -> Result<PagedResponse<T>> {
        let body = self.fetch_cached(endpoint, &params.to_query_string()).await?;
        let envelope: PagedEnvelope<T> = serde_json::from_str(&body).map_err(|e| Error::General {
            message: format!("failed to parse list response: {e}"),
            context: Some(ErrorContext::new("GET", endpoint).with_body(body.clone())),
        })?;

        let context = PageContext::new(self.clone(), endpoint, params.clone());
        Ok(PagedResponse::bound(
            envelope.data,
            envelope.meta,
            envelope.links,
            context,
        ))
    }

    /// Fetch every page into memory
    pub async fn get_all<T>(
        &self,
        endpoint: &str,
        params: &QueryParameters,
        options: &PaginationOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        options.validate()?;
        let params = with_page_size(params, options);
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let first = self.get_paged::<T>(endpoint, &params).await?;
        let mut items = Vec::with_capacity(options.initial_capacity());
        let mut stream = Box::pin(first.into_stream(options.clone(), cancel.clone()));
        while let Some(item) = stream.next().await {
            items.push(item?);
        }
        debug!(endpoint, count = items.len(), "Fetched all pages");
        Ok(items)
    }

    /// Lazily stream every item of a list endpoint
    pub fn stream_all<T>(
        &self,
        endpoint: &str,
        params: &QueryParameters,
        options: PaginationOptions,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<T>> + Send + 'static
    where
        T: DeserializeOwned + Send + 'static,
    {
        let connection = self.clone();
        let endpoint = endpoint.to_string();
        let params = with_page_size(params, &options);
        let first_cancel = cancel.clone();

        let first = stream::once(async move {
            options.validate()?;
            if first_cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let page = connection.get_paged::<T>(&endpoint, &params).await?;
            Ok((page, options))
        });

        first
            .map(move |first| match first {
                Ok((page, options)) => page.into_stream(options, cancel.clone()).left_stream(),
                Err(e) => stream::once(async move { Err(e) }).right_stream(),
            })
            .flatten()
    }

    // ------------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------------

    async fn fetch_cached(&self, endpoint: &str, query: &str) -> Result<String> {
        let Some(cache) = &self.inner.cache else {
            return self.send(Method::GET, endpoint, query, None).await;
        };

        let key = cache_key(endpoint, query);
        if let Some(body) = cache.get(&key).await {
            debug!(key, "Cache hit");
            return Ok(body);
        }

        let body = self.send(Method::GET, endpoint, query, None).await?;
        cache
            .set(&key, body.clone(), self.inner.options.default_cache_expiration())
            .await;
        Ok(body)
    }

    async fn write<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T> {
        let response = self.send(method, endpoint, "", body).await?;
        if let Some(cache) = self.inner.cache.as_ref().filter(|_| method.is_write()) {
            invalidate_for_write(cache.as_ref(), endpoint).await;
        }
        parse_body(&response)
    }

    /// Send a request, retrying transient failures
    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        query: &str,
        body: Option<Vec<u8>>,
    ) -> Result<String> {
        let url = self.build_url(endpoint, query);
        let policy = &self.inner.retry;
        let mut retry = 0;

        loop {
            let credential = self.inner.authenticator.credential().await?;
            let result = self
                .send_once(method, endpoint, &url, &credential.header_value(), body.as_deref())
                .await;

            match result {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && policy.allows(retry + 1) => {
                    retry += 1;
                    let delay = policy.delay_for(retry, e.retry_after());
                    warn!(
                        %method,
                        endpoint,
                        attempt = retry,
                        max_retries = policy.max_retries,
                        ?delay,
                        "Request failed ({e}), retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        endpoint: &str,
        url: &str,
        authorization: &str,
        body: Option<&[u8]>,
    ) -> Result<String> {
        let detailed = self.inner.options.enable_detailed_logging;
        let mut req = self
            .inner
            .client
            .request(method.into(), url)
            .header(ACCEPT, JSON_API_MEDIA_TYPE)
            .header(AUTHORIZATION, authorization);

        for (key, value) in &self.inner.options.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if let Some(body) = body {
            req = req
                .header(CONTENT_TYPE, JSON_API_MEDIA_TYPE)
                .body(body.to_vec());
        }

        if detailed {
            let payload = body.map(String::from_utf8_lossy);
            debug!(%method, url, body = ?payload, "Sending request");
        } else {
            debug!(%method, url, "Sending request");
        }

        let response = req.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let request_id = headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let text = response.text().await?;

        if detailed {
            debug!(%method, endpoint, status = status.as_u16(), ?request_id, body = %text, "Received response");
        } else {
            debug!(%method, endpoint, status = status.as_u16(), ?request_id, "Received response");
        }

        if status.is_success() {
            return Ok(text);
        }

        error!(
            %method,
            endpoint,
            status = status.as_u16(),
            ?request_id,
            "Request failed"
        );
        let context = ErrorContext::new(method.to_string(), endpoint)
            .with_request_id(request_id)
            .with_body(text);
        Err(Error::from_status(status.as_u16(), &headers, context))
    }

    fn build_url(&self, endpoint: &str, query: &str) -> String {
        let mut url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!(
                "{}/{}",
                self.inner.base_url,
                endpoint.trim_start_matches('/')
            )
        };
        if !query.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(query);
        }
        url
    }
}

impl std::fmt::Debug for ApiConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConnection")
            .field("base_url", &self.inner.base_url)
            .field("retry", &self.inner.retry)
            .field("has_cache", &self.inner.cache.is_some())
            .finish_non_exhaustive()
    }
}

fn with_page_size(params: &QueryParameters, options: &PaginationOptions) -> QueryParameters {
    let mut params = params.clone();
    if let Some(size) = options.page_size {
        params.per_page = Some(size);
    }
    params
}

/// Serialize a request body, omitting null-valued properties
fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>> {
    let mut value = serde_json::to_value(body)?;
    strip_nulls(&mut value);
    Ok(serde_json::to_vec(&value)?)
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

/// Parse a response body; an empty body parses as JSON `null`
fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    let text = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(text).map_err(|e| Error::General {
        message: format!("failed to parse response: {e}"),
        context: None,
    })
}

/// Evict cached reads of a written resource and of its parent collection
async fn invalidate_for_write(cache: &dyn CacheProvider, endpoint: &str) {
    let endpoint = endpoint.trim_end_matches('/');
    cache.remove_prefix(endpoint).await;
    if let Some((parent, _)) = endpoint.rsplit_once('/') {
        if !parent.is_empty() {
            cache.remove(parent).await;
            cache.remove_prefix(&format!("{parent}?")).await;
        }
    }
}
