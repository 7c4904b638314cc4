//! Lazy multi-page streams
//!
//! Streams are forward-only and single-pass. Cancellation is checked
//! before every page and while a page request is in flight. With
//! `prefetch_next_page` the following page is requested on a background
//! task as soon as the current one is handed out.

use super::response::{PageRequest, PagedResponse};
use super::types::PaginationOptions;
use crate::error::{Error, Result};
use futures::stream::{self, Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

enum Next<T> {
    Ready(PagedResponse<T>),
    Fetch(PageRequest),
    Prefetching(JoinHandle<Result<PagedResponse<T>>>),
    Done,
}

struct State<T> {
    next: Next<T>,
    options: PaginationOptions,
    cancel: CancellationToken,
}

impl<T> Drop for State<T> {
    fn drop(&mut self) {
        if let Next::Prefetching(handle) = &self.next {
            handle.abort();
        }
    }
}

impl<T: DeserializeOwned + Send + 'static> State<T> {
    async fn advance(&mut self) -> Option<Result<PagedResponse<T>>> {
        let next = std::mem::replace(&mut self.next, Next::Done);

        if self.cancel.is_cancelled() {
            if let Next::Prefetching(handle) = &next {
                handle.abort();
            }
            return match next {
                Next::Done => None,
                _ => Some(Err(Error::Cancelled)),
            };
        }

        let page = match next {
            Next::Done => return None,
            Next::Ready(page) => page,
            Next::Fetch(request) => {
                if let Some(delay) = self.options.delay_between_pages {
                    tokio::select! {
                        () = self.cancel.cancelled() => return Some(Err(Error::Cancelled)),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                let fetched = tokio::select! {
                    () = self.cancel.cancelled() => Err(Error::Cancelled),
                    page = request.fetch::<T>() => page,
                };
                match fetched {
                    Ok(page) => page,
                    Err(e) => return Some(Err(e)),
                }
            }
            Next::Prefetching(mut handle) => {
                let joined = tokio::select! {
                    () = self.cancel.cancelled() => {
                        handle.abort();
                        return Some(Err(Error::Cancelled));
                    }
                    joined = &mut handle => joined,
                };
                match joined {
                    Ok(Ok(page)) => page,
                    Ok(Err(e)) => return Some(Err(e)),
                    Err(e) => return Some(Err(Error::general(format!("page prefetch failed: {e}")))),
                }
            }
        };

        self.next = match page.next_request() {
            None => Next::Done,
            Some(request) if self.options.prefetch_next_page => {
                let delay = self.options.delay_between_pages;
                Next::Prefetching(tokio::spawn(async move {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    request.fetch::<T>().await
                }))
            }
            Some(request) => Next::Fetch(request),
        };

        Some(Ok(page))
    }
}

/// Stream of pages starting with `first`
pub(crate) fn page_stream<T>(
    first: PagedResponse<T>,
    options: PaginationOptions,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<PagedResponse<T>>> + Send
where
    T: DeserializeOwned + Send + 'static,
{
    let state = State {
        next: Next::Ready(first),
        options,
        cancel,
    };

    stream::unfold(state, |mut state| async move {
        let item = state.advance().await?;
        Some((item, state))
    })
}

/// Stream of items starting with the items of `first`, capped by `max_items`
pub(crate) fn item_stream<T>(
    first: PagedResponse<T>,
    options: PaginationOptions,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<T>> + Send
where
    T: DeserializeOwned + Send + 'static,
{
    let limit = options.max_items.unwrap_or(usize::MAX);

    page_stream(first, options, cancel)
        .flat_map(|page| match page {
            Ok(page) => stream::iter(page.into_data().into_iter().map(Ok)).left_stream(),
            Err(e) => stream::once(async move { Err(e) }).right_stream(),
        })
        .take(limit)
}
