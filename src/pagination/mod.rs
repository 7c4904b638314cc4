//! Pagination module
//!
//! # Overview
//!
//! List endpoints return a JSON:API envelope (`data`, `meta`, `links`).
//! `ApiConnection::get_paged` turns it into a `PagedResponse` bound to the
//! request that produced it, which can then fetch neighbouring pages,
//! drain everything into a `Vec`, or stream items lazily.

mod response;
mod stream;
mod types;

pub(crate) use types::PagedEnvelope;

pub use response::{PageContext, PageRequest, PagedResponse};
pub use types::{PagedResponseLinks, PagedResponseMeta, PaginationOptions};
