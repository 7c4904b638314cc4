//! Query module
//!
//! `QueryParameters` renders JSON:API query strings:
//!
//! ```text
//! where[field]=v  where[field][gte]=v  include=a,b  order=-field
//! fields[Person]=a,b  per_page=25  offset=50
//! ```

mod parameters;

pub use parameters::{Filter, FilterOperator, QueryParameters};
