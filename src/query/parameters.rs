//! Query parameter builder
//!
//! Accumulates filter, include, sort, sparse fieldset and pagination
//! intent and renders it into a JSON:API-style query string. Every map is
//! ordered so rendering is deterministic, and every collection is owned so
//! `clone()` yields an independent copy.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Write as _};

/// Comparison applied by a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
}

impl FilterOperator {
    /// Bracketed suffix appended after the field name, if any
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            FilterOperator::Equal => None,
            FilterOperator::NotEqual => Some("not"),
            FilterOperator::GreaterThan => Some("gt"),
            FilterOperator::GreaterThanOrEqual => Some("gte"),
            FilterOperator::LessThan => Some("lt"),
            FilterOperator::LessThanOrEqual => Some("lte"),
            FilterOperator::Contains => Some("contains"),
            FilterOperator::StartsWith => Some("starts_with"),
            FilterOperator::EndsWith => Some("ends_with"),
            FilterOperator::In => Some("in"),
            FilterOperator::NotIn => Some("not_in"),
        }
    }
}

/// A single operator filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub value: String,
    pub operator: FilterOperator,
}

/// Structured query for a list endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    /// Equality filters, last write per field wins
    pub where_: BTreeMap<String, String>,
    /// Operator filters, rendered in insertion order
    pub filters: Vec<Filter>,
    /// Relationships to include (deduplicated)
    pub include: Vec<String>,
    /// Sort field, `-` prefix for descending
    pub order_by: Option<String>,
    /// Sparse fieldsets: resource type -> fields
    pub fields: BTreeMap<String, Vec<String>>,
    /// Arbitrary extra parameters
    pub custom: BTreeMap<String, String>,
    /// Rendered as `meta[key]=value`
    pub meta: BTreeMap<String, String>,
    /// Page size; `None` uses the server default
    pub per_page: Option<u32>,
    /// Zero-based item offset; `None` uses the server default
    pub offset: Option<u32>,
}

impl QueryParameters {
    /// Create empty parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter (`where[field]=value`)
    pub fn add_filter(&mut self, field: impl Into<String>, value: impl Display) -> &mut Self {
        self.where_.insert(field.into(), value.to_string());
        self
    }

    /// Alias of [`add_filter`](Self::add_filter)
    pub fn add(&mut self, field: impl Into<String>, value: impl Display) -> &mut Self {
        self.add_filter(field, value)
    }

    /// Append an operator filter (`where[field][op]=value`)
    pub fn add_filter_op(
        &mut self,
        field: impl Into<String>,
        value: impl Display,
        operator: FilterOperator,
    ) -> &mut Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.to_string(),
            operator,
        });
        self
    }

    /// Append a list filter; values are joined with commas
    pub fn add_filter_in<I, V>(
        &mut self,
        field: impl Into<String>,
        values: I,
        operator: FilterOperator,
    ) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        let joined = values
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.add_filter_op(field, joined, operator)
    }

    /// Include a relationship, ignoring duplicates
    pub fn add_include(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !self.include.contains(&name) {
            self.include.push(name);
        }
        self
    }

    /// Sort ascending by `field`
    pub fn order_by(&mut self, field: impl Into<String>) -> &mut Self {
        self.order_by = Some(field.into());
        self
    }

    /// Sort descending by `field`
    pub fn order_by_desc(&mut self, field: impl Into<String>) -> &mut Self {
        self.order_by = Some(format!("-{}", field.into()));
        self
    }

    /// Restrict the fields returned for a resource type
    pub fn select_fields<I, S>(&mut self, resource_type: impl Into<String>, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.insert(
            resource_type.into(),
            fields.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Add an arbitrary parameter
    pub fn add_custom(&mut self, key: impl Into<String>, value: impl Display) -> &mut Self {
        self.custom.insert(key.into(), value.to_string());
        self
    }

    /// Add a `meta[key]` parameter
    pub fn add_meta(&mut self, key: impl Into<String>, value: impl Display) -> &mut Self {
        self.meta.insert(key.into(), value.to_string());
        self
    }

    /// Select a 1-based page of `page_size` items
    pub fn set_pagination(&mut self, page: u32, page_size: u32) -> Result<&mut Self> {
        if page < 1 {
            return Err(Error::validation(format!(
                "page must be at least 1, got {page}"
            )));
        }
        if page_size < 1 {
            return Err(Error::validation(format!(
                "page size must be at least 1, got {page_size}"
            )));
        }
        self.per_page = Some(page_size);
        self.offset = Some((page - 1).saturating_mul(page_size));
        Ok(self)
    }

    /// Whether nothing would be rendered
    pub fn is_empty(&self) -> bool {
        self.to_query_string().is_empty()
    }

    /// Render as a query string (without the leading `?`)
    ///
    /// Order: where, include, order, fields, custom, meta, filters,
    /// per_page, offset.
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        for (field, value) in &self.where_ {
            parts.push(format!("where[{}]={}", encode(field), encode(value)));
        }

        if !self.include.is_empty() {
            parts.push(format!("include={}", join_encoded(&self.include)));
        }

        if let Some(order) = &self.order_by {
            parts.push(format!("order={}", encode(order)));
        }

        for (resource_type, fields) in &self.fields {
            parts.push(format!(
                "fields[{}]={}",
                encode(resource_type),
                join_encoded(fields)
            ));
        }

        for (key, value) in &self.custom {
            parts.push(format!("{}={}", encode(key), encode(value)));
        }

        for (key, value) in &self.meta {
            parts.push(format!("meta[{}]={}", encode(key), encode(value)));
        }

        for filter in &self.filters {
            let mut key = format!("where[{}]", encode(&filter.field));
            if let Some(suffix) = filter.operator.suffix() {
                let _ = write!(key, "[{suffix}]");
            }
            parts.push(format!("{key}={}", encode(&filter.value)));
        }

        if let Some(per_page) = self.per_page {
            parts.push(format!("per_page={per_page}"));
        }

        if let Some(offset) = self.offset {
            parts.push(format!("offset={offset}"));
        }

        parts.join("&")
    }
}

impl Display for QueryParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

fn encode(s: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(s)
}

fn join_encoded(items: &[String]) -> String {
    items
        .iter()
        .map(|s| encode(s).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}
