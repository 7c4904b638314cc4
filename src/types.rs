//! Common types used throughout the client
//!
//! This module contains shared type definitions, type aliases,
//! and the JSON:API resource shape used across all modules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Media type for every request and response body
pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Default API host
pub const DEFAULT_BASE_URL: &str = "https://api.planningcenteronline.com";

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl Method {
    /// Whether requests with this method modify server state
    pub fn is_write(self) -> bool {
        !matches!(self, Method::GET)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::PATCH => reqwest::Method::PATCH,
            Method::DELETE => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
            Method::DELETE => "DELETE",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Product Modules
// ============================================================================

/// Planning Center product module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Module {
    People,
    Giving,
    Calendar,
    CheckIns,
    Groups,
    Registrations,
    Publishing,
    Services,
    Webhooks,
}

impl Module {
    /// All modules, in documentation order
    pub const ALL: [Module; 9] = [
        Module::People,
        Module::Giving,
        Module::Calendar,
        Module::CheckIns,
        Module::Groups,
        Module::Registrations,
        Module::Publishing,
        Module::Services,
        Module::Webhooks,
    ];

    /// API base path for this module
    pub fn base_path(self) -> &'static str {
        match self {
            Module::People => "/people/v2",
            Module::Giving => "/giving/v2",
            Module::Calendar => "/calendar/v2",
            Module::CheckIns => "/check-ins/v2",
            Module::Groups => "/groups/v2",
            Module::Registrations => "/registrations/v2",
            Module::Publishing => "/publishing/v2",
            Module::Services => "/services/v2",
            Module::Webhooks => "/webhooks/v2",
        }
    }

    /// Join a resource path onto this module's base path
    pub fn path(self, resource: &str) -> String {
        let resource = resource.trim_start_matches('/');
        if resource.is_empty() {
            self.base_path().to_string()
        } else {
            format!("{}/{resource}", self.base_path())
        }
    }
}

// ============================================================================
// JSON:API Resources
// ============================================================================

/// A JSON:API resource object
///
/// `A` is the attributes payload; use [`JsonValue`] when the shape is not
/// known ahead of time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource<A = JsonValue> {
    /// Resource id
    pub id: String,

    /// Resource type (e.g. "Person")
    #[serde(rename = "type")]
    pub kind: String,

    /// Resource attributes
    pub attributes: A,

    /// Relationship linkage, verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<JsonValue>,

    /// Resource links
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, Option<String>>,
}

/// Single-resource document: `{ "data": { ... } }`
#[derive(Debug, Clone, Deserialize)]
pub struct Document<T> {
    pub data: T,
}

/// Attributes of the authenticated person
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUserAttributes {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// The authenticated person
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
    /// False when the lookup failed and this is a stand-in value
    pub is_authenticated: bool,
}

impl CurrentUser {
    /// Stand-in returned when the current user cannot be resolved
    pub fn placeholder() -> Self {
        Self {
            id: "unknown".to_string(),
            name: "Unknown User".to_string(),
            first_name: None,
            last_name: None,
            avatar: None,
            is_authenticated: false,
        }
    }
}

impl From<Resource<CurrentUserAttributes>> for CurrentUser {
    fn from(resource: Resource<CurrentUserAttributes>) -> Self {
        let attrs = resource.attributes;
        let name = attrs.name.clone().unwrap_or_else(|| {
            [attrs.first_name.as_deref(), attrs.last_name.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
        });
        Self {
            id: resource.id,
            name,
            first_name: attrs.first_name,
            last_name: attrs.last_name,
            avatar: attrs.avatar,
            is_authenticated: true,
        }
    }
}
