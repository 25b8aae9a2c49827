//! Common types used throughout quota-pager
//!
//! This module contains shared type definitions, type aliases,
//! and the wire representation of a listing page.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
///
/// Listing items are opaque to the pager and carried as raw JSON.
pub type JsonValue = serde_json::Value;

// ============================================================================
// Page
// ============================================================================

/// One decoded page of a paginated listing.
///
/// The wire shape is `{ "values": [...], "next": "<url>" }`. A missing or
/// null `next` marks the last page. Bitbucket-style listings also report
/// `page`, `pagelen` and `size`; those are kept for callers but never
/// drive pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Items on this page, in server order
    pub values: Vec<JsonValue>,

    /// Continuation link (absolute or relative)
    #[serde(default)]
    pub next: Option<String>,

    /// Page number reported by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,

    /// Page length reported by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagelen: Option<u64>,

    /// Total result size reported by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Page {
    /// Create a page from items and an optional continuation link
    pub fn new(values: Vec<JsonValue>, next: Option<String>) -> Self {
        Self {
            values,
            next,
            page: None,
            pagelen: None,
            size: None,
        }
    }

    /// Create a final page (no continuation link)
    pub fn last(values: Vec<JsonValue>) -> Self {
        Self::new(values, None)
    }

    /// Decode a page from a raw response body
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| Error::decode(e.to_string()))
    }

    /// Check if this is the last page
    pub fn is_last(&self) -> bool {
        self.next.as_deref().map_or(true, str::is_empty)
    }

    /// Split the page into its items and continuation link
    pub fn into_parts(self) -> (Vec<JsonValue>, Option<String>) {
        let next = self.next.filter(|n| !n.is_empty());
        (self.values, next)
    }
}
