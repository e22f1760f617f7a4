//! Page content management.
//!
//! This module provides:
//! - PageService: capability-checked CRUD over the page store
//! - ListArgs / QueryVarPolicy: collection query parsing and `filter[...]` gating
//! - FilterPipeline: rendering of titles, content and excerpts
//! - slug helpers: derivation and sibling uniqueness

mod filter;
mod page_service;
mod presenter;
mod query;
mod slug;

use chrono::FixedOffset;

pub use filter::{
    AutoParagraphFilter, FilterPipeline, SanitizeHtmlFilter, TextFilter, excerpt_from_content,
};
pub use page_service::{Deletion, PageList, PageService};
pub use presenter::{page_links, render_page};
pub use query::{DeleteArgs, LIST_PARAMS, ListArgs, QueryParams, QueryVarPolicy, SingleArgs};
pub use slug::{sanitize_title, unique_slug};

/// REST namespace served by this crate.
pub const NAMESPACE: &str = "wp/v2";

/// Collection segment under the namespace.
pub const REST_BASE: &str = "pages";

/// Site identity used for links and local dates.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteInfo {
    /// Public base URL without a trailing slash.
    pub url: String,
    /// Offset of the site's local time from UTC.
    pub gmt_offset: FixedOffset,
}

impl SiteInfo {
    /// Absolute URL of a REST route (`path` has no leading slash).
    pub fn rest_url(&self, path: &str) -> String {
        format!("{}/{}", self.url, path)
    }

    pub fn collection_url(&self) -> String {
        self.rest_url(&format!("{NAMESPACE}/{REST_BASE}"))
    }

    pub fn item_url(&self, id: i64) -> String {
        format!("{}/{id}", self.collection_url())
    }

    /// Permanent, status-independent address of a page.
    pub fn guid(&self, id: i64) -> String {
        format!("{}/?page_id={id}", self.url)
    }
}

/// Page size bounds for collection requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationLimits {
    pub default_per_page: u64,
    pub max_per_page: u64,
}

impl Default for PaginationLimits {
    fn default() -> Self {
        Self {
            default_per_page: 10,
            max_per_page: 100,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn urls_hang_off_site_root() {
        let site = SiteInfo {
            url: "http://example.org".to_string(),
            gmt_offset: FixedOffset::east_opt(0).unwrap(),
        };
        assert_eq!(site.collection_url(), "http://example.org/wp/v2/pages");
        assert_eq!(site.item_url(7), "http://example.org/wp/v2/pages/7");
        assert_eq!(site.guid(7), "http://example.org/?page_id=7");
    }
}
