//! Content store.
//!
//! [`PageStore`] is the persistence seam: the page service only talks to this
//! trait. [`MemoryPageStore`] backs tests and database-less deployments,
//! [`PgPageStore`] backs production.

mod memory;
mod postgres;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{NewPost, Post, PostStatus};

pub use memory::MemoryPageStore;
pub use postgres::PgPageStore;

/// Sort key for collection queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    #[default]
    Date,
    Id,
    /// Position in the `include` list.
    Include,
    Title,
    Slug,
    MenuOrder,
}

impl OrderBy {
    pub const ALL: [OrderBy; 6] = [
        OrderBy::Date,
        OrderBy::Id,
        OrderBy::Include,
        OrderBy::Title,
        OrderBy::Slug,
        OrderBy::MenuOrder,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Id => "id",
            Self::Include => "include",
            Self::Title => "title",
            Self::Slug => "slug",
            Self::MenuOrder => "menu_order",
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| format!("unknown orderby '{s}'"))
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown order '{other}'")),
        }
    }
}

/// Predicate, ordering and window for a collection query.
#[derive(Debug, Clone, PartialEq)]
pub struct PostQuery {
    pub post_type: String,
    /// Allowed statuses (empty matches any).
    pub statuses: Vec<PostStatus>,
    pub author: Option<i64>,
    /// Direct children of this id only.
    pub parent: Option<i64>,
    pub include: Vec<i64>,
    pub exclude: Vec<i64>,
    /// Case-insensitive substring of title, content or excerpt.
    pub search: Option<String>,
    pub slug: Option<String>,
    pub menu_order: Option<i64>,
    pub order_by: OrderBy,
    pub order: SortOrder,
    pub limit: u64,
    pub offset: u64,
}

impl PostQuery {
    /// Match every post of a type, first `limit` rows.
    pub fn for_type(post_type: &str, limit: u64) -> Self {
        Self {
            post_type: post_type.to_string(),
            statuses: Vec::new(),
            author: None,
            parent: None,
            include: Vec::new(),
            exclude: Vec::new(),
            search: None,
            slug: None,
            menu_order: None,
            order_by: OrderBy::default(),
            order: SortOrder::default(),
            limit,
            offset: 0,
        }
    }

    /// Does a record satisfy the predicate (ignores ordering and window).
    pub fn matches(&self, post: &Post) -> bool {
        if post.post_type != self.post_type {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&post.status) {
            return false;
        }
        if self.author.is_some_and(|a| a != post.author) {
            return false;
        }
        if self.parent.is_some_and(|p| p != post.parent) {
            return false;
        }
        if !self.include.is_empty() && !self.include.contains(&post.id) {
            return false;
        }
        if self.exclude.contains(&post.id) {
            return false;
        }
        if self.slug.as_ref().is_some_and(|s| *s != post.slug) {
            return false;
        }
        if self.menu_order.is_some_and(|m| m != post.menu_order) {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let found = [&post.title, &post.content, &post.excerpt]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !found {
                return false;
            }
        }
        true
    }
}

/// Persistence for post records.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Persist a new record and return it with its assigned id.
    async fn insert(&self, post: NewPost) -> Result<Post>;

    /// Load a record of any type.
    async fn find(&self, id: i64) -> Result<Option<Post>>;

    /// Replace a stored record. Returns false when the id is unknown.
    async fn save(&self, post: &Post) -> Result<bool>;

    /// Permanently remove a record. Returns false when the id is unknown.
    async fn remove(&self, id: i64) -> Result<bool>;

    /// Matching records for the window plus the size of the whole matching set.
    async fn query(&self, query: &PostQuery) -> Result<(Vec<Post>, u64)>;

    /// Is `slug` used by a sibling of the given type under `parent`.
    async fn slug_taken(
        &self,
        post_type: &str,
        parent: i64,
        slug: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool>;

    /// Move every child of `from` under `to`. Returns the number moved.
    async fn reparent_children(&self, post_type: &str, from: i64, to: i64) -> Result<u64>;

    /// Backend reachability for health checks.
    async fn healthy(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orderby_parses_known_keys() {
        assert_eq!("menu_order".parse::<OrderBy>(), Ok(OrderBy::MenuOrder));
        assert!("author".parse::<OrderBy>().is_err());
        assert_eq!("ASC".parse::<SortOrder>(), Ok(SortOrder::Asc));
    }

    #[test]
    fn query_matches_type_parent_and_search() {
        let mut query = PostQuery::for_type("page", 10);
        query.parent = Some(4);
        query.search = Some("ABOUT".to_string());

        let hit = NewPost::page("About us").with_parent(4).into_post(5);
        let other_parent = NewPost::page("About us").with_parent(6).into_post(7);
        let other_type = NewPost::new("post", "About us").with_parent(4).into_post(8);

        assert!(query.matches(&hit));
        assert!(!query.matches(&other_parent));
        assert!(!query.matches(&other_type));
    }
}
