//! In-memory page store.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use super::{OrderBy, PageStore, PostQuery, SortOrder};
use crate::models::{NewPost, Post};

/// Page store holding every record in a map guarded by a single lock.
#[derive(Default)]
pub struct MemoryPageStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    posts: BTreeMap<i64, Post>,
    last_id: i64,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn compare(a: &Post, b: &Post, query: &PostQuery) -> Ordering {
    let primary = match query.order_by {
        OrderBy::Date => a.date_gmt.cmp(&b.date_gmt),
        OrderBy::Id => a.id.cmp(&b.id),
        OrderBy::Include => {
            let position = |p: &Post| query.include.iter().position(|id| *id == p.id);
            position(a).cmp(&position(b))
        }
        OrderBy::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        OrderBy::Slug => a.slug.cmp(&b.slug),
        OrderBy::MenuOrder => a.menu_order.cmp(&b.menu_order),
    };
    // Ties fall back to id so windows are stable between requests.
    let ordering = primary.then_with(|| a.id.cmp(&b.id));
    match query.order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl PageStore for MemoryPageStore {
    async fn insert(&self, post: NewPost) -> Result<Post> {
        let mut inner = self.inner.write();
        inner.last_id += 1;
        let post = post.into_post(inner.last_id);
        inner.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find(&self, id: i64) -> Result<Option<Post>> {
        Ok(self.inner.read().posts.get(&id).cloned())
    }

    async fn save(&self, post: &Post) -> Result<bool> {
        let mut inner = self.inner.write();
        match inner.posts.get_mut(&post.id) {
            Some(stored) => {
                *stored = post.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, id: i64) -> Result<bool> {
        Ok(self.inner.write().posts.remove(&id).is_some())
    }

    async fn query(&self, query: &PostQuery) -> Result<(Vec<Post>, u64)> {
        let inner = self.inner.read();
        let mut matching: Vec<&Post> = inner.posts.values().filter(|p| query.matches(p)).collect();
        let total = matching.len() as u64;

        matching.sort_by(|a, b| compare(a, b, query));

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        let window = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok((window, total))
    }

    async fn slug_taken(
        &self,
        post_type: &str,
        parent: i64,
        slug: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let inner = self.inner.read();
        Ok(inner.posts.values().any(|p| {
            p.post_type == post_type
                && p.parent == parent
                && p.slug == slug
                && Some(p.id) != exclude_id
        }))
    }

    async fn reparent_children(&self, post_type: &str, from: i64, to: i64) -> Result<u64> {
        let mut inner = self.inner.write();
        let mut moved = 0;
        for post in inner.posts.values_mut() {
            if post.post_type == post_type && post.parent == from {
                post.parent = to;
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{PAGE_TYPE, PostStatus};

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = MemoryPageStore::new();
        let a = store.insert(NewPost::page("A")).await.unwrap();
        let b = store.insert(NewPost::page("B")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_remove() {
        let store = MemoryPageStore::new();
        let a = store.insert(NewPost::page("A")).await.unwrap();
        assert!(store.remove(a.id).await.unwrap());
        assert!(!store.remove(a.id).await.unwrap());

        let b = store.insert(NewPost::page("B")).await.unwrap();
        assert_eq!(b.id, 2);
    }

    #[tokio::test]
    async fn query_windows_and_counts_whole_set() {
        let store = MemoryPageStore::new();
        for i in 0..8 {
            store
                .insert(NewPost::page(&format!("Page {i}")).with_status(PostStatus::Publish))
                .await
                .unwrap();
        }

        let mut query = PostQuery::for_type(PAGE_TYPE, 3);
        query.offset = 6;
        let (window, total) = store.query(&query).await.unwrap();

        assert_eq!(total, 8);
        assert_eq!(window.len(), 2);
    }

    #[tokio::test]
    async fn include_order_follows_list() {
        let store = MemoryPageStore::new();
        for title in ["A", "B", "C"] {
            store.insert(NewPost::page(title)).await.unwrap();
        }

        let mut query = PostQuery::for_type(PAGE_TYPE, 10);
        query.include = vec![3, 1, 2];
        query.order_by = OrderBy::Include;
        query.order = SortOrder::Asc;

        let (window, _) = store.query(&query).await.unwrap();
        let ids: Vec<i64> = window.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn slug_uniqueness_is_scoped_to_siblings() {
        let store = MemoryPageStore::new();
        let about = store
            .insert(NewPost::page("About").with_slug("about"))
            .await
            .unwrap();

        assert!(store.slug_taken(PAGE_TYPE, 0, "about", None).await.unwrap());
        assert!(!store.slug_taken(PAGE_TYPE, 0, "about", Some(about.id)).await.unwrap());
        assert!(!store.slug_taken(PAGE_TYPE, about.id, "about", None).await.unwrap());
        assert!(!store.slug_taken("post", 0, "about", None).await.unwrap());
    }

    #[tokio::test]
    async fn reparent_moves_direct_children() {
        let store = MemoryPageStore::new();
        let root = store.insert(NewPost::page("Root")).await.unwrap();
        let mid = store
            .insert(NewPost::page("Mid").with_parent(root.id))
            .await
            .unwrap();
        let leaf = store
            .insert(NewPost::page("Leaf").with_parent(mid.id))
            .await
            .unwrap();

        let moved = store.reparent_children(PAGE_TYPE, mid.id, root.id).await.unwrap();
        assert_eq!(moved, 1);
        assert_eq!(store.find(leaf.id).await.unwrap().unwrap().parent, root.id);
    }
}
