//! Slug derivation and sibling uniqueness.

use anyhow::Result;

use crate::store::PageStore;

/// Turn a title (or client-supplied slug) into a URL segment.
///
/// Markup is dropped, letters are lowercased, runs of separators collapse to
/// a single `-`.
pub fn sanitize_title(title: &str) -> String {
    let mut text = ammonia::Builder::empty().clean(title).to_string();
    for entity in ["&amp;", "&lt;", "&gt;", "&quot;", "&nbsp;"] {
        text = text.replace(entity, " ");
    }
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '.' || c == '/' {
            pending_dash = true;
        }
    }

    slug
}

/// First free variant of `base` among the siblings under `parent`:
/// `base`, then `base-2`, `base-3`, ...
pub async fn unique_slug(
    store: &dyn PageStore,
    post_type: &str,
    parent: i64,
    base: &str,
    exclude_id: Option<i64>,
) -> Result<String> {
    if !store.slug_taken(post_type, parent, base, exclude_id).await? {
        return Ok(base.to_string());
    }

    let mut suffix = 2;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !store.slug_taken(post_type, parent, &candidate, exclude_id).await? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}
