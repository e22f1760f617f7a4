//! JSON representation of a page.
//!
//! Builds the full (edit context) object; callers trim it per context with
//! [`crate::schema::filter_by_context`].

use serde_json::{Value, json};

use super::SiteInfo;
use super::filter::{FilterPipeline, excerpt_from_content};
use crate::models::{PAGE_TYPE, Post};
use crate::schema::DATE_FORMAT;

/// Render every field of a page.
///
/// `link` is the page's public address. `reveal_protected` is false when a
/// password-protected page is shown to someone who cannot edit it; the
/// rendered body and excerpt are then blank.
pub fn render_page(post: &Post, link: &str, site: &SiteInfo, reveal_protected: bool) -> Value {
    let title_pipeline = FilterPipeline::for_title();
    let content_pipeline = FilterPipeline::for_content();

    let hidden = post.is_protected() && !reveal_protected;
    let excerpt_source = if post.excerpt.is_empty() {
        excerpt_from_content(&post.content)
    } else {
        post.excerpt.clone()
    };
    let (content_rendered, excerpt_rendered) = if hidden {
        (String::new(), String::new())
    } else {
        (
            content_pipeline.process(&post.content),
            content_pipeline.process(&excerpt_source),
        )
    };

    let local = |dt: &chrono::DateTime<chrono::Utc>| {
        dt.with_timezone(&site.gmt_offset).format(DATE_FORMAT).to_string()
    };
    let guid = site.guid(post.id);

    json!({
        "id": post.id,
        "date": local(&post.date_gmt),
        "date_gmt": post.date_gmt.format(DATE_FORMAT).to_string(),
        "guid": { "raw": guid, "rendered": guid },
        "modified": local(&post.modified_gmt),
        "modified_gmt": post.modified_gmt.format(DATE_FORMAT).to_string(),
        "password": post.password,
        "slug": post.slug,
        "status": post.status.as_str(),
        "type": PAGE_TYPE,
        "link": link,
        "title": {
            "raw": post.title,
            "rendered": title_pipeline.process(&post.title),
        },
        "content": {
            "raw": post.content,
            "rendered": content_rendered,
            "protected": post.is_protected(),
        },
        "excerpt": {
            "raw": post.excerpt,
            "rendered": excerpt_rendered,
            "protected": post.is_protected(),
        },
        "author": post.author,
        "featured_image": post.featured_image,
        "comment_status": post.comment_status.as_str(),
        "ping_status": post.ping_status.as_str(),
        "parent": post.parent,
        "menu_order": post.menu_order,
        "template": post.template,
        "_links": page_links(post, site),
    })
}

/// Hypermedia links: `self`, `collection`, and `up` for child pages.
pub fn page_links(post: &Post, site: &SiteInfo) -> Value {
    let mut links = json!({
        "self": [{ "href": site.item_url(post.id) }],
        "collection": [{ "href": site.collection_url() }],
    });
    if post.parent > 0 {
        links["up"] = json!([{ "href": site.item_url(post.parent), "embeddable": true }]);
    }
    links
}
