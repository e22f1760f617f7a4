//! Page service.
//!
//! Capability checks, hierarchy checks and write semantics for pages. Route
//! handlers parse the request, call in here, and serialize what comes back.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::presenter::render_page;
use super::query::{ListArgs, QueryVarPolicy};
use super::slug::{sanitize_title, unique_slug};
use super::{PaginationLimits, SiteInfo};
use crate::auth::{Capability, Caller};
use crate::error::{AppError, AppResult};
use crate::models::{NewPost, PAGE_TYPE, PageInput, Post, PostStatus};
use crate::schema::{self, Context, ParsedDate};
use crate::store::PageStore;
use crate::theme::TemplateRegistry;

/// Ancestor walks stop here even if the stored tree is corrupt.
const MAX_DEPTH: usize = 100;

/// One window of a collection request.
#[derive(Debug, Clone, PartialEq)]
pub struct PageList {
    pub pages: Vec<Post>,
    /// Size of the whole matching set.
    pub total: u64,
    pub total_pages: u64,
}

/// Outcome of a delete.
#[derive(Debug, Clone, PartialEq)]
pub enum Deletion {
    /// Moved to the trash; carries the updated page.
    Trashed(Post),
    /// Removed permanently; carries the page as it was.
    Deleted(Post),
}

/// Service for page CRUD.
#[derive(Clone)]
pub struct PageService {
    inner: Arc<PageServiceInner>,
}

struct PageServiceInner {
    store: Arc<dyn PageStore>,
    templates: Arc<TemplateRegistry>,
    policy: QueryVarPolicy,
    site: SiteInfo,
    limits: PaginationLimits,
}

impl PageService {
    pub fn new(
        store: Arc<dyn PageStore>,
        templates: Arc<TemplateRegistry>,
        site: SiteInfo,
        limits: PaginationLimits,
    ) -> Self {
        Self {
            inner: Arc::new(PageServiceInner {
                store,
                templates,
                policy: QueryVarPolicy::pages(),
                site,
                limits,
            }),
        }
    }

    pub fn site(&self) -> &SiteInfo {
        &self.inner.site
    }

    pub fn limits(&self) -> PaginationLimits {
        self.inner.limits
    }

    /// Slugs of the templates the theme currently offers.
    pub fn template_slugs(&self) -> Vec<String> {
        self.inner.templates.slugs()
    }

    /// Property declarations with the theme's current template slugs.
    pub fn properties(&self) -> Map<String, Value> {
        schema::page_properties(&self.template_slugs())
    }

    /// `context=edit` on the collection needs page editing rights.
    pub fn check_list_context(&self, caller: &Caller, context: Context) -> AppResult<()> {
        if context == Context::Edit && !caller.can(Capability::EditPages) {
            return Err(AppError::forbidden(
                caller,
                "rest_forbidden_context",
                "Sorry, you are not allowed to edit pages.",
            ));
        }
        Ok(())
    }

    /// Windowed collection query.
    pub async fn list(&self, caller: &Caller, args: &ListArgs) -> AppResult<PageList> {
        self.check_list_context(caller, args.context)?;

        if args.status != PostStatus::Publish && !caller.can(Capability::EditPages) {
            return Err(AppError::forbidden(
                caller,
                "rest_forbidden_status",
                "Status is forbidden.",
            ));
        }

        let mut query = args.to_query();
        let vars = self.inner.policy.resolve(&args.filter, caller);
        QueryVarPolicy::apply(&vars, &mut query, self.inner.limits);

        if !caller.can(Capability::EditPages) {
            query.statuses = vec![PostStatus::Publish];
        }

        let (pages, total) = self.inner.store.query(&query).await?;
        let total_pages = total.div_ceil(query.limit.max(1));

        if total > 0 && args.page > total_pages {
            return Err(AppError::bad_request(
                "rest_post_invalid_page_number",
                "The page number requested is larger than the number of pages available.",
            ));
        }

        debug!(total, returned = pages.len(), page = args.page, "listed pages");

        Ok(PageList {
            pages,
            total,
            total_pages,
        })
    }

    /// A stored page, or 404 when the id is unknown or is another post type.
    async fn load(&self, id: i64) -> AppResult<Post> {
        match self.inner.store.find(id).await? {
            Some(post) if post.is_page() => Ok(post),
            _ => Err(AppError::page_not_found()),
        }
    }

    /// A single page the caller may see.
    pub async fn get(&self, caller: &Caller, id: i64, context: Context) -> AppResult<Post> {
        let post = self.load(id).await?;

        if !caller.can_read(&post) {
            return Err(AppError::forbidden(
                caller,
                "rest_forbidden",
                "Sorry, you are not allowed to view this page.",
            ));
        }
        if context == Context::Edit && !caller.can_edit(&post) {
            return Err(AppError::forbidden(
                caller,
                "rest_forbidden_context",
                "Sorry, you are not allowed to edit this page.",
            ));
        }

        Ok(post)
    }

    /// Create a page from a request body.
    pub async fn create(&self, caller: &Caller, body: &Map<String, Value>) -> AppResult<Post> {
        if !caller.can(Capability::EditPages) {
            return Err(AppError::forbidden(
                caller,
                "rest_cannot_create",
                "Sorry, you are not allowed to create pages.",
            ));
        }
        if body.get("id").is_some_and(|id| !id.is_null()) {
            return Err(AppError::bad_request(
                "rest_post_exists",
                "Cannot create existing page.",
            ));
        }

        let input = self.decode(body)?;

        let author = input.author.unwrap_or(caller.user_id);
        self.check_author(caller, author)?;

        let mut status = input.status.unwrap_or(PostStatus::Draft);
        self.check_status(caller, status)?;

        let parent = input.parent.unwrap_or(0);
        self.check_parent(parent, None).await?;

        let template = input.template.unwrap_or_default();

        let title = input.title.map(|t| t.into_raw()).unwrap_or_default();
        let date_gmt = resolve_date(&input.date, &input.date_gmt, &self.inner.site)?;
        let now = Utc::now();
        if let Some(date) = date_gmt {
            status = schedule(status, date, now);
        }

        let base = match input.slug.as_deref() {
            Some(slug) if !slug.is_empty() => sanitize_title(slug),
            _ => sanitize_title(&title),
        };
        let slug = self.unique_slug(parent, &base, None).await?;

        let mut new = NewPost::page(&title)
            .with_status(status)
            .with_parent(parent)
            .with_slug(&slug)
            .with_menu_order(input.menu_order.unwrap_or(0))
            .with_author(author);
        new.content = input.content.map(|c| c.into_raw()).unwrap_or_default();
        new.excerpt = input.excerpt.map(|e| e.into_raw()).unwrap_or_default();
        new.template = template;
        new.date_gmt = date_gmt.unwrap_or(now);
        new.modified_gmt = now;
        if let Some(comment_status) = input.comment_status {
            new.comment_status = comment_status;
        }
        if let Some(ping_status) = input.ping_status {
            new.ping_status = ping_status;
        }
        new.password = input.password.unwrap_or_default();
        new.featured_image = input.featured_image.unwrap_or(0);

        let page = self.inner.store.insert(new).await?;
        info!(
            page_id = page.id,
            parent = page.parent,
            status = %page.status,
            user_id = caller.user_id,
            "page created"
        );
        Ok(page)
    }

    /// Apply the fields present in a request body to an existing page.
    pub async fn update(&self, caller: &Caller, id: i64, body: &Map<String, Value>) -> AppResult<Post> {
        let mut page = self.load(id).await?;

        if !caller.can_edit(&page) {
            return Err(AppError::forbidden(
                caller,
                "rest_cannot_edit",
                "Sorry, you are not allowed to update this page.",
            ));
        }

        let input = self.decode(body)?;
        let old_parent = page.parent;

        if let Some(author) = input.author {
            if author != page.author {
                self.check_author(caller, author)?;
            }
            page.author = author;
        }
        if let Some(status) = input.status {
            self.check_status(caller, status)?;
            page.status = status;
        }
        if let Some(parent) = input.parent {
            self.check_parent(parent, Some(page.id)).await?;
            page.parent = parent;
        }
        if let Some(template) = input.template {
            page.template = template;
        }
        if let Some(title) = input.title {
            page.title = title.into_raw();
        }
        if let Some(content) = input.content {
            page.content = content.into_raw();
        }
        if let Some(excerpt) = input.excerpt {
            page.excerpt = excerpt.into_raw();
        }
        if let Some(menu_order) = input.menu_order {
            page.menu_order = menu_order;
        }
        if let Some(comment_status) = input.comment_status {
            page.comment_status = comment_status;
        }
        if let Some(ping_status) = input.ping_status {
            page.ping_status = ping_status;
        }
        if let Some(password) = input.password {
            page.password = password;
        }
        if let Some(featured_image) = input.featured_image {
            page.featured_image = featured_image;
        }

        let now = Utc::now();
        if let Some(date) = resolve_date(&input.date, &input.date_gmt, &self.inner.site)? {
            page.date_gmt = date;
        }
        if input.status.is_some() || input.date.is_some() || input.date_gmt.is_some() {
            page.status = schedule(page.status, page.date_gmt, now);
        }

        match input.slug {
            Some(slug) => {
                let base = if slug.is_empty() {
                    sanitize_title(&page.title)
                } else {
                    sanitize_title(&slug)
                };
                page.slug = self.unique_slug(page.parent, &base, Some(page.id)).await?;
            }
            None if page.parent != old_parent => {
                page.slug = self.unique_slug(page.parent, &page.slug, Some(page.id)).await?;
            }
            None => {}
        }

        page.modified_gmt = now;

        if !self.inner.store.save(&page).await? {
            return Err(AppError::page_not_found());
        }

        info!(page_id = page.id, user_id = caller.user_id, "page updated");
        Ok(page)
    }

    /// Trash a page, or remove it for good when `force` is set.
    pub async fn delete(&self, caller: &Caller, id: i64, force: bool) -> AppResult<Deletion> {
        let mut page = self.load(id).await?;

        if !caller.can_delete(&page) {
            return Err(AppError::forbidden(
                caller,
                "rest_cannot_delete",
                "Sorry, you are not allowed to delete this page.",
            ));
        }

        if force {
            let moved = self
                .inner
                .store
                .reparent_children(PAGE_TYPE, page.id, page.parent)
                .await?;
            self.inner.store.remove(page.id).await?;
            info!(page_id = page.id, children_moved = moved, user_id = caller.user_id, "page deleted");
            return Ok(Deletion::Deleted(page));
        }

        if page.status == PostStatus::Trash {
            return Err(AppError::already_trashed());
        }

        page.status = PostStatus::Trash;
        page.modified_gmt = Utc::now();
        if !self.inner.store.save(&page).await? {
            return Err(AppError::page_not_found());
        }

        info!(page_id = page.id, user_id = caller.user_id, "page trashed");
        Ok(Deletion::Trashed(page))
    }

    /// Public address: nested slugs for published pages, `?page_id=` otherwise.
    pub async fn permalink(&self, page: &Post) -> AppResult<String> {
        let site = &self.inner.site;
        let pretty = matches!(page.status, PostStatus::Publish | PostStatus::Private);
        if !pretty || page.slug.is_empty() {
            return Ok(site.guid(page.id));
        }

        let mut segments = vec![page.slug.clone()];
        let mut seen = BTreeSet::from([page.id]);
        let mut parent = page.parent;

        while parent > 0 && seen.len() < MAX_DEPTH && seen.insert(parent) {
            match self.inner.store.find(parent).await? {
                Some(ancestor) => {
                    if !ancestor.slug.is_empty() {
                        segments.push(ancestor.slug.clone());
                    }
                    parent = ancestor.parent;
                }
                None => break,
            }
        }

        segments.reverse();
        Ok(format!("{}/{}/", site.url, segments.join("/")))
    }

    /// Serialize a page for `context`, hiding protected bodies from non-editors.
    pub async fn present(&self, caller: &Caller, page: &Post, context: Context) -> AppResult<Value> {
        let link = self.permalink(page).await?;
        let mut json = render_page(page, &link, &self.inner.site, caller.can_edit(page));
        schema::filter_by_context(&mut json, &self.properties(), context);
        Ok(json)
    }

    /// Validate a body against the schema and decode it.
    fn decode(&self, body: &Map<String, Value>) -> AppResult<PageInput> {
        // Runs first so a template added to the theme since the last scan is
        // in the schema enum below.
        if let Some(template) = body.get("template").and_then(Value::as_str) {
            self.check_template(template)?;
        }
        let clean = schema::sanitize_write(body, &self.properties())?;
        serde_json::from_value(Value::Object(clean))
            .map_err(|e| AppError::bad_request("rest_invalid_param", &e.to_string()))
    }

    fn check_author(&self, caller: &Caller, author: i64) -> AppResult<()> {
        if author != caller.user_id && !caller.can(Capability::EditOthersPages) {
            return Err(AppError::forbidden(
                caller,
                "rest_cannot_edit_others",
                "You are not allowed to create pages as this user.",
            ));
        }
        Ok(())
    }

    fn check_status(&self, caller: &Caller, status: PostStatus) -> AppResult<()> {
        if status.needs_publish_capability() && !caller.can(Capability::PublishPages) {
            return Err(AppError::forbidden(
                caller,
                "rest_cannot_publish",
                "Sorry, you are not allowed to publish pages.",
            ));
        }
        Ok(())
    }

    /// `parent` must be 0 or an existing page, and must not sit below `child`.
    async fn check_parent(&self, parent: i64, child: Option<i64>) -> AppResult<()> {
        if parent < 0 {
            return Err(AppError::invalid_id("Invalid page parent ID."));
        }
        if parent == 0 {
            return Ok(());
        }

        let mut cursor = parent;
        for _ in 0..MAX_DEPTH {
            if Some(cursor) == child {
                return Err(AppError::invalid_id("A page cannot be its own ancestor."));
            }
            match self.inner.store.find(cursor).await? {
                Some(post) if post.is_page() => {
                    if post.parent == 0 {
                        return Ok(());
                    }
                    cursor = post.parent;
                }
                _ if cursor == parent => {
                    return Err(AppError::invalid_id("Invalid page parent ID."));
                }
                // A dangling link further up does not make this parent invalid.
                _ => return Ok(()),
            }
        }
        Ok(())
    }

    fn check_template(&self, template: &str) -> AppResult<()> {
        if !template.is_empty() && !self.inner.templates.contains(template) {
            let slugs = self.inner.templates.slugs();
            return Err(AppError::invalid_param(
                "template",
                format!("template is not one of {}.", slugs.join(", ")),
            ));
        }
        Ok(())
    }

    async fn unique_slug(&self, parent: i64, base: &str, own_id: Option<i64>) -> AppResult<String> {
        if base.is_empty() {
            return Ok(String::new());
        }
        Ok(unique_slug(self.inner.store.as_ref(), PAGE_TYPE, parent, base, own_id).await?)
    }
}

/// UTC publication date from the `date` / `date_gmt` inputs.
///
/// `date_gmt` wins. A `date` without an offset is site-local time.
fn resolve_date(
    date: &Option<String>,
    date_gmt: &Option<String>,
    site: &SiteInfo,
) -> AppResult<Option<DateTime<Utc>>> {
    let parse = |name: &str, value: &str| {
        schema::parse_date_time(value)
            .ok_or_else(|| AppError::invalid_param(name, format!("{name} is not a valid date.")))
    };

    if let Some(value) = date_gmt {
        let parsed = parse("date_gmt", value)?;
        return Ok(Some(to_utc(parsed, None)));
    }
    if let Some(value) = date {
        let parsed = parse("date", value)?;
        return Ok(Some(to_utc(parsed, Some(site))));
    }
    Ok(None)
}

/// An explicit offset always applies; otherwise the site offset (or UTC).
fn to_utc(parsed: ParsedDate, site: Option<&SiteInfo>) -> DateTime<Utc> {
    let offset_seconds = parsed
        .offset
        .or_else(|| site.map(|s| s.gmt_offset))
        .map_or(0, |o| o.local_minus_utc());
    let naive: NaiveDateTime = parsed.naive - chrono::Duration::seconds(i64::from(offset_seconds));
    naive.and_utc()
}

/// Published pages dated in the future are scheduled; scheduled pages dated
/// in the past are published.
fn schedule(status: PostStatus, date: DateTime<Utc>, now: DateTime<Utc>) -> PostStatus {
    match status {
        PostStatus::Publish if date > now => PostStatus::Future,
        PostStatus::Future if date <= now => PostStatus::Publish,
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::{FixedOffset, TimeZone};
    use serde_json::json;

    use super::*;
    use crate::auth::Role;
    use crate::content::QueryParams;
    use crate::store::MemoryPageStore;

    fn site() -> SiteInfo {
        SiteInfo {
            url: "http://example.org".to_string(),
            gmt_offset: FixedOffset::east_opt(3600).unwrap(),
        }
    }

    fn service() -> (PageService, Arc<MemoryPageStore>) {
        let store = Arc::new(MemoryPageStore::new());
        let templates = Arc::new(TemplateRegistry::empty().unwrap());
        templates.register("page-my-test-template.php", "My Test Template");
        let service = PageService::new(store.clone(), templates, site(), PaginationLimits::default());
        (service, store)
    }

    fn editor() -> Caller {
        Caller {
            user_id: 2,
            role: Some(Role::Editor),
        }
    }

    fn author() -> Caller {
        Caller {
            user_id: 3,
            role: Some(Role::Author),
        }
    }

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn list_args(raw: &str) -> ListArgs {
        ListArgs::parse(&QueryParams::parse(Some(raw)), PaginationLimits::default()).unwrap()
    }

    #[tokio::test]
    async fn create_defaults_to_draft_owned_by_caller() {
        let (service, _) = service();
        let page = service
            .create(&editor(), &body(json!({"title": "About Us"})))
            .await
            .unwrap();

        assert_eq!(page.status, PostStatus::Draft);
        assert_eq!(page.author, 2);
        assert_eq!(page.slug, "about-us");
        assert_eq!(page.post_type, PAGE_TYPE);
    }

    #[tokio::test]
    async fn create_requires_edit_pages() {
        let (service, store) = service();
        let err = service
            .create(&author(), &body(json!({"title": "Nope"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_cannot_create");
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);

        let err = service
            .create(&Caller::anonymous(), &body(json!({"title": "Nope"})))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_body_id_and_bad_parent() {
        let (service, store) = service();

        let err = service
            .create(&editor(), &body(json!({"id": 4, "title": "X"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_post_exists");

        let err = service
            .create(&editor(), &body(json!({"title": "X", "parent": -1})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_post_invalid_id");

        let err = service
            .create(&editor(), &body(json!({"title": "X", "parent": 999})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_post_invalid_id");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn parent_must_be_a_page() {
        let (service, store) = service();
        let post = store.insert(NewPost::new("post", "Blog post")).await.unwrap();

        let err = service
            .create(&editor(), &body(json!({"title": "X", "parent": post.id})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_post_invalid_id");
    }

    #[tokio::test]
    async fn future_dated_publish_is_scheduled() {
        let (service, _) = service();
        let page = service
            .create(
                &editor(),
                &body(json!({"title": "Later", "status": "publish", "date_gmt": "2999-01-01T00:00:00"})),
            )
            .await
            .unwrap();
        assert_eq!(page.status, PostStatus::Future);
    }

    #[tokio::test]
    async fn local_date_uses_site_offset() {
        let (service, _) = service();
        let page = service
            .create(&editor(), &body(json!({"title": "Dated", "date": "2016-01-02T12:00:00"})))
            .await
            .unwrap();
        assert_eq!(page.date_gmt, Utc.with_ymd_and_hms(2016, 1, 2, 11, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn update_rejects_cycles() {
        let (service, store) = service();
        let root = store.insert(NewPost::page("Root")).await.unwrap();
        let child = store
            .insert(NewPost::page("Child").with_parent(root.id))
            .await
            .unwrap();

        let err = service
            .update(&editor(), root.id, &body(json!({"parent": child.id})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_post_invalid_id");

        let err = service
            .update(&editor(), root.id, &body(json!({"parent": root.id})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_post_invalid_id");
    }

    #[tokio::test]
    async fn update_keeps_explicit_zero_menu_order() {
        let (service, store) = service();
        let page = store
            .insert(NewPost::page("Ordered").with_menu_order(1))
            .await
            .unwrap();

        let updated = service
            .update(&editor(), page.id, &body(json!({"menu_order": 0})))
            .await
            .unwrap();
        assert_eq!(updated.menu_order, 0);
        assert_eq!(updated.title, "Ordered");
    }

    #[tokio::test]
    async fn empty_slug_on_update_is_derived_from_title() {
        let (service, store) = service();
        let page = store
            .insert(NewPost::page("Old Name").with_slug("old-name"))
            .await
            .unwrap();

        let updated = service
            .update(&editor(), page.id, &body(json!({"slug": ""})))
            .await
            .unwrap();
        assert_eq!(updated.slug, "old-name");

        let renamed = service
            .update(&editor(), page.id, &body(json!({"title": "Our Team", "slug": ""})))
            .await
            .unwrap();
        assert_eq!(renamed.slug, "our-team");
        assert_eq!(store.find(page.id).await.unwrap().unwrap().slug, "our-team");
    }

    #[tokio::test]
    async fn moving_page_keeps_slug_unique_among_new_siblings() {
        let (service, store) = service();
        let parent = store.insert(NewPost::page("Parent").with_slug("parent")).await.unwrap();
        store
            .insert(NewPost::page("Team").with_slug("team").with_parent(parent.id))
            .await
            .unwrap();
        let loose = store.insert(NewPost::page("Team").with_slug("team")).await.unwrap();

        let moved = service
            .update(&editor(), loose.id, &body(json!({"parent": parent.id})))
            .await
            .unwrap();
        assert_eq!(moved.slug, "team-2");
    }

    #[tokio::test]
    async fn trash_then_force_delete_reparents_children() {
        let (service, store) = service();
        let root = store.insert(NewPost::page("Root")).await.unwrap();
        let mid = store
            .insert(NewPost::page("Mid").with_parent(root.id))
            .await
            .unwrap();
        let leaf = store
            .insert(NewPost::page("Leaf").with_parent(mid.id))
            .await
            .unwrap();

        let trashed = service.delete(&editor(), mid.id, false).await.unwrap();
        assert!(matches!(trashed, Deletion::Trashed(ref p) if p.status == PostStatus::Trash));

        let err = service.delete(&editor(), mid.id, false).await.unwrap_err();
        assert_eq!(err.code(), "rest_already_trashed");

        let deleted = service.delete(&editor(), mid.id, true).await.unwrap();
        assert!(matches!(deleted, Deletion::Deleted(_)));
        assert!(store.find(mid.id).await.unwrap().is_none());
        assert_eq!(store.find(leaf.id).await.unwrap().unwrap().parent, root.id);
    }

    #[tokio::test]
    async fn unauthorized_filter_falls_back_to_public() {
        let (service, store) = service();
        store
            .insert(NewPost::page("Live").with_status(PostStatus::Publish))
            .await
            .unwrap();
        store.insert(NewPost::page("Draft")).await.unwrap();

        let args = list_args("filter[post_status]=draft");

        let anon = service.list(&Caller::anonymous(), &args).await.unwrap();
        assert_eq!(anon.total, 1);
        assert_eq!(anon.pages[0].title, "Live");

        let editor = service.list(&editor(), &args).await.unwrap();
        assert_eq!(editor.total, 1);
        assert_eq!(editor.pages[0].title, "Draft");
    }

    #[tokio::test]
    async fn page_past_the_end_is_rejected() {
        let (service, store) = service();
        store
            .insert(NewPost::page("Only").with_status(PostStatus::Publish))
            .await
            .unwrap();

        let err = service
            .list(&Caller::anonymous(), &list_args("page=2"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_post_invalid_page_number");
    }

    #[tokio::test]
    async fn permalink_nests_published_ancestors() {
        let (service, store) = service();
        let about = store
            .insert(NewPost::page("About").with_slug("about").with_status(PostStatus::Publish))
            .await
            .unwrap();
        let team = store
            .insert(
                NewPost::page("Team")
                    .with_slug("team")
                    .with_parent(about.id)
                    .with_status(PostStatus::Publish),
            )
            .await
            .unwrap();
        let draft = store.insert(NewPost::page("Draft").with_slug("draft")).await.unwrap();

        assert_eq!(service.permalink(&team).await.unwrap(), "http://example.org/about/team/");
        assert_eq!(
            service.permalink(&draft).await.unwrap(),
            format!("http://example.org/?page_id={}", draft.id)
        );
    }

    #[tokio::test]
    async fn non_page_ids_are_not_found() {
        let (service, store) = service();
        let post = store
            .insert(NewPost::new("post", "Blog").with_status(PostStatus::Publish))
            .await
            .unwrap();

        let err = service
            .get(&Caller::anonymous(), post.id, Context::View)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_post_invalid_id");
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }
}
