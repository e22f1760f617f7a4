//! Page resource routes.
//!
//! - `GET|POST|OPTIONS /wp/v2/pages`
//! - `GET|PUT|PATCH|POST|DELETE|OPTIONS /wp/v2/pages/{id}`

use anyhow::Context as _;
use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Map, Value, json};

use crate::auth::Caller;
use crate::content::{
    DeleteArgs, Deletion, ListArgs, NAMESPACE, PageService, QueryParams, REST_BASE, SingleArgs,
};
use crate::error::{AppError, AppResult};
use crate::models::Post;
use crate::schema::{self, Context};
use crate::state::AppState;

const COLLECTION_METHODS: &[&str] = &["GET", "POST"];
const ITEM_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE"];

/// Create the page router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/wp/v2/pages",
            get(list_pages).post(create_page).options(describe_collection),
        )
        .route(
            "/wp/v2/pages/{id}",
            get(get_page)
                .put(update_page)
                .patch(update_page)
                .post(update_page)
                .delete(delete_page)
                .options(describe_item),
        )
}

/// Route ids are numeric; anything else does not match a route.
fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(AppError::no_route)
}

/// Decode a write body. JSON and form-encoded bodies are accepted; an empty
/// body is an empty object.
fn read_body(headers: &HeaderMap, body: &Bytes) -> AppResult<Map<String, Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        return Ok(url::form_urlencoded::parse(body)
            .into_owned()
            .map(|(k, v)| (k, Value::String(v)))
            .collect());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(AppError::bad_request(
            "rest_invalid_json",
            "Invalid JSON body passed.",
        )),
    }
}

/// `Link` header with `prev`/`next` page URLs.
fn pagination_links(
    base: &str,
    params: &QueryParams,
    page: u64,
    total_pages: u64,
) -> Option<String> {
    let mut links = Vec::new();
    if page > 1 && total_pages > 0 {
        let prev = (page - 1).min(total_pages);
        links.push(format!(
            "<{base}?{}>; rel=\"prev\"",
            params.with_value("page", &prev.to_string())
        ));
    }
    if page < total_pages {
        links.push(format!(
            "<{base}?{}>; rel=\"next\"",
            params.with_value("page", &(page + 1).to_string())
        ));
    }
    (!links.is_empty()).then(|| links.join(", "))
}

async fn present_all(
    pages: &PageService,
    caller: &Caller,
    posts: &[Post],
    context: Context,
) -> AppResult<Vec<Value>> {
    let mut out = Vec::with_capacity(posts.len());
    for post in posts {
        out.push(pages.present(caller, post, context).await?);
    }
    Ok(out)
}

async fn list_pages(
    State(state): State<AppState>,
    caller: Caller,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    let pages = state.pages();
    let params = QueryParams::parse(query.as_deref());
    let args = ListArgs::parse(&params, pages.limits())?;

    let list = pages.list(&caller, &args).await?;
    let body = present_all(pages, &caller, &list.pages, args.context).await?;

    let mut headers = HeaderMap::new();
    headers.insert("X-WP-Total", HeaderValue::from(list.total));
    headers.insert("X-WP-TotalPages", HeaderValue::from(list.total_pages));
    let base = pages.site().collection_url();
    if let Some(link) = pagination_links(&base, &params, args.page, list.total_pages) {
        headers.insert(
            header::LINK,
            HeaderValue::from_str(&link).context("invalid Link header")?,
        );
    }

    Ok((StatusCode::OK, headers, Json(Value::Array(body))).into_response())
}

async fn get_page(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id)?;
    let args = SingleArgs::parse(&QueryParams::parse(query.as_deref()))?;

    let page = state.pages().get(&caller, id, args.context).await?;
    Ok(Json(state.pages().present(&caller, &page, args.context).await?))
}

async fn create_page(
    State(state): State<AppState>,
    caller: Caller,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let body = read_body(&headers, &body)?;
    let pages = state.pages();

    let page = pages.create(&caller, &body).await?;
    let json = pages.present(&caller, &page, Context::Edit).await?;

    let location = pages.site().item_url(page.id);
    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::LOCATION,
        HeaderValue::from_str(&location).context("invalid Location header")?,
    );

    Ok((StatusCode::CREATED, response_headers, Json(json)).into_response())
}

async fn update_page(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id)?;
    let body = read_body(&headers, &body)?;
    let pages = state.pages();

    let page = pages.update(&caller, id, &body).await?;
    Ok(Json(pages.present(&caller, &page, Context::Edit).await?))
}

async fn delete_page(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id)?;
    let args = DeleteArgs::parse(&QueryParams::parse(query.as_deref()))?;
    let pages = state.pages();

    let body = match pages.delete(&caller, id, args.force).await? {
        Deletion::Trashed(page) => pages.present(&caller, &page, Context::Edit).await?,
        Deletion::Deleted(page) => json!({
            "deleted": true,
            "previous": pages.present(&caller, &page, Context::Edit).await?,
        }),
    };
    Ok(Json(body))
}

fn endpoint(methods: &[&str], args: Map<String, Value>) -> Value {
    json!({ "methods": methods, "args": args })
}

/// Route description without the schema, as listed by the namespace index.
pub fn collection_route(pages: &PageService) -> Value {
    let properties = pages.properties();
    json!({
        "namespace": NAMESPACE,
        "methods": COLLECTION_METHODS,
        "endpoints": [
            endpoint(&["GET"], schema::collection_params(pages.limits())),
            endpoint(&["POST"], schema::writable_params(&properties)),
        ],
    })
}

pub fn item_route(pages: &PageService) -> Value {
    let properties = pages.properties();
    json!({
        "namespace": NAMESPACE,
        "methods": ITEM_METHODS,
        "endpoints": [
            endpoint(&["GET"], schema::item_params()),
            endpoint(&["POST", "PUT", "PATCH"], schema::writable_params(&properties)),
            endpoint(&["DELETE"], schema::delete_params()),
        ],
    })
}

fn describe(mut route: Value, pages: &PageService, methods: &[&str]) -> AppResult<Response> {
    route["schema"] = schema::page_schema(&pages.template_slugs());

    let mut headers = HeaderMap::new();
    headers.insert(
        header::ALLOW,
        HeaderValue::from_str(&methods.join(", ")).context("invalid Allow header")?,
    );
    Ok((StatusCode::OK, headers, Json(route)).into_response())
}

async fn describe_collection(State(state): State<AppState>) -> AppResult<Response> {
    let pages = state.pages();
    describe(collection_route(pages), pages, COLLECTION_METHODS)
}

async fn describe_item(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Response> {
    parse_id(&id)?;
    let pages = state.pages();
    describe(item_route(pages), pages, ITEM_METHODS)
}

/// Path pattern of the item route as listed by the namespace index.
pub fn item_route_pattern() -> String {
    format!("/{NAMESPACE}/{REST_BASE}/(?P<id>[\\d]+)")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("12").unwrap(), 12);
        assert_eq!(parse_id("abc").unwrap_err().code(), "rest_no_route");
        assert_eq!(parse_id("-3").unwrap_err().code(), "rest_no_route");
    }

    #[test]
    fn body_can_be_empty_json_or_form() {
        let empty = read_body(&HeaderMap::new(), &Bytes::from_static(b"")).unwrap();
        assert!(empty.is_empty());

        let json = read_body(&HeaderMap::new(), &Bytes::from_static(br#"{"title":"A"}"#)).unwrap();
        assert_eq!(json["title"], "A");

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let form = read_body(&headers, &Bytes::from_static(b"title=A+B&menu_order=2")).unwrap();
        assert_eq!(form["title"], "A B");
        assert_eq!(form["menu_order"], "2");

        let err = read_body(&HeaderMap::new(), &Bytes::from_static(b"[1,2]")).unwrap_err();
        assert_eq!(err.code(), "rest_invalid_json");
    }

    #[test]
    fn links_point_at_neighbouring_pages() {
        let params = QueryParams::parse(Some("per_page=4&page=2"));
        let link = pagination_links("http://x/wp/v2/pages", &params, 2, 3).unwrap();
        assert_eq!(
            link,
            "<http://x/wp/v2/pages?per_page=4&page=1>; rel=\"prev\", \
             <http://x/wp/v2/pages?per_page=4&page=3>; rel=\"next\""
        );

        assert!(pagination_links("http://x", &QueryParams::default(), 1, 1).is_none());
    }
}
