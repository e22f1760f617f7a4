//! Query-string arguments for the page routes.
//!
//! Query strings are parsed by hand (not through `serde`) because the
//! collection route accepts PHP-style keys: `include[]=1&include[]=2` and
//! `filter[post_status]=draft`.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::PaginationLimits;
use crate::auth::{Capability, Caller};
use crate::error::{AppError, AppResult};
use crate::models::{PAGE_TYPE, PostStatus};
use crate::schema::Context;
use crate::store::{OrderBy, PostQuery, SortOrder};

/// Every query parameter the collection route recognises.
pub const LIST_PARAMS: [&str; 12] = [
    "author", "context", "exclude", "filter", "include", "order", "orderby", "page", "parent",
    "per_page", "search", "status",
];

/// Largest row offset handed to a store. Postgres takes `OFFSET` as a signed
/// 64-bit value.
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Decoded query string, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self { pairs }
    }

    /// Parameter name without any `[...]` suffix.
    fn base_name(key: &str) -> &str {
        key.split_once('[').map_or(key, |(base, _)| base)
    }

    /// Distinct base names present.
    pub fn names(&self) -> BTreeSet<&str> {
        self.pairs.iter().map(|(k, _)| Self::base_name(k)).collect()
    }

    /// Last scalar value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Values of a list parameter: `name=1,2`, `name[]=1&name[]=2` or repeated `name`.
    pub fn list(&self, name: &str) -> Vec<&str> {
        let bracketed = format!("{name}[]");
        self.pairs
            .iter()
            .filter(|(k, _)| *k == name || *k == bracketed)
            .flat_map(|(_, v)| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// `filter[key]=value` entries.
    pub fn filter_vars(&self) -> BTreeMap<String, String> {
        self.pairs
            .iter()
            .filter_map(|(k, v)| {
                let key = k.strip_prefix("filter[")?.strip_suffix(']')?;
                Some((key.to_string(), v.clone()))
            })
            .collect()
    }

    /// Remaining pairs with `name` replaced by a new value, re-encoded.
    pub fn with_value(&self, name: &str, value: &str) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.pairs {
            if k != name {
                serializer.append_pair(k, v);
            }
        }
        serializer.append_pair(name, value);
        serializer.finish()
    }
}

fn parse_context(params: &QueryParams, errors: &mut BTreeMap<String, String>) -> Context {
    match params.get("context").map(str::parse::<Context>) {
        None => Context::default(),
        Some(Ok(context)) => context,
        Some(Err(reason)) => {
            errors.insert("context".into(), reason);
            Context::default()
        }
    }
}

fn parse_integer(
    params: &QueryParams,
    name: &str,
    errors: &mut BTreeMap<String, String>,
) -> Option<i64> {
    let raw = params.get(name)?;
    match raw.trim().parse::<i64>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.insert(name.into(), format!("{name} is not of type integer."));
            None
        }
    }
}

fn parse_id_list(params: &QueryParams, name: &str, errors: &mut BTreeMap<String, String>) -> Vec<i64> {
    let mut ids = Vec::new();
    for raw in params.list(name) {
        match raw.parse::<i64>() {
            Ok(id) => ids.push(id),
            Err(_) => {
                errors.insert(name.into(), format!("{name}[] is not of type integer."));
            }
        }
    }
    ids
}

/// Validated arguments of a collection request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListArgs {
    pub context: Context,
    pub page: u64,
    pub per_page: u64,
    pub search: Option<String>,
    pub author: Option<i64>,
    pub parent: Option<i64>,
    pub include: Vec<i64>,
    pub exclude: Vec<i64>,
    pub order: SortOrder,
    pub order_by: OrderBy,
    pub status: PostStatus,
    /// Raw `filter[...]` query vars, before the policy is applied.
    pub filter: BTreeMap<String, String>,
}

impl ListArgs {
    /// Parse and validate, reporting every bad parameter at once.
    pub fn parse(params: &QueryParams, limits: PaginationLimits) -> AppResult<Self> {
        let mut errors = BTreeMap::new();

        for name in params.names() {
            if !LIST_PARAMS.contains(&name) {
                errors.insert(name.to_string(), format!("{name} is not a recognized parameter."));
            }
        }

        let context = parse_context(params, &mut errors);

        let page = match parse_integer(params, "page", &mut errors) {
            None => 1,
            Some(page) if page >= 1 => page as u64,
            Some(_) => {
                errors.insert("page".into(), "page must be greater than or equal to 1".into());
                1
            }
        };

        let per_page = match parse_integer(params, "per_page", &mut errors) {
            None => limits.default_per_page,
            Some(n) if n >= 1 && (n as u64) <= limits.max_per_page => n as u64,
            Some(_) => {
                errors.insert(
                    "per_page".into(),
                    format!("per_page must be between 1 and {}", limits.max_per_page),
                );
                limits.default_per_page
            }
        };

        let author = parse_integer(params, "author", &mut errors);
        let parent = parse_integer(params, "parent", &mut errors);
        let include = parse_id_list(params, "include", &mut errors);
        let exclude = parse_id_list(params, "exclude", &mut errors);

        let order = match params.get("order").map(str::parse::<SortOrder>) {
            None => SortOrder::default(),
            Some(Ok(order)) => order,
            Some(Err(_)) => {
                errors.insert("order".into(), "order is not one of asc, desc.".into());
                SortOrder::default()
            }
        };

        let order_by = match params.get("orderby").map(str::parse::<OrderBy>) {
            None => OrderBy::default(),
            Some(Ok(order_by)) => order_by,
            Some(Err(_)) => {
                let names: Vec<&str> = OrderBy::ALL.iter().map(|o| o.as_str()).collect();
                errors.insert("orderby".into(), format!("orderby is not one of {}.", names.join(", ")));
                OrderBy::default()
            }
        };

        let status = match params.get("status").map(str::parse::<PostStatus>) {
            None => PostStatus::Publish,
            Some(Ok(status)) => status,
            Some(Err(reason)) => {
                errors.insert("status".into(), reason);
                PostStatus::Publish
            }
        };

        if !errors.is_empty() {
            return Err(AppError::invalid_params(errors));
        }

        Ok(Self {
            context,
            page,
            per_page,
            search: params.get("search").filter(|s| !s.is_empty()).map(str::to_string),
            author,
            parent,
            include,
            exclude,
            order,
            order_by,
            status,
            filter: params.filter_vars(),
        })
    }

    /// Store query for these arguments, before any `filter[...]` vars.
    pub fn to_query(&self) -> PostQuery {
        let mut query = PostQuery::for_type(PAGE_TYPE, self.per_page);
        query.statuses = vec![self.status];
        query.author = self.author;
        query.parent = self.parent;
        query.include = self.include.clone();
        query.exclude = self.exclude.clone();
        query.search = self.search.clone();
        query.order = self.order;
        query.order_by = self.order_by;
        query.offset = (self.page - 1).saturating_mul(self.per_page).min(MAX_OFFSET);
        query
    }
}

/// Arguments of the single-page GET.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SingleArgs {
    pub context: Context,
}

impl SingleArgs {
    pub fn parse(params: &QueryParams) -> AppResult<Self> {
        let mut errors = BTreeMap::new();
        let context = parse_context(params, &mut errors);
        if !errors.is_empty() {
            return Err(AppError::invalid_params(errors));
        }
        Ok(Self { context })
    }
}

/// Arguments of DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeleteArgs {
    /// Skip the trash and remove the page permanently.
    pub force: bool,
}

impl DeleteArgs {
    pub fn parse(params: &QueryParams) -> AppResult<Self> {
        let force = match params.get("force") {
            None => false,
            Some("true" | "1") => true,
            Some("false" | "0" | "") => false,
            Some(_) => return Err(AppError::invalid_param("force", "force is not of type boolean.")),
        };
        Ok(Self { force })
    }
}

/// Which `filter[...]` query vars a caller may use.
///
/// Each tier pairs a capability (`None` = everybody) with the vars it
/// unlocks; a caller gets the union of the tiers they qualify for.
pub struct QueryVarPolicy {
    tiers: Vec<(Option<Capability>, &'static [&'static str])>,
}

impl QueryVarPolicy {
    /// Vars every caller may use on the page collection.
    pub const PUBLIC_VARS: &'static [&'static str] =
        &["s", "name", "pagename", "author", "order", "orderby", "p", "page_id"];

    /// Vars that can expose unpublished pages, reserved for page editors.
    pub const PRIVATE_VARS: &'static [&'static str] =
        &["post_status", "post_parent", "menu_order", "posts_per_page", "offset"];

    pub fn new() -> Self {
        Self { tiers: Vec::new() }
    }

    pub fn allow(mut self, capability: Option<Capability>, vars: &'static [&'static str]) -> Self {
        self.tiers.push((capability, vars));
        self
    }

    /// Policy for the page collection.
    pub fn pages() -> Self {
        Self::new()
            .allow(None, Self::PUBLIC_VARS)
            .allow(Some(Capability::EditPages), Self::PRIVATE_VARS)
    }

    /// Vars the caller may use.
    pub fn allowed_vars(&self, caller: &Caller) -> BTreeSet<&'static str> {
        self.tiers
            .iter()
            .filter(|(capability, _)| capability.is_none_or(|c| caller.can(c)))
            .flat_map(|(_, vars)| vars.iter().copied())
            .collect()
    }

    /// Keep only the vars the caller may use; the rest are dropped silently.
    pub fn resolve(&self, vars: &BTreeMap<String, String>, caller: &Caller) -> BTreeMap<String, String> {
        let allowed = self.allowed_vars(caller);
        vars.iter()
            .filter(|(key, _)| {
                let ok = allowed.contains(key.as_str());
                if !ok {
                    debug!(var = %key, user_id = caller.user_id, "query var dropped");
                }
                ok
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Apply resolved vars on top of a store query. Unparseable values are ignored.
    pub fn apply(vars: &BTreeMap<String, String>, query: &mut PostQuery, limits: PaginationLimits) {
        let mut page_size_changed = false;

        for (key, value) in vars {
            match key.as_str() {
                "s" => query.search = Some(value.clone()).filter(|s| !s.is_empty()),
                "name" => query.slug = Some(value.clone()),
                "pagename" => {
                    let leaf = value.trim_matches('/').rsplit('/').next().unwrap_or_default();
                    query.slug = Some(leaf.to_string());
                }
                "author" => {
                    if let Ok(author) = value.parse() {
                        query.author = Some(author);
                    }
                }
                "order" => {
                    if let Ok(order) = value.parse() {
                        query.order = order;
                    }
                }
                "orderby" => {
                    if let Ok(order_by) = value.parse() {
                        query.order_by = order_by;
                    }
                }
                "p" | "page_id" => {
                    if let Ok(id) = value.parse() {
                        query.include = vec![id];
                    }
                }
                "post_status" => {
                    let statuses: Vec<PostStatus> = if value == "any" {
                        PostStatus::WRITABLE.to_vec()
                    } else {
                        value.split(',').filter_map(|s| s.trim().parse().ok()).collect()
                    };
                    if !statuses.is_empty() {
                        query.statuses = statuses;
                    }
                }
                "post_parent" => {
                    if let Ok(parent) = value.parse() {
                        query.parent = Some(parent);
                    }
                }
                "menu_order" => {
                    if let Ok(menu_order) = value.parse() {
                        query.menu_order = Some(menu_order);
                    }
                }
                "posts_per_page" => {
                    if let Ok(n) = value.parse::<u64>() {
                        let n = n.clamp(1, limits.max_per_page);
                        let page = query.offset / query.limit.max(1);
                        query.limit = n;
                        query.offset = page.saturating_mul(n).min(MAX_OFFSET);
                        page_size_changed = true;
                    }
                }
                _ => {}
            }
        }

        // An explicit offset wins over the one derived from `page`.
        if let Some(offset) = vars.get("offset").and_then(|v| v.parse::<u64>().ok()) {
            query.offset = offset.min(MAX_OFFSET);
        } else if page_size_changed {
            debug!(limit = query.limit, offset = query.offset, "page size overridden by query var");
        }
    }
}

impl Default for QueryVarPolicy {
    fn default() -> Self {
        Self::pages()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn editor() -> Caller {
        Caller {
            user_id: 2,
            role: Some(Role::Editor),
        }
    }

    fn parse(raw: &str) -> AppResult<ListArgs> {
        ListArgs::parse(&QueryParams::parse(Some(raw)), PaginationLimits::default())
    }

    #[test]
    fn defaults() {
        let args = parse("").unwrap();
        assert_eq!(args.context, Context::View);
        assert_eq!(args.page, 1);
        assert_eq!(args.per_page, 10);
        assert_eq!(args.order, SortOrder::Desc);
        assert_eq!(args.order_by, OrderBy::Date);
        assert_eq!(args.status, PostStatus::Publish);
    }

    #[test]
    fn lists_accept_commas_brackets_and_repeats() {
        let args = parse("include=1,2&include[]=3&exclude=4&exclude=5").unwrap();
        assert_eq!(args.include, vec![1, 2, 3]);
        assert_eq!(args.exclude, vec![4, 5]);
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let err = parse("per_page=2&color=blue").unwrap_err();
        match err {
            AppError::BadRequest { code, params, .. } => {
                assert_eq!(code, "rest_invalid_param");
                assert!(params.contains_key("color"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn filter_keys_count_as_filter_parameter() {
        let args = parse("filter[post_status]=draft&filter[s]=hello").unwrap();
        assert_eq!(args.filter.len(), 2);
        assert_eq!(args.filter["post_status"], "draft");
    }

    #[test]
    fn out_of_range_page_size_is_rejected() {
        assert!(parse("per_page=0").is_err());
        assert!(parse("per_page=101").is_err());
        assert!(parse("page=0").is_err());
        assert!(parse("context=admin").is_err());
        assert!(parse("orderby=author").is_err());
    }

    #[test]
    fn to_query_windows_by_page() {
        let query = parse("page=3&per_page=4&parent=9").unwrap().to_query();
        assert_eq!(query.limit, 4);
        assert_eq!(query.offset, 8);
        assert_eq!(query.parent, Some(9));
        assert_eq!(query.statuses, vec![PostStatus::Publish]);
    }

    #[test]
    fn huge_page_number_saturates_offset() {
        let query = parse("page=9223372036854775807&per_page=100").unwrap().to_query();
        assert_eq!(query.limit, 100);
        assert_eq!(query.offset, MAX_OFFSET);

        let mut vars = BTreeMap::new();
        vars.insert("posts_per_page".to_string(), "50".to_string());
        let mut resized = PostQuery::for_type(PAGE_TYPE, 1);
        resized.offset = MAX_OFFSET;
        QueryVarPolicy::apply(&vars, &mut resized, PaginationLimits::default());
        assert_eq!(resized.limit, 50);
        assert_eq!(resized.offset, MAX_OFFSET);

        vars.insert("offset".to_string(), u64::MAX.to_string());
        QueryVarPolicy::apply(&vars, &mut resized, PaginationLimits::default());
        assert_eq!(resized.offset, MAX_OFFSET);
    }

    #[test]
    fn anonymous_callers_lose_private_vars() {
        let policy = QueryVarPolicy::pages();
        let mut vars = BTreeMap::new();
        vars.insert("post_status".to_string(), "draft".to_string());
        vars.insert("s".to_string(), "hello".to_string());

        let anon = policy.resolve(&vars, &Caller::anonymous());
        assert_eq!(anon.keys().collect::<Vec<_>>(), vec!["s"]);

        let editor = policy.resolve(&vars, &editor());
        assert_eq!(editor.len(), 2);
    }

    #[test]
    fn apply_overrides_query() {
        let mut vars = BTreeMap::new();
        vars.insert("post_status".to_string(), "draft,pending".to_string());
        vars.insert("pagename".to_string(), "about/team".to_string());
        vars.insert("offset".to_string(), "3".to_string());

        let mut query = PostQuery::for_type(PAGE_TYPE, 10);
        QueryVarPolicy::apply(&vars, &mut query, PaginationLimits::default());

        assert_eq!(query.statuses, vec![PostStatus::Draft, PostStatus::Pending]);
        assert_eq!(query.slug.as_deref(), Some("team"));
        assert_eq!(query.offset, 3);
    }

    #[test]
    fn delete_force_flag() {
        assert!(!DeleteArgs::parse(&QueryParams::parse(None)).unwrap().force);
        assert!(DeleteArgs::parse(&QueryParams::parse(Some("force=true"))).unwrap().force);
        assert!(DeleteArgs::parse(&QueryParams::parse(Some("force=maybe"))).is_err());
    }

    #[test]
    fn with_value_replaces_page() {
        let params = QueryParams::parse(Some("per_page=4&page=2"));
        assert_eq!(params.with_value("page", "3"), "per_page=4&page=3");
    }
}
