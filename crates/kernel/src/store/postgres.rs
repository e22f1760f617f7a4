//! PostgreSQL page store.
//!
//! Writes use bound `sqlx` queries. Collection reads are assembled with
//! SeaQuery because the predicate, sort key and window all vary per request.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{
    Asterisk, Cond, Expr, Func, Iden, Order, PostgresQueryBuilder, Query, SelectStatement,
};
use sqlx::PgPool;

use super::{OrderBy, PageStore, PostQuery, SortOrder};
use crate::models::{NewPost, Post};

#[derive(Iden)]
enum Posts {
    Table,
    Id,
    PostType,
    Title,
    Content,
    Excerpt,
    Slug,
    Status,
    Parent,
    MenuOrder,
    Author,
    DateGmt,
}

const POST_COLUMNS: &str = "id, post_type, title, content, excerpt, slug, status, parent, \
     menu_order, template, author, date_gmt, modified_gmt, comment_status, ping_status, \
     password, featured_image";

/// Row shape of the `posts` table.
#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: i64,
    post_type: String,
    title: String,
    content: String,
    excerpt: String,
    slug: String,
    status: String,
    parent: i64,
    menu_order: i64,
    template: String,
    author: i64,
    date_gmt: DateTime<Utc>,
    modified_gmt: DateTime<Utc>,
    comment_status: String,
    ping_status: String,
    password: String,
    featured_image: i64,
}

impl TryFrom<PostRow> for Post {
    type Error = anyhow::Error;

    fn try_from(row: PostRow) -> Result<Self> {
        Ok(Post {
            id: row.id,
            post_type: row.post_type,
            title: row.title,
            content: row.content,
            excerpt: row.excerpt,
            slug: row.slug,
            status: row.status.parse().map_err(|e: String| anyhow!(e))?,
            parent: row.parent,
            menu_order: row.menu_order,
            template: row.template,
            author: row.author,
            date_gmt: row.date_gmt,
            modified_gmt: row.modified_gmt,
            comment_status: row.comment_status.parse().map_err(|e: String| anyhow!(e))?,
            ping_status: row.ping_status.parse().map_err(|e: String| anyhow!(e))?,
            password: row.password,
            featured_image: row.featured_image,
        })
    }
}

/// Page store backed by the `posts` table.
#[derive(Clone)]
pub struct PgPageStore {
    pool: PgPool,
}

impl PgPageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Escape SQL LIKE wildcards so search text matches literally.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn filter_condition(query: &PostQuery) -> Cond {
    let mut cond = Cond::all().add(Expr::col(Posts::PostType).eq(query.post_type.as_str()));

    if !query.statuses.is_empty() {
        let statuses: Vec<&str> = query.statuses.iter().map(|s| s.as_str()).collect();
        cond = cond.add(Expr::col(Posts::Status).is_in(statuses));
    }
    if let Some(author) = query.author {
        cond = cond.add(Expr::col(Posts::Author).eq(author));
    }
    if let Some(parent) = query.parent {
        cond = cond.add(Expr::col(Posts::Parent).eq(parent));
    }
    if !query.include.is_empty() {
        cond = cond.add(Expr::col(Posts::Id).is_in(query.include.iter().copied()));
    }
    if !query.exclude.is_empty() {
        cond = cond.add(Expr::col(Posts::Id).is_not_in(query.exclude.iter().copied()));
    }
    if let Some(slug) = &query.slug {
        cond = cond.add(Expr::col(Posts::Slug).eq(slug.as_str()));
    }
    if let Some(menu_order) = query.menu_order {
        cond = cond.add(Expr::col(Posts::MenuOrder).eq(menu_order));
    }
    if let Some(search) = &query.search {
        let pattern = format!("%{}%", escape_like_wildcards(&search.to_lowercase()));
        let mut any = Cond::any();
        for column in [Posts::Title, Posts::Content, Posts::Excerpt] {
            any = any.add(Expr::expr(Func::lower(Expr::col(column))).like(pattern.as_str()));
        }
        cond = cond.add(any);
    }

    cond
}

fn add_ordering(select: &mut SelectStatement, query: &PostQuery) {
    let order = match query.order {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    };

    match query.order_by {
        OrderBy::Date => {
            select.order_by(Posts::DateGmt, order.clone());
        }
        OrderBy::Id => {}
        OrderBy::Include => {
            if !query.include.is_empty() {
                let ids: Vec<String> = query.include.iter().map(i64::to_string).collect();
                select.order_by_expr(
                    Expr::cust(format!(
                        "array_position(ARRAY[{}]::bigint[], id)",
                        ids.join(",")
                    )),
                    order.clone(),
                );
            }
        }
        OrderBy::Title => {
            select.order_by_expr(Func::lower(Expr::col(Posts::Title)).into(), order.clone());
        }
        OrderBy::Slug => {
            select.order_by(Posts::Slug, order.clone());
        }
        OrderBy::MenuOrder => {
            select.order_by(Posts::MenuOrder, order.clone());
        }
    }

    // Id breaks ties (and is the whole key for `orderby=id`).
    select.order_by(Posts::Id, order);
}

/// SELECT for one window of a collection query.
fn build_select(query: &PostQuery) -> String {
    let mut select = Query::select();
    select
        .expr(Expr::cust(POST_COLUMNS))
        .from(Posts::Table)
        .cond_where(filter_condition(query));
    add_ordering(&mut select, query);
    select.limit(query.limit).offset(query.offset);
    select.to_string(PostgresQueryBuilder)
}

/// COUNT over the whole matching set.
fn build_count(query: &PostQuery) -> String {
    let mut select = Query::select();
    select
        .expr(Expr::col(Asterisk).count())
        .from(Posts::Table)
        .cond_where(filter_condition(query));
    select.to_string(PostgresQueryBuilder)
}

#[async_trait]
impl PageStore for PgPageStore {
    async fn insert(&self, post: NewPost) -> Result<Post> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            INSERT INTO posts (post_type, title, content, excerpt, slug, status, parent,
                menu_order, template, author, date_gmt, modified_gmt, comment_status,
                ping_status, password, featured_image)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(&post.post_type)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.excerpt)
        .bind(&post.slug)
        .bind(post.status.as_str())
        .bind(post.parent)
        .bind(post.menu_order)
        .bind(&post.template)
        .bind(post.author)
        .bind(post.date_gmt)
        .bind(post.modified_gmt)
        .bind(post.comment_status.as_str())
        .bind(post.ping_status.as_str())
        .bind(&post.password)
        .bind(post.featured_image)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert post")?;

        row.try_into()
    }

    async fn find(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch post by id")?;

        row.map(Post::try_from).transpose()
    }

    async fn save(&self, post: &Post) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE posts SET title = $2, content = $3, excerpt = $4, slug = $5, status = $6,
                parent = $7, menu_order = $8, template = $9, author = $10, date_gmt = $11,
                modified_gmt = $12, comment_status = $13, ping_status = $14, password = $15,
                featured_image = $16
            WHERE id = $1
            "#,
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.excerpt)
        .bind(&post.slug)
        .bind(post.status.as_str())
        .bind(post.parent)
        .bind(post.menu_order)
        .bind(&post.template)
        .bind(post.author)
        .bind(post.date_gmt)
        .bind(post.modified_gmt)
        .bind(post.comment_status.as_str())
        .bind(post.ping_status.as_str())
        .bind(&post.password)
        .bind(post.featured_image)
        .execute(&self.pool)
        .await
        .context("failed to update post")?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to delete post")?;

        Ok(result.rows_affected() > 0)
    }

    async fn query(&self, query: &PostQuery) -> Result<(Vec<Post>, u64)> {
        let total: i64 = sqlx::query_scalar(&build_count(query))
            .fetch_one(&self.pool)
            .await
            .context("failed to count posts")?;

        let rows = sqlx::query_as::<_, PostRow>(&build_select(query))
            .fetch_all(&self.pool)
            .await
            .context("failed to query posts")?;

        let posts = rows
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok((posts, u64::try_from(total).unwrap_or(0)))
    }

    async fn slug_taken(
        &self,
        post_type: &str,
        parent: i64,
        slug: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE post_type = $1 AND parent = $2 AND slug = $3 AND id <> $4)",
        )
        .bind(post_type)
        .bind(parent)
        .bind(slug)
        .bind(exclude_id.unwrap_or(0))
        .fetch_one(&self.pool)
        .await
        .context("failed to check slug")?;

        Ok(taken)
    }

    async fn reparent_children(&self, post_type: &str, from: i64, to: i64) -> Result<u64> {
        let result = sqlx::query("UPDATE posts SET parent = $3 WHERE post_type = $1 AND parent = $2")
            .bind(post_type)
            .bind(from)
            .bind(to)
            .execute(&self.pool)
            .await
            .context("failed to reparent children")?;

        Ok(result.rows_affected())
    }

    async fn healthy(&self) -> bool {
        crate::db::check_health(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PAGE_TYPE, PostStatus};

    #[test]
    fn select_filters_by_type_status_and_parent() {
        let mut query = PostQuery::for_type(PAGE_TYPE, 10);
        query.statuses = vec![PostStatus::Publish];
        query.parent = Some(4);
        query.offset = 20;

        let sql = build_select(&query);
        assert!(sql.contains(r#""post_type" = 'page'"#));
        assert!(sql.contains(r#""status" IN ('publish')"#));
        assert!(sql.contains(r#""parent" = 4"#));
        assert!(sql.contains("LIMIT 10"));
        assert!(sql.contains("OFFSET 20"));
    }

    #[test]
    fn include_order_uses_array_position() {
        let mut query = PostQuery::for_type(PAGE_TYPE, 10);
        query.include = vec![9, 3];
        query.order_by = OrderBy::Include;
        query.order = SortOrder::Asc;

        let sql = build_select(&query);
        assert!(sql.contains("array_position(ARRAY[9,3]::bigint[], id) ASC"));
    }

    #[test]
    fn count_ignores_window() {
        let mut query = PostQuery::for_type(PAGE_TYPE, 5);
        query.offset = 10;

        let sql = build_count(&query);
        assert!(sql.starts_with("SELECT COUNT(*)"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn search_escapes_wildcards() {
        let mut query = PostQuery::for_type(PAGE_TYPE, 5);
        query.search = Some("100%".to_string());

        let sql = build_count(&query);
        assert!(sql.contains("LOWER"));
        assert!(sql.contains("100\\\\%") || sql.contains("100\\%"));
    }
}
