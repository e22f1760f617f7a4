#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Each [`TestApp`] wires the REAL router and state over an in-memory page
//! store, a throwaway theme directory and a fixed set of API users, so tests
//! run without a database and never share data.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use folio_kernel::auth::{Role, User, UserDirectory};
use folio_kernel::models::{NewPost, Post};
use folio_kernel::store::{MemoryPageStore, PageStore as _, PostQuery};
use folio_kernel::theme::TemplateRegistry;
use folio_kernel::{AppState, Config, app};
use folio_test_utils::TestUser;

/// Template shipped in every test theme.
pub const TEST_TEMPLATE: &str = "page-my-test-template.php";

/// Decoded response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    theme_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let theme_dir = tempfile::tempdir().expect("Failed to create theme dir");
        std::fs::write(
            theme_dir.path().join(TEST_TEMPLATE),
            "<?php\n/*\n * Template Name: My Test Template\n */\n",
        )
        .expect("Failed to write template");

        let users = UserDirectory::new();
        for user in [
            folio_test_utils::administrator(),
            folio_test_utils::editor(),
            folio_test_utils::author(),
            folio_test_utils::subscriber(),
        ] {
            register(&users, &user);
        }

        let config = Config {
            site_url: "http://example.org".to_string(),
            theme_dir: theme_dir.path().to_path_buf(),
            ..Config::default()
        };
        let templates = TemplateRegistry::new(Some(config.theme_dir.clone()))
            .expect("Failed to scan theme");
        let state = AppState::from_parts(
            config,
            Arc::new(MemoryPageStore::new()),
            users,
            templates,
        )
        .expect("Failed to build AppState");

        Self {
            router: app(state.clone()),
            state,
            theme_dir,
        }
    }

    /// Send a request and decode the JSON body (`Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Response is not JSON")
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Request without a body, optionally as `user`.
    pub async fn call(&self, method: Method, uri: &str, user: Option<&TestUser>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, user.bearer());
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn get(&self, uri: &str, user: Option<&TestUser>) -> TestResponse {
        self.call(Method::GET, uri, user).await
    }

    /// Request with a JSON body.
    pub async fn send_json(
        &self,
        method: Method,
        uri: &str,
        user: Option<&TestUser>,
        body: &Value,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, user.bearer());
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, user: Option<&TestUser>, body: &Value) -> TestResponse {
        self.send_json(Method::POST, uri, user, body).await
    }

    /// Store a record directly, bypassing the API.
    pub async fn seed(&self, post: NewPost) -> Post {
        self.state
            .store()
            .insert(post)
            .await
            .expect("Failed to seed post")
    }

    pub async fn stored(&self, id: i64) -> Option<Post> {
        self.state.store().find(id).await.expect("Failed to load post")
    }

    /// Number of stored pages in any status.
    pub async fn stored_pages(&self) -> u64 {
        self.state
            .store()
            .query(&PostQuery::for_type("page", 1))
            .await
            .expect("Failed to query store")
            .1
    }

    /// Write a template file into the theme without rescanning.
    pub fn write_template(&self, file: &str, name: &str) {
        std::fs::write(
            self.theme_dir.path().join(file),
            format!("<?php\n/*\n * Template Name: {name}\n */\n"),
        )
        .expect("Failed to write template");
    }

    /// Drop another template into the theme and rescan it.
    pub fn add_template(&self, file: &str, name: &str) {
        self.write_template(file, name);
        self.state.templates().refresh();
    }
}

fn register(users: &UserDirectory, user: &TestUser) {
    let role: Role = user.role.parse().expect("Unknown role");
    users.insert_with_token(
        User {
            id: user.id,
            login: user.login.clone(),
            display_name: user.login.clone(),
            role,
            token_hash: None,
        },
        &user.token,
    );
}
