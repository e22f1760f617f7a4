//! Folio test utilities.
//!
//! Request body builders, API users and JSON assertions shared by the
//! integration tests.

use serde_json::{Map, Value as JsonValue};

/// Start a page request body with the given title.
pub fn test_page(title: &str) -> TestPage {
    TestPage {
        title: title.to_string(),
        content: String::new(),
        status: None,
        parent: None,
        menu_order: None,
        template: None,
        slug: None,
        password: None,
    }
}

/// Builder for page create/update bodies.
#[derive(Debug, Clone)]
pub struct TestPage {
    pub title: String,
    pub content: String,
    pub status: Option<String>,
    pub parent: Option<i64>,
    pub menu_order: Option<i64>,
    pub template: Option<String>,
    pub slug: Option<String>,
    pub password: Option<String>,
}

impl TestPage {
    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    pub fn with_parent(mut self, parent: i64) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_menu_order(mut self, menu_order: i64) -> Self {
        self.menu_order = Some(menu_order);
        self
    }

    pub fn with_template(mut self, template: &str) -> Self {
        self.template = Some(template.to_string());
        self
    }

    pub fn with_slug(mut self, slug: &str) -> Self {
        self.slug = Some(slug.to_string());
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    /// Mark as published.
    pub fn published(self) -> Self {
        self.with_status("publish")
    }

    /// Mark as draft.
    pub fn draft(self) -> Self {
        self.with_status("draft")
    }

    /// JSON body as sent to the pages endpoint. Unset fields are omitted.
    pub fn to_json(&self) -> JsonValue {
        let mut body = Map::new();
        body.insert("title".into(), self.title.clone().into());
        if !self.content.is_empty() {
            body.insert("content".into(), self.content.clone().into());
        }
        if let Some(status) = &self.status {
            body.insert("status".into(), status.clone().into());
        }
        if let Some(parent) = self.parent {
            body.insert("parent".into(), parent.into());
        }
        if let Some(menu_order) = self.menu_order {
            body.insert("menu_order".into(), menu_order.into());
        }
        if let Some(template) = &self.template {
            body.insert("template".into(), template.clone().into());
        }
        if let Some(slug) = &self.slug {
            body.insert("slug".into(), slug.clone().into());
        }
        if let Some(password) = &self.password {
            body.insert("password".into(), password.clone().into());
        }
        JsonValue::Object(body)
    }
}

/// An API user known to the test application.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: i64,
    pub login: String,
    /// Role name as written in the users file.
    pub role: String,
    /// Raw bearer token.
    pub token: String,
}

impl TestUser {
    fn new(id: i64, login: &str, role: &str) -> Self {
        Self {
            id,
            login: login.to_string(),
            role: role.to_string(),
            token: format!("test-token-{login}"),
        }
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

pub fn administrator() -> TestUser {
    TestUser::new(1, "admin", "administrator")
}

pub fn editor() -> TestUser {
    TestUser::new(2, "editor", "editor")
}

pub fn author() -> TestUser {
    TestUser::new(3, "author", "author")
}

pub fn subscriber() -> TestUser {
    TestUser::new(4, "subscriber", "subscriber")
}

/// Assertion helpers for JSON responses.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{}', got: {}",
            key,
            value
        );
    }

    /// Assert that an error body carries the expected code.
    pub fn error_code(value: &Value, code: &str) {
        assert_eq!(
            value.get("code").and_then(Value::as_str),
            Some(code),
            "Expected error code '{}', got: {}",
            code,
            value
        );
    }

    /// Ids of a JSON array of pages, in response order.
    pub fn ids(value: &Value) -> Vec<i64> {
        value
            .as_array()
            .map(|items| items.iter().filter_map(|i| i["id"].as_i64()).collect())
            .unwrap_or_default()
    }
}
