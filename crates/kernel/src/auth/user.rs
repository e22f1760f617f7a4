//! Users and API token lookup.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use super::Role;

/// A user able to call the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub display_name: String,
    pub role: Role,
    /// SHA-256 hex digest of the user's API token. Raw tokens are never stored.
    #[serde(default, skip_serializing)]
    pub token_hash: Option<String>,
}

/// Layout of the users file.
#[derive(Debug, Default, Deserialize)]
struct UsersFile {
    #[serde(default)]
    users: Vec<User>,
}

/// In-memory user directory keyed by id and token hash.
#[derive(Clone, Default)]
pub struct UserDirectory {
    inner: Arc<RwLock<DirectoryInner>>,
}

#[derive(Default)]
struct DirectoryInner {
    users: BTreeMap<i64, User>,
    /// token hash -> user id
    tokens: HashMap<String, i64>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load users from a TOML file with a `[[users]]` array.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read users file {}", path.display()))?;
        let directory = Self::from_toml(&raw)
            .with_context(|| format!("failed to parse users file {}", path.display()))?;

        info!(
            path = %path.display(),
            users = directory.len(),
            "users loaded"
        );
        Ok(directory)
    }

    /// Parse a users document.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let file: UsersFile = toml::from_str(raw).context("invalid users document")?;
        let directory = Self::new();
        for user in file.users {
            anyhow::ensure!(user.id > 0, "user '{}' must have a positive id", user.login);
            directory.insert(user);
        }
        Ok(directory)
    }

    /// Add or replace a user.
    pub fn insert(&self, user: User) {
        let mut inner = self.inner.write();
        if let Some(previous) = inner.users.get(&user.id).and_then(|u| u.token_hash.clone()) {
            inner.tokens.remove(&previous);
        }
        if let Some(hash) = &user.token_hash {
            inner.tokens.insert(hash.to_lowercase(), user.id);
        }
        inner.users.insert(user.id, user);
    }

    /// Add or replace a user whose raw token is known (tests, provisioning).
    pub fn insert_with_token(&self, mut user: User, raw_token: &str) {
        user.token_hash = Some(hash_token(raw_token));
        self.insert(user);
    }

    pub fn find(&self, id: i64) -> Option<User> {
        self.inner.read().users.get(&id).cloned()
    }

    /// Resolve a raw bearer token to its user.
    pub fn authenticate(&self, raw_token: &str) -> Option<User> {
        let hash = hash_token(raw_token);
        let inner = self.inner.read();
        inner
            .tokens
            .get(&hash)
            .and_then(|id| inner.users.get(id))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Generate a random 64-character hex token.
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// SHA-256 hash a token for storage.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn editor() -> User {
        User {
            id: 2,
            login: "editor".to_string(),
            display_name: "Editor".to_string(),
            role: Role::Editor,
            token_hash: None,
        }
    }

    #[test]
    fn test_token_hashing() {
        let hash = hash_token("secret");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("secret"));
        assert_ne!(hash, hash_token("Secret"));
    }

    #[test]
    fn generated_tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn authenticate_by_raw_token() {
        let directory = UserDirectory::new();
        directory.insert_with_token(editor(), "tok-editor");

        assert_eq!(directory.authenticate("tok-editor").map(|u| u.id), Some(2));
        assert!(directory.authenticate("tok-other").is_none());
    }

    #[test]
    fn replacing_a_user_revokes_old_token() {
        let directory = UserDirectory::new();
        directory.insert_with_token(editor(), "first");
        directory.insert_with_token(editor(), "second");

        assert!(directory.authenticate("first").is_none());
        assert!(directory.authenticate("second").is_some());
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn parse_users_document() {
        let raw = format!(
            r#"
            [[users]]
            id = 1
            login = "admin"
            role = "administrator"
            token_hash = "{}"

            [[users]]
            id = 3
            login = "writer"
            display_name = "Writer"
            role = "author"
            "#,
            hash_token("admin-token")
        );

        let directory = UserDirectory::from_toml(&raw).unwrap();
        assert_eq!(directory.len(), 2);
        assert_eq!(
            directory.authenticate("admin-token").map(|u| u.role),
            Some(Role::Administrator)
        );
        assert_eq!(directory.find(3).unwrap().display_name, "Writer");
    }

    #[test]
    fn users_document_rejects_zero_id() {
        let raw = r#"
            [[users]]
            id = 0
            login = "ghost"
            role = "editor"
        "#;
        assert!(UserDirectory::from_toml(raw).is_err());
    }
}
