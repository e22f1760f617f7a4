//! Callers, roles and per-page access checks.

mod capability;
mod middleware;
mod user;

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::models::{Post, PostStatus};

pub use capability::{Capability, Role};
pub use middleware::authenticate_api_token;
pub use user::{User, UserDirectory, generate_token, hash_token};

/// The identity a request runs as.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Caller {
    /// User id (0 for anonymous).
    pub user_id: i64,
    /// Role of an authenticated caller.
    pub role: Option<Role>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: Some(user.role),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.role.is_some()
    }

    /// Check a capability against the caller's role.
    pub fn can(&self, capability: Capability) -> bool {
        self.role.is_some_and(|role| role.has(capability))
    }

    fn owns(&self, post: &Post) -> bool {
        self.is_authenticated() && post.author == self.user_id
    }

    /// May the caller see this page at all.
    pub fn can_read(&self, post: &Post) -> bool {
        match post.status {
            PostStatus::Publish => true,
            PostStatus::Private => self.can(Capability::ReadPrivatePages),
            _ => self.can_edit(post),
        }
    }

    /// May the caller modify this page.
    pub fn can_edit(&self, post: &Post) -> bool {
        if !self.can(Capability::EditPages) {
            return false;
        }
        if !self.owns(post) && !self.can(Capability::EditOthersPages) {
            return false;
        }
        match post.status {
            PostStatus::Publish => self.can(Capability::EditPublishedPages),
            PostStatus::Private => self.can(Capability::EditPrivatePages),
            _ => true,
        }
    }

    /// May the caller trash or delete this page.
    pub fn can_delete(&self, post: &Post) -> bool {
        if !self.can(Capability::DeletePages) {
            return false;
        }
        if !self.owns(post) && !self.can(Capability::DeleteOthersPages) {
            return false;
        }
        match post.status {
            PostStatus::Publish => self.can(Capability::DeletePublishedPages),
            PostStatus::Private => self.can(Capability::DeletePrivatePages),
            _ => true,
        }
    }
}

/// Handlers take `Caller` directly; requests that skipped the token
/// middleware run as anonymous.
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Caller>().cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPost;

    fn caller(id: i64, role: Role) -> Caller {
        Caller {
            user_id: id,
            role: Some(role),
        }
    }

    fn page(status: PostStatus, author: i64) -> Post {
        NewPost::page("Page")
            .with_status(status)
            .with_author(author)
            .into_post(10)
    }

    #[test]
    fn anonymous_reads_only_published() {
        let anon = Caller::anonymous();
        assert!(anon.can_read(&page(PostStatus::Publish, 1)));
        assert!(!anon.can_read(&page(PostStatus::Draft, 1)));
        assert!(!anon.can_read(&page(PostStatus::Private, 1)));
        assert!(!anon.can_edit(&page(PostStatus::Draft, 0)));
    }

    #[test]
    fn editor_edits_others_pages() {
        let editor = caller(2, Role::Editor);
        assert!(editor.can_read(&page(PostStatus::Draft, 1)));
        assert!(editor.can_edit(&page(PostStatus::Publish, 1)));
        assert!(editor.can_delete(&page(PostStatus::Private, 1)));
    }

    #[test]
    fn author_role_cannot_touch_pages_even_own() {
        let author = caller(3, Role::Author);
        let own = page(PostStatus::Draft, 3);
        assert!(!author.can_edit(&own));
        assert!(!author.can_delete(&own));
        assert!(!author.can_read(&own));
    }
}
