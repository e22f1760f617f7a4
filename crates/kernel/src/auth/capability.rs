//! Roles and the page capabilities they grant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named permission checked against the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Read,
    EditPages,
    EditOthersPages,
    EditPublishedPages,
    EditPrivatePages,
    PublishPages,
    DeletePages,
    DeleteOthersPages,
    DeletePublishedPages,
    DeletePrivatePages,
    ReadPrivatePages,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::EditPages => "edit_pages",
            Self::EditOthersPages => "edit_others_pages",
            Self::EditPublishedPages => "edit_published_pages",
            Self::EditPrivatePages => "edit_private_pages",
            Self::PublishPages => "publish_pages",
            Self::DeletePages => "delete_pages",
            Self::DeleteOthersPages => "delete_others_pages",
            Self::DeletePublishedPages => "delete_published_pages",
            Self::DeletePrivatePages => "delete_private_pages",
            Self::ReadPrivatePages => "read_private_pages",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ALL_PAGE_CAPABILITIES: &[Capability] = &[
    Capability::Read,
    Capability::EditPages,
    Capability::EditOthersPages,
    Capability::EditPublishedPages,
    Capability::EditPrivatePages,
    Capability::PublishPages,
    Capability::DeletePages,
    Capability::DeleteOthersPages,
    Capability::DeletePublishedPages,
    Capability::DeletePrivatePages,
    Capability::ReadPrivatePages,
];

/// User role. Authors and contributors only write posts, so they hold no
/// page capabilities beyond `read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Editor,
    Author,
    Contributor,
    Subscriber,
}

impl Role {
    /// Capabilities granted by this role.
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Self::Administrator | Self::Editor => ALL_PAGE_CAPABILITIES,
            Self::Author | Self::Contributor | Self::Subscriber => &[Capability::Read],
        }
    }

    /// Check whether the role grants a capability.
    pub fn has(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Editor => "editor",
            Self::Author => "author",
            Self::Contributor => "contributor",
            Self::Subscriber => "subscriber",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrator" => Ok(Self::Administrator),
            "editor" => Ok(Self::Editor),
            "author" => Ok(Self::Author),
            "contributor" => Ok(Self::Contributor),
            "subscriber" => Ok(Self::Subscriber),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_holds_every_page_capability() {
        for cap in ALL_PAGE_CAPABILITIES {
            assert!(Role::Editor.has(*cap), "editor lacks {cap}");
        }
    }

    #[test]
    fn author_cannot_edit_pages() {
        assert!(Role::Author.has(Capability::Read));
        assert!(!Role::Author.has(Capability::EditPages));
        assert!(!Role::Author.has(Capability::PublishPages));
    }

    #[test]
    fn role_names_round_trip() {
        for role in [
            Role::Administrator,
            Role::Editor,
            Role::Author,
            Role::Contributor,
            Role::Subscriber,
        ] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("root".parse::<Role>().is_err());
    }
}
