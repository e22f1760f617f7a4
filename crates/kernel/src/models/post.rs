//! Post records and write inputs.
//!
//! The store keeps posts of several types side by side; the page controller
//! only exposes records whose `post_type` is [`PAGE_TYPE`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post type served by the page controller.
pub const PAGE_TYPE: &str = "page";

/// Publication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Publish,
    Future,
    Draft,
    Pending,
    Private,
    Trash,
}

impl PostStatus {
    /// Statuses a client may set through a write.
    pub const WRITABLE: [PostStatus; 5] = [
        PostStatus::Publish,
        PostStatus::Future,
        PostStatus::Draft,
        PostStatus::Pending,
        PostStatus::Private,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Future => "future",
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Private => "private",
            Self::Trash => "trash",
        }
    }

    /// Visible to anonymous readers.
    pub fn is_public(self) -> bool {
        self == Self::Publish
    }

    /// Setting this status makes the page visible beyond its editors.
    pub fn needs_publish_capability(self) -> bool {
        matches!(self, Self::Publish | Self::Future | Self::Private)
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publish" => Ok(Self::Publish),
            "future" => Ok(Self::Future),
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "private" => Ok(Self::Private),
            "trash" => Ok(Self::Trash),
            other => Err(format!("unknown post status '{other}'")),
        }
    }
}

/// Comment and ping switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscussionStatus {
    Open,
    Closed,
}

impl DiscussionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for DiscussionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown discussion status '{other}'")),
        }
    }
}

/// Stored post record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Server-assigned identifier.
    pub id: i64,

    /// Content type machine name (`page`, `post`, ...).
    pub post_type: String,

    pub title: String,
    pub content: String,
    pub excerpt: String,

    /// URL segment, unique among siblings.
    pub slug: String,

    pub status: PostStatus,

    /// Parent page id (0 = top level).
    pub parent: i64,

    /// Position among siblings.
    pub menu_order: i64,

    /// Theme template file name (empty = theme default).
    pub template: String,

    /// Author user id.
    pub author: i64,

    pub date_gmt: DateTime<Utc>,
    pub modified_gmt: DateTime<Utc>,

    pub comment_status: DiscussionStatus,
    pub ping_status: DiscussionStatus,

    /// Empty when the post is not password protected.
    pub password: String,

    /// Attachment id of the featured image (0 = none).
    pub featured_image: i64,
}

impl Post {
    pub fn is_page(&self) -> bool {
        self.post_type == PAGE_TYPE
    }

    pub fn is_protected(&self) -> bool {
        !self.password.is_empty()
    }
}

/// Post record before the store assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub post_type: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub slug: String,
    pub status: PostStatus,
    pub parent: i64,
    pub menu_order: i64,
    pub template: String,
    pub author: i64,
    pub date_gmt: DateTime<Utc>,
    pub modified_gmt: DateTime<Utc>,
    pub comment_status: DiscussionStatus,
    pub ping_status: DiscussionStatus,
    pub password: String,
    pub featured_image: i64,
}

impl NewPost {
    /// A draft of the given type with every optional field empty.
    pub fn new(post_type: &str, title: &str) -> Self {
        let now = Utc::now();
        Self {
            post_type: post_type.to_string(),
            title: title.to_string(),
            content: String::new(),
            excerpt: String::new(),
            slug: String::new(),
            status: PostStatus::Draft,
            parent: 0,
            menu_order: 0,
            template: String::new(),
            author: 0,
            date_gmt: now,
            modified_gmt: now,
            comment_status: DiscussionStatus::Closed,
            ping_status: DiscussionStatus::Closed,
            password: String::new(),
            featured_image: 0,
        }
    }

    /// A draft page.
    pub fn page(title: &str) -> Self {
        Self::new(PAGE_TYPE, title)
    }

    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_parent(mut self, parent: i64) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_slug(mut self, slug: &str) -> Self {
        self.slug = slug.to_string();
        self
    }

    pub fn with_menu_order(mut self, menu_order: i64) -> Self {
        self.menu_order = menu_order;
        self
    }

    pub fn with_author(mut self, author: i64) -> Self {
        self.author = author;
        self
    }

    /// Attach the id the store assigned.
    pub fn into_post(self, id: i64) -> Post {
        Post {
            id,
            post_type: self.post_type,
            title: self.title,
            content: self.content,
            excerpt: self.excerpt,
            slug: self.slug,
            status: self.status,
            parent: self.parent,
            menu_order: self.menu_order,
            template: self.template,
            author: self.author,
            date_gmt: self.date_gmt,
            modified_gmt: self.modified_gmt,
            comment_status: self.comment_status,
            ping_status: self.ping_status,
            password: self.password,
            featured_image: self.featured_image,
        }
    }
}

/// Rich text write value: either a bare string or `{"raw": "..."}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RichTextInput {
    Plain(String),
    Raw { raw: String },
}

impl RichTextInput {
    pub fn into_raw(self) -> String {
        match self {
            Self::Plain(raw) | Self::Raw { raw } => raw,
        }
    }
}

/// Page write request after schema validation.
///
/// Every field is optional: `None` means "not sent", so `menu_order: Some(0)`
/// is a real change and never collapses into "unchanged".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PageInput {
    pub title: Option<RichTextInput>,
    pub content: Option<RichTextInput>,
    pub excerpt: Option<RichTextInput>,
    pub slug: Option<String>,
    pub status: Option<PostStatus>,
    pub parent: Option<i64>,
    pub menu_order: Option<i64>,
    pub template: Option<String>,
    pub author: Option<i64>,
    pub date: Option<String>,
    pub date_gmt: Option<String>,
    pub comment_status: Option<DiscussionStatus>,
    pub ping_status: Option<DiscussionStatus>,
    pub password: Option<String>,
    pub featured_image: Option<i64>,
}
