//! Content records.

pub mod post;

pub use post::{
    DiscussionStatus, NewPost, PAGE_TYPE, PageInput, Post, PostStatus, RichTextInput,
};
