use std::fmt;

use im::Vector;
use plume_types::{PaginationCursor, Post, PostId};

/// Modal-style flows that target the selected post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalKind {
    Create,
    Edit,
    Delete,
    Comments,
    Reactions,
}

impl ModalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModalKind::Create => "create",
            ModalKind::Edit => "edit",
            ModalKind::Delete => "delete",
            ModalKind::Comments => "comments",
            ModalKind::Reactions => "reactions",
        }
    }

    /// Every kind except Create acts on an existing post
    pub fn needs_post(&self) -> bool {
        !matches!(self, ModalKind::Create)
    }
}

impl fmt::Display for ModalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tuning for the post store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Look up the viewer's reaction for every post of a fetched page
    pub decorate_reactions: bool,
    /// Gateway calls a single intent may have in flight at once
    pub request_concurrency: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            decorate_reactions: true,
            request_concurrency: 8,
        }
    }
}

/// Everything a subscriber can observe about the feed.
///
/// Published as a whole value after every change. Cloning is cheap: the post
/// list and comment forests are persistent vectors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedSnapshot {
    pub posts: Vector<Post>,
    pub loading: bool,
    pub error: Option<String>,
    /// None until the first page has been applied
    pub cursor: Option<PaginationCursor>,
    pub selected_post: Option<Post>,
    pub open_modal: Option<ModalKind>,
}

impl FeedSnapshot {
    pub fn has_more(&self) -> bool {
        self.cursor.map_or(true, |cursor| cursor.has_more)
    }

    /// Page of the most recently applied response
    pub fn page(&self) -> Option<u32> {
        self.cursor.map(|cursor| cursor.page)
    }

    /// Page the next `load_more_posts` call will request
    pub fn next_page(&self) -> u32 {
        self.cursor.map_or(0, |cursor| cursor.page + 1)
    }

    pub fn post(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    pub(crate) fn position(&self, id: PostId) -> Option<usize> {
        self.posts.iter().position(|post| post.id == id)
    }

    pub fn post_ids(&self) -> Vec<PostId> {
        self.posts.iter().map(|post| post.id).collect()
    }

    /// The selection never shows a different value than its list entry
    pub fn selection_is_consistent(&self) -> bool {
        match &self.selected_post {
            Some(selected) => self.post(selected.id).map_or(true, |post| post == selected),
            None => true,
        }
    }
}
