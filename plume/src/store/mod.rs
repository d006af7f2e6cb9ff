mod pagination;
mod selection;
mod state;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::stream::{self, StreamExt};
use plume_types::*;
use thiserror::Error;
use tokio::sync::watch;

use crate::api::{ApiError, PostGateway};
use crate::forest::{self, ForestEdit};
use crate::logging::LogConfig;
use crate::reaction::{self, ReactionSequencer};

pub use pagination::{merge_page, replace_with_page};
pub use state::{FeedSnapshot, ModalKind, StoreOptions};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Cannot open the {requested} modal while the {open} modal is open")]
    ModalConflict { open: ModalKind, requested: ModalKind },

    #[error("The {0} modal needs a post to act on")]
    SelectionRequired(ModalKind),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Single-writer state engine for posts, comments and reactions.
///
/// Construct once, share behind an `Arc`, and hand to every consumer that
/// needs the feed. Consumers read through [`PostStore::subscribe`] or
/// [`PostStore::snapshot`] and change state only through the intent methods.
/// List changes land only after the gateway confirms them, each as one whole
/// snapshot replacement.
pub struct PostStore {
    gateway: Arc<dyn PostGateway>,
    viewer: Viewer,
    options: StoreOptions,
    log_config: LogConfig,
    state: watch::Sender<FeedSnapshot>,
    reactions: ReactionSequencer,
    /// Bumped by every page load; only the newest load may apply its result
    generation: AtomicU64,
    /// Author scope of the last reset, reused when paging further
    scope: Mutex<Option<UserId>>,
}

impl PostStore {
    pub fn new(gateway: Arc<dyn PostGateway>, viewer: Viewer) -> Self {
        let (state, _) = watch::channel(FeedSnapshot::default());
        Self {
            gateway,
            viewer,
            options: StoreOptions::default(),
            log_config: LogConfig::disabled(),
            state,
            reactions: ReactionSequencer::new(),
            generation: AtomicU64::new(0),
            scope: Mutex::new(None),
        }
    }

    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Receive every snapshot published from now on
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.state.borrow().clone()
    }

    // Feed loading

    /// Load the first page, optionally scoped to one author
    pub async fn load_posts(&self, scope_user_id: Option<UserId>) {
        self.load_page(0, true, scope_user_id).await
    }

    pub async fn refresh_posts(&self) {
        let scope = *self.scope();
        self.load_page(0, true, scope).await
    }

    /// Fetch the next page unless one is already loading or the feed is done
    pub async fn load_more_posts(&self) {
        let mut next_page = None;
        self.state.send_if_modified(|snapshot| {
            if snapshot.loading || !snapshot.has_more() {
                return false;
            }
            snapshot.loading = true;
            snapshot.error = None;
            next_page = Some(snapshot.next_page());
            true
        });

        let Some(page) = next_page else {
            log_pagination!(self.log_config, "load_more_posts skipped: busy or at end of feed");
            return;
        };
        let generation = self.next_generation();
        let scope = *self.scope();
        self.fetch_and_apply(page, false, scope, generation).await
    }

    /// Fetch one page and either replace the list (`reset`) or merge it in.
    ///
    /// A fetch failure is reported through the snapshot's `error`; a failed
    /// reaction lookup only leaves that one post undecorated.
    pub async fn load_page(&self, page: u32, reset: bool, scope_user_id: Option<UserId>) {
        let generation = self.next_generation();
        if reset {
            *self.scope() = scope_user_id;
        }
        self.state.send_modify(|snapshot| {
            snapshot.loading = true;
            snapshot.error = None;
        });
        self.fetch_and_apply(page, reset, scope_user_id, generation)
            .await
    }

    async fn fetch_and_apply(
        &self,
        page: u32,
        reset: bool,
        scope_user_id: Option<UserId>,
        generation: u64,
    ) {
        log_api_call!(
            self.log_config,
            "fetch_page page={} reset={} scope={:?}",
            page,
            reset,
            scope_user_id
        );

        let result = self.gateway.fetch_page(page, scope_user_id).await;
        let result = match result {
            Ok(fetched) => {
                let posts = self.decorate_page(fetched.posts).await;
                Ok((posts, fetched.has_more))
            }
            Err(e) => Err(e),
        };

        if !self.is_current(generation) {
            log_pagination!(
                self.log_config,
                "Discarding stale result for page {} (generation {})",
                page,
                generation
            );
            return;
        }

        match result {
            Ok((posts, has_more)) => {
                let received = posts.len();
                self.state.send_modify(|snapshot| {
                    snapshot.posts = if reset {
                        replace_with_page(posts)
                    } else {
                        merge_page(&snapshot.posts, posts)
                    };
                    snapshot.cursor = Some(PaginationCursor { page, has_more });
                    snapshot.loading = false;
                    selection::resync_from_list(snapshot);
                });
                log_pagination!(
                    self.log_config,
                    "Applied page {}: received={} has_more={}",
                    page,
                    received,
                    has_more
                );
            }
            Err(e) => {
                log::warn!("Failed to load page {}: {}", page, e);
                let message = categorize_error(&e);
                self.state.send_modify(|snapshot| {
                    snapshot.loading = false;
                    snapshot.error = Some(message);
                });
            }
        }
    }

    /// Fan out one reaction lookup per post, order preserved.
    async fn decorate_page(&self, posts: Vec<Post>) -> Vec<Post> {
        if !self.options.decorate_reactions || posts.is_empty() {
            return posts;
        }

        let gateway = &self.gateway;
        stream::iter(posts)
            .map(|post| async move {
                match gateway.fetch_user_reaction(post.id).await {
                    Ok(current) => reaction::decorate(&post, current),
                    Err(e) => {
                        log::warn!("Failed to load reaction status for post {}: {}", post.id, e);
                        post
                    }
                }
            })
            .buffered(self.options.request_concurrency.max(1))
            .collect()
            .await
    }

    // Post mutations

    /// Create a post and put the server's copy at the head of the list
    pub async fn create_post(&self, draft: PostDraft) -> StoreResult<Post> {
        log_api_call!(self.log_config, "create_post");
        let created = self.gateway.create(draft).await.map_err(|e| {
            log::warn!("Failed to create post: {}", e);
            e
        })?;

        let post = self.stamp_new_post(created);
        self.state.send_modify(|snapshot| {
            snapshot.posts.retain(|existing| existing.id != post.id);
            snapshot.posts.push_front(post.clone());
        });
        Ok(post)
    }

    /// Update a post the viewer owns and merge the server's fields locally.
    ///
    /// Returns the merged post, or None when neither the list nor the
    /// selection holds it; the server still applies the update in that case.
    pub async fn update_post(&self, id: PostId, patch: PostPatch) -> StoreResult<Option<Post>> {
        log_api_call!(self.log_config, "update_post id={}", id);
        let fields = self.gateway.update(id, patch).await.map_err(|e| {
            log::warn!("Failed to update post {}: {}", id, e);
            e
        })?;

        let viewer = self.viewer.summary();
        let updated = self.replace_post(id, |post| {
            let mut merged = post.merged_with(fields);
            merged.author = viewer;
            merged.is_owner = true;
            merged
        });
        if updated.is_none() {
            log_debug!(self.log_config, "Updated post {} is not loaded locally", id);
        }
        Ok(updated)
    }

    pub async fn delete_post(&self, id: PostId) -> StoreResult<()> {
        log_api_call!(self.log_config, "delete_post id={}", id);
        self.gateway.delete(id).await.map_err(|e| {
            log::warn!("Failed to delete post {}: {}", id, e);
            e
        })?;

        self.state.send_modify(|snapshot| {
            snapshot.posts.retain(|post| post.id != id);
            if selection::clear_if_targets(snapshot, id) {
                log_selection!(self.log_config, "Selection cleared: post {} deleted", id);
            }
        });
        Ok(())
    }

    // Reactions

    pub async fn like(&self, id: PostId) {
        self.toggle_reaction(id, ReactionType::Like).await
    }

    /// Toggle the viewer's reaction on a post, best effort.
    ///
    /// Toggles on the same post run one at a time in issue order, each applied
    /// against the state left by the one before. Failures are logged and the
    /// post keeps its prior counts.
    pub async fn toggle_reaction(&self, id: PostId, reaction_type: ReactionType) {
        if self.reactions.is_busy(id) {
            log_reaction!(self.log_config, "Toggle on post {} queued behind an earlier one", id);
        }
        let _ticket = self.reactions.acquire(id).await;

        log_reaction!(self.log_config, "toggle_reaction id={} type={}", id, reaction_type.as_str());
        match self.gateway.toggle_reaction(id, reaction_type).await {
            Ok(outcome) => {
                let applied = self.replace_post(id, |post| reaction::apply_outcome(post, outcome));
                match applied {
                    Some(post) => log_reaction!(
                        self.log_config,
                        "Post {} now liked={} likes_count={}",
                        id,
                        post.liked,
                        post.likes_count
                    ),
                    None => log_reaction!(
                        self.log_config,
                        "Toggle resolved for post {} which is no longer loaded",
                        id
                    ),
                }
            }
            Err(e) => {
                log::warn!("Reaction toggle on post {} failed: {}", id, e);
            }
        }
    }

    // Comments

    /// Add a comment, or a reply when `parent_comment_id` is given
    pub async fn add_comment(
        &self,
        post_id: PostId,
        content: impl Into<String>,
        parent_comment_id: Option<CommentId>,
    ) -> StoreResult<Comment> {
        log_api_call!(
            self.log_config,
            "add_comment post={} parent={:?}",
            post_id,
            parent_comment_id
        );
        let created = self
            .gateway
            .add_comment(post_id, content.into(), parent_comment_id)
            .await
            .map_err(|e| {
                log::warn!("Failed to add comment to post {}: {}", post_id, e);
                e
            })?;

        let mut comment = created;
        comment.author = self.viewer.summary();
        comment.is_owner = true;
        comment.parent_comment_id = parent_comment_id;

        let updated = self.replace_post(post_id, |post| {
            if let Some(parent_id) = parent_comment_id {
                if !forest::contains(&post.comments, parent_id) {
                    log::warn!(
                        "Parent comment {} is not loaded on post {}; reply kept server-side only",
                        parent_id,
                        post_id
                    );
                }
            }
            let mut next = post.clone();
            next.comments = forest::insert_reply(&post.comments, parent_comment_id, comment.clone());
            debug_assert!(forest::is_well_formed(&next.comments));
            next.comments_count = post.comments_count.saturating_add(1);
            next
        });
        if updated.is_none() {
            log_debug!(self.log_config, "Comment added to unloaded post {}", post_id);
        }
        Ok(comment)
    }

    pub async fn delete_comment(&self, post_id: PostId, comment_id: CommentId) -> StoreResult<()> {
        log_api_call!(
            self.log_config,
            "delete_comment post={} comment={}",
            post_id,
            comment_id
        );
        self.gateway
            .delete_comment(post_id, comment_id)
            .await
            .map_err(|e| {
                log::warn!("Failed to delete comment {} on post {}: {}", comment_id, post_id, e);
                e
            })?;

        self.replace_post(post_id, |post| {
            let mut next = post.clone();
            next.comments = forest::remove_node(&post.comments, comment_id);
            next.comments_count = post.comments_count.saturating_sub(1);
            next
        });
        Ok(())
    }

    /// Delete several comments on one post.
    ///
    /// The deletes run concurrently and every one the server confirms is
    /// removed in a single pass over the forest. Returns how many were
    /// removed, or the first failure once the confirmed removals are applied.
    pub async fn delete_comments(
        &self,
        post_id: PostId,
        comment_ids: &[CommentId],
    ) -> StoreResult<usize> {
        log_api_call!(
            self.log_config,
            "delete_comments post={} count={}",
            post_id,
            comment_ids.len()
        );
        let gateway = &self.gateway;
        let results: Vec<_> = stream::iter(comment_ids.iter().copied())
            .map(|comment_id| async move {
                (comment_id, gateway.delete_comment(post_id, comment_id).await)
            })
            .buffered(self.options.request_concurrency.max(1))
            .collect()
            .await;

        let mut edits = Vec::new();
        let mut first_error = None;
        for (comment_id, result) in results {
            match result {
                Ok(()) => edits.push(ForestEdit::Remove(comment_id)),
                Err(e) => {
                    log::warn!("Failed to delete comment {} on post {}: {}", comment_id, post_id, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        let removed = edits.len();
        if removed > 0 {
            let delta = u32::try_from(removed).unwrap_or(u32::MAX);
            self.replace_post(post_id, |post| {
                let mut next = post.clone();
                next.comments = forest::apply_edits(&post.comments, edits);
                next.comments_count = post.comments_count.saturating_sub(delta);
                next
            });
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(removed),
        }
    }

    // Queries, passed through without touching the list

    pub async fn get_post_by_id(&self, id: PostId) -> StoreResult<Post> {
        log_api_call!(self.log_config, "get_post_by_id id={}", id);
        Ok(self.gateway.fetch_post(id).await?)
    }

    pub async fn search_posts(&self, query: &str, page: u32) -> StoreResult<PostPage> {
        log_api_call!(self.log_config, "search_posts query={:?} page={}", query, page);
        Ok(self.gateway.search(query, page).await?)
    }

    // Modal selection

    pub fn open_modal(&self, kind: ModalKind, post: Option<Post>) -> StoreResult<()> {
        let mut result = Ok(());
        self.state.send_if_modified(|snapshot| {
            result = selection::open(snapshot, kind, post);
            result.is_ok()
        });
        match &result {
            Ok(()) => log_selection!(self.log_config, "Opened {} modal", kind),
            Err(e) => log_selection!(self.log_config, "Refused to open modal: {}", e),
        }
        result
    }

    /// Close `kind` if it is the open modal; returns whether anything changed
    pub fn close_modal(&self, kind: ModalKind) -> bool {
        let closed = self
            .state
            .send_if_modified(|snapshot| selection::close(snapshot, kind));
        if closed {
            log_selection!(self.log_config, "Closed {} modal", kind);
        }
        closed
    }

    // Internals

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn scope(&self) -> std::sync::MutexGuard<'_, Option<UserId>> {
        self.scope.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the post with `id` by `f(post)` and keep the selection in step.
    ///
    /// Falls back to the selection alone when the post is not in the list.
    /// Returns the new value, or None if neither holds the post.
    fn replace_post<F>(&self, id: PostId, f: F) -> Option<Post>
    where
        F: FnOnce(&Post) -> Post,
    {
        let mut replaced = None;
        self.state.send_if_modified(|snapshot| {
            let next = match snapshot.position(id) {
                Some(index) => {
                    let next = f(&snapshot.posts[index]);
                    snapshot.posts.set(index, next.clone());
                    next
                }
                None => match snapshot.selected_post.as_ref().filter(|post| post.id == id) {
                    Some(selected) => f(selected),
                    None => return false,
                },
            };
            selection::sync_entry(snapshot, &next);
            replaced = Some(next);
            true
        });
        replaced
    }

    fn stamp_new_post(&self, mut post: Post) -> Post {
        post.author = self.viewer.summary();
        post.is_owner = true;
        post.likes_count = 0;
        post.comments_count = 0;
        post.liked = false;
        post.current_reaction = None;
        post.comments = Forest::new();
        post
    }
}

/// Turn a fetch failure into a message fit for the feed's error banner
pub fn categorize_error(error: &ApiError) -> String {
    match error {
        ApiError::Network(e) if e.is_timeout() || e.is_connect() => {
            "Network Error: Connection failed. Check your network and try again".to_string()
        }
        ApiError::Unauthorized(_) => {
            "Authorization Error: Session expired or insufficient permissions. Please log in again"
                .to_string()
        }
        ApiError::BadRequest(msg) => format!("Validation Error: {}", msg),
        ApiError::NotFound(msg) => format!("Not Found: {}", msg),
        other => {
            let error_str = other.to_string();
            let error_lower = error_str.to_lowercase();

            if error_lower.contains("connection")
                || error_lower.contains("timeout")
                || error_lower.contains("network")
            {
                return "Network Error: Connection failed. Check your network and try again"
                    .to_string();
            }

            if error_lower.contains("500")
                || error_lower.contains("502")
                || error_lower.contains("503")
            {
                return "Server Error: The server is experiencing issues. Please try again later"
                    .to_string();
            }

            format!("Error: {}", error_str)
        }
    }
}
