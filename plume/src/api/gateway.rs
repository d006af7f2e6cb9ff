use async_trait::async_trait;
use plume_types::*;

use super::ApiResult;

/// Network boundary the post store depends on.
///
/// Implementations own the wire format and any timeout policy; the store
/// only sees typed results.
#[async_trait]
pub trait PostGateway: Send + Sync {
    /// Fetch one page of the feed, optionally scoped to a single author
    async fn fetch_page(&self, page: u32, scope_user_id: Option<UserId>) -> ApiResult<PostPage>;

    async fn fetch_post(&self, id: PostId) -> ApiResult<Post>;

    /// The viewer's current reaction on a post, if any
    async fn fetch_user_reaction(&self, post_id: PostId) -> ApiResult<Option<ReactionType>>;

    async fn create(&self, draft: PostDraft) -> ApiResult<Post>;

    async fn update(&self, id: PostId, patch: PostPatch) -> ApiResult<PostFields>;

    async fn delete(&self, id: PostId) -> ApiResult<()>;

    async fn toggle_reaction(&self, id: PostId, reaction: ReactionType) -> ApiResult<ReactionOutcome>;

    async fn add_comment(
        &self,
        post_id: PostId,
        content: String,
        parent_comment_id: Option<CommentId>,
    ) -> ApiResult<Comment>;

    async fn delete_comment(&self, post_id: PostId, comment_id: CommentId) -> ApiResult<()>;

    async fn search(&self, query: &str, page: u32) -> ApiResult<PostPage>;
}
