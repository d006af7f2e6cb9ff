use chrono::{DateTime, Utc};
use im::Vector;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{ReactionType, Visibility};

pub type PostId = Uuid;
pub type CommentId = Uuid;
pub type UserId = Uuid;

/// Ordered collection of root-level comment trees for one post
pub type Forest = Vector<Comment>;

// Custom serde module for DateTime to ensure RFC3339 string format
mod datetime_format {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<DateTime<Utc>>().map_err(serde::de::Error::custom)
    }
}

mod optional_datetime_format {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_some(&date.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| s.parse::<DateTime<Utc>>().map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Display-level summary of a user, embedded in posts and comments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    #[serde(default)]
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: UserSummary,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub media: Vec<MediaRef>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes_count: u32,
    #[serde(default)]
    pub comments_count: u32,
    /// Whether the viewer currently reacts to this post
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub current_reaction: Option<ReactionType>,
    /// Loaded subset of the discussion, not necessarily complete
    #[serde(default)]
    pub comments: Forest,
    /// Whether the viewer authored this post
    #[serde(default)]
    pub is_owner: bool,
}

impl Post {
    /// Shallow-merge server-returned fields over this post.
    ///
    /// Fields the server left out keep their prior value.
    pub fn merged_with(&self, fields: PostFields) -> Post {
        Post {
            id: self.id,
            author: fields.author.unwrap_or_else(|| self.author.clone()),
            content: fields.content.or_else(|| self.content.clone()),
            media: fields.media.unwrap_or_else(|| self.media.clone()),
            visibility: fields.visibility.unwrap_or(self.visibility),
            created_at: fields.created_at.unwrap_or(self.created_at),
            likes_count: fields.likes_count.unwrap_or(self.likes_count),
            comments_count: fields.comments_count.unwrap_or(self.comments_count),
            liked: fields.liked.unwrap_or(self.liked),
            current_reaction: fields.current_reaction.or(self.current_reaction),
            comments: fields.comments.unwrap_or_else(|| self.comments.clone()),
            is_owner: self.is_owner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    /// None for root-level comments
    #[serde(default)]
    pub parent_comment_id: Option<CommentId>,
    pub author: UserSummary,
    pub content: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Forest,
    #[serde(default)]
    pub is_owner: bool,
}

/// Pagination cursor over the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationCursor {
    pub page: u32,
    pub has_more: bool,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self {
            page: 0,
            has_more: true,
        }
    }
}

// Request/Response types for the gateway

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostDraft {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub media: Vec<MediaRef>,
    #[serde(default)]
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<MediaRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

/// Partial post returned by an update; absent fields were not sent back
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostFields {
    #[serde(default)]
    pub author: Option<UserSummary>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub media: Option<Vec<MediaRef>>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default, with = "optional_datetime_format")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub likes_count: Option<u32>,
    #[serde(default)]
    pub comments_count: Option<u32>,
    #[serde(default)]
    pub liked: Option<bool>,
    #[serde(default)]
    pub current_reaction: Option<ReactionType>,
    #[serde(default)]
    pub comments: Option<Forest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionOutcome {
    pub reacted: bool,
    pub reaction_type: ReactionType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ToggleReactionRequest {
    pub reaction_type: ReactionType,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserReactionResponse {
    pub reaction_type: Option<ReactionType>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddCommentRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<CommentId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post() -> Post {
        Post {
            id: Uuid::from_u128(5),
            author: UserSummary {
                id: Uuid::from_u128(100),
                display_name: "ada".to_string(),
                avatar_url: None,
            },
            content: Some("a".to_string()),
            media: vec![],
            visibility: Visibility::Friends,
            created_at: Utc::now(),
            likes_count: 3,
            comments_count: 1,
            liked: true,
            current_reaction: Some(ReactionType::Love),
            comments: Vector::new(),
            is_owner: true,
        }
    }

    #[test]
    fn test_merge_replaces_only_returned_fields() {
        let post = sample_post();
        let merged = post.merged_with(PostFields {
            content: Some("b".to_string()),
            ..Default::default()
        });

        assert_eq!(merged.content.as_deref(), Some("b"));
        assert_eq!(merged.visibility, Visibility::Friends);
        assert_eq!(merged.likes_count, 3);
        assert_eq!(merged.current_reaction, Some(ReactionType::Love));
        assert_eq!(merged.id, post.id);
    }

    #[test]
    fn test_post_deserializes_with_missing_engagement_fields() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000001",
            "author": {"id": "00000000-0000-0000-0000-000000000002", "display_name": "bo"},
            "created_at": "2024-01-01T00:00:00+00:00"
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();

        assert_eq!(post.likes_count, 0);
        assert!(post.comments.is_empty());
        assert_eq!(post.visibility, Visibility::Public);
        assert!(!post.is_owner);
    }

    #[test]
    fn test_patch_omits_unset_fields_on_the_wire() {
        let patch = PostPatch {
            content: Some("edited".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();

        assert_eq!(json, serde_json::json!({ "content": "edited" }));
    }
}
