use serde::{Deserialize, Serialize};

use crate::models::{UserId, UserSummary};

/// The locally known acting user.
///
/// Used to stamp authorship onto content the viewer creates, saving a round
/// trip for data the client already holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewer {
    pub id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Viewer {
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            avatar_url: None,
        }
    }

    pub fn with_avatar(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }

    /// Author summary as it appears on the viewer's own posts and comments
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }

    pub fn is_author(&self, author: &UserSummary) -> bool {
        author.id == self.id
    }
}
