use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audio::AudioUri;
use crate::session::{format_clock_f64, PostDraft};

/// A voice reply attached to a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioComment {
    /// Unique comment id
    pub id: String,
    /// Post the comment replies to
    pub post_id: String,
    /// Author's user id
    pub user_id: String,
    /// Author's username, without the `@`
    pub username: String,
    /// Recorded reply
    pub audio_uri: AudioUri,
    /// Length in seconds
    pub duration_seconds: f64,
    /// When the comment was posted
    pub created_at: DateTime<Utc>,
}

/// A short audio post in the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioPost {
    /// Unique post id
    pub id: String,
    /// Author's user id
    pub user_id: String,
    /// Author's username, without the `@`
    pub username: String,
    /// Audio played by the post's player
    pub audio_uri: AudioUri,

    /// Length in seconds as published with the post
    pub duration_seconds: f64,

    /// Text shown under the player
    pub caption: Option<String>,
    /// When the post was published
    pub created_at: DateTime<Utc>,
    /// Number of likes
    pub likes: u32,

    /// Oldest first
    pub comments: Vec<AudioComment>,
}

impl AudioPost {
    /// Build a post from a finished recording
    pub fn from_draft(draft: PostDraft, author: &User, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: author.id.clone(),
            username: author.username.clone(),
            audio_uri: draft.audio_uri,
            duration_seconds: draft.duration_seconds as f64,
            caption: draft.caption,
            created_at,
            likes: 0,
            comments: Vec::new(),
        }
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    /// Calendar date the post was created, e.g. `2025-10-28`
    pub fn created_label(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }

    pub fn duration_label(&self) -> String {
        format_clock_f64(self.duration_seconds)
    }

    pub fn handle(&self) -> String {
        format!("@{}", self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user id
    pub id: String,
    /// Handle, without the `@`
    pub username: String,
    /// Name shown on the profile
    pub display_name: String,
    /// Avatar image; the initial is shown when missing
    pub avatar_uri: Option<String>,
    /// Number of followers
    pub followers: u32,
    /// Number of accounts followed
    pub following: u32,
}

impl User {
    /// Letter shown in place of a missing avatar
    pub fn initial(&self) -> char {
        self.display_name
            .chars()
            .next()
            .or_else(|| self.username.chars().next())
            .unwrap_or('?')
    }
}

/// A user together with their posts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile owner
    pub user: User,
    /// The owner's posts, newest first
    pub posts: Vec<AudioPost>,
}

impl Profile {
    pub fn post_count(&self) -> usize {
        self.posts.len()
    }
}
