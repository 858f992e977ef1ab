// Hardcoded feed content
//
// There is no backend; the feed and profile screens are populated from this
// fixed catalog.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;

use super::models::{AudioPost, Profile, User};
use crate::audio::{AudioUri, SimulatedMediaProvider};

pub fn mock_user() -> User {
    User {
        id: "user1".to_string(),
        username: "alice".to_string(),
        display_name: "Alice Wonder".to_string(),
        avatar_uri: None,
        followers: 234,
        following: 156,
    }
}

/// Feed posts, newest first, timestamped relative to `now`
pub fn mock_posts(now: DateTime<Utc>) -> Vec<AudioPost> {
    vec![
        AudioPost {
            id: "1".to_string(),
            user_id: "user1".to_string(),
            username: "alice".to_string(),
            audio_uri: AudioUri::new("https://example.com/audio1.mp3"),
            duration_seconds: 45.0,
            caption: Some("Just thinking out loud about AI and the future 🤔".to_string()),
            created_at: now,
            likes: 12,
            comments: Vec::new(),
        },
        AudioPost {
            id: "2".to_string(),
            user_id: "user2".to_string(),
            username: "bob".to_string(),
            audio_uri: AudioUri::new("https://example.com/audio2.mp3"),
            duration_seconds: 30.0,
            caption: Some("Morning coffee thoughts ☕".to_string()),
            created_at: now - ChronoDuration::hours(1),
            likes: 8,
            comments: Vec::new(),
        },
    ]
}

pub fn mock_user_posts(now: DateTime<Utc>) -> Vec<AudioPost> {
    let user = mock_user();
    mock_posts(now)
        .into_iter()
        .filter(|post| post.user_id == user.id)
        .collect()
}

/// Profile for `user_id`, if the catalog knows that user
pub fn profile(user_id: &str, now: DateTime<Utc>) -> Option<Profile> {
    let user = mock_user();
    if user.id != user_id {
        return None;
    }
    Some(Profile {
        user,
        posts: mock_user_posts(now),
    })
}

/// Simulated media provider that can play every post in `posts`
pub fn simulated_provider(posts: &[AudioPost], interval: Duration) -> SimulatedMediaProvider {
    posts
        .iter()
        .fold(SimulatedMediaProvider::new(interval), |provider, post| {
            provider.with_track(post.audio_uri.clone(), post.duration_seconds)
        })
}
