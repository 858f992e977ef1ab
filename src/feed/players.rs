use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use super::models::AudioPost;
use crate::audio::MediaProvider;
use crate::config::PlaybackConfig;
use crate::session::PlaybackSession;

/// Playback sessions for the posts currently on screen, one per post
pub struct FeedPlayers {
    provider: Arc<dyn MediaProvider>,
    config: PlaybackConfig,
    sessions: HashMap<String, PlaybackSession>,
}

impl FeedPlayers {
    pub fn new(provider: Arc<dyn MediaProvider>, config: PlaybackConfig) -> Self {
        Self {
            provider,
            config,
            sessions: HashMap::new(),
        }
    }

    /// Session for `post`, created on first use. Nothing is loaded until it plays.
    pub fn player(&mut self, post: &AudioPost) -> PlaybackSession {
        self.sessions
            .entry(post.id.clone())
            .or_insert_with(|| {
                debug!("Creating player for post {}", post.id);
                PlaybackSession::new(
                    post.audio_uri.clone(),
                    post.duration_seconds,
                    Arc::clone(&self.provider),
                    self.config.clone(),
                )
            })
            .clone()
    }

    pub fn get(&self, post_id: &str) -> Option<&PlaybackSession> {
        self.sessions.get(post_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Dispose players for posts no longer visible; returns how many were dropped
    pub fn retain_visible<'a>(&mut self, visible: impl IntoIterator<Item = &'a str>) -> usize {
        let visible: HashSet<&str> = visible.into_iter().collect();
        let before = self.sessions.len();

        self.sessions.retain(|post_id, session| {
            let keep = visible.contains(post_id.as_str());
            if !keep {
                session.dispose();
            }
            keep
        });

        before - self.sessions.len()
    }

    pub fn dispose_all(&mut self) {
        for (_, session) in self.sessions.drain() {
            session.dispose();
        }
    }
}

impl Drop for FeedPlayers {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
