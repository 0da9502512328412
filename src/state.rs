// src/state.rs
//! Analysis context bridging the analyze → generate → save → share requests.
//! Each browser session gets its own [`AnalysisState`], keyed by a signed session id.

use crate::ai::AiOutcome;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Sessions untouched for this long are evicted on the next write
pub const SESSION_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Raw upload kept around until the post is shared
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisState {
    pub profile_summary: Option<AiOutcome>,
    pub trend_insights: Option<AiOutcome>,
    pub image_analysis: Option<AiOutcome>,
    pub generated_post: Option<AiOutcome>,
    images: Vec<BufferedImage>,
}

impl AnalysisState {
    pub fn images(&self) -> &[BufferedImage] {
        &self.images
    }

    pub fn image_mime_types(&self) -> Vec<&str> {
        self.images.iter().map(|i| i.mime_type.as_str()).collect()
    }

    /// Replace the buffered images and their analysis together
    pub fn set_image_analysis(&mut self, analysis: AiOutcome, images: Vec<BufferedImage>) {
        self.image_analysis = Some(analysis);
        self.images = images;
    }
}

#[derive(Debug)]
struct SessionEntry {
    state: AnalysisState,
    last_seen: Instant,
}

impl SessionEntry {
    fn is_live(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.last_seen) < ttl
    }
}

/// Session id → analysis context
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Run `f` against a session's state; unknown or expired sessions read as empty
    pub async fn read<R>(&self, session_id: &str, f: impl FnOnce(&AnalysisState) -> R) -> R {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(entry) if entry.is_live(Instant::now(), self.ttl) => f(&entry.state),
            _ => f(&AnalysisState::default()),
        }
    }

    /// Run `f` against a session's state, creating it if needed.
    /// Expired sessions are dropped first.
    pub async fn write<R>(&self, session_id: &str, f: impl FnOnce(&mut AnalysisState) -> R) -> R {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();

        let before = sessions.len();
        sessions.retain(|_, entry| entry.is_live(now, self.ttl));
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!("Evicted {} idle session(s)", evicted);
        }

        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                state: AnalysisState::default(),
                last_seen: now,
            });
        entry.last_seen = now;
        f(&mut entry.state)
    }

    pub async fn snapshot(&self, session_id: &str) -> AnalysisState {
        self.read(session_id, AnalysisState::clone).await
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
