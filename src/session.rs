use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::scrape::ScrapeTarget;

pub const DEFAULT_SESSION: &str = "default";

/// Scrape targets keyed by session id.
///
/// Each session holds at most one target; setting it again replaces the
/// previous one. Sessions never see each other's targets.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    targets: Arc<RwLock<HashMap<String, ScrapeTarget>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `target` for `session_id`, returning the target it replaced.
    pub async fn set_target(&self, session_id: &str, target: ScrapeTarget) -> Option<ScrapeTarget> {
        let mut targets = self.targets.write().await;
        targets.insert(session_id.to_string(), target)
    }

    pub async fn target(&self, session_id: &str) -> Option<ScrapeTarget> {
        let targets = self.targets.read().await;
        targets.get(session_id).cloned()
    }
}

/// Normalizes an optional client-supplied session id.
pub fn resolve_session_id(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}
