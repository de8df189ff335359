use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::model::{CanonicalPatch, CanonicalProfile};
use crate::normalize::merge_into;
use crate::sync::run::Run;

/// Shared canonical profile. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    inner: Arc<Mutex<CanonicalProfile>>,
}

impl ProfileStore {
    pub fn new(profile: CanonicalProfile) -> Self {
        Self {
            inner: Arc::new(Mutex::new(profile)),
        }
    }

    pub fn snapshot(&self) -> CanonicalProfile {
        self.lock().clone()
    }

    /// Merges `patch` only if `run` is still current. Returns whether it was applied.
    pub fn commit(&self, run: &Run, patch: &CanonicalPatch) -> bool {
        let applied = run
            .commit(|| merge_into(&mut self.lock(), patch))
            .is_some();
        if !applied {
            debug!(run = run.id(), "discarding result of superseded run");
        }
        applied
    }

    /// Merges unconditionally; used for optimistic local edits.
    pub fn apply(&self, patch: &CanonicalPatch) {
        merge_into(&mut self.lock(), patch);
    }

    fn lock(&self) -> MutexGuard<'_, CanonicalProfile> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Section, SectionKind};
    use crate::sync::run::RunTracker;
    use serde_json::json;

    fn basic_info(name: &str) -> CanonicalPatch {
        let mut section = Section::new();
        section.insert("full_name", json!(name));
        CanonicalPatch::single(SectionKind::BasicInfo, section)
    }

    #[test]
    fn test_commit_applies_for_current_run() {
        let store = ProfileStore::default();
        let tracker = RunTracker::new();
        let run = tracker.begin();
        assert!(store.commit(&run, &basic_info("Ada")));
        assert_eq!(
            store.snapshot().basic_info.get("full_name"),
            Some(&json!("Ada"))
        );
    }

    #[test]
    fn test_commit_discards_superseded_run() {
        let store = ProfileStore::default();
        let tracker = RunTracker::new();
        let stale = tracker.begin();
        let fresh = tracker.begin();

        assert!(!store.commit(&stale, &basic_info("Stale")));
        assert_eq!(store.snapshot(), CanonicalProfile::default());

        assert!(store.commit(&fresh, &basic_info("Fresh")));
        assert_eq!(
            store.snapshot().basic_info.get("full_name"),
            Some(&json!("Fresh"))
        );
    }

    #[test]
    fn test_clones_share_state() {
        let store = ProfileStore::default();
        let other = store.clone();
        other.apply(&basic_info("Grace"));
        assert_eq!(
            store.snapshot().basic_info.get("full_name"),
            Some(&json!("Grace"))
        );
    }
}
