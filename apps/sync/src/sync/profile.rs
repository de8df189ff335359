//! Profile reads and interactive section edits.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::errors::SyncError;
use crate::model::schema::{self, FieldKind};
use crate::model::{CanonicalPatch, CanonicalProfile, Section, SectionKind};
use crate::normalize::{encode_choice, normalize};
use crate::sync::run::RunTracker;
use crate::sync::store::ProfileStore;

pub struct ProfileSync {
    backend: Arc<dyn Backend>,
    store: ProfileStore,
    runs: RunTracker,
}

impl ProfileSync {
    pub fn new(backend: Arc<dyn Backend>, store: ProfileStore) -> Self {
        Self {
            backend,
            store,
            runs: RunTracker::new(),
        }
    }

    pub fn with_tracker(mut self, runs: RunTracker) -> Self {
        self.runs = runs;
        self
    }

    /// Re-reads the profile from the backend and merges it.
    pub async fn refresh(&self) -> Result<CanonicalProfile, SyncError> {
        let run = self.runs.begin();
        let payload = tokio::select! {
            biased;
            _ = run.token().cancelled() => return Err(SyncError::Cancelled),
            payload = self.backend.fetch_profile() => payload?,
        };
        let patch = normalize(&payload)?;
        if !self.store.commit(&run, &patch) {
            return Err(SyncError::Cancelled);
        }
        debug!(run = run.id(), "profile refreshed");
        Ok(self.store.snapshot())
    }

    /// Saves one edited section. The edit is merged locally before the
    /// request goes out; the server's echo is merged when it returns.
    ///
    /// A failed save leaves the local edit in place.
    pub async fn save_section(
        &self,
        kind: SectionKind,
        section: Section,
    ) -> Result<CanonicalProfile, SyncError> {
        let run = self.runs.begin();
        let body = json!({ kind.key(): encode_section(kind, &section) });
        self.store.apply(&CanonicalPatch::single(kind, section));

        let echoed = tokio::select! {
            biased;
            _ = run.token().cancelled() => return Err(SyncError::Cancelled),
            echoed = self.backend.patch_profile(&body) => echoed,
        };
        let echoed = match echoed {
            Ok(echoed) => echoed,
            Err(e) => {
                warn!(section = kind.key(), error = %e, "saving profile section failed");
                return Err(e);
            }
        };

        match normalize(&echoed) {
            Ok(patch) if patch.has_content() => {
                self.store.commit(&run, &patch);
            }
            Ok(_) => debug!(section = kind.key(), "save returned no profile data"),
            Err(e) => warn!(section = kind.key(), error = %e, "could not read saved profile"),
        }
        info!(section = kind.key(), "profile section saved");
        Ok(self.store.snapshot())
    }
}

/// Converts a canonical section to the backend's wire form: choice labels
/// become codes, everything else is sent as is.
pub fn encode_section(kind: SectionKind, section: &Section) -> Map<String, Value> {
    let specs = schema::fields(kind);
    section
        .iter()
        .map(|(field, value)| {
            let choice = specs.iter().find_map(|spec| match spec.kind {
                FieldKind::Choice(map) if spec.name == field.as_str() => Some(map),
                _ => None,
            });
            let encoded = match (choice, value) {
                (Some(map), Value::String(label)) => json!(encode_choice(label, map)),
                _ => value.clone(),
            };
            (field.clone(), encoded)
        })
        .collect()
}
