//! Patch Merger: applies a `CanonicalPatch` to a `CanonicalProfile`.
//!
//! Section by section, patch fields overwrite and every other field survives.
//! Sections the patch does not carry are left untouched.

use crate::model::{CanonicalPatch, CanonicalProfile};

/// Returns `existing` with `patch` applied.
pub fn merge(existing: &CanonicalProfile, patch: &CanonicalPatch) -> CanonicalProfile {
    let mut merged = existing.clone();
    merge_into(&mut merged, patch);
    merged
}

/// In-place variant of [`merge`].
pub fn merge_into(profile: &mut CanonicalProfile, patch: &CanonicalPatch) {
    for (kind, section) in patch.sections() {
        profile.section_mut(kind).absorb(section);
    }
}
