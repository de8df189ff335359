// Canonical data model: the single shape every backend payload is normalized into.

pub mod choices;
pub mod profile;
pub mod schema;
pub mod status;

pub use profile::{CanonicalPatch, CanonicalProfile, Section, SectionKind};
pub use status::ParsingStatus;
