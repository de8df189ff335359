//! Resilient backend synchronization for the recruitment platform client:
//! account linking under retry, resume-parse polling, and normalization of
//! loosely shaped backend payloads into one canonical profile.

pub mod backend;
pub mod config;
pub mod errors;
pub mod model;
pub mod normalize;
pub mod sync;
