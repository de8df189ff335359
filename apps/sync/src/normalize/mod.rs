// Normalization pipeline: resolve drifting field names, normalize loosely shaped
// payloads into canonical patches, merge patches into client state.

pub mod merge;
pub mod normalizer;
pub mod resolver;

pub use merge::{merge, merge_into};
pub use normalizer::{normalize, NormalizationError};
pub use resolver::{decode_choice, encode_choice, parse_loose_number, resolve};
