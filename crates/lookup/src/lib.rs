//! CSV-backed subject lookup service.
//!
//! Builds an in-memory index over subject rows: an id map for direct lookup,
//! a per-token character trie for prefix search, and a Levenshtein fallback
//! for fuzzy name matching.

pub mod error;
pub mod index;
pub mod levenshtein;
mod trie;

pub use error::LookupError;
pub use index::{ImageResult, SubjectIndex};
pub use levenshtein::levenshtein;
