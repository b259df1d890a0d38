//! Postlens Domain Layer
//!
//! Core data model shared by every other crate. Nothing here touches the
//! filesystem or the network.
//!
//! ## Key Concepts
//!
//! - **Post**: one crawled social-media record with its raw media fields
//! - **MediaCandidate**: a media URL and the local file it resolved to, if any
//! - **Extraction**: the structured-output contract the model is decoded against
//! - **StanceShape**: current vs. legacy `stance` layouts and the upgrade between them
//! - **JournalEntry**: the durable record written once per processed post

#![warn(clippy::all)]

pub mod media;
pub mod post;
pub mod record;
pub mod schema;
pub mod stance;

// Re-exports for convenience
pub use media::{MediaCandidate, MediaCategory, MediaKind, MediaMap, ResolutionMethod};
pub use post::{split_media_field, CorpusDocument, EmbeddedMedia, MediaLink, Post, NO_MEDIA_SENTINEL};
pub use record::{BadVideoRecord, ExtractionResult, JournalEntry, JournalMeta, MediaUsed};
pub use schema::{schema_contract, Emotion, Extraction, Tone};
pub use stance::{upgrade_extraction, LegacyStanceEntry, Stance, StanceShape};
