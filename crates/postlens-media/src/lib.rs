//! Postlens Media Layer
//!
//! Resolves a post's media URLs to local files.
//!
//! # Components
//!
//! - `LocalFileIndex`: `(size, sha256)` lookup over a media directory
//! - `naming`: the crawler's `{YYYYMMDD}_{post_id}[_{n}]{ext}` file layout
//! - `MediaResolver`: embedded → naming convention → content hash → remote download
//! - `passes`: offline media-map and augment passes over a corpus file
//! - `MediaFetcher`: HTTP downloads (`HttpFetcher`) or canned bytes (`MockFetcher`)
//!
//! # Examples
//!
//! ```no_run
//! use postlens_media::{MediaResolver, MockFetcher, ResolveOptions};
//! use postlens_domain::Post;
//! use std::path::Path;
//!
//! # async fn demo() -> Result<(), postlens_media::MediaError> {
//! let resolver = MediaResolver::new(MockFetcher::new(), ResolveOptions::default())?;
//! let post = Post { id: "P1".into(), ..Default::default() };
//! let media = resolver.resolve(&post, Path::new("/data/corpus")).await;
//! assert!(media.is_empty());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod fetch;
pub mod index;
pub mod naming;
pub mod passes;
pub mod resolver;

pub use error::MediaError;
pub use fetch::{HttpFetcher, MediaFetcher, MockFetcher, DEFAULT_FETCH_TIMEOUT_SECS};
pub use index::{content_key, ContentKey, LocalFileIndex};
pub use passes::{augment_corpus, augment_post, build_media_map, AugmentSummary, MediaMapOptions};
pub use resolver::{index_root, match_by_content, MediaResolver, ResolveOptions, ResolvedMedia};
