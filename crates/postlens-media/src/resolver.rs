//! Media resolver
//!
//! Turns a post's media fields into local files. Each media kind goes
//! through the tiers in order:
//!
//! 1. embedded mapping (`post.media`, paths that still exist)
//! 2. crawler naming convention under the media root
//! 3. download to a temp file, then content-hash lookup in the local index
//! 4. remote fallback: keep the download in run-scoped scratch space
//!
//! A kind whose field is missing, empty or the sentinel is skipped before
//! any tier runs. Resolution never fails: transient errors are logged and
//! the URL falls through to the next tier, or stays unresolved.

use crate::error::MediaError;
use crate::fetch::MediaFetcher;
use crate::index::{content_key, LocalFileIndex};
use crate::naming::{self, DEFAULT_IMAGE_EXTENSION, IMAGE_DIR, VIDEO_DIR, VIDEO_EXTENSION};
use postlens_domain::{MediaCandidate, MediaCategory, MediaKind, MediaLink, Post, ResolutionMethod};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir, TempPath};
use tokio::sync::RwLock;
use tracing::{debug, warn};

type IndexKey = (PathBuf, MediaCategory);

/// Knobs for one resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Upper bound on images returned per post
    pub max_images: usize,
    /// Enable tier 4
    pub allow_remote: bool,
    /// Enable tier 3
    pub hash_match: bool,
    /// Never resolve the video
    pub skip_videos: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_images: 3,
            allow_remote: false,
            hash_match: true,
            skip_videos: false,
        }
    }
}

/// Local files chosen for one post
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedMedia {
    /// Original pictures first, then retweet pictures; at most `max_images`
    pub images: Vec<PathBuf>,
    /// At most one video
    pub video: Option<PathBuf>,
    /// Every URL considered, in resolution order
    pub candidates: Vec<MediaCandidate>,
}

impl ResolvedMedia {
    /// Whether nothing was resolved
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.video.is_none()
    }
}

/// Multi-tier media resolver
///
/// Owns a scratch directory for downloads; it is removed when the resolver
/// is dropped, so remote-fallback paths are only valid for its lifetime.
pub struct MediaResolver<F> {
    fetcher: F,
    options: ResolveOptions,
    indexes: RwLock<HashMap<IndexKey, Arc<LocalFileIndex>>>,
    scratch: TempDir,
}

impl<F: MediaFetcher> MediaResolver<F> {
    /// Create a resolver with a fresh scratch directory
    pub fn new(fetcher: F, options: ResolveOptions) -> Result<Self, MediaError> {
        let scratch = tempfile::Builder::new()
            .prefix("postlens_media_")
            .tempdir()?;
        Ok(Self {
            fetcher,
            options,
            indexes: RwLock::new(HashMap::new()),
            scratch,
        })
    }

    /// Use a prebuilt index for `media_root` instead of walking it lazily
    pub fn with_index(mut self, media_root: impl Into<PathBuf>, index: LocalFileIndex) -> Self {
        let key = (media_root.into(), index.category());
        self.indexes.get_mut().insert(key, Arc::new(index));
        self
    }

    /// Options this resolver was built with
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Directory holding downloads for this run
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Resolve every media kind of `post` against `media_root`
    pub async fn resolve(&self, post: &Post, media_root: &Path) -> ResolvedMedia {
        let mut resolved = ResolvedMedia::default();
        let max = self.options.max_images;

        for kind in [MediaKind::OriginalPictures, MediaKind::RetweetPictures] {
            let remaining = max.saturating_sub(resolved.images.len());
            if remaining == 0 {
                break;
            }
            let urls = match kind {
                MediaKind::OriginalPictures => post.original_picture_urls(),
                _ => post.retweet_picture_urls(),
            };
            let Some(urls) = urls else {
                debug!("Post {}: no {}", post.id, kind.as_str());
                continue;
            };
            let candidates = self.resolve_kind(post, media_root, kind, &urls, remaining).await;
            resolved.images.extend(
                candidates
                    .iter()
                    .filter_map(|c| c.local_path.as_ref().map(PathBuf::from))
                    .take(remaining),
            );
            resolved.candidates.extend(candidates);
        }

        if !self.options.skip_videos {
            if let Some(url) = post.video() {
                let candidates = self
                    .resolve_kind(post, media_root, MediaKind::Video, &[url], 1)
                    .await;
                resolved.video = candidates
                    .iter()
                    .find_map(|c| c.local_path.as_ref().map(PathBuf::from));
                resolved.candidates.extend(candidates);
            }
        }

        resolved
    }

    async fn resolve_kind(
        &self,
        post: &Post,
        media_root: &Path,
        kind: MediaKind,
        urls: &[String],
        budget: usize,
    ) -> Vec<MediaCandidate> {
        let embedded = embedded_links(post, kind);
        if !embedded.is_empty() {
            debug!("Post {}: {} via embedded mapping", post.id, kind.as_str());
            return embedded
                .into_iter()
                .map(|link| MediaCandidate::resolved(link.url, link.path, ResolutionMethod::Embedded))
                .collect();
        }

        let by_name: HashMap<String, String> = match kind {
            MediaKind::Video => urls
                .first()
                .and_then(|url| naming::find_video(media_root, post, url))
                .into_iter()
                .map(|link| (link.url, link.path))
                .collect(),
            _ => naming::find_images(media_root, post, urls)
                .into_iter()
                .map(|link| (link.url, link.path))
                .collect(),
        };

        // Any naming hit settles the kind; remote tiers run only when it found nothing
        if !by_name.is_empty() {
            debug!("Post {}: {} via naming convention", post.id, kind.as_str());
            return urls
                .iter()
                .map(|url| match by_name.get(url) {
                    Some(path) => MediaCandidate::resolved(
                        url.clone(),
                        path.clone(),
                        ResolutionMethod::NamingConvention,
                    ),
                    None => MediaCandidate::unresolved(url.clone()),
                })
                .collect();
        }

        let mut candidates = Vec::with_capacity(urls.len());
        let mut hits = 0usize;
        for (idx, url) in urls.iter().enumerate() {
            if hits >= budget {
                candidates.push(MediaCandidate::unresolved(url.clone()));
                continue;
            }
            let candidate = self.resolve_remote(post, media_root, kind, idx, url).await;
            if candidate.is_resolved() {
                hits += 1;
            }
            candidates.push(candidate);
        }
        candidates
    }

    /// Tiers 3 and 4 for one URL; a tier 3 miss reuses its download for tier 4
    async fn resolve_remote(
        &self,
        post: &Post,
        media_root: &Path,
        kind: MediaKind,
        idx: usize,
        url: &str,
    ) -> MediaCandidate {
        if !self.options.hash_match && !self.options.allow_remote {
            return MediaCandidate::unresolved(url);
        }

        let index = if self.options.hash_match {
            match self.index_for(media_root, kind.category()).await {
                Ok(index) if !index.is_empty() => Some(index),
                Ok(_) => None,
                Err(e) => {
                    warn!("Failed to index {}: {}", media_root.display(), e);
                    None
                }
            }
        } else {
            None
        };
        if index.is_none() && !self.options.allow_remote {
            return MediaCandidate::unresolved(url);
        }

        let download = match download_scratch(&self.fetcher, url, self.scratch.path()).await {
            Ok(download) => download,
            Err(e) => {
                warn!("Post {}: download failed for {}: {}", post.id, url, e);
                return MediaCandidate::unresolved(url);
            }
        };

        if let Some(index) = index {
            match hash_lookup(index, download.to_path_buf()).await {
                Ok(Some(local)) => {
                    debug!("Post {}: {} via content hash", post.id, url);
                    return MediaCandidate::resolved(
                        url,
                        local.to_string_lossy(),
                        ResolutionMethod::ContentHash,
                    );
                }
                Ok(None) => debug!("Post {}: no content match for {}", post.id, url),
                Err(e) => warn!("Post {}: failed to hash download of {}: {}", post.id, url, e),
            }
        }

        if !self.options.allow_remote {
            return MediaCandidate::unresolved(url);
        }

        let dest = self.scratch.path().join(scratch_name(post, kind, idx, url));
        match download.persist(&dest) {
            Ok(()) => {
                debug!("Post {}: {} via remote download", post.id, url);
                MediaCandidate::resolved(url, dest.to_string_lossy(), ResolutionMethod::RemoteDownload)
            }
            Err(e) => {
                warn!("Post {}: failed to keep download of {}: {}", post.id, url, e.error);
                MediaCandidate::unresolved(url)
            }
        }
    }

    /// Cached index for `(media_root, category)`, built on first use
    async fn index_for(
        &self,
        media_root: &Path,
        category: MediaCategory,
    ) -> Result<Arc<LocalFileIndex>, MediaError> {
        let key = (media_root.to_path_buf(), category);
        if let Some(index) = self.indexes.read().await.get(&key) {
            return Ok(Arc::clone(index));
        }

        let mut indexes = self.indexes.write().await;
        if let Some(index) = indexes.get(&key) {
            return Ok(Arc::clone(index));
        }
        let root = index_root(media_root, category);
        let index = tokio::task::spawn_blocking(move || LocalFileIndex::build(&root, category))
            .await
            .map_err(|e| MediaError::Io(std::io::Error::other(e)))?;
        let index = Arc::new(index);
        indexes.insert(key, Arc::clone(&index));
        Ok(index)
    }
}

/// Directory indexed for a category under a media root
pub fn index_root(media_root: &Path, category: MediaCategory) -> PathBuf {
    match category {
        MediaCategory::Image => media_root.join(IMAGE_DIR),
        MediaCategory::Video => media_root.join(VIDEO_DIR),
    }
}

/// Download `url` and look its contents up in `index`
///
/// The download is deleted before returning, whatever the outcome.
pub async fn match_by_content<F: MediaFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    index: Arc<LocalFileIndex>,
    scratch_dir: &Path,
) -> Result<Option<PathBuf>, MediaError> {
    let download = download_scratch(fetcher, url, scratch_dir).await?;
    hash_lookup(index, download.to_path_buf()).await
}

/// Download into a temp path that is removed on drop
async fn download_scratch<F: MediaFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    dir: &Path,
) -> Result<TempPath, MediaError> {
    let temp = NamedTempFile::new_in(dir)?.into_temp_path();
    fetcher.fetch_to(url, &temp).await?;
    Ok(temp)
}

async fn hash_lookup(index: Arc<LocalFileIndex>, path: PathBuf) -> Result<Option<PathBuf>, MediaError> {
    tokio::task::spawn_blocking(move || {
        let (size, digest) = content_key(&path)?;
        Ok::<_, MediaError>(index.lookup(size, &digest).map(Path::to_path_buf))
    })
    .await
    .map_err(|e| MediaError::Io(std::io::Error::other(e)))?
}

fn embedded_links(post: &Post, kind: MediaKind) -> Vec<MediaLink> {
    let Some(media) = post.media.as_ref() else {
        return Vec::new();
    };
    let links = match kind {
        MediaKind::OriginalPictures => &media.original_pictures,
        MediaKind::RetweetPictures => &media.retweet_pictures,
        MediaKind::Video => &media.video,
    };
    links
        .iter()
        .filter(|link| link.is_complete() && Path::new(&link.path).is_file())
        .cloned()
        .collect()
}

fn scratch_name(post: &Post, kind: MediaKind, idx: usize, url: &str) -> String {
    let id: String = post
        .id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let ext = match kind {
        MediaKind::Video => VIDEO_EXTENSION.to_string(),
        _ => naming::url_extension(url, DEFAULT_IMAGE_EXTENSION),
    };
    format!("{}_{}_{}{}", id, kind.as_str(), idx + 1, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockFetcher;
    use std::fs;

    #[test]
    fn test_scratch_name_sanitizes_id() {
        let post = Post {
            id: "a/b".into(),
            ..Default::default()
        };
        assert_eq!(
            scratch_name(&post, MediaKind::RetweetPictures, 0, "https://cdn/x.png"),
            "a_b_retweet_pictures_1.png"
        );
        assert_eq!(
            scratch_name(&post, MediaKind::Video, 0, "https://cdn/stream"),
            "a_b_video_1.mp4"
        );
    }

    #[tokio::test]
    async fn test_index_is_built_once_per_root() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("img")).unwrap();
        fs::write(root.path().join("img/a.jpg"), b"a").unwrap();

        let resolver = MediaResolver::new(MockFetcher::new(), ResolveOptions::default()).unwrap();
        let first = resolver.index_for(root.path(), MediaCategory::Image).await.unwrap();
        fs::write(root.path().join("img/b.jpg"), b"b").unwrap();
        let second = resolver.index_for(root.path(), MediaCategory::Image).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_enabled_means_no_fetch() {
        let fetcher = MockFetcher::new().with("https://cdn/x.jpg", b"x".to_vec());
        let options = ResolveOptions {
            hash_match: false,
            ..Default::default()
        };
        let resolver = MediaResolver::new(fetcher.clone(), options).unwrap();
        let post = Post {
            id: "P1".into(),
            publish_time: "2024-05-01".into(),
            original_pictures: Some("https://cdn/x.jpg".into()),
            ..Default::default()
        };
        let root = TempDir::new().unwrap();
        let resolved = resolver.resolve(&post, root.path()).await;
        assert!(resolved.is_empty());
        assert_eq!(resolved.candidates, vec![MediaCandidate::unresolved("https://cdn/x.jpg")]);
        assert_eq!(fetcher.call_count(), 0);
    }
}
