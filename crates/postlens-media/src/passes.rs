//! Offline media passes over a single corpus document
//!
//! - [`build_media_map`]: content-hash every listed URL against the local
//!   media root and report exact matches.
//! - [`augment_corpus`]: record naming-convention hits onto each post's
//!   `media` field, which the resolver's embedded tier reads on later runs.

use crate::error::MediaError;
use crate::fetch::MediaFetcher;
use crate::index::LocalFileIndex;
use crate::naming;
use crate::resolver::{index_root, match_by_content};
use postlens_domain::{CorpusDocument, EmbeddedMedia, MediaCategory, MediaMap, Post};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Which categories [`build_media_map`] covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaMapOptions {
    /// Leave `images` empty
    pub skip_images: bool,
    /// Leave `videos` empty
    pub skip_videos: bool,
}

/// Map a corpus's picture and video URLs to byte-identical local files
///
/// Pictures come from `original_pictures` only. Each URL is downloaded once
/// to a temp file that is deleted afterwards; failed downloads are skipped.
pub async fn build_media_map<F: MediaFetcher + ?Sized>(
    fetcher: &F,
    corpus: &CorpusDocument,
    media_root: &Path,
    options: MediaMapOptions,
) -> Result<MediaMap, MediaError> {
    let (image_urls, video_urls) = collect_urls(&corpus.weibo);
    let scratch = tempfile::Builder::new()
        .prefix("postlens_map_")
        .tempdir()?;

    let mut map = MediaMap::default();
    if !options.skip_images {
        map.images = map_category(fetcher, &image_urls, media_root, MediaCategory::Image, scratch.path()).await?;
    }
    if !options.skip_videos {
        map.videos = map_category(fetcher, &video_urls, media_root, MediaCategory::Video, scratch.path()).await?;
    }

    info!(
        "Mapped {}/{} image and {}/{} video URLs",
        map.images.len(),
        image_urls.len(),
        map.videos.len(),
        video_urls.len()
    );
    Ok(map)
}

async fn map_category<F: MediaFetcher + ?Sized>(
    fetcher: &F,
    urls: &[String],
    media_root: &Path,
    category: MediaCategory,
    scratch: &Path,
) -> Result<BTreeMap<String, String>, MediaError> {
    let mut mapping = BTreeMap::new();
    if urls.is_empty() {
        return Ok(mapping);
    }

    let root = index_root(media_root, category);
    let index = tokio::task::spawn_blocking(move || LocalFileIndex::build(&root, category))
        .await
        .map_err(|e| MediaError::Io(std::io::Error::other(e)))?;
    let index = Arc::new(index);

    for url in urls {
        match match_by_content(fetcher, url, Arc::clone(&index), scratch).await {
            Ok(Some(local)) => {
                mapping.insert(url.clone(), local.to_string_lossy().into_owned());
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping {}: {}", url, e),
        }
    }
    Ok(mapping)
}

/// Distinct picture and video URLs in first-seen order
fn collect_urls(posts: &[Post]) -> (Vec<String>, Vec<String>) {
    let mut seen_images = HashSet::new();
    let mut seen_videos = HashSet::new();
    let mut images = Vec::new();
    let mut videos = Vec::new();
    for post in posts {
        for url in post.original_picture_urls().unwrap_or_default() {
            if seen_images.insert(url.clone()) {
                images.push(url);
            }
        }
        if let Some(url) = post.video() {
            if seen_videos.insert(url.clone()) {
                videos.push(url);
            }
        }
    }
    (images, videos)
}

/// Counts reported by [`augment_corpus`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AugmentSummary {
    /// Posts visited
    pub posts: usize,
    /// Posts that gained at least one link
    pub posts_linked: usize,
    /// Links written in total
    pub links: usize,
}

/// Fill `post.media` from the naming convention; returns the links written
///
/// A missing `media` field is created empty. A kind with no hits keeps
/// whatever it held before.
pub fn augment_post(post: &mut Post, media_root: &Path) -> usize {
    let original = post
        .original_picture_urls()
        .map(|urls| naming::find_images(media_root, post, &urls))
        .unwrap_or_default();
    let retweet = post
        .retweet_picture_urls()
        .map(|urls| naming::find_images(media_root, post, &urls))
        .unwrap_or_default();
    let video: Vec<_> = post
        .video()
        .and_then(|url| naming::find_video(media_root, post, &url))
        .into_iter()
        .collect();

    let links = original.len() + retweet.len() + video.len();
    let media = post.media.get_or_insert_with(EmbeddedMedia::default);
    if !original.is_empty() {
        media.original_pictures = original;
    }
    if !retweet.is_empty() {
        media.retweet_pictures = retweet;
    }
    if !video.is_empty() {
        media.video = video;
    }
    links
}

/// Run [`augment_post`] over every post of the document
pub fn augment_corpus(corpus: &mut CorpusDocument, media_root: &Path) -> AugmentSummary {
    let mut summary = AugmentSummary::default();
    for post in &mut corpus.weibo {
        let links = augment_post(post, media_root);
        summary.posts += 1;
        summary.links += links;
        if links > 0 {
            summary.posts_linked += 1;
        }
    }
    info!(
        "Augmented {} of {} posts with {} local links",
        summary.posts_linked, summary.posts, summary.links
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use postlens_domain::MediaLink;

    #[test]
    fn test_collect_urls_dedups_and_skips_retweets() {
        let posts = vec![
            Post {
                original_pictures: Some("u1,u2".into()),
                retweet_pictures: Some("r1".into()),
                video_url: Some("v1".into()),
                ..Default::default()
            },
            Post {
                original_pictures: Some("u2,u3".into()),
                video_url: Some("无".into()),
                ..Default::default()
            },
        ];
        let (images, videos) = collect_urls(&posts);
        assert_eq!(images, vec!["u1", "u2", "u3"]);
        assert_eq!(videos, vec!["v1"]);
    }

    #[test]
    fn test_collect_urls_dedups_per_kind() {
        let posts = vec![Post {
            original_pictures: Some("https://cdn/same".into()),
            video_url: Some("https://cdn/same".into()),
            ..Default::default()
        }];
        let (images, videos) = collect_urls(&posts);
        assert_eq!(images, vec!["https://cdn/same"]);
        assert_eq!(videos, vec!["https://cdn/same"]);
    }

    #[test]
    fn test_augment_keeps_existing_links_on_miss() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut post = Post {
            id: "P1".into(),
            publish_time: "2024-05-01".into(),
            original_pictures: Some("https://cdn/x.jpg".into()),
            media: Some(EmbeddedMedia {
                original_pictures: vec![MediaLink::new("https://cdn/x.jpg", "/elsewhere/x.jpg")],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(augment_post(&mut post, dir.path()), 0);
        assert_eq!(post.media.unwrap().original_pictures[0].path, "/elsewhere/x.jpg");
    }

    #[test]
    fn test_augment_creates_empty_media() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut post = Post {
            id: "P2".into(),
            ..Default::default()
        };
        augment_post(&mut post, dir.path());
        assert_eq!(post.media, Some(EmbeddedMedia::default()));
    }
}
