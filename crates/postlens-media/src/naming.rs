//! Crawler naming convention
//!
//! The crawler saves media as `{YYYYMMDD}_{post_id}[_{n}]{ext}` under a fixed
//! layout:
//!
//! ```text
//! <media_root>/img/原创微博图片/   pictures of the post itself
//! <media_root>/img/转发微博图片/   pictures of the reposted post
//! <media_root>/video/              the post's video
//! ```

use postlens_domain::{MediaLink, Post};
use std::path::{Path, PathBuf};

/// Image directory under a media root
pub const IMAGE_DIR: &str = "img";
/// Video directory under a media root
pub const VIDEO_DIR: &str = "video";
/// Subfolder of [`IMAGE_DIR`] holding original-post pictures
pub const ORIGINAL_PICTURES_DIR: &str = "原创微博图片";
/// Subfolder of [`IMAGE_DIR`] holding reposted-post pictures
pub const RETWEET_PICTURES_DIR: &str = "转发微博图片";

/// Fallback extension for pictures whose URL carries none (or a bogus one)
pub const DEFAULT_IMAGE_EXTENSION: &str = ".jpg";
/// Extension the crawler always uses for videos
pub const VIDEO_EXTENSION: &str = ".mp4";

const MAX_EXTENSION_LEN: usize = 5;

/// Extension of the URL's last path segment, dot included
///
/// Query strings and fragments are ignored. Missing extensions and ones
/// longer than five characters (dot included) fall back to `default`.
///
/// ```
/// use postlens_media::naming::url_extension;
///
/// assert_eq!(url_extension("https://wx1.sinaimg.cn/large/abc.png?x=1", ".jpg"), ".png");
/// assert_eq!(url_extension("https://host/path/noext", ".jpg"), ".jpg");
/// ```
pub fn url_extension(url: &str, default: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    };
    let segment = path.rsplit('/').next().unwrap_or("");
    match segment.rfind('.') {
        Some(dot) if dot > 0 => {
            let ext = &segment[dot..];
            if ext.len() > 1 && ext.len() <= MAX_EXTENSION_LEN {
                ext.to_string()
            } else {
                default.to_string()
            }
        }
        _ => default.to_string(),
    }
}

/// Candidate file names for a post's picture URLs, paired with their URL
///
/// The `_{n}` suffix (1-based) is added only when more than one URL is
/// being resolved. Empty when the post lacks an id or a publish date.
pub fn image_candidates(post: &Post, urls: &[String]) -> Vec<(String, String)> {
    let Some(prefix) = base_prefix(post) else {
        return Vec::new();
    };
    let numbered = urls.len() > 1;
    urls.iter()
        .enumerate()
        .map(|(idx, url)| {
            let ext = url_extension(url, DEFAULT_IMAGE_EXTENSION);
            let name = if numbered {
                format!("{}_{}{}", prefix, idx + 1, ext)
            } else {
                format!("{}{}", prefix, ext)
            };
            (url.clone(), name)
        })
        .collect()
}

/// Candidate file name for the post's single video
pub fn video_candidate(post: &Post) -> Option<String> {
    base_prefix(post).map(|prefix| format!("{}{}", prefix, VIDEO_EXTENSION))
}

/// Picture folders searched for every image candidate, in order
pub fn image_search_dirs(media_root: &Path) -> [PathBuf; 2] {
    let img = media_root.join(IMAGE_DIR);
    [img.join(ORIGINAL_PICTURES_DIR), img.join(RETWEET_PICTURES_DIR)]
}

/// Existing local files for `urls` under the convention; first folder hit wins
pub fn find_images(media_root: &Path, post: &Post, urls: &[String]) -> Vec<MediaLink> {
    let dirs = image_search_dirs(media_root);
    image_candidates(post, urls)
        .into_iter()
        .filter_map(|(url, name)| {
            dirs.iter()
                .map(|dir| dir.join(&name))
                .find(|path| path.is_file())
                .map(|path| MediaLink::new(url, path.to_string_lossy()))
        })
        .collect()
}

/// Existing local file for the post's video under the convention
pub fn find_video(media_root: &Path, post: &Post, url: &str) -> Option<MediaLink> {
    if url.is_empty() {
        return None;
    }
    let name = video_candidate(post)?;
    let path = media_root.join(VIDEO_DIR).join(name);
    if path.is_file() {
        Some(MediaLink::new(url, path.to_string_lossy()))
    } else {
        None
    }
}

fn base_prefix(post: &Post) -> Option<String> {
    if post.id.is_empty() {
        return None;
    }
    post.date_prefix().map(|date| format!("{}_{}", date, post.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn post() -> Post {
        Post {
            id: "P1".into(),
            publish_time: "2024-05-01T10:00:00".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_url_has_no_suffix() {
        let names = image_candidates(&post(), &["https://cdn/a/x.jpg".to_string()]);
        assert_eq!(names, vec![("https://cdn/a/x.jpg".to_string(), "20240501_P1.jpg".to_string())]);
    }

    #[test]
    fn test_multiple_urls_are_numbered() {
        let urls = vec!["https://cdn/x.jpg".to_string(), "https://cdn/y.jpg".to_string()];
        let names: Vec<String> = image_candidates(&post(), &urls)
            .into_iter()
            .map(|(_, n)| n)
            .collect();
        assert_eq!(names, vec!["20240501_P1_1.jpg", "20240501_P1_2.jpg"]);
    }

    #[test]
    fn test_extension_rules() {
        assert_eq!(url_extension("https://cdn/x.jpeg", ".jpg"), ".jpeg");
        assert_eq!(url_extension("https://cdn/x.verylong", ".jpg"), ".jpg");
        assert_eq!(url_extension("https://cdn/dir.v2/file", ".jpg"), ".jpg");
        assert_eq!(url_extension("https://cdn/.hidden", ".jpg"), ".jpg");
        assert_eq!(url_extension("not a url/y.gif?q", ".jpg"), ".gif");
    }

    #[test]
    fn test_missing_id_or_date_yields_nothing() {
        let mut p = post();
        p.publish_time.clear();
        assert!(image_candidates(&p, &["u".to_string()]).is_empty());
        assert!(video_candidate(&p).is_none());

        let mut p = post();
        p.id.clear();
        assert!(video_candidate(&p).is_none());
    }

    #[test]
    fn test_find_prefers_original_folder() {
        let dir = TempDir::new().unwrap();
        let [original, retweet] = image_search_dirs(dir.path());
        fs::create_dir_all(&original).unwrap();
        fs::create_dir_all(&retweet).unwrap();
        fs::write(original.join("20240501_P1.jpg"), b"o").unwrap();
        fs::write(retweet.join("20240501_P1.jpg"), b"r").unwrap();

        let found = find_images(dir.path(), &post(), &["https://cdn/x.jpg".to_string()]);
        assert_eq!(found.len(), 1);
        assert!(found[0].path.contains(ORIGINAL_PICTURES_DIR));
    }

    #[test]
    fn test_find_video() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(VIDEO_DIR)).unwrap();
        assert!(find_video(dir.path(), &post(), "https://v/1").is_none());

        fs::write(dir.path().join(VIDEO_DIR).join("20240501_P1.mp4"), b"v").unwrap();
        let link = find_video(dir.path(), &post(), "https://v/1").unwrap();
        assert_eq!(link.url, "https://v/1");
        assert!(link.path.ends_with("20240501_P1.mp4"));
    }
}
