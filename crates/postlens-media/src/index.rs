//! Content-addressed index over a media directory
//!
//! Files are keyed by `(size, sha256)` so a downloaded copy can be matched
//! to its local twin regardless of name or location. Byte-identical files
//! collapse into a single entry; the last one walked wins.

use postlens_domain::MediaCategory;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// `(file_size_bytes, sha256_hex)`
pub type ContentKey = (u64, String);

/// Exact-content lookup table for one media root and one category
///
/// Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct LocalFileIndex {
    root: PathBuf,
    category: MediaCategory,
    entries: HashMap<ContentKey, PathBuf>,
}

impl LocalFileIndex {
    /// Index `root` using the category's default extensions
    pub fn build(root: &Path, category: MediaCategory) -> Self {
        Self::build_with_extensions(root, category, category.default_extensions())
    }

    /// Index every file under `root` whose extension is in `extensions`
    ///
    /// Extensions are matched case-insensitively and given without a dot.
    /// Unreadable files and walk errors are skipped.
    pub fn build_with_extensions(root: &Path, category: MediaCategory, extensions: &[&str]) -> Self {
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let mut entries = HashMap::new();

        if !root.is_dir() {
            debug!("Media root {} is not a directory, index is empty", root.display());
            return Self {
                root,
                category,
                entries,
            };
        }

        let walker = WalkDir::new(&root).follow_links(false).sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
                continue;
            }
            match content_key(entry.path()) {
                Ok(key) => {
                    entries.insert(key, entry.path().to_path_buf());
                }
                Err(e) => {
                    warn!("Skipping {}: {}", entry.path().display(), e);
                }
            }
        }

        info!(
            "Indexed {} {} files under {}",
            entries.len(),
            category.as_str(),
            root.display()
        );

        Self {
            root,
            category,
            entries,
        }
    }

    /// Find the local file with exactly this size and digest
    pub fn lookup(&self, size: u64, sha256_hex: &str) -> Option<&Path> {
        self.entries
            .get(&(size, sha256_hex.to_string()))
            .map(PathBuf::as_path)
    }

    /// Find the local file whose contents equal those of `path`
    pub fn lookup_file(&self, path: &Path) -> io::Result<Option<&Path>> {
        let (size, digest) = content_key(path)?;
        Ok(self.lookup(size, &digest))
    }

    /// Root this index was built over (canonical when it exists)
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Category this index covers
    pub fn category(&self) -> MediaCategory {
        self.category
    }

    /// Number of distinct contents indexed
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was indexed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Stream-hash a file, returning its byte length and SHA-256 hex digest
pub fn content_key(path: &Path) -> io::Result<ContentKey> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    let mut size: u64 = 0;
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        size += read as u64;
    }
    Ok((size, hex::encode(hasher.finalize())))
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
