//! Corpus discovery and loading

use crate::error::ExtractorError;
use postlens_domain::CorpusDocument;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Every `.json` file under `root`, sorted, excluding the snapshot directory
pub fn discover_corpus_files(root: &Path, snapshot_dir: &Path) -> Vec<PathBuf> {
    let snapshot_dir = snapshot_dir.canonicalize().unwrap_or_else(|_| snapshot_dir.to_path_buf());

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry.path().canonicalize().is_ok_and(|dir| dir == snapshot_dir))
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable corpus entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();

    files.sort();
    debug!("Discovered {} corpus files under {}", files.len(), root.display());
    files
}

/// Load one corpus file; anything but a JSON object with a `weibo` array is fatal
pub fn load_corpus(path: &Path) -> Result<CorpusDocument, ExtractorError> {
    let corpus_error = |reason: String| ExtractorError::Corpus {
        path: path.display().to_string(),
        reason,
    };
    let text = std::fs::read_to_string(path).map_err(|e| corpus_error(e.to_string()))?;
    CorpusDocument::from_json(&text).map_err(|e| corpus_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discovery_is_sorted_and_skips_snapshots() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::create_dir_all(root.join("processed/extractions")).unwrap();
        fs::write(root.join("b/2.json"), "{}").unwrap();
        fs::write(root.join("a.json"), "{}").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();
        fs::write(root.join("processed/extractions/P1.json"), "{}").unwrap();
        fs::write(root.join("processed/extractions.jsonl"), "").unwrap();

        let files = discover_corpus_files(root, &root.join("processed/extractions"));
        assert_eq!(files, vec![root.join("a.json"), root.join("b/2.json")]);
    }

    #[test]
    fn test_load_rejects_missing_container() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"user": {}}"#).unwrap();
        assert!(matches!(load_corpus(&path), Err(ExtractorError::Corpus { .. })));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_corpus(&path), Err(ExtractorError::Corpus { .. })));
    }

    #[test]
    fn test_load_reads_posts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ok.json");
        fs::write(&path, r#"{"user": {"id": 1}, "weibo": [{"id": "P1", "content": "hi"}]}"#).unwrap();
        let doc = load_corpus(&path).unwrap();
        assert_eq!(doc.weibo.len(), 1);
        assert_eq!(doc.weibo[0].id, "P1");
    }
}
