//! End-to-end tests for the Extractor

#[cfg(test)]
mod tests {
    use crate::{Extractor, ExtractorConfig, ExtractorError, ResumeSet};
    use postlens_domain::{BadVideoRecord, JournalEntry};
    use postlens_llm::MockEngine;
    use postlens_media::naming::ORIGINAL_PICTURES_DIR;
    use postlens_media::MockFetcher;
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::create_dir_all(dir.path().join("corpus")).unwrap();
            Self { dir }
        }

        fn corpus_dir(&self) -> PathBuf {
            self.dir.path().join("corpus")
        }

        fn write(&self, rel: &str, bytes: &[u8]) -> PathBuf {
            let path = self.corpus_dir().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, bytes).unwrap();
            path
        }

        fn write_corpus(&self, name: &str, posts: Vec<Value>) {
            let doc = json!({"user": {"id": "u1"}, "weibo": posts});
            self.write(name, doc.to_string().as_bytes());
        }

        fn config(&self) -> ExtractorConfig {
            let out = self.dir.path().join("out");
            ExtractorConfig {
                journal_path: out.join("extractions.jsonl"),
                snapshot_dir: out.join("extractions"),
                bad_video_log: out.join("bad_videos.jsonl"),
                ..ExtractorConfig::for_root(self.corpus_dir())
            }
        }

        fn journal(&self) -> Vec<JournalEntry> {
            read_jsonl(&self.config().journal_path)
        }
    }

    fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
        match fs::read_to_string(path) {
            Ok(text) => text.lines().map(|l| serde_json::from_str(l).unwrap()).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn text_post(id: &str) -> Value {
        json!({
            "id": id,
            "content": format!("post {}", id),
            "publish_time": "2024-05-01T10:00:00",
            "original_pictures": "无",
            "retweet_pictures": "无",
            "video_url": "无",
            "attitudes_count": 3
        })
    }

    fn ids(entries: &[JournalEntry]) -> Vec<String> {
        entries.iter().map(|e| e.post_id().to_string()).collect()
    }

    #[tokio::test]
    async fn test_run_journals_every_post() {
        let fixture = Fixture::new();
        fixture.write_corpus("a.json", vec![text_post("P1"), text_post("P2")]);

        let engine = MockEngine::new(r#"{"post_id": "x", "topic": {}}"#);
        let extractor = Extractor::new(engine.clone(), MockFetcher::new(), fixture.config()).unwrap();
        let summary = extractor.run().await.unwrap();

        assert_eq!(summary.files, 1);
        assert_eq!(summary.processed, 2);
        assert_eq!(engine.call_count(), 2);

        let entries = fixture.journal();
        assert_eq!(ids(&entries), vec!["P1", "P2"]);
        let first = &entries[0];
        assert_eq!(first.meta.model_id, "mock");
        assert_eq!(first.meta.publish_time.as_deref(), Some("2024-05-01T10:00:00"));
        assert!(first.meta.source_corpus_file.ends_with("a.json"));
        assert_eq!(first.input.extra["attitudes_count"], 3);
        assert_eq!(first.result.extraction["topic"], json!({}));
    }

    #[tokio::test]
    async fn test_snapshot_matches_journal_line() {
        let fixture = Fixture::new();
        fixture.write_corpus("a.json", vec![text_post("P1")]);

        let extractor =
            Extractor::new(MockEngine::default(), MockFetcher::new(), fixture.config()).unwrap();
        extractor.run().await.unwrap();

        let snapshot_path = fixture.config().snapshot_dir.join("P1.json");
        let snapshot: JournalEntry =
            serde_json::from_str(&fs::read_to_string(snapshot_path).unwrap()).unwrap();
        assert_eq!(fixture.journal(), vec![snapshot]);
    }

    #[tokio::test]
    async fn test_resume_twice_is_idempotent() {
        let fixture = Fixture::new();
        fixture.write_corpus("a.json", vec![text_post("P1"), text_post("P2")]);
        fixture.write_corpus("b.json", vec![text_post("P3")]);

        let mut config = fixture.config();
        config.resume = true;
        let engine = MockEngine::default();

        for _ in 0..2 {
            let extractor = Extractor::new(engine.clone(), MockFetcher::new(), config.clone()).unwrap();
            extractor.run().await.unwrap();
        }

        assert_eq!(ids(&fixture.journal()), vec!["P1", "P2", "P3"]);
        assert_eq!(engine.call_count(), 3);
    }

    #[tokio::test]
    async fn test_interrupted_run_resumes_remaining_posts() {
        let fixture = Fixture::new();
        let posts: Vec<Value> = (0..10).map(|i| text_post(&format!("P{}", i))).collect();
        fixture.write_corpus("a.json", posts);

        let mut config = fixture.config();
        config.resume = true;
        config.limit = 5;
        let first = Extractor::new(MockEngine::default(), MockFetcher::new(), config.clone())
            .unwrap()
            .run()
            .await
            .unwrap();
        assert!(first.stopped_at_limit);
        assert_eq!(fixture.journal().len(), 5);

        config.limit = 0;
        let engine = MockEngine::default();
        let second = Extractor::new(engine.clone(), MockFetcher::new(), config)
            .unwrap()
            .run()
            .await
            .unwrap();
        assert_eq!(second.processed, 5);
        assert_eq!(second.skipped_resumed, 5);
        assert_eq!(engine.call_count(), 5);

        let entries = fixture.journal();
        assert_eq!(entries.len(), 10);
        let distinct: HashSet<String> = ids(&entries).into_iter().collect();
        assert_eq!(distinct.len(), 10);
        assert_eq!(ResumeSet::scan(&fixture.config().journal_path).unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_limit_spans_corpus_files() {
        let fixture = Fixture::new();
        fixture.write_corpus("a.json", vec![text_post("P1"), text_post("P2")]);
        fixture.write_corpus("b.json", vec![text_post("P3"), text_post("P4")]);

        let mut config = fixture.config();
        config.limit = 3;
        let summary = Extractor::new(MockEngine::default(), MockFetcher::new(), config)
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(summary.files, 2);
        assert!(summary.stopped_at_limit);
        assert_eq!(ids(&fixture.journal()), vec!["P1", "P2", "P3"]);
    }

    #[tokio::test]
    async fn test_undecodable_video_is_dropped_once() {
        let fixture = Fixture::new();
        let image = fixture.write(&format!("img/{}/20240501_P1.jpg", ORIGINAL_PICTURES_DIR), JPEG);
        fixture.write("video/20240501_P1.mp4", b"definitely not a video");
        let mut post = text_post("P1");
        post["original_pictures"] = json!("https://wx1.sinaimg.cn/large/abc.jpg");
        post["video_url"] = json!("https://f.video.weibocdn.com/o0/xyz.mp4");
        fixture.write_corpus("a.json", vec![post, text_post("P2")]);

        let engine = MockEngine::new(r#"{"post_id": "P1"}"#);
        let fetcher = MockFetcher::new();
        let summary = Extractor::new(engine.clone(), fetcher.clone(), fixture.config())
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(summary.bad_videos, 1);
        assert_eq!(fetcher.call_count(), 0);

        let entries = fixture.journal();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].result.media_used.videos.is_empty());
        assert_eq!(entries[0].result.media_used.images, vec![image.display().to_string()]);
        assert_eq!(entries[0].result.extraction, json!({"post_id": "P1"}));

        let sent = engine.requests();
        assert_eq!(sent[0].images().count(), 1);
        assert_eq!(sent[0].videos().count(), 0);

        let records: Vec<BadVideoRecord> = read_jsonl(&fixture.config().bad_video_log);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].post_id, "P1");
        assert!(records[0].video_path.ends_with("20240501_P1.mp4"));
        assert_eq!(records[0].media_root, fixture.corpus_dir().display().to_string());
    }

    #[tokio::test]
    async fn test_skip_videos_never_sends_video() {
        let fixture = Fixture::new();
        fixture.write("video/20240501_P1.mp4", b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00");
        let mut post = text_post("P1");
        post["video_url"] = json!("https://f.video.weibocdn.com/o0/xyz.mp4");
        fixture.write_corpus("a.json", vec![post]);

        let mut config = fixture.config();
        config.skip_videos = true;
        let engine = MockEngine::default();
        Extractor::new(engine.clone(), MockFetcher::new(), config)
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(engine.requests()[0].videos().count(), 0);
        assert!(fixture.journal()[0].result.media_used.videos.is_empty());
    }

    #[tokio::test]
    async fn test_non_json_output_is_stored_raw() {
        let fixture = Fixture::new();
        fixture.write_corpus("a.json", vec![text_post("P1"), text_post("P2")]);

        let engine = MockEngine::new("{}");
        engine.push_response("not json");
        let summary = Extractor::new(engine, MockFetcher::new(), fixture.config())
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.degraded, 1);
        let entries = fixture.journal();
        assert_eq!(entries[0].result.extraction, json!({"_raw": "not json"}));
        assert_eq!(entries[1].result.extraction, json!({}));
    }

    #[tokio::test]
    async fn test_posts_without_id_are_skipped() {
        let fixture = Fixture::new();
        fixture.write_corpus("a.json", vec![text_post(""), text_post("P1")]);

        let summary = Extractor::new(MockEngine::default(), MockFetcher::new(), fixture.config())
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(summary.posts_seen, 2);
        assert_eq!(summary.skipped_no_id, 1);
        assert_eq!(ids(&fixture.journal()), vec!["P1"]);
    }

    #[tokio::test]
    async fn test_malformed_corpus_aborts_after_flushing_bad_videos() {
        let fixture = Fixture::new();
        fixture.write("video/20240501_P1.mp4", b"garbage");
        let mut post = text_post("P1");
        post["video_url"] = json!("https://f.video.weibocdn.com/o0/xyz.mp4");
        fixture.write_corpus("a.json", vec![post]);
        fixture.write("b.json", br#"{"user": {"id": "u1"}}"#);

        let result = Extractor::new(MockEngine::default(), MockFetcher::new(), fixture.config())
            .unwrap()
            .run()
            .await;

        assert!(matches!(result, Err(ExtractorError::Corpus { .. })));
        assert_eq!(ids(&fixture.journal()), vec!["P1"]);
        let records: Vec<BadVideoRecord> = read_jsonl(&fixture.config().bad_video_log);
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_engine_failure_is_fatal() {
        let fixture = Fixture::new();
        fixture.write_corpus("a.json", vec![text_post("P1"), text_post("P2")]);

        let engine = MockEngine::default();
        engine.push_error();
        let result = Extractor::new(engine, MockFetcher::new(), fixture.config())
            .unwrap()
            .run()
            .await;

        assert!(matches!(result, Err(ExtractorError::Llm(_))));
        assert!(fixture.journal().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_image_is_fatal() {
        let fixture = Fixture::new();
        fixture.write(&format!("img/{}/20240501_P1.jpg", ORIGINAL_PICTURES_DIR), b"not an image");
        let mut post = text_post("P1");
        post["original_pictures"] = json!("https://wx1.sinaimg.cn/large/abc.jpg");
        fixture.write_corpus("a.json", vec![post]);

        let result = Extractor::new(MockEngine::default(), MockFetcher::new(), fixture.config())
            .unwrap()
            .run()
            .await;
        assert!(matches!(result, Err(ExtractorError::Llm(_))));
    }

    #[tokio::test]
    async fn test_explicit_media_root_overrides_corpus_dir() {
        let fixture = Fixture::new();
        let media = fixture.dir.path().join("media");
        let image = media.join(format!("img/{}/20240501_P1.jpg", ORIGINAL_PICTURES_DIR));
        fs::create_dir_all(image.parent().unwrap()).unwrap();
        fs::write(&image, JPEG).unwrap();
        let mut post = text_post("P1");
        post["original_pictures"] = json!("https://wx1.sinaimg.cn/large/abc.jpg");
        fixture.write_corpus("a.json", vec![post]);

        let mut config = fixture.config();
        config.media_root = Some(media);
        Extractor::new(MockEngine::default(), MockFetcher::new(), config)
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(
            fixture.journal()[0].result.media_used.images,
            vec![image.display().to_string()]
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = ExtractorConfig::for_root("data");
        config.max_images = 0;
        let result = Extractor::new(MockEngine::default(), MockFetcher::new(), config);
        assert!(matches!(result, Err(ExtractorError::Config(_))));
    }
}
