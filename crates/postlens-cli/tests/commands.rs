//! Offline passes driven through the command layer

use postlens_cli::cli::{AugmentArgs, ExportArgs, MediaMapArgs};
use postlens_cli::commands::{execute_augment, execute_export, media_map::run_media_map};
use postlens_cli::config::OutputFormat;
use postlens_cli::{CliError, Formatter};
use postlens_domain::{CorpusDocument, MediaMap};
use postlens_media::naming::ORIGINAL_PICTURES_DIR;
use postlens_media::MockFetcher;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn formatter() -> Formatter {
    Formatter::new(OutputFormat::Json, false)
}

fn write_corpus(path: &Path, posts: Value) {
    fs::write(path, json!({"user": {"id": "u1"}, "weibo": posts}).to_string()).unwrap();
}

#[tokio::test]
async fn test_media_map_writes_hash_hits() {
    let dir = TempDir::new().unwrap();
    let media = dir.path().join("media");
    let local = media.join("img").join(ORIGINAL_PICTURES_DIR).join("renamed.jpg");
    fs::create_dir_all(local.parent().unwrap()).unwrap();
    fs::write(&local, b"same bytes").unwrap();

    let corpus = dir.path().join("u1.json");
    write_corpus(
        &corpus,
        json!([{
            "id": "P1",
            "publish_time": "2024-05-01 10:00",
            "original_pictures": "https://wx1.sinaimg.cn/large/a.jpg,https://wx1.sinaimg.cn/large/b.jpg",
            "video_url": "无"
        }]),
    );

    let fetcher = MockFetcher::new()
        .with("https://wx1.sinaimg.cn/large/a.jpg", b"same bytes".to_vec())
        .with("https://wx1.sinaimg.cn/large/b.jpg", b"other".to_vec());
    let args = MediaMapArgs {
        corpus_file: corpus,
        media_root: media,
        output: dir.path().join("out/map.json"),
        skip_image: false,
        skip_video: false,
        fetch_timeout: 60,
    };
    run_media_map(&args, &fetcher, &formatter()).await.unwrap();

    let map: MediaMap = serde_json::from_str(&fs::read_to_string(&args.output).unwrap()).unwrap();
    assert_eq!(map.images.len(), 1);
    assert_eq!(
        map.images["https://wx1.sinaimg.cn/large/a.jpg"],
        local.to_string_lossy()
    );
    assert!(map.videos.is_empty());
}

#[test]
fn test_augment_writes_media_field() {
    let dir = TempDir::new().unwrap();
    let local = dir
        .path()
        .join("img")
        .join(ORIGINAL_PICTURES_DIR)
        .join("20240501_P1.jpg");
    fs::create_dir_all(local.parent().unwrap()).unwrap();
    fs::write(&local, b"jpg").unwrap();

    let corpus = dir.path().join("u1.json");
    write_corpus(
        &corpus,
        json!([{
            "id": "P1",
            "publish_time": "2024-05-01T10:00:00",
            "original_pictures": "https://wx1.sinaimg.cn/large/a.jpg",
            "comments_count": 4
        }]),
    );

    let args = AugmentArgs {
        corpus_file: corpus.clone(),
        media_root: dir.path().to_path_buf(),
        output: Some(dir.path().join("augmented.json")),
    };
    execute_augment(args, &formatter()).unwrap();

    let doc = CorpusDocument::from_json(&fs::read_to_string(dir.path().join("augmented.json")).unwrap())
        .unwrap();
    let media = doc.weibo[0].media.as_ref().unwrap();
    assert_eq!(media.original_pictures[0].path, local.to_string_lossy());
    assert_eq!(doc.weibo[0].extra["comments_count"], 4);
    assert_eq!(doc.rest["user"]["id"], "u1");
    // the source file is untouched when an output is given
    assert!(CorpusDocument::from_json(&fs::read_to_string(&corpus).unwrap()).unwrap().weibo[0]
        .media
        .is_none());
}

#[test]
fn test_export_rewrites_media_used() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("extractions.jsonl");
    fs::write(
        &input,
        concat!(
            "{\"meta\": {\"post_id\": \"P1\"}, \"result\": {\"post_id\": \"P1\", \"extraction\": {}, ",
            "\"media_used\": {\"images\": [\"/srv/data/weibo/img/a.jpg\"], \"videos\": []}}}\n",
            "broken\n"
        ),
    )
    .unwrap();

    let output = dir.path().join("web.jsonl");
    let args = ExportArgs {
        input,
        output: output.clone(),
        media_base_url: "https://cdn.example.com/".into(),
        local_prefix: Some("/srv/data/".into()),
    };
    execute_export(args, &formatter()).unwrap();

    let text = fs::read_to_string(&output).unwrap();
    assert_eq!(text.lines().count(), 1);
    let record: Value = serde_json::from_str(text.trim()).unwrap();
    assert_eq!(
        record["result"]["media_used"]["images"][0],
        "https://cdn.example.com/weibo/img/a.jpg"
    );
}

#[test]
fn test_export_rejects_blank_base_url() {
    let dir = TempDir::new().unwrap();
    let args = ExportArgs {
        input: dir.path().join("in.jsonl"),
        output: dir.path().join("out.jsonl"),
        media_base_url: "  ".into(),
        local_prefix: None,
    };
    assert!(matches!(
        execute_export(args, &formatter()),
        Err(CliError::InvalidInput(_))
    ));
}
