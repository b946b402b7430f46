use std::path::Path;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tiny_http::{Header, Response, Server};

use yt_comment_lens::data::{collect_comments, YouTubeCommentService};
use yt_comment_lens::pipeline::{Outcome, Pipeline, PipelineError, RunRequest, SectionStatus, Settings};
use yt_comment_lens::youtube::{self, ApiError};

const PAGE_ONE: &str = r#"{
    "nextPageToken": "p2",
    "items": [
        {"snippet": {"topLevelComment": {"snippet": {
            "textDisplay": "맛집 맛집 좋다", "publishedAt": "2024-03-01T09:15:00Z"}}}},
        {"snippet": {"topLevelComment": {"snippet": {
            "textDisplay": "좋다 좋다", "publishedAt": "2024-03-01T09:40:00Z"}}}}
    ]
}"#;

const PAGE_TWO: &str = r#"{
    "items": [
        {"snippet": {"topLevelComment": {"snippet": {
            "textDisplay": "영상 최고", "publishedAt": "2024-03-01T21:00:00Z"}}}}
    ]
}"#;

const QUOTA_ERROR: &str = r#"{"error": {"code": 403, "message": "quota exhausted", "errors": [{"reason": "quotaExceeded", "domain": "youtube.quota"}]}}"#;

struct MockApi {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

/// Serves two comment pages, or a quota error once `fail_second` is set and
/// the second page is requested.
fn spawn_api(fail_second: bool) -> MockApi {
    let server = Server::http("127.0.0.1:0").expect("bind mock api");
    let base_url = format!("http://{}/youtube/v3/", server.server_addr());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);
    thread::spawn(move || {
        for req in server.incoming_requests() {
            let url = req.url().to_string();
            seen.lock().push(url.clone());
            let (status, body) = if url.contains("pageToken=p2") {
                if fail_second {
                    (403, QUOTA_ERROR)
                } else {
                    (200, PAGE_TWO)
                }
            } else {
                (200, PAGE_ONE)
            };
            let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .expect("valid header");
            let _ = req.respond(
                Response::from_string(body)
                    .with_status_code(status)
                    .with_header(header),
            );
        }
    });
    MockApi { base_url, requests }
}

fn service(api: &MockApi) -> YouTubeCommentService {
    let client = youtube::Client::new(youtube::ClientConfig {
        api_key: "test-key".into(),
        base_url: Some(api.base_url.clone()),
        page_size: 2,
        ..youtube::ClientConfig::default()
    })
    .expect("client");
    YouTubeCommentService::new(Arc::new(client))
}

fn settings(dir: &Path) -> Settings {
    Settings {
        font_path: Some(dir.join("no-such-font.ttf")),
        ..Settings::default()
    }
}

#[test]
fn follows_page_tokens_over_http() {
    let api = spawn_api(false);
    let collection = collect_comments(&service(&api), "abc123").expect("collect");
    assert_eq!(collection.pages, 2);
    assert_eq!(collection.comments.len(), 3);
    assert_eq!(collection.comments[2].text, "영상 최고");

    let requests = api.requests.lock().clone();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("/youtube/v3/commentThreads?"));
    assert!(requests[0].contains("videoId=abc123"));
    assert!(requests[0].contains("key=test-key"));
    assert!(requests[0].contains("maxResults=2"));
    assert!(!requests[0].contains("pageToken"));
    assert!(requests[1].contains("pageToken=p2"));
}

#[test]
fn pipeline_renders_from_mock_api() {
    let api = spawn_api(false);
    let dir = tempfile::tempdir().unwrap();
    let report = Pipeline::new(settings(dir.path()))
        .run(
            &service(&api),
            &RunRequest {
                url: "https://www.youtube.com/watch?v=abc123&t=30s".into(),
                out_dir: dir.path().to_path_buf(),
            },
        )
        .expect("run");

    assert_eq!(report.outcome, Outcome::Completed);
    assert_eq!(report.comment_count, 3);
    assert_eq!(report.top_words[0].token, "좋다");
    assert_eq!(report.top_words[0].count, 3);
    let nine = report.hourly.iter().find(|h| h.hour == 9).map(|h| h.count);
    assert_eq!(nine, Some(2));
    assert!(matches!(
        report.section("hourly"),
        Some(SectionStatus::Written { .. })
    ));

    let json = std::fs::read_to_string(dir.path().join("abc123").join("report.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["comment_count"], 3);
}

#[test]
fn api_error_surfaces_raw_payload() {
    let api = spawn_api(true);
    let dir = tempfile::tempdir().unwrap();
    let err = Pipeline::new(settings(dir.path()))
        .run(
            &service(&api),
            &RunRequest {
                url: "https://youtu.be/abc123".into(),
                out_dir: dir.path().to_path_buf(),
            },
        )
        .unwrap_err();

    match &err {
        PipelineError::Collect(ApiError::Api { code, reason, payload, .. }) => {
            assert_eq!(*code, 403);
            assert_eq!(reason, "quotaExceeded");
            assert!(payload.contains("youtube.quota"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!dir.path().join("abc123").exists());
}

#[test]
fn cli_prints_tables_against_mock_api() {
    use assert_cmd::prelude::*;
    use predicates::prelude::*;

    let api = spawn_api(false);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    std::process::Command::cargo_bin("yt-comment-lens")
        .unwrap()
        .arg("https://youtu.be/abc123")
        .args(["--api-key", "test-key", "--tokenizer", "regex", "--font"])
        .arg(dir.path().join("no-such-font.ttf"))
        .arg("--config")
        .arg(dir.path().join("config.yaml"))
        .arg("--out")
        .arg(&out)
        .env("YTCL_API__BASE_URL", &api.base_url)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 comments over 2 page(s)"))
        .stdout(predicate::str::contains("좋다"))
        .stdout(predicate::str::contains("wordcloud.png"))
        .stderr(predicate::str::contains("bundled default font"));

    assert!(out.join("abc123").join("wordcloud.png").exists());
    assert!(out.join("abc123").join("hourly.png").exists());
    assert!(out.join("abc123").join("report.json").exists());
}
