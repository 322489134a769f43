//! Integration tests for the HTTP surface, using a scripted engine behind
//! the real listener.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rasterd::engine::{EngineFactory, OpenStatus, PageEngine, ResourceError};
use rasterd::request::{ClipRect, SettingKey, SettingValue};
use rasterd::{RasterService, Result, ServiceConfig, ServiceHandle, Viewport};

/// Engine scripted through the requested URL: anything containing "fail"
/// fails to open with a canned reason, everything else opens and renders
/// a tiny PNG stub to the target path.
#[derive(Default)]
struct MockEngine {
    last_error: Option<ResourceError>,
}

impl PageEngine for MockEngine {
    fn name(&self) -> &'static str {
        "MockEngine"
    }

    fn set_viewport(&mut self, _viewport: Viewport) -> Result<()> {
        Ok(())
    }

    fn set_clip_rect(&mut self, _clip: ClipRect) -> Result<()> {
        Ok(())
    }

    fn apply_setting(&mut self, _key: SettingKey, _value: &SettingValue) -> Result<()> {
        Ok(())
    }

    fn open(&mut self, url: &str) -> OpenStatus {
        if url.contains("fail") {
            self.last_error = Some(ResourceError {
                reason: "Host not found".to_string(),
                url: url.to_string(),
            });
            OpenStatus::Failure
        } else {
            OpenStatus::Success
        }
    }

    fn last_resource_error(&self) -> Option<ResourceError> {
        self.last_error.clone()
    }

    fn render(&mut self, path: &str) -> Result<()> {
        std::fs::write(path, b"\x89PNG\r\n\x1a\nmock")
            .map_err(|e| rasterd::Error::Render(e.to_string()))
    }

    fn release(&mut self) {}
}

fn mock_factory() -> EngineFactory {
    Arc::new(|| Ok(Box::new(MockEngine::default()) as Box<dyn PageEngine>))
}

async fn start_service(base_path: String) -> (ServiceHandle, String) {
    let config = ServiceConfig {
        base_path,
        port: 0,
        ..Default::default()
    };
    let handle = RasterService::with_engine_factory(config, mock_factory())
        .start()
        .await
        .expect("service starts");
    let base_url = format!("http://127.0.0.1:{}", handle.addr().port());
    (handle, base_url)
}

fn shots_dir() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("tempdir");
    let base_path = format!("{}/", dir.path().display());
    (dir, base_path)
}

#[tokio::test(flavor = "multi_thread")]
async fn health_check_is_always_up() {
    let (_dir, base_path) = shots_dir();
    let (handle, base_url) = start_service(base_path).await;

    let response = reqwest::get(format!("{}/healthCheck", base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "up");

    handle.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_url_header_is_400() {
    let (_dir, base_path) = shots_dir();
    let (handle, base_url) = start_service(base_path).await;

    let response = reqwest::get(&base_url).await.unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(
        response.text().await.unwrap(),
        "Error: Request must contain an url header\n"
    );

    handle.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_clip_rect_is_500() {
    let (_dir, base_path) = shots_dir();
    let (handle, base_url) = start_service(base_path).await;

    let client = reqwest::Client::new();
    let response = client
        .get(&base_url)
        .header("url", "http://ok.test/")
        .header("clipRect", "{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    let body = response.text().await.unwrap();
    assert!(body.starts_with("Error while parsing headers: "), "{}", body);
    assert!(body.contains("clipRect"), "{}", body);

    handle.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn successful_capture_writes_the_resolved_file() {
    let (_dir, base_path) = shots_dir();
    let expected_path = format!("{}ok.test.x.y.png", base_path);
    let (handle, base_url) = start_service(base_path).await;

    let client = reqwest::Client::new();
    let response = client
        .get(&base_url)
        .header("url", "http://ok.test/x/y")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.text().await.unwrap(),
        format!("Success: Screenshot saved to {}\n", expected_path)
    );

    let written = std::fs::read(&expected_path).expect("screenshot written");
    assert_eq!(&written[0..8], b"\x89PNG\r\n\x1a\n");

    handle.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn filename_header_is_used_verbatim() {
    let (_dir, base_path) = shots_dir();
    let expected_path = format!("{}custom.png", base_path);
    let (handle, base_url) = start_service(base_path).await;

    let client = reqwest::Client::new();
    let response = client
        .get(&base_url)
        .header("url", "http://ok.test/whatever")
        .header("filename", "custom.png")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(std::path::Path::new(&expected_path).exists());

    handle.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_navigation_is_502_with_url_and_reason() {
    let (_dir, base_path) = shots_dir();
    let (handle, base_url) = start_service(base_path).await;

    let client = reqwest::Client::new();
    let response = client
        .get(&base_url)
        .header("url", "http://fail.test/")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
    assert_eq!(
        response.text().await.unwrap(),
        "MockEngine could not open the WebPage [http://fail.test/] because: Host not found"
    );

    handle.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn method_and_path_are_ignored_for_captures() {
    let (_dir, base_path) = shots_dir();
    let (handle, base_url) = start_service(base_path).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/any/old/path", base_url))
        .header("url", "http://ok.test/p")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    handle.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_render_still_reports_the_final_body() {
    let (_dir, base_path) = shots_dir();
    let expected_path = format!("{}slow.test.png", base_path);
    let (handle, base_url) = start_service(base_path).await;

    // the delay pushes rendering well past the 500 ms grace period, so
    // the status line is committed early and the body streams in at
    // completion
    let started = Instant::now();
    let client = reqwest::Client::new();
    let response = client
        .get(&base_url)
        .header("url", "http://slow.test")
        .header("delay", "800")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert_eq!(
        body,
        format!("Success: Screenshot saved to {}\n", expected_path)
    );
    assert!(
        started.elapsed() >= Duration::from_millis(800),
        "body must not settle before the render delay has run"
    );

    handle.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn health_check_responds_while_a_capture_is_in_flight() {
    let (_dir, base_path) = shots_dir();
    let (handle, base_url) = start_service(base_path).await;

    let capture_url = base_url.clone();
    let capture = tokio::spawn(async move {
        let client = reqwest::Client::new();
        client
            .get(&capture_url)
            .header("url", "http://ok.test/slow")
            .header("delay", "700")
            .send()
            .await
            .unwrap()
    });

    // the capture is still pending while this runs
    tokio::time::sleep(Duration::from_millis(100)).await;
    let started = Instant::now();
    let health = reqwest::get(format!("{}/healthCheck", base_url))
        .await
        .unwrap();
    assert_eq!(health.status(), 200);
    assert_eq!(health.text().await.unwrap(), "up");
    assert!(started.elapsed() < Duration::from_millis(500));

    let response = capture.await.unwrap();
    assert_eq!(response.status(), 200);

    handle.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn capture_failures_do_not_poison_the_listener() {
    let (_dir, base_path) = shots_dir();
    let (handle, base_url) = start_service(base_path).await;

    let client = reqwest::Client::new();
    let failed = client
        .get(&base_url)
        .header("url", "http://fail.test/")
        .send()
        .await
        .unwrap();
    assert_eq!(failed.status(), 502);

    let ok = client
        .get(&base_url)
        .header("url", "http://ok.test/after")
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), 200);

    let health = reqwest::get(format!("{}/healthCheck", base_url))
        .await
        .unwrap();
    assert_eq!(health.status(), 200);

    handle.stop().await;
}
