//! Pure-Rust page engine: blocking fetch + wireframe raster
//!
//! Fetches the document over HTTP, records resource-load failures as
//! diagnostic context, and rasterizes a wireframe of the page through
//! `crate::rendering`. No JavaScript executes in this backend.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use scraper::{Html, Selector};

use crate::engine::{OpenStatus, PageEngine, ResourceError};
use crate::error::{Error, Result};
use crate::rendering;
use crate::request::{ClipRect, SettingKey, SettingValue};
use crate::Viewport;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 rasterd/0.1";
const FETCH_TIMEOUT_MS: u64 = 30_000;

// Upper bound on image subresources probed per page.
const MAX_IMAGE_PROBES: usize = 16;

pub struct FetchEngine {
    client: Client,
    viewport: Viewport,
    clip_rect: Option<ClipRect>,
    user_agent: String,
    load_images: bool,
    user_name: Option<String>,
    password: Option<String>,
    page_html: Option<String>,
    last_resource_error: Option<ResourceError>,
}

impl FetchEngine {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(FETCH_TIMEOUT_MS))
            .build()
            .map_err(|e| Error::SurfaceInit(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            viewport: Viewport::default(),
            clip_rect: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            load_images: true,
            user_name: None,
            password: None,
            page_html: None,
            last_resource_error: None,
        })
    }

    fn record_resource_error(&mut self, reason: String, url: &str) {
        self.last_resource_error = Some(ResourceError {
            reason,
            url: url.to_string(),
        });
    }

    /// Probe `<img src>` subresources so broken images surface as resource
    /// errors, the way a full engine would report them while loading.
    /// Only absolute http(s) sources are probed, up to a fixed cap.
    fn probe_images(&mut self, html: &str) {
        let document = Html::parse_document(html);
        let img_sel = Selector::parse("img[src]").unwrap();
        let sources: Vec<String> = document
            .select(&img_sel)
            .filter_map(|img| img.value().attr("src"))
            .filter(|src| src.starts_with("http://") || src.starts_with("https://"))
            .take(MAX_IMAGE_PROBES)
            .map(str::to_string)
            .collect();

        for src in sources {
            if let Err(e) = self.client.head(&src).send() {
                debug!("image probe failed for {}: {}", src, e);
                self.record_resource_error(e.to_string(), &src);
            }
        }
    }
}

impl PageEngine for FetchEngine {
    fn name(&self) -> &'static str {
        "FetchEngine"
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.viewport = viewport;
        Ok(())
    }

    fn set_clip_rect(&mut self, clip: ClipRect) -> Result<()> {
        self.clip_rect = Some(clip);
        Ok(())
    }

    fn apply_setting(&mut self, key: SettingKey, value: &SettingValue) -> Result<()> {
        match key {
            SettingKey::LoadImages => self.load_images = value.as_flag(),
            SettingKey::UserAgent => {
                if let SettingValue::Text(ua) = value {
                    self.user_agent = ua.clone();
                }
            }
            SettingKey::UserName => {
                if let SettingValue::Text(name) = value {
                    self.user_name = Some(name.clone());
                }
            }
            SettingKey::Password => {
                if let SettingValue::Text(password) = value {
                    self.password = Some(password.clone());
                }
            }
            // no JavaScript and no local documents in this backend
            SettingKey::JavascriptEnabled | SettingKey::LocalToRemoteUrlAccessEnabled => {
                debug!("{} has no effect on the fetch engine", key.header_name());
            }
        }
        Ok(())
    }

    fn open(&mut self, url: &str) -> OpenStatus {
        let mut request = self.client.get(url).header("User-Agent", self.user_agent.clone());
        if let Some(user) = &self.user_name {
            request = request.basic_auth(user, self.password.as_deref());
        }

        let response = match request.send() {
            Ok(response) => response,
            Err(e) => {
                self.record_resource_error(e.to_string(), url);
                return OpenStatus::Failure;
            }
        };

        let status = response.status();
        let body = match response.text() {
            Ok(body) => body,
            Err(e) => {
                self.record_resource_error(e.to_string(), url);
                return OpenStatus::Failure;
            }
        };

        // Non-2xx documents still open; engines render error pages. The
        // status is kept as diagnostic context only.
        if !status.is_success() {
            self.record_resource_error(format!("HTTP status {}", status), url);
        }

        if self.load_images {
            self.probe_images(&body);
        }

        self.page_html = Some(body);
        OpenStatus::Success
    }

    fn last_resource_error(&self) -> Option<ResourceError> {
        self.last_resource_error.clone()
    }

    fn render(&mut self, path: &str) -> Result<()> {
        let html = self
            .page_html
            .as_ref()
            .ok_or_else(|| Error::Render("no page has been opened".to_string()))?;

        let document = Html::parse_document(html);
        let shot = rendering::rasterize_document(&document, self.viewport, self.clip_rect)?;
        std::fs::write(path, &shot.png_data)
            .map_err(|e| Error::Render(format!("failed to write {}: {}", path, e)))?;

        debug!(
            "rasterized {}x{} wireframe to {}",
            shot.width, shot.height, path
        );
        Ok(())
    }

    fn release(&mut self) {
        self.page_html = None;
        self.last_resource_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_mutate_the_engine() {
        let mut engine = FetchEngine::new().unwrap();
        engine
            .apply_setting(SettingKey::LoadImages, &SettingValue::Flag(false))
            .unwrap();
        assert!(!engine.load_images);

        engine
            .apply_setting(
                SettingKey::UserAgent,
                &SettingValue::Text("TestBot/1.0".into()),
            )
            .unwrap();
        assert_eq!(engine.user_agent, "TestBot/1.0");

        // flags aimed at text settings leave the engine unchanged
        engine
            .apply_setting(SettingKey::UserAgent, &SettingValue::Flag(true))
            .unwrap();
        assert_eq!(engine.user_agent, "TestBot/1.0");
    }

    #[test]
    fn failed_open_records_a_resource_error() {
        let mut engine = FetchEngine::new().unwrap();
        // nothing listens on port 1
        let status = engine.open("http://127.0.0.1:1/");
        assert_eq!(status, OpenStatus::Failure);
        let err = engine.last_resource_error().expect("resource error recorded");
        assert_eq!(err.url, "http://127.0.0.1:1/");
        assert!(!err.reason.is_empty());
    }

    #[test]
    fn render_without_open_fails() {
        let mut engine = FetchEngine::new().unwrap();
        let err = engine.render("/tmp/never-written.png").unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn release_clears_page_state() {
        let mut engine = FetchEngine::new().unwrap();
        engine.page_html = Some("<html></html>".into());
        engine.release();
        assert!(engine.page_html.is_none());
    }
}
