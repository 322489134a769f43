//! Chrome DevTools Protocol backend (uses the `headless_chrome` crate)
//!
//! The browser launch is deferred until `open` so the configured viewport
//! and settings are known before Chrome starts. One browser instance per
//! engine, torn down on release.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine as Base64Engine;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::warn;

use crate::engine::{OpenStatus, PageEngine, ResourceError};
use crate::error::{Error, Result};
use crate::request::{ClipRect, SettingKey, SettingValue};
use crate::Viewport;

pub struct ChromeEngine {
    viewport: Viewport,
    clip_rect: Option<ClipRect>,
    user_agent: Option<String>,
    user_name: Option<String>,
    password: Option<String>,
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
    last_resource_error: Option<ResourceError>,
}

impl ChromeEngine {
    pub fn new() -> Result<Self> {
        Ok(Self {
            viewport: Viewport::default(),
            clip_rect: None,
            user_agent: None,
            user_name: None,
            password: None,
            browser: None,
            tab: None,
            last_resource_error: None,
        })
    }

    fn record_resource_error(&mut self, reason: String, url: &str) {
        self.last_resource_error = Some(ResourceError {
            reason,
            url: url.to_string(),
        });
    }

    fn launch(&mut self) -> Result<Arc<Tab>> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((self.viewport.width, self.viewport.height)))
            .build()
            .map_err(|e| Error::SurfaceInit(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::SurfaceInit(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::SurfaceInit(format!("Failed to create tab: {}", e)))?;

        if let Some(ua) = &self.user_agent {
            tab.set_user_agent(ua, None, None)
                .map_err(|e| Error::Configure(format!("Failed to set user agent: {}", e)))?;
        }

        // userName/password become a basic-auth Authorization header
        if let Some(user) = &self.user_name {
            let credentials = format!("{}:{}", user, self.password.as_deref().unwrap_or(""));
            let auth = format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode(credentials)
            );
            let mut headers = HashMap::new();
            headers.insert("Authorization", auth.as_str());
            tab.set_extra_http_headers(headers)
                .map_err(|e| Error::Configure(format!("Failed to set headers: {}", e)))?;
        }

        self.browser = Some(browser);
        self.tab = Some(tab.clone());
        Ok(tab)
    }
}

fn clip_to_cdp(clip: ClipRect) -> Page::Viewport {
    Page::Viewport {
        x: clip.left as f64,
        y: clip.top as f64,
        width: clip.width as f64,
        height: clip.height as f64,
        scale: 1.0,
    }
}

impl PageEngine for ChromeEngine {
    fn name(&self) -> &'static str {
        "ChromeEngine"
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
            SettingKey::UserAgent => {
                if let SettingValue::Text(ua) = value {
                    self.user_agent = Some(ua.clone());
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
            SettingKey::JavascriptEnabled
            | SettingKey::LoadImages
            | SettingKey::LocalToRemoteUrlAccessEnabled => {
                // Chrome controls these itself; the CDP adapter does not
                // override them per page.
                warn!(
                    "{} is not supported by the Chrome backend",
                    key.header_name()
                );
            }
        }
        Ok(())
    }

    fn open(&mut self, url: &str) -> OpenStatus {
        let tab = match self.launch() {
            Ok(tab) => tab,
            Err(e) => {
                self.record_resource_error(e.to_string(), url);
                return OpenStatus::Failure;
            }
        };

        if let Err(e) = tab.navigate_to(url) {
            self.record_resource_error(format!("Navigation failed: {}", e), url);
            return OpenStatus::Failure;
        }

        if let Err(e) = tab.wait_until_navigated() {
            self.record_resource_error(format!("Wait for navigation failed: {}", e), url);
            return OpenStatus::Failure;
        }

        OpenStatus::Success
    }

    fn last_resource_error(&self) -> Option<ResourceError> {
        self.last_resource_error.clone()
    }

    fn render(&mut self, path: &str) -> Result<()> {
        let tab = self
            .tab
            .as_ref()
            .ok_or_else(|| Error::Render("no page has been opened".to_string()))?;

        let clip = self.clip_rect.map(clip_to_cdp);
        let data = tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, clip, true)
            .map_err(|e| Error::Render(format!("Screenshot failed: {}", e)))?;

        std::fs::write(path, data)
            .map_err(|e| Error::Render(format!("failed to write {}: {}", path, e)))?;
        Ok(())
    }

    fn release(&mut self) {
        // dropping the Browser tears the Chrome process down
        self.tab = None;
        self.browser = None;
        self.last_resource_error = None;
    }
}
