//! Capture request parsing: header validation, the enumerated settings bag
//! and output path resolution.
//!
//! Every field but `url` is optional; numeric fields coerce to their
//! defaults instead of rejecting the request, matching the service's
//! wire contract.

use axum::http::HeaderMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::{ServiceConfig, Viewport};

/// Sub-region of the rendered page captured into the output image.
///
/// Parsed from the `clipRect` header, which carries a JSON object such as
/// `{ "top": 14, "left": 3, "width": 400, "height": 300 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ClipRect {
    pub top: i32,
    pub left: i32,
    pub width: u32,
    pub height: u32,
}

/// The fixed set of render-surface settings a request may carry.
///
/// These are the only recognized settings headers; anything else on the
/// request is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    JavascriptEnabled,
    LoadImages,
    LocalToRemoteUrlAccessEnabled,
    UserAgent,
    UserName,
    Password,
}

impl SettingKey {
    /// All recognized keys, in wire order.
    pub const ALL: [SettingKey; 6] = [
        SettingKey::JavascriptEnabled,
        SettingKey::LoadImages,
        SettingKey::LocalToRemoteUrlAccessEnabled,
        SettingKey::UserAgent,
        SettingKey::UserName,
        SettingKey::Password,
    ];

    /// The header name carrying this setting.
    pub fn header_name(self) -> &'static str {
        match self {
            SettingKey::JavascriptEnabled => "javascriptEnabled",
            SettingKey::LoadImages => "loadImages",
            SettingKey::LocalToRemoteUrlAccessEnabled => "localToRemoteUrlAccessEnabled",
            SettingKey::UserAgent => "userAgent",
            SettingKey::UserName => "userName",
            SettingKey::Password => "password",
        }
    }
}

/// A coerced setting value: the literal strings `"true"` and `"false"`
/// become flags, everything else passes through as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Flag(bool),
    Text(String),
}

impl SettingValue {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "false" => SettingValue::Flag(false),
            "true" => SettingValue::Flag(true),
            _ => SettingValue::Text(raw.to_string()),
        }
    }

    /// Flag value, treating non-flag text as "not disabled".
    pub fn as_flag(&self) -> bool {
        match self {
            SettingValue::Flag(b) => *b,
            SettingValue::Text(_) => true,
        }
    }
}

/// Settings supplied by the request, one optional slot per recognized key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceSettings {
    pub javascript_enabled: Option<SettingValue>,
    pub load_images: Option<SettingValue>,
    pub local_to_remote_url_access: Option<SettingValue>,
    pub user_agent: Option<SettingValue>,
    pub user_name: Option<SettingValue>,
    pub password: Option<SettingValue>,
}

impl SurfaceSettings {
    fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let mut settings = SurfaceSettings::default();
        for key in SettingKey::ALL {
            let Some(value) = headers.get(key.header_name()) else {
                continue;
            };
            let raw = value.to_str().map_err(|e| {
                Error::HeaderParse(format!("invalid {} header: {}", key.header_name(), e))
            })?;
            let coerced = SettingValue::from_raw(raw);
            *settings.slot_mut(key) = Some(coerced);
        }
        Ok(settings)
    }

    fn slot_mut(&mut self, key: SettingKey) -> &mut Option<SettingValue> {
        match key {
            SettingKey::JavascriptEnabled => &mut self.javascript_enabled,
            SettingKey::LoadImages => &mut self.load_images,
            SettingKey::LocalToRemoteUrlAccessEnabled => &mut self.local_to_remote_url_access,
            SettingKey::UserAgent => &mut self.user_agent,
            SettingKey::UserName => &mut self.user_name,
            SettingKey::Password => &mut self.password,
        }
    }

    fn slot(&self, key: SettingKey) -> &Option<SettingValue> {
        match key {
            SettingKey::JavascriptEnabled => &self.javascript_enabled,
            SettingKey::LoadImages => &self.load_images,
            SettingKey::LocalToRemoteUrlAccessEnabled => &self.local_to_remote_url_access,
            SettingKey::UserAgent => &self.user_agent,
            SettingKey::UserName => &self.user_name,
            SettingKey::Password => &self.password,
        }
    }

    /// Iterate the supplied settings in wire order.
    pub fn entries(&self) -> impl Iterator<Item = (SettingKey, &SettingValue)> {
        SettingKey::ALL
            .into_iter()
            .filter_map(|key| self.slot(key).as_ref().map(|value| (key, value)))
    }
}

/// One capture request, owned exclusively by the HTTP request handling it.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub url: String,
    pub filename: Option<String>,
    pub viewport: Viewport,
    pub clip_rect: Option<ClipRect>,
    pub delay_ms: u64,
    pub settings: SurfaceSettings,
    /// Computed output location; always non-empty and deterministic
    /// given (base_path, filename, url).
    pub resolved_path: String,
}

impl CaptureRequest {
    /// Validate and parse the inbound headers into a `CaptureRequest`.
    ///
    /// A missing `url` header fails with [`Error::MissingUrlHeader`];
    /// malformed `clipRect` JSON or an unreadable settings header fails
    /// with a parse error. Width, height and delay coerce to defaults
    /// when absent or non-numeric.
    pub fn from_headers(headers: &HeaderMap, config: &ServiceConfig) -> Result<Self> {
        let url = headers
            .get("url")
            .ok_or(Error::MissingUrlHeader)?
            .to_str()
            .map_err(|e| Error::HeaderParse(format!("invalid url header: {}", e)))?
            .to_string();

        let filename = headers
            .get("filename")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let viewport = Viewport {
            width: int_header(headers, "width").unwrap_or(config.default_viewport.width),
            height: int_header(headers, "height").unwrap_or(config.default_viewport.height),
        };

        let clip_rect = match headers.get("clipRect") {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|e| Error::HeaderParse(format!("invalid clipRect header: {}", e)))?;
                let rect = serde_json::from_str::<ClipRect>(raw)
                    .map_err(|e| Error::HeaderParse(format!("invalid clipRect: {}", e)))?;
                Some(rect)
            }
            None => None,
        };

        let delay_ms = int_header::<u64>(headers, "delay").unwrap_or(0);

        let settings = SurfaceSettings::from_headers(headers)?;

        let resolved_path = resolve_output_path(&config.base_path, filename.as_deref(), &url);

        Ok(Self {
            url,
            filename,
            viewport,
            clip_rect,
            delay_ms,
            settings,
            resolved_path,
        })
    }
}

fn int_header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<T>().ok())
}

/// Derive the output file path for a capture.
///
/// With an explicit `filename` the result is `base_path + filename`
/// verbatim; the filename is caller-controlled and deliberately not
/// sanitized. Without one, the URL's leading `http://` or `https://`
/// scheme is stripped, every `/` becomes `.` and `.png` is appended,
/// so `http://www.google.com/a` resolves to `www.google.com.a.png`
/// under the base path.
///
/// Pure and deterministic; performs no I/O and cannot fail.
pub fn resolve_output_path(base_path: &str, filename: Option<&str>, url: &str) -> String {
    match filename {
        Some(name) => format!("{}{}", base_path, name),
        None => {
            let stripped = url
                .strip_prefix("http://")
                .or_else(|| url.strip_prefix("https://"))
                .unwrap_or(url);
            format!("{}{}.png", base_path, stripped.replace('/', "."))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn resolve_path_from_url() {
        assert_eq!(
            resolve_output_path("/tmp/", None, "http://a.com/x/y"),
            "/tmp/a.com.x.y.png"
        );
        assert_eq!(
            resolve_output_path("/srv/shots/", None, "https://www.google.com"),
            "/srv/shots/www.google.com.png"
        );
        // no scheme: the url is used as-is
        assert_eq!(
            resolve_output_path("/tmp/", None, "a.com/x"),
            "/tmp/a.com.x.png"
        );
    }

    #[test]
    fn resolve_path_with_filename_is_verbatim() {
        assert_eq!(
            resolve_output_path("/tmp/", Some("f.png"), "http://whatever/"),
            "/tmp/f.png"
        );
        // caller-controlled, by contract not sanitized
        assert_eq!(
            resolve_output_path("/tmp/", Some("../f.png"), "http://whatever/"),
            "/tmp/../f.png"
        );
    }

    #[test]
    fn setting_value_coercion() {
        assert_eq!(SettingValue::from_raw("false"), SettingValue::Flag(false));
        assert_eq!(SettingValue::from_raw("true"), SettingValue::Flag(true));
        assert_eq!(
            SettingValue::from_raw("Mozilla/5.0"),
            SettingValue::Text("Mozilla/5.0".to_string())
        );
        // only the exact literals coerce
        assert_eq!(
            SettingValue::from_raw("True"),
            SettingValue::Text("True".to_string())
        );
    }

    #[test]
    fn missing_url_header_is_rejected() {
        let config = ServiceConfig::default();
        let err = CaptureRequest::from_headers(&headers(&[]), &config).unwrap_err();
        assert!(matches!(err, Error::MissingUrlHeader));
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn defaults_apply_when_headers_absent() {
        let config = ServiceConfig::default();
        let req =
            CaptureRequest::from_headers(&headers(&[("url", "http://a.com/x")]), &config).unwrap();
        assert_eq!(req.viewport, Viewport::default());
        assert_eq!(req.delay_ms, 0);
        assert!(req.clip_rect.is_none());
        assert_eq!(req.resolved_path, "/tmp/a.com.x.png");
    }

    #[test]
    fn non_numeric_dimensions_coerce_to_defaults() {
        let config = ServiceConfig::default();
        let req = CaptureRequest::from_headers(
            &headers(&[("url", "http://a.com"), ("width", "wide"), ("height", "480")]),
            &config,
        )
        .unwrap();
        assert_eq!(req.viewport.width, 1024);
        assert_eq!(req.viewport.height, 480);
    }

    #[test]
    fn clip_rect_parses_from_json() {
        let config = ServiceConfig::default();
        let req = CaptureRequest::from_headers(
            &headers(&[
                ("url", "http://a.com"),
                (
                    "clipRect",
                    r#"{ "top": 14, "left": 3, "width": 400, "height": 300 }"#,
                ),
            ]),
            &config,
        )
        .unwrap();
        assert_eq!(
            req.clip_rect,
            Some(ClipRect {
                top: 14,
                left: 3,
                width: 400,
                height: 300
            })
        );
    }

    #[test]
    fn malformed_clip_rect_is_a_parse_error() {
        let config = ServiceConfig::default();
        let err = CaptureRequest::from_headers(
            &headers(&[("url", "http://a.com"), ("clipRect", "{not json")]),
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, Error::HeaderParse(_)));
        assert_eq!(err.http_status(), 500);
        assert!(err.to_string().contains("clipRect"));
    }

    #[test]
    fn settings_collect_in_wire_order() {
        let config = ServiceConfig::default();
        let req = CaptureRequest::from_headers(
            &headers(&[
                ("url", "http://a.com"),
                ("javascriptEnabled", "false"),
                ("userAgent", "TestBot/1.0"),
            ]),
            &config,
        )
        .unwrap();
        let entries: Vec<_> = req.settings.entries().collect();
        assert_eq!(
            entries,
            vec![
                (SettingKey::JavascriptEnabled, &SettingValue::Flag(false)),
                (
                    SettingKey::UserAgent,
                    &SettingValue::Text("TestBot/1.0".to_string())
                ),
            ]
        );
    }

    #[test]
    fn unknown_headers_are_ignored() {
        let config = ServiceConfig::default();
        let req = CaptureRequest::from_headers(
            &headers(&[("url", "http://a.com"), ("x-unknown", "whatever")]),
            &config,
        )
        .unwrap();
        assert_eq!(req.settings, SurfaceSettings::default());
    }
}
