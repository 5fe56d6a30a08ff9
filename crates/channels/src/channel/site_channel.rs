use crate::channel::default::DEFAULT_UA;
use crate::channel::settings::ChannelSettings;
use crate::media::MediaItem;

use super::error::ChannelError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, warn};

/// Static description of a channel.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelInfo {
    // code of the channel, e.g. "svt", "oppetarkiv"
    pub code: String,
    // display name, e.g. "SVT Play"
    pub name: String,
    pub description: String,
    // ISO 639-1 language of the content
    pub language: String,
    pub icon: Option<String>,
}

impl ChannelInfo {
    pub fn new<S1: Into<String>, S2: Into<String>, S3: Into<String>, S4: Into<String>>(
        code: S1,
        name: S2,
        description: S3,
        language: S4,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description: description.into(),
            language: language.into(),
            icon: None,
        }
    }
}

/// Shared plumbing of every channel: http client, headers, cookies and
/// the user settings.
///
/// Each channel instance keeps its own header set and cookie store, so
/// session state of one site never leaks into another.
///
/// # Example Usage
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), channels_parser::channel::error::ChannelError> {
/// use channels_parser::channel::{
///     default_client,
///     settings::ChannelSettings,
///     site_channel::{ChannelBase, ChannelInfo},
/// };
///
/// let info = ChannelInfo::new("svt", "SVT Play", "Swedish public television", "sv");
/// let mut base = ChannelBase::new(info, default_client()?, ChannelSettings::default());
/// base.set_cookies_from_string("consent=1; lang=sv");
///
/// let html = base.get_text("https://www.svtplay.se/").await?;
/// # let _ = html;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChannelBase {
    pub info: ChannelInfo,
    // The reqwest client
    pub client: Client,
    pub settings: ChannelSettings,
    // channel-specific headers
    channel_headers: HeaderMap,
    pub cookies: FxHashMap<String, String>,
}

impl ChannelBase {
    pub fn new(info: ChannelInfo, client: Client, settings: ChannelSettings) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_static(DEFAULT_UA),
        );
        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/json,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );

        Self {
            info,
            client,
            settings,
            channel_headers: default_headers,
            cookies: FxHashMap::default(),
        }
    }

    /// Adds a header to every request of this channel. Invalid names or
    /// values are logged and ignored.
    pub fn add_header<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, value: V) {
        match (
            HeaderName::from_str(key.as_ref()),
            HeaderValue::from_str(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.channel_headers.insert(name, value);
            }
            _ => warn!("Ignoring invalid header: {}", key.as_ref()),
        }
    }

    /// Set cookies from a cookie string (format: "name1=value1; name2=value2").
    pub fn set_cookies_from_string(&mut self, cookie_string: &str) {
        for cookie in cookie_string.split(';') {
            let cookie = cookie.trim();
            if let Some((name, value)) = cookie.split_once('=') {
                self.cookies
                    .insert(name.trim().to_string(), value.trim().to_string());
            }
        }
    }

    fn build_cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        let cookie_string = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");

        Some(cookie_string)
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Create an HTTP request with the channel headers and stored cookies.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, url)
            .headers(self.channel_headers.clone());

        if let Some(value) = self
            .build_cookie_header()
            .and_then(|header| HeaderValue::from_str(&header).ok())
        {
            request = request.header(reqwest::header::COOKIE, value);
        }
        request
    }

    /// Fetches `url` and returns the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String, ChannelError> {
        debug!("Opening {}", url);
        let response = self.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Fetches `url` and parses the body as JSON.
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value, ChannelError> {
        let body = self.get_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub fn get_channel_headers(&self) -> &HeaderMap {
        &self.channel_headers
    }
}

/// A content site plugin, as seen by its host.
#[async_trait]
pub trait SiteChannel: Send + Sync {
    fn base(&self) -> &ChannelBase;

    fn info(&self) -> &ChannelInfo {
        &self.base().info
    }

    /// Url, or `#pseudo` url, of the first listing.
    fn main_list_uri(&self) -> &str;

    /// Lists the content of `parent`, or the main list when `parent` is `None`.
    async fn process_folder_list(
        &self,
        parent: Option<&MediaItem>,
    ) -> Result<Vec<MediaItem>, ChannelError>;

    /// Resolves the streams of an incomplete item.
    async fn process_video_item(&self, item: MediaItem) -> Result<MediaItem, ChannelError>;

    async fn search_site(&self, needle: &str) -> Result<Vec<MediaItem>, ChannelError> {
        debug!(
            "Channel {} does not support searching for '{}'",
            self.info().code,
            needle
        );
        Ok(vec![])
    }

    /// Wraps a bare page url into an item this channel can update.
    fn create_item_for_url(&self, url: &str) -> MediaItem {
        MediaItem::video(url, url)
    }
}
