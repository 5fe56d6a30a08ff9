use crate::media::StreamFormat;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const INPUT_STREAM_ADDON: &str = "inputstream.adaptive";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MediaStream {
    // Url of the stream
    pub url: String,
    // Bitrate in kbps, or the rank from a format priority table
    pub bitrate: u64,
    pub stream_format: StreamFormat,
    // Quality label, e.g. "1280x720"
    pub quality: Option<String>,
    pub codec: String,
    // Player properties, e.g. the adaptive input stream hints
    pub properties: FxHashMap<String, String>,
}

impl MediaStream {
    pub fn new<S: Into<String>>(url: S, bitrate: u64) -> Self {
        let url = url.into();
        let stream_format = StreamFormat::from_url(&url);
        Self {
            url,
            bitrate,
            stream_format,
            quality: None,
            codec: String::new(),
            properties: FxHashMap::default(),
        }
    }

    /// Marks the stream for playback through the adaptive input stream
    /// add-on, using the manifest type of the stream's format.
    pub fn set_input_stream_adaptive(&mut self) -> &mut Self {
        let manifest_type = match self.stream_format {
            StreamFormat::Hls => "hls",
            _ => "mpd",
        };
        self.properties
            .insert("inputstream".to_string(), INPUT_STREAM_ADDON.to_string());
        self.properties
            .insert("manifest_type".to_string(), manifest_type.to_string());
        self
    }

    pub fn uses_input_stream(&self) -> bool {
        self.properties.contains_key("inputstream")
    }
}

impl fmt::Display for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.quality {
            Some(quality) => write!(f, "{} ({}) - {}", self.stream_format, self.bitrate, quality),
            None => write!(f, "{} ({})", self.stream_format, self.bitrate),
        }
    }
}

/// A subtitle reference; the host downloads and converts it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Subtitle {
    pub url: String,
    pub format: String,
}
