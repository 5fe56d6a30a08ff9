use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Container or delivery protocol of a single stream.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamFormat {
    Dash,
    Hls,
    Mp4,
    Rtmp,
    #[default]
    Unknown,
}

impl StreamFormat {
    pub fn as_str(&self) -> &str {
        match self {
            StreamFormat::Dash => "dash",
            StreamFormat::Hls => "hls",
            StreamFormat::Mp4 => "mp4",
            StreamFormat::Rtmp => "rtmp",
            StreamFormat::Unknown => "unknown",
        }
    }

    /// Guesses the format from a stream url.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.starts_with("rtmp") {
            StreamFormat::Rtmp
        } else if lower.contains(".m3u8") {
            StreamFormat::Hls
        } else if lower.contains(".mpd") {
            StreamFormat::Dash
        } else if lower.contains(".mp4") {
            StreamFormat::Mp4
        } else {
            StreamFormat::Unknown
        }
    }
}

impl Display for StreamFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StreamFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dash" | "mpd" => Ok(StreamFormat::Dash),
            "hls" | "m3u8" => Ok(StreamFormat::Hls),
            "mp4" => Ok(StreamFormat::Mp4),
            "rtmp" => Ok(StreamFormat::Rtmp),
            _ => Err(()),
        }
    }
}

/// What kind of entry a [`MediaItem`](super::MediaItem) is.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MediaType {
    #[default]
    Folder,
    Video,
    Episode,
    Audio,
}

impl MediaType {
    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Folder => "folder",
            MediaType::Video => "video",
            MediaType::Episode => "episode",
            MediaType::Audio => "audio",
        }
    }

    pub fn is_playable(&self) -> bool {
        !matches!(self, MediaType::Folder)
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hint for the host about what a folder lists.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Videos,
    TvShows,
    Episodes,
}

impl ContentType {
    pub fn as_str(&self) -> &str {
        match self {
            ContentType::Videos => "videos",
            ContentType::TvShows => "tvshows",
            ContentType::Episodes => "episodes",
        }
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_format_from_url() {
        assert_eq!(
            StreamFormat::from_url("https://svt-vod.akamaized.net/d0/se/master.m3u8"),
            StreamFormat::Hls
        );
        assert_eq!(
            StreamFormat::from_url("https://example.com/manifest.mpd?x=1"),
            StreamFormat::Dash
        );
        assert_eq!(
            StreamFormat::from_url("rtmp://fl.example.com/_definst_/x"),
            StreamFormat::Rtmp
        );
        assert_eq!(StreamFormat::from_url("https://x/y"), StreamFormat::Unknown);
    }

    #[test]
    fn test_media_type_playable() {
        assert!(!MediaType::Folder.is_playable());
        assert!(MediaType::Episode.is_playable());
    }
}
