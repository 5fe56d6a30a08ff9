use chrono::{NaiveDate, NaiveDateTime};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::formats::{ContentType, MediaType};
use super::stream_info::{MediaStream, Subtitle};
use crate::channel::error::ChannelError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// The uniform record a channel hands to its host: either a navigable
/// folder or a playable video.
///
/// Folders carry a free-form `meta_data` bag which is passed back to the
/// channel's preprocessors when the folder is opened. Videos that are not
/// `complete` are sent through the channel's updater before playback, which
/// fills `streams` (and maybe `subtitle`).
///
/// # Examples
///
/// ```rust
/// use channels_parser::media::{ContentType, MediaItem};
///
/// let mut folder = MediaItem::folder("Drama", "#genre_item", ContentType::TvShows);
/// folder.meta_data.insert("genre_id".to_string(), "drama".into());
/// assert!(folder.complete);
/// assert_eq!(folder.meta_str("genre_id"), Some("drama"));
/// ```
pub struct MediaItem {
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub thumb: Option<String>,
    pub fanart: Option<String>,
    pub icon: Option<String>,
    pub media_type: MediaType,
    pub content_type: Option<ContentType>,
    pub is_geo_locked: bool,
    pub is_live: bool,
    pub complete: bool,
    pub dont_group: bool,
    pub meta_data: FxHashMap<String, serde_json::Value>,
    pub streams: Vec<MediaStream>,
    pub subtitle: Option<Subtitle>,
    pub broadcast_date: Option<NaiveDateTime>,
    pub expires: Option<NaiveDateTime>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub tv_show_title: Option<String>,
    // Duration in seconds
    pub duration: Option<u64>,
    // Children that are already known, shown without fetching the url
    pub items: Vec<MediaItem>,
}

impl MediaItem {
    /// Creates a new, incomplete item of type folder.
    pub fn new<S1: Into<String>, S2: Into<String>>(name: S1, url: S2) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            description: None,
            thumb: None,
            fanart: None,
            icon: None,
            media_type: MediaType::Folder,
            content_type: None,
            is_geo_locked: false,
            is_live: false,
            complete: false,
            dont_group: false,
            meta_data: FxHashMap::default(),
            streams: vec![],
            subtitle: None,
            broadcast_date: None,
            expires: None,
            season: None,
            episode: None,
            tv_show_title: None,
            duration: None,
            items: vec![],
        }
    }

    pub fn folder<S1: Into<String>, S2: Into<String>>(
        name: S1,
        url: S2,
        content_type: ContentType,
    ) -> Self {
        let mut item = Self::new(name, url);
        item.content_type = Some(content_type);
        item.complete = true;
        item
    }

    pub fn video<S1: Into<String>, S2: Into<String>>(name: S1, url: S2) -> Self {
        let mut item = Self::new(name, url);
        item.media_type = MediaType::Video;
        item
    }

    pub fn is_folder(&self) -> bool {
        self.media_type == MediaType::Folder
    }

    pub fn has_streams(&self) -> bool {
        !self.streams.is_empty()
    }

    /// Folders are always playable in the host's sense; videos need to be
    /// complete and have at least one stream.
    pub fn is_playable(&self) -> bool {
        self.is_folder() || (self.complete && self.has_streams())
    }

    pub fn add_stream<S: Into<String>>(&mut self, url: S, bitrate: u64) -> &mut MediaStream {
        self.streams.push(MediaStream::new(url, bitrate));
        // just pushed
        let last = self.streams.len() - 1;
        &mut self.streams[last]
    }

    pub fn set_date(
        &mut self,
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Result<(), ChannelError> {
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, second))
            .ok_or_else(|| {
                ChannelError::ValidationError(format!(
                    "invalid date {year}-{month}-{day} {hour}:{minute}:{second}"
                ))
            })?;
        self.broadcast_date = Some(date);
        Ok(())
    }

    pub fn set_datetime(&mut self, date: NaiveDateTime) {
        self.broadcast_date = Some(date);
    }

    pub fn set_expire_datetime(&mut self, expires: NaiveDateTime) {
        self.expires = Some(expires);
    }

    pub fn set_season_info(&mut self, season: &str, episode: &str) -> Result<(), ChannelError> {
        let season = season.trim().parse::<u32>().map_err(|_| {
            ChannelError::ValidationError(format!("invalid season number: {season}"))
        })?;
        let episode = episode.trim().parse::<u32>().map_err(|_| {
            ChannelError::ValidationError(format!("invalid episode number: {episode}"))
        })?;
        self.season = Some(season);
        self.episode = Some(episode);
        Ok(())
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta_data.get(key).and_then(|v| v.as_str())
    }

    pub fn meta_bool(&self, key: &str) -> Option<bool> {
        self.meta_data.get(key).and_then(|v| v.as_bool())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::StreamFormat;

    #[test]
    fn test_new_item_is_incomplete_folder() {
        let item = MediaItem::new("Weather", "http://nieuws.vtm.be/het-weer");
        assert!(item.is_folder());
        assert!(!item.complete);
    }

    #[test]
    fn test_video_needs_streams_to_be_playable() {
        let mut item = MediaItem::video("Rapport", "https://api.svt.se/videoplayer-api/video/abc");
        item.complete = true;
        assert!(!item.is_playable());

        item.add_stream("https://example.com/master.m3u8", 1)
            .set_input_stream_adaptive();
        assert!(item.is_playable());
        assert_eq!(item.streams[0].stream_format, StreamFormat::Hls);
        assert_eq!(
            item.streams[0].properties.get("manifest_type").map(String::as_str),
            Some("hls")
        );
    }

    #[test]
    fn test_set_date_rejects_invalid() {
        let mut item = MediaItem::video("x", "y");
        assert!(item.set_date(2021, 2, 30, 10, 0, 0).is_err());
        assert!(item.broadcast_date.is_none());

        item.set_date(2021, 2, 28, 10, 5, 0).unwrap();
        assert_eq!(
            item.broadcast_date.unwrap().to_string(),
            "2021-02-28 10:05:00"
        );
    }

    #[test]
    fn test_set_season_info() {
        let mut item = MediaItem::video("x", "y");
        item.set_season_info("2", "11").unwrap();
        assert_eq!((item.season, item.episode), (Some(2), Some(11)));
        assert!(item.set_season_info("two", "11").is_err());
    }
}
