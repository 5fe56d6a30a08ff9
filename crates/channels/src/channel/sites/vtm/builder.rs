use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, warn};

use crate::{
    channel::{
        error::ChannelError,
        listing::{self, ChannelHandlers, ListingContext, Payload, Record, RegexRecord},
        parser_data::{ParserEntry, ParserTable},
        settings::ChannelSettings,
        site_channel::{ChannelBase, ChannelInfo, SiteChannel},
    },
    media::{MediaItem, MediaType, StreamFormat},
};

pub static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:www\.)?nieuws\.vtm\.be/").unwrap());

static EPISODE_ITEM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<li><a[^>]+href="/([^"]+)" class="level-1[^>]+>([^<]+)</a>"#).unwrap()
});

static VIDEO_ITEM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"<article[^<]+has-video"[^>]*>\W*<a href="(?<Url>[^<"]+)"[^>]*>\W+"#,
        r#"<div[^<]+<img[^>]+src="(?<Thumb>[^"]+)"[^>]*>[\w\W]{0,500}?<h3[^>]*>"#,
        r#"(?:\W+<span[^>]*>[^>]*>)?(?<Title>[^<]+)</h3>\W+<div[^<]+<time[^>]+"#,
        r#"datetime="(?<DateTime>[^"]+)"[^<]+</time>\W*</div>\W*<p[^>]+>*"#,
        r#"(?<Description>[^<]+)"#,
    ))
    .unwrap()
});

static STADION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"<article[^>]*>\W*<div class="image is-video">\W*<a href="(?<Url>[^"]+)"#,
        r#"[^>]*>\W*<img[^>]+src="(?<Thumb>[^"]+)"[\w\W]{0,1000}?<h3 class="#,
        r#""pagemanager-item-title">\W*<span>\W*<a[^>]*>(?<Title>[^<]+)[\w\W]"#,
        r#"{0,1000}?<div class="teaser">\W*<a[^>]+>(?<Description>[^<]+)"#,
    ))
    .unwrap()
});

static MEDIA_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<source[^>]+src="([^"]+)"[^>]+type="video/mp4"[^>]*/>"#).unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VtmHandler {
    EpisodeItem,
    VideoItem,
    Video,
}

pub struct Vtm {
    base: ChannelBase,
    parsers: ParserTable<VtmHandler>,
}

impl Vtm {
    const BASE_URL: &str = "http://nieuws.vtm.be";
    const MAIN_LIST_URI: &str = "http://nieuws.vtm.be/herbekijk";
    const NO_IMAGE: &str = "vtmimage.jpg";

    pub fn new(client: Client, settings: ChannelSettings, cookies: Option<String>) -> Self {
        let info = ChannelInfo::new("vtm", "VTM Nieuws", "News videos of VTM Nieuws", "nl");
        let mut base = ChannelBase::new(info, client, settings);
        if let Some(cookies) = cookies {
            base.set_cookies_from_string(&cookies);
        }

        let mut parsers = ParserTable::new();
        parsers
            .add(
                ParserEntry::exact(Self::MAIN_LIST_URI)
                    .regex_parser(EPISODE_ITEM_REGEX.clone())
                    .creator(VtmHandler::EpisodeItem),
            )
            .add(
                ParserEntry::wildcard()
                    .regex_parser(VIDEO_ITEM_REGEX.clone())
                    .creator(VtmHandler::VideoItem)
                    .updater(VtmHandler::Video),
            )
            .add(
                ParserEntry::exact("http://nieuws.vtm.be/stadion")
                    .regex_parser(STADION_REGEX.clone())
                    .creator(VtmHandler::VideoItem)
                    .updater(VtmHandler::Video),
            );

        Self { base, parsers }
    }

    /// A news category of the main list. The weather bulletin is a single
    /// video rather than a listing.
    pub fn create_episode_item(&self, record: &RegexRecord) -> Option<MediaItem> {
        let (Some(path), Some(title)) = (record.get(0), record.get(1)) else {
            warn!("Incomplete category match: {:?}", record);
            return None;
        };

        let mut item = MediaItem::new(title, format!("{}/{}", Self::BASE_URL, path));
        item.complete = true;
        item.icon = self.base.info.icon.clone();
        item.thumb = Some(Self::NO_IMAGE.to_string());
        if item.url.contains("/het-weer") {
            item.media_type = MediaType::Video;
            item.complete = false;
        }
        Some(item)
    }

    pub fn create_video_item(&self, record: &RegexRecord) -> Option<MediaItem> {
        let (Some(title), Some(url)) = (record.named("Title"), record.named("Url")) else {
            warn!("Incomplete video match: {:?}", record);
            return None;
        };

        let mut item = MediaItem::video(title.trim(), format!("{}{}", Self::BASE_URL, url));
        item.thumb = record.named("Thumb").map(str::to_string);
        item.description = record.named("Description").map(|d| d.trim().to_string());
        item.complete = false;

        let Some(date_time) = record.named("DateTime") else {
            return Some(item);
        };

        // "2016-10-27T19:00" followed by optional seconds and offset
        let parsed = Self::split_date_time(date_time).ok_or_else(|| {
            ChannelError::ValidationError(format!("unexpected date format: {date_time}"))
        });
        if let Err(e) = parsed
            .and_then(|(y, mo, d, h, mi)| item.set_date(y, mo, d, h, mi, 0))
        {
            warn!("Error setting date from {}: {}", date_time, e);
        }
        Some(item)
    }

    fn split_date_time(date_time: &str) -> Option<(i32, u32, u32, u32, u32)> {
        let (date, time) = date_time.split_once('T')?;
        let mut date = date.split('-');
        let mut time = time.split(':');
        Some((
            date.next()?.parse().ok()?,
            date.next()?.parse().ok()?,
            date.next()?.parse().ok()?,
            time.next()?.parse().ok()?,
            time.next()?.get(..2)?.parse().ok()?,
        ))
    }

    /// Finds the mp4 source of a video page; the last one wins.
    pub fn find_media_url(page: &str) -> Option<&str> {
        MEDIA_URL_REGEX
            .captures_iter(page)
            .filter_map(|caps| caps.get(1))
            .last()
            .map(|m| m.as_str())
    }

    pub async fn update_video_item(&self, mut item: MediaItem) -> Result<MediaItem, ChannelError> {
        debug!("Starting update of {} ({})", item.name, self.base.info.name);
        let data = self.base.get_text(&item.url).await?;

        item.streams.clear();
        match Self::find_media_url(&data) {
            Some(url) => {
                let stream = item.add_stream(url, 0);
                stream.stream_format = StreamFormat::Mp4;
                item.complete = true;
            }
            None => warn!("No media url found for {}", item.url),
        }
        Ok(item)
    }
}

#[async_trait]
impl ChannelHandlers for Vtm {
    type Handler = VtmHandler;
    type State = ();

    fn channel_base(&self) -> &ChannelBase {
        &self.base
    }

    fn parsers(&self) -> &ParserTable<VtmHandler> {
        &self.parsers
    }

    fn main_list_uri(&self) -> &str {
        Self::MAIN_LIST_URI
    }

    async fn preprocess(
        &self,
        handler: VtmHandler,
        data: Payload,
        _ctx: &mut ListingContext<'_, ()>,
    ) -> Result<(Payload, Vec<MediaItem>), ChannelError> {
        warn!("{:?} is not a preprocessor", handler);
        Ok((data, vec![]))
    }

    fn create(
        &self,
        handler: VtmHandler,
        record: Record,
        _ctx: &ListingContext<'_, ()>,
    ) -> Option<MediaItem> {
        let Record::Regex(record) = record else {
            warn!("VTM parsers only produce regex records");
            return None;
        };

        match handler {
            VtmHandler::EpisodeItem => self.create_episode_item(&record),
            VtmHandler::VideoItem => self.create_video_item(&record),
            VtmHandler::Video => {
                warn!("{:?} is not a creator", handler);
                None
            }
        }
    }

    async fn update(&self, handler: VtmHandler, item: MediaItem) -> Result<MediaItem, ChannelError> {
        match handler {
            VtmHandler::Video => self.update_video_item(item).await,
            other => {
                warn!("{:?} is not an updater", other);
                Ok(item)
            }
        }
    }
}

#[async_trait]
impl SiteChannel for Vtm {
    fn base(&self) -> &ChannelBase {
        &self.base
    }

    fn main_list_uri(&self) -> &str {
        Self::MAIN_LIST_URI
    }

    async fn process_folder_list(
        &self,
        parent: Option<&MediaItem>,
    ) -> Result<Vec<MediaItem>, ChannelError> {
        listing::process_folder_list(self, parent).await
    }

    async fn process_video_item(&self, item: MediaItem) -> Result<MediaItem, ChannelError> {
        listing::process_video_item(self, item).await
    }

    fn create_item_for_url(&self, url: &str) -> MediaItem {
        let mut item = MediaItem::video(url, url);
        item.thumb = Some(Self::NO_IMAGE.to_string());
        item
    }
}
