use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{Datelike, Local};
use regex::Regex;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info, trace, warn};

use super::dates;
use super::models::{LiveChannel, SubtitleReference, VideoPlayerResponse, VideoReference};
use crate::{
    channel::{
        error::ChannelError,
        hls_extractor::HlsExtractor,
        json_path::{JsonPath, value_to_string},
        listing::{self, ChannelHandlers, ListingContext, Payload, Record},
        parser_data::{ParserEntry, ParserTable},
        settings::ChannelSettings,
        site_channel::{ChannelBase, ChannelInfo, SiteChannel},
        utils::html_to_text,
    },
    media::{ContentType, MediaItem, MediaType, StreamFormat, Subtitle},
};

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.|api\.)?(?:svtplay\.se|svt\.se)/").unwrap()
});

static PLAY_BUTTON_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"play-button"[^>]+href="/video/[^?]+\?id=([^"]+)"#).unwrap()
});

pub const OPPET_ARKIV_CODE: &str = "oppetarkiv";

// meta data keys handed from folders to preprocessors
const FOLDER_ID: &str = "folder_id";
const GENRE_ID: &str = "genre_id";
const FILTER_SUBHEADING: &str = "filter_subheading";
const PARENT_IMAGES: &str = "parent_thumb_data";
const LIST_TYPE: &str = "list_type";
const SLUG: &str = "slug";

// persisted query hashes of the contento GraphQL api
const PROGRAMS_LISTING_HASH: &str =
    "1eeb0fb08078393c17658c1a22e7eea3fbaa34bd2667cec91bbc4db8d778580f";
const GENRE_LISTS_HASH: &str = "90dca0b51b57904ccc59a418332e43e17db21c93a2346d1c73e05583a9aa598c";
const CHANNELS_HASH: &str = "65ceeccf67cc8334bc14eb495eb921cffebf34300562900076958856e1a58d37";
const GRID_PAGE_HASH: &str = "b30578b1b188242ce190c8a2cefe3d4694efafd17a929d08d273ae224a302b24";
const START_PAGE_HASH: &str = "b2a022f7353fbe891696aacd173a74c964a5f382f6f9153f0fcf129cecd4b9ac";
const ALL_GENRES_HASH: &str = "6bef51146d05b427fba78f326453127f7601188e46038c9a5c7b9c2649d4719c";
const DETAILS_PAGE_HASH: &str = "d4539b09f69378792486cf87e676af62e9f8ac6de274de616c58b93e86b26da1";
const GENRE_PROGRAMS_HASH: &str =
    "189b3613ec93e869feace9a379cca47d8b68b97b3f53c04163769dcffa509318";
const SEARCH_PAGE_HASH: &str = "ab8c604fc76d14885dcedd0f377b76afae9aabcde73b3324676f60ca86d12606";

/// Format priorities when playing from within Sweden, or for items that are
/// not geo-locked.
///
/// "dash-hbbtv-avc" has x264 multi stream audio (5.1 only), "dash" has
/// x264 single stream stereo audio.
const GEO_AREA_FORMATS: &[(&str, u64)] = &[
    ("dash", 2),
    ("dash-hbbtv-avc", 3),
    ("hls", 0),
    ("hls-ts-full", 1),
];

/// Format priorities for geo-locked items played from abroad.
const ABROAD_FORMATS: &[(&str, u64)] = &[
    ("dash", 2),
    ("dash-avc-51", 3),
    ("hls", 0),
    ("hls-ts-avc-51", 1),
];

const CATEGORIES: &[(&str, &str, &str)] = &[
    ("Drama", "drama", "https://www.svtstatic.se/image/medium/480/7166155/1458037803"),
    ("Dokumentär", "dokumentar", "https://www.svtstatic.se/image/medium/480/7166209/1458037873"),
    ("Humor", "humor", "https://www.svtstatic.se/image/medium/480/7166065/1458037609"),
    ("Barn", "barn", "https://www.svtstatic.se/image/medium/480/22702778/1560934663"),
    ("Nyheter", "nyheter", "https://www.svtstatic.se/image/medium/480/7166089/1458037651"),
    ("Sport", "sport", "https://www.svtstatic.se/image/medium/480/7166143/1458037766"),
    ("Serier", "serier", "https://www.svtstatic.se/image/medium/480/20888260/1548755402"),
    ("Scen", "scen", "https://www.svtstatic.se/image/medium/480/26157824/1585127128"),
    (
        "Livsstil & reality",
        "livsstil-och-reality",
        "https://www.svtstatic.se/image/medium/480/29184042/1605884325",
    ),
    (
        "Underhållning",
        "underhallning",
        "https://www.svtstatic.se/image/medium/480/7166041/1458037574",
    ),
    ("Filmer", "filmer", "https://www.svtstatic.se/image/medium/480/20888292/1548755428"),
    ("Kultur", "kultur", "https://www.svtstatic.se/image/medium/480/7166119/1458037729"),
    ("Samhälle", "samhalle", "https://www.svtstatic.se/image/medium/480/7166173/1458037837"),
    ("Fakta", "fakta", "https://www.svtstatic.se/image/medium/480/29184042/1605884325"),
    ("Musik", "musik", "https://www.svtstatic.se/image/medium/480/19417384/1537791920"),
    (
        "Djur & natur",
        "djur-och-natur",
        "https://www.svtstatic.se/image/medium/480/32904903/1634633546",
    ),
    (
        "Öppet arkiv",
        "oppet-arkiv",
        "https://www.svtstatic.se/image/medium/480/14077904/1497449020",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvtHandler {
    LiveItemsAndGenres,
    FoldersOrClips,
    FetchProgramApiData,
    FetchGenreApiData,
    ApiTypedItem,
    ChannelItem,
    VideoApi,
    VideoHtml,
}

/// Which kinds of records a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvtListingState {
    pub show_folders: bool,
    pub show_videos: bool,
}

impl Default for SvtListingState {
    fn default() -> Self {
        Self {
            show_folders: true,
            show_videos: true,
        }
    }
}

type Ctx<'a> = ListingContext<'a, SvtListingState>;

/// How one video reference turns into streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPlan {
    /// A manifest handed to the adaptive input stream as is
    Adaptive { url: String, bitrate: u64 },
    /// An HLS playlist, expanded unless adaptive streaming is on
    HlsPlaylist { url: String, bitrate: u64 },
    Direct { url: String, bitrate: u64 },
}

pub struct Svt {
    base: ChannelBase,
    parsers: ParserTable<SvtHandler>,
    main_list_uri: String,
    program_url: String,
    nyheter_url: String,
    geo_check_url: String,
}

impl Svt {
    const BASE_URL: &str = "https://www.svtplay.se";
    const API_URL: &str = "https://api.svt.se/contento/graphql";
    const API_UA_QUERY: &str = "ua=svtplaywebb-play-render-prod-client";
    const SEARCH_API_URL: &str = "https://contento-search.svt.se/graphql";
    const VIDEO_API_URL: &str = "https://api.svt.se/videoplayer-api/video/";
    const GEO_CHECK_URL: &str = "https://api.svt.se/geo.modernizr.js";
    const NO_IMAGE: &str = "svtimage.png";

    pub fn new(
        channel_code: &str,
        client: Client,
        settings: ChannelSettings,
        cookies: Option<String>,
    ) -> Self {
        let info = if channel_code == OPPET_ARKIV_CODE {
            ChannelInfo::new(
                OPPET_ARKIV_CODE,
                "SVT Öppet arkiv",
                "Archive programs of Sveriges Television",
                "sv",
            )
        } else {
            ChannelInfo::new("svt", "SVT Play", "Sveriges Television on demand", "sv")
        };

        let mut base = ChannelBase::new(info, client, settings);
        base.add_header(reqwest::header::REFERER.as_str(), Self::BASE_URL);
        if let Some(cookies) = cookies {
            base.set_cookies_from_string(&cookies);
        }

        let program_url = Self::get_api_url("ProgramsListing", PROGRAMS_LISTING_HASH, &json!({}));
        let nyheter_url =
            Self::get_api_url("GenreLists", GENRE_LISTS_HASH, &json!({"genre": ["nyheter"]}));

        let main_list_uri = if channel_code == OPPET_ARKIV_CODE {
            "#genre_item"
        } else {
            "#mainlist"
        };

        let mut svt = Self {
            base,
            parsers: ParserTable::new(),
            main_list_uri: main_list_uri.to_string(),
            program_url,
            nyheter_url,
            geo_check_url: Self::GEO_CHECK_URL.to_string(),
        };
        svt.parsers = svt.build_parsers();
        svt
    }

    /// Points the location check somewhere else.
    pub fn with_geo_check_url<S: Into<String>>(mut self, url: S) -> Self {
        self.geo_check_url = url.into();
        self
    }

    fn operation_url(operation: &str) -> String {
        format!(
            "{}?{}&operationName={}",
            Self::API_URL,
            Self::API_UA_QUERY,
            operation
        )
    }

    fn build_parsers(&self) -> ParserTable<SvtHandler> {
        use SvtHandler::*;

        let mut table = ParserTable::new();
        table
            // the main list is generated without loading anything
            .add(ParserEntry::exact("#mainlist").preprocessor(LiveItemsAndGenres))
            .add(
                ParserEntry::start(self.program_url.clone())
                    .json()
                    .preprocessor(FoldersOrClips)
                    .json_parser(JsonPath::keys(&["data", "programAtillO", "flat"]))
                    .creator(ApiTypedItem),
            )
            .add(
                ParserEntry::exact("#program_item")
                    .name("Data retriever for API folder")
                    .json()
                    .preprocessor(FetchProgramApiData),
            )
            .add(
                ParserEntry::exact("#program_item")
                    .name("Folder parser for show listing via API")
                    .json()
                    .json_parser(JsonPath::keys(&["folders"]))
                    .creator(ApiTypedItem),
            )
            .add(
                ParserEntry::exact("#program_item")
                    .name("Video parser for show listing via API")
                    .json()
                    .json_parser(JsonPath::keys(&["videos"]))
                    .creator(ApiTypedItem),
            )
            .add(
                ParserEntry::start(Self::operation_url("GridPage"))
                    .name("Default GraphQL GridPage parsers")
                    .json()
                    .json_parser(
                        JsonPath::keys(&["data", "startForSvtPlay", "selections"])
                            .index(0)
                            .key("items"),
                    )
                    .creator(ApiTypedItem),
            )
            .add(
                ParserEntry::start(Self::operation_url("FionaPage"))
                    .name("GraphQL FionaPage parsers for Nytt pa Play")
                    .json()
                    .json_parser(JsonPath::keys(&["data", "selectionById", "items"]))
                    .creator(ApiTypedItem),
            )
            .add(
                ParserEntry::start(Self::operation_url("StartPage"))
                    .name("GraphQL StartPage parsers for Nytt pa Play")
                    .json()
                    .json_parser(
                        JsonPath::keys(&["data", "startForSvtPlay", "selections"])
                            .filter("name", "Nytt på Play", 0)
                            .key("items"),
                    )
                    .creator(ApiTypedItem),
            )
            .add(
                ParserEntry::start(self.nyheter_url.clone())
                    .name("Latest news")
                    .json()
                    .json_parser(
                        JsonPath::keys(&["data", "genres"])
                            .index(0)
                            .key("selectionsForWeb")
                            .index(1)
                            .key("items"),
                    )
                    .creator(ApiTypedItem),
            )
            .add(
                ParserEntry::start(Self::operation_url("AllGenres"))
                    .name("Genre GraphQL")
                    .json()
                    .json_parser(JsonPath::keys(&["data", "genresSortedByName", "genres"]))
                    .creator(ApiTypedItem),
            )
            .add(
                ParserEntry::exact("#genre_item")
                    .name("Genre data retriever for GraphQL")
                    .json()
                    .preprocessor(FetchGenreApiData),
            )
            .add(
                ParserEntry::exact("#genre_item")
                    .name("Genre episode parser for GraphQL")
                    .json()
                    .json_parser(JsonPath::keys(&["programs"]))
                    .creator(ApiTypedItem),
            )
            .add(
                ParserEntry::exact("#genre_item")
                    .name("Genre clip parser for GraphQL")
                    .json()
                    .json_parser(JsonPath::keys(&["videos"]))
                    .creator(ApiTypedItem),
            )
            .add(
                ParserEntry::start(Self::operation_url("ChannelsQuery"))
                    .name("Live streams")
                    .json()
                    .json_parser(JsonPath::keys(&["data", "channels", "channels"]))
                    .creator(ChannelItem),
            )
            .add(
                ParserEntry::start(Self::SEARCH_API_URL)
                    .name("Search")
                    .json()
                    .json_parser(JsonPath::keys(&["data", "searchPage", "flat", "hits"]))
                    .creator(ApiTypedItem),
            )
            // generic updating of videos
            .add(ParserEntry::start(Self::VIDEO_API_URL).updater(VideoApi))
            .add(ParserEntry::start("https://api.svt.se/video/").updater(VideoApi))
            // updating via html pages
            .add(ParserEntry::start("https://www.svtplay.se/video/").updater(VideoHtml))
            .add(ParserEntry::start("https://www.svtplay.se/klipp/").updater(VideoHtml))
            // live channels
            .add(ParserEntry::start("https://www.svt.se/videoplayer-api/").updater(VideoApi));
        table
    }

    /// Builds a persisted query url for the contento GraphQL api.
    pub fn get_api_url(operation: &str, hash_value: &str, variables: &Value) -> String {
        let extensions = json!({"persistedQuery": {"version": 1, "sha256Hash": hash_value}});
        format!(
            "{}&variables={}&extensions={}",
            Self::operation_url(operation),
            urlencoding::encode(&variables.to_string()),
            urlencoding::encode(&extensions.to_string())
        )
    }

    /// Search url with a `%s` placeholder for the needle.
    pub fn search_url_template() -> String {
        Self::get_api_url(
            "SearchPage",
            SEARCH_PAGE_HASH,
            &json!({"querystring": "----", "abTestVariants": [], "searchClickHistory": []}),
        )
        .replace(Self::API_URL, Self::SEARCH_API_URL)
        .replace("----", "%s")
    }

    fn get_thumb(image: &Value, width: u32) -> Option<String> {
        let id = image.get("id").and_then(value_to_string)?;
        let changed = image.get("changed").and_then(value_to_string)?;
        Some(format!(
            "https://www.svtstatic.se/image/wide/{width}/{id}/{changed}?quality=70"
        ))
    }

    /// Builds the fixed main list: extra listings, genres, categories and
    /// the program folders.
    pub fn add_live_items_and_genres(&self) -> Vec<MediaItem> {
        let grid = |selection: &str| {
            Self::get_api_url("GridPage", GRID_PAGE_HASH, &json!({"selectionId": selection}))
        };

        let extra_items: Vec<(String, String, bool)> = vec![
            (
                "Live TV".to_string(),
                Self::get_api_url("ChannelsQuery", CHANNELS_HASH, &json!({})),
                false,
            ),
            ("Currently Playing Episodes".to_string(), grid("live"), true),
            (
                "Search".to_string(),
                listing::SEARCH_SITE_URL.to_string(),
                false,
            ),
            ("Recent".to_string(), grid("latest"), false),
            ("Last Chance".to_string(), grid("lastchance"), false),
            ("Most Viewed Episodes".to_string(), grid("popular"), false),
            ("Latest News".to_string(), self.nyheter_url.clone(), false),
            (
                format!("New on {}", self.base.info.name),
                Self::get_api_url(
                    "StartPage",
                    START_PAGE_HASH,
                    &json!({"abTestVariants": [], "includeFullOppetArkiv": true}),
                ),
                false,
            ),
        ];

        let mut items: Vec<MediaItem> = extra_items
            .into_iter()
            .map(|(title, url, filter_subheading)| {
                let mut item = MediaItem::folder(title, url, ContentType::Videos);
                item.dont_group = true;
                item.meta_data
                    .insert(FILTER_SUBHEADING.to_string(), Value::Bool(filter_subheading));
                item
            })
            .collect();

        let mut genre_item = MediaItem::folder(
            "Genres/tags",
            Self::get_api_url("AllGenres", ALL_GENRES_HASH, &json!({})),
            ContentType::Videos,
        );
        genre_item.dont_group = true;
        items.push(genre_item);

        let mut categories =
            MediaItem::folder("Categories", "https://www.svtplay.se/genre", ContentType::Videos);
        categories.dont_group = true;
        categories.items = CATEGORIES
            .iter()
            .map(|(title, category_id, thumb)| {
                let mut item = MediaItem::folder(*title, "#genre_item", ContentType::TvShows);
                item.thumb = Some(thumb.to_string());
                item.fanart = Some(thumb.to_string());
                item.dont_group = true;
                item.meta_data
                    .insert(GENRE_ID.to_string(), Value::from(*category_id));
                item
            })
            .collect();
        items.push(categories);

        let mut programs =
            MediaItem::folder("TV Shows", self.program_url.clone(), ContentType::TvShows);
        if self.base.settings.show_programs_folder {
            let mut clips = MediaItem::folder(
                "Single Episodes",
                self.program_url.clone(),
                ContentType::Videos,
            );
            clips
                .meta_data
                .insert(LIST_TYPE.to_string(), Value::from("videos"));
            programs
                .meta_data
                .insert(LIST_TYPE.to_string(), Value::from("folders"));
            items.push(programs);
            items.push(clips);
        } else {
            items.push(programs);
        }

        let mut oppet_arkiv = MediaItem::folder("Öppet arkiv", "#genre_item", ContentType::TvShows);
        oppet_arkiv
            .meta_data
            .insert(GENRE_ID.to_string(), Value::from("oppet-arkiv"));
        items.push(oppet_arkiv);

        items
    }

    /// Limits a program listing to folders or videos, as requested by the
    /// parent's list type.
    pub fn folders_or_clips(ctx: &mut Ctx<'_>) {
        match ctx.parent.and_then(|p| p.meta_str(LIST_TYPE)) {
            Some("folders") => {
                ctx.state.show_folders = true;
                ctx.state.show_videos = false;
            }
            Some("videos") => {
                ctx.state.show_folders = false;
                ctx.state.show_videos = true;
            }
            _ => {}
        }
    }

    /// Creates an item based on the `__typename` of the record.
    pub fn create_api_typed_item(
        &self,
        record: Value,
        add_parent_title: bool,
        ctx: &Ctx<'_>,
    ) -> Option<MediaItem> {
        let api_type = record
            .get("__typename")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        trace!("{}: {}", api_type, record);

        match api_type.as_str() {
            "TvSeries" => self.create_api_tvserie_type(&record, ctx),
            "Selection" => self.create_api_selection_type(&record, ctx),
            "Teaser" => self.create_api_teaser_type(record, ctx),
            "Genre" => self.create_api_genre_type(&record, ctx),
            "TvShow" | "KidsTvShow" => self.create_api_tvshow_type(&record, ctx),
            "SearchPageHit" => self.create_api_search_hit(record, ctx),
            "Single" => self.create_api_single_type(&record, ctx),
            "Clip" | "Trailer" => self.create_api_clip_type(&record, ctx),
            "Episode" | "Variant" => self.create_api_episode_type(&record, add_parent_title, ctx),
            other => {
                warn!("Missing type: {}", other);
                None
            }
        }
    }

    fn create_api_tvserie_type(&self, record: &Value, ctx: &Ctx<'_>) -> Option<MediaItem> {
        if !ctx.state.show_folders {
            return None;
        }

        let mut item = Self::program_folder(record)?;
        item.description = str_field(record, "longDescription");
        if let Some(image) = record.get("image").filter(|i| i.is_object()) {
            item.thumb = Self::get_thumb(image, 720);
            item.fanart = Self::get_thumb(image, 1920);
        }
        Some(item)
    }

    fn create_api_tvshow_type(&self, record: &Value, ctx: &Ctx<'_>) -> Option<MediaItem> {
        if !ctx.state.show_folders {
            return None;
        }

        let mut item = Self::program_folder(record)?;
        item.description = str_field(record, "description");
        if let Some(image) = record.get("image").filter(|i| i.is_object()) {
            item.thumb = Self::get_thumb(image, 1920);
        }
        Some(item)
    }

    fn program_folder(record: &Value) -> Option<MediaItem> {
        let Some(slug) = record.pointer("/urls/svtplay").and_then(Value::as_str) else {
            warn!("Program without svtplay url: {}", record);
            return None;
        };
        let name = str_field(record, "name").unwrap_or_default();

        let mut item = MediaItem::folder(name.clone(), "#program_item", ContentType::Episodes);
        item.meta_data.insert(SLUG.to_string(), Value::from(slug));
        item.tv_show_title = Some(name);
        item.is_geo_locked = is_geo_locked(record);
        Some(item)
    }

    fn create_api_selection_type(&self, record: &Value, ctx: &Ctx<'_>) -> Option<MediaItem> {
        if !ctx.state.show_folders {
            return None;
        }

        if record
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| t.eq_ignore_ascii_case("upcoming"))
        {
            return None;
        }

        let id = str_field(record, "id").unwrap_or_default();
        let name = match str_field(record, "name").filter(|n| !n.is_empty()) {
            Some(name) => name,
            // no name, derive one from the id: "season-2-abc" -> "Season 2"
            None => title_case(&id.rsplit_once('-').map_or(id.as_str(), |(head, _)| head).replace('-', " ")),
        };

        let parent_url = ctx.parent.map_or("#program_item", |p| p.url.as_str());
        let mut item = MediaItem::new(name, parent_url);
        if let Some(parent) = ctx.parent {
            item.meta_data.extend(parent.meta_data.clone());
        }
        item.meta_data.insert(FOLDER_ID.to_string(), Value::from(id));

        if let Some(images) = record.get(PARENT_IMAGES).filter(|i| i.is_object()) {
            item.thumb = Self::get_thumb(images, 720);
            item.fanart = Self::get_thumb(images, 1920);
        }
        Some(item)
    }

    fn create_api_teaser_type(&self, record: Value, ctx: &Ctx<'_>) -> Option<MediaItem> {
        if !ctx.state.show_folders {
            return None;
        }

        let title = str_field(&record, "heading").unwrap_or_default();
        let sub_heading = str_field(&record, "subHeading").filter(|s| !s.is_empty());

        let Some(mut inner) = record.get("item").filter(|i| i.is_object()).cloned() else {
            warn!("Teaser without item: {}", record);
            return None;
        };

        let mut name = title.clone();
        if let Some(sub_heading) = sub_heading {
            // defaults to filtering when the parent does not say otherwise
            let filter = ctx
                .parent
                .and_then(|p| p.meta_bool(FILTER_SUBHEADING))
                .unwrap_or(true);
            if filter && is_redundant_subheading(&sub_heading) {
                trace!("Ignoring subheading: {}", sub_heading);
            } else {
                name = format!("{title} - {sub_heading}");
            }
        }

        if let Some(obj) = inner.as_object_mut() {
            obj.insert("name".to_string(), Value::from(name));
            obj.insert(
                PARENT_IMAGES.to_string(),
                record.get(PARENT_IMAGES).cloned().unwrap_or(Value::Null),
            );
            if !obj.contains_key("longDescription") {
                obj.insert(
                    "longDescription".to_string(),
                    record.get("description").cloned().unwrap_or(Value::Null),
                );
            }
            if let Some(wide) = record
                .pointer("/images/wide")
                .filter(|w| !w.is_null())
            {
                obj.insert("image".to_string(), wide.clone());
            }
        }

        self.create_api_typed_item(inner, false, ctx)
    }

    fn create_api_episode_type(
        &self,
        record: &Value,
        add_parent_title: bool,
        ctx: &Ctx<'_>,
    ) -> Option<MediaItem> {
        if !ctx.state.show_videos {
            return None;
        }

        let url = self.video_url(record)?;
        let mut title = str_field(record, "name").unwrap_or_default();
        if add_parent_title {
            if let Some(parent_name) = record.pointer("/parent/name").and_then(Value::as_str) {
                title = format!("{parent_name} - {title}");
            }
        }

        let mut item = MediaItem::video(title, url);
        item.description = str_field(record, "longDescription");
        item.duration = Some(duration(record));
        item.is_geo_locked = is_geo_locked(record);

        if let Some(images) = record.get(PARENT_IMAGES).filter(|i| is_truthy(i)) {
            item.fanart = Self::get_thumb(images, 1920);
        }
        if let Some(image) = record.get("image").filter(|i| i.is_object()) {
            item.thumb = Self::get_thumb(image, 720);
        }

        if let Some(valid_from) = str_field(record, "validFrom").filter(|v| !v.is_empty()) {
            match dates::parse_api_date(&valid_from) {
                Ok(date) => item.set_datetime(date),
                Err(e) => warn!("Error setting date from {}: {}", valid_from, e),
            }
        }

        if let Some(valid_to) = str_field(record, "validTo").filter(|v| !v.is_empty()) {
            match dates::parse_expire_date(&valid_to, Local::now().year()) {
                Ok(Some(expires)) => item.set_expire_datetime(expires),
                Ok(None) => {}
                Err(e) => warn!("Error setting expire date from {}: {}", valid_to, e),
            }
        }

        if let Some(live) = record.get("live").filter(|l| l.is_object()) {
            if live.get("liveNow").and_then(Value::as_bool).unwrap_or(false) {
                item.is_live = true;
                item.name = format!("{} (live)", item.name);
            }

            if let Some(start) = live.get("start").and_then(Value::as_str) {
                match dates::parse_api_date(start) {
                    Ok(start_time) => {
                        item.set_datetime(start_time);
                        item.name = format!("{} - {}", start_time.format("%H:%M"), item.name);
                    }
                    Err(e) => warn!("Error setting live start from {}: {}", start, e),
                }
            }
        }

        item.media_type = MediaType::Video;
        if let Some(season_info) = str_field(record, "positionInSeason").filter(|s| !s.is_empty())
        {
            debug!("Found season info: {}", season_info);
            // e.g. "Säsong 2 — Avsnitt 4"
            let parts: Vec<&str> = season_info.split(' ').collect();
            if parts.len() != 5 {
                return Some(item);
            }

            match item.set_season_info(parts[1], parts[4]) {
                Ok(()) => {
                    item.media_type = MediaType::Episode;
                    if let Some(raw) = str_field(record, "nameRaw").filter(|n| !n.is_empty()) {
                        item.name = raw;
                    }
                }
                Err(e) => warn!("Failed to set season info {}: {}", season_info, e),
            }
        }

        Some(item)
    }

    fn create_api_single_type(&self, record: &Value, ctx: &Ctx<'_>) -> Option<MediaItem> {
        if !ctx.state.show_videos {
            return None;
        }

        let Some(path) = record.pointer("/urls/svtplay").and_then(Value::as_str) else {
            warn!("Single without svtplay url: {}", record);
            return None;
        };

        let mut item = MediaItem::video(
            str_field(record, "name").unwrap_or_default(),
            format!("{}{}", Self::BASE_URL, path),
        );
        item.description = str_field(record, "longDescription");
        if let Some(image) = record.get("image").filter(|i| i.is_object()) {
            item.thumb = Self::get_thumb(image, 720);
            item.fanart = Self::get_thumb(image, 1920);
        }
        item.is_geo_locked = is_geo_locked(record);

        let duration = duration(record);
        if duration > 0 {
            item.duration = Some(duration);
        }
        Some(item)
    }

    fn create_api_clip_type(&self, record: &Value, ctx: &Ctx<'_>) -> Option<MediaItem> {
        if !ctx.state.show_videos {
            return None;
        }

        let url = self.video_url(record)?;
        let mut item = MediaItem::video(str_field(record, "name").unwrap_or_default(), url);
        item.description = str_field(record, "longDescription");
        item.is_geo_locked = is_geo_locked(record);
        if let Some(image) = record.get("image").filter(|i| i.is_object()) {
            item.thumb = Self::get_thumb(image, 1920);
        }
        item.duration = Some(duration(record));
        Some(item)
    }

    fn create_api_genre_type(&self, record: &Value, ctx: &Ctx<'_>) -> Option<MediaItem> {
        if !ctx.state.show_folders {
            return None;
        }

        let mut item = MediaItem::folder(
            str_field(record, "name").unwrap_or_default(),
            "#genre_item",
            ContentType::Videos,
        );
        item.meta_data.insert(
            GENRE_ID.to_string(),
            record.get("id").cloned().unwrap_or(Value::Null),
        );
        Some(item)
    }

    fn create_api_search_hit(&self, mut record: Value, ctx: &Ctx<'_>) -> Option<MediaItem> {
        let teaser = record.get("teaser").filter(|t| is_truthy(t)).cloned();
        let category_teaser = record
            .get("categoryTeaser")
            .filter(|t| is_truthy(t))
            .cloned();

        let obj = record.as_object_mut()?;
        for extra in [&teaser, &category_teaser].into_iter().flatten() {
            if let Some(extra) = extra.as_object() {
                obj.extend(extra.clone());
            }
        }

        let name = html_to_text(
            obj.get("heading")
                .and_then(Value::as_str)
                .unwrap_or_default(),
        );
        let description = html_to_text(
            obj.get("description")
                .and_then(Value::as_str)
                .unwrap_or_default(),
        );
        obj.insert("name".to_string(), Value::from(name.clone()));
        obj.insert("heading".to_string(), Value::from(name));
        obj.insert("description".to_string(), Value::from(description));

        if teaser.is_none() {
            return self.create_api_genre_type(&record, ctx);
        }

        if record.get("__typename").and_then(Value::as_str) == Some("SearchPageHit") {
            warn!("Search hit teaser without type: {}", record);
            return None;
        }
        self.create_api_typed_item(record, false, ctx)
    }

    /// The video player api url when the record has an svt id, the svtplay
    /// page otherwise.
    fn video_url(&self, record: &Value) -> Option<String> {
        let svt_id = ["videoSvtId", "svtId"]
            .iter()
            .find_map(|key| record.get(*key).and_then(Value::as_str))
            .filter(|id| !id.is_empty());

        match svt_id {
            Some(id) => Some(format!("{}{}", Self::VIDEO_API_URL, id)),
            None => match record.pointer("/urls/svtplay").and_then(Value::as_str) {
                Some(path) => Some(format!("{}{}", Self::BASE_URL, path)),
                None => {
                    warn!("Video without id or url: {}", record);
                    None
                }
            },
        }
    }

    /// Splits the associated content of a program into folders, or into the
    /// videos of a single folder.
    pub fn split_program_folders(&self, details: &Value, parent: &MediaItem) -> Value {
        let parent_thumb = details
            .pointer("/data/detailsPageByPath/images/wide")
            .cloned()
            .unwrap_or(Value::Null);

        let mut folders: Vec<Value> = details
            .pointer("/data/detailsPageByPath/associatedContent")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|f| f.get("id").and_then(Value::as_str) != Some("upcoming"))
            .collect();

        if !self.base.settings.show_accessibility_videos {
            folders.retain(|f| f.get("selectionType").and_then(Value::as_str) != Some("accessibility"));
        }

        let with_thumb = |items: Vec<Value>| -> Value {
            Value::Array(
                items
                    .into_iter()
                    .map(|mut v| {
                        if let Some(obj) = v.as_object_mut() {
                            obj.insert(PARENT_IMAGES.to_string(), parent_thumb.clone());
                        }
                        v
                    })
                    .collect(),
            )
        };
        let items_of = |folder: &Value| -> Vec<Value> {
            folder
                .get("items")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        };

        if let Some(folder_id) = parent.meta_str(FOLDER_ID) {
            debug!("Retrieving folder with id='{}'", folder_id);
            let videos = match folders
                .iter()
                .find(|f| f.get("id").and_then(Value::as_str) == Some(folder_id))
            {
                Some(folder) => items_of(folder),
                None => {
                    warn!("Folder '{}' not found", folder_id);
                    vec![]
                }
            };
            json!({ "videos": with_thumb(videos) })
        } else if folders.len() == 1 {
            json!({ "videos": with_thumb(items_of(&folders[0])) })
        } else {
            json!({ "folders": with_thumb(folders) })
        }
    }

    async fn fetch_program_api_data(&self, ctx: &Ctx<'_>) -> Result<Payload, ChannelError> {
        let parent = ctx
            .parent
            .ok_or_else(|| ChannelError::MissingMetadata("program folder".to_string()))?;
        let slug = parent
            .meta_str(SLUG)
            .ok_or_else(|| ChannelError::MissingMetadata(SLUG.to_string()))?;

        let url = Self::get_api_url(
            "DetailsPageQuery",
            DETAILS_PAGE_HASH,
            &json!({"includeFullOppetArkiv": true, "path": slug}),
        );
        let details = self.base.get_json(&url).await?;
        Ok(Payload::Json(self.split_program_folders(&details, parent)))
    }

    /// Picks the program and clip selections out of a genre page.
    pub fn split_genre_lists(genre_page: &Value) -> Value {
        let lists = genre_page
            .pointer("/data/genres/0/selectionsForWeb")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let items_of = |selection_type: &str| -> Vec<Value> {
            lists
                .iter()
                .find(|l| l.get("selectionType").and_then(Value::as_str) == Some(selection_type))
                .and_then(|l| l.get("items"))
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|i| i.get("item").cloned())
                        .collect()
                })
                .unwrap_or_default()
        };

        json!({
            "programs": items_of("all"),
            "videos": items_of("clips"),
        })
    }

    async fn fetch_genre_api_data(&self, ctx: &Ctx<'_>) -> Result<Payload, ChannelError> {
        let genre = match ctx.parent {
            None if self.base.info.code == OPPET_ARKIV_CODE => "oppet-arkiv".to_string(),
            Some(parent) => parent
                .meta_data
                .get(GENRE_ID)
                .and_then(value_to_string)
                .ok_or_else(|| ChannelError::MissingMetadata(GENRE_ID.to_string()))?,
            None => return Err(ChannelError::MissingMetadata(GENRE_ID.to_string())),
        };

        let url = Self::get_api_url(
            "GenreProgramsAO",
            GENRE_PROGRAMS_HASH,
            &json!({"genre": [genre]}),
        );
        let genre_page = self.base.get_json(&url).await?;
        Ok(Payload::Json(Self::split_genre_lists(&genre_page)))
    }

    /// Creates a live channel item from an entry of the ChannelsQuery operation.
    pub fn create_channel_item(&self, record: Value) -> Option<MediaItem> {
        trace!("{}", record);
        let channel: LiveChannel = match serde_json::from_value(record) {
            Ok(channel) => channel,
            Err(e) => {
                warn!("Invalid channel data: {}", e);
                return None;
            }
        };

        let channel_id = match channel.id.as_str() {
            "svtb" => "barnkanalen",
            "svtk" => "kunskapskanalen",
            other => other,
        };

        let running = &channel.running;
        let start = dates::parse_local(running.start.get(..19).unwrap_or(&running.start));
        let end = dates::parse_local(running.end.get(..19).unwrap_or(&running.end));
        let (start, end) = match (start, end) {
            (Ok(start), Ok(end)) => (start, end),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Invalid schedule for channel {}: {}", channel.name, e);
                return None;
            }
        };

        let schedule = format!("{} - {}", start.format("%H:%M"), end.format("%H:%M"));
        let title = match running.sub_heading.as_deref().filter(|s| !s.is_empty()) {
            Some(episode) => format!(
                "{}: {} - {} ({})",
                channel.name, running.name, episode, schedule
            ),
            None => format!("{}: {} ({})", channel.name, running.name, schedule),
        };

        let mut item = MediaItem::video(
            title,
            format!(
                "https://www.svt.se/videoplayer-api/video/{}",
                channel_id.to_lowercase()
            ),
        );
        item.is_live = true;
        item.is_geo_locked = true;
        item.description = running.description.clone();
        item.thumb = running
            .image
            .as_ref()
            .and_then(|image| Self::get_thumb(&json!({"id": image.id, "changed": image.changed}), 720));

        if let Some(thumb_id) = channel
            .episode_thumbnail_ids
            .as_ref()
            .and_then(|ids| ids.first())
            .and_then(value_to_string)
        {
            item.thumb = Some(format!(
                "https://www.svtstatic.se/image/wide/650/{thumb_id}.jpg"
            ));
        }
        Some(item)
    }

    /// The format priority table to use.
    pub fn supported_formats(in_geo_area: bool, geo_locked: bool) -> &'static [(&'static str, u64)] {
        if in_geo_area || !geo_locked {
            GEO_AREA_FORMATS
        } else {
            ABROAD_FORMATS
        }
    }

    /// Decides, per video reference, how it becomes streams. Unsupported
    /// formats and duplicate urls are skipped; the first reference of a url wins.
    pub fn plan_streams(
        videos: &[VideoReference],
        formats: &[(&str, u64)],
        use_input_stream: bool,
    ) -> Vec<StreamPlan> {
        let mut seen: Vec<&str> = vec![];
        let mut plans = vec![];

        for video in videos {
            let video_format = video.format_label();
            let Some(&(_, priority)) = formats.iter().find(|(f, _)| *f == video_format) else {
                debug!("Skipping video format: {}", video_format);
                continue;
            };
            debug!("Found video item for format: {}", video_format);

            let Some(url) = video.url.as_deref().filter(|u| !u.is_empty()) else {
                warn!("Skipping {} reference without url", video_format);
                continue;
            };

            if seen.contains(&url) {
                debug!("Skipping duplicate stream url: {}", url);
                continue;
            }
            seen.push(url);

            if video_format.contains("dash") && use_input_stream {
                plans.push(StreamPlan::Adaptive {
                    url: url.to_string(),
                    bitrate: priority,
                });
            } else if url.contains("m3u8") {
                // drop the query, keep ".../master.m3u8"
                let url = match url.find("m3u8?") {
                    Some(index) if index > 0 => &url[..index + 4],
                    _ => url,
                };
                if url.contains("-fmp4.m3u8") || url.contains("-lowbw.m3u8") {
                    trace!("Ignoring: {}", url);
                    continue;
                }
                plans.push(StreamPlan::HlsPlaylist {
                    url: url.to_string(),
                    bitrate: priority,
                });
            } else if url.starts_with("rtmp") {
                plans.push(StreamPlan::Direct {
                    url: url.replace("_definst_", "?slist="),
                    bitrate: priority,
                });
            } else {
                plans.push(StreamPlan::Direct {
                    url: url.to_string(),
                    bitrate: 0,
                });
            }
        }

        plans
    }

    /// The first subtitle in a format the host can convert.
    pub fn pick_subtitle(subtitles: &[SubtitleReference]) -> Option<Subtitle> {
        subtitles.iter().find_map(|sub| {
            let url = sub.url.as_deref().filter(|u| !u.is_empty())?;
            let format = sub.format.as_deref().unwrap_or_default().to_lowercase();
            matches!(format.as_str(), "websrt" | "webvtt").then(|| Subtitle {
                url: url.to_string(),
                format,
            })
        })
    }

    /// Checks whether we are streaming from within Sweden.
    pub async fn validate_location(&self) -> Result<bool, ChannelError> {
        let data = self.base.get_text(&self.geo_check_url).await?;
        Ok(data.contains("return true"))
    }

    async fn update_item_from_video_references(
        &self,
        mut item: MediaItem,
        videos: &[VideoReference],
        subtitles: &[SubtitleReference],
    ) -> Result<MediaItem, ChannelError> {
        item.streams.clear();
        let use_input_stream = self.base.settings.use_adaptive_stream;
        let in_sweden = self.validate_location().await?;
        debug!("Streaming location within GEO area: {}", in_sweden);

        let formats = Self::supported_formats(in_sweden, item.is_geo_locked);
        debug!(
            "Looking for formats: {}",
            formats.iter().map(|(f, _)| *f).collect::<Vec<_>>().join(", ")
        );

        for plan in Self::plan_streams(videos, formats, use_input_stream) {
            match plan {
                StreamPlan::Adaptive { url, bitrate } => {
                    let stream = item.add_stream(url, bitrate);
                    stream.stream_format = StreamFormat::Dash;
                    stream.set_input_stream_adaptive();
                }
                StreamPlan::HlsPlaylist { url, bitrate } if use_input_stream => {
                    let stream = item.add_stream(url, bitrate);
                    stream.stream_format = StreamFormat::Hls;
                    stream.set_input_stream_adaptive();
                }
                StreamPlan::HlsPlaylist { url, bitrate } => {
                    match self
                        .extract_hls_streams(
                            &self.base.client,
                            Some(self.base.get_channel_headers().clone()),
                            &url,
                            bitrate,
                        )
                        .await
                    {
                        Ok(streams) => item.streams.extend(streams),
                        Err(e) => warn!("Failed to load HLS playlist {}: {}", url, e),
                    }
                }
                StreamPlan::Direct { url, bitrate } => {
                    item.add_stream(url, bitrate);
                }
            }
        }

        if let Some(subtitle) = Self::pick_subtitle(subtitles) {
            info!("Found subtitles to play");
            item.subtitle = Some(subtitle);
        }

        item.complete = true;
        Ok(item)
    }

    pub async fn update_video_api_item(&self, item: MediaItem) -> Result<MediaItem, ChannelError> {
        debug!(
            "Starting update of {} ({})",
            item.name, self.base.info.name
        );

        let data = self.base.get_text(&item.url).await?;
        let response: VideoPlayerResponse = serde_json::from_str(&data)?;
        trace!("{:?}", response.video_references);
        self.update_item_from_video_references(item, response.videos(), response.subtitles())
            .await
    }

    pub async fn update_video_html_item(
        &self,
        mut item: MediaItem,
    ) -> Result<MediaItem, ChannelError> {
        let data = self.base.get_text(&item.url).await?;
        let video_id = PLAY_BUTTON_REGEX
            .captures(&data)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                ChannelError::ValidationError(format!("no video id found on {}", item.url))
            })?;

        item.url = format!("https://api.svt.se/video/{video_id}");
        self.update_video_api_item(item).await
    }
}

fn str_field(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

fn is_geo_locked(record: &Value) -> bool {
    record
        .pointer("/restrictions/onlyAvailableInSweden")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

/// Duration in seconds; absent or malformed values count as zero.
fn duration(record: &Value) -> u64 {
    match record.get("duration") {
        None | Some(Value::Null) => 0,
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.parse::<f64>().map(|f| f.max(0.0) as u64).unwrap_or_else(|_| {
            warn!("Invalid duration: {}", s);
            0
        }),
        Some(other) => {
            warn!("Invalid duration: {}", other);
            0
        }
    }
}

fn is_redundant_subheading(sub_heading: &str) -> bool {
    sub_heading.contains("Idag")
        || sub_heading.contains("Ikväll")
        || sub_heading.contains("Igår")
        || sub_heading.ends_with(" sek")
        || sub_heading.ends_with(" min")
        || sub_heading.ends_with(" tim")
}

fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl HlsExtractor for Svt {}

#[async_trait]
impl ChannelHandlers for Svt {
    type Handler = SvtHandler;
    type State = SvtListingState;

    fn channel_base(&self) -> &ChannelBase {
        &self.base
    }

    fn parsers(&self) -> &ParserTable<SvtHandler> {
        &self.parsers
    }

    fn main_list_uri(&self) -> &str {
        &self.main_list_uri
    }

    async fn preprocess(
        &self,
        handler: SvtHandler,
        data: Payload,
        ctx: &mut Ctx<'_>,
    ) -> Result<(Payload, Vec<MediaItem>), ChannelError> {
        match handler {
            SvtHandler::LiveItemsAndGenres => Ok((data, self.add_live_items_and_genres())),
            SvtHandler::FoldersOrClips => {
                Self::folders_or_clips(ctx);
                Ok((data, vec![]))
            }
            SvtHandler::FetchProgramApiData => Ok((self.fetch_program_api_data(ctx).await?, vec![])),
            SvtHandler::FetchGenreApiData => Ok((self.fetch_genre_api_data(ctx).await?, vec![])),
            other => {
                warn!("{:?} is not a preprocessor", other);
                Ok((data, vec![]))
            }
        }
    }

    fn create(&self, handler: SvtHandler, record: Record, ctx: &Ctx<'_>) -> Option<MediaItem> {
        let Record::Json(record) = record else {
            warn!("SVT parsers only produce JSON records");
            return None;
        };

        match handler {
            SvtHandler::ApiTypedItem => self.create_api_typed_item(record, false, ctx),
            SvtHandler::ChannelItem => self.create_channel_item(record),
            other => {
                warn!("{:?} is not a creator", other);
                None
            }
        }
    }

    async fn update(&self, handler: SvtHandler, item: MediaItem) -> Result<MediaItem, ChannelError> {
        match handler {
            SvtHandler::VideoApi => self.update_video_api_item(item).await,
            SvtHandler::VideoHtml => self.update_video_html_item(item).await,
            other => {
                warn!("{:?} is not an updater", other);
                Ok(item)
            }
        }
    }
}

#[async_trait]
impl SiteChannel for Svt {
    fn base(&self) -> &ChannelBase {
        &self.base
    }

    fn main_list_uri(&self) -> &str {
        &self.main_list_uri
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

    async fn search_site(&self, needle: &str) -> Result<Vec<MediaItem>, ChannelError> {
        listing::search_with_template(self, &Self::search_url_template(), needle).await
    }

    fn create_item_for_url(&self, url: &str) -> MediaItem {
        let mut item = MediaItem::video(url, url);
        item.thumb = Some(Self::NO_IMAGE.to_string());
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn svt() -> Svt {
        Svt::new("svt", Client::new(), ChannelSettings::default(), None)
    }

    fn ctx(parent: Option<&MediaItem>) -> Ctx<'_> {
        ListingContext::new(parent)
    }

    #[test]
    fn test_api_url() {
        let url = Svt::get_api_url("AllGenres", ALL_GENRES_HASH, &json!({"genre": ["drama"]}));
        assert!(url.starts_with(
            "https://api.svt.se/contento/graphql?ua=svtplaywebb-play-render-prod-client&operationName=AllGenres&variables="
        ));
        assert!(url.contains("variables=%7B%22genre%22%3A%5B%22drama%22%5D%7D"));
        assert!(url.contains(ALL_GENRES_HASH));

        let search = Svt::search_url_template();
        assert!(search.starts_with("https://contento-search.svt.se/graphql?"));
        assert!(search.contains("%22querystring%22%3A%22%s%22"));
    }

    #[test]
    fn test_main_list() {
        let svt = svt();
        let items = svt.add_live_items_and_genres();

        // 8 extra items, genres, categories, programs, clips, oppet arkiv
        assert_eq!(items.len(), 13);
        assert_eq!(items[0].name, "Live TV");
        assert_eq!(items[1].meta_bool(FILTER_SUBHEADING), Some(true));
        assert_eq!(items[3].meta_bool(FILTER_SUBHEADING), Some(false));
        assert_eq!(items[2].url, listing::SEARCH_SITE_URL);
        assert_eq!(items[7].name, "New on SVT Play");

        let categories = &items[9];
        assert_eq!(categories.items.len(), 17);
        assert_eq!(categories.items[0].meta_str(GENRE_ID), Some("drama"));
        assert_eq!(categories.items[0].url, "#genre_item");

        assert_eq!(items[10].meta_str(LIST_TYPE), Some("folders"));
        assert_eq!(items[11].meta_str(LIST_TYPE), Some("videos"));
        assert_eq!(items[12].meta_str(GENRE_ID), Some("oppet-arkiv"));

        let settings = ChannelSettings {
            show_programs_folder: false,
            ..Default::default()
        };
        let svt = Svt::new("svt", Client::new(), settings, None);
        let items = svt.add_live_items_and_genres();
        assert_eq!(items.len(), 12);
        assert_eq!(items[10].meta_str(LIST_TYPE), None);
    }

    #[test]
    fn test_folders_or_clips() {
        let mut parent = MediaItem::folder("Single Episodes", "x", ContentType::Videos);
        parent
            .meta_data
            .insert(LIST_TYPE.to_string(), Value::from("videos"));
        let mut ctx = ctx(Some(&parent));
        Svt::folders_or_clips(&mut ctx);
        assert!(!ctx.state.show_folders);
        assert!(ctx.state.show_videos);

        let svt = svt();
        let show = json!({"__typename": "TvShow", "name": "Rapport", "urls": {"svtplay": "/rapport"}});
        assert!(svt.create_api_typed_item(show.clone(), false, &ctx).is_none());

        let ctx = self::ctx(None);
        let item = svt.create_api_typed_item(show, false, &ctx).unwrap();
        assert_eq!(item.url, "#program_item");
        assert_eq!(item.meta_str(SLUG), Some("/rapport"));
        assert_eq!(item.content_type, Some(ContentType::Episodes));
    }

    #[test]
    fn test_episode_url_fallback() {
        let svt = svt();
        let ctx = ctx(None);

        let with_id = json!({
            "__typename": "Episode",
            "name": "Avsnitt 1",
            "videoSvtId": "jXvGqb",
            "duration": 1740,
            "restrictions": {"onlyAvailableInSweden": true},
        });
        let item = svt.create_api_typed_item(with_id, false, &ctx).unwrap();
        assert_eq!(item.url, "https://api.svt.se/videoplayer-api/video/jXvGqb");
        assert_eq!(item.duration, Some(1740));
        assert!(item.is_geo_locked);
        assert!(!item.complete);

        let without_id = json!({
            "__typename": "Episode",
            "name": "Avsnitt 2",
            "urls": {"svtplay": "/video/abc/avsnitt-2"},
        });
        let item = svt.create_api_typed_item(without_id, false, &ctx).unwrap();
        assert_eq!(item.url, "https://www.svtplay.se/video/abc/avsnitt-2");
        assert!(!item.is_geo_locked);
    }

    #[test]
    fn test_episode_live_and_season() {
        let svt = svt();
        let ctx = ctx(None);

        let live = json!({
            "__typename": "Episode",
            "name": "Rapport",
            "svtId": "live1",
            "live": {"liveNow": true, "start": "2021-06-01T18:00:00Z"},
        });
        let item = svt.create_api_typed_item(live, false, &ctx).unwrap();
        assert_eq!(item.name, "20:00 - Rapport (live)");
        assert!(item.is_live);

        let episode = json!({
            "__typename": "Episode",
            "name": "Avsnitt 4: Flykten",
            "nameRaw": "Flykten",
            "svtId": "e4",
            "positionInSeason": "Säsong 2 — Avsnitt 4",
            "parent": {"name": "Bron"},
            "validFrom": "2021-01-15T23:30:00Z",
            "validTo": "9999-12-31T00:00:00",
        });
        let item = svt.create_api_typed_item(episode.clone(), false, &ctx).unwrap();
        assert_eq!(item.media_type, MediaType::Episode);
        assert_eq!((item.season, item.episode), (Some(2), Some(4)));
        assert_eq!(item.name, "Flykten");
        assert_eq!(
            item.broadcast_date.map(|d| d.to_string()).as_deref(),
            Some("2021-01-16 00:30:00")
        );
        assert_eq!(item.expires, None);

        let mut odd = episode;
        odd["positionInSeason"] = Value::from("Säsong 2");
        odd["nameRaw"] = Value::Null;
        let item = svt.create_api_typed_item(odd, true, &ctx).unwrap();
        assert_eq!(item.media_type, MediaType::Video);
        assert_eq!(item.name, "Bron - Avsnitt 4: Flykten");
    }

    #[test]
    fn test_unknown_type() {
        let svt = svt();
        let ctx = ctx(None);
        assert!(
            svt.create_api_typed_item(json!({"__typename": "Banner"}), false, &ctx)
                .is_none()
        );
        assert!(svt.create_api_typed_item(json!({"name": "x"}), false, &ctx).is_none());
    }

    #[test]
    fn test_teaser_subheading_filter() {
        let svt = svt();
        let teaser = json!({
            "__typename": "Teaser",
            "heading": "Rapport",
            "subHeading": "Idag 19:30",
            "description": "Nyheter",
            "images": {"wide": {"id": 1, "changed": 2}},
            "item": {"__typename": "Episode", "svtId": "r1", "name": "ignored"},
        });

        let ctx = ctx(None);
        let item = svt.create_api_typed_item(teaser.clone(), false, &ctx).unwrap();
        assert_eq!(item.name, "Rapport");
        assert_eq!(item.description.as_deref(), Some("Nyheter"));
        assert_eq!(
            item.thumb.as_deref(),
            Some("https://www.svtstatic.se/image/wide/720/1/2?quality=70")
        );

        let mut parent = MediaItem::folder("Recent", "x", ContentType::Videos);
        parent
            .meta_data
            .insert(FILTER_SUBHEADING.to_string(), Value::Bool(false));
        let ctx = self::ctx(Some(&parent));
        let item = svt.create_api_typed_item(teaser, false, &ctx).unwrap();
        assert_eq!(item.name, "Rapport - Idag 19:30");
    }

    #[test]
    fn test_selection_name_and_meta() {
        let svt = svt();
        let mut parent = MediaItem::folder("Bron", "#program_item", ContentType::Episodes);
        parent.meta_data.insert(SLUG.to_string(), Value::from("/bron"));
        parent
            .meta_data
            .insert(FOLDER_ID.to_string(), Value::from("parent-folder"));
        let ctx = ctx(Some(&parent));

        let selection = json!({"__typename": "Selection", "id": "season-2-KA2bq5E", "name": ""});
        let item = svt.create_api_typed_item(selection, false, &ctx).unwrap();
        assert_eq!(item.name, "Season 2");
        assert_eq!(item.url, "#program_item");
        assert_eq!(item.meta_str(SLUG), Some("/bron"));
        assert_eq!(item.meta_str(FOLDER_ID), Some("season-2-KA2bq5E"));

        let upcoming = json!({"__typename": "Selection", "id": "upcoming", "type": "Upcoming"});
        assert!(svt.create_api_typed_item(upcoming, false, &ctx).is_none());
    }

    #[test]
    fn test_search_hit() {
        let svt = svt();
        let ctx = ctx(None);

        let hit = json!({
            "__typename": "SearchPageHit",
            "teaser": {
                "heading": "<em>Rapport</em>",
                "description": "Nyheter &amp; väder",
                "item": {"__typename": "TvShow", "urls": {"svtplay": "/rapport"}},
            },
        });
        // the teaser fields lift onto the hit, which then has no known type
        assert!(svt.create_api_typed_item(hit, false, &ctx).is_none());

        let hit = json!({
            "__typename": "SearchPageHit",
            "teaser": {"__typename": "Single", "heading": "<em>Bron</em>", "urls": {"svtplay": "/video/1/bron"}},
        });
        let item = svt.create_api_typed_item(hit, false, &ctx).unwrap();
        assert_eq!(item.name, "Bron");
        assert_eq!(item.url, "https://www.svtplay.se/video/1/bron");

        let genre_hit = json!({
            "__typename": "SearchPageHit",
            "categoryTeaser": {"heading": "<em>Drama</em>", "id": "drama"},
        });
        let item = svt.create_api_typed_item(genre_hit, false, &ctx).unwrap();
        assert_eq!(item.name, "Drama");
        assert_eq!(item.meta_str(GENRE_ID), Some("drama"));
    }

    #[test]
    fn test_search_hit_episode_keeps_heading() {
        let svt = svt();
        let ctx = ctx(None);
        let hit = json!({
            "__typename": "SearchPageHit",
            "teaser": {
                "__typename": "Episode",
                "heading": "Avsnitt 1",
                "svtId": "b1",
                "parent": {"name": "Bron"},
            },
        });
        let item = svt.create_api_typed_item(hit, false, &ctx).unwrap();
        assert_eq!(item.name, "Avsnitt 1");
        assert_eq!(item.url, "https://api.svt.se/videoplayer-api/video/b1");
    }

    #[test]
    fn test_channel_item() {
        let svt = svt();
        let channel = json!({
            "id": "svtb",
            "name": "Barnkanalen",
            "running": {
                "name": "Bolibompa",
                "subHeading": null,
                "description": "Barnprogram",
                "image": {"id": "123", "changed": "456"},
                "start": "2021-06-01T06:00:00+02:00",
                "end": "2021-06-01T07:30:00+02:00",
            },
        });

        let item = svt.create_channel_item(channel.clone()).unwrap();
        assert_eq!(item.name, "Barnkanalen: Bolibompa (06:00 - 07:30)");
        assert_eq!(item.url, "https://www.svt.se/videoplayer-api/video/barnkanalen");
        assert!(item.is_live && item.is_geo_locked);
        assert_eq!(
            item.thumb.as_deref(),
            Some("https://www.svtstatic.se/image/wide/720/123/456?quality=70")
        );

        let mut with_episode = channel;
        with_episode["id"] = Value::from("SVT1");
        with_episode["running"]["subHeading"] = Value::from("Del 3");
        with_episode["episodeThumbnailIds"] = json!(["789"]);
        let item = svt.create_channel_item(with_episode).unwrap();
        assert_eq!(item.name, "Barnkanalen: Bolibompa - Del 3 (06:00 - 07:30)");
        assert_eq!(item.url, "https://www.svt.se/videoplayer-api/video/svt1");
        assert_eq!(
            item.thumb.as_deref(),
            Some("https://www.svtstatic.se/image/wide/650/789.jpg")
        );

        assert!(svt.create_channel_item(json!({"id": "svt2"})).is_none());
    }

    #[test]
    fn test_split_program_folders() {
        let svt = svt();
        let details = json!({"data": {"detailsPageByPath": {
            "images": {"wide": {"id": 9, "changed": 1}},
            "associatedContent": [
                {"id": "season-1", "selectionType": "season", "items": [{"n": 1}, {"n": 2}]},
                {"id": "tolkat", "selectionType": "accessibility", "items": [{"n": 3}]},
                {"id": "upcoming", "items": [{"n": 4}]},
            ],
        }}});

        let parent = MediaItem::folder("Bron", "#program_item", ContentType::Episodes);
        let split = svt.split_program_folders(&details, &parent);
        let folders = split["folders"].as_array().unwrap();
        assert_eq!(folders.len(), 2);
        assert_eq!(folders[0][PARENT_IMAGES]["id"], 9);

        let mut season = parent.clone();
        season
            .meta_data
            .insert(FOLDER_ID.to_string(), Value::from("season-1"));
        let split = svt.split_program_folders(&details, &season);
        assert_eq!(split["videos"].as_array().unwrap().len(), 2);

        season
            .meta_data
            .insert(FOLDER_ID.to_string(), Value::from("season-9"));
        let split = svt.split_program_folders(&details, &season);
        assert!(split["videos"].as_array().unwrap().is_empty());

        let settings = ChannelSettings {
            show_accessibility_videos: false,
            ..Default::default()
        };
        let svt = Svt::new("svt", Client::new(), settings, None);
        let split = svt.split_program_folders(&details, &parent);
        // a single folder is listed directly
        assert_eq!(split["videos"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_split_genre_lists() {
        let page = json!({"data": {"genres": [{"selectionsForWeb": [
            {"selectionType": "all", "items": [{"item": {"__typename": "TvShow"}}]},
            {"selectionType": "clips", "items": [{"item": {"__typename": "Clip"}}, {"item": {"__typename": "Clip"}}]},
        ]}]}});
        let split = Svt::split_genre_lists(&page);
        assert_eq!(split["programs"].as_array().unwrap().len(), 1);
        assert_eq!(split["videos"].as_array().unwrap().len(), 2);
        assert_eq!(split["videos"][0]["__typename"], "Clip");

        let empty = Svt::split_genre_lists(&json!({}));
        assert!(empty["programs"].as_array().unwrap().is_empty());
    }

    fn reference(url: &str, format: &str) -> VideoReference {
        VideoReference {
            url: Some(url.to_string()),
            format: Some(format.to_string()),
            player_type: None,
        }
    }

    #[test]
    fn test_geo_locked_abroad_formats() {
        let videos = vec![
            reference("https://svt.example/dash-full.mpd", "dash"),
            reference("https://svt.example/dash-hbbtv.mpd", "dash-hbbtv-avc"),
            reference("https://svt.example/hls-full.m3u8", "hls-ts-full"),
            reference("https://svt.example/hls-51.m3u8?alt=1", "hls-ts-avc-51"),
        ];

        let formats = Svt::supported_formats(false, true);
        let plans = Svt::plan_streams(&videos, formats, true);
        assert_eq!(
            plans,
            vec![
                StreamPlan::Adaptive {
                    url: "https://svt.example/dash-full.mpd".to_string(),
                    bitrate: 2
                },
                StreamPlan::HlsPlaylist {
                    url: "https://svt.example/hls-51.m3u8".to_string(),
                    bitrate: 1
                },
            ]
        );

        // not geo-locked items use the full table from anywhere
        assert_eq!(Svt::supported_formats(false, false), GEO_AREA_FORMATS);
        assert_eq!(Svt::supported_formats(true, true), GEO_AREA_FORMATS);
    }

    #[test]
    fn test_plan_streams_skips() {
        let videos = vec![
            VideoReference {
                url: None,
                format: Some("dash".to_string()),
                player_type: None,
            },
            reference("https://svt.example/a-fmp4.m3u8?x=1", "hls"),
            reference("https://svt.example/master.m3u8", "hls"),
            reference("https://svt.example/master.m3u8", "hls-ts-full"),
            reference("rtmp://svt.example/_definst_/stream", "hls"),
            reference("https://svt.example/video.mp4", "dash"),
            reference("https://svt.example/unknown", "wmv"),
        ];
        let plans = Svt::plan_streams(&videos, GEO_AREA_FORMATS, false);
        assert_eq!(
            plans,
            vec![
                StreamPlan::HlsPlaylist {
                    url: "https://svt.example/master.m3u8".to_string(),
                    bitrate: 0
                },
                StreamPlan::Direct {
                    url: "rtmp://svt.example/?slist=/stream".to_string(),
                    bitrate: 0
                },
                StreamPlan::Direct {
                    url: "https://svt.example/video.mp4".to_string(),
                    bitrate: 0
                },
            ]
        );
    }

    #[test]
    fn test_pick_subtitle() {
        let subs = vec![
            SubtitleReference {
                url: Some("https://svt.example/sub.xml".to_string()),
                format: Some("ttml".to_string()),
            },
            SubtitleReference {
                url: None,
                format: Some("websrt".to_string()),
            },
            SubtitleReference {
                url: Some("https://svt.example/sub.vtt".to_string()),
                format: Some("WebVTT".to_string()),
            },
        ];
        assert_eq!(
            Svt::pick_subtitle(&subs),
            Some(Subtitle {
                url: "https://svt.example/sub.vtt".to_string(),
                format: "webvtt".to_string()
            })
        );
        assert_eq!(Svt::pick_subtitle(&subs[..1]), None);
    }

    #[test]
    fn test_video_updaters_by_url() {
        let svt = svt();
        let updater = |url: &str| svt.parsers.updater_for(url).and_then(|e| e.updater);
        assert_eq!(
            updater("https://api.svt.se/videoplayer-api/video/jXvGqb"),
            Some(SvtHandler::VideoApi)
        );
        assert_eq!(
            updater("https://www.svtplay.se/klipp/123/intervju"),
            Some(SvtHandler::VideoHtml)
        );
        assert_eq!(
            updater("https://www.svt.se/videoplayer-api/video/svt1"),
            Some(SvtHandler::VideoApi)
        );
        assert_eq!(updater("https://www.svtplay.se/rapport"), None);
    }

    #[tokio::test]
    async fn test_update_video_api_item_abroad() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo.modernizr.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "Modernizr.addTest('geoip', function(){ return false; });",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/video/jXvGqb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "videoReferences": [
                    {"url": "https://svt.example/dash-full.mpd", "format": "dash"},
                    {"url": "https://svt.example/dash-hbbtv.mpd", "format": "dash-hbbtv-avc"},
                    {"url": "https://svt.example/master.m3u8?alt=x", "format": "hls"},
                    {"url": "https://svt.example/ts-full.m3u8", "format": "hls-ts-full"},
                ],
                "subtitleReferences": [
                    {"url": "https://svt.example/sub.srt", "format": "websrt"},
                ],
            })))
            .mount(&server)
            .await;

        let settings = ChannelSettings {
            use_adaptive_stream: true,
            ..Default::default()
        };
        let svt = Svt::new("svt", Client::new(), settings, None)
            .with_geo_check_url(format!("{}/geo.modernizr.js", server.uri()));

        let mut item = MediaItem::video("Rapport", format!("{}/video/jXvGqb", server.uri()));
        item.is_geo_locked = true;
        let item = svt.update_video_api_item(item).await.unwrap();

        assert!(item.complete);
        let urls: Vec<&str> = item.streams.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://svt.example/dash-full.mpd", "https://svt.example/master.m3u8"]
        );
        assert!(item.streams.iter().all(|s| s.uses_input_stream()));
        assert_eq!(item.streams[1].properties["manifest_type"], "hls");
        assert_eq!(
            item.subtitle.map(|s| s.url).as_deref(),
            Some("https://svt.example/sub.srt")
        );
    }

    async fn mount_geo_check(server: &MockServer, in_sweden: bool) {
        Mock::given(method("GET"))
            .and(path("/geo.modernizr.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "Modernizr.addTest('geoip', function(){{ return {in_sweden}; }});"
            )))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_update_video_api_item_tolerates_partial_data() {
        let server = MockServer::start().await;
        mount_geo_check(&server, true).await;
        Mock::given(method("GET"))
            .and(path("/video/partial"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "videoReferences": [
                    {"url": "https://svt.example/a.mpd", "format": "dash"},
                    {"format": "dash-hbbtv-avc"},
                    {"url": null, "format": "hls"},
                ],
                "subtitleReferences": null,
            })))
            .mount(&server)
            .await;

        let settings = ChannelSettings {
            use_adaptive_stream: true,
            ..Default::default()
        };
        let svt = Svt::new("svt", Client::new(), settings, None)
            .with_geo_check_url(format!("{}/geo.modernizr.js", server.uri()));

        let item = MediaItem::video("Rapport", format!("{}/video/partial", server.uri()));
        let item = svt.update_video_api_item(item).await.unwrap();
        assert!(item.complete);
        assert_eq!(item.streams.len(), 1);
        assert_eq!(item.streams[0].url, "https://svt.example/a.mpd");
        assert_eq!(item.subtitle, None);

        Mock::given(method("GET"))
            .and(path("/video/empty"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"videoReferences": null, "subtitleReferences": null})),
            )
            .mount(&server)
            .await;
        let item = MediaItem::video("Rapport", format!("{}/video/empty", server.uri()));
        let item = svt.update_video_api_item(item).await.unwrap();
        assert!(item.streams.is_empty());
    }

    #[tokio::test]
    async fn test_update_video_api_item_expands_hls_variants() {
        let server = MockServer::start().await;
        mount_geo_check(&server, true).await;
        Mock::given(method("GET"))
            .and(path("/m/master.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720,CODECS=\"avc1.64001f,mp4a.40.2\"
v720.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
v360.m3u8
",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/video/hls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "videoReferences": [
                    {"url": format!("{}/m/master.m3u8?alt=1", server.uri()), "format": "hls"},
                ],
            })))
            .mount(&server)
            .await;

        let svt = svt().with_geo_check_url(format!("{}/geo.modernizr.js", server.uri()));
        let item = MediaItem::video("Rapport", format!("{}/video/hls", server.uri()));
        let item = svt.update_video_api_item(item).await.unwrap();

        assert!(item.complete);
        let streams: Vec<(String, u64)> = item
            .streams
            .iter()
            .map(|s| (s.url.clone(), s.bitrate))
            .collect();
        assert_eq!(
            streams,
            vec![
                (format!("{}/m/v720.m3u8", server.uri()), 2500),
                (format!("{}/m/v360.m3u8", server.uri()), 800),
            ]
        );
        assert_eq!(item.streams[0].quality.as_deref(), Some("1280x720"));
        assert!(!item.streams[0].uses_input_stream());
    }

    #[tokio::test]
    async fn test_update_video_html_item_without_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/video/123/rapport"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let svt = svt();
        let item = MediaItem::video("Rapport", format!("{}/video/123/rapport", server.uri()));
        assert!(matches!(
            svt.update_video_html_item(item).await,
            Err(ChannelError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_main_list_without_network() {
        let svt = svt();
        let items = SiteChannel::process_folder_list(&svt, None).await.unwrap();
        assert_eq!(items.len(), 13);

        // pre-populated categories are listed as is
        let categories = items.iter().find(|i| i.name == "Categories").unwrap();
        let genres = SiteChannel::process_folder_list(&svt, Some(categories))
            .await
            .unwrap();
        assert_eq!(genres.len(), 17);
    }

    #[tokio::test]
    #[ignore = "requires network access to svtplay.se"]
    async fn test_live_programs_listing() {
        let svt = Svt::new(
            "svt",
            crate::channel::default_client().unwrap(),
            ChannelSettings::default(),
            None,
        );
        let programs = MediaItem::folder("TV Shows", svt.program_url.clone(), ContentType::TvShows);
        let items = SiteChannel::process_folder_list(&svt, Some(&programs))
            .await
            .unwrap();
        assert!(!items.is_empty());
    }
}
