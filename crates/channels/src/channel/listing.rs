//! The fetch, preprocess, parse and create loop shared by all channels.

use std::fmt::Debug;

use async_trait::async_trait;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::error::ChannelError;
use super::parser_data::{Parser, ParserTable};
use super::site_channel::ChannelBase;
use crate::media::{ContentType, MediaItem};

/// Url of main list folders that ask the user for a search term.
pub const SEARCH_SITE_URL: &str = "searchSite";

/// Data loaded for a listing, as handed from step to step.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    pub fn empty() -> Self {
        Payload::Text(String::new())
    }

    pub fn as_text(&self) -> &str {
        match self {
            Payload::Text(text) => text,
            Payload::Json(_) => "",
        }
    }

    /// Converts a text payload into JSON. An empty text becomes `null`.
    pub fn into_json(self) -> Result<Self, ChannelError> {
        match self {
            Payload::Text(text) if text.trim().is_empty() => Ok(Payload::Json(Value::Null)),
            Payload::Text(text) => Ok(Payload::Json(serde_json::from_str(&text)?)),
            json => Ok(json),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }
}

/// One regex match: positional groups (group 1 at index 0) and named groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegexRecord {
    pub groups: Vec<Option<String>>,
    pub named: FxHashMap<String, String>,
}

impl RegexRecord {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    pub fn named(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Json(Value),
    Regex(RegexRecord),
}

/// State of one listing request.
#[derive(Debug)]
pub struct ListingContext<'a, S> {
    pub parent: Option<&'a MediaItem>,
    pub state: S,
}

impl<'a, S: Default> ListingContext<'a, S> {
    pub fn new(parent: Option<&'a MediaItem>) -> Self {
        Self {
            parent,
            state: S::default(),
        }
    }
}

/// Binds a channel's handler values to the code they stand for.
#[async_trait]
pub trait ChannelHandlers: Send + Sync {
    type Handler: Copy + Debug + Send + Sync;
    /// Per-listing state, created fresh for every listing.
    type State: Default + Send + Sync;

    fn channel_base(&self) -> &ChannelBase;

    fn parsers(&self) -> &ParserTable<Self::Handler>;

    fn main_list_uri(&self) -> &str;

    async fn preprocess(
        &self,
        handler: Self::Handler,
        data: Payload,
        ctx: &mut ListingContext<'_, Self::State>,
    ) -> Result<(Payload, Vec<MediaItem>), ChannelError>;

    fn create(
        &self,
        handler: Self::Handler,
        record: Record,
        ctx: &ListingContext<'_, Self::State>,
    ) -> Option<MediaItem>;

    async fn update(
        &self,
        handler: Self::Handler,
        item: MediaItem,
    ) -> Result<MediaItem, ChannelError>;
}

pub fn regex_records(regex: &Regex, text: &str) -> Vec<RegexRecord> {
    let names: Vec<&str> = regex.capture_names().flatten().collect();
    regex
        .captures_iter(text)
        .map(|caps| RegexRecord {
            groups: (1..caps.len())
                .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                .collect(),
            named: names
                .iter()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect(),
        })
        .collect()
}

/// Lists `parent` (or the channel's main list) through the parser table.
pub async fn process_folder_list<C>(
    channel: &C,
    parent: Option<&MediaItem>,
) -> Result<Vec<MediaItem>, ChannelError>
where
    C: ChannelHandlers + ?Sized,
{
    if let Some(parent) = parent {
        if !parent.items.is_empty() {
            debug!("Using {} pre-populated items of {}", parent.items.len(), parent.name);
            return Ok(parent.items.clone());
        }
    }

    let url = parent
        .map(|p| p.url.as_str())
        .unwrap_or_else(|| channel.main_list_uri());

    let entries = channel.parsers().entries_for_listing(url);
    if entries.is_empty() {
        warn!("No parsers registered for {}", url);
        return Ok(vec![]);
    }
    debug!(
        "Processing {} with parsers: {}",
        url,
        entries.iter().map(|e| e.label()).collect::<Vec<_>>().join(", ")
    );

    let mut data = if url.starts_with('#') {
        Payload::empty()
    } else {
        Payload::Text(channel.channel_base().get_text(url).await?)
    };

    let mut ctx = ListingContext::<C::State>::new(parent);
    let mut items = vec![];

    for entry in &entries {
        if let Some(handler) = entry.preprocessor {
            trace!("Running preprocessor {:?}", handler);
            let (new_data, mut new_items) = channel.preprocess(handler, data, &mut ctx).await?;
            data = new_data;
            items.append(&mut new_items);
        }
    }

    for entry in &entries {
        let (Some(parser), Some(creator)) = (&entry.parser, entry.creator) else {
            continue;
        };

        if entry.json {
            data = data.into_json()?;
        }

        let records: Vec<Record> = match parser {
            Parser::Json(path) => match data.as_json() {
                Some(json) => path.records(json).into_iter().map(Record::Json).collect(),
                None => {
                    warn!("Parser {} expects JSON data", entry.label());
                    vec![]
                }
            },
            Parser::Regex(regex) => regex_records(regex, data.as_text())
                .into_iter()
                .map(Record::Regex)
                .collect(),
        };
        debug!("Parser {} found {} records", entry.label(), records.len());

        items.extend(
            records
                .into_iter()
                .filter_map(|record| channel.create(creator, record, &ctx)),
        );
    }

    Ok(items)
}

/// Sends `item` through the updater registered for its url.
pub async fn process_video_item<C>(channel: &C, item: MediaItem) -> Result<MediaItem, ChannelError>
where
    C: ChannelHandlers + ?Sized,
{
    let handler = channel
        .parsers()
        .updater_for(&item.url)
        .and_then(|entry| entry.updater);

    match handler {
        Some(handler) => {
            debug!("Updating {} ({}) with {:?}", item.name, item.url, handler);
            let mut item = channel.update(handler, item).await?;
            // only playable items count as complete
            if item.complete && !item.has_streams() {
                warn!("No streams found for {}", item.name);
                item.complete = false;
            }
            Ok(item)
        }
        None => {
            warn!("No updater found for {}", item.url);
            Ok(item)
        }
    }
}

/// Lists the results of a search url template with a `%s` placeholder.
pub async fn search_with_template<C>(
    channel: &C,
    template: &str,
    needle: &str,
) -> Result<Vec<MediaItem>, ChannelError>
where
    C: ChannelHandlers + ?Sized,
{
    let url = template.replace("%s", &urlencoding::encode(needle));
    let search = MediaItem::folder(format!("Search: {needle}"), url, ContentType::Videos);
    process_folder_list(channel, Some(&search)).await
}
