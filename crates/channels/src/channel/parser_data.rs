//! The declarative dispatch table a channel fills in its constructor.
//!
//! Each entry binds a url matcher to an optional preprocessor, parser,
//! creator and updater. The handlers are channel specific values of type `H`
//! which the channel interprets in its [`ChannelHandlers`] implementation.
//!
//! [`ChannelHandlers`]: super::listing::ChannelHandlers

use regex::Regex;

use super::json_path::JsonPath;

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlMatch {
    Exact(String),
    Start(String),
    Wildcard,
}

impl UrlMatch {
    pub fn key(&self) -> &str {
        match self {
            UrlMatch::Exact(key) | UrlMatch::Start(key) => key,
            UrlMatch::Wildcard => WILDCARD,
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        match self {
            UrlMatch::Exact(key) => key == url,
            UrlMatch::Start(key) => url.starts_with(key.as_str()),
            UrlMatch::Wildcard => true,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, UrlMatch::Wildcard)
    }
}

#[derive(Debug, Clone)]
pub enum Parser {
    /// Records are found at a path inside a JSON payload
    Json(JsonPath),
    /// Records are the matches of a regex over a text payload
    Regex(Regex),
}

#[derive(Debug, Clone)]
pub struct ParserEntry<H> {
    pub name: Option<&'static str>,
    pub matcher: UrlMatch,
    pub json: bool,
    pub preprocessor: Option<H>,
    pub parser: Option<Parser>,
    pub creator: Option<H>,
    pub updater: Option<H>,
}

impl<H> ParserEntry<H> {
    pub fn new(matcher: UrlMatch) -> Self {
        Self {
            name: None,
            matcher,
            json: false,
            preprocessor: None,
            parser: None,
            creator: None,
            updater: None,
        }
    }

    pub fn exact<S: Into<String>>(url: S) -> Self {
        Self::new(UrlMatch::Exact(url.into()))
    }

    pub fn start<S: Into<String>>(url: S) -> Self {
        Self::new(UrlMatch::Start(url.into()))
    }

    pub fn wildcard() -> Self {
        Self::new(UrlMatch::Wildcard)
    }

    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn preprocessor(mut self, handler: H) -> Self {
        self.preprocessor = Some(handler);
        self
    }

    pub fn json_parser(mut self, path: JsonPath) -> Self {
        self.parser = Some(Parser::Json(path));
        self
    }

    pub fn regex_parser(mut self, regex: Regex) -> Self {
        self.parser = Some(Parser::Regex(regex));
        self
    }

    pub fn creator(mut self, handler: H) -> Self {
        self.creator = Some(handler);
        self
    }

    pub fn updater(mut self, handler: H) -> Self {
        self.updater = Some(handler);
        self
    }

    pub fn label(&self) -> &str {
        match self.name {
            Some(name) => name,
            None => self.matcher.key(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParserTable<H> {
    entries: Vec<ParserEntry<H>>,
}

impl<H> Default for ParserTable<H> {
    fn default() -> Self {
        Self { entries: vec![] }
    }
}

impl<H> ParserTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: ParserEntry<H>) -> &mut Self {
        self.entries.push(entry);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries used to list `url`, in registration order.
    ///
    /// When several keys match, only the entries of the longest key are
    /// kept. Wildcard entries are used when nothing else matches.
    pub fn entries_for_listing(&self, url: &str) -> Vec<&ParserEntry<H>> {
        Self::select(self.entries.iter(), url)
    }

    /// The entry whose updater resolves streams for `url`.
    pub fn updater_for(&self, url: &str) -> Option<&ParserEntry<H>> {
        Self::select(self.entries.iter().filter(|e| e.updater.is_some()), url)
            .into_iter()
            .next()
    }

    fn select<'a, I>(entries: I, url: &str) -> Vec<&'a ParserEntry<H>>
    where
        I: Iterator<Item = &'a ParserEntry<H>> + Clone,
    {
        let longest = entries
            .clone()
            .filter(|e| !e.matcher.is_wildcard() && e.matcher.matches(url))
            .map(|e| e.matcher.key().len())
            .max();

        match longest {
            Some(len) => entries
                .filter(|e| {
                    !e.matcher.is_wildcard()
                        && e.matcher.matches(url)
                        && e.matcher.key().len() == len
                })
                .collect(),
            None => entries.filter(|e| e.matcher.is_wildcard()).collect(),
        }
    }
}
