use std::sync::LazyLock;

use super::error::ChannelError;
use super::settings::ChannelSettings;
use super::site_channel::SiteChannel;
use crate::channel::sites::{self, svt::Svt, vtm::Vtm};
use regex::Regex;
use reqwest::Client;

// A type alias for a thread-safe constructor function.
type ChannelConstructor = fn(Client, ChannelSettings, Option<String>) -> Box<dyn SiteChannel>;

struct ChannelEntry {
    code: &'static str,
    regex: &'static LazyLock<Regex>,
    constructor: ChannelConstructor,
}

// Macro to create a constructor function for a given channel
macro_rules! create_constructor {
    ($name:ident, $builder:expr) => {
        fn $name(
            client: Client,
            settings: ChannelSettings,
            cookies: Option<String>,
        ) -> Box<dyn SiteChannel> {
            Box::new($builder(client, settings, cookies))
        }
    };
}

create_constructor!(new_svt, |client, settings, cookies| {
    Svt::new("svt", client, settings, cookies)
});
create_constructor!(new_oppetarkiv, |client, settings, cookies| {
    Svt::new(sites::svt::OPPET_ARKIV_CODE, client, settings, cookies)
});
create_constructor!(new_vtm, Vtm::new);

// Static channel registry, first url match wins
static CHANNELS: &[ChannelEntry] = &[
    ChannelEntry {
        code: "svt",
        regex: &sites::svt::URL_REGEX,
        constructor: new_svt,
    },
    ChannelEntry {
        code: sites::svt::OPPET_ARKIV_CODE,
        regex: &sites::svt::URL_REGEX,
        constructor: new_oppetarkiv,
    },
    ChannelEntry {
        code: "vtm",
        regex: &sites::vtm::URL_REGEX,
        constructor: new_vtm,
    },
];

/// A factory for creating site channels.
pub struct ChannelFactory {
    client: Client,
    settings: ChannelSettings,
}

impl ChannelFactory {
    pub fn new(client: Client, settings: ChannelSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }

    /// Codes of all known channels.
    pub fn supported_channels() -> Vec<&'static str> {
        CHANNELS.iter().map(|c| c.code).collect()
    }

    pub fn create_channel(
        &self,
        code: &str,
        cookies: Option<String>,
    ) -> Result<Box<dyn SiteChannel>, ChannelError> {
        CHANNELS
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .map(|c| (c.constructor)(self.client.clone(), self.settings.clone(), cookies))
            .ok_or_else(|| ChannelError::UnsupportedChannel(code.to_string()))
    }

    /// The channel that handles `url`.
    pub fn channel_for_url(
        &self,
        url: &str,
        cookies: Option<String>,
    ) -> Result<Box<dyn SiteChannel>, ChannelError> {
        for channel in CHANNELS {
            if channel.regex.is_match(url) {
                return Ok((channel.constructor)(
                    self.client.clone(),
                    self.settings.clone(),
                    cookies,
                ));
            }
        }
        Err(ChannelError::UnsupportedChannel(url.to_string()))
    }
}
