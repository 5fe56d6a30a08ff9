//! Channel parsers for media-browsing front-ends.
//!
//! A channel turns the pages and APIs of one content site into
//! [`media::MediaItem`] listings and resolves playable streams on demand.
//! Channels are created through [`channel::factory::ChannelFactory`].

pub mod channel;
pub mod media;
