use async_trait::async_trait;
use m3u8_rs::{MasterPlaylist, Playlist};
use reqwest::Client;
use url::Url;

use super::error::ChannelError;
use crate::media::{MediaStream, StreamFormat};

#[async_trait]
pub trait HlsExtractor {
    /// Loads an HLS playlist and returns one stream per variant of a master
    /// playlist, or a single stream for a media playlist.
    ///
    /// Variants get their bandwidth in kbps as bitrate; a media playlist gets
    /// `fallback_bitrate`.
    async fn extract_hls_streams(
        &self,
        client: &Client,
        headers: Option<reqwest::header::HeaderMap>,
        m3u8_url: &str,
        fallback_bitrate: u64,
    ) -> Result<Vec<MediaStream>, ChannelError> {
        let base_url =
            Url::parse(m3u8_url).map_err(|e| ChannelError::InvalidUrl(format!("{m3u8_url}: {e}")))?;

        let response = client
            .get(m3u8_url)
            .headers(headers.unwrap_or_default())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        parse_hls_streams(&response, &base_url, fallback_bitrate)
    }
}

pub fn parse_hls_streams(
    playlist: &[u8],
    base_url: &Url,
    fallback_bitrate: u64,
) -> Result<Vec<MediaStream>, ChannelError> {
    let playlist = m3u8_rs::parse_playlist_res(playlist)
        .map_err(|e| ChannelError::HlsPlaylistError(e.to_string()))?;

    let streams = match playlist {
        Playlist::MasterPlaylist(pl) => process_master_playlist(pl, base_url)?,
        Playlist::MediaPlaylist(_) => {
            let mut stream = MediaStream::new(base_url.as_str(), fallback_bitrate);
            stream.stream_format = StreamFormat::Hls;
            vec![stream]
        }
    };

    Ok(streams)
}

fn process_master_playlist(
    playlist: MasterPlaylist,
    base_url: &Url,
) -> Result<Vec<MediaStream>, ChannelError> {
    playlist
        .variants
        .into_iter()
        // I-frame only variants cannot be played on their own
        .filter(|variant| !variant.is_i_frame)
        .map(|variant| {
            let stream_url = base_url
                .join(&variant.uri)
                .map_err(|e| ChannelError::HlsPlaylistError(e.to_string()))?;

            let mut stream = MediaStream::new(stream_url.as_str(), variant.bandwidth / 1000);
            stream.stream_format = StreamFormat::Hls;
            stream.quality = variant
                .resolution
                .map(|r| format!("{}x{}", r.width, r.height));
            stream.codec = variant.codecs.unwrap_or_default();
            Ok(stream)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720,CODECS=\"avc1.64001f,mp4a.40.2\"
hls-video-720.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
https://cdn.example.com/abs/hls-video-360.m3u8
";

    const MEDIA: &str = "#EXTM3U
#EXT-X-TARGETDURATION:6
#EXTINF:6.0,
seg1.ts
#EXT-X-ENDLIST
";

    #[test]
    fn test_master_playlist_variants() {
        let base = Url::parse("https://svt-vod.example.com/d0/se/master.m3u8").unwrap();
        let streams = parse_hls_streams(MASTER.as_bytes(), &base, 0).unwrap();

        assert_eq!(streams.len(), 2);
        assert_eq!(
            streams[0].url,
            "https://svt-vod.example.com/d0/se/hls-video-720.m3u8"
        );
        assert_eq!(streams[0].bitrate, 2500);
        assert_eq!(streams[0].quality.as_deref(), Some("1280x720"));
        assert_eq!(streams[0].codec, "avc1.64001f,mp4a.40.2");
        assert_eq!(streams[1].url, "https://cdn.example.com/abs/hls-video-360.m3u8");
        assert_eq!(streams[1].bitrate, 800);
    }

    #[test]
    fn test_media_playlist_single_stream() {
        let base = Url::parse("https://example.com/live/index.m3u8").unwrap();
        let streams = parse_hls_streams(MEDIA.as_bytes(), &base, 3).unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].bitrate, 3);
        assert_eq!(streams[0].stream_format, StreamFormat::Hls);
    }
}
