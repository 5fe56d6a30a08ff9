use serde::Deserialize;
use serde_json::Value;

/// Response of the video player api, e.g. `https://api.svt.se/videoplayer-api/video/{id}`.
///
/// Both lists may be missing or `null`.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VideoPlayerResponse {
    #[serde(default)]
    pub video_references: Option<Vec<VideoReference>>,
    #[serde(default)]
    pub subtitle_references: Option<Vec<SubtitleReference>>,
}

impl VideoPlayerResponse {
    pub fn videos(&self) -> &[VideoReference] {
        self.video_references.as_deref().unwrap_or_default()
    }

    pub fn subtitles(&self) -> &[SubtitleReference] {
        self.subtitle_references.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct VideoReference {
    pub url: Option<String>,
    pub format: Option<String>,
    pub player_type: Option<String>,
}

impl VideoReference {
    /// `format`, or `playerType` for older responses, lowercased.
    pub fn format_label(&self) -> String {
        self.format
            .as_deref()
            .filter(|f| !f.is_empty())
            .or(self.player_type.as_deref())
            .unwrap_or_default()
            .to_lowercase()
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SubtitleReference {
    pub url: Option<String>,
    pub format: Option<String>,
}

/// Thumbnail reference of the contento GraphQL api.
#[derive(Debug, Deserialize, Clone)]
pub struct ImageRef {
    pub id: Value,
    pub changed: Value,
}

/// An entry of `data.channels.channels` from the ChannelsQuery operation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChannel {
    pub id: String,
    pub name: String,
    pub running: RunningProgram,
    #[serde(default)]
    pub episode_thumbnail_ids: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningProgram {
    pub name: String,
    pub sub_heading: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageRef>,
    pub start: String,
    pub end: String,
}
