use serde::{Deserialize, Serialize};

/// User-tunable behaviour shared by all channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    /// Split the program listing into a "TV shows" and a "single episodes" folder
    pub show_programs_folder: bool,

    /// Keep sign language / audio described selections in program listings
    pub show_accessibility_videos: bool,

    /// Hand DASH and HLS manifests to an adaptive input stream instead of
    /// expanding them into separate streams
    pub use_adaptive_stream: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            show_programs_folder: true,
            show_accessibility_videos: true,
            use_adaptive_stream: false,
        }
    }
}
