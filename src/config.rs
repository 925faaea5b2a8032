use std::time::Duration;

use crate::color::Palette;

/// Delay between two emitted frames.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(70);
/// Frames `0.txt` through `9.txt`.
pub const DEFAULT_FRAME_COUNT: usize = 10;
pub const DEFAULT_BASE_URL: &str =
    "https://raw.githubusercontent.com/EducatedSuddenBucket/parrot.live/master/frames/";
pub const DEFAULT_REDIRECT_URL: &str = "https://esb.is-a.dev";
/// Substring of the User-Agent that marks a terminal client.
pub const DEFAULT_CLI_MARKER: &str = "curl";

/// What happens after the last frame has been emitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopMode {
    /// Wrap around to the first frame until the client disconnects.
    #[default]
    Loop,
    /// Stop after one full pass and close the stream.
    Once,
}

/// Playback settings for one streaming session.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    pub interval: Duration,
    pub loop_mode: LoopMode,
    /// Wrap each frame in its color's escape codes. When off, colors are still
    /// chosen and reported but the frame text is sent bare.
    pub colorize: bool,
    pub palette: Palette,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            interval: DEFAULT_INTERVAL,
            loop_mode: LoopMode::Loop,
            colorize: true,
            palette: Palette::default(),
        }
    }
}

/// Settings for the HTTP front end.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub stream: StreamConfig,
    /// Number of frames fetched per request, indices `0..frame_count`.
    pub frame_count: usize,
    /// Where browsers are sent instead of an endless stream.
    pub redirect_url: String,
    pub cli_marker: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            stream: StreamConfig::default(),
            frame_count: DEFAULT_FRAME_COUNT,
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            cli_marker: DEFAULT_CLI_MARKER.to_string(),
        }
    }
}
