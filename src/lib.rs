pub mod color;
pub mod config;
mod error;
mod frame;
pub mod server;
pub mod session;
pub mod source;
mod streamer;

pub use color::{Color, Palette, RandomSource, XorShift64};
pub use config::{AppConfig, LoopMode, StreamConfig};
pub use error::{Result, StreamError};
pub use frame::{Frame, FrameSet};
pub use server::{router, AppState};
pub use session::{FrameSink, Session, SessionState};
pub use source::{fetch_frames, DirSource, FrameSource, HttpSource};
pub use streamer::{FrameStreamer, RenderedFrame, Streamer, CLEAR_SCREEN};
