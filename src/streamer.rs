use bytes::Bytes;

use crate::color::{Color, Palette, RandomSource, XorShift64, RESET};
use crate::config::{LoopMode, StreamConfig};
use crate::error::Result;
use crate::frame::{Frame, FrameSet};

/// Clear screen, clear scrollback, move the cursor home.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[3J\x1b[H";

/// Trait for streaming items, similar to `Iterator`.
pub trait Streamer {
    /// The type of item yielded by the streamer.
    type Item;
    /// Return the next item in the stream, or None if finished.
    fn next(&mut self) -> Option<Self::Item>;
    /// Consume the streamer and collect all remaining items into a Vec.
    fn collect(mut self) -> Vec<Self::Item>
    where
        Self: Sized,
    {
        let mut v = Vec::new();
        while let Some(item) = self.next() {
            v.push(item);
        }
        v
    }
}

/// One frame ready to be written: the frame at `index` with its chosen color.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedFrame {
    pub index: usize,
    pub color: Color,
    pub frame: Frame,
    colorize: bool,
}

impl RenderedFrame {
    /// Full chunk text: clear-screen prefix, (colored) frame, trailing newline.
    pub fn payload(&self) -> String {
        let text = self.frame.as_str();
        let mut out = String::with_capacity(CLEAR_SCREEN.len() + text.len() + 16);
        out.push_str(CLEAR_SCREEN);
        if self.colorize {
            out.push_str(self.color.code());
            out.push_str(text);
            out.push_str(RESET);
        } else {
            out.push_str(text);
        }
        out.push('\n');
        out
    }

    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.payload())
    }
}

/// Playback cursor over a frame set: yields frames in index order, each with a
/// color different from the one before it.
pub struct FrameStreamer<R = XorShift64> {
    frames: FrameSet,
    palette: Palette,
    rng: R,
    cursor: usize,
    last_color: Option<Color>,
    emitted: usize,
    loop_mode: LoopMode,
    colorize: bool,
}

impl<R: RandomSource> FrameStreamer<R> {
    /// Fails with `EmptyInput` when `frames` is empty. With `flip`, every frame
    /// is replaced by its reversed text up front.
    pub fn new(frames: Vec<Frame>, flip: bool, config: &StreamConfig, rng: R) -> Result<Self> {
        let mut frames = FrameSet::new(frames)?;
        if flip {
            frames = frames.flipped();
        }
        Ok(FrameStreamer {
            frames,
            palette: config.palette.clone(),
            rng,
            cursor: 0,
            last_color: None,
            emitted: 0,
            loop_mode: config.loop_mode,
            colorize: config.colorize,
        })
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// True once a one-pass stream has yielded every frame. Never true when looping.
    pub fn is_finished(&self) -> bool {
        self.loop_mode == LoopMode::Once && self.emitted >= self.frames.len()
    }
}

impl<R: RandomSource> Streamer for FrameStreamer<R> {
    type Item = RenderedFrame;

    fn next(&mut self) -> Option<RenderedFrame> {
        if self.is_finished() {
            return None;
        }
        let color = self.palette.next(self.last_color, &mut self.rng);
        self.last_color = Some(color);
        let index = self.cursor;
        let frame = self.frames.get(index)?.clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        self.emitted += 1;
        Some(RenderedFrame {
            index,
            color,
            frame,
            colorize: self.colorize,
        })
    }
}
