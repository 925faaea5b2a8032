use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Result, StreamError};

/// One still text image of the animation. Cheap to clone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame(Arc<str>);

impl Frame {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Frame(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reverse the frame text by grapheme cluster, so `\r\n` pairs and
    /// combining marks stay intact. Lines are not reordered separately: the
    /// whole block is mirrored end to end.
    pub fn flipped(&self) -> Frame {
        let reversed: String = self.0.graphemes(true).rev().collect();
        Frame::new(reversed)
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Frame::new(text)
    }
}

impl From<&str> for Frame {
    fn from(text: &str) -> Self {
        Frame::new(text)
    }
}

/// Ordered, non-empty collection of frames owned by one session.
#[derive(Clone, Debug)]
pub struct FrameSet {
    frames: Vec<Frame>,
}

impl FrameSet {
    /// Build a frame set, rejecting an empty sequence.
    pub fn new(frames: Vec<Frame>) -> Result<Self> {
        if frames.is_empty() {
            return Err(StreamError::EmptyInput);
        }
        Ok(FrameSet { frames })
    }

    /// Replace every frame by its reversed form. Sequence order is unchanged.
    pub fn flipped(self) -> Self {
        let frames = self.frames.iter().map(Frame::flipped).collect();
        FrameSet { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false; an empty set cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }
}
