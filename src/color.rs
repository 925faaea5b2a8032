//! Color tokens, their ANSI escape codes, and non-repeating random selection.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, StreamError};

/// Resets the terminal back to its default foreground color.
pub const RESET: &str = "\x1b[0m";

/// One entry of the fixed 7-color palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Color {
    Red,
    Yellow,
    Green,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Color {
    pub const ALL: [Color; 7] = [
        Color::Red,
        Color::Yellow,
        Color::Green,
        Color::Blue,
        Color::Magenta,
        Color::Cyan,
        Color::White,
    ];

    /// ANSI escape sequence that switches the foreground to this color.
    pub fn code(self) -> &'static str {
        match self {
            Color::Red => "\x1b[31m",
            Color::Yellow => "\x1b[33m",
            Color::Green => "\x1b[32m",
            Color::Blue => "\x1b[34m",
            Color::Magenta => "\x1b[35m",
            Color::Cyan => "\x1b[36m",
            Color::White => "\x1b[37m",
        }
    }
}

/// Source of uniformly distributed indices.
pub trait RandomSource: Send {
    /// Return a value in `0..bound`. `bound` is never zero.
    fn below(&mut self, bound: usize) -> usize;
}

/// Small xorshift64* generator. Deterministic for a given seed.
#[derive(Clone, Debug)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub fn new(seed: u64) -> Self {
        // zero is a fixed point of xorshift
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        XorShift64 { state }
    }

    /// Seed from the per-process hasher keys mixed with the current time.
    pub fn from_entropy() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let mut hasher = RandomState::new().build_hasher();
        hasher.write_u64(nanos);
        XorShift64::new(hasher.finish())
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }
}

impl RandomSource for XorShift64 {
    fn below(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }
}

/// Set of at least two distinct colors to draw from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    /// Build a palette, dropping duplicates. Fewer than two distinct colors
    /// is rejected since consecutive frames must differ in color.
    pub fn new(colors: Vec<Color>) -> Result<Self> {
        let mut distinct: Vec<Color> = Vec::with_capacity(colors.len());
        for color in colors {
            if !distinct.contains(&color) {
                distinct.push(color);
            }
        }
        if distinct.len() < 2 {
            return Err(StreamError::InvalidPalette(
                "at least two distinct colors are required",
            ));
        }
        Ok(Palette { colors: distinct })
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Pick a color uniformly at random, resampling until it differs from
    /// `previous`.
    pub fn next(&self, previous: Option<Color>, rng: &mut dyn RandomSource) -> Color {
        loop {
            let color = self.colors[rng.below(self.colors.len())];
            if Some(color) != previous {
                return color;
            }
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            colors: Color::ALL.to_vec(),
        }
    }
}
