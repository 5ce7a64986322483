#![forbid(unsafe_code)]

//! Streaming animated GIF encoder.
//!
//! Frames go in as RGBA8 buffers (alpha ignored), a GIF89a file comes out the
//! other end. Nothing clever happens between the two: each frame gets its own
//! palette from a modified median split over the pixels that changed since the
//! previous frame, unchanged pixels are encoded as the transparent index so
//! the decoder keeps showing the old color, and the indexed raster is
//! LZW-compressed with the plain monotone-growing dictionary strategy.
//!
//! ```no_run
//! use gifstream::{EncoderConfig, GifWriter, Rgba};
//!
//! let config = EncoderConfig::new().delay(5).bit_depth(8);
//! let mut writer = GifWriter::create("out.gif", 64, 64, config)?;
//! let frame = vec![Rgba::new(20, 40, 60, 255); 64 * 64];
//! writer.write_frame(&frame)?;
//! writer.close()?;
//! # Ok::<(), gifstream::EncodeError>(())
//! ```

mod bitstream;
mod container;
mod delta;
mod lzw;

pub mod error;
pub mod palette;
pub mod quantize;
pub mod writer;

pub use error::EncodeError;
pub use palette::Palette;
pub use quantize::DitherMode;
pub use writer::GifWriter;

/// Input pixel: 8 bits per channel, alpha consumed but ignored.
pub type Rgba = rgb::RGBA<u8>;

/// Writer-level defaults, applied to every frame that doesn't override them.
#[derive(Debug, Clone, Copy)]
pub struct EncoderConfig {
    /// Time between frames in hundredths of a second. Zero produces a still
    /// image and suppresses the looping extension.
    pub delay: u16,
    /// Palette size exponent: each frame's local color table gets
    /// 2^bit_depth entries. Must be in 1..=8.
    pub bit_depth: u8,
    /// Quantization strategy.
    pub dither: DitherMode,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            delay: 0,
            bit_depth: 8,
            dither: DitherMode::None,
        }
    }
}

impl EncoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(mut self, centiseconds: u16) -> Self {
        self.delay = centiseconds;
        self
    }

    pub fn bit_depth(mut self, bits: u8) -> Self {
        self.bit_depth = bits;
        self
    }

    pub fn dither(mut self, mode: DitherMode) -> Self {
        self.dither = mode;
        self
    }
}

/// Per-frame overrides. Delay, palette depth, and dithering are all legal to
/// change mid-animation; the frame dimensions are not.
#[derive(Debug, Clone, Copy)]
pub struct FrameParams {
    pub delay: u16,
    pub bit_depth: u8,
    pub dither: DitherMode,
}

impl From<&EncoderConfig> for FrameParams {
    fn from(config: &EncoderConfig) -> Self {
        Self {
            delay: config.delay,
            bit_depth: config.bit_depth,
            dither: config.dither,
        }
    }
}
