//! The streaming writer: one sink, one previous-frame buffer, frames encoded
//! in call order.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, trace};

use crate::container;
use crate::error::EncodeError;
use crate::lzw;
use crate::palette::Palette;
use crate::quantize::{self, DitherMode};
use crate::{EncoderConfig, FrameParams, Rgba};

/// Incremental animated GIF encoder over any byte sink.
///
/// Frames are consumed in order; after the first, each frame is delta-encoded
/// against the quantized previous frame, so unchanged pixels cost almost
/// nothing. The trailer byte is written when the writer is closed, or on
/// drop, so an abandoned writer still leaves a well-terminated file behind.
pub struct GifWriter<W: Write> {
    sink: Option<W>,
    /// After each frame: the quantized RGBA the decoder reconstructs, with
    /// the palette index of every pixel in the alpha channel.
    previous: Vec<Rgba>,
    first_frame: bool,
    width: u16,
    height: u16,
    config: EncoderConfig,
}

impl GifWriter<BufWriter<File>> {
    /// Create `path` and write the file header. A `config.delay` of zero
    /// produces a still image without the looping extension.
    pub fn create<P: AsRef<Path>>(
        path: P,
        width: u16,
        height: u16,
        config: EncoderConfig,
    ) -> Result<Self, EncodeError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| EncodeError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("created {}", path.display());
        Self::new(BufWriter::new(file), width, height, config)
    }
}

impl<W: Write> GifWriter<W> {
    /// Wrap an arbitrary sink and write the file header.
    pub fn new(
        mut sink: W,
        width: u16,
        height: u16,
        config: EncoderConfig,
    ) -> Result<Self, EncodeError> {
        if width == 0 || height == 0 {
            return Err(EncodeError::ZeroDimension);
        }
        check_bit_depth(config.bit_depth)?;

        container::write_header(&mut sink, width, height, config.delay != 0)?;
        debug!(
            "opened {}x{} stream (delay {}, bit depth {}, dither {:?})",
            width, height, config.delay, config.bit_depth, config.dither
        );

        let num_pixels = usize::from(width) * usize::from(height);
        Ok(Self {
            sink: Some(sink),
            previous: vec![Rgba::new(0, 0, 0, 0); num_pixels],
            first_frame: true,
            width,
            height,
            config,
        })
    }

    /// Encode one frame with the writer-level defaults.
    pub fn write_frame(&mut self, frame: &[Rgba]) -> Result<(), EncodeError> {
        let params = FrameParams::from(&self.config);
        self.write_frame_with(frame, &params)
    }

    /// Encode one frame, overriding delay, bit depth, or dithering for this
    /// frame only.
    pub fn write_frame_with(
        &mut self,
        frame: &[Rgba],
        params: &FrameParams,
    ) -> Result<(), EncodeError> {
        let sink = self.sink.as_mut().ok_or(EncodeError::WriterClosed)?;
        check_bit_depth(params.bit_depth)?;

        let width = usize::from(self.width);
        let height = usize::from(self.height);
        if frame.len() != width * height {
            return Err(EncodeError::DimensionMismatch {
                len: frame.len(),
                width: self.width,
                height: self.height,
            });
        }

        let previous = if self.first_frame {
            None
        } else {
            Some(self.previous.as_slice())
        };
        self.first_frame = false;

        // Dithering trains the palette on the whole frame: error diffusion
        // needs representative extremes, not just the changed pixels.
        let dither = params.dither == DitherMode::FloydSteinberg;
        let palette = Palette::build(
            if dither { None } else { previous },
            frame,
            params.bit_depth,
            dither,
        );

        let quantized = quantize::quantize_frame(previous, frame, width, height, &palette, params.dither);

        container::write_graphic_control(sink, params.delay)?;
        container::write_image_descriptor(sink, 0, 0, self.width, self.height, params.bit_depth)?;
        container::write_color_table(sink, &palette)?;
        lzw::write_image_data(sink, &quantized, params.bit_depth)?;

        trace!(
            "frame encoded ({}x{}, bit depth {}, dither {:?})",
            width, height, params.bit_depth, params.dither
        );

        self.previous = quantized;
        Ok(())
    }

    /// Write the trailer and release the sink. Unlike dropping the writer,
    /// this surfaces the I/O result. A second call reports `WriterClosed`.
    pub fn close(&mut self) -> Result<(), EncodeError> {
        let mut sink = self.sink.take().ok_or(EncodeError::WriterClosed)?;
        sink.write_all(&[container::TRAILER])?;
        sink.flush()?;
        debug!("stream closed");
        self.previous = Vec::new();
        Ok(())
    }

    /// Write the trailer and hand back the sink, for in-memory encoding.
    pub fn finish(mut self) -> Result<W, EncodeError> {
        let mut sink = self.sink.take().ok_or(EncodeError::WriterClosed)?;
        sink.write_all(&[container::TRAILER])?;
        sink.flush()?;
        Ok(sink)
    }
}

impl<W: Write> Drop for GifWriter<W> {
    fn drop(&mut self) {
        // Terminate the file even when the writer is abandoned mid-stream;
        // errors have nowhere to go from a destructor.
        if let Some(mut sink) = self.sink.take() {
            let _ = sink.write_all(&[container::TRAILER]);
            let _ = sink.flush();
        }
    }
}

fn check_bit_depth(bit_depth: u8) -> Result<(), EncodeError> {
    if !(1..=8).contains(&bit_depth) {
        return Err(EncodeError::InvalidBitDepth(bit_depth));
    }
    Ok(())
}
