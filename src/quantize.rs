//! Palette index assignment: nearest-color thresholding or Floyd–Steinberg
//! error diffusion.
//!
//! Both strategies share one output contract: an RGBA buffer holding the
//! colors the decoder will reconstruct, with each pixel's palette index in the
//! alpha channel. That buffer becomes the writer's previous frame, so the next
//! delta pass compares against what the viewer actually sees rather than the
//! original input.

use crate::palette::{Palette, TRANSPARENT_INDEX};
use crate::Rgba;

/// Quantization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DitherMode {
    /// Nearest palette color only.
    None,
    /// Nearest with forward error diffusion (7/16, 3/16, 5/16, 1/16).
    FloydSteinberg,
}

/// Quantize `frame` against `palette`, producing the paletted output buffer.
pub(crate) fn quantize_frame(
    previous: Option<&[Rgba]>,
    frame: &[Rgba],
    width: usize,
    height: usize,
    palette: &Palette,
    mode: DitherMode,
) -> Vec<Rgba> {
    match mode {
        DitherMode::None => threshold_frame(previous, frame, palette),
        DitherMode::FloydSteinberg => dither_frame(previous, frame, width, height, palette),
    }
}

/// Pick palette colors by simple thresholding. Pixels identical to the
/// previous frame become transparent.
fn threshold_frame(previous: Option<&[Rgba]>, frame: &[Rgba], palette: &Palette) -> Vec<Rgba> {
    let mut out = Vec::with_capacity(frame.len());

    for (i, pix) in frame.iter().enumerate() {
        let unchanged = previous
            .map(|prev| {
                let p = prev[i];
                p.r == pix.r && p.g == pix.g && p.b == pix.b
            })
            .unwrap_or(false);

        if unchanged {
            out.push(Rgba::new(pix.r, pix.g, pix.b, TRANSPARENT_INDEX));
        } else {
            let mut best_diff = 1_000_000;
            let mut best_ind = 1;
            palette.closest(
                i32::from(pix.r),
                i32::from(pix.g),
                i32::from(pix.b),
                &mut best_ind,
                &mut best_diff,
                1,
            );

            let [r, g, b] = palette.entry(best_ind);
            out.push(Rgba::new(r, g, b, best_ind));
        }
    }

    out
}

/// Floyd–Steinberg dithering in ×256 fixed point, so quantization error
/// carries eight fractional bits as it diffuses.
fn dither_frame(
    previous: Option<&[Rgba]>,
    frame: &[Rgba],
    width: usize,
    height: usize,
    palette: &Palette,
) -> Vec<Rgba> {
    let num_pixels = width * height;

    let mut quant: Vec<[i32; 4]> = frame
        .iter()
        .map(|p| {
            [
                i32::from(p.r) * 256,
                i32::from(p.g) * 256,
                i32::from(p.b) * 256,
                i32::from(p.a) * 256,
            ]
        })
        .collect();

    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;

            // Round the error-adjusted color back to 8 bits.
            let rr = (quant[i][0] + 127) / 256;
            let gg = (quant[i][1] + 127) / 256;
            let bb = (quant[i][2] + 127) / 256;

            // If that is exactly the previous frame's color, the pixel is a
            // no-op: emit transparency and diffuse no error.
            if let Some(prev) = previous {
                let p = prev[i];
                if i32::from(p.r) == rr && i32::from(p.g) == gg && i32::from(p.b) == bb {
                    quant[i] = [rr, gg, bb, i32::from(TRANSPARENT_INDEX)];
                    continue;
                }
            }

            let mut best_diff = 1_000_000;
            let mut best_ind = TRANSPARENT_INDEX;
            palette.closest(rr, gg, bb, &mut best_ind, &mut best_diff, 1);

            let [pr, pg, pb] = palette.entry(best_ind);
            let r_err = quant[i][0] - i32::from(pr) * 256;
            let g_err = quant[i][1] - i32::from(pg) * 256;
            let b_err = quant[i][2] - i32::from(pb) * 256;

            quant[i] = [
                i32::from(pr),
                i32::from(pg),
                i32::from(pb),
                i32::from(best_ind),
            ];

            // The four forward neighbors, bounds-checked against the pixel
            // count only: edge positions wrap into the adjacent row exactly as
            // the index arithmetic lands them.
            let below = y * width + width + x;
            diffuse(&mut quant, y * width + x + 1, num_pixels, r_err * 7 / 16, g_err * 7 / 16, b_err * 7 / 16);
            diffuse(&mut quant, below - 1, num_pixels, r_err * 3 / 16, g_err * 3 / 16, b_err * 3 / 16);
            diffuse(&mut quant, below, num_pixels, r_err * 5 / 16, g_err * 5 / 16, b_err * 5 / 16);
            diffuse(&mut quant, below + 1, num_pixels, r_err / 16, g_err / 16, b_err / 16);
        }
    }

    // Low 8 bits of each channel; the fourth carries the palette index.
    quant
        .iter()
        .map(|q| Rgba::new(q[0] as u8, q[1] as u8, q[2] as u8, q[3] as u8))
        .collect()
}

/// Add a share of the quantization error to one neighbor. The clamp is
/// one-sided: a channel is never driven below zero, but overshoot past full
/// scale is tolerated because the rounding step truncates it away.
fn diffuse(quant: &mut [[i32; 4]], loc: usize, num_pixels: usize, r_err: i32, g_err: i32, b_err: i32) {
    if loc < num_pixels {
        let q = &mut quant[loc];
        q[0] += (-q[0]).max(r_err);
        q[1] += (-q[1]).max(g_err);
        q[2] += (-q[2]).max(b_err);
    }
}
