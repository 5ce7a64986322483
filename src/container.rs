//! GIF89a container blocks.
//!
//! Fixed-layout pieces of the file: header and logical screen descriptor,
//! the NETSCAPE2.0 looping extension, per-frame graphic control and image
//! descriptor blocks, and the local color table. The compressed raster that
//! follows each descriptor is produced by [`crate::lzw`].

use std::io::{self, Write};

use crate::palette::{Palette, TRANSPARENT_INDEX};

pub(crate) const TRAILER: u8 = 0x3B;

/// File header: magic, logical screen descriptor, and the dummy two-entry
/// global color table nothing ever references.
pub(crate) fn write_header<W: Write>(
    sink: &mut W,
    width: u16,
    height: u16,
    loop_forever: bool,
) -> io::Result<()> {
    sink.write_all(b"GIF89a")?;

    sink.write_all(&width.to_le_bytes())?;
    sink.write_all(&height.to_le_bytes())?;
    // Unsorted global color table, 2 entries, maximum color resolution.
    sink.write_all(&[0xF0])?;
    // Background color index, then square pixel aspect ratio.
    sink.write_all(&[0x00, 0x00])?;

    // The global palette itself: two black entries.
    sink.write_all(&[0; 6])?;

    if loop_forever {
        write_netscape_loop(sink)?;
    }
    Ok(())
}

/// NETSCAPE2.0 application extension: loop count zero means forever.
fn write_netscape_loop<W: Write>(sink: &mut W) -> io::Result<()> {
    sink.write_all(&[0x21, 0xFF, 0x0B])?;
    sink.write_all(b"NETSCAPE2.0")?;
    sink.write_all(&[0x03, 0x01, 0x00, 0x00, 0x00])
}

/// Graphic control extension: leave the previous frame in place, this frame
/// has transparency, delay in hundredths of a second.
pub(crate) fn write_graphic_control<W: Write>(sink: &mut W, delay: u16) -> io::Result<()> {
    sink.write_all(&[0x21, 0xF9, 0x04, 0x05])?;
    sink.write_all(&delay.to_le_bytes())?;
    sink.write_all(&[TRANSPARENT_INDEX, 0x00])
}

/// Image descriptor: frame placement in canvas space plus the local color
/// table announcement (2^bit_depth entries).
pub(crate) fn write_image_descriptor<W: Write>(
    sink: &mut W,
    left: u16,
    top: u16,
    width: u16,
    height: u16,
    bit_depth: u8,
) -> io::Result<()> {
    sink.write_all(&[0x2C])?;
    sink.write_all(&left.to_le_bytes())?;
    sink.write_all(&top.to_le_bytes())?;
    sink.write_all(&width.to_le_bytes())?;
    sink.write_all(&height.to_le_bytes())?;
    sink.write_all(&[0x80 + bit_depth - 1])
}

/// Local color table: transparent black, then the palette colors.
pub(crate) fn write_color_table<W: Write>(sink: &mut W, palette: &Palette) -> io::Result<()> {
    sink.write_all(&[0, 0, 0])?;
    for i in 1..palette.len() {
        sink.write_all(&palette.entry(i as u8))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let mut out = Vec::new();
        write_header(&mut out, 0x0102, 0x0304, false).unwrap();

        assert_eq!(&out[..6], b"GIF89a");
        assert_eq!(&out[6..10], &[0x02, 0x01, 0x04, 0x03]);
        assert_eq!(&out[10..13], &[0xF0, 0x00, 0x00]);
        assert_eq!(&out[13..19], &[0; 6]);
        assert_eq!(out.len(), 19);
    }

    #[test]
    fn looping_header_appends_netscape_block() {
        let mut out = Vec::new();
        write_header(&mut out, 4, 4, true).unwrap();

        assert_eq!(out.len(), 19 + 19);
        assert_eq!(&out[19..22], &[0x21, 0xFF, 0x0B]);
        assert_eq!(&out[22..33], b"NETSCAPE2.0");
        assert_eq!(&out[33..38], &[0x03, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn graphic_control_encodes_delay_little_endian() {
        let mut out = Vec::new();
        write_graphic_control(&mut out, 0x1234).unwrap();
        assert_eq!(out, vec![0x21, 0xF9, 0x04, 0x05, 0x34, 0x12, 0x00, 0x00]);
    }

    #[test]
    fn image_descriptor_packs_table_size_from_bit_depth() {
        let mut out = Vec::new();
        write_image_descriptor(&mut out, 0, 0, 7, 9, 8).unwrap();
        assert_eq!(out[0], 0x2C);
        assert_eq!(&out[5..9], &[7, 0, 9, 0]);
        assert_eq!(out[9], 0x87);

        let mut out = Vec::new();
        write_image_descriptor(&mut out, 0, 0, 7, 9, 1).unwrap();
        assert_eq!(out[9], 0x80);
    }

    #[test]
    fn color_table_is_three_bytes_per_entry() {
        let frame = vec![crate::Rgba::new(50, 60, 70, 255); 4];
        let palette = Palette::build(None, &frame, 3, false);

        let mut out = Vec::new();
        write_color_table(&mut out, &palette).unwrap();
        assert_eq!(out.len(), 8 * 3);
        assert_eq!(&out[..3], &[0, 0, 0]);
    }
}
