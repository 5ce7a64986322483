//! Assemble still images into an animated GIF.
//!
//! ```bash
//! gifstream -i frame_*.png -o anim.gif --delay 4 --dither
//! gifstream --gen-example -o plasma.gif
//! ```

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rgb::FromSlice;

use gifstream::{DitherMode, EncoderConfig, GifWriter, Rgba};

#[derive(Parser)]
#[command(name = "gifstream", version, about = "Assemble still images into an animated GIF")]
struct Cli {
    /// Input image files (PNG or JPEG), in frame order
    #[arg(short = 'i', long = "input-files", num_args = 1..)]
    input_files: Vec<PathBuf>,

    /// Output GIF path
    #[arg(short = 'o', long = "output-file", default_value = "out.gif")]
    output_file: PathBuf,

    /// Delay between frames in hundredths of a second
    #[arg(long, default_value_t = 2)]
    delay: u16,

    /// Palette size exponent: each frame's color table gets 2^bit-depth entries
    #[arg(long, default_value_t = 8)]
    bit_depth: u8,

    /// Floyd-Steinberg dither instead of nearest-color thresholding
    #[arg(long)]
    dither: bool,

    /// Write a procedurally generated test animation and exit
    #[arg(long)]
    gen_example: bool,

    /// Sort input files by the first number in each filename
    #[arg(long)]
    numeric_sort: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = if cli.gen_example {
        gen_example(&cli)
    } else {
        convert(&cli)
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn config_from(cli: &Cli) -> EncoderConfig {
    EncoderConfig::new()
        .delay(cli.delay)
        .bit_depth(cli.bit_depth)
        .dither(if cli.dither {
            DitherMode::FloydSteinberg
        } else {
            DitherMode::None
        })
}

fn convert(cli: &Cli) -> Result<()> {
    if cli.input_files.is_empty() {
        bail!("--input-files requires at least one argument");
    }

    let mut inputs = cli.input_files.clone();
    if cli.numeric_sort {
        inputs.sort_by_key(|path| first_number(path));
    }

    let (first, width, height) = load_frame(&inputs[0])?;
    let mut writer = GifWriter::create(&cli.output_file, width, height, config_from(cli))?;

    let progress = progress_bar(inputs.len() as u64);
    progress.set_message(inputs[0].display().to_string());
    writer.write_frame(&first)?;
    progress.inc(1);

    for path in &inputs[1..] {
        let (frame, w, h) = load_frame(path)?;
        if (w, h) != (width, height) {
            bail!(
                "{} is {w}x{h}, expected {width}x{height}",
                path.display()
            );
        }
        progress.set_message(path.display().to_string());
        writer.write_frame(&frame)?;
        progress.inc(1);
    }

    writer.close()?;
    progress.finish_with_message(format!("wrote {}", cli.output_file.display()));
    Ok(())
}

/// Decode one input image to RGBA8.
fn load_frame(path: &Path) -> Result<(Vec<Rgba>, u16, u16)> {
    let img = image::open(path)
        .with_context(|| format!("failed to open input file {}", path.display()))?
        .to_rgba8();
    let (w, h) = (img.width(), img.height());
    if w > u16::MAX.into() || h > u16::MAX.into() {
        bail!("{} is {w}x{h}, larger than a GIF canvas allows", path.display());
    }

    let pixels = img.as_raw().as_rgba().to_vec();
    Ok((pixels, w as u16, h as u16))
}

/// First run of ASCII digits in the filename, for --numeric-sort.
fn first_number(path: &Path) -> u64 {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let digits: String = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is valid")
            .progress_chars("█▓▒░ "),
    );
    pb
}

/// The default-shadertoy plasma, 256 frames of it: a self-test that needs no
/// input files and exercises dithering hard.
fn gen_example(cli: &Cli) -> Result<()> {
    const WIDTH: usize = 512;
    const HEIGHT: usize = 512;
    const TOTAL_FRAMES: usize = 256;

    let config = config_from(cli).dither(DitherMode::FloydSteinberg);
    let mut writer = GifWriter::create(&cli.output_file, WIDTH as u16, HEIGHT as u16, config)?;

    let progress = progress_bar(TOTAL_FRAMES as u64);
    let mut frame = vec![Rgba::new(0, 0, 0, 255); WIDTH * HEIGHT];

    for frame_index in 0..TOTAL_FRAMES {
        let t = frame_index as f32 * std::f32::consts::TAU / 255.0;
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let fx = x as f32 / WIDTH as f32;
                let fy = y as f32 / HEIGHT as f32;

                let red = 0.5 + 0.5 * (t + fx).cos();
                let green = 0.5 + 0.5 * (t + fy + 2.0).cos();
                let blue = 0.5 + 0.5 * (t + fx + 4.0).cos();

                frame[y * WIDTH + x] = Rgba::new(
                    (255.0 * red).round() as u8,
                    (255.0 * green).round() as u8,
                    (255.0 * blue).round() as u8,
                    255,
                );
            }
        }

        writer.write_frame(&frame)?;
        progress.inc(1);
    }

    writer.close()?;
    progress.finish_with_message(format!("wrote {}", cli.output_file.display()));
    Ok(())
}
