use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to create output file {path}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("writer is closed")]
    WriterClosed,

    #[error("frame dimensions cannot be zero")]
    ZeroDimension,

    #[error("frame buffer length {len} does not match dimensions {width}x{height}")]
    DimensionMismatch {
        len: usize,
        width: u16,
        height: u16,
    },

    #[error("bit depth must be between 1 and 8, got {0}")]
    InvalidBitDepth(u8),

    #[error(transparent)]
    Io(#[from] io::Error),
}
