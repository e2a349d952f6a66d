//! Capture I/O.
//!
//! This module loads capture files into validated [`Capture`]s:
//!
//! - `CaptureSource` - opens a file (or wraps bytes), detects compression,
//!   validates record geometry and records metadata
//! - `mmap` - zero-copy mapping of uncompressed captures (`mmap` feature)
//! - `decompress` - transparent gzip/zstd inflation
//!
//! [`Capture`]: crate::capture::Capture

mod decompress;
#[cfg(feature = "mmap")]
mod mmap;
mod source;

pub use decompress::{decompress_all, Compression, DecompressReader};
pub use source::{CaptureMetadata, CaptureSource};
