//! Transparent decompression for capture files.
//!
//! Captures are often archived compressed. The loader detects the format
//! from magic bytes and inflates the whole file into memory before the join
//! runs; the engine only ever sees a flat record buffer.
//!
//! Supported formats (via feature flags):
//! - Gzip (.gz) - `compress-gzip` feature
//! - Zstd (.zst) - `compress-zstd` feature

use std::io::{self, Read};

#[cfg(feature = "compress-gzip")]
use flate2::read::GzDecoder;

/// Detected compression format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// No compression
    None,
    /// Gzip (.gz)
    #[cfg(feature = "compress-gzip")]
    Gzip,
    /// Zstandard (.zst)
    #[cfg(feature = "compress-zstd")]
    Zstd,
}

impl Compression {
    /// Detect compression format from magic bytes.
    pub fn detect(data: &[u8]) -> Self {
        if data.len() < 6 {
            return Compression::None;
        }

        match data {
            // Gzip: 1f 8b, deflate method
            #[cfg(feature = "compress-gzip")]
            [0x1f, 0x8b, 0x08, ..] => Compression::Gzip,

            // Zstd: 28 b5 2f fd
            #[cfg(feature = "compress-zstd")]
            [0x28, 0xb5, 0x2f, 0xfd, ..] => Compression::Zstd,

            _ => Compression::None,
        }
    }

    /// Get the typical file extension for this compression format.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Compression::None => None,
            #[cfg(feature = "compress-gzip")]
            Compression::Gzip => Some("gz"),
            #[cfg(feature = "compress-zstd")]
            Compression::Zstd => Some("zst"),
        }
    }

    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Compression::None => "none",
            #[cfg(feature = "compress-gzip")]
            Compression::Gzip => "gzip",
            #[cfg(feature = "compress-zstd")]
            Compression::Zstd => "zstd",
        }
    }

    /// Check if this represents compressed data.
    pub fn is_compressed(&self) -> bool {
        !matches!(self, Compression::None)
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decompression reader over any `Read` source.
///
/// Uses enum dispatch rather than trait objects; the `Read` implementation
/// delegates to the inner decoder.
pub enum DecompressReader<R: Read> {
    /// No compression - pass-through
    None(R),

    /// Gzip decompression
    #[cfg(feature = "compress-gzip")]
    Gzip(GzDecoder<R>),

    /// Zstandard decompression
    #[cfg(feature = "compress-zstd")]
    Zstd(zstd::Decoder<'static, io::BufReader<R>>),
}

impl<R: Read> DecompressReader<R> {
    /// Create a decompression reader with explicit compression format.
    pub fn new(source: R, compression: Compression) -> io::Result<Self> {
        match compression {
            Compression::None => Ok(DecompressReader::None(source)),

            #[cfg(feature = "compress-gzip")]
            Compression::Gzip => Ok(DecompressReader::Gzip(GzDecoder::new(source))),

            #[cfg(feature = "compress-zstd")]
            Compression::Zstd => Ok(DecompressReader::Zstd(zstd::Decoder::new(source)?)),
        }
    }

    /// Get the compression format this reader handles.
    pub fn compression(&self) -> Compression {
        match self {
            DecompressReader::None(_) => Compression::None,
            #[cfg(feature = "compress-gzip")]
            DecompressReader::Gzip(_) => Compression::Gzip,
            #[cfg(feature = "compress-zstd")]
            DecompressReader::Zstd(_) => Compression::Zstd,
        }
    }
}

impl<R: Read> Read for DecompressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            DecompressReader::None(r) => r.read(buf),
            #[cfg(feature = "compress-gzip")]
            DecompressReader::Gzip(r) => r.read(buf),
            #[cfg(feature = "compress-zstd")]
            DecompressReader::Zstd(r) => r.read(buf),
        }
    }
}

/// Inflate a whole compressed buffer.
///
/// `size_hint` is used to pre-size the output; pass the compressed length
/// when nothing better is known.
pub fn decompress_all(
    compressed: &[u8],
    compression: Compression,
    size_hint: usize,
) -> io::Result<Vec<u8>> {
    let mut decoder = DecompressReader::new(compressed, compression)?;
    let mut out = Vec::with_capacity(size_hint);
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
