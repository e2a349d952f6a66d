//! Capture sources: opening, decompressing and validating capture files.
//!
//! A [`CaptureSource`] is the loader in front of the join engine. It turns a
//! path into a validated [`Capture`] and keeps the facts worth reporting
//! about it (where it came from, how it was stored, how much time it spans).
//! Every failure here is fatal to a run and surfaces before any join work
//! starts.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::capture::Capture;
use crate::erf::looks_like_records;
use crate::error::{CaptureError, Error};

use super::decompress::{decompress_all, Compression};

/// Metadata about a loaded capture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureMetadata {
    /// Size of the file as stored (compressed size for compressed files)
    pub stored_bytes: u64,
    /// Size of the record buffer
    pub size_bytes: u64,
    /// Number of records
    pub records: u64,
    /// Timestamp of the first record (ns)
    pub first_ns: u64,
    /// Timestamp of the last record (ns)
    pub last_ns: u64,
}

impl CaptureMetadata {
    fn describe(capture: &Capture, stored_bytes: u64) -> Self {
        Self {
            stored_bytes,
            size_bytes: capture.size_bytes() as u64,
            records: capture.len() as u64,
            first_ns: capture.first_timestamp_ns(),
            last_ns: capture.last_timestamp_ns(),
        }
    }

    /// Time covered by the capture, zero if the timestamps run backwards.
    pub fn duration_ns(&self) -> u64 {
        self.last_ns.saturating_sub(self.first_ns)
    }

    /// Record buffer size in MiB.
    pub fn size_mib(&self) -> f64 {
        self.size_bytes as f64 / 1024.0 / 1024.0
    }
}

/// A capture loaded from a file or from memory.
#[derive(Clone)]
pub struct CaptureSource {
    /// Path to the file (for error messages)
    path: PathBuf,
    /// The validated record buffer
    capture: Capture,
    /// Detected compression format
    compression: Compression,
    /// Cached metadata
    metadata: CaptureMetadata,
}

impl CaptureSource {
    /// Open a capture file.
    ///
    /// Compressed files are inflated into memory. Uncompressed files are
    /// memory-mapped when the `mmap` feature is enabled and read otherwise.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(CaptureError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let file = File::open(&path)?;
        let stored_bytes = file.metadata()?.len();
        let (capture, compression) = Self::load(&path, &file)?;
        let metadata = CaptureMetadata::describe(&capture, stored_bytes);

        tracing::info!(
            path = %path.display(),
            records = metadata.records,
            mib = format_args!("{:.3}", metadata.size_mib()),
            %compression,
            mapped = capture.is_mapped(),
            "opened capture"
        );

        Ok(Self {
            path,
            capture,
            compression,
            metadata,
        })
    }

    #[cfg(feature = "mmap")]
    fn load(path: &Path, file: &File) -> Result<(Capture, Compression), Error> {
        super::mmap::open_mapped(path, file)
    }

    #[cfg(not(feature = "mmap"))]
    fn load(path: &Path, file: &File) -> Result<(Capture, Compression), Error> {
        use std::io::Read;

        let mut bytes = Vec::new();
        (&*file).read_to_end(&mut bytes)?;
        Self::from_raw(&path.display().to_string(), bytes)
    }

    /// Build a source from bytes already in memory (compressed or not).
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Self, Error> {
        let stored_bytes = bytes.len() as u64;
        let (capture, compression) = Self::from_raw(name, bytes)?;
        let metadata = CaptureMetadata::describe(&capture, stored_bytes);
        Ok(Self {
            path: PathBuf::from(name),
            capture,
            compression,
            metadata,
        })
    }

    fn from_raw(name: &str, bytes: Vec<u8>) -> Result<(Capture, Compression), Error> {
        let compression = Compression::detect(&bytes);
        if compression.is_compressed() {
            if let Some(inflated) = inflate(name, &bytes, compression)? {
                return Ok((Capture::from_vec(name, inflated)?, compression));
            }
        }
        Ok((Capture::from_vec(name, bytes)?, Compression::None))
    }

    /// The validated capture.
    pub fn capture(&self) -> &Capture {
        &self.capture
    }

    /// Get the path to the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the detected compression format.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Whether the records are read straight from a memory map.
    pub fn is_mapped(&self) -> bool {
        self.capture.is_mapped()
    }

    /// Metadata about the capture.
    pub fn metadata(&self) -> &CaptureMetadata {
        &self.metadata
    }
}

impl std::fmt::Debug for CaptureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSource")
            .field("path", &self.path)
            .field("records", &self.metadata.records)
            .field("compression", &self.compression)
            .field("mapped", &self.capture.is_mapped())
            .finish()
    }
}

/// Inflate a buffer that looks compressed.
///
/// Magic bytes are only a guess for ERF data: a raw timestamp can start
/// with the same bytes. If decompression fails but every record of the raw
/// buffer carries a plausible capture header, the buffer is used as-is and
/// `None` is returned. Any other decoding failure is an error, so a
/// truncated archive never reaches the join.
pub(crate) fn inflate(
    name: &str,
    data: &[u8],
    compression: Compression,
) -> Result<Option<Vec<u8>>, Error> {
    match decompress_all(data, compression, data.len().saturating_mul(4)) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if looks_like_records(data) => {
            tracing::warn!(
                name,
                %compression,
                error = %e,
                "compression magic found but decoding failed; reading as raw records"
            );
            Ok(None)
        }
        Err(e) => Err(CaptureError::Decompress {
            name: name.to_string(),
            compression: compression.name(),
            reason: e.to_string(),
        }
        .into()),
    }
}
