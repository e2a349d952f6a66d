//! Memory-mapped capture loading.
//!
//! This module is only available when the `mmap` feature is enabled.
//!
//! Uses `memmap2` for platform-independent memory mapping. Uncompressed
//! captures are mapped in place and the OS handles caching and paging;
//! multi-gigabyte captures never need to be copied into the heap. Compressed
//! captures are mapped too, but only as the input to the decompressor.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;

use crate::capture::Capture;
use crate::error::{CaptureError, Error};

use super::decompress::Compression;
use super::source::inflate;

/// Map `path` and build a capture over it.
///
/// The file must not be truncated while the capture is alive.
pub(crate) fn open_mapped(path: &Path, file: &File) -> Result<(Capture, Compression), Error> {
    let name = path.display().to_string();

    // An empty file cannot be mapped on every platform.
    if file.metadata()?.len() == 0 {
        return Err(CaptureError::Empty { name }.into());
    }

    let mmap = unsafe { Mmap::map(file).map_err(Error::Io)? };
    let compression = Compression::detect(&mmap);

    if compression.is_compressed() {
        if let Some(bytes) = inflate(&name, &mmap, compression)? {
            return Ok((Capture::from_vec(&name, bytes)?, compression));
        }
        return Ok((Capture::from_mmap(&name, Arc::new(mmap))?, Compression::None));
    }

    Ok((Capture::from_mmap(&name, Arc::new(mmap))?, compression))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erf::{ErfRecordBuilder, RECORD_LEN};
    use std::io::Write;

    #[test]
    fn test_mapped_capture() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for ns in [100u64, 200, 300] {
            file.write_all(&ErfRecordBuilder::new().raw_nanos(ns).build())
                .unwrap();
        }
        file.flush().unwrap();

        let (capture, compression) = open_mapped(file.path(), file.as_file()).unwrap();
        assert_eq!(compression, Compression::None);
        assert!(capture.is_mapped());
        assert_eq!(capture.len(), 3);
        assert_eq!(capture.last_timestamp_ns(), 300);
    }

    #[test]
    fn test_mapped_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = open_mapped(file.path(), file.as_file()).unwrap_err();
        assert!(matches!(err, Error::Capture(CaptureError::Empty { .. })));
    }

    #[test]
    fn test_mapped_partial_record() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; RECORD_LEN + 1]).unwrap();
        file.flush().unwrap();

        let err = open_mapped(file.path(), file.as_file()).unwrap_err();
        assert!(matches!(
            err,
            Error::Capture(CaptureError::PartialRecord { trailing: 1, .. })
        ));
    }
}
