//! Fuzz target for compression detection and capture loading.
//!
//! Tests format confusion and decompression bombs for supported formats:
//! - Gzip (0x1f, 0x8b, 0x08)
//! - Zstd (0x28, 0xb5, 0x2f, 0xfd)

#![no_main]

use erfjoin_core::io::{Compression, DecompressReader};
use erfjoin_core::CaptureSource;
use libfuzzer_sys::fuzz_target;
use std::io::{Cursor, Read};

/// Maximum bytes to read during decompression to prevent bombs.
const MAX_DECOMPRESS_SIZE: usize = 1024 * 1024; // 1MB

/// Largest input handed to the full loader, which inflates without a cap.
const MAX_LOAD_SIZE: usize = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    // Test format detection - should never panic
    let compression = Compression::detect(data);

    // Test decompression with size limit to prevent bombs
    let cursor = Cursor::new(data);
    if let Ok(mut reader) = DecompressReader::new(cursor, compression) {
        let mut buf = vec![0u8; MAX_DECOMPRESS_SIZE];
        let _ = reader.read(&mut buf);
    }

    // Loading either yields a valid capture or an error
    if data.len() <= MAX_LOAD_SIZE {
        if let Ok(source) = CaptureSource::from_bytes("fuzz", data.to_vec()) {
            assert!(!source.capture().is_empty());
        }
    }
});
