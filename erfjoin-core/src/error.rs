//! Error types for erfjoin-core.
//!
//! This module provides structured error types for all erfjoin-core operations:
//!
//! - [`enum@Error`] - Main error enum that wraps all error types
//! - [`CaptureError`] - Errors from loading and validating capture files
//! - [`JoinRecordError`] - Errors from decoding join output records
//!
//! The join loop itself has no failure paths; every error here is raised
//! either while loading inputs or by an output sink.

use thiserror::Error;

/// Main error type for erfjoin-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Error loading or validating a capture
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Error decoding a join output record
    #[error("Join record error: {0}")]
    JoinRecord(#[from] JoinRecordError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to capture loading. All of them are fatal to a run.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Zero bytes read from the capture
    #[error("Read 0 bytes from {name}. Check that your data is ok?")]
    Empty { name: String },

    /// Capture length is not a whole number of records
    #[error("{name}: {len} bytes is not a multiple of the {stride}-byte record stride ({trailing} trailing bytes)")]
    PartialRecord {
        name: String,
        len: usize,
        stride: usize,
        trailing: usize,
    },

    /// Compressed capture could not be decoded
    #[error("{name}: failed to decompress ({compression}): {reason}")]
    Decompress {
        name: String,
        compression: &'static str,
        reason: String,
    },
}

/// Errors related to join output records.
#[derive(Error, Debug)]
pub enum JoinRecordError {
    /// Buffer too short for a join record
    #[error("Truncated join record at {index}: need {needed} bytes, have {have}")]
    Truncated {
        index: u64,
        needed: usize,
        have: usize,
    },

    /// Echoed record header does not carry the join record length
    #[error("Join record at {index} has rlen {rlen}, expected {expected}")]
    UnexpectedLength {
        index: u64,
        rlen: u16,
        expected: u16,
    },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
