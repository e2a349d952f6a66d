//! erfjoin - Match packets across two ERF captures.
//!
//! This library holds the command-line front end of the `erfjoin` binary.
//! The join engine itself lives in [`erfjoin_core`].
//!
//! # Example
//!
//! ```no_run
//! use clap::Parser;
//! use erfjoin::cli::{run_join, Args};
//!
//! fn main() -> anyhow::Result<()> {
//!     let args = Args::parse_from(["erfjoin", "-i", "tap0.erf", "-I", "tap1.erf", "-j", "4"]);
//!     let report = run_join(&args, &mut std::io::stdout())?;
//!     println!("{} packets lost", report.dropped_after_match);
//!     Ok(())
//! }
//! ```

pub mod cli;

pub use erfjoin_core::{Error, Result};
