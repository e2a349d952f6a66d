//! erfjoin CLI entry point.

use std::io;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use erfjoin::cli::{dump_file, run_join, summarize_file, Args, OutputFormatter};

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();

    let mut stdout = io::stdout();

    // Handle info-only commands
    if let Some(join_file) = &args.summarize {
        let formatter = OutputFormatter::new(args.stats);
        summarize_file(join_file, &formatter, &mut stdout)?;
        return Ok(());
    }
    if let Some(join_file) = &args.dump {
        dump_file(join_file, args.dump_format(), args.packet_type, stdout.lock())?;
        return Ok(());
    }

    run_join(&args, &mut stdout)?;
    Ok(())
}
