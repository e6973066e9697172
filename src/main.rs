#![deny(missing_docs)]

//! Command line front end for `bale_pack`.
//!
//! ```text
//! bale pack --resources ./resources --out ./pack --domain core
//! bale list ./pack
//! bale extract ./pack core:textures/stone.png --out stone.png
//! bale verify ./pack
//! ```

mod commands;
mod common;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use crate::commands::Command;

/// Packs named resources into size-bounded shard files and reads them back.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// What to do.
    #[command(subcommand)]
    command: Command,
}

/// The main entry point for the application.
///
/// Initializes logging and runs the requested command.
fn main() -> ExitCode {
    let _guard = common::trace::init();

    let args = Args::parse_from(wild::args());

    match args.command.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("Error: {}", snafu::Report::from_error(err));
            ExitCode::FAILURE
        }
    }
}
