//! `tmpfiles` entry point.
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use tmpfiles::cli::Cli;
use tmpfiles::commands;
use tmpfiles::logging::{Logger, init_subscriber};

fn main() -> Result<()> {
    let args = Cli::parse();
    init_subscriber(args.verbose);
    let log = Arc::new(Logger::new());
    commands::run(&args, &log)
}
