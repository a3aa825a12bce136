//! Command-line tool for extracting OpenAPI specs from annotation manifests.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-annotations [OPTIONS] [PROJECT_PATH]
//! ```
//!
//! # Examples
//!
//! Generate JSON documents next to the project:
//! ```bash
//! openapi-from-annotations ./my-module -o openapi.json
//! ```
//!
//! Generate YAML instead:
//! ```bash
//! openapi-from-annotations ./my-module -f yaml -o openapi.yaml
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-from-annotations ./my-module -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_annotations::cli;

fn main() -> Result<()> {
    // We need to parse args twice: once to get the verbose flag, then again
    // with validation after the logger is up
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    cli::run(args)?;

    info!("OpenAPI spec extraction completed successfully");

    Ok(())
}
