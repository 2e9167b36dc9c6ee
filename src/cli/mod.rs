//! The Tabula Command-Line Interface.
//!
//! This module is the entry point for all CLI commands and orchestrates the
//! library's loading pipeline. Running cases needs a host-provided module
//! loader, so the CLI stops at resolution: listing, checking and showing.

use std::io::Write;
use std::path::Path;
use std::process;

use clap::Parser;
use termcolor::{ColorChoice, StandardStream};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::args::{Command, TabulaArgs};
use crate::cli::output::{print_check_entry, CheckEntry, CheckReport};
use crate::config::HarnessConfig;
use crate::discovery::discover_test_files;
use crate::errors::SetupError;
use crate::normalize::to_documents;

pub mod args;
pub mod output;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "TABULA_LOG";

/// The main entry point for the CLI.
pub fn run() {
    let args = TabulaArgs::parse();
    init_tracing();

    let mut harness = HarnessConfig::default();
    if args.no_color {
        harness.use_colors = false;
    }

    let result = match args.command {
        Command::List { path } => handle_list(&path, &harness),
        Command::Check { path, json } => handle_check(&path, json, &harness),
        Command::Show { file } => handle_show(&file),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("tabula=warn"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn color_choice(harness: &HarnessConfig) -> ColorChoice {
    if harness.use_colors {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

/// Handles the `list` subcommand.
fn handle_list(path: &Path, harness: &HarnessConfig) -> Result<bool, SetupError> {
    let files = discover_test_files(path, &harness.suffixes)?;
    for file in &files {
        println!("{}", file.display());
    }
    debug!(count = files.len(), "listed description files");
    Ok(true)
}

/// Handles the `check` subcommand.
fn handle_check(path: &Path, json: bool, harness: &HarnessConfig) -> Result<bool, SetupError> {
    let files = discover_test_files(path, &harness.suffixes)?;
    let mut stdout = StandardStream::stdout(color_choice(harness));
    let mut entries = Vec::with_capacity(files.len());

    for file in &files {
        let entry = match crate::load_config(file) {
            Ok(config) => CheckEntry {
                path: file.display().to_string(),
                group: Some(config.group_name.clone()),
                suites: config.suites.len(),
                cases: config.case_count(),
                error: None,
            },
            Err(error) => {
                let message = error.to_string();
                if !json {
                    eprintln!("{:?}", miette::Report::new(error));
                }
                CheckEntry {
                    path: file.display().to_string(),
                    group: None,
                    suites: 0,
                    cases: 0,
                    error: Some(message),
                }
            }
        };
        if !json {
            print_check_entry(&mut stdout, &entry);
        }
        entries.push(entry);
    }

    let report = CheckReport::new(entries);
    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: failed to serialize report: {}", e);
                return Ok(false);
            }
        }
    } else {
        let _ = writeln!(
            stdout,
            "\n{} files checked, {} failed",
            report.files.len(),
            report.failures
        );
    }
    Ok(report.failures == 0)
}

/// Handles the `show` subcommand.
fn handle_show(file: &Path) -> Result<bool, SetupError> {
    let config = crate::load_config(file)?;
    for document in to_documents(&config) {
        let text = serde_yaml::to_string(&document).map_err(|source| SetupError::Yaml {
            path: file.to_path_buf(),
            source,
        })?;
        println!("---");
        print!("{}", text);
    }
    Ok(true)
}
