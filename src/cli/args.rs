//! Defines the command-line arguments and subcommands for the Tabula CLI.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "tabula",
    version,
    about = "Inspect and validate declarative YAML test descriptions."
)]
pub struct TabulaArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List every description file found under a directory.
    List {
        /// Directory (or single file) to search.
        #[arg(default_value = "tests")]
        path: PathBuf,
    },
    /// Load, resolve and normalize every description file, reporting errors.
    Check {
        /// Directory (or single file) to check.
        #[arg(default_value = "tests")]
        path: PathBuf,
        /// Emit a JSON report instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Print a description file in normalized form.
    Show {
        /// The description file to print.
        #[arg(required = true)]
        file: PathBuf,
    },
}
