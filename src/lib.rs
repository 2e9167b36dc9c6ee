//! # Tabula
//!
//! Declarative unit tests described in YAML. A description file names a
//! module, groups cases into suites, and declares inputs, expected outputs,
//! expected errors, mocks and state assertions. The harness resolves
//! `!include` directives, normalizes the documents into a [`TestConfig`],
//! and drives every case against the module supplied by a [`ModuleLoader`].
//!
//! ## Pipeline
//!
//! ```text
//! file.test.yaml -> include -> normalize -> runner -> Reporter
//! ```

use std::path::Path;

use tracing::debug;

pub mod cli;
pub mod compare;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod include;
pub mod mock;
pub mod model;
pub mod module;
pub mod normalize;
pub mod object;
pub mod path;
pub mod report;
pub mod runner;
pub mod substitute;
pub mod value;

pub use config::HarnessConfig;
pub use errors::{CaseError, MockError, PathError, SetupError};
pub use model::TestConfig;
pub use module::{Module, ModuleLoader, ModuleRegistry};
pub use object::{NativeClass, NativeObject, ObjectRef};
pub use report::{CaseOutcome, CaseReport, RecordingReporter, Reporter};
pub use runner::{RunOptions, RunSummary, Runner};
pub use value::{Function, Thrown, Value};

/// Loads a description file, resolves its includes and normalizes it.
pub fn load_config(path: &Path) -> Result<TestConfig, SetupError> {
    let documents = include::load_stream(path)?;
    debug!(source = %path.display(), documents = documents.len(), "resolved description");
    let mut config = normalize::normalize(&documents)?;
    config.source = path.to_path_buf();
    Ok(config)
}

/// Discovers every description file under the configured root and runs it.
pub fn run_all(
    harness: &HarnessConfig,
    loader: &dyn ModuleLoader,
    reporter: &mut dyn Reporter,
) -> Result<RunSummary, SetupError> {
    let files = discovery::discover_test_files(&harness.root, &harness.suffixes)?;
    let runner = Runner::new(loader).with_options(harness.run_options());
    Ok(runner.run_files(&files, reporter))
}
