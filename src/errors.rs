//! Error types for every stage of the pipeline.
//!
//! Resolution-time failures ([`SetupError`]) abort a whole description file.
//! Execution-time failures ([`CaseError`]) are scoped to one case and never
//! affect its siblings.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::value::{Thrown, Value};

// ============================================================================
// RESOLUTION-TIME ERRORS
// ============================================================================

/// Failure while loading, resolving or binding a test description.
#[derive(Error, Diagnostic, Debug)]
pub enum SetupError {
    #[error("circular inclusion of '{}'", path.display())]
    #[diagnostic(
        code(tabula::include::circular),
        help("a file may not include itself, directly or through another include")
    )]
    CircularInclusion { path: PathBuf },

    #[error("included file '{}' not found (referenced from '{}')", path.display(), from.display())]
    #[diagnostic(
        code(tabula::include::not_found),
        help("include paths are resolved relative to the directory of the including file")
    )]
    IncludeNotFound { path: PathBuf, from: PathBuf },

    #[error("invalid include in '{}': expected a file path, found {found}", from.display())]
    #[diagnostic(code(tabula::include::invalid))]
    InvalidInclude { from: PathBuf, found: String },

    #[error("failed to read '{}'", path.display())]
    #[diagnostic(code(tabula::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in '{}'", path.display())]
    #[diagnostic(code(tabula::yaml))]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid test description: {message}")]
    #[diagnostic(code(tabula::document::invalid))]
    InvalidDocument { message: String },

    #[error("invalid throw pattern '{pattern}'")]
    #[diagnostic(code(tabula::document::pattern))]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("module '{}' could not be loaded", path.display())]
    #[diagnostic(
        code(tabula::module::not_found),
        help("register the module with the loader under its resolved path")
    )]
    ModuleNotFound { path: PathBuf },

    #[error("export '{export}' is not defined in module '{}'", module.display())]
    #[diagnostic(code(tabula::module::undefined_export))]
    UndefinedExport { export: String, module: PathBuf },

    #[error("export '{export}' is not a {expected}")]
    #[diagnostic(code(tabula::module::export_kind))]
    ExportKindMismatch {
        export: String,
        expected: &'static str,
    },

    #[error("failed to discover test files under '{}': {message}", root.display())]
    #[diagnostic(code(tabula::discovery))]
    Discovery { root: PathBuf, message: String },
}

impl SetupError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SetupError::InvalidDocument {
            message: message.into(),
        }
    }
}

// ============================================================================
// MOCK ERRORS
// ============================================================================

/// A mock was called wrongly, too often, too rarely, or referenced but undefined.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum MockError {
    #[error("mock '{mock}' call #{call} received unexpected arguments\n  expected: {expected}\n  actual:   {actual}")]
    #[diagnostic(code(tabula::mock::arguments))]
    ArgumentMismatch {
        mock: String,
        call: usize,
        expected: String,
        actual: String,
    },

    #[error("mock '{mock}' called {called} times, expected {expected}")]
    #[diagnostic(code(tabula::mock::call_count))]
    CallCount {
        mock: String,
        called: usize,
        expected: usize,
    },

    #[error("mock '{name}' is referenced but not defined")]
    #[diagnostic(
        code(tabula::mock::undefined),
        help("define the mock under `mocks` in the header, suite or case document")
    )]
    UndefinedReference { name: String },
}

// ============================================================================
// PATH ERRORS
// ============================================================================

/// Failure to resolve a dot-path on a live value.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("cannot resolve '{path}': segment '{segment}' is missing")]
    #[diagnostic(code(tabula::path::missing))]
    SegmentMissing { segment: String, path: String },

    #[error("cannot call '{path}': '{segment}' is a {found}, not a function")]
    #[diagnostic(code(tabula::path::not_callable))]
    NotCallable {
        segment: String,
        path: String,
        found: &'static str,
    },
}

/// Outcome of a failed method call through a dot-path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("{0}")]
    Thrown(#[from] Thrown),
}

// ============================================================================
// EXECUTION-TIME ERRORS
// ============================================================================

/// Why a single case failed.
#[derive(Error, Debug, Clone)]
pub enum CaseError {
    #[error("expected {expected}, got {actual}")]
    WrongOutput { expected: Value, actual: Value },

    #[error("unexpected error: {message}")]
    UnexpectedThrow { message: String },

    #[error("expected an error matching {expected}, but returned {returned}")]
    MissingThrow { expected: String, returned: Value },

    #[error("expected an error matching {expected}, got '{actual}'")]
    ThrowMismatch { expected: String, actual: String },

    #[error("assertion on '{path}' failed: expected {expected}, got {actual}")]
    Assertion {
        path: String,
        expected: Value,
        actual: Value,
    },

    #[error("failed to construct {class}: {message}")]
    Construct { class: String, message: String },

    #[error("panicked: {message}")]
    Panicked { message: String },

    #[error("case expects a {expected} export, found a {found}")]
    ShapeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    Mock(#[from] MockError),

    #[error(transparent)]
    Path(#[from] PathError),
}

impl CaseError {
    /// Expected/actual pair for diff rendering, when the failure has one.
    pub fn comparison(&self) -> Option<(&Value, &Value)> {
        match self {
            CaseError::WrongOutput { expected, actual }
            | CaseError::Assertion {
                expected, actual, ..
            } => Some((expected, actual)),
            _ => None,
        }
    }
}
