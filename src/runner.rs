//! The execution driver.
//!
//! Runs every case of a [`TestConfig`] in document order against the module
//! returned by a [`ModuleLoader`]. Each case gets fresh mock functions, and
//! class-mode cases get one fresh instance shared by their executions. Mock
//! verification runs after every case body, whatever the body's outcome.

use std::ops::AddAssign;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::compare::deep_equal;
use crate::errors::{CallError, CaseError, SetupError};
use crate::mock::{self, MockSet};
use crate::model::{
    Assertion, Call, Case, CaseBody, ExpectedThrow, Execution, Suite, SuiteMode, TestConfig,
};
use crate::module::{target_path, Export, ModuleLoader};
use crate::path::{call_method, get_property};
use crate::report::{CaseOutcome, CaseReport, Reporter};
use crate::substitute::{substitute, substitute_all};
use crate::value::{Thrown, Value};

// ============================================================================
// CORE TYPES
// ============================================================================

/// Options that narrow a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Case-insensitive substring a case name must contain.
    pub filter: Option<String>,
}

/// Aggregate counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub setup_failures: usize,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.setup_failures > 0
    }

    pub fn total_tests(&self) -> usize {
        self.passed + self.failed
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_tests() == 0 {
            return 0.0;
        }
        (self.passed as f64 / self.total_tests() as f64) * 100.0
    }

    fn record(&mut self, outcome: &CaseOutcome) {
        match outcome {
            CaseOutcome::Passed => self.passed += 1,
            CaseOutcome::Failed(_) => self.failed += 1,
            CaseOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}

impl AddAssign for RunSummary {
    fn add_assign(&mut self, other: Self) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.setup_failures += other.setup_failures;
    }
}

// ============================================================================
// DRIVER
// ============================================================================

/// Drives description files against a module loader.
pub struct Runner<'a> {
    loader: &'a dyn ModuleLoader,
    options: RunOptions,
}

impl<'a> Runner<'a> {
    pub fn new(loader: &'a dyn ModuleLoader) -> Self {
        Self {
            loader,
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs several description files one after another.
    pub fn run_files(&self, paths: &[PathBuf], reporter: &mut dyn Reporter) -> RunSummary {
        let mut summary = RunSummary::default();
        for path in paths {
            summary += self.run_file(path, reporter);
        }
        summary
    }

    /// Loads, resolves and runs one description file.
    pub fn run_file(&self, path: &Path, reporter: &mut dyn Reporter) -> RunSummary {
        match crate::load_config(path) {
            Ok(config) => self.run_config(&config, reporter),
            Err(error) => {
                reporter.setup_failed(path, &error);
                RunSummary {
                    setup_failures: 1,
                    ..RunSummary::default()
                }
            }
        }
    }

    /// Runs every suite of an already-resolved configuration.
    pub fn run_config(&self, config: &TestConfig, reporter: &mut dyn Reporter) -> RunSummary {
        let mut summary = RunSummary::default();
        let targets = match self.bind(config) {
            Ok(targets) => targets,
            Err(error) => {
                reporter.setup_failed(&config.source, &error);
                summary.setup_failures += 1;
                return summary;
            }
        };

        reporter.begin_source(config);
        for (suite, target) in config.suites.iter().zip(&targets) {
            reporter.begin_suite(suite);
            for case in &suite.cases {
                let outcome = match (self.skip_reason(config, suite, case), target) {
                    (Some(reason), _) => CaseOutcome::Skipped(reason),
                    (None, Some(export)) => self.run_case(config, suite, export, case),
                    (None, None) => CaseOutcome::Skipped("suite not bound".to_string()),
                };
                summary.record(&outcome);
                reporter.case_finished(&CaseReport {
                    group: config.group_name.clone(),
                    suite: suite.name.clone(),
                    case: case.name.clone(),
                    outcome,
                });
            }
            reporter.end_suite(suite);
        }
        reporter.end_source(config);

        info!(
            source = %config.source.display(),
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            "description file finished"
        );
        summary
    }

    /// Runs one case to a terminal state.
    pub fn run_case(
        &self,
        config: &TestConfig,
        suite: &Suite,
        target: &Export,
        case: &Case,
    ) -> CaseOutcome {
        let resolved = mock::resolve(&case.mocks, &suite.mocks, &config.global_mocks);
        let mut mocks = MockSet::build(&resolved);

        debug!(case = %case.name, mocks = resolved.len(), "case running");
        let body = panic::catch_unwind(AssertUnwindSafe(|| {
            run_body(suite, target, case, &mocks)
        }));

        let mut errors = match body {
            Ok(Ok(())) => Vec::new(),
            Ok(Err(error)) => vec![error],
            Err(payload) => vec![CaseError::Panicked {
                message: panic_message(payload.as_ref()),
            }],
        };
        errors.extend(mocks.finalize().into_iter().map(CaseError::from));
        mocks.clear();

        debug!(case = %case.name, failures = errors.len(), "case finished");
        if errors.is_empty() {
            CaseOutcome::Passed
        } else {
            CaseOutcome::Failed(errors)
        }
    }

    /// Loads the target module and looks up the export of every runnable suite.
    fn bind(&self, config: &TestConfig) -> Result<Vec<Option<Export>>, SetupError> {
        let runnable =
            |suite: &Suite| config.selects(suite) && !suite.skip && !suite.cases.is_empty();
        if !config.suites.iter().any(runnable) {
            return Ok(vec![None; config.suites.len()]);
        }

        let module_path = target_path(&config.source, &config.file_path);
        debug!(module = %module_path.display(), "loading module under test");
        let module = self.loader.load(&module_path)?;

        config
            .suites
            .iter()
            .map(|suite| {
                if !runnable(suite) {
                    return Ok(None);
                }
                let export = module
                    .get(&suite.export_name)
                    .ok_or_else(|| SetupError::UndefinedExport {
                        export: suite.export_name.clone(),
                        module: module_path.clone(),
                    })?;
                let expected = suite.mode.as_str();
                if export.kind() != expected {
                    return Err(SetupError::ExportKindMismatch {
                        export: suite.export_name.clone(),
                        expected,
                    });
                }
                Ok(Some(export.clone()))
            })
            .collect()
    }

    fn skip_reason(&self, config: &TestConfig, suite: &Suite, case: &Case) -> Option<String> {
        if !config.selects(suite) {
            return Some("Not selected by the suite filter".to_string());
        }
        if suite.skip {
            return Some("Suite marked 'skip'".to_string());
        }
        if case.skip {
            return Some("Marked 'skip'".to_string());
        }
        if let Some(filter) = &self.options.filter {
            let filter = filter.to_lowercase();
            if !case.name.to_lowercase().contains(&filter) {
                return Some(format!("Filtered out by substring: {}", filter));
            }
        }
        None
    }
}

// ============================================================================
// CASE BODIES
// ============================================================================

fn run_body(
    suite: &Suite,
    target: &Export,
    case: &Case,
    mocks: &MockSet,
) -> Result<(), CaseError> {
    match (&case.body, target, &suite.mode) {
        (CaseBody::Function(call), Export::Function(function), _) => {
            let args = substitute_all(&call.input, mocks)?;
            let expected = expected_output(call, mocks)?;
            check_result(function.call(&args), expected.as_ref(), call.expected_throw.as_ref())
        }
        (
            CaseBody::Class(executions),
            Export::Class(class),
            SuiteMode::Class { constructor_args },
        ) => {
            let args = substitute_all(constructor_args, mocks)?;
            let instance = class.construct(&args).map_err(|thrown| CaseError::Construct {
                class: class.name().to_string(),
                message: thrown.message,
            })?;
            let root = Value::Object(instance);
            for execution in executions {
                run_execution(&root, execution, mocks)?;
            }
            Ok(())
        }
        (_, export, mode) => Err(CaseError::ShapeMismatch {
            expected: mode.as_str(),
            found: export.kind(),
        }),
    }
}

fn run_execution(root: &Value, execution: &Execution, mocks: &MockSet) -> Result<(), CaseError> {
    let args = substitute_all(&execution.call.input, mocks)?;
    let expected = expected_output(&execution.call, mocks)?;
    let result = match call_method(root, &execution.method_path, &args) {
        Ok(value) => Ok(value),
        Err(CallError::Thrown(thrown)) => Err(thrown),
        Err(CallError::Path(error)) => return Err(error.into()),
    };
    check_result(result, expected.as_ref(), execution.call.expected_throw.as_ref())?;

    for assertion in &execution.asserts {
        check_assertion(root, assertion, mocks)?;
    }
    Ok(())
}

fn check_assertion(
    root: &Value,
    assertion: &Assertion,
    mocks: &MockSet,
) -> Result<(), CaseError> {
    match assertion {
        Assertion::Property {
            property_path,
            expected_value,
            ..
        } => {
            let actual = get_property(root, property_path)?;
            let expected = substitute(expected_value, mocks)?;
            if !deep_equal(&expected, &actual) {
                return Err(CaseError::Assertion {
                    path: property_path.clone(),
                    expected,
                    actual,
                });
            }
            Ok(())
        }
        Assertion::Method {
            method_path,
            input,
            expected_output,
        } => {
            let args = substitute_all(input, mocks)?;
            let actual = match call_method(root, method_path, &args) {
                Ok(value) => value,
                Err(CallError::Thrown(thrown)) => {
                    return Err(CaseError::UnexpectedThrow {
                        message: thrown.message,
                    })
                }
                Err(CallError::Path(error)) => return Err(error.into()),
            };
            let Some(expected) = expected_output else {
                return Ok(());
            };
            let expected = substitute(expected, mocks)?;
            if !deep_equal(&expected, &actual) {
                return Err(CaseError::Assertion {
                    path: method_path.clone(),
                    expected,
                    actual,
                });
            }
            Ok(())
        }
    }
}

fn expected_output(call: &Call, mocks: &MockSet) -> Result<Option<Value>, CaseError> {
    Ok(call
        .expected_output
        .as_ref()
        .map(|value| substitute(value, mocks))
        .transpose()?)
}

/// Compares an invocation result with the declared expectation.
fn check_result(
    result: Result<Value, Thrown>,
    expected_output: Option<&Value>,
    expected_throw: Option<&ExpectedThrow>,
) -> Result<(), CaseError> {
    match (result, expected_throw) {
        (Ok(returned), Some(expected)) => Err(CaseError::MissingThrow {
            expected: expected.to_string(),
            returned,
        }),
        (Err(thrown), Some(expected)) if expected.matches(&thrown.message) => Ok(()),
        (Err(thrown), Some(expected)) => Err(CaseError::ThrowMismatch {
            expected: expected.to_string(),
            actual: thrown.message,
        }),
        (Err(thrown), None) => Err(CaseError::UnexpectedThrow {
            message: thrown.message,
        }),
        (Ok(actual), None) => match expected_output {
            Some(expected) if !deep_equal(expected, &actual) => Err(CaseError::WrongOutput {
                expected: expected.clone(),
                actual,
            }),
            _ => Ok(()),
        },
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return s.to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "unknown panic".to_string()
}
