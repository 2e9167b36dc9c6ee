//! The reporting boundary between the driver and whatever presents results.

use std::path::{Path, PathBuf};

use crate::errors::{CaseError, SetupError};
use crate::model::{Suite, TestConfig};

/// Final outcome of one case.
#[derive(Debug, Clone)]
pub enum CaseOutcome {
    Passed,
    /// Every failure of the case, primary failure first, mock violations after.
    Failed(Vec<CaseError>),
    Skipped(String),
}

impl CaseOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, CaseOutcome::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CaseOutcome::Failed(_))
    }

    pub fn errors(&self) -> &[CaseError] {
        match self {
            CaseOutcome::Failed(errors) => errors,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaseReport {
    pub group: String,
    pub suite: String,
    pub case: String,
    pub outcome: CaseOutcome,
}

impl CaseReport {
    /// One-line failure text, all errors joined.
    pub fn failure_message(&self) -> Option<String> {
        match &self.outcome {
            CaseOutcome::Failed(errors) => Some(
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            _ => None,
        }
    }
}

/// Receives grouping and case results as the driver produces them.
pub trait Reporter {
    fn begin_source(&mut self, _config: &TestConfig) {}

    fn begin_suite(&mut self, _suite: &Suite) {}

    fn case_finished(&mut self, report: &CaseReport);

    fn end_suite(&mut self, _suite: &Suite) {}

    fn end_source(&mut self, _config: &TestConfig) {}

    /// A description file could not be resolved or bound; none of its cases ran.
    fn setup_failed(&mut self, source: &Path, error: &SetupError);
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub groups: Vec<String>,
    pub suites: Vec<String>,
    pub cases: Vec<CaseReport>,
    pub setup_failures: Vec<(PathBuf, String)>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn case(&self, name: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.case == name)
    }
}

impl Reporter for RecordingReporter {
    fn begin_source(&mut self, config: &TestConfig) {
        self.groups.push(config.group_name.clone());
    }

    fn begin_suite(&mut self, suite: &Suite) {
        self.suites.push(suite.name.clone());
    }

    fn case_finished(&mut self, report: &CaseReport) {
        self.cases.push(report.clone());
    }

    fn setup_failed(&mut self, source: &Path, error: &SetupError) {
        self.setup_failures
            .push((source.to_path_buf(), error.to_string()));
    }
}
