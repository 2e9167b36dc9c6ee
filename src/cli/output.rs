//! Handles all user-facing output for the CLI.
//!
//! This module is responsible for colorizing case results, rendering
//! expected/actual diffs and printing check reports. [`ConsoleReporter`] is
//! also the reporter hosts use when they run descriptions against their own
//! modules.

use std::io::Write;
use std::path::Path;

use difference::{Changeset, Difference};
use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::errors::{CaseError, SetupError};
use crate::model::{Suite, TestConfig};
use crate::report::{CaseOutcome, CaseReport, Reporter};
use crate::runner::RunSummary;

// ============================================================================
// CONSOLE REPORTER
// ============================================================================

/// Prints grouped, colored case results as they arrive.
pub struct ConsoleReporter<W: WriteColor> {
    out: W,
    summary: RunSummary,
}

impl ConsoleReporter<StandardStream> {
    pub fn stdout(use_colors: bool) -> Self {
        let choice = if use_colors {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self::new(StandardStream::stdout(choice))
    }
}

impl<W: WriteColor> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            summary: RunSummary::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Prints the totals seen so far.
    pub fn print_summary(&mut self) {
        let s = self.summary;
        let _ = writeln!(self.out);
        let _ = write!(self.out, "Test summary: ");
        self.colored(Color::Green, &format!("{} passed", s.passed));
        let _ = write!(self.out, ", ");
        self.colored(Color::Red, &format!("{} failed", s.failed));
        let _ = write!(self.out, ", ");
        self.colored(Color::Yellow, &format!("{} skipped", s.skipped));
        if s.setup_failures > 0 {
            let _ = write!(self.out, ", ");
            self.colored(Color::Red, &format!("{} setup failures", s.setup_failures));
        }
        let _ = writeln!(self.out, " ({:.1}% success)", s.success_rate());
    }

    fn colored(&mut self, color: Color, text: &str) {
        let _ = self
            .out
            .set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
        let _ = write!(self.out, "{}", text);
        let _ = self.out.reset();
    }

    fn print_error(&mut self, error: &CaseError) {
        let _ = writeln!(self.out, "      {}", error);
        if let Some((expected, actual)) = error.comparison() {
            let changeset = Changeset::new(&expected.pretty(), &actual.pretty(), "\n");
            print_diff(&mut self.out, &changeset.diffs);
        }
    }
}

impl<W: WriteColor> Reporter for ConsoleReporter<W> {
    fn begin_source(&mut self, config: &TestConfig) {
        let _ = self.out.set_color(ColorSpec::new().set_bold(true));
        let _ = write!(self.out, "{}", config.group_name);
        let _ = self.out.reset();
        let _ = writeln!(self.out, " [{}]", config.source.display());
    }

    fn begin_suite(&mut self, suite: &Suite) {
        let _ = writeln!(self.out, "  {}", suite.name);
    }

    fn case_finished(&mut self, report: &CaseReport) {
        let _ = write!(self.out, "    ");
        match &report.outcome {
            CaseOutcome::Passed => {
                self.summary.passed += 1;
                self.colored(Color::Green, "PASS");
                let _ = writeln!(self.out, ": {}", report.case);
            }
            CaseOutcome::Skipped(reason) => {
                self.summary.skipped += 1;
                self.colored(Color::Yellow, "SKIP");
                let _ = writeln!(self.out, ": {} ({})", report.case, reason);
            }
            CaseOutcome::Failed(errors) => {
                self.summary.failed += 1;
                self.colored(Color::Red, "FAIL");
                let _ = writeln!(self.out, ": {}", report.case);
                for error in errors {
                    self.print_error(error);
                }
            }
        }
    }

    fn setup_failed(&mut self, source: &Path, error: &SetupError) {
        self.summary.setup_failures += 1;
        self.colored(Color::Red, "SETUP");
        let _ = writeln!(self.out, ": {}: {}", source.display(), error);
    }
}

// ============================================================================
// CHECK REPORTS
// ============================================================================

/// Result of resolving one description file without running it.
#[derive(Debug, Clone, Serialize)]
pub struct CheckEntry {
    pub path: String,
    pub group: Option<String>,
    pub suites: usize,
    pub cases: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub files: Vec<CheckEntry>,
    pub failures: usize,
}

impl CheckReport {
    pub fn new(files: Vec<CheckEntry>) -> Self {
        let failures = files.iter().filter(|f| f.error.is_some()).count();
        Self { files, failures }
    }
}

/// Prints one `OK`/`ERROR` line per checked file.
pub fn print_check_entry(stdout: &mut StandardStream, entry: &CheckEntry) {
    match &entry.error {
        None => {
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
            let _ = write!(stdout, "OK");
            let _ = stdout.reset();
            let _ = writeln!(
                stdout,
                "    {} ({} suites, {} cases)",
                entry.path, entry.suites, entry.cases
            );
        }
        Some(_) => {
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
            let _ = write!(stdout, "ERROR");
            let _ = stdout.reset();
            let _ = writeln!(stdout, " {}", entry.path);
        }
    }
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn print_diff(out: &mut impl WriteColor, diffs: &[Difference]) {
    for diff in diffs {
        match diff {
            Difference::Same(ref x) => {
                for line in x.lines() {
                    let _ = writeln!(out, "        {}", line);
                }
            }
            Difference::Rem(ref x) => {
                let _ = out.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
                for line in x.lines() {
                    let _ = writeln!(out, "      - {}", line);
                }
                let _ = out.reset();
            }
            Difference::Add(ref x) => {
                let _ = out.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
                for line in x.lines() {
                    let _ = writeln!(out, "      + {}", line);
                }
                let _ = out.reset();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use termcolor::Buffer;

    fn report(outcome: CaseOutcome) -> CaseReport {
        CaseReport {
            group: "Math".into(),
            suite: "add".into(),
            case: "adds".into(),
            outcome,
        }
    }

    #[test]
    fn failure_prints_expected_and_actual_lines() {
        let mut reporter = ConsoleReporter::new(Buffer::no_color());
        reporter.case_finished(&report(CaseOutcome::Failed(vec![CaseError::WrongOutput {
            expected: Value::from(3),
            actual: Value::from(4),
        }])));
        let text = String::from_utf8(reporter.into_inner().into_inner()).unwrap();
        assert!(text.contains("FAIL: adds"));
        assert!(text.contains("- 3"));
        assert!(text.contains("+ 4"));
    }

    #[test]
    fn summary_counts_outcomes() {
        let mut reporter = ConsoleReporter::new(Buffer::no_color());
        reporter.case_finished(&report(CaseOutcome::Passed));
        reporter.case_finished(&report(CaseOutcome::Skipped("Marked 'skip'".into())));
        reporter.print_summary();
        let text = String::from_utf8(reporter.into_inner().into_inner()).unwrap();
        assert!(text.contains("1 passed, 0 failed, 1 skipped"));
    }
}
