//! The typed test-configuration model produced by [`crate::normalize`].

use std::fmt;
use std::path::PathBuf;

use im::OrdMap;
use regex::Regex;

use crate::value::Value;

/// Mock definitions keyed by mock name.
pub type MockMap = OrdMap<String, MockDef>;

/// One resolved test-description source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestConfig {
    /// The description file this configuration was loaded from.
    pub source: PathBuf,
    /// Target module path, relative to the source's directory.
    pub file_path: String,
    pub group_name: String,
    pub global_mocks: MockMap,
    /// When present, only suites named here run.
    pub suite_filter: Option<Vec<String>>,
    pub suites: Vec<Suite>,
}

impl TestConfig {
    pub fn case_count(&self) -> usize {
        self.suites.iter().map(|s| s.cases.len()).sum()
    }

    /// True when the header's suite filter admits `suite`.
    pub fn selects(&self, suite: &Suite) -> bool {
        match &self.suite_filter {
            Some(names) => names.iter().any(|n| n == &suite.name),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    pub name: String,
    pub export_name: String,
    pub mode: SuiteMode,
    pub mocks: MockMap,
    pub skip: bool,
    pub cases: Vec<Case>,
}

/// How the suite's export is invoked.
#[derive(Debug, Clone, PartialEq)]
pub enum SuiteMode {
    Function,
    Class { constructor_args: Vec<Value> },
}

impl SuiteMode {
    pub fn is_class(&self) -> bool {
        matches!(self, SuiteMode::Class { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SuiteMode::Function => "function",
            SuiteMode::Class { .. } => "class",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub name: String,
    pub mocks: MockMap,
    pub skip: bool,
    pub body: CaseBody,
}

/// Case shape, dictated by the owning suite's mode.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseBody {
    Function(Call),
    Class(Vec<Execution>),
}

/// A single invocation with its expectation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Call {
    pub input: Vec<Value>,
    pub expected_output: Option<Value>,
    pub expected_throw: Option<ExpectedThrow>,
}

/// One step of a class-mode case.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub method_path: String,
    pub call: Call,
    pub asserts: Vec<Assertion>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assertion {
    Property {
        property_path: String,
        op: AssertOp,
        expected_value: Value,
    },
    Method {
        method_path: String,
        input: Vec<Value>,
        expected_output: Option<Value>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertOp {
    Eq,
}

impl AssertOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssertOp::Eq => "eq",
        }
    }
}

/// Expected failure: a message substring or a pattern.
#[derive(Debug, Clone)]
pub enum ExpectedThrow {
    Message(String),
    /// `raw` keeps the `/source/flags` text as written.
    Pattern { raw: String, regex: Regex },
}

impl ExpectedThrow {
    pub fn matches(&self, message: &str) -> bool {
        match self {
            ExpectedThrow::Message(expected) => message.contains(expected.as_str()),
            ExpectedThrow::Pattern { regex, .. } => regex.is_match(message),
        }
    }
}

impl PartialEq for ExpectedThrow {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ExpectedThrow::Message(a), ExpectedThrow::Message(b)) => a == b,
            (ExpectedThrow::Pattern { raw: a, .. }, ExpectedThrow::Pattern { raw: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ExpectedThrow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedThrow::Message(m) => write!(f, "{:?}", m),
            ExpectedThrow::Pattern { raw, .. } => write!(f, "{}", raw),
        }
    }
}

/// Ordered expected invocations of one mock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockDef {
    pub calls: Vec<ExpectedCall>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpectedCall {
    pub input_args: Vec<Value>,
    pub expected_output: Option<Value>,
    pub expected_throw: Option<String>,
}
