//! Conversion of a flat document stream into a [`TestConfig`].
//!
//! Three document shapes are recognized by their marker key: the header
//! (`file`), a suite (`suite`) and a case (`case`). Anything else is ignored,
//! which lets authors keep comment-only documents in a stream.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_yaml::{Mapping, Value as Yaml};
use tracing::{trace, warn};

use crate::errors::SetupError;
use crate::model::{
    AssertOp, Assertion, Call, Case, CaseBody, ExpectedCall, ExpectedThrow, Execution, MockDef,
    MockMap, Suite, SuiteMode, TestConfig,
};
use crate::module::DEFAULT_EXPORT;
use crate::value::Value;

static SLASH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/(?s)(.*)/([a-z]*)$").unwrap()
});

/// Normalizes an ordered document list in a single pass.
pub fn normalize(documents: &[Yaml]) -> Result<TestConfig, SetupError> {
    let mut config = TestConfig::default();
    let mut current: Option<Suite> = None;

    for (index, document) in documents.iter().enumerate() {
        let Yaml::Mapping(doc) = document else {
            trace!(index, "ignoring non-mapping document");
            continue;
        };

        if doc.contains_key("file") {
            apply_header(&mut config, doc)?;
        } else if doc.contains_key("suite") {
            if let Some(suite) = current.take() {
                config.suites.push(suite);
            }
            current = Some(parse_suite(doc)?);
        } else if doc.contains_key("case") {
            match current.as_mut() {
                Some(suite) => {
                    let case = parse_case(doc, &suite.mode)?;
                    suite.cases.push(case);
                }
                None => warn!(
                    index,
                    case = %scalar_or_empty(doc.get("case")),
                    "dropping case document that appears before any suite"
                ),
            }
        } else {
            trace!(index, "ignoring unrecognized document");
        }
    }

    if let Some(suite) = current {
        config.suites.push(suite);
    }
    Ok(config)
}

// ============================================================================
// DOCUMENT SHAPES
// ============================================================================

fn apply_header(config: &mut TestConfig, doc: &Mapping) -> Result<(), SetupError> {
    let file_path = scalar(doc.get("file"), "file")?;
    config.group_name = match doc.get("group").or_else(|| doc.get("name")) {
        Some(group) => scalar(Some(group), "group")?,
        None => file_path.clone(),
    };
    config.file_path = file_path;
    config.suite_filter = match doc.get("suites") {
        None | Some(Yaml::Null) => None,
        Some(Yaml::Sequence(names)) => Some(
            names
                .iter()
                .map(|n| scalar(Some(n), "suites"))
                .collect::<Result<_, _>>()?,
        ),
        Some(other) => Some(vec![scalar(Some(other), "suites")?]),
    };
    config.global_mocks = parse_mocks(doc.get("mocks"))?;
    Ok(())
}

fn parse_suite(doc: &Mapping) -> Result<Suite, SetupError> {
    let name = scalar(doc.get("suite"), "suite")?;
    let export_name = match doc.get("exportName").or_else(|| doc.get("export")) {
        Some(export) => scalar(Some(export), "exportName")?,
        None if name.is_empty() => DEFAULT_EXPORT.to_string(),
        None => name.clone(),
    };

    let mode = match doc.get("mode").and_then(Yaml::as_str) {
        Some("class") => SuiteMode::Class {
            constructor_args: parse_input(doc.get("constructorArgs")),
        },
        other => {
            if let Some(mode) = other.filter(|m| *m != "function") {
                warn!(suite = %name, mode, "unrecognized suite mode, using function mode");
            }
            if doc.contains_key("constructorArgs") {
                warn!(suite = %name, "ignoring constructorArgs on a function-mode suite");
            }
            SuiteMode::Function
        }
    };

    Ok(Suite {
        mocks: parse_mocks(doc.get("mocks"))?,
        skip: flag(doc.get("skip")),
        name,
        export_name,
        mode,
        cases: Vec::new(),
    })
}

fn parse_case(doc: &Mapping, mode: &SuiteMode) -> Result<Case, SetupError> {
    let name = scalar(doc.get("case"), "case")?;
    let body = match mode {
        SuiteMode::Function => {
            if doc.contains_key("executions") {
                warn!(case = %name, "ignoring executions on a function-mode case");
            }
            CaseBody::Function(parse_call(doc)?)
        }
        SuiteMode::Class { .. } => {
            for key in ["in", "out", "throws"] {
                if doc.contains_key(key) {
                    warn!(case = %name, key, "ignoring function-mode field on a class-mode case");
                }
            }
            CaseBody::Class(parse_executions(doc.get("executions"))?)
        }
    };
    Ok(Case {
        mocks: parse_mocks(doc.get("mocks"))?,
        skip: flag(doc.get("skip")),
        name,
        body,
    })
}

fn parse_call(doc: &Mapping) -> Result<Call, SetupError> {
    Ok(Call {
        input: parse_input(doc.get("in")),
        expected_output: doc.get("out").map(Value::from),
        expected_throw: parse_throw(doc.get("throws"))?,
    })
}

fn parse_executions(node: Option<&Yaml>) -> Result<Vec<Execution>, SetupError> {
    let items = match node {
        None | Some(Yaml::Null) => return Ok(Vec::new()),
        Some(Yaml::Sequence(items)) => items,
        Some(_) => return Err(SetupError::invalid("`executions` must be a list")),
    };
    items
        .iter()
        .map(|item| {
            let Yaml::Mapping(step) = item else {
                return Err(SetupError::invalid("each execution must be a mapping"));
            };
            if !step.contains_key("method") {
                return Err(SetupError::invalid("execution is missing `method`"));
            }
            Ok(Execution {
                method_path: scalar(step.get("method"), "method")?,
                call: parse_call(step)?,
                asserts: parse_asserts(step.get("asserts"))?,
            })
        })
        .collect()
}

fn parse_asserts(node: Option<&Yaml>) -> Result<Vec<Assertion>, SetupError> {
    let items = match node {
        None | Some(Yaml::Null) => return Ok(Vec::new()),
        Some(Yaml::Sequence(items)) => items,
        Some(_) => return Err(SetupError::invalid("`asserts` must be a list")),
    };
    items.iter().map(parse_assertion).collect()
}

fn parse_assertion(node: &Yaml) -> Result<Assertion, SetupError> {
    let Yaml::Mapping(assertion) = node else {
        return Err(SetupError::invalid("each assertion must be a mapping"));
    };
    if assertion.contains_key("property") {
        let op = match assertion.get("op").and_then(Yaml::as_str) {
            None | Some("eq") => AssertOp::Eq,
            Some(other) => {
                return Err(SetupError::invalid(format!(
                    "unsupported assertion op '{}'",
                    other
                )))
            }
        };
        return Ok(Assertion::Property {
            property_path: scalar(assertion.get("property"), "property")?,
            op,
            expected_value: assertion.get("value").map(Value::from).unwrap_or_default(),
        });
    }
    if assertion.contains_key("method") {
        return Ok(Assertion::Method {
            method_path: scalar(assertion.get("method"), "method")?,
            input: parse_input(assertion.get("in")),
            expected_output: assertion.get("out").map(Value::from),
        });
    }
    Err(SetupError::invalid(
        "assertion needs either `property` or `method`",
    ))
}

// ============================================================================
// MOCK DEFINITIONS
// ============================================================================

/// Parses a `mocks` mapping of name to definition.
pub fn parse_mocks(node: Option<&Yaml>) -> Result<MockMap, SetupError> {
    let mapping = match node {
        None | Some(Yaml::Null) => return Ok(MockMap::new()),
        Some(Yaml::Mapping(mapping)) => mapping,
        Some(_) => return Err(SetupError::invalid("`mocks` must be a mapping")),
    };
    let mut mocks = MockMap::new();
    for (name, def) in mapping {
        let name = scalar(Some(name), "mock name")?;
        let def = parse_mock_def(&name, def)?;
        mocks.insert(name, def);
    }
    Ok(mocks)
}

fn parse_mock_def(name: &str, node: &Yaml) -> Result<MockDef, SetupError> {
    let calls = match node {
        Yaml::Null => return Ok(MockDef::default()),
        Yaml::Sequence(calls) => calls,
        Yaml::Mapping(def) => match def.get("calls") {
            None | Some(Yaml::Null) => return Ok(MockDef::default()),
            Some(Yaml::Sequence(calls)) => calls,
            Some(_) => {
                return Err(SetupError::invalid(format!(
                    "`calls` of mock '{}' must be a list",
                    name
                )))
            }
        },
        _ => {
            return Err(SetupError::invalid(format!(
                "mock '{}' must be a mapping with `calls`",
                name
            )))
        }
    };

    let calls = calls
        .iter()
        .map(|call| {
            let Yaml::Mapping(call) = call else {
                return Err(SetupError::invalid(format!(
                    "each call of mock '{}' must be a mapping",
                    name
                )));
            };
            Ok(ExpectedCall {
                input_args: parse_input(call.get("in")),
                expected_output: call.get("out").map(Value::from),
                expected_throw: match call.get("throws") {
                    None | Some(Yaml::Null) => None,
                    Some(message) => Some(scalar(Some(message), "throws")?),
                },
            })
        })
        .collect::<Result<_, _>>()?;
    Ok(MockDef { calls })
}

// ============================================================================
// FIELD HELPERS
// ============================================================================

/// Argument lists: a sequence as-is, any other value as a single argument.
fn parse_input(node: Option<&Yaml>) -> Vec<Value> {
    match node {
        None | Some(Yaml::Null) => Vec::new(),
        Some(Yaml::Sequence(items)) => items.iter().map(Value::from).collect(),
        Some(other) => vec![Value::from(other)],
    }
}

/// Parses a `throws` field. `/re/flags` is a pattern, anything else a substring.
pub fn parse_throw(node: Option<&Yaml>) -> Result<Option<ExpectedThrow>, SetupError> {
    let raw = match node {
        None | Some(Yaml::Null) => return Ok(None),
        Some(other) => scalar(Some(other), "throws")?,
    };
    let Some(captures) = SLASH_PATTERN.captures(&raw) else {
        return Ok(Some(ExpectedThrow::Message(raw)));
    };
    let source = &captures[1];
    let mut builder = RegexBuilder::new(source);
    for flag in captures[2].chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => {
                return Err(SetupError::invalid(format!(
                    "unsupported pattern flag '{}' in {}",
                    other, raw
                )))
            }
        };
    }
    let regex = builder.build().map_err(|source| SetupError::InvalidPattern {
        pattern: raw.clone(),
        source,
    })?;
    Ok(Some(ExpectedThrow::Pattern { raw, regex }))
}

fn scalar(node: Option<&Yaml>, field: &str) -> Result<String, SetupError> {
    match node {
        None | Some(Yaml::Null) => Ok(String::new()),
        Some(Yaml::String(s)) => Ok(s.clone()),
        Some(Yaml::Number(n)) => Ok(n.to_string()),
        Some(Yaml::Bool(b)) => Ok(b.to_string()),
        Some(Yaml::Tagged(tagged)) => scalar(Some(&tagged.value), field),
        Some(_) => Err(SetupError::invalid(format!(
            "`{}` must be a scalar value",
            field
        ))),
    }
}

fn scalar_or_empty(node: Option<&Yaml>) -> String {
    scalar(node, "").unwrap_or_default()
}

fn flag(node: Option<&Yaml>) -> bool {
    matches!(node, Some(Yaml::Bool(true)))
}

// ============================================================================
// DOCUMENT-EQUIVALENT FORM
// ============================================================================

/// Renders a configuration back into the document stream it normalizes from.
pub fn to_documents(config: &TestConfig) -> Vec<Yaml> {
    let mut documents = Vec::with_capacity(1 + config.suites.len() + config.case_count());

    let mut header = Mapping::new();
    header.insert("file".into(), config.file_path.as_str().into());
    header.insert("group".into(), config.group_name.as_str().into());
    if let Some(names) = &config.suite_filter {
        header.insert(
            "suites".into(),
            Yaml::Sequence(names.iter().map(|n| n.as_str().into()).collect()),
        );
    }
    insert_mocks(&mut header, &config.global_mocks);
    documents.push(Yaml::Mapping(header));

    for suite in &config.suites {
        let mut doc = Mapping::new();
        doc.insert("suite".into(), suite.name.as_str().into());
        doc.insert("exportName".into(), suite.export_name.as_str().into());
        doc.insert("mode".into(), suite.mode.as_str().into());
        if let SuiteMode::Class { constructor_args } = &suite.mode {
            doc.insert("constructorArgs".into(), values_to_yaml(constructor_args));
        }
        insert_mocks(&mut doc, &suite.mocks);
        if suite.skip {
            doc.insert("skip".into(), true.into());
        }
        documents.push(Yaml::Mapping(doc));

        for case in &suite.cases {
            documents.push(case_to_yaml(case));
        }
    }
    documents
}

fn case_to_yaml(case: &Case) -> Yaml {
    let mut doc = Mapping::new();
    doc.insert("case".into(), case.name.as_str().into());
    match &case.body {
        CaseBody::Function(call) => insert_call(&mut doc, call),
        CaseBody::Class(executions) => {
            let steps = executions
                .iter()
                .map(|execution| {
                    let mut step = Mapping::new();
                    step.insert("method".into(), execution.method_path.as_str().into());
                    insert_call(&mut step, &execution.call);
                    if !execution.asserts.is_empty() {
                        step.insert(
                            "asserts".into(),
                            Yaml::Sequence(execution.asserts.iter().map(assertion_to_yaml).collect()),
                        );
                    }
                    Yaml::Mapping(step)
                })
                .collect();
            doc.insert("executions".into(), Yaml::Sequence(steps));
        }
    }
    insert_mocks(&mut doc, &case.mocks);
    if case.skip {
        doc.insert("skip".into(), true.into());
    }
    Yaml::Mapping(doc)
}

fn insert_call(doc: &mut Mapping, call: &Call) {
    doc.insert("in".into(), values_to_yaml(&call.input));
    if let Some(out) = &call.expected_output {
        doc.insert("out".into(), out.to_yaml());
    }
    if let Some(throw) = &call.expected_throw {
        let raw = match throw {
            ExpectedThrow::Message(m) => m.clone(),
            ExpectedThrow::Pattern { raw, .. } => raw.clone(),
        };
        doc.insert("throws".into(), raw.into());
    }
}

fn assertion_to_yaml(assertion: &Assertion) -> Yaml {
    let mut doc = Mapping::new();
    match assertion {
        Assertion::Property {
            property_path,
            op,
            expected_value,
        } => {
            doc.insert("property".into(), property_path.as_str().into());
            doc.insert("op".into(), op.as_str().into());
            if !expected_value.is_undefined() {
                doc.insert("value".into(), expected_value.to_yaml());
            }
        }
        Assertion::Method {
            method_path,
            input,
            expected_output,
        } => {
            doc.insert("method".into(), method_path.as_str().into());
            doc.insert("in".into(), values_to_yaml(input));
            if let Some(out) = expected_output {
                doc.insert("out".into(), out.to_yaml());
            }
        }
    }
    Yaml::Mapping(doc)
}

fn insert_mocks(doc: &mut Mapping, mocks: &MockMap) {
    if mocks.is_empty() {
        return;
    }
    let mut rendered = Mapping::new();
    for (name, def) in mocks.iter() {
        let calls = def
            .calls
            .iter()
            .map(|call| {
                let mut entry = Mapping::new();
                entry.insert("in".into(), values_to_yaml(&call.input_args));
                if let Some(out) = &call.expected_output {
                    entry.insert("out".into(), out.to_yaml());
                }
                if let Some(message) = &call.expected_throw {
                    entry.insert("throws".into(), message.as_str().into());
                }
                Yaml::Mapping(entry)
            })
            .collect();
        let mut def_doc = Mapping::new();
        def_doc.insert("calls".into(), Yaml::Sequence(calls));
        rendered.insert(name.as_str().into(), Yaml::Mapping(def_doc));
    }
    doc.insert("mocks".into(), Yaml::Mapping(rendered));
}

fn values_to_yaml(values: &[Value]) -> Yaml {
    Yaml::Sequence(values.iter().map(Value::to_yaml).collect())
}
