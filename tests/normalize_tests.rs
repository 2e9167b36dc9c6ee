//! Document-stream normalization and the document-equivalent form.

use serde_yaml::Value as Yaml;
use tabula::include::parse_documents;
use tabula::model::{Assertion, CaseBody, ExpectedThrow, SuiteMode, TestConfig};
use tabula::normalize::{normalize, to_documents};
use tabula::{SetupError, Value};

fn docs(text: &str) -> Vec<Yaml> {
    parse_documents(text, std::path::Path::new("inline.yaml")).unwrap()
}

fn config(text: &str) -> TestConfig {
    normalize(&docs(text)).unwrap()
}

#[test]
fn header_suite_and_case_normalize() {
    let config = config(
        "file: './math.js'\ngroup: 'math'\n---\nsuite: add\nexportName: add\n---\ncase: '1+2'\nin: [1, 2]\nout: 3\n",
    );

    assert_eq!(config.file_path, "./math.js");
    assert_eq!(config.group_name, "math");
    assert_eq!(config.suites.len(), 1);
    let suite = &config.suites[0];
    assert_eq!(suite.name, "add");
    assert_eq!(suite.export_name, "add");
    assert_eq!(suite.mode, SuiteMode::Function);

    let CaseBody::Function(call) = &suite.cases[0].body else {
        panic!("expected a function case");
    };
    assert_eq!(call.input, vec![Value::from(1), Value::from(2)]);
    assert_eq!(call.expected_output, Some(Value::from(3)));
}

#[test]
fn case_before_any_suite_is_dropped() {
    let config = config("file: ./math.js\n---\ncase: orphan\nin: [1, 2]\n");
    assert_eq!(config.case_count(), 0);
    assert!(config.suites.is_empty());
}

#[test]
fn later_header_overwrites_earlier() {
    let config = config("file: ./a.js\ngroup: first\n---\nfile: ./b.js\nname: second\n");
    assert_eq!(config.file_path, "./b.js");
    assert_eq!(config.group_name, "second");
}

#[test]
fn group_defaults_to_file_and_export_to_suite_name() {
    let config = config("file: ./math.js\n---\nsuite: add\n---\nsuite: ''\n");
    assert_eq!(config.group_name, "./math.js");
    assert_eq!(config.suites[0].export_name, "add");
    assert_eq!(config.suites[1].export_name, "default");
}

#[test]
fn unrecognized_documents_are_ignored() {
    let config = config("note: just a comment\n---\n- a\n- b\n---\nsuite: add\n---\ncase: one\n");
    assert_eq!(config.suites.len(), 1);
    assert_eq!(config.case_count(), 1);
}

#[test]
fn case_shape_follows_the_suite_mode() {
    let config = config(
        "suite: Counter\nmode: class\nconstructorArgs: [5]\n---\ncase: steps\nin: [1]\nout: 9\nexecutions:\n  - method: increment\n    out: 6\n    asserts:\n      - property: count\n        value: 6\n      - method: get\n        out: 6\n---\nsuite: add\n---\ncase: plain\nin: 4\nexecutions:\n  - method: ignored\n",
    );

    let counter = &config.suites[0];
    assert_eq!(
        counter.mode,
        SuiteMode::Class {
            constructor_args: vec![Value::from(5)]
        }
    );
    let CaseBody::Class(executions) = &counter.cases[0].body else {
        panic!("expected a class case");
    };
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].method_path, "increment");
    assert!(matches!(
        &executions[0].asserts[0],
        Assertion::Property { property_path, .. } if property_path == "count"
    ));
    assert!(matches!(&executions[0].asserts[1], Assertion::Method { .. }));

    let CaseBody::Function(call) = &config.suites[1].cases[0].body else {
        panic!("expected a function case");
    };
    assert_eq!(call.input, vec![Value::from(4)]);
}

#[test]
fn out_absent_differs_from_out_null() {
    let config = config("suite: f\n---\ncase: unchecked\n---\ncase: expects null\nout: null\n");
    let outputs: Vec<_> = config.suites[0]
        .cases
        .iter()
        .map(|case| match &case.body {
            CaseBody::Function(call) => call.expected_output.clone(),
            CaseBody::Class(_) => unreachable!(),
        })
        .collect();
    assert_eq!(outputs, vec![None, Some(Value::Null)]);
}

#[test]
fn throws_accepts_substrings_and_patterns() {
    let config = config(
        "suite: divide\n---\ncase: a\nthrows: by zero\n---\ncase: b\nthrows: /division BY \\w+/i\n",
    );
    let throws: Vec<ExpectedThrow> = config.suites[0]
        .cases
        .iter()
        .filter_map(|case| match &case.body {
            CaseBody::Function(call) => call.expected_throw.clone(),
            CaseBody::Class(_) => None,
        })
        .collect();
    assert!(matches!(&throws[0], ExpectedThrow::Message(m) if m == "by zero"));
    assert!(matches!(&throws[1], ExpectedThrow::Pattern { .. }));
    assert!(throws[1].matches("Division by zero"));
    assert!(!throws[0].matches("Division By Zero"));
}

#[test]
fn invalid_pattern_is_a_setup_error() {
    let err = normalize(&docs("suite: f\n---\ncase: bad\nthrows: /([/\n")).unwrap_err();
    assert!(matches!(err, SetupError::InvalidPattern { .. }), "{err:?}");
}

#[test]
fn mocks_accept_calls_mapping_or_bare_list() {
    let config = config(
        "file: ./x.js\nmocks:\n  logger:\n    calls:\n      - in: [1]\n        out: true\n---\nsuite: s\nmocks:\n  clock:\n    - out: 10\n    - throws: stopped\n",
    );
    let logger = config.global_mocks.get("logger").unwrap();
    assert_eq!(logger.calls.len(), 1);
    assert_eq!(logger.calls[0].input_args, vec![Value::from(1)]);
    assert_eq!(logger.calls[0].expected_output, Some(Value::from(true)));

    let clock = config.suites[0].mocks.get("clock").unwrap();
    assert_eq!(clock.calls.len(), 2);
    assert!(clock.calls[0].input_args.is_empty());
    assert_eq!(clock.calls[1].expected_throw.as_deref(), Some("stopped"));
}

#[test]
fn unsupported_assertion_op_is_rejected() {
    let err = normalize(&docs(
        "suite: C\nmode: class\n---\ncase: c\nexecutions:\n  - method: m\n    asserts:\n      - property: p\n        op: gt\n        value: 1\n",
    ))
    .unwrap_err();
    assert!(matches!(err, SetupError::InvalidDocument { .. }));
}

#[test]
fn normalization_is_idempotent() {
    let sources = [
        "file: ./math.js\ngroup: math\nsuites: [add]\nmocks:\n  logger:\n    - in: [1]\n---\nsuite: add\nexport: sum\nskip: true\n---\ncase: one\nin: [1, 2]\nout: 3\n---\ncase: nul\nout: null\nthrows: /Bad input/i\nskip: true\n",
        "file: ./objects.js\n---\nsuite: Counter\nmode: class\nconstructorArgs: [{start: 1}]\n---\ncase: steps\nmocks:\n  cb:\n    calls:\n      - in: [[1, 2]]\n        out: {ok: true}\n        throws: nope\nexecutions:\n  - method: add\n    in: [2]\n    out: 3\n    asserts:\n      - property: count\n        op: eq\n        value: 3\n      - property: missing\n      - method: get\n        in: []\n        out: 3\n",
        "file: ./x.js\n",
    ];
    for source in sources {
        let first = config(source);
        let second = normalize(&to_documents(&first)).unwrap();
        assert_eq!(first, second, "round trip changed {source}");
    }
}
