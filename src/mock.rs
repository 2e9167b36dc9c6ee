//! Mock hierarchy resolution and call-verifying mock functions.
//!
//! Definitions merge with precedence case > suite > global, replacing whole
//! entries by name. Each resolved definition becomes one [`MockFunction`]
//! owned by the running case.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::debug;

use crate::compare::all_equal;
use crate::errors::MockError;
use crate::model::{MockDef, MockMap};
use crate::value::{format_args, Callable, Function, Thrown, Value};

/// Merges the three mock layers. A name defined at a narrower layer replaces
/// the wider definition entirely.
pub fn resolve(case_mocks: &MockMap, suite_mocks: &MockMap, global_mocks: &MockMap) -> MockMap {
    let mut merged = global_mocks.clone();
    for layer in [suite_mocks, case_mocks] {
        for (name, def) in layer {
            merged.insert(name.clone(), def.clone());
        }
    }
    merged
}

struct MockState {
    name: String,
    def: MockDef,
    cursor: Cell<usize>,
    failures: RefCell<Vec<MockError>>,
}

/// A stand-in function that checks each invocation against the next expected
/// call.
#[derive(Clone)]
pub struct MockFunction {
    state: Rc<MockState>,
    handle: Function,
}

impl MockFunction {
    pub fn new(name: impl Into<String>, def: MockDef) -> Self {
        let state = Rc::new(MockState {
            name: name.into(),
            def,
            cursor: Cell::new(0),
            failures: RefCell::new(Vec::new()),
        });
        let handle = Function::new(Invoker(state.clone()));
        Self { state, handle }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// The callable handle substituted into case inputs.
    pub fn function(&self) -> Function {
        self.handle.clone()
    }

    /// Number of invocations so far.
    pub fn calls_made(&self) -> usize {
        self.state.cursor.get()
    }

    /// Verifies the mock after the case body. Reports recorded failures first,
    /// then under-invocation.
    pub fn finalize(&self) -> Result<(), MockError> {
        if let Some(failure) = self.state.failures.borrow().first() {
            return Err(failure.clone());
        }
        let called = self.state.cursor.get();
        let expected = self.state.def.calls.len();
        if called != expected {
            return Err(MockError::CallCount {
                mock: self.state.name.clone(),
                called,
                expected,
            });
        }
        Ok(())
    }

    /// Rewinds the cursor and forgets recorded failures.
    pub fn reset(&self) {
        self.state.cursor.set(0);
        self.state.failures.borrow_mut().clear();
    }
}

struct Invoker(Rc<MockState>);

impl Callable for Invoker {
    fn call(&self, args: &[Value]) -> Result<Value, Thrown> {
        let state = &self.0;
        let index = state.cursor.get();
        state.cursor.set(index + 1);

        let Some(expected) = state.def.calls.get(index) else {
            return Err(record(
                state,
                MockError::CallCount {
                    mock: state.name.clone(),
                    called: index + 1,
                    expected: state.def.calls.len(),
                },
            ));
        };

        if !all_equal(&expected.input_args, args) {
            return Err(record(
                state,
                MockError::ArgumentMismatch {
                    mock: state.name.clone(),
                    call: index + 1,
                    expected: format_args(&expected.input_args),
                    actual: format_args(args),
                },
            ));
        }

        debug!(mock = %state.name, call = index + 1, "mock invoked");
        if let Some(message) = &expected.expected_throw {
            return Err(Thrown::new(message.clone()));
        }
        Ok(expected.expected_output.clone().unwrap_or_default())
    }

    fn name(&self) -> &str {
        &self.0.name
    }
}

fn record(state: &MockState, error: MockError) -> Thrown {
    let thrown = Thrown::new(error.to_string());
    state.failures.borrow_mut().push(error);
    thrown
}

/// The mock functions of one running case.
#[derive(Default)]
pub struct MockSet {
    functions: Vec<MockFunction>,
}

impl MockSet {
    /// Builds fresh mock functions for every resolved definition.
    pub fn build(resolved: &MockMap) -> Self {
        let functions = resolved
            .iter()
            .map(|(name, def)| MockFunction::new(name.clone(), def.clone()))
            .collect();
        Self { functions }
    }

    pub fn get(&self, name: &str) -> Option<&MockFunction> {
        self.functions.iter().find(|m| m.name() == name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Finalizes every mock, collecting all violations.
    pub fn finalize(&self) -> Vec<MockError> {
        self.functions
            .iter()
            .filter_map(|m| m.finalize().err())
            .collect()
    }

    /// Drops all mock state at case teardown.
    pub fn clear(&mut self) {
        for function in &self.functions {
            function.reset();
        }
        self.functions.clear();
    }
}
