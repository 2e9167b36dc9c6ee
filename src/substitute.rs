//! Replacement of `$mock:<name>` sentinels with live mock functions.

use crate::errors::MockError;
use crate::mock::MockSet;
use crate::value::Value;

/// Prefix of a mock reference string.
pub const MOCK_SENTINEL: &str = "$mock:";

/// Returns the referenced mock name when `s` is exactly a mock sentinel.
pub fn mock_reference(s: &str) -> Option<&str> {
    s.strip_prefix(MOCK_SENTINEL).filter(|name| !name.is_empty())
}

/// Rewrites every sentinel in `value`, preserving shape.
pub fn substitute(value: &Value, mocks: &MockSet) -> Result<Value, MockError> {
    match value {
        Value::String(s) => match mock_reference(s) {
            Some(name) => mocks
                .get(name)
                .map(|mock| Value::Function(mock.function()))
                .ok_or_else(|| MockError::UndefinedReference {
                    name: name.to_string(),
                }),
            None => Ok(value.clone()),
        },
        Value::List(items) => substitute_all(items, mocks).map(Value::List),
        Value::Map(map) => {
            let mut out = map.clone();
            for (key, item) in map.iter() {
                out.insert(key.clone(), substitute(item, mocks)?);
            }
            Ok(Value::Map(out))
        }
        _ => Ok(value.clone()),
    }
}

/// Substitutes each element of an argument list.
pub fn substitute_all(values: &[Value], mocks: &MockSet) -> Result<Vec<Value>, MockError> {
    values.iter().map(|v| substitute(v, mocks)).collect()
}
