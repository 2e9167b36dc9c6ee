//! Dot-path property reads and method calls on live values.

use std::fmt;

use crate::errors::{CallError, PathError};
use crate::value::Value;

/// A `.`-separated member path such as `user.profile.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DotPath(pub Vec<String>);

impl DotPath {
    pub fn parse(path: &str) -> Self {
        Self(path.split('.').map(str::to_string).collect())
    }

    fn missing(&self, segment: &str) -> PathError {
        PathError::SegmentMissing {
            segment: segment.to_string(),
            path: self.to_string(),
        }
    }

    /// Walks every segment but the last, returning the parent and the
    /// terminal segment name.
    fn parent<'p>(&'p self, root: &Value) -> Result<(Value, &'p str), PathError> {
        let Some((last, init)) = self.0.split_last() else {
            return Err(self.missing(""));
        };
        if root.is_nullish() {
            return Err(self.missing(self.0.first().unwrap_or(last)));
        }
        let mut current = root.clone();
        for segment in init {
            current = read(&current, segment)
                .filter(|value| !value.is_nullish())
                .ok_or_else(|| self.missing(segment))?;
        }
        Ok((current, last.as_str()))
    }
}

impl fmt::Display for DotPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Reads the value at `path`. An absent terminal member reads as `Undefined`.
pub fn get_property(root: &Value, path: &str) -> Result<Value, PathError> {
    let path = DotPath::parse(path);
    let (parent, last) = path.parent(root)?;
    Ok(read(&parent, last).unwrap_or_default())
}

/// Invokes the member at `path` with `args`.
pub fn call_method(root: &Value, path: &str, args: &[Value]) -> Result<Value, CallError> {
    let path = DotPath::parse(path);
    let (parent, last) = path.parent(root)?;

    if let Value::Object(object) = &parent {
        if object.has_method(last) {
            return Ok(object.call_method(last, args)?);
        }
    }
    match read(&parent, last) {
        Some(Value::Function(function)) => Ok(function.call(args)?),
        Some(other) => Err(PathError::NotCallable {
            segment: last.to_string(),
            path: path.to_string(),
            found: other.type_name(),
        }
        .into()),
        None => Err(path.missing(last).into()),
    }
}

/// Reads one member of `value`.
fn read(value: &Value, segment: &str) -> Option<Value> {
    match value {
        Value::Map(map) => map.get(segment).cloned(),
        Value::Object(object) => object.get(segment),
        Value::List(items) if segment == "length" => Some(Value::Number(items.len() as f64)),
        Value::List(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i).cloned()),
        Value::String(s) if segment == "length" => Some(Value::Number(s.chars().count() as f64)),
        _ => None,
    }
}
