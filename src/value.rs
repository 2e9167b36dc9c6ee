//! The value model shared by documents, mocks and the unit under test.
//!
//! Document content arrives as YAML and is converted into [`Value`], a closed
//! enum. Two variants carry live handles rather than data: [`Value::Function`]
//! (a mock or a native function) and [`Value::Object`] (an instance of a class
//! under test).

use std::fmt;
use std::rc::Rc;

use im::OrdMap;
use serde_yaml::Value as Yaml;
use thiserror::Error;

use crate::object::ObjectRef;

/// Ordered key/value map used for `Value::Map`.
pub type ValueMap = OrdMap<String, Value>;

/// Represents a value flowing through a test case.
///
/// # Examples
///
/// ```rust
/// use tabula::value::Value;
/// let n = Value::Number(3.0);
/// assert_eq!(n.type_name(), "Number");
/// assert!(Value::default().is_undefined());
/// ```
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(ValueMap),
    Function(Function),
    Object(ObjectRef),
}

impl Value {
    /// Returns the type name of the value as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "Undefined",
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Function(_) => "Function",
            Value::Object(_) => "Object",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// True for both `Undefined` and `Null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Builds a map value from `(key, value)` pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Multi-line rendering used when diffing expected and actual values.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        write_pretty(self, 0, &mut out);
        out
    }

    /// Converts back into YAML. Live handles become placeholder strings.
    pub fn to_yaml(&self) -> Yaml {
        match self {
            Value::Undefined | Value::Null => Yaml::Null,
            Value::Bool(b) => Yaml::Bool(*b),
            Value::Number(n) => number_to_yaml(*n),
            Value::String(s) => Yaml::String(s.clone()),
            Value::List(items) => Yaml::Sequence(items.iter().map(Value::to_yaml).collect()),
            Value::Map(map) => Yaml::Mapping(
                map.iter()
                    .map(|(k, v)| (Yaml::String(k.clone()), v.to_yaml()))
                    .collect(),
            ),
            Value::Function(_) | Value::Object(_) => Yaml::String(self.to_string()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        crate::compare::deep_equal(self, other)
    }
}

impl From<&Yaml> for Value {
    fn from(yaml: &Yaml) -> Self {
        match yaml {
            Yaml::Null => Value::Null,
            Yaml::Bool(b) => Value::Bool(*b),
            Yaml::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Yaml::String(s) => Value::String(s.clone()),
            Yaml::Sequence(items) => Value::List(items.iter().map(Value::from).collect()),
            Yaml::Mapping(mapping) => Value::Map(
                mapping
                    .iter()
                    .map(|(k, v)| (yaml_key(k), Value::from(v)))
                    .collect(),
            ),
            Yaml::Tagged(tagged) => Value::from(&tagged.value),
        }
    }
}

impl From<Yaml> for Value {
    fn from(yaml: Yaml) -> Self {
        Value::from(&yaml)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Function(func) => write!(f, "[Function {}]", func.name()),
            Value::Object(obj) => write!(f, "[Object {}]", obj.class_name()),
        }
    }
}

/// Renders a list of call arguments as `(a, b, c)`.
pub fn format_args(args: &[Value]) -> String {
    let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
    format!("({})", rendered.join(", "))
}

// ============================================================================
// CALLABLE HANDLES
// ============================================================================

/// The failure raised by an invoked function or method.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Thrown {
    pub message: String,
}

impl Thrown {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Anything that can be invoked with an ordered argument list.
pub trait Callable {
    fn call(&self, args: &[Value]) -> Result<Value, Thrown>;

    fn name(&self) -> &str {
        "anonymous"
    }
}

struct NativeFn<F> {
    name: String,
    func: F,
}

impl<F> Callable for NativeFn<F>
where
    F: Fn(&[Value]) -> Result<Value, Thrown>,
{
    fn call(&self, args: &[Value]) -> Result<Value, Thrown> {
        (self.func)(args)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A shared handle to a [`Callable`]. Clones refer to the same function.
#[derive(Clone)]
pub struct Function(Rc<dyn Callable>);

impl Function {
    pub fn new(callable: impl Callable + 'static) -> Self {
        Self(Rc::new(callable))
    }

    /// Wraps a closure as a named function.
    pub fn native<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Thrown> + 'static,
    {
        Self::new(NativeFn {
            name: name.into(),
            func,
        })
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, Thrown> {
        self.0.call(args)
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name())
    }
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn yaml_key(key: &Yaml) -> String {
    match key {
        Yaml::String(s) => s.clone(),
        Yaml::Null => "null".to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn number_to_yaml(n: f64) -> Yaml {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        Yaml::Number((n as i64).into())
    } else {
        Yaml::Number(n.into())
    }
}

fn write_pretty(value: &Value, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    match value {
        Value::List(items) if !items.is_empty() => {
            out.push_str("[\n");
            for item in items {
                out.push_str(&pad);
                out.push_str("  ");
                write_pretty(item, indent + 1, out);
                out.push_str(",\n");
            }
            out.push_str(&pad);
            out.push(']');
        }
        Value::Map(map) if !map.is_empty() => {
            out.push_str("{\n");
            for (k, v) in map.iter() {
                out.push_str(&pad);
                out.push_str("  ");
                out.push_str(k);
                out.push_str(": ");
                write_pretty(v, indent + 1, out);
                out.push_str(",\n");
            }
            out.push_str(&pad);
            out.push('}');
        }
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_conversion_keeps_shape() {
        let yaml: Yaml = serde_yaml::from_str("{a: [1, two, null], 3: true}").unwrap();
        let value = Value::from(&yaml);
        let expected = Value::map([
            (
                "a",
                Value::List(vec![Value::from(1), Value::from("two"), Value::Null]),
            ),
            ("3", Value::Bool(true)),
        ]);
        assert_eq!(value, expected);
    }

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(3.0).to_yaml(), Yaml::Number(3.into()));
    }

    #[test]
    fn display_renders_nested_values() {
        let value = Value::List(vec![Value::from("x"), Value::map([("k", Value::Null)])]);
        assert_eq!(value.to_string(), "[\"x\", {k: null}]");
        assert_eq!(format_args(&[Value::from(1), Value::Undefined]), "(1, undefined)");
    }

    #[test]
    fn native_function_handles_compare_by_identity() {
        let f = Function::native("id", |args| Ok(args.first().cloned().unwrap_or_default()));
        let g = f.clone();
        assert!(f.ptr_eq(&g));
        assert_eq!(f.call(&[Value::from(7)]).unwrap(), Value::from(7));
        assert_eq!(Value::Function(f).to_string(), "[Function id]");
    }
}
