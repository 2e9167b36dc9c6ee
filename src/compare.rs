//! Structural equality over [`Value`] trees.
//!
//! Used for expected-output checks, property assertions and mock argument
//! matching. Sequences compare positionally, maps by key set then value,
//! live handles by identity.

use crate::value::Value;

/// Recursive structural equality.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::List(xs), Value::List(ys)) => all_equal(xs, ys),
        (Value::Map(xs), Value::Map(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| deep_equal(x, y)))
        }
        (Value::Function(f), Value::Function(g)) => f.ptr_eq(g),
        (Value::Object(o), Value::Object(p)) => o.ptr_eq(p),
        _ => false,
    }
}

/// Positional, length-checked comparison of two sequences.
pub fn all_equal(xs: &[Value], ys: &[Value]) -> bool {
    xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equal(x, y))
}
