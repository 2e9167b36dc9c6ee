//! Live instance handles for class-mode suites.
//!
//! The driver never reflects on concrete types. It sees instances only
//! through the [`Object`] trait and constructs them through [`Class`].
//! [`NativeObject`] and [`NativeClass`] are a property-map implementation
//! for hosts that register plain Rust functions as methods.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::value::{Callable, Function, Thrown, Value, ValueMap};

/// Capability interface of a live instance.
pub trait Object {
    fn class_name(&self) -> &str;

    /// Reads a data member. Methods are reported through [`Object::has_method`].
    fn property(&self, name: &str) -> Option<Value>;

    fn has_method(&self, name: &str) -> bool;

    fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, Thrown>;
}

/// Something that can produce fresh instances.
pub trait Class {
    fn name(&self) -> &str;

    fn construct(&self, args: &[Value]) -> Result<ObjectRef, Thrown>;
}

/// A shared handle to an [`Object`].
#[derive(Clone)]
pub struct ObjectRef(Rc<dyn Object>);

impl ObjectRef {
    pub fn new(object: impl Object + 'static) -> Self {
        Self(Rc::new(object))
    }

    pub fn class_name(&self) -> &str {
        self.0.class_name()
    }

    /// Reads `name`, binding methods to this instance.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.0.property(name) {
            return Some(value);
        }
        if self.0.has_method(name) {
            return Some(Value::Function(Function::new(BoundMethod {
                target: self.clone(),
                method: name.to_string(),
            })));
        }
        None
    }

    pub fn property(&self, name: &str) -> Option<Value> {
        self.0.property(name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.0.has_method(name)
    }

    pub fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, Thrown> {
        self.0.call_method(name, args)
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.class_name())
    }
}

struct BoundMethod {
    target: ObjectRef,
    method: String,
}

impl Callable for BoundMethod {
    fn call(&self, args: &[Value]) -> Result<Value, Thrown> {
        self.target.call_method(&self.method, args)
    }

    fn name(&self) -> &str {
        &self.method
    }
}

// ============================================================================
// NATIVE IMPLEMENTATION
// ============================================================================

/// Method signature for [`NativeClass`] methods.
pub type NativeMethod = fn(this: &NativeObject, args: &[Value]) -> Result<Value, Thrown>;

/// Initializer run by [`NativeClass::construct`] on a blank instance.
pub type NativeInit = fn(this: &NativeObject, args: &[Value]) -> Result<(), Thrown>;

/// An instance whose data members live in an interior-mutable map.
pub struct NativeObject {
    class: String,
    fields: RefCell<ValueMap>,
    methods: Rc<HashMap<String, NativeMethod>>,
}

impl NativeObject {
    pub fn get(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }

    /// Reads a numeric field, treating absent or non-numeric as zero.
    pub fn number(&self, name: &str) -> f64 {
        self.get(name).and_then(|v| v.as_number()).unwrap_or(0.0)
    }
}

impl Object for NativeObject {
    fn class_name(&self) -> &str {
        &self.class
    }

    fn property(&self, name: &str) -> Option<Value> {
        self.get(name)
    }

    fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, Thrown> {
        let method = self
            .methods
            .get(name)
            .ok_or_else(|| Thrown::new(format!("{}.{} is not a function", self.class, name)))?;
        method(self, args)
    }
}

/// A class assembled from an initializer and a method table.
#[derive(Clone)]
pub struct NativeClass {
    name: String,
    init: NativeInit,
    methods: HashMap<String, NativeMethod>,
}

impl NativeClass {
    pub fn new(name: impl Into<String>, init: NativeInit) -> Self {
        Self {
            name: name.into(),
            init,
            methods: HashMap::new(),
        }
    }

    pub fn method(mut self, name: &str, method: NativeMethod) -> Self {
        self.methods.insert(name.to_string(), method);
        self
    }
}

impl Class for NativeClass {
    fn name(&self) -> &str {
        &self.name
    }

    fn construct(&self, args: &[Value]) -> Result<ObjectRef, Thrown> {
        let object = NativeObject {
            class: self.name.clone(),
            fields: RefCell::new(ValueMap::new()),
            methods: Rc::new(self.methods.clone()),
        };
        (self.init)(&object, args)?;
        Ok(ObjectRef::new(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> NativeClass {
        NativeClass::new("Counter", |this, args| {
            this.set("count", args.first().cloned().unwrap_or(Value::Number(0.0)));
            Ok(())
        })
        .method("increment", |this, _| {
            let next = this.number("count") + 1.0;
            this.set("count", Value::Number(next));
            Ok(Value::Number(next))
        })
    }

    #[test]
    fn methods_mutate_instance_fields() {
        let instance = counter().construct(&[Value::from(5)]).unwrap();
        assert_eq!(instance.call_method("increment", &[]).unwrap(), Value::from(6));
        assert_eq!(instance.property("count"), Some(Value::from(6)));
    }

    #[test]
    fn reading_a_method_yields_a_bound_function() {
        let instance = counter().construct(&[]).unwrap();
        let Some(Value::Function(f)) = instance.get("increment") else {
            panic!("expected bound method");
        };
        f.call(&[]).unwrap();
        assert_eq!(instance.property("count"), Some(Value::from(1)));
    }
}
