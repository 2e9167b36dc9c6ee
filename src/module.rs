//! The module boundary: where the unit under test comes from.
//!
//! Loading code dynamically is the host's concern. The driver only asks a
//! [`ModuleLoader`] for the module at a resolved path and looks up exports by
//! name. [`ModuleRegistry`] is the in-memory loader hosts register into.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use crate::errors::SetupError;
use crate::object::Class;
use crate::value::{Function, Thrown, Value};

/// Name of the export used when a suite names none.
pub const DEFAULT_EXPORT: &str = "default";

/// A named export of a module.
#[derive(Clone)]
pub enum Export {
    Function(Function),
    Class(Rc<dyn Class>),
}

impl Export {
    pub fn kind(&self) -> &'static str {
        match self {
            Export::Function(_) => "function",
            Export::Class(_) => "class",
        }
    }
}

/// The exports of one module.
#[derive(Clone, Default)]
pub struct Module {
    exports: HashMap<String, Export>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function export built from a closure.
    pub fn function<F>(mut self, name: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Thrown> + 'static,
    {
        self.exports
            .insert(name.to_string(), Export::Function(Function::native(name, func)));
        self
    }

    pub fn class(mut self, name: &str, class: impl Class + 'static) -> Self {
        self.exports
            .insert(name.to_string(), Export::Class(Rc::new(class)));
        self
    }

    pub fn export(mut self, name: &str, export: Export) -> Self {
        self.exports.insert(name.to_string(), export);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }
}

/// Resolves a module path to its exports.
pub trait ModuleLoader {
    fn load(&self, path: &Path) -> Result<Module, SetupError>;
}

/// In-memory loader keyed by normalized absolute path.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<PathBuf, Module>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: impl AsRef<Path>, module: Module) {
        self.modules.insert(normalize_path(path.as_ref()), module);
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleLoader for ModuleRegistry {
    fn load(&self, path: &Path) -> Result<Module, SetupError> {
        let key = normalize_path(path);
        self.modules
            .get(&key)
            .cloned()
            .ok_or(SetupError::ModuleNotFound { path: key })
    }
}

/// Resolves a header's target path against the description file's directory.
pub fn target_path(source: &Path, file_path: &str) -> PathBuf {
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    normalize_path(&dir.join(file_path))
}

/// Removes `.` and resolvable `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
