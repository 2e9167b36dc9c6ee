//! Shared fixtures: on-disk description trees and native modules under test.
#![allow(dead_code)]

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tabula::object::{NativeClass, NativeObject};
use tabula::{
    Module, ModuleLoader, ModuleRegistry, RecordingReporter, RunOptions, RunSummary, Runner,
    Thrown, Value,
};
use tempfile::TempDir;

// =============================================================================
// FILESYSTEM FIXTURES
// =============================================================================

/// A temporary directory holding description files.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Writes `text` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, text: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create fixture dir");
        }
        fs::write(&path, text).expect("failed to write fixture");
        path
    }
}

// =============================================================================
// MODULES UNDER TEST
// =============================================================================

fn number(args: &[Value], index: usize) -> Result<f64, Thrown> {
    args.get(index)
        .and_then(Value::as_number)
        .ok_or_else(|| Thrown::new(format!("argument {} must be a number", index)))
}

fn callback(args: &[Value]) -> Result<tabula::Function, Thrown> {
    args.first()
        .and_then(Value::as_function)
        .cloned()
        .ok_or_else(|| Thrown::new("expected a callback"))
}

/// Plain functions: arithmetic, callbacks and a panicking export.
pub fn math_module() -> Module {
    Module::new()
        .function("add", |args| Ok(Value::from(number(args, 0)? + number(args, 1)?)))
        .function("divide", |args| {
            let divisor = number(args, 1)?;
            if divisor == 0.0 {
                return Err(Thrown::new("Division by zero"));
            }
            Ok(Value::from(number(args, 0)? / divisor))
        })
        .function("nothing", |_| Ok(Value::Undefined))
        .function("apply", |args| callback(args)?.call(&args[1..]))
        .function("twice", |args| {
            let f = callback(args)?;
            f.call(&args[1..])?;
            f.call(&args[1..])
        })
        .function("swallow", |args| {
            let _ = callback(args)?.call(&args[1..]);
            Ok(Value::from("ok"))
        })
        .function("explode", |_| -> Result<Value, Thrown> { panic!("boom") })
}

/// A function export that counts its own invocations.
pub fn counting_module() -> (Module, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    let module = Module::new().function("call", move |args| {
        seen.set(seen.get() + 1);
        callback(args)?.call(&args[1..])
    });
    (module, calls)
}

pub fn counter_class() -> NativeClass {
    NativeClass::new("Counter", |this, args| {
        this.set("count", args.first().cloned().unwrap_or(Value::from(0)));
        Ok(())
    })
    .method("increment", |this, _| {
        let next = this.number("count") + 1.0;
        this.set("count", Value::from(next));
        Ok(Value::from(next))
    })
    .method("add", |this, args| {
        let next = this.number("count") + number(args, 0)?;
        this.set("count", Value::from(next));
        Ok(Value::from(next))
    })
    .method("get", |this, _| Ok(this.get("count").unwrap_or_default()))
    .method("fail", |_, _| Err(Thrown::new("Counter is broken")))
}

/// `user.profile` only exists after `login`.
pub fn session_class() -> NativeClass {
    NativeClass::new("Session", |this, args| {
        let name = args.first().cloned().unwrap_or_default();
        this.set("user", Value::map([("name", name)]));
        Ok(())
    })
    .method("greet", |this, _| {
        let name = match this.get("user") {
            Some(Value::Map(map)) => map.get("name").cloned().unwrap_or_default(),
            _ => Value::Undefined,
        };
        Ok(Value::from(format!("Hello, {}", name.as_str().unwrap_or("stranger"))))
    })
    .method("login", |this, _| {
        let user = this.get("user").unwrap_or_default();
        let name = match &user {
            Value::Map(map) => map.get("name").cloned().unwrap_or_default(),
            _ => Value::Undefined,
        };
        let Value::Map(mut map) = user else {
            return Err(Thrown::new("no user"));
        };
        map.insert("profile".to_string(), Value::map([("name", name)]));
        this.set("user", Value::Map(map));
        Ok(Value::from(true))
    })
}

/// Stores a validator callback and consults it on `submit`.
pub fn form_class() -> NativeClass {
    fn submit(this: &NativeObject, args: &[Value]) -> Result<Value, Thrown> {
        let validator = this
            .get("validator")
            .and_then(|v| v.as_function().cloned())
            .ok_or_else(|| Thrown::new("no validator"))?;
        let accepted = validator.call(args)?.as_bool().unwrap_or(false);
        this.set("submitted", Value::from(accepted));
        Ok(Value::from(accepted))
    }

    NativeClass::new("Form", |this, args| {
        this.set("validator", args.first().cloned().unwrap_or_default());
        this.set("submitted", Value::from(false));
        Ok(())
    })
    .method("submit", submit)
}

pub fn objects_module() -> Module {
    Module::new()
        .class("Counter", counter_class())
        .class("Session", session_class())
        .class("Form", form_class())
}

// =============================================================================
// RUN HELPERS
// =============================================================================

/// Registers `module` at `rel` inside the fixture.
pub fn registry(fixture: &Fixture, rel: &str, module: Module) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register(fixture.path(rel), module);
    registry
}

pub fn run(path: &Path, loader: &dyn ModuleLoader) -> (RunSummary, RecordingReporter) {
    run_with(path, loader, RunOptions::default())
}

pub fn run_with(
    path: &Path,
    loader: &dyn ModuleLoader,
    options: RunOptions,
) -> (RunSummary, RecordingReporter) {
    let mut reporter = RecordingReporter::new();
    let summary = Runner::new(loader)
        .with_options(options)
        .run_file(path, &mut reporter);
    (summary, reporter)
}
