//! The built-in `core` module and the helpers it exposes to other registrations.

use crate::core::module::{filter_name, parse_param, Module};
use crate::core::registry::{Container, Phase, Registry};
use crate::domain::model::{Args, Dep, Factory, Invocation, Key, Param, Resolved};
use serde::Serialize;
use serde_json::Value;
use std::rc::{Rc, Weak};

pub const CORE_MODULE: &str = "core";

pub const DI: Key<Di> = Key::new("$di");
pub const FILTER: Key<FilterLookup> = Key::new("$filter");

/// Injectable helper for code that needs to resolve things on demand.
#[derive(Clone)]
pub struct Di {
    registry: Weak<Registry>,
}

impl Di {
    pub fn parse_param(&self, param: &Param) -> Invocation {
        parse_param(param)
    }

    pub fn filter_name(&self, name: &str) -> Option<String> {
        filter_name(name)
    }

    /// Resolves `invocation.inject` and calls the function as a run action.
    ///
    /// A missing function acts as a no-op. Yields `None` once the container is gone.
    pub fn run(&self, invocation: Invocation) -> Resolved {
        let registry = self.registry.upgrade()?;
        registry.invoke(invocation, Phase::Run).ok().flatten()
    }
}

pub type FilterFn = Rc<dyn Fn(&Value, &[Value]) -> Value>;

/// A named value transformation, registered with [`Module::filter`].
#[derive(Clone)]
pub struct Filter {
    apply: FilterFn,
}

impl Filter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Value + 'static,
    {
        Self { apply: Rc::new(f) }
    }

    /// Falsy input becomes `""`, anything else passes through.
    pub fn empty() -> Self {
        Self::new(|input, _| {
            if is_falsy(input) {
                Value::String(String::new())
            } else {
                input.clone()
            }
        })
    }

    pub fn apply(&self, input: &Value, args: &[Value]) -> Value {
        (self.apply)(input, args)
    }
}

/// The `$filter` object: finds filters by their plain name.
pub struct FilterLookup {
    di: Option<Rc<Di>>,
}

impl FilterLookup {
    /// Returns the filter registered as `name`, or [`Filter::empty`].
    pub fn get(&self, name: &str) -> Filter {
        let Some(di) = &self.di else {
            return Filter::empty();
        };
        let Some(key) = di.filter_name(name) else {
            return Filter::empty();
        };

        let passthrough = Factory::raw(|args: &Args| args.raw(0).cloned());
        di.run(Invocation::new(Some(passthrough), vec![Dep::Name(key)]))
        .and_then(|value| value.downcast::<Filter>().ok())
        .map(|filter| (*filter).clone())
        .unwrap_or_else(Filter::empty)
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn lowercase(input: &Value, _: &[Value]) -> Value {
    match input {
        Value::String(s) => Value::String(s.to_lowercase()),
        other => other.clone(),
    }
}

fn uppercase(input: &Value, _: &[Value]) -> Value {
    match input {
        Value::String(s) => Value::String(s.to_uppercase()),
        other => other.clone(),
    }
}

/// Serialises objects, arrays and null; the optional first argument is the indent width.
fn json(input: &Value, args: &[Value]) -> Value {
    match input {
        Value::Object(_) | Value::Array(_) | Value::Null => {
            let spacing = args.first().and_then(|arg| match arg {
                Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
                Value::String(s) => s.trim().parse::<usize>().ok(),
                _ => None,
            });
            Value::String(to_json(input, spacing))
        }
        other => other.clone(),
    }
}

fn to_json(value: &Value, spacing: Option<usize>) -> String {
    let width = match spacing {
        Some(width) if width > 0 => width.min(10),
        _ => return value.to_string(),
    };

    let indent = " ".repeat(width);
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);

    match value.serialize(&mut serializer) {
        Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

/// Registers the `core` module the same way application code registers its own.
pub(crate) fn register_core(container: &Container) -> Module {
    let registry = Rc::downgrade(&container.registry);
    let core = container.module(CORE_MODULE, &[]);

    core.factory(
        DI.name(),
        Param::new().func(move |_| Di {
            registry: registry.clone(),
        }),
    )
    .factory(
        FILTER.name(),
        Param::inject([DI.name()]).func(|args| FilterLookup {
            di: args.get::<Di>(0),
        }),
    )
    .filter("lowercase", Param::new().func(|_| Filter::new(lowercase)))
    .filter("uppercase", Param::new().func(|_| Filter::new(uppercase)))
    .filter("json", Param::new().func(|_| Filter::new(json)));

    core
}

impl Container {
    /// The built-in `core` module; usable for chaining registrations like any other module.
    pub fn root(&self) -> Module {
        self.get_module(CORE_MODULE)
            .unwrap_or_else(|| register_core(self))
    }

    /// A `$di` helper bound to this container.
    pub fn di(&self) -> Di {
        Di {
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn filters(&self) -> Option<Rc<FilterLookup>> {
        self.get(&FILTER)
    }

    /// Logs and returns the crate name and version.
    pub fn info() -> String {
        let info = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        tracing::info!("{}", info);
        info
    }

    /// The function used wherever a registration has none.
    pub fn noop(_: &Args) -> Resolved {
        None
    }
}
