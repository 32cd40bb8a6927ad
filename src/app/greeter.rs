use crate::core::facade::{Filter, FilterLookup, FILTER};
use crate::core::module::Module;
use crate::core::registry::Container;
use crate::core::{Key, Param, Provider};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

pub const APP_MODULE: &str = "greeter";

pub const GREETING: Key<Greeting> = Key::new("greeting");
pub const GREETER: Key<Greeter> = Key::new("greeter");

/// Configured during the config phase, then builds the run-phase `greeting`.
pub struct GreetingProvider {
    lang: RefCell<String>,
}

impl GreetingProvider {
    pub fn new() -> Self {
        Self {
            lang: RefCell::new("en".to_string()),
        }
    }

    pub fn set_language(&self, lang: &str) {
        *self.lang.borrow_mut() = lang.to_string();
    }

    pub fn language(&self) -> String {
        self.lang.borrow().clone()
    }
}

impl Default for GreetingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for GreetingProvider {
    fn get(&self) -> Param {
        let lang = self.language();
        Param::new().func(move |_| Greeting { lang: lang.clone() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    lang: String,
}

impl Greeting {
    pub fn language(&self) -> &str {
        &self.lang
    }

    pub fn salutation(&self) -> &'static str {
        match self.lang.as_str() {
            "cs" => "Ahoj",
            "de" => "Hallo",
            "es" => "Hola",
            _ => "Hello",
        }
    }
}

pub struct Greeter {
    greeting: Option<Rc<Greeting>>,
    filters: Option<Rc<FilterLookup>>,
    greeted: RefCell<Vec<String>>,
}

impl Greeter {
    pub fn new(greeting: Option<Rc<Greeting>>, filters: Option<Rc<FilterLookup>>) -> Self {
        Self {
            greeting,
            filters,
            greeted: RefCell::new(Vec::new()),
        }
    }

    pub fn greet(&self, name: &str) -> String {
        let salutation = self
            .greeting
            .as_ref()
            .map_or("Hello", |g| g.salutation());

        let name = match &self.filters {
            Some(filters) => match filters.get("shout").apply(&Value::from(name), &[]) {
                Value::String(shouted) => shouted,
                other => other.to_string(),
            },
            None => name.to_string(),
        };

        let line = format!("{}, {}", salutation, name);
        self.greeted.borrow_mut().push(line.clone());
        line
    }

    pub fn greeted(&self) -> Vec<String> {
        self.greeted.borrow().clone()
    }
}

fn shout(input: &Value, _: &[Value]) -> Value {
    match input {
        Value::String(s) => Value::String(format!("{}!", s.to_uppercase())),
        other => other.clone(),
    }
}

/// Registers the demo module: provider, config action, filter, service and a run action
/// greeting everyone in `audience`.
pub fn register(container: &Container, lang: &str, audience: &[&str]) -> Module {
    let lang = lang.to_string();
    let audience: Vec<String> = audience.iter().map(|name| name.to_string()).collect();
    let app = container.module(APP_MODULE, &["core"]);

    app.provider(
        GREETING.name(),
        Param::new().provider(|_| GreetingProvider::new()),
    )
    .config(
        Param::inject(["greetingProvider"]).func(move |args| {
            if let Some(provider) = args.get::<GreetingProvider>(0) {
                provider.set_language(&lang);
            }
        }),
    )
    .filter("shout", Param::new().func(|_| Filter::new(shout)))
    .service(
        GREETER.name(),
        Param::inject([GREETING.name(), FILTER.name()])
            .func(|args| Greeter::new(args.get::<Greeting>(0), args.get::<FilterLookup>(1))),
    )
    .constant("audience", audience)
    .run(
        Param::inject([GREETER.name(), "audience"]).func(|args| {
            let (Some(greeter), Some(audience)) =
                (args.get::<Greeter>(0), args.get::<Vec<String>>(1))
            else {
                return;
            };

            for name in audience.iter() {
                let line = greeter.greet(name);
                tracing::info!("👋 {}", line);
            }
        }),
    );

    app
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_module_greets_in_configured_language() {
        let container = Container::new();
        register(&container, "cs", &["svete"]);

        let report = container.bootstrap().unwrap();
        assert_eq!(report.configs_run, 1);
        assert_eq!(report.runs_run, 1);
        assert!(report.diagnostics.is_empty());

        let greeter = container.get(&GREETER).unwrap();
        assert_eq!(greeter.greeted(), vec!["Ahoj, SVETE!"]);

        let greeting = container.get(&GREETING).unwrap();
        assert_eq!(greeting.language(), "cs");
    }

    #[test]
    fn test_greeter_without_dependencies() {
        let greeter = Greeter::new(None, None);
        assert_eq!(greeter.greet("you"), "Hello, you");
    }
}
