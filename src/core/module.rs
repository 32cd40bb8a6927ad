use crate::domain::model::{
    Dep, Descriptor, DescriptorRef, Instance, Invocation, ObjectKind, Param, ParamItem,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Suffix of the config-phase half of a provider registration.
pub const PROVIDER_SUFFIX: &str = "Provider";

/// Prefix under which filters are stored.
pub const FILTER_PREFIX: &str = "$filter";

/// Splits a parameter into its function and the names to inject.
///
/// Names are collected until the first function; items after it are ignored.
/// A list without any function yields no factory at all.
pub fn parse_param(param: &Param) -> Invocation {
    let mut invocation = Invocation::default();

    for item in param.items() {
        match item {
            ParamItem::Dep(name) => invocation.inject.push(Dep::Name(name.clone())),
            ParamItem::Func(factory) => {
                invocation.factory = Some(factory.clone());
                break;
            }
        }
    }

    invocation
}

/// Storage key of a filter: `lowercase` becomes `$filterLowercase`.
///
/// An empty name has no key; `$filter` itself is the lookup object.
pub fn filter_name(name: &str) -> Option<String> {
    let mut chars = name.chars();
    let first = chars.next()?;
    Some(format!(
        "{}{}{}",
        FILTER_PREFIX,
        first.to_uppercase(),
        chars.as_str()
    ))
}

#[derive(Debug, Default)]
struct ModuleData {
    name: String,
    dependencies: Vec<String>,
    objects: HashMap<String, DescriptorRef>,
    configs: Vec<DescriptorRef>,
    runs: Vec<DescriptorRef>,
}

/// A named group of registrations. Cloning yields another handle to the same module.
///
/// Every registration method returns the module so calls can be chained.
/// A registration with an empty name or an empty parameter is silently ignored.
#[derive(Clone, Debug)]
pub struct Module {
    inner: Rc<RefCell<ModuleData>>,
}

impl Module {
    pub(crate) fn new(name: &str, dependencies: &[&str]) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ModuleData {
                name: name.to_string(),
                dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
                ..ModuleData::default()
            })),
        }
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    pub fn dependencies(&self) -> Vec<String> {
        self.inner.borrow().dependencies.clone()
    }

    pub fn object(&self, name: &str) -> Option<DescriptorRef> {
        self.inner.borrow().objects.get(name).cloned()
    }

    /// Registered object keys, sorted.
    pub fn object_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.borrow().objects.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn configs(&self) -> Vec<DescriptorRef> {
        self.inner.borrow().configs.clone()
    }

    pub fn runs(&self) -> Vec<DescriptorRef> {
        self.inner.borrow().runs.clone()
    }

    pub fn ptr_eq(&self, other: &Module) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn insert(&self, key: String, descriptor: Descriptor) -> DescriptorRef {
        let descriptor = descriptor.into_ref();
        self.inner
            .borrow_mut()
            .objects
            .insert(key, descriptor.clone());
        descriptor
    }

    /// Registers `name + "Provider"` (constructed during the config phase) and
    /// `name`, whose factory is taken from the provider's get-factory method on
    /// first resolution.
    pub fn provider(&self, name: &str, param: Param) -> &Self {
        if name.is_empty() || param.is_empty() {
            return self;
        }

        let provider_name = format!("{}{}", name, PROVIDER_SUFFIX);
        let provider = self.insert(
            provider_name.clone(),
            Descriptor::new(provider_name, ObjectKind::Provider, parse_param(&param)),
        );
        self.insert(name.to_string(), Descriptor::linked(name, provider));

        self
    }

    pub fn service(&self, name: &str, param: Param) -> &Self {
        self.register(name, ObjectKind::Service, &param)
    }

    pub fn factory(&self, name: &str, param: Param) -> &Self {
        self.register(name, ObjectKind::Factory, &param)
    }

    /// Registers a value available in both phases.
    pub fn constant<T: 'static>(&self, name: &str, value: T) -> &Self {
        self.cached(name, ObjectKind::Constant, Rc::new(value))
    }

    /// Registers a value available in the run phase only.
    pub fn value<T: 'static>(&self, name: &str, value: T) -> &Self {
        self.cached(name, ObjectKind::Value, Rc::new(value))
    }

    pub fn filter(&self, name: &str, param: Param) -> &Self {
        let Some(key) = filter_name(name) else {
            return self;
        };
        if param.is_empty() {
            return self;
        }

        self.insert(
            key.clone(),
            Descriptor::new(key, ObjectKind::Filter, parse_param(&param)),
        );

        self
    }

    pub fn config(&self, param: Param) -> &Self {
        if param.is_empty() {
            return self;
        }

        let descriptor = Descriptor::action(ObjectKind::Config, parse_param(&param)).into_ref();
        self.inner.borrow_mut().configs.push(descriptor);

        self
    }

    pub fn run(&self, param: Param) -> &Self {
        if param.is_empty() {
            return self;
        }

        let descriptor = Descriptor::action(ObjectKind::Run, parse_param(&param)).into_ref();
        self.inner.borrow_mut().runs.push(descriptor);

        self
    }

    fn register(&self, name: &str, kind: ObjectKind, param: &Param) -> &Self {
        if name.is_empty() || param.is_empty() {
            return self;
        }

        self.insert(name.to_string(), Descriptor::new(name, kind, parse_param(param)));

        self
    }

    fn cached(&self, name: &str, kind: ObjectKind, value: Instance) -> &Self {
        if name.is_empty() {
            return self;
        }

        self.insert(name.to_string(), Descriptor::cached(name, kind, value));

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Args, Recipe};

    #[test]
    fn test_parse_bare_function() {
        let parsed = parse_param(&Param::new().func(|_| 1u8));
        assert!(parsed.factory.is_some());
        assert!(parsed.inject.is_empty());
    }

    #[test]
    fn test_parse_stops_at_first_function() {
        let param = Param::inject(["a", "b"]).func(|_| 1u8).dep("ignored");
        let parsed = parse_param(&param);
        let names: Vec<String> = parsed
            .inject
            .iter()
            .map(|d| format!("{:?}", d))
            .collect();
        assert_eq!(names, vec!["\"a\"", "\"b\""]);
    }

    #[test]
    fn test_parse_function_first_ignores_names() {
        let parsed = parse_param(&Param::new().func(|_| 1u8).dep("a"));
        assert!(parsed.inject.is_empty());
        assert!(parsed.factory.is_some());
    }

    #[test]
    fn test_parse_without_function() {
        let parsed = parse_param(&Param::inject(["a"]));
        assert!(parsed.factory.is_none());
        assert_eq!(parsed.inject.len(), 1);
    }

    #[test]
    fn test_filter_name() {
        assert_eq!(filter_name("lowercase").as_deref(), Some("$filterLowercase"));
        assert_eq!(filter_name("j").as_deref(), Some("$filterJ"));
        assert_eq!(filter_name(""), None);
    }

    #[test]
    fn test_provider_registers_two_descriptors() {
        let module = Module::new("app", &[]);
        module.provider("x", Param::new().provider(|_: &Args| Dummy));

        assert_eq!(module.object_names(), vec!["x", "xProvider"]);
        let provider = module.object("xProvider").unwrap();
        assert_eq!(provider.borrow().kind(), ObjectKind::Provider);

        let linked = module.object("x").unwrap();
        let linked = linked.borrow();
        assert_eq!(linked.kind(), ObjectKind::Factory);
        match linked.recipe() {
            Recipe::Unresolved { provider: link } => assert!(Rc::ptr_eq(link, &provider)),
            Recipe::Resolved { .. } => panic!("provider link should be unresolved"),
        }
    }

    #[test]
    fn test_malformed_registrations_are_ignored() {
        let module = Module::new("app", &[]);
        module
            .factory("", Param::new().func(|_| 1u8))
            .service("empty", Param::new())
            .provider("p", Param::new())
            .filter("", Param::new().func(|_| 1u8))
            .constant("", 5u8)
            .config(Param::new())
            .run(Param::new());

        assert!(module.object_names().is_empty());
        assert!(module.configs().is_empty());
        assert!(module.runs().is_empty());
    }

    #[test]
    fn test_reregistration_overwrites() {
        let module = Module::new("app", &[]);
        module.value("v", 1u8).value("v", 2u8);

        let descriptor = module.object("v").unwrap();
        let cached = descriptor.borrow().cache().unwrap();
        assert_eq!(cached.downcast_ref::<u8>(), Some(&2));
        assert_eq!(module.object_names().len(), 1);
    }

    #[test]
    fn test_filters_use_prefixed_key() {
        let module = Module::new("app", &[]);
        module.filter("shout", Param::new().func(|_| 0u8));
        assert_eq!(module.object_names(), vec!["$filterShout"]);
    }

    #[test]
    fn test_actions_keep_registration_order() {
        let module = Module::new("app", &[]);
        module
            .config(Param::new().func(|_| 1u8))
            .config(Param::inject(["a"]).func(|_| 2u8))
            .run(Param::new().func(|_| 3u8));

        let configs = module.configs();
        assert_eq!(configs.len(), 2);
        assert!(configs[0].borrow().inject().is_empty());
        assert_eq!(configs[1].borrow().inject().len(), 1);
        assert_eq!(module.runs().len(), 1);
    }

    struct Dummy;

    impl crate::domain::ports::Provider for Dummy {
        fn get(&self) -> Param {
            Param::new().func(|_| 0u8)
        }
    }
}
