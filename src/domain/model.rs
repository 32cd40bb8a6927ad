use crate::domain::ports::Provider;
use serde::Serialize;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// A resolved object. Values are shared, never copied.
pub type Instance = Rc<dyn Any>;

/// Outcome of resolving one name; `None` stands in for a missing or failed dependency.
pub type Resolved = Option<Instance>;

pub type FactoryFn = Rc<dyn Fn(&Args) -> Resolved>;
pub type ProviderCtor = Rc<dyn Fn(&Args) -> ProviderInstance>;

pub type DescriptorRef = Rc<RefCell<Descriptor>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Provider,
    Service,
    Factory,
    Constant,
    Value,
    Filter,
    Config,
    Run,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ObjectKind::Provider => "provider",
            ObjectKind::Service => "service",
            ObjectKind::Factory => "factory",
            ObjectKind::Constant => "constant",
            ObjectKind::Value => "value",
            ObjectKind::Filter => "filter",
            ObjectKind::Config => "config",
            ObjectKind::Run => "run",
        };
        f.write_str(label)
    }
}

/// A constructed provider: the value handed to config code plus the handle
/// used later to build the run-phase object.
#[derive(Clone)]
pub struct ProviderInstance {
    pub value: Instance,
    pub handle: Rc<dyn Provider>,
}

impl ProviderInstance {
    pub fn new<P: Provider + 'static>(provider: P) -> Self {
        let provider = Rc::new(provider);
        Self {
            value: provider.clone() as Instance,
            handle: provider,
        }
    }
}

#[derive(Clone)]
pub enum Factory {
    /// Invoked with the resolved dependencies; used by every kind except providers.
    Call(FactoryFn),
    /// Builds a provider instance.
    Construct(ProviderCtor),
}

impl Factory {
    pub fn call<F, T>(f: F) -> Self
    where
        F: Fn(&Args) -> T + 'static,
        T: 'static,
    {
        Factory::Call(Rc::new(move |args: &Args| Some(Rc::new(f(args)) as Instance)))
    }

    pub fn raw<F>(f: F) -> Self
    where
        F: Fn(&Args) -> Resolved + 'static,
    {
        Factory::Call(Rc::new(f))
    }

    pub fn construct<F, P>(ctor: F) -> Self
    where
        F: Fn(&Args) -> P + 'static,
        P: Provider + 'static,
    {
        Factory::Construct(Rc::new(move |args: &Args| ProviderInstance::new(ctor(args))))
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factory::Call(_) => f.write_str("Factory::Call"),
            Factory::Construct(_) => f.write_str("Factory::Construct"),
        }
    }
}

/// One injected item: a name to look up, or a literal passed through as-is.
#[derive(Clone)]
pub enum Dep {
    Name(String),
    Literal(Instance),
}

impl Dep {
    pub fn literal<T: 'static>(value: T) -> Self {
        Dep::Literal(Rc::new(value))
    }
}

impl From<&str> for Dep {
    fn from(name: &str) -> Self {
        Dep::Name(name.to_string())
    }
}

impl From<String> for Dep {
    fn from(name: String) -> Self {
        Dep::Name(name)
    }
}

impl<T> From<&Key<T>> for Dep {
    fn from(key: &Key<T>) -> Self {
        Dep::Name(key.name().to_string())
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dep::Name(name) => write!(f, "{:?}", name),
            Dep::Literal(_) => f.write_str("<literal>"),
        }
    }
}

/// Named, typed handle to a registrable object.
pub struct Key<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> Rc<T>>,
}

impl<T> Key<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.name)
    }
}

/// Resolved dependencies, in declaration order.
#[derive(Clone, Default)]
pub struct Args {
    values: Vec<Resolved>,
}

impl Args {
    pub fn new(values: Vec<Resolved>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn raw(&self, index: usize) -> Option<&Instance> {
        self.values.get(index)?.as_ref()
    }

    /// Downcasts the argument at `index`; `None` for null or a different type.
    pub fn get<T: 'static>(&self, index: usize) -> Option<Rc<T>> {
        self.raw(index).cloned()?.downcast::<T>().ok()
    }

    pub fn is_null(&self, index: usize) -> bool {
        self.raw(index).is_none()
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.values
                    .iter()
                    .map(|v| if v.is_some() { "<value>" } else { "null" }),
            )
            .finish()
    }
}

/// One element of a registration parameter list.
#[derive(Clone)]
pub enum ParamItem {
    Dep(String),
    Func(Factory),
}

/// Registration parameter: dependency names followed by one function.
///
/// Only the names before the first function count; anything after it is ignored.
#[derive(Clone, Default)]
pub struct Param {
    items: Vec<ParamItem>,
}

impl Param {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject<I, S>(deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: deps.into_iter().map(|d| ParamItem::Dep(d.into())).collect(),
        }
    }

    pub fn from_items(items: Vec<ParamItem>) -> Self {
        Self { items }
    }

    pub fn dep(mut self, name: impl Into<String>) -> Self {
        self.items.push(ParamItem::Dep(name.into()));
        self
    }

    /// Appends a function whose return value becomes the object.
    pub fn func<F, T>(mut self, f: F) -> Self
    where
        F: Fn(&Args) -> T + 'static,
        T: 'static,
    {
        self.items.push(ParamItem::Func(Factory::call(f)));
        self
    }

    /// Appends a function that returns an already shared value (or null).
    pub fn raw<F>(mut self, f: F) -> Self
    where
        F: Fn(&Args) -> Resolved + 'static,
    {
        self.items.push(ParamItem::Func(Factory::raw(f)));
        self
    }

    /// Appends a provider constructor.
    pub fn provider<F, P>(mut self, ctor: F) -> Self
    where
        F: Fn(&Args) -> P + 'static,
        P: Provider + 'static,
    {
        self.items.push(ParamItem::Func(Factory::construct(ctor)));
        self
    }

    pub fn items(&self) -> &[ParamItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A parsed parameter: the function plus what to inject into it.
#[derive(Clone, Default, Debug)]
pub struct Invocation {
    pub factory: Option<Factory>,
    pub inject: Vec<Dep>,
}

impl Invocation {
    pub fn new(factory: Option<Factory>, inject: Vec<Dep>) -> Self {
        Self { factory, inject }
    }
}

/// How a descriptor obtains its function.
///
/// Provider-backed objects start `Unresolved` and move to `Resolved` exactly once,
/// after the provider's get-factory method has been read.
#[derive(Clone, Debug)]
pub enum Recipe {
    Unresolved { provider: DescriptorRef },
    Resolved {
        factory: Option<Factory>,
        inject: Vec<Dep>,
    },
}

pub struct Descriptor {
    name: Option<String>,
    kind: ObjectKind,
    recipe: Recipe,
    cache: Option<Instance>,
    provider: Option<Rc<dyn Provider>>,
}

impl Descriptor {
    pub fn new(name: impl Into<String>, kind: ObjectKind, invocation: Invocation) -> Self {
        Self {
            name: Some(name.into()),
            kind,
            recipe: Recipe::Resolved {
                factory: invocation.factory,
                inject: invocation.inject,
            },
            cache: None,
            provider: None,
        }
    }

    pub fn cached(name: impl Into<String>, kind: ObjectKind, value: Instance) -> Self {
        Self {
            name: Some(name.into()),
            kind,
            recipe: Recipe::Resolved {
                factory: None,
                inject: Vec::new(),
            },
            cache: Some(value),
            provider: None,
        }
    }

    pub fn linked(name: impl Into<String>, provider: DescriptorRef) -> Self {
        Self {
            name: Some(name.into()),
            kind: ObjectKind::Factory,
            recipe: Recipe::Unresolved { provider },
            cache: None,
            provider: None,
        }
    }

    /// Anonymous config/run action.
    pub fn action(kind: ObjectKind, invocation: Invocation) -> Self {
        Self {
            name: None,
            kind,
            recipe: Recipe::Resolved {
                factory: invocation.factory,
                inject: invocation.inject,
            },
            cache: None,
            provider: None,
        }
    }

    pub fn into_ref(self) -> DescriptorRef {
        Rc::new(RefCell::new(self))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("<{}>", self.kind),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn provider_link(&self) -> Option<DescriptorRef> {
        match &self.recipe {
            Recipe::Unresolved { provider } => Some(provider.clone()),
            Recipe::Resolved { .. } => None,
        }
    }

    /// Replaces the provider link with the provider's factory. No-op once resolved.
    pub fn link_provider(&mut self, invocation: Invocation) -> bool {
        match self.recipe {
            Recipe::Unresolved { .. } => {
                self.recipe = Recipe::Resolved {
                    factory: invocation.factory,
                    inject: invocation.inject,
                };
                true
            }
            Recipe::Resolved { .. } => false,
        }
    }

    pub fn factory(&self) -> Option<Factory> {
        match &self.recipe {
            Recipe::Resolved { factory, .. } => factory.clone(),
            Recipe::Unresolved { .. } => None,
        }
    }

    pub fn inject(&self) -> Vec<Dep> {
        match &self.recipe {
            Recipe::Resolved { inject, .. } => inject.clone(),
            Recipe::Unresolved { .. } => Vec::new(),
        }
    }

    pub fn cache(&self) -> Option<Instance> {
        self.cache.clone()
    }

    pub fn set_cache(&mut self, value: Instance) {
        self.cache = Some(value);
    }

    pub fn provider_handle(&self) -> Option<Rc<dyn Provider>> {
        self.provider.clone()
    }

    pub fn set_provider_handle(&mut self, handle: Rc<dyn Provider>) {
        self.provider = Some(handle);
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("recipe", &self.recipe)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Provider for Noop {
        fn get(&self) -> Param {
            Param::new()
        }
    }

    #[test]
    fn test_args_downcast() {
        let args = Args::new(vec![Some(Rc::new(5u32) as Instance), None]);
        assert_eq!(args.get::<u32>(0).as_deref(), Some(&5));
        assert!(args.get::<String>(0).is_none());
        assert!(args.is_null(1));
        assert!(args.is_null(7));
    }

    #[test]
    fn test_link_provider_is_one_way() {
        let provider = Descriptor::new(
            "xProvider",
            ObjectKind::Provider,
            Invocation::new(Some(Factory::construct(|_| Noop)), Vec::new()),
        )
        .into_ref();
        let mut descriptor = Descriptor::linked("x", provider.clone());
        let link = descriptor.provider_link().unwrap();
        assert!(Rc::ptr_eq(&link, &provider));

        assert!(descriptor.link_provider(Invocation::new(
            Some(Factory::call(|_| 1u8)),
            vec![Dep::from("a")]
        )));
        assert!(descriptor.provider_link().is_none());
        assert_eq!(descriptor.inject().len(), 1);

        assert!(!descriptor.link_provider(Invocation::default()));
        assert!(descriptor.factory().is_some());
    }

    #[test]
    fn test_provider_instance_shares_value_and_handle() {
        let instance = ProviderInstance::new(Noop);
        assert!(instance.value.downcast_ref::<Noop>().is_some());
        assert!(instance.handle.get().is_empty());
    }
}
