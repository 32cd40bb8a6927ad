//! The container: every module, the name lookup cache and the recursive resolver.
//!
//! Resolution of one descriptor runs in four steps:
//! - circular check against the chain of names currently being resolved
//! - provider link: construct the provider once and take its get-factory method
//! - dependency resolution, recursing with the chain extended by this name
//! - instantiation according to the kind and the phase
//!
//! Failures never unwind through user code. Each one is logged and recorded;
//! under [`ResolvePolicy::Lenient`] a `None` is substituted, under
//! [`ResolvePolicy::Strict`] the error is returned to the caller.

use crate::config::{ContainerConfig, ResolvePolicy};
use crate::core::facade;
use crate::core::module::{parse_param, Module};
use crate::domain::model::{
    Args, Dep, Descriptor, DescriptorRef, Factory, Instance, Invocation, Key, ObjectKind,
    Resolved,
};
use crate::utils::error::{DiError, Result};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Separator of qualified names: `module::object`.
pub const MODULE_SEPARATOR: &str = "::";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Config,
    Run,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub modules: usize,
    pub skipped_modules: Vec<String>,
    pub configs_run: usize,
    pub runs_run: usize,
    pub diagnostics: Vec<String>,
}

pub(crate) struct Registry {
    modules: RefCell<Vec<Module>>,
    by_name: RefCell<HashMap<String, Module>>,
    lookup: RefCell<HashMap<String, DescriptorRef>>,
    diagnostics: RefCell<Vec<DiError>>,
    /// Names under construction, outermost first.
    resolving: RefCell<Vec<String>>,
    policy: ResolvePolicy,
    bootstrapped: Cell<bool>,
}

impl Registry {
    fn new(policy: ResolvePolicy) -> Self {
        Self {
            modules: RefCell::new(Vec::new()),
            by_name: RefCell::new(HashMap::new()),
            lookup: RefCell::new(HashMap::new()),
            diagnostics: RefCell::new(Vec::new()),
            resolving: RefCell::new(Vec::new()),
            policy,
            bootstrapped: Cell::new(false),
        }
    }

    pub(crate) fn add_module(&self, name: &str, dependencies: &[&str]) -> Module {
        let module = Module::new(name, dependencies);
        self.by_name
            .borrow_mut()
            .insert(name.to_string(), module.clone());
        self.modules.borrow_mut().push(module.clone());
        module
    }

    /// Finds a descriptor by bare or qualified name.
    ///
    /// A qualified name is looked up in that module only. Hits are memoised.
    pub(crate) fn find(&self, name: &str) -> Result<DescriptorRef> {
        if let Some(hit) = self.lookup.borrow().get(name) {
            return Ok(hit.clone());
        }

        let found = if name.contains(MODULE_SEPARATOR) {
            let parts: Vec<&str> = name.split(MODULE_SEPARATOR).collect();
            let [module_name, object_name] = parts.as_slice() else {
                return Err(DiError::MalformedName {
                    name: name.to_string(),
                });
            };

            let module = self
                .modules
                .borrow()
                .iter()
                .find(|m| m.name() == *module_name)
                .cloned()
                .ok_or_else(|| DiError::MissingObject {
                    name: name.to_string(),
                })?;

            module
                .object(object_name)
                .ok_or_else(|| DiError::MissingInModule {
                    module: module_name.to_string(),
                    name: object_name.to_string(),
                })?
        } else {
            self.modules
                .borrow()
                .iter()
                .find_map(|m| m.object(name))
                .ok_or_else(|| DiError::MissingObject {
                    name: name.to_string(),
                })?
        };

        self.lookup
            .borrow_mut()
            .insert(name.to_string(), found.clone());

        Ok(found)
    }

    fn degrade(&self, err: DiError) -> Result<Resolved> {
        tracing::error!("{}", err);
        self.diagnostics.borrow_mut().push(err.clone());

        match self.policy {
            ResolvePolicy::Lenient => Ok(None),
            ResolvePolicy::Strict => Err(err),
        }
    }

    pub(crate) fn resolve(
        &self,
        descriptor: &DescriptorRef,
        phase: Phase,
        chain: &[String],
    ) -> Result<Resolved> {
        let name = descriptor.borrow().name().map(str::to_string);

        if let Some(name) = &name {
            if chain.contains(name) {
                return self.degrade(DiError::CircularDependency {
                    name: name.clone(),
                    chain: chain.to_vec(),
                });
            }
        }

        if let Some(cached) = Self::memoised(descriptor, phase) {
            return Ok(Some(cached));
        }

        let mut child_chain = chain.to_vec();
        let Some(name) = name else {
            return self.build(descriptor, phase, &child_chain);
        };

        child_chain.push(name.clone());
        self.resolving.borrow_mut().push(name);
        let built = self.build(descriptor, phase, &child_chain);
        self.resolving.borrow_mut().pop();

        built
    }

    fn build(
        &self,
        descriptor: &DescriptorRef,
        phase: Phase,
        chain: &[String],
    ) -> Result<Resolved> {
        let link = descriptor.borrow().provider_link();
        if let Some(provider) = link {
            self.link_provider(descriptor, &provider, chain)?;
        }

        let inject = descriptor.borrow().inject();
        let mut values = Vec::with_capacity(inject.len());

        for dep in inject {
            let value = match dep {
                Dep::Name(dep_name) => match self.find(&dep_name) {
                    Ok(target) => self.resolve(&target, phase, chain)?,
                    Err(err) => self.degrade(err)?,
                },
                Dep::Literal(value) => Some(value),
            };
            values.push(value);
        }

        Ok(Self::instantiate(descriptor, phase, &Args::new(values)))
    }

    /// Cached singleton for kinds that hand out their cache in `phase`.
    fn memoised(descriptor: &DescriptorRef, phase: Phase) -> Option<Instance> {
        let descriptor = descriptor.borrow();
        let kind = descriptor.kind();

        let serves_cache = match phase {
            Phase::Config => matches!(kind, ObjectKind::Provider | ObjectKind::Constant),
            Phase::Run => matches!(
                kind,
                ObjectKind::Factory
                    | ObjectKind::Filter
                    | ObjectKind::Service
                    | ObjectKind::Value
                    | ObjectKind::Constant
            ),
        };

        if serves_cache {
            descriptor.cache()
        } else {
            None
        }
    }

    fn link_provider(
        &self,
        descriptor: &DescriptorRef,
        provider: &DescriptorRef,
        chain: &[String],
    ) -> Result<()> {
        self.resolve(provider, Phase::Config, chain)?;

        let handle = provider.borrow().provider_handle();
        let Some(handle) = handle else {
            tracing::debug!(
                "Provider {} has no get-factory method",
                provider.borrow().label()
            );
            return Ok(());
        };

        let invocation = parse_param(&handle.get());
        let mut descriptor = descriptor.borrow_mut();
        if descriptor.link_provider(invocation) {
            tracing::debug!("Linked {} to its provider", descriptor.label());
        }

        Ok(())
    }

    fn instantiate(descriptor: &DescriptorRef, phase: Phase, args: &Args) -> Resolved {
        let (kind, cache, factory) = {
            let d = descriptor.borrow();
            (d.kind(), d.cache(), d.factory())
        };

        match (phase, kind) {
            (Phase::Config, ObjectKind::Provider) => {
                if cache.is_some() {
                    return cache;
                }
                Self::construct_provider(descriptor, factory, args)
            }
            (Phase::Config, ObjectKind::Constant) => cache,
            (Phase::Config, ObjectKind::Config) => Self::call(factory.as_ref(), args),
            (Phase::Run, ObjectKind::Factory | ObjectKind::Filter | ObjectKind::Service) => {
                if cache.is_some() {
                    return cache;
                }

                let value = Self::call(factory.as_ref(), args);
                if let Some(value) = &value {
                    let mut d = descriptor.borrow_mut();
                    tracing::debug!("Instantiated {} {}", kind, d.label());
                    d.set_cache(value.clone());
                }
                value
            }
            (Phase::Run, ObjectKind::Value | ObjectKind::Constant) => cache,
            (Phase::Run, ObjectKind::Run) => Self::call(factory.as_ref(), args),
            _ => None,
        }
    }

    fn construct_provider(
        descriptor: &DescriptorRef,
        factory: Option<Factory>,
        args: &Args,
    ) -> Resolved {
        match factory {
            Some(Factory::Construct(ctor)) => {
                let instance = ctor(args);
                let mut d = descriptor.borrow_mut();
                tracing::debug!("Constructed provider {}", d.label());
                d.set_cache(instance.value.clone());
                d.set_provider_handle(instance.handle);
                Some(instance.value)
            }
            Some(Factory::Call(f)) => {
                let value = f(args)?;
                descriptor.borrow_mut().set_cache(value.clone());
                Some(value)
            }
            None => None,
        }
    }

    fn call(factory: Option<&Factory>, args: &Args) -> Resolved {
        match factory {
            Some(Factory::Call(f)) => f(args),
            Some(Factory::Construct(ctor)) => Some(ctor(args).value),
            None => None,
        }
    }

    /// Resolves a one-off action outside the bootstrap sequence.
    ///
    /// Called from inside a factory, the names still under construction form the
    /// starting chain, so asking for one of them again is reported as circular.
    pub(crate) fn invoke(&self, invocation: Invocation, phase: Phase) -> Result<Resolved> {
        let kind = match phase {
            Phase::Config => ObjectKind::Config,
            Phase::Run => ObjectKind::Run,
        };
        let descriptor = Descriptor::action(kind, invocation).into_ref();
        let chain = self.resolving.borrow().clone();
        self.resolve(&descriptor, phase, &chain)
    }

    fn bootstrap(&self) -> Result<BootstrapReport> {
        if self.bootstrapped.replace(true) {
            tracing::warn!("Bootstrap already ran, ignoring repeated trigger");
            return Ok(BootstrapReport::default());
        }

        let diagnostics_before = self.diagnostics.borrow().len();
        let modules = self.modules.borrow().clone();
        let mut configs = Vec::new();
        let mut runs = Vec::new();
        let mut skipped_modules = Vec::new();

        for module in &modules {
            let missing = module
                .dependencies()
                .into_iter()
                .find(|dep| !self.by_name.borrow().contains_key(dep));

            match missing {
                Some(dependency) => {
                    skipped_modules.push(module.name());
                    self.degrade(DiError::MissingModuleDependency {
                        module: module.name(),
                        dependency,
                    })?;
                }
                None => {
                    configs.extend(module.configs());
                    runs.extend(module.runs());
                }
            }
        }

        tracing::info!(
            "🔧 Phase: config ({} actions from {} modules)",
            configs.len(),
            modules.len() - skipped_modules.len()
        );
        for config in &configs {
            self.resolve(config, Phase::Config, &[])?;
        }

        tracing::info!("🚀 Phase: run ({} actions)", runs.len());
        for run in &runs {
            self.resolve(run, Phase::Run, &[])?;
        }

        let diagnostics = self.diagnostics.borrow()[diagnostics_before..]
            .iter()
            .map(ToString::to_string)
            .collect();

        Ok(BootstrapReport {
            modules: modules.len(),
            skipped_modules,
            configs_run: configs.len(),
            runs_run: runs.len(),
            diagnostics,
        })
    }
}

/// Handle to one registry. Clones share the same modules and caches.
///
/// Create one at startup and pass it to whatever registers or resolves objects.
#[derive(Clone)]
pub struct Container {
    pub(crate) registry: Rc<Registry>,
}

impl Container {
    pub fn new() -> Self {
        Self::with_policy(ResolvePolicy::default())
    }

    pub fn with_policy(policy: ResolvePolicy) -> Self {
        let container = Self {
            registry: Rc::new(Registry::new(policy)),
        };
        facade::register_core(&container);
        container
    }

    pub fn with_config(config: &ContainerConfig) -> Self {
        Self::with_policy(config.policy())
    }

    pub fn policy(&self) -> ResolvePolicy {
        self.registry.policy
    }

    /// Declares a new module. Nothing is executed until [`Container::bootstrap`].
    pub fn module(&self, name: &str, dependencies: &[&str]) -> Module {
        self.registry.add_module(name, dependencies)
    }

    pub fn get_module(&self, name: &str) -> Option<Module> {
        self.registry.by_name.borrow().get(name).cloned()
    }

    /// Modules in registration order, which is also bootstrap order.
    pub fn modules(&self) -> Vec<Module> {
        self.registry.modules.borrow().clone()
    }

    pub fn module_names(&self) -> Vec<String> {
        self.registry
            .modules
            .borrow()
            .iter()
            .map(Module::name)
            .collect()
    }

    /// Validates module dependencies, then runs every config action before any run action.
    ///
    /// Only the first call does anything.
    pub fn bootstrap(&self) -> Result<BootstrapReport> {
        self.registry.bootstrap()
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.registry.bootstrapped.get()
    }

    pub fn try_invoke(&self, invocation: Invocation, phase: Phase) -> Result<Resolved> {
        self.registry.invoke(invocation, phase)
    }

    /// Runs `invocation` as a run-phase action; failures yield `None`.
    pub fn invoke(&self, invocation: Invocation) -> Resolved {
        self.try_invoke(invocation, Phase::Run).ok().flatten()
    }

    /// One-off resolution of a bare or qualified name.
    pub fn resolve_in(&self, name: &str, phase: Phase) -> Result<Resolved> {
        let passthrough = Factory::raw(|args: &Args| args.raw(0).cloned());
        self.try_invoke(
            Invocation::new(Some(passthrough), vec![Dep::from(name)]),
            phase,
        )
    }

    pub fn resolve(&self, name: &str) -> Resolved {
        self.resolve_in(name, Phase::Run).ok().flatten()
    }

    pub fn get<T: 'static>(&self, key: &Key<T>) -> Option<Rc<T>> {
        self.resolve(key.name())?.downcast::<T>().ok()
    }

    /// Every failure recorded so far, oldest first.
    pub fn diagnostics(&self) -> Vec<DiError> {
        self.registry.diagnostics.borrow().clone()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Param;

    #[test]
    fn test_find_bare_name_scans_in_registration_order() {
        let container = Container::new();
        container.module("a", &[]).value("thing", 1u8);
        container.module("b", &[]).value("thing", 2u8);

        let found = container.registry.find("thing").unwrap();
        let value = found.borrow().cache().unwrap();
        assert_eq!(value.downcast_ref::<u8>(), Some(&1));
    }

    #[test]
    fn test_find_qualified_name_stays_in_module() {
        let container = Container::new();
        container.module("a", &[]).value("thing", 1u8);
        container.module("b", &[]).value("other", 2u8);

        assert!(container.registry.find("b::other").is_ok());
        assert_eq!(
            container.registry.find("b::thing").unwrap_err(),
            DiError::MissingInModule {
                module: "b".to_string(),
                name: "thing".to_string()
            }
        );
    }

    #[test]
    fn test_find_rejects_double_separator() {
        let container = Container::new();
        assert!(matches!(
            container.registry.find("a::b::c"),
            Err(DiError::MalformedName { .. })
        ));
    }

    #[test]
    fn test_find_memoises_hits_only() {
        let container = Container::new();
        assert!(container.registry.find("late").is_err());

        container.module("a", &[]).value("late", 1u8);
        let first = container.registry.find("late").unwrap();

        container.module("b", &[]).value("late", 2u8);
        let second = container.registry.find("late").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_other_kinds_resolve_to_null_in_wrong_phase() {
        let container = Container::new();
        container
            .module("a", &[])
            .factory("f", Param::new().func(|_| 1u8))
            .value("v", 2u8);

        assert!(container.resolve_in("f", Phase::Config).unwrap().is_none());
        assert!(container.resolve_in("v", Phase::Config).unwrap().is_none());
        assert!(container.resolve_in("f", Phase::Run).unwrap().is_some());
    }

    #[test]
    fn test_strict_policy_propagates() {
        let container = Container::with_policy(ResolvePolicy::Strict);
        container
            .module("a", &[])
            .factory("f", Param::inject(["ghost"]).func(|_| 1u8));

        let err = container.resolve_in("f", Phase::Run).unwrap_err();
        assert_eq!(
            err,
            DiError::MissingObject {
                name: "ghost".to_string()
            }
        );
        assert_eq!(container.diagnostics().len(), 1);
    }

    #[test]
    fn test_bootstrap_runs_once() {
        let container = Container::new();
        let counter = Rc::new(Cell::new(0));
        let seen = counter.clone();
        container
            .module("a", &[])
            .run(Param::new().func(move |_| seen.set(seen.get() + 1)));

        let report = container.bootstrap().unwrap();
        assert_eq!(report.runs_run, 1);
        assert!(container.is_bootstrapped());

        let again = container.bootstrap().unwrap();
        assert_eq!(again, BootstrapReport::default());
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_in_flight_names_are_cleared() {
        let container = Container::with_policy(ResolvePolicy::Strict);
        container
            .module("a", &[])
            .factory("ok", Param::new().func(|_| 1u8))
            .factory("broken", Param::inject(["ghost"]).func(|_| 2u8));

        assert!(container.resolve_in("ok", Phase::Run).unwrap().is_some());
        assert!(container.resolve_in("broken", Phase::Run).is_err());
        assert!(container.registry.resolving.borrow().is_empty());
    }
}
