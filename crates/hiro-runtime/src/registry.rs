//! Suite registry and module composition
//!
//! A module is declared with a [`ModuleDefinition`]. Its mixins are resolved
//! against suites already in the registry and folded left to right into a
//! fresh [`MethodSet`]; the definition's own entries are overlaid last, so
//! they always win. Mixing in is a one-time copy: changing a mixed-in suite
//! later does not affect suites composed from it.

use crate::boundary::Failure;
use crate::error::{HiroError, HiroResult};
use crate::suite::{Method, MethodSet, Suite, SuiteContext, RESERVED_NAMES, SETUP_HOOK};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use tracing::debug;

/// Declaration of a suite: mixins, an optional setup hook, tests and helpers
#[derive(Default)]
pub struct ModuleDefinition {
    mixins: Vec<String>,
    entries: Vec<(String, Method)>,
}

impl ModuleDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mix in the methods of an already registered suite
    pub fn mixin(mut self, suite: impl Into<String>) -> Self {
        self.mixins.push(suite.into());
        self
    }

    /// Declare the asynchronous setup hook
    pub fn setup<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(SuiteContext) -> Fut + 'static,
        Fut: Future<Output = Result<(), Failure>> + 'static,
    {
        self.entries
            .push((SETUP_HOOK.to_string(), Method::setup(hook)));
        self
    }

    /// Declare a test
    pub fn test<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&SuiteContext) -> Result<Value, Failure> + 'static,
    {
        self.entries.push((name.into(), Method::test(body)));
        self
    }

    /// Declare a helper callable from tests but never run as a test
    pub fn helper<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&SuiteContext) -> Result<Value, Failure> + 'static,
    {
        self.entries.push((name.into(), Method::helper(body)));
        self
    }

    pub fn mixins(&self) -> &[String] {
        &self.mixins
    }

    fn validate(&self, suite: &str) -> HiroResult<()> {
        for (name, method) in &self.entries {
            let is_setup_hook = name == SETUP_HOOK && matches!(method, Method::Setup(_));
            if RESERVED_NAMES.contains(&name.as_str()) && !is_setup_hook {
                return Err(HiroError::ReservedName {
                    suite: suite.to_string(),
                    name: name.clone(),
                    kind: if method.is_test() { "test" } else { "helper" },
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("mixins", &self.mixins)
            .field(
                "entries",
                &self.entries.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Name -> suite mapping, iterated in registration order
#[derive(Default)]
pub struct Registry {
    suites: RefCell<Vec<Rc<Suite>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose and register a suite, replacing any suite with the same name
    pub fn module(
        &self,
        name: impl Into<String>,
        definition: ModuleDefinition,
    ) -> HiroResult<Rc<Suite>> {
        let name = name.into();
        definition.validate(&name)?;

        let methods = self.compose(&definition);
        debug!(
            suite = %name,
            mixins = ?definition.mixins,
            methods = methods.len(),
            "module registered"
        );

        let suite = Rc::new(Suite::new(name, methods));
        let mut suites = self.suites.borrow_mut();
        match suites.iter_mut().find(|s| s.name() == suite.name()) {
            Some(existing) => *existing = Rc::clone(&suite),
            None => suites.push(Rc::clone(&suite)),
        }
        Ok(suite)
    }

    /// Resolve mixins and overlay the definition into a fresh method set
    ///
    /// Unknown mixin names contribute nothing.
    pub fn compose(&self, definition: &ModuleDefinition) -> MethodSet {
        let mut methods = MethodSet::new();
        for mixin in &definition.mixins {
            match self.get(mixin) {
                Some(parent) => methods.extend_from(parent.methods()),
                None => debug!(mixin = %mixin, "unknown mixin resolves to no methods"),
            }
        }
        for (name, method) in &definition.entries {
            methods.insert(name.clone(), method.clone());
        }
        methods
    }

    pub fn get(&self, name: &str) -> Option<Rc<Suite>> {
        self.suites
            .borrow()
            .iter()
            .find(|s| s.name() == name)
            .cloned()
    }

    /// All suites in registration order
    pub fn suites(&self) -> Vec<Rc<Suite>> {
        self.suites.borrow().clone()
    }

    /// Suites selected by an optional exact-name filter
    pub fn matching(&self, filter: Option<&str>) -> Vec<Rc<Suite>> {
        self.suites
            .borrow()
            .iter()
            .filter(|s| filter.map_or(true, |name| s.name() == name))
            .cloned()
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.suites
            .borrow()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.suites.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.borrow().is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
