//! Suites, tests and the method sets they are built from

use crate::boundary::{attempt, attempt_async, attempt_value, Failure};
use crate::events::{Event, EventBus};
use crate::status::Status;
use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::cell::{Cell, OnceCell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Name under which a suite's setup hook is stored
pub const SETUP_HOOK: &str = "setup";

/// Key naming the suites a module mixes in
pub const MIXIN_KEY: &str = "mixin";

/// Names that can never be used for tests or helpers
pub const RESERVED_NAMES: [&str; 2] = [SETUP_HOOK, MIXIN_KEY];

/// Test bodies and helpers
pub type TestFn = Rc<dyn Fn(&SuiteContext) -> Result<Value, Failure>>;

/// Asynchronous setup hook. The suite's tests start once the future resolves.
pub type SetupFn = Rc<dyn Fn(SuiteContext) -> LocalBoxFuture<'static, Result<(), Failure>>>;

/// A named behavior of a suite
#[derive(Clone)]
pub enum Method {
    /// Runs before any test, may await asynchronous work
    Setup(SetupFn),
    /// Becomes a [`Test`] when the suite runs
    Test(TestFn),
    /// Callable from tests through [`SuiteContext::call`], never run on its own
    Helper(TestFn),
}

impl Method {
    /// Wrap an async setup hook
    pub fn setup<F, Fut>(hook: F) -> Self
    where
        F: Fn(SuiteContext) -> Fut + 'static,
        Fut: Future<Output = Result<(), Failure>> + 'static,
    {
        Method::Setup(Rc::new(move |context: SuiteContext| hook(context).boxed_local()))
    }

    /// Wrap a test body
    pub fn test<F>(body: F) -> Self
    where
        F: Fn(&SuiteContext) -> Result<Value, Failure> + 'static,
    {
        Method::Test(Rc::new(body))
    }

    /// Wrap a helper
    pub fn helper<F>(body: F) -> Self
    where
        F: Fn(&SuiteContext) -> Result<Value, Failure> + 'static,
    {
        Method::Helper(Rc::new(body))
    }

    pub fn is_test(&self) -> bool {
        matches!(self, Method::Test(_))
    }

    fn kind(&self) -> &'static str {
        match self {
            Method::Setup(_) => "setup",
            Method::Test(_) => "test",
            Method::Helper(_) => "helper",
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Ordered name -> method mapping
///
/// Inserting an existing name replaces the method but keeps its position;
/// new names are appended.
#[derive(Clone, Default)]
pub struct MethodSet {
    entries: Vec<(String, Method)>,
}

impl MethodSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a method
    pub fn insert(&mut self, name: impl Into<String>, method: Method) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = method,
            None => self.entries.push((name, method)),
        }
    }

    /// Overlay every entry of `other` onto this set
    pub fn extend_from(&mut self, other: &MethodSet) {
        for (name, method) in &other.entries {
            self.insert(name.clone(), method.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Method> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, method)| method)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Method)> {
        self.entries.iter().map(|(name, method)| (name.as_str(), method))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The setup hook, if one is declared
    pub fn setup(&self) -> Option<&SetupFn> {
        match self.get(SETUP_HOOK) {
            Some(Method::Setup(hook)) => Some(hook),
            _ => None,
        }
    }

    /// Test bodies in declaration order
    pub fn tests(&self) -> impl Iterator<Item = (&str, &TestFn)> {
        self.entries.iter().filter_map(|(name, method)| match method {
            Method::Test(body) => Some((name.as_str(), body)),
            _ => None,
        })
    }
}

impl fmt::Debug for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// ============================================================================
// Sandbox and context
// ============================================================================

/// Isolation handle owned by a suite
///
/// Installed by the setup hook, released exactly once after the suite is done.
pub trait Sandbox {
    fn cleanup(&mut self);
}

struct ContextInner {
    suite_name: String,
    methods: Rc<MethodSet>,
    state: RefCell<HashMap<String, Value>>,
    sandbox: RefCell<Option<Box<dyn Sandbox>>>,
}

/// Receiver handed to setup hooks and test bodies
///
/// Cheap to clone; every clone refers to the same suite state.
#[derive(Clone)]
pub struct SuiteContext {
    inner: Rc<ContextInner>,
}

impl SuiteContext {
    fn new(suite_name: &str, methods: Rc<MethodSet>) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                suite_name: suite_name.to_string(),
                methods,
                state: RefCell::new(HashMap::new()),
                sandbox: RefCell::new(None),
            }),
        }
    }

    pub fn suite_name(&self) -> &str {
        &self.inner.suite_name
    }

    pub fn methods(&self) -> &MethodSet {
        &self.inner.methods
    }

    /// Read a value stored by setup or an earlier test
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.state.borrow().get(key).cloned()
    }

    /// Store a value shared with the rest of the suite
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.inner.state.borrow_mut().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.state.borrow_mut().remove(key)
    }

    /// Invoke a test or helper of this suite by name
    #[track_caller]
    pub fn call(&self, name: &str) -> Result<Value, Failure> {
        match self.inner.methods.get(name) {
            Some(Method::Test(body)) | Some(Method::Helper(body)) => body(self),
            Some(Method::Setup(_)) => Err(Failure::new(format!(
                "'{}' is the setup hook and cannot be called directly",
                name
            ))),
            None => Err(Failure::new(format!(
                "suite '{}' has no method named '{}'",
                self.inner.suite_name, name
            ))),
        }
    }

    /// Hand a sandbox to the suite
    ///
    /// A sandbox already held is cleaned up through the failure boundary
    /// before this call returns.
    pub fn set_sandbox(&self, sandbox: Box<dyn Sandbox>) {
        let replaced = self.inner.sandbox.borrow_mut().replace(sandbox);
        if let Some(replaced) = replaced {
            debug!(suite = %self.inner.suite_name, "replacing sandbox");
            dispose(&self.inner.suite_name, replaced);
        }
    }

    pub fn has_sandbox(&self) -> bool {
        self.inner.sandbox.borrow().is_some()
    }

    fn take_sandbox(&self) -> Option<Box<dyn Sandbox>> {
        self.inner.sandbox.borrow_mut().take()
    }

    fn clear_state(&self) {
        self.inner.state.borrow_mut().clear();
    }
}

fn dispose(suite: &str, mut sandbox: Box<dyn Sandbox>) {
    if let Some(failure) = attempt(|| {
        sandbox.cleanup();
        Ok(())
    }) {
        warn!(suite, "sandbox cleanup failed: {}", failure);
    }
}

impl fmt::Debug for SuiteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteContext")
            .field("suite", &self.inner.suite_name)
            .field("state", &self.inner.state.borrow())
            .field("sandbox", &self.has_sandbox())
            .finish()
    }
}

// ============================================================================
// Results
// ============================================================================

/// What a test produced: its return value or its failure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Report {
    Value(Value),
    Failure(Failure),
}

impl Report {
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Report::Failure(failure) => Some(failure),
            Report::Value(_) => None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Report::Value(value) => Some(value),
            Report::Failure(_) => None,
        }
    }
}

/// Result of running a single test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub success: bool,
    pub report: Report,
    pub duration: Duration,
}

impl TestResult {
    fn from_outcome(outcome: Result<Value, Failure>, duration: Duration) -> Self {
        match outcome {
            Ok(value) => Self {
                success: true,
                report: Report::Value(value),
                duration,
            },
            Err(failure) => Self {
                success: false,
                report: Report::Failure(failure),
                duration,
            },
        }
    }
}

/// A finished test inside a [`SuiteReport`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestOutcome {
    pub name: String,
    pub result: TestResult,
}

/// Aggregate report delivered with `suite.onComplete`
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SuiteReport {
    /// Failure of the setup hook, if it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup: Option<Failure>,
    pub tests: Vec<TestOutcome>,
}

impl SuiteReport {
    /// True iff setup succeeded and every test passed
    pub fn success(&self) -> bool {
        self.setup.is_none() && self.tests.iter().all(|t| t.result.success)
    }

    pub fn total(&self) -> usize {
        self.tests.len()
    }

    pub fn passed(&self) -> usize {
        self.tests.iter().filter(|t| t.result.success).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn duration(&self) -> Duration {
        self.tests.iter().map(|t| t.result.duration).sum()
    }
}

// ============================================================================
// Test
// ============================================================================

/// A single named unit of work owned by one suite
pub struct Test {
    name: String,
    status: Cell<Status>,
    result: OnceCell<TestResult>,
    body: TestFn,
}

impl Test {
    fn new(name: &str, body: TestFn) -> Self {
        Self {
            name: name.to_string(),
            status: Cell::new(Status::Ready),
            result: OnceCell::new(),
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Status {
        self.status.get()
    }

    /// Set once, when the test reaches `Done`
    pub fn result(&self) -> Option<&TestResult> {
        self.result.get()
    }

    fn execute(&self, context: &SuiteContext, bus: &EventBus) -> &TestResult {
        self.status.set(Status::Running);
        bus.trigger(&Event::TestStart { test: self });

        let started = Instant::now();
        let outcome = attempt_value(|| (self.body)(context));
        let result = self
            .result
            .get_or_init(|| TestResult::from_outcome(outcome, started.elapsed()));

        self.status.set(Status::Done);
        debug!(
            suite = context.suite_name(),
            test = %self.name,
            success = result.success,
            "test complete"
        );
        bus.trigger(&Event::TestComplete {
            test: self,
            success: result.success,
            report: &result.report,
        });
        result
    }
}

impl fmt::Debug for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("name", &self.name)
            .field("status", &self.status.get())
            .field("result", &self.result.get())
            .finish()
    }
}

// ============================================================================
// Suite
// ============================================================================

/// A named collection of tests with its own lifecycle
pub struct Suite {
    name: String,
    methods: Rc<MethodSet>,
    status: Cell<Status>,
    context: SuiteContext,
    tests: RefCell<Vec<Rc<Test>>>,
    setup_failure: RefCell<Option<Failure>>,
    report: OnceCell<SuiteReport>,
}

impl Suite {
    pub fn new(name: impl Into<String>, methods: MethodSet) -> Self {
        let name = name.into();
        let methods = Rc::new(methods);
        let context = SuiteContext::new(&name, Rc::clone(&methods));
        Self {
            name,
            methods,
            status: Cell::new(Status::Ready),
            context,
            tests: RefCell::new(Vec::new()),
            setup_failure: RefCell::new(None),
            report: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    pub fn status(&self) -> Status {
        self.status.get()
    }

    pub fn context(&self) -> &SuiteContext {
        &self.context
    }

    /// Tests created by [`run`](Self::run); empty before the suite starts
    pub fn tests(&self) -> Vec<Rc<Test>> {
        self.tests.borrow().clone()
    }

    pub fn has_sandbox(&self) -> bool {
        self.context.has_sandbox()
    }

    pub fn setup_failure(&self) -> Option<Failure> {
        self.setup_failure.borrow().clone()
    }

    /// Aggregate report, available once the suite is done
    pub fn report(&self) -> Option<&SuiteReport> {
        self.report.get()
    }

    fn advance(&self, next: Status) -> bool {
        let current = self.status.get();
        if !current.can_transition_to(next) {
            debug!(suite = %self.name, from = %current, to = %next, "ignored status change");
            return false;
        }
        self.status.set(next);
        true
    }

    /// Run the setup hook, if any
    ///
    /// Emits `suite.onSetup`, then waits on the hook. A failing hook is
    /// recorded and reported with `suite.onComplete`; the suite's tests still
    /// run. Does nothing unless the suite is `Ready`.
    pub async fn prepare(&self, bus: &EventBus) {
        if self.status.get() != Status::Ready {
            return;
        }

        bus.trigger(&Event::SuiteSetup { suite: self });
        self.advance(Status::Waiting);

        if let Some(hook) = self.methods.setup() {
            let hook = Rc::clone(hook);
            let context = self.context.clone();
            if let Err(failure) = attempt_async(async move { hook(context).await }).await {
                warn!(
                    suite = %self.name,
                    location = ?failure.location(),
                    "setup failed: {}",
                    failure
                );
                *self.setup_failure.borrow_mut() = Some(failure);
            }
        }

        self.advance(Status::Running);
    }

    /// Execute every test in declaration order, then finish the suite
    ///
    /// Does nothing if the suite is already done.
    pub fn run(&self, bus: &EventBus) {
        if self.status.get().is_done() {
            return;
        }

        self.advance(Status::Running);
        info!(suite = %self.name, "suite started");
        bus.trigger(&Event::SuiteStart { suite: self });

        let tests: Vec<Rc<Test>> = self
            .methods
            .tests()
            .map(|(name, body)| Rc::new(Test::new(name, Rc::clone(body))))
            .collect();
        *self.tests.borrow_mut() = tests.clone();

        let outcomes = tests
            .iter()
            .map(|test| TestOutcome {
                name: test.name().to_string(),
                result: test.execute(&self.context, bus).clone(),
            })
            .collect();

        let report = self.report.get_or_init(|| SuiteReport {
            setup: self.setup_failure(),
            tests: outcomes,
        });
        let success = report.success();

        self.advance(Status::Done);
        info!(
            suite = %self.name,
            success,
            passed = report.passed(),
            failed = report.failed(),
            "suite complete"
        );
        bus.trigger(&Event::SuiteComplete {
            suite: self,
            success,
            report,
        });
    }

    /// Release the sandbox through the failure boundary
    ///
    /// Returns true if a sandbox was present. A failing cleanup is logged.
    pub(crate) fn release_sandbox(&self) -> bool {
        let Some(sandbox) = self.context.take_sandbox() else {
            return false;
        };
        dispose(&self.name, sandbox);
        true
    }

    /// Put an unfinished suite back to `Ready` after its run was dropped
    ///
    /// Releases the sandbox and forgets the setup failure and shared state
    /// so the next run starts from scratch. Finished suites are left alone.
    pub(crate) fn reset(&self) {
        if self.status.get().is_done() {
            return;
        }
        self.release_sandbox();
        self.context.clear_state();
        self.setup_failure.borrow_mut().take();
        self.tests.borrow_mut().clear();
        self.status.set(Status::Ready);
        debug!(suite = %self.name, "suite reset after abandoned run");
    }
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("status", &self.status.get())
            .field("methods", &self.methods)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::async_runtime::block_on;
    use crate::events::listener;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn recorded_bus() -> (EventBus, Rc<RefCell<Vec<String>>>) {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in crate::events::EventName::ALL {
            let log = Rc::clone(&log);
            bus.bind_event(
                name,
                listener(move |event| {
                    let entry = match event {
                        Event::TestStart { test } => format!("{}:{}", event.name(), test.name()),
                        Event::TestComplete { test, success, .. } => {
                            format!("{}:{}:{}", event.name(), test.name(), success)
                        }
                        Event::SuiteComplete { success, .. } => {
                            format!("{}:{}", event.name(), success)
                        }
                        other => other.name().to_string(),
                    };
                    log.borrow_mut().push(entry);
                }),
            );
        }
        (bus, log)
    }

    #[test]
    fn test_method_set_replace_keeps_position() {
        let mut set = MethodSet::new();
        set.insert("a", Method::test(|_| Ok(json!(1))));
        set.insert("b", Method::test(|_| Ok(json!(2))));
        set.insert("a", Method::helper(|_| Ok(json!(3))));

        assert_eq!(set.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(matches!(set.get("a"), Some(Method::Helper(_))));
        assert_eq!(set.tests().map(|(n, _)| n).collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_run_records_results_in_order() {
        let mut methods = MethodSet::new();
        methods.insert("first", Method::test(|_| Ok(json!("one"))));
        methods.insert("second", Method::test(|_| Err(Failure::new("nope"))));
        methods.insert("third", Method::test(|_| Ok(Value::Null)));
        let suite = Suite::new("ordering", methods);
        let (bus, log) = recorded_bus();

        suite.run(&bus);

        assert_eq!(
            *log.borrow(),
            vec![
                "suite.onStart",
                "test.onStart:first",
                "test.onComplete:first:true",
                "test.onStart:second",
                "test.onComplete:second:false",
                "test.onStart:third",
                "test.onComplete:third:true",
                "suite.onComplete:false",
            ]
        );
        assert_eq!(suite.status(), Status::Done);

        let tests = suite.tests();
        assert!(tests.iter().all(|t| t.status() == Status::Done));
        assert_eq!(
            tests[0].result().unwrap().report,
            Report::Value(json!("one"))
        );
        assert_eq!(
            tests[1].result().unwrap().report.failure().unwrap().message(),
            "nope"
        );

        let report = suite.report().unwrap();
        assert_eq!((report.total(), report.passed(), report.failed()), (3, 2, 1));
    }

    #[test]
    fn test_run_twice_is_noop() {
        let mut methods = MethodSet::new();
        methods.insert("only", Method::test(|_| Ok(Value::Null)));
        let suite = Suite::new("once", methods);
        let (bus, log) = recorded_bus();

        suite.run(&bus);
        let events = log.borrow().len();
        suite.run(&bus);

        assert_eq!(log.borrow().len(), events);
    }

    #[test]
    fn test_helpers_are_not_tests_but_callable() {
        let mut methods = MethodSet::new();
        methods.insert("double", Method::helper(|_| Ok(json!(4))));
        methods.insert(
            "uses_helper",
            Method::test(|ctx| {
                let value = ctx.call("double")?;
                crate::boundary::ensure(value == json!(4), "helper returned wrong value")?;
                Ok(value)
            }),
        );
        methods.insert("missing", Method::test(|ctx| ctx.call("nothing_here")));
        let suite = Suite::new("helpers", methods);

        suite.run(&EventBus::new());

        let report = suite.report().unwrap();
        assert_eq!(report.total(), 2);
        assert!(report.tests[0].result.success);
        let failure = report.tests[1].result.report.failure().unwrap();
        assert!(failure.message().contains("no method named 'nothing_here'"));
    }

    #[test]
    fn test_prepare_runs_async_setup_and_shares_state() {
        let mut methods = MethodSet::new();
        methods.insert(
            SETUP_HOOK,
            Method::setup(|ctx| async move {
                tokio::task::yield_now().await;
                ctx.set("answer", json!(42));
                Ok(())
            }),
        );
        methods.insert(
            "reads_state",
            Method::test(|ctx| ctx.get("answer").ok_or_else(|| Failure::new("no answer"))),
        );
        let suite = Suite::new("setup", methods);
        let (bus, log) = recorded_bus();

        block_on(async {
            suite.prepare(&bus).await;
            assert_eq!(suite.status(), Status::Running);
            suite.run(&bus);
        });

        assert_eq!(log.borrow()[0], "suite.onSetup");
        assert_eq!(
            suite.tests()[0].result().unwrap().report,
            Report::Value(json!(42))
        );
        assert!(suite.report().unwrap().success());
    }

    #[test]
    fn test_failed_setup_still_runs_tests() {
        let mut methods = MethodSet::new();
        methods.insert(
            SETUP_HOOK,
            Method::setup(|_| async { Err(Failure::new("database unavailable")) }),
        );
        methods.insert("still_runs", Method::test(|_| Ok(Value::Null)));
        let suite = Suite::new("broken-setup", methods);
        let (bus, log) = recorded_bus();

        block_on(async {
            suite.prepare(&bus).await;
            suite.run(&bus);
        });

        assert_eq!(
            suite.setup_failure().unwrap().message(),
            "database unavailable"
        );
        let report = suite.report().unwrap();
        assert_eq!(report.passed(), 1);
        assert!(!report.success());
        assert_eq!(log.borrow().last().unwrap(), "suite.onComplete:false");
    }

    #[test]
    fn test_prepare_skipped_when_not_ready() {
        let suite = Suite::new("empty", MethodSet::new());
        let (bus, log) = recorded_bus();
        suite.run(&bus);
        log.borrow_mut().clear();

        block_on(suite.prepare(&bus));

        assert!(log.borrow().is_empty());
        assert_eq!(suite.status(), Status::Done);
    }

    #[test]
    fn test_panicking_test_body_is_isolated() {
        let mut methods = MethodSet::new();
        methods.insert("panics", Method::test(|_| panic!("index out of range")));
        methods.insert("after", Method::test(|_| Ok(Value::Null)));
        let suite = Suite::new("panic", methods);

        suite.run(&EventBus::new());

        let tests = suite.tests();
        let failure = tests[0].result().unwrap().report.failure().unwrap().clone();
        assert_eq!(failure.message(), "index out of range");
        assert!(tests[1].result().unwrap().success);
    }

    struct CountingSandbox(Rc<Cell<u32>>);

    impl Sandbox for CountingSandbox {
        fn cleanup(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_release_sandbox_only_once() {
        let suite = Suite::new("sandboxed", MethodSet::new());
        let cleaned = Rc::new(Cell::new(0));
        suite
            .context()
            .set_sandbox(Box::new(CountingSandbox(Rc::clone(&cleaned))));
        assert!(suite.has_sandbox());

        assert!(suite.release_sandbox());
        assert!(!suite.release_sandbox());
        assert_eq!(cleaned.get(), 1);
    }

    #[test]
    fn test_replaced_sandbox_is_cleaned_up() {
        let suite = Suite::new("sandboxed", MethodSet::new());
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));

        suite
            .context()
            .set_sandbox(Box::new(CountingSandbox(Rc::clone(&first))));
        suite
            .context()
            .set_sandbox(Box::new(CountingSandbox(Rc::clone(&second))));
        assert_eq!((first.get(), second.get()), (1, 0));

        assert!(suite.release_sandbox());
        assert_eq!((first.get(), second.get()), (1, 1));
    }

    #[test]
    fn test_reset_returns_waiting_suite_to_ready() {
        let mut methods = MethodSet::new();
        methods.insert(
            SETUP_HOOK,
            Method::setup(|_| async { Err(Failure::new("interrupted")) }),
        );
        let suite = Suite::new("interrupted", methods);
        let cleaned = Rc::new(Cell::new(0));
        block_on(suite.prepare(&EventBus::new()));
        suite.status.set(Status::Waiting);
        suite.context().set("partial", json!(true));
        suite
            .context()
            .set_sandbox(Box::new(CountingSandbox(Rc::clone(&cleaned))));

        suite.reset();

        assert_eq!(suite.status(), Status::Ready);
        assert!(suite.setup_failure().is_none());
        assert!(suite.context().get("partial").is_none());
        assert!(!suite.has_sandbox());
        assert_eq!(cleaned.get(), 1);
    }

    #[test]
    fn test_reset_leaves_finished_suite_alone() {
        let mut methods = MethodSet::new();
        methods.insert("only", Method::test(|_| Ok(Value::Null)));
        let suite = Suite::new("finished", methods);
        suite.run(&EventBus::new());

        suite.reset();

        assert_eq!(suite.status(), Status::Done);
        assert_eq!(suite.tests().len(), 1);
        assert!(suite.report().is_some());
    }
}
