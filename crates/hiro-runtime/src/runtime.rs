//! The `Hiro` facade
//!
//! Bundles one event bus, one registry and a scheduler over them. Most
//! programs only need this type:
//!
//! ```no_run
//! use hiro_runtime::{Hiro, ModuleDefinition};
//! use serde_json::json;
//!
//! let hiro = Hiro::new();
//! hiro.module(
//!     "math",
//!     ModuleDefinition::new().test("adds", |_| Ok(json!(1 + 1))),
//! )
//! .unwrap();
//! hiro.run_blocking(None).unwrap();
//! ```

use crate::async_runtime::try_block_on;
use crate::error::HiroResult;
use crate::events::{Event, EventBus, Listener};
use crate::registry::{ModuleDefinition, Registry};
use crate::reporter::ConsoleReporter;
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::status::Status;
use crate::suite::Suite;
use hiro_config::{Config, ConfigLoader};
use std::path::Path;
use std::rc::Rc;

/// Test runner instance
#[derive(Debug)]
pub struct Hiro {
    bus: Rc<EventBus>,
    registry: Rc<Registry>,
    scheduler: Scheduler,
    config: Config,
}

impl Default for Hiro {
    fn default() -> Self {
        Self::new()
    }
}

impl Hiro {
    /// Create a runner with the default poll interval
    pub fn new() -> Self {
        Self::with_scheduler_config(SchedulerConfig::default())
    }

    pub fn with_scheduler_config(config: SchedulerConfig) -> Self {
        let bus = Rc::new(EventBus::new());
        let registry = Rc::new(Registry::new());
        let scheduler = Scheduler::new(Rc::clone(&bus), Rc::clone(&registry), config);
        Self {
            bus,
            registry,
            scheduler,
            config: Config::default(),
        }
    }

    /// Create a runner from loaded configuration
    ///
    /// The configured suite filter applies to runs started without an
    /// explicit filter.
    pub fn from_config(config: &Config) -> HiroResult<Self> {
        let mut hiro = Self::with_scheduler_config(SchedulerConfig::from_config(config)?);
        hiro.config = config.clone();
        Ok(hiro)
    }

    /// Load `hiro.toml` (searching upward from `start_dir`), the global
    /// config and `HIRO_*` overrides, then build a runner from them
    pub fn load(start_dir: &Path) -> HiroResult<Self> {
        let config = ConfigLoader::new().load_from_directory(start_dir)?;
        Self::from_config(&config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Attach a console reporter configured from this runner's config
    pub fn attach_reporter(&self) -> Rc<ConsoleReporter> {
        let reporter = Rc::new(ConsoleReporter::from_config(&self.config));
        reporter.attach(&self.bus);
        reporter
    }

    pub fn bind(&self, name: &str, listener: Listener) {
        self.bus.bind(name, listener);
    }

    pub fn unbind(&self, name: &str, listener: &Listener) {
        self.bus.unbind(name, listener);
    }

    pub fn trigger(&self, event: &Event<'_>) {
        self.bus.trigger(event);
    }

    /// Declare a suite
    pub fn module(
        &self,
        name: impl Into<String>,
        definition: ModuleDefinition,
    ) -> HiroResult<Rc<Suite>> {
        self.registry.module(name, definition)
    }

    /// Run the registered suites, or only `filter`
    pub async fn run(&self, filter: Option<&str>) -> HiroResult<()> {
        let filter = filter.or(self.config.suite_filter());
        self.scheduler.run(filter).await
    }

    /// [`run`](Self::run) from synchronous code
    ///
    /// Must not be called from inside a tokio runtime.
    pub fn run_blocking(&self, filter: Option<&str>) -> HiroResult<()> {
        try_block_on(self.run(filter))?
    }

    /// Global run status
    pub fn status(&self) -> Status {
        self.scheduler.status()
    }

    pub fn registry(&self) -> &Rc<Registry> {
        &self.registry
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }
}
