//! Shared helpers for Hiro integration tests

#![allow(dead_code)]

use hiro_runtime::{listener, Event, EventName, Hiro, Sandbox, SchedulerConfig};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

pub use pretty_assertions::assert_eq;

pub type Log = Rc<RefCell<Vec<String>>>;

pub const POLL: Duration = Duration::from_millis(10);

/// Runner with a short poll period
pub fn fast_hiro() -> Hiro {
    Hiro::with_scheduler_config(SchedulerConfig::new(POLL).unwrap())
}

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Compact description of an event, e.g. `test.onComplete:adds:true`
pub fn describe(event: &Event<'_>) -> String {
    let name = event.name();
    match event {
        Event::HiroStart | Event::HiroComplete => name.to_string(),
        Event::SuiteSetup { suite } | Event::SuiteStart { suite } => {
            format!("{}:{}", name, suite.name())
        }
        Event::SuiteComplete { suite, success, .. } => {
            format!("{}:{}:{}", name, suite.name(), success)
        }
        Event::TestStart { test } => format!("{}:{}", name, test.name()),
        Event::TestComplete { test, success, .. } => {
            format!("{}:{}:{}", name, test.name(), success)
        }
    }
}

/// Record every lifecycle event of `hiro` into `log`
pub fn record_events(hiro: &Hiro, log: &Log) {
    let log = Rc::clone(log);
    let recorder = listener(move |event| log.borrow_mut().push(describe(event)));
    for name in EventName::ALL {
        hiro.bind(name.as_str(), Rc::clone(&recorder));
    }
}

/// Sandbox that writes `cleanup:<suite>` to a log
pub struct LogSandbox {
    pub suite: String,
    pub log: Log,
}

impl Sandbox for LogSandbox {
    fn cleanup(&mut self) {
        self.log.borrow_mut().push(format!("cleanup:{}", self.suite));
    }
}
