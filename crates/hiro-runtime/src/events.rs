//! Event bus for lifecycle notifications
//!
//! The vocabulary is closed: only the seven names in [`EventName`] can be
//! bound or triggered. Binding an unknown name is a silent no-op.

use crate::boundary::attempt;
use crate::suite::{Report, Suite, SuiteReport, Test};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::warn;

/// Recognized event names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    HiroStart,
    HiroComplete,
    SuiteSetup,
    SuiteStart,
    SuiteComplete,
    TestStart,
    TestComplete,
}

impl EventName {
    pub const ALL: [EventName; 7] = [
        EventName::HiroStart,
        EventName::HiroComplete,
        EventName::SuiteSetup,
        EventName::SuiteStart,
        EventName::SuiteComplete,
        EventName::TestStart,
        EventName::TestComplete,
    ];

    /// Wire name of the event, e.g. `suite.onStart`
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::HiroStart => "hiro.onStart",
            EventName::HiroComplete => "hiro.onComplete",
            EventName::SuiteSetup => "suite.onSetup",
            EventName::SuiteStart => "suite.onStart",
            EventName::SuiteComplete => "suite.onComplete",
            EventName::TestStart => "test.onStart",
            EventName::TestComplete => "test.onComplete",
        }
    }

    /// Look up an event by its wire name
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event together with its arguments
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    HiroStart,
    HiroComplete,
    SuiteSetup {
        suite: &'a Suite,
    },
    SuiteStart {
        suite: &'a Suite,
    },
    SuiteComplete {
        suite: &'a Suite,
        success: bool,
        report: &'a SuiteReport,
    },
    TestStart {
        test: &'a Test,
    },
    TestComplete {
        test: &'a Test,
        success: bool,
        report: &'a Report,
    },
}

impl Event<'_> {
    pub fn name(&self) -> EventName {
        match self {
            Event::HiroStart => EventName::HiroStart,
            Event::HiroComplete => EventName::HiroComplete,
            Event::SuiteSetup { .. } => EventName::SuiteSetup,
            Event::SuiteStart { .. } => EventName::SuiteStart,
            Event::SuiteComplete { .. } => EventName::SuiteComplete,
            Event::TestStart { .. } => EventName::TestStart,
            Event::TestComplete { .. } => EventName::TestComplete,
        }
    }
}

/// A bound listener. Identity is the `Rc` allocation.
pub type Listener = Rc<dyn Fn(&Event<'_>)>;

/// Wrap a closure as a [`Listener`]
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&Event<'_>) + 'static,
{
    Rc::new(f)
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

/// Listener table keyed by event name
#[derive(Default)]
pub struct EventBus {
    listeners: RefCell<HashMap<EventName, Vec<Listener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `name`. Unknown names are ignored.
    pub fn bind(&self, name: &str, listener: Listener) {
        if let Some(event) = EventName::parse(name) {
            self.bind_event(event, listener);
        }
    }

    /// Register `listener` for a typed event name
    pub fn bind_event(&self, name: EventName, listener: Listener) {
        self.listeners
            .borrow_mut()
            .entry(name)
            .or_default()
            .push(listener);
    }

    /// Remove every registration of `listener` for `name`
    pub fn unbind(&self, name: &str, listener: &Listener) {
        if let Some(event) = EventName::parse(name) {
            self.unbind_event(event, listener);
        }
    }

    pub fn unbind_event(&self, name: EventName, listener: &Listener) {
        if let Some(bound) = self.listeners.borrow_mut().get_mut(&name) {
            bound.retain(|existing| !same_listener(existing, listener));
        }
    }

    /// Invoke the listeners bound to the event, in registration order
    ///
    /// Each listener runs inside the failure boundary; a panicking listener
    /// is logged and the remaining listeners still run.
    pub fn trigger(&self, event: &Event<'_>) {
        let name = event.name();
        // Snapshot so listeners may bind or unbind while being invoked
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .get(&name)
            .cloned()
            .unwrap_or_default();

        for (index, listener) in listeners.iter().enumerate() {
            let failure = attempt(|| {
                listener(event);
                Ok(())
            });
            if let Some(failure) = failure {
                warn!(
                    target: "hiro::events",
                    event_name = %name,
                    listener = index,
                    location = ?failure.location(),
                    "listener failed: {}",
                    failure
                );
            }
        }
    }

    /// String-keyed [`trigger`](Self::trigger). No-op when `name` is unknown
    /// or does not match the event.
    pub fn trigger_named(&self, name: &str, event: &Event<'_>) {
        if EventName::parse(name) == Some(event.name()) {
            self.trigger(event);
        }
    }

    /// Number of listeners bound to `name`
    pub fn listener_count(&self, name: &str) -> usize {
        EventName::parse(name)
            .and_then(|event| self.listeners.borrow().get(&event).map(Vec::len))
            .unwrap_or(0)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        let mut map = f.debug_map();
        for name in EventName::ALL {
            if let Some(bound) = listeners.get(&name) {
                map.entry(&name.as_str(), &bound.len());
            }
        }
        map.finish()
    }
}
