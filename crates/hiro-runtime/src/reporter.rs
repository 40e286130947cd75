//! Console reporter - renders run progress from lifecycle events

use crate::events::{listener, Event, EventBus, EventName, Listener};
use crate::suite::{Report, Suite, SuiteReport, Test};
use colored::*;
use hiro_config::Config;
use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::Duration;

const REPORTED_EVENTS: [EventName; 5] = [
    EventName::HiroStart,
    EventName::SuiteStart,
    EventName::TestComplete,
    EventName::SuiteComplete,
    EventName::HiroComplete,
];

/// A failed test, or a failed setup hook when `test` is `None`
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub suite: String,
    pub test: Option<String>,
    pub message: String,
    pub location: Option<String>,
}

/// Totals collected over one run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunSummary {
    pub suites: usize,
    pub failed_suites: usize,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration: Duration,
    pub failures: Vec<FailureRecord>,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.failed_suites == 0 && self.failed == 0
    }
}

/// Test reporter with output configuration
pub struct ConsoleReporter {
    /// Show a line per test instead of dots
    verbose: bool,
    /// Disable colored output
    no_color: bool,
    out: RefCell<Box<dyn Write>>,
    summary: RefCell<RunSummary>,
    current_suite: RefCell<String>,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ConsoleReporter {
    /// Create a reporter writing to stdout
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            no_color: false,
            out: RefCell::new(Box::new(io::stdout())),
            summary: RefCell::new(RunSummary::default()),
            current_suite: RefCell::new(String::new()),
        }
    }

    /// Reporter settings from a loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.verbose()).with_no_color(!config.color())
    }

    /// Disable colored output
    pub fn with_no_color(mut self, no_color: bool) -> Self {
        self.no_color = no_color;
        self
    }

    /// Write to `out` instead of stdout
    pub fn with_output(self, out: Box<dyn Write>) -> Self {
        *self.out.borrow_mut() = out;
        self
    }

    /// Snapshot of the totals collected so far
    pub fn summary(&self) -> RunSummary {
        self.summary.borrow().clone()
    }

    /// Bind the reporter to `bus`
    ///
    /// Returns the bound listener so the caller can [`detach`](Self::detach).
    pub fn attach(self: &Rc<Self>, bus: &EventBus) -> Listener {
        let reporter = Rc::clone(self);
        let bound = listener(move |event| reporter.handle(event));
        for name in REPORTED_EVENTS {
            bus.bind_event(name, Rc::clone(&bound));
        }
        bound
    }

    pub fn detach(bus: &EventBus, bound: &Listener) {
        for name in REPORTED_EVENTS {
            bus.unbind_event(name, bound);
        }
    }

    /// React to one lifecycle event
    pub fn handle(&self, event: &Event<'_>) {
        match *event {
            Event::HiroStart => *self.summary.borrow_mut() = RunSummary::default(),
            Event::SuiteStart { suite } => self.print_suite_header(suite),
            Event::TestComplete {
                test,
                success,
                report,
            } => self.record_test(test, success, report),
            Event::SuiteComplete { suite, success, report } => {
                self.record_suite(suite, success, report)
            }
            Event::HiroComplete => self.finish(),
            Event::SuiteSetup { .. } | Event::TestStart { .. } => {}
        }
    }

    fn paint(&self, text: ColoredString) -> String {
        if self.no_color {
            text.clear().to_string()
        } else {
            text.to_string()
        }
    }

    fn write(&self, args: fmt::Arguments<'_>) {
        let mut out = self.out.borrow_mut();
        let _ = out.write_fmt(args);
        let _ = out.flush();
    }

    fn print_suite_header(&self, suite: &Suite) {
        *self.current_suite.borrow_mut() = suite.name().to_string();
        if self.verbose {
            self.write(format_args!("{}\n", self.paint(suite.name().bold())));
        }
    }

    fn record_test(&self, test: &Test, success: bool, report: &Report) {
        let duration = test.result().map(|r| r.duration).unwrap_or_default();
        {
            let mut summary = self.summary.borrow_mut();
            summary.total += 1;
            summary.duration += duration;
            if success {
                summary.passed += 1;
            } else {
                summary.failed += 1;
            }
        }

        if let Some(failure) = report.failure() {
            self.summary.borrow_mut().failures.push(FailureRecord {
                suite: self.current_suite.borrow().clone(),
                test: Some(test.name().to_string()),
                message: failure.message().to_string(),
                location: failure.location(),
            });
        }

        if self.verbose {
            let label = if success {
                "PASS".green().bold()
            } else {
                "FAIL".red().bold()
            };
            self.write(format_args!(
                "  {} {} ({:.2?})\n",
                self.paint(label),
                test.name(),
                duration
            ));
        } else {
            let mark = if success { ".".green() } else { "F".red().bold() };
            self.write(format_args!("{}", self.paint(mark)));
        }
    }

    fn record_suite(&self, suite: &Suite, success: bool, report: &SuiteReport) {
        let mut summary = self.summary.borrow_mut();
        summary.suites += 1;
        if !success {
            summary.failed_suites += 1;
        }
        if let Some(failure) = &report.setup {
            summary.failures.push(FailureRecord {
                suite: suite.name().to_string(),
                test: None,
                message: failure.message().to_string(),
                location: failure.location(),
            });
            drop(summary);
            if self.verbose {
                self.write(format_args!(
                    "  {} setup: {}\n",
                    self.paint("FAIL".red().bold()),
                    failure
                ));
            } else {
                self.write(format_args!("{}", self.paint("S".red().bold())));
            }
        }
    }

    fn finish(&self) {
        let summary = self.summary();

        // Dots need a newline before the summary
        if !self.verbose && (summary.total > 0 || !summary.failures.is_empty()) {
            self.write(format_args!("\n"));
        }

        self.write(format_args!("\n"));
        self.print_summary(&summary);
        self.print_failures(&summary);
    }

    fn print_summary(&self, summary: &RunSummary) {
        self.write(format_args!("{}\n", "─".repeat(50)));

        let status = if summary.success() {
            "PASSED".green().bold()
        } else {
            "FAILED".red().bold()
        };
        let failed = if summary.failed > 0 {
            summary.failed.to_string().red().bold()
        } else {
            summary.failed.to_string().normal()
        };

        self.write(format_args!(
            "Test result: {} | {} suites, {} total, {} passed, {} failed\n",
            self.paint(status),
            summary.suites,
            self.paint(summary.total.to_string().bold()),
            self.paint(summary.passed.to_string().green().bold()),
            self.paint(failed)
        ));
        self.write(format_args!("Time: {:.2?}\n", summary.duration));
    }

    fn print_failures(&self, summary: &RunSummary) {
        if summary.failures.is_empty() {
            return;
        }

        self.write(format_args!("\n{}\n\n", self.paint("Failures:".red().bold())));

        for record in &summary.failures {
            let name = match &record.test {
                Some(test) => format!("{}::{}", record.suite, test),
                None => format!("{} (setup)", record.suite),
            };
            self.write(format_args!("  {} {}\n", self.paint("●".red()), self.paint(name.bold())));
            if let Some(location) = &record.location {
                self.write(format_args!("    at {}\n", location));
            }
            for line in record.message.lines() {
                self.write(format_args!("      {}\n", self.paint(line.dimmed())));
            }
            self.write(format_args!("\n"));
        }
    }
}

impl fmt::Debug for ConsoleReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleReporter")
            .field("verbose", &self.verbose)
            .field("no_color", &self.no_color)
            .field("summary", &self.summary.borrow())
            .finish()
    }
}
