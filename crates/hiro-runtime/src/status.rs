//! Lifecycle status shared by the scheduler, suites and tests

use serde::Serialize;
use std::fmt;

/// Lifecycle status
///
/// Variants are ordered: a component only moves forward through
/// `Ready -> Waiting -> Running -> Paused -> Done`, except for the
/// `Waiting <-> Running` hops a suite makes while its setup hook is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Not started
    Ready,
    /// Suspended on asynchronous preparation
    Waiting,
    /// Executing
    Running,
    /// Reserved for resumable work; never entered by the core
    Paused,
    /// Finished. Terminal.
    Done,
}

impl Status {
    /// Check if this status is terminal
    pub fn is_done(self) -> bool {
        matches!(self, Status::Done)
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(self, next: Status) -> bool {
        match (self, next) {
            (Status::Done, _) => false,
            (Status::Running, Status::Waiting) => true,
            (from, to) => to >= from,
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Ready
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Ready => "ready",
            Status::Waiting => "waiting",
            Status::Running => "running",
            Status::Paused => "paused",
            Status::Done => "done",
        };
        f.write_str(name)
    }
}
