//! Failure boundary
//!
//! Every piece of user code the runner touches (listeners, setup hooks,
//! test bodies, sandbox cleanup) is executed through [`attempt`] or one of
//! its siblings. A failure comes back as a [`Failure`] value; it is never
//! rethrown, so a misbehaving test cannot take the scheduler loop down.
//!
//! Both explicit `Err(Failure)` returns and panics are captured. Panics are
//! caught with `catch_unwind`; while a boundary is active on the current
//! thread the default panic message is suppressed and the panic location is
//! recorded on the failure instead.

use futures_util::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe, Location};
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};

/// Frame offset used by [`extract_stack`] when the caller has no preference
pub const DEFAULT_STACK_OFFSET: usize = 3;

/// Extra frames skipped on top of the offset for trace lists
const FRAME_LIST_SKIP: usize = 3;

/// A file/line/column triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    /// Create a location from parts
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl From<&Location<'_>> for SourceLocation {
    fn from(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line(), location.column())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Captured failure of a unit of work
///
/// A failure may carry location information in any of three shapes: a list
/// of trace frames, a multiline trace string, or a single source location.
/// [`extract_stack`] knows how to read each of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<SourceLocation>,
}

impl Failure {
    /// Create a failure located at the caller
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self::bare(message).with_source(SourceLocation::from(Location::caller()))
    }

    /// Create a failure without any location information
    pub fn bare(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            frames: None,
            trace: None,
            source: None,
        }
    }

    /// Attach a list of trace frames, innermost first
    pub fn with_frames(mut self, frames: Vec<String>) -> Self {
        self.frames = Some(frames);
        self
    }

    /// Attach a multiline trace string
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Attach a source location
    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn frames(&self) -> Option<&[String]> {
        self.frames.as_deref()
    }

    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }

    pub fn source(&self) -> Option<&SourceLocation> {
        self.source.as_ref()
    }

    /// Best-effort location of this failure
    pub fn location(&self) -> Option<String> {
        extract_stack(self, DEFAULT_STACK_OFFSET)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Lets test bodies use `?` on any error; the `?` site becomes the location.
impl<E> From<E> for Failure
where
    E: std::error::Error,
{
    #[track_caller]
    fn from(error: E) -> Self {
        Failure::new(error.to_string())
    }
}

/// Fail with `message` unless `condition` holds
#[track_caller]
pub fn ensure(condition: bool, message: impl Into<String>) -> Result<(), Failure> {
    if condition {
        Ok(())
    } else {
        Err(Failure::new(message))
    }
}

// ============================================================================
// Panic capture
// ============================================================================

thread_local! {
    static BOUNDARY_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_PANIC: RefCell<Option<SourceLocation>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Chain a hook in front of the current one that records panic locations
/// for boundaries and stays silent while a boundary is active.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if BOUNDARY_DEPTH.with(|depth| depth.get() > 0) {
                let location = info.location().map(SourceLocation::from);
                LAST_PANIC.with(|slot| *slot.borrow_mut() = location);
            } else {
                previous(info);
            }
        }));
    });
}

struct BoundaryGuard;

impl BoundaryGuard {
    fn enter() -> Self {
        BOUNDARY_DEPTH.with(|depth| depth.set(depth.get() + 1));
        BoundaryGuard
    }
}

impl Drop for BoundaryGuard {
    fn drop(&mut self) {
        BOUNDARY_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

fn failure_from_panic(payload: Box<dyn Any + Send>) -> Failure {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "(non-string panic)".to_string()
    };

    let failure = Failure::bare(message);
    match LAST_PANIC.with(|slot| slot.borrow_mut().take()) {
        Some(location) => failure.with_source(location),
        None => failure,
    }
}

/// Marks the boundary as active only while the inner future is being polled,
/// so unrelated tasks interleaved on the same thread keep the normal hook.
struct Guarded<F> {
    inner: Pin<Box<F>>,
}

impl<F: Future> Future for Guarded<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _guard = BoundaryGuard::enter();
        self.inner.as_mut().poll(cx)
    }
}

// ============================================================================
// Boundaries
// ============================================================================

/// Run `work`, returning `None` on success and the failure otherwise
pub fn attempt<F>(work: F) -> Option<Failure>
where
    F: FnOnce() -> Result<(), Failure>,
{
    attempt_value(work).err()
}

/// Run `work` against `receiver`, returning `None` on success
pub fn attempt_with<R, F>(receiver: &R, work: F) -> Option<Failure>
where
    R: ?Sized,
    F: FnOnce(&R) -> Result<(), Failure>,
{
    attempt(|| work(receiver))
}

/// Run `work`, keeping its value on success
pub fn attempt_value<T, F>(work: F) -> Result<T, Failure>
where
    F: FnOnce() -> Result<T, Failure>,
{
    install_panic_hook();
    let outcome = {
        let _guard = BoundaryGuard::enter();
        panic::catch_unwind(AssertUnwindSafe(work))
    };

    match outcome {
        Ok(result) => result,
        Err(payload) => Err(failure_from_panic(payload)),
    }
}

/// Await `work`, capturing an `Err` or a panic raised while polling it
pub async fn attempt_async<T, F>(work: F) -> Result<T, Failure>
where
    F: Future<Output = Result<T, Failure>>,
{
    install_panic_hook();
    let guarded = Guarded {
        inner: Box::pin(work),
    };

    match AssertUnwindSafe(guarded).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(failure_from_panic(payload)),
    }
}

// ============================================================================
// Location extraction
// ============================================================================

/// Best-effort human readable location of a failure
///
/// Reads, in order of preference:
/// 1. the trace frame list, skipping `offset + 3` frames,
/// 2. the trace string, dropping a bare leading `Error` line, line `offset`,
/// 3. the source location, unless it points into this crate.
pub fn extract_stack(failure: &Failure, offset: usize) -> Option<String> {
    if let Some(frames) = failure.frames.as_ref().filter(|f| !f.is_empty()) {
        return frames.get(offset + FRAME_LIST_SKIP).cloned();
    }

    if let Some(trace) = failure.trace.as_deref().filter(|t| !t.is_empty()) {
        let mut lines: Vec<&str> = trace.lines().collect();
        if lines
            .first()
            .is_some_and(|first| first.eq_ignore_ascii_case("error"))
        {
            lines.remove(0);
        }
        return lines.get(offset).map(|line| line.to_string());
    }

    let source = failure.source.as_ref()?;
    if is_framework_source(&source.file) {
        return None;
    }
    Some(source.to_string())
}

/// Location of the caller, or `None` when called from inside the runner
#[track_caller]
pub fn get_location(offset: usize) -> Option<String> {
    extract_stack(&Failure::new("location lookup"), offset)
}

/// Whether `file` is one of this crate's own sources
///
/// Matches `<crate>/src/..` in a checkout and `<crate>-<version>/src/..` in
/// the cargo registry. Sibling crates sharing the name as a prefix do not match.
fn is_framework_source(file: &str) -> bool {
    let crate_name = env!("CARGO_PKG_NAME");
    let normalized = file.replace('\\', "/");
    let segments: Vec<&str> = normalized.split('/').collect();

    segments
        .windows(2)
        .any(|pair| pair[1] == "src" && is_crate_dir(pair[0], crate_name))
}

fn is_crate_dir(dir: &str, crate_name: &str) -> bool {
    match dir.strip_prefix(crate_name) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('-')
            .and_then(|version| version.chars().next())
            .map_or(false, |c| c.is_ascii_digit()),
        None => false,
    }
}
