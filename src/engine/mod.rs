//! Recognition engine seam.
//!
//! `ScanEngine` is the boundary to the actual matching capability. The
//! session drives it two ways:
//! - `search_offline`: synchronous search/decode against on-device data,
//!   called once per admitted frame.
//! - `search_online`: asynchronous search against a backend service, issued
//!   at most once per snap; completion is reported through a callback on
//!   whatever execution context the engine uses.
//!
//! Engines must not block `search_online`; long work belongs on the engine's
//! own context. Cancellation is advisory at this boundary: an engine should
//! stop at the earliest opportunity once the token trips, but the session
//! guarantees on its side that a cancelled search produces no observable
//! outcome regardless of what the engine does.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::frame::Frame;
use crate::result::{ScanOptions, ScanResult};

mod stub;

pub use stub::{plant_marker, StubEngine, StubEngineConfig};

/// Recognition failure, local or online.
///
/// These mirror the transport/engine conditions a matching backend reports;
/// an invalid session transition is never an `EngineError` (guarded
/// operations signal with a boolean instead).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("no internet connection")]
    NoConnection,
    #[error("internet connection too slow")]
    SlowConnection,
    #[error("operation timeout")]
    Timeout,
    #[error("operation aborted")]
    Aborted,
    #[error("image size or format not supported")]
    BadImage,
    #[error("resource temporarily unavailable")]
    Unavailable,
    #[error("engine error: {0}")]
    Other(String),
}

/// Outcome of an online search: a result, a miss (`None`), or a failure.
pub type OnlineOutcome = Result<Option<ScanResult>, EngineError>;

/// Completion callback for an online search. Invoked exactly once.
pub type OnlineCallback = Box<dyn FnOnce(OnlineOutcome) + Send + 'static>;

/// Shared cancellation flag for one in-flight online search.
///
/// The session creates the token before dispatch and keeps a clone, so a
/// `cancel()` observed by the session is also immediately visible to the
/// engine. Cheap to clone; all clones share the flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the flag. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Recognition engine boundary.
pub trait ScanEngine: Send {
    /// Engine identifier, for logs.
    fn name(&self) -> &'static str;

    /// Synchronous on-device search/decode, restricted to `options`.
    ///
    /// `Ok(None)` is a miss, not an error.
    fn search_offline(
        &mut self,
        frame: &Frame,
        options: ScanOptions,
    ) -> Result<Option<ScanResult>, EngineError>;

    /// Asynchronous online search. Must return without blocking; the engine
    /// performs its work on its own context and invokes `on_complete`
    /// exactly once with the outcome.
    ///
    /// `cancel` is the session's token for this search. An engine that can
    /// abort mid-flight should watch it and complete with
    /// `Err(EngineError::Aborted)`; an engine that cannot may ignore it and
    /// complete normally.
    fn search_online(
        &self,
        frame: Frame,
        options: ScanOptions,
        cancel: CancelToken,
        on_complete: OnlineCallback,
    );
}
