//! Scanning session coordinator.
//!
//! `ScanSession` owns the session state machine and the frame-admission
//! policy. Frames arrive one at a time on the admission context (usually the
//! capture pump); the offline pass runs synchronously there, while online
//! searches complete on the engine's own context. The two contexts share
//! exactly one mutable block, `Inner`, behind one mutex, which is what makes
//! "cancelled" and "completed" mutually exclusive for any given search.
//!
//! Guarded operations (`pause`, `resume`, `snap`, `cancel`) return a bool:
//! false means the transition is not defined in the current state and
//! nothing changed. That is a control signal for the UI layer, not an error.
//!
//! Delegate callbacks are always invoked with no session lock held, so a
//! delegate may call back into the session freely.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use anyhow::{anyhow, Result};

use crate::capture::CaptureHandle;
use crate::dedupe::ResultDeduper;
use crate::engine::{CancelToken, EngineError, OnlineCallback, OnlineOutcome, ScanEngine};
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::result::{ScanOptions, ScanResult};

/// Session state. Exactly one at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Idle scanning: every admitted frame gets an offline pass.
    Default,
    /// One online search armed or in flight; admitted frames are dropped
    /// (the first one after arming is submitted instead).
    Searching,
    /// Frames are dropped, no engine calls at all.
    Paused,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Default => "default",
            SessionState::Searching => "searching",
            SessionState::Paused => "paused",
        }
    }
}

/// UI-facing observer of a session.
///
/// The session holds the delegate weakly and never extends its lifetime; a
/// dropped delegate simply stops receiving notifications. `state_changed`
/// is auxiliary and best-effort, hence the default no-op.
pub trait SessionDelegate: Send + Sync {
    /// A recognition to display. For online searches this fires once per
    /// search, with `ScanResult::none()` for a no-match; for offline
    /// scanning, repeats are already filtered out.
    fn did_scan(&self, result: &ScanResult);

    /// A recognition failure (offline or online). Never fired for an
    /// invalid transition or a cancelled search.
    fn did_fail(&self, error: &EngineError);

    fn state_changed(&self, _state: SessionState) {}
}

/// Session tuning knobs.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Result kinds the offline pass is willing to recognize.
    pub options: ScanOptions,
    /// Consecutive offline misses after which the last displayed result is
    /// considered gone (see `ResultDeduper`).
    pub clear_after_misses: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            options: ScanOptions::ALL,
            clear_after_misses: 1,
        }
    }
}

/// The one in-flight online search, if any.
///
/// Armed at `snap()`, dispatched with the next admitted frame. The search id
/// makes late completions recognizable: a completion whose id is no longer
/// current belongs to a cancelled search and is dropped.
#[derive(Debug)]
enum PendingSearch {
    Armed,
    Dispatched { id: u64, token: CancelToken },
}

struct Inner {
    state: SessionState,
    options: ScanOptions,
    pending: Option<PendingSearch>,
    deduper: ResultDeduper,
    next_search_id: u64,
}

/// Delegate traffic computed under the lock, delivered after it is released.
enum Notice {
    Scan(ScanResult),
    Fail(EngineError),
    State(SessionState),
}

/// What to do with an admitted frame, decided under the lock.
enum Admission {
    Drop,
    Offline(ScanOptions),
    Online {
        id: u64,
        token: CancelToken,
        options: ScanOptions,
    },
}

struct SessionCore {
    engine: Mutex<Box<dyn ScanEngine>>,
    inner: Mutex<Inner>,
    delegate: Weak<dyn SessionDelegate>,
}

impl SessionCore {
    // The lock is only ever held across plain state mutations, which do not
    // panic, so a poisoned guard still carries consistent state.
    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_engine(&self) -> MutexGuard<'_, Box<dyn ScanEngine>> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, notices: Vec<Notice>) {
        if notices.is_empty() {
            return;
        }
        let Some(delegate) = self.delegate.upgrade() else {
            return;
        };
        for notice in notices {
            match notice {
                Notice::Scan(result) => delegate.did_scan(&result),
                Notice::Fail(error) => delegate.did_fail(&error),
                Notice::State(state) => delegate.state_changed(state),
            }
        }
    }

    fn pause(&self) -> bool {
        let mut notices = Vec::new();
        let ok = {
            let mut inner = self.lock_inner();
            match inner.state {
                SessionState::Default => {
                    inner.state = SessionState::Paused;
                    notices.push(Notice::State(SessionState::Paused));
                    true
                }
                // A pending online search must be cancelled first.
                SessionState::Searching | SessionState::Paused => false,
            }
        };
        self.notify(notices);
        ok
    }

    fn resume(&self) -> bool {
        let mut notices = Vec::new();
        let ok = {
            let mut inner = self.lock_inner();
            match inner.state {
                SessionState::Paused => {
                    inner.state = SessionState::Default;
                    // Fresh start: a previously displayed result may fire again.
                    inner.deduper.flush();
                    notices.push(Notice::State(SessionState::Default));
                    true
                }
                _ => false,
            }
        };
        self.notify(notices);
        ok
    }

    fn snap(&self) -> bool {
        let mut notices = Vec::new();
        let ok = {
            let mut inner = self.lock_inner();
            match inner.state {
                SessionState::Default => {
                    inner.state = SessionState::Searching;
                    inner.pending = Some(PendingSearch::Armed);
                    notices.push(Notice::State(SessionState::Searching));
                    true
                }
                _ => false,
            }
        };
        if ok {
            log::debug!("session: snap armed, next admitted frame goes online");
        }
        self.notify(notices);
        ok
    }

    fn cancel(&self) -> bool {
        let mut notices = Vec::new();
        let ok = {
            let mut inner = self.lock_inner();
            match inner.state {
                SessionState::Searching => {
                    if let Some(PendingSearch::Dispatched { id, token }) = inner.pending.take() {
                        token.cancel();
                        log::debug!("session: cancelled online search #{}", id);
                    }
                    inner.state = SessionState::Default;
                    notices.push(Notice::State(SessionState::Default));
                    true
                }
                _ => false,
            }
        };
        self.notify(notices);
        ok
    }

    /// Per-frame entry point. Never re-entrant: the admission context hands
    /// over one frame at a time and this returns before the next is pulled.
    fn process_frame(core: &Arc<Self>, frame: Frame) {
        let admission = {
            let mut inner = core.lock_inner();
            match inner.state {
                SessionState::Paused => Admission::Drop,
                SessionState::Default => Admission::Offline(inner.options),
                SessionState::Searching => {
                    if matches!(inner.pending, Some(PendingSearch::Armed)) {
                        let id = inner.next_search_id;
                        inner.next_search_id += 1;
                        let token = CancelToken::new();
                        let options = inner.options;
                        inner.pending = Some(PendingSearch::Dispatched {
                            id,
                            token: token.clone(),
                        });
                        Admission::Online { id, token, options }
                    } else {
                        // One search per snap; frames keep draining unqueued.
                        Admission::Drop
                    }
                }
            }
        };

        match admission {
            Admission::Drop => {}
            Admission::Offline(options) => core.offline_pass(&frame, options),
            Admission::Online { id, token, options } => {
                log::debug!("session: submitting frame to online search #{}", id);
                let completer = Arc::clone(core);
                let callback: OnlineCallback =
                    Box::new(move |outcome| completer.finish_online(id, outcome));
                core.lock_engine()
                    .search_online(frame, options, token, callback);
            }
        }
    }

    fn offline_pass(&self, frame: &Frame, options: ScanOptions) {
        let outcome = self.lock_engine().search_offline(frame, options);

        let mut notices = Vec::new();
        {
            let mut inner = self.lock_inner();
            // The session may have been paused or snapped while the engine
            // ran; this frame's outcome no longer belongs to idle scanning.
            if inner.state != SessionState::Default {
                return;
            }
            match outcome {
                Ok(Some(result)) => {
                    if inner.deduper.record(&result) {
                        notices.push(Notice::Scan(result));
                    }
                }
                Ok(None) => inner.deduper.miss(),
                Err(error) => notices.push(Notice::Fail(error)),
            }
        }
        self.notify(notices);
    }

    /// Completion path for online searches; runs on the engine's context.
    fn finish_online(&self, id: u64, outcome: OnlineOutcome) {
        let mut notices = Vec::new();
        {
            let mut inner = self.lock_inner();
            let current = matches!(
                inner.pending,
                Some(PendingSearch::Dispatched { id: pending_id, .. }) if pending_id == id
            );
            if !current {
                // Cancelled before completion; whatever the engine produced
                // must not reach the delegate.
                log::debug!("session: dropping outcome of stale online search #{}", id);
                return;
            }
            inner.pending = None;
            inner.state = SessionState::Default;
            notices.push(Notice::State(SessionState::Default));
            match outcome {
                Ok(Some(result)) => {
                    // A snap is an explicit request: its result is forwarded
                    // even when it matches the cached one. Recording it keeps
                    // idle scanning from re-announcing the same subject next.
                    inner.deduper.record(&result);
                    notices.push(Notice::Scan(result));
                }
                Ok(None) => notices.push(Notice::Scan(ScanResult::none())),
                Err(error) => notices.push(Notice::Fail(error)),
            }
        }
        self.notify(notices);
    }
}

// ----------------------------------------------------------------------------
// Public session handle
// ----------------------------------------------------------------------------

/// A scanning session: frame admission, state machine, one optional capture
/// pump. Create one per scanner presentation.
pub struct ScanSession {
    core: Arc<SessionCore>,
    capture: Option<CaptureHandle>,
}

impl ScanSession {
    /// Build a session around an engine and a delegate.
    ///
    /// Only a weak reference to the delegate is kept; the caller owns its
    /// lifetime and it must outlive the session to keep receiving
    /// notifications.
    pub fn new<D>(engine: Box<dyn ScanEngine>, delegate: &Arc<D>, config: SessionConfig) -> Self
    where
        D: SessionDelegate + 'static,
    {
        let delegate: Arc<dyn SessionDelegate> = delegate.clone();
        let delegate: Weak<dyn SessionDelegate> = Arc::downgrade(&delegate);
        let core = Arc::new(SessionCore {
            engine: Mutex::new(engine),
            inner: Mutex::new(Inner {
                state: SessionState::Default,
                options: config.options,
                pending: None,
                deduper: ResultDeduper::new(config.clear_after_misses),
                next_search_id: 0,
            }),
            delegate,
        });
        Self {
            core,
            capture: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.core.lock_inner().state
    }

    pub fn options(&self) -> ScanOptions {
        self.core.lock_inner().options
    }

    /// Reconfigure the recognizable kinds. Takes effect from the next
    /// admitted frame; an in-flight online search completes under the
    /// options it was issued with.
    pub fn set_options(&self, options: ScanOptions) {
        self.core.lock_inner().options = options;
    }

    /// Freeze scanning. Refused while an online search is pending; cancel
    /// it first.
    pub fn pause(&self) -> bool {
        self.core.pause()
    }

    /// Unfreeze scanning and forget the last displayed result.
    pub fn resume(&self) -> bool {
        self.core.resume()
    }

    /// Arm one online search for the next admitted frame. Refused unless
    /// idle scanning.
    pub fn snap(&self) -> bool {
        self.core.snap()
    }

    /// Cancel the pending online search, synchronously. After this returns
    /// the state is `Default` and no outcome of that search will ever reach
    /// the delegate, regardless of what the engine still does with it.
    pub fn cancel(&self) -> bool {
        self.core.cancel()
    }

    /// Admission entry point. Driven by the capture pump after
    /// `start_capture`; exposed for hosts that own their capture loop.
    pub fn process_frame(&self, frame: Frame) {
        SessionCore::process_frame(&self.core, frame);
    }

    /// Start pulling frames from `source` on a dedicated thread.
    pub fn start_capture(&mut self, source: Box<dyn FrameSource>) -> Result<()> {
        if self.capture.is_some() {
            return Err(anyhow!("capture already running"));
        }
        let core = Arc::clone(&self.core);
        let handle =
            CaptureHandle::spawn(source, move |frame| SessionCore::process_frame(&core, frame))?;
        self.capture = Some(handle);
        Ok(())
    }

    /// Stop frame admission and join the pump. Returns the number of frames
    /// admitted during the capture.
    pub fn stop_capture(&mut self) -> Result<u64> {
        match self.capture.take() {
            Some(handle) => handle.stop(),
            None => Err(anyhow!("capture not running")),
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.as_ref().map(CaptureHandle::is_running).unwrap_or(false)
    }

    /// Frames admitted by the current capture, if one is running.
    pub fn frames_admitted(&self) -> Option<u64> {
        self.capture.as_ref().map(CaptureHandle::frames_admitted)
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if let Some(handle) = self.capture.take() {
            if let Err(e) = handle.stop() {
                log::warn!("session: capture pump did not stop cleanly: {}", e);
            }
        }
    }
}
