//! Visual Scan Kernel (VSK)
//!
//! This crate implements the core of a camera scanning session: the state
//! machine that turns a stream of frames into recognition results.
//!
//! # Architecture
//!
//! A `ScanSession` sits between a frame source and a recognition engine and
//! enforces the session contract:
//!
//! 1. **One frame at a time**: a frame is fully processed before the next is
//!    admitted; there is no frame queue.
//! 2. **Always-on offline pass**: while idle, every admitted frame gets a
//!    synchronous on-device search, filtered by the scan options mask.
//! 3. **One online search at a time**: `snap()` arms a single online search
//!    for the next admitted frame; further frames are dropped until it
//!    resolves or is cancelled.
//! 4. **Authoritative cancellation**: `cancel()` takes effect synchronously
//!    at the session even when the engine keeps running; a cancelled
//!    search's outcome never reaches the delegate.
//! 5. **Deduplicated notifications**: consecutive recognitions of the same
//!    subject notify the delegate once, until the subject leaves the frame.
//!
//! # Module Structure
//!
//! - `session`: the session state machine and delegate protocol
//! - `engine`: the recognition engine seam (plus the stub engine)
//! - `ingest`: frame sources (synthetic source for tests/demo)
//! - `capture`: the frame-admission pump
//! - `frame`, `result`: data types shared across the seams
//! - `dedupe`: last-result cache and miss streak
//! - `config`: demo daemon configuration

pub mod capture;
pub mod config;
pub mod dedupe;
pub mod engine;
pub mod frame;
pub mod ingest;
pub mod result;
pub mod session;

pub use capture::CaptureHandle;
pub use config::ScanConfig;
pub use dedupe::ResultDeduper;
pub use engine::{
    CancelToken, EngineError, OnlineCallback, OnlineOutcome, ScanEngine, StubEngine,
    StubEngineConfig,
};
pub use frame::{Frame, Orientation, PixelFormat};
pub use ingest::{FrameSource, Scene, SyntheticConfig, SyntheticSource};
pub use result::{ResultKind, ScanOptions, ScanResult};
pub use session::{ScanSession, SessionConfig, SessionDelegate, SessionState};
