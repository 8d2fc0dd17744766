//! Frame ingestion sources.
//!
//! A `FrameSource` supplies decoded camera frames one at a time. The capture
//! pump pulls frames and feeds them to the session; sources never see the
//! session and the session never sees the device.
//!
//! Sources are responsible for:
//! - Decoding device output into `Frame` buffers
//! - Rate limiting / frame decimation
//! - Tagging capture orientation
//!
//! This crate ships only the synthetic source; real capture backends live
//! with the host application and implement the same trait.

use anyhow::Result;

use crate::frame::Frame;

pub mod synthetic;

pub use synthetic::{Scene, SyntheticConfig, SyntheticSource};

/// A sequence of decoded camera frames.
pub trait FrameSource: Send {
    /// Source identifier, for logs.
    fn name(&self) -> &'static str;

    /// Establish the underlying stream. Called once by the capture pump
    /// before the first frame.
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    /// Produce the next frame, blocking as needed for pacing.
    ///
    /// `Ok(None)` is end of stream: the capture pump stops admitting.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}
