//! Capture pump.
//!
//! `start_capture` brackets frame admission: a dedicated thread pulls frames
//! from a `FrameSource` and hands each one to the session, one at a time.
//! One frame is fully processed before the next is pulled; there is no
//! frame queue. The pump stops on `stop()`, on end of stream, or on a
//! source error.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::frame::Frame;
use crate::ingest::FrameSource;

/// Handle to a running capture pump.
///
/// Dropping the handle without calling `stop()` leaves the pump running
/// until its source ends; owners are expected to stop capture before
/// tearing the session down.
#[derive(Debug)]
pub struct CaptureHandle {
    stop: Arc<AtomicBool>,
    frames_admitted: Arc<AtomicU64>,
    join: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    /// Connect the source and start pumping frames into `on_frame`.
    ///
    /// Connection errors surface here, synchronously; errors after that are
    /// logged by the pump thread and end admission.
    pub(crate) fn spawn<F>(mut source: Box<dyn FrameSource>, mut on_frame: F) -> Result<Self>
    where
        F: FnMut(Frame) + Send + 'static,
    {
        source.connect()?;

        let stop = Arc::new(AtomicBool::new(false));
        let frames_admitted = Arc::new(AtomicU64::new(0));

        let thread_stop = stop.clone();
        let thread_count = frames_admitted.clone();
        let join = std::thread::spawn(move || {
            log::info!("capture: admitting frames from '{}'", source.name());
            while !thread_stop.load(Ordering::SeqCst) {
                match source.next_frame() {
                    Ok(Some(frame)) => {
                        thread_count.fetch_add(1, Ordering::SeqCst);
                        on_frame(frame);
                    }
                    Ok(None) => {
                        log::info!("capture: source '{}' ended", source.name());
                        break;
                    }
                    Err(e) => {
                        log::warn!("capture: source '{}' failed: {}", source.name(), e);
                        break;
                    }
                }
            }
            log::info!("capture: stopped");
        });

        Ok(Self {
            stop,
            frames_admitted,
            join: Some(join),
        })
    }

    /// Number of frames admitted so far.
    pub fn frames_admitted(&self) -> u64 {
        self.frames_admitted.load(Ordering::SeqCst)
    }

    /// Whether the pump thread is still running.
    pub fn is_running(&self) -> bool {
        self.join
            .as_ref()
            .map(|join| !join.is_finished())
            .unwrap_or(false)
    }

    /// Stop admission and join the pump thread.
    pub fn stop(mut self) -> Result<u64> {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("capture pump thread panicked"))?;
        }
        Ok(self.frames_admitted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{Scene, SyntheticConfig, SyntheticSource};
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn pump_drains_the_script_and_stops_at_eos() {
        let source = SyntheticSource::new(
            SyntheticConfig::default(),
            vec![Scene::Blank, Scene::Blank, Scene::Blank],
        );
        let seen = Arc::new(Mutex::new(0u32));
        let sink = seen.clone();
        let handle = CaptureHandle::spawn(
            Box::new(source),
            move |_frame| {
                *sink.lock().expect("sink lock") += 1;
            },
        )
        .expect("spawn pump");

        // EOS ends the pump on its own.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while handle.is_running() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!handle.is_running());
        let admitted = handle.stop().expect("stop pump");
        assert_eq!(admitted, 3);
        assert_eq!(*seen.lock().expect("seen lock"), 3);
    }

    #[test]
    fn stop_halts_a_looped_source() {
        let source = SyntheticSource::new(
            SyntheticConfig {
                looped: true,
                ..SyntheticConfig::default()
            },
            vec![Scene::Blank],
        );
        let handle =
            CaptureHandle::spawn(Box::new(source), |_frame| {}).expect("spawn pump");
        std::thread::sleep(Duration::from_millis(20));
        let admitted = handle.stop().expect("stop pump");
        assert!(admitted > 0);
    }
}
