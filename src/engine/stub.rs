//! Stub engine for tests and demos.
//!
//! Recognition is simulated through a small marker planted in the pixel
//! buffer by the synthetic source (`plant_marker`): a magic prefix, a kind
//! code and a payload. Offline search decodes the marker synchronously;
//! online search runs on a spawned thread with a configurable latency and
//! honors the cancel token between sleep slices.
//!
//! An image marker with an empty payload resolves to a fingerprint of the
//! pixel buffer, so the same synthetic scene always matches the same
//! reference ID.

use sha2::{Digest, Sha256};
use std::thread;
use std::time::{Duration, Instant};

use crate::engine::{CancelToken, EngineError, OnlineCallback, ScanEngine};
use crate::frame::Frame;
use crate::result::{ResultKind, ScanOptions, ScanResult};

const MARKER_MAGIC: [u8; 2] = [0xa5, 0x3c];
const MARKER_HEADER_LEN: usize = 5;

/// Slice length for latency sleeps, so cancellation is observed promptly.
const CANCEL_POLL: Duration = Duration::from_millis(5);

/// Write a recognition marker into the head of a pixel buffer.
///
/// The buffer must be large enough for the header plus payload; synthetic
/// frames always are. Panics otherwise, this is test plumbing.
pub fn plant_marker(pixels: &mut [u8], kind: ResultKind, payload: &[u8]) {
    assert!(kind != ResultKind::None, "cannot plant a 'none' marker");
    assert!(payload.len() <= u16::MAX as usize, "marker payload too long");
    let needed = MARKER_HEADER_LEN + payload.len();
    assert!(
        pixels.len() >= needed,
        "buffer too small for marker: {} < {}",
        pixels.len(),
        needed
    );
    pixels[0..2].copy_from_slice(&MARKER_MAGIC);
    pixels[2] = kind_code(kind);
    pixels[3..5].copy_from_slice(&(payload.len() as u16).to_le_bytes());
    pixels[MARKER_HEADER_LEN..needed].copy_from_slice(payload);
}

fn kind_code(kind: ResultKind) -> u8 {
    match kind {
        ResultKind::None => 0,
        ResultKind::Ean8 => 1,
        ResultKind::Ean13 => 2,
        ResultKind::QrCode => 3,
        ResultKind::DataMatrix => 4,
        ResultKind::Image => 5,
    }
}

fn kind_from_code(code: u8) -> Option<ResultKind> {
    match code {
        1 => Some(ResultKind::Ean8),
        2 => Some(ResultKind::Ean13),
        3 => Some(ResultKind::QrCode),
        4 => Some(ResultKind::DataMatrix),
        5 => Some(ResultKind::Image),
        _ => None,
    }
}

fn read_marker(pixels: &[u8]) -> Option<(ResultKind, &[u8])> {
    if pixels.len() < MARKER_HEADER_LEN || pixels[0..2] != MARKER_MAGIC {
        return None;
    }
    let kind = kind_from_code(pixels[2])?;
    let len = u16::from_le_bytes([pixels[3], pixels[4]]) as usize;
    let end = MARKER_HEADER_LEN.checked_add(len)?;
    if pixels.len() < end {
        return None;
    }
    Some((kind, &pixels[MARKER_HEADER_LEN..end]))
}

/// Stable reference ID for a pixel buffer.
fn fingerprint_id(pixels: &[u8]) -> Vec<u8> {
    let digest: [u8; 32] = Sha256::digest(pixels).into();
    format!("img-{}", hex::encode(&digest[..8])).into_bytes()
}

fn recognize(pixels: &[u8], options: ScanOptions) -> Option<ScanResult> {
    let (kind, payload) = read_marker(pixels)?;
    if !options.admits(kind) {
        return None;
    }
    if kind == ResultKind::Image && payload.is_empty() {
        return Some(ScanResult::new(kind, fingerprint_id(pixels)));
    }
    Some(ScanResult::new(kind, payload.to_vec()))
}

/// Configuration for the stub engine.
#[derive(Clone, Debug)]
pub struct StubEngineConfig {
    /// Simulated round-trip latency of an online search.
    pub online_latency: Duration,
}

impl Default for StubEngineConfig {
    fn default() -> Self {
        Self {
            online_latency: Duration::from_millis(150),
        }
    }
}

/// Marker-decoding engine for tests and the demo binary.
pub struct StubEngine {
    config: StubEngineConfig,
    fail_offline: Option<EngineError>,
    fail_online: Option<EngineError>,
}

impl StubEngine {
    pub fn new(config: StubEngineConfig) -> Self {
        Self {
            config,
            fail_offline: None,
            fail_online: None,
        }
    }

    /// Make every offline search fail with `error`.
    pub fn fail_offline_with(mut self, error: EngineError) -> Self {
        self.fail_offline = Some(error);
        self
    }

    /// Make every online search fail with `error` (after the latency).
    pub fn fail_online_with(mut self, error: EngineError) -> Self {
        self.fail_online = Some(error);
        self
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new(StubEngineConfig::default())
    }
}

impl ScanEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn search_offline(
        &mut self,
        frame: &Frame,
        options: ScanOptions,
    ) -> Result<Option<ScanResult>, EngineError> {
        if let Some(error) = &self.fail_offline {
            return Err(error.clone());
        }
        Ok(recognize(frame.pixels(), options))
    }

    fn search_online(
        &self,
        frame: Frame,
        options: ScanOptions,
        cancel: CancelToken,
        on_complete: OnlineCallback,
    ) {
        let latency = self.config.online_latency;
        let fail_online = self.fail_online.clone();
        thread::spawn(move || {
            let deadline = Instant::now() + latency;
            while Instant::now() < deadline {
                if cancel.is_cancelled() {
                    log::debug!("StubEngine: online search aborted");
                    on_complete(Err(EngineError::Aborted));
                    return;
                }
                thread::sleep(CANCEL_POLL.min(deadline - Instant::now()));
            }
            if cancel.is_cancelled() {
                on_complete(Err(EngineError::Aborted));
                return;
            }
            if let Some(error) = fail_online {
                on_complete(Err(error));
                return;
            }
            on_complete(Ok(recognize(frame.pixels(), options)));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;
    use std::sync::mpsc;

    fn marked_frame(kind: ResultKind, payload: &[u8]) -> Frame {
        let mut pixels = vec![0u8; 64 * 64];
        plant_marker(&mut pixels, kind, payload);
        Frame::new(pixels, 64, 64, 64, PixelFormat::Gray8).expect("frame")
    }

    fn blank_frame() -> Frame {
        Frame::new(vec![0u8; 64 * 64], 64, 64, 64, PixelFormat::Gray8).expect("frame")
    }

    #[test]
    fn marker_round_trips() {
        let mut pixels = vec![0u8; 64];
        plant_marker(&mut pixels, ResultKind::QrCode, b"payload");
        let (kind, payload) = read_marker(&pixels).expect("marker");
        assert_eq!(kind, ResultKind::QrCode);
        assert_eq!(payload, b"payload");
        assert!(read_marker(&[0u8; 64]).is_none());
    }

    #[test]
    fn offline_respects_options_mask() {
        let mut engine = StubEngine::default();
        let frame = marked_frame(ResultKind::Ean13, b"4006381333931");

        let hit = engine
            .search_offline(&frame, ScanOptions::EAN13)
            .expect("search");
        assert_eq!(
            hit,
            Some(ScanResult::new(ResultKind::Ean13, b"4006381333931".to_vec()))
        );

        let miss = engine
            .search_offline(&frame, ScanOptions::QRCODE)
            .expect("search");
        assert_eq!(miss, None);

        let blank = engine
            .search_offline(&blank_frame(), ScanOptions::ALL)
            .expect("search");
        assert_eq!(blank, None);
    }

    #[test]
    fn empty_image_marker_gets_a_stable_fingerprint() {
        let mut engine = StubEngine::default();
        let frame = marked_frame(ResultKind::Image, b"");
        let first = engine
            .search_offline(&frame, ScanOptions::IMAGE)
            .expect("search")
            .expect("match");
        let second = engine
            .search_offline(&frame.clone(), ScanOptions::IMAGE)
            .expect("search")
            .expect("match");
        assert_eq!(first, second);
        assert!(first.value().starts_with("img-"));
    }

    #[test]
    fn offline_failure_injection() {
        let mut engine = StubEngine::default().fail_offline_with(EngineError::BadImage);
        let err = engine
            .search_offline(&blank_frame(), ScanOptions::ALL)
            .expect_err("injected failure");
        assert_eq!(err, EngineError::BadImage);
    }

    #[test]
    fn online_completes_with_match() {
        let engine = StubEngine::new(StubEngineConfig {
            online_latency: Duration::from_millis(10),
        });
        let frame = marked_frame(ResultKind::Image, b"ref-42");
        let (tx, rx) = mpsc::channel();
        engine.search_online(
            frame,
            ScanOptions::IMAGE,
            CancelToken::new(),
            Box::new(move |outcome| {
                tx.send(outcome).expect("send outcome");
            }),
        );
        let outcome = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("outcome in time");
        assert_eq!(
            outcome,
            Ok(Some(ScanResult::new(ResultKind::Image, b"ref-42".to_vec())))
        );
    }

    #[test]
    fn online_cancel_aborts_early() {
        let engine = StubEngine::new(StubEngineConfig {
            online_latency: Duration::from_secs(30),
        });
        let token = CancelToken::new();
        let (tx, rx) = mpsc::channel();
        engine.search_online(
            blank_frame(),
            ScanOptions::ALL,
            token.clone(),
            Box::new(move |outcome| {
                tx.send(outcome).expect("send outcome");
            }),
        );
        token.cancel();
        let outcome = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("abort in time");
        assert_eq!(outcome, Err(EngineError::Aborted));
    }
}
