//! Synthetic frame source.
//!
//! Generates deterministic frames for tests and the demo binary. A script of
//! `Scene` entries decides what each frame "shows": either background noise
//! or a recognition marker the stub engine will decode. The noise page is
//! derived once from the seed, so two frames of the same scene are
//! byte-identical and fingerprint to the same reference ID.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::time::{Duration, Instant};

use crate::engine::plant_marker;
use crate::frame::{Frame, PixelFormat};
use crate::ingest::FrameSource;
use crate::result::ResultKind;

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;

/// What a synthetic frame shows.
#[derive(Clone, Debug)]
pub enum Scene {
    /// Background noise, no recognizable subject.
    Blank,
    /// A subject the stub engine decodes into `ScanResult::new(kind, payload)`.
    Marker {
        kind: ResultKind,
        payload: Vec<u8>,
    },
}

impl Scene {
    pub fn marker(kind: ResultKind, payload: impl Into<Vec<u8>>) -> Self {
        Scene::Marker {
            kind,
            payload: payload.into(),
        }
    }
}

/// Configuration for a synthetic source.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    /// Frames per second; 0 disables pacing (tests want full speed).
    pub fps: u32,
    /// Seed for the background noise page.
    pub seed: u64,
    /// Replay the script from the start when it runs out. When false the
    /// source signals end of stream instead.
    pub looped: bool,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: 0,
            seed: 0,
            looped: false,
        }
    }
}

/// Deterministic scripted frame source.
pub struct SyntheticSource {
    config: SyntheticConfig,
    script: Vec<Scene>,
    cursor: usize,
    base: Vec<u8>,
    frames_produced: u64,
    last_frame_at: Option<Instant>,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig, script: Vec<Scene>) -> Self {
        let len = (config.width * config.height) as usize;
        let mut base = vec![0u8; len];
        let mut rng = StdRng::seed_from_u64(config.seed);
        rng.fill_bytes(&mut base);
        // Keep the marker magic out of blank frames.
        if len >= 2 {
            base[0] = 0;
            base[1] = 0;
        }
        Self {
            config,
            script,
            cursor: 0,
            base,
            frames_produced: 0,
            last_frame_at: None,
        }
    }

    pub fn frames_produced(&self) -> u64 {
        self.frames_produced
    }

    fn pace(&mut self) {
        if self.config.fps == 0 {
            return;
        }
        let interval = Duration::from_secs(1) / self.config.fps;
        if let Some(last) = self.last_frame_at {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_frame_at = Some(Instant::now());
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected ({}x{}, {} scenes, looped={})",
            self.config.width,
            self.config.height,
            self.script.len(),
            self.config.looped
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.cursor >= self.script.len() {
            if !self.config.looped || self.script.is_empty() {
                return Ok(None);
            }
            self.cursor = 0;
        }
        self.pace();

        let scene = self.script[self.cursor].clone();
        self.cursor += 1;

        let mut pixels = self.base.clone();
        if let Scene::Marker { kind, payload } = &scene {
            plant_marker(&mut pixels, *kind, payload);
        }

        self.frames_produced += 1;
        let frame = Frame::new(
            pixels,
            self.config.width,
            self.config.height,
            self.config.width as usize,
            PixelFormat::Gray8,
        )?;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_plays_in_order_then_ends() {
        let mut source = SyntheticSource::new(
            SyntheticConfig::default(),
            vec![
                Scene::Blank,
                Scene::marker(ResultKind::QrCode, b"a".to_vec()),
            ],
        );
        source.connect().expect("connect");

        let blank = source.next_frame().expect("frame").expect("some");
        assert_ne!(&blank.pixels()[0..2], &[0xa5, 0x3c]);

        let marked = source.next_frame().expect("frame").expect("some");
        assert_eq!(&marked.pixels()[0..2], &[0xa5, 0x3c]);

        assert!(source.next_frame().expect("frame").is_none());
        assert_eq!(source.frames_produced(), 2);
    }

    #[test]
    fn looped_script_replays() {
        let mut source = SyntheticSource::new(
            SyntheticConfig {
                looped: true,
                ..SyntheticConfig::default()
            },
            vec![Scene::Blank],
        );
        for _ in 0..5 {
            assert!(source.next_frame().expect("frame").is_some());
        }
        assert_eq!(source.frames_produced(), 5);
    }

    #[test]
    fn same_scene_produces_identical_pixels() {
        let config = SyntheticConfig::default();
        let script = vec![
            Scene::marker(ResultKind::Image, Vec::new()),
            Scene::marker(ResultKind::Image, Vec::new()),
        ];
        let mut source = SyntheticSource::new(config, script);
        let first = source.next_frame().expect("frame").expect("some");
        let second = source.next_frame().expect("frame").expect("some");
        assert_eq!(first.pixels(), second.pixels());
    }

    #[test]
    fn empty_script_is_end_of_stream() {
        let mut source = SyntheticSource::new(
            SyntheticConfig {
                looped: true,
                ..SyntheticConfig::default()
            },
            Vec::new(),
        );
        assert!(source.next_frame().expect("frame").is_none());
    }
}
