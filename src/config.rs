use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::result::ScanOptions;
use crate::session::SessionConfig;

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_FPS: u32 = 10;
const DEFAULT_SEED: u64 = 0;
const DEFAULT_CLEAR_AFTER_MISSES: u32 = 1;
const DEFAULT_ONLINE_LATENCY_MS: u64 = 150;

#[derive(Debug, Deserialize, Default)]
struct ScanConfigFile {
    source: Option<SourceConfigFile>,
    session: Option<SessionConfigFile>,
    online: Option<OnlineConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct SessionConfigFile {
    options: Option<Vec<String>>,
    clear_after_misses: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct OnlineConfigFile {
    latency_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub seed: u64,
}

/// Configuration for the demo daemon (`scandemo`).
///
/// Loaded from an optional JSON file named by `SCAN_CONFIG`, with per-field
/// environment overrides on top, then validated.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub source: SourceSettings,
    pub options: ScanOptions,
    pub clear_after_misses: u32,
    pub online_latency: Duration,
}

impl ScanConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SCAN_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Session knobs as the session consumes them.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            options: self.options,
            clear_after_misses: self.clear_after_misses,
        }
    }

    fn from_file(file: ScanConfigFile) -> Result<Self> {
        let source = SourceSettings {
            width: file
                .source
                .as_ref()
                .and_then(|source| source.width)
                .unwrap_or(DEFAULT_WIDTH),
            height: file
                .source
                .as_ref()
                .and_then(|source| source.height)
                .unwrap_or(DEFAULT_HEIGHT),
            fps: file
                .source
                .as_ref()
                .and_then(|source| source.fps)
                .unwrap_or(DEFAULT_FPS),
            seed: file
                .source
                .as_ref()
                .and_then(|source| source.seed)
                .unwrap_or(DEFAULT_SEED),
        };
        let options = match file.session.as_ref().and_then(|session| session.options.as_ref()) {
            Some(labels) => ScanOptions::from_labels(labels)?,
            None => ScanOptions::ALL,
        };
        let clear_after_misses = file
            .session
            .and_then(|session| session.clear_after_misses)
            .unwrap_or(DEFAULT_CLEAR_AFTER_MISSES);
        let online_latency = Duration::from_millis(
            file.online
                .and_then(|online| online.latency_ms)
                .unwrap_or(DEFAULT_ONLINE_LATENCY_MS),
        );
        Ok(Self {
            source,
            options,
            clear_after_misses,
            online_latency,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(options) = std::env::var("SCAN_OPTIONS") {
            let labels = split_csv(&options);
            if !labels.is_empty() {
                self.options = ScanOptions::from_labels(&labels)?;
            }
        }
        if let Ok(clear) = std::env::var("SCAN_CLEAR_AFTER_MISSES") {
            self.clear_after_misses = clear
                .parse()
                .map_err(|_| anyhow!("SCAN_CLEAR_AFTER_MISSES must be an integer"))?;
        }
        if let Ok(fps) = std::env::var("SCAN_FPS") {
            self.source.fps = fps
                .parse()
                .map_err(|_| anyhow!("SCAN_FPS must be an integer"))?;
        }
        if let Ok(seed) = std::env::var("SCAN_SEED") {
            self.source.seed = seed
                .parse()
                .map_err(|_| anyhow!("SCAN_SEED must be an integer"))?;
        }
        if let Ok(latency) = std::env::var("SCAN_ONLINE_LATENCY_MS") {
            let millis: u64 = latency
                .parse()
                .map_err(|_| anyhow!("SCAN_ONLINE_LATENCY_MS must be an integer number of milliseconds"))?;
            self.online_latency = Duration::from_millis(millis);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source dimensions must be non-zero"));
        }
        if self.options.is_empty() {
            return Err(anyhow!("at least one scan option must be enabled"));
        }
        if self.clear_after_misses == 0 {
            return Err(anyhow!("clear_after_misses must be at least 1"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ScanConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
