//! scandemo - end-to-end synthetic run of the Visual Scan Kernel
//!
//! Wires a looped synthetic source and the stub engine into a scan session,
//! logs every delegate notification as a JSON line, and optionally exercises
//! the snap/cancel path while the capture runs.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use scan_kernel::{
    EngineError, ResultKind, ScanConfig, ScanResult, ScanSession, Scene, SessionDelegate,
    SessionState, StubEngine, StubEngineConfig, SyntheticConfig, SyntheticSource,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Duration in seconds; 0 runs until interrupted.
    #[arg(long, default_value_t = 5)]
    seconds: u64,
    /// Arm an online snap after this many seconds.
    #[arg(long)]
    snap_after: Option<u64>,
    /// Cancel the snap shortly after arming it.
    #[arg(long, default_value_t = false)]
    cancel_snap: bool,
    /// Frames per second for the synthetic source (overrides config).
    #[arg(long)]
    fps: Option<u32>,
    /// Deterministic seed for the synthetic scene (overrides config).
    #[arg(long)]
    seed: Option<u64>,
}

struct JsonDelegate {
    results: AtomicU64,
    failures: AtomicU64,
}

impl JsonDelegate {
    fn new() -> Self {
        Self {
            results: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }
}

impl SessionDelegate for JsonDelegate {
    fn did_scan(&self, result: &ScanResult) {
        self.results.fetch_add(1, Ordering::SeqCst);
        log::info!(
            "{}",
            serde_json::json!({
                "event": "scan",
                "kind": result.kind().label(),
                "value": result.value(),
            })
        );
    }

    fn did_fail(&self, error: &EngineError) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        log::warn!(
            "{}",
            serde_json::json!({
                "event": "failure",
                "reason": error.to_string(),
            })
        );
    }

    fn state_changed(&self, state: SessionState) {
        log::info!(
            "{}",
            serde_json::json!({
                "event": "state",
                "state": state.as_str(),
            })
        );
    }
}

/// Showcase scene: background, a QR code, background, a barcode, background,
/// an image-match subject, on repeat.
fn showcase_script() -> Vec<Scene> {
    let mut script = Vec::new();
    script.extend(std::iter::repeat_with(|| Scene::Blank).take(5));
    script.extend(
        std::iter::repeat_with(|| Scene::marker(ResultKind::QrCode, b"https://example.com/demo".to_vec()))
            .take(10),
    );
    script.extend(std::iter::repeat_with(|| Scene::Blank).take(5));
    script.extend(
        std::iter::repeat_with(|| Scene::marker(ResultKind::Ean13, b"4006381333931".to_vec()))
            .take(10),
    );
    script.extend(std::iter::repeat_with(|| Scene::Blank).take(5));
    script.extend(std::iter::repeat_with(|| Scene::marker(ResultKind::Image, Vec::new())).take(10));
    script
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = ScanConfig::load()?;
    if let Some(fps) = args.fps {
        if fps == 0 {
            return Err(anyhow!("fps must be >= 1"));
        }
        cfg.source.fps = fps;
    }
    if let Some(seed) = args.seed {
        cfg.source.seed = seed;
    }

    let source = SyntheticSource::new(
        SyntheticConfig {
            width: cfg.source.width,
            height: cfg.source.height,
            fps: cfg.source.fps,
            seed: cfg.source.seed,
            looped: true,
        },
        showcase_script(),
    );
    let engine = StubEngine::new(StubEngineConfig {
        online_latency: cfg.online_latency,
    });

    let delegate = Arc::new(JsonDelegate::new());
    let mut session = ScanSession::new(Box::new(engine), &delegate, cfg.session_config());

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })
    .map_err(|e| anyhow!("failed to install signal handler: {}", e))?;

    session.start_capture(Box::new(source))?;
    log::info!(
        "scandemo running: options={:?} fps={} seconds={}",
        cfg.options.labels(),
        cfg.source.fps,
        args.seconds
    );

    let started = Instant::now();
    let mut snap_issued_at: Option<Instant> = None;
    while running.load(Ordering::SeqCst) && session.is_capturing() {
        if args.seconds > 0 && started.elapsed() >= Duration::from_secs(args.seconds) {
            break;
        }
        if let Some(snap_after) = args.snap_after {
            if snap_issued_at.is_none() && started.elapsed() >= Duration::from_secs(snap_after) {
                let armed = session.snap();
                log::info!("snap requested, armed={}", armed);
                if armed {
                    snap_issued_at = Some(Instant::now());
                }
            }
        }
        if args.cancel_snap {
            if let Some(issued) = snap_issued_at {
                if session.state() == SessionState::Searching
                    && issued.elapsed() >= Duration::from_millis(50)
                {
                    let cancelled = session.cancel();
                    log::info!("snap cancel requested, applied={}", cancelled);
                }
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    let admitted = session.stop_capture()?;
    log::info!(
        "scandemo done: {} frames admitted, {} results, {} failures",
        admitted,
        delegate.results.load(Ordering::SeqCst),
        delegate.failures.load(Ordering::SeqCst)
    );
    Ok(())
}
