use std::sync::Mutex;

use tempfile::NamedTempFile;

use scan_kernel::config::ScanConfig;
use scan_kernel::ScanOptions;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SCAN_CONFIG",
        "SCAN_OPTIONS",
        "SCAN_CLEAR_AFTER_MISSES",
        "SCAN_FPS",
        "SCAN_SEED",
        "SCAN_ONLINE_LATENCY_MS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_when_nothing_is_configured() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = ScanConfig::load().expect("load config");
    assert_eq!(cfg.source.width, 640);
    assert_eq!(cfg.source.height, 480);
    assert_eq!(cfg.source.fps, 10);
    assert_eq!(cfg.options, ScanOptions::ALL);
    assert_eq!(cfg.clear_after_misses, 1);
    assert_eq!(cfg.online_latency.as_millis(), 150);

    clear_env();
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "source": {
            "width": 800,
            "height": 600,
            "fps": 12,
            "seed": 7
        },
        "session": {
            "options": ["qrcode", "ean13"],
            "clear_after_misses": 3
        },
        "online": {
            "latency_ms": 250
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("SCAN_CONFIG", file.path());
    std::env::set_var("SCAN_OPTIONS", "image");
    std::env::set_var("SCAN_FPS", "30");

    let cfg = ScanConfig::load().expect("load config");

    assert_eq!(cfg.source.width, 800);
    assert_eq!(cfg.source.height, 600);
    assert_eq!(cfg.source.fps, 30);
    assert_eq!(cfg.source.seed, 7);
    assert_eq!(cfg.options, ScanOptions::IMAGE);
    assert_eq!(cfg.clear_after_misses, 3);
    assert_eq!(cfg.online_latency.as_millis(), 250);

    clear_env();
}

#[test]
fn rejects_bad_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SCAN_OPTIONS", "qrc0de");
    assert!(ScanConfig::load().is_err());

    clear_env();
    std::env::set_var("SCAN_CLEAR_AFTER_MISSES", "0");
    assert!(ScanConfig::load().is_err());

    clear_env();
    std::env::set_var("SCAN_CLEAR_AFTER_MISSES", "lots");
    assert!(ScanConfig::load().is_err());

    clear_env();
}
