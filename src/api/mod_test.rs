use super::{Config, filter_for_verbosity};
use serial_test::serial;
use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

const OVERRIDES: [&str; 4] = [
    "DOCUFLOW_PORT",
    "DOCUFLOW_HOST",
    "DOCUFLOW_IDLE_THRESHOLD_SECS",
    "DOCUFLOW_MAX_SCREENSHOT_BYTES",
];

fn clear_overrides() {
    for key in OVERRIDES {
        unsafe {
            env::remove_var(key);
        }
    }
}

#[test]
fn test_config_defaults() {
    let config = Config::default();
    assert_eq!(config.port, 3737);
    assert_eq!(config.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    assert_eq!(config.idle_threshold_secs, 300);
    assert_eq!(config.auto_stop_after_secs, 1800);
    assert_eq!(config.max_screenshot_bytes, 10 * 1024 * 1024);
    assert!(!config.enable_docs);
}

#[test]
#[serial]
fn test_config_from_env_reads_overrides() {
    clear_overrides();
    unsafe {
        env::set_var("DOCUFLOW_PORT", "8080");
        env::set_var("DOCUFLOW_HOST", "127.0.0.1");
        env::set_var("DOCUFLOW_IDLE_THRESHOLD_SECS", "120");
    }

    let config = Config::from_env(PathBuf::from("/tmp/docuflow-test"));
    assert_eq!(config.port, 8080);
    assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(config.idle_threshold_secs, 120);
    assert_eq!(config.data_dir, PathBuf::from("/tmp/docuflow-test"));

    clear_overrides();
}

#[test]
#[serial]
fn test_config_from_env_ignores_garbage() {
    clear_overrides();
    unsafe {
        env::set_var("DOCUFLOW_PORT", "not-a-port");
        env::set_var("DOCUFLOW_MAX_SCREENSHOT_BYTES", "-5");
    }

    let config = Config::from_env(PathBuf::from("."));
    assert_eq!(config.port, 3737);
    assert_eq!(config.max_screenshot_bytes, 10 * 1024 * 1024);

    clear_overrides();
}

#[test]
fn test_verbosity_filters() {
    assert_eq!(filter_for_verbosity(0), "docuflow=warn,tower_http=warn");
    assert_eq!(filter_for_verbosity(1), "docuflow=info,tower_http=info");
    assert_eq!(filter_for_verbosity(2), "docuflow=debug,tower_http=debug");
    assert_eq!(filter_for_verbosity(9), "docuflow=trace,tower_http=trace");
}
