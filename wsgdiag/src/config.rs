//! Console configuration.
//!
//! Defaults match the reference deployment. `from_env()` applies the
//! `WSGDIAG_*` overrides; unparsable values fall back to the default.

use crate::interp::sticky;
use crate::link::{framer, DEFAULT_BAUD, DEFAULT_DEVICE};
use crate::queue;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TICK_MS: u64 = 250;
pub const DEFAULT_RAW_CLEAR_EVERY_S: u64 = 5 * 60;
pub const DEFAULT_STATUS_CLEAR_EVERY_S: u64 = 24 * 60 * 60;

/// Smallest queue that still has distinct half-full and near-full marks.
pub const MIN_QUEUE_CAPACITY: usize = queue::ALMOST_FULL_MARGIN + 1;

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    pub device: String,
    pub baud: u32,
    pub tick_interval: Duration,
    pub queue_capacity: usize,
    pub max_line_len: usize,
    pub sticky_period_s: u32,
    pub raw_clear_every_s: u64,
    pub status_clear_every_s: u64,
    pub log_dir: PathBuf,
}

impl Default for ConsoleConfig {
    fn default() -> ConsoleConfig {
        ConsoleConfig {
            device: DEFAULT_DEVICE.to_string(),
            baud: DEFAULT_BAUD,
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            queue_capacity: queue::DEFAULT_CAPACITY,
            max_line_len: framer::DEFAULT_MAX_LINE_LEN,
            sticky_period_s: sticky::DEFAULT_PERIOD_S,
            raw_clear_every_s: DEFAULT_RAW_CLEAR_EVERY_S,
            status_clear_every_s: DEFAULT_STATUS_CLEAR_EVERY_S,
            log_dir: PathBuf::from("."),
        }
    }
}

impl ConsoleConfig {
    pub fn from_env() -> ConsoleConfig {
        ConsoleConfig::from_lookup(|key| env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> ConsoleConfig {
        let mut cfg = ConsoleConfig::default();
        if let Some(device) = lookup("WSGDIAG_DEVICE") {
            if !device.trim().is_empty() {
                cfg.device = device.trim().to_string();
            }
        }
        if let Some(baud) = lookup("WSGDIAG_BAUD") {
            cfg.baud = baud.trim().parse().unwrap_or(cfg.baud);
        }
        if let Some(ms) = lookup("WSGDIAG_TICK_MS") {
            match ms.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => cfg.tick_interval = Duration::from_millis(ms),
                _ => {}
            }
        }
        if let Some(req) = lookup("WSGDIAG_QUEUE_CAPACITY") {
            cfg.queue_capacity = std::cmp::max(
                req.trim().parse().unwrap_or(cfg.queue_capacity),
                MIN_QUEUE_CAPACITY,
            );
        }
        if let Some(dir) = lookup("WSGDIAG_LOG_DIR") {
            if !dir.is_empty() {
                cfg.log_dir = PathBuf::from(dir);
            }
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn with(vars: &[(&str, &str)]) -> ConsoleConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConsoleConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = ConsoleConfig::default();
        assert_eq!(cfg.device, "/dev/ttyUSB0");
        assert_eq!(cfg.baud, 115200);
        assert_eq!(cfg.tick_interval, Duration::from_millis(250));
        assert_eq!(cfg.queue_capacity, 200);
        assert_eq!(cfg.sticky_period_s, 600);
        assert_eq!(with(&[]), cfg);
    }

    #[test]
    fn overrides() {
        let cfg = with(&[
            ("WSGDIAG_DEVICE", "/dev/ttyACM1"),
            ("WSGDIAG_BAUD", "9600"),
            ("WSGDIAG_TICK_MS", "100"),
            ("WSGDIAG_QUEUE_CAPACITY", "500"),
            ("WSGDIAG_LOG_DIR", "/var/log/wsg"),
        ]);
        assert_eq!(cfg.device, "/dev/ttyACM1");
        assert_eq!(cfg.baud, 9600);
        assert_eq!(cfg.tick_interval, Duration::from_millis(100));
        assert_eq!(cfg.queue_capacity, 500);
        assert_eq!(cfg.log_dir, PathBuf::from("/var/log/wsg"));
    }

    #[test]
    fn bad_values_fall_back() {
        let cfg = with(&[
            ("WSGDIAG_BAUD", "fast"),
            ("WSGDIAG_TICK_MS", "0"),
            ("WSGDIAG_QUEUE_CAPACITY", "4"),
        ]);
        assert_eq!(cfg.baud, 115200);
        assert_eq!(cfg.tick_interval, Duration::from_millis(250));
        assert_eq!(cfg.queue_capacity, MIN_QUEUE_CAPACITY);

        let cfg = with(&[("WSGDIAG_QUEUE_CAPACITY", "lots")]);
        assert_eq!(cfg.queue_capacity, 200);
    }
}
