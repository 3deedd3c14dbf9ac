use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use crate::capture::CaptureSettings;
use crate::constants::*;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub detector: DetectorConfig,
    pub monitor: MonitorConfig,
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    pub gaze_threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub required_seconds: f64,
    pub target_fps: u32,
    pub retry_backoff_ms: u64,
    pub max_consecutive_failures: u32,
    pub stop_timeout_ms: u64,
    pub auto_start: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub replay_path: String,
    pub replay_loop: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            gaze_threshold: DEFAULT_GAZE_THRESHOLD,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            required_seconds: DEFAULT_REQUIRED_SECONDS,
            target_fps: DEFAULT_TARGET_FPS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
            auto_start: false,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            fps: DEFAULT_CAPTURE_FPS,
            replay_path: DEFAULT_REPLAY_PATH.to_string(),
            replay_loop: true,
        }
    }
}

impl MonitorConfig {
    pub fn required_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.required_seconds)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_REQUIRED_SECONDS))
    }

    /// 目标帧间隔 `1 / target_fps`
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.target_fps.max(1)))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.required_seconds.is_finite() || self.required_seconds < 0.0 {
            return Err("monitor.required_seconds must be a finite value >= 0".to_string());
        }
        if self.target_fps == 0 {
            return Err("monitor.target_fps must be > 0".to_string());
        }
        if self.stop_timeout_ms == 0 {
            return Err("monitor.stop_timeout_ms must be > 0".to_string());
        }
        Ok(())
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.gaze_threshold > 0.0 && self.gaze_threshold <= 0.5) {
            return Err("detector.gaze_threshold must be in (0, 0.5]".to_string());
        }
        Ok(())
    }
}

impl CaptureConfig {
    pub fn settings(&self) -> CaptureSettings {
        CaptureSettings {
            width: self.width,
            height: self.height,
            fps: self.fps,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("capture.width and capture.height must be > 0".to_string());
        }
        if self.fps == 0 {
            return Err("capture.fps must be > 0".to_string());
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            detector: DetectorConfig {
                gaze_threshold: env_or_parse("GAZE_THRESHOLD", DEFAULT_GAZE_THRESHOLD),
            },
            monitor: MonitorConfig {
                required_seconds: env_or_parse("REQUIRED_SECONDS", DEFAULT_REQUIRED_SECONDS),
                target_fps: env_or_parse("TARGET_FPS", DEFAULT_TARGET_FPS),
                retry_backoff_ms: env_or_parse("CAPTURE_RETRY_BACKOFF_MS", DEFAULT_RETRY_BACKOFF_MS),
                max_consecutive_failures: env_or_parse(
                    "CAPTURE_MAX_CONSECUTIVE_FAILURES",
                    DEFAULT_MAX_CONSECUTIVE_FAILURES,
                ),
                stop_timeout_ms: env_or_parse("MONITOR_STOP_TIMEOUT_MS", DEFAULT_STOP_TIMEOUT_MS),
                auto_start: env_or_bool("MONITOR_AUTO_START", false),
            },
            capture: CaptureConfig {
                width: env_or_parse("CAPTURE_WIDTH", DEFAULT_CAPTURE_WIDTH),
                height: env_or_parse("CAPTURE_HEIGHT", DEFAULT_CAPTURE_HEIGHT),
                fps: env_or_parse("CAPTURE_FPS", DEFAULT_CAPTURE_FPS),
                replay_path: env_or("REPLAY_PATH", DEFAULT_REPLAY_PATH),
                replay_loop: env_or_bool("REPLAY_LOOP", true),
            },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.detector.validate()?;
        self.monitor.validate()?;
        self.capture.validate()?;
        Ok(())
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
