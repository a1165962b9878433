use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::game::constants::limits;

/// Which frame provider feeds the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Network camera polled over HTTP
    Remote,
    /// Local capture device
    Local,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(SourceKind::Remote),
            "local" => Ok(SourceKind::Local),
            other => Err(format!("unknown frame source '{}' (expected remote|local)", other)),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Remote => write!(f, "remote"),
            SourceKind::Local => write!(f, "local"),
        }
    }
}

/// Game configuration
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Tilt threshold in degrees (2-20)
    pub sensitivity: u32,
    /// Game speed (1-10)
    pub speed: u32,
    /// Negate the tilt angle before classifying
    pub invert_tilt: bool,
    /// Frame provider
    pub frame_source: SourceKind,
    /// Camera host[:port] for the remote source
    pub camera_host: String,
    /// Base URL of the landmark service; `None` runs without face tracking
    pub inference_url: Option<String>,
    /// Control loop rate (display refresh)
    pub refresh_hz: u32,
    /// Upper bound on a single frame fetch
    pub fetch_timeout: Duration,
    /// Upper bound on a single inference call
    pub inference_timeout: Duration,
    /// Frame rate of the synthetic local capture device
    pub local_fps: u32,
    /// Port for the metrics listener; disabled when `None`
    pub metrics_port: Option<u16>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            sensitivity: limits::SENSITIVITY_DEFAULT,
            speed: limits::SPEED_DEFAULT,
            invert_tilt: false,
            frame_source: SourceKind::Remote,
            // Default address of the camera's own access point
            camera_host: "192.168.4.1".to_string(),
            inference_url: None,
            refresh_hz: 60,
            fetch_timeout: Duration::from_millis(1000),
            inference_timeout: Duration::from_millis(1000),
            local_fps: 30,
            metrics_port: None,
        }
    }
}

/// Parse `key` as an integer in `[min, max]`, warning and returning `None` otherwise
fn ranged<T, F>(lookup: &F, key: &str, min: T, max: T) -> Option<T>
where
    T: FromStr + PartialOrd + fmt::Display + Copy,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) if v >= min && v <= max => Some(v),
        Ok(_) => {
            tracing::warn!("{} must be {}-{}, using default", key, min, max);
            None
        }
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", key, raw);
            None
        }
    }
}

/// Parse a boolean flag
pub fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl GameConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = ranged(&lookup, "SENSITIVITY", limits::SENSITIVITY_MIN, limits::SENSITIVITY_MAX) {
            config.sensitivity = v;
        }

        if let Some(v) = ranged(&lookup, "SPEED", limits::SPEED_MIN, limits::SPEED_MAX) {
            config.speed = v;
        }

        if let Some(raw) = lookup("INVERT_TILT") {
            match parse_flag(&raw) {
                Some(v) => config.invert_tilt = v,
                None => tracing::warn!("Invalid INVERT_TILT '{}', using default", raw),
            }
        }

        if let Some(raw) = lookup("FRAME_SOURCE") {
            match raw.parse() {
                Ok(kind) => config.frame_source = kind,
                Err(e) => tracing::warn!("{}, using default", e),
            }
        }

        if let Some(host) = lookup("CAMERA_HOST") {
            let host = host.trim();
            if host.is_empty() {
                tracing::warn!("CAMERA_HOST is empty, using default");
            } else {
                config.camera_host = host.to_string();
            }
        }

        if let Some(url) = lookup("INFERENCE_URL") {
            let url = url.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                config.inference_url = Some(url.to_string());
            } else if !url.is_empty() {
                tracing::warn!("INFERENCE_URL must be an http(s) URL, ignoring '{}'", url);
            }
        }

        if let Some(v) = ranged(&lookup, "REFRESH_HZ", 1u32, 240) {
            config.refresh_hz = v;
        }

        if let Some(ms) = ranged(&lookup, "FETCH_TIMEOUT_MS", 1u64, 60_000) {
            config.fetch_timeout = Duration::from_millis(ms);
        }

        if let Some(ms) = ranged(&lookup, "INFERENCE_TIMEOUT_MS", 1u64, 60_000) {
            config.inference_timeout = Duration::from_millis(ms);
        }

        if let Some(v) = ranged(&lookup, "LOCAL_FPS", 1u32, 120) {
            config.local_fps = v;
        }

        if let Some(port) = ranged(&lookup, "METRICS_PORT", 1u16, u16::MAX) {
            config.metrics_port = Some(port);
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if !(limits::SENSITIVITY_MIN..=limits::SENSITIVITY_MAX).contains(&self.sensitivity) {
            return Err(format!(
                "sensitivity must be {}-{}",
                limits::SENSITIVITY_MIN,
                limits::SENSITIVITY_MAX
            ));
        }
        if !(limits::SPEED_MIN..=limits::SPEED_MAX).contains(&self.speed) {
            return Err(format!("speed must be {}-{}", limits::SPEED_MIN, limits::SPEED_MAX));
        }
        if self.frame_source == SourceKind::Remote && self.camera_host.is_empty() {
            return Err("camera_host is required for the remote source".to_string());
        }
        if self.refresh_hz == 0 {
            return Err("refresh_hz must be at least 1".to_string());
        }
        if self.fetch_timeout.is_zero() || self.inference_timeout.is_zero() {
            return Err("timeouts must be non-zero".to_string());
        }
        Ok(())
    }

    /// Time between control loop iterations
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_hz.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> GameConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GameConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = GameConfig::default();
        assert_eq!(config.sensitivity, 8);
        assert_eq!(config.speed, 5);
        assert!(!config.invert_tilt);
        assert_eq!(config.frame_source, SourceKind::Remote);
        assert_eq!(config.camera_host, "192.168.4.1");
        assert!(config.inference_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = GameConfig::load_or_default();
        assert!(config.refresh_hz > 0);
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("SENSITIVITY", "12"),
            ("SPEED", "9"),
            ("INVERT_TILT", "true"),
            ("FRAME_SOURCE", "Local"),
            ("CAMERA_HOST", "10.0.0.7:8080"),
            ("INFERENCE_URL", "http://127.0.0.1:9000"),
            ("FETCH_TIMEOUT_MS", "250"),
            ("METRICS_PORT", "9090"),
        ]);
        assert_eq!(config.sensitivity, 12);
        assert_eq!(config.speed, 9);
        assert!(config.invert_tilt);
        assert_eq!(config.frame_source, SourceKind::Local);
        assert_eq!(config.camera_host, "10.0.0.7:8080");
        assert_eq!(config.inference_url.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(config.fetch_timeout, Duration::from_millis(250));
        assert_eq!(config.metrics_port, Some(9090));
    }

    #[test]
    fn test_out_of_range_falls_back() {
        let config = from_pairs(&[
            ("SENSITIVITY", "1"),
            ("SPEED", "11"),
            ("INVERT_TILT", "maybe"),
            ("FRAME_SOURCE", "usb"),
            ("CAMERA_HOST", "  "),
            ("INFERENCE_URL", "ftp://model"),
            ("REFRESH_HZ", "0"),
        ]);
        let defaults = GameConfig::default();
        assert_eq!(config.sensitivity, defaults.sensitivity);
        assert_eq!(config.speed, defaults.speed);
        assert_eq!(config.invert_tilt, defaults.invert_tilt);
        assert_eq!(config.frame_source, defaults.frame_source);
        assert_eq!(config.camera_host, defaults.camera_host);
        assert!(config.inference_url.is_none());
        assert_eq!(config.refresh_hz, defaults.refresh_hz);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = GameConfig::default();
        config.sensitivity = 30;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.speed = 0;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.camera_host.clear();
        assert!(config.validate().is_err());
        config.frame_source = SourceKind::Local;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_frame_interval() {
        let config = GameConfig::default();
        let interval = config.frame_interval();
        assert!(interval > Duration::from_millis(16) && interval < Duration::from_millis(17));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("ON"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("sure"), None);
    }
}
