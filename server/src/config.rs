//! Runtime settings for one game session.

use std::time::Duration;

pub const DEFAULT_LEFT_IDENTITY: &str = "LEFT";
pub const DEFAULT_RIGHT_IDENTITY: &str = "RIGHT";
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Everything the session core needs, independent of how it was parsed.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub bind_addr: String,
    pub tick_duration: Duration,
    pub left_identity: String,
    pub right_identity: String,
}

impl SessionConfig {
    pub fn new(bind_addr: impl Into<String>, tick_rate: u32) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            tick_duration: tick_duration(tick_rate),
            left_identity: DEFAULT_LEFT_IDENTITY.to_string(),
            right_identity: DEFAULT_RIGHT_IDENTITY.to_string(),
        }
    }

    pub fn with_identities(mut self, left: &str, right: &str) -> Self {
        self.left_identity = normalize_identity(left, DEFAULT_LEFT_IDENTITY);
        self.right_identity = normalize_identity(right, DEFAULT_RIGHT_IDENTITY);
        self
    }
}

/// Converts a tick rate into the interval between ticks. A rate of zero is
/// treated as one tick per second.
pub fn tick_duration(tick_rate: u32) -> Duration {
    Duration::from_secs_f64(1.0 / tick_rate.max(1) as f64)
}

/// Identity labels are trimmed and uppercased; blank labels fall back.
pub fn normalize_identity(raw: &str, fallback: &str) -> String {
    let label = raw.trim().to_uppercase();
    if label.is_empty() {
        fallback.to_string()
    } else {
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_tick_duration_validation() {
        assert_approx_eq!(tick_duration(60).as_secs_f64(), 1.0 / 60.0, 1e-9);
        assert_approx_eq!(tick_duration(30).as_secs_f64(), 1.0 / 30.0, 1e-9);
        assert_eq!(tick_duration(0), Duration::from_secs(1));
    }

    #[test]
    fn test_identity_normalization() {
        assert_eq!(normalize_identity(" hp ", "LEFT"), "HP");
        assert_eq!(normalize_identity("   ", "LEFT"), "LEFT");
        assert_eq!(normalize_identity("", "RIGHT"), "RIGHT");
    }

    #[test]
    fn test_config_defaults() {
        let config = SessionConfig::new("127.0.0.1:6000", DEFAULT_TICK_RATE);
        assert_eq!(config.bind_addr, "127.0.0.1:6000");
        assert_eq!(config.left_identity, "LEFT");
        assert_eq!(config.right_identity, "RIGHT");

        let config = config.with_identities("rm", "");
        assert_eq!(config.left_identity, "RM");
        assert_eq!(config.right_identity, "RIGHT");
    }
}
