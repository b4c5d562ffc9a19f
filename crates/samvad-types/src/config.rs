//! Runtime configuration types.
//!
//! Deserialized from `{data_dir}/config.toml` by the infra crate. All
//! session policy values are bounded tunables, not correctness parameters:
//! the coordinator is correct for any positive choice.

use serde::{Deserialize, Serialize};

/// Policy knobs for live session handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
    /// Seconds a fully-disconnected session may linger in `paused` before
    /// ending with reason `timeout`.
    pub grace_secs: u64,
    /// Seconds without a heartbeat before a connection is force-detached.
    pub heartbeat_window_secs: u64,
    /// Cadence of the liveness sweep that enforces the heartbeat window.
    pub liveness_sweep_secs: u64,
    /// Bound on each connection's outbound frame queue. A connection whose
    /// queue overflows is force-detached instead of stalling the session.
    pub outbound_buffer: usize,
    /// Client-side contract: a typing indicator not refreshed within this
    /// window must be treated as false by observers.
    pub typing_expiry_secs: u64,
    /// Maximum accepted chat message body, in bytes.
    pub max_body_bytes: usize,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            grace_secs: 45,
            heartbeat_window_secs: 30,
            liveness_sweep_secs: 5,
            outbound_buffer: 64,
            typing_expiry_secs: 6,
            max_body_bytes: 4096,
        }
    }
}

/// Top-level configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub session: SessionPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults() {
        let policy = SessionPolicy::default();
        assert_eq!(policy.grace_secs, 45);
        assert_eq!(policy.heartbeat_window_secs, 30);
        assert_eq!(policy.outbound_buffer, 64);
        assert!(policy.max_body_bytes > 0);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: GlobalConfig = serde_json::from_str(r#"{"session":{"grace_secs":10}}"#).unwrap();
        assert_eq!(config.session.grace_secs, 10);
        assert_eq!(config.session.heartbeat_window_secs, 30);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: GlobalConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.session.grace_secs, SessionPolicy::default().grace_secs);
    }
}
