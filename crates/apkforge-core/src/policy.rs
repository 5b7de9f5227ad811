//! Failure policy configuration for pipeline execution

use serde::{Deserialize, Serialize};

/// Decides what happens after a failed (or warning-failed) step.
///
/// Loaded once from the `pipeline_behavior` section of the build
/// configuration before the run; immutable during the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelinePolicy {
    /// Pause for confirmation when a step fails
    #[serde(default = "default_stop_on_error")]
    pub stop_on_error: bool,

    /// Treat a step that completed with warnings as failed
    #[serde(default)]
    pub stop_on_warning: bool,

    /// Seconds before an unanswered confirmation auto-continues
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_stop_on_error() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for PipelinePolicy {
    fn default() -> Self {
        Self {
            stop_on_error: true,
            stop_on_warning: false,
            timeout_seconds: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = PipelinePolicy::default();
        assert!(policy.stop_on_error);
        assert!(!policy.stop_on_warning);
        assert_eq!(policy.timeout_seconds, 30);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let policy: PipelinePolicy = serde_json::from_str(r#"{"stop_on_warning": true}"#).unwrap();
        assert!(policy.stop_on_error);
        assert!(policy.stop_on_warning);
        assert_eq!(policy.timeout_seconds, 30);
    }

    #[test]
    fn test_full_config() {
        let policy: PipelinePolicy = serde_json::from_str(
            r#"{"stop_on_error": false, "stop_on_warning": true, "timeout_seconds": 5}"#,
        )
        .unwrap();
        assert!(!policy.stop_on_error);
        assert!(policy.stop_on_warning);
        assert_eq!(policy.timeout_seconds, 5);
    }
}
