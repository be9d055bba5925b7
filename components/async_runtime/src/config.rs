//! Event loop configuration.

use serde::{Deserialize, Serialize};

/// Default maximum call stack depth.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Tunable limits for an [`EventLoop`](crate::EventLoop).
///
/// All fields have defaults, so a partial JSON document deserializes cleanly:
///
/// ```
/// use async_runtime::EventLoopConfig;
///
/// let config: EventLoopConfig = serde_json::from_str(r#"{ "max_turns": 50 }"#).unwrap();
/// assert_eq!(config.max_turns, Some(50));
/// assert_eq!(config.max_call_depth, 10_000);
/// assert!(config.report_unhandled_rejections);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLoopConfig {
    /// Frames allowed on the call stack before a `RangeError` is raised
    pub max_call_depth: usize,
    /// Macrotask turns the loop may execute over its lifetime
    pub max_turns: Option<u64>,
    /// Microtasks a single checkpoint may run before giving up
    pub microtask_checkpoint_limit: Option<usize>,
    /// Whether unhandled rejections are passed to the error reporter at idle
    pub report_unhandled_rejections: bool,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_turns: None,
            microtask_checkpoint_limit: None,
            report_unhandled_rejections: true,
        }
    }
}

impl EventLoopConfig {
    /// Sets the maximum call stack depth.
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Sets the turn limit.
    pub fn with_max_turns(mut self, turns: u64) -> Self {
        self.max_turns = Some(turns);
        self
    }

    /// Sets the per-checkpoint microtask limit.
    pub fn with_microtask_checkpoint_limit(mut self, limit: usize) -> Self {
        self.microtask_checkpoint_limit = Some(limit);
        self
    }

    /// Enables or disables unhandled rejection reports.
    pub fn with_report_unhandled_rejections(mut self, enabled: bool) -> Self {
        self.report_unhandled_rejections = enabled;
        self
    }
}
