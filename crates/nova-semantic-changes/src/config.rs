use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning knobs for the semantic-change pipelines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SemanticChangeConfig {
    /// Quiet period (in milliseconds) the document pipeline waits for after the last edit before
    /// processing anything.
    #[serde(default = "default_document_backoff_ms")]
    pub document_backoff_ms: u64,
    /// Quiet period (in milliseconds) for the project pipeline. Project expansion is expensive,
    /// so this is longer than the document back-off.
    #[serde(default = "default_project_backoff_ms")]
    pub project_backoff_ms: u64,
    /// Buffer size of the structured event channel. Slow subscribers lag rather than block.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_document_backoff_ms() -> u64 {
    100
}

fn default_project_backoff_ms() -> u64 {
    500
}

fn default_event_channel_capacity() -> usize {
    1024
}

impl SemanticChangeConfig {
    pub fn document_backoff(&self) -> Duration {
        Duration::from_millis(self.document_backoff_ms)
    }

    pub fn project_backoff(&self) -> Duration {
        Duration::from_millis(self.project_backoff_ms)
    }
}

impl Default for SemanticChangeConfig {
    fn default() -> Self {
        Self {
            document_backoff_ms: default_document_backoff_ms(),
            project_backoff_ms: default_project_backoff_ms(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}
