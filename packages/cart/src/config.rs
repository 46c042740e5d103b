use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Synchronizer tuning, usually embedded in the client config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Re-fetch the full cart after every accepted mutation
    #[serde(default = "default_refetch")]
    pub refetch_after_mutation: bool,

    /// Per-request limit for remote calls; unset means wait indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,

    /// Buffered cart events per subscriber
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_refetch() -> bool {
    true
}

fn default_event_capacity() -> usize {
    64
}

impl SyncConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refetch_after_mutation: default_refetch(),
            request_timeout_ms: None,
            event_capacity: default_event_capacity(),
        }
    }
}
