// Messages posted to the worker by the host page
// Author: kelexine (https://github.com/kelexine)

use serde::{Deserialize, Serialize};

/// Messages understood by the worker's message interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Activate the waiting generation without waiting for clients to close.
    SkipWaiting,
}
