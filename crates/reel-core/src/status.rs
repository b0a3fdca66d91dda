//! Session status.

use serde::{Deserialize, Serialize};

/// Recording session status.
///
/// `Finishing` is transient: it covers closing the last segment, merging it
/// and exporting, and always resolves back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// No recording attempt in progress.
    #[default]
    Idle,
    /// A segment is capturing.
    Recording,
    /// Capture is suspended between segments.
    Paused,
    /// Last segment closing, merge and export in flight.
    Finishing,
}
