//! Sync data types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Request and response body of `/doc` and `/sync`
///
/// The document travels as a JSON array of byte values rather than as a
/// binary body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocPayload {
    pub doc: Vec<u8>,
}

impl DocPayload {
    pub fn new(doc: Vec<u8>) -> Self {
        Self { doc }
    }
}

/// Progress of a single sync request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Received,
    Decoded,
    Merged,
    Persisted,
    Responded,
    Failed,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStage::Received => "received",
            SyncStage::Decoded => "decoded",
            SyncStage::Merged => "merged",
            SyncStage::Persisted => "persisted",
            SyncStage::Responded => "responded",
            SyncStage::Failed => "failed",
        };
        f.write_str(name)
    }
}
