//! Sync module for the authoritative document
//!
//! Provides:
//! - Bootstrap of the authoritative replica from the items table
//! - Merge of client replicas into it
//! - Persistence of the merged `items` after every merge
//!
//! # Sync Protocol
//!
//! 1. Client fetches the authoritative document (`GET /doc`)
//! 2. Client edits its local copy, possibly while offline
//! 3. Client posts the whole document (`POST /sync`)
//! 4. Server merges, rewrites the items table and returns the merged document
//!
//! # Consistency
//!
//! The in-memory merge is never rolled back. If the table write fails, the
//! server keeps serving the merged state and the next successful sync writes
//! it out again.

mod service;
mod types;

pub use service::SyncService;
pub use types::{DocPayload, SyncStage};
