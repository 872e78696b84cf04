//! Docsync Server Library
//!
//! Keeps one automerge document authoritative on the server, merges client
//! copies into it and mirrors its `items` into a relational table.
//!
//! # Modules
//!
//! - `document`: the CRDT replica and the `ItemRecord` shape
//! - `db`: the items table adapter (full-table rewrite)
//! - `sync`: bootstrap and the merge-then-persist pipeline
//! - `routes`: `GET /doc`, `POST /sync`, `/health`

pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod routes;
pub mod state;
pub mod sync;
