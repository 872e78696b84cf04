//! Replicated document store
//!
//! Wraps an automerge document whose root holds a single `items` list.
//! Each entry of the list is a map keyed by the [`ItemRecord`] field names.
//!
//! # Operations
//!
//! - `Replica::init_empty` - fresh document with an empty `items` list
//! - `Replica::decode` / `Replica::encode` - binary load/save
//! - `Replica::merge` - conflict-free merge of another replica
//! - `Replica::set_items` - wholesale replacement, used when rehydrating from SQL
//!
//! Merge conflicts are resolved by automerge's own rules. Nothing here
//! reimplements or overrides them.

mod item;
mod replica;

pub use item::{field, parse_date, ItemRecord};
pub use replica::{DocumentError, Replica, ITEMS_KEY};
