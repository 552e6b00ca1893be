// SPDX-License-Identifier: MIT OR Apache-2.0

//! # syncstore_rust
//!
//! File-backed synchronized stores plus a streaming multi-pattern word
//! filter.
//!
//! The `core::sync` family keeps an in-memory mirror of a single file on
//! disk, detects external modifications by polling the file's modification
//! time, and layers typed views on top of the raw content: text, bytes, a
//! JSON value, a JSON object with per-key change handlers, and a JSON list
//! with optional de-duplication.
//!
//! The `core::filter` family redacts keywords from messages with three
//! interchangeable algorithms behind one trait: a naive substring scan, a
//! back-sorted-index scan, and a single-pass trie (DFA) scan.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use syncstore_rust::core::sync::JsonDictStore;
//!
//! let store = JsonDictStore::open("config.json", Duration::from_millis(100), false)?;
//! store.add_handler("maintenance", &["maintenance_mode"], |key, old, new| {
//!     println!("{key} changed: {old:?} -> {new:?}");
//! });
//! store.set("maintenance_mode", serde_json::json!(true))?;
//! ```

pub mod core;

pub use crate::core::error::{StoreError, StoreResult};
