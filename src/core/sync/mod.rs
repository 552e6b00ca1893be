// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Synchronized File Stores
//!
//! A layered abstraction over a single file on disk:
//!
//! - [`TextMirror`] / [`BytesMirror`]: the leaf primitive with a content
//!   cache, modification-time polling and reload hooks.
//! - [`JsonMirror`]: lazy, lenient JSON parsing on top of a text mirror.
//! - [`JsonDictStore`]: object semantics plus per-key [`ChangeHandler`]s.
//! - [`JsonListStore`]: list semantics plus optional de-duplication.
//!
//! Each store owns at most one background polling thread. The store count in
//! a process is expected to be small and bounded at startup (config files,
//! blacklists), so per-instance threads are a deliberate simplicity
//! tradeoff. Cross-process consistency is eventual, last-writer-wins at the
//! file level, bounded by the poll interval.

pub mod bytes;
pub mod dict;
pub mod json;
pub mod list;
pub mod mirror;
pub mod text;

pub use bytes::BytesMirror;
pub use dict::{ChangeHandler, JsonDictStore, ACCESS_TOKEN_KEY, PRIVATE_KEY};
pub use json::{DecodeErrorHook, JsonMirror};
pub use list::{json_cmp, JsonListStore};
pub use mirror::{MirrorContent, ReloadEvent, ReloadHook};
pub use text::TextMirror;
