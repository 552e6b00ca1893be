// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Streaming Pattern Filter
//!
//! Keyword redaction with three interchangeable algorithms behind one trait:
//!
//! - [`NaiveFilter`]: flat-set substring scan, O(keywords × message).
//! - [`IndexedFilter`]: back-sorted inverted index pruning which keywords
//!   are tried against a message.
//! - [`TrieFilter`]: single-pass trie (DFA) walk, O(message) after
//!   construction; the only variant safe for large keyword sets on a hot
//!   path.
//!
//! Keyword sets are append-only; there is no removal primitive. Filtering is
//! a pure function of the current keyword data, so the only synchronization
//! callers need is the usual read/write exclusion when `add_keyword` runs
//! concurrently with `filter_message`.
//!
//! All variants normalize keywords and messages the same way (lowercase,
//! trim, half-width); the redacted output is built from the normalized
//! message, so casing and width of unmatched spans are not preserved.

pub mod indexed;
pub mod naive;
pub mod normalize;
pub mod trie;

use std::fs;
use std::path::Path;

use crate::core::error::StoreResult;
use crate::core::filter::normalize::normalize;

pub use indexed::IndexedFilter;
pub use naive::NaiveFilter;
pub use trie::TrieFilter;

/// Common contract of the three filter variants.
pub trait PatternFilter {
    /// Normalize `raw` and add it to the keyword set. Empty-after-normalize
    /// input and repeated keywords are ignored.
    fn add_keyword(&mut self, raw: &str);

    /// Redact every stored keyword from `message`, replacing each matched
    /// character with one copy of `replacement` (length-preserving).
    /// Returns the normalized, redacted message.
    fn filter_message(&self, message: &str, replacement: &str) -> String;

    /// Number of distinct stored keywords.
    fn keyword_count(&self) -> usize;

    /// True when `keyword` (after normalization) is stored.
    fn contains_keyword(&self, keyword: &str) -> bool;

    /// Load keywords from a newline-delimited UTF-8 file, one raw keyword
    /// per line. Lines that normalize to empty are skipped. Returns the
    /// number of non-empty lines consumed.
    fn load_keywords(&mut self, path: &Path) -> StoreResult<usize>
    where
        Self: Sized,
    {
        let content = fs::read_to_string(path)?;
        let mut loaded = 0;
        for line in content.lines() {
            if normalize(line).is_empty() {
                continue;
            }
            self.add_keyword(line);
            loaded += 1;
        }
        Ok(loaded)
    }
}
