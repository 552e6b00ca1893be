// SPDX-License-Identifier: MIT OR Apache-2.0

//! Indexed filter: a back-sorted inverted index prunes which keywords are
//! tried against a message.
//!
//! Pure-ASCII-alphanumeric tokens index (and look up) whole words; anything
//! else indexes per character, because keyword boundaries are not guaranteed
//! to be whitespace-delimited in non-Latin scripts.

use std::collections::{BTreeSet, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::filter::normalize::normalize;
use crate::core::filter::PatternFilter;

static ASCII_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-zA-Z]+$").expect("ASCII token pattern is valid")
});

/// Filter with a reverse index from token/character to keyword positions.
///
/// Reduces full scans against keywords sharing no token or character with
/// the message, at the cost of index maintenance and occasional redundant
/// replacement attempts.
#[derive(Debug, Default, Clone)]
pub struct IndexedFilter {
    keywords: Vec<String>,
    keyword_set: HashSet<String>,
    index: HashMap<String, BTreeSet<usize>>,
}

impl IndexedFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored (normalized) keywords.
    pub fn keywords(&self) -> &HashSet<String> {
        &self.keyword_set
    }

    fn replace_candidates(&self, data: &mut String, positions: &BTreeSet<usize>, replacement: &str) {
        for &position in positions {
            let keyword = &self.keywords[position];
            if data.contains(keyword.as_str()) {
                let mask = replacement.repeat(keyword.chars().count());
                *data = data.replace(keyword.as_str(), &mask);
            }
        }
    }
}

impl PatternFilter for IndexedFilter {
    fn add_keyword(&mut self, raw: &str) {
        let keyword = normalize(raw);
        if keyword.is_empty() || self.keyword_set.contains(&keyword) {
            return;
        }
        self.keywords.push(keyword.clone());
        self.keyword_set.insert(keyword.clone());
        let position = self.keywords.len() - 1;

        for word in keyword.split_whitespace() {
            if ASCII_TOKEN.is_match(word) {
                self.index.entry(word.to_string()).or_default().insert(position);
            } else {
                for ch in word.chars() {
                    self.index.entry(ch.to_string()).or_default().insert(position);
                }
            }
        }
    }

    fn filter_message(&self, message: &str, replacement: &str) -> String {
        let mut data = normalize(message);
        let tokens: Vec<String> = data.split_whitespace().map(str::to_string).collect();

        for token in &tokens {
            if ASCII_TOKEN.is_match(token) {
                if let Some(positions) = self.index.get(token) {
                    self.replace_candidates(&mut data, positions, replacement);
                }
            } else {
                for ch in token.chars() {
                    if let Some(positions) = self.index.get(ch.to_string().as_str()) {
                        self.replace_candidates(&mut data, positions, replacement);
                    }
                }
            }
        }
        data
    }

    fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    fn contains_keyword(&self, keyword: &str) -> bool {
        self.keyword_set.contains(&normalize(keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_token_lookup() {
        let mut filter = IndexedFilter::new();
        filter.add_keyword("badword");
        assert_eq!(
            filter.filter_message("this is a BadWord test", "*"),
            "this is a ******* test"
        );
    }

    #[test]
    fn test_unindexed_token_left_alone() {
        let mut filter = IndexedFilter::new();
        filter.add_keyword("badword");
        assert_eq!(filter.filter_message("perfectly fine", "*"), "perfectly fine");
    }

    #[test]
    fn test_per_character_lookup_for_non_ascii() {
        let mut filter = IndexedFilter::new();
        filter.add_keyword("秘密");
        // Non-Latin keywords are found through character-level indexing even
        // without whitespace boundaries.
        assert_eq!(filter.filter_message("これは秘密です", "*"), "これは**です");
    }

    #[test]
    fn test_multi_word_keyword() {
        let mut filter = IndexedFilter::new();
        filter.add_keyword("bad word");
        assert_eq!(filter.filter_message("a bad word here", "*"), "a ******** here");
    }

    #[test]
    fn test_duplicate_add_keeps_one_position() {
        let mut filter = IndexedFilter::new();
        filter.add_keyword("dup");
        filter.add_keyword("dup");
        assert_eq!(filter.keyword_count(), 1);
    }
}
