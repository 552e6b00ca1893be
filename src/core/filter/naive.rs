// SPDX-License-Identifier: MIT OR Apache-2.0

//! Naive filter: flat keyword set, full substring scan per keyword.

use std::collections::HashSet;

use crate::core::filter::normalize::normalize;
use crate::core::filter::PatternFilter;

/// The simplest filter implementation. Fine for small keyword sets and cold
/// paths; cost grows with keywords × message length.
#[derive(Debug, Default, Clone)]
pub struct NaiveFilter {
    keywords: HashSet<String>,
}

impl NaiveFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored (normalized) keywords.
    pub fn keywords(&self) -> &HashSet<String> {
        &self.keywords
    }
}

impl PatternFilter for NaiveFilter {
    fn add_keyword(&mut self, raw: &str) {
        let keyword = normalize(raw);
        if !keyword.is_empty() {
            self.keywords.insert(keyword);
        }
    }

    fn filter_message(&self, message: &str, replacement: &str) -> String {
        let mut data = normalize(message);
        for keyword in &self.keywords {
            if data.contains(keyword.as_str()) {
                let mask = replacement.repeat(keyword.chars().count());
                data = data.replace(keyword.as_str(), &mask);
            }
        }
        data
    }

    fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    fn contains_keyword(&self, keyword: &str) -> bool {
        self.keywords.contains(&normalize(keyword))
    }
}
