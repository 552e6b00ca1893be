// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trie filter: a character trie walked once per message.
//!
//! Matching is shortest-match, left to right, non-overlapping: at each
//! unconsumed offset the walk stops at the first terminal it reaches, the
//! matched span is redacted, and scanning resumes after it. A walk that dies
//! without a terminal emits one character and advances by one. Total work is
//! O(message length) regardless of keyword-set size.

use std::collections::HashMap;

use crate::core::filter::normalize::normalize;
use crate::core::filter::PatternFilter;

#[derive(Debug, Default, Clone)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    terminal: bool,
}

/// The DFA-style filter. Construction costs O(total keyword characters);
/// filtering is a single pass.
#[derive(Debug, Default, Clone)]
pub struct TrieFilter {
    root: TrieNode,
    keyword_count: usize,
}

impl TrieFilter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PatternFilter for TrieFilter {
    fn add_keyword(&mut self, raw: &str) {
        let keyword = normalize(raw);
        if keyword.is_empty() {
            return;
        }
        let mut node = &mut self.root;
        for ch in keyword.chars() {
            node = node.children.entry(ch).or_default();
        }
        if !node.terminal {
            node.terminal = true;
            self.keyword_count += 1;
        }
    }

    fn filter_message(&self, message: &str, replacement: &str) -> String {
        let data: Vec<char> = normalize(message).chars().collect();
        let mut out = String::with_capacity(data.len());
        let mut start = 0;

        while start < data.len() {
            let mut node = &self.root;
            let mut matched = None;
            let mut steps = 0;

            for &ch in &data[start..] {
                match node.children.get(&ch) {
                    Some(child) => {
                        steps += 1;
                        if child.terminal {
                            matched = Some(steps);
                            break;
                        }
                        node = child;
                    }
                    None => break,
                }
            }

            match matched {
                Some(length) => {
                    out.push_str(&replacement.repeat(length));
                    start += length;
                }
                None => {
                    out.push(data[start]);
                    start += 1;
                }
            }
        }
        out
    }

    fn keyword_count(&self) -> usize {
        self.keyword_count
    }

    fn contains_keyword(&self, keyword: &str) -> bool {
        let keyword = normalize(keyword);
        if keyword.is_empty() {
            return false;
        }
        let mut node = &self.root;
        for ch in keyword.chars() {
            match node.children.get(&ch) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.terminal
    }
}
