//! Breadth-first crawl frontier

use std::collections::{HashSet, VecDeque};

/// A URL waiting to be crawled, with its link distance from the start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// URL to crawl
    pub url: String,

    /// Number of link hops from the start URL or sitemap
    pub depth: u32,
}

/// FIFO queue of pending URLs plus the set of URLs already dispatched.
///
/// URLs are compared as exact strings. A URL enters the queue at most once
/// per frontier, so repeated discoveries collapse into the first one.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    enqueued: HashSet<String>,
    visited: HashSet<String>,
}

impl Frontier {
    /// Create an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `url` at `depth` unless it was queued or visited before
    pub fn push(&mut self, url: impl Into<String>, depth: u32) -> bool {
        let url = url.into();
        if self.visited.contains(&url) || !self.enqueued.insert(url.clone()) {
            return false;
        }
        self.queue.push_back(FrontierEntry { url, depth });
        true
    }

    /// Take the oldest pending entry
    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    /// Record that `url` has been dispatched; false if it already was
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    /// Whether `url` has been dispatched
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of dispatched URLs
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
