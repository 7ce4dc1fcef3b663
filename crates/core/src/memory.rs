//! In-process pattern memory shared by concurrent requests.
//!
//! [`PatternMemory`] is an explicit owned store, usually wrapped in an `Arc`
//! and handed to an [`crate::Engine`]. It keeps the last detected chapter
//! pattern per base URL, successful extractions per URL, and an ordered
//! queue of URLs. Nothing is evicted automatically.
//!
//! Pattern updates use `DashMap` entry locking, so a read-modify-write on one
//! base URL never interleaves with another on the same key, and unrelated
//! keys do not contend.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::chapter::ChapterInfo;
use crate::extract::ExtractionResult;
use crate::navigation::Direction;

/// Which part of the memory to clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearScope {
    #[default]
    All,
    Patterns,
    Content,
    Queue,
}

impl FromStr for ClearScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(ClearScope::All),
            "patterns" => Ok(ClearScope::Patterns),
            "content" => Ok(ClearScope::Content),
            "queue" => Ok(ClearScope::Queue),
            other => Err(format!("unknown scope '{}' (expected all, patterns, content or queue)", other)),
        }
    }
}

impl fmt::Display for ClearScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClearScope::All => "all",
            ClearScope::Patterns => "patterns",
            ClearScope::Content => "content",
            ClearScope::Queue => "queue",
        };
        f.write_str(name)
    }
}

/// A point-in-time copy of the memory, sorted for stable output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemorySnapshot {
    pub patterns: Vec<ChapterInfo>,
    pub cached_urls: Vec<String>,
    /// Queue in dequeue order
    pub queue: Vec<String>,
}

/// Result of [`PatternMemory::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The entry moved; carries the updated entry.
    Moved(ChapterInfo),
    /// The entry cannot move further that way and was left unchanged.
    AtBoundary,
    NotStored,
}

/// Shared store of chapter patterns, extracted content and queued URLs.
#[derive(Debug, Default)]
pub struct PatternMemory {
    patterns: DashMap<String, ChapterInfo>,
    content: DashMap<String, ExtractionResult>,
    queue: Mutex<VecDeque<String>>,
}

impl PatternMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `info` under its base URL, returning the entry it replaced.
    pub fn upsert(&self, info: ChapterInfo) -> Option<ChapterInfo> {
        tracing::debug!(base_url = %info.base_url, chapter = info.numeric_value, "pattern stored");
        self.patterns.insert(info.base_url.clone(), info)
    }

    pub fn get(&self, base_url: &str) -> Option<ChapterInfo> {
        self.patterns.get(base_url).map(|entry| entry.value().clone())
    }

    /// Base URL of the stored pattern whose template reproduces `url`.
    ///
    /// Entries locked with a hint are found as well as auto-detected ones;
    /// when several match, the longest base URL wins.
    pub fn base_for_url(&self, url: &str) -> Option<String> {
        self.patterns
            .iter()
            .filter(|entry| entry.value().reproduces(url))
            .map(|entry| entry.key().clone())
            .max_by_key(|base_url| base_url.len())
    }

    /// Moves the stored chapter one step under a single entry lock.
    ///
    /// Stepping back from chapter 1 is [`StepOutcome::AtBoundary`].
    pub fn step(&self, base_url: &str, direction: Direction) -> StepOutcome {
        let Some(mut entry) = self.patterns.get_mut(base_url) else {
            return StepOutcome::NotStored;
        };
        let current = entry.numeric_value;
        let stepped = match direction {
            Direction::Next => current.checked_add(1),
            Direction::Previous => current.checked_sub(1).filter(|n| *n >= 1),
        };
        match stepped {
            Some(n) => {
                entry.set_value(n);
                StepOutcome::Moved(entry.value().clone())
            }
            None => StepOutcome::AtBoundary,
        }
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Caches a successful extraction. Failed results are not stored.
    pub fn cache_content(&self, result: &ExtractionResult) -> bool {
        if !result.is_success() {
            return false;
        }
        self.content.insert(result.url.clone(), result.clone());
        true
    }

    pub fn cached_content(&self, url: &str) -> Option<ExtractionResult> {
        self.content.get(url).map(|entry| entry.value().clone())
    }

    /// Appends `url` unless it is already queued.
    pub fn enqueue(&self, url: &str) -> bool {
        let mut queue = self.lock_queue();
        if queue.iter().any(|queued| queued == url) {
            return false;
        }
        queue.push_back(url.to_string());
        true
    }

    pub fn dequeue(&self) -> Option<String> {
        self.lock_queue().pop_front()
    }

    pub fn queue_len(&self) -> usize {
        self.lock_queue().len()
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        let mut patterns: Vec<ChapterInfo> = self.patterns.iter().map(|entry| entry.value().clone()).collect();
        patterns.sort_by(|a, b| a.base_url.cmp(&b.base_url));

        let mut cached_urls: Vec<String> = self.content.iter().map(|entry| entry.key().clone()).collect();
        cached_urls.sort();

        MemorySnapshot { patterns, cached_urls, queue: self.lock_queue().iter().cloned().collect() }
    }

    /// Clears `scope` and returns the number of entries removed.
    pub fn clear(&self, scope: ClearScope) -> usize {
        let mut removed = 0;
        if matches!(scope, ClearScope::All | ClearScope::Patterns) {
            removed += self.patterns.len();
            self.patterns.clear();
        }
        if matches!(scope, ClearScope::All | ClearScope::Content) {
            removed += self.content.len();
            self.content.clear();
        }
        if matches!(scope, ClearScope::All | ClearScope::Queue) {
            let mut queue = self.lock_queue();
            removed += queue.len();
            queue.clear();
        }
        tracing::debug!(%scope, removed, "memory cleared");
        removed
    }

    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
