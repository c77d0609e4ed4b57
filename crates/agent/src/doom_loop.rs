//! Doom-loop detection — the model repeating the same tool call without
//! making progress.

use shellwright_core::ToolCall;
use std::collections::VecDeque;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Consecutive identical calls that stop a run.
pub const DEFAULT_DOOM_LOOP_THRESHOLD: usize = 3;

/// Rolling window of `(name, input)` hashes for one run.
#[derive(Debug, Clone)]
pub struct DoomLoopDetector {
    threshold: usize,
    recent: VecDeque<u64>,
}

impl DoomLoopDetector {
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(2);
        Self {
            threshold,
            recent: VecDeque::with_capacity(threshold * 2),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Record a call. Returns `true` when the last `threshold` recorded
    /// calls are identical.
    pub fn record(&mut self, call: &ToolCall) -> bool {
        self.recent.push_back(call_hash(call));
        while self.recent.len() > self.threshold * 2 {
            self.recent.pop_front();
        }

        if self.recent.len() < self.threshold {
            return false;
        }
        let mut tail = self.recent.iter().rev().take(self.threshold);
        let first = tail.next();
        tail.all(|h| Some(h) == first)
    }
}

impl Default for DoomLoopDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DOOM_LOOP_THRESHOLD)
    }
}

/// serde_json serializes object keys in sorted order, so equal inputs hash
/// equally regardless of how the model ordered them.
fn call_hash(call: &ToolCall) -> u64 {
    let mut hasher = DefaultHasher::new();
    call.name.hash(&mut hasher);
    serde_json::to_string(&call.input)
        .unwrap_or_default()
        .hash(&mut hasher);
    hasher.finish()
}
