//! Request sequencing and per-session result slots

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Maximum entries kept in an analysis history
pub const HISTORY_CAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Hands out monotonically increasing request ids
#[derive(Debug, Default)]
pub struct RequestSequencer {
    last: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> RequestId {
        RequestId(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Holds the newest committed result; older in-flight results are dropped
#[derive(Debug, Clone)]
pub struct AnalysisSlot<T> {
    newest_started: Option<RequestId>,
    committed: Option<(RequestId, T)>,
}

impl<T> Default for AnalysisSlot<T> {
    fn default() -> Self {
        Self {
            newest_started: None,
            committed: None,
        }
    }
}

impl<T> AnalysisSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a request has started
    pub fn begin(&mut self, id: RequestId) {
        if self.newest_started.map_or(true, |newest| id > newest) {
            self.newest_started = Some(id);
        }
    }

    /// Store a result unless a newer request has started or committed
    pub fn commit(&mut self, id: RequestId, result: T) -> bool {
        let superseded_start = self.newest_started.map_or(false, |newest| newest > id);
        let superseded_commit = self
            .committed
            .as_ref()
            .map_or(false, |(committed, _)| *committed >= id);

        if superseded_start || superseded_commit {
            debug!("Discarding stale result for {}", id);
            return false;
        }
        self.committed = Some((id, result));
        true
    }

    pub fn latest(&self) -> Option<&T> {
        self.committed.as_ref().map(|(_, r)| r)
    }

    pub fn latest_id(&self) -> Option<RequestId> {
        self.committed.as_ref().map(|(id, _)| *id)
    }
}

/// Bounded newest-first history
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<T> History<T> {
    pub fn push(&mut self, entry: T) {
        self.entries.push_front(entry);
        self.entries.truncate(HISTORY_CAP);
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Keyed table that evicts the least recently touched entry once full
#[derive(Debug)]
pub struct KeyedTable<V> {
    cap: usize,
    tick: u64,
    entries: HashMap<String, (u64, V)>,
}

impl<V: Default> KeyedTable<V> {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            tick: 0,
            entries: HashMap::new(),
        }
    }

    /// Entry for `key`, inserting a default and evicting if at capacity
    pub fn touch(&mut self, key: &str) -> &mut V {
        self.tick += 1;
        if !self.entries.contains_key(key) && self.entries.len() >= self.cap {
            self.evict_oldest();
        }
        let tick = self.tick;
        let slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| (tick, V::default()));
        slot.0 = tick;
        &mut slot.1
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, (tick, _))| *tick)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            debug!("Evicting idle entry '{}'", key);
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequencer_is_monotonic() {
        let seq = RequestSequencer::new();
        let a = seq.next_id();
        let b = seq.next_id();
        assert!(b > a);
        assert_eq!(a, RequestId(1));
    }

    #[test]
    fn test_out_of_order_completion_keeps_newer() {
        let seq = RequestSequencer::new();
        let mut slot = AnalysisSlot::new();

        let old = seq.next_id();
        slot.begin(old);
        let new = seq.next_id();
        slot.begin(new);

        assert!(slot.commit(new, "new"));
        assert!(!slot.commit(old, "old"));
        assert_eq!(slot.latest(), Some(&"new"));
    }

    #[test]
    fn test_older_result_dropped_once_newer_started() {
        let mut slot = AnalysisSlot::new();
        slot.begin(RequestId(1));
        slot.begin(RequestId(2));

        assert!(!slot.commit(RequestId(1), 10));
        assert!(slot.latest().is_none());
        assert!(slot.commit(RequestId(2), 20));
        assert_eq!(slot.latest_id(), Some(RequestId(2)));
    }

    #[test]
    fn test_sequential_requests_all_commit() {
        let mut slot = AnalysisSlot::new();
        for i in 1..=3 {
            slot.begin(RequestId(i));
            assert!(slot.commit(RequestId(i), i));
        }
        assert_eq!(slot.latest(), Some(&3));
    }

    #[test]
    fn test_history_caps_newest_first() {
        let mut history = History::default();
        for i in 0..60 {
            history.push(i);
        }
        assert_eq!(history.len(), HISTORY_CAP);
        assert_eq!(history.iter().next(), Some(&59));
        assert_eq!(history.iter().last(), Some(&10));
    }

    #[test]
    fn test_table_evicts_least_recently_touched() {
        let mut table: KeyedTable<u32> = KeyedTable::with_capacity(2);
        *table.touch("a") = 1;
        *table.touch("b") = 2;
        *table.touch("a") += 10;
        *table.touch("c") = 3;

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a"), Some(&11));
        assert!(table.get("b").is_none());
        assert_eq!(table.get("c"), Some(&3));
    }

    #[test]
    fn test_table_never_exceeds_cap() {
        let mut table: KeyedTable<History<u32>> = KeyedTable::with_capacity(8);
        for i in 0..500 {
            table.touch(&format!("token-{}", i)).push(i);
            assert!(table.len() <= 8);
        }
        assert_eq!(table.get("token-499").map(History::len), Some(1));
        assert!(table.get("token-0").is_none());
    }
}
