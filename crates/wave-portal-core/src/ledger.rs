//! Local wave collection.
//!
//! A full fetch replaces the collection; a live notification appends one
//! record. Both paths reconcile on [`WaveKey`], never on list position:
//! a key is shown as many times as the larger of the fetched copies and
//! the distinct live logs seen for it.

use std::collections::{HashMap, HashSet};

use crate::domain::{LogOrigin, WaveKey, WaveRecord};

#[derive(Debug, Clone)]
struct LiveEntry {
    record: WaveRecord,
    /// Already survived one fetch that did not contain it.
    carried: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WaveLedger {
    fetched: Vec<WaveRecord>,
    fetched_counts: HashMap<WaveKey, usize>,
    /// Live records in arrival order.
    live: Vec<LiveEntry>,
    live_ids: HashSet<(WaveKey, Option<LogOrigin>)>,
    records: Vec<WaveRecord>,
}

impl WaveLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the collection with a fetched snapshot.
    ///
    /// Live records the snapshot does not account for are carried over
    /// after it once, so a notification racing the fetch is not lost.
    pub fn replace_all(&mut self, fetched: Vec<WaveRecord>) {
        let mut counts: HashMap<WaveKey, usize> = HashMap::new();
        for record in &fetched {
            *counts.entry(record.key).or_default() += 1;
        }

        let mut ranks: HashMap<WaveKey, usize> = HashMap::new();
        let mut kept = Vec::new();
        for mut entry in self.live.drain(..) {
            let rank = ranks.entry(entry.record.key).or_default();
            *rank += 1;
            let covered = counts.get(&entry.record.key).copied().unwrap_or(0);
            if *rank > covered && !entry.carried {
                entry.carried = true;
                kept.push(entry);
            }
        }
        self.live_ids = kept
            .iter()
            .map(|e| (e.record.key, e.record.origin))
            .collect();
        self.live = kept;
        self.fetched = fetched;
        self.fetched_counts = counts;
        self.rebuild();
    }

    /// Append one live record. Returns false when the same log was already
    /// seen or the fetched snapshot already holds this copy.
    pub fn append_live(&mut self, record: WaveRecord) -> bool {
        if !self.live_ids.insert((record.key, record.origin)) {
            return false;
        }
        let key = record.key;
        self.live.push(LiveEntry {
            record,
            carried: false,
        });
        let before = self.records.len();
        self.rebuild();
        if self.records.len() == before {
            tracing::trace!(key = %key.0, "live wave already in fetched snapshot");
            return false;
        }
        true
    }

    fn rebuild(&mut self) {
        let mut records = self.fetched.clone();
        let mut ranks: HashMap<WaveKey, usize> = HashMap::new();
        for entry in &self.live {
            let rank = ranks.entry(entry.record.key).or_default();
            *rank += 1;
            let covered = self
                .fetched_counts
                .get(&entry.record.key)
                .copied()
                .unwrap_or(0);
            if *rank > covered {
                records.push(entry.record.clone());
            }
        }
        self.records = records;
    }

    pub fn contains(&self, key: &WaveKey) -> bool {
        self.records.iter().any(|r| r.key == *key)
    }

    /// Records in contract order, live appends last.
    pub fn records(&self) -> &[WaveRecord] {
        &self.records
    }

    /// Records sorted newest first. Ties keep contract order.
    pub fn newest_first(&self) -> Vec<WaveRecord> {
        let mut out = self.records.clone();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
