//! Per-CPU interrupt counter snapshots and the delta engine.
//!
//! A [`Stats`] value maps a CPU id to a [`Counter`] (label -> event count).
//! Snapshots are plain owned values: `clone()` is a deep copy, so a baseline
//! kept by the watch loop never observes later reads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cpuset::CpuSet;

/// Event counts on one CPU, keyed by IRQ number (`"131"`) or symbolic name (`"LOC"`).
pub type Counter = BTreeMap<String, u64>;

/// CPU id -> counters, captured at one instant (or the difference of two captures).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stats(BTreeMap<u32, Counter>);

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one counter value, creating the CPU entry if needed.
    pub fn set(&mut self, cpu: u32, label: impl Into<String>, value: u64) {
        self.0.entry(cpu).or_default().insert(label.into(), value);
    }

    /// Looks up one counter value.
    pub fn get(&self, cpu: u32, label: &str) -> Option<u64> {
        self.0.get(&cpu).and_then(|c| c.get(label)).copied()
    }

    pub fn counter(&self, cpu: u32) -> Option<&Counter> {
        self.0.get(&cpu)
    }

    pub fn counter_mut(&mut self, cpu: u32) -> &mut Counter {
        self.0.entry(cpu).or_default()
    }

    /// Number of CPUs with an entry.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// CPU ids with an entry, ascending.
    pub fn cpus(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Counter)> {
        self.0.iter().map(|(&cpu, counter)| (cpu, counter))
    }

    /// Element-wise difference `last - self`.
    ///
    /// `self` must be the earlier snapshot; the result is only meaningful in
    /// chronological order. CPUs or labels present in only one operand are
    /// ignored and zero differences are omitted, so the result is sparse. A
    /// counter that went backwards is treated as a reset and skipped.
    pub fn delta(&self, last: &Stats) -> Stats {
        let mut out = BTreeMap::new();
        for (cpu, prev_counter) in &self.0 {
            let Some(last_counter) = last.0.get(cpu) else {
                continue;
            };

            let mut diff = Counter::new();
            for (label, &prev) in prev_counter {
                let Some(&curr) = last_counter.get(label) else {
                    continue;
                };
                match counter_delta(curr, prev) {
                    Some(0) => {}
                    Some(d) => {
                        diff.insert(label.clone(), d);
                    }
                    None => debug!(cpu, label = %label, prev, curr, "counter went backwards, skipping"),
                }
            }

            if !diff.is_empty() {
                out.insert(*cpu, diff);
            }
        }
        Stats(out)
    }

    /// Keeps only the CPUs in `cpus`, dropping CPUs whose counter is empty.
    pub fn for_cpus(&self, cpus: &CpuSet) -> Stats {
        Stats(
            self.0
                .iter()
                .filter(|(cpu, counter)| cpus.contains(**cpu) && !counter.is_empty())
                .map(|(cpu, counter)| (*cpu, counter.clone()))
                .collect(),
        )
    }
}

/// Counter delta, `None` on counter regression (reset).
pub fn counter_delta(curr: u64, prev: u64) -> Option<u64> {
    curr.checked_sub(prev)
}

impl FromIterator<(u32, Counter)> for Stats {
    fn from_iter<I: IntoIterator<Item = (u32, Counter)>>(iter: I) -> Self {
        Stats(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(pairs: &[(&str, u64)]) -> Counter {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn fake_init() -> Stats {
        [
            (0, counter(&[("0", 13), ("1", 0), ("8", 0), ("12", 0)])),
            (1, counter(&[("0", 0), ("1", 21), ("8", 0), ("12", 0)])),
            (2, counter(&[("0", 0), ("1", 0), ("8", 1), ("12", 0)])),
            (3, counter(&[("0", 0), ("1", 0), ("8", 0), ("12", 713)])),
        ]
        .into_iter()
        .collect()
    }

    fn fake_last() -> Stats {
        [
            (0, counter(&[("0", 14), ("1", 0), ("8", 0), ("12", 0)])),
            (1, counter(&[("0", 0), ("1", 23), ("8", 0), ("12", 0)])),
            (2, counter(&[("0", 0), ("1", 0), ("8", 4), ("12", 0)])),
            (3, counter(&[("0", 0), ("1", 0), ("8", 0), ("12", 717)])),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_delta_is_sparse() {
        let delta = fake_init().delta(&fake_last());
        assert_eq!(delta.get(0, "0"), Some(1));
        assert_eq!(delta.get(1, "1"), Some(2));
        assert_eq!(delta.get(2, "8"), Some(3));
        assert_eq!(delta.get(3, "12"), Some(4));
        for cpu in 0..4 {
            assert_eq!(delta.counter(cpu).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_delta_omits_zero() {
        let mut prev = Stats::new();
        prev.set(0, "12", 713);
        let last = prev.clone();
        let delta = prev.delta(&last);
        assert_eq!(delta.get(0, "12"), None);
        assert!(delta.is_empty());
    }

    #[test]
    fn test_delta_ignores_one_sided_entries() {
        let mut prev = Stats::new();
        prev.set(0, "LOC", 10);
        prev.set(0, "gone", 5);
        prev.set(7, "LOC", 1);
        let mut last = Stats::new();
        last.set(0, "LOC", 15);
        last.set(0, "new", 100);
        last.set(9, "LOC", 1);

        let delta = prev.delta(&last);
        assert_eq!(delta.len(), 1);
        assert_eq!(delta.counter(0).unwrap(), &counter(&[("LOC", 5)]));
    }

    #[test]
    fn test_delta_skips_regression() {
        let mut prev = Stats::new();
        prev.set(0, "LOC", 100);
        prev.set(0, "RES", 1);
        let mut last = Stats::new();
        last.set(0, "LOC", 5);
        last.set(0, "RES", 3);

        let delta = prev.delta(&last);
        assert_eq!(delta.get(0, "LOC"), None);
        assert_eq!(delta.get(0, "RES"), Some(2));
        assert_eq!(counter_delta(5, 100), None);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut live = fake_init();
        let baseline = live.clone();
        live.set(0, "0", 999);
        live.counter_mut(5).insert("LOC".into(), 1);
        assert_eq!(baseline.get(0, "0"), Some(13));
        assert!(baseline.counter(5).is_none());
        assert_eq!(baseline, fake_init());
    }

    #[test]
    fn test_for_cpus() {
        let stats = fake_init();
        let cpus = CpuSet::parse("1-2").unwrap();
        let filtered = stats.for_cpus(&cpus);
        assert_eq!(filtered.cpus().collect::<Vec<_>>(), vec![1, 2]);
        assert!(filtered.counter(0).is_none());
        assert!(filtered.counter(3).is_none());
    }

    #[test]
    fn test_for_cpus_drops_empty_counters() {
        let mut stats = Stats::new();
        stats.counter_mut(0);
        stats.set(1, "LOC", 3);
        let filtered = stats.for_cpus(&CpuSet::parse("0-1").unwrap());
        assert_eq!(filtered.cpus().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_json_shape() {
        let mut stats = Stats::new();
        stats.set(3, "12", 4);
        stats.set(0, "LOC", 1);
        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"{"0":{"LOC":1},"3":{"12":4}}"#);
        let back: Stats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
