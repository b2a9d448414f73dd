//! Canonical CPU sets in the kernel "List format" (see `man 7 cpuset`).
//!
//! A [`CpuSet`] is stored as the minimal ordered list of disjoint, maximal
//! inclusive ranges, so two sets with the same members always compare equal
//! and always render to the same text, e.g. `{0,1,2,3,5,7,8,9}` is `"0-3,5,7-9"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// Immutable set of CPU ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CpuSet {
    /// Sorted, disjoint, non-adjacent inclusive ranges.
    ranges: Vec<(u32, u32)>,
    len: usize,
}

impl CpuSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from arbitrary (possibly overlapping, unordered) inclusive ranges.
    pub fn from_ranges(ranges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut ranges: Vec<(u32, u32)> = ranges
            .into_iter()
            .map(|(lo, hi)| if lo <= hi { (lo, hi) } else { (hi, lo) })
            .collect();
        ranges.sort_unstable();

        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            match merged.last_mut() {
                Some(last) if lo <= last.1.saturating_add(1) => {
                    last.1 = last.1.max(hi);
                }
                _ => merged.push((lo, hi)),
            }
        }

        let len = merged
            .iter()
            .map(|&(lo, hi)| (hi - lo) as usize + 1)
            .sum();
        Self {
            ranges: merged,
            len,
        }
    }

    /// Parses list-format text: comma separated ids or inclusive `low-high` ranges.
    ///
    /// Order and duplicates are insignificant. Whitespace-only input is the
    /// empty set; an empty segment (`"1,,2"`) is an error.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::new());
        }

        let mut ranges = Vec::new();
        for token in text.split(',') {
            let token = token.trim();
            if token.is_empty() {
                return Err(ParseError::new(format!("empty segment in cpu list {:?}", text)));
            }

            let range = match token.split_once('-') {
                Some((lo, hi)) => {
                    let lo = parse_cpu_id(lo, token)?;
                    let hi = parse_cpu_id(hi, token)?;
                    if lo > hi {
                        return Err(ParseError::new(format!("inverted range {:?}", token)));
                    }
                    (lo, hi)
                }
                None => {
                    let id = parse_cpu_id(token, token)?;
                    (id, id)
                }
            };
            ranges.push(range);
        }

        Ok(Self::from_ranges(ranges))
    }

    /// Number of CPUs in the set.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, cpu: u32) -> bool {
        let idx = self.ranges.partition_point(|&(_, hi)| hi < cpu);
        self.ranges.get(idx).is_some_and(|&(lo, _)| lo <= cpu)
    }

    /// CPUs present in both sets.
    pub fn intersection(&self, other: &CpuSet) -> CpuSet {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a_lo, a_hi) = self.ranges[i];
            let (b_lo, b_hi) = other.ranges[j];
            let lo = a_lo.max(b_lo);
            let hi = a_hi.min(b_hi);
            if lo <= hi {
                out.push((lo, hi));
            }
            if a_hi < b_hi {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self::from_ranges(out)
    }

    /// CPUs present in either set.
    pub fn union(&self, other: &CpuSet) -> CpuSet {
        Self::from_ranges(self.ranges.iter().chain(other.ranges.iter()).copied())
    }

    /// Iterates over the CPU ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges.iter().flat_map(|&(lo, hi)| lo..=hi)
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }
}

fn parse_cpu_id(s: &str, token: &str) -> Result<u32, ParseError> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::new(format!("invalid cpu id in {:?}", token)));
    }
    s.parse()
        .map_err(|_| ParseError::new(format!("cpu id out of range in {:?}", token)))
}

impl fmt::Display for CpuSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, &(lo, hi)) in self.ranges.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            if lo == hi {
                write!(f, "{}", lo)?;
            } else {
                write!(f, "{}-{}", lo, hi)?;
            }
        }
        Ok(())
    }
}

impl FromStr for CpuSet {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FromIterator<u32> for CpuSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self::from_ranges(iter.into_iter().map(|cpu| (cpu, cpu)))
    }
}

impl Serialize for CpuSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CpuSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        CpuSet::parse(&text).map_err(serde::de::Error::custom)
    }
}
