//! Parsers for `/proc` pseudo-files.
//!
//! These are pure functions over file content, so they are tested with
//! string fixtures and reused by every collector.

use std::collections::{BTreeMap, HashMap};

use crate::cpuset::CpuSet;
use crate::error::ParseError;
use crate::stats::Stats;

/// Parsed `/proc/interrupts`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterruptTable {
    /// CPU ids of the header columns, in column order.
    pub cpus: Vec<u32>,
    /// Per-CPU counters for every row with a per-CPU breakdown.
    pub stats: Stats,
    /// Numeric IRQ -> source label (last non-numeric trailer token, may be empty).
    pub sources: BTreeMap<u32, String>,
    /// Rows carrying one system-wide value (`ERR:`, `MIS:`).
    ///
    /// Informational: never part of `stats`, so deltas and CPU filters
    /// ignore them.
    pub aggregates: BTreeMap<String, u64>,
}

/// Parsed `/proc/softirqs`: per-category counters indexed by column position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoftirqInfo {
    /// CPU ids of the header columns, in column order.
    pub cpus: Vec<u32>,
    /// Category names in table order.
    names: Vec<String>,
    counters: HashMap<String, Vec<u64>>,
}

impl SoftirqInfo {
    /// Category names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Counters of one category; index is the header column position.
    pub fn counters(&self, name: &str) -> Option<&[u64]> {
        self.counters.get(name).map(Vec::as_slice)
    }

    /// Counter of one category on one CPU id.
    pub fn get(&self, name: &str, cpu: u32) -> Option<u64> {
        let col = self.cpus.iter().position(|&c| c == cpu)?;
        self.counters.get(name)?.get(col).copied()
    }

    /// CPUs on which the category has fired at least once.
    pub fn used_cpus(&self, name: &str) -> CpuSet {
        self.counters
            .get(name)
            .map(|values| {
                values
                    .iter()
                    .zip(&self.cpus)
                    .filter(|(value, _)| **value > 0)
                    .map(|(_, cpu)| *cpu)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Transposes the table into the CPU-indexed snapshot shape.
    pub fn to_stats(&self) -> Stats {
        let mut stats = Stats::new();
        for name in &self.names {
            for (cpu, value) in self.cpus.iter().zip(&self.counters[name]) {
                stats.set(*cpu, name.as_str(), *value);
            }
        }
        stats
    }
}

/// Parsed thread status: the fields of `/proc/<pid>/task/<tid>/status` we need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStatus {
    pub name: String,
    pub cpus_allowed: CpuSet,
}

/// Parses the `CPU0 CPU1 ... CPUn` header shared by `interrupts` and `softirqs`.
fn parse_cpu_header(line: Option<&str>) -> Result<Vec<u32>, ParseError> {
    let line = line.ok_or_else(|| ParseError::new("empty table"))?;
    let cpus = line
        .split_whitespace()
        .map(|col| {
            col.strip_prefix("CPU")
                .and_then(|id| id.parse::<u32>().ok())
                .ok_or_else(|| ParseError::new(format!("invalid header column {:?}", col)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if cpus.is_empty() {
        return Err(ParseError::new("header has no CPU columns"));
    }
    Ok(cpus)
}

/// Parses a token as a counter: digits only, no sign.
fn parse_counter(token: &str) -> Option<u64> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn parse_row_label<'a>(first: &'a str, lineno: usize) -> Result<&'a str, ParseError> {
    match first.strip_suffix(':') {
        Some(label) if !label.is_empty() => Ok(label),
        _ => Err(ParseError::new(format!(
            "line {}: invalid row label {:?}",
            lineno, first
        ))),
    }
}

/// Parses `/proc/interrupts` content.
///
/// Each row is `LABEL: v0 v1 ... [chip trigger source]`. A token is a counter
/// for column `i` only while it is purely numeric and `i` is within the header
/// column count; whatever follows is the descriptive trailer.
pub fn parse_interrupts(content: &str) -> Result<InterruptTable, ParseError> {
    let mut lines = content.lines();
    let cpus = parse_cpu_header(lines.next())?;
    let mut table = InterruptTable {
        cpus,
        ..InterruptTable::default()
    };

    for (idx, line) in lines.enumerate() {
        let lineno = idx + 2;
        let mut fields = line.split_whitespace();
        let Some(first) = fields.next() else {
            continue;
        };
        let label = parse_row_label(first, lineno)?;
        let rest: Vec<&str> = fields.collect();

        let values: Vec<u64> = rest
            .iter()
            .take(table.cpus.len())
            .map_while(|token| parse_counter(token))
            .collect();
        if values.is_empty() {
            return Err(ParseError::new(format!(
                "line {}: row {:?} has no counters",
                lineno, label
            )));
        }
        let trailer = &rest[values.len()..];

        if values.len() == 1 && table.cpus.len() > 1 && trailer.is_empty() {
            table.aggregates.insert(label.to_string(), values[0]);
            continue;
        }

        for (cpu, value) in table.cpus.iter().zip(&values) {
            table.stats.set(*cpu, label, *value);
        }

        if let Ok(irq) = label.parse::<u32>() {
            let source = trailer
                .iter()
                .rev()
                .find(|token| parse_counter(token).is_none())
                .copied()
                .unwrap_or_default();
            table.sources.insert(irq, source.to_string());
        }
    }

    Ok(table)
}

/// Parses `/proc/softirqs` content.
///
/// Rows are `NAME: v0 v1 ... vn` with exactly one value per header column.
/// Unknown category names are accepted as-is.
pub fn parse_softirqs(content: &str) -> Result<SoftirqInfo, ParseError> {
    let mut lines = content.lines();
    let cpus = parse_cpu_header(lines.next())?;
    let mut info = SoftirqInfo {
        cpus,
        ..SoftirqInfo::default()
    };

    for (idx, line) in lines.enumerate() {
        let lineno = idx + 2;
        let mut fields = line.split_whitespace();
        let Some(first) = fields.next() else {
            continue;
        };
        let name = parse_row_label(first, lineno)?;

        let values = fields
            .map(|token| {
                parse_counter(token).ok_or_else(|| {
                    ParseError::new(format!("line {}: invalid counter {:?}", lineno, token))
                })
            })
            .collect::<Result<Vec<u64>, _>>()?;
        if values.len() != info.cpus.len() {
            return Err(ParseError::new(format!(
                "line {}: {} has {} columns, header has {}",
                lineno,
                name,
                values.len(),
                info.cpus.len()
            )));
        }

        if info.counters.insert(name.to_string(), values).is_none() {
            info.names.push(name.to_string());
        }
    }

    Ok(info)
}

/// Parses `/proc/<pid>/task/<tid>/status` content for name and CPU affinity.
pub fn parse_task_status(content: &str) -> Result<TaskStatus, ParseError> {
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim(), value.trim());
        }
    }

    let cpus_allowed = fields
        .get("Cpus_allowed_list")
        .ok_or_else(|| ParseError::new("missing Cpus_allowed_list"))?;

    Ok(TaskStatus {
        name: fields.get("Name").unwrap_or(&"").to_string(),
        cpus_allowed: CpuSet::parse(cpus_allowed)?,
    })
}
