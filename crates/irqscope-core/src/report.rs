//! Text and JSON reporting of counter deltas.
//!
//! A [`Reporter`] is built once with its output format, verbosity and CPU
//! selection, then handed to the watch loop. Verbosity `0` prints nothing,
//! `1` prints the final summary only, `2` and above also print every tick.
//! JSON output is a stream of independent objects, one per line.

use std::cmp::Ordering;
use std::io::{self, Write};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::cpuset::CpuSet;
use crate::fmt::format_elapsed;
use crate::stats::{Counter, Stats};

/// Report output variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// One JSON record per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    pub timestamp: DateTime<Utc>,
    pub counters: Stats,
}

/// The JSON record closing a watch session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Go-style duration text, e.g. `"3.001s"`.
    pub elapsed: String,
    pub counters: Stats,
}

/// Writes per-tick deltas and the session summary.
pub struct Reporter<W: Write> {
    format: OutputFormat,
    verbose: u8,
    cpus: CpuSet,
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(format: OutputFormat, verbose: u8, cpus: CpuSet, out: W) -> Self {
        Self {
            format,
            verbose,
            cpus,
            out,
        }
    }

    /// Reports the activity between two consecutive snapshots.
    pub fn delta(&mut self, ts: DateTime<Utc>, prev: &Stats, last: &Stats) -> io::Result<()> {
        if self.verbose < 2 {
            return Ok(());
        }
        let counters = prev.delta(last).for_cpus(&self.cpus);

        match self.format {
            OutputFormat::Text => {
                let prefix = format!("{} ", ts.to_rfc3339_opts(SecondsFormat::Micros, true));
                self.write_lines(&prefix, &counters)?;
            }
            OutputFormat::Json => {
                let record = TickRecord {
                    timestamp: ts,
                    counters,
                };
                self.write_json(&record)?;
            }
        }
        self.out.flush()
    }

    /// Reports the activity of the whole session, `init` to `last`.
    pub fn summary(&mut self, elapsed: Duration, init: &Stats, last: &Stats) -> io::Result<()> {
        if self.verbose < 1 {
            return Ok(());
        }
        let counters = init.delta(last).for_cpus(&self.cpus);

        match self.format {
            OutputFormat::Text => {
                writeln!(self.out)?;
                writeln!(
                    self.out,
                    "IRQ summary on cpus {} after {}",
                    self.cpus,
                    format_elapsed(elapsed)
                )?;
                self.write_lines("", &counters)?;
            }
            OutputFormat::Json => {
                let record = SummaryRecord {
                    elapsed: format_elapsed(elapsed),
                    counters,
                };
                self.write_json(&record)?;
            }
        }
        self.out.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_lines(&mut self, prefix: &str, counters: &Stats) -> io::Result<()> {
        for (cpu, counter) in counters.iter() {
            for (label, value) in sorted_labels(counter) {
                writeln!(self.out, "{}CPU={} IRQ={} +{}", prefix, cpu, label, value)?;
            }
        }
        Ok(())
    }

    fn write_json<T: Serialize>(&mut self, record: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        writeln!(self.out)
    }
}

/// Numeric IRQ labels ascending, then symbolic ones (`LOC`, `NMI`) by name.
fn sorted_labels(counter: &Counter) -> Vec<(&str, u64)> {
    let mut entries: Vec<(&str, u64)> = counter
        .iter()
        .map(|(label, value)| (label.as_str(), *value))
        .collect();
    entries.sort_by(|a, b| label_order(a.0, b.0));
    entries
}

fn label_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u32>(), b.parse::<u32>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
