//! Fuzz and coverage statistics: parsed per instance, merged additively.
//!
//! The stats format is the AFL-style `fuzzer_stats` key/value file. A
//! malformed or missing file degrades to zeros with a warning; statistics
//! never abort a harvest.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Aggregate fuzzing statistics across instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FuzzStats {
    /// Number of instances merged in
    pub instances: u64,
    pub execs_done: u64,
    pub execs_per_sec: f64,
    pub crashes: u64,
    pub hangs: u64,
    /// Earliest instance start
    pub start_time: Option<DateTime<Utc>>,
    /// Latest instance update
    pub last_update: Option<DateTime<Utc>>,
}

impl FuzzStats {
    /// Parse one instance's `fuzzer_stats` file. Unknown keys are ignored,
    /// missing keys default to zero.
    pub fn from_stats_file(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable fuzzer_stats, using defaults");
                return Self::default();
            }
        };
        Self::parse(&text)
    }

    /// Parse `key : value` lines.
    pub fn parse(text: &str) -> Self {
        let fields: HashMap<&str, &str> = text
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once(':')?;
                Some((key.trim(), value.trim()))
            })
            .collect();

        let num = |key: &str| -> u64 {
            fields
                .get(key)
                .and_then(|v| v.parse().ok())
                .unwrap_or_default()
        };
        let timestamp = |key: &str| -> Option<DateTime<Utc>> {
            let secs: i64 = fields.get(key)?.parse().ok()?;
            Utc.timestamp_opt(secs, 0).single()
        };

        Self {
            instances: 1,
            execs_done: num("execs_done"),
            execs_per_sec: fields
                .get("execs_per_sec")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            crashes: num("unique_crashes").max(num("saved_crashes")),
            hangs: num("unique_hangs").max(num("saved_hangs")),
            start_time: timestamp("start_time"),
            last_update: timestamp("last_update"),
        }
    }

    /// Additive merge: counts sum, first/last event timestamps take
    /// min/max respectively.
    pub fn merge(&mut self, other: &FuzzStats) {
        self.instances += other.instances;
        self.execs_done += other.execs_done;
        self.execs_per_sec += other.execs_per_sec;
        self.crashes += other.crashes;
        self.hangs += other.hangs;
        self.start_time = match (self.start_time, other.start_time) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.last_update = match (self.last_update, other.last_update) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}

/// Coverage hit counts, merged additively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageStats {
    pub basic_blocks: u64,
    pub lines: u64,
    pub functions: u64,
}

impl CoverageStats {
    pub fn merge(&mut self, other: &CoverageStats) {
        self.basic_blocks += other.basic_blocks;
        self.lines += other.lines;
        self.functions += other.functions;
    }
}
