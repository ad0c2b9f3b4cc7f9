//! Campaign-wide harvesting: fan the reproducer out over every
//! (fuzzer, sync dir, binary) binding, merge statistics, and deduplicate
//! issue cards by anonymized title.

use crate::error::{Result, TriageToolError};
use crate::fuzzers::{fuzzer_info, known_fuzzers, FuzzerInfo};
use crate::issue::IssueCard;
use crate::repro::Reproducer;
use crate::stats::{CoverageStats, FuzzStats};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// One (fuzzer family, sync dir, target binary) combination to harvest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignBinding {
    /// Registry key of the fuzzer family, e.g. `afl`
    pub fuzzer: String,
    /// Directory the fuzzer instances synced into
    pub sync_dir: PathBuf,
    /// Instrumented target binary for reproduction
    pub binary: PathBuf,
    /// Subdirectory name the external output stage files this binding's
    /// samples under; carried through untouched.
    #[serde(default)]
    pub result_subdir: Option<String>,
}

/// Final result structure; the JSON contract consumed by the downstream
/// report/send tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvestReport {
    pub issue_cards: Vec<IssueCard>,
    pub fuzz_stats: FuzzStats,
    /// Coverage aggregates, when an external collector supplied them. Not
    /// serialized otherwise, keeping the two-key contract stable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_stats: Option<CoverageStats>,
}

impl HarvestReport {
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TriageToolError::Serialization(format!("harvest report: {e}")))
    }

    /// Write the report JSON; partial progress stays on disk if a later
    /// stage aborts.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

/// Fans reproduction out across bindings and owns global deduplication.
pub struct Harvester {
    bindings: Vec<CampaignBinding>,
    src_root: Option<String>,
    num_tries: u32,
    run_timeout: Duration,
    coverage: Option<CoverageStats>,
}

impl Harvester {
    pub fn new(bindings: Vec<CampaignBinding>) -> Self {
        Self {
            bindings,
            src_root: None,
            num_tries: crate::repro::DEFAULT_NUM_TRIES,
            run_timeout: crate::repro::DEFAULT_RUN_TIMEOUT,
            coverage: None,
        }
    }

    /// Sets the source root used for location preference.
    pub fn with_src_root(mut self, src_root: Option<String>) -> Self {
        self.src_root = src_root;
        self
    }

    /// Sets the retry budget for crash samples.
    pub fn with_num_tries(mut self, num_tries: u32) -> Self {
        self.num_tries = num_tries;
        self
    }

    /// Sets the per-run time budget.
    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    /// Merge in coverage aggregates collected by an external tool; they are
    /// attached to the report as run context.
    pub fn with_coverage(mut self, coverage: CoverageStats) -> Self {
        match self.coverage.as_mut() {
            Some(existing) => existing.merge(&coverage),
            None => self.coverage = Some(coverage),
        }
        self
    }

    /// Validate every binding up front. Configuration errors are fatal for
    /// the whole harvest, before any sample runs.
    fn validate(&self) -> Result<Vec<&'static FuzzerInfo>> {
        let mut infos = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let info = fuzzer_info(&binding.fuzzer).ok_or_else(|| {
                TriageToolError::UnknownFuzzer(format!(
                    "{} (known: {})",
                    binding.fuzzer,
                    known_fuzzers().join(", ")
                ))
            })?;
            if !binding.binary.is_file() {
                return Err(TriageToolError::BinaryNotFound(binding.binary.clone()));
            }
            if !binding.sync_dir.is_dir() {
                return Err(TriageToolError::SyncDir {
                    path: binding.sync_dir.clone(),
                    message: "not a directory".to_string(),
                });
            }
            infos.push(info);
        }
        Ok(infos)
    }

    /// Run the whole harvest. Fail-fast: a binding that cannot be resolved
    /// aborts everything; per-sample reproduction failures only skip that
    /// sample.
    pub async fn harvest(&self) -> Result<HarvestReport> {
        let infos = self.validate()?;

        let mut report = HarvestReport {
            coverage_stats: self.coverage.clone(),
            ..HarvestReport::default()
        };
        let mut seen_titles: HashSet<String> = HashSet::new();

        for (binding, info) in self.bindings.iter().zip(infos) {
            let reproducer = Reproducer::new(info, binding.binary.clone())
                .with_src_root(self.src_root.clone())
                .with_num_tries(self.num_tries)
                .with_run_timeout(self.run_timeout);

            for instance_dir in instance_dirs(&binding.sync_dir)? {
                let stats_file = instance_dir.join("fuzzer_stats");
                if stats_file.is_file() {
                    report.fuzz_stats.merge(&FuzzStats::from_stats_file(&stats_file));
                }

                let crashes = info.crash_samples(&instance_dir);
                let hangs = info.hang_samples(&instance_dir);
                if crashes.is_empty() && hangs.is_empty() {
                    continue;
                }
                debug!(
                    instance = %instance_dir.display(),
                    crashes = crashes.len(),
                    hangs = hangs.len(),
                    "reproducing instance samples"
                );

                for mut card in reproducer.reproduce_all(&crashes, &hangs).await {
                    card.finalize(self.src_root.as_deref());
                    // First-seen card wins; duplicates carry equivalent data.
                    if seen_titles.insert(card.title.clone()) {
                        report.issue_cards.push(card);
                    } else {
                        debug!(title = %card.title, "duplicate title, discarding card");
                    }
                }
            }
        }

        info!(
            bindings = self.bindings.len(),
            unique_issues = report.issue_cards.len(),
            instances = report.fuzz_stats.instances,
            "harvest finished"
        );
        Ok(report)
    }
}

/// Instance dirs under a sync dir; a sync dir with no subdirectories is
/// treated as a single unnamed instance.
fn instance_dirs(sync_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(sync_dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    if dirs.is_empty() {
        dirs.push(sync_dir.to_path_buf());
    }
    Ok(dirs)
}
