//! Triage engine for fuzz-testing campaigns.
//!
//! Takes the raw artifacts of a fuzzing run (crash/hang sample files, the
//! target binary, captured process output) and turns them into deduplicated,
//! titled issue cards: each run is classified into a severity-ordered verdict,
//! a stable bug location is extracted from whichever trace format the run
//! produced, and the anonymized title serves as the deduplication key.

/// Crate error types
pub mod error;
/// Tracing/logging initialization
pub mod logging;

/// Verdict taxonomy and output classification
pub mod verdict;

/// Location extraction, anonymization, and the regex pattern set
pub mod triage;

/// Issue card record type
pub mod issue;

/// Fuzzer family registry and sample masks
pub mod fuzzers;

/// Fuzz/coverage statistics parsing and merging
pub mod stats;

/// Crash/hang reproduction against the target binary
pub mod repro;

/// Campaign-wide fan-out, deduplication, and report assembly
pub mod harvest;

pub use error::{Result, TriageToolError};
pub use harvest::{CampaignBinding, HarvestReport, Harvester};
pub use issue::IssueCard;
pub use verdict::{classify, Verdict};
