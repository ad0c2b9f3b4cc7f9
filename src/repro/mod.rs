//! Reproduction of crash/hang candidates against the target binary.
//!
//! Per-sample state machine: a crash candidate gets up to `num_tries`
//! bounded runs (stopping as soon as a bug is observed), then, when the
//! verdict is still unspecific, one debugger run to capture a backtrace.
//! A hang candidate goes straight to a single debugger stepping run;
//! hangs by definition do not exit, so a plain run would only burn the
//! timeout. Samples whose final verdict is below hang severity are
//! discarded: transient non-crashes are not worth a tracker entry.

pub mod gdb;
pub mod runner;

use crate::error::Result;
use crate::fuzzers::{FuzzerInfo, InputMode};
use crate::issue::IssueCard;
use crate::verdict::{classify, Verdict};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default number of bounded-run attempts per crash sample.
pub const DEFAULT_NUM_TRIES: u32 = 3;
/// Default per-run time budget.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(10);

/// Reproduces samples of one fuzzer family against one target binary.
pub struct Reproducer {
    info: &'static FuzzerInfo,
    binary: PathBuf,
    src_root: Option<String>,
    num_tries: u32,
    run_timeout: Duration,
}

impl Reproducer {
    pub fn new(info: &'static FuzzerInfo, binary: PathBuf) -> Self {
        Self {
            info,
            binary,
            src_root: None,
            num_tries: DEFAULT_NUM_TRIES,
            run_timeout: DEFAULT_RUN_TIMEOUT,
        }
    }

    /// Sets the source root used for location preference.
    pub fn with_src_root(mut self, src_root: Option<String>) -> Self {
        self.src_root = src_root;
        self
    }

    /// Sets the retry budget for crash samples.
    pub fn with_num_tries(mut self, num_tries: u32) -> Self {
        self.num_tries = num_tries.max(1);
        self
    }

    /// Sets the per-run time budget.
    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    pub fn src_root(&self) -> Option<&str> {
        self.src_root.as_deref()
    }

    fn stdin_file<'s>(&self, sample: &'s Path) -> Option<&'s Path> {
        (self.info.input_mode == InputMode::Stdin).then_some(sample)
    }

    /// Reproduce one crash candidate. The returned card is unfinalized;
    /// the caller runs [`IssueCard::finalize`] once titles are wanted.
    pub async fn reproduce_crash(&self, sample: &Path) -> Result<IssueCard> {
        let argv = self.info.reproduce_argv(&self.binary, sample);
        let envs = self.info.env_pairs();

        let mut verdict = Verdict::Unknown;
        let mut output = String::new();
        for attempt in 1..=self.num_tries {
            let run =
                runner::bounded_run(&argv, &envs, self.stdin_file(sample), self.run_timeout)
                    .await?;
            verdict = classify(run.exit_code, None, Some(&run.output));
            output = run.output;
            debug!(
                sample = %sample.display(),
                attempt,
                verdict = ?verdict,
                "basic run classified"
            );
            if verdict.is_bug() {
                break;
            }
        }

        // A bare "Crash" or marker-declared hang says nothing about where.
        // One debugger pass buys a backtrace; sanitizer verdicts already
        // carry their summary and skip it.
        if verdict.is_bug() && verdict.rank() <= Verdict::CrashGeneric.rank() {
            let target_args: Vec<String> = argv.iter().skip(1).cloned().collect();
            let gdb_argv = gdb::backtrace_argv(&self.binary, &target_args, self.stdin_file(sample));
            let dbg = runner::bounded_run(&gdb_argv, &envs, None, self.run_timeout).await?;
            output.push('\n');
            output.push_str(&dbg.output);
            let enriched = classify(None, None, Some(&output));
            if enriched.rank() > verdict.rank() {
                verdict = enriched;
            }
        }

        Ok(IssueCard::new(
            self.info.reproduce_cmd_string(&self.binary, sample),
            self.info.env_string(),
            self.binary.clone(),
            sample.to_path_buf(),
            verdict,
            Some(output),
        ))
    }

    /// Reproduce one hang candidate with a single debugger stepping run.
    pub async fn reproduce_hang(&self, sample: &Path) -> Result<IssueCard> {
        let target_args: Vec<String> = self
            .info
            .reproduce_argv(&self.binary, sample)
            .into_iter()
            .skip(1)
            .collect();
        let argv = gdb::stepping_argv(
            &self.binary,
            &target_args,
            self.stdin_file(sample),
            gdb::DEFAULT_STEP_COUNT,
        );
        let (_inner, outer) = gdb::split_debug_budget(self.run_timeout);
        let run = runner::bounded_run(&argv, &self.info.env_pairs(), None, outer).await?;
        let verdict = classify(run.exit_code, None, Some(&run.output));
        debug!(sample = %sample.display(), verdict = ?verdict, "stepping run classified");

        Ok(IssueCard::new(
            self.info.reproduce_cmd_string(&self.binary, sample),
            self.info.env_string(),
            self.binary.clone(),
            sample.to_path_buf(),
            verdict,
            Some(run.output),
        ))
    }

    /// Reproduce whole sample sets, keeping only cards that show a bug.
    /// A sample that fails to spawn is logged and skipped; it does not
    /// abort the remaining samples.
    pub async fn reproduce_all(&self, crashes: &[PathBuf], hangs: &[PathBuf]) -> Vec<IssueCard> {
        let mut cards = Vec::new();
        for sample in crashes {
            match self.reproduce_crash(sample).await {
                Ok(card) if card.verdict.is_bug() => cards.push(card),
                Ok(card) => debug!(
                    sample = %sample.display(),
                    verdict = ?card.verdict,
                    "sample did not reproduce, discarding"
                ),
                Err(e) => warn!(sample = %sample.display(), error = %e, "reproduction failed"),
            }
        }
        for sample in hangs {
            match self.reproduce_hang(sample).await {
                Ok(card) if card.verdict.is_bug() => cards.push(card),
                Ok(card) => debug!(
                    sample = %sample.display(),
                    verdict = ?card.verdict,
                    "hang did not reproduce, discarding"
                ),
                Err(e) => warn!(sample = %sample.display(), error = %e, "reproduction failed"),
            }
        }
        info!(
            binary = %self.binary.display(),
            crashes = crashes.len(),
            hangs = hangs.len(),
            reproduced = cards.len(),
            "sample reproduction finished"
        );
        cards
    }
}
