//! Issue cards: one deduplicated, titled, located bug record per sample.

use crate::error::{Result, TriageToolError};
use crate::triage::anonymize::{anonymize_output, anonymize_title};
use crate::triage::location::{extract_crash_location, extract_hang_location};
use crate::triage::patterns::RE_LOCATION_FILE_LINE;
use crate::verdict::Verdict;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::debug;

/// Record produced per reproduced sample.
///
/// Two-phase lifecycle: a [`Reproducer`](crate::repro::Reproducer) constructs
/// the card with the run evidence (`verdict`, `output`, reproduce command),
/// then [`IssueCard::finalize`] runs location extraction and fills `title`,
/// `file`, and `line`. Cards are not mutated after finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueCard {
    /// Command line that reproduces the run
    pub reproduce_cmd: String,
    /// Environment assignments the command needs
    pub reproduce_env: String,
    /// Raw captured output (stdout + stderr), lossily decoded
    pub output: Option<String>,
    /// Target binary the sample was run against
    pub binary: PathBuf,
    /// Crash/hang sample file
    pub sample: PathBuf,
    /// Parsed source file of the bug location
    pub file: Option<String>,
    /// Parsed source line of the bug location
    pub line: Option<u32>,
    pub verdict: Verdict,
    /// Anonymized title; the deduplication key
    pub title: String,
}

impl IssueCard {
    /// Create a card from run evidence. `title`/`file`/`line` stay empty
    /// until [`IssueCard::finalize`].
    pub fn new(
        reproduce_cmd: impl Into<String>,
        reproduce_env: impl Into<String>,
        binary: PathBuf,
        sample: PathBuf,
        verdict: Verdict,
        output: Option<String>,
    ) -> Self {
        Self {
            reproduce_cmd: reproduce_cmd.into(),
            reproduce_env: reproduce_env.into(),
            output,
            binary,
            sample,
            file: None,
            line: None,
            verdict,
            title: String::new(),
        }
    }

    /// Run location extraction and set the card's title and parsed location.
    ///
    /// Hang cards go through the hang extractor (stepping transcripts),
    /// everything else through the crash chain. A card whose output yields
    /// no location is titled with the bare verdict description.
    pub fn finalize(&mut self, src_root: Option<&str>) {
        let location = self.output.as_deref().and_then(|out| {
            if self.verdict == Verdict::Hang {
                extract_hang_location(out, src_root)
            } else {
                extract_crash_location(out, src_root)
            }
        });

        let title = match location {
            // A managed-runtime location already leads with the exception
            // phrase; don't stutter it after the verdict description.
            Some(loc) if loc.starts_with(self.verdict.description()) => loc,
            Some(loc) => format!("{} {}", self.verdict.description(), loc),
            None => {
                debug!(
                    sample = %self.sample.display(),
                    verdict = %self.verdict,
                    "no location extracted, titling with verdict only"
                );
                self.verdict.description().to_string()
            }
        };
        self.title = anonymize_title(&title);

        if let Some(caps) = RE_LOCATION_FILE_LINE.captures(&self.title) {
            self.file = Some(caps[1].to_string());
            self.line = caps[2].parse().ok();
        }
    }

    /// Strict dedup form: the anonymized raw output (with `<NUMBER>`
    /// substitution on UBSAN runtime-error lines). Not used by the default
    /// pipeline, which dedups on titles.
    pub fn to_hashable_str(&self) -> String {
        match &self.output {
            Some(out) => anonymize_output(out),
            None => self.title.clone(),
        }
    }

    /// Hex SHA-256 of [`IssueCard::to_hashable_str`].
    pub fn output_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_hashable_str().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| TriageToolError::Serialization(format!("issue card: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(verdict: Verdict, output: &str) -> IssueCard {
        IssueCard::new(
            "./target sample",
            "ASAN_OPTIONS=abort_on_error=1",
            PathBuf::from("/bin/target"),
            PathBuf::from("/sync/crashes/id:000001"),
            verdict,
            Some(output.to_string()),
        )
    }

    #[test]
    fn test_finalize_builds_title_from_verdict_and_location() {
        let mut c = card(
            Verdict::CrashAsan,
            "SUMMARY: AddressSanitizer: global-buffer-overflow /src/x.cpp:38:22 in fuzz",
        );
        c.finalize(Some("/src"));
        assert_eq!(
            c.title,
            "AddressSanitizer: global-buffer-overflow in fuzz at /src/x.cpp:38"
        );
        assert_eq!(c.file.as_deref(), Some("/src/x.cpp"));
        assert_eq!(c.line, Some(38));
    }

    #[test]
    fn test_finalize_without_location_falls_back_to_description() {
        let mut c = IssueCard::new(
            "./target sample",
            "",
            PathBuf::from("/bin/target"),
            PathBuf::from("/sync/hangs/id:000002"),
            Verdict::Hang,
            None,
        );
        c.finalize(None);
        assert_eq!(c.title, "Hang");
        assert!(c.file.is_none());
        assert!(c.line.is_none());
    }

    #[test]
    fn test_hang_cards_use_hang_chain() {
        // A crash-style gdb backtrace must not satisfy a hang card.
        let mut c = card(
            Verdict::Hang,
            "#0  0x00000000004005c6 in fuzz () at /src/x.c:29",
        );
        c.finalize(Some("/src"));
        assert_eq!(c.title, "Hang");
    }

    #[test]
    fn test_json_contract_keys() {
        let mut c = card(
            Verdict::CrashUbsan,
            "/src/x.cpp:29:31: runtime error: load of misaligned address",
        );
        c.finalize(Some("/src"));
        let json = c.to_json_string().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["verdict"], "CRASH_UBSAN");
        assert_eq!(value["title"], "Undefined behavior at /src/x.cpp:29");
        assert_eq!(value["file"], "/src/x.cpp");
        assert_eq!(value["line"], 29);
        for key in [
            "reproduce_cmd",
            "reproduce_env",
            "output",
            "binary",
            "sample",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn test_output_digest_ignores_numeric_drift_in_runtime_errors() {
        let a = card(
            Verdict::CrashUbsan,
            "x.cpp:9:5: runtime error: signed integer overflow: 2147483647 + 1",
        );
        let b = card(
            Verdict::CrashUbsan,
            "x.cpp:9:5: runtime error: signed integer overflow: 1000000 + 99",
        );
        assert_eq!(a.output_digest(), b.output_digest());
    }
}
