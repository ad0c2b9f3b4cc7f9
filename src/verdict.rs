//! Verdict taxonomy and run-output classification.
//!
//! A [`Verdict`] tags one reproduced run with what happened to the target.
//! Ranks are severity-ordered: a higher rank is a more specific or more
//! severe outcome, and everything at or above [`Verdict::Hang`] counts as an
//! observed bug. [`classify`] maps raw run evidence (exit code, hang flag,
//! captured text) to a verdict with an ordered first-match-wins rule list;
//! several marker phrases can co-occur in the same output, so the rule order
//! is part of the contract.

use crate::repro::gdb::{HANG_SECTION_BEGIN, HANG_SECTION_END};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a single reproduced run, ordered by severity rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Unknown,
    NoError,
    WarningLongRun,
    Hang,
    CrashGeneric,
    CrashSanitizer,
    CrashAsan,
    CrashUbsan,
    CrashCfisan,
    CrashLsan,
    CrashTsan,
    CrashMsan,
    CrashStackOverflow,
    CrashPanic,
    CrashUnhandledException,
    CrashOutOfMemory,
}

impl Verdict {
    /// Severity rank. Higher means more specific/severe; used for
    /// tie-breaking and for the stop-retrying decision.
    pub fn rank(&self) -> u32 {
        match self {
            Verdict::Unknown => 0,
            Verdict::NoError => 1,
            Verdict::WarningLongRun => 2,
            Verdict::Hang => 4,
            Verdict::CrashGeneric => 8,
            Verdict::CrashSanitizer => 16,
            Verdict::CrashAsan => 32,
            Verdict::CrashUbsan => 64,
            Verdict::CrashCfisan => 128,
            Verdict::CrashLsan => 256,
            Verdict::CrashTsan => 512,
            Verdict::CrashMsan => 1024,
            Verdict::CrashStackOverflow => 2048,
            Verdict::CrashPanic => 4096,
            Verdict::CrashUnhandledException => 8192,
            Verdict::CrashOutOfMemory => 16384,
        }
    }

    /// Human-readable description; doubles as the title prefix for cards.
    pub fn description(&self) -> &'static str {
        match self {
            Verdict::Unknown => "Wasn't able to determine verdict",
            Verdict::NoError => "No error occurred",
            Verdict::WarningLongRun => "Long run",
            Verdict::Hang => "Hang",
            Verdict::CrashGeneric => "Crash",
            Verdict::CrashSanitizer => "Sanitizer",
            Verdict::CrashAsan => "AddressSanitizer:",
            Verdict::CrashUbsan => "Undefined behavior",
            Verdict::CrashCfisan => "Control flow integrity violation",
            Verdict::CrashLsan => "Memory leak",
            Verdict::CrashTsan => "Data race",
            Verdict::CrashMsan => "Uninitialized memory use",
            Verdict::CrashStackOverflow => "Stack overflow",
            Verdict::CrashPanic => "Panic",
            Verdict::CrashUnhandledException => "Unhandled exception",
            Verdict::CrashOutOfMemory => "Out of memory",
        }
    }

    /// A bug was observed: no point re-running the sample.
    pub fn is_bug(&self) -> bool {
        self.rank() >= Verdict::Hang.rank()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// SIGABRT exit status as seen through the shell convention (128 + 6).
const EXIT_ABORT: i32 = 134;
/// LeakSanitizer default exitcode, also used by libFuzzer for leaks.
const EXIT_LSAN: i32 = 77;

/// Classify one reproduced run.
///
/// Total over its input domain: malformed or attacker-influenced text maps
/// to `Unknown`/`NoError`, never to a panic. Rules are evaluated top to
/// bottom and the first match wins.
pub fn classify(exit_code: Option<i32>, is_hang: Option<bool>, output: Option<&str>) -> Verdict {
    if is_hang == Some(true) {
        return Verdict::Hang;
    }
    let text = match output {
        Some(t) if !t.is_empty() => t,
        _ => return Verdict::Unknown,
    };

    if text.contains("libFuzzer: timeout") {
        return Verdict::Hang;
    }
    if text.contains("libFuzzer: out-of-memory")
        || text.contains("allocator is out of memory")
        || text.contains("fatal error: runtime: out of memory")
    {
        return Verdict::CrashOutOfMemory;
    }
    if text.contains("stack-overflow")
        || text.contains("fatal error: stack overflow")
        || text.contains("StackOverflowException")
    {
        return Verdict::CrashStackOverflow;
    }
    if text.contains(HANG_SECTION_BEGIN) && text.contains(HANG_SECTION_END) {
        return Verdict::Hang;
    }
    if text.contains("Segmentation fault")
        || text.contains("deadly signal")
        || text.contains("SIGSEGV")
    {
        return Verdict::CrashGeneric;
    }
    if text.contains("control flow integrity check") {
        return Verdict::CrashCfisan;
    }
    if exit_code == Some(EXIT_ABORT) && text.contains("Unhandled exception") {
        return Verdict::CrashUnhandledException;
    }
    let has_traceback = text.contains("Traceback (most recent call last):");
    if exit_code == Some(EXIT_ABORT) && has_traceback && text.contains("Aborted") {
        return Verdict::CrashGeneric;
    }
    if matches!(exit_code, Some(1) | Some(EXIT_LSAN) | Some(EXIT_ABORT)) && has_traceback {
        return Verdict::CrashUnhandledException;
    }
    if exit_code == Some(EXIT_LSAN) && text.contains("LeakSanitizer") {
        return Verdict::CrashLsan;
    }
    if text.contains("AddressSanitizer") {
        return Verdict::CrashAsan;
    }
    if text.contains("panic:") {
        return Verdict::CrashPanic;
    }
    if text.contains("UndefinedBehaviorSanitizer") || text.contains("runtime error:") {
        return Verdict::CrashUbsan;
    }
    if let Some(code) = exit_code {
        if code > 128 {
            return Verdict::CrashGeneric;
        }
    }
    // "runtime error:" is already claimed by the UBSAN rule above; only the
    // debugger phrase can still reach this arm.
    if text.contains("Program received signal") || text.contains("runtime error:") {
        return Verdict::CrashGeneric;
    }
    Verdict::NoError
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_ordering() {
        assert!(Verdict::Unknown.rank() < Verdict::NoError.rank());
        assert!(Verdict::Hang.rank() < Verdict::CrashGeneric.rank());
        assert!(Verdict::CrashPanic.rank() < Verdict::CrashOutOfMemory.rank());
        assert!(!Verdict::WarningLongRun.is_bug());
        assert!(Verdict::Hang.is_bug());
        assert!(Verdict::CrashAsan.is_bug());
    }

    #[test]
    fn test_serde_name() {
        let json = serde_json::to_string(&Verdict::CrashAsan).unwrap();
        assert_eq!(json, "\"CRASH_ASAN\"");
        let back: Verdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Verdict::CrashAsan);
    }

    #[test]
    fn test_hang_flag_beats_everything() {
        let out = "SUMMARY: AddressSanitizer: heap-buffer-overflow";
        assert_eq!(classify(Some(1), Some(true), Some(out)), Verdict::Hang);
    }

    #[test]
    fn test_empty_output_is_unknown() {
        assert_eq!(classify(Some(139), None, None), Verdict::Unknown);
        assert_eq!(classify(Some(139), Some(false), Some("")), Verdict::Unknown);
    }

    #[test]
    fn test_oom_before_asan() {
        // Both markers present; the OOM rule sits earlier in the order.
        let out = "==123==ERROR: AddressSanitizer: allocator is out of memory trying to allocate 0x10000000 bytes";
        assert_eq!(classify(Some(1), None, Some(out)), Verdict::CrashOutOfMemory);
    }

    #[test]
    fn test_stack_overflow_before_asan() {
        let out = "==99==ERROR: AddressSanitizer: stack-overflow on address 0x7ffd";
        assert_eq!(
            classify(Some(1), None, Some(out)),
            Verdict::CrashStackOverflow
        );
    }

    #[test]
    fn test_segv_phrases() {
        assert_eq!(
            classify(None, None, Some("Segmentation fault (core dumped)")),
            Verdict::CrashGeneric
        );
        assert_eq!(
            classify(None, None, Some("==5==ERROR: libFuzzer: deadly signal")),
            Verdict::CrashGeneric
        );
        assert_eq!(
            classify(None, None, Some("Program terminated with signal SIGSEGV")),
            Verdict::CrashGeneric
        );
    }

    #[test]
    fn test_cfi() {
        let out = "x.cpp:12:3: runtime error: control flow integrity check for type 'void (int)' failed";
        assert_eq!(classify(None, None, Some(out)), Verdict::CrashCfisan);
    }

    #[test]
    fn test_dotnet_unhandled_exception() {
        let out = "Unhandled exception. System.IndexOutOfRangeException: Index was outside the bounds of the array.";
        assert_eq!(
            classify(Some(134), None, Some(out)),
            Verdict::CrashUnhandledException
        );
        // Without the abort exit code this falls through to NoError.
        assert_eq!(classify(Some(0), None, Some(out)), Verdict::NoError);
    }

    #[test]
    fn test_python_traceback_rules() {
        let tb = "Traceback (most recent call last):\n  File \"fuzz.py\", line 5, in run\nIndexError: list index out of range";
        assert_eq!(
            classify(Some(1), None, Some(tb)),
            Verdict::CrashUnhandledException
        );
        let aborted = format!("{tb}\nAborted");
        assert_eq!(
            classify(Some(134), None, Some(&aborted)),
            Verdict::CrashGeneric
        );
    }

    #[test]
    fn test_lsan_exit_77() {
        let out = "==7==ERROR: LeakSanitizer: detected memory leaks";
        assert_eq!(classify(Some(77), None, Some(out)), Verdict::CrashLsan);
        // Same text with a different exit code falls through to the
        // generic sanitizer rules; LeakSanitizer contains "Sanitizer" only,
        // not "AddressSanitizer", so it lands on NoError.
        assert_eq!(classify(Some(0), None, Some(out)), Verdict::NoError);
    }

    #[test]
    fn test_asan_and_panic_and_ubsan() {
        assert_eq!(
            classify(
                Some(1),
                Some(false),
                Some("SUMMARY: AddressSanitizer: global-buffer-overflow /src/x.cpp:38:22 in fuzz")
            ),
            Verdict::CrashAsan
        );
        assert_eq!(
            classify(Some(2), None, Some("panic: runtime error: index out of range [3]")),
            Verdict::CrashPanic
        );
        assert_eq!(
            classify(
                None,
                None,
                Some("/src/x.cpp:29:31: runtime error: load of misaligned address")
            ),
            Verdict::CrashUbsan
        );
    }

    #[test]
    fn test_exit_over_128_is_generic() {
        assert_eq!(
            classify(Some(139), None, Some("some unrelated noise")),
            Verdict::CrashGeneric
        );
    }

    #[test]
    fn test_gdb_received_signal() {
        let out = "Program received signal SIGFPE, Arithmetic exception.";
        assert_eq!(classify(Some(0), None, Some(out)), Verdict::CrashGeneric);
    }

    #[test]
    fn test_default_no_error() {
        assert_eq!(classify(Some(0), Some(false), Some("all fine")), Verdict::NoError);
    }

    #[test]
    fn test_determinism() {
        let out = Some("==1==ERROR: AddressSanitizer: heap-use-after-free");
        let first = classify(Some(1), Some(false), out);
        for _ in 0..10 {
            assert_eq!(classify(Some(1), Some(false), out), first);
        }
    }
}
