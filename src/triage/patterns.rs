//! Common, precompiled regex patterns for trace parsing and anonymization.
//!
//! Patterns are intentionally conservative to avoid catastrophic backtracking
//! and false positives on attacker-influenced crash output. Structural
//! validation (does the captured path carry a line number, is it under the
//! source root) happens after candidate extraction, not inside the regex.

use once_cell::sync::Lazy;
use regex::Regex;

// .NET-style exception traces
pub static RE_DOTNET_FRAME: Lazy<Regex> = Lazy::new(|| {
    // `at Ns.Class.Method(String arg) in /src/Fuzz.cs:line 38`
    Regex::new(r"(?m)^\s*at\s+([^\s(]+)\s*\([^)]*\)\s+in\s+(.+?):line\s+(\d+)")
        .expect("valid dotnet frame regex")
});
pub static RE_DOTNET_EXCEPTION: Lazy<Regex> = Lazy::new(|| {
    // `Unhandled exception. System.IndexOutOfRangeException: ...`
    Regex::new(r"Unhandled exception\.?\s+([A-Za-z_][A-Za-z0-9_.]*)\s*:")
        .expect("valid dotnet exception regex")
});

// Go-style panic traces: callsite line followed by an indented file:line
pub static RE_GO_FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([^\s(]+)\([^)]*\)\r?\n\t+(\S+\.go):(\d+)").expect("valid go frame regex")
});

// Debugger (gdb) backtraces
pub static RE_GDB_FRAME_WITH_ADDR: Lazy<Regex> = Lazy::new(|| {
    // Column-0 frames only; sanitizer allocation frames are indented.
    Regex::new(r"(?m)^#\d+\s+0x[0-9a-fA-F]+\s+in\s").expect("valid gdb frame gate regex")
});
pub static RE_GDB_FRAME_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^#\d+\s+(?:0x[0-9a-fA-F]+\s+in\s+)?(.+)$").expect("valid gdb tail regex")
});
pub static RE_GDB_FRAME_AT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bat\s+(\S+)").expect("valid gdb at regex"));

// Sanitizer reports
pub static RE_LSAN_ALLOC_FRAME: Lazy<Regex> = Lazy::new(|| {
    // Indented allocation frames inside a LeakSanitizer report.
    Regex::new(r"(?m)^\s+#\d+\s+0x[0-9a-fA-F]+\s+in\s+(\S+)\s+(\S+)")
        .expect("valid lsan frame regex")
});
pub static RE_UBSAN_SUMMARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"SUMMARY:\s+(?:UndefinedBehaviorSanitizer|CFISanitizer):\s+\S+\s+(\S+:\d+(?::\d+)?)")
        .expect("valid ubsan summary regex")
});
pub static RE_UBSAN_RUNTIME_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(\S+?:\d+(?::\d+)?):\s+runtime error:").expect("valid ubsan runtime regex")
});
// ASAN summaries come in two historical layouts; try the func-first one,
// then the location-first one.
pub static RE_ASAN_SUMMARY_FUNC_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"SUMMARY:\s+AddressSanitizer:\s+(\S+)(?:\s+[^\n]*?)?\s+in\s+([A-Za-z_][\w:.]*)\s+(\S+:\d+(?::\d+)?)")
        .expect("valid asan summary regex")
});
pub static RE_ASAN_SUMMARY_LOC_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"SUMMARY:\s+AddressSanitizer:\s+(\S+)\s+(\S+:\d+(?::\d+)?)\s+in\s+([A-Za-z_][\w:.]*)")
        .expect("valid asan summary regex")
});

// Hang stepping transcripts (`info line` output)
pub static RE_STEP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^Line\s+(\d+)\s+of\s+"([^"]+)"(.*)$"#).expect("valid step line regex")
});
pub static RE_STEP_FUNC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([A-Za-z_][A-Za-z0-9_:.]*)(?:\+\d+)?>").expect("valid step func regex")
});
pub const NOT_BEING_RUN: &str = "The program is not being run.";

// Anonymization
pub static RE_HEX_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"0x[0-9a-fA-F]+\b").expect("valid hex address regex"));
pub static RE_PID_BANNER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"==\d+==").expect("valid pid banner regex"));
pub static RE_THREAD_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bT\d+\b").expect("valid thread tag regex"));
pub static RE_JOB_CONTROL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(Segmentation fault|Aborted)\s+\(core dumped\).*$")
        .expect("valid job control regex")
});
pub static RE_PARENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^()]*\)").expect("valid parens regex"));
pub static RE_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
pub static RE_INT_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+\b").expect("valid int literal regex"));

// Location post-processing
pub static RE_TRAILING_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*:\d+):\d+$").expect("valid trailing column regex"));
pub static RE_LOCATION_FILE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bat\s+(\S+?):(\d+)\b").expect("valid file line regex"));
