//! Crash/hang location extraction from captured run output.
//!
//! Different run harnesses produce structurally different traces: a
//! managed-runtime binary prints exception frames, a Go target prints a
//! panic trace, a debugger prints numbered backtrace frames, and sanitizer
//! runtimes print summary lines. No single parser covers them all, so
//! extraction is a prioritized chain of format-specific extractors. Each
//! extractor returns `None` on non-match (never an error) and the chain
//! falls through to the next.
//!
//! Extracted locations read `in <function> at <file>:<line>` or
//! `at <file>:<line>` and feed directly into issue titles, so their exact
//! shape is part of the deduplication contract.

use super::patterns::{
    RE_ASAN_SUMMARY_FUNC_FIRST, RE_ASAN_SUMMARY_LOC_FIRST, RE_DOTNET_EXCEPTION, RE_DOTNET_FRAME,
    RE_GDB_FRAME_AT, RE_GDB_FRAME_TAIL, RE_GDB_FRAME_WITH_ADDR, RE_GO_FRAME, RE_LSAN_ALLOC_FRAME,
    RE_TRAILING_COLUMN, RE_UBSAN_RUNTIME_ERROR, RE_UBSAN_SUMMARY,
};
use super::stepping::stepping_transcript;
use tracing::trace;

/// One format-specific extractor. `None` means "not my format".
type Extractor = fn(&str, Option<&str>) -> Option<String>;

const CRASH_CHAIN: &[(&str, Extractor)] = &[
    ("dotnet", dotnet_exception_trace),
    ("go-panic", go_panic_trace),
    ("gdb", gdb_backtrace),
    ("sanitizer", sanitizer_summary),
];

const HANG_CHAIN: &[(&str, Extractor)] = &[
    ("dotnet", dotnet_exception_trace),
    ("go-panic", go_panic_trace),
    ("stepping", stepping_transcript),
];

/// Extract a crash location from raw output, preferring frames under
/// `src_root` when one is given.
pub fn extract_crash_location(output: &str, src_root: Option<&str>) -> Option<String> {
    run_chain(CRASH_CHAIN, output, src_root)
}

/// Extract a hang location. Managed/panic traces are checked first (a hang
/// watchdog can still fire inside them), then the stepping transcript.
pub fn extract_hang_location(output: &str, src_root: Option<&str>) -> Option<String> {
    run_chain(HANG_CHAIN, output, src_root)
}

fn run_chain(chain: &[(&str, Extractor)], output: &str, src_root: Option<&str>) -> Option<String> {
    for (name, extract) in chain {
        if let Some(loc) = extract(output, src_root) {
            trace!(extractor = name, location = %loc, "location extracted");
            return Some(strip_column(&loc));
        }
    }
    None
}

/// Drop a trailing `:column` from `file:line:column` so titles stay stable
/// across sanitizer versions that disagree on columns.
fn strip_column(location: &str) -> String {
    match RE_TRAILING_COLUMN.captures(location) {
        Some(caps) => caps[1].to_string(),
        None => location.to_string(),
    }
}

/// Collapse `./` segments. `../` segments are preserved verbatim: the triage
/// host has no source checkout to resolve them against, and titles must not
/// shift depending on whether one is present.
fn normalize_path(path: &str) -> String {
    if !path.contains("./") {
        return path.to_string();
    }
    let absolute = path.starts_with('/');
    let joined = path
        .split('/')
        .filter(|seg| *seg != "." && !seg.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

fn under_root(path: &str, src_root: Option<&str>) -> bool {
    src_root.map_or(false, |root| path.starts_with(root))
}

/// Managed-runtime (.NET-style) exception trace.
///
/// Frames look like `at Ns.Fuzz.Run(Byte[] data) in /src/Fuzz.cs:line 38`.
/// The first frame under `src_root` wins, else the first frame overall. When
/// the output carries an `Unhandled exception. <Type>:` marker line the type
/// name is prefixed to the result.
fn dotnet_exception_trace(output: &str, src_root: Option<&str>) -> Option<String> {
    let frames: Vec<(String, String, String)> = RE_DOTNET_FRAME
        .captures_iter(output)
        .map(|c| (c[1].to_string(), c[2].to_string(), c[3].to_string()))
        .collect();
    let (callsite, file, line) = frames
        .iter()
        .find(|(_, file, _)| under_root(file, src_root))
        .or_else(|| frames.first())?;

    let base = format!("in {callsite} at {}:{line}", normalize_path(file));
    match RE_DOTNET_EXCEPTION.captures(output) {
        Some(caps) => Some(format!("Unhandled exception {} {base}", &caps[1])),
        None => Some(base),
    }
}

/// Go-style panic trace.
///
/// Stanzas pair a callsite line with an indented `<file>.go:<line>` line:
///
/// ```text
/// _/src/go.check_index(0x40e0f8, 0x3)
///     /src/go/fuzzable.go:8 +0x3a
/// ```
///
/// The function name is the callsite text after the final path separator.
fn go_panic_trace(output: &str, src_root: Option<&str>) -> Option<String> {
    let frames: Vec<(String, String, String)> = RE_GO_FRAME
        .captures_iter(output)
        .map(|c| {
            let callsite = &c[1];
            let func = callsite.rsplit('/').next().unwrap_or(callsite);
            (func.to_string(), c[2].to_string(), c[3].to_string())
        })
        .collect();
    let (func, file, line) = frames
        .iter()
        .find(|(_, file, _)| under_root(file, src_root))
        .or_else(|| frames.first())?;
    Some(format!("in {func} at {}:{line}", normalize_path(file)))
}

/// Debugger backtrace.
///
/// Requires at least one `#N 0x<addr> in ...` frame line (column 0;
/// indented frames belong to sanitizer reports). Prefers the first frame
/// whose `at <path>` location is under `src_root`, else the topmost frame
/// with any `at`/`from` tail.
fn gdb_backtrace(output: &str, src_root: Option<&str>) -> Option<String> {
    if !RE_GDB_FRAME_WITH_ADDR.is_match(output) {
        return None;
    }
    let tails: Vec<String> = RE_GDB_FRAME_TAIL
        .captures_iter(output)
        .map(|c| c[1].trim().to_string())
        .filter(|t| t.contains(" at ") || t.starts_with("at ") || t.contains(" from "))
        .collect();
    let chosen = tails
        .iter()
        .find(|t| {
            RE_GDB_FRAME_AT
                .captures(t)
                .map_or(false, |c| under_root(&c[1], src_root))
        })
        .or_else(|| tails.first())?;

    let mut tail = chosen.clone();
    if let Some(caps) = RE_GDB_FRAME_AT.captures(chosen) {
        let raw = &caps[1];
        tail = tail.replace(raw, &normalize_path(raw));
    }
    if tail.starts_with("in ") || tail.starts_with("at ") {
        Some(tail)
    } else {
        Some(format!("in {tail}"))
    }
}

/// Sanitizer summary text, tried in a fixed order: leak-sanitizer
/// allocation frames, UBSAN/CFISAN one-line summary, UBSAN runtime-error
/// line without a summary, ASAN summary line.
fn sanitizer_summary(output: &str, src_root: Option<&str>) -> Option<String> {
    if output.contains("LeakSanitizer") {
        let frames: Vec<(String, String)> = RE_LSAN_ALLOC_FRAME
            .captures_iter(output)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect();
        let chosen = frames
            .iter()
            .find(|(_, loc)| under_root(loc, src_root))
            .or_else(|| if src_root.is_none() { frames.first() } else { None });
        if let Some((func, loc)) = chosen {
            return Some(format!("in {func} at {}", normalize_path(loc)));
        }
    }

    if let Some(caps) = RE_UBSAN_SUMMARY.captures(output) {
        return Some(format!("at {}", normalize_path(&caps[1])));
    }
    if let Some(caps) = RE_UBSAN_RUNTIME_ERROR.captures(output) {
        return Some(format!("at {}", normalize_path(&caps[1])));
    }

    let (issue_type, func, loc) = if let Some(c) = RE_ASAN_SUMMARY_FUNC_FIRST.captures(output) {
        (c[1].to_string(), c[2].to_string(), c[3].to_string())
    } else if let Some(c) = RE_ASAN_SUMMARY_LOC_FIRST.captures(output) {
        (c[1].to_string(), c[3].to_string(), c[2].to_string())
    } else {
        return None;
    };
    let loc = normalize_path(&loc);
    // SEGV carries no useful issue type; the verdict already says "crash".
    if issue_type == "SEGV" {
        Some(format!("in {func} at {loc}"))
    } else {
        Some(format!("{issue_type} in {func} at {loc}"))
    }
}
