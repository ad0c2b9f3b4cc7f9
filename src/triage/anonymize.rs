//! Text anonymization for stable issue titles.
//!
//! Crash output is full of run-specific noise: pointer values, sanitizer pid
//! banners, thread tags, call-argument values. Two reproductions of the same
//! bug must anonymize to byte-identical titles, since the title is the
//! deduplication key. Every replacement placeholder is a fixed point of its
//! own rule, which makes the whole transform idempotent.

use super::patterns::{
    RE_HEX_ADDRESS, RE_INT_LITERAL, RE_JOB_CONTROL, RE_PARENS, RE_PID_BANNER, RE_THREAD_TAG,
    RE_WHITESPACE,
};

/// Placeholder for pointer-sized hex values.
pub const ADDRESS_PLACEHOLDER: &str = "0xADDRESS";
/// Placeholder for the sanitizer pid banner.
pub const PID_PLACEHOLDER: &str = "==1==";
/// Placeholder for integer literals in the strict hashable form.
pub const NUMBER_PLACEHOLDER: &str = "<NUMBER>";

/// Anonymize a title candidate.
///
/// Applies, in order: hex-address replacement, pid-banner collapse,
/// thread-tag removal, shell job-control collapse, removal of every
/// parenthesized substring (innermost first, so nesting unwinds fully),
/// and whitespace normalization.
pub fn anonymize_title(text: &str) -> String {
    let text = RE_HEX_ADDRESS.replace_all(text, ADDRESS_PLACEHOLDER);
    let text = RE_PID_BANNER.replace_all(&text, PID_PLACEHOLDER);
    let text = RE_THREAD_TAG.replace_all(&text, "");
    let mut text = RE_JOB_CONTROL.replace_all(&text, "$1").into_owned();
    loop {
        let stripped = RE_PARENS.replace_all(&text, "").into_owned();
        if stripped == text {
            break;
        }
        text = stripped;
    }
    RE_WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Anonymize raw output for the strict, hash-based dedup form: the title
/// transform plus `<NUMBER>` substitution inside UBSAN runtime-error lines,
/// so differing literal values in the diagnostic do not split one bug into
/// many.
pub fn anonymize_output(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .map(|line| {
            if line.contains("runtime error:") {
                RE_INT_LITERAL.replace_all(line, NUMBER_PLACEHOLDER).into_owned()
            } else {
                line.to_string()
            }
        })
        .collect();
    anonymize_title(&lines.join("\n"))
}
