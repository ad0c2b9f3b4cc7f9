//! Debugger stepping-transcript parsing for hang localization.
//!
//! A hang candidate is run under the debugger with a script that brackets a
//! sequence of alternating `step` / `info line` commands between sentinel
//! lines. Because a hang loops, the most frequently reported source line is
//! the loop body, more informative than the first line seen, so the
//! reported location is a majority vote over every `Line N of "file"` record
//! in the transcript.

use super::patterns::{NOT_BEING_RUN, RE_STEP_FUNC, RE_STEP_LINE};
use crate::repro::gdb::{HANG_SECTION_BEGIN, HANG_SECTION_END};
use std::collections::HashMap;
use tracing::debug;

/// Parse a stepping transcript into a hang location.
///
/// Returns `None` unless both sentinels are present, and `None` when the
/// transcript shows no debuggable run (no line-number records, e.g. a
/// repeated "The program is not being run.").
pub fn stepping_transcript(output: &str, _src_root: Option<&str>) -> Option<String> {
    if !(output.contains(HANG_SECTION_BEGIN) && output.contains(HANG_SECTION_END)) {
        return None;
    }

    // (file, line, func) -> (count, first-seen index); ties go to the
    // earliest tuple so repeated runs agree.
    let mut votes: HashMap<(String, String, Option<String>), (usize, usize)> = HashMap::new();
    for (idx, caps) in RE_STEP_LINE.captures_iter(output).enumerate() {
        let line = caps[1].to_string();
        let file = caps[2].to_string();
        let func = RE_STEP_FUNC.captures(&caps[3]).map(|c| c[1].to_string());
        votes
            .entry((file, line, func))
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, idx));
    }

    if votes.is_empty() {
        if output.contains(NOT_BEING_RUN) {
            debug!("stepping transcript shows no running program");
        }
        return None;
    }

    let ((file, line, func), _) = votes
        .into_iter()
        .max_by_key(|(_, (count, first))| (*count, std::cmp::Reverse(*first)))?;

    Some(match func {
        Some(func) => format!("in {func} at {file}:{line}"),
        None => format!("at {file}:{line}"),
    })
}
