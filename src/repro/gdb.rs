//! Debugger invocation lines for crash backtraces and hang stepping.
//!
//! Everything runs `gdb --batch` so a wedged debugger cannot hold the
//! harness hostage: the script either finishes or the outer timeout kills
//! the whole process group.

use std::path::Path;
use std::time::Duration;

/// Sentinel printed before the stepping sequence. The classifier treats a
/// transcript carrying both sentinels as a hang.
pub const HANG_SECTION_BEGIN: &str = "=== fuzztriage hang stepping begin ===";
/// Sentinel printed after the stepping sequence.
pub const HANG_SECTION_END: &str = "=== fuzztriage hang stepping end ===";

/// Number of `step`/`info line` pairs issued while localizing a hang.
pub const DEFAULT_STEP_COUNT: usize = 64;

/// Build a `gdb --batch` argv that runs the target to its crash and prints
/// a backtrace. `stdin_file` turns into a `run < file` redirect for targets
/// that consume the sample on stdin.
pub fn backtrace_argv(
    binary: &Path,
    target_args: &[String],
    stdin_file: Option<&Path>,
) -> Vec<String> {
    let run_cmd = match stdin_file {
        Some(path) => format!("run < {}", path.display()),
        None => "run".to_string(),
    };
    let mut argv = vec![
        "gdb".to_string(),
        "--batch".to_string(),
        "-ex".to_string(),
        "set pagination off".to_string(),
        "-ex".to_string(),
        run_cmd,
        "-ex".to_string(),
        "bt".to_string(),
        "--args".to_string(),
        binary.display().to_string(),
    ];
    argv.extend(target_args.iter().cloned());
    argv
}

/// Build a `gdb --batch` argv that brackets `steps` pairs of `step` /
/// `info line` between the hang sentinels. The step count bounds the inner
/// run; the caller applies the outer timeout as a backstop.
pub fn stepping_argv(
    binary: &Path,
    target_args: &[String],
    stdin_file: Option<&Path>,
    steps: usize,
) -> Vec<String> {
    let start_cmd = match stdin_file {
        Some(path) => format!("start < {}", path.display()),
        None => "start".to_string(),
    };
    let mut argv = vec![
        "gdb".to_string(),
        "--batch".to_string(),
        "-ex".to_string(),
        "set pagination off".to_string(),
        "-ex".to_string(),
        format!("echo {HANG_SECTION_BEGIN}\\n"),
        "-ex".to_string(),
        start_cmd,
    ];
    for _ in 0..steps {
        argv.push("-ex".to_string());
        argv.push("step".to_string());
        argv.push("-ex".to_string());
        argv.push("info line".to_string());
    }
    argv.push("-ex".to_string());
    argv.push(format!("echo {HANG_SECTION_END}\\n"));
    argv.push("-ex".to_string());
    argv.push("kill".to_string());
    argv.push("--args".to_string());
    argv.push(binary.display().to_string());
    argv.extend(target_args.iter().cloned());
    argv
}

/// Split a total debugger time budget into the inner stepping budget and
/// the outer kill backstop: the debugger gets ~90% of the budget to run,
/// the harness keeps the rest to kill and drain output.
pub fn split_debug_budget(total: Duration) -> (Duration, Duration) {
    (total * 9 / 10, total)
}
