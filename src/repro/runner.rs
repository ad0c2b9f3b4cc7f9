//! Bounded subprocess execution for sample reproduction.
//!
//! Two modes, per the reproduction model: a bounded run (target killed at
//! the timeout, combined output captured) and a debugger run (the debugger's
//! own script self-terminates; the timeout here is only the outer backstop).
//! Output is fully buffered; the classifier wants the whole text, not rows.

use crate::error::{Result, TriageToolError};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Outcome of one bounded run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Exit code, with signal deaths mapped to `128 + signal` (shell
    /// convention) so the classifier's numeric rules apply uniformly.
    pub exit_code: Option<i32>,
    /// Combined stdout + stderr, lossily decoded.
    pub output: String,
    /// The run hit the timeout and was killed. A normal outcome, not an
    /// error; hangs are only declared by markers or the hang flag.
    pub timed_out: bool,
}

/// Run `argv` with `envs`, optionally feeding `stdin_file`, killing the
/// process after `limit`.
pub async fn bounded_run(
    argv: &[String],
    envs: &[(String, String)],
    stdin_file: Option<&Path>,
    limit: Duration,
) -> Result<RunOutcome> {
    let (program, args) = argv.split_first().ok_or_else(|| TriageToolError::Spawn {
        command: String::new(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"),
    })?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    match stdin_file {
        Some(path) => {
            let file = std::fs::File::open(path)?;
            cmd.stdin(Stdio::from(file));
        }
        None => {
            cmd.stdin(Stdio::null());
        }
    }

    let mut child = cmd.spawn().map_err(|source| TriageToolError::Spawn {
        command: argv.join(" "),
        source,
    })?;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();

    let status = {
        let drain_and_wait = async {
            if let Some(out) = stdout.as_mut() {
                let _ = out.read_to_end(&mut out_buf).await;
            }
            if let Some(err) = stderr.as_mut() {
                let _ = err.read_to_end(&mut err_buf).await;
            }
            child.wait().await
        };
        match timeout(limit, drain_and_wait).await {
            Ok(status) => Some(status?),
            Err(_) => None,
        }
    };

    let timed_out = status.is_none();
    if timed_out {
        warn!(command = %argv.join(" "), seconds = limit.as_secs(), "run timed out, killing");
        let _ = child.start_kill();
        let _ = child.wait().await;
        // Pick up whatever the target managed to write. Bounded: a killed
        // target's orphaned children can keep the pipe open indefinitely.
        let drain_limit = Duration::from_millis(500);
        if let Some(out) = stdout.as_mut() {
            let _ = timeout(drain_limit, out.read_to_end(&mut out_buf)).await;
        }
        if let Some(err) = stderr.as_mut() {
            let _ = timeout(drain_limit, err.read_to_end(&mut err_buf)).await;
        }
    }

    let mut output = String::from_utf8_lossy(&out_buf).into_owned();
    output.push_str(&String::from_utf8_lossy(&err_buf));

    let exit_code = status.and_then(exit_code_of);
    debug!(
        command = %argv.join(" "),
        exit_code = ?exit_code,
        timed_out,
        output_len = output.len(),
        "run finished"
    );
    Ok(RunOutcome {
        exit_code,
        output,
        timed_out,
    })
}

fn exit_code_of(status: std::process::ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(128 + signal);
        }
    }
    status.code()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let run = bounded_run(
            &argv(&["sh", "-c", "echo hello; echo oops >&2; exit 3"]),
            &[],
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(run.exit_code, Some(3));
        assert!(run.output.contains("hello"));
        assert!(run.output.contains("oops"));
        assert!(!run.timed_out);
    }

    #[tokio::test]
    async fn test_signal_death_maps_to_shell_convention() {
        let run = bounded_run(
            &argv(&["sh", "-c", "kill -ABRT $$"]),
            &[],
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(run.exit_code, Some(134));
    }

    #[tokio::test]
    async fn test_timeout_kills_and_keeps_partial_output() {
        let run = bounded_run(
            &argv(&["sh", "-c", "echo before; sleep 30"]),
            &[],
            None,
            Duration::from_millis(300),
        )
        .await
        .unwrap();
        assert!(run.timed_out);
        assert!(run.exit_code.is_none());
        assert!(run.output.contains("before"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_tool_error() {
        let err = bounded_run(
            &argv(&["/definitely/not/a/binary"]),
            &[],
            None,
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TriageToolError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_env_is_passed() {
        let run = bounded_run(
            &argv(&["sh", "-c", "echo $PROBE"]),
            &[("PROBE".to_string(), "visible".to_string())],
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert!(run.output.contains("visible"));
    }
}
