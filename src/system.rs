//! Running external programs.
//!
//! Every helper blocks until the child exits; there is no timeout.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use anyhow::{Context, Result};
use tracing::debug;
use crate::errors::ExecutionError;
use crate::util::ohai;

/// `program arg arg ...` as typed on a shell.
pub fn describe(cmd: &Command) -> String {
    let mut line = cmd.get_program().to_string_lossy().to_string();
    for arg in cmd.get_args() {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

fn execution_error(cmd: &Command, status: Option<i32>) -> ExecutionError {
    ExecutionError { command: describe(cmd), status }
}

/// Runs `cmd` with inherited stdio. A program that cannot be started counts as failure.
pub fn system(cmd: &mut Command, verbose: bool) -> bool {
    if verbose {
        println!("{}", describe(cmd));
    }
    match cmd.status() {
        Ok(status) => status.success(),
        Err(e) => {
            debug!("could not start {}: {e}", describe(cmd));
            false
        }
    }
}

/// Like [`system`], but a failure is an [`ExecutionError`].
pub fn safe_system(cmd: &mut Command, verbose: bool) -> Result<()> {
    if system(cmd, verbose) {
        Ok(())
    } else {
        Err(execution_error(cmd, None).into())
    }
}

/// Like [`system`] with stdout and stderr discarded.
pub fn quiet_system(cmd: &mut Command) -> bool {
    cmd.stdout(Stdio::null()).stderr(Stdio::null());
    system(cmd, false)
}

/// Runs `cmd` and returns its stdout. Stderr goes straight to the terminal.
///
/// On a non-success exit the captured stdout is printed before the
/// [`ExecutionError`] is returned.
pub fn execute(cmd: &mut Command, verbose: bool) -> Result<String> {
    let output = cmd
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .with_context(|| format!("Could not start {}", describe(cmd)))?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if !output.status.success() {
        print!("{stdout}");
        return Err(execution_error(cmd, output.status.code()).into());
    }
    if verbose {
        ohai(&describe(cmd), &[stdout.trim_end()]);
    }
    Ok(stdout)
}

/// Runs `cmd` and returns stdout followed by stderr, whatever the exit status.
///
/// Only fails when the program cannot be started.
pub fn capture_all(cmd: &mut Command) -> Result<String> {
    let output = cmd
        .stdin(Stdio::null())
        .env("LC_ALL", "C")
        .output()
        .with_context(|| format!("Could not start {}", describe(cmd)))?;
    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(text)
}

/// First executable named `program` on `PATH`.
pub fn which(program: &str) -> Option<PathBuf> {
    match which::which(program) {
        Ok(path) => Some(path),
        Err(e) => {
            debug!("{program} not found on PATH: {e}");
            None
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let mut cmd = Command::new("git");
        cmd.args(["pull", "origin", "master"]);
        assert_eq!(describe(&cmd), "git pull origin master");
    }

    #[test]
    fn test_system_reports_status() {
        assert!(system(Command::new("sh").args(["-c", "exit 0"]), false));
        assert!(!system(Command::new("sh").args(["-c", "exit 3"]), false));
        assert!(!system(&mut Command::new("brewctl-no-such-program"), false));
    }

    #[test]
    fn test_safe_system_names_command() {
        let err = safe_system(Command::new("sh").args(["-c", "exit 1"]), false).unwrap_err();
        let err = err.downcast::<ExecutionError>().unwrap();
        assert_eq!(err.command, "sh -c exit 1");
    }

    #[test]
    fn test_quiet_system() {
        assert!(quiet_system(Command::new("sh").args(["-c", "echo noisy; echo loud >&2"])));
    }

    #[test]
    fn test_execute_captures_stdout() {
        let out = execute(Command::new("sh").args(["-c", "echo hello; echo oops >&2"]), false).unwrap();
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn test_execute_failure_carries_status() {
        let err = execute(Command::new("sh").args(["-c", "echo partial; exit 4"]), false).unwrap_err();
        let err = err.downcast::<ExecutionError>().unwrap();
        assert_eq!(err.status, Some(4));
    }

    #[test]
    fn test_capture_all_ignores_status() {
        let out = capture_all(Command::new("sh").args(["-c", "echo a; echo b >&2; exit 2"])).unwrap();
        assert_eq!(out, "a\nb\n");
    }

    #[test]
    fn test_which_finds_sh() {
        assert!(which("sh").is_some());
        assert!(which("brewctl-no-such-program").is_none());
    }
}
