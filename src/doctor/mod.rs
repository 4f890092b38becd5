//! Host diagnostics.
//!
//! A diagnostic is a list of independent [`Check`]s. A check that has nothing
//! to say writes nothing; a check that fails or panics is treated the same
//! way. The whole list runs in a child process (this binary re-executed with
//! [`CHILD_SUBCOMMAND`]) whose stdout is a pipe, so nothing a check does can
//! reach the caller's own stdout until the report is complete.

pub mod checks;

use std::fmt;
use std::io::{Read, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};
use crate::global::settings::{EnvFlags, Settings};

/// Hidden subcommand the parent uses to start the isolated check run.
pub const CHILD_SUBCOMMAND: &str = "__doctor-checks";

pub const ALL_CLEAR: &str = "Your system is ripe for brewing. Any troubles you may be experiencing are\nlikely purely psychosomatic.";

pub type CheckFn = fn(&CheckContext, &mut dyn Write) -> Result<()>;

/// A named, parameterless inspection of one host fact.
#[derive(Clone, Copy)]
pub struct Check {
    pub name: &'static str,
    pub run: CheckFn,
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check").field("name", &self.name).finish()
    }
}

/// Host facts the checks look at.
#[derive(Debug, Clone)]
pub struct CheckContext {
    /// Installation prefix.
    pub prefix: PathBuf,
    /// Filesystem root; other package managers are looked for below it.
    pub root: PathBuf,
    /// `PATH` entries, in order.
    pub path: Vec<PathBuf>,
}

impl CheckContext {
    pub fn from_settings(settings: &Settings) -> Self {
        let path = std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default();
        Self {
            prefix: settings.prefix.clone(),
            root: PathBuf::from("/"),
            path,
        }
    }

    /// First executable named `program` on [`CheckContext::path`].
    pub fn find_program(&self, program: &str) -> Option<PathBuf> {
        if self.path.is_empty() {
            return None;
        }
        let search = std::env::join_paths(&self.path).ok()?;
        let cwd = std::env::current_dir().ok()?;
        which::which_in(program, Some(search), cwd).ok()
    }

    pub fn prefix_join<P: AsRef<Path>>(&self, rel: P) -> PathBuf {
        self.prefix.join(rel)
    }
}

/// Runs every check once, in order, appending each one's output to `out`.
///
/// A check's output is kept only if it returns `Ok`.
pub fn run_checks(checks: &[Check], ctx: &CheckContext, out: &mut dyn Write) -> Result<()> {
    for check in checks {
        let mut buffer: Vec<u8> = Vec::new();
        let outcome = catch_unwind(AssertUnwindSafe(|| (check.run)(ctx, &mut buffer)));
        match outcome {
            Ok(Ok(())) => out.write_all(&buffer)?,
            Ok(Err(e)) => debug!("check {} failed, ignoring: {e:#}", check.name),
            Err(_) => debug!("check {} panicked, ignoring", check.name),
        }
    }
    out.flush()?;
    Ok(())
}

/// Runs `cmd` with stdout on a pipe and returns everything it wrote.
///
/// The pipe is drained to end-of-stream before the child is waited on. A
/// non-success exit is logged; the text captured up to that point is still
/// returned.
pub fn capture_isolated(cmd: &mut Command) -> Result<String> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()
        .context("Could not start the diagnostic process")?;
    let mut pipe = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("Diagnostic process has no stdout"))?;
    let mut bytes = Vec::new();
    pipe.read_to_end(&mut bytes)?;
    drop(pipe);

    let status = child.wait()?;
    if !status.success() {
        warn!("diagnostic process exited with {status}");
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Outcome of a diagnostic run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    AllClear,
    /// Every concern raised, verbatim and in check order.
    Concerns(String),
}

impl Report {
    pub fn from_output(text: String) -> Report {
        if text.trim().is_empty() {
            Report::AllClear
        } else {
            Report::Concerns(text)
        }
    }

    pub fn is_all_clear(&self) -> bool {
        matches!(self, Report::AllClear)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::AllClear => f.write_str(ALL_CLEAR),
            Report::Concerns(text) => f.write_str(text),
        }
    }
}

/// Runs the standard checks in a child copy of the current executable.
///
/// The child inherits the environment; `env` is forwarded so its logging
/// matches the parent's flags.
pub fn run_diagnostics(env: EnvFlags) -> Result<Report> {
    let exe = std::env::current_exe().context("Could not locate the running executable")?;
    let mut cmd = Command::new(exe);
    cmd.arg(CHILD_SUBCOMMAND);
    if env.verbose {
        cmd.env("BREWCTL_VERBOSE", "1");
    }
    if env.debug {
        cmd.env("BREWCTL_DEBUG", "1");
    }
    let output = capture_isolated(&mut cmd)?;
    Ok(Report::from_output(output))
}

/// Body of the isolated child: every standard check, straight to stdout.
pub fn run_child(settings: &Settings) -> Result<()> {
    let ctx = CheckContext::from_settings(settings);
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    run_checks(checks::STANDARD, &ctx, &mut lock)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet(_: &CheckContext, _: &mut dyn Write) -> Result<()> {
        Ok(())
    }

    fn says_x(_: &CheckContext, out: &mut dyn Write) -> Result<()> {
        write!(out, "X")?;
        Ok(())
    }

    fn fails_halfway(_: &CheckContext, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "half a sentence")?;
        Err(anyhow!("tool vanished"))
    }

    fn panics(_: &CheckContext, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "about to")?;
        panic!("boom");
    }

    fn ctx() -> CheckContext {
        CheckContext { prefix: PathBuf::from("/usr/local"), root: PathBuf::from("/"), path: vec![] }
    }

    fn render(checks: &[Check]) -> String {
        let mut out = Vec::new();
        run_checks(checks, &ctx(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_only_speaking_checks_appear() {
        let checks = [Check { name: "a", run: quiet }, Check { name: "b", run: says_x }];
        assert_eq!(render(&checks), "X");
    }

    #[test]
    fn test_output_in_check_order() {
        let checks = [
            Check { name: "b", run: says_x },
            Check { name: "a", run: quiet },
            Check { name: "b2", run: says_x },
        ];
        assert_eq!(render(&checks), "XX");
    }

    #[test]
    fn test_failing_check_is_silent() {
        let checks = [
            Check { name: "broken", run: fails_halfway },
            Check { name: "x", run: says_x },
        ];
        assert_eq!(render(&checks), "X");
    }

    #[test]
    fn test_panicking_check_does_not_stop_the_rest() {
        let checks = [Check { name: "panics", run: panics }, Check { name: "x", run: says_x }];
        assert_eq!(render(&checks), "X");
    }

    #[test]
    fn test_report_verdict() {
        assert_eq!(Report::from_output(String::new()), Report::AllClear);
        assert_eq!(Report::from_output(" \n\n\t".to_string()), Report::AllClear);
        let report = Report::from_output("X\n\n".to_string());
        assert!(!report.is_all_clear());
        assert_eq!(report.to_string(), "X\n\n");
        assert_eq!(Report::AllClear.to_string(), ALL_CLEAR);
    }

    #[cfg(unix)]
    #[test]
    fn test_find_program_follows_path_order() {
        use std::os::unix::fs::PermissionsExt;
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        // not executable, skipped
        std::fs::write(first.path().join("pkg-config"), "#!/bin/sh\n").unwrap();
        let tool = second.path().join("pkg-config");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut ctx = ctx();
        assert_eq!(ctx.find_program("pkg-config"), None);
        ctx.path = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(ctx.find_program("pkg-config"), Some(tool));
        assert_eq!(ctx.find_program("brewctl-no-such-program"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_isolated_reads_child_stdout() {
        let out = capture_isolated(Command::new("sh").args(["-c", "printf 'one\\n'; echo err >&2; printf 'two\\n'"]))
            .unwrap();
        assert_eq!(out, "one\ntwo\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_isolated_keeps_output_of_crashed_child() {
        let out = capture_isolated(Command::new("sh").args(["-c", "echo partial; kill -9 $$"])).unwrap();
        assert_eq!(out, "partial\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_isolated_large_output() {
        // more than a pipe buffer; must not deadlock
        let out = capture_isolated(Command::new("sh").args(["-c", "i=0; while [ $i -lt 20000 ]; do echo line-$i; i=$((i+1)); done"]))
            .unwrap();
        assert_eq!(out.lines().count(), 20000);
    }
}
