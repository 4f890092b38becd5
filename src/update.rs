//! Keeping the formula repository in step with the remote.
//!
//! [`Updater::update_from_remote`] makes sure the repository is a git
//! checkout of the canonical branch, pulls, and classifies the pull output
//! into added and updated formulae.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Command;
use std::sync::LazyLock;
use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};
use crate::global::settings::Settings;
use crate::system::{execute, safe_system};

/// Revision reported when the repository has none (no checkout, no commits).
pub const UNKNOWN_REVISION: &str = "TAIL";

/// What `git pull` prints when there was nothing to fetch. Older releases
/// hyphenate; some omit the full stop.
pub const UP_TO_DATE: &[&str] = &[
    "Already up-to-date.",
    "Already up-to-date",
    "Already up to date.",
    "Already up to date",
];

static ADDED_FORMULA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*create mode \d+ Library/Formula/(.+?)\.rb$").expect("valid added-formula regex")
});

static UPDATED_FORMULA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*Library/Formula/(.+?)\.rb\s").expect("valid updated-formula regex")
});

pub fn is_up_to_date(output: &str) -> bool {
    let output = output.trim();
    UP_TO_DATE.iter().any(|sentinel| *sentinel == output)
}

/// Formulae touched by a pull, each list sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormulaChanges {
    pub added: Vec<String>,
    /// Modified formulae; never repeats a name from `added`.
    pub updated: Vec<String>,
}

/// Reads the diffstat and summary lines of `git pull` output.
///
/// A formula that was created is reported as added only, even though its
/// diffstat line also matches the modified pattern.
pub fn classify_pull_output(output: &str) -> FormulaChanges {
    let mut added = BTreeSet::new();
    let mut updated = BTreeSet::new();
    for line in output.lines() {
        if let Some(caps) = ADDED_FORMULA.captures(line) {
            added.insert(caps[1].to_string());
        } else if let Some(caps) = UPDATED_FORMULA.captures(line) {
            updated.insert(caps[1].to_string());
        }
    }
    FormulaChanges {
        updated: updated.difference(&added).cloned().collect(),
        added: added.into_iter().collect(),
    }
}

/// Result of one `brewctl update`, as printed by `--json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Whether the pull brought anything in.
    pub changed: bool,
    pub previous_revision: String,
    pub current_revision: String,
    pub added: Vec<String>,
    pub updated: Vec<String>,
}

#[derive(Debug)]
pub struct Updater {
    repository: PathBuf,
    remote: String,
    branch: String,
    verbose: bool,
    changes: FormulaChanges,
}

impl Updater {
    pub fn new(settings: &Settings, verbose: bool) -> Self {
        Self {
            repository: settings.repository.clone(),
            remote: settings.remote.clone(),
            branch: settings.branch.clone(),
            verbose,
            changes: FormulaChanges::default(),
        }
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.repository).env("LC_ALL", "C");
        cmd
    }

    /// Pulls the canonical branch from the remote.
    ///
    /// Returns `true` if anything was pulled, `false` if the repository was
    /// already up to date. Initialises the repository first if it is not a
    /// git checkout yet.
    ///
    /// # Errors
    ///
    /// An [`crate::errors::ExecutionError`] naming the git command that failed.
    /// Nothing is retried.
    pub fn update_from_remote(&mut self) -> Result<bool> {
        std::fs::create_dir_all(&self.repository)
            .with_context(|| format!("Could not create {}", self.repository.display()))?;

        if self.repository.join(".git").is_dir() {
            safe_system(self.git().args(["checkout", "-q", self.branch.as_str()]), self.verbose)?;
        } else {
            info!("initialising {}", self.repository.display());
            safe_system(self.git().args(["init", "-q"]), self.verbose)?;
            let head = format!("refs/heads/{}", self.branch);
            safe_system(self.git().args(["symbolic-ref", "HEAD", head.as_str()]), self.verbose)?;
        }

        let output = execute(self.git().args(["pull", self.remote.as_str(), self.branch.as_str()]), self.verbose)?;
        debug!("pull output:\n{output}");

        self.changes = classify_pull_output(&output);
        Ok(!is_up_to_date(&output))
    }

    pub fn added_formulae(&self) -> &[String] {
        &self.changes.added
    }

    pub fn updated_formulae(&self) -> &[String] {
        &self.changes.updated
    }

    pub fn pending_formulae_changes(&self) -> bool {
        !self.changes.updated.is_empty()
    }

    /// Hash of the latest commit, or [`UNKNOWN_REVISION`]. Never fails.
    pub fn current_revision(&self) -> String {
        let mut cmd = self.git();
        cmd.args(["log", "-1", "--pretty=format:%H"]);
        match execute(&mut cmd, false) {
            Ok(out) if !out.trim().is_empty() => out.trim().to_string(),
            Ok(_) => UNKNOWN_REVISION.to_string(),
            Err(e) => {
                debug!("no revision for {}: {e:#}", self.repository.display());
                UNKNOWN_REVISION.to_string()
            }
        }
    }

    /// Records the revision, pulls, and bundles everything a caller reports on.
    pub fn sync(&mut self) -> Result<SyncReport> {
        let previous_revision = self.current_revision();
        let changed = self.update_from_remote()?;
        Ok(SyncReport {
            changed,
            previous_revision,
            current_revision: self.current_revision(),
            added: self.changes.added.clone(),
            updated: self.changes.updated.clone(),
        })
    }
}
