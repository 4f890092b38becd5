use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use crate::global::utils::get_global_config_file;

pub const DEFAULT_PREFIX: &str = "/usr/local";
pub const DEFAULT_REMOTE: &str = "https://github.com/mxcl/homebrew.git";
pub const DEFAULT_BRANCH: &str = "master";

/// Process-wide overrides for the `verbose` and `debug` predicates.
///
/// Read once at startup and handed to [`crate::argv::ArgVector`], so the
/// predicates themselves never look at the environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvFlags {
    pub verbose: bool,
    pub debug: bool,
}

impl EnvFlags {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        Self {
            verbose: is_truthy(lookup("BREWCTL_VERBOSE")),
            debug: is_truthy(lookup("BREWCTL_DEBUG")),
        }
    }
}

fn is_truthy(value: Option<String>) -> bool {
    match value {
        Some(v) => !v.is_empty() && v != "0",
        None => false,
    }
}

/// Optional overrides read from `config.toml` in the per-user config directory.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SettingsFile {
    pub prefix: Option<PathBuf>,
    pub repository: Option<PathBuf>,
    pub cellar: Option<PathBuf>,
    pub remote: Option<String>,
    pub branch: Option<String>,
}

impl SettingsFile {
    /// Loads the file if it exists; a missing file yields the empty overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<SettingsFile> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(SettingsFile::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid settings in {}", path.display()))
    }
}

/// Where things live on this host and where updates come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Installation prefix (`bin`, `lib`, `share`, ...).
    pub prefix: PathBuf,
    /// Root of the version-controlled package-definition repository.
    pub repository: PathBuf,
    /// Root holding one directory per installed package.
    pub cellar: PathBuf,
    pub remote: String,
    pub branch: String,
}

impl Settings {
    /// Defaults, then `config.toml`, then `BREWCTL_*` environment variables.
    pub fn load() -> Result<Settings> {
        let file = SettingsFile::load(get_global_config_file()?)?;
        Ok(Settings::from_sources(file, |key| std::env::var(key).ok()))
    }

    pub fn from_sources<F: Fn(&str) -> Option<String>>(file: SettingsFile, lookup: F) -> Settings {
        let env_path = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);
        let env_string = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let prefix = env_path("BREWCTL_PREFIX")
            .or(file.prefix)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFIX));
        let repository = env_path("BREWCTL_REPOSITORY")
            .or(file.repository)
            .unwrap_or_else(|| prefix.clone());
        let cellar = env_path("BREWCTL_CELLAR")
            .or(file.cellar)
            .unwrap_or_else(|| prefix.join("Cellar"));
        let remote = env_string("BREWCTL_REMOTE")
            .or(file.remote)
            .unwrap_or_else(|| DEFAULT_REMOTE.to_string());
        let branch = env_string("BREWCTL_BRANCH")
            .or(file.branch)
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());

        Settings { prefix, repository, cellar, remote, branch }
    }

    /// Directory holding one `<name>.rb` package definition per formula.
    pub fn formula_dir(&self) -> PathBuf {
        self.repository.join("Library").join("Formula")
    }
}
