use std::path::{Path, PathBuf};
use serde::Serialize;
use walkdir::WalkDir;
use anyhow::Result;
use crate::errors::KegError;

/// One installed version of a package: `<cellar>/<name>/<version>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keg {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
}

impl Keg {
    /// Finds the single installed instance of `name` under `cellar`.
    ///
    /// # Errors
    ///
    /// [`KegError::NotInstalled`] when `name` is not a plain directory name,
    /// when `<cellar>/<name>` is missing or holds no version directory.
    /// [`KegError::MultipleVersions`] when it holds more than one.
    pub fn locate<P: AsRef<Path>>(cellar: P, name: &str) -> Result<Keg> {
        if name.is_empty() || name.contains('/') || name.starts_with('.') {
            return Err(KegError::NotInstalled(name.to_string()).into());
        }
        let rack = cellar.as_ref().join(name);
        if !rack.is_dir() {
            return Err(KegError::NotInstalled(name.to_string()).into());
        }
        let mut versions = subdirectories(&rack);
        match versions.len() {
            0 => Err(KegError::NotInstalled(name.to_string()).into()),
            1 => {
                let path = versions.remove(0);
                let version = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                Ok(Keg { name: name.to_string(), version, path })
            }
            _ => Err(KegError::MultipleVersions(name.to_string()).into()),
        }
    }
}

/// Names of every package with a directory in the cellar, sorted.
pub fn installed_names<P: AsRef<Path>>(cellar: P) -> Vec<String> {
    let mut names: Vec<String> = subdirectories(cellar.as_ref())
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();
    names.sort();
    names
}

// unreadable entries count as absent
fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_dir())
        .collect()
}
