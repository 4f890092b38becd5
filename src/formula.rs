use std::path::{Path, PathBuf};
use serde::Serialize;
use anyhow::Result;
use crate::errors::FormulaError;

/// A package definition known to the catalog.
///
/// Only the lookup key and the location of the definition are held here;
/// parsing and building formulae is done elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormulaRef {
    pub name: String,
    pub path: PathBuf,
}

/// Factory for package definitions, keyed by identifier.
pub trait FormulaCatalog {
    fn factory(&self, name: &str) -> Result<FormulaRef>;
}

/// Looks up `<name>.rb` in the repository's `Library/Formula` directory.
#[derive(Debug, Clone)]
pub struct LibraryCatalog {
    formula_dir: PathBuf,
}

impl LibraryCatalog {
    pub fn new<P: AsRef<Path>>(formula_dir: P) -> Self {
        Self { formula_dir: formula_dir.as_ref().to_path_buf() }
    }
}

impl FormulaCatalog for LibraryCatalog {
    fn factory(&self, name: &str) -> Result<FormulaRef> {
        // names come from the command line; refuse anything that walks out of the directory
        if name.is_empty() || name.contains('/') || name.starts_with('.') {
            return Err(FormulaError::Unavailable(name.to_string()).into());
        }
        let path = self.formula_dir.join(format!("{name}.rb"));
        if !path.is_file() {
            return Err(FormulaError::Unavailable(name.to_string()).into());
        }
        Ok(FormulaRef { name: name.to_string(), path })
    }
}
