//! The invocation's argument vector.
//!
//! [`ArgVector`] classifies raw tokens into named targets and flags, answers
//! flag queries (including clustered short forms such as `-di`), and lazily
//! resolves named targets into package definitions or installed kegs. Every
//! derived view is computed once and cached on the vector itself.

use std::cell::{Cell, OnceCell};
use std::path::Path;
use anyhow::Result;
use crate::errors::UsageError;
use crate::formula::{FormulaCatalog, FormulaRef};
use crate::global::settings::EnvFlags;
use crate::keg::Keg;

/// First character of every flag token.
pub const FLAG_MARKER: char = '-';

/// Long-form flags that also answer to a single-character short form.
pub const SHORT_FLAGS: &[(&str, char)] = &[
    ("--debug", 'd'),
    ("--force", 'f'),
    ("--interactive", 'i'),
    ("--quieter", 'q'),
    ("--verbose", 'v'),
];

pub const USAGE: &str = "\
Usage: brewctl command [formula] ...
Usage: brewctl prefix | repository | cellar | cache
Usage: brewctl [--verbose|-v]

Commands:
  info formula ...
  list [formula] ...
  update [--json]
  doctor

Environment:
  BREWCTL_VERBOSE, BREWCTL_DEBUG      force --verbose / --debug
  BREWCTL_PREFIX, BREWCTL_REPOSITORY  override the configured directories
";

/// Returns the short-form character for `flag`, if it has one.
///
/// `--force` maps through [`SHORT_FLAGS`]; `-x` is its own short form.
pub fn short_code(flag: &str) -> Option<char> {
    if flag.starts_with("--") {
        return SHORT_FLAGS
            .iter()
            .find(|(long, _)| *long == flag)
            .map(|(_, code)| *code);
    }
    let mut chars = flag.strip_prefix(FLAG_MARKER)?.chars();
    match (chars.next(), chars.next()) {
        (Some(code), None) => Some(code),
        _ => None,
    }
}

#[derive(Debug)]
pub struct ArgVector {
    args: Vec<String>,
    env: EnvFlags,
    named: OnceCell<Vec<String>>,
    options: OnceCell<Vec<String>>,
    unique_named: OnceCell<Vec<String>>,
    formulae: OnceCell<Vec<FormulaRef>>,
    kegs: OnceCell<Vec<Keg>>,
    matched: Cell<Option<usize>>,
}

impl ArgVector {
    pub fn new<I, S>(args: I, env: EnvFlags) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            env,
            named: OnceCell::new(),
            options: OnceCell::new(),
            unique_named: OnceCell::new(),
            formulae: OnceCell::new(),
            kegs: OnceCell::new(),
            matched: Cell::new(None),
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Tokens that do not start with [`FLAG_MARKER`], in original order.
    pub fn named(&self) -> &[String] {
        self.named.get_or_init(|| {
            self.args
                .iter()
                .filter(|arg| !arg.starts_with(FLAG_MARKER))
                .cloned()
                .collect()
        })
    }

    /// Tokens that start with [`FLAG_MARKER`], in original order.
    pub fn options(&self) -> &[String] {
        self.options.get_or_init(|| {
            self.args
                .iter()
                .filter(|arg| arg.starts_with(FLAG_MARKER))
                .cloned()
                .collect()
        })
    }

    /// True if `flag` was given verbatim, or its short form appears in any
    /// short-form cluster. Long-form options (`--x`) only ever match verbatim.
    ///
    /// # Example
    ///
    /// ```
    /// use brewctl::{ArgVector, EnvFlags};
    ///
    /// let argv = ArgVector::new(["-di", "foo"], EnvFlags::default());
    /// assert!(argv.flag("--debug") && argv.flag("-i"));
    /// assert!(!argv.force());
    /// ```
    pub fn flag(&self, flag: &str) -> bool {
        let code = short_code(flag);
        self.options().iter().any(|arg| {
            if arg == flag {
                return true;
            }
            if arg.starts_with("--") {
                return false;
            }
            match code {
                Some(code) => arg[FLAG_MARKER.len_utf8()..].contains(code),
                None => false,
            }
        })
    }

    pub fn force(&self) -> bool {
        self.flag("--force")
    }

    pub fn verbose(&self) -> bool {
        self.env.verbose || self.flag("--verbose")
    }

    pub fn debug(&self) -> bool {
        self.env.debug || self.flag("--debug")
    }

    pub fn quieter(&self) -> bool {
        self.flag("--quieter")
    }

    pub fn interactive(&self) -> bool {
        self.flag("--interactive")
    }

    /// Records the position of the first `token` for a following [`ArgVector::next_arg`].
    pub fn include(&self, token: &str) -> bool {
        let index = self.args.iter().position(|arg| arg == token);
        self.matched.set(index);
        index.is_some()
    }

    /// The token right after the last [`ArgVector::include`] match.
    pub fn next_arg(&self) -> Result<&str, UsageError> {
        let index = self.matched.get().ok_or(UsageError::MissingArgument)?;
        self.args
            .get(index + 1)
            .map(String::as_str)
            .ok_or(UsageError::MissingArgument)
    }

    /// Named tokens, lower-cased, first occurrence kept.
    pub fn downcased_unique_named(&self) -> &[String] {
        self.unique_named.get_or_init(|| {
            let mut unique: Vec<String> = Vec::new();
            for name in self.named() {
                let name = name.to_lowercase();
                if !unique.contains(&name) {
                    unique.push(name);
                }
            }
            unique
        })
    }

    /// Resolves the named targets as package definitions, once per vector.
    ///
    /// # Errors
    ///
    /// [`UsageError::FormulaUnspecified`] when there are no named targets,
    /// before the catalog is consulted; otherwise the first lookup failure.
    pub fn formulae(&self, catalog: &dyn FormulaCatalog) -> Result<&[FormulaRef]> {
        if let Some(formulae) = self.formulae.get() {
            return Ok(formulae.as_slice());
        }
        let names = self.downcased_unique_named();
        if names.is_empty() {
            return Err(UsageError::FormulaUnspecified.into());
        }
        let resolved = names
            .iter()
            .map(|name| catalog.factory(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.formulae.get_or_init(|| resolved).as_slice())
    }

    /// Resolves the named targets as installed kegs under `cellar`, once per vector.
    ///
    /// # Errors
    ///
    /// [`UsageError::KegUnspecified`] when there are no named targets;
    /// otherwise the first [`crate::errors::KegError`].
    pub fn kegs<P: AsRef<Path>>(&self, cellar: P) -> Result<&[Keg]> {
        if let Some(kegs) = self.kegs.get() {
            return Ok(kegs.as_slice());
        }
        let names = self.downcased_unique_named();
        if names.is_empty() {
            return Err(UsageError::KegUnspecified.into());
        }
        let resolved = names
            .iter()
            .map(|name| Keg::locate(cellar.as_ref(), name))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.kegs.get_or_init(|| resolved).as_slice())
    }
}
