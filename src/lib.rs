//! # brewctl Core Library
//!
//! This crate contains the control plane of `brewctl`, the command-line tool of a
//! source-based package manager: how it reads its own invocation, how it checks
//! that the host is fit to build software, and how it keeps the local formula
//! repository in sync with the remote one.
//!
//! Formula loading, dependency resolution and building are handled elsewhere;
//! this library only names formulae and kegs by their lookup key and location.
//!
//! ## Modules Overview
//! - [`argv`] – Classifying invocation tokens, flag queries, resolving named targets
//! - [`formula`] – Package-definition catalog lookups
//! - [`keg`] – Locating installed kegs in the cellar
//! - [`doctor`] – Isolated diagnostic checks and their report
//! - [`update`] – Pulling the formula repository and classifying what changed
//! - [`system`] – Running external programs
//! - [`errors`] – Usage, lookup and execution errors
//! - [`util`] – Terminal output helpers
//! - [`global`] – Per-user directories and settings
//! - [`logging`] – Log subscriber setup


pub mod argv;
pub mod errors;
pub mod formula;
pub mod keg;
pub mod doctor;
pub mod update;
pub mod system;
pub mod util;
pub mod global;
pub mod logging;

pub use argv::*;
pub use errors::*;
pub use formula::*;
pub use keg::*;
pub use update::*;
pub use util::*;
pub use global::settings::*;
