//! The standard diagnostic checks.
//!
//! Each check writes one paragraph followed by a blank line when it finds
//! something worth mentioning, and nothing otherwise.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use anyhow::Result;
use regex::Regex;
use semver::Version;
use walkdir::WalkDir;
use super::{Check, CheckContext};
use crate::global::settings::DEFAULT_PREFIX;
use crate::system::capture_all;

pub const STANDARD: &[Check] = &[
    Check { name: "prefix", run: check_prefix },
    Check { name: "stray_libraries", run: check_for_stray_libraries },
    Check { name: "compiler", run: check_compiler },
    Check { name: "other_package_managers", run: check_for_other_package_managers },
    Check { name: "share_locale", run: check_share_locale },
    Check { name: "user_path", run: check_user_path },
    Check { name: "which_pkg_config", run: check_which_pkg_config },
    Check { name: "pkg_config_paths", run: check_pkg_config_paths },
    Check { name: "gettext", run: check_for_gettext },
    Check { name: "git", run: check_for_git },
];

/// Oldest compiler release formulae are tested against.
pub const RECOMMENDED_CC: Version = Version::new(4, 2, 0);

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("valid version regex"));

static PKG_CONFIG_SCAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Scanning directory '(.*)'").expect("valid scan regex"));

fn indented(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("    {}\n", p.display()))
        .collect()
}

pub fn check_prefix(ctx: &CheckContext, out: &mut dyn Write) -> Result<()> {
    if ctx.prefix != Path::new(DEFAULT_PREFIX) {
        writeln!(out, "You can install brews anywhere you want, but some may not work")?;
        writeln!(out, "correctly if you're not installing to {DEFAULT_PREFIX}.")?;
        writeln!(out)?;
    }
    Ok(())
}

fn is_shared_library(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    name.ends_with(".dylib") || name.ends_with(".so") || name.contains(".so.")
}

/// Managed libraries are symlinks into the cellar; real files were put there by hand.
pub fn check_for_stray_libraries(ctx: &CheckContext, out: &mut dyn Write) -> Result<()> {
    let lib = ctx.prefix_join("lib");
    let mut stray: Vec<PathBuf> = WalkDir::new(&lib)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_shared_library(e.path()))
        .map(|e| e.into_path())
        .collect();
    if stray.is_empty() {
        return Ok(());
    }
    stray.sort();
    writeln!(out, "You have unbrewed shared libraries in {}. These could cause build problems", lib.display())?;
    writeln!(out, "when building formulae. If you no longer need them, delete them:")?;
    writeln!(out)?;
    write!(out, "{}", indented(&stray))?;
    writeln!(out)?;
    Ok(())
}

/// Parses the first `major.minor[.patch]` in a compiler's `--version` banner.
pub fn parse_compiler_version(banner: &str) -> Option<Version> {
    let first = banner.lines().next()?;
    let caps = VERSION_RE.captures(first)?;
    let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    Some(Version::new(part(1)?, part(2)?, part(3).unwrap_or(0)))
}

pub fn check_compiler(ctx: &CheckContext, out: &mut dyn Write) -> Result<()> {
    let Some(cc) = ctx.find_program("cc") else {
        writeln!(out, "We couldn't detect a C compiler. Most formulae require one.")?;
        writeln!(out)?;
        return Ok(());
    };
    let banner = capture_all(Command::new(&cc).arg("--version"))?;
    match parse_compiler_version(&banner) {
        Some(version) if version < RECOMMENDED_CC => {
            writeln!(out, "Your compiler ({version}) is older than the recommended version ({RECOMMENDED_CC}).")?;
            writeln!(out, "It may be advisable to upgrade it.")?;
            writeln!(out)?;
        }
        _ => {}
    }
    Ok(())
}

pub fn check_for_other_package_managers(ctx: &CheckContext, out: &mut dyn Write) -> Result<()> {
    let found: Vec<PathBuf> = ["opt/local/bin/port", "sw/bin/fink"]
        .iter()
        .map(|rel| ctx.root.join(rel))
        .filter(|p| p.exists())
        .collect();
    if found.is_empty() {
        return Ok(());
    }
    writeln!(out, "You have MacPorts or Fink installed. This can cause trouble.")?;
    writeln!(out, "You don't have to uninstall them, but you may like to try temporarily")?;
    writeln!(out, "moving them away, eg.")?;
    writeln!(out)?;
    writeln!(out, "    sudo mv /opt/local ~/macports")?;
    writeln!(out)?;
    Ok(())
}

/// Directories under `<prefix>/share/locale` without any write permission.
pub fn check_share_locale(ctx: &CheckContext, out: &mut dyn Write) -> Result<()> {
    let locale = ctx.prefix_join("share/locale");
    if !locale.exists() {
        return Ok(());
    }
    let mut cant_write: Vec<PathBuf> = WalkDir::new(&locale)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter(|e| e.metadata().map(|m| m.permissions().readonly()).unwrap_or(false))
        .map(|e| e.into_path())
        .collect();
    if cant_write.is_empty() {
        return Ok(());
    }
    cant_write.sort();
    writeln!(out, "Some folders in {} aren't writable.", locale.display())?;
    writeln!(out, "This can happen if you \"sudo make install\" software that isn't managed")?;
    writeln!(out, "by brewctl. If a brew tries to add locale information to one of these")?;
    writeln!(out, "folders, then the install will fail during the link step.")?;
    writeln!(out, "You should probably `chown` them:")?;
    writeln!(out)?;
    write!(out, "{}", indented(&cant_write))?;
    writeln!(out)?;
    Ok(())
}

pub fn check_user_path(ctx: &CheckContext, out: &mut dyn Write) -> Result<()> {
    let prefix_bin = ctx.prefix_join("bin");
    let prefix_sbin = ctx.prefix_join("sbin");
    let usr_bin = Path::new("/usr/bin");

    let mut seen_prefix_bin = false;
    let mut seen_prefix_sbin = false;
    let mut warned_usr_bin = false;

    for entry in &ctx.path {
        if entry == usr_bin && !seen_prefix_bin && !warned_usr_bin && prefix_bin != usr_bin {
            warned_usr_bin = true;
            writeln!(out, "/usr/bin is in your PATH before brewctl's bin. This means that system-")?;
            writeln!(out, "provided programs will be used before brewed ones. This is an")?;
            writeln!(out, "issue if you install, for instance, Python.")?;
            writeln!(out)?;
            writeln!(out, "Consider editing your shell profile to put:")?;
            writeln!(out, "  {}", prefix_bin.display())?;
            writeln!(out, "ahead of /usr/bin in your $PATH.")?;
            writeln!(out)?;
        }
        if *entry == prefix_bin {
            seen_prefix_bin = true;
        }
        if *entry == prefix_sbin {
            seen_prefix_sbin = true;
        }
    }

    if !seen_prefix_bin {
        writeln!(out, "brewctl's bin was not found in your path. Some brews depend")?;
        writeln!(out, "on other brews that install tools to bin.")?;
        writeln!(out)?;
        writeln!(out, "You should edit your shell profile to add:")?;
        writeln!(out, "  {}", prefix_bin.display())?;
        writeln!(out, "to $PATH.")?;
        writeln!(out)?;
    }
    if !seen_prefix_sbin {
        writeln!(out, "Some brews install binaries to sbin instead of bin, but brewctl's")?;
        writeln!(out, "sbin was not found in your path.")?;
        writeln!(out)?;
        writeln!(out, "Consider editing your shell profile to add:")?;
        writeln!(out, "  {}", prefix_sbin.display())?;
        writeln!(out, "to $PATH.")?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn check_which_pkg_config(ctx: &CheckContext, out: &mut dyn Write) -> Result<()> {
    let Some(binary) = ctx.find_program("pkg-config") else {
        return Ok(());
    };
    if binary != ctx.prefix_join("bin/pkg-config") {
        writeln!(out, "You have a non-brew 'pkg-config' in your PATH:")?;
        writeln!(out, "  {}", binary.display())?;
        writeln!(out)?;
        writeln!(out, "`./configure` may have problems finding brew-installed packages using")?;
        writeln!(out, "this other pkg-config.")?;
        writeln!(out)?;
    }
    Ok(())
}

/// Directories `pkg-config --debug` reports scanning.
pub fn pkg_config_search_paths(debug_output: &str) -> Vec<String> {
    debug_output
        .lines()
        .filter_map(|line| PKG_CONFIG_SCAN_RE.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

pub fn check_pkg_config_paths(ctx: &CheckContext, out: &mut dyn Write) -> Result<()> {
    let Some(binary) = ctx.find_program("pkg-config") else {
        return Ok(());
    };
    let debug_output = capture_all(Command::new(&binary).arg("--debug"))?;
    let searched = pkg_config_search_paths(&debug_output);
    // implementations without scan logging tell us nothing
    if searched.is_empty() {
        return Ok(());
    }
    let expected = ctx.prefix_join("lib/pkgconfig");
    let expected = expected.to_string_lossy();
    if !searched.iter().any(|p| p.trim_end_matches('/') == expected) {
        writeln!(out, "Your pkg-config is not checking \"{expected}\" for packages.")?;
        writeln!(out, "Earlier versions of the pkg-config formula did not add this path")?;
        writeln!(out, "to the search path, which means that other formulae may not be able")?;
        writeln!(out, "to find certain dependencies.")?;
        writeln!(out)?;
        writeln!(out, "To resolve this issue, re-brew pkg-config.")?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn check_for_gettext(ctx: &CheckContext, out: &mut dyn Write) -> Result<()> {
    let linked = ["libgettextlib", "libintl"].iter().any(|lib| {
        ["dylib", "so"]
            .iter()
            .any(|ext| ctx.prefix_join(format!("lib/{lib}.{ext}")).exists())
    });
    if linked {
        writeln!(out, "gettext was detected in your prefix.")?;
        writeln!(out)?;
        writeln!(out, "The gettext provided by brewctl is \"keg-only\", meaning it does not")?;
        writeln!(out, "get linked into your prefix by default.")?;
        writeln!(out)?;
        writeln!(out, "If you link gettext then a large number of brews that don't otherwise")?;
        writeln!(out, "depend on it will pick it up anyway during the `./configure` step.")?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn check_for_git(ctx: &CheckContext, out: &mut dyn Write) -> Result<()> {
    if ctx.find_program("git").is_none() {
        writeln!(out, "git was not found in your PATH. `brewctl update` needs it to fetch")?;
        writeln!(out, "new and updated formulae.")?;
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn ctx_in(dir: &TempDir) -> CheckContext {
        CheckContext {
            prefix: dir.path().join("prefix"),
            root: dir.path().join("root"),
            path: vec![],
        }
    }

    fn run(check: fn(&CheckContext, &mut dyn Write) -> Result<()>, ctx: &CheckContext) -> String {
        let mut out = Vec::new();
        check(ctx, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[cfg(unix)]
    fn fake_program(dir: &Path, name: &str, script: &str) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_prefix() {
        let default = CheckContext { prefix: PathBuf::from("/usr/local"), root: PathBuf::from("/"), path: vec![] };
        assert_eq!(run(check_prefix, &default), "");
        let dir = tempdir().unwrap();
        assert!(run(check_prefix, &ctx_in(&dir)).contains("/usr/local"));
    }

    #[cfg(unix)]
    #[test]
    fn test_stray_libraries_ignore_symlinks() {
        let dir = tempdir().unwrap();
        let ctx = ctx_in(&dir);
        let lib = ctx.prefix_join("lib");
        std::fs::create_dir_all(&lib).unwrap();
        assert_eq!(run(check_for_stray_libraries, &ctx), "");

        std::fs::write(dir.path().join("real.so"), "").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.so"), lib.join("libmanaged.so")).unwrap();
        std::fs::write(lib.join("README"), "").unwrap();
        assert_eq!(run(check_for_stray_libraries, &ctx), "");

        std::fs::write(lib.join("libstray.so.1"), "").unwrap();
        let report = run(check_for_stray_libraries, &ctx);
        assert!(report.contains("libstray.so.1"));
        assert!(!report.contains("libmanaged"));
        assert!(report.ends_with("\n\n"));
    }

    #[test]
    fn test_parse_compiler_version() {
        assert_eq!(
            parse_compiler_version("cc (GCC) 12.2.0\nCopyright"),
            Some(Version::new(12, 2, 0))
        );
        assert_eq!(
            parse_compiler_version("Apple clang version 15.0\nTarget: arm64"),
            Some(Version::new(15, 0, 0))
        );
        assert_eq!(parse_compiler_version("no digits here"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_compiler_checks() {
        let dir = tempdir().unwrap();
        let mut ctx = ctx_in(&dir);
        assert!(run(check_compiler, &ctx).contains("couldn't detect a C compiler"));

        let old = dir.path().join("old");
        fake_program(&old, "cc", "echo 'cc (GCC) 4.0.1'");
        ctx.path = vec![old];
        assert!(run(check_compiler, &ctx).contains("older than the recommended"));

        let new = dir.path().join("new");
        fake_program(&new, "cc", "echo 'cc (GCC) 13.1.0'");
        ctx.path = vec![new];
        assert_eq!(run(check_compiler, &ctx), "");
    }

    #[test]
    fn test_other_package_managers() {
        let dir = tempdir().unwrap();
        let ctx = ctx_in(&dir);
        assert_eq!(run(check_for_other_package_managers, &ctx), "");
        std::fs::create_dir_all(ctx.root.join("sw/bin")).unwrap();
        std::fs::write(ctx.root.join("sw/bin/fink"), "").unwrap();
        assert!(run(check_for_other_package_managers, &ctx).contains("MacPorts or Fink"));
    }

    #[cfg(unix)]
    #[test]
    fn test_share_locale_lists_readonly_dirs() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let ctx = ctx_in(&dir);
        assert_eq!(run(check_share_locale, &ctx), "");

        let locked = ctx.prefix_join("share/locale/de/LC_MESSAGES");
        std::fs::create_dir_all(&locked).unwrap();
        std::fs::create_dir_all(ctx.prefix_join("share/locale/fr")).unwrap();
        assert_eq!(run(check_share_locale, &ctx), "");

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();
        let report = run(check_share_locale, &ctx);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(report.contains("aren't writable"));
        assert!(report.contains("LC_MESSAGES"));
        assert!(!report.contains("/fr"));
    }

    #[test]
    fn test_user_path_in_order() {
        let dir = tempdir().unwrap();
        let mut ctx = ctx_in(&dir);
        ctx.path = vec![ctx.prefix_join("bin"), ctx.prefix_join("sbin"), PathBuf::from("/usr/bin")];
        assert_eq!(run(check_user_path, &ctx), "");
    }

    #[test]
    fn test_user_path_usr_bin_first() {
        let dir = tempdir().unwrap();
        let mut ctx = ctx_in(&dir);
        ctx.path = vec![PathBuf::from("/usr/bin"), ctx.prefix_join("bin"), ctx.prefix_join("sbin")];
        let report = run(check_user_path, &ctx);
        assert!(report.contains("/usr/bin is in your PATH before"));
        assert!(!report.contains("was not found in your path"));
    }

    #[test]
    fn test_user_path_missing_prefix() {
        let dir = tempdir().unwrap();
        let mut ctx = ctx_in(&dir);
        ctx.path = vec![PathBuf::from("/bin")];
        let report = run(check_user_path, &ctx);
        assert!(report.contains("bin was not found in your path"));
        assert!(report.contains("sbin was not found in your path"));
    }

    #[cfg(unix)]
    #[test]
    fn test_which_pkg_config() {
        let dir = tempdir().unwrap();
        let mut ctx = ctx_in(&dir);
        assert_eq!(run(check_which_pkg_config, &ctx), "");

        let managed = ctx.prefix_join("bin");
        fake_program(&managed, "pkg-config", "exit 0");
        ctx.path = vec![managed];
        assert_eq!(run(check_which_pkg_config, &ctx), "");

        let other = dir.path().join("other");
        fake_program(&other, "pkg-config", "exit 0");
        ctx.path.insert(0, other);
        assert!(run(check_which_pkg_config, &ctx).contains("non-brew 'pkg-config'"));
    }

    #[test]
    fn test_pkg_config_search_paths() {
        let output = "Scanning directory '/usr/lib/pkgconfig'\nFile 'x.pc' appears to be a .pc file\nScanning directory '/usr/local/lib/pkgconfig'\n";
        assert_eq!(
            pkg_config_search_paths(output),
            vec!["/usr/lib/pkgconfig", "/usr/local/lib/pkgconfig"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_pkg_config_paths() {
        let dir = tempdir().unwrap();
        let mut ctx = ctx_in(&dir);
        let bin = dir.path().join("bin");
        ctx.path = vec![bin.clone()];

        fake_program(&bin, "pkg-config", "echo \"Scanning directory '/usr/lib/pkgconfig'\" >&2");
        assert!(run(check_pkg_config_paths, &ctx).contains("is not checking"));

        let expected = ctx.prefix_join("lib/pkgconfig");
        fake_program(&bin, "pkg-config", &format!("echo \"Scanning directory '{}'\" >&2", expected.display()));
        assert_eq!(run(check_pkg_config_paths, &ctx), "");

        fake_program(&bin, "pkg-config", "exit 0");
        assert_eq!(run(check_pkg_config_paths, &ctx), "");
    }

    #[test]
    fn test_gettext() {
        let dir = tempdir().unwrap();
        let ctx = ctx_in(&dir);
        assert_eq!(run(check_for_gettext, &ctx), "");
        std::fs::create_dir_all(ctx.prefix_join("lib")).unwrap();
        std::fs::write(ctx.prefix_join("lib/libintl.so"), "").unwrap();
        assert!(run(check_for_gettext, &ctx).contains("gettext was detected"));
    }

    #[cfg(unix)]
    #[test]
    fn test_git() {
        let dir = tempdir().unwrap();
        let mut ctx = ctx_in(&dir);
        assert!(run(check_for_git, &ctx).contains("git was not found"));
        let bin = dir.path().join("bin");
        fake_program(&bin, "git", "exit 0");
        ctx.path = vec![bin];
        assert_eq!(run(check_for_git, &ctx), "");
    }
}
