use anyhow::Result;
use walkdir::WalkDir;
use brewctl::argv::{ArgVector, USAGE};
use brewctl::doctor::{run_child, run_diagnostics};
use brewctl::errors::UsageError;
use brewctl::formula::LibraryCatalog;
use brewctl::global::settings::{EnvFlags, Settings};
use brewctl::global::utils::get_global_cache_dir;
use brewctl::keg::installed_names;
use brewctl::logging;
use brewctl::update::{SyncReport, Updater, UNKNOWN_REVISION};
use brewctl::util::{ohai, opoo, puts_columns};
use crate::cli::{BrewCommand, RawArgs, CLI};

pub fn execute(cli: CLI, env: EnvFlags) -> Result<()> {
    let result = dispatch(cli, env);
    if let Err(e) = &result {
        if e.downcast_ref::<UsageError>().is_some() {
            eprintln!("{USAGE}");
        }
    }
    result
}

fn dispatch(cli: CLI, env: EnvFlags) -> Result<()> {
    let argv = match &cli.command {
        BrewCommand::Doctor(RawArgs { args })
        | BrewCommand::Update(RawArgs { args })
        | BrewCommand::Info(RawArgs { args })
        | BrewCommand::List(RawArgs { args }) => ArgVector::new(args.iter().cloned(), env),
        _ => ArgVector::new(Vec::<String>::new(), env),
    };
    logging::init(argv.verbose(), argv.debug());
    let settings = Settings::load()?;

    match cli.command {
        BrewCommand::Doctor(_) => {
            execute_doctor(&argv)
        }
        BrewCommand::DoctorChecks => {
            run_child(&settings)
        }
        BrewCommand::Update(_) => {
            execute_update(&argv, &settings)
        }
        BrewCommand::Info(_) => {
            execute_info(&argv, &settings)
        }
        BrewCommand::List(_) => {
            execute_list(&argv, &settings)
        }
        BrewCommand::Prefix => {
            println!("{}", settings.prefix.display());
            Ok(())
        }
        BrewCommand::Repository => {
            println!("{}", settings.repository.display());
            Ok(())
        }
        BrewCommand::Cellar => {
            println!("{}", settings.cellar.display());
            Ok(())
        }
        BrewCommand::Cache => {
            println!("{}", get_global_cache_dir()?.display());
            Ok(())
        }
        BrewCommand::Usage => {
            print!("{USAGE}");
            Ok(())
        }
    }
}

pub fn execute_doctor(argv: &ArgVector) -> Result<()> {
    let env = EnvFlags { verbose: argv.verbose(), debug: argv.debug() };
    let report = run_diagnostics(env)?.to_string();
    if report.ends_with('\n') {
        print!("{report}");
    } else {
        println!("{report}");
    }
    Ok(())
}

fn short_revision(revision: &str) -> &str {
    if revision == UNKNOWN_REVISION {
        return revision;
    }
    revision.get(..8).unwrap_or(revision)
}

pub fn execute_update(argv: &ArgVector, settings: &Settings) -> Result<()> {
    let json = argv.flag("--json");
    // stdout carries only the JSON document
    let mut updater = Updater::new(settings, argv.verbose() && !json);
    let report: SyncReport = updater.sync()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if !report.changed {
        println!("Already up-to-date.");
        return Ok(());
    }
    println!(
        "Updated brewctl from {} to {}.",
        short_revision(&report.previous_revision),
        short_revision(&report.current_revision)
    );
    if !report.added.is_empty() {
        ohai("New formulae", &[]);
        puts_columns(&report.added);
    }
    if updater.pending_formulae_changes() {
        ohai("Updated formulae", &[]);
        puts_columns(&report.updated);
    }
    Ok(())
}

pub fn execute_info(argv: &ArgVector, settings: &Settings) -> Result<()> {
    let catalog = LibraryCatalog::new(settings.formula_dir());
    for formula in argv.formulae(&catalog)? {
        println!("{}: {}", formula.name, formula.path.display());
    }
    Ok(())
}

pub fn execute_list(argv: &ArgVector, settings: &Settings) -> Result<()> {
    if argv.named().is_empty() {
        if !settings.cellar.is_dir() {
            opoo(&format!("{} does not exist", settings.cellar.display()));
            return Ok(());
        }
        puts_columns(&installed_names(&settings.cellar));
        return Ok(());
    }
    for keg in argv.kegs(&settings.cellar)? {
        let mut files: Vec<_> = WalkDir::new(&keg.path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_type().is_dir())
            .map(|e| e.into_path())
            .collect();
        files.sort();
        for file in files {
            println!("{}", file.display());
        }
    }
    Ok(())
}
