use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use form_canvas::common::config::{Config, config_file};
use form_canvas::common::log;
use form_canvas::layout_engine::LayoutEngine;
use form_canvas::model::ComponentKind;
use form_canvas::replay;
use strum::IntoEnumIterator;

#[derive(Parser)]
struct Cli {
    /// Check whether the configuration file loads and is valid, then exit.
    #[arg(long)]
    validate: bool,

    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON script of edits and print the canvas after each step
    Replay {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },
    /// List the kinds the palette offers
    Kinds,
}

fn main() {
    let opt = Cli::parse();
    log::init_logging();

    let config_path = opt.config.clone().or_else(config_file);

    if opt.validate {
        process::exit(validate(config_path.as_deref()));
    }

    let result = match &opt.command {
        Some(Commands::Replay { script }) => replay(config_path.as_deref(), script),
        Some(Commands::Kinds) => {
            print_kinds();
            Ok(())
        }
        None => {
            eprintln!("nothing to do, see --help");
            process::exit(2);
        }
    };

    if let Err(err) = result {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn validate(config_path: Option<&Path>) -> i32 {
    let Some(path) = config_path else {
        eprintln!("No configuration directory found");
        return 1;
    };
    let config = match Config::read(path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:#}");
            return 1;
        }
    };
    let issues = config.validate();
    if issues.is_empty() {
        println!("Config validation passed");
        0
    } else {
        for issue in issues {
            eprintln!("{}", issue);
        }
        1
    }
}

fn replay(config_path: Option<&Path>, script: &Path) -> anyhow::Result<()> {
    let config = Config::read_or_default(config_path)?;
    let issues = config.validate();
    if !issues.is_empty() {
        anyhow::bail!("invalid configuration:\n{}", issues.join("\n"));
    }
    let buf = std::fs::read_to_string(script)
        .with_context(|| format!("reading script {}", script.display()))?;
    let steps = replay::parse_script(&buf)
        .with_context(|| format!("parsing script {}", script.display()))?;

    let mut engine = LayoutEngine::new(&config);
    for report in replay::run_script(&mut engine, &steps) {
        println!("{report}");
    }
    Ok(())
}

fn print_kinds() {
    for kind in ComponentKind::iter() {
        if kind.is_meta_layout() {
            println!("{kind} (layout, formed by dropping fields side by side)");
        } else {
            println!("{kind}");
        }
    }
}
