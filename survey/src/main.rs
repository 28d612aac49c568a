//! A/B audio preference survey.
//!
//! Loads the question-set document, runs one respondent through the survey in
//! the terminal and delivers the answers to the collection endpoint.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use survey::core::controller::SurveySession;
use survey::core::set_generator::generate_catalog;
use survey::exit_codes;
use survey::io::catalog::{is_remote, load_catalog, write_catalog};
use survey::io::config::{DEFAULT_CONFIG_PATH, SurveyConfig, load_config, write_config};
use survey::io::submission::{HttpEndpoint, SubmissionClient};
use survey::logging;
use survey::render::ViewBinder;
use survey::terminal::{Console, IntakePrefill};

#[derive(Parser)]
#[command(name = "survey", version, about = "A/B audio preference survey")]
struct Cli {
    /// Path to the survey config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file if missing.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
    /// Check the question-set document against the schema and invariants.
    Validate {
        /// Question-set path or URL (overrides `sets_location`).
        #[arg(long)]
        sets: Option<String>,
    },
    /// Run the survey for one respondent.
    Run {
        /// Pre-fill the respondent name.
        #[arg(long)]
        name: Option<String>,
        /// Pre-fill the question set id.
        #[arg(long)]
        set: Option<String>,
        /// Collection endpoint URL (overrides `endpoint_url`).
        #[arg(long)]
        endpoint: Option<String>,
        /// Question-set path or URL (overrides `sets_location`).
        #[arg(long)]
        sets: Option<String>,
    },
    /// Generate a question-set document from the `[generator]` config.
    GenerateSets {
        /// Seed for reproducible output.
        #[arg(long)]
        seed: Option<u64>,
        /// Output path (defaults to `sets_location`).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Validate { sets } => cmd_validate(&cli.config, sets),
        Command::Run {
            name,
            set,
            endpoint,
            sets,
        } => cmd_run(&cli.config, name, set, endpoint, sets),
        Command::GenerateSets { seed, out } => cmd_generate_sets(&cli.config, seed, out),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    if !force && config_path.exists() {
        println!("{} already exists (use --force to overwrite)", config_path.display());
        return Ok(exit_codes::OK);
    }
    write_config(config_path, &SurveyConfig::default())
        .with_context(|| format!("write {}", config_path.display()))?;
    println!("wrote {}", config_path.display());
    Ok(exit_codes::OK)
}

fn cmd_validate(config_path: &Path, sets: Option<String>) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let location = sets.unwrap_or_else(|| cfg.sets_location.clone());
    let catalog = load_catalog(&location, cfg.request_timeout())?;
    for (set_id, entry) in catalog.entries() {
        println!("{}: {} questions", set_id, entry.questions.len());
    }
    Ok(exit_codes::OK)
}

fn cmd_run(
    config_path: &Path,
    name: Option<String>,
    set: Option<String>,
    endpoint: Option<String>,
    sets: Option<String>,
) -> Result<i32> {
    let mut cfg = load_config(config_path)?;
    if let Some(endpoint) = endpoint {
        cfg.endpoint_url = endpoint;
    }
    if let Some(sets) = sets {
        cfg.sets_location = sets;
    }
    let endpoint = HttpEndpoint::from_config(&cfg)?;
    let catalog = load_catalog(&cfg.sets_location, cfg.request_timeout())?;
    let binder = ViewBinder::new(&cfg)?;

    let mut console = Console::new(
        SurveySession::new(catalog),
        SubmissionClient::new(endpoint),
        &binder,
        &cfg.dimension_a,
        &cfg.dimension_b,
    );
    let prefill = IntakePrefill {
        respondent_name: name,
        set_id: set,
    };
    let outcome = console.run(prefill, &mut io::stdin().lock(), &mut io::stdout().lock())?;
    if outcome.submitted {
        info!(message = ?outcome.message, "survey submitted");
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::NOT_SUBMITTED)
    }
}

fn cmd_generate_sets(config_path: &Path, seed: Option<u64>, out: Option<PathBuf>) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let out = match out {
        Some(out) => out,
        None if is_remote(&cfg.sets_location) => {
            bail!("sets_location is a URL; pass --out to choose a file")
        }
        None => PathBuf::from(&cfg.sets_location),
    };
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let catalog = generate_catalog(&cfg.generator, &mut rng).map_err(|err| anyhow!(err))?;
    write_catalog(&out, &catalog)?;
    println!("wrote {} sets to {}", catalog.len(), out.display());
    Ok(exit_codes::OK)
}
