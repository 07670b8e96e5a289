use agroplan::config::LoggingConfig;
use agroplan::questionnaire::{
    DEFAULT_WEEKLY_HOURS, FarmProfile, Goal, Light, MAX_WEEKLY_HOURS, MIN_WEEKLY_HOURS,
    SpeciesOrigin, SpeciesType, Terrain,
};
use agroplan::{Advisor, AgroPlanConfig, AgroPlanError, Geocoder, summary, web};
use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// AgroPlan - start a syntropic agroforestry system following Ernst Götsch
///
/// Examples:
///   agroplan locate "Chapecó, SC"
///   agroplan plan --location "-27.5954, -48.5480" --area "2 ha" --terrain sloped --output plan.txt
///   agroplan serve --port 8080
#[derive(Parser)]
#[command(name = "agroplan", version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to <config dir>/agroplan/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Diagnose a location without generating a plan
    Locate {
        /// "City, State", postal code or "lat, lon"
        #[arg(allow_hyphen_values = true)]
        location: String,
    },
    /// Fill in the questionnaire and generate a plan
    Plan(PlanArgs),
    /// Serve the questionnaire as a web form
    Serve {
        #[arg(long, short, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args)]
struct PlanArgs {
    /// "City, State", postal code or "lat, lon"
    #[arg(long, allow_hyphen_values = true)]
    location: String,

    /// Area size, e.g. "2 ha" or "500 m²"
    #[arg(long, default_value = "")]
    area: String,

    #[arg(long, value_enum, default_value_t = Terrain::Flat)]
    terrain: Terrain,

    #[arg(long, value_enum, default_value_t = Light::FullSun)]
    light: Light,

    #[arg(long, value_enum, default_value_t = Goal::Food)]
    goal: Goal,

    /// Hours per week available for the system
    #[arg(
        long,
        default_value_t = DEFAULT_WEEKLY_HOURS,
        value_parser = clap::value_parser!(u8).range(i64::from(MIN_WEEKLY_HOURS)..=i64::from(MAX_WEEKLY_HOURS))
    )]
    weekly_hours: u8,

    /// Desired species, comma separated
    #[arg(long = "species", value_enum, value_delimiter = ',')]
    species_types: Vec<SpeciesType>,

    #[arg(long, value_enum, default_value_t = SpeciesOrigin::Native)]
    origin: SpeciesOrigin,

    /// What already grows on the site
    #[arg(long, default_value = "")]
    existing_planting: String,

    /// Write the plain-text summary to this file
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl PlanArgs {
    fn profile(&self) -> FarmProfile {
        FarmProfile {
            location: self.location.clone(),
            area: self.area.clone(),
            terrain: self.terrain,
            light: self.light,
            goal: self.goal,
            weekly_hours: self.weekly_hours,
            species_types: self.species_types.clone(),
            species_origin: self.origin,
            existing_planting: self.existing_planting.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<AgroPlanError>() {
                Some(app_error) => eprintln!("❌ {}", app_error.user_message()),
                None => eprintln!("❌ {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if let Some(path) = &cli.config
        && !path.exists()
    {
        bail!("Config file {} does not exist", path.display());
    }
    let config = AgroPlanConfig::load_from_path(cli.config.clone())?;
    init_tracing(&config.logging, cli.verbose);
    tracing::debug!("Loaded configuration: provider {}", config.geocoding.provider);

    match cli.command {
        Command::Locate { location } => {
            let mut geocoder = Geocoder::from_config(&config)?;
            let resolution = geocoder.resolve(&location);
            println!("{}", resolution.text);
            Ok(if resolution.is_resolved() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Plan(args) => plan(&config, &args),
        Command::Serve { port } => {
            let advisor = Arc::new(Mutex::new(Advisor::from_config(&config)?));
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            let served = runtime.block_on(web::run(Arc::clone(&advisor), port));
            // The blocking HTTP clients inside the advisor must outlive the runtime
            drop(runtime);
            served?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn plan(config: &AgroPlanConfig, args: &PlanArgs) -> Result<ExitCode> {
    let profile = args.profile();
    profile.validate()?;

    let mut advisor = Advisor::from_config(config)?;
    println!("🔎 Analysing your site and growing suggestions...\n");
    let outcome = advisor.run(&profile)?;

    println!("📍 Site diagnosis\n{}\n", outcome.diagnosis);
    if let Some(plan) = &outcome.plan {
        println!("🌳 Personalised agroforestry plan\n{plan}");
    }

    if let Some(path) = &args.output {
        let text = summary::render(&profile, &outcome, Utc::now());
        summary::save(path, &text)?;
        println!("\n💾 Summary saved to {}", path.display());
    }

    Ok(if outcome.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Log to stderr; `RUST_LOG` wins, then `-v`, then the configured level.
fn init_tracing(logging: &LoggingConfig, verbose: u8) {
    let level = match verbose {
        0 => logging.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,agroplan={level}")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}
