//! # Shaftcalc CLI Application
//!
//! Runs shaft design files and prints the sizing reports.
//!
//! ```text
//! shaft-calc solve --design shaft.json --target-fos 2.0 --target-fos 2.5
//! shaft-calc solve --material 4140 --json --output report.json
//! shaft-calc loads --design shaft.json
//! shaft-calc sample-design --output shaft.json
//! ```
//!
//! Without `--design` the built-in gearbox output shaft is used. Reports go to
//! stdout and logs to stderr. Without `--log-level`, `RUST_LOG` is honoured and
//! the default is `warn`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use shaft_core::calculations::stress::ShearModel;
use shaft_core::design::ShaftDesign;
use shaft_core::file_io::{load_design, save_design, save_report};
use shaft_core::materials::{MaterialSpec, SteelGrade};
use shaft_core::report::LoadSummary;
use shaft_core::{CalcError, CalcResult};

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "shaft-calc")]
#[command(about = "Rotating shaft sizing: diameters, keys and snap rings")]
#[command(version)]
struct Args {
    /// Log level; overrides RUST_LOG
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Size every segment, key and snap ring of a design
    Solve {
        /// Design file (JSON); the sample design when omitted
        #[arg(short, long)]
        design: Option<PathBuf>,

        /// Target factor of safety; repeat for several runs
        #[arg(short, long = "target-fos")]
        target_fos: Vec<f64>,

        /// Steel grade (e.g. 1020, "AISI 4140"); repeat for several runs
        #[arg(short, long)]
        material: Vec<String>,

        /// Size on bending and torsion only
        #[arg(long)]
        neglect_direct_shear: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the shear, moment and torque tables of a design's load model
    Loads {
        /// Design file (JSON); the sample design when omitted
        #[arg(short, long)]
        design: Option<PathBuf>,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the sample design as a starting point
    SampleDesign {
        /// Destination file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn log_filter(level: Option<LogLevel>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(level.directive()),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(LogLevel::Warn.directive())),
    }
}

fn init_logging(args: &Args) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.log_level))
        .with_writer(std::io::stderr)
        .init();
}

fn open_design(path: Option<&Path>) -> CalcResult<ShaftDesign> {
    match path {
        Some(path) => {
            info!("Loading design: {}", path.display());
            load_design(path)
        }
        None => {
            info!("No design file given, using the sample design");
            Ok(ShaftDesign::sample())
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> CalcResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| CalcError::SerializationError {
        reason: e.to_string(),
    })
}

fn run(args: Args) -> CalcResult<()> {
    match args.command {
        Command::Solve {
            design,
            target_fos,
            material,
            neglect_direct_shear,
            json,
            output,
        } => {
            let mut design = open_design(design.as_deref())?;
            if !target_fos.is_empty() {
                design.target_factors_of_safety = target_fos;
            }
            if !material.is_empty() {
                design.materials = material
                    .iter()
                    .map(|name| SteelGrade::from_str_flexible(name).map(MaterialSpec::from))
                    .collect::<CalcResult<_>>()?;
            }
            if neglect_direct_shear {
                design.shear_model = ShearModel::NeglectDirectShear;
            }

            let study = design.run()?;
            if json {
                println!("{}", study.to_json_pretty()?);
            } else {
                print!("{}", study);
            }
            if let Some(path) = output {
                save_report(&study, &path)?;
                info!("Report written to {}", path.display());
            }
            if !study.all_clean() {
                tracing::warn!("some components could not be sized; see the report");
            }
            Ok(())
        }
        Command::Loads { design, json } => {
            let design = open_design(design.as_deref())?;
            let analysis = design
                .load_analysis()?
                .ok_or_else(|| CalcError::missing_field("load_model"))?;
            if json {
                println!("{}", to_json(&analysis)?);
            } else {
                print!("{}", LoadSummary(&analysis));
            }
            Ok(())
        }
        Command::SampleDesign { output } => {
            let design = ShaftDesign::sample();
            match output {
                Some(path) => {
                    save_design(&design, &path)?;
                    info!("Sample design written to {}", path.display());
                }
                None => println!("{}", to_json(&design)?),
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!();
                eprintln!("Error JSON:");
                eprintln!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}
