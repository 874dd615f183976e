//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs the fit pipeline or the sample generator
//! - prints reports
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, FitArgs, SampleArgs};
use crate::data::{SampleConfig, generate_sample, write_sample_csv};
use crate::domain::{CohortKey, PipelineConfig, ReproductionTarget};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `biomass` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` only fills variables that are not already set, so real environment
    // values (and CLI flags, which clap reads after this) win.
    dotenvy::dotenv().ok();

    // We want `biomass --data x.csv` to behave like `biomass fit --data x.csv`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Fit(args) => {
            init_logging(args.verbose);
            handle_fit(args)
        }
        Command::Sample(args) => {
            init_logging(args.verbose);
            handle_sample(args)
        }
    }
}

/// `RUST_LOG` wins when set; otherwise `-v` count picks the level.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env = env_logger::Env::default().default_filter_or(default_level);
    // Ignore the error if a logger was already installed (e.g. in tests).
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args);
    let run = pipeline::run_pipeline(&config)?;
    let report = &run.report;

    println!("{}", crate::report::format_report(report));
    if args.details {
        println!("{}", crate::report::format_details(report));
    }
    if args.residuals {
        println!(
            "{}",
            crate::report::format_residuals(&run.observations, &report.regression)
        );
    }

    // Optional exports.
    if let Some(path) = &args.export_json {
        crate::io::export::write_report_json(path, report)?;
    }
    if let Some(path) = &args.export_residuals {
        crate::io::export::write_residuals_csv(path, &run.observations, &report.regression)?;
    }

    match &report.reproduction {
        Some(check) if !check.matches => Err(AppError::new(
            5,
            format!(
                "Reproduction mismatch: expected Shapiro-Wilk p = {} ± {}, got {:.6}.",
                check.expected, check.tolerance, check.actual
            ),
        )),
        _ => Ok(()),
    }
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        trees_per_cohort: args.trees,
        ages: args.ages,
        years: args.years,
        treatments: args.treatments,
        intercept: args.intercept,
        slope: args.slope,
        sigma: args.sigma,
        seed: args.seed,
    };

    let rows = generate_sample(&config)?;
    write_sample_csv(&args.out, &rows)?;
    println!("Wrote {} trees to {}", rows.len(), args.out.display());
    Ok(())
}

pub fn pipeline_config_from_args(args: &FitArgs) -> PipelineConfig {
    PipelineConfig {
        data_path: args.data.clone(),
        cohort: CohortKey::new(args.age, args.year, args.treatment),
        alpha: args.alpha,
        corrections: args.corrections.clone(),
        reproduction: args.expect_shapiro_p.map(|shapiro_p| ReproductionTarget {
            shapiro_p,
            tolerance: args.tolerance,
        }),
    }
}

/// Rewrite argv so `biomass` defaults to `biomass fit`.
///
/// Rules:
/// - `biomass`                       -> `biomass fit`
/// - `biomass --data x.csv ...`      -> `biomass fit --data x.csv ...`
/// - `biomass --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("fit".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fit" | "sample");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "fit flags".
    if arg1.starts_with('-') {
        argv.insert(1, "fit".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
