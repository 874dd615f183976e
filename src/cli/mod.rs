//! Command-line parsing for the biomass allometry tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting/statistics code.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::{DEFAULT_ALPHA, DEFAULT_DATA_PATH, DEFAULT_REPRODUCTION_TOLERANCE, RowCorrection};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "biomass",
    version,
    about = "Log-log allometric biomass fit with Shapiro-Wilk residual validation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit ln(Weight) ~ ln(Diameter²·Height) on one cohort and validate residual normality.
    Fit(FitArgs),
    /// Write a synthetic measurement CSV with a known allometric relationship.
    Sample(SampleArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Measurement CSV (TreeID, Age, Year, Treatment, Diameter, Height, Weight).
    #[arg(short = 'd', long, env = "BIOMASS_DATA", default_value = DEFAULT_DATA_PATH)]
    pub data: PathBuf,

    /// Cohort age.
    #[arg(long, default_value_t = 3)]
    pub age: i64,

    /// Cohort measurement year.
    #[arg(long, default_value_t = 1)]
    pub year: i64,

    /// Cohort treatment code.
    #[arg(long, default_value_t = 1)]
    pub treatment: i64,

    /// Significance level for the Shapiro-Wilk test.
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    pub alpha: f64,

    /// Override one measurement before fitting, e.g. `15:diameter=2.9` (repeatable).
    #[arg(long = "correct", value_name = "TREE:FIELD=VALUE")]
    pub corrections: Vec<RowCorrection>,

    /// Print adjusted R², F-test, coefficient table and information criteria.
    #[arg(long)]
    pub details: bool,

    /// Print the per-tree residual table.
    #[arg(long)]
    pub residuals: bool,

    /// Export the full report to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Export per-tree derived variables and residuals to CSV.
    #[arg(long = "export-residuals")]
    pub export_residuals: Option<PathBuf>,

    /// Documented Shapiro-Wilk p-value to reproduce (exit code 5 on mismatch).
    #[arg(long = "expect-shapiro-p")]
    pub expect_shapiro_p: Option<f64>,

    /// Absolute tolerance for `--expect-shapiro-p`.
    #[arg(long, default_value_t = DEFAULT_REPRODUCTION_TOLERANCE)]
    pub tolerance: f64,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    /// Output CSV path.
    #[arg(short = 'o', long)]
    pub out: PathBuf,

    /// Trees generated per (age, year, treatment) cohort.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub trees: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// True intercept of ln(Weight) on ln(DDH).
    #[arg(long, default_value_t = -3.0, allow_negative_numbers = true)]
    pub intercept: f64,

    /// True slope of ln(Weight) on ln(DDH).
    #[arg(long, default_value_t = 0.95, allow_negative_numbers = true)]
    pub slope: f64,

    /// Standard deviation of the log-scale weight noise.
    #[arg(long, default_value_t = 0.08)]
    pub sigma: f64,

    /// Ages to generate (comma separated).
    #[arg(long, value_delimiter = ',', default_value = "2,3")]
    pub ages: Vec<i64>,

    /// Years to generate (comma separated).
    #[arg(long, value_delimiter = ',', default_value = "1,2")]
    pub years: Vec<i64>,

    /// Treatments to generate (comma separated).
    #[arg(long, value_delimiter = ',', default_value = "1,2")]
    pub treatments: Vec<i64>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}
