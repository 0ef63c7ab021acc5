//! Command-line interface for the photovoltaic statistics pipelines.
//!
//! Every subcommand layers its arguments with `ortho_config` (CLI flags over
//! `PVSTATS_*` environment variables over configuration files), resolves them
//! into a validated config and runs one pipeline from `pvstats-data`.
#![forbid(unsafe_code)]

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use log::LevelFilter;

mod analysis;
mod error;
mod logging;
mod processing;
mod ree;
mod sources;

use analysis::{
    ConsumptionArgs, CoverageArgs, PvInstallationsArgs, run_consumption, run_coverage,
    run_pv_installations,
};
pub use error::CliError;
use processing::{
    LandUseArgs, ProcessDivisionsArgs, RemapCategoriesArgs, run_land_use, run_process_divisions,
    run_remap_categories,
};
use ree::{ReeDemandArgs, ReeGenerationArgs, run_ree_demand, run_ree_generation};

const ARG_LOG_LEVEL: &str = "log-level";
const ARG_LOG_FILE: &str = "log-file";
const ENV_LOG_LEVEL: &str = "PVSTATS_LOG_LEVEL";
const ENV_LOG_FILE: &str = "PVSTATS_LOG_FILE";

/// Run the pvstats CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    logging::init(cli.log_level, cli.log_file.as_deref())?;
    dispatch(cli.command)
}

fn dispatch(command: Command) -> Result<(), CliError> {
    match command {
        Command::ReeDemand(args) => run_ree_demand(args),
        Command::ReeGeneration(args) => run_ree_generation(args),
        Command::ProcessDivisions(args) => run_process_divisions(args),
        Command::LandUse(args) => run_land_use(args),
        Command::PvInstallations(args) => run_pv_installations(args),
        Command::Consumption(args) => run_consumption(args),
        Command::Coverage(args) => run_coverage(args),
        Command::RemapCategories(args) => run_remap_categories(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "pvstats",
    about = "Photovoltaic potential and electricity statistics for the \
             municipalities of Madrid",
    version
)]
struct Cli {
    /// Minimum level of logged records: trace, debug, info, warn or error.
    #[arg(
        long = ARG_LOG_LEVEL,
        env = ENV_LOG_LEVEL,
        value_name = "level",
        default_value = "info",
        global = true
    )]
    log_level: LevelFilter,
    /// Append log records to this file as well as stderr.
    #[arg(long = ARG_LOG_FILE, env = ENV_LOG_FILE, value_name = "path", global = true)]
    log_file: Option<Utf8PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download demand from the REE data API.
    ReeDemand(ReeDemandArgs),
    /// Download the generation mix from the REE demand API.
    ReeGeneration(ReeGenerationArgs),
    /// Build the municipal boundaries with census information.
    ProcessDivisions(ProcessDivisionsArgs),
    /// Aggregate land use per municipality.
    LandUse(LandUseArgs),
    /// Summarise installable surface per perimeter.
    PvInstallations(PvInstallationsArgs),
    /// Relate electricity consumption to population and surface.
    Consumption(ConsumptionArgs),
    /// Estimate photovoltaic coverage of municipal demand.
    Coverage(CoverageArgs),
    /// Rename category codes in a geo table.
    RemapCategories(RemapCategoriesArgs),
}

#[cfg(test)]
mod tests;
