//! `pv-installations`, `consumption` and `coverage` commands.

use std::collections::BTreeMap;
use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use pvstats_data::analysis::{
    CoverageParams, PerimeterSummary, analyze_pv_installations, consumption_per_city,
    process_pv_coverage, relate_pv_location,
};
use pvstats_data::io::{ReadOptions, read_geo_table, read_table};
use pvstats_data::processing::{OutputSettings, process_consumption_per_city};
use serde::{Deserialize, Serialize};

use crate::CliError;
use crate::sources::{
    ARG_GEO_FORMAT, ARG_PROCESSED_FOLDER, ARG_RESULTS_FOLDER, ARG_TABLE_FORMAT, OutputOverrides,
    load_json, require_existing,
};

pub(crate) const ARG_INSTALLATIONS: &str = "installations";
pub(crate) const ARG_MAPPING: &str = "mapping";
pub(crate) const ARG_SAVE_TO: &str = "save-to";
pub(crate) const ARG_DIVISIONS: &str = "divisions";
pub(crate) const ARG_CONSUMPTION: &str = "consumption";
pub(crate) const ARG_YEAR: &str = "year";
pub(crate) const ARG_SOURCE: &str = "source";
pub(crate) const ARG_SHEET: &str = "sheet";
pub(crate) const ARG_PARAMS: &str = "params";
pub(crate) const ENV_INSTALLATIONS: &str = "PVSTATS_CMDS_PV_INSTALLATIONS_INSTALLATIONS";
pub(crate) const ENV_INSTALLATIONS_MAPPING: &str = "PVSTATS_CMDS_PV_INSTALLATIONS_MAPPING";
pub(crate) const ENV_INSTALLATIONS_SAVE_TO: &str = "PVSTATS_CMDS_PV_INSTALLATIONS_SAVE_TO";
pub(crate) const ENV_CONSUMPTION_DIVISIONS: &str = "PVSTATS_CMDS_CONSUMPTION_DIVISIONS";
pub(crate) const ENV_CONSUMPTION_INPUT: &str = "PVSTATS_CMDS_CONSUMPTION_CONSUMPTION";
pub(crate) const ENV_CONSUMPTION_YEAR: &str = "PVSTATS_CMDS_CONSUMPTION_YEAR";
pub(crate) const ENV_CONSUMPTION_SAVE_TO: &str = "PVSTATS_CMDS_CONSUMPTION_SAVE_TO";
pub(crate) const ENV_COVERAGE_SOURCE: &str = "PVSTATS_CMDS_COVERAGE_SOURCE";
pub(crate) const ENV_COVERAGE_PARAMS: &str = "PVSTATS_CMDS_COVERAGE_PARAMS";
pub(crate) const ENV_COVERAGE_DIVISIONS: &str = "PVSTATS_CMDS_COVERAGE_DIVISIONS";
pub(crate) const ENV_COVERAGE_SAVE_TO: &str = "PVSTATS_CMDS_COVERAGE_SAVE_TO";

/// CLI arguments for the `pv-installations` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "pv-installations",
    long_about = "Stack the installation polygon layers, write them as \
                 GeoJSON and report, for every perimeter, the hectares of \
                 each installation category it contains.",
    about = "Summarise installable surface per perimeter"
)]
#[ortho_config(prefix = "PVSTATS")]
pub(crate) struct PvInstallationsArgs {
    /// Installation polygon layers.
    #[arg(value_name = "path")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) installations: Vec<Utf8PathBuf>,
    /// JSON file mapping category codes to names.
    #[arg(long = ARG_MAPPING, value_name = "path")]
    #[serde(default)]
    pub(crate) mapping: Option<Utf8PathBuf>,
    /// GeoJSON file receiving the stacked layers.
    #[arg(long = ARG_SAVE_TO, value_name = "path")]
    #[serde(default)]
    pub(crate) save_to: Option<Utf8PathBuf>,
}

impl PvInstallationsArgs {
    pub(crate) fn into_config(self) -> Result<PvInstallationsConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        PvInstallationsConfig::try_from(merged)
    }
}

/// Resolved `pv-installations` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PvInstallationsConfig {
    pub(crate) installations: Vec<Utf8PathBuf>,
    pub(crate) mapping: Utf8PathBuf,
    pub(crate) save_to: Utf8PathBuf,
}

impl PvInstallationsConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        for path in &self.installations {
            require_existing(path, ARG_INSTALLATIONS)?;
        }
        require_existing(&self.mapping, ARG_MAPPING)
    }
}

impl TryFrom<PvInstallationsArgs> for PvInstallationsConfig {
    type Error = CliError;

    fn try_from(args: PvInstallationsArgs) -> Result<Self, Self::Error> {
        if args.installations.is_empty() {
            return Err(CliError::MissingArgument {
                field: ARG_INSTALLATIONS,
                env: ENV_INSTALLATIONS,
            });
        }
        let mapping = args.mapping.ok_or(CliError::MissingArgument {
            field: ARG_MAPPING,
            env: ENV_INSTALLATIONS_MAPPING,
        })?;
        let save_to = args.save_to.ok_or(CliError::MissingArgument {
            field: ARG_SAVE_TO,
            env: ENV_INSTALLATIONS_SAVE_TO,
        })?;
        Ok(Self {
            installations: args.installations,
            mapping,
            save_to,
        })
    }
}

pub(crate) fn run_pv_installations(args: PvInstallationsArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let summaries = execute_pv_installations(&config)?;
    let mut stdout = std::io::stdout().lock();
    write_summaries(&mut stdout, &summaries)
}

pub(crate) fn execute_pv_installations(
    config: &PvInstallationsConfig,
) -> Result<Vec<PerimeterSummary>, CliError> {
    let mapping: BTreeMap<String, String> = load_json(&config.mapping, ARG_MAPPING)?;
    Ok(analyze_pv_installations(
        &config.installations,
        &mapping,
        &config.save_to,
    )?)
}

/// Write one block per perimeter to `writer`.
pub(crate) fn write_summaries(
    writer: &mut dyn Write,
    summaries: &[PerimeterSummary],
) -> Result<(), CliError> {
    for summary in summaries {
        write!(writer, "{summary}").map_err(CliError::WriteOutput)?;
    }
    writer.flush().map_err(CliError::WriteOutput)
}

/// CLI arguments for the `consumption` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "consumption",
    long_about = "Clean the municipal electricity consumption file and \
                 relate the consumption of one year to the population and \
                 surface of every municipality.",
    about = "Consumption per inhabitant and per square kilometre"
)]
#[ortho_config(prefix = "PVSTATS")]
pub(crate) struct ConsumptionArgs {
    /// Municipal boundaries with census information.
    #[arg(long = ARG_DIVISIONS, value_name = "path")]
    #[serde(default)]
    pub(crate) divisions: Option<Utf8PathBuf>,
    /// Raw consumption per municipality (Latin-1 CSV).
    #[arg(long = ARG_CONSUMPTION, value_name = "path")]
    #[serde(default)]
    pub(crate) consumption: Option<Utf8PathBuf>,
    /// Consumption column to relate, e.g. `2021`.
    #[arg(long = ARG_YEAR, value_name = "year")]
    #[serde(default)]
    pub(crate) year: Option<String>,
    /// GeoJSON file receiving the result.
    #[arg(long = ARG_SAVE_TO, value_name = "path")]
    #[serde(default)]
    pub(crate) save_to: Option<Utf8PathBuf>,
    /// Folder receiving cleaned inputs (`data/processed`).
    #[arg(long = ARG_PROCESSED_FOLDER, value_name = "dir")]
    #[serde(default)]
    pub(crate) processed_folder: Option<Utf8PathBuf>,
    /// Folder receiving results (`data/results`).
    #[arg(long = ARG_RESULTS_FOLDER, value_name = "dir")]
    #[serde(default)]
    pub(crate) results_folder: Option<Utf8PathBuf>,
    /// Format of saved tables: parquet, csv or json.
    #[arg(long = ARG_TABLE_FORMAT, value_name = "format")]
    #[serde(default)]
    pub(crate) table_format: Option<String>,
    /// Format of saved geo tables: parquet, geojson or gpkg.
    #[arg(long = ARG_GEO_FORMAT, value_name = "format")]
    #[serde(default)]
    pub(crate) geo_format: Option<String>,
}

impl ConsumptionArgs {
    pub(crate) fn into_config(self) -> Result<ConsumptionConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ConsumptionConfig::try_from(merged)
    }
}

/// Resolved `consumption` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConsumptionConfig {
    pub(crate) divisions: Utf8PathBuf,
    pub(crate) consumption: Utf8PathBuf,
    pub(crate) year: String,
    pub(crate) save_to: Utf8PathBuf,
    pub(crate) settings: OutputSettings,
}

impl ConsumptionConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.divisions, ARG_DIVISIONS)?;
        require_existing(&self.consumption, ARG_CONSUMPTION)
    }
}

impl TryFrom<ConsumptionArgs> for ConsumptionConfig {
    type Error = CliError;

    fn try_from(args: ConsumptionArgs) -> Result<Self, Self::Error> {
        let divisions = args.divisions.ok_or(CliError::MissingArgument {
            field: ARG_DIVISIONS,
            env: ENV_CONSUMPTION_DIVISIONS,
        })?;
        let consumption = args.consumption.ok_or(CliError::MissingArgument {
            field: ARG_CONSUMPTION,
            env: ENV_CONSUMPTION_INPUT,
        })?;
        let year = args.year.ok_or(CliError::MissingArgument {
            field: ARG_YEAR,
            env: ENV_CONSUMPTION_YEAR,
        })?;
        let save_to = args.save_to.ok_or(CliError::MissingArgument {
            field: ARG_SAVE_TO,
            env: ENV_CONSUMPTION_SAVE_TO,
        })?;
        let settings = OutputOverrides {
            processed_folder: args.processed_folder.as_deref(),
            results_folder: args.results_folder.as_deref(),
            table_format: args.table_format.as_deref(),
            geo_format: args.geo_format.as_deref(),
        }
        .resolve()?;
        Ok(Self {
            divisions,
            consumption,
            year,
            save_to,
            settings,
        })
    }
}

pub(crate) fn run_consumption(args: ConsumptionArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    execute_consumption(&config)
}

pub(crate) fn execute_consumption(config: &ConsumptionConfig) -> Result<(), CliError> {
    let consumption = process_consumption_per_city(&config.consumption, &config.settings)?;
    let divisions = read_geo_table(&config.divisions, None)?;
    consumption_per_city(&divisions, &consumption, &config.year, &config.save_to)?;
    Ok(())
}

/// CLI arguments for the `coverage` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "coverage",
    long_about = "Estimate the share of municipal demand rooftop \
                 photovoltaics can cover, the ground surface needed to reach \
                 the target share, and attach the result to the municipal \
                 boundaries. Model parameters come from a JSON file.",
    about = "Photovoltaic coverage of municipal demand"
)]
#[ortho_config(prefix = "PVSTATS")]
pub(crate) struct CoverageArgs {
    /// Municipal source table (spreadsheet, CSV or Parquet).
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) source: Option<Utf8PathBuf>,
    /// Worksheet to read from spreadsheet sources.
    #[arg(long = ARG_SHEET, value_name = "name")]
    #[serde(default)]
    pub(crate) sheet: Option<String>,
    /// JSON file with the coverage model parameters.
    #[arg(long = ARG_PARAMS, value_name = "path")]
    #[serde(default)]
    pub(crate) params: Option<Utf8PathBuf>,
    /// Municipal boundaries with census information.
    #[arg(long = ARG_DIVISIONS, value_name = "path")]
    #[serde(default)]
    pub(crate) divisions: Option<Utf8PathBuf>,
    /// GeoJSON file receiving the located coverage.
    #[arg(long = ARG_SAVE_TO, value_name = "path")]
    #[serde(default)]
    pub(crate) save_to: Option<Utf8PathBuf>,
}

impl CoverageArgs {
    pub(crate) fn into_config(self) -> Result<CoverageConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        CoverageConfig::try_from(merged)
    }
}

/// Resolved `coverage` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CoverageConfig {
    pub(crate) source: Utf8PathBuf,
    pub(crate) sheet: Option<String>,
    pub(crate) params: Utf8PathBuf,
    pub(crate) divisions: Utf8PathBuf,
    pub(crate) save_to: Utf8PathBuf,
}

impl CoverageConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.source, ARG_SOURCE)?;
        require_existing(&self.params, ARG_PARAMS)?;
        require_existing(&self.divisions, ARG_DIVISIONS)
    }
}

impl TryFrom<CoverageArgs> for CoverageConfig {
    type Error = CliError;

    fn try_from(args: CoverageArgs) -> Result<Self, Self::Error> {
        let source = args.source.ok_or(CliError::MissingArgument {
            field: ARG_SOURCE,
            env: ENV_COVERAGE_SOURCE,
        })?;
        let params = args.params.ok_or(CliError::MissingArgument {
            field: ARG_PARAMS,
            env: ENV_COVERAGE_PARAMS,
        })?;
        let divisions = args.divisions.ok_or(CliError::MissingArgument {
            field: ARG_DIVISIONS,
            env: ENV_COVERAGE_DIVISIONS,
        })?;
        let save_to = args.save_to.ok_or(CliError::MissingArgument {
            field: ARG_SAVE_TO,
            env: ENV_COVERAGE_SAVE_TO,
        })?;
        Ok(Self {
            source,
            sheet: args.sheet,
            params,
            divisions,
            save_to,
        })
    }
}

pub(crate) fn run_coverage(args: CoverageArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    execute_coverage(&config)
}

pub(crate) fn execute_coverage(config: &CoverageConfig) -> Result<(), CliError> {
    let params: CoverageParams = load_json(&config.params, ARG_PARAMS)?;
    let mut options = ReadOptions::default();
    if let Some(sheet) = &config.sheet {
        options = options.with_sheet(sheet.as_str());
    }
    let source = read_table(&config.source, &options)?;
    let coverage = process_pv_coverage(&source, &params)?;
    let divisions = read_geo_table(&config.divisions, None)?;
    let located = relate_pv_location(&coverage, &divisions, &config.save_to)?;
    info!(
        "coverage estimated for {} municipalities, {} located",
        coverage.height(),
        located.height()
    );
    Ok(())
}
