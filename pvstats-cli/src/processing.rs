//! `process-divisions`, `land-use` and `remap-categories` commands.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use pvstats_data::processing::{
    DivisionInputs, LandUseIds, OutputSettings, administrative_divisions_with_info,
    filter_land_use, process_land_use, process_urban_zones, remap_column_categories,
};
use serde::{Deserialize, Serialize};

use crate::CliError;
use crate::sources::{
    ARG_GEO_FORMAT, ARG_PROCESSED_FOLDER, ARG_RESULTS_FOLDER, ARG_TABLE_FORMAT, OutputOverrides,
    load_json, processed_geo_path, processed_table_path, require_existing,
};

pub(crate) const ARG_DIVISIONS: &str = "divisions";
pub(crate) const ARG_CITIES: &str = "cities";
pub(crate) const ARG_URBAN_ZONES: &str = "urban-zones";
pub(crate) const ARG_LAND_USE: &str = "land-use";
pub(crate) const ARG_LAYER: &str = "layer";
pub(crate) const ARG_URBANIZED_IDS: &str = "urbanized-ids";
pub(crate) const ARG_INDUSTRIAL_IDS: &str = "industrial-ids";
pub(crate) const ARG_URBAN_IDS: &str = "urban-ids";
pub(crate) const ARG_SERVICE_IDS: &str = "service-ids";
pub(crate) const ARG_INPUT: &str = "input";
pub(crate) const ARG_COLUMN: &str = "column";
pub(crate) const ARG_MAPPING: &str = "mapping";
pub(crate) const ARG_SAVE_TO: &str = "save-to";
pub(crate) const ENV_DIVISIONS: &str = "PVSTATS_CMDS_PROCESS_DIVISIONS_DIVISIONS";
pub(crate) const ENV_CITIES: &str = "PVSTATS_CMDS_PROCESS_DIVISIONS_CITIES";
pub(crate) const ENV_LAND_USE: &str = "PVSTATS_CMDS_LAND_USE_LAND_USE";
pub(crate) const ENV_REMAP_INPUT: &str = "PVSTATS_CMDS_REMAP_CATEGORIES_INPUT";
pub(crate) const ENV_REMAP_MAPPING: &str = "PVSTATS_CMDS_REMAP_CATEGORIES_MAPPING";

const DEFAULT_CATEGORY_COLUMN: &str = "categoria";

/// CLI arguments for the `process-divisions` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "process-divisions",
    long_about = "Clean the administrative boundaries and the municipal \
                 census, then join them into \
                 administrative_divisions_with_info. Processed inputs already \
                 present in the processed folder are reused.",
    about = "Build the municipal boundaries with census information"
)]
#[ortho_config(prefix = "PVSTATS")]
pub(crate) struct ProcessDivisionsArgs {
    /// Raw administrative boundaries (GeoPackage).
    #[arg(long = ARG_DIVISIONS, value_name = "path")]
    #[serde(default)]
    pub(crate) divisions: Option<Utf8PathBuf>,
    /// Raw municipal census (`;`-separated Latin-1 CSV).
    #[arg(long = ARG_CITIES, value_name = "path")]
    #[serde(default)]
    pub(crate) cities: Option<Utf8PathBuf>,
    /// Urban zone polygons to measure as well.
    #[arg(long = ARG_URBAN_ZONES, value_name = "path")]
    #[serde(default)]
    pub(crate) urban_zones: Option<Utf8PathBuf>,
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

impl ProcessDivisionsArgs {
    pub(crate) fn into_config(self) -> Result<ProcessDivisionsConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ProcessDivisionsConfig::try_from(merged)
    }
}

fn is_file(path: &Utf8Path) -> bool {
    matches!(pvstats_fs::file_is_file(path), Ok(true))
}

/// Resolved `process-divisions` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProcessDivisionsConfig {
    pub(crate) inputs: DivisionInputs,
    pub(crate) urban_zones: Option<Utf8PathBuf>,
    pub(crate) settings: OutputSettings,
}

impl ProcessDivisionsConfig {
    /// Raw inputs only need to exist when their processed form is missing.
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        if !is_file(&self.inputs.processed_divisions) {
            require_existing(&self.inputs.raw_divisions, ARG_DIVISIONS)?;
        }
        if !is_file(&self.inputs.processed_cities) {
            require_existing(&self.inputs.raw_cities, ARG_CITIES)?;
        }
        if let Some(path) = &self.urban_zones {
            require_existing(path, ARG_URBAN_ZONES)?;
        }
        Ok(())
    }
}

impl TryFrom<ProcessDivisionsArgs> for ProcessDivisionsConfig {
    type Error = CliError;

    fn try_from(args: ProcessDivisionsArgs) -> Result<Self, Self::Error> {
        let raw_divisions = args.divisions.ok_or(CliError::MissingArgument {
            field: ARG_DIVISIONS,
            env: ENV_DIVISIONS,
        })?;
        let raw_cities = args.cities.ok_or(CliError::MissingArgument {
            field: ARG_CITIES,
            env: ENV_CITIES,
        })?;
        let settings = OutputOverrides {
            processed_folder: args.processed_folder.as_deref(),
            results_folder: args.results_folder.as_deref(),
            table_format: args.table_format.as_deref(),
            geo_format: args.geo_format.as_deref(),
        }
        .resolve()?;
        Ok(Self {
            inputs: DivisionInputs {
                processed_divisions: processed_geo_path(&settings, "administrative_divisions"),
                raw_divisions,
                processed_cities: processed_table_path(&settings, "cities_info"),
                raw_cities,
            },
            urban_zones: args.urban_zones,
            settings,
        })
    }
}

pub(crate) fn run_process_divisions(args: ProcessDivisionsArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    execute_process_divisions(&config)
}

pub(crate) fn execute_process_divisions(config: &ProcessDivisionsConfig) -> Result<(), CliError> {
    let divisions = administrative_divisions_with_info(&config.inputs, &config.settings)?;
    info!("{} municipalities with census information", divisions.height());
    if let Some(path) = &config.urban_zones {
        let zones = process_urban_zones(path, &config.settings)?;
        info!("{} urban zones measured", zones.height());
    }
    Ok(())
}

/// CLI arguments for the `land-use` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "land-use",
    long_about = "Keep the urban land-use polygons and sum the surface of \
                 each land-use grouping per municipality. Every grouping \
                 needs at least one land-use id, usually set in the \
                 configuration file.",
    about = "Aggregate land use per municipality"
)]
#[ortho_config(prefix = "PVSTATS")]
pub(crate) struct LandUseArgs {
    /// Land-use polygons (GeoPackage).
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) land_use: Option<Utf8PathBuf>,
    /// GeoPackage layer (`SAR_28_T_USOS`).
    #[arg(long = ARG_LAYER, value_name = "name")]
    #[serde(default)]
    pub(crate) layer: Option<String>,
    /// Land-use ids counted as urbanized.
    #[arg(long = ARG_URBANIZED_IDS, value_name = "ids", value_delimiter = ',')]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) urbanized_ids: Vec<i64>,
    /// Land-use ids counted as industrial.
    #[arg(long = ARG_INDUSTRIAL_IDS, value_name = "ids", value_delimiter = ',')]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) industrial_ids: Vec<i64>,
    /// Land-use ids counted as urban.
    #[arg(long = ARG_URBAN_IDS, value_name = "ids", value_delimiter = ',')]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) urban_ids: Vec<i64>,
    /// Land-use ids counted as services.
    #[arg(long = ARG_SERVICE_IDS, value_name = "ids", value_delimiter = ',')]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) service_ids: Vec<i64>,
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

impl LandUseArgs {
    pub(crate) fn into_config(self) -> Result<LandUseConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        LandUseConfig::try_from(merged)
    }
}

/// Resolved `land-use` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LandUseConfig {
    pub(crate) land_use: Utf8PathBuf,
    pub(crate) layer: Option<String>,
    pub(crate) ids: LandUseIds,
    pub(crate) settings: OutputSettings,
}

impl TryFrom<LandUseArgs> for LandUseConfig {
    type Error = CliError;

    fn try_from(args: LandUseArgs) -> Result<Self, Self::Error> {
        let land_use = args.land_use.ok_or(CliError::MissingArgument {
            field: ARG_LAND_USE,
            env: ENV_LAND_USE,
        })?;
        let settings = OutputOverrides {
            processed_folder: args.processed_folder.as_deref(),
            results_folder: args.results_folder.as_deref(),
            table_format: args.table_format.as_deref(),
            geo_format: args.geo_format.as_deref(),
        }
        .resolve()?;
        Ok(Self {
            land_use,
            layer: args.layer,
            ids: LandUseIds {
                urbanized: args.urbanized_ids,
                industrial: args.industrial_ids,
                urban: args.urban_ids,
                service: args.service_ids,
            },
            settings,
        })
    }
}

pub(crate) fn run_land_use(args: LandUseArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    require_existing(&config.land_use, ARG_LAND_USE)?;
    execute_land_use(&config)
}

pub(crate) fn execute_land_use(config: &LandUseConfig) -> Result<(), CliError> {
    let layer = config.layer.as_deref();
    process_land_use(&config.land_use, layer, &config.ids.urban, &config.settings)?;
    let surfaces = filter_land_use(&config.land_use, layer, &config.ids, &config.settings)?;
    info!("land-use surfaces for {} municipalities", surfaces.height());
    Ok(())
}

/// CLI arguments for the `remap-categories` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "remap-categories",
    long_about = "Rename the category codes of a geo table column through a \
                 JSON object mapping old codes to new ones. Codes missing \
                 from the mapping become null.",
    about = "Rename category codes in a geo table"
)]
#[ortho_config(prefix = "PVSTATS")]
pub(crate) struct RemapCategoriesArgs {
    /// Geo table to remap.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Column holding the categories (`categoria`).
    #[arg(long = ARG_COLUMN, value_name = "name")]
    #[serde(default)]
    pub(crate) column: Option<String>,
    /// JSON file with the code mapping.
    #[arg(long = ARG_MAPPING, value_name = "path")]
    #[serde(default)]
    pub(crate) mapping: Option<Utf8PathBuf>,
    /// Where to write the remapped table.
    #[arg(long = ARG_SAVE_TO, value_name = "path")]
    #[serde(default)]
    pub(crate) save_to: Option<Utf8PathBuf>,
}

impl RemapCategoriesArgs {
    pub(crate) fn into_config(self) -> Result<RemapCategoriesConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RemapCategoriesConfig::try_from(merged)
    }
}

/// Resolved `remap-categories` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RemapCategoriesConfig {
    pub(crate) input: Utf8PathBuf,
    pub(crate) column: String,
    pub(crate) mapping: Utf8PathBuf,
    pub(crate) save_to: Option<Utf8PathBuf>,
}

impl TryFrom<RemapCategoriesArgs> for RemapCategoriesConfig {
    type Error = CliError;

    fn try_from(args: RemapCategoriesArgs) -> Result<Self, Self::Error> {
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_INPUT,
            env: ENV_REMAP_INPUT,
        })?;
        let mapping = args.mapping.ok_or(CliError::MissingArgument {
            field: ARG_MAPPING,
            env: ENV_REMAP_MAPPING,
        })?;
        Ok(Self {
            input,
            column: args
                .column
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLUMN.to_owned()),
            mapping,
            save_to: args.save_to,
        })
    }
}

pub(crate) fn run_remap_categories(args: RemapCategoriesArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    require_existing(&config.input, ARG_INPUT)?;
    require_existing(&config.mapping, ARG_MAPPING)?;
    execute_remap_categories(&config)
}

pub(crate) fn execute_remap_categories(config: &RemapCategoriesConfig) -> Result<(), CliError> {
    let mapping: BTreeMap<String, String> = load_json(&config.mapping, ARG_MAPPING)?;
    let remapped = remap_column_categories(
        &config.input,
        &config.column,
        &mapping,
        config.save_to.as_deref(),
    )?;
    info!("remapped `{}` in {} rows", config.column, remapped.height());
    Ok(())
}

#[cfg(test)]
pub(crate) fn land_use_config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<LandUseConfig, CliError> {
    let merged = LandUseArgs::merge_from_layers(layers).map_err(CliError::from)?;
    LandUseConfig::try_from(merged)
}
