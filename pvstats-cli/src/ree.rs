//! `ree-demand` and `ree-generation` commands.

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use pvstats_data::ree::{
    ApiDate, DEFAULT_DATA_HOST, DEFAULT_DEMANDA_HOST, DEFAULT_MAX_DAYS_PER_REQUEST, HttpTransport,
    Language, ReeDataClient, ReeDemandaClient, ReeTransport, TimeTrunc, parse_date,
    retrieve_demand, retrieve_generation, save_series,
};
use serde::{Deserialize, Serialize};

use crate::CliError;

pub(crate) const ARG_OUTPUT: &str = "output";
pub(crate) const ARG_START: &str = "start";
pub(crate) const ARG_END: &str = "end";
pub(crate) const ARG_TIME_TRUNC: &str = "time-trunc";
pub(crate) const ARG_MAX_DAYS: &str = "max-days";
pub(crate) const ARG_HOST: &str = "host";
pub(crate) const ARG_LANGUAGE: &str = "language";
pub(crate) const ARG_GEO_LIMIT: &str = "geo-limit";
pub(crate) const ENV_DEMAND_OUTPUT: &str = "PVSTATS_CMDS_REE_DEMAND_OUTPUT";
pub(crate) const ENV_DEMAND_START: &str = "PVSTATS_CMDS_REE_DEMAND_START";
pub(crate) const ENV_DEMAND_END: &str = "PVSTATS_CMDS_REE_DEMAND_END";
pub(crate) const ENV_GENERATION_OUTPUT: &str = "PVSTATS_CMDS_REE_GENERATION_OUTPUT";
pub(crate) const ENV_GENERATION_START: &str = "PVSTATS_CMDS_REE_GENERATION_START";
pub(crate) const ENV_GENERATION_END: &str = "PVSTATS_CMDS_REE_GENERATION_END";

const DEMAND_PREFIX: &str = "ree_demand";
const GENERATION_PREFIX: &str = "ree_generation";
const DEFAULT_GEO_LIMIT: &str = "NACIONAL";

/// CLI arguments for the `ree-demand` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "ree-demand",
    long_about = "Download real-time demand from the REE data API. Long \
                 ranges are split into windows of at most --max-days days \
                 and the answers are written to a single CSV file.",
    about = "Download REE demand as CSV"
)]
#[ortho_config(prefix = "PVSTATS")]
pub(crate) struct ReeDemandArgs {
    /// Folder receiving `ree_demand_{start}_{end}.csv`, or the file path.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// First instant, ISO 8601 (e.g. `2022-01-01T00:00`).
    #[arg(value_name = "start")]
    #[serde(default)]
    pub(crate) start: Option<String>,
    /// Last instant, ISO 8601.
    #[arg(value_name = "end")]
    #[serde(default)]
    pub(crate) end: Option<String>,
    /// Time aggregation: hour, day, month or year.
    #[arg(long = ARG_TIME_TRUNC, value_name = "trunc")]
    #[serde(default)]
    pub(crate) time_trunc: Option<String>,
    /// Longest span covered by one request, in days.
    #[arg(long = ARG_MAX_DAYS, value_name = "days")]
    #[serde(default)]
    pub(crate) max_days: Option<u32>,
    /// Data API host (`apidatos.ree.es`).
    #[arg(long = ARG_HOST, value_name = "host")]
    #[serde(default)]
    pub(crate) host: Option<String>,
    /// Response language, `es` or `en`.
    #[arg(long = ARG_LANGUAGE, value_name = "code")]
    #[serde(default)]
    pub(crate) language: Option<String>,
}

impl ReeDemandArgs {
    pub(crate) fn into_config(self) -> Result<ReeDemandConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ReeDemandConfig::try_from(merged)
    }
}

/// Resolved `ree-demand` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReeDemandConfig {
    pub(crate) output: Utf8PathBuf,
    pub(crate) start: ApiDate,
    pub(crate) end: ApiDate,
    pub(crate) time_trunc: TimeTrunc,
    pub(crate) max_days: u32,
    pub(crate) host: String,
    pub(crate) language: Language,
}

impl TryFrom<ReeDemandArgs> for ReeDemandConfig {
    type Error = CliError;

    fn try_from(args: ReeDemandArgs) -> Result<Self, Self::Error> {
        let output = args.output.ok_or(CliError::MissingArgument {
            field: ARG_OUTPUT,
            env: ENV_DEMAND_OUTPUT,
        })?;
        let start = args.start.ok_or(CliError::MissingArgument {
            field: ARG_START,
            env: ENV_DEMAND_START,
        })?;
        let end = args.end.ok_or(CliError::MissingArgument {
            field: ARG_END,
            env: ENV_DEMAND_END,
        })?;
        let time_trunc = match args.time_trunc {
            Some(raw) => raw.parse::<TimeTrunc>()?,
            None => TimeTrunc::Hour,
        };
        Ok(Self {
            output,
            start: parse_date(&start)?,
            end: parse_date(&end)?,
            time_trunc,
            max_days: args.max_days.unwrap_or(DEFAULT_MAX_DAYS_PER_REQUEST),
            host: args.host.unwrap_or_else(|| DEFAULT_DATA_HOST.to_owned()),
            language: args
                .language
                .as_deref()
                .map_or_else(Language::default, Language::parse_or_default),
        })
    }
}

/// CLI arguments for the `ree-generation` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "ree-generation",
    long_about = "Download the generation mix from the REE demand API, one \
                 request per calendar day from start to end inclusive, and \
                 write it to a single CSV file.",
    about = "Download REE generation as CSV"
)]
#[ortho_config(prefix = "PVSTATS")]
pub(crate) struct ReeGenerationArgs {
    /// Folder receiving `ree_generation_{start}_{end}.csv`, or the file path.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// First day, ISO 8601.
    #[arg(value_name = "start")]
    #[serde(default)]
    pub(crate) start: Option<String>,
    /// Last day, ISO 8601.
    #[arg(value_name = "end")]
    #[serde(default)]
    pub(crate) end: Option<String>,
    /// Zone of the generation curve (`NACIONAL`).
    #[arg(long = ARG_GEO_LIMIT, value_name = "zone")]
    #[serde(default)]
    pub(crate) geo_limit: Option<String>,
    /// Demand API host (`demanda.ree.es`).
    #[arg(long = ARG_HOST, value_name = "host")]
    #[serde(default)]
    pub(crate) host: Option<String>,
}

impl ReeGenerationArgs {
    pub(crate) fn into_config(self) -> Result<ReeGenerationConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ReeGenerationConfig::try_from(merged)
    }
}

/// Resolved `ree-generation` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReeGenerationConfig {
    pub(crate) output: Utf8PathBuf,
    pub(crate) start: ApiDate,
    pub(crate) end: ApiDate,
    pub(crate) geo_limit: String,
    pub(crate) host: String,
}

impl TryFrom<ReeGenerationArgs> for ReeGenerationConfig {
    type Error = CliError;

    fn try_from(args: ReeGenerationArgs) -> Result<Self, Self::Error> {
        let output = args.output.ok_or(CliError::MissingArgument {
            field: ARG_OUTPUT,
            env: ENV_GENERATION_OUTPUT,
        })?;
        let start = args.start.ok_or(CliError::MissingArgument {
            field: ARG_START,
            env: ENV_GENERATION_START,
        })?;
        let end = args.end.ok_or(CliError::MissingArgument {
            field: ARG_END,
            env: ENV_GENERATION_END,
        })?;
        Ok(Self {
            output,
            start: parse_date(&start)?,
            end: parse_date(&end)?,
            geo_limit: args
                .geo_limit
                .unwrap_or_else(|| DEFAULT_GEO_LIMIT.to_owned()),
            host: args.host.unwrap_or_else(|| DEFAULT_DEMANDA_HOST.to_owned()),
        })
    }
}

fn block_on<F: Future>(future: F) -> Result<F::Output, CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    Ok(runtime.block_on(future))
}

pub(crate) fn run_ree_demand(args: ReeDemandArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    let client = ReeDataClient::with_host(HttpTransport::new()?, &config.host, config.language);
    block_on(fetch_demand(&config, &client))?.map(drop)
}

pub(crate) fn run_ree_generation(args: ReeGenerationArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    let client = ReeDemandaClient::with_host(HttpTransport::new()?, &config.host);
    block_on(fetch_generation(&config, &client))?.map(drop)
}

/// Retrieve the demand series of `config` and save it.
pub(crate) async fn fetch_demand<T: ReeTransport>(
    config: &ReeDemandConfig,
    client: &ReeDataClient<T>,
) -> Result<Utf8PathBuf, CliError> {
    let table = retrieve_demand(
        client,
        config.start,
        config.end,
        config.time_trunc,
        config.max_days,
    )
    .await?;
    Ok(save_series(
        &table,
        &config.output,
        DEMAND_PREFIX,
        &config.start,
        &config.end,
    )?)
}

/// Retrieve the generation series of `config` and save it.
pub(crate) async fn fetch_generation<T: ReeTransport>(
    config: &ReeGenerationConfig,
    client: &ReeDemandaClient<T>,
) -> Result<Utf8PathBuf, CliError> {
    let table = retrieve_generation(
        client,
        config.start.date(),
        config.end.date(),
        &config.geo_limit,
    )
    .await?;
    info!("retrieved {} generation rows", table.height());
    Ok(save_series(
        &table,
        &config.output,
        GENERATION_PREFIX,
        &config.start,
        &config.end,
    )?)
}

#[cfg(test)]
pub(crate) fn demand_config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ReeDemandConfig, CliError> {
    let merged = ReeDemandArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ReeDemandConfig::try_from(merged)
}
