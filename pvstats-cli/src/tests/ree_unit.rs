//! Configuration and execution of the REE download commands.

use super::helpers::{Workspace, workspace};
use super::*;
use crate::ree::{
    ARG_END, ARG_OUTPUT, ARG_START, ENV_DEMAND_END, ENV_DEMAND_OUTPUT, ENV_DEMAND_START,
    ReeDemandConfig, ReeGenerationConfig, demand_config_from_layers_for_test, fetch_demand,
    fetch_generation,
};
use pvstats_data::ree::test_support::{StubTransport, block_on_for_tests};
use pvstats_data::ree::{
    Language, ReeDataClient, ReeDemandaClient, ReeError, TimeTrunc, TransportError,
};
use rstest::rstest;
use serde_json::json;

fn demand_args() -> ReeDemandArgs {
    ReeDemandArgs {
        output: Some(Utf8PathBuf::from("data/raw")),
        start: Some("2022-01-01T00:00".to_owned()),
        end: Some("2022-03-01T00:00".to_owned()),
        ..ReeDemandArgs::default()
    }
}

fn demand_body(datetime: &str, value: f64) -> String {
    json!({"included": [{"attributes": {"title": "Demanda real", "values": [
        {"datetime": datetime, "value": value}
    ]}}]})
    .to_string()
}

#[rstest]
#[case::output(ARG_OUTPUT, ENV_DEMAND_OUTPUT)]
#[case::start(ARG_START, ENV_DEMAND_START)]
#[case::end(ARG_END, ENV_DEMAND_END)]
fn demand_requires_output_and_range(#[case] missing: &'static str, #[case] env_var: &'static str) {
    let mut args = demand_args();
    match missing {
        ARG_OUTPUT => args.output = None,
        ARG_START => args.start = None,
        _ => args.end = None,
    }
    match ReeDemandConfig::try_from(args).expect_err("missing argument") {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, missing);
            assert_eq!(env, env_var);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn demand_defaults_are_filled_in() {
    let config = ReeDemandConfig::try_from(demand_args()).expect("config");
    assert_eq!(config.time_trunc, TimeTrunc::Hour);
    assert_eq!(config.max_days, 31);
    assert_eq!(config.host, "apidatos.ree.es");
    assert_eq!(config.language, Language::Es);
    assert_eq!(config.start.to_string(), "2022-01-01T00:00");
}

#[rstest]
fn unsupported_languages_fall_back_to_spanish() {
    let args = ReeDemandArgs {
        language: Some("fr".to_owned()),
        ..demand_args()
    };
    let config = ReeDemandConfig::try_from(args).expect("config");
    assert_eq!(config.language, Language::Es);
}

#[rstest]
fn invalid_time_trunc_is_rejected() {
    let args = ReeDemandArgs {
        time_trunc: Some("week".to_owned()),
        ..demand_args()
    };
    let err = ReeDemandConfig::try_from(args).expect_err("invalid trunc");
    assert!(matches!(err, CliError::Ree(ReeError::InvalidTimeTrunc(_))));
}

#[rstest]
fn malformed_dates_are_rejected() {
    let args = ReeDemandArgs {
        start: Some("01/01/2022".to_owned()),
        ..demand_args()
    };
    let err = ReeDemandConfig::try_from(args).expect_err("invalid date");
    assert!(matches!(err, CliError::Ree(ReeError::InvalidDate { .. })));
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "max_days": "many" }));

    let err = demand_config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "output": "from-file",
            "max_days": 7,
            "host": "http://localhost:8080",
        }),
        None,
    );
    composer.push_environment(json!({
        "start": "2022-01-01",
        "output": "from-env",
    }));
    composer.push_cli(json!({
        "output": "from-cli",
        "end": "2022-01-15",
    }));

    let config =
        demand_config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.output, Utf8PathBuf::from("from-cli"));
    assert_eq!(config.start.to_string(), "2022-01-01T00:00");
    assert_eq!(config.end.to_string(), "2022-01-15T00:00");
    assert_eq!(config.max_days, 7);
    assert_eq!(config.host, "http://localhost:8080");
}

#[rstest]
fn demand_is_saved_under_a_folder(workspace: Workspace) {
    let config = ReeDemandConfig {
        output: workspace.root.clone(),
        ..ReeDemandConfig::try_from(demand_args()).expect("config")
    };
    let client = ReeDataClient::new(
        StubTransport::default()
            .with_body(demand_body("2022-01-01T00:00:00.000+01:00", 620_000.0))
            .with_body(demand_body("2022-02-01T00:00:00.000+01:00", 580_000.0)),
    );

    let path = block_on_for_tests(fetch_demand(&config, &client)).expect("demand saved");

    assert_eq!(path, workspace.root.join("ree_demand_20220101_20220301.csv"));
    assert_eq!(client.transport().requests().len(), 2);
    let contents = std::fs::read_to_string(&path).expect("read csv");
    assert!(contents.starts_with("datetime,Demanda real\n"));
    assert_eq!(contents.lines().count(), 3);
}

#[rstest]
fn http_failures_surface_as_ree_errors(workspace: Workspace) {
    let config = ReeDemandConfig {
        output: workspace.root.join("demand.csv"),
        ..ReeDemandConfig::try_from(demand_args()).expect("config")
    };
    let client = ReeDataClient::new(StubTransport::default().with_error(TransportError::Http {
        url: "https://apidatos.ree.es/es/datos/demanda/demanda-tiempo-real".to_owned(),
        status: 503,
        message: "Service Unavailable".to_owned(),
    }));

    let err = block_on_for_tests(fetch_demand(&config, &client)).expect_err("http failure");
    assert!(matches!(err, CliError::Ree(ReeError::Transport(_))));
    assert!(!pvstats_fs::file_is_file(&config.output).expect("inspect"));
}

#[rstest]
fn generation_is_requested_day_by_day(workspace: Workspace) {
    let args = ReeGenerationArgs {
        output: Some(workspace.root.join("generation.csv")),
        start: Some("2019-10-27".to_owned()),
        end: Some("2019-10-28".to_owned()),
        ..ReeGenerationArgs::default()
    };
    let config = ReeGenerationConfig::try_from(args).expect("config");
    assert_eq!(config.geo_limit, "NACIONAL");
    let body = |day: &str| {
        let payload = json!({"valoresHorariosGeneracion": [
            {"ts": format!("{day} 12:00"), "dem": 27000, "sol": 3100.5}
        ]});
        format!("angular.callbacks._0({payload});")
    };
    let client = ReeDemandaClient::new(
        StubTransport::default()
            .with_body(body("2019-10-27"))
            .with_body(body("2019-10-28")),
    );

    let path = block_on_for_tests(fetch_generation(&config, &client)).expect("generation saved");

    assert_eq!(path, workspace.root.join("generation.csv"));
    let requests = client.transport().requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].as_str().contains("fecha=2019-10-28"));
    let contents = std::fs::read_to_string(&path).expect("read csv");
    assert_eq!(contents.lines().count(), 3);
}
