//! Behaviour-driven step definitions driving the ree-demand CLI scenarios.

use super::*;
use crate::ree::{ReeDemandConfig, fetch_demand};
use pvstats_data::ree::test_support::{StubTransport, block_on_for_tests};
use pvstats_data::ree::{ReeDataClient, ReeError};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::json;
use std::cell::RefCell;
use tempfile::TempDir;

struct ReeWorld {
    _tmp: TempDir,
    output_dir: Utf8PathBuf,
    cli_args: RefCell<Vec<String>>,
    client: RefCell<Option<ReeDataClient<StubTransport>>>,
    result: RefCell<Option<Result<Utf8PathBuf, CliError>>>,
}

impl ReeWorld {
    fn new() -> Self {
        let tmp = TempDir::new().expect("tempdir");
        let output_dir =
            Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf-8 workspace");
        Self {
            _tmp: tmp,
            output_dir,
            cli_args: RefCell::new(Vec::new()),
            client: RefCell::new(None),
            result: RefCell::new(None),
        }
    }

    fn build_command_line(&self, start: &str, end: &str) -> Vec<String> {
        let mut argv = vec![
            "pvstats".to_owned(),
            "ree-demand".to_owned(),
            self.output_dir.as_str().to_owned(),
            start.to_owned(),
            end.to_owned(),
        ];
        argv.extend(self.cli_args.borrow().iter().cloned());
        argv
    }

    fn request_count(&self) -> usize {
        self.client
            .borrow()
            .as_ref()
            .map_or(0, |client| client.transport().requests().len())
    }
}

#[fixture]
fn world() -> ReeWorld {
    ReeWorld::new()
}

fn demand_body(datetime: &str, value: f64) -> String {
    json!({"included": [{"attributes": {"title": "Demanda real", "values": [
        {"datetime": datetime, "value": value}
    ]}}]})
    .to_string()
}

#[given("the data API answers two monthly windows")]
fn api_answers_two_windows(#[from(world)] world: &ReeWorld) {
    let transport = StubTransport::default()
        .with_body(demand_body("2022-01-01T00:00:00.000+01:00", 620_000.0))
        .with_body(demand_body("2022-02-01T00:00:00.000+01:00", 580_000.0));
    world.client.replace(Some(ReeDataClient::new(transport)));
}

#[given("I pass \"{flag}\" \"{value}\"")]
fn pass_extra_argument(#[from(world)] world: &ReeWorld, flag: String, value: String) {
    world.cli_args.borrow_mut().extend([flag, value]);
}

#[when("I run ree-demand from {start} to {end}")]
fn run_ree_demand_command(#[from(world)] world: &ReeWorld, start: String, end: String) {
    let invocation = world.build_command_line(&start, &end);
    let parsed = Cli::try_parse_from(invocation).map_err(CliError::from);
    let outcome = parsed.and_then(|cli| match cli.command {
        Command::ReeDemand(args) => {
            let config = ReeDemandConfig::try_from(args)?;
            let borrowed = world.client.borrow();
            let client = borrowed.as_ref().expect("client should be configured");
            block_on_for_tests(fetch_demand(&config, client))
        }
        other => panic!("expected ree-demand command, found {other:?}"),
    });
    world.result.replace(Some(outcome));
}

#[then("the command writes {file_name}")]
fn command_writes_file(#[from(world)] world: &ReeWorld, file_name: String) {
    let borrowed = world.result.borrow();
    let path = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect("expected success");
    assert_eq!(*path, world.output_dir.join(file_name));
    assert!(pvstats_fs::file_is_file(path).expect("inspect output"));
}

#[then("the saved file holds {rows} rows")]
fn saved_file_rows(#[from(world)] world: &ReeWorld, rows: usize) {
    let borrowed = world.result.borrow();
    let path = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect("expected success");
    let contents = std::fs::read_to_string(path).expect("read output");
    assert_eq!(contents.lines().count(), rows + 1);
    assert_eq!(world.request_count(), rows);
}

#[then("the command fails because the time aggregation is invalid")]
fn command_fails_invalid_trunc(#[from(world)] world: &ReeWorld) {
    let borrowed = world.result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::Ree(ReeError::InvalidTimeTrunc(raw)) => assert_eq!(raw, "week"),
        other => panic!("expected InvalidTimeTrunc, found {other:?}"),
    }
}

#[then("the command fails because the range is invalid")]
fn command_fails_invalid_range(#[from(world)] world: &ReeWorld) {
    let borrowed = world.result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::Ree(ReeError::InvalidRange { .. }) => {}
        other => panic!("expected InvalidRange, found {other:?}"),
    }
}

#[then("no request reached the data API")]
fn no_request_issued(#[from(world)] world: &ReeWorld) {
    assert_eq!(world.request_count(), 0);
}

macro_rules! register_ree_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/ree_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: ReeWorld) {
            let _ = world;
        }
    };
}

register_ree_scenario!(ree_demand_saved, "saving demand into an output folder");
register_ree_scenario!(ree_demand_invalid_trunc, "rejecting an unknown time aggregation");
register_ree_scenario!(ree_demand_reversed_range, "rejecting a reversed range");
