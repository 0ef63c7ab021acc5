//! Command-line parsing of the subcommands and global options.

use super::*;
use rstest::rstest;

fn parse(argv: &[&str]) -> Cli {
    Cli::try_parse_from(argv).expect("arguments should parse")
}

#[rstest]
fn ree_demand_takes_positional_range() {
    let cli = parse(&[
        "pvstats",
        "ree-demand",
        "data/raw",
        "2022-01-01T00:00",
        "2022-03-01T00:00",
        "--time-trunc",
        "day",
    ]);
    match cli.command {
        Command::ReeDemand(args) => {
            assert_eq!(args.output, Some(Utf8PathBuf::from("data/raw")));
            assert_eq!(args.start.as_deref(), Some("2022-01-01T00:00"));
            assert_eq!(args.end.as_deref(), Some("2022-03-01T00:00"));
            assert_eq!(args.time_trunc.as_deref(), Some("day"));
            assert_eq!(args.max_days, None);
        }
        other => panic!("expected ree-demand, found {other:?}"),
    }
}

#[rstest]
#[case(&["pvstats", "coverage"], LevelFilter::Info)]
#[case(&["pvstats", "--log-level", "debug", "coverage"], LevelFilter::Debug)]
#[case(&["pvstats", "coverage", "--log-level", "WARN"], LevelFilter::Warn)]
fn log_level_is_global(#[case] argv: &[&str], #[case] expected: LevelFilter) {
    let cli = parse(argv);
    assert_eq!(cli.log_level, expected);
    assert!(cli.log_file.is_none());
}

#[rstest]
fn log_file_is_accepted_after_the_subcommand() {
    let cli = parse(&["pvstats", "remap-categories", "--log-file", "logs/pvstats.log"]);
    assert_eq!(cli.log_file, Some(Utf8PathBuf::from("logs/pvstats.log")));
}

#[rstest]
fn land_use_ids_split_on_commas() {
    let cli = parse(&[
        "pvstats",
        "land-use",
        "usos.gpkg",
        "--urban-ids",
        "111,112",
        "--service-ids",
        "131",
    ]);
    match cli.command {
        Command::LandUse(args) => {
            assert_eq!(args.urban_ids, vec![111, 112]);
            assert_eq!(args.service_ids, vec![131]);
            assert!(args.industrial_ids.is_empty());
        }
        other => panic!("expected land-use, found {other:?}"),
    }
}

#[rstest]
fn pv_installations_collects_every_layer() {
    let cli = parse(&[
        "pvstats",
        "pv-installations",
        "alcorcon.shp",
        "rodrigo.shp",
        "--mapping",
        "categorias.json",
        "--save-to",
        "pv.geojson",
    ]);
    match cli.command {
        Command::PvInstallations(args) => {
            assert_eq!(
                args.installations,
                vec![
                    Utf8PathBuf::from("alcorcon.shp"),
                    Utf8PathBuf::from("rodrigo.shp")
                ]
            );
            assert_eq!(args.mapping, Some(Utf8PathBuf::from("categorias.json")));
        }
        other => panic!("expected pv-installations, found {other:?}"),
    }
}

#[rstest]
#[case(&["pvstats"])]
#[case(&["pvstats", "solve"])]
#[case(&["pvstats", "coverage", "--log-level", "loud"])]
fn invalid_invocations_are_rejected(#[case] argv: &[&str]) {
    assert!(Cli::try_parse_from(argv).is_err());
}
