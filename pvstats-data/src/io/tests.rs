use super::*;
use geo::{Geometry, LineString, Polygon};
use rstest::{fixture, rstest};
use tempfile::TempDir;

#[fixture]
fn workspace() -> (TempDir, Utf8PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
    (dir, root)
}

fn cities() -> Table {
    Table::from_columns(vec![
        (
            "municipio_codigo".to_owned(),
            vec![Value::Int(5), Value::Int(65)],
        ),
        (
            "municipio_nombre".to_owned(),
            vec![Value::from("Alcalá de Henares"), Value::from("Getafe")],
        ),
        (
            "superficie_km2".to_owned(),
            vec![Value::Float(87.7), Value::Null],
        ),
    ])
    .expect("cities table")
}

fn zones() -> GeoTable {
    let square = Geometry::Polygon(Polygon::new(
        LineString::from(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]),
        vec![],
    ));
    let attributes = Table::from_columns(vec![(
        "codigo".to_owned(),
        vec![Value::from("ZU-1")],
    )])
    .expect("attributes");
    GeoTable::new(attributes, vec![square])
        .expect("geo table")
        .with_crs(Some("EPSG:25830".to_owned()))
}

#[rstest]
#[case(TableFormat::Csv)]
#[case(TableFormat::Json)]
#[case(TableFormat::Parquet)]
fn saved_tables_read_back(workspace: (TempDir, Utf8PathBuf), #[case] format: TableFormat) {
    let (_guard, root) = workspace;
    let folder = root.join("processed");
    let path = save_table("cities_info", &cities(), &folder, format).expect("save");

    assert_eq!(path, folder.join(format!("cities_info.{format}")));
    let table = read_table(&path, &ReadOptions::default()).expect("read");
    assert_eq!(table, cities());
}

#[rstest]
#[case(GeoFormat::Parquet)]
#[case(GeoFormat::GeoJson)]
#[case(GeoFormat::GeoPackage)]
fn saved_geo_tables_read_back(workspace: (TempDir, Utf8PathBuf), #[case] format: GeoFormat) {
    let (_guard, root) = workspace;
    let path = save_geo_table("urban_zones", &zones(), &root, format).expect("save");

    let table = read_geo_table(&path, None).expect("read");
    assert_eq!(table.geometries(), zones().geometries());
    assert_eq!(table.attributes().get(0, "codigo"), Some(&Value::from("ZU-1")));
}

#[rstest]
fn geoparquet_and_geopackage_keep_the_crs(workspace: (TempDir, Utf8PathBuf)) {
    let (_guard, root) = workspace;
    for format in [GeoFormat::Parquet, GeoFormat::GeoPackage] {
        let path = save_geo_table("zones", &zones(), &root, format).expect("save");
        let table = read_geo_table(&path, None).expect("read");
        assert_eq!(table.crs(), Some("EPSG:25830"), "{format}");
    }
}

#[rstest]
#[case("cities.txt")]
#[case("cities")]
fn unknown_table_extensions_are_rejected(#[case] name: &str) {
    let err = read_table(Utf8Path::new(name), &ReadOptions::default()).expect_err("unsupported");
    assert!(matches!(err, IoError::UnsupportedFormat { .. }));
}

#[rstest]
fn shapefiles_cannot_be_written(workspace: (TempDir, Utf8PathBuf)) {
    let (_guard, root) = workspace;
    let err = write_geo_table(&root.join("zones.shp"), &zones()).expect_err("read-only format");
    assert!(matches!(err, IoError::UnsupportedFormat { format, .. } if format == "shp"));
}

#[rstest]
fn missing_inputs_report_the_path(workspace: (TempDir, Utf8PathBuf)) {
    let (_guard, root) = workspace;
    let missing = root.join("absent.csv");
    let err = read_table(&missing, &ReadOptions::default()).expect_err("missing file");
    assert!(matches!(&err, IoError::Read { path, .. } if *path == missing));
}

#[rstest]
fn latin1_csv_with_semicolons(workspace: (TempDir, Utf8PathBuf)) {
    let (_guard, root) = workspace;
    let path = root.join("municipios.csv");
    std::fs::write(&path, b"municipio_codigo;municipio_nombre\n5;Alcal\xe1 de Henares\n")
        .expect("write fixture");
    let options = ReadOptions::default().with_csv(
        CsvOptions::default()
            .with_delimiter(b';')
            .with_encoding(Encoding::Latin1),
    );
    let table = read_table(&path, &options).expect("read");
    assert_eq!(
        table.get(0, "municipio_nombre"),
        Some(&Value::from("Alcalá de Henares"))
    );
}

#[rstest]
#[case("PARQUET", Ok(TableFormat::Parquet))]
#[case(" csv ", Ok(TableFormat::Csv))]
#[case("xlsx", Err(UnknownFormat("xlsx".to_owned())))]
fn table_formats_parse(#[case] raw: &str, #[case] expected: Result<TableFormat, UnknownFormat>) {
    assert_eq!(raw.parse::<TableFormat>(), expected);
}

#[rstest]
#[case("gpkg", GeoFormat::GeoPackage)]
#[case("GeoPackage", GeoFormat::GeoPackage)]
#[case("geojson", GeoFormat::GeoJson)]
fn geo_formats_parse(#[case] raw: &str, #[case] expected: GeoFormat) {
    assert_eq!(raw.parse::<GeoFormat>(), Ok(expected));
}

#[rstest]
#[case(vec![Value::Int(1), Value::Float(2.5)], ColumnKind::Float)]
#[case(vec![Value::Int(1), Value::Null], ColumnKind::Int)]
#[case(vec![Value::Int(1), Value::from("a")], ColumnKind::Text)]
#[case(vec![Value::Null], ColumnKind::Text)]
fn column_kinds_widen(#[case] values: Vec<Value>, #[case] expected: ColumnKind) {
    assert_eq!(ColumnKind::infer(&values), expected);
}
