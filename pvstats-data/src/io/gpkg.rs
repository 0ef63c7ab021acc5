//! OGC GeoPackage adapter backed by SQLite.
//!
//! Each written file holds a single feature layer named after the file stem,
//! with a `fid` primary key and a `geom` column of GeoPackage binary
//! geometries.

use camino::Utf8Path;
use geo::{BoundingRect, Geometry, GeometryCollection, Rect};
use log::warn;
use pvstats_core::{GeoTable, Table, Value, wkb};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params, params_from_iter};

use super::{ColumnKind, IoError};

const APPLICATION_ID: i64 = 0x4750_4B47;
const USER_VERSION: i64 = 10_300;
const GEOMETRY_COLUMN: &str = "geom";
const ID_COLUMN: &str = "fid";
const UNDEFINED_SRS: i32 = -1;
const CUSTOM_SRS: i32 = 100_000;

const CORE_TABLES: &str = "
CREATE TABLE gpkg_spatial_ref_sys (
    srs_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL PRIMARY KEY,
    organization TEXT NOT NULL,
    organization_coordsys_id INTEGER NOT NULL,
    definition TEXT NOT NULL,
    description TEXT
);
CREATE TABLE gpkg_contents (
    table_name TEXT NOT NULL PRIMARY KEY,
    data_type TEXT NOT NULL,
    identifier TEXT UNIQUE,
    description TEXT DEFAULT '',
    last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    min_x DOUBLE,
    min_y DOUBLE,
    max_x DOUBLE,
    max_y DOUBLE,
    srs_id INTEGER,
    CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
CREATE TABLE gpkg_geometry_columns (
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    geometry_type_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL,
    z TINYINT NOT NULL,
    m TINYINT NOT NULL,
    CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
    CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
    CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
INSERT INTO gpkg_spatial_ref_sys VALUES
    ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined', 'undefined cartesian coordinate reference system'),
    ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined', 'undefined geographic coordinate reference system'),
    ('WGS 84 geodetic', 4326, 'EPSG', 4326,
     'GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563]],PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]]',
     'longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid');
";

fn sqlite_error(path: &Utf8Path) -> impl Fn(rusqlite::Error) -> IoError + '_ {
    move |source| IoError::GeoPackage {
        path: path.to_owned(),
        source,
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

// Reading

struct LayerColumn {
    name: String,
    boolean: bool,
}

fn default_layer(path: &Utf8Path, connection: &Connection) -> Result<String, IoError> {
    let layer: Option<String> = connection
        .query_row(
            "SELECT table_name FROM gpkg_contents WHERE data_type = 'features' ORDER BY rowid LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(sqlite_error(path))?;
    let layer = layer.ok_or_else(|| IoError::layout(path, "GeoPackage has no feature layers"))?;
    warn!("no layer given for {path}; reading `{layer}`");
    Ok(layer)
}

fn layer_crs(path: &Utf8Path, connection: &Connection, srs_id: i32) -> Result<Option<String>, IoError> {
    let entry: Option<(String, i64, String)> = connection
        .query_row(
            "SELECT organization, organization_coordsys_id, definition FROM gpkg_spatial_ref_sys WHERE srs_id = ?1",
            params![srs_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()
        .map_err(sqlite_error(path))?;
    Ok(entry.and_then(|(organization, code, definition)| {
        if !organization.eq_ignore_ascii_case("none") {
            Some(format!("{}:{code}", organization.to_ascii_uppercase()))
        } else if definition != "undefined" {
            Some(definition)
        } else {
            None
        }
    }))
}

fn layer_columns(
    path: &Utf8Path,
    connection: &Connection,
    layer: &str,
    geometry_column: &str,
) -> Result<Vec<LayerColumn>, IoError> {
    let mut statement = connection
        .prepare(&format!("PRAGMA table_info({})", quote(layer)))
        .map_err(sqlite_error(path))?;
    let rows = statement
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(5)?,
            ))
        })
        .map_err(sqlite_error(path))?;
    let mut columns = Vec::new();
    for row in rows {
        let (name, declared, primary_key) = row.map_err(sqlite_error(path))?;
        if primary_key != 0 || name == geometry_column {
            continue;
        }
        columns.push(LayerColumn {
            name,
            boolean: declared.eq_ignore_ascii_case("BOOLEAN"),
        });
    }
    Ok(columns)
}

fn sql_cell(value: ValueRef<'_>, boolean: bool) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(int) if boolean => Value::Bool(int != 0),
        ValueRef::Integer(int) => Value::Int(int),
        ValueRef::Real(float) => Value::Float(float),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Strip the GeoPackage binary header, returning the WKB payload.
///
/// Blobs without the `GP` magic are assumed to be plain WKB.
fn wkb_payload<'a>(path: &Utf8Path, row: usize, blob: &'a [u8]) -> Result<&'a [u8], IoError> {
    if blob.get(..2) != Some(b"GP".as_slice()) {
        return Ok(blob);
    }
    let flags = blob
        .get(3)
        .copied()
        .ok_or_else(|| IoError::layout(path, format!("truncated geometry header in row {row}")))?;
    let envelope = match (flags >> 1) & 0b111 {
        0 => 0,
        1 => 32,
        2 | 3 => 48,
        4 => 64,
        code => {
            return Err(IoError::layout(
                path,
                format!("invalid envelope code {code} in row {row}"),
            ));
        }
    };
    blob.get(8 + envelope..)
        .ok_or_else(|| IoError::layout(path, format!("truncated geometry header in row {row}")))
}

fn decode_geometry(path: &Utf8Path, row: usize, blob: Option<&[u8]>) -> Result<Geometry<f64>, IoError> {
    let Some(blob) = blob else {
        return Ok(Geometry::GeometryCollection(GeometryCollection::default()));
    };
    let payload = wkb_payload(path, row, blob)?;
    wkb::decode(payload).map_err(|source| IoError::Geometry {
        path: path.to_owned(),
        row,
        source,
    })
}

pub(super) fn read(path: &Utf8Path, layer: Option<&str>) -> Result<GeoTable, IoError> {
    let connection = Connection::open_with_flags(
        path.as_std_path(),
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(sqlite_error(path))?;
    let layer = match layer {
        Some(layer) => layer.to_owned(),
        None => default_layer(path, &connection)?,
    };
    let (geometry_column, srs_id): (String, i32) = connection
        .query_row(
            "SELECT column_name, srs_id FROM gpkg_geometry_columns WHERE table_name = ?1",
            params![layer],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(sqlite_error(path))?
        .ok_or_else(|| IoError::layout(path, format!("layer `{layer}` not found")))?;
    let crs = layer_crs(path, &connection, srs_id)?;
    let columns = layer_columns(path, &connection, &layer, &geometry_column)?;

    let selected: Vec<String> = std::iter::once(quote(&geometry_column))
        .chain(columns.iter().map(|column| quote(&column.name)))
        .collect();
    let mut statement = connection
        .prepare(&format!(
            "SELECT {} FROM {}",
            selected.join(", "),
            quote(&layer)
        ))
        .map_err(sqlite_error(path))?;
    let mut rows = statement.query([]).map_err(sqlite_error(path))?;

    let mut geometries = Vec::new();
    let mut cells = Vec::new();
    while let Some(row) = rows.next().map_err(sqlite_error(path))? {
        let blob: Option<Vec<u8>> = row.get(0).map_err(sqlite_error(path))?;
        geometries.push(decode_geometry(path, geometries.len(), blob.as_deref())?);
        let mut record = Vec::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            let value = row.get_ref(index + 1).map_err(sqlite_error(path))?;
            record.push(sql_cell(value, column.boolean));
        }
        cells.push(record);
    }

    let header = columns.into_iter().map(|column| column.name).collect();
    let attributes = Table::from_rows(header, cells)?;
    Ok(GeoTable::new(attributes, geometries)?.with_crs(crs))
}

// Writing

struct SpatialRef {
    srs_id: i32,
    organization: String,
    code: i32,
    definition: String,
}

fn spatial_ref(crs: Option<&str>) -> Option<SpatialRef> {
    let crs = crs?;
    let parsed = crs
        .split_once(':')
        .and_then(|(authority, code)| Some((authority, code.trim().parse::<i32>().ok()?)));
    Some(match parsed {
        Some((authority, code)) if code > 0 => SpatialRef {
            srs_id: code,
            organization: authority.trim().to_ascii_uppercase(),
            code,
            definition: "undefined".to_owned(),
        },
        _ => SpatialRef {
            srs_id: CUSTOM_SRS,
            organization: "NONE".to_owned(),
            code: CUSTOM_SRS,
            definition: crs.to_owned(),
        },
    })
}

const fn sql_type(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Int => "INTEGER",
        ColumnKind::Float => "REAL",
        ColumnKind::Bool => "BOOLEAN",
        ColumnKind::Text => "TEXT",
    }
}

fn sql_value(value: &Value, kind: ColumnKind) -> SqlValue {
    match (value, kind) {
        (Value::Null, _) => SqlValue::Null,
        (Value::Bool(flag), ColumnKind::Bool) => SqlValue::Integer(i64::from(*flag)),
        (Value::Int(int), ColumnKind::Int) => SqlValue::Integer(*int),
        (Value::Float(float), ColumnKind::Float) if !float.is_finite() => SqlValue::Null,
        (Value::Int(_) | Value::Float(_), ColumnKind::Float) => {
            value.as_f64().map_or(SqlValue::Null, SqlValue::Real)
        }
        (other, _) => SqlValue::Text(other.to_string()),
    }
}

fn geometry_blob(srs_id: i32, geometry: &Geometry<f64>) -> Vec<u8> {
    let payload = wkb::encode(geometry);
    // Little-endian header without an envelope; bit 4 flags empty geometries.
    let flags = if geometry.bounding_rect().is_none() { 0x11 } else { 0x01 };
    let mut blob = Vec::with_capacity(8 + payload.len());
    blob.extend_from_slice(b"GP");
    blob.push(0);
    blob.push(flags);
    blob.extend_from_slice(&srs_id.to_le_bytes());
    blob.extend(payload);
    blob
}

fn extent(geometries: &[Geometry<f64>]) -> Option<Rect<f64>> {
    geometries
        .iter()
        .filter_map(|geometry| geometry.bounding_rect())
        .reduce(|acc, rect| {
            Rect::new(
                (acc.min().x.min(rect.min().x), acc.min().y.min(rect.min().y)),
                (acc.max().x.max(rect.max().x), acc.max().y.max(rect.max().y)),
            )
        })
}

pub(super) fn write(path: &Utf8Path, table: &GeoTable) -> Result<(), IoError> {
    let layer = path
        .file_stem()
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| IoError::layout(path, "GeoPackage path needs a file name"))?;
    let attributes = table.attributes();
    if let Some(clash) = attributes
        .column_names()
        .into_iter()
        .find(|name| name.eq_ignore_ascii_case(ID_COLUMN) || name.eq_ignore_ascii_case(GEOMETRY_COLUMN))
    {
        return Err(IoError::layout(
            path,
            format!("column `{clash}` collides with a reserved GeoPackage column"),
        ));
    }
    let kinds: Vec<ColumnKind> = attributes
        .columns()
        .iter()
        .map(|column| ColumnKind::infer(column.values()))
        .collect();

    let write_error = |source| IoError::Write {
        path: path.to_owned(),
        source,
    };
    pvstats_fs::remove_file_if_exists(path).map_err(write_error)?;
    pvstats_fs::ensure_parent_dir(path).map_err(write_error)?;

    let mut connection = Connection::open(path.as_std_path()).map_err(sqlite_error(path))?;
    connection
        .execute_batch(&format!(
            "PRAGMA application_id = {APPLICATION_ID}; PRAGMA user_version = {USER_VERSION};"
        ))
        .map_err(sqlite_error(path))?;

    let transaction = connection.transaction().map_err(sqlite_error(path))?;
    transaction
        .execute_batch(CORE_TABLES)
        .map_err(sqlite_error(path))?;

    let srs_id = match spatial_ref(table.crs()) {
        Some(srs) => {
            transaction
                .execute(
                    "INSERT OR IGNORE INTO gpkg_spatial_ref_sys \
                     (srs_name, srs_id, organization, organization_coordsys_id, definition) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        table.crs().unwrap_or_default(),
                        srs.srs_id,
                        srs.organization,
                        srs.code,
                        srs.definition
                    ],
                )
                .map_err(sqlite_error(path))?;
            srs.srs_id
        }
        None => UNDEFINED_SRS,
    };

    let bounds = extent(table.geometries());
    transaction
        .execute(
            "INSERT INTO gpkg_contents \
             (table_name, data_type, identifier, min_x, min_y, max_x, max_y, srs_id) \
             VALUES (?1, 'features', ?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                layer,
                bounds.map(|rect| rect.min().x),
                bounds.map(|rect| rect.min().y),
                bounds.map(|rect| rect.max().x),
                bounds.map(|rect| rect.max().y),
                srs_id
            ],
        )
        .map_err(sqlite_error(path))?;
    transaction
        .execute(
            "INSERT INTO gpkg_geometry_columns VALUES (?1, ?2, 'GEOMETRY', ?3, 0, 0)",
            params![layer, GEOMETRY_COLUMN, srs_id],
        )
        .map_err(sqlite_error(path))?;

    let definitions: Vec<String> = attributes
        .columns()
        .iter()
        .zip(&kinds)
        .map(|(column, kind)| format!("{} {}", quote(column.name()), sql_type(*kind)))
        .collect();
    let mut create = format!(
        "CREATE TABLE {} ({ID_COLUMN} INTEGER PRIMARY KEY AUTOINCREMENT, {GEOMETRY_COLUMN} BLOB",
        quote(layer)
    );
    for definition in &definitions {
        create.push_str(", ");
        create.push_str(definition);
    }
    create.push(')');
    transaction
        .execute_batch(&create)
        .map_err(sqlite_error(path))?;

    {
        let names: Vec<String> = std::iter::once(GEOMETRY_COLUMN.to_owned())
            .chain(attributes.columns().iter().map(|column| quote(column.name())))
            .collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|index| format!("?{index}")).collect();
        let mut insert = transaction
            .prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(layer),
                names.join(", "),
                placeholders.join(", ")
            ))
            .map_err(sqlite_error(path))?;
        for (row, geometry) in table.geometries().iter().enumerate() {
            let values = std::iter::once(SqlValue::Blob(geometry_blob(srs_id, geometry))).chain(
                attributes
                    .columns()
                    .iter()
                    .zip(&kinds)
                    .map(|(column, kind)| {
                        column
                            .values()
                            .get(row)
                            .map_or(SqlValue::Null, |value| sql_value(value, *kind))
                    }),
            );
            insert
                .execute(params_from_iter(values))
                .map_err(sqlite_error(path))?;
        }
    }
    transaction.commit().map_err(sqlite_error(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use geo::{LineString, Polygon};
    use rstest::rstest;

    fn square(offset: f64) -> Geometry<f64> {
        Geometry::Polygon(Polygon::new(
            LineString::from(vec![
                (offset, 0.0),
                (offset + 1.0, 0.0),
                (offset + 1.0, 1.0),
                (offset, 1.0),
                (offset, 0.0),
            ]),
            vec![],
        ))
    }

    #[rstest]
    #[case(0b0000_0001, 8)]
    #[case(0b0000_0011, 40)]
    #[case(0b0000_0101, 56)]
    #[case(0b0000_1001, 72)]
    fn header_length_follows_envelope_code(#[case] flags: u8, #[case] header: usize) {
        let mut blob = vec![b'G', b'P', 0, flags];
        blob.resize(header, 0);
        blob.push(0xAB);
        let payload = wkb_payload(Utf8Path::new("pv.gpkg"), 0, &blob).expect("payload");
        assert_eq!(payload, [0xAB]);
    }

    #[rstest]
    fn invalid_envelope_codes_are_rejected() {
        let blob = [b'G', b'P', 0, 0b0000_1011, 0, 0, 0, 0];
        assert!(matches!(
            wkb_payload(Utf8Path::new("pv.gpkg"), 2, &blob),
            Err(IoError::Layout { .. })
        ));
    }

    #[rstest]
    #[case(Some("EPSG:25830"), Some(25830))]
    #[case(Some("not a code"), Some(CUSTOM_SRS))]
    #[case(None, None)]
    fn spatial_refs_follow_authority_codes(#[case] crs: Option<&str>, #[case] expected: Option<i32>) {
        assert_eq!(spatial_ref(crs).map(|srs| srs.srs_id), expected);
    }

    #[rstest]
    fn writes_and_reads_layers() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("pv_installations.gpkg"))
            .expect("utf-8 path");
        let attributes = Table::from_columns(vec![
            (
                "categoria".to_owned(),
                vec![Value::from("EXT"), Value::from("INT")],
            ),
            ("area".to_owned(), vec![Value::Float(1.0), Value::Null]),
            ("validado".to_owned(), vec![Value::Bool(true), Value::Bool(false)]),
        ])
        .expect("attributes");
        let table = GeoTable::new(attributes, vec![square(0.0), square(5.0)])
            .expect("geo table")
            .with_crs(Some("EPSG:25830".to_owned()));

        write(&path, &table).expect("write");
        // Overwriting replaces the previous file.
        write(&path, &table).expect("overwrite");
        let read_back = read(&path, None).expect("read");

        assert_eq!(read_back.crs(), Some("EPSG:25830"));
        assert_eq!(read_back.geometries(), table.geometries());
        assert_eq!(
            read_back.attributes().column_names(),
            vec!["categoria", "area", "validado"]
        );
        assert_eq!(read_back.attributes().get(1, "area"), Some(&Value::Null));
        assert_eq!(
            read_back.attributes().get(0, "validado"),
            Some(&Value::Bool(true))
        );
    }

    #[rstest]
    fn unknown_layers_are_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("zones.gpkg")).expect("utf-8 path");
        let table = GeoTable::new(Table::empty(), vec![square(0.0)]).expect("geo table");
        write(&path, &table).expect("write");
        assert!(matches!(
            read(&path, Some("missing")),
            Err(IoError::Layout { .. })
        ));
    }
}
