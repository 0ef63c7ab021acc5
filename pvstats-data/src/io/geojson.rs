//! GeoJSON adapter.

use std::io::Write;

use camino::Utf8Path;
use geo::{Geometry, GeometryCollection};
use geojson::{Feature, FeatureCollection, GeoJson};
use pvstats_core::GeoTable;

use super::json::{row_object, table_from_objects};
use super::{IoError, create, read_bytes};

fn geojson_error(path: &Utf8Path) -> impl Fn(geojson::Error) -> IoError + '_ {
    move |source| IoError::GeoJson {
        path: path.to_owned(),
        source: Box::new(source),
    }
}

fn features(path: &Utf8Path, document: GeoJson) -> Result<Vec<Feature>, IoError> {
    match document {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(feature) => Ok(vec![feature]),
        GeoJson::Geometry(_) => Err(IoError::layout(
            path,
            "expected a Feature or FeatureCollection, found a bare geometry",
        )),
    }
}

pub(super) fn read(path: &Utf8Path) -> Result<GeoTable, IoError> {
    let bytes = read_bytes(path)?;
    let text = String::from_utf8(bytes).map_err(|source| IoError::Decode {
        path: path.to_owned(),
        source,
    })?;
    let document: GeoJson = text.parse().map_err(geojson_error(path))?;
    let features = features(path, document)?;

    let empty = serde_json::Map::new();
    let attributes = table_from_objects(
        features
            .iter()
            .map(|feature| feature.properties.as_ref().unwrap_or(&empty)),
    )?;
    let geometries = features
        .into_iter()
        .map(|feature| {
            feature.geometry.map_or_else(
                || Ok(Geometry::GeometryCollection(GeometryCollection::default())),
                |geometry| Geometry::<f64>::try_from(geometry).map_err(geojson_error(path)),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(GeoTable::new(attributes, geometries)?)
}

pub(super) fn write(path: &Utf8Path, table: &GeoTable) -> Result<(), IoError> {
    let features = table
        .geometries()
        .iter()
        .enumerate()
        .map(|(row, geometry)| Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(geometry))),
            id: None,
            properties: Some(row_object(table.attributes(), row)),
            foreign_members: None,
        })
        .collect();
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    let mut file = create(path)?;
    file.write_all(collection.to_string().as_bytes())
        .and_then(|()| file.flush())
        .map_err(|source| IoError::Write {
            path: path.to_owned(),
            source,
        })
}
