//! Tables whose rows carry a geometry.
//!
//! A [`GeoTable`] pairs an attribute [`Table`] with one
//! [`geo::Geometry`] per row. Row operations keep both in lockstep; the
//! geometry vector is never exposed mutably so the two cannot drift apart.

use geo::{Area, BooleanOps, Geometry, GeometryCollection, MultiPolygon, Relate};
use log::debug;

use crate::{JoinSpec, Table, TableError, Value, spatial::SpatialIndex};

/// Attribute table plus one geometry per row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeoTable {
    attributes: Table,
    geometries: Vec<Geometry<f64>>,
    crs: Option<String>,
}

fn empty_geometry() -> Geometry<f64> {
    Geometry::GeometryCollection(GeometryCollection::default())
}

fn polygonal(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon.clone()])),
        Geometry::MultiPolygon(polygons) => Some(polygons.clone()),
        Geometry::Rect(rect) => Some(MultiPolygon::new(vec![rect.to_polygon()])),
        Geometry::Triangle(triangle) => Some(MultiPolygon::new(vec![triangle.to_polygon()])),
        _ => None,
    }
}

impl GeoTable {
    /// Pair `attributes` with `geometries`.
    ///
    /// # Errors
    ///
    /// Fails when the number of geometries differs from the number of rows.
    pub fn new(attributes: Table, geometries: Vec<Geometry<f64>>) -> Result<Self, TableError> {
        if attributes.width() == 0 && attributes.height() != geometries.len() {
            return Self::new(Table::with_height(geometries.len()), geometries);
        }
        if attributes.height() != geometries.len() {
            return Err(TableError::LengthMismatch {
                name: "geometry".to_owned(),
                expected: attributes.height(),
                found: geometries.len(),
            });
        }
        Ok(Self {
            attributes,
            geometries,
            crs: None,
        })
    }

    /// Attach a coordinate reference system label such as `EPSG:25830`.
    #[must_use]
    pub fn with_crs(mut self, crs: Option<String>) -> Self {
        self.crs = crs;
        self
    }

    /// Coordinate reference system label, when known.
    #[must_use]
    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    /// Attribute columns.
    #[must_use]
    pub const fn attributes(&self) -> &Table {
        &self.attributes
    }

    /// Apply `update` to the attribute columns.
    ///
    /// The row count must still match the geometries afterwards. Only a
    /// table without columns can change its row count, so on a mismatch the
    /// attributes go back to bare rows.
    ///
    /// # Errors
    ///
    /// Propagates the error of `update`, or fails with a length mismatch
    /// when `update` left a different number of rows.
    pub fn update_attributes<F>(&mut self, update: F) -> Result<(), TableError>
    where
        F: FnOnce(&mut Table) -> Result<(), TableError>,
    {
        let outcome = update(&mut self.attributes);
        let found = self.attributes.height();
        if found != self.geometries.len() {
            self.attributes = Table::with_height(self.geometries.len());
            return Err(TableError::LengthMismatch {
                name: "attributes".to_owned(),
                expected: self.geometries.len(),
                found,
            });
        }
        outcome
    }

    /// Geometries in row order.
    #[must_use]
    pub fn geometries(&self) -> &[Geometry<f64>] {
        &self.geometries
    }

    /// Split into attributes, geometries and CRS.
    #[must_use]
    pub fn into_parts(self) -> (Table, Vec<Geometry<f64>>, Option<String>) {
        (self.attributes, self.geometries, self.crs)
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.attributes.height()
    }

    /// Planar unsigned area of every geometry, in squared CRS units.
    #[must_use]
    pub fn areas(&self) -> Vec<f64> {
        self.geometries.iter().map(Area::unsigned_area).collect()
    }

    /// Append the area of every geometry as a float column.
    ///
    /// # Errors
    ///
    /// Fails when `name` already exists.
    pub fn push_area_column(&mut self, name: &str, scale: f64) -> Result<(), TableError> {
        let values = self
            .areas()
            .into_iter()
            .map(|area| Value::Float(area * scale))
            .collect();
        self.attributes.push_column(name, values)
    }

    fn find_row(&self, column: &str, value: &str) -> Result<usize, TableError> {
        self.attributes
            .column(column)?
            .iter()
            .position(|cell| cell.as_str() == Some(value))
            .ok_or_else(|| TableError::MissingRow {
                column: column.to_owned(),
                value: value.to_owned(),
            })
    }

    /// Fold the row whose `column` equals `remove` into the row equal to
    /// `keep`: the geometries are unioned and the `remove` row is dropped.
    ///
    /// Non-polygonal geometries are combined into a collection.
    ///
    /// # Errors
    ///
    /// Fails when `column` is missing or either row cannot be found.
    pub fn merge_geometries(
        &mut self,
        column: &str,
        keep: &str,
        remove: &str,
    ) -> Result<(), TableError> {
        let keep_row = self.find_row(column, keep)?;
        let remove_row = self.find_row(column, remove)?;
        let merged = {
            let kept = &self.geometries[keep_row];
            let removed = &self.geometries[remove_row];
            match (polygonal(kept), polygonal(removed)) {
                (Some(left), Some(right)) => Geometry::MultiPolygon(left.union(&right)),
                _ => Geometry::GeometryCollection(GeometryCollection::new_from(vec![
                    kept.clone(),
                    removed.clone(),
                ])),
            }
        };
        debug!("merged geometry of {remove} into {keep}");
        self.geometries[keep_row] = merged;
        let mask: Vec<bool> = (0..self.height()).map(|row| row != remove_row).collect();
        *self = self.filter(&mask)?;
        Ok(())
    }

    /// Rows whose geometry lies within `container`.
    #[must_use]
    pub fn within(&self, container: &Geometry<f64>) -> Vec<usize> {
        self.within_each(std::slice::from_ref(container))
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    /// [`within`](Self::within) for several containers sharing one index.
    #[must_use]
    pub fn within_each(&self, containers: &[Geometry<f64>]) -> Vec<Vec<usize>> {
        let index = SpatialIndex::build(&self.geometries);
        containers
            .iter()
            .map(|container| {
                index
                    .candidates(container)
                    .into_iter()
                    .filter(|row| self.geometries[*row].relate(container).is_within())
                    .collect()
            })
            .collect()
    }

    /// Rows for which `mask` is `true`.
    ///
    /// # Errors
    ///
    /// Fails when the mask length differs from the table height.
    pub fn filter(&self, mask: &[bool]) -> Result<Self, TableError> {
        let attributes = self.attributes.filter(mask)?;
        let geometries = self
            .geometries
            .iter()
            .zip(mask)
            .filter_map(|(geometry, keep)| keep.then(|| geometry.clone()))
            .collect();
        Ok(Self {
            attributes,
            geometries,
            crs: self.crs.clone(),
        })
    }

    /// Rows at `indices`, in that order.
    #[must_use]
    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            attributes: self.attributes.take(indices),
            geometries: indices
                .iter()
                .map(|row| self.geometries.get(*row).cloned().unwrap_or_else(empty_geometry))
                .collect(),
            crs: self.crs.clone(),
        }
    }

    /// Keep only the attribute columns `names`, in that order.
    ///
    /// # Errors
    ///
    /// Fails when any of the names is absent.
    pub fn select(&self, names: &[&str]) -> Result<Self, TableError> {
        Ok(Self {
            attributes: self.attributes.select(names)?,
            geometries: self.geometries.clone(),
            crs: self.crs.clone(),
        })
    }

    /// Join plain attributes onto this table, keeping the geometry of the
    /// geo side. Right-only rows of an outer join get an empty geometry.
    ///
    /// # Errors
    ///
    /// Fails when a key column is missing or the key lists differ in length.
    pub fn merge_table(&self, right: &Table, spec: &JoinSpec<'_>) -> Result<Self, TableError> {
        let pairs = self.attributes.join_pairs(right, spec)?;
        let attributes = self.attributes.assemble(right, spec, &pairs)?;
        let geometries = pairs
            .iter()
            .map(|(left_row, _)| {
                left_row
                    .and_then(|row| self.geometries.get(row).cloned())
                    .unwrap_or_else(empty_geometry)
            })
            .collect();
        Ok(Self {
            attributes,
            geometries,
            crs: self.crs.clone(),
        })
    }

    /// Stack geo tables vertically. The first known CRS is kept.
    #[must_use]
    pub fn concat(tables: &[Self]) -> Self {
        let attributes: Vec<Table> = tables.iter().map(|table| table.attributes.clone()).collect();
        Self {
            attributes: Table::concat(&attributes),
            geometries: tables
                .iter()
                .flat_map(|table| table.geometries.iter().cloned())
                .collect(),
            crs: tables.iter().find_map(|table| table.crs.clone()),
        }
    }
}
