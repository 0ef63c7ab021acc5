//! Bounding-box index over geometry rows.

use geo::{BoundingRect, Geometry, Rect};
use rstar::{AABB, RTree, RTreeObject};

/// Row of a geometry vector keyed by its bounding box.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexedRow {
    row: usize,
    envelope: AABB<[f64; 2]>,
}

impl IndexedRow {
    pub(crate) const fn row(&self) -> usize {
        self.row
    }
}

impl RTreeObject for IndexedRow {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn aabb(rect: Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

/// R\*-tree over the bounding boxes of a slice of geometries.
///
/// Empty geometries have no bounding box and are never returned.
#[derive(Debug)]
pub(crate) struct SpatialIndex {
    tree: RTree<IndexedRow>,
}

impl SpatialIndex {
    pub(crate) fn build(geometries: &[Geometry<f64>]) -> Self {
        let rows = geometries
            .iter()
            .enumerate()
            .filter_map(|(row, geometry)| {
                geometry.bounding_rect().map(|rect| IndexedRow {
                    row,
                    envelope: aabb(rect),
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(rows),
        }
    }

    /// Rows whose bounding boxes intersect the bounding box of `geometry`.
    pub(crate) fn candidates(&self, geometry: &Geometry<f64>) -> Vec<usize> {
        let Some(rect) = geometry.bounding_rect() else {
            return Vec::new();
        };
        let mut rows: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&aabb(rect))
            .map(IndexedRow::row)
            .collect();
        rows.sort_unstable();
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Point, polygon};
    use rstest::rstest;

    #[rstest]
    fn returns_rows_with_overlapping_boxes() {
        let geometries = vec![
            Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]),
            Geometry::Polygon(polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0)]),
        ];
        let index = SpatialIndex::build(&geometries);
        assert_eq!(
            index.candidates(&Geometry::Point(Point::new(5.5, 5.2))),
            vec![1]
        );
        assert!(index
            .candidates(&Geometry::Point(Point::new(3.0, 3.0)))
            .is_empty());
    }
}
