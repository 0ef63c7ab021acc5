//! Well-known binary (WKB) geometry codec.
//!
//! GeoParquet and GeoPackage both store geometries as OGC WKB. The decoder
//! accepts either byte order, ISO (`1003`, `3006`, ...) and EWKB
//! (high-bit flags) dimension markers; Z and M ordinates are read and
//! discarded. The encoder always emits little-endian 2D WKB.

use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use thiserror::Error;

const WKB_POINT: u32 = 1;
const WKB_LINE_STRING: u32 = 2;
const WKB_POLYGON: u32 = 3;
const WKB_MULTI_POINT: u32 = 4;
const WKB_MULTI_LINE_STRING: u32 = 5;
const WKB_MULTI_POLYGON: u32 = 6;
const WKB_GEOMETRY_COLLECTION: u32 = 7;

const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;

/// Errors raised while decoding WKB.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WkbError {
    /// The buffer ended before the geometry was complete.
    #[error("unexpected end of WKB data at byte {offset}")]
    UnexpectedEof {
        /// Offset at which more data was needed.
        offset: usize,
    },
    /// The byte-order marker was neither `0` nor `1`.
    #[error("invalid WKB byte order marker {0}")]
    InvalidByteOrder(u8),
    /// The geometry type code is not supported.
    #[error("unsupported WKB geometry type {0}")]
    UnsupportedType(u32),
}

/// Decode a single WKB geometry.
///
/// # Errors
///
/// Fails on truncated buffers, unknown byte-order markers or unsupported
/// geometry types.
pub fn decode(bytes: &[u8]) -> Result<Geometry<f64>, WkbError> {
    let mut reader = Reader { bytes, offset: 0 };
    reader.geometry()
}

/// Encode a geometry as little-endian 2D WKB.
///
/// `Line`, `Rect` and `Triangle` are written as their line string or polygon
/// equivalents.
#[must_use]
pub fn encode(geometry: &Geometry<f64>) -> Vec<u8> {
    let mut buffer = Vec::new();
    write_geometry(&mut buffer, geometry);
    buffer
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

#[derive(Clone, Copy)]
struct Header {
    little_endian: bool,
    dimensions: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], WkbError> {
        let end = self.offset + N;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or(WkbError::UnexpectedEof {
                offset: self.offset,
            })?;
        let mut array = [0_u8; N];
        array.copy_from_slice(slice);
        self.offset = end;
        Ok(array)
    }

    fn u32(&mut self, header: Header) -> Result<u32, WkbError> {
        let raw = self.take::<4>()?;
        Ok(if header.little_endian {
            u32::from_le_bytes(raw)
        } else {
            u32::from_be_bytes(raw)
        })
    }

    fn f64(&mut self, header: Header) -> Result<f64, WkbError> {
        let raw = self.take::<8>()?;
        Ok(if header.little_endian {
            f64::from_le_bytes(raw)
        } else {
            f64::from_be_bytes(raw)
        })
    }

    fn count(&mut self, header: Header) -> Result<usize, WkbError> {
        let count = self.u32(header)?;
        usize::try_from(count).map_err(|_| WkbError::UnexpectedEof {
            offset: self.offset,
        })
    }

    fn header(&mut self) -> Result<(Header, u32), WkbError> {
        let [order] = self.take::<1>()?;
        let little_endian = match order {
            0 => false,
            1 => true,
            other => return Err(WkbError::InvalidByteOrder(other)),
        };
        let mut header = Header {
            little_endian,
            dimensions: 2,
        };
        let raw = self.u32(header)?;
        let mut code = raw & 0x0FFF_FFFF;
        if raw & EWKB_Z != 0 {
            header.dimensions += 1;
        }
        if raw & EWKB_M != 0 {
            header.dimensions += 1;
        }
        if raw & EWKB_SRID != 0 {
            self.u32(header)?;
        }
        let iso = code / 1000;
        code %= 1000;
        header.dimensions += match iso {
            1 | 2 => 1,
            3 => 2,
            _ => 0,
        };
        Ok((header, code))
    }

    fn coord(&mut self, header: Header) -> Result<Coord<f64>, WkbError> {
        let x = self.f64(header)?;
        let y = self.f64(header)?;
        for _ in 2..header.dimensions {
            self.f64(header)?;
        }
        Ok(Coord { x, y })
    }

    fn coords(&mut self, header: Header) -> Result<LineString<f64>, WkbError> {
        let count = self.count(header)?;
        let coords = (0..count)
            .map(|_| self.coord(header))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LineString::new(coords))
    }

    fn polygon_body(&mut self, header: Header) -> Result<Polygon<f64>, WkbError> {
        let rings = self.count(header)?;
        let mut parsed = (0..rings)
            .map(|_| self.coords(header))
            .collect::<Result<Vec<_>, _>>()?;
        if parsed.is_empty() {
            return Ok(Polygon::new(LineString::new(Vec::new()), Vec::new()));
        }
        let exterior = parsed.remove(0);
        Ok(Polygon::new(exterior, parsed))
    }

    fn members<T>(
        &mut self,
        header: Header,
        extract: fn(Geometry<f64>) -> Option<T>,
        expected: u32,
    ) -> Result<Vec<T>, WkbError> {
        let count = self.count(header)?;
        (0..count)
            .map(|_| {
                let member = self.geometry()?;
                extract(member).ok_or(WkbError::UnsupportedType(expected))
            })
            .collect()
    }

    fn geometry(&mut self) -> Result<Geometry<f64>, WkbError> {
        let (header, code) = self.header()?;
        match code {
            WKB_POINT => {
                let coord = self.coord(header)?;
                if coord.x.is_nan() && coord.y.is_nan() {
                    Ok(Geometry::MultiPoint(MultiPoint::new(Vec::new())))
                } else {
                    Ok(Geometry::Point(Point::from(coord)))
                }
            }
            WKB_LINE_STRING => Ok(Geometry::LineString(self.coords(header)?)),
            WKB_POLYGON => Ok(Geometry::Polygon(self.polygon_body(header)?)),
            WKB_MULTI_POINT => {
                let points = self.members(header, as_point, WKB_POINT)?;
                Ok(Geometry::MultiPoint(MultiPoint::new(points)))
            }
            WKB_MULTI_LINE_STRING => {
                let lines = self.members(header, as_line_string, WKB_LINE_STRING)?;
                Ok(Geometry::MultiLineString(MultiLineString::new(lines)))
            }
            WKB_MULTI_POLYGON => {
                let polygons = self.members(header, as_polygon, WKB_POLYGON)?;
                Ok(Geometry::MultiPolygon(MultiPolygon::new(polygons)))
            }
            WKB_GEOMETRY_COLLECTION => {
                let members = self.members(header, Some, WKB_GEOMETRY_COLLECTION)?;
                Ok(Geometry::GeometryCollection(GeometryCollection::new_from(
                    members,
                )))
            }
            other => Err(WkbError::UnsupportedType(other)),
        }
    }
}

fn as_point(geometry: Geometry<f64>) -> Option<Point<f64>> {
    match geometry {
        Geometry::Point(point) => Some(point),
        _ => None,
    }
}

fn as_line_string(geometry: Geometry<f64>) -> Option<LineString<f64>> {
    match geometry {
        Geometry::LineString(line) => Some(line),
        _ => None,
    }
}

fn as_polygon(geometry: Geometry<f64>) -> Option<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => Some(polygon),
        _ => None,
    }
}

fn write_header(buffer: &mut Vec<u8>, code: u32) {
    buffer.push(1);
    buffer.extend_from_slice(&code.to_le_bytes());
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "WKB counts are 32-bit by definition"
)]
fn write_count(buffer: &mut Vec<u8>, count: usize) {
    buffer.extend_from_slice(&(count as u32).to_le_bytes());
}

fn write_coords(buffer: &mut Vec<u8>, line: &LineString<f64>) {
    write_count(buffer, line.0.len());
    for coord in &line.0 {
        buffer.extend_from_slice(&coord.x.to_le_bytes());
        buffer.extend_from_slice(&coord.y.to_le_bytes());
    }
}

fn write_polygon(buffer: &mut Vec<u8>, polygon: &Polygon<f64>) {
    write_header(buffer, WKB_POLYGON);
    if polygon.exterior().0.is_empty() {
        write_count(buffer, 0);
        return;
    }
    write_count(buffer, 1 + polygon.interiors().len());
    write_coords(buffer, polygon.exterior());
    for ring in polygon.interiors() {
        write_coords(buffer, ring);
    }
}

fn write_geometry(buffer: &mut Vec<u8>, geometry: &Geometry<f64>) {
    match geometry {
        Geometry::Point(point) => {
            write_header(buffer, WKB_POINT);
            buffer.extend_from_slice(&point.x().to_le_bytes());
            buffer.extend_from_slice(&point.y().to_le_bytes());
        }
        Geometry::Line(line) => {
            write_header(buffer, WKB_LINE_STRING);
            write_coords(buffer, &LineString::new(vec![line.start, line.end]));
        }
        Geometry::LineString(line) => {
            write_header(buffer, WKB_LINE_STRING);
            write_coords(buffer, line);
        }
        Geometry::Polygon(polygon) => write_polygon(buffer, polygon),
        Geometry::Rect(rect) => write_polygon(buffer, &rect.to_polygon()),
        Geometry::Triangle(triangle) => write_polygon(buffer, &triangle.to_polygon()),
        Geometry::MultiPoint(points) => {
            write_header(buffer, WKB_MULTI_POINT);
            write_count(buffer, points.0.len());
            for point in &points.0 {
                write_geometry(buffer, &Geometry::Point(*point));
            }
        }
        Geometry::MultiLineString(lines) => {
            write_header(buffer, WKB_MULTI_LINE_STRING);
            write_count(buffer, lines.0.len());
            for line in &lines.0 {
                write_header(buffer, WKB_LINE_STRING);
                write_coords(buffer, line);
            }
        }
        Geometry::MultiPolygon(polygons) => {
            write_header(buffer, WKB_MULTI_POLYGON);
            write_count(buffer, polygons.0.len());
            for polygon in &polygons.0 {
                write_polygon(buffer, polygon);
            }
        }
        Geometry::GeometryCollection(collection) => {
            write_header(buffer, WKB_GEOMETRY_COLLECTION);
            write_count(buffer, collection.0.len());
            for member in &collection.0 {
                write_geometry(buffer, member);
            }
        }
    }
}
