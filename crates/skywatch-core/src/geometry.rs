//! Region geometry: GeoJSON polygon parsing and point containment.
//!
//! The wire form is a serialized GeoJSON "Polygon" with `[lon, lat]`
//! coordinates. It is parsed once per region and cached; the string form
//! never appears on the telemetry path.

use serde::Deserialize;
use thiserror::Error;

/// Tolerance for closed-ring and on-boundary comparisons, in degrees.
const EPSILON_DEG: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("polygon is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("geometry type must be \"Polygon\", got \"{0}\"")]
    NotAPolygon(String),
    #[error("polygon has no coordinate rings")]
    EmptyPolygon,
    #[error("polygon ring must be closed (first vertex must equal last)")]
    OpenRing,
    #[error("polygon ring must have at least 3 distinct vertices")]
    TooFewVertices,
    #[error("polygon ring must not self-intersect")]
    SelfIntersecting,
}

#[derive(Deserialize)]
struct GeoJsonPolygon {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<Vec<[f64; 2]>>,
}

/// Parsed restricted-region geometry.
///
/// The ring is the outer GeoJSON ring as given, closed, `[lon, lat]`
/// vertex order. Extra (hole) rings are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionGeometry {
    ring: Vec<[f64; 2]>,
}

impl RegionGeometry {
    /// Parse a serialized GeoJSON Polygon into a cached geometry.
    pub fn parse(encoded: &str) -> Result<Self, GeometryError> {
        let polygon: GeoJsonPolygon = serde_json::from_str(encoded)
            .map_err(|e| GeometryError::InvalidJson(e.to_string()))?;

        if polygon.kind != "Polygon" {
            return Err(GeometryError::NotAPolygon(polygon.kind));
        }
        let ring = polygon
            .coordinates
            .into_iter()
            .next()
            .ok_or(GeometryError::EmptyPolygon)?;

        if ring.len() < 4 {
            return Err(GeometryError::TooFewVertices);
        }
        let first = ring[0];
        let last = ring[ring.len() - 1];
        if (first[0] - last[0]).abs() > EPSILON_DEG || (first[1] - last[1]).abs() > EPSILON_DEG {
            return Err(GeometryError::OpenRing);
        }
        if distinct_vertices(&ring) < 3 {
            return Err(GeometryError::TooFewVertices);
        }
        // The containment rule is only well-defined for simple rings.
        // There is no repair step; a crossing ring is rejected outright.
        if ring_self_intersects(&ring) {
            return Err(GeometryError::SelfIntersecting);
        }

        Ok(Self { ring })
    }

    /// Ray-casting (even-odd) point-in-polygon test.
    ///
    /// Points exactly on the boundary count as inside.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let n = self.ring.len();
        if n < 3 {
            return false;
        }

        for i in 0..n - 1 {
            if point_on_segment(lon, lat, self.ring[i], self.ring[i + 1]) {
                return true;
            }
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let xi = self.ring[i][0];
            let yi = self.ring[i][1];
            let xj = self.ring[j][0];
            let yj = self.ring[j][1];

            if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// Vertex-mean centroid and the larger of the lat/lon spans, for
    /// framing visualisations. Deterministic for a given ring.
    pub fn centroid_and_extent(&self) -> (f64, f64, f64) {
        // Skip the duplicated closing vertex so it is not double-counted.
        let open = &self.ring[..self.ring.len() - 1];
        let count = open.len() as f64;

        let (mut sum_lon, mut sum_lat) = (0.0, 0.0);
        let (mut min_lon, mut max_lon) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
        for v in open {
            sum_lon += v[0];
            sum_lat += v[1];
            min_lon = min_lon.min(v[0]);
            max_lon = max_lon.max(v[0]);
            min_lat = min_lat.min(v[1]);
            max_lat = max_lat.max(v[1]);
        }

        let extent = (max_lat - min_lat).max(max_lon - min_lon);
        (sum_lat / count, sum_lon / count, extent)
    }

    /// Vertices of the closed ring, `[lon, lat]` order.
    pub fn ring(&self) -> &[[f64; 2]] {
        &self.ring
    }
}

fn distinct_vertices(ring: &[[f64; 2]]) -> usize {
    let mut distinct: Vec<[f64; 2]> = Vec::with_capacity(ring.len());
    for v in ring {
        if !distinct
            .iter()
            .any(|d| (d[0] - v[0]).abs() <= EPSILON_DEG && (d[1] - v[1]).abs() <= EPSILON_DEG)
        {
            distinct.push(*v);
        }
    }
    distinct.len()
}

/// True when point (x, y) lies on the segment a-b, within tolerance.
fn point_on_segment(x: f64, y: f64, a: [f64; 2], b: [f64; 2]) -> bool {
    let cross = (b[0] - a[0]) * (y - a[1]) - (b[1] - a[1]) * (x - a[0]);
    if cross.abs() > EPSILON_DEG {
        return false;
    }
    let within_x = x >= a[0].min(b[0]) - EPSILON_DEG && x <= a[0].max(b[0]) + EPSILON_DEG;
    let within_y = y >= a[1].min(b[1]) - EPSILON_DEG && y <= a[1].max(b[1]) + EPSILON_DEG;
    within_x && within_y
}

fn orientation(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Proper crossing test: segments that merely share an endpoint do not count.
fn segments_cross(a1: [f64; 2], a2: [f64; 2], b1: [f64; 2], b2: [f64; 2]) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

fn ring_self_intersects(ring: &[[f64; 2]]) -> bool {
    // Edges of the closed ring, excluding the duplicated closing vertex.
    let n = ring.len() - 1;
    for i in 0..n {
        for j in i + 1..n {
            // Adjacent edges share a vertex; the wraparound pair too.
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            if segments_cross(ring[i], ring[i + 1], ring[j], ring[j + 1]) {
                return true;
            }
        }
    }
    false
}
