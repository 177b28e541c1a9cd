//! Points handed to the map widget: a handful of fixed spots around the
//! reader's location, then every story's coordinates.

use itertools::Itertools;

use crate::corpus::Corpus;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from(v: (f64, f64)) -> Self {
        GeoPoint { lng: v.0, lat: v.1 }
    }
}

impl From<GeoPoint> for (f64, f64) {
    fn from(p: GeoPoint) -> Self {
        (p.lng, p.lat)
    }
}

pub const CURRENT_LOCATION: GeoPoint = GeoPoint::new(120.003618, 30.295699);

/// Roughly 700m to 1km around [`CURRENT_LOCATION`]: E, W, N, S, NE, SW
pub const NEARBY: [GeoPoint; 6] = [
    GeoPoint::new(120.011618, 30.295699),
    GeoPoint::new(119.995618, 30.295699),
    GeoPoint::new(120.003618, 30.304699),
    GeoPoint::new(120.003618, 30.286699),
    GeoPoint::new(120.008618, 30.300699),
    GeoPoint::new(119.998618, 30.290699),
];

/// South-west and north-east corners
pub type Bounds = (GeoPoint, GeoPoint);

#[derive(Clone, Debug, PartialEq)]
pub struct MapFeed {
    pub points: Vec<GeoPoint>,
    pub current: GeoPoint,
}

impl MapFeed {
    pub fn for_corpus(corpus: &Corpus) -> Self {
        Self {
            points: NEARBY.iter().copied().chain(corpus.points()).collect(),
            current: CURRENT_LOCATION,
        }
    }

    pub fn from_points(points: Vec<GeoPoint>) -> Self {
        Self {
            points,
            current: CURRENT_LOCATION,
        }
    }

    /// Box covering every point and the current location
    pub fn bounds(&self) -> Bounds {
        bounds_of(self.points.iter().copied().chain(std::iter::once(self.current)))
            .unwrap_or((self.current, self.current))
    }
}

pub fn bounds_of(points: impl Iterator<Item = GeoPoint> + Clone) -> Option<Bounds> {
    let (west, east) = points
        .clone()
        .map(|p| p.lng)
        .minmax_by(|a, b| a.total_cmp(b))
        .into_option()?;
    let (south, north) = points
        .map(|p| p.lat)
        .minmax_by(|a, b| a.total_cmp(b))
        .into_option()?;
    Some((GeoPoint::new(west, south), GeoPoint::new(east, north)))
}
