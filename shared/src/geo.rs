use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Default map center (Yellow Crane Tower, Wuhan).
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    lat: 30.5433,
    lon: 114.3416,
};

/// Area covered by the offline map package.
pub const SERVICE_AREA: BoundingBox = BoundingBox {
    min_lat: 29.97,
    max_lat: 31.36,
    min_lon: 113.70,
    max_lon: 115.08,
};

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq)]
pub enum GeoError {
    #[error("latitude {0} outside [-90, 90]")]
    InvalidLatitude(f64),
    #[error("longitude {0} outside [-180, 180]")]
    InvalidLongitude(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn try_new(lat: f64, lon: f64) -> Result<Self, GeoError> {
        let coord = Self { lat, lon };
        coord.validate()?;
        Ok(coord)
    }

    pub fn validate(&self) -> Result<(), GeoError> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(GeoError::InvalidLatitude(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(GeoError::InvalidLongitude(self.lon));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn is_in_service_area(&self) -> bool {
        SERVICE_AREA.contains(*self)
    }

    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: Coordinate) -> f64 {
        haversine_m(*self, other)
    }

    pub fn interpolate(self, other: Self, t: f64) -> Self {
        Self {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }

    /// Initial bearing towards `other`, degrees clockwise from north in [0, 360).
    pub fn bearing_to(&self, other: Coordinate) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        (y.atan2(x).to_degrees() + 360.0) % 360.0
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lon)
    }
}

pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    // Rounding can push h a hair above 1 for antipodal points.
    2.0 * EARTH_RADIUS_M * h.min(1.0).sqrt().asin()
}

/// Sum of segment lengths along `path`, in meters.
pub fn path_length_m(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| haversine_m(w[0], w[1])).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Single pass over `points` tracking the running extremes.
    /// Returns `None` for an empty slice.
    pub fn from_points(points: &[Coordinate]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bbox = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };
        for point in rest {
            bbox.min_lat = bbox.min_lat.min(point.lat);
            bbox.max_lat = bbox.max_lat.max(point.lat);
            bbox.min_lon = bbox.min_lon.min(point.lon);
            bbox.max_lon = bbox.max_lon.max(point.lon);
        }
        Some(bbox)
    }

    pub fn center(&self) -> Coordinate {
        Coordinate {
            lat: (self.min_lat + self.max_lat) / 2.0,
            lon: (self.min_lon + self.max_lon) / 2.0,
        }
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.lat >= self.min_lat
            && coord.lat <= self.max_lat
            && coord.lon >= self.min_lon
            && coord.lon <= self.max_lon
    }

    /// Grow the box by `margin_m` on every side.
    pub fn expanded_m(&self, margin_m: f64) -> Self {
        // 1 degree latitude ≈ 111 km; longitude shrinks with cos(lat)
        let lat_margin = margin_m / 111_000.0;
        let cos_lat = self.center().lat.to_radians().cos().max(f64::EPSILON);
        let lon_margin = margin_m / (111_000.0 * cos_lat);

        Self {
            min_lat: (self.min_lat - lat_margin).max(-90.0),
            max_lat: (self.max_lat + lat_margin).min(90.0),
            min_lon: (self.min_lon - lon_margin).max(-180.0),
            max_lon: (self.max_lon + lon_margin).min(180.0),
        }
    }
}

pub fn bounding_box_of(points: &[Coordinate]) -> Option<BoundingBox> {
    BoundingBox::from_points(points)
}
