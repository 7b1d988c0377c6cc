use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    format::{format_distance, format_duration},
    geo::{BoundingBox, Coordinate},
    instruction::RouteInstruction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelProfile {
    #[default]
    Car,
    Bike,
    Foot,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("unknown travel profile `{0}`")]
pub struct ProfileParseError(pub String);

impl TravelProfile {
    pub const ALL: [TravelProfile; 3] = [Self::Car, Self::Bike, Self::Foot];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Bike => "bike",
            Self::Foot => "foot",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Car => "Drive",
            Self::Bike => "Cycle",
            Self::Foot => "Walk",
        }
    }

    /// Nominal travel speed in meters per second.
    pub fn nominal_speed_mps(self) -> f64 {
        match self {
            Self::Car => 11.0,
            Self::Bike => 4.0,
            Self::Foot => 1.4,
        }
    }
}

impl FromStr for TravelProfile {
    type Err = ProfileParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "car" | "car-vario" => Ok(Self::Car),
            "bike" | "trekking" => Ok(Self::Bike),
            "foot" | "hiking" => Ok(Self::Foot),
            _ => Err(ProfileParseError(s.to_string())),
        }
    }
}

impl fmt::Display for TravelProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A computed route. Produced wholesale by the route-search collaborator and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub distance_m: f64,
    pub duration_ms: i64,
    pub points: Vec<Coordinate>,
    #[serde(default)]
    pub instructions: Vec<RouteInstruction>,
    pub profile: TravelProfile,
}

impl RouteResult {
    pub fn new(
        distance_m: f64,
        duration_ms: i64,
        points: Vec<Coordinate>,
        instructions: Vec<RouteInstruction>,
        profile: TravelProfile,
    ) -> Self {
        Self {
            distance_m: distance_m.max(0.0),
            duration_ms: duration_ms.max(0),
            points,
            instructions,
            profile,
        }
    }

    /// The "no route" value.
    pub fn empty(profile: TravelProfile) -> Self {
        Self::new(0.0, 0, Vec::new(), Vec::new(), profile)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> Option<Coordinate> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<Coordinate> {
        self.points.last().copied()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.points)
    }

    pub fn formatted_distance(&self) -> String {
        format_distance(self.distance_m)
    }

    pub fn formatted_duration(&self) -> String {
        format_duration(self.duration_ms)
    }
}

/// A named location as typed or picked by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub location: Coordinate,
}

impl Place {
    pub fn new(name: impl Into<String>, location: Coordinate) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteHistoryEntry {
    pub id: String,
    pub start: Place,
    pub end: Place,
    pub route: RouteResult,
    pub recorded_at: DateTime<Utc>,
}

impl RouteHistoryEntry {
    pub fn record(start: Place, end: Place, route: RouteResult) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            start,
            end,
            route,
            recorded_at: Utc::now(),
        }
    }

    pub fn title(&self) -> String {
        format!("{} → {}", self.start.name, self.end.name)
    }
}
