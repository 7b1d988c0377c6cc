use serde::{Deserialize, Serialize};

use crate::{format::format_distance, geo::Coordinate};

/// Normalized maneuver category of a turn instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionSign {
    Continue,
    Straight,
    SlightLeft,
    Left,
    SharpLeft,
    SlightRight,
    Right,
    SharpRight,
    UTurnLeft,
    UTurnRight,
    Roundabout,
    LeaveRoundabout,
    Depart,
    Arrive,
    ReachedVia,
    KeepLeft,
    KeepRight,
    Unknown,
}

impl InstructionSign {
    pub const ALL: [InstructionSign; 18] = [
        Self::Continue,
        Self::Straight,
        Self::SlightLeft,
        Self::Left,
        Self::SharpLeft,
        Self::SlightRight,
        Self::Right,
        Self::SharpRight,
        Self::UTurnLeft,
        Self::UTurnRight,
        Self::Roundabout,
        Self::LeaveRoundabout,
        Self::Depart,
        Self::Arrive,
        Self::ReachedVia,
        Self::KeepLeft,
        Self::KeepRight,
        Self::Unknown,
    ];

    /// Maps a routing engine's raw sign code. Unlisted codes become `Unknown`.
    pub fn from_raw_code(code: i32) -> Self {
        match code {
            0 => Self::Continue,
            -1 => Self::SlightLeft,
            -2 => Self::Left,
            -3 => Self::SharpLeft,
            1 => Self::SlightRight,
            2 => Self::Right,
            3 => Self::SharpRight,
            -7 => Self::Roundabout,
            7 => Self::LeaveRoundabout,
            4 => Self::Depart,
            5 => Self::Arrive,
            6 => Self::UTurnRight,
            -6 => Self::UTurnLeft,
            8 => Self::ReachedVia,
            -4 => Self::KeepLeft,
            _ => Self::Unknown,
        }
    }

    /// Classifies a relative heading change in degrees (positive = right).
    pub fn from_turn_angle(angle: f64) -> Self {
        if !angle.is_finite() {
            return Self::Unknown;
        }
        let mut angle = angle % 360.0;
        if angle > 180.0 {
            angle -= 360.0;
        } else if angle < -180.0 {
            angle += 360.0;
        }
        let right = angle > 0.0;
        match angle.abs() {
            a if a > 170.0 => {
                if right {
                    Self::UTurnRight
                } else {
                    Self::UTurnLeft
                }
            }
            a if a > 120.0 => {
                if right {
                    Self::SharpRight
                } else {
                    Self::SharpLeft
                }
            }
            a if a > 60.0 => {
                if right {
                    Self::Right
                } else {
                    Self::Left
                }
            }
            a if a > 25.0 => {
                if right {
                    Self::SlightRight
                } else {
                    Self::SlightLeft
                }
            }
            a if a > 10.0 => {
                if right {
                    Self::KeepRight
                } else {
                    Self::KeepLeft
                }
            }
            _ => Self::Straight,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Continue | Self::Straight => 0,
            Self::SlightLeft => -1,
            Self::Left => -2,
            Self::SharpLeft => -3,
            Self::SlightRight => 1,
            Self::Right => 2,
            Self::SharpRight => 3,
            Self::UTurnLeft => -6,
            Self::UTurnRight => 6,
            Self::Roundabout => -7,
            Self::LeaveRoundabout => 7,
            Self::Depart => 4,
            Self::Arrive => 5,
            Self::ReachedVia => 8,
            Self::KeepLeft => -4,
            Self::KeepRight => 4,
            Self::Unknown => -99,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Continue => "Continue",
            Self::Straight => "Go straight",
            Self::SlightLeft => "Bear left",
            Self::Left => "Turn left",
            Self::SharpLeft => "Sharp left",
            Self::SlightRight => "Bear right",
            Self::Right => "Turn right",
            Self::SharpRight => "Sharp right",
            Self::UTurnLeft => "Make a U-turn to the left",
            Self::UTurnRight => "Make a U-turn to the right",
            Self::Roundabout => "Enter the roundabout",
            Self::LeaveRoundabout => "Exit the roundabout",
            Self::Depart => "Depart",
            Self::Arrive => "Arrive at destination",
            Self::ReachedVia => "Reached waypoint",
            Self::KeepLeft => "Keep left",
            Self::KeepRight => "Keep right",
            Self::Unknown => "Continue",
        }
    }

    fn is_turn(self) -> bool {
        matches!(
            self,
            Self::SlightLeft
                | Self::Left
                | Self::SharpLeft
                | Self::SlightRight
                | Self::Right
                | Self::SharpRight
        )
    }
}

/// Builds the instruction text shown in the turn list.
pub fn compose_instruction_text(sign: InstructionSign, street: Option<&str>) -> String {
    let action = sign.description();
    match street.map(str::trim).filter(|s| !s.is_empty()) {
        None => action.to_string(),
        Some(_) if sign == InstructionSign::Arrive => action.to_string(),
        Some(street) if matches!(sign, InstructionSign::Continue | InstructionSign::Straight) => {
            format!("{action} on {street}")
        }
        Some(street) if sign.is_turn() => format!("{action} onto {street}"),
        Some(street) => format!("{action}, follow {street}"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInstruction {
    pub text: String,
    /// Meters until the next instruction.
    pub distance_m: f64,
    /// Milliseconds until the next instruction.
    pub duration_ms: i64,
    pub sign: InstructionSign,
    pub location: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_name: Option<String>,
    /// Degrees in [-180, 180].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_angle: Option<f64>,
}

impl RouteInstruction {
    pub fn formatted_distance(&self) -> String {
        format_distance(self.distance_m)
    }

    pub fn icon_description(&self) -> &'static str {
        self.sign.description()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_codes_map_to_signs() {
        assert_eq!(InstructionSign::from_raw_code(-2), InstructionSign::Left);
        assert_eq!(InstructionSign::from_raw_code(0), InstructionSign::Continue);
        assert_eq!(InstructionSign::from_raw_code(-7), InstructionSign::Roundabout);
        assert_eq!(InstructionSign::from_raw_code(5), InstructionSign::Arrive);
        assert_eq!(InstructionSign::from_raw_code(999), InstructionSign::Unknown);
        assert_eq!(InstructionSign::from_raw_code(i32::MIN), InstructionSign::Unknown);
    }

    #[test]
    fn raw_code_mapping_round_trips_through_code() {
        for code in -10..=10 {
            let sign = InstructionSign::from_raw_code(code);
            if sign != InstructionSign::Unknown {
                assert_eq!(sign.code(), code, "{sign:?}");
            }
        }
    }

    #[test]
    fn every_sign_has_a_description() {
        for sign in InstructionSign::ALL {
            assert!(!sign.description().is_empty());
        }
    }

    #[test]
    fn turn_angle_classification() {
        assert_eq!(InstructionSign::from_turn_angle(3.0), InstructionSign::Straight);
        assert_eq!(InstructionSign::from_turn_angle(-15.0), InstructionSign::KeepLeft);
        assert_eq!(InstructionSign::from_turn_angle(40.0), InstructionSign::SlightRight);
        assert_eq!(InstructionSign::from_turn_angle(-90.0), InstructionSign::Left);
        assert_eq!(InstructionSign::from_turn_angle(150.0), InstructionSign::SharpRight);
        assert_eq!(InstructionSign::from_turn_angle(-178.0), InstructionSign::UTurnLeft);
        // 270° clockwise is a left turn
        assert_eq!(InstructionSign::from_turn_angle(270.0), InstructionSign::Left);
        assert_eq!(InstructionSign::from_turn_angle(f64::NAN), InstructionSign::Unknown);
    }

    #[test]
    fn instruction_text_uses_street_name() {
        assert_eq!(
            compose_instruction_text(InstructionSign::Left, Some("Jiefang Ave")),
            "Turn left onto Jiefang Ave"
        );
        assert_eq!(
            compose_instruction_text(InstructionSign::Continue, Some("Zhongshan Rd")),
            "Continue on Zhongshan Rd"
        );
        assert_eq!(
            compose_instruction_text(InstructionSign::Arrive, Some("Zhongshan Rd")),
            "Arrive at destination"
        );
        assert_eq!(
            compose_instruction_text(InstructionSign::Roundabout, Some("Ring Rd")),
            "Enter the roundabout, follow Ring Rd"
        );
        assert_eq!(compose_instruction_text(InstructionSign::Right, Some("  ")), "Turn right");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_from_raw_code_is_total(code in any::<i32>()) {
                let sign = InstructionSign::from_raw_code(code);
                prop_assert!(InstructionSign::ALL.contains(&sign));
            }

            #[test]
            fn prop_turn_angle_is_total(angle in any::<f64>()) {
                let sign = InstructionSign::from_turn_angle(angle);
                prop_assert!(InstructionSign::ALL.contains(&sign));
            }
        }
    }
}
