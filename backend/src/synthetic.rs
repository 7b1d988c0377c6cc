//! Stand-in routing engine for demos and tests.
//!
//! Routes are not searched on a road graph: each leg is an interpolated line
//! with a gentle sideways wiggle, and turn instructions are read back from
//! the heading changes along it.

use std::f64::consts::PI;

use frontend::{RouteQuery, RouteSearch, RouteSearchError};
use shared::{
    compose_instruction_text, BoundingBox, Coordinate, InstructionSign, RouteInstruction,
    RouteResult, TravelProfile, SERVICE_AREA,
};

const STEPS_PER_LEG: usize = 32;
/// Legs shorter than this count as coincident endpoints.
const MIN_LEG_M: f64 = 5.0;
/// Heading change that earns its own instruction.
const TURN_THRESHOLD_DEG: f64 = 25.0;

#[derive(Debug, Clone)]
pub struct SyntheticRouter {
    coverage: BoundingBox,
}

impl Default for SyntheticRouter {
    fn default() -> Self {
        Self {
            coverage: SERVICE_AREA,
        }
    }
}

impl SyntheticRouter {
    pub fn with_coverage(coverage: BoundingBox) -> Self {
        Self { coverage }
    }

    pub fn coverage(&self) -> BoundingBox {
        self.coverage
    }

    pub fn route(&self, query: &RouteQuery) -> Result<RouteResult, RouteSearchError> {
        if let Some(outside) = query
            .points()
            .iter()
            .find(|point| !self.coverage.contains(**point))
        {
            return Err(RouteSearchError::EngineUnavailable(format!(
                "{outside} is outside the offline map area"
            )));
        }

        let profile = query.profile();
        let mut path: Vec<Coordinate> = Vec::with_capacity(query.points().len() * STEPS_PER_LEG);
        let mut via_indices = Vec::new();
        for (leg, pair) in query.points().windows(2).enumerate() {
            if pair[0].distance_to(pair[1]) < MIN_LEG_M {
                return Err(RouteSearchError::NoRouteFound);
            }
            if leg > 0 {
                via_indices.push(path.len() - 1);
            }
            let points = generate_leg(pair[0], pair[1], profile);
            // Each leg starts where the previous one ended.
            let skip = usize::from(!path.is_empty());
            path.extend(points.into_iter().skip(skip));
        }

        let speed = profile.nominal_speed_mps();
        let instructions = derive_instructions(&path, &via_indices, speed);
        let distance_m = shared::path_length_m(&path);
        let duration_ms = (distance_m / speed * 1000.0).round() as i64;
        tracing::debug!(
            points = path.len(),
            instructions = instructions.len(),
            "synthetic route {} for {}",
            shared::format_distance(distance_m),
            profile
        );
        Ok(RouteResult::new(
            distance_m,
            duration_ms,
            path,
            instructions,
            profile,
        ))
    }
}

impl RouteSearch for SyntheticRouter {
    fn search(&self, query: &RouteQuery) -> Result<RouteResult, RouteSearchError> {
        self.route(query)
    }
}

/// Straight interpolation bent sideways; the bend vanishes at both ends so
/// consecutive legs join exactly.
fn generate_leg(start: Coordinate, end: Coordinate, profile: TravelProfile) -> Vec<Coordinate> {
    let amplitude = wiggle_factor(profile) * leg_span_deg(start, end);
    let perp = perpendicular_unit(start, end);
    (0..=STEPS_PER_LEG)
        .map(|i| {
            let t = i as f64 / STEPS_PER_LEG as f64;
            let mut point = start.interpolate(end, t);
            let wiggle = ((i as f64) * 0.45).sin() * (PI * t).sin() * amplitude;
            point.lat += perp.lat * wiggle;
            point.lon += perp.lon * wiggle;
            point
        })
        .collect()
}

/// Cars keep to straighter roads than bikes, bikes straighter than walkers.
fn wiggle_factor(profile: TravelProfile) -> f64 {
    match profile {
        TravelProfile::Car => 0.04,
        TravelProfile::Bike => 0.07,
        TravelProfile::Foot => 0.1,
    }
}

fn leg_span_deg(start: Coordinate, end: Coordinate) -> f64 {
    let dx = end.lon - start.lon;
    let dy = end.lat - start.lat;
    (dx * dx + dy * dy).sqrt()
}

fn perpendicular_unit(start: Coordinate, end: Coordinate) -> Coordinate {
    let dx = end.lon - start.lon;
    let dy = end.lat - start.lat;
    let len = (dx * dx + dy * dy).sqrt().max(f64::EPSILON);
    Coordinate {
        lon: -dy / len,
        lat: dx / len,
    }
}

/// Signed heading change at `b` travelling a -> b -> c, in (-180, 180].
fn turn_angle(a: Coordinate, b: Coordinate, c: Coordinate) -> f64 {
    let delta = b.bearing_to(c) - a.bearing_to(b);
    let delta = (delta + 540.0) % 360.0 - 180.0;
    if delta == -180.0 {
        180.0
    } else {
        delta
    }
}

fn derive_instructions(path: &[Coordinate], via_indices: &[usize], speed_mps: f64) -> Vec<RouteInstruction> {
    let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
        return Vec::new();
    };

    let mut stops: Vec<(usize, InstructionSign, Option<f64>)> =
        vec![(0, InstructionSign::Depart, None)];
    let mut pending_turn = 0.0;
    for index in 1..path.len().saturating_sub(1) {
        if via_indices.contains(&index) {
            stops.push((index, InstructionSign::ReachedVia, None));
            pending_turn = 0.0;
            continue;
        }
        pending_turn += turn_angle(path[index - 1], path[index], path[index + 1]);
        if pending_turn.abs() > TURN_THRESHOLD_DEG {
            let angle = pending_turn.clamp(-180.0, 180.0);
            stops.push((index, InstructionSign::from_turn_angle(angle), Some(angle)));
            pending_turn = 0.0;
        }
    }
    stops.push((path.len() - 1, InstructionSign::Arrive, None));

    let mut instructions = Vec::with_capacity(stops.len());
    for (i, &(index, sign, turn)) in stops.iter().enumerate() {
        let distance_m = stops
            .get(i + 1)
            .map_or(0.0, |&(next, _, _)| shared::path_length_m(&path[index..=next]));
        let location = match sign {
            InstructionSign::Depart => first,
            InstructionSign::Arrive => last,
            _ => path[index],
        };
        instructions.push(RouteInstruction {
            text: compose_instruction_text(sign, None),
            distance_m,
            duration_ms: (distance_m / speed_mps * 1000.0).round() as i64,
            sign,
            location,
            street_name: None,
            turn_angle: turn,
        });
    }
    instructions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(profile: TravelProfile) -> RouteQuery {
        RouteQuery::new(
            Coordinate::new(30.5433, 114.3416),
            Coordinate::new(30.5455, 114.3500),
            profile,
        )
    }

    #[test]
    fn route_joins_query_endpoints() {
        let route = SyntheticRouter::default().route(&query(TravelProfile::Car)).unwrap();
        assert_eq!(route.start(), Some(Coordinate::new(30.5433, 114.3416)));
        let end = route.end().unwrap();
        assert!(end.distance_to(Coordinate::new(30.5455, 114.3500)) < 1e-6);
        assert_eq!(route.points.len(), STEPS_PER_LEG + 1);
        assert_eq!(route.profile, TravelProfile::Car);
    }

    #[test]
    fn duration_follows_profile_speed() {
        let router = SyntheticRouter::default();
        let car = router.route(&query(TravelProfile::Car)).unwrap();
        let foot = router.route(&query(TravelProfile::Foot)).unwrap();
        assert!(foot.duration_ms > car.duration_ms);
        let expected = (car.distance_m / 11.0 * 1000.0).round() as i64;
        assert_eq!(car.duration_ms, expected);
    }

    #[test]
    fn instructions_run_from_depart_to_arrive() {
        let route = SyntheticRouter::default().route(&query(TravelProfile::Foot)).unwrap();
        let signs: Vec<_> = route.instructions.iter().map(|i| i.sign).collect();
        assert_eq!(signs.first(), Some(&InstructionSign::Depart));
        assert_eq!(signs.last(), Some(&InstructionSign::Arrive));

        let total: f64 = route.instructions.iter().map(|i| i.distance_m).sum();
        assert!((total - route.distance_m).abs() < 1e-6);
        assert_eq!(route.instructions.last().unwrap().distance_m, 0.0);
    }

    #[test]
    fn waypoints_are_reached() {
        let query = RouteQuery::with_waypoints(
            Coordinate::new(30.54, 114.34),
            [Coordinate::new(30.55, 114.36)],
            Coordinate::new(30.56, 114.34),
            TravelProfile::Bike,
        );
        let route = SyntheticRouter::default().route(&query).unwrap();
        assert_eq!(route.points.len(), 2 * STEPS_PER_LEG + 1);
        let via: Vec<_> = route
            .instructions
            .iter()
            .filter(|i| i.sign == InstructionSign::ReachedVia)
            .collect();
        assert_eq!(via.len(), 1);
        assert!(via[0].location.distance_to(Coordinate::new(30.55, 114.36)) < 1e-6);
    }

    #[test]
    fn coincident_endpoints_have_no_route() {
        let here = Coordinate::new(30.5433, 114.3416);
        let query = RouteQuery::new(here, here, TravelProfile::Car);
        assert_eq!(
            SyntheticRouter::default().route(&query),
            Err(RouteSearchError::NoRouteFound)
        );
    }

    #[test]
    fn outside_coverage_is_unavailable() {
        let query = RouteQuery::new(
            Coordinate::new(45.93, 4.57),
            Coordinate::new(45.95, 4.60),
            TravelProfile::Car,
        );
        assert!(matches!(
            SyntheticRouter::default().route(&query),
            Err(RouteSearchError::EngineUnavailable(_))
        ));
    }

    #[test]
    fn turn_angle_sign_convention() {
        let a = Coordinate::new(30.0, 114.0);
        let b = Coordinate::new(30.01, 114.0);
        let east = Coordinate::new(30.01, 114.01);
        let west = Coordinate::new(30.01, 113.99);
        assert!((turn_angle(a, b, east) - 90.0).abs() < 1.0);
        assert!((turn_angle(a, b, west) + 90.0).abs() < 1.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn in_coverage() -> impl Strategy<Value = Coordinate> {
            (30.0f64..31.3, 113.75f64..115.0).prop_map(|(lat, lon)| Coordinate::new(lat, lon))
        }

        proptest! {
            #[test]
            fn prop_routes_are_well_formed(
                start in in_coverage(),
                end in in_coverage(),
                profile in prop::sample::select(TravelProfile::ALL.to_vec()),
            ) {
                prop_assume!(start.distance_to(end) >= MIN_LEG_M);
                let route = SyntheticRouter::default()
                    .route(&RouteQuery::new(start, end, profile))
                    .unwrap();

                prop_assert_eq!(route.start(), Some(start));
                prop_assert!(route.end().unwrap().distance_to(end) < 1e-3);
                let bounds = route.bounding_box().unwrap();
                prop_assert!(bounds.contains(start));
                prop_assert_eq!(route.instructions.first().map(|i| i.sign), Some(InstructionSign::Depart));
                prop_assert_eq!(route.instructions.last().map(|i| i.sign), Some(InstructionSign::Arrive));
                prop_assert!(route.duration_ms >= 0);
            }
        }
    }
}
