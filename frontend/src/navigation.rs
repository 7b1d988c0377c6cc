//! Turn-by-turn progress along a computed route.

use std::{fmt::Display, sync::Arc};

use chrono::{DateTime, Duration, TimeZone};
use shared::{
    format_distance, format_distance_ahead, format_remaining_time, path_length_m, Coordinate,
    RouteInstruction, RouteResult, DEFAULT_CENTER,
};

use crate::{config::MapConfig, handoff::HandoffStore, reducer::StateOp};

/// Camera zoom while following the user.
pub const NAVIGATION_ZOOM: u8 = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    NotStarted,
    Navigating,
    Paused,
    Arrived,
    OffRoute,
}

#[derive(Debug, Clone)]
pub struct NavigationSession {
    route: Arc<RouteResult>,
    total_length_m: f64,
    instruction_threshold_m: f64,
    arrival_threshold_m: f64,
    off_route_threshold_m: f64,
    state: NavigationState,
    location: Coordinate,
    instruction_index: usize,
    distance_to_next_m: f64,
    remaining_distance_m: f64,
    remaining_time_ms: i64,
    /// Index of the path vertex that starts the segment the user is on.
    completed_point_index: usize,
    following: bool,
    overview: bool,
}

impl NavigationSession {
    pub fn new(route: Arc<RouteResult>, config: &MapConfig) -> Self {
        let total_length_m = path_length_m(&route.points);
        let mut session = Self {
            route,
            total_length_m,
            instruction_threshold_m: config.instruction_threshold_m,
            arrival_threshold_m: config.arrival_threshold_m,
            off_route_threshold_m: config.off_route_threshold_m,
            state: NavigationState::NotStarted,
            location: DEFAULT_CENTER,
            instruction_index: 0,
            distance_to_next_m: 0.0,
            remaining_distance_m: 0.0,
            remaining_time_ms: 0,
            completed_point_index: 0,
            following: true,
            overview: false,
        };
        session.reset_progress();
        tracing::info!(
            "navigation route set: {}, {} instructions",
            session.route.formatted_distance(),
            session.route.instructions.len()
        );
        session
    }

    /// Takes the route left in the handoff store, if there is one.
    pub fn from_handoff(store: &HandoffStore, config: &MapConfig) -> Option<Self> {
        store.route.consume().map(|route| Self::new(route, config))
    }

    fn reset_progress(&mut self) {
        self.location = self.route.start().unwrap_or(DEFAULT_CENTER);
        self.instruction_index = 0;
        self.distance_to_next_m = self
            .route
            .instructions
            .first()
            .map_or(0.0, |instruction| instruction.distance_m);
        self.remaining_distance_m = self.route.distance_m;
        self.remaining_time_ms = self.route.duration_ms;
        self.completed_point_index = 0;
    }

    pub fn start(&mut self) {
        if self.state == NavigationState::Arrived {
            return;
        }
        tracing::info!("navigation started");
        self.state = NavigationState::Navigating;
        self.following = true;
        self.overview = false;
    }

    pub fn pause(&mut self) {
        if matches!(self.state, NavigationState::Navigating | NavigationState::OffRoute) {
            tracing::info!("navigation paused");
            self.state = NavigationState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == NavigationState::Paused {
            tracing::info!("navigation resumed");
            self.state = NavigationState::Navigating;
        }
    }

    pub fn stop(&mut self) {
        tracing::info!("navigation stopped");
        self.state = NavigationState::NotStarted;
        self.reset_progress();
    }

    /// Restarts guidance from the beginning of the route.
    pub fn reroute(&mut self) {
        tracing::info!("rerouting from route start");
        self.reset_progress();
        self.state = NavigationState::Navigating;
    }

    pub fn toggle_follow(&mut self) {
        self.following = !self.following;
        if self.following {
            self.overview = false;
        }
    }

    pub fn toggle_overview(&mut self) {
        self.overview = !self.overview;
        if self.overview {
            self.following = false;
        }
    }

    /// Panning the map by hand stops the camera from following.
    pub fn on_map_click(&mut self) {
        self.following = false;
    }

    /// Folds a new position into the session and returns the resulting state.
    ///
    /// Progress only moves while navigating (or off route); otherwise the
    /// position is recorded and nothing else changes.
    pub fn update_location(&mut self, position: Coordinate) -> NavigationState {
        self.location = position;
        if !matches!(self.state, NavigationState::Navigating | NavigationState::OffRoute) {
            return self.state;
        }

        if let Some((segment, snapped, off_by)) = self.nearest_on_route(position) {
            if off_by > self.off_route_threshold_m {
                if self.state != NavigationState::OffRoute {
                    tracing::warn!(off_by_m = off_by, "left the route");
                }
                self.state = NavigationState::OffRoute;
                return self.state;
            }
            if self.state == NavigationState::OffRoute {
                tracing::info!("back on route");
                self.state = NavigationState::Navigating;
            }
            self.completed_point_index = segment;
            self.update_remaining(segment, snapped);
        }

        self.advance_instructions(position);
        self.check_arrival(position);
        self.state
    }

    /// Nearest point on the path ahead of the user: segment index, the point
    /// itself, and its distance from `position`.
    fn nearest_on_route(&self, position: Coordinate) -> Option<(usize, Coordinate, f64)> {
        let points = &self.route.points;
        match points.len() {
            0 => None,
            1 => Some((0, points[0], position.distance_to(points[0]))),
            _ => points
                .windows(2)
                .enumerate()
                .skip(self.completed_point_index)
                .map(|(index, pair)| {
                    let snapped = project_onto_segment(position, pair[0], pair[1]);
                    (index, snapped, position.distance_to(snapped))
                })
                .min_by(|a, b| a.2.total_cmp(&b.2)),
        }
    }

    fn update_remaining(&mut self, segment: usize, snapped: Coordinate) {
        let points = &self.route.points;
        let remaining = match points.get(segment + 1) {
            Some(&next) => snapped.distance_to(next) + path_length_m(&points[segment + 1..]),
            None => 0.0,
        };
        self.remaining_distance_m = remaining;
        self.remaining_time_ms = if self.total_length_m > 0.0 {
            (self.route.duration_ms as f64 * (remaining / self.total_length_m).min(1.0)) as i64
        } else {
            0
        };
    }

    fn advance_instructions(&mut self, position: Coordinate) {
        let instructions = &self.route.instructions;
        while let Some(next) = instructions.get(self.instruction_index + 1) {
            if position.distance_to(next.location) >= self.instruction_threshold_m {
                break;
            }
            self.instruction_index += 1;
            tracing::debug!(index = self.instruction_index, "next instruction: {}", next.text);
        }
        self.distance_to_next_m = instructions
            .get(self.instruction_index + 1)
            .map_or(0.0, |next| position.distance_to(next.location));
    }

    fn check_arrival(&mut self, position: Coordinate) {
        let Some(destination) = self.route.end() else {
            return;
        };
        if position.distance_to(destination) < self.arrival_threshold_m {
            tracing::info!("arrived at destination");
            self.state = NavigationState::Arrived;
            self.remaining_distance_m = 0.0;
            self.remaining_time_ms = 0;
            self.distance_to_next_m = 0.0;
            self.instruction_index = self.route.instructions.len().saturating_sub(1);
        }
    }

    pub fn route(&self) -> &Arc<RouteResult> {
        &self.route
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn location(&self) -> Coordinate {
        self.location
    }

    pub fn instruction_index(&self) -> usize {
        self.instruction_index
    }

    pub fn current_instruction(&self) -> Option<&RouteInstruction> {
        self.route.instructions.get(self.instruction_index)
    }

    pub fn next_instruction(&self) -> Option<&RouteInstruction> {
        self.route.instructions.get(self.instruction_index + 1)
    }

    pub fn distance_to_next_m(&self) -> f64 {
        self.distance_to_next_m
    }

    pub fn remaining_distance_m(&self) -> f64 {
        self.remaining_distance_m
    }

    pub fn remaining_time_ms(&self) -> i64 {
        self.remaining_time_ms
    }

    pub fn completed_point_index(&self) -> usize {
        self.completed_point_index
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn is_overview(&self) -> bool {
        self.overview
    }

    pub fn current_speed_kmh(&self) -> f64 {
        match self.state {
            NavigationState::Navigating => self.route.profile.nominal_speed_mps() * 3.6,
            _ => 0.0,
        }
    }

    pub fn formatted_distance_to_next(&self) -> String {
        format_distance_ahead(self.distance_to_next_m)
    }

    pub fn formatted_remaining_distance(&self) -> String {
        format_distance(self.remaining_distance_m)
    }

    pub fn formatted_remaining_time(&self) -> String {
        format_remaining_time(self.remaining_time_ms)
    }

    /// Wall-clock arrival time as `HH:MM` in the zone of `now`, or `--:--`
    /// when it falls outside the representable calendar.
    pub fn estimated_arrival<Tz>(&self, now: DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Duration::try_milliseconds(self.remaining_time_ms)
            .and_then(|remaining| now.checked_add_signed(remaining))
            .map_or_else(|| "--:--".to_string(), |eta| eta.format("%H:%M").to_string())
    }

    /// The camera move matching the follow/overview mode, if any.
    pub fn camera_op(&self) -> Option<StateOp> {
        if self.overview {
            self.route.bounding_box().map(|bounds| StateOp::FitBounds {
                bounds,
                padding: None,
            })
        } else if self.following {
            Some(StateOp::MoveTo {
                position: self.location,
                zoom: Some(NAVIGATION_ZOOM),
                animate: true,
            })
        } else {
            None
        }
    }

    /// Positions spaced `step_m` apart along the path, start and end
    /// included. Drives simulated guidance.
    pub fn simulated_track(&self, step_m: f64) -> Vec<Coordinate> {
        let points = &self.route.points;
        let Some(&first) = points.first() else {
            return Vec::new();
        };
        if !(step_m.is_finite() && step_m > 0.0) {
            return points.clone();
        }

        let mut track = vec![first];
        let mut since_last = 0.0;
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let length = a.distance_to(b);
            if length <= 0.0 {
                continue;
            }
            let mut offset = step_m - since_last;
            while offset <= length {
                track.push(a.interpolate(b, offset / length));
                offset += step_m;
            }
            since_last = length - (offset - step_m);
        }
        if let Some(&last) = points.last() {
            if track.last() != Some(&last) {
                track.push(last);
            }
        }
        track
    }
}

/// Closest point to `p` on segment `a`-`b`, using a local equirectangular
/// approximation.
fn project_onto_segment(p: Coordinate, a: Coordinate, b: Coordinate) -> Coordinate {
    let scale = a.lat.to_radians().cos();
    let (bx, by) = ((b.lon - a.lon) * scale, b.lat - a.lat);
    let (px, py) = ((p.lon - a.lon) * scale, p.lat - a.lat);
    let length_sq = bx * bx + by * by;
    if length_sq == 0.0 {
        return a;
    }
    let t = ((px * bx + py * by) / length_sq).clamp(0.0, 1.0);
    a.interpolate(b, t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::{InstructionSign, TravelProfile};

    fn instruction(sign: InstructionSign, lat: f64, distance_m: f64) -> RouteInstruction {
        RouteInstruction {
            text: sign.description().to_string(),
            distance_m,
            duration_ms: 0,
            sign,
            location: Coordinate::new(lat, 114.0),
            street_name: None,
            turn_angle: None,
        }
    }

    /// About 1.1 km due north, with a turn in the middle.
    fn straight_route() -> Arc<RouteResult> {
        let points = (0..=10)
            .map(|i| Coordinate::new(30.0 + f64::from(i) * 0.001, 114.0))
            .collect::<Vec<_>>();
        let distance = path_length_m(&points);
        Arc::new(RouteResult::new(
            distance,
            120_000,
            points,
            vec![
                instruction(InstructionSign::Depart, 30.0, 556.0),
                instruction(InstructionSign::Right, 30.005, 556.0),
                instruction(InstructionSign::Arrive, 30.01, 0.0),
            ],
            TravelProfile::Car,
        ))
    }

    fn session() -> NavigationSession {
        NavigationSession::new(straight_route(), &MapConfig::default())
    }

    #[test]
    fn new_session_starts_at_route_start() {
        let session = session();
        assert_eq!(session.state(), NavigationState::NotStarted);
        assert_eq!(session.location(), Coordinate::new(30.0, 114.0));
        assert_eq!(session.current_instruction().unwrap().sign, InstructionSign::Depart);
        assert_eq!(session.next_instruction().unwrap().sign, InstructionSign::Right);
        assert_eq!(session.distance_to_next_m(), 556.0);
        assert_eq!(session.remaining_time_ms(), 120_000);
    }

    #[test]
    fn updates_before_start_only_move_location() {
        let mut session = session();
        let here = Coordinate::new(30.0049, 114.0);
        assert_eq!(session.update_location(here), NavigationState::NotStarted);
        assert_eq!(session.location(), here);
        assert_eq!(session.instruction_index(), 0);
    }

    #[test]
    fn approaching_turn_advances_instruction() {
        let mut session = session();
        session.start();
        session.update_location(Coordinate::new(30.0049, 114.0));

        assert_eq!(session.instruction_index(), 1);
        assert_eq!(session.current_instruction().unwrap().sign, InstructionSign::Right);
        let remaining = session.remaining_distance_m();
        assert!((remaining - 567.0).abs() < 5.0, "remaining {remaining}");
        assert!(session.remaining_time_ms() < 120_000);
        assert!(session.distance_to_next_m() > 500.0);
    }

    #[test]
    fn leaving_and_rejoining_route() {
        let mut session = session();
        session.start();
        let east = Coordinate::new(30.003, 114.002);
        assert_eq!(session.update_location(east), NavigationState::OffRoute);
        assert_eq!(session.current_speed_kmh(), 0.0);

        let back = Coordinate::new(30.0035, 114.0001);
        assert_eq!(session.update_location(back), NavigationState::Navigating);
        assert_eq!(session.completed_point_index(), 3);
    }

    #[test]
    fn arrival_zeroes_remaining() {
        let mut session = session();
        session.start();
        session.update_location(Coordinate::new(30.0099, 114.0));

        assert_eq!(session.state(), NavigationState::Arrived);
        assert_eq!(session.remaining_distance_m(), 0.0);
        assert_eq!(session.remaining_time_ms(), 0);
        assert_eq!(session.current_instruction().unwrap().sign, InstructionSign::Arrive);
        assert_eq!(session.formatted_remaining_time(), "Arriving");

        session.start();
        assert_eq!(session.state(), NavigationState::Arrived);
    }

    #[test]
    fn pause_resume_and_stop() {
        let mut session = session();
        session.resume();
        assert_eq!(session.state(), NavigationState::NotStarted);
        session.start();
        session.pause();
        assert_eq!(session.state(), NavigationState::Paused);
        session.update_location(Coordinate::new(30.0049, 114.0));
        assert_eq!(session.instruction_index(), 0);
        session.resume();
        assert_eq!(session.state(), NavigationState::Navigating);
        session.stop();
        assert_eq!(session.state(), NavigationState::NotStarted);
    }

    #[test]
    fn reroute_resets_progress() {
        let mut session = session();
        session.start();
        session.update_location(Coordinate::new(30.0049, 114.0));
        session.reroute();
        assert_eq!(session.instruction_index(), 0);
        assert_eq!(session.location(), Coordinate::new(30.0, 114.0));
        assert_eq!(session.state(), NavigationState::Navigating);
    }

    #[test]
    fn follow_and_overview_are_exclusive() {
        let mut session = session();
        assert!(session.is_following());
        session.toggle_overview();
        assert!(session.is_overview());
        assert!(!session.is_following());
        assert!(matches!(session.camera_op(), Some(StateOp::FitBounds { .. })));

        session.toggle_follow();
        assert!(session.is_following());
        assert!(!session.is_overview());
        assert!(matches!(
            session.camera_op(),
            Some(StateOp::MoveTo {
                zoom: Some(NAVIGATION_ZOOM),
                ..
            })
        ));

        session.on_map_click();
        assert_eq!(session.camera_op(), None);
    }

    #[test]
    fn estimated_arrival_is_clock_time() {
        let session = session();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(session.estimated_arrival(now), "10:02");
    }

    #[test]
    fn unrepresentable_arrival_is_blank() {
        let mut session = session();
        session.remaining_time_ms = i64::MAX;
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(session.estimated_arrival(now), "--:--");
    }

    #[test]
    fn simulated_track_is_evenly_spaced() {
        let session = session();
        let track = session.simulated_track(100.0);
        assert_eq!(track.first().copied(), session.route().start());
        assert_eq!(track.last().copied(), session.route().end());
        assert_eq!(track.len(), 13);
        for pair in track.windows(2) {
            assert!(pair[0].distance_to(pair[1]) <= 100.0 + 1e-6);
        }
    }

    #[test]
    fn handoff_route_is_consumed() {
        let store = HandoffStore::default();
        store.route.set(straight_route());
        let config = MapConfig::default();
        assert!(NavigationSession::from_handoff(&store, &config).is_some());
        assert!(NavigationSession::from_handoff(&store, &config).is_none());
    }
}
