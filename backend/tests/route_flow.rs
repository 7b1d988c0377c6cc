use std::{io::Write, time::Duration};

use backend::{route_search, HeadlessSurface, RecordedRoute, SyntheticRouter};
use frontend::{
    HandoffStore, MapCommand, MapConfig, MapEvent, MapStateContainer, NavigationSession,
    NavigationState, RoutePlanner, RouteQuery, RouteSearchError,
};
use shared::{Coordinate, MarkerType, RouteResult, TravelProfile};

const START: Coordinate = Coordinate::new(30.5433, 114.3416);
const END: Coordinate = Coordinate::new(30.5455, 114.3500);

async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

#[tokio::test]
async fn car_route_is_framed_on_the_surface() {
    let (state, link) = MapStateContainer::spawn(MapConfig::default());
    let (surface, _viewport) = HeadlessSurface::new(1280, 800);
    let surface_task = link.attach(surface);
    within(state.wait_until_ready()).await.unwrap();

    let planner = RoutePlanner::new(route_search(None).unwrap(), state.clone());
    let route = within(async {
        planner
            .request_route(RouteQuery::new(START, END, TravelProfile::Car))
            .await
            .unwrap()
            .wait()
            .await
    })
    .await
    .unwrap()
    .unwrap();
    assert!(route.points.len() >= 2);
    assert_eq!(route.profile, TravelProfile::Car);

    drop(planner);
    drop(state);
    let surface = within(surface_task).await.unwrap();

    let log = surface.log();
    let shown = log
        .iter()
        .position(|c| matches!(c, MapCommand::ShowRoute(_)))
        .expect("route shown");
    match &log[shown + 1] {
        MapCommand::FitBounds { bounds, padding } => {
            assert!(bounds.contains(START));
            assert!(bounds.contains(END));
            assert_eq!(*padding, 50);
        }
        other => panic!("expected FitBounds after ShowRoute, got {other:?}"),
    }
    let markers = &surface.viewport().markers;
    assert!(markers.iter().any(|m| m.kind == MarkerType::Start && m.position == START));
    assert!(markers.iter().any(|m| m.kind == MarkerType::End && m.position == END));
}

#[tokio::test]
async fn surface_camera_reports_fold_back_into_state() {
    let (state, link) = MapStateContainer::spawn(MapConfig::default());
    let (surface, mut viewport) = HeadlessSurface::new(1280, 800);
    link.attach(surface);

    let planner = RoutePlanner::new(route_search(None).unwrap(), state.clone());
    planner
        .request_route(RouteQuery::new(START, END, TravelProfile::Bike))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap()
        .unwrap();

    let fitted_zoom = within(viewport.wait_for(|v| v.route.is_some() && v.zoom != frontend::DEFAULT_ZOOM))
        .await
        .unwrap()
        .zoom;
    let mut snapshots = state.subscribe();
    let settled = within(snapshots.wait_for(|s| s.zoom == fitted_zoom))
        .await
        .unwrap()
        .clone();
    assert!(settled.has_route());
    assert!(settled.is_map_ready);
}

#[tokio::test]
async fn long_press_drops_a_pin() {
    let (state, link) = MapStateContainer::spawn(MapConfig::default());
    let (surface, _viewport) = HeadlessSurface::new(800, 600);
    link.attach(surface);
    let mut observer = state.subscribe_events();

    let spot = Coordinate::new(30.56, 114.33);
    state
        .event_sender()
        .emit(MapEvent::MapLongPress(spot))
        .unwrap();

    loop {
        if let MapEvent::MapLongPress(at) = within(observer.recv()).await.unwrap() {
            assert_eq!(at, spot);
            break;
        }
    }
    let snapshot = state.snapshot();
    let pin = snapshot
        .markers
        .iter()
        .find(|m| m.position == spot)
        .expect("pin dropped");
    assert!(!pin.id.is_empty());
}

#[tokio::test]
async fn recorded_library_answers_known_trips() {
    let recorded = RecordedRoute {
        name: "campus loop".into(),
        route: RouteResult::new(
            950.0,
            240_000,
            vec![START, Coordinate::new(30.5440, 114.3460), END],
            Vec::new(),
            TravelProfile::Foot,
        ),
    };
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let json = serde_json::json!({ "routes": [&recorded] });
    write!(file, "{json}").unwrap();

    let (state, _link) = MapStateContainer::spawn(MapConfig::default());
    let planner = RoutePlanner::new(route_search(Some(file.path())).unwrap(), state.clone());

    let route = planner
        .request_route(RouteQuery::new(START, END, TravelProfile::Foot))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(route.as_ref(), &recorded.route);

    let miss = planner
        .request_route(RouteQuery::new(START, END, TravelProfile::Car))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(miss, Err(RouteSearchError::NoRouteFound));
    let snapshot = state.snapshot();
    assert_eq!(snapshot.error.as_deref(), Some("no route found"));
    // The failed request does not take the earlier route off the map.
    assert!(snapshot.has_route());
}

#[tokio::test]
async fn guidance_reaches_the_destination() {
    let config = MapConfig::default();
    let (state, _link) = MapStateContainer::spawn(config.clone());
    let handoff = HandoffStore::new();
    let planner = RoutePlanner::new(
        std::sync::Arc::new(SyntheticRouter::default()),
        state.clone(),
    )
    .with_handoff(handoff.clone());

    planner
        .request_route(RouteQuery::new(START, END, TravelProfile::Foot))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap()
        .unwrap();

    let mut session = NavigationSession::from_handoff(&handoff, &config).unwrap();
    session.start();
    let mut last = session.state();
    for fix in session.simulated_track(10.0) {
        last = session.update_location(fix);
        assert_ne!(last, NavigationState::OffRoute);
        if last == NavigationState::Arrived {
            break;
        }
    }
    assert_eq!(last, NavigationState::Arrived);
    assert_eq!(session.remaining_distance_m(), 0.0);
    assert_eq!(
        session.current_instruction().map(|i| i.sign),
        Some(shared::InstructionSign::Arrive)
    );
}
