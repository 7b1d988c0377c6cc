use std::path::PathBuf;

use backend::{route_search, HeadlessSurface};
use clap::Parser;
use frontend::{
    HandoffStore, MapConfig, MapStateContainer, NavigationSession, NavigationState, RoutePlanner,
    RouteQuery,
};
use shared::{Coordinate, Place, RouteHistoryEntry, TravelProfile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Plan a route, show it on a headless map and replay turn-by-turn guidance"
)]
struct Args {
    #[arg(long, default_value_t = 30.5433)]
    start_lat: f64,
    #[arg(long, default_value_t = 114.3416)]
    start_lon: f64,
    #[arg(long, default_value_t = 30.5455)]
    end_lat: f64,
    #[arg(long, default_value_t = 114.3500)]
    end_lon: f64,

    /// Travel profile: car, bike or foot
    #[arg(long, default_value = "car")]
    profile: TravelProfile,

    /// JSON file of recorded routes to answer from instead of the synthetic router
    #[arg(long)]
    routes: Option<PathBuf>,

    /// Spacing of simulated position fixes, in meters
    #[arg(long, default_value_t = 25.0)]
    step_m: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,frontend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let start = Coordinate::try_new(args.start_lat, args.start_lon)?;
    let end = Coordinate::try_new(args.end_lat, args.end_lon)?;
    let config = MapConfig::from_env();
    let search = route_search(args.routes.as_deref())?;

    let (state, link) = MapStateContainer::spawn(config.clone());
    let (surface, viewport) = HeadlessSurface::new(1280, 800);
    let surface_task = link.attach(surface);
    state.wait_until_ready().await?;

    let handoff = HandoffStore::new();
    let planner = RoutePlanner::new(search, state.clone()).with_handoff(handoff.clone());
    let ticket = planner
        .request_route(RouteQuery::new(start, end, args.profile))
        .await?;
    let route = match ticket.wait().await {
        Some(Ok(route)) => route,
        Some(Err(err)) => {
            tracing::error!("route planning failed: {err}");
            return Err(err.into());
        }
        None => return Err("route request was cancelled".into()),
    };

    tracing::info!(
        "{} route: {} in {}",
        route.profile.display_name(),
        route.formatted_distance(),
        route.formatted_duration()
    );
    for instruction in &route.instructions {
        tracing::info!("  {:>8}  {}", instruction.formatted_distance(), instruction.text);
    }
    handoff.route_history.set(RouteHistoryEntry::record(
        Place::new("Start", start),
        Place::new("Destination", end),
        (*route).clone(),
    ));

    let mut session = NavigationSession::from_handoff(&handoff, &config)
        .ok_or("planned route was not handed off")?;
    tracing::info!(
        "estimated arrival {}",
        session.estimated_arrival(chrono::Local::now())
    );
    session.start();
    for fix in session.simulated_track(args.step_m) {
        let progress = session.update_location(fix);
        if let Some(op) = session.camera_op() {
            state.dispatch(op).await?;
        }
        if let Some(current) = session.current_instruction() {
            tracing::debug!(
                "{} | {} | {} left",
                current.text,
                session.formatted_distance_to_next(),
                session.formatted_remaining_distance()
            );
        }
        if progress == NavigationState::Arrived {
            break;
        }
    }
    tracing::info!("guidance finished in state {:?}", session.state());

    if let Some(entry) = handoff.route_history.consume() {
        tracing::info!("recorded history entry {} ({})", entry.id, entry.title());
    }

    drop(planner);
    drop(state);
    let surface = surface_task.await?;
    let shown = viewport.borrow().clone();
    tracing::info!(
        "surface applied {} commands; final view {} at zoom {}, {} markers",
        surface.log().len(),
        shown.center,
        shown.zoom,
        shown.markers.len()
    );

    Ok(())
}
