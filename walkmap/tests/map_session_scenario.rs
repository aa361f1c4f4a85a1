//! End-to-end search cycle driven through the public session API.

use std::sync::Arc;

use rstest::{fixture, rstest};
use walkmap::domain::ports::ScreenPoint;
use walkmap::domain::{
    Coordinate, Dispatch, GeocodeResult, MapEvent, MapSession, MapSessionConfig, MapSessionPorts,
    SearchOutcome, SelectionChange,
};
use walkmap::test_support::clock::MutableClock;
use walkmap::test_support::map_engine::{RecordingMapEngine, RecordingMapFactory};
use walkmap::test_support::sources::{
    ScriptedPointSource, ScriptedRouteFetcher, StaticImageSource, candidate,
};

struct World {
    session: MapSession,
    engine: Arc<RecordingMapEngine>,
    factory: Arc<RecordingMapFactory>,
    clock: Arc<MutableClock>,
    center: Coordinate,
}

fn coordinate(longitude: f64, latitude: f64) -> Coordinate {
    Coordinate::new(longitude, latitude).expect("valid coordinate")
}

#[fixture]
fn world() -> World {
    let center = coordinate(-122.4165, 37.7554);
    let points = [
        coordinate(-122.4190, 37.7570),
        coordinate(-122.4140, 37.7531),
        coordinate(-122.4128, 37.7590),
    ];
    let routes = points
        .iter()
        .zip([300.0, 150.0, 150.0])
        .fold(ScriptedRouteFetcher::new(), |routes, (point, length)| {
            routes.with_length(*point, length)
        });
    let candidates = points
        .iter()
        .enumerate()
        .map(|(index, point)| candidate(*point, &format!("dolores-{index}")))
        .collect();

    let engine = Arc::new(RecordingMapEngine::new());
    let factory = Arc::new(RecordingMapFactory::new());
    let clock = Arc::new(MutableClock::at_epoch());
    let ports = MapSessionPorts::new(
        Arc::new(ScriptedPointSource::new(candidates)),
        Arc::new(StaticImageSource::new()),
        Arc::new(routes),
        engine.clone(),
        factory.clone(),
    );
    let config = MapSessionConfig::centered_on(coordinate(-122.4194, 37.7749));
    let session = MapSession::new(ports, clock.clone(), config);

    World {
        session,
        engine,
        factory,
        clock,
        center,
    }
}

#[rstest]
#[tokio::test]
async fn search_select_and_clear(world: World) {
    let World {
        session,
        engine,
        factory,
        clock,
        center,
    } = world;

    assert_eq!(
        session.dispatch(MapEvent::Load).await.expect("load"),
        Dispatch::Loaded
    );

    let outcome = session
        .dispatch(MapEvent::GeocodeResult(GeocodeResult::at(center)))
        .await
        .expect("search");
    assert!(matches!(
        outcome,
        Dispatch::Search(SearchOutcome::Installed {
            destinations: 3,
            selected_index: 1,
            ..
        })
    ));
    assert_eq!(engine.marker_count(), 3);
    assert_eq!(engine.open_popups(), vec![1]);

    clock.advance(session.config().fly_duration);
    assert_eq!(
        session.dispatch(MapEvent::MoveEnd).await.expect("settle"),
        Dispatch::Unlocked
    );

    let marker = engine.marker_for(2).expect("third marker");
    let selected = session
        .dispatch(MapEvent::MarkerClicked { marker })
        .await
        .expect("marker click");
    assert_eq!(
        selected,
        Dispatch::Selection(SelectionChange {
            previous: Some(1),
            current: Some(2),
        })
    );
    assert_eq!(engine.open_popups(), vec![2]);
    assert_eq!(factory.live_maps(), 1);

    engine.set_hits(0);
    let cleared = session
        .dispatch(MapEvent::Click {
            point: ScreenPoint { x: 12.0, y: 340.0 },
        })
        .await
        .expect("background click");
    assert_eq!(
        cleared,
        Dispatch::Selection(SelectionChange {
            previous: Some(2),
            current: None,
        })
    );
    assert!(engine.open_popups().is_empty());
    assert!(
        engine
            .route_styles()
            .iter()
            .all(|(selected, _, _)| !selected)
    );

    let snapshot = session.snapshot().expect("snapshot");
    assert_eq!(snapshot.center, center);
    assert_eq!(snapshot.selected_index, None);
    assert!(!snapshot.locked);
}
