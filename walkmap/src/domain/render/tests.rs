//! Handle lifecycle and styling coverage for the render synchronizer.

use std::sync::Arc;

use chrono::TimeZone;
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::domain::ports::{LayerKind, MockMapEngine, MockMapFactory};
use crate::domain::{CandidatePoint, Destination, ImageRef, ImageUrl, RouteRecord, SelectionStore};
use crate::test_support::map_engine::{EngineCall, RecordingMapEngine, RecordingMapFactory};

const LENGTHS: [f64; 4] = [300.0, 150.0, 220.0, 410.0];

struct Harness {
    engine: Arc<RecordingMapEngine>,
    factory: Arc<RecordingMapFactory>,
    render: RenderSynchronizer,
    store: SelectionStore,
    center: Coordinate,
}

impl Harness {
    fn apply(&mut self) {
        self.render
            .apply_selection(self.store.selection())
            .expect("apply selection");
    }
}

fn destination(center: Coordinate, offset: usize, length_m: f64) -> Destination {
    let step = 0.001 * (offset as f64 + 1.0);
    let point = Coordinate::new(center.longitude() + step, center.latitude() - step)
        .expect("valid coordinate");
    Destination {
        candidate: CandidatePoint {
            coordinate: point,
            image_ref: Some(ImageRef::new(offset.to_string())),
            distance_m: center.distance_m(point),
        },
        route: RouteRecord::new(point, vec![center, point], length_m).expect("valid route"),
        image: Some(ImageUrl::new(format!("data:image/jpeg;base64,{offset}"))),
    }
}

#[fixture]
fn harness() -> Harness {
    let center = Coordinate::new(-122.4165, 37.7554).expect("valid centre");
    let engine = Arc::new(RecordingMapEngine::new());
    let factory = Arc::new(RecordingMapFactory::new());
    let render = RenderSynchronizer::new(engine.clone(), factory.clone(), RenderStyle::default());
    render.install_layers(center).expect("install layers");

    let mut store = SelectionStore::new();
    let generation = store.begin_search();
    let destinations = LENGTHS
        .iter()
        .enumerate()
        .map(|(offset, length)| destination(center, offset, *length))
        .collect();
    store.install(generation, destinations);

    Harness {
        engine,
        factory,
        render,
        store,
        center,
    }
}

#[fixture]
fn built(mut harness: Harness) -> Harness {
    let selection = harness.store.selection().expect("installed").clone();
    harness
        .render
        .build(&selection, harness.center)
        .expect("build");
    harness
}

fn expected_styles(selected: Option<usize>) -> Vec<(bool, String, f64)> {
    let style = RenderStyle::default();
    (0..LENGTHS.len())
        .map(|index| {
            let is_selected = selected == Some(index);
            let (color, width) = style.route_paint(is_selected);
            (is_selected, color.to_owned(), width)
        })
        .collect()
}

#[rstest]
fn install_layers_registers_sources_and_paint(harness: Harness) {
    let routes = harness.engine.layer(ROUTES).expect("routes layer");
    assert_eq!(routes.kind, LayerKind::Line);
    assert_eq!(routes.paint["line-color"], json!(["get", "color"]));
    assert_eq!(routes.paint["line-width"], json!(["get", "width"]));

    let here = harness.engine.layer(HERE).expect("here layer");
    assert_eq!(here.layout["icon-image"], json!("pulsing-dot"));
    assert_eq!(
        harness.engine.source(HERE).expect("here source").features.len(),
        1
    );
    assert!(harness.engine.calls().contains(&EngineCall::AddImage(PULSING_DOT)));
}

#[rstest]
fn build_creates_one_marker_and_popup_per_destination(built: Harness) {
    assert_eq!(built.engine.marker_count(), LENGTHS.len());
    assert_eq!(built.engine.popup_count(), LENGTHS.len());
    assert!(built.engine.markers().iter().all(|marker| marker.stop_click_propagation));
    assert_eq!(built.render.marker_count(), LENGTHS.len());

    let content = built.engine.popup_content(1).expect("popup for index 1");
    assert_eq!(content.title, "Point 2");
    assert_eq!(content.route_length_m, 150.0);
    assert!(content.image.is_some());
}

#[rstest]
fn build_opens_only_the_shortest_and_fits_everything(built: Harness) {
    assert_eq!(built.engine.open_popups(), vec![1]);
    assert_eq!(built.render.open_popups(), vec![1]);
    assert_eq!(built.engine.route_styles(), expected_styles(Some(1)));

    let fitted = built.engine.fitted_bounds();
    let (bounds, padding) = fitted.last().copied().expect("camera fitted");
    assert_eq!(padding, 80);
    let selection = built.store.selection().expect("installed");
    let expected = Bounds::covering(
        selection
            .destinations()
            .iter()
            .map(|destination| destination.candidate.coordinate)
            .chain([built.center]),
    )
    .expect("non-empty");
    assert_eq!(bounds, expected);
}

#[rstest]
fn open_popup_hosts_a_fixed_zoom_detail_map(built: Harness) {
    let maps = built.factory.maps();
    assert_eq!(maps.len(), 1);
    let (options, detail) = &maps[0];
    assert_eq!(options.zoom, 18.0);
    assert_eq!(options.zoom_range.min, 18.0);
    assert_eq!(options.zoom_range.max, 18.0);

    let selected = built
        .store
        .selection()
        .and_then(SelectionSet::selected)
        .expect("selected destination");
    assert_eq!(options.center, selected.candidate.coordinate);
    assert_eq!(detail.marker_count(), 1);
}

#[rstest]
fn selection_round_trip_restores_styles(mut built: Harness) {
    let initial = built.engine.route_styles();

    built.store.select(2).expect("select 2");
    built.apply();
    assert_eq!(built.engine.route_styles(), expected_styles(Some(2)));
    assert_eq!(built.engine.open_popups(), vec![2]);
    assert_eq!(built.factory.live_maps(), 1);

    built.store.select(1).expect("select 1");
    built.apply();
    assert_eq!(built.engine.route_styles(), initial);
    assert_eq!(built.engine.open_popups(), vec![1]);
    assert_eq!(built.factory.live_maps(), 1);
    assert_eq!(built.factory.created(), 3);
}

#[rstest]
fn clearing_closes_every_popup(mut built: Harness) {
    built.store.clear();
    built.apply();

    assert_eq!(built.engine.route_styles(), expected_styles(None));
    assert!(built.engine.open_popups().is_empty());
    assert_eq!(built.factory.live_maps(), 0);
}

#[rstest]
fn marker_lookup_maps_handles_to_indices(built: Harness) {
    let marker = built.engine.marker_for(3).expect("marker 3");
    assert_eq!(built.render.marker_index(marker), Some(3));
    assert_eq!(built.render.marker_index(MarkerId::new(9_999)), None);
}

#[rstest]
fn popup_close_reports_index_and_unloads_detail(mut built: Harness) {
    let popup = built.engine.popup_for(1).expect("popup 1");
    assert_eq!(built.render.popup_closed(popup).expect("close"), Some(1));
    assert!(built.render.open_popups().is_empty());
    assert_eq!(built.factory.live_maps(), 0);

    assert_eq!(
        built.render.popup_closed(PopupId::new(9_999)).expect("close"),
        None
    );
}

#[rstest]
fn teardown_releases_every_handle(mut built: Harness) {
    built.render.teardown().expect("teardown");

    assert_eq!(built.engine.marker_count(), 0);
    assert_eq!(built.engine.popup_count(), 0);
    assert_eq!(built.render.marker_count(), 0);
    assert!(built.engine.source(ROUTES).expect("routes").features.is_empty());
    assert_eq!(built.factory.live_maps(), 0);
}

#[rstest]
#[case::marker(true)]
#[case::popup(false)]
fn teardown_keeps_going_after_a_failed_removal(mut built: Harness, #[case] lose_marker: bool) {
    if lose_marker {
        let first = built.engine.marker_for(0).expect("marker 0");
        built.engine.remove_marker(first).expect("external removal");
    } else {
        let first = built.engine.popup_for(0).expect("popup 0");
        built.engine.remove_popup(first).expect("external removal");
    }

    let error = built.render.teardown().expect_err("first removal fails");
    assert!(matches!(error, MapEngineError::UnknownHandle { .. }));
    assert_eq!(built.engine.marker_count(), 0);
    assert_eq!(built.engine.popup_count(), 0);
    assert_eq!(built.render.marker_count(), 0);
    assert_eq!(built.factory.live_maps(), 0);
    assert!(built.engine.source(ROUTES).expect("routes").features.is_empty());
}

#[rstest]
fn rebuild_replaces_the_previous_cycle(mut built: Harness) {
    let selection = built.store.selection().expect("installed").clone();
    built.render.build(&selection, built.center).expect("rebuild");

    assert_eq!(built.engine.marker_count(), LENGTHS.len());
    assert_eq!(built.engine.open_popups(), vec![1]);
    assert_eq!(built.factory.live_maps(), 1);
}

#[test]
fn render_frame_uploads_pixels_and_requests_repaint() {
    let mut engine = MockMapEngine::new();
    engine
        .expect_update_image()
        .withf(|id, image| *id == PULSING_DOT && image.width() == crate::domain::PULSE_SIZE_PX)
        .times(1)
        .returning(|_, _| Ok(()));
    engine.expect_trigger_repaint().times(1).return_const(());

    let mut render = RenderSynchronizer::new(
        Arc::new(engine),
        Arc::new(MockMapFactory::new()),
        RenderStyle::default(),
    );
    let now = Utc
        .with_ymd_and_hms(2026, 10, 19, 9, 0, 1)
        .single()
        .expect("valid time");
    render.render_frame(now).expect("frame");
}

#[test]
fn hits_query_the_route_and_centre_layers() {
    let mut engine = MockMapEngine::new();
    engine
        .expect_query_rendered_features()
        .withf(|_, layers| *layers == [ROUTES, HERE])
        .times(1)
        .returning(|_, _| Ok(2));

    let render = RenderSynchronizer::new(
        Arc::new(engine),
        Arc::new(MockMapFactory::new()),
        RenderStyle::default(),
    );
    let hits = render
        .hits_at(ScreenPoint { x: 10.0, y: 20.0 })
        .expect("query");
    assert_eq!(hits, 2);
}
