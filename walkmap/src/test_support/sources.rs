//! Scripted point, image and route sources for session tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::domain::ports::{
    ImageSource, ImageSourceError, PointSource, PointSourceError, RouteFetchError, RouteFetcher,
};
use crate::domain::{CandidatePoint, Coordinate, ImageRef, ImageUrl, RouteRecord};

fn key(coordinate: Coordinate) -> String {
    coordinate.to_string()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("scripted source mutex"),
    }
}

/// Candidate at `coordinate` carrying image id `image`.
#[must_use]
pub fn candidate(coordinate: Coordinate, image: &str) -> CandidatePoint {
    CandidatePoint {
        coordinate,
        image_ref: Some(ImageRef::new(image)),
        distance_m: 0.0,
    }
}

/// Point source answering per centre, with a fallback for unscripted centres.
#[derive(Default)]
pub struct ScriptedPointSource {
    by_center: Mutex<HashMap<String, Result<Vec<CandidatePoint>, PointSourceError>>>,
    fallback: Vec<CandidatePoint>,
    calls: AtomicUsize,
}

impl ScriptedPointSource {
    /// Answer every centre with `points`.
    #[must_use]
    pub fn new(points: Vec<CandidatePoint>) -> Self {
        Self {
            fallback: points,
            ..Self::default()
        }
    }

    /// Answer `center` with `points` instead of the fallback.
    #[must_use]
    pub fn with_center(self, center: Coordinate, points: Vec<CandidatePoint>) -> Self {
        lock(&self.by_center).insert(key(center), Ok(points));
        self
    }

    /// Fail every lookup at `center` with `error`.
    #[must_use]
    pub fn failing_at(self, center: Coordinate, error: PointSourceError) -> Self {
        lock(&self.by_center).insert(key(center), Err(error));
        self
    }

    /// Number of lookups served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PointSource for ScriptedPointSource {
    async fn fetch_points(
        &self,
        center: Coordinate,
    ) -> Result<Vec<CandidatePoint>, PointSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.by_center)
            .get(&key(center))
            .cloned()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// Image source answering with a placeholder URL unless an id is scripted to
/// fail.
#[derive(Default)]
pub struct StaticImageSource {
    failing: Mutex<HashMap<String, ImageSourceError>>,
}

impl StaticImageSource {
    /// Source where every id succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail fetches of `id` with `error`.
    #[must_use]
    pub fn failing_for(self, id: &str, error: ImageSourceError) -> Self {
        lock(&self.failing).insert(id.to_owned(), error);
        self
    }

    /// URL returned for a successful fetch of `id`.
    #[must_use]
    pub fn url_for(id: &str) -> ImageUrl {
        ImageUrl::new(format!("data:image/jpeg;base64,{id}"))
    }
}

#[async_trait]
impl ImageSource for StaticImageSource {
    async fn fetch_image(&self, image: &ImageRef) -> Result<ImageUrl, ImageSourceError> {
        match lock(&self.failing).get(image.as_str()) {
            Some(error) => Err(error.clone()),
            None => Ok(Self::url_for(image.as_str())),
        }
    }
}

/// Test-side handle for a gated route fetch.
pub struct RouteGate {
    entered: mpsc::UnboundedReceiver<Coordinate>,
    open: watch::Sender<bool>,
}

impl RouteGate {
    /// Wait until a gated fetch has started; returns its destination.
    ///
    /// # Panics
    ///
    /// Panics when the fetcher was dropped before any gated fetch started.
    pub async fn wait_entered(&mut self) -> Coordinate {
        match self.entered.recv().await {
            Some(end) => end,
            None => panic!("route gate closed before any fetch entered"),
        }
    }

    /// Let every waiting and future gated fetch complete.
    pub fn open(&self) {
        self.open.send_replace(true);
    }
}

struct GateHooks {
    entered: mpsc::UnboundedSender<Coordinate>,
    open: watch::Receiver<bool>,
}

/// Route fetcher with scripted lengths or failures per destination.
///
/// Unscripted destinations get a straight line whose length is the haversine
/// distance. Fetches starting at a gated coordinate block until the gate
/// opens.
#[derive(Default)]
pub struct ScriptedRouteFetcher {
    scripted: Mutex<HashMap<String, Result<f64, RouteFetchError>>>,
    gates: Mutex<HashMap<String, GateHooks>>,
    calls: AtomicUsize,
}

impl ScriptedRouteFetcher {
    /// Fetcher with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer routes ending at `end` with `length_m`.
    #[must_use]
    pub fn with_length(self, end: Coordinate, length_m: f64) -> Self {
        lock(&self.scripted).insert(key(end), Ok(length_m));
        self
    }

    /// Fail routes ending at `end` with `error`.
    #[must_use]
    pub fn failing_for(self, end: Coordinate, error: RouteFetchError) -> Self {
        lock(&self.scripted).insert(key(end), Err(error));
        self
    }

    /// Hold every fetch that starts at `start` until the returned gate opens.
    #[must_use]
    pub fn gate(&self, start: Coordinate) -> RouteGate {
        let (entered_tx, entered_rx) = mpsc::unbounded_channel();
        let (open_tx, open_rx) = watch::channel(false);
        lock(&self.gates).insert(
            key(start),
            GateHooks {
                entered: entered_tx,
                open: open_rx,
            },
        );
        RouteGate {
            entered: entered_rx,
            open: open_tx,
        }
    }

    /// Number of route requests served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouteFetcher for ScriptedRouteFetcher {
    async fn fetch_route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<RouteRecord, RouteFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = lock(&self.gates)
            .get(&key(start))
            .map(|hooks| (hooks.entered.clone(), hooks.open.clone()));
        if let Some((entered, mut open)) = gate {
            // The receiver may already be gone when a test stops listening.
            let _ = entered.send(end);
            if open.wait_for(|open| *open).await.is_err() {
                return Err(RouteFetchError::transport("route gate dropped"));
            }
        }

        let scripted = lock(&self.scripted).get(&key(end)).cloned();
        let length_m = match scripted {
            Some(Ok(length_m)) => length_m,
            Some(Err(error)) => return Err(error),
            None => start.distance_m(end),
        };
        RouteRecord::new(end, vec![start, end], length_m)
            .map_err(|error| RouteFetchError::decode(error.to_string()))
    }
}
