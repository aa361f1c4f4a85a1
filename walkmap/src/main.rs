//! Headless driver: runs one search cycle against the configured backends and
//! logs every map command it would issue.

use std::ffi::OsString;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use walkmap::WalkMapSettings;
use walkmap::domain::ports::MapFactory;
use walkmap::domain::{Coordinate, GeocodeResult, MapEvent, MapSession, MapSessionPorts};
use walkmap::outbound::headless::TracingMapFactory;
use walkmap::outbound::locations::LocationsHttpSource;
use walkmap::outbound::routing::DirectionsHttpSource;

/// `walkmap` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "walkmap",
    about = "Find nearby walking destinations around a point and log the resulting map",
    version
)]
struct Cli {
    /// Search centre longitude.
    #[arg(long, default_value_t = -122.4165, allow_hyphen_values = true)]
    longitude: f64,
    /// Search centre latitude.
    #[arg(long, default_value_t = 37.7554, allow_hyphen_values = true)]
    latitude: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let target = Coordinate::new(cli.longitude, cli.latitude)
        .wrap_err("search centre is not a valid coordinate")?;

    let settings = WalkMapSettings::load_from_iter([OsString::from("walkmap")])
        .map_err(|error| eyre!("load walkmap settings: {error}"))?;
    let config = settings
        .session_config(target)
        .wrap_err("invalid session settings")?;

    let locations = Arc::new(
        LocationsHttpSource::new(
            settings.locations_base_url()?,
            settings.request_timeout(),
            settings.max_distance_km()?,
        )
        .wrap_err("build locations client")?,
    );
    let routes = Arc::new(
        DirectionsHttpSource::new(
            settings.routing_base_url()?,
            settings.request_timeout(),
            settings.routing_access_token(),
        )
        .wrap_err("build directions client")?,
    );
    let factory = Arc::new(TracingMapFactory::new());
    let engine = factory
        .create_map(&config.map_options())
        .wrap_err("create main map")?;

    let fly_duration = config.fly_duration;
    let ports = MapSessionPorts::new(locations.clone(), locations, routes, engine, factory);
    let session = MapSession::new(ports, Arc::new(DefaultClock), config);

    session.dispatch(MapEvent::Load).await?;
    let outcome = session
        .dispatch(MapEvent::GeocodeResult(GeocodeResult::at(target)))
        .await?;
    info!(outcome = ?outcome, "search dispatched");

    tokio::time::sleep(fly_duration).await;
    let settled = session.dispatch(MapEvent::MoveEnd).await?;
    session.dispatch(MapEvent::RenderFrame).await?;

    let snapshot = session.snapshot()?;
    info!(
        settled = ?settled,
        generation = snapshot.generation.value(),
        center = %snapshot.center,
        destinations = snapshot.destinations,
        selected_index = ?snapshot.selected_index,
        open_popups = ?snapshot.open_popups,
        "search cycle complete"
    );
    Ok(())
}
