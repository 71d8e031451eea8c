mod location;

use crate::location::{FixedLocation, parse_coordinate};
use campus_transit::{prelude::*, proximity};
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt().init();

    info!("Starting client...");
    let args: Vec<_> = std::env::args().collect();
    let config = match args.get(1) {
        Some(base_url) => Config::default().with_base_url(base_url.as_str()),
        None => Config::default(),
    };
    let position = args.get(2).and_then(|raw| parse_coordinate(raw));
    if args.get(2).is_some() && position.is_none() {
        error!("Position must look like <lat>,<lon>");
        std::process::exit(1);
    }

    let gateway = match Gateway::new(&config) {
        Ok(gateway) => gateway,
        Err(err) => {
            error!("Failed to create http client: {err}");
            std::process::exit(1);
        }
    };
    info!("Using backend {}", gateway.base_url());
    let api = BackendApi::new(gateway);

    let data = MapData::new(&api, &config);
    data.start();

    let tracker = LocationTracker::new(FixedLocation::new(position), config.location);
    if let Err(err) = tracker.start().await {
        warn!("Continuing without location: {err}");
    }

    let overlay = Overlay::new();
    let mut live_buses = data.live_buses.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            snapshot = live_buses.changed() => {
                let Some(snapshot) = snapshot else { break };
                if snapshot.loading {
                    continue;
                }
                if let Some(err) = &snapshot.error {
                    warn!("Live buses unavailable, showing last known positions: {err}");
                }

                let buildings = data.buildings.snapshot();
                let stops = data.stops.snapshot();
                let user = tracker.current_fix().map(|fix| fix.coordinate());
                let model = overlay.render(&MapSources {
                    buildings: buildings.items(),
                    buses: snapshot.items(),
                    stops: stops.items(),
                    geometries: &[],
                    user,
                });
                info!(
                    "{} buildings | {} live buses",
                    model.counts.buildings_shown, model.counts.live_buses
                );

                if let Some(user) = user {
                    let nearest = proximity::nearest_stops(stops.items(), user);
                    let picks = [
                        ("Northbound", nearest.northbound),
                        ("Southbound", nearest.southbound),
                    ];
                    for (bound, pick) in picks {
                        let Some(pick) = pick else { continue };
                        let distance = proximity::distance(&user, &pick.stop.coordinate());
                        info!("Nearest {bound} stop: {} ({distance})", pick.stop.name);
                    }
                }
            }
        }
    }

    info!("Shutting down...");
    tracker.stop();
    data.stop();
}
