//! One poller per backend entity type, wired with the default schedules.

use std::future::Future;

use crate::{
    config::Config,
    entities::{Building, BuildingDetail, BusStop, LiveBus, Route, RouteGeometry, RouteId},
    poller::{Poller, Schedule},
    transport::{BackendApi, TransportError},
};

fn api_poller<T, F, Fut>(
    name: impl Into<String>,
    schedule: Schedule,
    api: &BackendApi,
    call: F,
) -> Poller<T>
where
    T: Send + Sync + 'static,
    F: Fn(BackendApi) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
{
    let api = api.clone();
    Poller::new(name, schedule, move || call(api.clone()))
}

/// The map screen's data sources.
pub struct MapData {
    pub buildings: Poller<Vec<Building>>,
    pub stops: Poller<Vec<BusStop>>,
    pub routes: Poller<Vec<Route>>,
    pub live_buses: Poller<Vec<LiveBus>>,
}

impl MapData {
    pub fn new(api: &BackendApi, config: &Config) -> Self {
        Self {
            buildings: api_poller("buildings", Schedule::single_shot(), api, |api| async move {
                api.buildings().await
            }),
            stops: api_poller("bus-stops", Schedule::single_shot(), api, |api| async move {
                api.bus_stops().await
            }),
            routes: api_poller("routes", Schedule::single_shot(), api, |api| async move {
                api.routes().await
            }),
            live_buses: api_poller(
                "live-buses",
                Schedule::live_buses(config),
                api,
                |api| async move { api.live_buses().await },
            ),
        }
    }

    pub fn start(&self) {
        self.buildings.start();
        self.stops.start();
        self.routes.start();
        self.live_buses.start();
    }

    pub fn stop(&self) {
        self.buildings.stop();
        self.stops.stop();
        self.routes.stop();
        self.live_buses.stop();
    }
}

/// Shape of a single route, fetched once.
pub fn geometry_poller(api: &BackendApi, route_id: RouteId) -> Poller<RouteGeometry> {
    api_poller(
        format!("geometry-{route_id}"),
        Schedule::single_shot(),
        api,
        move |api| {
            let route_id = route_id.clone();
            async move { api.route_geometry(&route_id).await }
        },
    )
}

/// Building detail with its nearest stops, refreshed as often as predictions.
pub fn building_detail_poller(
    api: &BackendApi,
    building_id: u64,
    config: &Config,
) -> Poller<BuildingDetail> {
    api_poller(
        format!("building-{building_id}"),
        Schedule::predictions(config),
        api,
        move |api| async move { api.building_detail(building_id).await },
    )
}
