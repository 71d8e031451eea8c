use super::{Gateway, TransportError};
use crate::{
    entities::{
        Building, BuildingDetail, BusStop, LiveBus, NearestStops, NearestStopsBody, Prediction,
        PredictionsBody, Route, RouteGeometry,
    },
    proximity,
    shared::Coordinate,
};

/// Typed view over the backend's REST surface.
#[derive(Debug, Clone)]
pub struct BackendApi {
    gateway: Gateway,
}

impl BackendApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub async fn buildings(&self) -> Result<Vec<Building>, TransportError> {
        self.gateway.get("buildings", &[]).await
    }

    pub async fn search_buildings(&self, query: &str) -> Result<Vec<Building>, TransportError> {
        self.gateway
            .get("buildings/search", &[("q", query.to_string())])
            .await
    }

    pub async fn building_detail(&self, id: u64) -> Result<BuildingDetail, TransportError> {
        self.gateway.get(&format!("buildings/{id}"), &[]).await
    }

    pub async fn bus_stops(&self) -> Result<Vec<BusStop>, TransportError> {
        self.gateway.get("bus-stops", &[]).await
    }

    /// Nearest stop per direction around `at`.
    ///
    /// When the backend answers with a bare candidate list the pick is made
    /// locally with the same proximity ranking the stop lists use.
    pub async fn nearest_stops(&self, at: Coordinate) -> Result<NearestStops, TransportError> {
        let body: NearestStopsBody = self
            .gateway
            .get(
                "bus-stops/nearest",
                &[
                    ("lat", at.latitude.to_string()),
                    ("lon", at.longitude.to_string()),
                ],
            )
            .await?;
        Ok(match body {
            NearestStopsBody::Split(nearest) => nearest,
            NearestStopsBody::List(stops) => proximity::nearest_stops(&stops, at),
        })
    }

    pub async fn routes(&self) -> Result<Vec<Route>, TransportError> {
        self.gateway.get("routes", &[]).await
    }

    pub async fn live_buses(&self) -> Result<Vec<LiveBus>, TransportError> {
        self.gateway.get("buses/live", &[]).await
    }

    pub async fn route_buses(&self, route_id: &str) -> Result<Vec<LiveBus>, TransportError> {
        self.gateway
            .get(&format!("routes/{route_id}/buses"), &[])
            .await
    }

    pub async fn predictions(&self, stop_id: &str) -> Result<Vec<Prediction>, TransportError> {
        let body: PredictionsBody = self
            .gateway
            .get(&format!("bus-stops/{stop_id}/predictions"), &[])
            .await?;
        Ok(body.into())
    }

    pub async fn route_geometry(&self, route_id: &str) -> Result<RouteGeometry, TransportError> {
        self.gateway
            .get(&format!("routes/{route_id}/geometry"), &[])
            .await
    }
}
