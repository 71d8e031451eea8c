use std::fmt::Display;

use serde::Serialize;

use crate::{
    entities::{RouteId, StopKey, VehicleId},
    shared::{Coordinate, Distance},
};

/// Stroke/fill colour for everything drawn for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteColor(pub &'static str);

impl RouteColor {
    /// Used for every route without an assigned colour.
    pub const DEFAULT: Self = Self("#666666");

    /// Colour for `route`. Total: unknown routes get [`RouteColor::DEFAULT`].
    pub fn for_route(route: &str) -> Self {
        match route {
            "201" => Self("#996633"),
            "205" => Self("#DC143C"),
            "208" => Self("#1E90FF"),
            "213" => Self("#228B22"),
            _ => Self::DEFAULT,
        }
    }
}

impl Display for RouteColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingMarker {
    pub id: u64,
    pub name: String,
    pub coordinate: Coordinate,
    /// Miles from the user, `None` while there is no fix.
    pub distance_miles: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusMarker {
    pub vehicle_id: VehicleId,
    pub route: RouteId,
    pub coordinate: Coordinate,
    pub heading: u16,
    pub color: RouteColor,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopMarker {
    pub id: String,
    /// Code printed on the stop sign.
    pub code: String,
    pub route: RouteId,
    pub direction: String,
    pub name: String,
    pub coordinate: Coordinate,
}

impl StopMarker {
    pub fn key(&self) -> StopKey {
        StopKey {
            id: self.id.clone(),
            route: self.route.clone(),
            direction: self.direction.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polyline {
    pub route_id: RouteId,
    pub direction: String,
    pub color: RouteColor,
    pub points: Vec<Coordinate>,
}

/// Info card for the selected vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedCard {
    pub vehicle_id: VehicleId,
    pub route: RouteId,
    pub destination: String,
    pub heading: u16,
    pub stops_shown: bool,
    pub stop_count: usize,
    /// The vehicle is still present in the latest live snapshot.
    pub live: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub buildings_shown: usize,
    pub buildings_total: usize,
    pub live_buses: usize,
}

/// Everything the host map needs for one frame.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RenderModel {
    pub buildings: Vec<BuildingMarker>,
    pub buses: Vec<BusMarker>,
    pub stops: Vec<StopMarker>,
    pub polylines: Vec<Polyline>,
    pub selected: Option<SelectedCard>,
    pub counts: Counts,
    pub user: Option<Coordinate>,
}

pub(crate) fn miles(distance: Option<Distance>) -> Option<f64> {
    distance.map(|distance| distance.as_miles())
}
