use tracing::debug;

use crate::{
    entities::{Building, BusStop, LiveBus, RouteGeometry, RouteId, VehicleId},
    proximity,
    shared::{Coordinate, Located, filter_by_name},
};

mod render;
pub use render::*;
use render::miles;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedVehicle {
    pub vehicle_id: VehicleId,
    pub route: RouteId,
}

/// Snapshot inputs for a render pass. The overlay never mutates these.
#[derive(Debug, Default, Clone, Copy)]
pub struct MapSources<'a> {
    pub buildings: &'a [Building],
    pub buses: &'a [LiveBus],
    pub stops: &'a [BusStop],
    pub geometries: &'a [RouteGeometry],
    pub user: Option<Coordinate>,
}

/// Transient map selection and visibility state.
///
/// Owned by a single writer, the map screen. Readers take clones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    buildings_visible: bool,
    buses_visible: bool,
    search_query: String,
    selected_vehicle: Option<SelectedVehicle>,
    expanded_route: Option<RouteId>,
}

impl Default for Overlay {
    fn default() -> Self {
        Self {
            buildings_visible: true,
            buses_visible: true,
            search_query: String::new(),
            selected_vehicle: None,
            expanded_route: None,
        }
    }
}

impl Overlay {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn buildings_visible(&self) -> bool {
        self.buildings_visible
    }

    pub fn buses_visible(&self) -> bool {
        self.buses_visible
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn selected_vehicle(&self) -> Option<&SelectedVehicle> {
        self.selected_vehicle.as_ref()
    }

    pub fn expanded_route(&self) -> Option<&RouteId> {
        self.expanded_route.as_ref()
    }

    pub fn toggle_buildings(&mut self) {
        self.buildings_visible = !self.buildings_visible;
    }

    pub fn toggle_buses(&mut self) {
        self.buses_visible = !self.buses_visible;
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn clear_search(&mut self) {
        self.search_query.clear();
    }

    /// Selects `bus`. A different vehicle always starts with its route stops
    /// hidden; re-selecting the current vehicle changes nothing.
    pub fn select_vehicle(&mut self, bus: &LiveBus) {
        let selection = SelectedVehicle {
            vehicle_id: bus.vehicle_id.clone(),
            route: bus.route.clone(),
        };
        if self.selected_vehicle.as_ref() == Some(&selection) {
            return;
        }
        debug!("Selected vehicle {} on route {}", bus.vehicle_id, bus.route);
        self.selected_vehicle = Some(selection);
        self.expanded_route = None;
    }

    pub fn deselect_vehicle(&mut self) {
        self.selected_vehicle = None;
        self.expanded_route = None;
    }

    /// Shows or hides the stops of the selected vehicle's route.
    ///
    /// Without a selection nothing happens. Returns the expanded route after
    /// the toggle.
    pub fn toggle_route_stops(&mut self) -> Option<&RouteId> {
        let route = &self.selected_vehicle.as_ref()?.route;
        if self.expanded_route.as_ref() == Some(route) {
            self.expanded_route = None;
        } else {
            self.expanded_route = Some(route.clone());
        }
        self.expanded_route.as_ref()
    }

    /// Buildings whose name contains the search query, ignoring case.
    pub fn filter_buildings<'a>(&self, buildings: &'a [Building]) -> Vec<&'a Building> {
        filter_by_name(&self.search_query, buildings)
    }

    /// Stops of the expanded route, empty when no route is expanded.
    pub fn route_stops<'a>(&self, stops: &'a [BusStop]) -> Vec<&'a BusStop> {
        match &self.expanded_route {
            Some(route) => stops.iter().filter(|stop| &stop.route == route).collect(),
            None => Vec::new(),
        }
    }

    pub fn render(&self, sources: &MapSources<'_>) -> RenderModel {
        let filtered = self.filter_buildings(sources.buildings);
        let counts = Counts {
            buildings_shown: filtered.len(),
            buildings_total: sources.buildings.len(),
            live_buses: sources.buses.len(),
        };

        let buildings = if self.buildings_visible {
            filtered
                .into_iter()
                .map(|building| BuildingMarker {
                    id: building.id,
                    name: building.name.clone(),
                    coordinate: building.coordinate(),
                    distance_miles: miles(
                        sources
                            .user
                            .map(|user| proximity::distance(&user, &building.coordinate())),
                    ),
                })
                .collect()
        } else {
            Vec::new()
        };

        let selected_id = self
            .selected_vehicle
            .as_ref()
            .map(|selected| selected.vehicle_id.as_str());
        let buses = if self.buses_visible {
            sources
                .buses
                .iter()
                .map(|bus| BusMarker {
                    vehicle_id: bus.vehicle_id.clone(),
                    route: bus.route.clone(),
                    coordinate: bus.coordinate(),
                    heading: bus.heading,
                    color: RouteColor::for_route(&bus.route),
                    selected: selected_id == Some(bus.vehicle_id.as_str()),
                })
                .collect()
        } else {
            Vec::new()
        };

        let stops: Vec<StopMarker> = self
            .route_stops(sources.stops)
            .into_iter()
            .map(|stop| StopMarker {
                id: stop.id.clone(),
                code: stop.display_code().to_string(),
                route: stop.route.clone(),
                direction: stop.direction.clone(),
                name: stop.name.clone(),
                coordinate: stop.coordinate(),
            })
            .collect();

        let polylines = match &self.selected_vehicle {
            Some(selected) => sources
                .geometries
                .iter()
                .filter(|geometry| geometry.route_id == selected.route)
                .flat_map(|geometry| {
                    geometry.drawable().map(|(direction, points)| Polyline {
                        route_id: geometry.route_id.clone(),
                        direction: direction.to_string(),
                        color: RouteColor::for_route(&geometry.route_id),
                        points: points.iter().map(|point| (*point).into()).collect(),
                    })
                })
                .collect(),
            None => Vec::new(),
        };

        let selected = self.selected_vehicle.as_ref().map(|selected| {
            let live = sources
                .buses
                .iter()
                .find(|bus| bus.vehicle_id == selected.vehicle_id);
            SelectedCard {
                vehicle_id: selected.vehicle_id.clone(),
                route: selected.route.clone(),
                destination: live.map(|bus| bus.destination.clone()).unwrap_or_default(),
                heading: live.map(|bus| bus.heading).unwrap_or_default(),
                stops_shown: self.expanded_route.as_ref() == Some(&selected.route),
                stop_count: stops.len(),
                live: live.is_some(),
            }
        });

        RenderModel {
            buildings,
            buses,
            stops,
            polylines,
            selected,
            counts,
            user: sources.user,
        }
    }
}
