//! List screens: the route catalog and the stops of one route.

use crate::{
    entities::{BusStop, LiveBus, Prediction, Route},
    overlay::RouteColor,
    predictions::PredictionBoard,
    proximity::{self, Bound},
    shared::{Coordinate, Distance},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DirectionFilter {
    #[default]
    All,
    North,
    South,
}

impl DirectionFilter {
    pub fn matches(&self, direction: &str) -> bool {
        match self {
            Self::All => true,
            Self::North => Bound::parse(direction) == Bound::North,
            Self::South => Bound::parse(direction) == Bound::South,
        }
    }
}

#[derive(Debug)]
pub struct StopRow<'a> {
    pub stop: &'a BusStop,
    /// `None` while the user position is unknown.
    pub distance: Option<Distance>,
    pub next_arrival: Option<&'a Prediction>,
    pub predictions_unavailable: bool,
}

/// Stops of `route_id` matching `search` and `direction`, closest first.
///
/// Without a fix the stops keep feed order.
pub fn route_stop_list<'a>(
    stops: &'a [BusStop],
    route_id: &str,
    search: &str,
    direction: DirectionFilter,
    user: Option<Coordinate>,
    board: Option<&'a PredictionBoard>,
) -> Vec<StopRow<'a>> {
    let search = search.to_lowercase();
    let matching = stops.iter().filter(|stop| {
        stop.route == route_id
            && stop.name.to_lowercase().contains(&search)
            && direction.matches(&stop.direction)
    });
    proximity::rank_by_distance(matching, user)
        .into_iter()
        .map(|ranked| StopRow {
            stop: ranked.item,
            distance: ranked.distance,
            next_arrival: board.and_then(|board| board.next_arrival(&ranked.item.id)),
            predictions_unavailable: board
                .map(|board| board.is_unavailable(&ranked.item.id))
                .unwrap_or(false),
        })
        .collect()
}

#[derive(Debug)]
pub struct RouteRow<'a> {
    pub route: &'a Route,
    pub active_buses: usize,
    pub color: RouteColor,
}

/// Routes whose id or name contains `search`, optionally only those with a
/// vehicle in the live snapshot.
pub fn route_catalog<'a>(
    routes: &'a [Route],
    buses: &[LiveBus],
    search: &str,
    active_only: bool,
) -> Vec<RouteRow<'a>> {
    let search = search.to_lowercase();
    routes
        .iter()
        .filter(|route| {
            route.id.to_lowercase().contains(&search)
                || route.name.to_lowercase().contains(&search)
        })
        .map(|route| RouteRow {
            route,
            active_buses: buses.iter().filter(|bus| bus.route == route.id).count(),
            color: RouteColor::for_route(&route.id),
        })
        .filter(|row| !active_only || row.active_buses > 0)
        .collect()
}
