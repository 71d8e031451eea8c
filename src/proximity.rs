//! Distance ranking shared by the stop lists, the nearest-stop fallback and
//! the map overlay. Everything here is a pure function of its inputs.

use std::{cmp::Ordering, collections::BTreeMap};

use crate::{
    entities::{BusStop, NearestStops, StopWithPredictions},
    shared::{Coordinate, Distance, Located},
};

/// Great-circle distance between two points, in miles.
pub fn distance(a: &Coordinate, b: &Coordinate) -> Distance {
    a.distance(b)
}

/// An item paired with its distance from the ranking origin.
///
/// `distance` is `None` when either end is unknown; callers should show
/// "distance unavailable" instead of hiding the item.
#[derive(Debug)]
pub struct Ranked<'a, T> {
    pub item: &'a T,
    pub distance: Option<Distance>,
}

impl<T> Clone for Ranked<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Ranked<'_, T> {}

fn known(coordinate: Coordinate) -> Option<Coordinate> {
    coordinate.is_valid().then_some(coordinate)
}

fn measure<T: Located>(item: &T, origin: Option<Coordinate>) -> Option<Distance> {
    let origin = origin.and_then(known)?;
    let target = known(item.coordinate())?;
    Some(origin.distance(&target))
}

/// Sorts items by ascending distance from `origin`.
///
/// The sort is stable: equal distances keep input order, items without a
/// usable coordinate go last, and a missing origin leaves the input order
/// untouched.
pub fn rank_by_distance<'a, T, I>(items: I, origin: Option<Coordinate>) -> Vec<Ranked<'a, T>>
where
    T: Located + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut ranked: Vec<Ranked<'a, T>> = items
        .into_iter()
        .map(|item| Ranked {
            item,
            distance: measure(item, origin),
        })
        .collect();
    if origin.and_then(known).is_some() {
        ranked.sort_by(|a, b| match (a.distance, b.distance) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
    }
    ranked
}

/// Closest item to `origin`, first one wins on ties.
pub fn nearest<'a, T, I>(items: I, origin: Coordinate) -> Option<Ranked<'a, T>>
where
    T: Located + 'a,
    I: IntoIterator<Item = &'a T>,
{
    rank_by_distance(items, Some(origin))
        .into_iter()
        .find(|ranked| ranked.distance.is_some())
}

/// Travel direction parsed from a stop's free-form direction name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bound {
    North,
    South,
    East,
    West,
    Other,
}

impl Bound {
    pub fn parse(direction: &str) -> Self {
        let direction = direction.to_lowercase();
        if direction.contains("north") {
            Self::North
        } else if direction.contains("south") {
            Self::South
        } else if direction.contains("east") {
            Self::East
        } else if direction.contains("west") {
            Self::West
        } else {
            Self::Other
        }
    }
}

/// Nearest stop for every direction name present in `stops`.
pub fn nearest_by_direction<'a>(
    stops: &'a [BusStop],
    origin: Coordinate,
) -> BTreeMap<&'a str, Ranked<'a, BusStop>> {
    let mut result: BTreeMap<&'a str, Ranked<'a, BusStop>> = BTreeMap::new();
    for ranked in rank_by_distance(stops, Some(origin)) {
        if ranked.distance.is_none() {
            continue;
        }
        result.entry(ranked.item.direction.as_str()).or_insert(ranked);
    }
    result
}

/// Client-side stand-in for the backend's nearest-stop lookup.
///
/// Predictions are left empty; the caller fills them from the predictions
/// batch when it needs them.
pub fn nearest_stops(stops: &[BusStop], origin: Coordinate) -> NearestStops {
    let pick = |bound: Bound| {
        nearest(
            stops
                .iter()
                .filter(|stop| Bound::parse(&stop.direction) == bound),
            origin,
        )
        .map(|ranked| StopWithPredictions {
            stop: ranked.item.clone(),
            predictions: Vec::new(),
        })
    };
    NearestStops {
        northbound: pick(Bound::North),
        southbound: pick(Bound::South),
    }
}
