use std::{
    cmp,
    f64::consts::PI,
    fmt::Display,
    ops::{Add, Sub},
};

use serde::{Deserialize, Serialize};

/// Mean earth radius used by every distance computation in the crate.
pub const EARTH_RADIUS: Distance = Distance::from_miles(3958.8);
pub(crate) const METERS_PER_MILE: f64 = 1609.344;

#[derive(Debug, Clone, Copy, Default)]
pub struct Distance(f64);

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl Add for Distance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Distance {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self((self.0 - rhs.0).max(0.0))
    }
}

impl Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{:.2} mi", self.0))
    }
}

impl Distance {
    pub const fn from_miles(distance: f64) -> Self {
        Self(distance)
    }

    pub const fn from_meters(distance: f64) -> Self {
        Self(distance / METERS_PER_MILE)
    }

    pub const fn as_miles(&self) -> f64 {
        self.0
    }

    pub const fn as_meters(&self) -> f64 {
        self.0 * METERS_PER_MILE
    }

    pub fn total_cmp(&self, other: &Self) -> cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}, {}", self.latitude, self.longitude))
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<Coordinate> for (f64, f64) {
    fn from(value: Coordinate) -> Self {
        (value.latitude, value.longitude)
    }
}

impl Coordinate {
    /// Great-circle distance using the haversine formula.
    ///
    /// `h` is clamped to 1 before `asin` so rounding on antipodal points can
    /// never push the result past half the earth's circumference.
    pub fn distance(&self, coord: &Self) -> Distance {
        let dist_lat = f64::to_radians(coord.latitude - self.latitude);
        let dist_lon = f64::to_radians(coord.longitude - self.longitude);
        let h = f64::powi(f64::sin(dist_lat / 2.0), 2)
            + f64::cos(f64::to_radians(self.latitude))
                * f64::cos(f64::to_radians(coord.latitude))
                * f64::powi(f64::sin(dist_lon / 2.0), 2);
        let c = 2.0 * f64::asin(f64::min(1.0, f64::sqrt(h)));
        Distance::from_miles(EARTH_RADIUS.as_miles() * c)
    }

    /// Whether both components are inside the valid degree ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Longest distance [`Coordinate::distance`] can ever report.
pub fn max_distance() -> Distance {
    Distance::from_miles(PI * EARTH_RADIUS.as_miles())
}

#[test]
fn distance_test() {
    // Tech to Norris, roughly 0.3 miles apart.
    let tech = Coordinate::from((42.0577, -87.6753));
    let norris = Coordinate::from((42.0535, -87.6728));
    let d = tech.distance(&norris);
    assert!((d.as_miles() - 0.317).abs() < 0.317 * 0.05);
}

#[test]
fn distance_eq_test() {
    let dist_a = Distance::from_meters(METERS_PER_MILE);
    let dist_b = Distance::from_miles(1.0);
    assert_eq!(dist_a, dist_b)
}

#[test]
fn distance_cmp_test() {
    let dist_a = Distance::from_meters(1000.0);
    let dist_b = Distance::from_miles(0.5);
    assert!(dist_a > dist_b)
}
