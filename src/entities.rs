use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::shared::{Coordinate, Located, Named};

pub type StopId = String;
pub type RouteId = String;
pub type VehicleId = String;

/// A campus building as served by `/buildings`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// The unique external identifier.
    pub id: u64,
    /// The display name of the building.
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub address: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Number of footprint nodes the backend traced for this building.
    #[serde(default)]
    pub node_count: u32,
}

impl Named for Building {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Located for Building {
    fn coordinate(&self) -> Coordinate {
        Coordinate::from((self.lat, self.lon))
    }
}

/// Identity of a stop as served for one route and direction.
///
/// The same physical stop shows up once per route and direction it serves,
/// so `id` alone repeats across entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StopKey {
    pub id: StopId,
    pub route: RouteId,
    pub direction: String,
}

/// A bus stop for a single route and direction.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusStop {
    pub id: StopId,
    /// Rider-facing stop code, when the backend provides one.
    #[serde(default)]
    pub stop_id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub route: RouteId,
    /// Direction name such as "Northbound".
    #[serde(default)]
    pub direction: String,
}

impl BusStop {
    pub fn key(&self) -> StopKey {
        StopKey {
            id: self.id.clone(),
            route: self.route.clone(),
            direction: self.direction.clone(),
        }
    }

    /// Code shown to riders, falling back to the feed id.
    pub fn display_code(&self) -> &str {
        if self.stop_id.is_empty() {
            &self.id
        } else {
            &self.stop_id
        }
    }
}

impl Located for BusStop {
    fn coordinate(&self) -> Coordinate {
        Coordinate::from((self.lat, self.lon))
    }
}

/// A vehicle position from the live feed.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveBus {
    pub vehicle_id: VehicleId,
    pub route: RouteId,
    pub lat: f64,
    pub lon: f64,
    /// Compass heading in whole degrees, always within 0..360.
    #[serde(deserialize_with = "normalized_heading")]
    pub heading: u16,
    #[serde(default)]
    pub destination: String,
}

impl Located for LiveBus {
    fn coordinate(&self) -> Coordinate {
        Coordinate::from((self.lat, self.lon))
    }
}

/// A single upcoming arrival at a stop.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub route: RouteId,
    pub minutes: u32,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub delayed: bool,
    #[serde(default)]
    pub vehicle_id: Option<VehicleId>,
    #[serde(default)]
    pub direction: Option<String>,
}

/// Body of `/bus-stops/:id/predictions`.
///
/// The backend wraps the list together with the stop; older deployments
/// return the bare list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum PredictionsBody {
    List(Vec<Prediction>),
    WithStop { predictions: Vec<Prediction> },
}

impl From<PredictionsBody> for Vec<Prediction> {
    fn from(value: PredictionsBody) -> Self {
        match value {
            PredictionsBody::List(predictions) => predictions,
            PredictionsBody::WithStop { predictions } => predictions,
        }
    }
}

/// Body of `/bus-stops/nearest`: either the backend's per-direction pick or
/// a plain list of candidate stops.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum NearestStopsBody {
    List(Vec<BusStop>),
    Split(NearestStops),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl From<GeoPoint> for Coordinate {
    fn from(value: GeoPoint) -> Self {
        Coordinate::from((value.lat, value.lon))
    }
}

/// Shape of a route, one polyline per direction.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteGeometry {
    pub route_id: RouteId,
    pub geometry: BTreeMap<String, Vec<GeoPoint>>,
}

impl RouteGeometry {
    /// Directions with enough points to draw a line.
    pub fn drawable(&self) -> impl Iterator<Item = (&str, &[GeoPoint])> {
        self.geometry
            .iter()
            .filter(|(_, points)| points.len() >= 2)
            .map(|(direction, points)| (direction.as_str(), points.as_slice()))
    }
}

/// A catalog entry from `/routes`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopWithPredictions {
    pub stop: BusStop,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

/// Closest stop in each travel direction.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestStops {
    #[serde(default)]
    pub northbound: Option<StopWithPredictions>,
    #[serde(default)]
    pub southbound: Option<StopWithPredictions>,
}

/// Body of `/buildings/:id`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingDetail {
    pub building: Building,
    #[serde(default)]
    pub nearest_stops: NearestStops,
}

fn normalized_heading<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() {
        return Ok(0);
    }
    Ok((raw.rem_euclid(360.0) as u16) % 360)
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|value| !value.trim().is_empty()))
}

#[test]
fn heading_is_normalized() {
    let bus: LiveBus = serde_json::from_str(
        r#"{"vehicle_id":"8012","route":"201","lat":42.05,"lon":-87.67,"heading":-90,"destination":"Howard"}"#,
    )
    .unwrap();
    assert_eq!(bus.heading, 270);
}

#[test]
fn prediction_envelope_decodes() {
    let body: PredictionsBody = serde_json::from_str(
        r#"{"stop":{"id":"1"},"predictions":[{"route":"201","minutes":4}]}"#,
    )
    .unwrap();
    let predictions: Vec<Prediction> = body.into();
    assert_eq!(predictions.len(), 1);
    assert!(!predictions[0].delayed);
}
