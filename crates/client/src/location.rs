use campus_transit::{
    location::{Accuracy, Fix, LocationError, LocationProvider, Permission, WatchRequest},
    shared::Coordinate,
};
use chrono::Utc;
use futures_util::{FutureExt, StreamExt, future::BoxFuture, stream::BoxStream};

/// Stand-in for the platform GPS: a position given on the command line.
///
/// Without a position the permission prompt is answered with a denial, which
/// is what a user refusing the prompt looks like to the tracker.
pub struct FixedLocation {
    position: Option<Coordinate>,
}

impl FixedLocation {
    pub fn new(position: Option<Coordinate>) -> Self {
        Self { position }
    }

    fn fix(&self) -> Result<Fix, LocationError> {
        let position = self
            .position
            .ok_or_else(|| LocationError::Unavailable("No position configured".into()))?;
        Ok(Fix {
            latitude: position.latitude,
            longitude: position.longitude,
            accuracy: 0.0,
            timestamp: Utc::now(),
        })
    }
}

impl LocationProvider for FixedLocation {
    fn request_permission(&self) -> BoxFuture<'_, Permission> {
        let permission = match self.position {
            Some(_) => Permission::Granted,
            None => Permission::Denied,
        };
        async move { permission }.boxed()
    }

    fn current_fix(&self, _: Accuracy) -> BoxFuture<'_, Result<Fix, LocationError>> {
        let fix = self.fix();
        async move { fix }.boxed()
    }

    fn watch_position(
        &self,
        _: WatchRequest,
    ) -> BoxFuture<'_, Result<BoxStream<'static, Fix>, LocationError>> {
        // A fixed position never moves, so the stream stays open and silent.
        async move { Ok(futures_util::stream::pending().boxed()) }.boxed()
    }
}

pub fn parse_coordinate(raw: &str) -> Option<Coordinate> {
    let (latitude, longitude) = raw.split_once(',')?;
    let coordinate = Coordinate {
        latitude: latitude.trim().parse().ok()?,
        longitude: longitude.trim().parse().ok()?,
    };
    coordinate.is_valid().then_some(coordinate)
}
