//! Live transit sync for a campus map client.
//!
//! Backend entities are pulled through [`transport::Gateway`] by one
//! [`poller::Poller`] per entity type, ranked against the user's
//! [`location::Fix`] by [`proximity`] and turned into a render model by
//! [`overlay::Overlay`].

pub mod config;
pub mod directions;
pub mod entities;
pub mod location;
pub mod overlay;
pub mod poller;
pub mod predictions;
pub mod proximity;
pub mod shared;
pub mod sources;
pub mod transport;
pub mod views;

pub mod prelude {
    pub use crate::config::{Config, LocationConfig};
    pub use crate::entities::*;
    pub use crate::location::{
        Fix, LocationError, LocationProvider, LocationReceiver, LocationTracker, PermissionError,
        TrackerStatus,
    };
    pub use crate::overlay::{MapSources, Overlay, RenderModel, RouteColor};
    pub use crate::poller::{FetchOutcome, Poller, Schedule, Snapshot};
    pub use crate::predictions::{PredictionBoard, PredictionStatus};
    pub use crate::shared::{Coordinate, Distance, Located};
    pub use crate::sources::MapData;
    pub use crate::transport::{BackendApi, Gateway, TransportError};
}
