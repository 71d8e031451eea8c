//! User location: permission prompt, one initial fix and a thresholded
//! continuous subscription backed by the host platform.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::{StreamExt, future::BoxFuture, stream::BoxStream};
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    config::LocationConfig,
    shared::{Coordinate, Located},
};

mod filter;
pub use filter::ThresholdFilter;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("Permission to access location was denied")]
    Denied,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error(transparent)]
    Permission(#[from] PermissionError),
    #[error("Error getting location: {0}")]
    Unavailable(String),
}

/// A single reading from the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters.
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

impl Located for Fix {
    fn coordinate(&self) -> Coordinate {
        Coordinate::from((self.latitude, self.longitude))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    Low,
    #[default]
    Balanced,
    High,
}

/// Parameters for the platform's continuous position watch.
#[derive(Debug, Clone, Copy)]
pub struct WatchRequest {
    pub accuracy: Accuracy,
    pub config: LocationConfig,
}

/// Host geolocation service.
pub trait LocationProvider: Send + Sync + 'static {
    fn request_permission(&self) -> BoxFuture<'_, Permission>;

    fn current_fix(&self, accuracy: Accuracy) -> BoxFuture<'_, Result<Fix, LocationError>>;

    fn watch_position(
        &self,
        request: WatchRequest,
    ) -> BoxFuture<'_, Result<BoxStream<'static, Fix>, LocationError>>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TrackerStatus {
    #[default]
    Unrequested,
    Requesting,
    Granted,
    /// Terminal for the session unless the user asks again explicitly.
    Denied,
}

#[derive(Debug, Default, Clone)]
pub struct LocationSnapshot {
    pub status: TrackerStatus,
    pub fix: Option<Fix>,
    pub error: Option<LocationError>,
}

#[derive(Default)]
struct State {
    snapshot: LocationSnapshot,
    generation: u64,
    subscription: Option<JoinHandle<()>>,
}

pub struct LocationTracker<P> {
    provider: Arc<P>,
    config: LocationConfig,
    state: Arc<watch::Sender<State>>,
}

impl<P> LocationTracker<P>
where
    P: LocationProvider,
{
    pub fn new(provider: P, config: LocationConfig) -> Self {
        let (state, _) = watch::channel(State::default());
        Self {
            provider: Arc::new(provider),
            config,
            state: Arc::new(state),
        }
    }

    /// Prompts for permission if needed, publishes an initial fix and opens
    /// the continuous subscription.
    ///
    /// After a denial this returns the denial again without prompting; use
    /// [`LocationTracker::request_again`] for a user-initiated retry.
    pub async fn start(&self) -> Result<(), LocationError> {
        let (status, generation) = {
            let state = self.state.borrow();
            (state.snapshot.status, state.generation)
        };
        match status {
            TrackerStatus::Denied => return Err(PermissionError::Denied.into()),
            TrackerStatus::Requesting => return Ok(()),
            TrackerStatus::Granted => return self.subscribe_updates(generation).await,
            TrackerStatus::Unrequested => {}
        }

        self.state.send_modify(|state| {
            state.snapshot.status = TrackerStatus::Requesting;
            state.snapshot.error = None;
        });
        let permission = self.provider.request_permission().await;
        if !self.is_current(generation) {
            return Ok(());
        }

        if permission == Permission::Denied {
            warn!("Location permission denied");
            self.state.send_modify(|state| {
                state.snapshot.status = TrackerStatus::Denied;
                state.snapshot.error = Some(PermissionError::Denied.into());
            });
            return Err(PermissionError::Denied.into());
        }

        info!("Location permission granted");
        self.state
            .send_modify(|state| state.snapshot.status = TrackerStatus::Granted);

        match self.provider.current_fix(Accuracy::Balanced).await {
            Ok(fix) => {
                self.publish(generation, fix);
            }
            Err(err) => {
                warn!("No initial fix: {err}");
                self.record_error(generation, err);
            }
        }
        if !self.is_current(generation) {
            return Ok(());
        }
        self.subscribe_updates(generation).await
    }

    /// User-initiated permission retry after a denial.
    pub async fn request_again(&self) -> Result<(), LocationError> {
        self.state.send_if_modified(|state| {
            if state.snapshot.status != TrackerStatus::Denied {
                return false;
            }
            state.snapshot.status = TrackerStatus::Unrequested;
            state.snapshot.error = None;
            true
        });
        self.start().await
    }

    async fn subscribe_updates(&self, generation: u64) -> Result<(), LocationError> {
        {
            let state = self.state.borrow();
            if state.generation != generation || state.subscription.is_some() {
                return Ok(());
            }
        }
        let request = WatchRequest {
            accuracy: Accuracy::Balanced,
            config: self.config,
        };
        let mut stream = match self.provider.watch_position(request).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!("Could not watch position: {err}");
                self.record_error(generation, err.clone());
                return Err(err);
            }
        };

        let mut filter = ThresholdFilter::new(self.config);
        if let Some(fix) = self.state.borrow().snapshot.fix.clone() {
            filter.prime(fix);
        }
        let shared = self.state.clone();
        let updates = async move {
            while let Some(fix) = stream.next().await {
                if !filter.accept(&fix) {
                    continue;
                }
                let applied = shared.send_if_modified(|state| {
                    if state.generation != generation {
                        return false;
                    }
                    state.snapshot.fix = Some(fix);
                    true
                });
                if !applied {
                    return;
                }
            }
            debug!("Location stream ended");
            shared.send_if_modified(|state| {
                if state.generation == generation {
                    state.subscription = None;
                }
                false
            });
        };

        // Spawned under the lock so the task cannot clear its slot before
        // the handle is stored.
        let mut subscribed = false;
        self.state.send_if_modified(|state| {
            if state.generation != generation || state.subscription.is_some() {
                return false;
            }
            state.subscription = Some(tokio::spawn(updates));
            subscribed = true;
            false
        });
        if !subscribed {
            debug!("Dropping position watch opened for a released subscription");
        }
        Ok(())
    }

    /// Releases the continuous subscription. Idempotent.
    pub fn stop(&self) {
        if release(&self.state) {
            info!("Location subscription released");
        }
    }

    pub fn snapshot(&self) -> LocationSnapshot {
        self.state.borrow().snapshot.clone()
    }

    pub fn current_fix(&self) -> Option<Fix> {
        self.state.borrow().snapshot.fix.clone()
    }

    pub fn status(&self) -> TrackerStatus {
        self.state.borrow().snapshot.status
    }

    pub fn subscribe(&self) -> LocationReceiver {
        LocationReceiver {
            rx: self.state.subscribe(),
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.borrow().subscription.is_some()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state.borrow().generation == generation
    }

    fn publish(&self, generation: u64, fix: Fix) {
        self.state.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            state.snapshot.fix = Some(fix);
            true
        });
    }

    fn record_error(&self, generation: u64, err: LocationError) {
        self.state.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            state.snapshot.error = Some(err);
            true
        });
    }
}

/// Read side of a tracker, for screens that re-rank on every new fix.
pub struct LocationReceiver {
    rx: watch::Receiver<State>,
}

impl LocationReceiver {
    pub fn latest(&self) -> LocationSnapshot {
        self.rx.borrow().snapshot.clone()
    }

    /// Waits for the next change. `None` once the tracker is gone.
    pub async fn changed(&mut self) -> Option<LocationSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().snapshot.clone())
    }
}

impl<P> Drop for LocationTracker<P> {
    fn drop(&mut self) {
        release(&self.state);
    }
}

fn release(state: &watch::Sender<State>) -> bool {
    let mut task = None;
    state.send_if_modified(|state| {
        state.generation += 1;
        task = state.subscription.take();
        // An unanswered prompt can be asked again on the next start.
        if state.snapshot.status == TrackerStatus::Requesting {
            state.snapshot.status = TrackerStatus::Unrequested;
            return true;
        }
        false
    });
    match task {
        Some(task) => {
            task.abort();
            true
        }
        None => false,
    }
}
