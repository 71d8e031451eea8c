use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::{sync::watch, task::JoinHandle};

use crate::transport::TransportError;

/// Point-in-time view of one data source.
///
/// A failed fetch keeps the previous `data` and only sets `error`, so the map
/// never blanks on a transient outage.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub data: Option<Arc<T>>,
    pub error: Option<TransportError>,
    /// A fetch for this source is in flight.
    pub loading: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            loading: self.loading,
            updated_at: self.updated_at,
        }
    }
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
            updated_at: None,
        }
    }
}

impl<T> Snapshot<T> {
    /// Holds data that failed to refresh on the latest attempt.
    pub fn is_stale(&self) -> bool {
        self.data.is_some() && self.error.is_some()
    }
}

impl<E> Snapshot<Vec<E>> {
    pub fn items(&self) -> &[E] {
        self.data.as_deref().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Poller bookkeeping shared between the owner, its timer task and readers.
pub(crate) struct State<T> {
    pub(crate) snapshot: Snapshot<T>,
    /// Bumped on every stop; fetches stamped with an older value are dropped.
    pub(crate) generation: u64,
    pub(crate) in_flight: Option<u64>,
    pub(crate) running: bool,
    pub(crate) task: Option<JoinHandle<()>>,
}

impl<T> Default for State<T> {
    fn default() -> Self {
        Self {
            snapshot: Snapshot::default(),
            generation: 0,
            in_flight: None,
            running: false,
            task: None,
        }
    }
}

/// Read side of a poller.
pub struct SnapshotReceiver<T> {
    rx: watch::Receiver<State<T>>,
}

impl<T> SnapshotReceiver<T> {
    pub(crate) fn new(rx: watch::Receiver<State<T>>) -> Self {
        Self { rx }
    }

    pub fn latest(&self) -> Snapshot<T> {
        self.rx.borrow().snapshot.clone()
    }

    /// Waits for the next change and returns the new snapshot.
    ///
    /// Returns `None` once the poller has been dropped.
    pub async fn changed(&mut self) -> Option<Snapshot<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().snapshot.clone())
    }
}
