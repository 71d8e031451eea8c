use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use futures_util::{FutureExt, future::BoxFuture};
use tokio::{sync::watch, time};
use tracing::{debug, info, warn};

use crate::{config::Config, transport::TransportError};

mod snapshot;
pub use snapshot::{Snapshot, SnapshotReceiver};
use snapshot::State;

type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, TransportError>> + Send + Sync>;

/// How often a source refreshes on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Schedule {
    /// Pause between the end of one fetch and the start of the next.
    /// `None` fetches once on start and then only on [`Poller::refetch`].
    pub interval: Option<Duration>,
}

impl Schedule {
    pub const fn single_shot() -> Self {
        Self { interval: None }
    }

    pub const fn every(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
        }
    }

    pub fn live_buses(config: &Config) -> Self {
        Self::every(config.live_buses_interval)
    }

    pub fn predictions(config: &Config) -> Self {
        Self::every(config.predictions_interval)
    }
}

/// What happened to a single fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// New data replaced the snapshot.
    Applied,
    /// The fetch failed; the previous data is kept.
    Failed(TransportError),
    /// Another fetch was already in flight, or the poller is stopped.
    Skipped,
    /// The poller was stopped while the fetch was in flight.
    Discarded,
}

struct Inner<T> {
    name: String,
    fetch: FetchFn<T>,
    state: watch::Sender<State<T>>,
}

impl<T> Inner<T>
where
    T: Send + Sync + 'static,
{
    fn begin(&self) -> Option<u64> {
        let mut ticket = None;
        self.state.send_if_modified(|state| {
            if !state.running || state.in_flight.is_some() {
                return false;
            }
            state.in_flight = Some(state.generation);
            state.snapshot.loading = true;
            ticket = Some(state.generation);
            true
        });
        ticket
    }

    fn complete(&self, generation: u64, result: Result<T, TransportError>) -> FetchOutcome {
        let mut outcome = FetchOutcome::Discarded;
        self.state.send_if_modified(|state| {
            if !state.running || state.generation != generation {
                return false;
            }
            state.in_flight = None;
            state.snapshot.loading = false;
            match result {
                Ok(data) => {
                    state.snapshot.data = Some(Arc::new(data));
                    state.snapshot.error = None;
                    state.snapshot.updated_at = Some(Utc::now());
                    outcome = FetchOutcome::Applied;
                }
                Err(err) => {
                    state.snapshot.error = Some(err.clone());
                    outcome = FetchOutcome::Failed(err);
                }
            }
            true
        });
        match &outcome {
            FetchOutcome::Applied => debug!("[{}] snapshot replaced", self.name),
            FetchOutcome::Failed(err) => warn!("[{}] keeping previous data: {err}", self.name),
            FetchOutcome::Discarded => {
                debug!("[{}] dropped result of generation {generation}", self.name)
            }
            FetchOutcome::Skipped => {}
        }
        outcome
    }

    async fn fetch_once(&self) -> FetchOutcome {
        let Some(generation) = self.begin() else {
            debug!("[{}] fetch already in flight, skipping", self.name);
            return FetchOutcome::Skipped;
        };
        let mut ticket = Ticket {
            inner: self,
            generation,
            done: false,
        };
        let result = (self.fetch)().await;
        ticket.done = true;
        self.complete(generation, result)
    }

    async fn run(self: Arc<Self>, interval: Option<Duration>) {
        self.fetch_once().await;
        let Some(interval) = interval else {
            return;
        };
        loop {
            time::sleep(interval).await;
            self.fetch_once().await;
        }
    }
}

/// Claim on the in-flight slot.
///
/// Frees the slot if the fetch future is dropped before completing, so a
/// cancelled `refetch` cannot block later ticks.
struct Ticket<'a, T> {
    inner: &'a Inner<T>,
    generation: u64,
    done: bool,
}

impl<T> Drop for Ticket<'_, T> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let generation = self.generation;
        let released = self.inner.state.send_if_modified(|state| {
            if state.in_flight != Some(generation) {
                return false;
            }
            state.in_flight = None;
            state.snapshot.loading = false;
            true
        });
        if released {
            debug!("[{}] fetch cancelled", self.inner.name);
        }
    }
}

/// Periodic fetcher that owns the latest snapshot of one data source.
///
/// `start` fetches immediately and then keeps refreshing on the schedule.
/// At most one fetch is in flight at any time. After `stop` (or drop) no
/// result is ever applied, including results of fetches already in flight.
pub struct Poller<T> {
    inner: Arc<Inner<T>>,
    schedule: Schedule,
}

impl<T> Poller<T>
where
    T: Send + Sync + 'static,
{
    pub fn new<F, Fut>(name: impl Into<String>, schedule: Schedule, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
    {
        let fetch: FetchFn<T> = Arc::new(move || fetch().boxed());
        let (state, _) = watch::channel(State::default());
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                fetch,
                state,
            }),
            schedule,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// Starts polling. Must be called from within a tokio runtime.
    ///
    /// Calling `start` on a running poller does nothing.
    pub fn start(&self) {
        let inner = self.inner.clone();
        let interval = self.schedule.interval;
        let started = self.inner.state.send_if_modified(|state| {
            if state.running {
                return false;
            }
            state.running = true;
            state.task = Some(tokio::spawn(inner.run(interval)));
            true
        });
        if started {
            info!("[{}] polling started ({:?})", self.inner.name, interval);
        }
    }

    /// Stops polling and invalidates every fetch still in flight.
    ///
    /// Idempotent.
    pub fn stop(&self) {
        if halt(&self.inner.state) {
            info!("[{}] polling stopped", self.inner.name);
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.borrow().running
    }

    /// One immediate fetch outside the schedule.
    ///
    /// The timer keeps its own rhythm. If a fetch is already in flight this
    /// returns [`FetchOutcome::Skipped`] without issuing a request.
    pub async fn refetch(&self) -> FetchOutcome {
        self.inner.fetch_once().await
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.inner.state.borrow().snapshot.clone()
    }

    pub fn subscribe(&self) -> SnapshotReceiver<T> {
        SnapshotReceiver::new(self.inner.state.subscribe())
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        halt(&self.inner.state);
    }
}

/// Marks the source stopped, advances its generation and aborts the timer.
fn halt<T>(state: &watch::Sender<State<T>>) -> bool {
    let mut task = None;
    let stopped = state.send_if_modified(|state| {
        if !state.running {
            return false;
        }
        state.running = false;
        state.generation += 1;
        state.in_flight = None;
        state.snapshot.loading = false;
        task = state.task.take();
        true
    });
    if let Some(task) = task {
        task.abort();
    }
    stopped
}
