//! Arrival predictions for many stops at once.
//!
//! Each stop is fetched on its own; one stop failing marks only that stop
//! unavailable and never fails the batch.

use std::{
    collections::{BTreeMap, BTreeSet},
    future::Future,
    sync::Arc,
};

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::{
    config::Config,
    entities::{Prediction, StopId},
    poller::{Poller, Schedule},
    transport::{BackendApi, TransportError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictionStatus {
    /// Arrivals in the order the backend returned them.
    Available(Vec<Prediction>),
    Unavailable(TransportError),
}

/// Latest predictions per stop id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PredictionBoard {
    entries: BTreeMap<StopId, PredictionStatus>,
}

impl PredictionBoard {
    pub fn get(&self, stop_id: &str) -> Option<&PredictionStatus> {
        self.entries.get(stop_id)
    }

    /// Predictions for `stop_id`, `None` when missing or unavailable.
    pub fn predictions(&self, stop_id: &str) -> Option<&[Prediction]> {
        match self.entries.get(stop_id)? {
            PredictionStatus::Available(predictions) => Some(predictions),
            PredictionStatus::Unavailable(_) => None,
        }
    }

    pub fn next_arrival(&self, stop_id: &str) -> Option<&Prediction> {
        self.predictions(stop_id)?.first()
    }

    pub fn is_unavailable(&self, stop_id: &str) -> bool {
        matches!(
            self.entries.get(stop_id),
            Some(PredictionStatus::Unavailable(_))
        )
    }

    pub fn unavailable(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(stop_id, status)| match status {
            PredictionStatus::Unavailable(_) => Some(stop_id.as_str()),
            PredictionStatus::Available(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fetches predictions for every distinct stop id concurrently.
pub async fn fetch_batch<I, S, F, Fut>(stop_ids: I, fetch: F) -> PredictionBoard
where
    I: IntoIterator<Item = S>,
    S: Into<StopId>,
    F: Fn(StopId) -> Fut,
    Fut: Future<Output = Result<Vec<Prediction>, TransportError>>,
{
    let stop_ids: BTreeSet<StopId> = stop_ids.into_iter().map(Into::into).collect();
    let results = join_all(stop_ids.into_iter().map(|stop_id| {
        let request = fetch(stop_id.clone());
        async move { (stop_id, request.await) }
    }))
    .await;

    let mut board = PredictionBoard::default();
    for (stop_id, result) in results {
        let status = match result {
            Ok(predictions) => PredictionStatus::Available(predictions),
            Err(err) => {
                warn!("Error fetching predictions for stop {stop_id}: {err}");
                PredictionStatus::Unavailable(err)
            }
        };
        board.entries.insert(stop_id, status);
    }
    debug!("Fetched predictions for {} stops", board.len());
    board
}

/// Poller that refreshes predictions for a fixed set of stops.
pub fn prediction_poller(
    api: BackendApi,
    stop_ids: Vec<StopId>,
    config: &Config,
) -> Poller<PredictionBoard> {
    let stop_ids: Arc<[StopId]> = stop_ids.into();
    Poller::new("predictions", Schedule::predictions(config), move || {
        let api = api.clone();
        let stop_ids = stop_ids.clone();
        async move {
            let board = fetch_batch(stop_ids.iter().cloned(), |stop_id| {
                let api = api.clone();
                async move { api.predictions(&stop_id).await }
            })
            .await;
            Ok(board)
        }
    })
}
