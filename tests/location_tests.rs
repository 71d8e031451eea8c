use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering::SeqCst},
    },
};

use campus_transit::{
    config::LocationConfig,
    location::{
        Accuracy, Fix, LocationError, LocationProvider, LocationTracker, Permission,
        PermissionError, TrackerStatus, WatchRequest,
    },
};
use chrono::{DateTime, TimeDelta, Utc};
use futures_util::{
    FutureExt, StreamExt,
    future::BoxFuture,
    stream::{self, BoxStream},
};
use tokio::sync::{Notify, mpsc};

type Watchers = Arc<Mutex<Vec<mpsc::UnboundedSender<Fix>>>>;

struct MockProvider {
    answers: Mutex<VecDeque<Permission>>,
    prompts: Arc<AtomicUsize>,
    initial: Option<Fix>,
    watchers: Watchers,
    /// When set, the prompt stays open until notified.
    prompt_gate: Option<Arc<Notify>>,
    /// When set, the initial fix is held back until notified.
    fix_gate: Option<Arc<Notify>>,
}

impl MockProvider {
    fn new(answers: impl IntoIterator<Item = Permission>, initial: Option<Fix>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Arc::default(),
            initial,
            watchers: Arc::default(),
            prompt_gate: None,
            fix_gate: None,
        }
    }
}

impl LocationProvider for MockProvider {
    fn request_permission(&self) -> BoxFuture<'_, Permission> {
        self.prompts.fetch_add(1, SeqCst);
        let answer = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Permission::Granted);
        let gate = self.prompt_gate.clone();
        async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            answer
        }
        .boxed()
    }

    fn current_fix(&self, _: Accuracy) -> BoxFuture<'_, Result<Fix, LocationError>> {
        let fix = self
            .initial
            .clone()
            .ok_or_else(|| LocationError::Unavailable("no signal".into()));
        let gate = self.fix_gate.clone();
        async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            fix
        }
        .boxed()
    }

    fn watch_position(
        &self,
        _: WatchRequest,
    ) -> BoxFuture<'_, Result<BoxStream<'static, Fix>, LocationError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.watchers.lock().unwrap().push(tx);
        let updates = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|fix| (fix, rx))
        })
        .boxed();
        async move { Ok(updates) }.boxed()
    }
}

/// Roughly one meter of latitude in degrees.
const METER: f64 = 1.0 / 111_195.0;

fn fix_at(start: DateTime<Utc>, seconds: i64, meters_north: f64) -> Fix {
    Fix {
        latitude: 42.0577 + meters_north * METER,
        longitude: -87.6753,
        accuracy: 5.0,
        timestamp: start + TimeDelta::seconds(seconds),
    }
}

fn latest_watcher(watchers: &Watchers) -> mpsc::UnboundedSender<Fix> {
    watchers.lock().unwrap().last().unwrap().clone()
}

#[tokio::test]
async fn denial_is_terminal_until_asked_again() {
    let start = Utc::now();
    let provider = MockProvider::new(
        [Permission::Denied, Permission::Granted],
        Some(fix_at(start, 0, 0.0)),
    );
    let prompts = provider.prompts.clone();
    let tracker = LocationTracker::new(provider, LocationConfig::default());

    let denied = Err(LocationError::Permission(PermissionError::Denied));
    assert_eq!(tracker.start().await, denied);
    assert_eq!(tracker.status(), TrackerStatus::Denied);
    assert_eq!(
        tracker.snapshot().error,
        Some(LocationError::Permission(PermissionError::Denied))
    );

    assert_eq!(tracker.start().await, denied);
    assert_eq!(prompts.load(SeqCst), 1);
    assert!(tracker.current_fix().is_none());

    assert_eq!(tracker.request_again().await, Ok(()));
    assert_eq!(prompts.load(SeqCst), 2);
    assert_eq!(tracker.status(), TrackerStatus::Granted);
    assert_eq!(tracker.current_fix(), Some(fix_at(start, 0, 0.0)));
    assert!(tracker.is_subscribed());
}

#[tokio::test]
async fn updates_pass_on_time_or_distance() {
    let start = Utc::now();
    let provider = MockProvider::new([], Some(fix_at(start, 0, 0.0)));
    let watchers = provider.watchers.clone();
    let tracker = LocationTracker::new(provider, LocationConfig::default());
    tracker.start().await.unwrap();
    let mut updates = tracker.subscribe();
    let sender = latest_watcher(&watchers);

    // Too soon and too close.
    sender.send(fix_at(start, 1, 1.0)).unwrap();
    // Moved far enough.
    sender.send(fix_at(start, 2, 20.0)).unwrap();
    let snapshot = updates.changed().await.unwrap();
    assert_eq!(snapshot.fix, Some(fix_at(start, 2, 20.0)));

    // Same place, only one second later.
    sender.send(fix_at(start, 3, 20.0)).unwrap();
    // Same place, six seconds after the last update.
    sender.send(fix_at(start, 8, 20.0)).unwrap();
    let snapshot = updates.changed().await.unwrap();
    assert_eq!(snapshot.fix, Some(fix_at(start, 8, 20.0)));
    assert_eq!(snapshot.status, TrackerStatus::Granted);
}

#[tokio::test]
async fn missing_initial_fix_still_subscribes() {
    let provider = MockProvider::new([], None);
    let tracker = LocationTracker::new(provider, LocationConfig::default());
    assert_eq!(tracker.start().await, Ok(()));
    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.status, TrackerStatus::Granted);
    assert!(snapshot.fix.is_none());
    assert!(matches!(snapshot.error, Some(LocationError::Unavailable(_))));
    assert!(tracker.is_subscribed());
}

#[tokio::test]
async fn stop_releases_subscription_once() {
    let start = Utc::now();
    let provider = MockProvider::new([], Some(fix_at(start, 0, 0.0)));
    let prompts = provider.prompts.clone();
    let watchers = provider.watchers.clone();
    let tracker = LocationTracker::new(provider, LocationConfig::default());
    tracker.start().await.unwrap();
    assert!(tracker.is_subscribed());

    tracker.stop();
    tracker.stop();
    assert!(!tracker.is_subscribed());

    let _ = latest_watcher(&watchers).send(fix_at(start, 60, 500.0));
    tokio::task::yield_now().await;
    assert_eq!(tracker.current_fix(), Some(fix_at(start, 0, 0.0)));

    // Restarting reuses the granted permission.
    tracker.start().await.unwrap();
    assert!(tracker.is_subscribed());
    assert_eq!(prompts.load(SeqCst), 1);
    assert_eq!(watchers.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn stop_during_prompt_allows_asking_again() {
    let start = Utc::now();
    let gate = Arc::new(Notify::new());
    let mut provider = MockProvider::new([], Some(fix_at(start, 0, 0.0)));
    provider.prompt_gate = Some(gate.clone());
    let watchers = provider.watchers.clone();
    let tracker = LocationTracker::new(provider, LocationConfig::default());

    let (result, ()) = tokio::join!(tracker.start(), async {
        tokio::task::yield_now().await;
        assert_eq!(tracker.status(), TrackerStatus::Requesting);
        tracker.stop();
        gate.notify_one();
    });

    assert_eq!(result, Ok(()));
    assert_eq!(tracker.status(), TrackerStatus::Unrequested);
    assert!(tracker.current_fix().is_none());
    assert!(!tracker.is_subscribed());
    assert!(watchers.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stop_before_initial_fix_opens_no_watch() {
    let start = Utc::now();
    let gate = Arc::new(Notify::new());
    let mut provider = MockProvider::new([], Some(fix_at(start, 0, 0.0)));
    provider.fix_gate = Some(gate.clone());
    let watchers = provider.watchers.clone();
    let tracker = LocationTracker::new(provider, LocationConfig::default());

    let (result, ()) = tokio::join!(tracker.start(), async {
        tokio::task::yield_now().await;
        assert_eq!(tracker.status(), TrackerStatus::Granted);
        tracker.stop();
        gate.notify_one();
    });

    assert_eq!(result, Ok(()));
    assert!(tracker.current_fix().is_none());
    assert!(!tracker.is_subscribed());
    assert!(watchers.lock().unwrap().is_empty());
}

#[tokio::test]
async fn ended_stream_can_be_resubscribed() {
    let start = Utc::now();
    let provider = MockProvider::new([], Some(fix_at(start, 0, 0.0)));
    let prompts = provider.prompts.clone();
    let watchers = provider.watchers.clone();
    let tracker = LocationTracker::new(provider, LocationConfig::default());
    tracker.start().await.unwrap();
    assert!(tracker.is_subscribed());

    // The platform closes the watch on its own.
    watchers.lock().unwrap().clear();
    for _ in 0..10 {
        if !tracker.is_subscribed() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(!tracker.is_subscribed());

    tracker.start().await.unwrap();
    assert!(tracker.is_subscribed());
    assert_eq!(prompts.load(SeqCst), 1);
    assert_eq!(watchers.lock().unwrap().len(), 1);
}
