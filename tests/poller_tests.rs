use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering::SeqCst},
    },
    time::Duration,
};

use campus_transit::{
    poller::{FetchOutcome, Poller, Schedule},
    transport::TransportError,
};
use tokio::{sync::Notify, time};

fn counting_poller(schedule: Schedule) -> (Poller<usize>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let poller = Poller::new("counting", schedule, move || {
        let counter = counter.clone();
        async move { Ok::<_, TransportError>(counter.fetch_add(1, SeqCst) + 1) }
    });
    (poller, calls)
}

async fn wait_for_data<T: Send + Sync + 'static>(poller: &Poller<T>) {
    let mut rx = poller.subscribe();
    while rx.latest().data.is_none() {
        if rx.changed().await.is_none() {
            break;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn fetches_immediately_then_once_per_tick() {
    let (poller, calls) = counting_poller(Schedule::every(Duration::from_secs(10)));
    poller.start();

    time::sleep(Duration::from_millis(35_000)).await;
    assert_eq!(calls.load(SeqCst), 4);
    assert_eq!(poller.snapshot().data.as_deref(), Some(&4));
    assert!(poller.snapshot().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_skips_ticks_instead_of_overlapping() {
    let calls = Arc::new(AtomicUsize::new(0));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let poller = {
        let (calls, in_flight, peak) = (calls.clone(), in_flight.clone(), peak.clone());
        Poller::new(
            "slow",
            Schedule::every(Duration::from_secs(10)),
            move || {
                let (calls, in_flight, peak) = (calls.clone(), in_flight.clone(), peak.clone());
                async move {
                    calls.fetch_add(1, SeqCst);
                    let now = in_flight.fetch_add(1, SeqCst) + 1;
                    peak.fetch_max(now, SeqCst);
                    time::sleep(Duration::from_secs(15)).await;
                    in_flight.fetch_sub(1, SeqCst);
                    Ok::<_, TransportError>(())
                }
            },
        )
    };
    poller.start();

    time::sleep(Duration::from_secs(5)).await;
    assert_eq!(poller.refetch().await, FetchOutcome::Skipped);

    // Fetches start at 0s, 25s and 50s: each one waits for the previous to end.
    time::sleep(Duration::from_secs(50)).await;
    assert_eq!(calls.load(SeqCst), 3);
    assert_eq!(peak.load(SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn single_shot_only_refetches_on_demand() {
    let (poller, calls) = counting_poller(Schedule::single_shot());
    poller.start();
    time::sleep(Duration::from_secs(120)).await;
    assert_eq!(calls.load(SeqCst), 1);

    assert_eq!(poller.refetch().await, FetchOutcome::Applied);
    assert_eq!(calls.load(SeqCst), 2);
    assert_eq!(poller.snapshot().data.as_deref(), Some(&2));
}

#[tokio::test(start_paused = true)]
async fn refetch_does_not_shift_the_schedule() {
    let (poller, calls) = counting_poller(Schedule::every(Duration::from_secs(10)));
    poller.start();
    time::sleep(Duration::from_secs(3)).await;
    assert_eq!(poller.refetch().await, FetchOutcome::Applied);
    assert_eq!(calls.load(SeqCst), 2);

    // The timer still fires at 10s.
    time::sleep(Duration::from_secs(8)).await;
    assert_eq!(calls.load(SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn failure_keeps_previous_snapshot() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let poller = Poller::new("flaky", Schedule::single_shot(), move || {
        let call = counter.fetch_add(1, SeqCst);
        async move {
            match call {
                1 => Err(TransportError::Http(503)),
                _ => Ok(vec!["8012".to_string(), "8040".to_string()]),
            }
        }
    });
    poller.start();
    wait_for_data(&poller).await;

    let outcome = poller.refetch().await;
    assert_eq!(outcome, FetchOutcome::Failed(TransportError::Http(503)));
    let snapshot = poller.snapshot();
    assert_eq!(snapshot.items().len(), 2);
    assert_eq!(snapshot.error, Some(TransportError::Http(503)));
    assert!(snapshot.is_stale());

    assert_eq!(poller.refetch().await, FetchOutcome::Applied);
    assert!(poller.snapshot().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn result_arriving_after_stop_is_dropped() {
    let gate = Arc::new(Notify::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let poller = {
        let (gate, calls) = (gate.clone(), calls.clone());
        Poller::new("gated", Schedule::single_shot(), move || {
            let gate = gate.clone();
            let call = calls.fetch_add(1, SeqCst);
            async move {
                if call > 0 {
                    gate.notified().await;
                }
                Ok::<_, TransportError>(call)
            }
        })
    };
    poller.start();
    wait_for_data(&poller).await;
    let before = poller.snapshot();

    let (outcome, ()) = tokio::join!(poller.refetch(), async {
        tokio::task::yield_now().await;
        assert!(poller.snapshot().loading);
        poller.stop();
        gate.notify_one();
    });

    assert_eq!(outcome, FetchOutcome::Discarded);
    let after = poller.snapshot();
    assert_eq!(after.data, before.data);
    assert_eq!(after.updated_at, before.updated_at);
    assert!(!after.loading);
    assert!(!poller.is_running());
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_in_flight_scheduled_fetch() {
    let gate = Arc::new(Notify::new());
    let poller = {
        let gate = gate.clone();
        Poller::new("blocked", Schedule::every(Duration::from_secs(10)), move || {
            let gate = gate.clone();
            async move {
                gate.notified().await;
                Ok::<_, TransportError>(1)
            }
        })
    };
    poller.start();
    tokio::task::yield_now().await;
    poller.stop();
    gate.notify_waiters();
    time::sleep(Duration::from_secs(30)).await;
    assert!(poller.snapshot().data.is_none());
    assert_eq!(poller.refetch().await, FetchOutcome::Skipped);
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_drop_stops() {
    let (poller, calls) = counting_poller(Schedule::every(Duration::from_secs(10)));
    poller.start();
    time::sleep(Duration::from_secs(1)).await;
    poller.stop();
    poller.stop();
    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(calls.load(SeqCst), 1);

    let (poller, calls) = counting_poller(Schedule::every(Duration::from_secs(10)));
    poller.start();
    time::sleep(Duration::from_secs(1)).await;
    drop(poller);
    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(calls.load(SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_each_applied_snapshot() {
    let (poller, _) = counting_poller(Schedule::every(Duration::from_secs(10)));
    let mut rx = poller.subscribe();
    poller.start();

    let mut seen = Vec::new();
    while seen.len() < 3 {
        let snapshot = rx.changed().await.unwrap();
        if let Some(value) = snapshot.data.as_deref() {
            if seen.last() != Some(value) {
                seen.push(*value);
            }
        }
    }
    assert_eq!(seen, [1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn cancelled_refetch_does_not_block_the_schedule() {
    let calls = Arc::new(AtomicUsize::new(0));
    let poller = {
        let calls = calls.clone();
        Poller::new("hanging", Schedule::every(Duration::from_secs(10)), move || {
            let call = calls.fetch_add(1, SeqCst);
            async move {
                if call == 1 {
                    time::sleep(Duration::from_secs(60)).await;
                }
                Ok::<_, TransportError>(call)
            }
        })
    };
    poller.start();
    wait_for_data(&poller).await;

    let cancelled = time::timeout(Duration::from_secs(2), poller.refetch()).await;
    assert!(cancelled.is_err());
    assert!(!poller.snapshot().loading);

    time::sleep(Duration::from_secs(120)).await;
    assert!(calls.load(SeqCst) > 10);
    assert!(!poller.snapshot().loading);
    assert_eq!(poller.refetch().await, FetchOutcome::Applied);
}
