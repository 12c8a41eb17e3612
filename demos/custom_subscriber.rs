//! # Example: custom_subscriber
//!
//! Demonstrates how to build and attach a custom event subscriber next to the
//! built-in [`LogWriter`].
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for source lifecycle metrics.
//! - Wire subscribers into [`MergedStateBuilder::with_subscribers`].
//!
//! ## Flow
//! ```text
//! MergedState::builder()...build()
//!     ├─► Coordinator: FirstObserver / NoObservers / StopScheduled / StopElapsed
//!     ├─► Registry:    SourceStarting / SourceCompleted / SourceStopped / SourceFailed
//!     └─► subscriber listener
//!           └─► SubscriberSet.emit() ──► ConsoleSubscriber.on_event()
//!                                   └──► LogWriter.on_event() ──► tracing
//! ```
//!
//! ## Run
//! Requires the `logging` feature to export [`LogWriter`].
//! ```bash
//! cargo run --example custom_subscriber --features logging
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use futures::{StreamExt, stream};
use statevisor::{
    Event, EventKind, LaunchPolicy, LogWriter, MergedState, StateCell, Subscribe, TrySourceFn,
};
use tokio::time::sleep;

/// Prints selected events and counts restarts.
/// In real life, you could export metrics, ship logs, or trigger alerts.
#[derive(Default)]
struct ConsoleSubscriber {
    restarts: AtomicU32,
}

#[async_trait::async_trait]
impl Subscribe for ConsoleSubscriber {
    async fn on_event(&self, ev: &Event) {
        let source = ev.source.as_deref().unwrap_or("<unknown>");
        match ev.kind {
            EventKind::FirstObserver => {
                println!("[sub] observed: count={}", ev.observers.unwrap_or(0));
            }
            EventKind::StopScheduled => {
                println!("[sub] stop in {}ms", ev.delay_ms.unwrap_or(0));
            }
            EventKind::StopCancelled => println!("[sub] stop cancelled"),
            EventKind::SourceStarting => {
                let run = ev.run.unwrap_or(0);
                if run > 1 {
                    self.restarts.fetch_add(1, Ordering::Relaxed);
                }
                println!("[sub] starting: source={source} run={run}");
            }
            EventKind::SourceFailed => {
                println!(
                    "[sub] failed:   source={source} reason={}",
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            EventKind::SourceCompleted | EventKind::SourceStopped => {
                println!("[sub] ended:    source={source} kind={:?}", ev.kind);
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let console = Arc::new(ConsoleSubscriber::default());
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![console.clone(), Arc::new(LogWriter::new())];

    let state = MergedState::builder(0i64)
        .with_policy(LaunchPolicy::while_subscribed(Duration::from_millis(300)))
        .with_subscribers(subscribers)
        .source(TrySourceFn::new(
            "readings",
            |_cell: StateCell<i64>| {
                stream::iter(["4", "8", "15", "sixteen"]).then(|raw| async move {
                    sleep(Duration::from_millis(100)).await;
                    raw.parse::<i64>()
                })
            },
            |sum: &i64, v: i64| sum.checked_add(v).ok_or("overflow"),
        ))
        .build()?;

    for round in 1..=2 {
        let sub = state.subscribe();
        sleep(Duration::from_millis(600)).await;
        println!("round {round}: value={}", sub.get());
        drop(sub);
        sleep(Duration::from_millis(500)).await;
    }

    state.shutdown().await;
    println!(
        "restarts observed: {}",
        console.restarts.load(Ordering::Relaxed)
    );
    Ok(())
}
