//! # Example: while_subscribed
//!
//! Two repositories feed one screen state. The sources only run while someone
//! collects the state, and survive a short gap between collectors.
//!
//! Shows how to:
//! - Build a [`MergedState`] with [`LaunchPolicy::WhileSubscribed`].
//! - Fold two independent producers into separate fields.
//! - Drop and re-create a subscription within the stop timeout.
//!
//! ## Flow
//! ```text
//! t=0s    subscribe      ─► FirstObserver ─► start data1, data2
//! t=2s    unsubscribe    ─► NoObservers   ─► StopScheduled(5s)
//! t=6s    resubscribe    ─► FirstObserver ─► StopCancelled, restart data1 (finished)
//! t=11s   shutdown       ─► stop all
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example while_subscribed
//! ```

use std::time::Duration;

use futures::{Stream, StreamExt, stream};
use statevisor::{LaunchPolicy, MergedState, StateCell};
use tokio::time::sleep;

#[derive(Clone, Debug, Default, PartialEq)]
struct ScreenState {
    data1: u32,
    data2: u32,
}

/// Emits `0..count`, one value every 500ms.
fn fetch(count: u32) -> impl Stream<Item = u32> + Send {
    stream::iter(0..count).then(|i| async move {
        if i > 0 {
            sleep(Duration::from_millis(500)).await;
        }
        i
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let state = MergedState::builder(ScreenState::default())
        .with_policy(LaunchPolicy::while_subscribed(Duration::from_secs(5)))
        .source_fn(
            "data1",
            |_cell: StateCell<ScreenState>| fetch(5),
            |s: &ScreenState, v: u32| ScreenState {
                data1: v,
                ..s.clone()
            },
        )
        .source_fn(
            "data2",
            |_cell: StateCell<ScreenState>| fetch(20),
            |s: &ScreenState, v: u32| ScreenState {
                data2: v,
                ..s.clone()
            },
        )
        .build()?;

    let mut sub = state.subscribe();
    let collector = tokio::spawn(async move {
        while let Some(s) = sub.next().await {
            println!("State received: {s:?}");
        }
    });
    sleep(Duration::from_secs(2)).await;
    collector.abort();
    let _ = collector.await;
    println!("Collection cancelled for some time");

    sleep(Duration::from_secs(4)).await;
    println!("Resuming collection...");
    let mut sub = state.subscribe();
    let collector = tokio::spawn(async move {
        while let Some(s) = sub.next().await {
            println!("State after resuming: {s:?}");
        }
    });

    sleep(Duration::from_secs(5)).await;
    state.shutdown().await;
    collector.abort();
    println!("Final state: {:?}", state.get());
    Ok(())
}
