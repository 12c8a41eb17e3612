use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

use futures::Stream;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{Config, coordinator::Coordinator, merged::MergedState, registry::Registry};
use crate::{
    cell::{CellValue, StateCell},
    error::BuildError,
    events::Bus,
    policies::LaunchPolicy,
    sources::{Source, SourceFn, SourceRef},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a [`MergedState`].
///
/// Sources are registered in order; their names must be unique.
pub struct MergedStateBuilder<T> {
    cell: StateCell<T>,
    cfg: Config,
    policy: Option<LaunchPolicy>,
    sources: Vec<SourceRef<T>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    parent: Option<CancellationToken>,
}

impl<T: CellValue> MergedStateBuilder<T> {
    /// Creates a builder around a fresh cell holding `initial`.
    pub fn new(initial: T) -> Self {
        Self::from_cell(StateCell::new(initial))
    }

    /// Creates a builder around an existing cell.
    ///
    /// Observers already attached to `cell` count from the start.
    pub fn from_cell(cell: StateCell<T>) -> Self {
        Self {
            cell,
            cfg: Config::default(),
            policy: None,
            sources: Vec::new(),
            subscribers: Vec::new(),
            parent: None,
        }
    }

    /// Replaces the runtime configuration.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the launch policy, overriding `Config::launch`.
    pub fn with_policy(mut self, policy: LaunchPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (observer edges, source runs, failures)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Ties the lifecycle to `parent`: cancelling it stops every source.
    pub fn with_cancellation(mut self, parent: CancellationToken) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Registers a source.
    pub fn source(self, source: impl Source<T>) -> Self {
        self.source_ref(Arc::new(source))
    }

    /// Registers a shared source.
    pub fn source_ref(mut self, source: SourceRef<T>) -> Self {
        self.sources.push(source);
        self
    }

    /// Registers a [`SourceFn`] built from a producer factory and a reducer.
    pub fn source_fn<R, P, S, F>(
        self,
        name: impl Into<Cow<'static, str>>,
        producer: P,
        reducer: F,
    ) -> Self
    where
        R: Send + 'static,
        P: Fn(StateCell<T>) -> S + Send + Sync + 'static,
        S: Stream<Item = R> + Send + 'static,
        F: Fn(&T, R) -> T + Send + Sync + 'static,
    {
        self.source(SourceFn::new(name, producer, reducer))
    }

    /// Builds the merged state and spawns its coordinator on the current runtime.
    ///
    /// Under [`LaunchPolicy::Eager`] every source is started before this returns.
    ///
    /// # Errors
    /// - [`BuildError::NoRuntime`] outside of a tokio runtime context
    /// - [`BuildError::DuplicateSource`] if two sources share a name
    pub fn build(self) -> Result<MergedState<T>, BuildError> {
        let runtime = Handle::try_current().map_err(|_| BuildError::NoRuntime)?;
        ensure_unique(&self.sources)?;

        let policy = self.policy.unwrap_or(self.cfg.launch);
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let token = match &self.parent {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        let done = CancellationToken::new();

        let listener = (!self.subscribers.is_empty()).then(|| {
            let set = SubscriberSet::new(self.subscribers, bus.clone(), &runtime);
            subscriber_listener(&runtime, &bus, set, done.clone())
        });

        let registry = Registry::new(
            self.sources,
            self.cell.clone(),
            bus.clone(),
            runtime.clone(),
            token.clone(),
            self.cfg.stop_deadline(),
        );
        if policy == LaunchPolicy::Eager {
            registry.start_stopped();
        }

        let coordinator = Coordinator::new(
            policy,
            Arc::clone(&registry),
            self.cell.watch_observers(),
            bus.clone(),
            token.clone(),
        );
        let coordinator = runtime.spawn(async move {
            // Releases the listener even if the coordinator panics.
            let _done = done.drop_guard();
            coordinator.run().await;
        });

        Ok(MergedState::new(
            self.cell,
            policy,
            bus,
            token,
            registry,
            coordinator,
            listener,
        ))
    }
}

/// Builds a merged state with default configuration and no subscribers.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use futures::stream;
/// use statevisor::{LaunchPolicy, SourceFn, SourceRef, StateCell, merged_state};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let ticks: SourceRef<u32> = Arc::new(SourceFn::new(
///         "ticks",
///         |_cell: StateCell<u32>| stream::iter([1u32, 1, 1]),
///         |n: &u32, d: u32| n + d,
///     ));
///     let state = merged_state(0u32, LaunchPolicy::Eager, vec![ticks]).unwrap();
///     state.shutdown().await;
/// }
/// ```
pub fn merged_state<T: CellValue>(
    initial: T,
    policy: LaunchPolicy,
    sources: Vec<SourceRef<T>>,
) -> Result<MergedState<T>, BuildError> {
    sources
        .into_iter()
        .fold(
            MergedStateBuilder::new(initial).with_policy(policy),
            MergedStateBuilder::source_ref,
        )
        .build()
}

fn ensure_unique<T: CellValue>(sources: &[SourceRef<T>]) -> Result<(), BuildError> {
    let mut seen = HashSet::with_capacity(sources.len());
    for s in sources {
        if !seen.insert(s.name()) {
            return Err(BuildError::DuplicateSource {
                name: s.name().to_string(),
            });
        }
    }
    Ok(())
}

/// Forwards bus events to the subscriber set until the coordinator is done,
/// then drains the subscriber queues.
fn subscriber_listener(
    runtime: &Handle,
    bus: &Bus,
    set: SubscriberSet,
    done: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    runtime.spawn(async move {
        loop {
            tokio::select! {
                biased;
                ev = rx.recv() => match ev {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(target: "statevisor", skipped, "subscriber listener lagged behind the event bus");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = done.cancelled() => break,
            }
        }
        set.shutdown().await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn named(name: &'static str) -> SourceRef<u32> {
        Arc::new(SourceFn::new(
            name,
            |_cell: StateCell<u32>| stream::empty::<u32>(),
            |v: &u32, _: u32| *v,
        ))
    }

    #[test]
    fn test_build_outside_runtime_fails() {
        let err = MergedStateBuilder::new(0u32).build().unwrap_err();
        assert_eq!(err, BuildError::NoRuntime);
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let err = merged_state(0u32, LaunchPolicy::Lazy, vec![named("a"), named("a")])
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::DuplicateSource {
                name: "a".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_policy_falls_back_to_config() {
        let state = MergedStateBuilder::new(0u32)
            .with_config(Config {
                launch: LaunchPolicy::Lazy,
                ..Config::default()
            })
            .build()
            .unwrap();
        assert_eq!(state.policy(), LaunchPolicy::Lazy);

        let state = MergedStateBuilder::new(0u32)
            .with_config(Config {
                launch: LaunchPolicy::Lazy,
                ..Config::default()
            })
            .with_policy(LaunchPolicy::Eager)
            .build()
            .unwrap();
        assert_eq!(state.policy(), LaunchPolicy::Eager);
    }

    #[tokio::test]
    async fn test_parent_cancellation_shuts_down() {
        let parent = CancellationToken::new();
        let state = MergedStateBuilder::new(0u32)
            .with_cancellation(parent.clone())
            .source_ref(named("a"))
            .build()
            .unwrap();
        assert!(!state.is_shut_down());
        parent.cancel();
        assert!(state.is_shut_down());
        state.shutdown().await;
    }
}
