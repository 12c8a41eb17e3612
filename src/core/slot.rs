use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Index of a source in the registry (stable, `0..N`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct SourceId(pub usize);

/// State of a single source slot.
pub(super) struct SlotState {
    /// Current status.
    pub status: SlotStatus,

    /// Bumped on every start; a completion only applies to its own generation.
    pub generation: u64,

    /// Number of runs started so far (1-based in events).
    pub runs: u32,

    /// Handle of the current run, taken by `stop`.
    pub handle: Option<RunHandle>,
}

/// Status of a source slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotStatus {
    /// No run in flight; `start` will spawn one.
    Stopped,

    /// A run is in flight.
    Running {
        /// When the run started.
        started_at: Instant,
    },

    /// A run is in flight, but a grace-period stop is pending.
    PendingStop {
        /// When the run started; restored if the stop is cancelled.
        started_at: Instant,
    },
}

impl SlotStatus {
    /// True while a run is in flight (`Running` or `PendingStop`).
    pub fn is_live(&self) -> bool {
        !matches!(self, SlotStatus::Stopped)
    }
}

/// Join + cancel pair for one run.
pub(super) struct RunHandle {
    pub join: JoinHandle<()>,
    pub cancel: CancellationToken,
}

impl SlotState {
    /// Creates a new stopped slot.
    pub fn new() -> Self {
        Self {
            status: SlotStatus::Stopped,
            generation: 0,
            runs: 0,
            handle: None,
        }
    }
}
