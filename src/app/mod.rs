use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub mod config;
pub mod dispatch;
pub mod filters;
pub mod inventory;
pub mod persistence;
pub mod presentation;
pub mod records;
pub mod sdk_errors;
pub mod server;
pub mod session;

pub use dispatch::{ActionAck, InstanceAction};
pub use filters::{InstanceFilter, NormalizedFilter, RawFilter, TagPredicate};
pub use inventory::{InstanceDetail, MAX_RECORDS, REMOTE_CALL_TIMEOUT};
pub use presentation::{render_rows, InstanceRow};
pub use records::{sort_records, InstanceRecord, InstanceState, InstanceTag};
pub use sdk_errors::ConsoleError;
pub use session::{ConnectionContext, SessionHolder};

/// Outcome of a refresh request.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The fetch ran to completion and the rendered rows reflect the freshly
    /// installed records.
    Completed(Vec<InstanceRow>),
    /// Dropped without effect: another fetch was already in flight, or the
    /// session was reset while the call was outstanding.
    Dropped,
}

/// Application controller owning the session, the last-used filter, and the
/// current record cache. All state lives here explicitly; there are no
/// module-level globals.
pub struct InstanceConsole {
    session: SessionHolder,
    fetch_in_flight: AtomicBool,
    last_filter: RwLock<Option<InstanceFilter>>,
    records: RwLock<Vec<InstanceRecord>>,
}

impl Default for InstanceConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceConsole {
    pub fn new() -> Self {
        Self {
            session: SessionHolder::new(),
            fetch_in_flight: AtomicBool::new(false),
            last_filter: RwLock::new(None),
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn session(&self) -> &SessionHolder {
        &self.session
    }

    pub async fn connect(&self, context: ConnectionContext) -> Result<(), ConsoleError> {
        self.session.connect(context).await
    }

    /// Reset to idle: clears the session, the record cache and the last
    /// filter. Any in-flight fetch discards its result on completion.
    pub async fn reset(&self) {
        self.session.reset().await;
        self.last_filter.write().await.take();
        self.records.write().await.clear();
    }

    /// Run one inventory fetch. At most one fetch is in flight at a time; a
    /// concurrent request is dropped, not queued. `None` reuses the
    /// last-used filter (the refresh path).
    pub async fn refresh(
        &self,
        filter: Option<InstanceFilter>,
    ) -> Result<FetchOutcome, ConsoleError> {
        if self
            .fetch_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("refresh dropped: a fetch is already in flight");
            return Ok(FetchOutcome::Dropped);
        }
        let guard = FetchGuard {
            flag: &self.fetch_in_flight,
        };

        let filter = match filter {
            Some(filter) => filter,
            None => self.last_filter.read().await.clone().unwrap_or_default(),
        };

        let generation = self.session.generation();
        let client = self.session.client().await?;
        let result = inventory::fetch_instances(&client, &filter).await;
        drop(guard);

        let mut records = match result {
            Ok(records) => records,
            Err(err) => return Err(self.demote_if_unauthorized(err).await),
        };

        if self.session.generation() != generation {
            debug!("refresh result discarded: session changed while in flight");
            return Ok(FetchOutcome::Dropped);
        }

        sort_records(&mut records);
        let rows = render_rows(&records);
        *self.last_filter.write().await = Some(filter);
        *self.records.write().await = records;
        Ok(FetchOutcome::Completed(rows))
    }

    /// Dispatch one start/stop/reboot command, then reconcile displayed
    /// state with exactly one awaited re-fetch. On failure the prior
    /// displayed records stay untouched and the session remains live
    /// (unless the remote rejected the credentials).
    pub async fn dispatch(
        &self,
        action: InstanceAction,
        instance_id: &str,
    ) -> Result<ActionAck, ConsoleError> {
        let client = self.session.client().await?;

        let ack = match dispatch::dispatch_action(&client, action, instance_id).await {
            Ok(ack) => ack,
            Err(err) => return Err(self.demote_if_unauthorized(err).await),
        };

        if let Err(err) = self.refresh(None).await {
            // The command itself was acknowledged; a failed reconcile leaves
            // the previous rows visible until the user retries.
            warn!(error = %err, "post-action refresh failed");
        }

        Ok(ack)
    }

    /// Render the current record cache.
    pub async fn rows(&self) -> Vec<InstanceRow> {
        render_rows(&self.records.read().await)
    }

    pub async fn instance_detail(
        &self,
        instance_id: &str,
    ) -> Result<InstanceDetail, ConsoleError> {
        let client = self.session.client().await?;
        match inventory::describe_instance(&client, instance_id).await {
            Ok(detail) => Ok(detail),
            Err(err) => Err(self.demote_if_unauthorized(err).await),
        }
    }

    async fn demote_if_unauthorized(&self, err: ConsoleError) -> ConsoleError {
        if matches!(err, ConsoleError::Unauthorized(_)) {
            self.session.invalidate().await;
        }
        err
    }
}

/// Releases the in-flight flag even when the fetch errors out early.
struct FetchGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
