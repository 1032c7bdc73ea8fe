// ── Live snapshot publisher ──
//
// One delivery loop per live viewer: read the current snapshot, serialize
// it, send it, sleep, repeat. Loops share nothing but the store, so a slow
// or dead viewer only hurts itself; it sees fewer generations rather than
// building a backlog.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::DeliveryError;
use crate::model::Topology;
use crate::store::SnapshotStore;

/// Write half of one viewer connection.
pub trait SnapshotSink: Send {
    /// Deliver one serialized snapshot. An error ends this viewer's loop.
    fn send(&mut self, payload: String) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Why a delivery loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The viewer's token was cancelled (client close or server shutdown).
    Cancelled,
    /// A send failed; the connection is considered gone.
    Disconnected(DeliveryError),
}

/// Spawns nothing itself; each connection handler runs
/// [`deliver()`](Self::deliver) on its own task.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<SnapshotStore>,
    interval: Duration,
}

impl Publisher {
    pub fn new(store: Arc<SnapshotStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// The current snapshot of lineage `T` as a JSON payload.
    pub fn payload<T: Topology>(&self) -> Result<String, DeliveryError> {
        let snapshot = self.store.current::<T>();
        serde_json::to_string(&*snapshot).map_err(|e| DeliveryError::Serialization {
            reason: e.to_string(),
        })
    }

    /// Push lineage `T` to `sink` every interval until a send fails or
    /// `cancel` fires. The first push is immediate.
    pub async fn deliver<T: Topology, S: SnapshotSink>(
        &self,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> DeliveryOutcome {
        let mut sent: u64 = 0;
        let outcome = loop {
            let payload = match self.payload::<T>() {
                Ok(payload) => payload,
                Err(e) => break DeliveryOutcome::Disconnected(e),
            };

            tokio::select! {
                biased;
                () = cancel.cancelled() => break DeliveryOutcome::Cancelled,
                result = sink.send(payload) => {
                    if let Err(e) = result {
                        break DeliveryOutcome::Disconnected(e);
                    }
                }
            }
            sent += 1;

            tokio::select! {
                biased;
                () = cancel.cancelled() => break DeliveryOutcome::Cancelled,
                () = tokio::time::sleep(self.interval) => {}
            }
        };

        debug!(lineage = %T::LINEAGE, sent, ?outcome, "viewer delivery loop ended");
        outcome
    }
}
