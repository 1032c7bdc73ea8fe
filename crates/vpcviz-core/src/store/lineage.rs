// ── Single-lineage snapshot cell ──
//
// `ArcSwap` holds the current snapshot; publishing stamps the next
// generation and swaps it in with `rcu`, which refuses to install a
// generation lower than the one already current. Watch channels carry
// the generation and the refresh status to subscribers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use chrono::Utc;
use tokio::sync::watch;

use super::status::RefreshStatus;
use crate::model::{Joined, Snapshot, Topology};

/// Current snapshot plus refresh bookkeeping for one lineage.
pub struct LineageStore<T> {
    current: ArcSwap<Snapshot<T>>,

    /// Next generation to hand out. Starts at 1; 0 is the placeholder.
    next_generation: AtomicU64,

    /// Generation of the current snapshot, for wake-ups.
    generation: watch::Sender<u64>,

    status: watch::Sender<RefreshStatus>,
}

impl<T: Topology> LineageStore<T> {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0u64);
        let (status, _) = watch::channel(RefreshStatus::default());

        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
            next_generation: AtomicU64::new(1),
            generation,
            status,
        }
    }

    /// The current snapshot. Wait-free; never blocks on a publish.
    pub fn current(&self) -> Arc<Snapshot<T>> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Stamp `joined` with the next generation and make it current.
    ///
    /// Returns the snapshot that is current afterwards: the new one, or the
    /// newer one that was already installed if this one lost the race.
    pub fn publish(&self, joined: Joined<T>) -> Arc<Snapshot<T>> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let snapshot = Arc::new(Snapshot {
            generation,
            captured_at: Some(Utc::now()),
            degraded: joined.degraded,
            topology: joined.topology,
        });
        if !self.install(Arc::clone(&snapshot)) {
            return self.current();
        }

        tracing::info!(
            lineage = %T::LINEAGE,
            generation,
            degraded = snapshot.degraded.len(),
            "snapshot published"
        );
        snapshot
    }

    /// Swap `snapshot` in unless something newer is already current.
    /// Returns whether it was installed.
    pub(crate) fn install(&self, snapshot: Arc<Snapshot<T>>) -> bool {
        let generation = snapshot.generation;
        let previous = self.current.rcu(|current| {
            if current.generation < generation {
                Arc::clone(&snapshot)
            } else {
                Arc::clone(current)
            }
        });
        if previous.generation >= generation {
            tracing::debug!(
                lineage = %T::LINEAGE,
                generation,
                current = previous.generation,
                "stale snapshot discarded"
            );
            return false;
        }

        self.generation.send_if_modified(|g| {
            if *g < generation {
                *g = generation;
                true
            } else {
                false
            }
        });
        true
    }

    /// Wakes whenever a newer snapshot becomes current.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    // ── Refresh status ───────────────────────────────────────────────

    pub fn status(&self) -> RefreshStatus {
        self.status.borrow().clone()
    }

    pub(crate) fn record_attempt(&self) {
        self.status.send_modify(|s| s.begin(Utc::now()));
    }

    pub(crate) fn record_success(&self) {
        self.status.send_modify(|s| s.succeed(Utc::now()));
    }

    pub(crate) fn record_failure(&self, message: String) {
        self.status.send_modify(|s| s.fail(message));
    }
}

impl<T: Topology> Default for LineageStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Instance, Network, NetworkTopology, Subnet};

    fn one_network(id: &str) -> Joined<NetworkTopology> {
        Joined {
            topology: NetworkTopology {
                vpcs: vec![Network {
                    id: id.into(),
                    name: String::new(),
                    subnets: vec![Subnet {
                        id: "subnet-1".into(),
                        name: String::new(),
                        instances: vec![Instance::new("i-1", "")],
                    }],
                }],
            },
            degraded: Vec::new(),
        }
    }

    #[test]
    fn starts_with_placeholder() {
        let store: LineageStore<NetworkTopology> = LineageStore::new();
        let snap = store.current();
        assert_eq!(snap.generation, 0);
        assert!(snap.topology.vpcs.is_empty());
        assert_eq!(*store.subscribe().borrow(), 0);
    }

    #[test]
    fn publish_increments_generation() {
        let store: LineageStore<NetworkTopology> = LineageStore::new();
        let first = store.publish(one_network("vpc-1"));
        let second = store.publish(one_network("vpc-2"));
        assert_eq!(first.generation, 1);
        assert_eq!(second.generation, 2);
        assert!(Arc::ptr_eq(&store.current(), &second));
        assert!(second.captured_at.is_some());
    }

    #[test]
    fn older_generation_is_never_installed() {
        let store: LineageStore<NetworkTopology> = LineageStore::new();
        store.publish(one_network("vpc-1"));
        store.publish(one_network("vpc-2"));

        let stale = Arc::new(Snapshot {
            generation: 1,
            captured_at: None,
            degraded: Vec::new(),
            topology: one_network("vpc-old").topology,
        });
        assert!(!store.install(stale));
        assert_eq!(store.generation(), 2);
        assert_eq!(store.current().topology.vpcs[0].id, "vpc-2");
        assert_eq!(*store.subscribe().borrow(), 2);
    }

    #[test]
    fn publish_losing_to_a_newer_snapshot_returns_the_newer_one() {
        let store: LineageStore<NetworkTopology> = LineageStore::new();
        let newer = Arc::new(Snapshot {
            generation: 5,
            captured_at: None,
            degraded: Vec::new(),
            topology: one_network("vpc-new").topology,
        });
        assert!(store.install(Arc::clone(&newer)));

        // Counter hands out generation 1, which is behind what is current.
        let result = store.publish(one_network("vpc-late"));
        assert!(Arc::ptr_eq(&result, &newer));
        assert_eq!(store.generation(), 5);
        assert_eq!(store.current().topology.vpcs[0].id, "vpc-new");
    }

    #[test]
    fn readers_keep_their_snapshot_across_publish() {
        let store: LineageStore<NetworkTopology> = LineageStore::new();
        store.publish(one_network("vpc-1"));
        let held = store.current();
        store.publish(one_network("vpc-2"));
        assert_eq!(held.topology.vpcs[0].id, "vpc-1");
        assert_eq!(held.topology.vpcs[0].subnets[0].instances.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_readers_see_monotonic_whole_trees() {
        let store: Arc<LineageStore<NetworkTopology>> = Arc::new(LineageStore::new());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let mut seen = 0;
                    for _ in 0..2_000 {
                        let snap = store.current();
                        assert!(snap.generation >= seen);
                        seen = snap.generation;
                        if !snap.is_placeholder() {
                            assert_eq!(snap.topology.vpcs.len(), 1);
                            assert_eq!(snap.topology.vpcs[0].subnets[0].instances.len(), 1);
                        }
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for n in 0..500 {
            store.publish(one_network(&format!("vpc-{n}")));
            tokio::task::yield_now().await;
        }
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(store.generation(), 500);
    }

    #[tokio::test]
    async fn subscribers_wake_on_publish() {
        let store: LineageStore<NetworkTopology> = LineageStore::new();
        let mut rx = store.subscribe();
        store.publish(one_network("vpc-1"));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);
    }

    #[test]
    fn status_tracks_outcomes() {
        let store: LineageStore<NetworkTopology> = LineageStore::new();
        store.record_attempt();
        store.record_failure("Inventory credentials rejected".into());
        let status = store.status();
        assert_eq!(status.consecutive_failures, 1);
        assert!(status.last_attempt.is_some());
        assert_eq!(status.last_error.as_deref(), Some("Inventory credentials rejected"));
    }
}
