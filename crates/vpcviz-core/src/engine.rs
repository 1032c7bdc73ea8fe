// ── Refresh engine ──
//
// Owns the inventory capability and the snapshot store, and drives one
// refresh loop per lineage. Each loop refreshes once immediately, then
// sleeps a fixed period *after* each refresh finishes, so a slow upstream
// stretches the cycle instead of stacking refreshes up.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::inventory::Inventory;
use crate::model::{Lineage, NetworkTopology, Snapshot, StackTopology, Topology};
use crate::publisher::Publisher;
use crate::store::SnapshotStore;

/// The main entry point for the server.
///
/// Cheaply cloneable via `Arc<EngineInner>`. Construct with
/// [`new()`](Self::new), then either [`start()`](Self::start) the
/// background loops or call [`refresh()`](Self::refresh) directly.
pub struct Engine<I: Inventory> {
    inner: Arc<EngineInner<I>>,
}

struct EngineInner<I> {
    config: EngineConfig,
    inventory: I,
    store: Arc<SnapshotStore>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    /// Held for the duration of one refresh; keeps each lineage single-flight
    /// even when an on-demand refresh races the periodic one.
    network_gate: Mutex<()>,
    stack_gate: Mutex<()>,
}

impl<I: Inventory> Clone for Engine<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I: Inventory> Engine<I> {
    /// Create an engine. Nothing runs until [`start()`](Self::start).
    pub fn new(config: EngineConfig, inventory: I) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config,
                inventory,
                store: Arc::new(SnapshotStore::new()),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
                network_gate: Mutex::new(()),
                stack_gate: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.inner.store
    }

    pub fn inventory(&self) -> &I {
        &self.inner.inventory
    }

    /// Cancelled by [`shutdown()`](Self::shutdown). Child tokens of this
    /// one scope the live-viewer loops.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    /// A publisher over this engine's store at the configured push cadence.
    pub fn publisher(&self) -> Publisher {
        Publisher::new(Arc::clone(&self.inner.store), self.inner.config.push_interval)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the refresh loop for each lineage.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            return Err(CoreError::AlreadyRunning);
        }

        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(refresh_task::<I, NetworkTopology>(
            self.clone(),
            cancel.clone(),
        )));
        handles.push(tokio::spawn(refresh_task::<I, StackTopology>(
            self.clone(),
            cancel,
        )));

        info!(
            refresh_interval_secs = self.inner.config.refresh_interval.as_secs(),
            fetch_concurrency = self.inner.config.fetch_concurrency,
            "refresh engine started"
        );
        Ok(())
    }

    /// Stop the refresh loops and wait for them to exit.
    ///
    /// A refresh already in flight runs to completion (or to its client
    /// timeout) and still publishes; the loops only observe cancellation
    /// between refreshes.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("refresh engine stopped");
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Run one refresh of lineage `T` and publish the result.
    ///
    /// On a root listing failure nothing is published and the previous
    /// snapshot stays current.
    pub async fn refresh<T: Topology>(&self) -> Result<Arc<Snapshot<T>>, CoreError> {
        let _gate = self.gate(T::LINEAGE).lock().await;
        let lineage = self.inner.store.lineage::<T>();

        lineage.record_attempt();
        let started = Instant::now();
        match T::build(&self.inner.inventory, self.inner.config.fetch_concurrency).await {
            Ok(joined) => {
                let snapshot = lineage.publish(joined);
                lineage.record_success();
                debug!(
                    lineage = %T::LINEAGE,
                    generation = snapshot.generation,
                    elapsed = ?started.elapsed(),
                    "refresh complete"
                );
                Ok(snapshot)
            }
            Err(e) => {
                warn!(
                    lineage = %T::LINEAGE,
                    error = %e,
                    transient = e.is_transient(),
                    current_generation = lineage.generation(),
                    "refresh failed; previous snapshot kept"
                );
                lineage.record_failure(e.to_string());
                Err(e.into())
            }
        }
    }

    pub async fn refresh_networks(&self) -> Result<Arc<Snapshot<NetworkTopology>>, CoreError> {
        self.refresh::<NetworkTopology>().await
    }

    pub async fn refresh_stacks(&self) -> Result<Arc<Snapshot<StackTopology>>, CoreError> {
        self.refresh::<StackTopology>().await
    }

    fn gate(&self, lineage: Lineage) -> &Mutex<()> {
        match lineage {
            Lineage::Network => &self.inner.network_gate,
            Lineage::Stack => &self.inner.stack_gate,
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Refresh `T` now, then again `refresh_interval` after each refresh
/// finishes, until cancelled. A zero interval stops after the first pass.
async fn refresh_task<I: Inventory, T: Topology>(engine: Engine<I>, cancel: CancellationToken) {
    let period = engine.config().refresh_interval;

    loop {
        if cancel.is_cancelled() {
            break;
        }
        // Failures are logged and recorded by `refresh`.
        let _ = engine.refresh::<T>().await;

        if period.is_zero() {
            break;
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(period) => {}
        }
    }
    debug!(lineage = %T::LINEAGE, "refresh task exited");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::FetchError;
    use crate::inventory::{Call, StaticInventory};
    use crate::joiner::{INSTANCE_TYPE, SCALING_GROUP_TYPE};
    use crate::model::{Instance, Resource, ScalingGroup};

    fn config(refresh_secs: u64) -> EngineConfig {
        EngineConfig {
            refresh_interval: Duration::from_secs(refresh_secs),
            ..EngineConfig::default()
        }
    }

    fn sample() -> StaticInventory {
        StaticInventory::new()
            .network("vpc-1", "prod")
            .subnet("vpc-1", "subnet-1", "")
            .subnet("vpc-1", "subnet-2", "")
            .instance("subnet-1", "i-1", "web-1")
            .instance("subnet-2", "i-7", "worker")
            .stack("app")
            .stack_resource("app", SCALING_GROUP_TYPE, "WebGroup", Some("asg-1"))
            .stack_resource("app", INSTANCE_TYPE, "Web", Some("i-4"))
            .group_member("asg-1", "i-2")
            .group_member("asg-1", "i-3")
    }

    #[tokio::test]
    async fn current_before_any_refresh_is_empty() {
        let engine = Engine::new(config(60), sample());
        let networks = engine.store().networks().current();
        let stacks = engine.store().stacks().current();
        assert_eq!(networks.generation, 0);
        assert!(networks.topology.vpcs.is_empty());
        assert_eq!(stacks.generation, 0);
        assert!(stacks.topology.stacks.is_empty());
    }

    #[tokio::test]
    async fn network_scenario_labels() {
        let engine = Engine::new(config(60), sample());
        let snap = engine.refresh_networks().await.unwrap();

        let vpc = &snap.topology.vpcs[0];
        assert_eq!(vpc.label(), "vpc-1 (prod)");
        assert_eq!(vpc.subnets[0].label(), "subnet-1 ()");
        assert_eq!(vpc.subnets[0].instances[0].label(), "i-1 (web-1)");
    }

    #[tokio::test]
    async fn stack_scenario_shape() {
        let engine = Engine::new(config(60), sample());
        let snap = engine.refresh_stacks().await.unwrap();

        let app = &snap.topology.stacks[0];
        assert_eq!(app.name, "app");
        assert_eq!(
            app.scaling_groups,
            vec![ScalingGroup {
                name: "asg-1".into(),
                logical_id: "WebGroup".into(),
                instances: vec![Instance::new("i-2", ""), Instance::new("i-3", "")],
            }]
        );
        assert_eq!(app.instances, vec![Instance::new("i-4", "Web")]);
    }

    #[tokio::test]
    async fn generation_strictly_increases() {
        let engine = Engine::new(config(60), sample());
        let mut last = engine.store().networks().generation();
        for _ in 0..3 {
            let snap = engine.refresh_networks().await.unwrap();
            assert!(snap.generation > last);
            last = snap.generation;
        }
        assert_eq!(last, 3);
    }

    #[tokio::test]
    async fn root_failure_keeps_the_same_snapshot() {
        let engine = Engine::new(config(60), sample());
        let before = engine.refresh_networks().await.unwrap();

        engine
            .inventory()
            .fail(Call::Networks, FetchError::Unreachable { reason: "dns".into() });
        let err = engine.refresh_networks().await.unwrap_err();
        assert!(matches!(err, CoreError::Fetch(FetchError::Unreachable { .. })));

        let after = engine.store().networks().current();
        assert!(Arc::ptr_eq(&before, &after));

        let status = engine.store().networks().status();
        assert_eq!(status.consecutive_failures, 1);
        assert!(status.last_error.unwrap().contains("unreachable"));
    }

    #[tokio::test]
    async fn partial_failure_keeps_siblings() {
        let engine = Engine::new(config(60), sample());
        engine.inventory().fail(
            Call::Instances("subnet-1".into()),
            FetchError::Timeout { timeout_secs: 30 },
        );

        let snap = engine.refresh_networks().await.unwrap();
        let subnets = &snap.topology.vpcs[0].subnets;
        assert_eq!(subnets.len(), 2);
        assert!(subnets[0].instances.is_empty());
        assert_eq!(subnets[1].instances, vec![Instance::new("i-7", "worker")]);
        assert_eq!(snap.degraded.len(), 1);
        assert!(engine.store().networks().status().last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn start_refreshes_eagerly_then_on_period() {
        let engine = Engine::new(config(60), sample());
        let mut rx = engine.store().networks().subscribe();
        engine.start().await.unwrap();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(engine.store().networks().generation(), 2);
        assert_eq!(engine.store().stacks().generation(), 2);

        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_upstream_stretches_the_cycle() {
        // Each network refresh takes 5s, then waits 1s.
        let engine = Engine::new(
            config(1),
            StaticInventory::new().with_latency(Duration::from_secs(5)),
        );
        engine.start().await.unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(engine.store().networks().generation(), 10);

        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_refreshes_once() {
        let engine = Engine::new(config(0), sample());
        engine.start().await.unwrap();

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(engine.store().networks().generation(), 1);
        assert_eq!(engine.store().stacks().generation(), 1);
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_loops() {
        let engine = Engine::new(config(60), sample());
        engine.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        engine.shutdown().await;
        let calls = engine.inventory().call_count();
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(engine.inventory().call_count(), calls);
        assert!(matches!(engine.start().await, Err(CoreError::ShutDown)));
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_rejected() {
        let engine = Engine::new(config(60), sample());
        engine.start().await.unwrap();
        assert!(matches!(engine.start().await, Err(CoreError::AlreadyRunning)));
        engine.shutdown().await;
    }
}
