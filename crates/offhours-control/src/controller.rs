//! Lifecycle controller.
//!
//! [`LifecycleController`] owns the stop and start sequences. It is the only
//! component that mutates workloads or persisted stop state, and it runs at
//! most one sequence at a time.

use std::sync::Arc;

use offhours_cluster::ControlPlaneClient;
use offhours_store::{PersistedStopState, SnapshotEntry, StateStore, StopRecord, WorkloadSnapshot};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::backup::BackupCoordinator;
use crate::clock::{Clock, SystemClock};
use crate::error::{LifecycleError, Result};
use crate::lifecycle::{self, ClusterLifecycleState, Trigger};
use crate::shutdown::Shutdown;
use crate::types::{LifecycleConfig, ScaleFailure, StartOutcome, StartReport, StopOutcome, StopReport};

/// Runs the stop and start sequences against a cluster and a state store.
pub struct LifecycleController<C: ControlPlaneClient, S: StateStore> {
    cluster: Arc<C>,
    store: Arc<S>,
    backups: BackupCoordinator<C>,
    config: LifecycleConfig,
    clock: Arc<dyn Clock>,
    shutdown: Shutdown,
    in_flight: Mutex<Option<ClusterLifecycleState>>,
}

/// Clears the in-flight marker when a sequence ends, however it ends.
struct InFlight<'a> {
    slot: &'a Mutex<Option<ClusterLifecycleState>>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.slot.lock() = None;
    }
}

impl<C: ControlPlaneClient, S: StateStore> LifecycleController<C, S> {
    /// Create a controller using the system clock and no shutdown signal.
    #[must_use]
    pub fn new(cluster: Arc<C>, store: Arc<S>, config: LifecycleConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            backups: BackupCoordinator::new(Arc::clone(&cluster), &config.namespace, Arc::clone(&clock)),
            cluster,
            store,
            config,
            clock,
            shutdown: Shutdown::never(),
            in_flight: Mutex::new(None),
        }
    }

    /// Use `clock` for timestamps and backup names.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.backups = BackupCoordinator::new(
            Arc::clone(&self.cluster),
            &self.config.namespace,
            Arc::clone(&clock),
        );
        self.clock = clock;
        self
    }

    /// Observe `shutdown` at safe checkpoints inside sequences.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::InconsistentState` if only the workload
    /// snapshot is persisted.
    pub fn state(&self) -> Result<ClusterLifecycleState> {
        if let Some(current) = *self.in_flight.lock() {
            return Ok(current);
        }
        lifecycle::persisted_state(&self.store.load_stop_state()).ok_or(
            LifecycleError::InconsistentState {
                has_snapshot: true,
                has_record: false,
            },
        )
    }

    fn begin(&self, trigger: Trigger) -> Result<InFlight<'_>> {
        let mut slot = self.in_flight.lock();
        let next = lifecycle::begin_sequence(*slot, trigger).inspect_err(|e| {
            warn!(trigger = %trigger, error = %e, "Trigger rejected");
        })?;
        *slot = Some(next);
        Ok(InFlight {
            slot: &self.in_flight,
        })
    }

    /// Run the stop sequence.
    ///
    /// Takes a best-effort backup, records and scales every workload with
    /// replicas to zero, optionally drains the node pool, then persists the
    /// snapshot and stop record. Individual scale failures are reported, not
    /// raised. A shutdown before the first workload is scaled returns
    /// [`StopOutcome::Interrupted`] and leaves the store untouched.
    ///
    /// # Errors
    ///
    /// - `SequenceInFlight` if another sequence is running
    /// - `InconsistentState` if a snapshot exists without a stop record
    /// - `ListWorkloads` if workloads cannot be enumerated (nothing is written)
    /// - `Store` if the stop state cannot be persisted after scaling
    pub async fn stop(&self) -> Result<StopOutcome> {
        let _guard = self.begin(Trigger::Stop)?;

        match self.store.load_stop_state() {
            PersistedStopState::Absent => {}
            PersistedStopState::Complete { record, .. } | PersistedStopState::RecordOnly(record) => {
                info!(stopped_at = %record.stopped_at, "Cluster already stopped, nothing to do");
                return Ok(StopOutcome::AlreadyStopped { record });
            }
            PersistedStopState::SnapshotOnly(snapshot) => {
                error!(
                    workloads = snapshot.len(),
                    "Workload snapshot exists without a stop record, refusing to overwrite it"
                );
                return Err(LifecycleError::InconsistentState {
                    has_snapshot: true,
                    has_record: false,
                });
            }
        }

        let namespace = &self.config.namespace;
        info!(namespace = %namespace, "Stop sequence started");

        let backup_id = self.backups.create_backup().await;

        let workloads = self
            .cluster
            .list_workloads(namespace)
            .await
            .map_err(|source| {
                error!(namespace = %namespace, error = %source, "Failed to list workloads, aborting stop");
                LifecycleError::ListWorkloads {
                    namespace: namespace.clone(),
                    source,
                }
            })?;

        let mut snapshot = WorkloadSnapshot::new();
        let mut scaled = 0;
        let mut failures = Vec::new();
        let mut interrupted = false;

        for workload in workloads {
            if workload.replicas == 0 {
                debug!(workload = %workload.name, "Already at zero replicas, skipping");
                continue;
            }
            if self.shutdown.is_requested() {
                warn!(
                    recorded = snapshot.len(),
                    "Shutdown requested, leaving remaining workloads untouched"
                );
                interrupted = true;
                break;
            }

            snapshot.record(SnapshotEntry::new(
                workload.name.clone(),
                workload.namespace.clone(),
                workload.replicas,
            ));

            match self
                .cluster
                .scale_workload(&workload.name, &workload.namespace, 0)
                .await
            {
                Ok(()) => {
                    scaled += 1;
                    info!(
                        workload = %workload.name,
                        from = workload.replicas,
                        "Scaled workload to zero"
                    );
                }
                Err(e) => {
                    warn!(
                        workload = %workload.name,
                        error = %e,
                        retriable = e.is_retriable(),
                        "Failed to scale workload to zero"
                    );
                    failures.push(ScaleFailure::workload(&workload.name, &workload.namespace, 0, e));
                }
            }
        }

        if interrupted && snapshot.is_empty() {
            warn!("Stop interrupted before any workload was scaled, no stop state written");
            return Ok(StopOutcome::Interrupted { backup_id });
        }

        if !interrupted {
            if let Some(pool) = &self.config.node_pool {
                if let Err(e) = self.cluster.scale_node_pool(&pool.name, 0).await {
                    warn!(pool = %pool.name, error = %e, "Failed to scale node pool to zero");
                    failures.push(ScaleFailure::node_pool(&pool.name, 0, e));
                }
            }
        }

        let record = StopRecord {
            stopped_at: self.clock.now(),
            backup_id: backup_id.clone(),
            restart_time: self.config.schedule.start_time().to_string(),
        };

        if let Err(e) = self.store.save_stop_state(&snapshot, &record) {
            error!(
                error = %e,
                snapshot = ?snapshot.entries(),
                "Failed to persist stop state, original replica counts must be restored by hand"
            );
            return Err(e.into());
        }

        let report = StopReport {
            stopped_at: record.stopped_at,
            backup_id,
            recorded: snapshot.len(),
            scaled,
            failures,
            interrupted,
        };

        if report.is_degraded() {
            warn!(
                scaled = report.scaled,
                failed = report.failures.len(),
                backup = report.backup_id.is_some(),
                interrupted = report.interrupted,
                "Cluster stopped with degradations"
            );
        } else {
            info!(scaled = report.scaled, "Cluster stopped");
        }

        Ok(StopOutcome::Stopped(report))
    }

    /// Run the start sequence.
    ///
    /// Restores the node pool if configured, scales every snapshot entry back
    /// to its original replicas, waits out the settle grace period, then
    /// clears the stop state.
    ///
    /// # Errors
    ///
    /// - `SequenceInFlight` if another sequence is running
    /// - `InconsistentState` if exactly one of snapshot and stop record exists
    /// - `Store` if the stop state cannot be cleared
    pub async fn start(&self) -> Result<StartOutcome> {
        let _guard = self.begin(Trigger::Start)?;

        let (snapshot, record) = match self.store.load_stop_state() {
            PersistedStopState::Absent => {
                info!("No stop state found, nothing to restore");
                return Ok(StartOutcome::AlreadyRunning);
            }
            PersistedStopState::Complete { snapshot, record } => (snapshot, record),
            PersistedStopState::SnapshotOnly(snapshot) => {
                error!(
                    workloads = snapshot.len(),
                    "Workload snapshot exists without a stop record, manual reconciliation required"
                );
                return Err(LifecycleError::InconsistentState {
                    has_snapshot: true,
                    has_record: false,
                });
            }
            PersistedStopState::RecordOnly(record) => {
                error!(
                    stopped_at = %record.stopped_at,
                    "Stop record exists without a workload snapshot, manual reconciliation required"
                );
                return Err(LifecycleError::InconsistentState {
                    has_snapshot: false,
                    has_record: true,
                });
            }
        };

        info!(
            workloads = snapshot.len(),
            stopped_at = %record.stopped_at,
            "Start sequence started"
        );

        let mut report = StartReport::from_record(&record);

        if let Some(pool) = &self.config.node_pool {
            if let Err(e) = self
                .cluster
                .scale_node_pool(&pool.name, pool.restore_count)
                .await
            {
                warn!(pool = %pool.name, error = %e, "Failed to restore node pool");
                report
                    .failures
                    .push(ScaleFailure::node_pool(&pool.name, pool.restore_count, e));
            }
        }

        for entry in snapshot.entries() {
            if self.shutdown.is_requested() {
                warn!(
                    restored = report.restored,
                    "Shutdown requested, keeping stop state for the next start"
                );
                return Ok(StartOutcome::Interrupted(report));
            }

            match self
                .cluster
                .scale_workload(&entry.name, &entry.namespace, entry.original_replicas)
                .await
            {
                Ok(()) => {
                    report.restored += 1;
                    info!(
                        workload = %entry.name,
                        replicas = entry.original_replicas,
                        "Restored workload"
                    );
                }
                Err(e) => {
                    warn!(
                        workload = %entry.name,
                        error = %e,
                        retriable = e.is_retriable(),
                        "Failed to restore workload"
                    );
                    report.failures.push(ScaleFailure::workload(
                        &entry.name,
                        &entry.namespace,
                        entry.original_replicas,
                        e,
                    ));
                }
            }
        }

        self.settle().await;

        self.store.clear_stop_state()?;

        if report.is_degraded() {
            warn!(
                restored = report.restored,
                failed = report.failures.len(),
                "Cluster started with failures"
            );
        } else {
            info!(restored = report.restored, "Cluster started");
        }

        Ok(StartOutcome::Started(report))
    }

    async fn settle(&self) {
        let grace = self.config.settle_grace;
        if grace.is_zero() {
            return;
        }
        debug!(grace_secs = grace.as_secs(), "Waiting for workloads to settle");
        tokio::select! {
            () = tokio::time::sleep(grace) => {}
            () = self.shutdown.requested() => {
                warn!("Shutdown requested during settle grace, finishing start early");
            }
        }
    }
}
