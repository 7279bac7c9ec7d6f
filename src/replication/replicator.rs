//! Periodic snapshot replication into a replica store.
//!
//! # Responsibilities
//! - Sleep the fixed interval, pull the primary's full record set, apply it
//! - Track the cycle phase and outcome counters
//! - Log failures and carry on; never stop short of shutdown

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};
use chrono::Utc;

use crate::lifecycle::shutdown::ShutdownListener;
use crate::observability::metrics;
use crate::replication::{ReplicationError, SnapshotSource};
use crate::store::{RecordStore, Role};

/// Fixed delay between cycles.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Phase of the replication cycle.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationPhase {
    Idle = 0,
    Fetching = 1,
    Applying = 2,
}

impl From<u8> for ReplicationPhase {
    fn from(val: u8) -> Self {
        match val {
            1 => ReplicationPhase::Fetching,
            2 => ReplicationPhase::Applying,
            _ => ReplicationPhase::Idle,
        }
    }
}

/// Keeps one replica store in step with the primary.
pub struct Replicator<S> {
    replica: Arc<RecordStore>,
    source: S,
    interval: Duration,
    phase: AtomicU8,
    cycles_completed: AtomicU64,
    cycles_failed: AtomicU64,
    /// Unix seconds of the last completed cycle, 0 if none.
    last_sync: AtomicI64,
}

impl<S: SnapshotSource> Replicator<S> {
    /// Bind a replicator to `replica`. A primary cannot replicate into itself.
    pub fn new(replica: Arc<RecordStore>, source: S, interval: Duration) -> Result<Self, ReplicationError> {
        if replica.role() != Role::Replica {
            return Err(ReplicationError::NotAReplica(replica.role()));
        }

        Ok(Self {
            replica,
            source,
            interval,
            phase: AtomicU8::new(ReplicationPhase::Idle as u8),
            cycles_completed: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            last_sync: AtomicI64::new(0),
        })
    }

    pub fn phase(&self) -> ReplicationPhase {
        self.phase.load(Ordering::Relaxed).into()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    pub fn cycles_failed(&self) -> u64 {
        self.cycles_failed.load(Ordering::Relaxed)
    }

    /// Unix seconds of the last completed cycle.
    pub fn last_sync(&self) -> Option<i64> {
        match self.last_sync.load(Ordering::Relaxed) {
            0 => None,
            ts => Some(ts),
        }
    }

    fn set_phase(&self, phase: ReplicationPhase) {
        self.phase.store(phase as u8, Ordering::Relaxed);
    }

    /// Fetch the primary's records and overwrite the replica with them.
    ///
    /// Returns the number of records applied.
    pub async fn run_cycle(&self) -> Result<usize, ReplicationError> {
        let start = Instant::now();

        self.set_phase(ReplicationPhase::Fetching);
        let records = match self.source.fetch_snapshot().await {
            Ok(records) => records,
            Err(e) => {
                self.set_phase(ReplicationPhase::Idle);
                return Err(self.fail("fetch", ReplicationError::Fetch(e)));
            }
        };

        self.set_phase(ReplicationPhase::Applying);
        let applied = self.replica.apply_snapshot(records).await;
        self.set_phase(ReplicationPhase::Idle);

        let applied = applied.map_err(|e| self.fail("apply", ReplicationError::Apply(e)))?;

        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.last_sync.store(Utc::now().timestamp(), Ordering::Relaxed);
        metrics::record_replication_success(applied, start);
        Ok(applied)
    }

    fn fail(&self, stage: &'static str, error: ReplicationError) -> ReplicationError {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
        metrics::record_replication_failure(stage);
        error
    }

    /// Replicate until shutdown. Errors are logged and the next cycle runs
    /// after the same delay.
    pub async fn run(self: Arc<Self>, mut shutdown: ShutdownListener) {
        tracing::info!(
            source = %self.source.describe(),
            interval_ms = self.interval.as_millis() as u64,
            "Replicator starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Replicator received shutdown signal, exiting loop");
                    break;
                }
            }

            match self.run_cycle().await {
                Ok(records) => {
                    tracing::info!(records, "Replica synced with primary");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Replication cycle failed");
                }
            }
        }
    }
}
