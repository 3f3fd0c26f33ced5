//! Background reconciliation between the token store and the object bucket.
//!
//! Tokens expire in the store on their own; the objects they pointed at do
//! not. A timer-driven task periodically runs a pass that removes objects no
//! live token references anymore, plus the cache entries left behind by
//! expired tokens.
//!
//! Each pass has three stages:
//!
//! 1. Build the live reference set fresh from token targets. The existence
//!    cache is never consulted here; a stale cache entry must not decide
//!    which objects survive.
//! 2. Sweep the existence cache. Entries whose token is gone are removed,
//!    deleting the backing object first when no live token references it.
//! 3. Sweep the bucket. Objects outside the live set and older than the
//!    grace window are deleted, along with any cache entries naming them.
//!
//! A pass that cannot build the live set is abandoned: deleting objects
//! against an incomplete reference set would destroy data behind live
//! tokens. Individual failures in the later stages are logged and skipped;
//! the next pass retries them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use futures::StreamExt;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::repositories::{KeyStore, ObjectClient, StoreError, StoreResult};

/// Settings for the reconciliation task.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Time between passes.
    pub interval: Duration,
    /// Objects modified more recently than this are never deleted, so an
    /// upload whose token write has not landed yet is not reaped.
    pub grace_window: Duration,
    /// Deadline for a single pass.
    pub pass_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            grace_window: Duration::from_secs(900),
            pass_timeout: Duration::from_secs(300),
        }
    }
}

/// Counts from one reconciliation pass, for logs and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    /// Object names referenced by live tokens at the start of the pass.
    pub live_references: usize,
    /// Existence-cache entries examined.
    pub entries_checked: usize,
    /// Existence-cache entries removed.
    pub entries_removed: u64,
    /// Objects deleted from the bucket.
    pub objects_deleted: u64,
    /// Unreferenced objects left alone because they are younger than the
    /// grace window.
    pub skipped_grace: u64,
    /// Individual failures that were logged and skipped.
    pub errors: u64,
}

/// Reconciles bucket contents against live tokens.
pub struct Reconciler {
    store: Arc<dyn KeyStore>,
    objects: Arc<dyn ObjectClient>,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn KeyStore>,
        objects: Arc<dyn ObjectClient>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            objects,
            config,
        }
    }

    /// Runs one pass under the configured deadline.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the pass exceeds its deadline, and
    /// whatever the live-reference scan returned if it failed. In both cases
    /// nothing further is deleted until the next pass.
    pub async fn run_pass(&self) -> StoreResult<PassSummary> {
        match tokio::time::timeout(self.config.pass_timeout, self.reconcile()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Io(format!(
                "reconciliation pass exceeded {:?} deadline",
                self.config.pass_timeout
            ))),
        }
    }

    async fn reconcile(&self) -> StoreResult<PassSummary> {
        let mut summary = PassSummary::default();

        // Stage 1: live references, fresh from token targets.
        let live = self.store.live_object_references().await?;
        summary.live_references = live.len();

        // Stage 2: sweep cache entries whose token is gone. A wholesale scan
        // failure skips the stage; the bucket sweep below only needs the
        // live set and can still run.
        let entries = match self.store.cache_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "cache entry scan failed, skipping cache sweep");
                summary.errors += 1;
                Vec::new()
            }
        };

        for entry in entries {
            summary.entries_checked += 1;

            match self.store.exists(&entry.token).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    warn!(token = %entry.token, error = %e, "token liveness check failed");
                    summary.errors += 1;
                    continue;
                }
            }

            if let Some(object) = entry.object.as_deref() {
                if !live.contains(object) {
                    // Keep the entry on delete failure so the next pass
                    // retries the object.
                    match self.objects.delete(object).await {
                        Ok(()) => {
                            summary.objects_deleted += 1;
                            info!(token = %entry.token, object, "deleted object of expired token");
                        }
                        Err(e) => {
                            warn!(token = %entry.token, object, error = %e, "object delete failed");
                            summary.errors += 1;
                            continue;
                        }
                    }
                }
            }

            match self.store.remove_cache_entry(&entry.token).await {
                Ok(()) => summary.entries_removed += 1,
                Err(e) => {
                    warn!(token = %entry.token, error = %e, "cache entry removal failed");
                    summary.errors += 1;
                }
            }
        }

        // Stage 3: sweep the bucket for objects nothing references.
        let cutoff = Utc::now()
            - ChronoDuration::from_std(self.config.grace_window)
                .unwrap_or_else(|_| ChronoDuration::days(3650));

        let mut listing = self.objects.list_all();
        while let Some(item) = listing.next().await {
            let object = match item {
                Ok(object) => object,
                Err(e) => {
                    warn!(error = %e, "bucket listing item failed");
                    summary.errors += 1;
                    continue;
                }
            };

            if live.contains(&object.name) {
                continue;
            }
            if object.last_modified > cutoff {
                debug!(object = %object.name, "unreferenced object within grace window");
                summary.skipped_grace += 1;
                continue;
            }

            match self.objects.delete(&object.name).await {
                Ok(()) => {
                    summary.objects_deleted += 1;
                    info!(object = %object.name, "deleted orphaned object");
                }
                Err(e) => {
                    warn!(object = %object.name, error = %e, "orphan delete failed");
                    summary.errors += 1;
                    continue;
                }
            }

            // Stray entries naming the deleted object would otherwise serve
            // positive existence answers for an object that is gone.
            match self.store.purge_cache_entries_for(&object.name).await {
                Ok(purged) => summary.entries_removed += purged,
                Err(e) => {
                    warn!(object = %object.name, error = %e, "stray entry purge failed");
                    summary.errors += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// Starts the reconciliation task.
///
/// Returns a [`CancellationToken`]; cancelling it stops the task after the
/// in-flight pass, if any, completes. The first pass runs immediately,
/// subsequent ones on the configured interval. Passes never overlap.
pub fn spawn_reconciler(
    store: Arc<dyn KeyStore>,
    objects: Arc<dyn ObjectClient>,
    config: ReconcilerConfig,
) -> CancellationToken {
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();
    let reconciler = Reconciler::new(store, objects, config);

    tokio::spawn(async move {
        run(reconciler, task_cancel).await;
    });

    cancel
}

async fn run(reconciler: Reconciler, cancel: CancellationToken) {
    // tokio panics on a zero interval.
    let period = reconciler.config.interval.max(Duration::from_secs(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        interval_secs = period.as_secs(),
        grace_secs = reconciler.config.grace_window.as_secs(),
        "reconciler started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("reconciler stopped");
                return;
            }
            _ = ticker.tick() => {
                match reconciler.run_pass().await {
                    Ok(summary) => {
                        record_pass(&summary);
                        let quiet = summary.entries_removed == 0
                            && summary.objects_deleted == 0
                            && summary.errors == 0;
                        if quiet {
                            debug!(live_references = summary.live_references, "reconciliation pass complete, nothing to do");
                        } else {
                            info!(
                                live_references = summary.live_references,
                                entries_checked = summary.entries_checked,
                                entries_removed = summary.entries_removed,
                                objects_deleted = summary.objects_deleted,
                                skipped_grace = summary.skipped_grace,
                                errors = summary.errors,
                                "reconciliation pass complete"
                            );
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "reconciliation pass abandoned");
                        metrics::counter!("reconciler_passes_failed_total").increment(1);
                    }
                }
            }
        }
    }
}

fn record_pass(summary: &PassSummary) {
    metrics::counter!("reconciler_passes_total").increment(1);
    metrics::counter!("reconciler_objects_deleted_total").increment(summary.objects_deleted);
    metrics::counter!("reconciler_entries_removed_total").increment(summary.entries_removed);
    metrics::counter!("reconciler_errors_total").increment(summary.errors);
}
