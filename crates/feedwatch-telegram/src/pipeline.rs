//! The update run: ingest, reconcile, persist, render, deliver.
//!
//! The baseline is saved as soon as reconciliation completes, before any
//! notification goes out. A crash mid-delivery loses the remaining
//! notifications of that run instead of repeating them on restart.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use feedwatch_core::{
    reconcile, CaptionRenderer, FeedIngester, IngestedFeed, ReconciliationResult, UpdateKind,
};
use feedwatch_models::{Baseline, ReleaseId};
use feedwatch_persistence::{BaselineStore, SubscriberStore};
use tokio::sync::{Mutex, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::delivery::{Delivery, DeliveryError, Notification};
use crate::error::Result;

/// Caption header of a release seen for the first time.
pub const NEW_RELEASE_HEADER: &str = "New release";

/// Caption header of a release whose timestamp advanced.
pub const UPDATED_RELEASE_HEADER: &str = "Release updated";

/// Returns the caption header for an update kind.
pub fn header_for(kind: UpdateKind) -> &'static str {
    match kind {
        UpdateKind::New => NEW_RELEASE_HEADER,
        UpdateKind::Updated => UPDATED_RELEASE_HEADER,
    }
}

/// Counters of one completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Releases that were new or advanced.
    pub updates: usize,
    /// Successful sends, counted per recipient.
    pub delivered: usize,
    /// Releases skipped because their caption could not fit.
    pub skipped_overflow: usize,
    /// Recipients unsubscribed after blocking the bot.
    pub removed_recipients: usize,
    /// Sends that failed for any other reason.
    pub failed_deliveries: usize,
}

/// Result of asking the service to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunReport),
    /// Another run held the guard.
    Skipped,
}

/// Summary of the most recent completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastRun {
    pub finished_at: DateTime<Utc>,
    pub report: RunReport,
}

/// A rendered update waiting for delivery.
#[derive(Debug)]
struct PendingNotification {
    id: ReleaseId,
    kind: UpdateKind,
    notification: Notification,
}

/// Owns everything an update run touches.
pub struct WatchService {
    ingester: FeedIngester,
    baseline: BaselineStore,
    subscribers: SubscriberStore,
    renderer: CaptionRenderer,
    delivery: Arc<dyn Delivery>,
    run_guard: Mutex<()>,
    last_run: RwLock<Option<LastRun>>,
}

impl WatchService {
    pub fn new(
        ingester: FeedIngester,
        baseline: BaselineStore,
        subscribers: SubscriberStore,
        renderer: CaptionRenderer,
        delivery: Arc<dyn Delivery>,
    ) -> Self {
        Self {
            ingester,
            baseline,
            subscribers,
            renderer,
            delivery,
            run_guard: Mutex::new(()),
            last_run: RwLock::new(None),
        }
    }

    /// Recipient list shared with the command handlers.
    pub fn subscribers(&self) -> &SubscriberStore {
        &self.subscribers
    }

    pub async fn last_run(&self) -> Option<LastRun> {
        *self.last_run.read().await
    }

    /// Performs one update run unless another one is still in progress.
    ///
    /// Ingestion, baseline and subscriber-list failures abort the run.
    /// Caption overflow and per-recipient delivery failures do not.
    pub async fn run(&self) -> Result<RunOutcome> {
        let Ok(_guard) = self.run_guard.try_lock() else {
            warn!("Previous run still in progress, skipping this one");
            return Ok(RunOutcome::Skipped);
        };

        let baseline = self.baseline.load()?;
        let feed = self.ingester.ingest().await?;

        let reconciled = reconcile(&baseline, &feed.timestamps);
        self.baseline.save(&reconciled.next_baseline)?;
        info!(
            updates = reconciled.updates.len(),
            tracked = reconciled.next_baseline.len(),
            expired = baseline
                .keys()
                .filter(|id| !reconciled.next_baseline.contains_key(*id))
                .count(),
            "Baseline saved"
        );

        let mut report = RunReport {
            updates: reconciled.updates.len(),
            ..RunReport::default()
        };

        let pending = self.render(&baseline, &feed, &reconciled, &mut report);
        self.deliver(&pending, &mut report).await?;

        *self.last_run.write().await = Some(LastRun {
            finished_at: Utc::now(),
            report,
        });

        info!(
            updates = report.updates,
            delivered = report.delivered,
            skipped_overflow = report.skipped_overflow,
            removed_recipients = report.removed_recipients,
            failed_deliveries = report.failed_deliveries,
            "Run complete"
        );
        Ok(RunOutcome::Completed(report))
    }

    /// Runs once and logs the outcome instead of returning it.
    pub async fn run_logged(&self) {
        match self.run().await {
            Ok(RunOutcome::Completed(report)) => {
                debug!(?report, "Scheduled run finished");
            }
            Ok(RunOutcome::Skipped) => {}
            Err(e) => {
                error!(error = %e, "Update run failed");
            }
        }
    }

    /// Renders every update, oldest first. Overflowing releases are dropped.
    fn render(
        &self,
        baseline: &Baseline,
        feed: &IngestedFeed,
        reconciled: &ReconciliationResult,
        report: &mut RunReport,
    ) -> Vec<PendingNotification> {
        let mut updates: Vec<(&ReleaseId, i64)> =
            reconciled.updates.iter().map(|(id, ts)| (id, *ts)).collect();
        updates.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

        let mut pending = Vec::with_capacity(updates.len());
        for (id, _) in updates {
            let (Some(kind), Some(release)) =
                (reconciled.kind(baseline, id), feed.releases.get(id))
            else {
                continue;
            };

            match self.renderer.render(header_for(kind), release) {
                Ok(caption) => pending.push(PendingNotification {
                    id: id.clone(),
                    kind,
                    notification: Notification {
                        caption,
                        banner: release.meta.banner.clone(),
                    },
                }),
                Err(e) => {
                    warn!(id = %id, error = %e, "Skipping release");
                    report.skipped_overflow += 1;
                }
            }
        }
        pending
    }

    /// Sends each notification to every subscriber.
    async fn deliver(
        &self,
        pending: &[PendingNotification],
        report: &mut RunReport,
    ) -> Result<()> {
        if pending.is_empty() {
            return Ok(());
        }

        let mut recipients = self.subscribers.load()?;
        if recipients.is_empty() {
            info!(pending = pending.len(), "No subscribers, nothing to deliver");
            return Ok(());
        }

        for item in pending {
            for chat_id in recipients.clone() {
                match self.delivery.deliver(chat_id, &item.notification).await {
                    Ok(()) => report.delivered += 1,
                    Err(DeliveryError::Blocked { reason, .. }) => {
                        warn!(chat_id = %chat_id, reason = %reason, "Recipient unreachable, unsubscribing");
                        recipients.remove(&chat_id);
                        match self.subscribers.remove(chat_id) {
                            Ok(_) => report.removed_recipients += 1,
                            Err(e) => {
                                error!(chat_id = %chat_id, error = %e, "Failed to unsubscribe recipient");
                            }
                        }
                    }
                    Err(e) => {
                        warn!(id = %item.id, error = %e, "Delivery failed");
                        report.failed_deliveries += 1;
                    }
                }
            }
            debug!(id = %item.id, kind = ?item.kind, "Update delivered");
        }
        Ok(())
    }
}

/// Starts a run on every tick of a fixed interval; the first tick is immediate.
///
/// Each run is spawned, so a run that outlives the interval overlaps the
/// next tick and the run guard turns that tick into a skip.
pub async fn run_scheduler(service: Arc<WatchService>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(period_secs = period.as_secs(), "Scheduler started");

    loop {
        ticker.tick().await;
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service.run_logged().await;
        });
    }
}
