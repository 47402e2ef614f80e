// Scheduled ambient posting
// One cycle shortly after startup, then one per period. Missed ticks are
// not caught up.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::features::poster::{PostOutcome, Poster};
use crate::features::store::ConfigStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTiming {
    pub initial_delay: Duration,
    pub period: Duration,
}

/// Tally of one scheduled cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub posted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Attempt every channel in the document once, then save once
pub async fn run_cycle<Tz: TimeZone>(
    store: &ConfigStore,
    poster: &Poster,
    now: &DateTime<Tz>,
) -> CycleReport {
    let mut doc = store.load();
    let channel_ids: Vec<String> = doc.channels.keys().cloned().collect();
    let mut report = CycleReport::default();

    for channel_id in &channel_ids {
        match poster.post_channel(&mut doc, channel_id, now).await {
            Ok(PostOutcome::Posted(_)) => report.posted += 1,
            Ok(PostOutcome::Skipped(reason)) => {
                debug!("Skipped channel {}: {:?}", channel_id, reason);
                report.skipped += 1;
            }
            Err(e) => {
                error!("Scheduled post to channel {} failed: {}", channel_id, e);
                report.failed += 1;
            }
        }
    }

    if let Err(e) = store.save(&doc) {
        error!("Failed to save config after scheduled cycle: {}", e);
    }

    report
}

/// Handle to a running scheduler task
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the loop to exit and wait for it. A cycle in progress finishes first.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("Scheduler task ended abnormally: {:?}", e);
        }
    }
}

pub struct Scheduler;

impl Scheduler {
    pub fn spawn(store: Arc<ConfigStore>, poster: Poster, timing: ScheduleTiming) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + timing.initial_delay, timing.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                "Ambient scheduler started (first cycle in {:?}, then every {:?})",
                timing.initial_delay, timing.period
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = run_cycle(&store, &poster, &Local::now()).await;
                        info!(
                            "Ambient cycle done: {} posted, {} skipped, {} failed",
                            report.posted, report.skipped, report.failed
                        );
                    }
                    _ = stop_rx.changed() => break,
                }
            }

            info!("Ambient scheduler stopped");
        });

        SchedulerHandle { stop_tx, task }
    }
}
