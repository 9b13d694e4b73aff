//! Background task that completes stays whose check-out date has passed.
//!
//! Runs in a tokio::spawn loop. Every tick it asks the booking service to
//! move Confirmed reservations with `end <= today` to Completed.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::booking::BookingService;
use crate::shared::shutdown::ShutdownSignal;

/// Start the completion sweeper.
pub fn start_completion_task(
    service: Arc<BookingService>,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            check_interval = check_interval_secs,
            "📅 Completion sweeper started"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs.max(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match service.complete_due_stays().await {
                        Ok(0) => debug!("No stays to complete"),
                        Ok(count) => info!(count, "Stays completed"),
                        Err(e) => warn!(error = %e, "Completion check error"),
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("📅 Completion sweeper shutting down");
                    break;
                }
            }
        }

        info!("📅 Completion sweeper stopped");
    })
}
