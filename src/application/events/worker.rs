//! Notification worker
//!
//! Stand-in consumer for post-booking jobs: drains the bus and records what
//! an email/payments worker would act on.

use tokio::select;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::event_bus::SharedEventBus;
use crate::domain::events::{BookingEvent, EventMessage};
use crate::shared::shutdown::ShutdownSignal;

/// Spawn the worker. It stops on shutdown or when the bus closes.
pub fn start_notification_worker(bus: SharedEventBus, shutdown: ShutdownSignal) -> JoinHandle<()> {
    let mut subscriber = bus.subscribe();
    // The worker must not keep the channel alive on its own.
    drop(bus);

    tokio::spawn(async move {
        info!("📨 Notification worker started");
        loop {
            select! {
                msg = subscriber.recv() => match msg {
                    Some(msg) => handle(&msg),
                    None => {
                        debug!("Event bus closed");
                        break;
                    }
                },
                _ = shutdown.notified().wait() => {
                    info!("📨 Notification worker shutting down");
                    break;
                }
            }
        }
        info!("📨 Notification worker stopped");
    })
}

fn handle(msg: &EventMessage) {
    let event_type = msg.event.event_type();
    metrics::counter!("booking_jobs_total", "type" => event_type).increment(1);

    match &msg.event {
        BookingEvent::ReservationRequested { reservation_id, listing_id, guest_id, stay } => {
            info!(job_id = %msg.id, reservation_id, listing_id, %guest_id, %stay, "Notify host: new booking request");
        }
        BookingEvent::ReservationConfirmed { reservation_id, guest_id, total_price, .. } => {
            info!(job_id = %msg.id, reservation_id, %guest_id, %total_price, "Capture payment and send confirmation");
        }
        BookingEvent::ReservationRejected { reservation_id, guest_id, .. } => {
            info!(job_id = %msg.id, reservation_id, %guest_id, "Notify guest: request declined");
        }
        BookingEvent::ReservationCancelled { reservation_id, refund, .. } => {
            if refund.amount.is_zero() {
                info!(job_id = %msg.id, reservation_id, policy = %refund.policy, "Cancellation without refund");
            } else {
                info!(
                    job_id = %msg.id,
                    reservation_id,
                    percent = refund.percent,
                    amount = %refund.amount,
                    "Issue refund"
                );
            }
        }
        BookingEvent::ReservationCompleted { reservation_id, guest_id, .. } => {
            info!(job_id = %msg.id, reservation_id, %guest_id, "Request review");
        }
    }

    if let Ok(payload) = serde_json::to_string(msg) {
        debug!(%payload, "Job payload");
    } else {
        warn!(job_id = %msg.id, "Job payload could not be serialized");
    }
}
