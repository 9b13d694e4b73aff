//! Booking service runtime.
//!
//! Provides [`ServiceHandle`] that encapsulates the full service lifecycle:
//! metrics, database init, migrations, repositories, the booking and
//! listing services, background tasks, and graceful shutdown.
//!
//! The CLI uses it both for the long-running `serve` command and for the
//! one-shot operator commands.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{
    create_event_bus, start_completion_task, start_notification_worker, BookingService,
    ListingCalendar, ListingService, SharedEventBus,
};
use crate::config::AppConfig;
use crate::domain::{RepositoryProvider, SystemClock};
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
use crate::shared::errors::InfraError;
use crate::shared::retry::RetryConfig;
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the booking service.
pub struct ServiceOptions {
    /// Application configuration.
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
    /// Spawn the completion sweeper and notification worker (default: true).
    /// One-shot CLI commands turn this off.
    pub background_tasks: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            background_tasks: true,
        }
    }
}

// ── ServiceHandle ──────────────────────────────────────────────────

/// Handle to a running booking service.
///
/// ```rust,no_run
/// use stayhub::service::{ServiceHandle, ServiceOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServiceHandle::start(ServiceOptions::default()).await?;
///     // ... wait for shutdown signal ...
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ServiceHandle {
    /// Job queue for post-booking side effects.
    pub event_bus: SharedEventBus,
    /// Repository provider for data access.
    pub repos: Arc<dyn RepositoryProvider>,
    pub bookings: Arc<BookingService>,
    pub listings: Arc<ListingService>,
    pub calendar: Arc<ListingCalendar>,
    /// The configuration the service was started with.
    pub config: AppConfig,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    tasks: Vec<JoinHandle<()>>,
}

impl ServiceHandle {
    /// Start the booking service with the given options.
    ///
    /// This will:
    /// 1. Install the Prometheus exporter (if enabled)
    /// 2. Connect to the database and run migrations
    /// 3. Wire repositories, job queue and services
    /// 4. Start the completion sweeper and notification worker
    pub async fn start(opts: ServiceOptions) -> Result<Self, InfraError> {
        let app_cfg = opts.config;

        info!("Starting StayHub booking service...");

        if app_cfg.metrics.enabled {
            install_prometheus(&app_cfg.metrics.listen_addr)?;
        }

        // ── Database ───────────────────────────────────────────
        let db_config = DatabaseConfig::from(&app_cfg.database);
        let db = init_database(&db_config).await?;

        if opts.auto_migrate {
            info!("Running database migrations...");
            Migrator::up(&db, None).await?;
            info!("Migrations completed");
        }

        // ── Repositories, job queue & services ─────────────────
        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

        let event_bus = create_event_bus(app_cfg.booking.job_queue_capacity);
        info!("🔔 Event bus initialized for post-booking jobs");

        let retry = RetryConfig::once(std::time::Duration::from_millis(
            app_cfg.booking.retry_delay_ms,
        ));
        let bookings = Arc::new(
            BookingService::new(repos.clone(), event_bus.clone(), Arc::new(SystemClock))
                .with_retry(retry),
        );
        let listings = Arc::new(ListingService::new(repos.clone()));
        let calendar = Arc::new(ListingCalendar::new(repos.clone()));

        // ── Background tasks ───────────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.service.shutdown_timeout);
        let mut tasks = Vec::new();
        if opts.background_tasks {
            tasks.push(start_notification_worker(
                event_bus.clone(),
                shutdown.signal(),
            ));
            tasks.push(start_completion_task(
                bookings.clone(),
                shutdown.signal(),
                app_cfg.booking.completion_check_interval_secs,
            ));
            info!("🚀 Background tasks started");
        }

        Ok(Self {
            event_bus,
            repos,
            bookings,
            listings,
            calendar,
            config: app_cfg,
            db,
            shutdown,
            tasks,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown (non-blocking).
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for background tasks to stop after shutdown has been triggered,
    /// bounded by `service.shutdown_timeout`, then close the database.
    pub async fn wait(self) {
        info!("⏳ Waiting for background tasks to complete...");

        let tasks = self.tasks;
        let finished = self
            .shutdown
            .shutdown_with_cleanup(|| async move {
                for task in tasks {
                    if let Err(e) = task.await {
                        error!("Background task panicked: {}", e);
                    }
                }
            })
            .await;
        if !finished {
            warn!("Some background tasks did not stop in time");
        }

        if let Err(e) = self.db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("✅ Database connection closed");
        }

        info!("👋 StayHub booking service shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down booking service...");
        self.trigger_shutdown();
        self.wait().await;
    }

    /// Check if any background task is still running.
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Install the Prometheus recorder and its HTTP listener.
///
/// The global recorder can only be installed once per process; later calls
/// are no-ops.
fn install_prometheus(listen_addr: &str) -> Result<(), InfraError> {
    static INSTALLED: OnceLock<SocketAddr> = OnceLock::new();
    if let Some(addr) = INSTALLED.get() {
        info!("📊 Prometheus exporter already listening on {}", addr);
        return Ok(());
    }

    let addr: SocketAddr = listen_addr
        .parse()
        .map_err(|e| InfraError::Config(format!("metrics.listen_addr '{}': {}", listen_addr, e)))?;
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| InfraError::Metrics(e.to_string()))?;
    let _ = INSTALLED.set(addr);
    info!("📊 Prometheus metrics available at http://{}/metrics", addr);
    Ok(())
}

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup (before [`ServiceHandle::start`]).
/// `RUST_LOG` wins over `logging.level`.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let result = match config.logging.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init(),
    };
    if result.is_err() {
        warn!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{BookingRequest, NewListing};
    use crate::domain::{CancellationPolicy, ListingStatus, Location};
    use rust_decimal::Decimal;

    fn memory_config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.database.url = "sqlite::memory:".to_string();
        cfg.database.max_connections = 1;
        cfg
    }

    #[tokio::test]
    async fn start_book_and_shut_down() {
        let handle = ServiceHandle::start(ServiceOptions {
            config: memory_config(),
            ..Default::default()
        })
        .await
        .unwrap();
        assert!(handle.is_running());

        let listing = handle
            .listings
            .create_listing(NewListing {
                host_id: "host-1".into(),
                title: "Attic room".into(),
                location: Location {
                    address: "Main St 1".into(),
                    city: "Ghent".into(),
                    country: "BE".into(),
                    latitude: 51.05,
                    longitude: 3.72,
                },
                nightly_price: Decimal::new(6000, 2),
                currency: "EUR".into(),
                max_guests: 2,
                instant_booking: true,
                cancellation_policy: CancellationPolicy::Strict,
            })
            .await
            .unwrap();
        handle
            .listings
            .set_status(listing.id, ListingStatus::Published)
            .await
            .unwrap();

        let start = chrono::Utc::now().date_naive() + chrono::Days::new(30);
        let r = handle
            .bookings
            .create_booking(BookingRequest {
                listing_id: listing.id,
                guest_id: "guest-1".into(),
                start,
                end: start + chrono::Days::new(2),
                guest_count: 2,
            })
            .await
            .unwrap();
        assert_eq!(r.total_price, Decimal::new(12000, 2));
        assert_eq!(handle.calendar.occupied(listing.id, None).await.unwrap().len(), 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn one_shot_mode_spawns_nothing() {
        let handle = ServiceHandle::start(ServiceOptions {
            config: memory_config(),
            auto_migrate: true,
            background_tasks: false,
        })
        .await
        .unwrap();
        assert!(!handle.is_running());
        assert_eq!(handle.event_bus.subscriber_count(), 0);
        handle.shutdown().await;
    }
}
