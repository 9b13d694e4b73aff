//! StayHub booking core - CLI
//!
//! Runs the booking service headless (systemd, Docker, standalone) and
//! exposes the booking use cases as operator commands.
//!
//! ```sh
//! # Run with default config (~/.config/stayhub/config.toml)
//! stayhub serve
//!
//! # Custom config path
//! stayhub --config /etc/stayhub/config.toml serve
//!
//! # Validate config without starting
//! stayhub check
//!
//! # Book and confirm
//! stayhub book --listing 1 --guest g-42 --from 2025-07-01 --to 2025-07-05 --guests 2
//! stayhub confirm 17
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info};

use stayhub::application::{BookingRequest, ListingTerms, NewListing};
use stayhub::config::AppConfig;
use stayhub::domain::{CancellationPolicy, ListingStatus, Location, StayRange};
use stayhub::service::{init_tracing, ServiceHandle, ServiceOptions};

/// StayHub booking core: reservation lifecycle and availability engine.
#[derive(Parser, Debug)]
#[command(
    name = "stayhub",
    version,
    about = "Reservation lifecycle and availability engine",
    long_about = "StayHub booking core: creates reservations without double booking, \
                  drives them through their lifecycle and completes finished stays.\n\n\
                  Default config: ~/.config/stayhub/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "STAYHUB_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Override the database URL.
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the service: completion sweeper, notification worker, metrics.
    Serve {
        /// Skip database migrations on startup.
        #[arg(long)]
        no_migrate: bool,
    },
    /// Validate the configuration file and exit.
    Check,
    /// Apply database migrations and exit.
    Migrate,
    /// Manage listings.
    #[command(subcommand)]
    Listing(ListingCommand),
    /// Request a stay.
    Book(BookArgs),
    /// Approve a pending reservation.
    Confirm { id: i32 },
    /// Decline a pending reservation.
    Reject { id: i32 },
    /// Cancel a reservation.
    Cancel { id: i32 },
    /// Complete a stay whose check-out date has passed.
    Complete { id: i32 },
    /// Complete every finished stay now.
    Sweep,
    /// Show a reservation.
    Show { id: i32 },
    /// List reservations of a listing or a guest.
    Reservations {
        #[arg(long, conflicts_with = "guest", required_unless_present = "guest")]
        listing: Option<i32>,
        #[arg(long)]
        guest: Option<String>,
    },
    /// Is a listing free for a date range?
    Available {
        #[arg(long)]
        listing: i32,
        #[arg(long, value_parser = parse_date)]
        from: NaiveDate,
        #[arg(long, value_parser = parse_date)]
        to: NaiveDate,
    },
    /// Show the occupied dates of a listing.
    Calendar {
        listing: i32,
        #[arg(long, value_parser = parse_date, requires = "to")]
        from: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date, requires = "from")]
        to: Option<NaiveDate>,
        /// Print one line per occupied night.
        #[arg(long)]
        nights: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ListingCommand {
    /// Create a listing (starts as Draft).
    Create(CreateListingArgs),
    /// Make a listing bookable.
    Publish { id: i32 },
    /// Set any listing status (Draft, Published, Inactive, Suspended, UnderReview).
    Status {
        id: i32,
        #[arg(value_parser = parse_listing_status)]
        status: ListingStatus,
    },
    /// Change price, capacity, instant booking or cancellation policy.
    Terms {
        id: i32,
        #[arg(long)]
        price: Option<Decimal>,
        #[arg(long)]
        max_guests: Option<i32>,
        #[arg(long)]
        instant: Option<bool>,
        #[arg(long, value_parser = parse_policy)]
        policy: Option<CancellationPolicy>,
    },
    /// List all listings.
    List,
}

#[derive(Args, Debug)]
struct CreateListingArgs {
    #[arg(long)]
    host: String,
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    country: String,
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    lon: f64,
    /// Nightly price, e.g. 120.00
    #[arg(long)]
    price: Decimal,
    #[arg(long, default_value = "EUR")]
    currency: String,
    #[arg(long, default_value_t = 2)]
    max_guests: i32,
    /// New reservations are confirmed without host approval.
    #[arg(long)]
    instant: bool,
    #[arg(long, value_parser = parse_policy, default_value = "Moderate")]
    policy: CancellationPolicy,
}

#[derive(Args, Debug)]
struct BookArgs {
    #[arg(long)]
    listing: i32,
    #[arg(long)]
    guest: String,
    /// Check-in date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    from: NaiveDate,
    /// Check-out date (YYYY-MM-DD), exclusive
    #[arg(long, value_parser = parse_date)]
    to: NaiveDate,
    #[arg(long, default_value_t = 1)]
    guests: i32,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn parse_policy(s: &str) -> Result<CancellationPolicy, String> {
    CancellationPolicy::from_str(s)
        .ok_or_else(|| "expected Flexible, Moderate, Strict or NonRefundable".to_string())
}

fn parse_listing_status(s: &str) -> Result<ListingStatus, String> {
    ListingStatus::from_str(s).ok_or_else(|| format!("unknown listing status '{s}'"))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(stayhub::default_config_path);

    let (mut config, load_error) = if config_path.exists() {
        match AppConfig::load(&config_path) {
            Ok(cfg) => (cfg, None),
            Err(e) => (AppConfig::default(), Some(e)),
        }
    } else {
        (AppConfig::default(), None)
    };

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(ref url) = cli.database_url {
        config.database.url = url.clone();
    }

    init_tracing(&config);
    match load_error {
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            if matches!(cli.command, Command::Check) {
                return Err(e.into());
            }
            error!("Using default configuration.");
        }
        None if config_path.exists() => {
            info!("Configuration loaded from {}", config_path.display())
        }
        None => info!(
            "No config at {}, using defaults",
            config_path.display()
        ),
    }

    match cli.command {
        // ── Config validation mode ─────────────────────────────
        Command::Check => {
            println!("✅ Configuration is valid");
            println!("   Config file : {}", config_path.display());
            println!("   Database    : {}", config.database.connection_url());
            println!("   Log level   : {}", config.logging.level);
            println!(
                "   Sweeper     : every {}s",
                config.booking.completion_check_interval_secs
            );
            if config.metrics.enabled {
                println!("   Metrics     : http://{}/metrics", config.metrics.listen_addr);
            } else {
                println!("   Metrics     : disabled");
            }
            Ok(())
        }

        // ── Long-running service ───────────────────────────────
        Command::Serve { no_migrate } => {
            let handle = ServiceHandle::start(ServiceOptions {
                config,
                auto_migrate: !no_migrate,
                background_tasks: true,
            })
            .await?;

            // Install OS signal handlers (SIGTERM, SIGINT)
            handle.install_signal_handler();
            info!("🚀 Press Ctrl+C to shutdown gracefully.");

            handle.shutdown_signal().wait().await;
            handle.wait().await;
            Ok(())
        }

        // ── One-shot commands ──────────────────────────────────
        command => {
            let handle = ServiceHandle::start(ServiceOptions {
                config,
                auto_migrate: true,
                background_tasks: false,
            })
            .await?;
            let result = run_command(&handle, command).await;
            handle.shutdown().await;
            result
        }
    }
}

async fn run_command(
    handle: &ServiceHandle,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    let bookings = &handle.bookings;
    let listings = &handle.listings;

    match command {
        Command::Migrate => println!("✅ Database schema is up to date"),
        Command::Listing(ListingCommand::Create(args)) => {
            let listing = listings
                .create_listing(NewListing {
                    host_id: args.host,
                    title: args.title,
                    location: Location {
                        address: args.address,
                        city: args.city,
                        country: args.country,
                        latitude: args.lat,
                        longitude: args.lon,
                    },
                    nightly_price: args.price,
                    currency: args.currency,
                    max_guests: args.max_guests,
                    instant_booking: args.instant,
                    cancellation_policy: args.policy,
                })
                .await?;
            print_json(&listing)?;
        }
        Command::Listing(ListingCommand::Publish { id }) => {
            print_json(&listings.set_status(id, ListingStatus::Published).await?)?;
        }
        Command::Listing(ListingCommand::Status { id, status }) => {
            print_json(&listings.set_status(id, status).await?)?;
        }
        Command::Listing(ListingCommand::Terms {
            id,
            price,
            max_guests,
            instant,
            policy,
        }) => {
            let terms = ListingTerms {
                nightly_price: price,
                max_guests,
                instant_booking: instant,
                cancellation_policy: policy,
            };
            print_json(&listings.update_terms(id, terms).await?)?;
        }
        Command::Listing(ListingCommand::List) => print_json(&listings.list().await?)?,
        Command::Book(args) => {
            let reservation = bookings
                .create_booking(BookingRequest {
                    listing_id: args.listing,
                    guest_id: args.guest,
                    start: args.from,
                    end: args.to,
                    guest_count: args.guests,
                })
                .await?;
            print_json(&reservation)?;
        }
        Command::Confirm { id } => print_json(&bookings.confirm(id).await?)?,
        Command::Reject { id } => print_json(&bookings.reject(id).await?)?,
        Command::Cancel { id } => print_json(&bookings.cancel(id).await?)?,
        Command::Complete { id } => print_json(&bookings.complete(id).await?)?,
        Command::Sweep => {
            let count = bookings.complete_due_stays().await?;
            println!("✅ Completed {count} stay(s)");
        }
        Command::Show { id } => print_json(&bookings.get(id).await?)?,
        Command::Reservations { listing, guest } => {
            let found = match (listing, guest) {
                (Some(listing_id), _) => bookings.list_for_listing(listing_id).await?,
                (None, Some(guest_id)) => bookings.list_for_guest(&guest_id).await?,
                (None, None) => Vec::new(),
            };
            print_json(&found)?;
        }
        Command::Available { listing, from, to } => {
            let free = bookings.availability().is_available(listing, from, to).await?;
            if free {
                println!("✅ Listing {listing} is available {from}..{to}");
            } else {
                println!("❌ Listing {listing} is not available {from}..{to}");
            }
        }
        Command::Calendar {
            listing,
            from,
            to,
            nights,
        } => {
            let window = match (from, to) {
                (Some(from), Some(to)) => Some(StayRange::new(from, to)?),
                _ => None,
            };
            if nights {
                for night in handle.calendar.blocked_nights(listing, window).await? {
                    println!("{night}");
                }
            } else {
                print_json(&handle.calendar.occupied(listing, window).await?)?;
            }
        }
        Command::Check | Command::Serve { .. } => {}
    }
    Ok(())
}
