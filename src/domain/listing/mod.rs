//! Listing aggregate
//!
//! Contains the Listing entity, its booking terms, and repository interface.

pub mod model;
pub mod repository;

pub use model::{
    CancellationPolicy, Listing, ListingStatus, Location, TermsUpdate, MAX_NIGHTLY_PRICE,
};
pub use repository::ListingRepository;
