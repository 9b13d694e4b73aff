//! Listing repository interface

use async_trait::async_trait;

use super::model::{Listing, ListingStatus, TermsUpdate};
use crate::domain::DomainResult;

#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// Save a new listing; the store assigns the id
    async fn save(&self, listing: Listing) -> DomainResult<Listing>;

    /// Find listing by ID
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Listing>>;

    /// Write only the status column
    async fn update_status(&self, id: i32, status: ListingStatus) -> DomainResult<()>;

    /// Write only the terms present in `terms`
    async fn update_terms(&self, id: i32, terms: &TermsUpdate) -> DomainResult<()>;

    /// Find all listings
    async fn find_all(&self) -> DomainResult<Vec<Listing>>;
}
