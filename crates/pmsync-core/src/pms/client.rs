//! PMS client capability
//!
//! The reconciler never talks HTTP itself. A provider integration
//! implements [`PmsClient`] and is injected at construction; timeouts,
//! auth and rate limiting are the implementation's business.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{PmsReservation, PmsSyncEvent};
use crate::pms::error::PmsError;

/// Read access to the authoritative PMS
#[async_trait]
pub trait PmsClient: Send + Sync {
    /// The complete current reservation set
    async fn fetch_all_reservations(&self) -> Result<Vec<PmsReservation>, PmsError>;

    /// Change events with a timestamp strictly after `since`
    ///
    /// `None` asks for the full backlog (or whatever bootstrap behaviour
    /// the provider offers).
    async fn fetch_changes_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PmsSyncEvent>, PmsError>;
}

#[async_trait]
impl<T: PmsClient + ?Sized> PmsClient for Arc<T> {
    async fn fetch_all_reservations(&self) -> Result<Vec<PmsReservation>, PmsError> {
        (**self).fetch_all_reservations().await
    }

    async fn fetch_changes_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PmsSyncEvent>, PmsError> {
        (**self).fetch_changes_since(since).await
    }
}
