//! Cached backend queries
//!
//! Each dashboard view reads from a [`Query`] keyed by [`QueryKey`]. A query
//! keeps its last data while a refetch is in flight, and results are applied
//! in arrival order (last response wins). Mutations never patch cached data;
//! they invalidate the keys listed by [`invalidated_by`] and refetch them.

use std::fmt;

/// Identity of a cached query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
    /// `GET /orders` with the current filters
    Orders,
    /// `GET /waves`
    Waves,
    /// `GET /waves/current`
    CurrentWave,
    /// `GET /analytics`
    Analytics,
    /// `GET /csv/uploads`
    CsvUploads,
}

impl QueryKey {
    /// Every key, in refresh order
    pub const ALL: [Self; 5] = [
        Self::Orders,
        Self::Waves,
        Self::CurrentWave,
        Self::Analytics,
        Self::CsvUploads,
    ];
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Orders => "orders",
            Self::Waves => "waves",
            Self::CurrentWave => "current_wave",
            Self::Analytics => "analytics",
            Self::CsvUploads => "csv_uploads",
        };
        f.write_str(name)
    }
}

/// A write the dashboard performs against the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// `DELETE /orders/:id`
    DeleteOrder,
    /// `POST /orders/:id/approve`
    ApproveOrder,
    /// `POST /orders/:id/reject`
    RejectOrder,
    /// `POST /orders/rerun-matching`
    RerunMatching,
    /// `POST /waves`
    CreateWave,
    /// `PUT /waves/:id`
    UpdateWave,
    /// `DELETE /waves/:id`
    DeleteWave,
    /// Activation or deactivation of a wave
    ToggleWave,
    /// `POST /csv/upload`
    UploadCsv,
}

impl Mutation {
    /// Message shown when the backend does not supply one
    #[must_use]
    pub const fn success_message(self) -> &'static str {
        match self {
            Self::DeleteOrder => "Order deleted successfully",
            Self::ApproveOrder => "Order approved",
            Self::RejectOrder => "Order rejected",
            Self::RerunMatching => "Payment matching completed",
            Self::CreateWave => "Wave created successfully",
            Self::UpdateWave => "Wave updated successfully",
            Self::DeleteWave => "Wave deleted successfully",
            Self::ToggleWave => "Wave status updated",
            Self::UploadCsv => "CSV uploaded successfully",
        }
    }

    /// Prefix for failure messages
    #[must_use]
    pub const fn failure_prefix(self) -> &'static str {
        match self {
            Self::DeleteOrder => "Error deleting order",
            Self::ApproveOrder => "Error approving order",
            Self::RejectOrder => "Error rejecting order",
            Self::RerunMatching => "Error running payment matching",
            Self::CreateWave => "Error creating wave",
            Self::UpdateWave => "Error updating wave",
            Self::DeleteWave => "Error deleting wave",
            Self::ToggleWave => "Error updating wave status",
            Self::UploadCsv => "Error uploading CSV",
        }
    }
}

/// Queries that must be refetched after `mutation` succeeds
#[must_use]
pub const fn invalidated_by(mutation: Mutation) -> &'static [QueryKey] {
    match mutation {
        Mutation::DeleteOrder
        | Mutation::ApproveOrder
        | Mutation::RejectOrder
        | Mutation::RerunMatching => &[QueryKey::Orders, QueryKey::Analytics],
        Mutation::CreateWave
        | Mutation::UpdateWave
        | Mutation::DeleteWave
        | Mutation::ToggleWave => &[QueryKey::Waves, QueryKey::CurrentWave, QueryKey::Analytics],
        Mutation::UploadCsv => &[QueryKey::CsvUploads, QueryKey::Analytics],
    }
}

/// Lifecycle of the most recent fetch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchStatus {
    /// Never fetched
    #[default]
    Idle,
    /// A fetch is in flight
    Loading,
    /// Last fetch succeeded
    Ready,
    /// Last fetch failed with this message
    Failed(String),
}

/// One cached query result
#[derive(Debug, Clone, PartialEq)]
pub struct Query<T> {
    data: Option<T>,
    status: FetchStatus,
    stale: bool,
    fetches: u32,
}

impl<T> Default for Query<T> {
    fn default() -> Self {
        Self {
            data: None,
            status: FetchStatus::Idle,
            stale: true,
            fetches: 0,
        }
    }
}

impl<T> Query<T> {
    /// Mark a fetch as started; existing data stays visible
    pub fn start(&mut self) {
        self.status = FetchStatus::Loading;
        self.fetches += 1;
    }

    /// Apply a successful response
    pub fn resolve(&mut self, data: T) {
        self.data = Some(data);
        self.status = FetchStatus::Ready;
        self.stale = false;
    }

    /// Apply a failed response; existing data stays visible
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = FetchStatus::Failed(message.into());
    }

    /// Mark the cached data as out of date
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Drop cached data entirely
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Last successfully fetched data
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Status of the most recent fetch
    #[must_use]
    pub const fn status(&self) -> &FetchStatus {
        &self.status
    }

    /// Whether a fetch is in flight
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.status, FetchStatus::Loading)
    }

    /// Whether the data should be refetched
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.stale
    }

    /// Message from the last failed fetch
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FetchStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Number of fetches started since creation
    #[must_use]
    pub const fn fetch_count(&self) -> u32 {
        self.fetches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_refetch_keeps_previous_data() {
        let mut query = Query::default();
        query.start();
        query.resolve(vec![1, 2, 3]);
        query.invalidate();
        query.start();
        query.fail("Request timed out");

        assert_eq!(query.data(), Some(&vec![1, 2, 3]));
        assert_eq!(query.error(), Some("Request timed out"));
        assert!(query.is_stale());
        assert_eq!(query.fetch_count(), 2);
    }

    #[test]
    fn last_response_wins() {
        let mut query = Query::default();
        query.start();
        query.start();
        query.resolve("poll");
        query.resolve("manual");
        assert_eq!(query.data(), Some(&"manual"));
        assert!(!query.is_loading());
    }

    #[test]
    fn order_mutations_refresh_orders_and_analytics() {
        for mutation in [Mutation::DeleteOrder, Mutation::ApproveOrder, Mutation::RejectOrder] {
            assert_eq!(invalidated_by(mutation), &[QueryKey::Orders, QueryKey::Analytics]);
        }
    }

    #[test]
    fn wave_mutations_refresh_current_wave() {
        for mutation in [
            Mutation::CreateWave,
            Mutation::UpdateWave,
            Mutation::DeleteWave,
            Mutation::ToggleWave,
        ] {
            assert!(invalidated_by(mutation).contains(&QueryKey::CurrentWave));
            assert!(invalidated_by(mutation).contains(&QueryKey::Waves));
            assert!(!invalidated_by(mutation).contains(&QueryKey::Orders));
        }
    }

    #[test]
    fn csv_upload_refreshes_history() {
        assert_eq!(
            invalidated_by(Mutation::UploadCsv),
            &[QueryKey::CsvUploads, QueryKey::Analytics]
        );
    }
}
