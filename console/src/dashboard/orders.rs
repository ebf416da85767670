//! Orders tab: review, delete confirmation, receipts, and email export

use std::collections::HashSet;

use ticket_verifier_api::{ApiError, OrderStatus, VerifiedEmails};
use ticket_verifier_core::{Effects, smallvec};

use super::{DashboardReducer, DashboardState, Notice, PendingDelete};
use crate::environment::ConsoleEnvironment;
use crate::query::Mutation;

/// Counts shown above the order list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderStats {
    /// Orders awaiting review on this page
    pub pending: usize,
    /// Approved, verified, or completed orders on this page
    pub approved: usize,
    /// Rejected orders on this page
    pub rejected: usize,
    /// Orders matching the filters across all pages
    pub total: u64,
    /// Configured waves
    pub waves: usize,
}

impl OrderStats {
    /// Derive stats from the cached queries
    #[must_use]
    pub fn from_state(state: &DashboardState) -> Self {
        let orders = state.cached_orders();
        let count = |f: fn(OrderStatus) -> bool| orders.iter().filter(|o| f(o.status)).count();
        Self {
            pending: count(|s| s == OrderStatus::Pending),
            approved: count(OrderStatus::is_success_like),
            rejected: count(|s| s == OrderStatus::Rejected),
            total: state.orders.data().map_or(0, |page| page.total),
            waves: state.cached_waves().len(),
        }
    }
}

/// Verified emails rendered for pasting into the ticketing tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailExport {
    /// Addresses in backend order, each once (compared case-insensitively)
    pub emails: Vec<String>,
    /// One address per line
    pub newline_separated: String,
    /// Addresses joined with `, `
    pub comma_separated: String,
}

impl From<VerifiedEmails> for EmailExport {
    fn from(verified: VerifiedEmails) -> Self {
        // One verified order per row, so repeat customers repeat
        let mut seen = HashSet::new();
        let emails: Vec<String> = verified
            .emails
            .into_iter()
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty() && seen.insert(email.to_lowercase()))
            .collect();
        Self {
            newline_separated: emails.join("\n"),
            comma_separated: emails.join(", "),
            emails,
        }
    }
}

impl DashboardReducer {
    pub(super) fn confirm_delete(
        state: &mut DashboardState,
        env: &ConsoleEnvironment,
    ) -> Effects<super::DashboardAction> {
        let Some(target) = state.pending_delete.take() else {
            return Effects::new();
        };
        let api = env.api.clone();
        match target {
            PendingDelete::Order(id) => {
                tracing::info!(order_id = id, "Deleting order");
                smallvec![Self::mutate(Mutation::DeleteOrder, async move {
                    api.delete_order(id).await
                })]
            }
            PendingDelete::Wave(id) => {
                tracing::info!(wave_id = id, "Deleting wave");
                smallvec![Self::mutate(Mutation::DeleteWave, async move {
                    api.delete_wave(id).await
                })]
            }
        }
    }

    pub(super) fn view_receipt(
        state: &mut DashboardState,
        env: &ConsoleEnvironment,
        order_id: i64,
    ) -> Effects<super::DashboardAction> {
        let path = state
            .cached_orders()
            .iter()
            .find(|order| order.id == order_id)
            .and_then(|order| order.receipt_path.clone())
            .filter(|path| !path.is_empty());

        match path {
            Some(path) => {
                state.receipt_link = Some(env.api.receipt_url(&path));
            }
            None => {
                state.receipt_link = None;
                state.notice = Some(Notice::Info("No receipt available for this order.".into()));
            }
        }
        Effects::new()
    }

    pub(super) fn verified_emails_loaded(
        state: &mut DashboardState,
        result: Result<VerifiedEmails, ApiError>,
    ) {
        match result {
            Ok(verified) if verified.count == 0 || verified.emails.is_empty() => {
                state.email_export = None;
                state.notice = Some(Notice::Info("No verified emails found.".into()));
            }
            Ok(verified) => {
                let count = verified.emails.len();
                state.email_export = Some(EmailExport::from(verified));
                state.notice = Some(Notice::Success(format!(
                    "Exported {count} verified email{}",
                    if count == 1 { "" } else { "s" }
                )));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Verified email export failed");
                state.notice = Some(Notice::Error(Self::failure_message(
                    "Error exporting emails",
                    &e,
                )));
            }
        }
    }
}
