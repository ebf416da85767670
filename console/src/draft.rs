//! Persisted order form draft
//!
//! Every field change is written under `customerFormData` so a customer who
//! closes the form does not lose what they typed. The receipt is never
//! persisted. Storage failures are logged and otherwise ignored; a broken
//! draft must not block an order.

use serde::{Deserialize, Serialize};
use ticket_verifier_api::LocalStore;
use ticket_verifier_api::storage::{keys, load_json, save_json};

/// The text fields of the order form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderDraft {
    /// Customer name
    pub name: String,
    /// Customer email
    pub email: String,
    /// Boys' tickets as entered (may be negative until validated)
    pub boys_tickets: i32,
    /// Girls' tickets as entered (may be negative until validated)
    pub girls_tickets: i32,
}

impl OrderDraft {
    /// Whether nothing has been entered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Load the stored draft
    #[must_use]
    pub fn load(store: &dyn LocalStore) -> Option<Self> {
        match load_json(store, keys::CUSTOMER_FORM) {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable order draft");
                None
            }
        }
    }

    /// Persist this draft
    pub fn save(&self, store: &dyn LocalStore) {
        if let Err(e) = save_json(store, keys::CUSTOMER_FORM, self) {
            tracing::warn!(error = %e, "Failed to save order draft");
        }
    }

    /// Remove the stored draft
    pub fn clear(store: &dyn LocalStore) {
        if let Err(e) = store.remove(keys::CUSTOMER_FORM) {
            tracing::warn!(error = %e, "Failed to remove order draft");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ticket_verifier_api::MemoryStore;

    #[test]
    fn save_then_load() {
        let store = MemoryStore::new();
        let draft = OrderDraft {
            name: "Ada".to_string(),
            email: "ada@example.org".to_string(),
            boys_tickets: 2,
            girls_tickets: 0,
        };
        draft.save(&store);

        let raw = store.get(keys::CUSTOMER_FORM).unwrap().unwrap();
        assert!(raw.contains("\"boys_tickets\":2"));
        assert_eq!(OrderDraft::load(&store), Some(draft));

        OrderDraft::clear(&store);
        assert_eq!(OrderDraft::load(&store), None);
    }

    #[test]
    fn corrupt_draft_is_ignored() {
        let store = MemoryStore::with_values([(keys::CUSTOMER_FORM, "{not json")]);
        assert_eq!(OrderDraft::load(&store), None);
    }

    #[test]
    fn partial_draft_fills_defaults() {
        let store = MemoryStore::with_values([(keys::CUSTOMER_FORM, r#"{"name":"Bo"}"#)]);
        let draft = OrderDraft::load(&store).unwrap();
        assert_eq!(draft.name, "Bo");
        assert_eq!(draft.girls_tickets, 0);
    }
}
