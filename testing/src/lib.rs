//! # Ticket Verifier Testing
//!
//! Testing utilities for the Ticket Verifier console.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then harness for a single `reduce` call
//! - [`effects`]: a driver that runs effects and feeds actions back until
//!   the reducer settles
//! - [`MockApi`]: an in-memory backend implementing `TicketApi`, with call
//!   recording and failure injection
//! - [`FixedClock`]: deterministic time
//! - [`properties`]: proptest strategies for domain values
//!
//! ## Example
//!
//! ```ignore
//! use ticket_verifier_testing::{effects::settle, MockApi};
//!
//! #[tokio::test]
//! async fn activating_a_wave() {
//!     let api = MockApi::new().with_waves(vec![wave(1, true), wave(2, false)]);
//!     let env = environment(api.clone());
//!     let mut state = DashboardState::default();
//!
//!     settle(&DashboardReducer, &mut state, &env, DashboardAction::ToggleWave(2)).await;
//!
//!     assert!(api.wave(2).unwrap().is_active);
//! }
//! ```

pub mod effects;
pub mod mock_api;
pub mod reducer_test;

use chrono::{DateTime, NaiveDate, Utc};
use ticket_verifier_core::environment::Clock;

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ticket_verifier_testing::mocks::FixedClock;
    /// use ticket_verifier_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing utilities using proptest
pub mod properties {
    use proptest::prelude::*;

    /// Ticket counts a customer could plausibly request
    pub fn ticket_count() -> impl Strategy<Value = u32> {
        0u32..=500
    }

    /// Unit prices in whole cents, up to $1,000
    pub fn price_cents() -> impl Strategy<Value = u64> {
        0u64..=100_000
    }

    /// Email-shaped strings the validator must accept
    pub fn valid_email() -> impl Strategy<Value = String> {
        ("[a-z0-9._%+-]{1,12}", "[a-z0-9-]{1,10}", "[a-z]{2,6}")
            .prop_map(|(local, domain, tld)| format!("{local}@{domain}.{tld}"))
    }

    /// Strings without an `@`, which the validator must reject
    pub fn email_without_at() -> impl Strategy<Value = String> {
        "[a-z0-9.]{1,20}"
    }
}

/// Fixture builders for backend entities
pub mod fixtures {
    use super::NaiveDate;
    use ticket_verifier_api::{Order, OrderStatus, Wave};

    /// First day of the default fixture wave, matching [`test_clock`](super::test_clock)
    #[must_use]
    pub fn fixture_date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap_or_default()
    }

    /// A wave priced at $15 (boys) and $12.50 (girls)
    #[must_use]
    pub fn wave(id: i64, is_active: bool) -> Wave {
        Wave {
            id,
            name: format!("Wave {id}"),
            start_date: fixture_date(1),
            end_date: fixture_date(4),
            boys_price: 15.0,
            girls_price: 12.5,
            is_active,
            created_at: "2024-12-20T09:00:00".to_string(),
        }
    }

    /// A pending order for two boys' tickets
    #[must_use]
    pub fn order(id: i64, status: OrderStatus) -> Order {
        Order {
            id,
            uuid: format!("order-{id}"),
            name: format!("Customer {id}"),
            email: format!("customer{id}@example.org"),
            referral: None,
            boys_count: 2,
            girls_count: 0,
            wave_id: Some(1),
            expected_amount: 30.0,
            ocr_amount: None,
            ocr_date: None,
            ocr_name: None,
            status,
            receipt_path: Some(format!("receipt_{id}.png")),
            created_at: "2025-01-01T10:00:00".to_string(),
            notes: None,
            phone: None,
            wave_name: Some("Wave 1".to_string()),
            matched_transaction: None,
        }
    }
}

// Re-export commonly used items
pub use mock_api::{ApiCall, MockApi};
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::ReducerTest;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(clock.today(), fixtures::fixture_date(1));
    }
}
