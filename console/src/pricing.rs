//! Order pricing
//!
//! Quotes are computed in integer cents so `boys × boys_price + girls ×
//! girls_price` is exact. The backend sends prices as decimal dollars; they
//! are rounded to the nearest cent once, on the way in.

use std::fmt;

use serde::{Deserialize, Serialize};
use ticket_verifier_api::Wave;

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero dollars
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from a decimal dollar amount
    ///
    /// Rounds to the nearest cent. Returns `None` for negative, NaN, or
    /// out-of-range amounts.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_dollars(dollars: f64) -> Option<Self> {
        let cents = (dollars * 100.0).round();
        // 2^63 cents is far beyond any ticket price
        (cents.is_finite() && cents >= 0.0 && cents < 9.2e18).then(|| Self(cents as u64))
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount as decimal dollars, for wire formats
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_dollars(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies by a quantity with overflow checking
    #[must_use]
    pub const fn checked_mul(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Unit price used for both categories when no wave is on sale
pub const DEFAULT_UNIT_PRICE: Money = Money::from_cents(1400);

// ============================================================================
// Quotes
// ============================================================================

/// Where a quote's unit prices came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceSource {
    /// Prices of the active wave
    Wave {
        /// Wave id
        id: i64,
        /// Wave name, for display
        name: String,
    },
    /// No wave was resolvable; [`DEFAULT_UNIT_PRICE`] applies
    Default,
}

/// A priced ticket request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Boys' tickets
    pub boys: u32,
    /// Girls' tickets
    pub girls: u32,
    /// Unit price of a boys' ticket
    pub boys_price: Money,
    /// Unit price of a girls' ticket
    pub girls_price: Money,
    /// `boys × boys_price + girls × girls_price`; `None` on overflow
    pub total: Option<Money>,
    /// Provenance of the unit prices
    pub source: PriceSource,
}

impl Quote {
    /// Price a request against the active wave, or the default price
    ///
    /// A wave price the backend sent as negative or non-finite counts as zero.
    #[must_use]
    pub fn compute(wave: Option<&Wave>, boys: u32, girls: u32) -> Self {
        let (boys_price, girls_price, source) = match wave {
            Some(wave) => (
                Money::from_dollars(wave.boys_price).unwrap_or(Money::ZERO),
                Money::from_dollars(wave.girls_price).unwrap_or(Money::ZERO),
                PriceSource::Wave {
                    id: wave.id,
                    name: wave.name.clone(),
                },
            ),
            None => (DEFAULT_UNIT_PRICE, DEFAULT_UNIT_PRICE, PriceSource::Default),
        };

        let total = boys_price
            .checked_mul(boys)
            .zip(girls_price.checked_mul(girls))
            .and_then(|(b, g)| b.checked_add(g));

        Self {
            boys,
            girls,
            boys_price,
            girls_price,
            total,
            source,
        }
    }

    /// Whether the default price was used
    #[must_use]
    pub const fn is_default_priced(&self) -> bool {
        matches!(self.source, PriceSource::Default)
    }

    /// Total number of tickets
    #[must_use]
    pub const fn tickets(&self) -> u32 {
        self.boys.saturating_add(self.girls)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ticket_verifier_testing::{fixtures, properties};

    fn wave_priced(boys_cents: u64, girls_cents: u64) -> Wave {
        let mut wave = fixtures::wave(1, true);
        wave.boys_price = Money::from_cents(boys_cents).as_dollars();
        wave.girls_price = Money::from_cents(girls_cents).as_dollars();
        wave
    }

    #[test]
    fn default_price_applies_without_a_wave() {
        let quote = Quote::compute(None, 2, 1);
        assert!(quote.is_default_priced());
        assert_eq!(quote.total, Some(Money::from_cents(4200)));
        assert_eq!(quote.total.unwrap().to_string(), "$42.00");
    }

    #[test]
    fn wave_prices_are_used_even_when_zero() {
        let quote = Quote::compute(Some(&wave_priced(0, 1250)), 3, 2);
        assert_eq!(quote.boys_price, Money::ZERO);
        assert_eq!(quote.total, Some(Money::from_cents(2500)));
        assert_eq!(
            quote.source,
            PriceSource::Wave {
                id: 1,
                name: "Wave 1".to_string()
            }
        );
    }

    #[test]
    fn decimal_prices_round_to_cents() {
        assert_eq!(Money::from_dollars(14.99), Some(Money::from_cents(1499)));
        assert_eq!(Money::from_dollars(0.1 + 0.2), Some(Money::from_cents(30)));
        assert_eq!(Money::from_dollars(-1.0), None);
        assert_eq!(Money::from_dollars(f64::NAN), None);
    }

    #[test]
    fn display_pads_cents() {
        assert_eq!(Money::from_cents(1405).to_string(), "$14.05");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
    }

    proptest! {
        #[test]
        fn total_is_exact_for_wave_prices(
            boys in properties::ticket_count(),
            girls in properties::ticket_count(),
            boys_cents in properties::price_cents(),
            girls_cents in properties::price_cents(),
        ) {
            let quote = Quote::compute(Some(&wave_priced(boys_cents, girls_cents)), boys, girls);
            let expected = u64::from(boys) * boys_cents + u64::from(girls) * girls_cents;
            prop_assert_eq!(quote.total, Some(Money::from_cents(expected)));
        }

        #[test]
        fn total_uses_default_without_wave(
            boys in properties::ticket_count(),
            girls in properties::ticket_count(),
        ) {
            let quote = Quote::compute(None, boys, girls);
            let expected = u64::from(boys + girls) * DEFAULT_UNIT_PRICE.cents();
            prop_assert_eq!(quote.total, Some(Money::from_cents(expected)));
            prop_assert!(quote.is_default_priced());
        }
    }
}
