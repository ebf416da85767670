//! Client-side validation
//!
//! Runs before any request is issued. Errors are keyed by [`Field`] so a form
//! can show each message next to its input.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

#[allow(clippy::expect_used)]
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$")
        .expect("hardcoded email pattern should always compile")
});

/// Minimum length of a new admin password
pub const MIN_PASSWORD_LEN: usize = 8;

/// An input that can carry a validation error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// Customer or wave name
    Name,
    /// Customer email
    Email,
    /// Boys' ticket count
    BoysTickets,
    /// Girls' ticket count
    GirlsTickets,
    /// Ticket totals across categories
    Tickets,
    /// Receipt upload
    Receipt,
    /// Wave start date
    StartDate,
    /// Wave end date
    EndDate,
    /// Boys' unit price
    BoysPrice,
    /// Girls' unit price
    GirlsPrice,
    /// New password
    NewPassword,
    /// New password confirmation
    ConfirmPassword,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::BoysTickets => "boys_tickets",
            Self::GirlsTickets => "girls_tickets",
            Self::Tickets => "tickets",
            Self::Receipt => "receipt",
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
            Self::BoysPrice => "boys_price",
            Self::GirlsPrice => "girls_price",
            Self::NewPassword => "new_password",
            Self::ConfirmPassword => "confirm_password",
        };
        f.write_str(name)
    }
}

/// Validation messages keyed by field; at most one message per field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    /// No errors
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; the first message for a field wins
    pub fn add(&mut self, field: Field, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// Clear the error on one field
    pub fn clear(&mut self, field: Field) {
        self.0.remove(&field);
    }

    /// Message for `field`, if any
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Whether there are no errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Errors in field order
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// `Ok(())` when empty, otherwise the errors
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed validation.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Whether `email` looks like a deliverable address
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// Validate the customer order fields (the receipt is checked on submit)
#[must_use]
pub fn validate_order(name: &str, email: &str, boys: i32, girls: i32) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if name.trim().is_empty() {
        errors.add(Field::Name, "Name is required");
    }

    let email = email.trim();
    if email.is_empty() {
        errors.add(Field::Email, "Email is required");
    } else if !is_valid_email(email) {
        errors.add(Field::Email, "Invalid email address");
    }

    if boys < 0 {
        errors.add(Field::BoysTickets, "Must be 0 or more");
    }
    if girls < 0 {
        errors.add(Field::GirlsTickets, "Must be 0 or more");
    }
    if boys >= 0 && girls >= 0 && boys.saturating_add(girls) == 0 {
        errors.add(Field::Tickets, "Select at least one ticket");
    }

    errors
}

/// Validate a wave form
#[must_use]
pub fn validate_wave(
    name: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    boys_price: f64,
    girls_price: f64,
) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if name.trim().is_empty() {
        errors.add(Field::Name, "Wave name is required");
    }
    if end_date < start_date {
        errors.add(Field::EndDate, "End date must be on or after the start date");
    }
    if !(boys_price.is_finite() && boys_price >= 0.0) {
        errors.add(Field::BoysPrice, "Price must be 0 or more");
    }
    if !(girls_price.is_finite() && girls_price >= 0.0) {
        errors.add(Field::GirlsPrice, "Price must be 0 or more");
    }

    errors
}

/// Validate a password change before it is sent
#[must_use]
pub fn validate_password_change(new_password: &str, confirm_password: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if new_password != confirm_password {
        errors.add(Field::ConfirmPassword, "New passwords do not match");
    }
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            Field::NewPassword,
            "Password must be at least 8 characters long",
        );
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ticket_verifier_testing::{fixtures::fixture_date, properties};

    #[test]
    fn accepts_short_domains() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("First.Last+tag@Example.ORG"));
    }

    #[test]
    fn rejects_malformed_emails() {
        for email in ["ab.co", "a@b", "a@.", "@b.co", "a b@c.de", "a@b.c"] {
            assert!(!is_valid_email(email), "{email} should be rejected");
        }
    }

    #[test]
    fn empty_order_reports_every_field() {
        let errors = validate_order("  ", "", 0, 0);
        assert_eq!(errors.get(Field::Name), Some("Name is required"));
        assert_eq!(errors.get(Field::Email), Some("Email is required"));
        assert_eq!(errors.get(Field::Tickets), Some("Select at least one ticket"));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn negative_counts_are_rejected_per_field() {
        let errors = validate_order("Ada", "ada@example.org", -1, 2);
        assert_eq!(errors.get(Field::BoysTickets), Some("Must be 0 or more"));
        assert_eq!(errors.get(Field::GirlsTickets), None);
        assert_eq!(errors.get(Field::Tickets), None);
    }

    #[test]
    fn valid_order_passes() {
        assert!(validate_order("Ada", "ada@example.org", 0, 1).into_result().is_ok());
    }

    #[test]
    fn wave_end_before_start_is_rejected() {
        let errors = validate_wave("Early bird", fixture_date(5), fixture_date(4), 14.0, 14.0);
        assert!(errors.get(Field::EndDate).is_some());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn wave_prices_must_not_be_negative() {
        let errors = validate_wave("", fixture_date(1), fixture_date(1), -0.01, f64::NAN);
        assert_eq!(errors.get(Field::Name), Some("Wave name is required"));
        assert!(errors.get(Field::BoysPrice).is_some());
        assert!(errors.get(Field::GirlsPrice).is_some());
    }

    #[test]
    fn password_rules() {
        let errors = validate_password_change("short", "other");
        assert_eq!(errors.get(Field::ConfirmPassword), Some("New passwords do not match"));
        assert_eq!(
            errors.get(Field::NewPassword),
            Some("Password must be at least 8 characters long")
        );
        assert!(validate_password_change("longenough", "longenough").is_empty());
    }

    #[test]
    fn display_joins_messages() {
        let errors = validate_order("", "x@y.io", 1, 0);
        assert_eq!(errors.to_string(), "name: Name is required");
    }

    proptest! {
        #[test]
        fn generated_emails_are_accepted(email in properties::valid_email()) {
            prop_assert!(is_valid_email(&email));
        }

        #[test]
        fn strings_without_at_are_rejected(email in properties::email_without_at()) {
            prop_assert!(!is_valid_email(&email));
        }
    }
}
