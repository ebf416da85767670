//! Customer order form
//!
//! Customers enter their name, email and ticket counts, attach a payment
//! receipt, and submit. The form shows a live quote against the wave that is
//! currently on sale and polls for wave changes while it is mounted.
//!
//! Every mount bumps a generation counter. Poll ticks and wave responses
//! carry the generation they were issued under, so anything arriving after an
//! unmount is dropped. Submission outcomes are the exception: an accepted
//! order clears the draft whenever its response arrives.
//!
//! The draft is read and written inside the reducer, under the store lock, so
//! stored drafts follow edit order.

use ticket_verifier_api::{ApiError, ApiResponse, NewOrder, Order, UploadFile, Wave};
use ticket_verifier_core::{Effects, effect::Effect, reducer::Reducer, smallvec};

use crate::draft::OrderDraft;
use crate::environment::ConsoleEnvironment;
use crate::pricing::Quote;
use crate::query::Query;
use crate::receipt::Receipt;
use crate::validation::{Field, FieldErrors, validate_order};

// ============================================================================
// State
// ============================================================================

/// Progress of the last submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Submission {
    /// Nothing submitted since the last reset
    #[default]
    Idle,
    /// Request in flight
    Submitting,
    /// Order accepted
    Succeeded {
        /// Id assigned by the backend
        order_id: Option<i64>,
        /// Confirmation to show
        message: String,
    },
    /// Submission failed; the entered data is kept
    Failed(String),
}

/// What the form knows about the wave on sale
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaveAvailability<'a> {
    /// First fetch still in flight
    Loading,
    /// A wave is on sale
    Active(&'a Wave),
    /// The backend reported no active wave; orders cannot be priced
    NoActiveWave,
    /// The wave could not be fetched
    Unavailable(&'a str),
}

/// State of the order form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFormState {
    /// Text fields, mirrored to local storage
    pub draft: OrderDraft,
    /// Selected receipt
    pub receipt: Option<Receipt>,
    /// Validation errors from the last submit attempt or receipt selection
    pub errors: FieldErrors,
    /// `GET /waves/current`; `Some(None)` means no wave is active
    pub wave: Query<Option<Wave>>,
    /// Last submission
    pub submission: Submission,
    /// Whether the form is on screen
    pub mounted: bool,
    /// Incremented on every mount and unmount
    pub generation: u64,
}

impl OrderFormState {
    /// Quote for the current ticket counts
    ///
    /// Negative counts price as zero; validation reports them separately.
    #[must_use]
    pub fn quote(&self) -> Quote {
        Quote::compute(
            self.current_wave(),
            u32::try_from(self.draft.boys_tickets).unwrap_or(0),
            u32::try_from(self.draft.girls_tickets).unwrap_or(0),
        )
    }

    /// The wave on sale, if known
    #[must_use]
    pub fn current_wave(&self) -> Option<&Wave> {
        self.wave.data().and_then(Option::as_ref)
    }

    /// Wave status for display
    #[must_use]
    pub fn availability(&self) -> WaveAvailability<'_> {
        match (self.wave.data(), self.wave.error()) {
            (Some(Some(wave)), _) => WaveAvailability::Active(wave),
            (Some(None), _) => WaveAvailability::NoActiveWave,
            (None, Some(error)) => WaveAvailability::Unavailable(error),
            (None, None) => WaveAvailability::Loading,
        }
    }

    /// Whether a submission is in flight
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self.submission, Submission::Submitting)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Actions for the order form
#[derive(Clone, Debug, PartialEq)]
pub enum OrderFormAction {
    /// Form shown: restore the draft, fetch the wave, start polling
    Mount,
    /// Form hidden: stop polling and ignore in-flight wave responses
    Unmount,
    /// Name edited
    SetName(String),
    /// Email edited
    SetEmail(String),
    /// Boys' ticket count edited
    SetBoysTickets(i32),
    /// Girls' ticket count edited
    SetGirlsTickets(i32),
    /// Files dropped or chosen; the first accepted one is kept
    SelectReceipt(Vec<UploadFile>),
    /// Receipt removed
    ClearReceipt,
    /// Re-fetch the current wave
    RefreshWave,
    /// Drop the cached wave, then re-fetch
    ForceRefreshWave,
    /// Poll timer fired
    PollTick {
        /// Generation the timer was scheduled under
        generation: u64,
    },
    /// Current wave fetched
    WaveLoaded {
        /// Generation the request was issued under
        generation: u64,
        /// `None` when no wave is active
        result: Result<Option<Wave>, ApiError>,
    },
    /// Validate and send the order
    Submit,
    /// Order request finished
    Submitted {
        /// Generation the request was issued under
        generation: u64,
        /// Backend response
        result: Result<ApiResponse<Order>, ApiError>,
    },
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the customer order form
#[derive(Clone, Debug)]
pub struct OrderFormReducer;

impl OrderFormReducer {
    /// Creates a new `OrderFormReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn fetch_wave(env: &ConsoleEnvironment, generation: u64) -> Effect<OrderFormAction> {
        let api = env.api.clone();
        Effect::future(async move {
            Some(OrderFormAction::WaveLoaded {
                generation,
                result: api.current_wave().await,
            })
        })
    }

    fn schedule_poll(env: &ConsoleEnvironment, generation: u64) -> Effect<OrderFormAction> {
        env.poll_interval.map_or(Effect::None, |duration| Effect::Delay {
            duration,
            action: Box::new(OrderFormAction::PollTick { generation }),
        })
    }

    fn save_draft(state: &OrderFormState, env: &ConsoleEnvironment) -> Effects<OrderFormAction> {
        state.draft.save(env.storage.as_ref());
        Effects::new()
    }

    fn submission_error(error: ApiError) -> String {
        let detail = match error {
            ApiError::Rejected(message) | ApiError::Api { message, .. } => message,
            other => other.user_message(),
        };
        format!("Order submission failed: {detail}")
    }
}

impl Default for OrderFormReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for OrderFormReducer {
    type State = OrderFormState;
    type Action = OrderFormAction;
    type Environment = ConsoleEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per form event
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        match action {
            OrderFormAction::Mount => {
                state.generation += 1;
                state.mounted = true;
                if !state.is_submitting() {
                    state.submission = Submission::Idle;
                }
                if let Some(draft) = OrderDraft::load(env.storage.as_ref()) {
                    state.draft = draft;
                }
                state.wave.start();
                smallvec![
                    Self::fetch_wave(env, state.generation),
                    Self::schedule_poll(env, state.generation),
                ]
            }

            OrderFormAction::Unmount => {
                state.mounted = false;
                state.generation += 1;
                Effects::new()
            }

            OrderFormAction::SetName(name) => {
                state.draft.name = name;
                state.errors.clear(Field::Name);
                Self::save_draft(state, env)
            }

            OrderFormAction::SetEmail(email) => {
                state.draft.email = email;
                state.errors.clear(Field::Email);
                Self::save_draft(state, env)
            }

            OrderFormAction::SetBoysTickets(count) => {
                state.draft.boys_tickets = count;
                state.errors.clear(Field::BoysTickets);
                state.errors.clear(Field::Tickets);
                Self::save_draft(state, env)
            }

            OrderFormAction::SetGirlsTickets(count) => {
                state.draft.girls_tickets = count;
                state.errors.clear(Field::GirlsTickets);
                state.errors.clear(Field::Tickets);
                Self::save_draft(state, env)
            }

            OrderFormAction::SelectReceipt(files) => {
                state.errors.clear(Field::Receipt);
                match Receipt::pick(files) {
                    Ok(receipt) => state.receipt = Some(receipt),
                    Err(e) => state.errors.add(Field::Receipt, e.to_string()),
                }
                Effects::new()
            }

            OrderFormAction::ClearReceipt => {
                state.receipt = None;
                Effects::new()
            }

            OrderFormAction::RefreshWave => {
                state.wave.start();
                smallvec![Self::fetch_wave(env, state.generation)]
            }

            OrderFormAction::ForceRefreshWave => {
                state.wave.reset();
                state.wave.start();
                smallvec![Self::fetch_wave(env, state.generation)]
            }

            OrderFormAction::PollTick { generation } => {
                if !state.mounted || generation != state.generation {
                    tracing::trace!(generation, "Dropping poll tick from an old mount");
                    return Effects::new();
                }
                smallvec![
                    Self::fetch_wave(env, generation),
                    Self::schedule_poll(env, generation),
                ]
            }

            OrderFormAction::WaveLoaded { generation, result } => {
                if generation != state.generation {
                    tracing::debug!(generation, "Ignoring wave response from an old mount");
                    return Effects::new();
                }
                match result {
                    Ok(wave) => state.wave.resolve(wave),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to fetch current wave");
                        state.wave.fail(e.user_message());
                    }
                }
                Effects::new()
            }

            OrderFormAction::Submit => {
                if state.is_submitting() {
                    return Effects::new();
                }

                let mut errors = validate_order(
                    &state.draft.name,
                    &state.draft.email,
                    state.draft.boys_tickets,
                    state.draft.girls_tickets,
                );
                if state.receipt.is_none() {
                    errors.add(Field::Receipt, "Please upload a receipt");
                }
                let Some(receipt) = state.receipt.as_ref().filter(|_| errors.is_empty()) else {
                    state.errors = errors;
                    return Effects::new();
                };

                let order = NewOrder {
                    name: state.draft.name.trim().to_string(),
                    email: state.draft.email.trim().to_string(),
                    boys_tickets: u32::try_from(state.draft.boys_tickets).unwrap_or(0),
                    girls_tickets: u32::try_from(state.draft.girls_tickets).unwrap_or(0),
                    receipt: receipt.file.clone(),
                };
                state.errors = FieldErrors::new();
                state.submission = Submission::Submitting;

                let api = env.api.clone();
                let generation = state.generation;
                smallvec![Effect::future(async move {
                    Some(OrderFormAction::Submitted {
                        generation,
                        result: api.create_order(order).await,
                    })
                })]
            }

            OrderFormAction::Submitted { generation, result } => {
                match result {
                    Ok(response) => {
                        let order_id = response.data.as_ref().map(|order| order.id);
                        tracing::info!(?order_id, "Order submitted");
                        state.submission = Submission::Succeeded {
                            order_id,
                            message: response
                                .message
                                .unwrap_or_else(|| "Order submitted successfully!".to_string()),
                        };
                        state.draft = OrderDraft::default();
                        state.receipt = None;
                        state.errors = FieldErrors::new();
                        OrderDraft::clear(env.storage.as_ref());

                        // Availability changed; only a mounted form refetches
                        state.wave.invalidate();
                        if !state.mounted || generation != state.generation {
                            tracing::debug!(generation, "Order accepted after the form closed");
                            return Effects::new();
                        }
                        state.wave.start();
                        smallvec![Self::fetch_wave(env, state.generation)]
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Order submission failed");
                        state.submission = Submission::Failed(Self::submission_error(e));
                        Effects::new()
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::pricing::Money;
    use crate::test_support::{harness, harness_with_storage};
    use std::time::Duration;
    use ticket_verifier_api::storage::keys;
    use ticket_verifier_api::{LocalStore, MemoryStore, OrderStatus};
    use ticket_verifier_testing::effects::settle;
    use ticket_verifier_testing::reducer_test::assertions;
    use ticket_verifier_testing::{ApiCall, MockApi, ReducerTest, fixtures};

    fn receipt() -> Receipt {
        Receipt::from_file(UploadFile::new("venmo.png", "image/png", b"png".to_vec())).unwrap()
    }

    fn filled_form() -> OrderFormState {
        OrderFormState {
            draft: OrderDraft {
                name: "Ada Lovelace".to_string(),
                email: "ada@example.org".to_string(),
                boys_tickets: 2,
                girls_tickets: 1,
            },
            receipt: Some(receipt()),
            mounted: true,
            generation: 1,
            ..OrderFormState::default()
        }
    }

    #[test]
    fn submit_without_receipt_issues_no_request() {
        let h = harness(MockApi::new().with_waves(vec![fixtures::wave(1, true)]));
        let api = h.api.clone();
        ReducerTest::new(OrderFormReducer::new())
            .with_env(h.env)
            .given_state(OrderFormState {
                receipt: None,
                ..filled_form()
            })
            .when_action(OrderFormAction::Submit)
            .then_state(|state| {
                assert_eq!(state.errors.get(Field::Receipt), Some("Please upload a receipt"));
                assert_eq!(state.submission, Submission::Idle);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
        assert!(api.calls().is_empty());
    }

    #[test]
    fn invalid_email_blocks_submit() {
        let h = harness(MockApi::new());
        ReducerTest::new(OrderFormReducer::new())
            .with_env(h.env)
            .given_state(OrderFormState {
                draft: OrderDraft {
                    email: "ada.example.org".to_string(),
                    ..filled_form().draft
                },
                ..filled_form()
            })
            .when_action(OrderFormAction::Submit)
            .then_state(|state| {
                assert_eq!(state.errors.get(Field::Email), Some("Invalid email address"));
                assert_eq!(state.errors.len(), 1);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[tokio::test]
    async fn successful_submit_resets_form_and_removes_draft() {
        let h = harness(MockApi::new().with_waves(vec![fixtures::wave(1, true)]));
        let mut state = filled_form();
        state.draft.save(h.storage.as_ref());

        settle(&OrderFormReducer, &mut state, &h.env, OrderFormAction::Submit).await;

        match &state.submission {
            Submission::Succeeded { order_id, .. } => assert!(order_id.is_some()),
            other => panic!("unexpected submission {other:?}"),
        }
        assert_eq!(state.draft, OrderDraft::default());
        assert!(state.receipt.is_none());
        assert_eq!(h.storage.get(keys::CUSTOMER_FORM).unwrap(), None);
        assert_eq!(
            h.api.calls(),
            vec![
                ApiCall::CreateOrder {
                    email: "ada@example.org".to_string(),
                    receipt: "venmo.png".to_string(),
                },
                ApiCall::CurrentWave,
            ]
        );
        let order = &h.api.all_orders()[0];
        assert!((order.expected_amount - 42.5).abs() < f64::EPSILON);
    }

    fn accepted(order_id: i64) -> Result<ApiResponse<Order>, ApiError> {
        Ok(ApiResponse {
            success: true,
            data: Some(fixtures::order(order_id, OrderStatus::Pending)),
            message: Some("Order submitted successfully!".to_string()),
            error: None,
        })
    }

    #[test]
    fn order_accepted_after_unmount_still_clears_draft() {
        let h = harness(MockApi::new());
        let storage = h.storage.clone();
        filled_form().draft.save(h.storage.as_ref());

        let state = ReducerTest::new(OrderFormReducer::new())
            .with_env(h.env.clone())
            .given_state(filled_form())
            .when_actions([
                OrderFormAction::Submit,
                OrderFormAction::Unmount,
                OrderFormAction::Submitted {
                    generation: 1,
                    result: accepted(101),
                },
            ])
            .then_state(|state| {
                assert!(matches!(
                    state.submission,
                    Submission::Succeeded {
                        order_id: Some(101),
                        ..
                    }
                ));
                assert_eq!(state.draft, OrderDraft::default());
                assert!(state.receipt.is_none());
            })
            .then_effects(|effects| assertions::assert_requests(effects, 0))
            .run();
        assert_eq!(storage.get(keys::CUSTOMER_FORM).unwrap(), None);

        // Back on the form, a new order can be sent
        ReducerTest::new(OrderFormReducer::new())
            .with_env(h.env)
            .given_state(state)
            .when_actions([
                OrderFormAction::Mount,
                OrderFormAction::SetName("Grace Hopper".to_string()),
                OrderFormAction::SetEmail("grace@example.org".to_string()),
                OrderFormAction::SetBoysTickets(1),
                OrderFormAction::SelectReceipt(vec![receipt().file]),
                OrderFormAction::Submit,
            ])
            .then_state(|state| assert_eq!(state.submission, Submission::Submitting))
            .then_effects(|effects| assertions::assert_requests(effects, 1))
            .run();
    }

    #[test]
    fn failed_submission_after_unmount_keeps_draft() {
        let h = harness(MockApi::new());
        filled_form().draft.save(h.storage.as_ref());

        ReducerTest::new(OrderFormReducer::new())
            .with_env(h.env.clone())
            .given_state(filled_form())
            .when_actions([
                OrderFormAction::Submit,
                OrderFormAction::Unmount,
                OrderFormAction::Submitted {
                    generation: 1,
                    result: Err(ApiError::Timeout),
                },
                OrderFormAction::Mount,
            ])
            .then_state(|state| {
                assert_eq!(state.submission, Submission::Idle);
                assert_eq!(state.draft.name, "Ada Lovelace");
            })
            .run();
        assert!(OrderDraft::load(h.storage.as_ref()).is_some());
    }

    #[tokio::test]
    async fn failed_submit_keeps_entered_data() {
        let h = harness(MockApi::new().with_waves(vec![fixtures::wave(1, false)]));
        let mut state = filled_form();

        settle(&OrderFormReducer, &mut state, &h.env, OrderFormAction::Submit).await;

        assert_eq!(
            state.submission,
            Submission::Failed("Order submission failed: No active wave available".to_string())
        );
        assert_eq!(state.draft.name, "Ada Lovelace");
        assert!(state.receipt.is_some());
    }

    #[tokio::test]
    async fn transport_failure_uses_friendly_message() {
        let h = harness(MockApi::new().with_waves(vec![fixtures::wave(1, true)]));
        h.api.fail_next(|c| matches!(c, ApiCall::CreateOrder { .. }), ApiError::Timeout);
        let mut state = filled_form();

        settle(&OrderFormReducer, &mut state, &h.env, OrderFormAction::Submit).await;

        assert_eq!(
            state.submission,
            Submission::Failed(
                "Order submission failed: The server took too long to respond. Please try again."
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn mount_restores_draft_and_schedules_poll() {
        let stored = OrderDraft {
            name: "Bo".to_string(),
            boys_tickets: 3,
            ..OrderDraft::default()
        };
        let storage = MemoryStore::new();
        stored.save(&storage);
        let h = harness_with_storage(
            MockApi::new().with_waves(vec![fixtures::wave(1, true)]),
            storage,
        );
        let env = h.env.clone().with_poll_interval(Duration::from_secs(5));
        let mut state = OrderFormState::default();

        let settled = settle(&OrderFormReducer, &mut state, &env, OrderFormAction::Mount).await;

        assert_eq!(state.draft, stored);
        assert_eq!(state.current_wave().map(|w| w.id), Some(1));
        assert_eq!(
            settled.delayed,
            vec![(Duration::from_secs(5), OrderFormAction::PollTick { generation: 1 })]
        );
        assert_eq!(state.quote().total, Some(Money::from_cents(4500)));
    }

    #[tokio::test]
    async fn poll_tick_refetches_and_reschedules() {
        let h = harness(MockApi::new().with_waves(vec![fixtures::wave(2, true)]));
        let env = h.env.clone().with_poll_interval(Duration::from_secs(5));
        let mut state = OrderFormState {
            mounted: true,
            generation: 4,
            ..OrderFormState::default()
        };

        let settled = settle(
            &OrderFormReducer,
            &mut state,
            &env,
            OrderFormAction::PollTick { generation: 4 },
        )
        .await;

        assert_eq!(state.current_wave().map(|w| w.id), Some(2));
        assert_eq!(settled.delayed.len(), 1);
    }

    #[test]
    fn poll_tick_after_unmount_is_dropped() {
        let h = harness(MockApi::new());
        ReducerTest::new(OrderFormReducer::new())
            .with_env(h.env.with_poll_interval(Duration::from_secs(5)))
            .given_state(OrderFormState {
                mounted: false,
                generation: 2,
                ..OrderFormState::default()
            })
            .when_action(OrderFormAction::PollTick { generation: 1 })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn stale_wave_response_is_ignored() {
        let h = harness(MockApi::new());
        ReducerTest::new(OrderFormReducer::new())
            .with_env(h.env)
            .given_state(OrderFormState {
                generation: 3,
                ..OrderFormState::default()
            })
            .when_action(OrderFormAction::WaveLoaded {
                generation: 2,
                result: Ok(Some(fixtures::wave(9, true))),
            })
            .then_state(|state| assert!(state.wave.data().is_none()))
            .run();
    }

    #[tokio::test]
    async fn no_active_wave_is_distinct_from_fetch_error() {
        let h = harness(MockApi::new().with_waves(vec![fixtures::wave(1, false)]));
        let mut state = OrderFormState::default();

        settle(&OrderFormReducer, &mut state, &h.env, OrderFormAction::Mount).await;
        assert_eq!(state.availability(), WaveAvailability::NoActiveWave);
        assert!(state.quote().is_default_priced());

        let h = harness(MockApi::new());
        h.api.fail_next(|c| matches!(c, ApiCall::CurrentWave), ApiError::Timeout);
        let mut state = OrderFormState::default();

        settle(&OrderFormReducer, &mut state, &h.env, OrderFormAction::Mount).await;
        assert!(matches!(state.availability(), WaveAvailability::Unavailable(_)));
    }

    #[test]
    fn drafts_are_stored_in_edit_order() {
        let h = harness(MockApi::new());
        let storage = h.storage.clone();

        ReducerTest::new(OrderFormReducer::new())
            .with_env(h.env)
            .given_state(OrderFormState::default())
            .when_actions([
                OrderFormAction::SetName("A".to_string()),
                OrderFormAction::SetName("Ad".to_string()),
                OrderFormAction::SetName("Ada".to_string()),
            ])
            .then_effects(assertions::assert_no_effects)
            .run();

        // Written before reduce returns, with nothing left to run
        assert_eq!(OrderDraft::load(storage.as_ref()).unwrap().name, "Ada");
    }

    #[tokio::test]
    async fn editing_a_field_persists_the_draft() {
        let h = harness(MockApi::new());
        let mut state = OrderFormState::default();

        settle(
            &OrderFormReducer,
            &mut state,
            &h.env,
            OrderFormAction::SetEmail("bo@example.org".to_string()),
        )
        .await;

        assert_eq!(OrderDraft::load(h.storage.as_ref()).unwrap().email, "bo@example.org");
    }

    #[test]
    fn receipt_selection_takes_first_accepted_file() {
        let h = harness(MockApi::new());
        ReducerTest::new(OrderFormReducer::new())
            .with_env(h.env)
            .given_state(OrderFormState::default())
            .when_action(OrderFormAction::SelectReceipt(vec![
                UploadFile::new("notes.txt", "text/plain", vec![]),
                UploadFile::new("statement.pdf", "application/pdf", vec![1]),
            ]))
            .then_state(|state| {
                let receipt = state.receipt.as_ref().unwrap();
                assert_eq!(receipt.file_name(), "statement.pdf");
                assert!(receipt.preview.is_none());
            })
            .run();
    }

    #[tokio::test]
    async fn force_refresh_drops_cached_wave_first() {
        let h = harness(MockApi::new().with_waves(vec![fixtures::wave(1, true)]));
        let mut state = OrderFormState::default();
        state.wave.resolve(Some(fixtures::wave(7, true)));
        h.api.fail_next(|c| matches!(c, ApiCall::CurrentWave), ApiError::Timeout);

        settle(&OrderFormReducer, &mut state, &h.env, OrderFormAction::ForceRefreshWave).await;

        assert!(state.wave.data().is_none());
        assert!(state.wave.error().is_some());
    }
}
