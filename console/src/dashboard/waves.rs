//! Waves tab: the wave form and single-active-wave activation
//!
//! The backend does not enforce a single active wave, so activation is a
//! client-side sequence: deactivate every other active wave, then activate
//! the target. The sequence stops at the first failed call and reports what
//! was already applied.

use chrono::{Days, NaiveDate};
use std::sync::Arc;
use ticket_verifier_api::{ApiError, TicketApi, Wave, WaveForm, WaveUpdate};
use ticket_verifier_core::{Effects, effect::Effect, smallvec};

use super::{DashboardAction, DashboardReducer, DashboardState, Notice};
use crate::environment::ConsoleEnvironment;
use crate::pricing::DEFAULT_UNIT_PRICE;
use crate::query::{Mutation, invalidated_by};
use crate::validation::{FieldErrors, validate_wave};

/// Default length of a new wave
const DEFAULT_WAVE_DAYS: Days = Days::new(3);

// ============================================================================
// Wave form
// ============================================================================

/// One edit to the wave form
#[derive(Debug, Clone, PartialEq)]
pub enum WaveField {
    /// Display name
    Name(String),
    /// First day of sales
    StartDate(NaiveDate),
    /// Last day of sales
    EndDate(NaiveDate),
    /// Boys' unit price in dollars
    BoysPrice(f64),
    /// Girls' unit price in dollars
    GirlsPrice(f64),
    /// Whether the wave is selling
    Active(bool),
}

/// The open wave form
#[derive(Debug, Clone, PartialEq)]
pub struct WaveEditor {
    /// Wave being edited; `None` for a new wave
    pub editing: Option<i64>,
    /// Current field values
    pub form: WaveForm,
    /// Whether the end date was chosen explicitly
    pub end_date_set: bool,
    /// Validation errors from the last save attempt
    pub errors: FieldErrors,
    /// Whether a save is in flight
    pub saving: bool,
}

impl WaveEditor {
    /// Empty form: starts today, runs three days, $14 for both categories
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        let price = DEFAULT_UNIT_PRICE.as_dollars();
        Self {
            editing: None,
            form: WaveForm {
                name: String::new(),
                start_date: today,
                end_date: default_end(today),
                boys_price: price,
                girls_price: price,
                is_active: true,
            },
            end_date_set: false,
            errors: FieldErrors::new(),
            saving: false,
        }
    }

    /// Form prefilled from an existing wave
    #[must_use]
    pub fn edit(wave: &Wave) -> Self {
        Self {
            editing: Some(wave.id),
            form: WaveForm::from(wave),
            end_date_set: true,
            errors: FieldErrors::new(),
            saving: false,
        }
    }

    /// Apply one field change
    ///
    /// Moving the start date of a new wave moves its end date along, until
    /// the end date is set by hand.
    pub fn apply(&mut self, field: WaveField) {
        match field {
            WaveField::Name(name) => self.form.name = name,
            WaveField::StartDate(start) => {
                self.form.start_date = start;
                if self.editing.is_none() && !self.end_date_set {
                    self.form.end_date = default_end(start);
                }
            }
            WaveField::EndDate(end) => {
                self.form.end_date = end;
                self.end_date_set = true;
            }
            WaveField::BoysPrice(price) => self.form.boys_price = price,
            WaveField::GirlsPrice(price) => self.form.girls_price = price,
            WaveField::Active(active) => self.form.is_active = active,
        }
    }

    /// Check the form before saving
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        validate_wave(
            &self.form.name,
            self.form.start_date,
            self.form.end_date,
            self.form.boys_price,
            self.form.girls_price,
        )
    }
}

fn default_end(start: NaiveDate) -> NaiveDate {
    start.checked_add_days(DEFAULT_WAVE_DAYS).unwrap_or(start)
}

// ============================================================================
// Activation
// ============================================================================

/// Outcome of making one wave the only active wave
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaveActivation {
    /// Every call succeeded
    Completed {
        /// Wave now active
        activated: i64,
        /// Waves switched off first
        deactivated: Vec<i64>,
    },
    /// A call failed; earlier calls were not rolled back
    PartiallyApplied {
        /// Wave that should have become active
        target: i64,
        /// Waves already switched off
        deactivated: Vec<i64>,
        /// Wave whose update failed
        failed_wave: i64,
        /// The failure
        error: ApiError,
    },
}

impl WaveActivation {
    /// Whether every call succeeded
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Banner text for the outcome
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Completed { activated, .. } => format!("Wave {activated} is now the active wave"),
            Self::PartiallyApplied {
                target,
                deactivated,
                failed_wave,
                error,
            } => {
                let done = if deactivated.is_empty() {
                    "none".to_string()
                } else {
                    deactivated
                        .iter()
                        .map(i64::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                format!(
                    "Activating wave {target} stopped: updating wave {failed_wave} failed ({}). \
                     Already deactivated: {done}",
                    error.user_message()
                )
            }
        }
    }
}

/// Deactivate `others` one at a time, then activate `target`
async fn activate(api: Arc<dyn TicketApi>, target: i64, others: Vec<i64>) -> WaveActivation {
    let mut deactivated = Vec::with_capacity(others.len());
    for wave in others {
        if let Err(error) = api.update_wave(wave, WaveUpdate::active(false)).await {
            return WaveActivation::PartiallyApplied {
                target,
                deactivated,
                failed_wave: wave,
                error,
            };
        }
        deactivated.push(wave);
    }

    match api.update_wave(target, WaveUpdate::active(true)).await {
        Ok(_) => WaveActivation::Completed {
            activated: target,
            deactivated,
        },
        Err(error) => WaveActivation::PartiallyApplied {
            target,
            deactivated,
            failed_wave: target,
            error,
        },
    }
}

// ============================================================================
// Reducer arms
// ============================================================================

impl DashboardReducer {
    pub(super) fn edit_wave(state: &mut DashboardState, id: i64) {
        match state.cached_waves().iter().find(|w| w.id == id) {
            Some(wave) => state.wave_editor = Some(WaveEditor::edit(wave)),
            None => state.notice = Some(Notice::Error(format!("Wave {id} not found"))),
        }
    }

    pub(super) fn save_wave(
        state: &mut DashboardState,
        env: &ConsoleEnvironment,
    ) -> Effects<DashboardAction> {
        let Some(editor) = state.wave_editor.as_mut() else {
            return Effects::new();
        };
        if editor.saving {
            return Effects::new();
        }

        let errors = editor.validate();
        if !errors.is_empty() {
            editor.errors = errors;
            return Effects::new();
        }
        editor.errors = FieldErrors::new();
        editor.saving = true;

        let api = env.api.clone();
        let mut form = editor.form.clone();
        form.name = form.name.trim().to_string();
        match editor.editing {
            None => smallvec![Self::mutate(Mutation::CreateWave, async move {
                api.create_wave(form).await
            })],
            Some(id) => smallvec![Self::mutate(Mutation::UpdateWave, async move {
                api.update_wave(id, WaveUpdate::from(form)).await
            })],
        }
    }

    pub(super) fn toggle_wave(
        state: &mut DashboardState,
        env: &ConsoleEnvironment,
        id: i64,
    ) -> Effects<DashboardAction> {
        if let Some(running) = state.activation {
            tracing::debug!(running, requested = id, "Activation already in progress");
            return Effects::new();
        }
        let Some(target) = state.cached_waves().iter().find(|w| w.id == id) else {
            state.notice = Some(Notice::Error(format!("Wave {id} not found")));
            return Effects::new();
        };

        let api = env.api.clone();
        if target.is_active {
            return smallvec![Self::mutate(Mutation::ToggleWave, async move {
                api.update_wave(id, WaveUpdate::active(false)).await
            })];
        }

        let others: Vec<i64> = state
            .cached_waves()
            .iter()
            .filter(|w| w.is_active && w.id != id)
            .map(|w| w.id)
            .collect();
        tracing::info!(wave_id = id, ?others, "Activating wave");
        state.activation = Some(id);
        smallvec![Effect::future(async move {
            Some(DashboardAction::ActivationFinished(
                activate(api, id, others).await,
            ))
        })]
    }

    pub(super) fn activation_finished(
        state: &mut DashboardState,
        env: &ConsoleEnvironment,
        outcome: WaveActivation,
    ) -> Effects<DashboardAction> {
        state.activation = None;
        state.notice = Some(if outcome.is_complete() {
            Notice::Success(outcome.describe())
        } else {
            tracing::error!(?outcome, "Wave activation partially applied");
            Notice::Error(outcome.describe())
        });
        state.last_activation = Some(outcome);
        smallvec![Self::refetch(invalidated_by(Mutation::ToggleWave), state, env)]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::query::QueryKey;
    use crate::test_support::{Harness, harness};
    use crate::validation::Field;
    use ticket_verifier_testing::effects::settle;
    use ticket_verifier_testing::reducer_test::assertions;
    use ticket_verifier_testing::{ApiCall, MockApi, ReducerTest, fixtures, test_clock};
    use ticket_verifier_core::environment::Clock;

    async fn loaded(h: &Harness) -> DashboardState {
        let mut state = DashboardState::default();
        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::Refetch(QueryKey::Waves))
            .await;
        h.api.clear_calls();
        state
    }

    fn three_waves() -> MockApi {
        MockApi::new().authenticated().with_waves(vec![
            fixtures::wave(1, true),
            fixtures::wave(2, false),
            fixtures::wave(3, true),
        ])
    }

    fn active_ids(api: &MockApi) -> Vec<i64> {
        api.all_waves().iter().filter(|w| w.is_active).map(|w| w.id).collect()
    }

    #[tokio::test]
    async fn activation_leaves_exactly_one_active_wave() {
        let h = harness(three_waves());
        let mut state = loaded(&h).await;

        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::ToggleWave(2)).await;

        assert_eq!(
            h.api.mutations(),
            vec![
                ApiCall::UpdateWave(1, WaveUpdate::active(false)),
                ApiCall::UpdateWave(3, WaveUpdate::active(false)),
                ApiCall::UpdateWave(2, WaveUpdate::active(true)),
            ]
        );
        assert_eq!(active_ids(&h.api), vec![2]);
        assert_eq!(
            state.last_activation,
            Some(WaveActivation::Completed {
                activated: 2,
                deactivated: vec![1, 3],
            })
        );
        assert!(state.activation.is_none());
        assert!(matches!(state.notice, Some(Notice::Success(_))));
        let cached: Vec<i64> = state
            .cached_waves()
            .iter()
            .filter(|w| w.is_active)
            .map(|w| w.id)
            .collect();
        assert_eq!(cached, vec![2]);
        assert_eq!(state.current_wave.data().unwrap().as_ref().map(|w| w.id), Some(2));
    }

    #[tokio::test]
    async fn failed_deactivation_is_reported_as_partial() {
        let h = harness(three_waves());
        let mut state = loaded(&h).await;
        let error = ApiError::Api {
            status: 500,
            message: "database is locked".to_string(),
        };
        h.api.fail_next(|c| matches!(c, ApiCall::UpdateWave(3, _)), error.clone());

        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::ToggleWave(2)).await;

        assert_eq!(
            state.last_activation,
            Some(WaveActivation::PartiallyApplied {
                target: 2,
                deactivated: vec![1],
                failed_wave: 3,
                error,
            })
        );
        assert_eq!(h.api.count(|c| matches!(c, ApiCall::UpdateWave(2, _))), 0);
        assert_eq!(active_ids(&h.api), vec![3]);
        assert!(matches!(state.notice, Some(Notice::Error(_))));
        // The cache is refetched so it shows what the backend actually holds
        let cached: Vec<i64> = state
            .cached_waves()
            .iter()
            .filter(|w| w.is_active)
            .map(|w| w.id)
            .collect();
        assert_eq!(cached, vec![3]);
    }

    #[tokio::test]
    async fn failed_final_activation_names_the_target() {
        let h = harness(three_waves());
        let mut state = loaded(&h).await;
        h.api.fail_next(|c| matches!(c, ApiCall::UpdateWave(2, _)), ApiError::Timeout);

        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::ToggleWave(2)).await;

        match state.last_activation.unwrap() {
            WaveActivation::PartiallyApplied {
                failed_wave,
                deactivated,
                ..
            } => {
                assert_eq!(failed_wave, 2);
                assert_eq!(deactivated, vec![1, 3]);
            }
            WaveActivation::Completed { .. } => unreachable!("activation must not report success"),
        }
        assert!(active_ids(&h.api).is_empty());
    }

    #[tokio::test]
    async fn deactivating_issues_one_update() {
        let h = harness(three_waves());
        let mut state = loaded(&h).await;

        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::ToggleWave(3)).await;

        assert_eq!(
            h.api.mutations(),
            vec![ApiCall::UpdateWave(3, WaveUpdate::active(false))]
        );
        assert_eq!(active_ids(&h.api), vec![1]);
    }

    #[test]
    fn new_wave_defaults() {
        let h = harness(MockApi::new());
        ReducerTest::new(DashboardReducer::new())
            .with_env(h.env)
            .given_state(DashboardState::default())
            .when_action(DashboardAction::NewWave)
            .then_state(|state| {
                let editor = state.wave_editor.as_ref().unwrap();
                let today = test_clock().today();
                assert_eq!(editor.form.start_date, today);
                assert_eq!(editor.form.end_date, fixtures::fixture_date(4));
                assert!((editor.form.boys_price - 14.0).abs() < f64::EPSILON);
                assert!((editor.form.girls_price - 14.0).abs() < f64::EPSILON);
                assert!(editor.form.is_active);
                assert!(editor.editing.is_none());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn start_date_drags_end_date_until_end_is_set() {
        let mut editor = WaveEditor::new(fixtures::fixture_date(1));

        editor.apply(WaveField::StartDate(fixtures::fixture_date(10)));
        assert_eq!(editor.form.end_date, fixtures::fixture_date(13));

        editor.apply(WaveField::EndDate(fixtures::fixture_date(20)));
        editor.apply(WaveField::StartDate(fixtures::fixture_date(11)));
        assert_eq!(editor.form.end_date, fixtures::fixture_date(20));
    }

    #[test]
    fn editing_keeps_end_date() {
        let mut editor = WaveEditor::edit(&fixtures::wave(5, false));
        editor.apply(WaveField::StartDate(fixtures::fixture_date(2)));
        assert_eq!(editor.editing, Some(5));
        assert_eq!(editor.form.end_date, fixtures::fixture_date(4));
    }

    #[tokio::test]
    async fn invalid_wave_is_not_saved() {
        let h = harness(three_waves());
        let mut state = DashboardState::default();
        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::NewWave).await;
        settle(
            &DashboardReducer,
            &mut state,
            &h.env,
            DashboardAction::EditWaveField(WaveField::EndDate(fixtures::fixture_date(1) - Days::new(1))),
        )
        .await;

        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::SaveWave).await;

        let editor = state.wave_editor.as_ref().unwrap();
        assert!(editor.errors.get(Field::Name).is_some());
        assert!(editor.errors.get(Field::EndDate).is_some());
        assert!(h.api.calls().is_empty());
    }

    #[tokio::test]
    async fn saving_a_new_wave_closes_the_form_and_refreshes() {
        let h = harness(three_waves());
        let mut state = loaded(&h).await;
        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::NewWave).await;
        settle(
            &DashboardReducer,
            &mut state,
            &h.env,
            DashboardAction::EditWaveField(WaveField::Name("  Last call ".to_string())),
        )
        .await;

        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::SaveWave).await;

        assert!(state.wave_editor.is_none());
        assert_eq!(h.api.mutations(), vec![ApiCall::CreateWave("Last call".to_string())]);
        assert_eq!(state.cached_waves().len(), 4);
        assert_eq!(h.api.count(|c| matches!(c, ApiCall::CurrentWave)), 1);
    }

    #[tokio::test]
    async fn editing_sends_full_update() {
        let h = harness(three_waves());
        let mut state = loaded(&h).await;
        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::EditWave(2)).await;
        settle(
            &DashboardReducer,
            &mut state,
            &h.env,
            DashboardAction::EditWaveField(WaveField::GirlsPrice(16.0)),
        )
        .await;

        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::SaveWave).await;

        assert!((h.api.wave(2).unwrap().girls_price - 16.0).abs() < f64::EPSILON);
        assert!(state.wave_editor.is_none());
    }

    #[tokio::test]
    async fn wave_delete_needs_confirmation() {
        let h = harness(three_waves());
        let mut state = loaded(&h).await;

        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::RequestDeleteWave(2)).await;
        assert!(h.api.calls().is_empty());

        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::ConfirmDelete).await;
        assert_eq!(h.api.mutations(), vec![ApiCall::DeleteWave(2)]);
        assert!(h.api.wave(2).is_none());
        assert_eq!(state.cached_waves().len(), 2);
    }
}
