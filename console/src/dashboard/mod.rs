//! Admin dashboard
//!
//! Four tabs over the backend: orders, pricing waves, CSV imports, and
//! analytics. The dashboard state is the query cache. Views read from the
//! five [`Query`] slots; mutations never patch them but invalidate and
//! refetch whatever [`invalidated_by`] lists.

mod csv;
mod orders;
mod waves;

pub use orders::{EmailExport, OrderStats};
pub use waves::{WaveActivation, WaveEditor, WaveField};

use serde::{Deserialize, Serialize};
use ticket_verifier_api::storage::{keys, load_json, save_json};
use ticket_verifier_api::{
    Analytics, ApiError, ApiResponse, CsvImport, CsvUpload, Order, PaginatedResponse, SearchFilters,
    UploadFile, VerifiedEmails, Wave,
};
use ticket_verifier_core::{Effects, effect::Effect, reducer::Reducer, smallvec};

use crate::environment::ConsoleEnvironment;
use crate::query::{Mutation, Query, QueryKey, invalidated_by};

// ============================================================================
// State
// ============================================================================

/// Dashboard tab, persisted across restarts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    /// Order list and review
    #[default]
    Orders,
    /// Pricing waves
    Waves,
    /// Payment CSV imports
    Csv,
    /// Aggregates
    Analytics,
}

impl Tab {
    /// Queries the tab displays
    #[must_use]
    pub const fn queries(self) -> &'static [QueryKey] {
        match self {
            Self::Orders => &[QueryKey::Orders, QueryKey::Waves],
            Self::Waves => &[QueryKey::Waves, QueryKey::CurrentWave],
            Self::Csv => &[QueryKey::CsvUploads],
            Self::Analytics => &[QueryKey::Analytics],
        }
    }
}

/// A banner message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Something worked
    Success(String),
    /// Nothing went wrong, but there is nothing to show
    Info(String),
    /// Partially applied; needs a look
    Warning(String),
    /// Something failed
    Error(String),
}

impl Notice {
    /// Message text
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Success(m) | Self::Info(m) | Self::Warning(m) | Self::Error(m) => m,
        }
    }
}

/// A delete waiting for confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingDelete {
    /// Delete this order
    Order(i64),
    /// Delete this wave
    Wave(i64),
}

/// Admin dashboard state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    /// Selected tab
    pub tab: Tab,
    /// Filters for the order list
    pub filters: SearchFilters,
    /// `GET /orders`
    pub orders: Query<PaginatedResponse<Order>>,
    /// `GET /waves`
    pub waves: Query<Vec<Wave>>,
    /// `GET /waves/current`
    pub current_wave: Query<Option<Wave>>,
    /// `GET /analytics`
    pub analytics: Query<Analytics>,
    /// `GET /csv/uploads`
    pub csv_uploads: Query<Vec<CsvUpload>>,
    /// Delete awaiting confirmation
    pub pending_delete: Option<PendingDelete>,
    /// Open wave form
    pub wave_editor: Option<WaveEditor>,
    /// Wave being activated, while the sequence runs
    pub activation: Option<i64>,
    /// Outcome of the last activation
    pub last_activation: Option<WaveActivation>,
    /// CSV selected for upload
    pub csv_file: Option<UploadFile>,
    /// Whether a CSV upload is in flight
    pub csv_uploading: bool,
    /// Banner message
    pub notice: Option<Notice>,
    /// Last verified-email export
    pub email_export: Option<EmailExport>,
    /// Receipt URL to open
    pub receipt_link: Option<String>,
}

impl DashboardState {
    /// Cached waves, or an empty slice before the first fetch
    #[must_use]
    pub fn cached_waves(&self) -> &[Wave] {
        self.waves.data().map_or(&[], Vec::as_slice)
    }

    /// Orders on the current page, or an empty slice before the first fetch
    #[must_use]
    pub fn cached_orders(&self) -> &[Order] {
        self.orders.data().map_or(&[], |page| page.data.as_slice())
    }

    fn invalidate(&mut self, key: QueryKey) {
        match key {
            QueryKey::Orders => self.orders.invalidate(),
            QueryKey::Waves => self.waves.invalidate(),
            QueryKey::CurrentWave => self.current_wave.invalidate(),
            QueryKey::Analytics => self.analytics.invalidate(),
            QueryKey::CsvUploads => self.csv_uploads.invalidate(),
        }
    }

    fn is_stale(&self, key: QueryKey) -> bool {
        match key {
            QueryKey::Orders => self.orders.is_stale(),
            QueryKey::Waves => self.waves.is_stale(),
            QueryKey::CurrentWave => self.current_wave.is_stale(),
            QueryKey::Analytics => self.analytics.is_stale(),
            QueryKey::CsvUploads => self.csv_uploads.is_stale(),
        }
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Actions for the admin dashboard
#[derive(Clone, Debug, PartialEq)]
pub enum DashboardAction {
    /// Dashboard shown: restore the tab and load every query
    Mount,
    /// Stored tab read
    TabLoaded(Option<Tab>),
    /// Switch tabs
    SelectTab(Tab),
    /// Refetch one query
    Refetch(QueryKey),
    /// Refetch every query
    RefetchAll,
    /// Order list fetched
    OrdersLoaded(Result<PaginatedResponse<Order>, ApiError>),
    /// Waves fetched
    WavesLoaded(Result<Vec<Wave>, ApiError>),
    /// Current wave fetched
    CurrentWaveLoaded(Result<Option<Wave>, ApiError>),
    /// Analytics fetched
    AnalyticsLoaded(Result<Analytics, ApiError>),
    /// CSV history fetched
    CsvUploadsLoaded(Result<Vec<CsvUpload>, ApiError>),
    /// Change the order filters and refetch
    SetFilters(SearchFilters),
    /// Hide the banner
    DismissNotice,

    /// Ask to delete an order
    RequestDeleteOrder(i64),
    /// Ask to delete a wave
    RequestDeleteWave(i64),
    /// Dismiss the pending delete
    CancelDelete,
    /// Carry out the pending delete
    ConfirmDelete,
    /// Approve an order
    ApproveOrder(i64),
    /// Reject an order
    RejectOrder(i64),
    /// Re-run payment matching over all orders
    RerunMatching,
    /// Open an order's receipt
    ViewReceipt(i64),
    /// Fetch verified emails for the external ticketing tool
    ExportVerifiedEmails,
    /// Verified emails fetched
    VerifiedEmailsLoaded(Result<VerifiedEmails, ApiError>),

    /// Open an empty wave form
    NewWave,
    /// Open the form for an existing wave
    EditWave(i64),
    /// Change one wave form field
    EditWaveField(WaveField),
    /// Close the wave form
    CancelWaveEdit,
    /// Validate and save the wave form
    SaveWave,
    /// Activate or deactivate a wave
    ToggleWave(i64),
    /// Activation sequence finished
    ActivationFinished(WaveActivation),

    /// Files chosen for CSV import; exactly one `.csv` is accepted
    SelectCsvFile(Vec<UploadFile>),
    /// Upload the selected CSV
    UploadCsv,
    /// CSV upload finished
    CsvUploaded(Result<ApiResponse<CsvImport>, ApiError>),

    /// A mutation finished; on success its dependents are refetched
    MutationFinished {
        /// What was attempted
        mutation: Mutation,
        /// Confirmation message, or the failure
        result: Result<String, ApiError>,
    },
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the admin dashboard
#[derive(Clone, Debug)]
pub struct DashboardReducer;

impl DashboardReducer {
    /// Creates a new `DashboardReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Start fetching `key`
    fn fetch(
        key: QueryKey,
        state: &mut DashboardState,
        env: &ConsoleEnvironment,
    ) -> Effect<DashboardAction> {
        let api = env.api.clone();
        match key {
            QueryKey::Orders => {
                state.orders.start();
                let filters = state.filters.clone();
                Effect::future(async move {
                    Some(DashboardAction::OrdersLoaded(api.orders(filters).await))
                })
            }
            QueryKey::Waves => {
                state.waves.start();
                Effect::future(async move { Some(DashboardAction::WavesLoaded(api.waves().await)) })
            }
            QueryKey::CurrentWave => {
                state.current_wave.start();
                Effect::future(async move {
                    Some(DashboardAction::CurrentWaveLoaded(api.current_wave().await))
                })
            }
            QueryKey::Analytics => {
                state.analytics.start();
                Effect::future(async move {
                    Some(DashboardAction::AnalyticsLoaded(api.analytics().await))
                })
            }
            QueryKey::CsvUploads => {
                state.csv_uploads.start();
                Effect::future(async move {
                    Some(DashboardAction::CsvUploadsLoaded(api.csv_uploads().await))
                })
            }
        }
    }

    /// Invalidate `keys` and refetch them concurrently
    fn refetch(
        keys: &[QueryKey],
        state: &mut DashboardState,
        env: &ConsoleEnvironment,
    ) -> Effect<DashboardAction> {
        let effects = keys
            .iter()
            .map(|key| {
                state.invalidate(*key);
                Self::fetch(*key, state, env)
            })
            .collect();
        Effect::merge(effects)
    }

    /// Run a mutation and report it as `MutationFinished`
    fn mutate<F, T>(mutation: Mutation, call: F) -> Effect<DashboardAction>
    where
        F: std::future::Future<Output = Result<ApiResponse<T>, ApiError>> + Send + 'static,
        T: Send + 'static,
    {
        Effect::future(async move {
            let result = call.await.map(|response| {
                response
                    .message
                    .unwrap_or_else(|| mutation.success_message().to_string())
            });
            Some(DashboardAction::MutationFinished { mutation, result })
        })
    }

    fn failure_message(prefix: &str, error: &ApiError) -> String {
        let detail = match error {
            ApiError::Rejected(message) | ApiError::Api { message, .. } => message.clone(),
            other => other.user_message(),
        };
        format!("{prefix}: {detail}")
    }

    fn apply<T>(query: &mut Query<T>, key: QueryKey, result: Result<T, ApiError>) {
        match result {
            Ok(data) => query.resolve(data),
            Err(e) => {
                tracing::warn!(query = %key, error = %e, "Query failed");
                query.fail(e.user_message());
            }
        }
    }
}

impl Default for DashboardReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for DashboardReducer {
    type State = DashboardState;
    type Action = DashboardAction;
    type Environment = ConsoleEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        match action {
            // ========== Tabs and queries ==========
            DashboardAction::Mount => {
                let storage = env.storage.clone();
                let load_tab = Effect::future(async move {
                    let tab = load_json::<Tab>(storage.as_ref(), keys::DASHBOARD_TAB)
                        .unwrap_or_else(|e| {
                            tracing::warn!(error = %e, "Ignoring unreadable dashboard tab");
                            None
                        });
                    Some(DashboardAction::TabLoaded(tab))
                });
                smallvec![load_tab, Self::refetch(&QueryKey::ALL, state, env)]
            }

            DashboardAction::TabLoaded(tab) => {
                if let Some(tab) = tab {
                    state.tab = tab;
                }
                Effects::new()
            }

            DashboardAction::SelectTab(tab) => {
                state.tab = tab;
                let storage = env.storage.clone();
                let persist = Effect::fire_and_forget(async move {
                    if let Err(e) = save_json(storage.as_ref(), keys::DASHBOARD_TAB, &tab) {
                        tracing::warn!(error = %e, "Failed to persist dashboard tab");
                    }
                });
                let stale: Vec<QueryKey> = tab
                    .queries()
                    .iter()
                    .copied()
                    .filter(|key| state.is_stale(*key))
                    .collect();
                smallvec![persist, Self::refetch(&stale, state, env)]
            }

            DashboardAction::Refetch(key) => smallvec![Self::refetch(&[key], state, env)],

            DashboardAction::RefetchAll => smallvec![Self::refetch(&QueryKey::ALL, state, env)],

            DashboardAction::OrdersLoaded(result) => {
                Self::apply(&mut state.orders, QueryKey::Orders, result);
                Effects::new()
            }

            DashboardAction::WavesLoaded(result) => {
                Self::apply(&mut state.waves, QueryKey::Waves, result);
                Effects::new()
            }

            DashboardAction::CurrentWaveLoaded(result) => {
                Self::apply(&mut state.current_wave, QueryKey::CurrentWave, result);
                Effects::new()
            }

            DashboardAction::AnalyticsLoaded(result) => {
                Self::apply(&mut state.analytics, QueryKey::Analytics, result);
                Effects::new()
            }

            DashboardAction::CsvUploadsLoaded(result) => {
                Self::apply(&mut state.csv_uploads, QueryKey::CsvUploads, result);
                Effects::new()
            }

            DashboardAction::SetFilters(filters) => {
                state.filters = filters;
                smallvec![Self::refetch(&[QueryKey::Orders], state, env)]
            }

            DashboardAction::DismissNotice => {
                state.notice = None;
                Effects::new()
            }

            // ========== Orders ==========
            DashboardAction::RequestDeleteOrder(id) => {
                state.pending_delete = Some(PendingDelete::Order(id));
                Effects::new()
            }
            DashboardAction::RequestDeleteWave(id) => {
                state.pending_delete = Some(PendingDelete::Wave(id));
                Effects::new()
            }
            DashboardAction::CancelDelete => {
                state.pending_delete = None;
                Effects::new()
            }
            DashboardAction::ConfirmDelete => Self::confirm_delete(state, env),
            DashboardAction::ApproveOrder(id) => {
                let api = env.api.clone();
                smallvec![Self::mutate(Mutation::ApproveOrder, async move {
                    api.approve_order(id).await
                })]
            }
            DashboardAction::RejectOrder(id) => {
                let api = env.api.clone();
                smallvec![Self::mutate(Mutation::RejectOrder, async move {
                    api.reject_order(id).await
                })]
            }
            DashboardAction::RerunMatching => {
                let api = env.api.clone();
                smallvec![Self::mutate(Mutation::RerunMatching, async move {
                    api.rerun_matching().await
                })]
            }
            DashboardAction::ViewReceipt(id) => Self::view_receipt(state, env, id),
            DashboardAction::ExportVerifiedEmails => {
                let api = env.api.clone();
                smallvec![Effect::future(async move {
                    Some(DashboardAction::VerifiedEmailsLoaded(api.verified_emails().await))
                })]
            }
            DashboardAction::VerifiedEmailsLoaded(result) => {
                Self::verified_emails_loaded(state, result);
                Effects::new()
            }

            // ========== Waves ==========
            DashboardAction::NewWave => {
                state.wave_editor = Some(WaveEditor::new(env.clock.today()));
                Effects::new()
            }
            DashboardAction::EditWave(id) => {
                Self::edit_wave(state, id);
                Effects::new()
            }
            DashboardAction::EditWaveField(field) => {
                if let Some(editor) = state.wave_editor.as_mut() {
                    editor.apply(field);
                }
                Effects::new()
            }
            DashboardAction::CancelWaveEdit => {
                state.wave_editor = None;
                Effects::new()
            }
            DashboardAction::SaveWave => Self::save_wave(state, env),
            DashboardAction::ToggleWave(id) => Self::toggle_wave(state, env, id),
            DashboardAction::ActivationFinished(outcome) => {
                Self::activation_finished(state, env, outcome)
            }

            // ========== CSV ==========
            DashboardAction::SelectCsvFile(files) => {
                Self::select_csv(state, files);
                Effects::new()
            }
            DashboardAction::UploadCsv => Self::upload_csv(state, env),
            DashboardAction::CsvUploaded(result) => Self::csv_uploaded(state, env, result),

            // ========== Mutation results ==========
            DashboardAction::MutationFinished { mutation, result } => match result {
                Ok(message) => {
                    tracing::info!(?mutation, "Mutation succeeded");
                    if matches!(mutation, Mutation::CreateWave | Mutation::UpdateWave) {
                        state.wave_editor = None;
                    }
                    state.notice = Some(Notice::Success(message));
                    smallvec![Self::refetch(invalidated_by(mutation), state, env)]
                }
                Err(e) => {
                    tracing::warn!(?mutation, error = %e, "Mutation failed");
                    if let Some(editor) = state.wave_editor.as_mut() {
                        editor.saving = false;
                    }
                    state.notice =
                        Some(Notice::Error(Self::failure_message(mutation.failure_prefix(), &e)));
                    Effects::new()
                }
            },
        }
    }
}
