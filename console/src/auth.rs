//! Admin session state
//!
//! The backend owns the session (an HTTP-only cookie); this reducer only
//! mirrors whether it is valid. Login and logout broadcast
//! `AuthStateChanged` so every other consumer re-validates, and any `401`
//! arriving on the session bus drops the local flag without a request.

use ticket_verifier_api::storage::keys;
use ticket_verifier_api::{ApiError, LoginRequest, PasswordChange, SessionEvent};
use ticket_verifier_core::{Effects, effect::Effect, reducer::Reducer, smallvec};

use crate::environment::ConsoleEnvironment;
use crate::validation::{FieldErrors, validate_password_change};

// ============================================================================
// State
// ============================================================================

/// Outcome of the most recent login attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoginStatus {
    /// No attempt yet
    #[default]
    Idle,
    /// Request in flight
    Pending,
    /// Logged in
    Succeeded,
    /// Rejected, with the message to show
    Rejected(String),
}

/// Outcome of the most recent password change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PasswordChangeStatus {
    /// Nothing submitted
    #[default]
    Idle,
    /// Failed local validation; no request was sent
    Invalid(FieldErrors),
    /// Request in flight
    Pending,
    /// Changed, with the backend's confirmation
    Changed(String),
    /// Rejected or failed, with the message to show
    Failed(String),
}

/// Session state shared by the router and every admin screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    /// Whether the backend session is valid
    pub is_authenticated: bool,
    /// True until the first validation finishes
    pub is_loading: bool,
    /// Last login attempt
    pub login: LoginStatus,
    /// Last password change
    pub password_change: PasswordChangeStatus,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            is_authenticated: false,
            is_loading: true,
            login: LoginStatus::Idle,
            password_change: PasswordChangeStatus::Idle,
        }
    }
}

/// The change-password form
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordForm {
    /// Current password
    pub old_password: String,
    /// Desired password
    pub new_password: String,
    /// Desired password, typed again
    pub confirm_password: String,
}

impl std::fmt::Debug for PasswordForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordForm { .. }")
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Actions for the auth reducer
#[derive(Clone, Debug, PartialEq)]
pub enum AuthAction {
    /// App started: clear the legacy token and validate the session
    Mount,
    /// Session validation finished
    SessionValidated {
        /// Whether the backend considers the session valid
        authenticated: bool,
    },
    /// Submit credentials
    Login(LoginRequest),
    /// Backend accepted the credentials
    LoginSucceeded,
    /// Credentials rejected or the request failed
    LoginRejected {
        /// Message to show
        message: String,
    },
    /// End the session
    Logout,
    /// Logout finished (whether or not the request succeeded)
    LoggedOut,
    /// Another consumer logged in or out
    AuthStateChanged,
    /// Some request answered `401`
    Unauthorized,
    /// Submit the change-password form
    ChangePassword(PasswordForm),
    /// Password changed
    PasswordChanged {
        /// Backend confirmation
        message: String,
    },
    /// Password change rejected or failed
    PasswordChangeFailed {
        /// Message to show
        message: String,
    },
}

impl From<SessionEvent> for AuthAction {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::AuthStateChanged => Self::AuthStateChanged,
            SessionEvent::Unauthorized => Self::Unauthorized,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the admin session
#[derive(Clone, Debug)]
pub struct AuthReducer;

impl AuthReducer {
    /// Creates a new `AuthReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn validate(env: &ConsoleEnvironment) -> Effect<AuthAction> {
        let api = env.api.clone();
        Effect::future(async move {
            let authenticated = match api.validate_session().await {
                Ok(status) => status.authenticated,
                Err(e) => {
                    tracing::warn!(error = %e, "Session validation failed");
                    false
                }
            };
            Some(AuthAction::SessionValidated { authenticated })
        })
    }

    fn publish(env: &ConsoleEnvironment) -> Effect<AuthAction> {
        let session = env.session.clone();
        Effect::fire_and_forget(async move { session.publish(SessionEvent::AuthStateChanged) })
    }
}

impl Default for AuthReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for AuthReducer {
    type State = AuthState;
    type Action = AuthAction;
    type Environment = ConsoleEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        match action {
            AuthAction::Mount => {
                state.is_loading = true;
                let storage = env.storage.clone();
                let clear_token = Effect::fire_and_forget(async move {
                    if let Err(e) = storage.remove(keys::AUTH_TOKEN) {
                        tracing::warn!(error = %e, "Failed to clear legacy auth token");
                    }
                });
                smallvec![Effect::chain(vec![clear_token, Self::validate(env)])]
            }

            AuthAction::SessionValidated { authenticated } => {
                state.is_authenticated = authenticated;
                state.is_loading = false;
                Effects::new()
            }

            AuthAction::Login(request) => {
                if request.username.trim().is_empty() || request.password.is_empty() {
                    state.login =
                        LoginStatus::Rejected("Please enter both username and password".into());
                    return Effects::new();
                }

                state.login = LoginStatus::Pending;
                let api = env.api.clone();
                smallvec![Effect::future(async move {
                    let username = request.username.clone();
                    match api.login(request).await {
                        Ok(response) if response.success => {
                            tracing::info!(%username, "Admin logged in");
                            Some(AuthAction::LoginSucceeded)
                        }
                        Ok(response) => Some(AuthAction::LoginRejected {
                            message: if response.message.is_empty() {
                                "Login failed".to_string()
                            } else {
                                response.message
                            },
                        }),
                        Err(e) => {
                            tracing::warn!(error = %e, "Login request failed");
                            Some(AuthAction::LoginRejected {
                                message: "Login failed".to_string(),
                            })
                        }
                    }
                })]
            }

            AuthAction::LoginSucceeded => {
                state.is_authenticated = true;
                state.is_loading = false;
                state.login = LoginStatus::Succeeded;
                smallvec![Self::publish(env)]
            }

            AuthAction::LoginRejected { message } => {
                state.is_authenticated = false;
                state.login = LoginStatus::Rejected(message);
                Effects::new()
            }

            AuthAction::Logout => {
                let api = env.api.clone();
                smallvec![Effect::future(async move {
                    if let Err(e) = api.logout().await {
                        tracing::warn!(error = %e, "Logout request failed");
                    }
                    Some(AuthAction::LoggedOut)
                })]
            }

            AuthAction::LoggedOut => {
                state.is_authenticated = false;
                state.is_loading = false;
                state.login = LoginStatus::Idle;
                state.password_change = PasswordChangeStatus::Idle;
                smallvec![Self::publish(env)]
            }

            AuthAction::AuthStateChanged => smallvec![Self::validate(env)],

            AuthAction::Unauthorized => {
                if state.is_authenticated {
                    tracing::info!("Session expired");
                }
                state.is_authenticated = false;
                state.is_loading = false;
                Effects::new()
            }

            AuthAction::ChangePassword(form) => {
                let errors = validate_password_change(&form.new_password, &form.confirm_password);
                if !errors.is_empty() {
                    state.password_change = PasswordChangeStatus::Invalid(errors);
                    return Effects::new();
                }

                state.password_change = PasswordChangeStatus::Pending;
                let api = env.api.clone();
                let change = PasswordChange {
                    old_password: form.old_password,
                    new_password: form.new_password,
                };
                smallvec![Effect::future(async move {
                    Some(match api.change_password(change).await {
                        Ok(ack) => AuthAction::PasswordChanged {
                            message: ack
                                .message
                                .unwrap_or_else(|| "Password changed successfully".to_string()),
                        },
                        Err(ApiError::Rejected(message) | ApiError::Api { message, .. }) => {
                            AuthAction::PasswordChangeFailed { message }
                        }
                        Err(ApiError::Unauthorized) => AuthAction::PasswordChangeFailed {
                            message: ApiError::Unauthorized.user_message(),
                        },
                        Err(e) => {
                            tracing::warn!(error = %e, "Password change request failed");
                            AuthAction::PasswordChangeFailed {
                                message: "An error occurred while changing password".to_string(),
                            }
                        }
                    })
                })]
            }

            AuthAction::PasswordChanged { message } => {
                state.password_change = PasswordChangeStatus::Changed(message);
                Effects::new()
            }

            AuthAction::PasswordChangeFailed { message } => {
                state.password_change = PasswordChangeStatus::Failed(message);
                Effects::new()
            }
        }
    }
}
