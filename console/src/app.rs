//! Application shell
//!
//! [`Console`] owns one [`Store`] per screen plus the router, and keeps them
//! consistent with the session. Two background tasks do the wiring:
//!
//! - session bus events go to the auth store, and `401`s also go straight to
//!   the router so the user lands on `/login` exactly once;
//! - auth actions that change the session are mirrored into the router.

use std::time::Duration;

use ticket_verifier_api::{LoginRequest, SessionEvent};
use ticket_verifier_runtime::{Store, StoreError};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::auth::{AuthAction, AuthReducer, AuthState, LoginStatus};
use crate::dashboard::{DashboardAction, DashboardReducer, DashboardState, Tab};
use crate::environment::ConsoleEnvironment;
use crate::order_form::{OrderFormAction, OrderFormReducer, OrderFormState};
use crate::router::{Route, RouterAction, RouterReducer, RouterState};

/// Store for the admin session
pub type AuthStore = Store<AuthState, AuthAction, ConsoleEnvironment, AuthReducer>;
/// Store for the customer order form
pub type OrderFormStore =
    Store<OrderFormState, OrderFormAction, ConsoleEnvironment, OrderFormReducer>;
/// Store for the admin dashboard
pub type DashboardStore =
    Store<DashboardState, DashboardAction, ConsoleEnvironment, DashboardReducer>;
/// Store for navigation
pub type RouterStore = Store<RouterState, RouterAction, (), RouterReducer>;

/// How long session validation and login wait for the backend
const SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Router action implied by an auth action, if any
#[must_use]
pub fn router_action_for(action: &AuthAction) -> Option<RouterAction> {
    match action {
        AuthAction::SessionValidated { authenticated } => Some(RouterAction::AuthChanged {
            is_authenticated: *authenticated,
            is_loading: false,
        }),
        AuthAction::LoginSucceeded => Some(RouterAction::AuthChanged {
            is_authenticated: true,
            is_loading: false,
        }),
        AuthAction::LoggedOut => Some(RouterAction::LoggedOut),
        AuthAction::Unauthorized => Some(RouterAction::Unauthorized),
        _ => None,
    }
}

/// Every screen store, wired to the session
pub struct Console {
    /// Admin session
    pub auth: AuthStore,
    /// Customer order form
    pub order_form: OrderFormStore,
    /// Admin dashboard
    pub dashboard: DashboardStore,
    /// Navigation
    pub router: RouterStore,
    tasks: Vec<JoinHandle<()>>,
}

impl Console {
    /// Build the stores, start the wiring tasks, and validate the session
    ///
    /// Returns once the first session validation has finished.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if validation does not finish in time.
    pub async fn start(env: ConsoleEnvironment, initial: Route) -> Result<Self, StoreError> {
        let session = env.session.clone();
        let auth = Store::new(AuthState::default(), AuthReducer::new(), env.clone());
        let order_form = Store::new(OrderFormState::default(), OrderFormReducer::new(), env.clone());
        let dashboard = Store::new(DashboardState::default(), DashboardReducer::new(), env);
        let router = Store::new(RouterState::new(initial), RouterReducer::new(), ());

        let tasks = vec![
            tokio::spawn(forward_session(
                session.subscribe(),
                auth.clone(),
                router.clone(),
            )),
            tokio::spawn(mirror_auth(auth.subscribe_actions(), router.clone())),
        ];

        let console = Self {
            auth,
            order_form,
            dashboard,
            router,
            tasks,
        };
        let mut mount = console.auth.send(AuthAction::Mount)?;
        mount.wait_with_timeout(SESSION_TIMEOUT).await?;
        tracing::info!(route = %initial, "Console started");
        Ok(console)
    }

    /// Route currently shown, if resolved
    #[must_use]
    pub fn current_route(&self) -> Option<Route> {
        self.router.state(|s| s.current)
    }

    /// Navigate and mount the screen that ends up shown
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a store is shutting down.
    pub fn navigate(&self, route: Route) -> Result<Option<Route>, StoreError> {
        self.router.send(RouterAction::Navigate(route))?;
        let current = self.current_route();
        match current {
            Some(Route::OrderForm) => {
                self.order_form.send(OrderFormAction::Mount)?;
            }
            Some(Route::Admin) => {
                self.dashboard.send(DashboardAction::Mount)?;
            }
            Some(Route::Analytics) => {
                self.dashboard.send(DashboardAction::SelectTab(Tab::Analytics))?;
            }
            Some(Route::CsvManagement) => {
                self.dashboard.send(DashboardAction::SelectTab(Tab::Csv))?;
            }
            Some(Route::Login | Route::ChangePassword) | None => {}
        }
        if current != Some(Route::OrderForm) {
            self.order_form.send(OrderFormAction::Unmount)?;
        }
        Ok(current)
    }

    /// Log in and wait for the outcome
    ///
    /// Returns `Ok(true)` once the session is established; the rejection
    /// message is in the auth state otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the backend does not answer in time.
    pub async fn login(&self, request: LoginRequest) -> Result<bool, StoreError> {
        let mut handle = self.auth.send(AuthAction::Login(request))?;
        handle.wait_with_timeout(SESSION_TIMEOUT).await?;
        Ok(self.auth.state(|s| s.login == LoginStatus::Succeeded))
    }

    /// Stop every store and the wiring tasks
    pub fn shutdown(&self) {
        for task in &self.tasks {
            task.abort();
        }
        self.auth.shutdown();
        self.order_form.shutdown();
        self.dashboard.shutdown();
        self.router.shutdown();
        tracing::debug!("Console shut down");
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("route", &self.current_route())
            .finish_non_exhaustive()
    }
}

async fn forward_session(
    mut events: tokio::sync::broadcast::Receiver<SessionEvent>,
    auth: AuthStore,
    router: RouterStore,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if event == SessionEvent::Unauthorized
                    && router.send(RouterAction::Unauthorized).is_err()
                {
                    break;
                }
                if auth.send(AuthAction::from(event)).is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Session events lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn mirror_auth(
    mut actions: tokio::sync::broadcast::Receiver<AuthAction>,
    router: RouterStore,
) {
    loop {
        match actions.recv().await {
            Ok(action) => {
                let Some(navigation) = router_action_for(&action) else {
                    continue;
                };
                if router.send(navigation).is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Auth actions lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
