//! Routes, guards, and navigation
//!
//! The router keeps the route the user asked for apart from the route that
//! is actually shown. Guarded routes resolve to `/login` for anonymous users
//! and are not resolved at all while the session is still being validated.
//! Asking for `/admin` while logged out and then logging in therefore lands
//! on `/admin`.

use std::fmt;
use std::str::FromStr;

use ticket_verifier_core::{Effects, reducer::Reducer};

/// A page of the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/`: customer order form
    OrderForm,
    /// `/login`
    Login,
    /// `/admin`: dashboard
    Admin,
    /// `/analytics`
    Analytics,
    /// `/csv-management`
    CsvManagement,
    /// `/change-password`
    ChangePassword,
}

impl Route {
    /// Every route
    pub const ALL: [Self; 6] = [
        Self::OrderForm,
        Self::Login,
        Self::Admin,
        Self::Analytics,
        Self::CsvManagement,
        Self::ChangePassword,
    ];

    /// URL path
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::OrderForm => "/",
            Self::Login => "/login",
            Self::Admin => "/admin",
            Self::Analytics => "/analytics",
            Self::CsvManagement => "/csv-management",
            Self::ChangePassword => "/change-password",
        }
    }

    /// Whether the route needs a valid session
    #[must_use]
    pub const fn requires_auth(self) -> bool {
        matches!(
            self,
            Self::Admin | Self::Analytics | Self::CsvManagement | Self::ChangePassword
        )
    }

    /// Route for a path; unknown paths fall back to the order form
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        path.parse().unwrap_or(Self::OrderForm)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Path that matches no route
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No route for {0}")]
pub struct UnknownRoute(pub String);

impl FromStr for Route {
    type Err = UnknownRoute;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let trimmed = path.trim_end_matches('/');
        let normalised = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL
            .into_iter()
            .find(|route| route.path() == normalised)
            .ok_or_else(|| UnknownRoute(path.to_string()))
    }
}

// ============================================================================
// Navigation items
// ============================================================================

/// What a navigation item does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTarget {
    /// Go to a route
    Route(Route),
    /// End the session
    Logout,
}

/// One entry of the navigation bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    /// Text shown
    pub label: &'static str,
    /// Action taken
    pub target: NavTarget,
}

/// Navigation bar contents for the session state
#[must_use]
pub fn nav_items(is_authenticated: bool) -> Vec<NavItem> {
    let item = |label, route| NavItem {
        label,
        target: NavTarget::Route(route),
    };
    let mut items = vec![item("Submit Order", Route::OrderForm)];
    if is_authenticated {
        items.extend([
            item("Admin Dashboard", Route::Admin),
            item("Analytics", Route::Analytics),
            item("CSV Management", Route::CsvManagement),
            NavItem {
                label: "Logout",
                target: NavTarget::Logout,
            },
        ]);
    } else {
        items.push(item("Admin Login", Route::Login));
    }
    items
}

// ============================================================================
// State
// ============================================================================

/// Router state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterState {
    /// Route the user asked for
    pub requested: Route,
    /// Route being shown; `None` while a guard waits for the session
    pub current: Option<Route>,
    /// Mirror of the auth flag
    pub is_authenticated: bool,
    /// Mirror of the auth loading flag
    pub auth_loading: bool,
    /// Every route shown, in order
    pub history: Vec<Route>,
}

impl Default for RouterState {
    fn default() -> Self {
        Self::new(Route::OrderForm)
    }
}

impl RouterState {
    /// Start at `requested`, with the session not yet validated
    #[must_use]
    pub fn new(requested: Route) -> Self {
        let mut state = Self {
            requested,
            current: None,
            is_authenticated: false,
            auth_loading: true,
            history: Vec::new(),
        };
        state.resolve();
        state
    }

    /// Number of times `route` was shown
    #[must_use]
    pub fn visits(&self, route: Route) -> usize {
        self.history.iter().filter(|r| **r == route).count()
    }

    fn resolve(&mut self) {
        let target = match self.requested {
            Route::OrderForm => Some(Route::OrderForm),
            _ if self.auth_loading => None,
            Route::Login if self.is_authenticated => Some(Route::Admin),
            route if route.requires_auth() && !self.is_authenticated => Some(Route::Login),
            route => Some(route),
        };

        if target != self.current {
            if let Some(route) = target {
                tracing::debug!(%route, requested = %self.requested, "Navigated");
                self.history.push(route);
            }
            self.current = target;
        }
    }
}

// ============================================================================
// Actions and reducer
// ============================================================================

/// Actions for the router
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouterAction {
    /// Go to a route
    Navigate(Route),
    /// Go to a path; unknown paths go to the order form
    NavigatePath(String),
    /// Session state changed
    AuthChanged {
        /// Whether the session is valid
        is_authenticated: bool,
        /// Whether the first validation is still running
        is_loading: bool,
    },
    /// Some request answered `401`
    Unauthorized,
    /// The user logged out
    LoggedOut,
}

/// Reducer for navigation
#[derive(Clone, Debug)]
pub struct RouterReducer;

impl RouterReducer {
    /// Creates a new `RouterReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for RouterReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for RouterReducer {
    type State = RouterState;
    type Action = RouterAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        (): &Self::Environment,
    ) -> Effects<Self::Action> {
        match action {
            RouterAction::Navigate(route) => state.requested = route,
            RouterAction::NavigatePath(path) => state.requested = Route::from_path(&path),
            RouterAction::AuthChanged {
                is_authenticated,
                is_loading,
            } => {
                state.is_authenticated = is_authenticated;
                state.auth_loading = is_loading;
            }
            RouterAction::Unauthorized => {
                state.is_authenticated = false;
                state.auth_loading = false;
                if state.current != Some(Route::Login) {
                    state.requested = Route::Login;
                }
            }
            RouterAction::LoggedOut => {
                state.is_authenticated = false;
                state.auth_loading = false;
                state.requested = Route::OrderForm;
            }
        }
        state.resolve();
        Effects::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ticket_verifier_testing::ReducerTest;
    use ticket_verifier_testing::reducer_test::assertions;

    fn signed_in(route: Route) -> RouterState {
        let mut state = RouterState::new(route);
        RouterReducer.reduce(
            &mut state,
            RouterAction::AuthChanged {
                is_authenticated: true,
                is_loading: false,
            },
            &(),
        );
        state
    }

    #[test]
    fn paths_round_trip() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), route);
        }
        assert_eq!(Route::from_path("/admin/"), Route::Admin);
        assert_eq!(Route::from_path("/nope"), Route::OrderForm);
        assert!("/nope".parse::<Route>().is_err());
    }

    #[test]
    fn guarded_routes_wait_for_session() {
        let state = RouterState::new(Route::Admin);
        assert_eq!(state.current, None);
        assert!(state.history.is_empty());

        let public = RouterState::new(Route::OrderForm);
        assert_eq!(public.current, Some(Route::OrderForm));
    }

    #[test]
    fn anonymous_visit_to_guarded_route_goes_to_login() {
        ReducerTest::new(RouterReducer::new())
            .with_env(())
            .given_state(RouterState::new(Route::CsvManagement))
            .when_action(RouterAction::AuthChanged {
                is_authenticated: false,
                is_loading: false,
            })
            .then_state(|state| {
                assert_eq!(state.current, Some(Route::Login));
                assert_eq!(state.requested, Route::CsvManagement);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn logging_in_returns_to_requested_route() {
        let mut state = RouterState::new(Route::Analytics);
        let reducer = RouterReducer::new();
        let _ = reducer.reduce(
            &mut state,
            RouterAction::AuthChanged {
                is_authenticated: false,
                is_loading: false,
            },
            &(),
        );
        let _ = reducer.reduce(
            &mut state,
            RouterAction::AuthChanged {
                is_authenticated: true,
                is_loading: false,
            },
            &(),
        );
        assert_eq!(state.current, Some(Route::Analytics));
        assert_eq!(state.history, vec![Route::Login, Route::Analytics]);
    }

    #[test]
    fn authenticated_login_visit_goes_to_dashboard() {
        let state = signed_in(Route::Login);
        assert_eq!(state.current, Some(Route::Admin));
    }

    #[test]
    fn repeated_unauthorized_navigates_once() {
        let mut state = signed_in(Route::Admin);
        let reducer = RouterReducer::new();
        for _ in 0..5 {
            let _ = reducer.reduce(&mut state, RouterAction::Unauthorized, &());
        }
        assert_eq!(state.current, Some(Route::Login));
        assert_eq!(state.visits(Route::Login), 1);
    }

    #[test]
    fn unauthorized_on_login_page_is_a_no_op() {
        let mut state = RouterState::new(Route::Login);
        let reducer = RouterReducer::new();
        let _ = reducer.reduce(
            &mut state,
            RouterAction::AuthChanged {
                is_authenticated: false,
                is_loading: false,
            },
            &(),
        );
        let before = state.clone();
        let _ = reducer.reduce(&mut state, RouterAction::Unauthorized, &());
        assert_eq!(state, before);
    }

    #[test]
    fn logout_goes_home() {
        let mut state = signed_in(Route::CsvManagement);
        let _ = RouterReducer.reduce(&mut state, RouterAction::LoggedOut, &());
        assert_eq!(state.current, Some(Route::OrderForm));
        assert!(!state.is_authenticated);
    }

    #[test]
    fn nav_items_follow_session() {
        let labels = |items: Vec<NavItem>| items.iter().map(|i| i.label).collect::<Vec<_>>();
        assert_eq!(labels(nav_items(false)), vec!["Submit Order", "Admin Login"]);
        assert_eq!(
            labels(nav_items(true)),
            vec![
                "Submit Order",
                "Admin Dashboard",
                "Analytics",
                "CSV Management",
                "Logout"
            ]
        );
        assert_eq!(nav_items(true)[4].target, NavTarget::Logout);
    }
}
