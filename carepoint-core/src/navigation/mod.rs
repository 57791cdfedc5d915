//! Navigation composition
//!
//! Maps the current [`SessionState`] to the navigation actions a view
//! should offer, and performs those actions.
//!
//! | session | admin | actions                                |
//! |---------|-------|----------------------------------------|
//! | absent  | -     | Sign In, Sign Up                       |
//! | present | no    | My Profile, Sign Out                   |
//! | present | yes   | Admin Dashboard, My Profile, Sign Out  |

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::session::{SessionState, SessionStore};

mod guard;
mod route;

pub use guard::{guard, resolve, GuardDecision};
pub use route::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavAction {
    SignIn,
    SignUp,
    AdminDashboard,
    MyProfile,
    SignOut,
}

impl NavAction {
    pub fn label(&self) -> &'static str {
        match self {
            NavAction::SignIn => "Sign In",
            NavAction::SignUp => "Sign Up",
            NavAction::AdminDashboard => "Admin Dashboard",
            NavAction::MyProfile => "My Profile",
            NavAction::SignOut => "Sign Out",
        }
    }

    /// Where the action lands. Sign Out lands on the public page after
    /// signing out.
    pub fn destination(&self) -> Route {
        match self {
            NavAction::SignIn => Route::Login,
            NavAction::SignUp => Route::Register,
            NavAction::AdminDashboard => Route::AdminDashboard,
            NavAction::MyProfile => Route::Profile,
            NavAction::SignOut => Route::LANDING,
        }
    }
}

impl fmt::Display for NavAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A plain link in a menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub title: &'static str,
    pub route: Route,
}

/// Auth-dependent actions, in display order. A loading session shows the
/// signed-out set.
pub fn compose(state: &SessionState) -> Vec<NavAction> {
    match state {
        SessionState::SignedIn(_) if state.is_admin() => vec![
            NavAction::AdminDashboard,
            NavAction::MyProfile,
            NavAction::SignOut,
        ],
        SessionState::SignedIn(_) => vec![NavAction::MyProfile, NavAction::SignOut],
        SessionState::Loading | SessionState::SignedOut => vec![NavAction::SignIn, NavAction::SignUp],
    }
}

/// Site-wide links shown to everyone
pub fn public_links() -> Vec<NavLink> {
    vec![
        NavLink { title: "Home", route: Route::Home },
        NavLink { title: "Doctors", route: Route::Doctors },
        NavLink { title: "Services", route: Route::Services },
        NavLink { title: "Appointments", route: Route::Appointments },
    ]
}

/// Back-office sidebar; empty unless the session carries the admin flag.
pub fn admin_sidebar(state: &SessionState) -> Vec<NavLink> {
    if !state.is_admin() {
        return Vec::new();
    }
    vec![
        NavLink { title: "Dashboard", route: Route::AdminDashboard },
        NavLink { title: "Patients", route: Route::AdminPatients },
        NavLink { title: "Appointments", route: Route::AdminAppointments },
        NavLink { title: "Staff", route: Route::AdminStaff },
    ]
}

/// Perform `action` against the store and return the route to show next.
///
/// Sign Out always lands on the public page, whatever the provider said.
/// Other actions are passed through the route guard.
pub async fn activate(action: NavAction, store: &SessionStore) -> Route {
    match action {
        NavAction::SignOut => {
            if let Err(e) = store.sign_out().await {
                warn!("sign out reported an error, continuing: {}", e);
            }
            Route::LANDING
        }
        other => {
            let state = store.state();
            let (route, decision) = resolve(other.destination(), &state);
            debug!(action = %other, ?decision, route = %route, "navigation");
            route
        }
    }
}
