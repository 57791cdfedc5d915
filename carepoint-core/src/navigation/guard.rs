//! Route guard
//!
//! Decides whether the current session may render a route. Administrator
//! access is derived from the session's identity on every check.

use serde::{Deserialize, Serialize};

use super::Route;
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardDecision {
    Allow,
    /// Render nothing yet; the session is still loading
    Pending,
    Redirect(Route),
}

pub fn guard(route: Route, state: &SessionState) -> GuardDecision {
    let gated = route.is_admin_only() || route.is_guest_only();
    if !gated {
        return GuardDecision::Allow;
    }
    if state.is_loading() {
        return GuardDecision::Pending;
    }

    if route.is_admin_only() {
        return match (state.is_signed_in(), state.is_admin()) {
            (false, _) => GuardDecision::Redirect(Route::Login),
            (true, false) => GuardDecision::Redirect(Route::LANDING),
            (true, true) => GuardDecision::Allow,
        };
    }

    if state.is_signed_in() {
        GuardDecision::Redirect(Route::LANDING)
    } else {
        GuardDecision::Allow
    }
}

/// Follow redirects until a route can be rendered (or is pending).
pub fn resolve(route: Route, state: &SessionState) -> (Route, GuardDecision) {
    let mut current = route;
    // Redirect targets are Login or Home, so this settles within two hops.
    for _ in 0..3 {
        match guard(current, state) {
            GuardDecision::Redirect(next) if next != current => current = next,
            decision => return (current, decision),
        }
    }
    (current, guard(current, state))
}
