use serde::{Deserialize, Serialize};
use std::fmt;

/// Every destination the portal knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    Home,
    Login,
    Register,
    Doctors,
    Services,
    Appointments,
    Profile,
    VerifyEmail,
    AdminDashboard,
    AdminPatients,
    AdminAppointments,
    AdminStaff,
    NotFound,
}

impl Route {
    pub const ALL: [Route; 13] = [
        Route::Home,
        Route::Login,
        Route::Register,
        Route::Doctors,
        Route::Services,
        Route::Appointments,
        Route::Profile,
        Route::VerifyEmail,
        Route::AdminDashboard,
        Route::AdminPatients,
        Route::AdminAppointments,
        Route::AdminStaff,
        Route::NotFound,
    ];

    /// Public landing destination
    pub const LANDING: Route = Route::Home;

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Doctors => "/doctors",
            Route::Services => "/services",
            Route::Appointments => "/appointments",
            Route::Profile => "/profile",
            Route::VerifyEmail => "/verify-email",
            Route::AdminDashboard => "/admin",
            Route::AdminPatients => "/admin/patients",
            Route::AdminAppointments => "/admin/appointments",
            Route::AdminStaff => "/admin/staff",
            Route::NotFound => "*",
        }
    }

    /// Resolve a request path. Query strings, fragments and a trailing
    /// slash are ignored; anything unknown is `NotFound`.
    pub fn parse(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };

        Route::ALL
            .into_iter()
            .find(|r| *r != Route::NotFound && r.path() == normalized)
            .unwrap_or(Route::NotFound)
    }

    pub fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Route::AdminDashboard | Route::AdminPatients | Route::AdminAppointments | Route::AdminStaff
        )
    }

    /// Pages that make no sense once signed in
    pub fn is_guest_only(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
