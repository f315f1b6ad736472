//! # Routing
//!
//! Maps a requested screen and the session to the screen to render.
//!
//! [`decide`] is pure and total. It only uses the advisory role claim to
//! pick between the two dashboards; the server still filters every
//! request by the credential it re-validates.

use crate::claims::Role;
use crate::session::{SessionState, SessionStatus};

/// Protected pages below the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    /// File catalog listing.
    Files,
    /// Upload form.
    Upload,
    /// Full-text search.
    Search,
    /// Account settings (password change).
    Settings,
}

impl Page {
    /// Path segment of the page.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Upload => "upload",
            Self::Search => "search",
            Self::Settings => "settings",
        }
    }
}

/// A screen the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Sign-in form.
    Login,
    /// Account creation form.
    Register,
    /// Dashboard entry; resolves to the admin or user dashboard.
    Dashboard,
    /// Any page that needs a session.
    Protected(Page),
}

impl Route {
    /// Parse a navigation path.
    ///
    /// Unknown paths fall through to the dashboard entry.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.trim().trim_end_matches('/');
        match trimmed {
            "/login" | "login" => Self::Login,
            "/register" | "register" => Self::Register,
            "/files" | "files" => Self::Protected(Page::Files),
            "/upload" | "upload" => Self::Protected(Page::Upload),
            "/search" | "search" => Self::Protected(Page::Search),
            "/settings" | "settings" => Self::Protected(Page::Settings),
            _ => Self::Dashboard,
        }
    }

    /// Whether this is the login or register screen.
    #[must_use]
    pub fn is_auth_screen(self) -> bool {
        matches!(self, Self::Login | Self::Register)
    }
}

/// A screen the UI layer can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    /// Neutral placeholder while the session is loading.
    Waiting,
    /// Sign-in form.
    Login,
    /// Account creation form.
    Register,
    /// Dashboard showing every user's documents.
    AdminDashboard,
    /// Dashboard showing the user's own documents.
    UserDashboard,
    /// A protected page.
    Page(Page),
}

impl Screen {
    /// Dashboard for `role`.
    #[must_use]
    pub fn dashboard_for(role: Role) -> Self {
        match role {
            Role::Admin => Self::AdminDashboard,
            Role::User => Self::UserDashboard,
        }
    }
}

/// Outcome of a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Render the screen at the requested location.
    Render(Screen),
    /// Replace the location and render this screen instead.
    Redirect(Screen),
}

impl Decision {
    /// The screen to show, regardless of whether it is a redirect.
    #[must_use]
    pub fn screen(self) -> Screen {
        match self {
            Self::Render(screen) | Self::Redirect(screen) => screen,
        }
    }

    /// Whether the location changes.
    #[must_use]
    pub fn is_redirect(self) -> bool {
        matches!(self, Self::Redirect(_))
    }
}

/// Decide what to render for `requested` given `state`.
#[must_use]
pub fn decide(requested: Route, state: &SessionState) -> Decision {
    decide_status(requested, state.status())
}

/// [`decide`] over an already-folded [`SessionStatus`].
#[must_use]
pub fn decide_status(requested: Route, status: SessionStatus) -> Decision {
    match (status, requested) {
        (SessionStatus::Loading, _) => Decision::Render(Screen::Waiting),

        (SessionStatus::Authenticated(role), Route::Login | Route::Register) => {
            Decision::Redirect(Screen::dashboard_for(role))
        }
        (SessionStatus::Authenticated(role), Route::Dashboard) => {
            Decision::Render(Screen::dashboard_for(role))
        }
        (SessionStatus::Authenticated(_), Route::Protected(page)) => {
            Decision::Render(Screen::Page(page))
        }

        (SessionStatus::Unauthenticated, Route::Login) => Decision::Render(Screen::Login),
        (SessionStatus::Unauthenticated, Route::Register) => Decision::Render(Screen::Register),
        (SessionStatus::Unauthenticated, Route::Dashboard | Route::Protected(_)) => {
            Decision::Redirect(Screen::Login)
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn route_strategy() -> impl Strategy<Value = Route> {
        prop_oneof![
            Just(Route::Login),
            Just(Route::Register),
            Just(Route::Dashboard),
            Just(Route::Protected(Page::Files)),
            Just(Route::Protected(Page::Upload)),
            Just(Route::Protected(Page::Search)),
            Just(Route::Protected(Page::Settings)),
        ]
    }

    fn status_strategy() -> impl Strategy<Value = SessionStatus> {
        prop_oneof![
            Just(SessionStatus::Loading),
            Just(SessionStatus::Unauthenticated),
            Just(SessionStatus::Authenticated(Role::Admin)),
            Just(SessionStatus::Authenticated(Role::User)),
        ]
    }

    proptest! {
        /// Property: a signed-out session never reaches a dashboard or page
        #[test]
        fn prop_signed_out_never_sees_protected(route in route_strategy()) {
            let screen = decide_status(route, SessionStatus::Unauthenticated).screen();
            prop_assert!(matches!(screen, Screen::Login | Screen::Register));
        }

        /// Property: redirects always land on a screen that renders without another redirect
        #[test]
        fn prop_redirects_are_stable(route in route_strategy(), status in status_strategy()) {
            if let Decision::Redirect(target) = decide_status(route, status) {
                let again = match target {
                    Screen::Login => Route::Login,
                    Screen::Register => Route::Register,
                    Screen::AdminDashboard | Screen::UserDashboard | Screen::Waiting => Route::Dashboard,
                    Screen::Page(page) => Route::Protected(page),
                };
                prop_assert_eq!(decide_status(again, status), Decision::Render(target));
            }
        }
    }
}
