//! Route guard: keeps the current location consistent with the session.
//!
//! The rule is declarative and idempotent. It runs whenever the session
//! state or the location changes, never on a timer, and does nothing
//! while the initial session restore is still in flight (otherwise the
//! user would see a redirect flash before the persisted token is read).

use std::sync::Arc;

use tokio::sync::watch;

use crate::session::SessionState;

/// Which area of the app the user is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationCategory {
    /// The unauthenticated area (login and OTP screens).
    Login,
    /// The authenticated area (tabs, search, upload, profile).
    App,
}

/// Navigation boundary consumed by the guard. Implemented by whatever
/// owns the real router.
pub trait Navigator: Send + Sync {
    fn current_location(&self) -> LocationCategory;
    fn navigate_to(&self, target: LocationCategory);
}

/// Continuously-evaluated redirect rule between the login and app areas.
pub struct RouteGuard {
    session: watch::Receiver<SessionState>,
    navigator: Arc<dyn Navigator>,
}

impl RouteGuard {
    pub fn new(session: watch::Receiver<SessionState>, navigator: Arc<dyn Navigator>) -> Self {
        Self { session, navigator }
    }

    /// Re-evaluate the rule against the current session state. Evaluating
    /// while already in the right place is a no-op.
    pub fn evaluate(&self) {
        let state = self.session.borrow().clone();
        apply(&state, self.navigator.as_ref());
    }

    /// Hook for the navigation side: call when the location changed for a
    /// reason other than a session transition.
    pub fn on_location_changed(&self) {
        self.evaluate();
    }

    /// Drive the guard from session transitions until the session store
    /// goes away. Meant to be spawned next to the store at the
    /// composition root.
    pub async fn run(mut self) {
        self.evaluate();
        while self.session.changed().await.is_ok() {
            let state = self.session.borrow_and_update().clone();
            apply(&state, self.navigator.as_ref());
        }
    }
}

fn apply(state: &SessionState, navigator: &dyn Navigator) {
    if state.is_loading {
        return;
    }
    match (state.is_authenticated(), navigator.current_location()) {
        (false, LocationCategory::App) => {
            tracing::debug!("no session, redirecting to login");
            navigator.navigate_to(LocationCategory::Login);
        }
        (true, LocationCategory::Login) => {
            tracing::debug!("session present, redirecting into the app");
            navigator.navigate_to(LocationCategory::App);
        }
        _ => {}
    }
}
