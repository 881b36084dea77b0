//! Route guard: decides, per navigation, whether a requested view may
//! render. Pure function of the auth controller's current state.

use crate::auth::AuthState;

/// Where unauthenticated navigations are redirected.
pub const LOGIN_PATH: &str = "/login";

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    /// Auth state is still being restored; render nothing yet rather than
    /// redirecting a user whose session may come back.
    Defer,
    Redirect(&'static str),
}

pub fn can_enter(requires_auth: bool, state: &AuthState) -> RouteDecision {
    if !requires_auth {
        return RouteDecision::Allow;
    }

    match state {
        AuthState::Loading => RouteDecision::Defer,
        AuthState::Unauthenticated => RouteDecision::Redirect(LOGIN_PATH),
        AuthState::Authenticated { .. } => RouteDecision::Allow,
    }
}
