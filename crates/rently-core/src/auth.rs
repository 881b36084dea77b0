//! Authentication controller and session lifecycle.
//!
//! Owns the login/signup/logout transitions and the current auth state.
//! The HTTP client's bearer token and the session store are only ever
//! written through this controller; views read state and issue requests.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiError, ApiErrorKind};
use crate::session::{Session, SessionStore, UserSummary};

/// Fallback when a login rejection carries no server message.
pub const LOGIN_FALLBACK_ERROR: &str = "Invalid username or password";
/// Fallback when a signup rejection carries no server message.
pub const SIGNUP_FALLBACK_ERROR: &str = "Registration failed. Please try again.";
/// Fallback for network failures and unexpected server errors.
const SERVER_FALLBACK_ERROR: &str = "Unable to reach the server. Please try again.";

/// Login credentials. Transient; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Positional (username, password) pairs normalize to the same request.
impl From<(&str, &str)> for Credentials {
    fn from((username, password): (&str, &str)) -> Self {
        Self::new(username, password)
    }
}

impl From<(String, String)> for Credentials {
    fn from((username, password): (String, String)) -> Self {
        Self { username, password }
    }
}

/// Signup form fields. Transient; never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// Wire shape of a successful auth response.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    id: i64,
    username: String,
    email: String,
}

/// Profile of the signed-in user, as served by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
struct UpdateUserResponse {
    user: UpdatedUser,
}

#[derive(Debug, Deserialize)]
struct UpdatedUser {
    id: i64,
    username: String,
    email: String,
}

/// Errors surfaced across the controller boundary.
///
/// The controller never panics and never leaks raw transport errors;
/// every operation resolves to success or one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Login rejected; carries the server's message verbatim when present.
    InvalidCredentials(String),
    /// Local or server-side validation failure.
    ValidationFailed(String),
    /// The backend no longer accepts the stored token.
    SessionExpired,
    /// Network failure or unexpected server error.
    ServerError(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials(msg)
            | AuthError::ValidationFailed(msg)
            | AuthError::ServerError(msg) => write!(f, "{}", msg),
            AuthError::SessionExpired => write!(f, "Session expired"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Current authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Session restore has not settled yet; auth-gated decisions defer.
    Loading,
    Unauthenticated,
    /// Token installed. The user summary may be absent when the persisted
    /// record was unreadable; the token alone authenticates.
    Authenticated { user: Option<UserSummary> },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }
}

/// Owns the session lifecycle: one per process, constructed with the
/// process-wide [`ApiClient`] and a [`SessionStore`].
pub struct AuthController<S: SessionStore> {
    api: ApiClient,
    store: S,
    state: AuthState,
    epoch: u64,
}

impl<S: SessionStore> AuthController<S> {
    /// The controller starts in `Loading` until [`Self::restore_session`]
    /// settles the state.
    pub fn new(api: ApiClient, store: S) -> Self {
        Self {
            api,
            store,
            state: AuthState::Loading,
            epoch: 0,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// The API client with the current bearer token installed.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn current_user(&self) -> Option<&UserSummary> {
        match &self.state {
            AuthState::Authenticated { user } => user.as_ref(),
            _ => None,
        }
    }

    /// Session epoch, bumped on every settle/login/logout/expiry
    /// transition. Snapshot it before dispatching a request and hand it
    /// back with the response; a stale epoch means the response must be
    /// discarded rather than applied.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Settles the initial state from the session store.
    /// Called once at process start.
    pub fn restore_session(&mut self) {
        let session = self.store.restore();
        match session.token {
            Some(token) => {
                self.api.set_token(&token);
                self.settle(AuthState::Authenticated { user: session.user });
            }
            None => self.settle(AuthState::Unauthenticated),
        }
    }

    /// Logs in with structured credentials or a positional pair.
    pub async fn login(
        &mut self,
        credentials: impl Into<Credentials>,
    ) -> Result<UserSummary, AuthError> {
        let credentials = credentials.into();
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return Err(AuthError::ValidationFailed(
                "Username and password are required".to_string(),
            ));
        }

        let result = self
            .api
            .post_json::<AuthResponse, _>("/api/auth/login", &credentials)
            .await;

        match result {
            Ok(response) => Ok(self.install(response)),
            Err(err) => Err(login_error(&err)),
        }
    }

    /// Creates an account; a successful signup also logs in.
    pub async fn signup(&mut self, form: SignupForm) -> Result<UserSummary, AuthError> {
        if form.username.trim().is_empty()
            || form.email.trim().is_empty()
            || form.password.is_empty()
        {
            return Err(AuthError::ValidationFailed(
                "Username, email and password are required".to_string(),
            ));
        }

        let result = self
            .api
            .post_json::<AuthResponse, _>("/api/auth/signup", &form)
            .await;

        match result {
            Ok(response) => Ok(self.install(response)),
            Err(err) => Err(signup_error(&err)),
        }
    }

    /// Clears the session. Safe to call in any state.
    pub fn logout(&mut self) -> anyhow::Result<()> {
        self.store.clear()?;
        self.api.clear_token();
        self.settle(AuthState::Unauthenticated);
        tracing::debug!("session cleared");
        Ok(())
    }

    /// Replaces the stored user summary wholesale; the token is unchanged.
    pub fn update_user(&mut self, user: UserSummary) -> anyhow::Result<()> {
        if !self.state.is_authenticated() {
            anyhow::bail!("Not authenticated");
        }
        let Some(token) = self.api.token().map(str::to_string) else {
            anyhow::bail!("Not authenticated");
        };

        self.store.save(&Session::authenticated(token, user.clone()))?;
        // Same session identity: in-flight requests stay valid, no epoch bump.
        self.state = AuthState::Authenticated { user: Some(user) };
        Ok(())
    }

    /// Applies a user summary carried by an in-flight response.
    /// Discarded (returns false) when the session changed since the
    /// request was issued.
    pub fn apply_user_refresh(&mut self, user: UserSummary, epoch: u64) -> bool {
        if epoch != self.epoch || !self.state.is_authenticated() {
            tracing::debug!("discarding stale user refresh");
            return false;
        }
        self.update_user(user).is_ok()
    }

    /// Handles an unauthorized response observed on an authenticated call.
    ///
    /// Exactly-once: returns true only for the observation that cleared
    /// the session; a late duplicate carries a stale epoch and is a no-op.
    pub fn notice_unauthorized(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch || !self.state.is_authenticated() {
            return false;
        }
        if let Err(e) = self.store.clear() {
            tracing::warn!("failed to clear persisted session: {e:#}");
        }
        self.api.clear_token();
        self.settle(AuthState::Unauthenticated);
        true
    }

    /// Maps a transport error from an authenticated call, consuming a 401
    /// into the session-expired transition.
    pub fn absorb_unauthorized(&mut self, err: &ApiError, epoch: u64) -> AuthError {
        if err.is_unauthorized() {
            self.notice_unauthorized(epoch);
            AuthError::SessionExpired
        } else {
            AuthError::ServerError(err.server_message_or(SERVER_FALLBACK_ERROR))
        }
    }

    /// Fetches the signed-in user's profile.
    pub async fn fetch_profile(&mut self) -> Result<Profile, AuthError> {
        let epoch = self.epoch;
        let result = self.api.get_json::<Profile>("/api/user/profile", &[]).await;
        match result {
            Ok(profile) => Ok(profile),
            Err(err) => Err(self.absorb_unauthorized(&err, epoch)),
        }
    }

    /// Updates the contact phone number; the returned user summary
    /// replaces the stored one (unless the session changed meanwhile).
    pub async fn update_phone_number(&mut self, phone_number: &str) -> Result<UserSummary, AuthError> {
        let epoch = self.epoch;
        let body = serde_json::json!({ "phoneNumber": phone_number });
        let result = self
            .api
            .post_json::<UpdateUserResponse, _>("/api/user/update", &body)
            .await;

        match result {
            Ok(response) => {
                let user = UserSummary {
                    id: response.user.id,
                    username: response.user.username,
                    email: response.user.email,
                };
                self.apply_user_refresh(user.clone(), epoch);
                Ok(user)
            }
            Err(err) => Err(self.absorb_unauthorized(&err, epoch)),
        }
    }

    fn install(&mut self, response: AuthResponse) -> UserSummary {
        let user = UserSummary {
            id: response.id,
            username: response.username,
            email: response.email,
        };

        let session = Session::authenticated(response.token.clone(), user.clone());
        if let Err(e) = self.store.save(&session) {
            // The in-memory session still works for this process.
            tracing::warn!("failed to persist session: {e:#}");
        }
        self.api.set_token(&response.token);
        self.settle(AuthState::Authenticated {
            user: Some(user.clone()),
        });
        tracing::debug!(username = %user.username, "authenticated");
        user
    }

    fn settle(&mut self, state: AuthState) {
        self.state = state;
        self.epoch += 1;
    }
}

fn login_error(err: &ApiError) -> AuthError {
    match err.kind {
        ApiErrorKind::Unauthorized => {
            AuthError::InvalidCredentials(err.server_message_or(LOGIN_FALLBACK_ERROR))
        }
        ApiErrorKind::HttpStatus if err.status.is_some_and(|s| (400..500).contains(&s)) => {
            AuthError::InvalidCredentials(err.server_message_or(LOGIN_FALLBACK_ERROR))
        }
        _ => AuthError::ServerError(err.server_message_or(SERVER_FALLBACK_ERROR)),
    }
}

fn signup_error(err: &ApiError) -> AuthError {
    match err.kind {
        ApiErrorKind::Unauthorized => {
            AuthError::ValidationFailed(err.server_message_or(SIGNUP_FALLBACK_ERROR))
        }
        ApiErrorKind::HttpStatus if err.status.is_some_and(|s| (400..500).contains(&s)) => {
            AuthError::ValidationFailed(err.server_message_or(SIGNUP_FALLBACK_ERROR))
        }
        _ => AuthError::ServerError(err.server_message_or(SERVER_FALLBACK_ERROR)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Deployment;
    use crate::session::MemorySessionStore;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn auth_body(token: &str) -> serde_json::Value {
        serde_json::json!({
            "token": token,
            "id": 7,
            "username": "alice",
            "email": "alice@example.com",
        })
    }

    fn controller_for(server: &MockServer) -> AuthController<MemorySessionStore> {
        let api = ApiClient::new(&server.uri(), Deployment::Proxied).unwrap();
        let mut controller = AuthController::new(api, MemorySessionStore::default());
        controller.restore_session();
        controller
    }

    /// Test: successful login authenticates and persists the backend token.
    #[tokio::test]
    async fn test_login_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(serde_json::json!({
                "username": "alice",
                "password": "secret",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("tok-1")))
            .expect(1)
            .mount(&server)
            .await;

        let mut controller = controller_for(&server);
        let user = controller
            .login(Credentials::new("alice", "secret"))
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
        assert!(controller.state().is_authenticated());
        assert_eq!(controller.api().token(), Some("tok-1"));
        // The store holds exactly the token the backend returned.
        assert_eq!(controller.store.restore().token.as_deref(), Some("tok-1"));
    }

    /// Test: a positional pair normalizes to the same structured request.
    #[tokio::test]
    async fn test_login_positional_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(serde_json::json!({
                "username": "alice",
                "password": "secret",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("tok-1")))
            .expect(1)
            .mount(&server)
            .await;

        let mut controller = controller_for(&server);
        controller.login(("alice", "secret")).await.unwrap();
        assert!(controller.state().is_authenticated());
    }

    /// Test: rejected login surfaces the server message and changes nothing.
    #[tokio::test]
    async fn test_login_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"error": "Invalid username or password"})),
            )
            .mount(&server)
            .await;

        let mut controller = controller_for(&server);
        let err = controller.login(("alice", "wrong")).await.unwrap_err();

        assert_eq!(
            err,
            AuthError::InvalidCredentials("Invalid username or password".to_string())
        );
        assert_eq!(*controller.state(), AuthState::Unauthenticated);
        assert!(controller.api().token().is_none());
        assert!(!controller.store.restore().is_authenticated());
    }

    /// Test: empty credentials are rejected locally, no request is sent.
    #[tokio::test]
    async fn test_login_empty_fields_rejected_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("tok")))
            .expect(0)
            .mount(&server)
            .await;

        let mut controller = controller_for(&server);
        let err = controller.login(("", "secret")).await.unwrap_err();
        assert!(matches!(err, AuthError::ValidationFailed(_)));

        let err = controller.login(("alice", "")).await.unwrap_err();
        assert!(matches!(err, AuthError::ValidationFailed(_)));
    }

    /// Test: signup success behaves like login success.
    #[tokio::test]
    async fn test_signup_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/signup"))
            .and(body_json(serde_json::json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "secret",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("tok-s")))
            .expect(1)
            .mount(&server)
            .await;

        let mut controller = controller_for(&server);
        let form = SignupForm {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "secret".to_string(),
            phone_number: None,
        };
        controller.signup(form).await.unwrap();

        assert!(controller.state().is_authenticated());
        assert_eq!(controller.store.restore().token.as_deref(), Some("tok-s"));
    }

    /// Test: signup conflicts surface the server's validation message.
    #[tokio::test]
    async fn test_signup_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/signup"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "Username is already taken"})),
            )
            .mount(&server)
            .await;

        let mut controller = controller_for(&server);
        let form = SignupForm {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "secret".to_string(),
            phone_number: None,
        };
        let err = controller.signup(form).await.unwrap_err();

        assert_eq!(
            err,
            AuthError::ValidationFailed("Username is already taken".to_string())
        );
        assert_eq!(*controller.state(), AuthState::Unauthenticated);
    }

    /// Test: restore settles Authenticated from a stored session.
    #[tokio::test]
    async fn test_restore_authenticated() {
        let server = MockServer::start().await;
        let api = ApiClient::new(&server.uri(), Deployment::Proxied).unwrap();

        let mut store = MemorySessionStore::default();
        store
            .save(&Session::authenticated(
                "tok-restored",
                UserSummary {
                    id: 7,
                    username: "alice".to_string(),
                    email: "alice@example.com".to_string(),
                },
            ))
            .unwrap();

        let mut controller = AuthController::new(api, store);
        assert_eq!(*controller.state(), AuthState::Loading);

        controller.restore_session();
        assert!(controller.state().is_authenticated());
        assert_eq!(controller.api().token(), Some("tok-restored"));
        assert_eq!(controller.current_user().unwrap().username, "alice");
    }

    /// Test: a token without a readable user still authenticates.
    #[tokio::test]
    async fn test_restore_token_without_user() {
        let server = MockServer::start().await;
        let api = ApiClient::new(&server.uri(), Deployment::Proxied).unwrap();

        // What the fs store yields for a corrupt persisted user record.
        let store = MemorySessionStore::with_session(Session {
            token: Some("tok-only".to_string()),
            user: None,
        });
        let mut controller = AuthController::new(api, store);

        controller.restore_session();
        assert!(controller.state().is_authenticated());
        assert!(controller.current_user().is_none());
    }

    /// Test: logout clears everything; a subsequent restore is unauthenticated.
    #[tokio::test]
    async fn test_logout_then_restore() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("tok-1")))
            .mount(&server)
            .await;

        let mut controller = controller_for(&server);
        controller.login(("alice", "secret")).await.unwrap();
        controller.logout().unwrap();

        assert_eq!(*controller.state(), AuthState::Unauthenticated);
        assert!(controller.api().token().is_none());

        // Simulated reload: restore from the same (now empty) store.
        controller.restore_session();
        assert_eq!(*controller.state(), AuthState::Unauthenticated);
    }

    /// Test: an unauthorized response expires the session exactly once.
    #[tokio::test]
    async fn test_unauthorized_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("tok-1")))
            .mount(&server)
            .await;

        let mut controller = controller_for(&server);
        controller.login(("alice", "secret")).await.unwrap();

        let epoch = controller.epoch();
        assert!(controller.notice_unauthorized(epoch));
        assert_eq!(*controller.state(), AuthState::Unauthenticated);
        assert!(!controller.store.restore().is_authenticated());

        // A second identical late response is a no-op.
        assert!(!controller.notice_unauthorized(epoch));
        assert_eq!(*controller.state(), AuthState::Unauthenticated);
    }

    /// Test: a response that raced a logout is discarded, not applied.
    #[tokio::test]
    async fn test_stale_response_discarded_after_logout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("tok-1")))
            .mount(&server)
            .await;

        let mut controller = controller_for(&server);
        controller.login(("alice", "secret")).await.unwrap();

        // Snapshot taken when the profile request went out.
        let epoch = controller.epoch();
        controller.logout().unwrap();

        let refreshed = UserSummary {
            id: 7,
            username: "alice".to_string(),
            email: "new@example.com".to_string(),
        };
        assert!(!controller.apply_user_refresh(refreshed, epoch));
        assert_eq!(*controller.state(), AuthState::Unauthenticated);
        assert!(!controller.store.restore().is_authenticated());
    }

    /// Test: update_user replaces the summary and keeps the token.
    #[tokio::test]
    async fn test_update_user_replaces_summary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("tok-1")))
            .mount(&server)
            .await;

        let mut controller = controller_for(&server);
        controller.login(("alice", "secret")).await.unwrap();

        let updated = UserSummary {
            id: 7,
            username: "alice".to_string(),
            email: "new@example.com".to_string(),
        };
        controller.update_user(updated.clone()).unwrap();

        assert_eq!(controller.current_user(), Some(&updated));
        let persisted = controller.store.restore();
        assert_eq!(persisted.token.as_deref(), Some("tok-1"));
        assert_eq!(persisted.user, Some(updated));
    }

    /// Test: a 401 on profile fetch maps to SessionExpired and clears state.
    #[tokio::test]
    async fn test_profile_fetch_expires_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("tok-1")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/user/profile"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let mut controller = controller_for(&server);
        controller.login(("alice", "secret")).await.unwrap();

        let err = controller.fetch_profile().await.unwrap_err();
        assert_eq!(err, AuthError::SessionExpired);
        assert_eq!(*controller.state(), AuthState::Unauthenticated);
    }
}
