//! The process-wide authentication state.
//!
//! A [`SessionStore`] owns the current [`Session`] and is the only way to
//! change it. Every change is published on a `watch` channel so that
//! dependents (the route guard, status displays) observe it without
//! polling.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

use crate::{
    api::Error,
    domain::{Credentials, Registration, User},
};

/// A snapshot of the client-side authentication state.
///
/// The fields are kept consistent by construction: a session never holds a
/// user while loading or while carrying an error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Session {
    user: Option<User>,
    loading: bool,
    error: Option<String>,
}

/// The state a [`Session`] is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No user, nothing in progress.
    Anonymous,
    /// The profile is being fetched.
    Initializing,
    /// A user is logged in.
    Authenticated,
    /// The last session operation failed.
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Anonymous => "anonymous",
            Self::Initializing => "initializing",
            Self::Authenticated => "authenticated",
            Self::Error => "error",
        })
    }
}

impl Session {
    /// No user and nothing in progress.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            user: None,
            loading: false,
            error: None,
        }
    }

    /// Waiting for the profile.
    #[must_use]
    pub const fn initializing() -> Self {
        Self {
            user: None,
            loading: true,
            error: None,
        }
    }

    /// Logged in as `user`.
    #[must_use]
    pub const fn authenticated(user: User) -> Self {
        Self {
            user: Some(user),
            loading: false,
            error: None,
        }
    }

    /// A failed session operation.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            user: None,
            loading: false,
            error: Some(message.into()),
        }
    }

    /// The logged-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Whether an operation is in progress.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// The message of the last failure, if the session is in error.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a user is logged in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// The state this session is in.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        if self.error.is_some() {
            SessionState::Error
        } else if self.loading {
            SessionState::Initializing
        } else if self.user.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }
}

/// The authentication endpoints the session depends on.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Establish a session with the backend.
    async fn login(&self, credentials: &Credentials) -> Result<(), Error>;

    /// Create an account. Does not log in.
    async fn register(&self, registration: &Registration) -> Result<(), Error>;

    /// End the session with the backend.
    async fn logout(&self) -> Result<(), Error>;

    /// The profile of the logged-in user.
    async fn profile(&self) -> Result<User, Error>;
}

/// Owns the [`Session`] and funnels every change through named operations.
#[derive(Debug)]
pub struct SessionStore<A> {
    api: A,
    state: watch::Sender<Session>,
}

impl<A: AuthApi> SessionStore<A> {
    /// A store in the [`SessionState::Initializing`] state.
    ///
    /// Call [`SessionStore::initialize`] to resolve it.
    pub fn new(api: A) -> Self {
        let (state, _) = watch::channel(Session::initializing());
        Self { api, state }
    }

    /// The backend the store talks to.
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Observe session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// A copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// The current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().state()
    }

    /// Resolve the initial state by fetching the profile.
    ///
    /// An unauthenticated answer (401, 403 or 404) leaves the session
    /// anonymous; any other failure puts it in error.
    #[tracing::instrument(skip(self))]
    pub async fn initialize(&self) -> SessionState {
        self.fetch_profile().await
    }

    /// Refresh the user from the backend.
    ///
    /// Outcomes are mapped as for [`SessionStore::initialize`].
    pub async fn fetch_profile(&self) -> SessionState {
        self.publish(Session::initializing());
        let session = match self.api.profile().await {
            Ok(user) => Session::authenticated(user),
            Err(error) if error.is_unauthenticated() => {
                tracing::debug!("no active session: {error}");
                Session::anonymous()
            }
            Err(error) => Session::failed(error.to_string()),
        };
        self.publish(session)
    }

    /// Log in and load the profile.
    ///
    /// # Errors
    ///
    /// Fails if the credentials are rejected (locally or by the backend) or
    /// the profile cannot be loaded afterwards. The session is then in error
    /// and holds no user.
    #[tracing::instrument(skip_all, fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &Credentials) -> Result<User, Error> {
        self.publish(Session::initializing());

        let result = match self.api.login(credentials).await {
            Ok(()) => self.api.profile().await,
            Err(error) => Err(error),
        };

        match result {
            Ok(user) => {
                self.publish(Session::authenticated(user.clone()));
                Ok(user)
            }
            Err(error) => {
                self.publish(Session::failed(error.to_string()));
                Err(error)
            }
        }
    }

    /// End the session.
    ///
    /// The user is cleared whatever the outcome.
    ///
    /// # Errors
    ///
    /// Fails if the backend call fails. The session is then in error and
    /// still holds no user.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), Error> {
        let result = self.api.logout().await;
        match &result {
            Ok(()) => self.publish(Session::anonymous()),
            Err(error) => self.publish(Session::failed(error.to_string())),
        };
        result
    }

    /// Create an account.
    ///
    /// The session is not changed; log in separately afterwards.
    ///
    /// # Errors
    ///
    /// Fails if the registration is invalid or rejected by the backend.
    #[tracing::instrument(skip_all, fields(username = %registration.username))]
    pub async fn register(&self, registration: &Registration) -> Result<(), Error> {
        self.api.register(registration).await
    }

    fn publish(&self, session: Session) -> SessionState {
        let state = session.state();
        tracing::debug!(%state, "session changed");
        self.state.send_replace(session);
        state
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    struct FakeAuth {
        logged_in: AtomicBool,
        registrations: AtomicUsize,
        reject_login: bool,
        fail_logout: bool,
        profile_error: Option<fn() -> Error>,
    }

    impl FakeAuth {
        const fn new() -> Self {
            Self {
                logged_in: AtomicBool::new(false),
                registrations: AtomicUsize::new(0),
                reject_login: false,
                fail_logout: false,
                profile_error: None,
            }
        }

        fn logged_in() -> Self {
            let fake = Self::new();
            fake.logged_in.store(true, Ordering::SeqCst);
            fake
        }
    }

    fn responder() -> User {
        serde_json::from_str(r#"{"id": "u1", "username": "responder"}"#).unwrap()
    }

    fn status(status: u16, message: &str) -> Error {
        Error::Status {
            status,
            message: message.to_string(),
        }
    }

    #[async_trait]
    impl AuthApi for FakeAuth {
        async fn login(&self, credentials: &Credentials) -> Result<(), Error> {
            credentials.validated()?;
            if self.reject_login {
                return Err(status(401, "Invalid credentials"));
            }
            self.logged_in.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn register(&self, registration: &Registration) -> Result<(), Error> {
            registration.validated()?;
            self.registrations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn logout(&self) -> Result<(), Error> {
            self.logged_in.store(false, Ordering::SeqCst);
            if self.fail_logout {
                Err(status(500, "Logout failed"))
            } else {
                Ok(())
            }
        }

        async fn profile(&self) -> Result<User, Error> {
            if let Some(error) = self.profile_error {
                return Err(error());
            }
            if self.logged_in.load(Ordering::SeqCst) {
                Ok(responder())
            } else {
                Err(status(401, "Not authenticated"))
            }
        }
    }

    #[test]
    fn new_store_is_initializing() {
        let store = SessionStore::new(FakeAuth::new());
        assert_eq!(store.state(), SessionState::Initializing);
        assert!(store.snapshot().is_loading());
    }

    #[tokio::test]
    async fn initialize_with_active_session_authenticates() {
        let store = SessionStore::new(FakeAuth::logged_in());

        assert_eq!(store.initialize().await, SessionState::Authenticated);
        assert_eq!(store.snapshot().user(), Some(&responder()));
    }

    #[tokio::test]
    async fn initialize_without_session_is_anonymous() {
        let store = SessionStore::new(FakeAuth::new());

        assert_eq!(store.initialize().await, SessionState::Anonymous);
        assert_eq!(store.snapshot().error(), None);
    }

    #[tokio::test]
    async fn initialize_server_failure_is_error() {
        let store = SessionStore::new(FakeAuth {
            profile_error: Some(|| status(500, "Database unavailable")),
            ..FakeAuth::new()
        });

        assert_eq!(store.initialize().await, SessionState::Error);
        assert_eq!(store.snapshot().error(), Some("Database unavailable"));
        assert_eq!(store.snapshot().user(), None);
    }

    #[tokio::test]
    async fn login_publishes_authenticated_user() {
        let store = SessionStore::new(FakeAuth::new());
        store.initialize().await;
        let mut updates = store.subscribe();

        let user = store
            .login(&Credentials::new("responder", "hunter22"))
            .await
            .unwrap();

        assert_eq!(user.username, "responder");
        assert!(updates.has_changed().unwrap());
        let session = updates.borrow_and_update().clone();
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn rejected_login_is_error_without_user() {
        let store = SessionStore::new(FakeAuth {
            reject_login: true,
            ..FakeAuth::new()
        });

        let error = store
            .login(&Credentials::new("responder", "wrong"))
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "Invalid credentials");
        let session = store.snapshot();
        assert_eq!(session.state(), SessionState::Error);
        assert_eq!(session.error(), Some("Invalid credentials"));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn blank_credentials_fail_locally() {
        let store = SessionStore::new(FakeAuth::new());

        let error = store.login(&Credentials::new(" ", "x")).await.unwrap_err();

        assert!(matches!(error, Error::Validation(_)));
        assert_eq!(store.snapshot().error(), Some("username is required"));
    }

    #[tokio::test]
    async fn logout_clears_user() {
        let store = SessionStore::new(FakeAuth::logged_in());
        store.initialize().await;

        store.logout().await.unwrap();

        assert_eq!(store.state(), SessionState::Anonymous);
        assert_eq!(store.snapshot().user(), None);
    }

    #[tokio::test]
    async fn failed_logout_still_clears_user() {
        let store = SessionStore::new(FakeAuth {
            fail_logout: true,
            ..FakeAuth::logged_in()
        });
        store.initialize().await;
        assert!(store.snapshot().is_authenticated());

        let error = store.logout().await.unwrap_err();

        assert_eq!(error.to_string(), "Logout failed");
        let session = store.snapshot();
        assert_eq!(session.user(), None);
        assert_eq!(session.state(), SessionState::Error);
    }

    #[tokio::test]
    async fn register_leaves_session_alone() {
        let store = SessionStore::new(FakeAuth::new());
        store.initialize().await;
        let before = store.snapshot();

        store
            .register(&Registration {
                username: "new".to_string(),
                email: "new@relief.org".to_string(),
                password: "long enough".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(store.snapshot(), before);
        assert_eq!(store.api().registrations.load(Ordering::SeqCst), 1);
    }
}
