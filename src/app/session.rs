// NeuroSuite - app/session.rs
//
// Session manager: the single owner of "is the user authenticated" and
// "which bearer token do outgoing requests use".
//
// State machine:
//   LoggedOut --login--> LoggedIn --(logout | refresh failure)--> LoggedOut
// Token rotation happens underneath LoggedIn without a visible sub-state.
//
// Design principles:
// - A half-populated session is unrepresentable: LoggedIn always carries
//   both the user and the token pair.
// - Failures during restore/refresh degrade to LoggedOut and are logged,
//   never surfaced as a crash.
// - The in-memory state lock is never held across an await.
// - Every login/logout bumps an epoch; async work started under an older
//   epoch (restore, renew, profile fetch) does not overwrite the newer state.

use crate::core::api::AuthApi;
use crate::core::model::{Credentials, SessionUser, SignUpRequest, TokenPair};
use crate::core::validation;
use crate::platform::token_store::TokenStore;
use crate::util::error::{NeuroSuiteError, Result, SessionError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;

/// Authentication state visible to callers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    LoggedOut,
    LoggedIn {
        user: SessionUser,
        tokens: TokenPair,
    },
}

impl SessionState {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn { .. })
    }

    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            Self::LoggedIn { user, .. } => Some(user),
            Self::LoggedOut => None,
        }
    }

    pub fn tokens(&self) -> Option<&TokenPair> {
        match self {
            Self::LoggedIn { tokens, .. } => Some(tokens),
            Self::LoggedOut => None,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: SessionState,
    epoch: u64,
}

/// Owns the session for the lifetime of the process. Share it with
/// `Arc<SessionManager>`; every method takes `&self`.
pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn TokenStore>,
    inner: Mutex<Inner>,
    restored: OnceCell<()>,
    // Serialises token renewal so concurrent 401s trigger one refresh.
    renewal: tokio::sync::Mutex<()>,
}

impl SessionManager {
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            api,
            store,
            inner: Mutex::new(Inner::default()),
            restored: OnceCell::new(),
            renewal: tokio::sync::Mutex::new(()),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    /// Enter LoggedIn with `user` and `tokens`, persisting the tokens.
    ///
    /// Cannot fail: a storage error is logged and the session still holds
    /// in memory for this process.
    pub fn login(&self, user: SessionUser, tokens: TokenPair) {
        tracing::debug!(email = %user.email, "Session user set");
        if self.install(None, Some(user), tokens) {
            tracing::info!("Logged in");
        }
    }

    /// Clear the in-memory session and the durable copy. Idempotent.
    pub fn logout(&self) {
        self.clear_session(None);
    }

    fn logout_if_epoch(&self, epoch: u64) {
        if !self.clear_session(Some(epoch)) {
            tracing::debug!("Session changed while a token operation was pending; keeping it");
        }
    }

    /// Install rotated tokens if nothing changed the session meanwhile.
    fn rotate_if_epoch(&self, epoch: u64, user: Option<SessionUser>, tokens: TokenPair) -> bool {
        self.install(Some(epoch), user, tokens)
    }

    /// Enter LoggedIn. With `expected`, only when the epoch still matches;
    /// `user` defaults to the current one. The check and the state change
    /// happen under one lock. Returns true when the new state is still
    /// current after the tokens were persisted.
    fn install(&self, expected: Option<u64>, user: Option<SessionUser>, tokens: TokenPair) -> bool {
        let epoch = {
            let mut inner = self.inner();
            if expected.is_some_and(|e| e != inner.epoch) {
                tracing::debug!("Session changed while refreshing; discarding rotated tokens");
                return false;
            }
            let Some(user) = user.or_else(|| inner.state.user().cloned()) else {
                return false;
            };
            inner.epoch += 1;
            inner.state = SessionState::LoggedIn {
                user,
                tokens: tokens.clone(),
            };
            inner.epoch
        };

        if let Err(e) = self.store.save(&tokens) {
            tracing::warn!(error = %e, "Could not persist tokens; session will not survive restart");
        }
        self.sync_store(epoch)
    }

    /// Enter LoggedOut and remove the durable copy. With `expected`, only
    /// when the epoch still matches.
    fn clear_session(&self, expected: Option<u64>) -> bool {
        let epoch = {
            let mut inner = self.inner();
            if expected.is_some_and(|e| e != inner.epoch) {
                return false;
            }
            inner.epoch += 1;
            if inner.state.is_logged_in() {
                tracing::info!("Logged out");
            }
            inner.state = SessionState::LoggedOut;
            inner.epoch
        };

        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Could not remove persisted tokens");
        }
        self.sync_store(epoch)
    }

    /// After a store write made under `epoch`: if another transition landed
    /// meanwhile, the durable copy is rewritten to match the current state.
    /// Returns true when `epoch` is still current.
    fn sync_store(&self, epoch: u64) -> bool {
        let current = {
            let inner = self.inner();
            if inner.epoch == epoch {
                return true;
            }
            inner.state.tokens().cloned()
        };
        tracing::debug!("Session changed while persisting; resyncing token file");
        let outcome = match current {
            Some(tokens) => self.store.save(&tokens),
            None => self.store.clear(),
        };
        if let Err(e) = outcome {
            tracing::warn!(error = %e, "Could not resync persisted tokens");
        }
        false
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.inner().state.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner().state.is_logged_in()
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.inner().state.user().cloned()
    }

    pub fn tokens(&self) -> Option<TokenPair> {
        self.inner().state.tokens().cloned()
    }

    /// The access token to use right now, or `AuthRequired`.
    pub fn access_token(&self) -> Result<String> {
        self.inner()
            .state
            .tokens()
            .filter(|t| t.has_access_token())
            .map(|t| t.access_token.clone())
            .ok_or(NeuroSuiteError::AuthRequired)
    }

    /// Guard for protected screens: the current user, or `AuthRequired`.
    pub fn require_user(&self) -> Result<SessionUser> {
        self.user().ok_or(NeuroSuiteError::AuthRequired)
    }

    // =========================================================================
    // Token lifecycle
    // =========================================================================

    /// Exchange the refresh token of `tokens` for a new pair.
    ///
    /// Does not touch session state. If the service does not rotate the
    /// refresh token, the previous one is carried over.
    pub async fn refresh(&self, tokens: &TokenPair) -> std::result::Result<TokenPair, SessionError> {
        let refresh_token = tokens
            .usable_refresh_token()
            .ok_or(SessionError::NoRefreshToken)?;

        let mut fresh = self.api.refresh(refresh_token).await.map_err(|e| {
            tracing::warn!(error = %e, "Token refresh rejected");
            SessionError::RefreshRejected {
                reason: e.to_string(),
            }
        })?;

        if !fresh.has_access_token() {
            return Err(SessionError::MissingAccessToken);
        }
        if fresh.usable_refresh_token().is_none() {
            fresh.refresh_token = Some(refresh_token.to_string());
        }
        tracing::debug!("Token refresh succeeded");
        Ok(fresh)
    }

    /// Startup initialisation gate. Runs at most once per manager; later
    /// and concurrent calls wait for the first to settle and return the
    /// resulting state.
    ///
    /// Reads the persisted pair, refreshes it, and rebuilds the user from
    /// the profile endpoint. Any failure ends in LoggedOut with no
    /// persisted tokens.
    pub async fn restore_session(&self) -> SessionState {
        self.restored.get_or_init(|| self.restore_once()).await;
        self.state()
    }

    /// True once `restore_session` has settled.
    pub fn is_restored(&self) -> bool {
        self.restored.initialized()
    }

    async fn restore_once(&self) {
        let epoch = self.inner().epoch;

        let Some(stored) = self.store.load() else {
            tracing::debug!("No stored session");
            return;
        };

        if stored.usable_refresh_token().is_none() {
            tracing::info!("Stored session has no refresh token; discarding it");
            self.logout_if_epoch(epoch);
            return;
        }

        let fresh = match self.refresh(&stored).await {
            Ok(t) => t,
            Err(e) => {
                tracing::info!(error = ?e, "Stored session could not be renewed; logging out");
                self.logout_if_epoch(epoch);
                return;
            }
        };

        match self.api.profile(&fresh.access_token).await {
            Ok(user) => {
                if self.rotate_if_epoch(epoch, Some(user), fresh) {
                    tracing::info!("Session restored");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile fetch failed during restore; logging out");
                self.logout_if_epoch(epoch);
            }
        }
    }

    /// Silent renewal after a protected call was refused with 401.
    ///
    /// `stale_access_token` is the token the refused request used; if the
    /// session has already moved past it, nothing is refreshed. On failure
    /// the session is logged out.
    pub async fn renew(&self, stale_access_token: &str) -> std::result::Result<(), SessionError> {
        let _guard = self.renewal.lock().await;

        let (epoch, current) = {
            let inner = self.inner();
            (inner.epoch, inner.state.tokens().cloned())
        };
        let Some(current) = current else {
            return Err(SessionError::NoRefreshToken);
        };
        if current.access_token != stale_access_token {
            tracing::debug!("Tokens already rotated by a concurrent renewal");
            return Ok(());
        }

        match self.refresh(&current).await {
            Ok(fresh) => {
                if self.rotate_if_epoch(epoch, None, fresh) {
                    tracing::info!("Access token renewed");
                }
                Ok(())
            }
            Err(e) => {
                self.logout_if_epoch(epoch);
                Err(e)
            }
        }
    }

    /// Re-fetch the profile with the current access token and update the
    /// in-memory user.
    pub async fn fetch_profile(&self) -> Result<SessionUser> {
        let token = self.access_token()?;
        let epoch = self.inner().epoch;
        let user = self.api.profile(&token).await?;

        let mut inner = self.inner();
        if inner.epoch == epoch {
            if let SessionState::LoggedIn { user: current, .. } = &mut inner.state {
                *current = user.clone();
            }
        }
        Ok(user)
    }

    // =========================================================================
    // Account flows
    // =========================================================================

    /// Log in with email/password and start a session.
    ///
    /// The profile is fetched to populate the user; if that call fails the
    /// user is known by email only.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<SessionUser> {
        validation::validate_credentials(credentials)?;
        let tokens = self.api.login(credentials).await?;

        let user = match self.api.profile(&tokens.access_token).await {
            Ok(user) => user,
            Err(e) => {
                tracing::debug!(error = %e, "Profile unavailable after login; using email only");
                SessionUser::from_email(credentials.email.trim())
            }
        };

        self.login(user.clone(), tokens);
        Ok(user)
    }

    /// Register an account, then log straight into it.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<SessionUser> {
        validation::validate_sign_up(request)?;
        let user = self.api.sign_up(request).await?;
        tracing::info!("Account created");

        let credentials = Credentials::new(request.email.trim(), request.password.clone());
        let tokens = self.api.login(&credentials).await?;

        self.login(user.clone(), tokens);
        Ok(user)
    }
}

// =============================================================================
// Unit tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::api::MockAuthApi;
    use crate::platform::token_store::{FileTokenStore, MockTokenStore};
    use crate::util::error::{ServerError, StorageError, ValidationError};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{OnceLock, Weak};
    use tempfile::TempDir;

    fn tokens(n: u32) -> TokenPair {
        TokenPair::new(format!("access-{n}"), Some(format!("refresh-{n}")), "bearer")
    }

    fn user() -> SessionUser {
        SessionUser {
            email: "ada@lab.org".into(),
            full_name: Some("Ada Lovelace".into()),
            organization: None,
            role: None,
            extra: serde_json::Map::new(),
        }
    }

    fn rejected() -> NeuroSuiteError {
        ServerError::new(401, "Invalid refresh token").into()
    }

    struct Fixture {
        _dir: TempDir,
        store: Arc<FileTokenStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = Arc::new(FileTokenStore::new(dir.path().join("tokens.json")));
            Self { _dir: dir, store }
        }

        fn manager(&self, api: MockAuthApi) -> SessionManager {
            SessionManager::new(Arc::new(api), self.store.clone())
        }
    }

    #[test]
    fn test_login_persists_tokens_and_round_trips_state() {
        let fx = Fixture::new();
        let session = fx.manager(MockAuthApi::new());

        session.login(user(), tokens(1));

        assert_eq!(fx.store.load(), Some(tokens(1)));
        assert_eq!(
            session.state(),
            SessionState::LoggedIn {
                user: user(),
                tokens: tokens(1)
            }
        );
        assert_eq!(session.access_token().unwrap(), "access-1");
    }

    #[test]
    fn test_logout_clears_storage_and_is_idempotent() {
        let fx = Fixture::new();
        let session = fx.manager(MockAuthApi::new());
        session.login(user(), tokens(1));

        session.logout();
        assert_eq!(session.state(), SessionState::LoggedOut);
        assert!(fx.store.load().is_none());

        session.logout();
        assert_eq!(session.state(), SessionState::LoggedOut);
    }

    #[test]
    fn test_login_survives_storage_failure() {
        let mut store = MockTokenStore::new();
        store.expect_save().times(1).returning(|_| {
            Err(StorageError::Io {
                path: "tokens.json".into(),
                operation: "write",
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        });
        let session = SessionManager::new(Arc::new(MockAuthApi::new()), Arc::new(store));

        session.login(user(), tokens(1));
        assert!(session.is_logged_in());
    }

    #[test]
    fn test_access_token_requires_login() {
        let fx = Fixture::new();
        let session = fx.manager(MockAuthApi::new());
        assert!(matches!(
            session.access_token(),
            Err(NeuroSuiteError::AuthRequired)
        ));
        assert!(matches!(
            session.require_user(),
            Err(NeuroSuiteError::AuthRequired)
        ));
    }

    #[test]
    fn test_blank_access_token_is_never_handed_out() {
        let fx = Fixture::new();
        let session = fx.manager(MockAuthApi::new());
        session.login(user(), TokenPair::new("", Some("r".into()), "bearer"));
        assert!(matches!(
            session.access_token(),
            Err(NeuroSuiteError::AuthRequired)
        ));
    }

    #[tokio::test]
    async fn test_restore_without_stored_tokens_makes_no_calls() {
        let fx = Fixture::new();
        let session = fx.manager(MockAuthApi::new());
        assert_eq!(session.restore_session().await, SessionState::LoggedOut);
        assert!(session.is_restored());
    }

    #[tokio::test]
    async fn test_restore_with_corrupt_token_file_removes_it() {
        let fx = Fixture::new();
        std::fs::write(fx.store.path(), b"{\"version\":1,\"tokens\":").unwrap();
        let session = fx.manager(MockAuthApi::new());

        assert_eq!(session.restore_session().await, SessionState::LoggedOut);
        assert!(!fx.store.path().exists());
    }

    #[tokio::test]
    async fn test_restore_with_rejected_refresh_logs_out_once() {
        let fx = Fixture::new();
        fx.store.save(&tokens(1)).unwrap();

        let mut api = MockAuthApi::new();
        api.expect_refresh()
            .withf(|token: &str| token == "refresh-1")
            .times(1)
            .returning(|_| Err(rejected()));
        let session = fx.manager(api);

        assert_eq!(session.restore_session().await, SessionState::LoggedOut);
        assert!(fx.store.load().is_none());

        // Second call is safe, makes no new request, same outcome.
        assert_eq!(session.restore_session().await, SessionState::LoggedOut);
        assert!(fx.store.load().is_none());
    }

    #[tokio::test]
    async fn test_restore_success_rotates_tokens_and_loads_profile() {
        let fx = Fixture::new();
        fx.store.save(&tokens(1)).unwrap();

        let mut api = MockAuthApi::new();
        api.expect_refresh()
            .times(1)
            .returning(|_| Ok(tokens(2)));
        api.expect_profile()
            .withf(|token: &str| token == "access-2")
            .times(1)
            .returning(|_| Ok(user()));
        let session = fx.manager(api);

        let state = session.restore_session().await;
        assert_eq!(state.user(), Some(&user()));
        assert_eq!(state.tokens(), Some(&tokens(2)));
        assert_eq!(fx.store.load(), Some(tokens(2)));
    }

    #[tokio::test]
    async fn test_restore_without_refresh_token_discards_session() {
        let fx = Fixture::new();
        fx.store
            .save(&TokenPair::new("access-1", None, "bearer"))
            .unwrap();
        let session = fx.manager(MockAuthApi::new());

        assert_eq!(session.restore_session().await, SessionState::LoggedOut);
        assert!(fx.store.load().is_none());
    }

    #[tokio::test]
    async fn test_restore_with_failed_profile_logs_out() {
        let fx = Fixture::new();
        fx.store.save(&tokens(1)).unwrap();

        let mut api = MockAuthApi::new();
        api.expect_refresh().returning(|_| Ok(tokens(2)));
        api.expect_profile()
            .returning(|_| Err(ServerError::new(500, "Internal error").into()));
        let session = fx.manager(api);

        assert_eq!(session.restore_session().await, SessionState::LoggedOut);
        assert!(fx.store.load().is_none());
    }

    #[tokio::test]
    async fn test_refresh_keeps_refresh_token_when_not_rotated() {
        let fx = Fixture::new();
        let mut api = MockAuthApi::new();
        api.expect_refresh()
            .returning(|_| Ok(TokenPair::new("access-2", None, "bearer")));
        let session = fx.manager(api);

        let fresh = session.refresh(&tokens(1)).await.unwrap();
        assert_eq!(fresh.access_token, "access-2");
        assert_eq!(fresh.usable_refresh_token(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_fails_without_call() {
        let fx = Fixture::new();
        let session = fx.manager(MockAuthApi::new());
        let err = session
            .refresh(&TokenPair::new("a", None, "bearer"))
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::NoRefreshToken);
    }

    #[tokio::test]
    async fn test_renew_rotates_tokens_in_memory_and_storage() {
        let fx = Fixture::new();
        let mut api = MockAuthApi::new();
        api.expect_refresh().times(1).returning(|_| Ok(tokens(2)));
        let session = fx.manager(api);
        session.login(user(), tokens(1));

        session.renew("access-1").await.unwrap();
        assert_eq!(session.tokens(), Some(tokens(2)));
        assert_eq!(session.user(), Some(user()));
        assert_eq!(fx.store.load(), Some(tokens(2)));

        // A second caller holding the old token does not refresh again.
        session.renew("access-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_renew_failure_logs_out() {
        let fx = Fixture::new();
        let mut api = MockAuthApi::new();
        api.expect_refresh().times(1).returning(|_| Err(rejected()));
        let session = fx.manager(api);
        session.login(user(), tokens(1));

        let err = session.renew("access-1").await.unwrap_err();
        assert!(matches!(err, SessionError::RefreshRejected { .. }));
        assert_eq!(session.state(), SessionState::LoggedOut);
        assert!(fx.store.load().is_none());
    }

    #[tokio::test]
    async fn test_sign_in_falls_back_to_email_user() {
        let fx = Fixture::new();
        let mut api = MockAuthApi::new();
        api.expect_login()
            .withf(|c: &Credentials| c.email == "ada@lab.org" && c.password == "pw")
            .times(1)
            .returning(|_| Ok(tokens(1)));
        api.expect_profile()
            .returning(|_| Err(ServerError::new(500, "down").into()));
        let session = fx.manager(api);

        let user = session
            .sign_in(&Credentials::new("ada@lab.org", "pw"))
            .await
            .unwrap();
        assert_eq!(user, SessionUser::from_email("ada@lab.org"));
        assert_eq!(session.tokens(), Some(tokens(1)));
    }

    #[tokio::test]
    async fn test_sign_in_failure_leaves_session_logged_out() {
        let fx = Fixture::new();
        let mut api = MockAuthApi::new();
        api.expect_login()
            .returning(|_| Err(ServerError::new(401, "Incorrect email or password").into()));
        let session = fx.manager(api);

        let err = session
            .sign_in(&Credentials::new("ada@lab.org", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Incorrect email or password");
        assert!(!session.is_logged_in());
        assert!(fx.store.load().is_none());
    }

    #[tokio::test]
    async fn test_sign_up_logs_in_with_returned_user() {
        let fx = Fixture::new();
        let mut api = MockAuthApi::new();
        api.expect_sign_up().times(1).returning(|_| Ok(user()));
        api.expect_login().times(1).returning(|_| Ok(tokens(1)));
        let session = fx.manager(api);

        let request = SignUpRequest {
            email: "ada@lab.org".into(),
            full_name: "Ada Lovelace".into(),
            password: "Analytic1!".into(),
            confirm_password: "Analytic1!".into(),
            organization: Some("Lab".into()),
            role: None,
            agreed_to_terms: true,
        };
        assert_eq!(session.sign_up(&request).await.unwrap(), user());
        assert_eq!(session.user(), Some(user()));
        assert_eq!(fx.store.load(), Some(tokens(1)));
    }

    #[tokio::test]
    async fn test_sign_up_validation_happens_before_any_request() {
        let fx = Fixture::new();
        // No expectations: any API call would panic.
        let session = fx.manager(MockAuthApi::new());

        let request = SignUpRequest {
            email: "ada@lab.org".into(),
            full_name: "Ada Lovelace".into(),
            password: "weak".into(),
            confirm_password: "weak".into(),
            organization: None,
            role: None,
            agreed_to_terms: true,
        };
        let err = session.sign_up(&request).await.unwrap_err();
        assert!(matches!(
            err,
            NeuroSuiteError::Validation(ValidationError::Form { field: "password", .. })
        ));
    }

    #[tokio::test]
    async fn test_restore_after_interactive_login_refreshes_current_pair() {
        let fx = Fixture::new();
        fx.store.save(&tokens(1)).unwrap();

        let mut api = MockAuthApi::new();
        api.expect_refresh()
            .withf(|token: &str| token == "refresh-9")
            .times(1)
            .returning(|_| Ok(tokens(2)));
        api.expect_profile().returning(|_| Ok(user()));
        let session = fx.manager(api);

        session.login(SessionUser::from_email("ada@lab.org"), tokens(9));
        let state = session.restore_session().await;
        assert_eq!(state.tokens(), Some(&tokens(2)));
        assert_eq!(fx.store.load(), Some(tokens(2)));
    }

    /// File store that runs a session transition from inside its next
    /// `save` or `clear`, standing in for another task landing mid-write.
    struct InterleavingStore {
        file: FileTokenStore,
        session: OnceLock<Weak<SessionManager>>,
        logout_on_save: AtomicBool,
        login_on_clear: AtomicBool,
    }

    impl InterleavingStore {
        fn new(dir: &TempDir) -> Arc<Self> {
            Arc::new(Self {
                file: FileTokenStore::new(dir.path().join("tokens.json")),
                session: OnceLock::new(),
                logout_on_save: AtomicBool::new(false),
                login_on_clear: AtomicBool::new(false),
            })
        }

        fn session(&self) -> Option<Arc<SessionManager>> {
            self.session.get().and_then(Weak::upgrade)
        }
    }

    impl TokenStore for InterleavingStore {
        fn load(&self) -> Option<TokenPair> {
            self.file.load()
        }

        fn save(&self, tokens: &TokenPair) -> std::result::Result<(), StorageError> {
            if self.logout_on_save.swap(false, Ordering::SeqCst) {
                if let Some(session) = self.session() {
                    session.logout();
                }
            }
            self.file.save(tokens)
        }

        fn clear(&self) -> std::result::Result<(), StorageError> {
            if self.login_on_clear.swap(false, Ordering::SeqCst) {
                if let Some(session) = self.session() {
                    session.login(user(), tokens(7));
                }
            }
            self.file.clear()
        }
    }

    fn interleaved(api: MockAuthApi, store: &Arc<InterleavingStore>) -> Arc<SessionManager> {
        let session = Arc::new(SessionManager::new(Arc::new(api), store.clone()));
        store.session.set(Arc::downgrade(&session)).unwrap();
        session
    }

    #[tokio::test]
    async fn test_logout_during_renewal_write_stays_logged_out() {
        let dir = TempDir::new().unwrap();
        let store = InterleavingStore::new(&dir);
        let mut api = MockAuthApi::new();
        api.expect_refresh().times(1).returning(|_| Ok(tokens(2)));
        let session = interleaved(api, &store);
        session.login(user(), tokens(1));

        store.logout_on_save.store(true, Ordering::SeqCst);
        session.renew("access-1").await.unwrap();

        assert!(!session.is_logged_in());
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn test_logout_during_restore_write_stays_logged_out() {
        let dir = TempDir::new().unwrap();
        let store = InterleavingStore::new(&dir);
        store.file.save(&tokens(1)).unwrap();
        let mut api = MockAuthApi::new();
        api.expect_refresh().returning(|_| Ok(tokens(2)));
        api.expect_profile().returning(|_| Ok(user()));
        let session = interleaved(api, &store);

        store.logout_on_save.store(true, Ordering::SeqCst);
        assert_eq!(session.restore_session().await, SessionState::LoggedOut);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_login_during_logout_clear_keeps_new_session() {
        let dir = TempDir::new().unwrap();
        let store = InterleavingStore::new(&dir);
        let session = interleaved(MockAuthApi::new(), &store);
        session.login(user(), tokens(1));

        store.login_on_clear.store(true, Ordering::SeqCst);
        session.logout();

        assert_eq!(session.tokens(), Some(tokens(7)));
        assert_eq!(store.load(), Some(tokens(7)));
    }
}
