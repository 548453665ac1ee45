// NeuroSuite - tests/e2e_session.rs
//
// End-to-end tests for the session lifecycle and the analysis screens.
//
// These tests exercise the real token file on disk, the real session
// manager, the real upload workflow, and the real screen bindings against
// an in-memory fake of the remote service that issues, rotates and revokes
// tokens the way the service does. No network.

use async_trait::async_trait;
use neurosuite::app::screens::{Analyzer, Screen, ScreenSpec};
use neurosuite::app::session::{SessionManager, SessionState};
use neurosuite::app::workflow::{SubmitOutcome, UploadStatus};
use neurosuite::core::api::{AnalysisApi, AuthApi};
use neurosuite::core::model::{
    AnalysisKind, ClassificationResult, Credentials, EegFileInfo, EegResult, EmotionFileInfo,
    SessionUser, SignUpRequest, SleepResult, SleepStageInfo, TokenPair, UploadFile, UploadPayload,
};
use neurosuite::core::wire::EmotionPrediction;
use neurosuite::platform::config::AppConfig;
use neurosuite::platform::fs::candidate_from_path;
use neurosuite::platform::token_store::{FileTokenStore, TokenStore};
use neurosuite::util::error::{NeuroSuiteError, Result, ServerError, ValidationError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// =============================================================================
// Fake service
// =============================================================================

#[derive(Default)]
struct FakeState {
    accounts: HashMap<String, (String, SessionUser)>,
    access: HashMap<String, String>,
    refresh: HashMap<String, String>,
    issued: u32,
    requests: u32,
    analyses: u32,
}

impl FakeState {
    fn issue(&mut self, email: &str) -> TokenPair {
        self.issued += 1;
        let access = format!("access-{}", self.issued);
        let refresh = format!("refresh-{}", self.issued);
        self.access.insert(access.clone(), email.to_string());
        self.refresh.insert(refresh.clone(), email.to_string());
        TokenPair::new(access, Some(refresh), "bearer")
    }

    fn authorize(&mut self, token: &str) -> Result<String> {
        self.requests += 1;
        self.access
            .get(token)
            .cloned()
            .ok_or_else(|| ServerError::new(401, "Could not validate credentials").into())
    }
}

#[derive(Default)]
struct FakeService {
    state: Mutex<FakeState>,
}

impl FakeService {
    fn with_account(email: &str, password: &str) -> Arc<Self> {
        let service = Self::default();
        service.state.lock().unwrap().accounts.insert(
            email.to_string(),
            (
                password.to_string(),
                SessionUser {
                    full_name: Some("Ada Lovelace".into()),
                    ..SessionUser::from_email(email)
                },
            ),
        );
        Arc::new(service)
    }

    /// Access tokens expire; refresh tokens stay valid.
    fn expire_access_tokens(&self) {
        self.state.lock().unwrap().access.clear();
    }

    fn revoke_all(&self) {
        let mut state = self.state.lock().unwrap();
        state.access.clear();
        state.refresh.clear();
    }

    fn requests(&self) -> u32 {
        self.state.lock().unwrap().requests
    }

    fn analyses(&self) -> u32 {
        self.state.lock().unwrap().analyses
    }
}

#[async_trait]
impl AuthApi for FakeService {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair> {
        let mut state = self.state.lock().unwrap();
        state.requests += 1;
        let known = matches!(
            state.accounts.get(&credentials.email),
            Some((password, _)) if *password == credentials.password
        );
        if !known {
            return Err(ServerError::new(401, "Incorrect email or password").into());
        }
        Ok(state.issue(&credentials.email))
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SessionUser> {
        let mut state = self.state.lock().unwrap();
        state.requests += 1;
        if state.accounts.contains_key(&request.email) {
            return Err(ServerError::new(400, "Email already registered").into());
        }
        let user = SessionUser {
            full_name: Some(request.full_name.clone()),
            organization: request.organization.clone(),
            ..SessionUser::from_email(request.email.clone())
        };
        state.accounts.insert(
            request.email.clone(),
            (request.password.clone(), user.clone()),
        );
        Ok(user)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let mut state = self.state.lock().unwrap();
        state.requests += 1;
        match state.refresh.remove(refresh_token) {
            Some(email) => Ok(state.issue(&email)),
            None => Err(ServerError::new(401, "Invalid refresh token").into()),
        }
    }

    async fn profile(&self, access_token: &str) -> Result<SessionUser> {
        let mut state = self.state.lock().unwrap();
        let email = state.authorize(access_token)?;
        state
            .accounts
            .get(&email)
            .map(|(_, user)| user.clone())
            .ok_or_else(|| ServerError::new(404, "User not found").into())
    }
}

#[async_trait]
impl AnalysisApi for FakeService {
    async fn decode_eeg(&self, access_token: &str, file: &UploadPayload) -> Result<EegResult> {
        let mut state = self.state.lock().unwrap();
        state.authorize(access_token)?;
        state.analyses += 1;
        Ok(EegResult {
            image_url: format!("https://cdn.example/{}.png", file.file_name),
            insights: "Alpha rhythm dominant".into(),
        })
    }

    async fn classify_sleep(
        &self,
        access_token: &str,
        _file: &UploadPayload,
        channel_idx: u32,
    ) -> Result<SleepResult> {
        let mut state = self.state.lock().unwrap();
        state.authorize(access_token)?;
        state.analyses += 1;
        Ok(SleepResult {
            stage: channel_idx,
            stage_name: "N2".into(),
            probabilities: vec![0.1, 0.2, 0.7],
        })
    }

    async fn eeg_file_info(
        &self,
        access_token: &str,
        _file: &UploadPayload,
    ) -> Result<EegFileInfo> {
        self.state.lock().unwrap().authorize(access_token)?;
        Ok(EegFileInfo {
            channels: vec!["Fpz-Cz".into(), "Pz-Oz".into()],
            sampling_frequency: 100.0,
            duration_seconds: 3600.0,
            num_samples: 360_000,
        })
    }

    async fn sleep_stages(&self) -> Result<Vec<SleepStageInfo>> {
        self.state.lock().unwrap().requests += 1;
        Ok(vec![SleepStageInfo {
            id: 2,
            name: "N2".into(),
            description: "Light sleep".into(),
        }])
    }

    async fn classify_emotion(
        &self,
        access_token: &str,
        _file: &UploadPayload,
    ) -> Result<EmotionPrediction> {
        let mut state = self.state.lock().unwrap();
        state.authorize(access_token)?;
        state.analyses += 1;
        Ok(EmotionPrediction {
            emotion: Some("Calm".into()),
            confidence: 0.9,
            description: "Relaxed".into(),
        })
    }

    async fn emotion_file_info(&self, _file: &UploadPayload) -> Result<EmotionFileInfo> {
        self.state.lock().unwrap().requests += 1;
        Ok(EmotionFileInfo {
            channels: vec!["AF3".into()],
            sampling_rate: Some(128.0),
            duration: Some(60.0),
        })
    }

    async fn emotion_info(&self) -> Result<serde_json::Value> {
        self.state.lock().unwrap().requests += 1;
        Ok(serde_json::json!({ "emotions": ["Calm", "Excited"] }))
    }
}

// =============================================================================
// Helpers
// =============================================================================

const EMAIL: &str = "ada@lab.org";
const PASSWORD: &str = "Analytic1!";

struct Harness {
    dir: TempDir,
    service: Arc<FakeService>,
}

impl Harness {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            service: FakeService::with_account(EMAIL, PASSWORD),
        }
    }

    fn store(&self) -> FileTokenStore {
        FileTokenStore::new(self.dir.path().join("data").join("tokens.json"))
    }

    /// A fresh manager over the same token file, as a new process would see it.
    fn session(&self) -> Arc<SessionManager> {
        Arc::new(SessionManager::new(
            self.service.clone(),
            Arc::new(self.store()),
        ))
    }

    fn screen(&self, session: &Arc<SessionManager>, kind: AnalysisKind) -> Screen {
        let analyzer = Arc::new(Analyzer::new(session.clone(), self.service.clone()));
        Screen::new(ScreenSpec::for_kind(kind, &AppConfig::default()), analyzer)
    }
}

// =============================================================================
// Session lifecycle
// =============================================================================

#[tokio::test]
async fn e2e_login_survives_restart_with_rotated_tokens() {
    let h = Harness::new();

    let first = h.session();
    first
        .sign_in(&Credentials::new(EMAIL, PASSWORD))
        .await
        .unwrap();
    let original = first.tokens().unwrap();
    assert_eq!(h.store().load(), Some(original.clone()));

    let second = h.session();
    let state = second.restore_session().await;

    let user = state.user().expect("restored session has a user");
    assert_eq!(user.email, EMAIL);
    assert_eq!(user.full_name.as_deref(), Some("Ada Lovelace"));

    let rotated = state.tokens().unwrap();
    assert_ne!(rotated, &original);
    assert_eq!(h.store().load().as_ref(), Some(rotated));
}

#[tokio::test]
async fn e2e_restore_with_revoked_refresh_token_logs_out() {
    let h = Harness::new();
    h.session()
        .sign_in(&Credentials::new(EMAIL, PASSWORD))
        .await
        .unwrap();
    h.service.revoke_all();

    let session = h.session();
    assert_eq!(session.restore_session().await, SessionState::LoggedOut);
    assert!(h.store().load().is_none());

    let requests = h.service.requests();
    assert_eq!(session.restore_session().await, SessionState::LoggedOut);
    assert_eq!(h.service.requests(), requests, "restore ran twice");
}

#[tokio::test]
async fn e2e_wrong_password_keeps_user_logged_out() {
    let h = Harness::new();
    let session = h.session();

    let err = session
        .sign_in(&Credentials::new(EMAIL, "Wrong1!pass"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Incorrect email or password");
    assert!(!session.is_logged_in());
    assert!(h.store().load().is_none());
}

#[tokio::test]
async fn e2e_sign_up_then_restart() {
    let h = Harness::new();
    let request = SignUpRequest {
        email: "grace@navy.mil".into(),
        full_name: "Grace Hopper".into(),
        password: "Cobol1959!".into(),
        confirm_password: "Cobol1959!".into(),
        organization: Some("Navy".into()),
        role: None,
        agreed_to_terms: true,
    };
    let user = h.session().sign_up(&request).await.unwrap();
    assert_eq!(user.display_name(), "Grace Hopper");

    let restored = h.session().restore_session().await;
    assert_eq!(restored.user().map(|u| u.email.as_str()), Some("grace@navy.mil"));
}

#[tokio::test]
async fn e2e_logout_clears_the_token_file() {
    let h = Harness::new();
    let session = h.session();
    session
        .sign_in(&Credentials::new(EMAIL, PASSWORD))
        .await
        .unwrap();

    session.logout();
    assert!(h.store().load().is_none());
    assert_eq!(h.session().restore_session().await, SessionState::LoggedOut);
}

// =============================================================================
// Screens
// =============================================================================

#[tokio::test]
async fn e2e_decode_file_from_disk() {
    let h = Harness::new();
    let session = h.session();
    session
        .sign_in(&Credentials::new(EMAIL, PASSWORD))
        .await
        .unwrap();

    let path = h.dir.path().join("brain.csv");
    std::fs::write(&path, vec![b'7'; 200 * 1024]).unwrap();

    let screen = h.screen(&session, AnalysisKind::EegDecoder);
    screen
        .select_file(Some(candidate_from_path(&path).unwrap()))
        .unwrap();
    assert_eq!(screen.workflow().status(), UploadStatus::Selected);

    match screen.submit().await.unwrap() {
        SubmitOutcome::Done(ClassificationResult::Eeg(result)) => {
            assert_eq!(result.image_url, "https://cdn.example/brain.csv.png");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(screen.workflow().status(), UploadStatus::Done);
}

#[tokio::test]
async fn e2e_expired_access_token_is_renewed_transparently() {
    let h = Harness::new();
    let session = h.session();
    session
        .sign_in(&Credentials::new(EMAIL, PASSWORD))
        .await
        .unwrap();
    let before = session.tokens().unwrap();
    h.service.expire_access_tokens();

    let screen = h.screen(&session, AnalysisKind::SleepStage).with_channel(1);
    screen
        .select_file(Some(UploadFile::from_bytes(
            "night.edf",
            &b"0       EDF"[..],
        )))
        .unwrap();
    let outcome = screen.submit().await.unwrap();

    assert!(matches!(
        outcome,
        SubmitOutcome::Done(ClassificationResult::Sleep(SleepResult { stage: 1, .. }))
    ));
    assert_eq!(h.service.analyses(), 1);
    assert_ne!(session.tokens().unwrap(), before);
    assert_eq!(h.store().load(), session.tokens());
}

#[tokio::test]
async fn e2e_revoked_session_during_analysis_redirects_to_login() {
    let h = Harness::new();
    let session = h.session();
    session
        .sign_in(&Credentials::new(EMAIL, PASSWORD))
        .await
        .unwrap();
    h.service.revoke_all();

    let screen = h.screen(&session, AnalysisKind::EegDecoder);
    screen
        .select_file(Some(UploadFile::from_bytes(
            "brain.txt",
            &b"1,2,3"[..],
        )))
        .unwrap();
    let err = screen.submit().await.unwrap_err();

    assert!(matches!(err, NeuroSuiteError::Session(_)));
    assert!(screen.workflow().task().auth_failure);
    assert!(!session.is_logged_in());
    assert!(h.store().load().is_none());
}

#[tokio::test]
async fn e2e_emotion_without_login_makes_no_requests() {
    let h = Harness::new();
    let session = h.session();
    session.restore_session().await;

    let screen = h.screen(&session, AnalysisKind::Emotion);
    screen
        .select_file(Some(UploadFile::from_bytes(
            "calm.edf",
            &b"0       EDF"[..],
        )))
        .unwrap();
    let err = screen.submit().await.unwrap_err();

    assert!(matches!(err, NeuroSuiteError::AuthRequired));
    assert_eq!(h.service.requests(), 0);
}

#[tokio::test]
async fn e2e_sleep_screen_rejects_pdf_without_requests() {
    let h = Harness::new();
    let session = h.session();
    let screen = h.screen(&session, AnalysisKind::SleepStage);

    let err = screen
        .select_file(Some(UploadFile::from_bytes(
            "study.pdf",
            &b"%PDF-1.7"[..],
        )))
        .unwrap_err();

    assert!(matches!(err, ValidationError::UnsupportedFormat { .. }));
    assert_eq!(err.to_string(), "Invalid file format. Please upload a .edf file.");
    assert_eq!(screen.workflow().status(), UploadStatus::Idle);
    assert_eq!(h.service.requests(), 0);
}

#[tokio::test]
async fn e2e_emotion_result_includes_metadata() {
    let h = Harness::new();
    let session = h.session();
    session
        .sign_in(&Credentials::new(EMAIL, PASSWORD))
        .await
        .unwrap();

    let screen = h.screen(&session, AnalysisKind::Emotion);
    screen
        .select_file(Some(UploadFile::from_bytes(
            "calm.EDF",
            &b"0       EDF"[..],
        )))
        .unwrap();

    match screen.submit().await.unwrap() {
        SubmitOutcome::Done(ClassificationResult::Emotion(result)) => {
            assert_eq!(result.emotion, "Calm");
            assert_eq!(result.metadata.unwrap().sampling_rate, Some(128.0));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}
