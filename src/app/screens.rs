// NeuroSuite - app/screens.rs
//
// Binds each analysis screen to the upload workflow: which files it
// accepts, and which classify function it runs.
//
// Every protected call reads the access token from the session manager at
// call time. A 401 triggers one silent renewal and one retry; a failed
// renewal surfaces as a session error and the session is already logged
// out by then.

use crate::app::session::SessionManager;
use crate::app::workflow::{SubmitOutcome, UploadWorkflow};
use crate::core::api::AnalysisApi;
use crate::core::model::{
    AnalysisKind, ClassificationResult, EegFileInfo, EegResult, EmotionResult, SleepResult,
    SleepStageInfo, UploadFile, UploadPayload,
};
use crate::platform::config::AppConfig;
use crate::platform::fs;
use crate::util::constants;
use crate::util::error::{NeuroSuiteError, Result, ServerError, ValidationError};
use std::future::Future;
use std::sync::Arc;

// =============================================================================
// Screen configuration
// =============================================================================

/// Upload rules for one screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSpec {
    pub kind: AnalysisKind,
    pub allowed_extensions: &'static [&'static str],
    /// Size cap in bytes; `None` means unlimited.
    pub max_size_bytes: Option<u64>,
}

impl ScreenSpec {
    pub fn for_kind(kind: AnalysisKind, config: &AppConfig) -> Self {
        match kind {
            AnalysisKind::EegDecoder => Self {
                kind,
                allowed_extensions: constants::EEG_DECODER_EXTENSIONS,
                max_size_bytes: None,
            },
            AnalysisKind::SleepStage => Self {
                kind,
                allowed_extensions: constants::SLEEP_STAGE_EXTENSIONS,
                max_size_bytes: Some(config.sleep_max_size_bytes),
            },
            AnalysisKind::Emotion => Self {
                kind,
                allowed_extensions: constants::EMOTION_EXTENSIONS,
                max_size_bytes: None,
            },
        }
    }
}

// =============================================================================
// Classify functions
// =============================================================================

/// The remote analysis calls, authorised through the session manager.
pub struct Analyzer {
    session: Arc<SessionManager>,
    api: Arc<dyn AnalysisApi>,
}

impl Analyzer {
    pub fn new(session: Arc<SessionManager>, api: Arc<dyn AnalysisApi>) -> Self {
        Self { session, api }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Run `call` with the current access token, renewing once on 401.
    async fn authorized<T, F, Fut>(&self, call: F) -> Result<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let token = self.session.access_token()?;
        match call(token.clone()).await {
            Err(NeuroSuiteError::Server(e)) if e.is_unauthorized() => {
                tracing::info!("Access token refused; renewing and retrying once");
                self.session.renew(&token).await?;
                call(self.session.access_token()?).await
            }
            other => other,
        }
    }

    /// Token check first, so a logged-out user gets `AuthRequired` before
    /// the file is even read.
    async fn prepare(&self, file: &UploadFile) -> Result<UploadPayload> {
        self.session.access_token()?;
        Ok(fs::load_payload(file).await?)
    }

    pub async fn decode_eeg(&self, file: &UploadFile) -> Result<EegResult> {
        let payload = self.prepare(file).await?;
        let payload = &payload;
        let api = &self.api;
        self.authorized(move |token| async move { api.decode_eeg(&token, payload).await })
            .await
    }

    pub async fn classify_sleep(&self, file: &UploadFile, channel_idx: u32) -> Result<SleepResult> {
        let payload = self.prepare(file).await?;
        let payload = &payload;
        let api = &self.api;
        self.authorized(move |token| async move {
            api.classify_sleep(&token, payload, channel_idx).await
        })
        .await
    }

    /// Channel list and recording details of an EDF file.
    pub async fn sleep_file_info(&self, file: &UploadFile) -> Result<EegFileInfo> {
        let payload = self.prepare(file).await?;
        let payload = &payload;
        let api = &self.api;
        self.authorized(move |token| async move { api.eeg_file_info(&token, payload).await })
            .await
    }

    pub async fn sleep_stages(&self) -> Result<Vec<SleepStageInfo>> {
        self.api.sleep_stages().await
    }

    /// Metadata check, then classification. The metadata is attached to
    /// the result.
    pub async fn classify_emotion(&self, file: &UploadFile) -> Result<EmotionResult> {
        let payload = self.prepare(file).await?;

        let metadata = self.api.emotion_file_info(&payload).await?;
        if !metadata.is_usable() {
            tracing::warn!(file = %file.name, "No usable signal metadata in upload");
            return Err(ValidationError::InvalidRecording {
                file_name: file.name.clone(),
            }
            .into());
        }
        tracing::debug!(
            channels = metadata.channels.len(),
            sampling_rate = ?metadata.sampling_rate,
            "Emotion file metadata"
        );

        let payload = &payload;
        let api = &self.api;
        let prediction = self
            .authorized(move |token| async move { api.classify_emotion(&token, payload).await })
            .await?;

        prediction
            .into_result(Some(metadata))
            .ok_or_else(|| ServerError::invalid_response(200).into())
    }

    pub async fn emotion_info(&self) -> Result<serde_json::Value> {
        self.api.emotion_info().await
    }

    /// Dispatch to the classify function of `kind`.
    pub async fn classify(
        &self,
        kind: AnalysisKind,
        file: &UploadFile,
        channel_idx: u32,
    ) -> Result<ClassificationResult> {
        match kind {
            AnalysisKind::EegDecoder => self.decode_eeg(file).await.map(ClassificationResult::Eeg),
            AnalysisKind::SleepStage => self
                .classify_sleep(file, channel_idx)
                .await
                .map(ClassificationResult::Sleep),
            AnalysisKind::Emotion => self
                .classify_emotion(file)
                .await
                .map(ClassificationResult::Emotion),
        }
    }
}

// =============================================================================
// Screen
// =============================================================================

/// One analysis screen: its rules, its task, and its classify function.
pub struct Screen {
    spec: ScreenSpec,
    workflow: UploadWorkflow,
    analyzer: Arc<Analyzer>,
    channel_idx: u32,
}

impl Screen {
    pub fn new(spec: ScreenSpec, analyzer: Arc<Analyzer>) -> Self {
        Self {
            spec,
            workflow: UploadWorkflow::new(),
            analyzer,
            channel_idx: constants::DEFAULT_SLEEP_CHANNEL,
        }
    }

    /// EEG channel used by the sleep-stage classifier.
    pub fn with_channel(mut self, channel_idx: u32) -> Self {
        self.channel_idx = channel_idx;
        self
    }

    pub fn spec(&self) -> &ScreenSpec {
        &self.spec
    }

    pub fn workflow(&self) -> &UploadWorkflow {
        &self.workflow
    }

    pub fn select_file(
        &self,
        candidate: Option<UploadFile>,
    ) -> std::result::Result<UploadFile, ValidationError> {
        self.workflow.select_file(
            candidate,
            self.spec.allowed_extensions,
            self.spec.max_size_bytes,
        )
    }

    pub async fn submit(&self) -> Result<SubmitOutcome> {
        let analyzer = &self.analyzer;
        let kind = self.spec.kind;
        let channel_idx = self.channel_idx;
        self.workflow
            .submit(move |file| async move { analyzer.classify(kind, &file, channel_idx).await })
            .await
    }
}

// =============================================================================
// Unit tests
// =============================================================================
