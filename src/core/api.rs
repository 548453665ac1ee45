// NeuroSuite - core/api.rs
//
// Seams to the remote analysis service. The session manager and the
// screens depend only on these traits; `platform::http::HttpApi` is the
// production implementation and unit tests use the mockall mocks.

use crate::core::model::{
    Credentials, EegFileInfo, EegResult, EmotionFileInfo, SessionUser, SignUpRequest,
    SleepResult, SleepStageInfo, TokenPair, UploadPayload,
};
use crate::core::wire::EmotionPrediction;
use crate::util::error::Result;
use async_trait::async_trait;

/// Account and token endpoints.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /login`. Fails when the response has no access token.
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair>;

    /// `POST /signup`. Fails when the response has no email.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SessionUser>;

    /// `POST /refresh-token` with the refresh token as bearer.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair>;

    /// `GET /users/me` with the access token as bearer.
    async fn profile(&self, access_token: &str) -> Result<SessionUser>;
}

/// Analysis endpoints. Protected calls take the access token explicitly so
/// the caller decides, at call time, which token is current.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// EEG "mind decoder".
    async fn decode_eeg(&self, access_token: &str, file: &UploadPayload) -> Result<EegResult>;

    /// `POST /eeg/classify-file` (multipart file + channel index).
    async fn classify_sleep(
        &self,
        access_token: &str,
        file: &UploadPayload,
        channel_idx: u32,
    ) -> Result<SleepResult>;

    /// `POST /eeg/file-info`.
    async fn eeg_file_info(&self, access_token: &str, file: &UploadPayload)
        -> Result<EegFileInfo>;

    /// `GET /eeg/sleep-stages` (public).
    async fn sleep_stages(&self) -> Result<Vec<SleepStageInfo>>;

    /// `POST /emotion/classify`.
    async fn classify_emotion(
        &self,
        access_token: &str,
        file: &UploadPayload,
    ) -> Result<EmotionPrediction>;

    /// `POST /emotion/file-info` (public).
    async fn emotion_file_info(&self, file: &UploadPayload) -> Result<EmotionFileInfo>;

    /// `GET /emotion/info` (public). Free-form description of the model.
    async fn emotion_info(&self) -> Result<serde_json::Value>;
}
