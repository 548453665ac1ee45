// NeuroSuite - platform/http.rs
//
// reqwest-backed implementation of the remote API traits.
//
// Error mapping:
//   - transport failure (no response)     → NetworkError
//   - non-2xx                              → ServerError(status, joined detail | fallback)
//   - 2xx with a body missing fields       → ServerError("Invalid response from server")
//
// Tokens are attached as bearer credentials and never logged.

use crate::core::api::{AnalysisApi, AuthApi};
use crate::core::model::{
    Credentials, EegFileInfo, EegResult, EmotionFileInfo, SessionUser, SignUpRequest,
    SleepResult, SleepStageInfo, TokenPair, UploadPayload,
};
use crate::core::wire::{detail_message, EmotionPrediction, TokenResponse};
use crate::platform::config::{AppConfig, Endpoints};
use crate::util::constants;
use crate::util::error::{NetworkError, Result, ServerError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

/// Fallback messages used when an error body carries no `detail`.
mod fallback {
    pub const LOGIN: &str = "Login failed. Please check your credentials.";
    pub const SIGNUP: &str = "Registration failed. Please try again.";
    pub const REFRESH: &str = "Session expired. Please login again.";
    pub const PROFILE: &str = "Failed to fetch user profile.";
    pub const EEG_DECODE: &str = "Something went wrong while decoding. Please try again later.";
    pub const EEG_CLASSIFY: &str = "Failed to classify EEG file";
    pub const EEG_FILE_INFO: &str = "Failed to get file information";
    pub const SLEEP_STAGES: &str = "Failed to fetch sleep stages info";
    pub const EMOTION_CLASSIFY: &str = "Failed to classify emotion";
    pub const EMOTION_FILE_INFO: &str = "Failed to read file metadata";
    pub const EMOTION_INFO: &str = "Failed to fetch emotion information";
}

/// HTTP client for the NeuroSuite service.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
    endpoints: Endpoints,
}

impl HttpApi {
    /// Build a client against `base_url` with the given endpoint paths.
    pub fn new(base_url: Url, endpoints: Endpoints) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("{}/{}", constants::APP_ID, constants::APP_VERSION))
            .build()
            .map_err(|e| NetworkError {
                url: base_url.to_string(),
                source: e,
            })?;
        Ok(Self {
            client,
            base_url,
            endpoints,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.api_base_url.clone(), config.endpoints.clone())
    }

    /// Absolute URL for an endpoint path. Any path on the base URL is kept.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Send a request and return the body of a 2xx response.
    async fn send(
        &self,
        request: RequestBuilder,
        path: &str,
        fallback: &str,
    ) -> Result<(u16, Bytes)> {
        let url = self.url(path);
        let network = |e: reqwest::Error| NetworkError {
            url: url.clone(),
            source: e,
        };

        let request = request
            .header(ACCEPT, "application/json")
            .build()
            .map_err(network)?;
        let method = request.method().clone();

        let response = self.client.execute(request).await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "Request failed before a response");
            network(e)
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(network)?;
        tracing::debug!(
            %method,
            path,
            status = status.as_u16(),
            bytes = body.len(),
            "Response received"
        );

        if !status.is_success() {
            let message = detail_message(&body).unwrap_or_else(|| fallback.to_string());
            return Err(ServerError::new(status.as_u16(), message).into());
        }
        Ok((status.as_u16(), body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
        fallback: &str,
    ) -> Result<T> {
        let (status, body) = self.send(request, path, fallback).await?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(path, error = %e, "Response body did not match the expected shape");
            ServerError::invalid_response(status).into()
        })
    }

    async fn send_tokens(&self, request: RequestBuilder, path: &str, fallback: &str) -> Result<TokenPair> {
        let (status, body) = self.send(request, path, fallback).await?;
        let parsed: TokenResponse =
            serde_json::from_slice(&body).map_err(|_| ServerError::invalid_response(status))?;
        parsed
            .into_token_pair()
            .ok_or_else(|| ServerError::invalid_response(status).into())
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }
}

/// Multipart body with the upload under the `file` field.
fn file_form(file: &UploadPayload) -> Form {
    let part = Part::stream_with_length(file.data.clone(), file.data.len() as u64)
        .file_name(file.file_name.clone());
    Form::new().part("file", part)
}

#[async_trait]
impl AuthApi for HttpApi {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair> {
        let path = &self.endpoints.login;
        tracing::debug!(email = %credentials.email, "Logging in");
        self.send_tokens(self.post(path).json(credentials), path, fallback::LOGIN)
            .await
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SessionUser> {
        let path = &self.endpoints.signup;
        self.send_json(self.post(path).json(request), path, fallback::SIGNUP)
            .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let path = &self.endpoints.refresh;
        self.send_tokens(
            self.post(path).bearer_auth(refresh_token),
            path,
            fallback::REFRESH,
        )
        .await
    }

    async fn profile(&self, access_token: &str) -> Result<SessionUser> {
        let path = &self.endpoints.profile;
        self.send_json(self.get(path).bearer_auth(access_token), path, fallback::PROFILE)
            .await
    }
}

#[async_trait]
impl AnalysisApi for HttpApi {
    async fn decode_eeg(&self, access_token: &str, file: &UploadPayload) -> Result<EegResult> {
        let path = &self.endpoints.eeg_decode;
        let request = self
            .post(path)
            .bearer_auth(access_token)
            .multipart(file_form(file));
        self.send_json(request, path, fallback::EEG_DECODE).await
    }

    async fn classify_sleep(
        &self,
        access_token: &str,
        file: &UploadPayload,
        channel_idx: u32,
    ) -> Result<SleepResult> {
        let path = &self.endpoints.eeg_classify;
        let form = file_form(file).text("channel_idx", channel_idx.to_string());
        let request = self.post(path).bearer_auth(access_token).multipart(form);
        self.send_json(request, path, fallback::EEG_CLASSIFY).await
    }

    async fn eeg_file_info(
        &self,
        access_token: &str,
        file: &UploadPayload,
    ) -> Result<EegFileInfo> {
        let path = &self.endpoints.eeg_file_info;
        let request = self
            .post(path)
            .bearer_auth(access_token)
            .multipart(file_form(file));
        self.send_json(request, path, fallback::EEG_FILE_INFO).await
    }

    async fn sleep_stages(&self) -> Result<Vec<SleepStageInfo>> {
        let path = &self.endpoints.sleep_stages;
        self.send_json(self.get(path), path, fallback::SLEEP_STAGES)
            .await
    }

    async fn classify_emotion(
        &self,
        access_token: &str,
        file: &UploadPayload,
    ) -> Result<EmotionPrediction> {
        let path = &self.endpoints.emotion_classify;
        let request = self
            .post(path)
            .bearer_auth(access_token)
            .multipart(file_form(file));
        self.send_json(request, path, fallback::EMOTION_CLASSIFY).await
    }

    async fn emotion_file_info(&self, file: &UploadPayload) -> Result<EmotionFileInfo> {
        let path = &self.endpoints.emotion_file_info;
        let request = self.post(path).multipart(file_form(file));
        self.send_json(request, path, fallback::EMOTION_FILE_INFO)
            .await
    }

    async fn emotion_info(&self) -> Result<serde_json::Value> {
        let path = &self.endpoints.emotion_info;
        self.send_json(self.get(path), path, fallback::EMOTION_INFO)
            .await
    }
}
