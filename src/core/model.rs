// NeuroSuite - core/model.rs
//
// Core data types: credentials, the token pair, the session user, upload
// candidates, and the per-screen classification payloads.
//
// Token and password fields never appear in `Debug` output so that a
// stray `?value` in a tracing call cannot leak them.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// =============================================================================
// Authentication
// =============================================================================

/// Bearer credentials issued by the remote service.
///
/// Serialised in the durable store as `{accessToken, refreshToken, tokenType}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    crate::util::constants::DEFAULT_TOKEN_TYPE.to_string()
}

impl TokenPair {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        token_type: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            token_type: token_type.into(),
        }
    }

    /// True when the pair may be used against a protected endpoint.
    pub fn has_access_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    /// The refresh token, if one was issued and is non-empty.
    pub fn usable_refresh_token(&self) -> Option<&str> {
        self.refresh_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// The authenticated user, held in memory only.
///
/// Any profile fields beyond the known ones are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub email: String,

    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SessionUser {
    /// Minimal user known only by email (login without a profile fetch).
    pub fn from_email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            full_name: None,
            organization: None,
            role: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Name to greet the user with.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Login form.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Account registration form, sent as the `/signup` body.
///
/// Empty `organization`/`role` are omitted from the request.
#[derive(Clone, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(skip_serializing_if = "is_blank")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub role: Option<String>,
    pub agreed_to_terms: bool,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("organization", &self.organization)
            .field("role", &self.role)
            .field("agreed_to_terms", &self.agreed_to_terms)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Uploads
// =============================================================================

/// Where an upload's bytes come from.
#[derive(Debug, Clone, PartialEq)]
pub enum FileSource {
    /// Already in memory.
    Memory(Bytes),
    /// Read from disk at submission time.
    Path(PathBuf),
}

/// A file offered to an analysis screen.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    /// File name including extension (no directory part).
    pub name: String,

    /// Size in bytes.
    pub size: u64,

    pub source: FileSource,
}

impl UploadFile {
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            source: FileSource::Memory(data),
        }
    }

    pub fn from_path(name: impl Into<String>, size: u64, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            size,
            source: FileSource::Path(path),
        }
    }
}

/// Multipart-ready upload: name plus loaded contents.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPayload {
    pub file_name: String,
    pub data: Bytes,
}

// =============================================================================
// Analysis results
// =============================================================================

/// The three analysis screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    EegDecoder,
    SleepStage,
    Emotion,
}

impl AnalysisKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::EegDecoder => "EEG decoder",
            Self::SleepStage => "Sleep stage detector",
            Self::Emotion => "Emotion recognizer",
        }
    }
}

/// EEG "mind decoder" output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EegResult {
    #[serde(rename = "imageUrl", alias = "image_url")]
    pub image_url: String,
    pub insights: String,
}

/// Sleep-stage classifier output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepResult {
    pub stage: u32,
    pub stage_name: String,
    #[serde(default)]
    pub probabilities: Vec<f64>,
}

impl SleepResult {
    /// Probabilities as percentages with one decimal place ("87.5").
    pub fn probability_percentages(&self) -> Vec<String> {
        self.probabilities
            .iter()
            .map(|p| format!("{:.1}", p * 100.0))
            .collect()
    }
}

/// Emotion classifier output, with the file metadata read beforehand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionResult {
    pub emotion: String,
    pub confidence: f64,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EmotionFileInfo>,
}

/// Result of one analysis run, keyed by the screen that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationResult {
    Eeg(EegResult),
    Sleep(SleepResult),
    Emotion(EmotionResult),
}

impl ClassificationResult {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            Self::Eeg(_) => AnalysisKind::EegDecoder,
            Self::Sleep(_) => AnalysisKind::SleepStage,
            Self::Emotion(_) => AnalysisKind::Emotion,
        }
    }
}

// =============================================================================
// File metadata and reference data
// =============================================================================

/// `/eeg/file-info` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EegFileInfo {
    #[serde(default)]
    pub channels: Vec<String>,
    pub sampling_frequency: f64,
    pub duration_seconds: f64,
    pub num_samples: u64,
}

/// `/emotion/file-info` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionFileInfo {
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub sampling_rate: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl EmotionFileInfo {
    /// The classifier needs at least one channel and a sampling rate.
    pub fn is_usable(&self) -> bool {
        !self.channels.is_empty() && self.sampling_rate.is_some_and(|r| r > 0.0)
    }
}

/// One entry of `/eeg/sleep-stages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepStageInfo {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Description of a stage by name, if the reference list has it.
pub fn stage_description<'a>(stages: &'a [SleepStageInfo], stage_name: &str) -> Option<&'a str> {
    stages
        .iter()
        .find(|s| s.name == stage_name)
        .map(|s| s.description.as_str())
}

// =============================================================================
// Unit tests
// =============================================================================
