// NeuroSuite - core/wire.rs
//
// Response shapes exactly as the service sends them, before validation
// into the core model, plus decoding of the `{detail}` error convention.

use crate::core::model::{EmotionFileInfo, EmotionResult, TokenPair};
use crate::util::constants;
use serde::Deserialize;

/// `/login` and `/refresh-token` body. Every field is optional on the wire
/// so a missing access token is reported as such rather than as a JSON error.
#[derive(Debug, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Validate into a `TokenPair`. `None` when no usable access token.
    pub fn into_token_pair(self) -> Option<TokenPair> {
        let access_token = self.access_token.filter(|t| !t.trim().is_empty())?;
        let token_type = self
            .token_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| constants::DEFAULT_TOKEN_TYPE.to_string());
        Some(TokenPair::new(
            access_token,
            self.refresh_token.filter(|t| !t.trim().is_empty()),
            token_type,
        ))
    }
}

/// `/emotion/classify` body.
#[derive(Debug, Default, Deserialize)]
pub struct EmotionPrediction {
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub description: String,
}

impl EmotionPrediction {
    /// Attach the metadata read before classification. `None` when the
    /// service returned no emotion label.
    pub fn into_result(self, metadata: Option<EmotionFileInfo>) -> Option<EmotionResult> {
        let emotion = self.emotion.filter(|e| !e.trim().is_empty())?;
        Some(EmotionResult {
            emotion,
            confidence: self.confidence,
            description: self.description,
            metadata,
        })
    }
}

// =============================================================================
// Error bodies
// =============================================================================

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Detail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Items(Vec<DetailItem>),
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct DetailItem {
    #[serde(default)]
    msg: Option<String>,
}

/// Extract the user-facing message from a non-2xx body.
///
/// `{detail: "text"}` yields the text; `{detail: [{msg}, ...]}` yields the
/// messages joined with ". ". Anything else yields `None` so the caller
/// can substitute an operation-specific fallback.
pub fn detail_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    let message = match parsed.detail {
        Detail::Text(text) => text,
        Detail::Items(items) => items
            .into_iter()
            .filter_map(|item| item.msg)
            .filter(|m| !m.trim().is_empty())
            .collect::<Vec<_>>()
            .join(constants::DETAIL_MESSAGE_SEPARATOR),
        Detail::Other(_) => return None,
    };
    let message = message.trim().to_string();
    (!message.is_empty()).then_some(message)
}
