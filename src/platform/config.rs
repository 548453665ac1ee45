// NeuroSuite - platform/config.rs
//
// Platform data directory resolution and config.toml loading with startup
// validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use directories::ProjectDirs;
use reqwest::Url;
use std::path::{Path, PathBuf};

/// Resolved platform paths for NeuroSuite configuration and data.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/neurosuite/).
    pub config_dir: PathBuf,

    /// Data directory holding the token store.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let data_dir = proj_dirs.data_dir().to_path_buf();

            tracing::debug!(
                config = %config_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                config_dir: fallback.clone(),
                data_dir: fallback,
            }
        }
    }

    /// Location of the durable token file.
    pub fn token_file(&self) -> PathBuf {
        self.data_dir.join(constants::TOKEN_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[api]` section.
    pub api: ApiSection,
    /// `[endpoints]` section.
    pub endpoints: EndpointsSection,
    /// `[upload]` section.
    pub upload: UploadSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[api]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Service base URL.
    pub base_url: Option<String>,
}

/// `[endpoints]` config section: per-path overrides.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct EndpointsSection {
    pub login: Option<String>,
    pub signup: Option<String>,
    pub refresh: Option<String>,
    pub profile: Option<String>,
    pub eeg_decode: Option<String>,
    pub eeg_classify: Option<String>,
    pub eeg_file_info: Option<String>,
    pub sleep_stages: Option<String>,
    pub emotion_classify: Option<String>,
    pub emotion_file_info: Option<String>,
    pub emotion_info: Option<String>,
}

/// `[upload]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct UploadSection {
    /// Sleep-stage upload cap in megabytes.
    pub sleep_max_size_mb: Option<u64>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Endpoint paths relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login: String,
    pub signup: String,
    pub refresh: String,
    pub profile: String,
    pub eeg_decode: String,
    pub eeg_classify: String,
    pub eeg_file_info: String,
    pub sleep_stages: String,
    pub emotion_classify: String,
    pub emotion_file_info: String,
    pub emotion_info: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: constants::LOGIN_PATH.to_string(),
            signup: constants::SIGNUP_PATH.to_string(),
            refresh: constants::REFRESH_PATH.to_string(),
            profile: constants::PROFILE_PATH.to_string(),
            eeg_decode: constants::EEG_DECODE_PATH.to_string(),
            eeg_classify: constants::EEG_CLASSIFY_PATH.to_string(),
            eeg_file_info: constants::EEG_FILE_INFO_PATH.to_string(),
            sleep_stages: constants::SLEEP_STAGES_PATH.to_string(),
            emotion_classify: constants::EMOTION_CLASSIFY_PATH.to_string(),
            emotion_file_info: constants::EMOTION_FILE_INFO_PATH.to_string(),
            emotion_info: constants::EMOTION_INFO_PATH.to_string(),
        }
    }
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service base URL (absolute http/https).
    pub api_base_url: Url,

    /// Endpoint paths.
    pub endpoints: Endpoints,

    /// Sleep-stage upload cap in bytes.
    pub sleep_max_size_bytes: u64,

    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,

    /// Log file path.
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_base_url(),
            endpoints: Endpoints::default(),
            sleep_max_size_bytes: constants::DEFAULT_SLEEP_MAX_SIZE_MB * constants::BYTES_PER_MB,
            log_level: None,
            log_file: None,
        }
    }
}

fn default_base_url() -> Url {
    // Compile-time constant, covered by test_default_config.
    Url::parse(constants::DEFAULT_API_BASE_URL).expect("default API base URL is valid")
}

/// Parse and check a base URL: absolute, http or https.
pub fn parse_base_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        "http" | "https" => Err("URL has no host".to_string()),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

impl AppConfig {
    /// Apply a base URL given on the command line or environment, which
    /// takes priority over config.toml. Returns a warning on bad input.
    pub fn override_base_url(&mut self, raw: &str) -> Option<String> {
        match parse_base_url(raw) {
            Ok(url) => {
                self.api_base_url = url;
                None
            }
            Err(reason) => Some(format!(
                "--api-url '{raw}' is invalid ({reason}). Using {}.",
                self.api_base_url
            )),
        }
    }
}

/// Load and validate `config.toml` from the given config directory.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first-run).
/// If the file is unparseable, returns defaults with a warning.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);

    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!(
                "Could not read config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");

    let (config, mut field_warnings) = validate(raw);
    warnings.append(&mut field_warnings);

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

/// Validate each field of a parsed config, accumulating all warnings.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<String>) {
    let mut config = AppConfig::default();
    let mut warnings = Vec::new();

    // -- API: base_url --
    if let Some(ref base) = raw.api.base_url {
        match parse_base_url(base) {
            Ok(url) => config.api_base_url = url,
            Err(reason) => warnings.push(format!(
                "[api] base_url = \"{base}\" is invalid ({reason}). Using default ({}).",
                constants::DEFAULT_API_BASE_URL,
            )),
        }
    }

    // -- Endpoints --
    let e = raw.endpoints;
    let overrides: [(&str, Option<String>, &mut String); 11] = [
        ("login", e.login, &mut config.endpoints.login),
        ("signup", e.signup, &mut config.endpoints.signup),
        ("refresh", e.refresh, &mut config.endpoints.refresh),
        ("profile", e.profile, &mut config.endpoints.profile),
        ("eeg_decode", e.eeg_decode, &mut config.endpoints.eeg_decode),
        ("eeg_classify", e.eeg_classify, &mut config.endpoints.eeg_classify),
        ("eeg_file_info", e.eeg_file_info, &mut config.endpoints.eeg_file_info),
        ("sleep_stages", e.sleep_stages, &mut config.endpoints.sleep_stages),
        ("emotion_classify", e.emotion_classify, &mut config.endpoints.emotion_classify),
        ("emotion_file_info", e.emotion_file_info, &mut config.endpoints.emotion_file_info),
        ("emotion_info", e.emotion_info, &mut config.endpoints.emotion_info),
    ];
    for (name, value, slot) in overrides {
        if let Some(path) = value {
            if path.starts_with('/') && !path.contains(char::is_whitespace) {
                *slot = path;
            } else {
                warnings.push(format!(
                    "[endpoints] {name} = \"{path}\" must be a path starting with '/'. Using default ({slot}).",
                ));
            }
        }
    }

    // -- Upload: sleep_max_size_mb --
    if let Some(mb) = raw.upload.sleep_max_size_mb {
        if (constants::MIN_SLEEP_MAX_SIZE_MB..=constants::MAX_SLEEP_MAX_SIZE_MB).contains(&mb) {
            config.sleep_max_size_bytes = mb * constants::BYTES_PER_MB;
        } else {
            warnings.push(format!(
                "[upload] sleep_max_size_mb = {mb} is out of range ({}-{}). Using default ({}).",
                constants::MIN_SLEEP_MAX_SIZE_MB,
                constants::MAX_SLEEP_MAX_SIZE_MB,
                constants::DEFAULT_SLEEP_MAX_SIZE_MB,
            ));
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    // -- Logging: file --
    if let Some(ref file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(file.clone());
        }
    }

    (config, warnings)
}
