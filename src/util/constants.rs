// NeuroSuite - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "NeuroSuite";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "NeuroSuite";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Remote service
// =============================================================================

/// Base URL of the hosted analysis service.
pub const DEFAULT_API_BASE_URL: &str =
    "https://neruosuite-abc6e9efd9hufybr.centralindia-01.azurewebsites.net";

/// Default endpoint paths, relative to the base URL.
pub const LOGIN_PATH: &str = "/login";
pub const SIGNUP_PATH: &str = "/signup";
pub const REFRESH_PATH: &str = "/refresh-token";
pub const PROFILE_PATH: &str = "/users/me";
pub const EEG_DECODE_PATH: &str = "/eeg/decode";
pub const EEG_CLASSIFY_PATH: &str = "/eeg/classify-file";
pub const EEG_FILE_INFO_PATH: &str = "/eeg/file-info";
pub const SLEEP_STAGES_PATH: &str = "/eeg/sleep-stages";
pub const EMOTION_CLASSIFY_PATH: &str = "/emotion/classify";
pub const EMOTION_FILE_INFO_PATH: &str = "/emotion/file-info";
pub const EMOTION_INFO_PATH: &str = "/emotion/info";

/// Token type assumed when the service omits `token_type`.
pub const DEFAULT_TOKEN_TYPE: &str = "bearer";

/// Separator used when joining a list of validation `detail` messages.
pub const DETAIL_MESSAGE_SEPARATOR: &str = ". ";

// =============================================================================
// Upload limits
// =============================================================================

/// Extensions accepted by the EEG decoder screen.
pub const EEG_DECODER_EXTENSIONS: &[&str] = &[".csv", ".txt", ".edf"];

/// Extensions accepted by the sleep-stage screen.
pub const SLEEP_STAGE_EXTENSIONS: &[&str] = &[".edf"];

/// Extensions accepted by the emotion screen.
pub const EMOTION_EXTENSIONS: &[&str] = &[".edf"];

/// Default sleep-stage upload cap in megabytes.
pub const DEFAULT_SLEEP_MAX_SIZE_MB: u64 = 100;

/// Bounds on the user-configurable sleep-stage upload cap (MB).
pub const MIN_SLEEP_MAX_SIZE_MB: u64 = 1;
pub const MAX_SLEEP_MAX_SIZE_MB: u64 = 1024;

/// Bytes per megabyte for size caps.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// EEG channel used for sleep classification when none is given.
pub const DEFAULT_SLEEP_CHANNEL: u32 = 0;

// =============================================================================
// Account form rules
// =============================================================================

/// Password length bounds (inclusive).
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 64;

/// Special characters a password must draw at least one from.
pub const PASSWORD_SPECIAL_CHARS: &str = "@$!%*?&";

/// Minimum length of a trimmed full name.
pub const MIN_FULL_NAME_LEN: usize = 2;

// =============================================================================
// Logging
// =============================================================================

/// Default log level when neither RUST_LOG, --debug nor config set one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Files
// =============================================================================

/// Config file name within the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Durable token store file name within the data directory.
pub const TOKEN_FILE_NAME: &str = "tokens.json";
