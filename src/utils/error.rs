use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse '{path}': {message}")]
    ParseError { path: String, message: String },

    #[error("File contains no section headers (line {line}): key/value pairs must follow a [Section]")]
    MissingSectionHeader { line: usize },

    #[error("Missing required key '{key}' in section [{section}]")]
    MissingConfigError { section: String, key: String },

    #[error("Invalid value for '{field}': '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Interpolation error in [{section}] '{key}': {reason}")]
    InterpolationError {
        section: String,
        key: String,
        reason: String,
    },

    #[error("Secret key generation failed: {message}")]
    SecretGenerationError { message: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    FileSystem,
    Serialization,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SettingsError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SettingsError::IoError(_) => ErrorCategory::FileSystem,
            SettingsError::ParseError { .. }
            | SettingsError::MissingSectionHeader { .. }
            | SettingsError::MissingConfigError { .. }
            | SettingsError::InvalidConfigValueError { .. }
            | SettingsError::InterpolationError { .. } => ErrorCategory::Configuration,
            SettingsError::SecretGenerationError { .. } => ErrorCategory::System,
            SettingsError::SerializationError(_) | SettingsError::TomlError(_) => {
                ErrorCategory::Serialization
            }
        }
    }

    // 所有錯誤在啟動時都是致命的，嚴重程度只影響退出碼
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Serialization => ErrorSeverity::Medium,
            ErrorCategory::FileSystem | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SettingsError::IoError(e) => format!("Could not access a settings file: {}", e),
            SettingsError::ParseError { path, .. } => {
                format!("The settings file '{}' is not valid INI", path)
            }
            SettingsError::MissingSectionHeader { line } => format!(
                "Line {} of the settings file is outside any [Section]",
                line
            ),
            SettingsError::MissingConfigError { section, key } => format!(
                "Section [{}] is enabled but '{}' is not set",
                section, key
            ),
            SettingsError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' has an invalid value: {}", field, reason)
            }
            SettingsError::InterpolationError { section, key, .. } => format!(
                "Could not expand %(...)s references in [{}] '{}'",
                section, key
            ),
            SettingsError::SecretGenerationError { .. } => {
                "Could not generate a secret key".to_string()
            }
            SettingsError::SerializationError(_) | SettingsError::TomlError(_) => {
                "Could not render the derived settings".to_string()
            }
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            SettingsError::IoError(_) => {
                "Check that the base directory exists and is writable".to_string()
            }
            SettingsError::ParseError { .. } | SettingsError::MissingSectionHeader { .. } => {
                "Compare settings.ini with settings.dist.ini and fix the syntax".to_string()
            }
            SettingsError::MissingConfigError { section, key } => format!(
                "Add '{} = ...' under [{}], or remove the [{}] section to disable the feature",
                key, section, section
            ),
            SettingsError::InvalidConfigValueError { .. } => {
                "Booleans accept yes/no, true/false, on/off, 1/0; ports and durations must be integers"
                    .to_string()
            }
            SettingsError::InterpolationError { .. } => {
                "Write a literal percent sign as %%".to_string()
            }
            SettingsError::SecretGenerationError { .. } => {
                "Set [AutoSecretKey] SecretKey manually in settings.ini".to_string()
            }
            SettingsError::SerializationError(_) | SettingsError::TomlError(_) => {
                "Try a different --format".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SettingsError>;
