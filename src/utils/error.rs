use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error(
        "No channels produced ({sources_failed}/{sources_attempted} sources failed, {candidates} candidates)"
    )]
    NoChannelsAvailable {
        sources_attempted: usize,
        sources_failed: usize,
        candidates: usize,
    },
}

/// 錯誤分類，用於日誌與退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Io,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 根據嚴重程度決定退出碼
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl MergeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MergeError::Http(_) => ErrorCategory::Network,
            MergeError::Io(_) => ErrorCategory::Io,
            MergeError::Serialization(_) | MergeError::NoChannelsAvailable { .. } => {
                ErrorCategory::Data
            }
            MergeError::ConfigError { .. }
            | MergeError::ConfigValidationError { .. }
            | MergeError::InvalidConfigValueError { .. }
            | MergeError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 來源暫時失效，稍後重跑通常可恢復
            MergeError::NoChannelsAvailable { .. } | MergeError::Http(_) => ErrorSeverity::Medium,
            MergeError::Serialization(_) => ErrorSeverity::High,
            MergeError::ConfigError { .. }
            | MergeError::ConfigValidationError { .. }
            | MergeError::InvalidConfigValueError { .. }
            | MergeError::MissingConfigError { .. } => ErrorSeverity::High,
            MergeError::Io(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            MergeError::Http(_) => {
                "Check network connectivity and that the TLS stack can reach the sources".to_string()
            }
            MergeError::Io(_) => {
                "Check that the output directory exists and is writable".to_string()
            }
            MergeError::Serialization(_) => "Report the run with --verbose output".to_string(),
            MergeError::ConfigError { .. } | MergeError::ConfigValidationError { .. } => {
                "Review the configuration file syntax and values".to_string()
            }
            MergeError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' and run again", field)
            }
            MergeError::MissingConfigError { field } => {
                format!("Provide '{}' on the command line or in the config file", field)
            }
            MergeError::NoChannelsAvailable { sources_failed, sources_attempted, .. }
                if sources_failed == sources_attempted =>
            {
                "Every source failed to download; verify the source URLs are still online".to_string()
            }
            MergeError::NoChannelsAvailable { .. } => {
                "No stream answered as live; retry later or raise --probe-timeout-secs".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            MergeError::NoChannelsAvailable {
                sources_attempted,
                sources_failed,
                candidates,
            } => format!(
                "No channels were written: {} of {} sources failed and {} candidate streams were found",
                sources_failed, sources_attempted, candidates
            ),
            MergeError::Io(e) => format!("Could not write output: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;
