//! Structured configuration issues
//!
//! [`FileConfig::validate`](super::FileConfig::validate) reports every
//! problem it finds instead of stopping at the first one.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A provider weight is negative or not a number
    InvalidWeight { provider: String },
    /// The same provider is listed twice in `providers.weights`
    DuplicateWeight { provider: String },
    /// Every listed weight is zero, so consensus has nobody to ask
    NoActiveProviders,
    /// A provider name is empty
    EmptyProviderName { field: String },
    /// `timeout_seconds = 0`
    InvalidTimeout { provider: String },
    /// An endpoint override names no base URL
    EmptyBaseUrl { provider: String },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)
    }
}
