//! Error types for Tessera.

use thiserror::Error;

use crate::capability::QualifiedName;

/// Primary error type for all Tessera operations.
#[derive(Error, Debug)]
pub enum TesseraError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config file parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Capability name collision: '{name}' already maps to {existing}, refusing {incoming}")]
    NameCollision {
        name: String,
        existing: QualifiedName,
        incoming: QualifiedName,
    },

    #[error("Tool execution error: {tool_name} — {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Provider error: {provider} — {message}")]
    Provider { provider: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Io,
    Serialization,
    Routing,
    ToolExecution,
    Provider,
    InvalidInput,
}

impl TesseraError {
    /// Create a provider error.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a tool execution error.
    pub fn tool_execution(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::ConfigParse(_) => ErrorCategory::Configuration,
            Self::Io(_) => ErrorCategory::Io,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::UnknownProvider(_) | Self::UnknownCapability(_) | Self::NameCollision { .. } => {
                ErrorCategory::Routing
            }
            Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            Self::Provider { .. } => ErrorCategory::Provider,
            Self::InvalidArgument(_) => ErrorCategory::InvalidInput,
        }
    }

    /// Whether a caller may reasonably retry the failed operation.
    ///
    /// The orchestration core itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Provider | ErrorCategory::Io)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TesseraError>;
