//! Plugin error types

use std::fmt;

use thiserror::Error;

use crate::domain::llm::LlmError;

/// Lifecycle hook that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Initialize,
    Destroy,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialize => write!(f, "initialize"),
            Self::Destroy => write!(f, "destroy"),
        }
    }
}

/// Plugin-specific errors
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Plugin not found: {plugin_id}")]
    NotFound { plugin_id: String },

    #[error("Plugin already registered: {plugin_id}")]
    AlreadyRegistered { plugin_id: String },

    #[error("No plugins available for analysis")]
    NoPluginsAvailable,

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { plugin_id: String, timeout_ms: u64 },

    #[error("Plugin {phase} failed for '{plugin_id}': {message}")]
    Lifecycle {
        plugin_id: String,
        phase: LifecyclePhase,
        message: String,
    },

    #[error("Analysis failed for '{plugin_id}': {message}")]
    Analysis { plugin_id: String, message: String },

    #[error("Plugin '{plugin_id}' panicked: {message}")]
    Panicked { plugin_id: String, message: String },

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl PluginError {
    pub fn not_found(plugin_id: impl Into<String>) -> Self {
        Self::NotFound {
            plugin_id: plugin_id.into(),
        }
    }

    pub fn already_registered(plugin_id: impl Into<String>) -> Self {
        Self::AlreadyRegistered {
            plugin_id: plugin_id.into(),
        }
    }

    pub fn timeout(plugin_id: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            plugin_id: plugin_id.into(),
            timeout_ms,
        }
    }

    pub fn lifecycle(
        plugin_id: impl Into<String>,
        phase: LifecyclePhase,
        message: impl Into<String>,
    ) -> Self {
        Self::Lifecycle {
            plugin_id: plugin_id.into(),
            phase,
            message: message.into(),
        }
    }

    pub fn analysis(plugin_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Analysis {
            plugin_id: plugin_id.into(),
            message: message.into(),
        }
    }

    pub fn panicked(plugin_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Panicked {
            plugin_id: plugin_id.into(),
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
