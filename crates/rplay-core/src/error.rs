//! Error taxonomy surfaced by the router

use thiserror::Error;

/// Backend tier that handled (or failed) a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    ManagedAgent,
    DirectApi,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ManagedAgent => write!(f, "managed-agent"),
            Self::DirectApi => write!(f, "direct-api"),
        }
    }
}

/// A failure talking to one backend tier. Never surfaced on its own; it either
/// triggers fallback or becomes the cause inside [`RouterError::Upstream`].
#[derive(Debug, Error)]
#[error("{tier} transport error: {message}")]
pub struct TransportError {
    pub tier: Tier,
    pub message: String,
}

impl TransportError {
    pub fn new(tier: Tier, err: impl std::fmt::Display) -> Self {
        Self {
            tier,
            message: format!("{:#}", err),
        }
    }
}

/// Errors a router caller can observe
#[derive(Debug, Error)]
pub enum RouterError {
    /// No backend credentials present at all
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Every configured tier failed
    #[error("upstream error: all AI backends failed ({})", join_attempts(.attempts))]
    Upstream { attempts: Vec<TransportError> },
}

fn join_attempts(attempts: &[TransportError]) -> String {
    attempts
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl RouterError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}

pub type RouterResult<T> = std::result::Result<T, RouterError>;
