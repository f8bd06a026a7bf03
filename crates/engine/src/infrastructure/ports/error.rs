//! Error types for port operations.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    /// No API key configured; raised before any request is sent.
    #[error("LLM API key is not configured (set DEEPSEEK_KEY)")]
    NotConfigured,
    #[error("LLM request timed out after {0}s")]
    Timeout(u64),
    #[error("LLM request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
