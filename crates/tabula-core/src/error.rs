use thiserror::Error;

#[derive(Debug, Error)]
pub enum TabulaError {
    // LLM errors
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("LLM response parse error: {0}")]
    LlmParse(String),

    #[error("LLM provider not supported: {0}")]
    UnsupportedProvider(String),

    // Request / pipeline errors (client-side)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Forbidden SQL operation attempted: {0}")]
    ForbiddenStatement(String),

    #[error("Table not found: {0}")]
    UnknownTable(String),

    // Pipeline stage errors
    #[error("Stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    #[error("Workbook error: {0}")]
    Workbook(String),

    // Tool errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution failed: {tool}: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Tool input validation failed: {0}")]
    ToolValidation(String),

    // Agent errors
    #[error("Agent exceeded max turns ({0})")]
    MaxTurnsExceeded(usize),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TabulaError {
    /// Whether this error is attributable to the caller's request
    /// (mapped to a 4xx status by the gateway) rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::UnknownTemplate(_)
                | Self::MissingColumn(_)
                | Self::ForbiddenStatement(_)
                | Self::UnknownTable(_)
                | Self::ToolValidation(_)
        )
    }

    /// Whether this error originated from the upstream LLM provider.
    pub fn is_upstream_error(&self) -> bool {
        matches!(self, Self::LlmRequest(_) | Self::LlmParse(_))
    }
}

pub type Result<T> = std::result::Result<T, TabulaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_split() {
        assert!(TabulaError::UnknownTemplate("zz".into()).is_client_error());
        assert!(TabulaError::ForbiddenStatement("DROP TABLE users".into()).is_client_error());
        assert!(!TabulaError::Database("connection refused".into()).is_client_error());
        assert!(!TabulaError::LlmRequest("HTTP 500".into()).is_client_error());
    }

    #[test]
    fn test_upstream_error_split() {
        assert!(TabulaError::LlmRequest("timeout".into()).is_upstream_error());
        assert!(!TabulaError::Database("down".into()).is_upstream_error());
    }
}
