#[derive(Debug, thiserror::Error)]
pub enum RatesheetError {
    /// Anything the framework can detect as a malformed or unexpected
    /// source document: missing sheets, wrong cell types, regex
    /// mismatches, broken tier runs. This is the one error kind the
    /// extraction boundary produces; the message carries the full
    /// coordinate/expected/actual detail for the intake log.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("failed to load workbook: {0}")]
    Load(String),

    #[error("unknown supplier: {0}")]
    UnknownSupplier(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RatesheetError {
    pub fn validation(msg: impl Into<String>) -> Self {
        RatesheetError::Validation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, RatesheetError::Validation(_))
    }
}
