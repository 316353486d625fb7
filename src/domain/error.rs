//! Domain error types.

/// A parse error with position information for rule parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the parsed input.
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret under the offending character. The
    /// caret column counts characters, not bytes.
    pub fn display_with_context(&self, input: &str) -> String {
        let column = input
            .get(..self.position)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(self.position);
        let caret = " ".repeat(column) + "^";
        format!("{input}\n{caret}\n{err}", err = self)
    }
}

/// Top-level error type for wfminer.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("invalid rule: {reason}")]
    RuleInvalid { reason: String },

    #[error("invalid strategy: {reason}")]
    StrategyInvalid { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        EngineError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::DataSource { .. } => 3,
            EngineError::RuleParse(_)
            | EngineError::RuleInvalid { .. }
            | EngineError::StrategyInvalid { .. } => 4,
            EngineError::NoData { .. } | EngineError::InsufficientData { .. } => 5,
            EngineError::Serialization(_) => 6,
        };
        std::process::ExitCode::from(code)
    }
}
