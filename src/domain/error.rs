//! Domain error types.

/// Top-level error type for quantwork.
///
/// Every pipeline stage returns this; the CLI treats any variant as fatal.
#[derive(Debug, thiserror::Error)]
pub enum QuantError {
    #[error("failed to fetch {ticker}: {reason}")]
    DataFetch { ticker: String, reason: String },

    #[error("insufficient data for {what}: have {have} points, need {need}")]
    InsufficientData {
        what: String,
        have: usize,
        need: usize,
    },

    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("{what} has zero variance")]
    ZeroVariance { what: String },

    #[error("price dates for {ticker} are not strictly increasing")]
    UnorderedDates { ticker: String },

    #[error("invalid portfolio weights: {reason}")]
    InvalidWeights { reason: String },

    #[error("solver error: {reason}")]
    Solver { reason: String },

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
    Io(#[from] std::io::Error),
}

impl QuantError {
    pub(crate) fn insufficient(what: impl Into<String>, have: usize, need: usize) -> Self {
        QuantError::InsufficientData {
            what: what.into(),
            have,
            need,
        }
    }

    pub(crate) fn mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        QuantError::DimensionMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }

    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        QuantError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Every failure is fatal for the run and exits with status 1.
impl From<&QuantError> for std::process::ExitCode {
    fn from(_err: &QuantError) -> Self {
        std::process::ExitCode::from(1)
    }
}
