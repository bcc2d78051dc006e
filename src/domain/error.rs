//! Domain error types.

/// Top-level error type for pairtrader.
#[derive(Debug, thiserror::Error)]
pub enum PairtraderError {
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

    #[error("data read error: {reason}")]
    DataRead { reason: String },

    #[error("no data for {instrument}")]
    NoData { instrument: String },

    #[error("insufficient data for {instrument}: have {quotes} quotes, need {minimum}")]
    InsufficientData {
        instrument: String,
        quotes: usize,
        minimum: usize,
    },

    #[error("quotes for {instrument} are not sorted by timestamp at index {index}")]
    UnsortedQuotes { instrument: String, index: usize },

    #[error("invalid quote for {instrument} at index {index}: {reason}")]
    InvalidQuote {
        instrument: String,
        index: usize,
        reason: String,
    },

    #[error("report write error: {reason}")]
    ReportWrite { reason: String },

    #[error("simulation cancelled after {completed} steps")]
    Cancelled { completed: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&PairtraderError> for std::process::ExitCode {
    fn from(err: &PairtraderError) -> Self {
        let code: u8 = match err {
            PairtraderError::Io(_) | PairtraderError::ReportWrite { .. } => 1,
            PairtraderError::ConfigParse { .. }
            | PairtraderError::ConfigMissing { .. }
            | PairtraderError::ConfigInvalid { .. } => 2,
            PairtraderError::DataRead { .. }
            | PairtraderError::UnsortedQuotes { .. }
            | PairtraderError::InvalidQuote { .. } => 3,
            PairtraderError::NoData { .. } | PairtraderError::InsufficientData { .. } => 5,
            PairtraderError::Cancelled { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
