use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The buffer is shorter than the indicator's lookback. Not a failure for
    /// the pipeline: the indicator simply has no value yet.
    #[error("Insufficient data: need {required} candles, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid candle: {0}")]
    InvalidCandle(String),

    #[error("CSV parsing system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON error: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },

    #[error("CSV data format error: {0}")]
    CsvDataFormatError(String),
}

impl EngineError {
    /// True for the states an indicator recovers from on its own (more candles,
    /// better-conditioned prices). These surface as absent values, never as failures.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::InsufficientData { .. } | EngineError::NumericDegeneracy(_)
        )
    }
}
