use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Data Validation Error: {0}")]
    Validation(String),

    #[error("Numeric Fault: {0}")]
    NumericFault(String),

    #[error("Search Space Exhausted: {0}")]
    SearchExhausted(String),
}

impl ForgeError {
    /// True for failures detected before a search starts.
    /// Numeric faults and exhausted operators only occur mid-run.
    pub fn is_setup_error(&self) -> bool {
        !matches!(
            self,
            ForgeError::NumericFault(_) | ForgeError::SearchExhausted(_)
        )
    }
}

pub type ForgeResult<T> = Result<T, ForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_vs_runtime_classification() {
        assert!(ForgeError::Config("x".into()).is_setup_error());
        assert!(ForgeError::Validation("x".into()).is_setup_error());
        assert!(!ForgeError::NumericFault("x".into()).is_setup_error());
        assert!(!ForgeError::SearchExhausted("x".into()).is_setup_error());
    }
}
