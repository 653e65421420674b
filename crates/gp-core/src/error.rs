//! Error types for the GP parameter stack

use thiserror::Error;

/// Parameter / prior error type
#[derive(Error, Debug)]
pub enum Error {
    /// Value shape is incompatible with a transform or density
    #[error("Shape error: {0}")]
    Shape(String),

    /// Value lies outside the valid domain of an inverse mapping
    #[error("Domain error: {0}")]
    Domain(String),

    /// Configuration or argument validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Not implemented
    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        let e = Error::Shape("numel 4 is not triangular".into());
        assert_eq!(e.to_string(), "Shape error: numel 4 is not triangular");

        let e = Error::NotImplemented("Beta.sample".into());
        assert_eq!(e.to_string(), "Not implemented: Beta.sample");
    }

    #[test]
    fn test_json_conversion() {
        let err = serde_json::from_str::<f64>("not json").unwrap_err();
        let e: Error = err.into();
        assert!(matches!(e, Error::Json(_)));
    }
}
