//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Errors
//! are only produced while validating and compiling configuration (mask libraries, rule sets,
//! decorator settings). The decoration path itself never fails; it places fewer instances.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown mask '{id}'")]
    UnknownMask { id: String },

    #[error("mask '{id}' references itself through its layers")]
    MaskCycle { id: String },

    #[error("missing texture '{id}'")]
    MissingTexture { id: String },

    #[error("unknown rule '{id}'")]
    UnknownRule { id: String },

    #[error("rule '{rule}' has no prefabs")]
    MissingPrefabs { rule: String },

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_string_uses_other_variant() {
        let err: Error = String::from("boom").into();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn display_names_the_offending_id() {
        let err = Error::UnknownMask { id: "noise".into() };
        assert_eq!(err.to_string(), "unknown mask 'noise'");

        let err = Error::MissingPrefabs {
            rule: "plants".into(),
        };
        assert_eq!(err.to_string(), "rule 'plants' has no prefabs");
    }
}
