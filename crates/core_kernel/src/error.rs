//! Errors raised while reading kernel values from text

use thiserror::Error;

use crate::money::MoneyError;

/// Failure to turn external input into a kernel value
///
/// Identifiers arrive in URL paths and bank statements; currencies and
/// amounts arrive in configuration and request bodies.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("'{value}' is not a valid {kind} identifier")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        #[source]
        source: uuid::Error,
    },

    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl CoreError {
    pub fn invalid_identifier(kind: &'static str, value: &str, source: uuid::Error) -> Self {
        CoreError::InvalidIdentifier {
            kind,
            value: value.to_string(),
            source,
        }
    }
}
