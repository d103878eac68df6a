//! Request and query DTOs
//!
//! Responses are the domain records themselves; only inbound shapes live
//! here. Amounts arrive as bare decimals in the book currency.

pub mod books;
pub mod invoices;
pub mod payments;

use std::str::FromStr;

use validator::Validate;

use crate::error::ApiError;

/// Runs the derived `validator` rules, mapping failures to a 422
pub fn validated<T: Validate>(body: T) -> Result<T, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string().replace('\n', "; ")))?;
    Ok(body)
}

/// Parses a path identifier, with or without its display prefix
pub fn parse_id<T: FromStr>(raw: &str, entity: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("'{}' is not a valid {} id", raw, entity)))
}
