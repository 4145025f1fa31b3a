//! Input validation for the query surface.
//!
//! Malformed input is rejected here, before any store access, so callers can
//! tell "invalid" apart from "not found".

use thiserror::Error;

use crate::types::ParticipantSort;

/// Maximum accepted length for addresses and search tokens.
pub const MAX_TOKEN_LENGTH: usize = 100;

/// Rejected query input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid miner address: expected 1-{max} characters, got {length}")]
    InvalidAddress { length: usize, max: usize },

    #[error("Invalid block number format: '{input}'")]
    InvalidBlockNumber { input: String },

    #[error("Invalid search query: expected 1-{max} characters, got {length}")]
    InvalidSearchToken { length: usize, max: usize },

    #[error("Invalid sort key: '{input}'")]
    InvalidSort { input: String },

    #[error("Invalid limit: '{input}'")]
    InvalidLimit { input: String },
}

/// Accepts an address of 1 to 100 characters.
///
/// # Errors
///
/// - `QueryError::InvalidAddress` - Empty or too long
pub fn parse_address(input: &str) -> Result<&str, QueryError> {
    let length = input.chars().count();
    if length == 0 || length > MAX_TOKEN_LENGTH {
        return Err(QueryError::InvalidAddress {
            length,
            max: MAX_TOKEN_LENGTH,
        });
    }
    Ok(input)
}

/// Accepts a non-negative decimal block height made only of ASCII digits.
///
/// # Errors
///
/// - `QueryError::InvalidBlockNumber` - Empty, non-digit characters, or overflow
pub fn parse_block_number(input: &str) -> Result<u64, QueryError> {
    let invalid = || QueryError::InvalidBlockNumber {
        input: input.to_string(),
    };

    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    input.parse::<u64>().map_err(|_| invalid())
}

/// Accepts a search token of 1 to 100 characters.
///
/// # Errors
///
/// - `QueryError::InvalidSearchToken` - Empty or too long
pub fn parse_search_token(input: &str) -> Result<&str, QueryError> {
    let length = input.chars().count();
    if length == 0 || length > MAX_TOKEN_LENGTH {
        return Err(QueryError::InvalidSearchToken {
            length,
            max: MAX_TOKEN_LENGTH,
        });
    }
    Ok(input)
}

/// Parses an optional sort key, defaulting to hashrate.
///
/// # Errors
///
/// - `QueryError::InvalidSort` - Unknown key
pub fn parse_sort(input: Option<&str>) -> Result<ParticipantSort, QueryError> {
    match input {
        None => Ok(ParticipantSort::default()),
        Some(raw) => raw.parse().map_err(|_| QueryError::InvalidSort {
            input: raw.to_string(),
        }),
    }
}

/// Parses an optional result limit, falling back to `default`.
///
/// # Errors
///
/// - `QueryError::InvalidLimit` - Not a non-negative integer
pub fn parse_limit(input: Option<&str>, default: usize) -> Result<usize, QueryError> {
    match input {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| QueryError::InvalidLimit {
            input: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_length_bounds() {
        assert_eq!(parse_address("0xabc"), Ok("0xabc"));
        assert!(parse_address(&"a".repeat(100)).is_ok());
        assert_eq!(
            parse_address(""),
            Err(QueryError::InvalidAddress { length: 0, max: 100 })
        );
        assert!(parse_address(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_block_number_digits_only() {
        assert_eq!(parse_block_number("100000"), Ok(100_000));
        assert_eq!(parse_block_number("0"), Ok(0));
        assert!(parse_block_number("").is_err());
        assert!(parse_block_number("-1").is_err());
        assert!(parse_block_number("+1").is_err());
        assert!(parse_block_number("12a").is_err());
        assert!(parse_block_number("99999999999999999999999").is_err());
    }

    #[test]
    fn test_search_token_bounds() {
        assert_eq!(parse_search_token("0x12"), Ok("0x12"));
        assert!(parse_search_token("").is_err());
        assert!(parse_search_token(&"9".repeat(101)).is_err());
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!(parse_sort(None), Ok(ParticipantSort::Hashrate));
        assert_eq!(parse_sort(Some("rewards")), Ok(ParticipantSort::Rewards));
        assert_eq!(
            parse_sort(Some("speed")),
            Err(QueryError::InvalidSort {
                input: "speed".to_string()
            })
        );
    }

    #[test]
    fn test_limit_parsing() {
        assert_eq!(parse_limit(None, 10), Ok(10));
        assert_eq!(parse_limit(Some("3"), 10), Ok(3));
        assert_eq!(parse_limit(Some("0"), 10), Ok(0));
        assert!(parse_limit(Some("-2"), 10).is_err());
        assert!(parse_limit(Some("ten"), 10).is_err());
    }
}
