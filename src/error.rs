// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for rule parsing, configuration and content loading

use crate::parser::span::Span;
use thiserror::Error;

/// Result type for exchange operations
pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Top-level error for the exchange engine
///
/// Every variant is scoped to a single element or a single option. None of
/// them abort processing of other elements.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    /// Invalid configuration was supplied and ignored
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// An element's rule attribute could not be parsed
    #[error(transparent)]
    MalformedRule(#[from] MalformedRuleError),

    /// Replacement content could not be fetched
    #[error(transparent)]
    ContentLoad(#[from] ContentLoadError),
}

/// Configuration errors. The offending option is dropped and the prior
/// configuration stays in effect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// Options were not a key/value object
    #[error("Configuration options must be an object, got {actual}")]
    NotAnObject {
        /// JSON type that was supplied instead
        actual: String,
    },

    /// A known option carried a value of the wrong type
    #[error("Configuration option '{key}' expects {expected}")]
    InvalidOption {
        /// Option name
        key: String,
        /// Description of the accepted value
        expected: String,
    },
}

/// A bracketed segment that does not describe a `path, condition` pair
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed rule segment '[{segment}]' at {span}: {reason}")]
pub struct MalformedRuleError {
    /// Raw text of the offending segment, without the brackets
    pub segment: String,
    /// Byte range of the segment body within the attribute value
    pub span: Span,
    /// What was missing
    pub reason: MalformedReason,
}

/// Why a segment was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// No comma separates the content source from the condition
    MissingComma,
    /// Nothing before the comma
    EmptySource,
    /// Nothing usable after the comma
    EmptyCondition,
}

impl std::fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedReason::MissingComma => write!(f, "expected 'path, condition'"),
            MalformedReason::EmptySource => write!(f, "content source is empty"),
            MalformedReason::EmptyCondition => write!(f, "condition is empty"),
        }
    }
}

/// Fetching replacement content failed. The element keeps its prior content.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to load content from '{url}': {source}")]
pub struct ContentLoadError {
    /// URL that was requested
    pub url: String,
    /// Underlying fetch failure
    pub source: FetchError,
}

/// Failures reported by a [`ContentFetcher`](crate::fetch::ContentFetcher)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The server answered with a non-success status
    #[error("HTTP status {status}")]
    Status {
        /// Response status code
        status: u16,
    },

    /// The request never produced a response
    #[error("transport error: {message}")]
    Transport {
        /// Error message from the transport
        message: String,
    },

    /// The fetch task ended before delivering a result
    #[error("fetch task aborted")]
    Aborted,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Status {
                status: status.as_u16(),
            },
            None => FetchError::Transport {
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_rule_message_names_segment() {
        let err = MalformedRuleError {
            segment: "a.jpg small".to_string(),
            span: Span::new(1, 12),
            reason: MalformedReason::MissingComma,
        };
        assert_eq!(
            err.to_string(),
            "Malformed rule segment '[a.jpg small]' at 1..12: expected 'path, condition'"
        );
    }

    #[test]
    fn test_content_load_error_wraps_into_exchange_error() {
        let err: ExchangeError = ContentLoadError {
            url: "/partials/large.html".to_string(),
            source: FetchError::Status { status: 404 },
        }
        .into();
        assert!(matches!(err, ExchangeError::ContentLoad(_)));
        assert_eq!(
            err.to_string(),
            "Failed to load content from '/partials/large.html': HTTP status 404"
        );
    }
}
