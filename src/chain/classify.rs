//! Provider error classification.
//!
//! Providers signal "block range too large" in their own words. The
//! fetcher's backoff only needs a yes/no answer, so the wording lives here
//! and can be swapped per backend.

use super::ProviderError;
use crate::config::{ChainConfig, DEFAULT_RANGE_ERROR_CODES, DEFAULT_RANGE_ERROR_PATTERNS};

/// What the fetcher should do about a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retry the same start block with a smaller window.
    RangeLimit,
    /// Give up on this event type for the pass.
    Fatal,
}

/// Decides whether a provider error is a range-limit error.
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &ProviderError) -> ErrorClass;
}

/// Classifier matching error text and JSON-RPC codes against fixed lists.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    patterns: Vec<String>,
    codes: Vec<i64>,
}

impl PatternClassifier {
    pub fn new(patterns: impl IntoIterator<Item = String>, codes: Vec<i64>) -> Self {
        Self {
            patterns: patterns.into_iter().map(|p| p.to_lowercase()).collect(),
            codes,
        }
    }

    pub fn from_config(config: &ChainConfig) -> Self {
        Self::new(
            config.range_error_patterns.iter().cloned(),
            config.range_error_codes.clone(),
        )
    }

    fn matches_text(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.patterns.iter().any(|p| text.contains(p.as_str()))
    }
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_RANGE_ERROR_PATTERNS.iter().map(|p| p.to_string()),
            DEFAULT_RANGE_ERROR_CODES.to_vec(),
        )
    }
}

impl ErrorClassifier for PatternClassifier {
    fn classify(&self, error: &ProviderError) -> ErrorClass {
        let range_limited = match error {
            ProviderError::Timeout => true,
            ProviderError::Rpc { code, message } => {
                self.codes.contains(code) || self.matches_text(message)
            }
            ProviderError::Http { status } => *status == 413,
            ProviderError::Transport(message) => self.matches_text(message),
            ProviderError::Decode(_) => false,
        };

        if range_limited {
            ErrorClass::RangeLimit
        } else {
            ErrorClass::Fatal
        }
    }
}
