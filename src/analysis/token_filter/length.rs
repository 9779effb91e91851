//! Length filter implementation.

use super::Filter;

use crate::analysis::token::TokenStream;
use crate::error::{FalxError, Result};

/// A filter that removes tokens whose character length falls outside
/// `min..=max`.
///
/// Very short tokens ("a", "of") and very long ones (base64 blobs, URLs)
/// carry little category evidence and bloat the counter store.
#[derive(Clone, Debug)]
pub struct LengthFilter {
    min: usize,
    max: usize,
}

impl LengthFilter {
    /// Create a new length filter accepting tokens of `min..=max` characters.
    pub fn new(min: usize, max: usize) -> Result<Self> {
        if min > max {
            return Err(FalxError::invalid_argument(format!(
                "length filter minimum {min} exceeds maximum {max}"
            )));
        }
        Ok(LengthFilter { min, max })
    }

    /// Minimum accepted length in characters.
    pub fn min(&self) -> usize {
        self.min
    }

    /// Maximum accepted length in characters.
    pub fn max(&self) -> usize {
        self.max
    }
}

impl Filter for LengthFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let (min, max) = (self.min, self.max);
        Ok(Box::new(tokens.filter(move |token| {
            let len = token.char_len();
            len >= min && len <= max
        })))
    }

    fn name(&self) -> &'static str {
        "length"
    }
}
