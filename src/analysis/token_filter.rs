//! Token filter implementations for token transformation.
//!
//! Filters receive a token stream and produce a new one. They normalize
//! text (lowercasing), drop tokens that make poor features (stop words,
//! very short or very long tokens) and cap the number of tokens per
//! document.
//!
//! # Available Filters
//!
//! - [`lowercase::LowercaseFilter`] - Converts tokens to lowercase
//! - [`stop::StopFilter`] - Removes stop words
//! - [`length::LengthFilter`] - Keeps tokens within a character-length range
//! - [`limit::LimitFilter`] - Limits number of tokens
//!
//! # Examples
//!
//! ```
//! use falx::analysis::token_filter::Filter;
//! use falx::analysis::token_filter::lowercase::LowercaseFilter;
//! use falx::analysis::token::Token;
//!
//! let filter = LowercaseFilter::new();
//! let tokens = vec![Token::new("Hello", 0), Token::new("WORLD", 1)];
//! let filtered: Vec<_> = filter.filter(Box::new(tokens.into_iter()))
//!     .unwrap()
//!     .collect();
//!
//! assert_eq!(filtered[0].text, "hello");
//! assert_eq!(filtered[1].text, "world");
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for filters that transform token streams.
pub trait Filter: Send + Sync {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Get the name of this filter (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod length;
pub mod limit;
pub mod lowercase;
pub mod stop;

pub use length::LengthFilter;
pub use limit::LimitFilter;
pub use lowercase::LowercaseFilter;
pub use stop::StopFilter;
