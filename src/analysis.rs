//! Text analysis used to turn raw documents into classifier features.
//!
//! Analysis runs in three stages: a [`Tokenizer`](tokenizer::Tokenizer)
//! splits text into [`Token`](token::Token)s, a chain of
//! [`Filter`](token_filter::Filter)s normalizes or drops them, and an
//! [`Analyzer`](analyzer::Analyzer) ties the two together.
//!
//! ```text
//! Raw Text → Tokenizer → Lowercase → Length → Stop Words → Limit → Features
//! ```

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::{Analyzer, PipelineAnalyzer};
pub use token::{Token, TokenStream};
pub use token_filter::Filter;
pub use tokenizer::Tokenizer;
