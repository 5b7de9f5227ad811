//! Parser error types

use thiserror::Error;

/// Parser error
#[derive(Error, Debug)]
pub enum ParseError {
    /// Descriptor line that does not fit `name` or `name(args)`
    #[error("cannot parse step descriptor: '{0}'")]
    MalformedDescriptor(String),

    /// Empty descriptor line
    #[error("step descriptor is empty")]
    EmptyDescriptor,

    /// Anything that is not a literal in the argument list
    #[error("cannot parse arguments: '{fragment}' is not a literal. Only literal values are supported: strings, numbers, booleans, null, lists, maps")]
    NotALiteral { fragment: String },

    /// String literal missing its closing quote
    #[error("unterminated string literal: {0}")]
    UnterminatedString(String),

    /// Number that scans but does not parse
    #[error("invalid number literal: '{0}'")]
    InvalidNumber(String),

    /// Structural problem inside a list or map
    #[error("expected {expected}, found '{found}'")]
    Expected { expected: String, found: String },

    /// Map key that is not a string literal
    #[error("map keys must be string literals, found '{0}'")]
    NonStringKey(String),

    /// Same keyword given twice
    #[error("duplicate keyword argument '{0}'")]
    DuplicateKeyword(String),

    /// Positional argument after a keyword argument
    #[error("positional argument follows keyword argument")]
    PositionalAfterKeyword,
}

/// Result type for parser operations
pub type Result<T> = std::result::Result<T, ParseError>;
