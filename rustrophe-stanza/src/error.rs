use std::error::Error as StdError;
use std::fmt;

/// Error produced when parsing XML text into a [`Stanza`](crate::Stanza).
#[derive(Debug)]
pub enum Error {
    /// The underlying tokenizer rejected the input.
    Parser(rxml::Error),
    /// The input ended before the root element was closed.
    IncompleteDocument,
    /// More than one root element, or data after the root element.
    TrailingContent,
    /// Non-whitespace text outside the root element.
    TextOutsideRoot,
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parser(e) => write!(fmt, "XML parser error: {}", e),
            Error::IncompleteDocument => write!(fmt, "document ended with unclosed elements"),
            Error::TrailingContent => write!(fmt, "trailing content after root element"),
            Error::TextOutsideRoot => write!(fmt, "text content outside root element"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Parser(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rxml::Error> for Error {
    fn from(e: rxml::Error) -> Self {
        Error::Parser(e)
    }
}
