//! Error taxonomy for the decompressor.
//!
//! Modeled as a small hand-rolled enum rather than a `thiserror`-derived one, matching
//! the rest of this workspace's preference for minimal error types.

use std::fmt;

#[derive(Debug)]
pub enum DecompressError {
    /// The bit reader could not satisfy a required read.
    UnexpectedEof,
    /// A header value was out of range, a Huffman code-length set was invalid, a
    /// context map overran its target size, or some other structural rule of the
    /// format was violated. Carries a short static reason for diagnosis.
    MalformedStream(&'static str),
    /// A backward-copy distance was non-positive, exceeded the allowed backward
    /// window, or its copy extended past the end of the meta-block.
    InvalidBackref,
    /// The output collaborator failed.
    Io(std::io::Error),
}

impl fmt::Display for DecompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompressError::UnexpectedEof => write!(f, "unexpected end of compressed input"),
            DecompressError::MalformedStream(reason) => write!(f, "malformed stream: {reason}"),
            DecompressError::InvalidBackref => write!(f, "invalid backward reference"),
            DecompressError::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for DecompressError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecompressError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DecompressError {
    fn from(err: std::io::Error) -> Self {
        DecompressError::Io(err)
    }
}
