//! Error types for the Source Map v3 codec.
//!
//! Every error names the piece of input that triggered it — the offending
//! character and its byte offset for mapping syntax errors, the 1-based
//! frame or line index for segment errors, the field name for validation
//! failures — so callers can report something actionable without having
//! to re-walk the input themselves.

use thiserror::Error;

/// Errors produced while decoding, validating, or composing source maps.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SourceMapError {
    /// A byte in a mappings string is outside the VLQ/separator alphabet.
    #[error("invalid character {character:?} at offset {offset} in mappings string")]
    InvalidCharacter { character: char, offset: usize },

    /// A VLQ sequence ended with its continuation bit still set.
    #[error("incomplete VLQ sequence at end of input")]
    IncompleteSequence,

    /// The mappings string was empty; treated as invalid input rather
    /// than as a valid store with zero lines.
    #[error("mappings string is empty")]
    EmptyMappings,

    /// A segment did not have 4 or 5 VLQ fields.
    #[error("frame {frame}: segment has {length} fields, expected 4 or 5")]
    InvalidSegmentLength { frame: usize, length: usize },

    /// A decoded segment failed field validation (all four positional
    /// fields must be at least 1).
    #[error("frame {frame}: invalid {field} value {value}: {reason}")]
    InvalidSegmentField {
        frame: usize,
        field: &'static str,
        value: i64,
        reason: &'static str,
    },

    /// A structured (array-form) line was neither `absent` nor a list.
    #[error("line {line}: expected a list of segments, found {kind}")]
    NotAList { line: usize, kind: &'static str },

    /// The JSON envelope was missing a required field or had the wrong type.
    #[error("invalid source map envelope: {reason}")]
    InvalidEnvelope { reason: String },

    /// The envelope's `mappings` field failed decoding; wraps the
    /// underlying mapping error with the frame context already attached.
    #[error("frame {frame}: {source}")]
    Frame {
        frame: usize,
        #[source]
        source: Box<SourceMapError>,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SourceMapError>;
