// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy for JMI conversions.
//!
//! Every failure carries an [`ErrorKind`] that callers can match on without
//! inspecting messages, plus an HTTP-like [`status`](JmiError::status) for
//! API layers that surface these errors over the wire.

use std::fmt;

/// Machine-checkable class of a [`JmiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input is not shaped as expected.
    DataFormat,
    /// Two records share the same indexing key.
    DuplicateKey,
    /// A parent chain never reaches a root, or records remain unlinked.
    CircularReference,
    /// The requested conversion pair is not supported.
    NotImplemented,
}

impl ErrorKind {
    /// Status code a caller should use when surfacing this kind over HTTP.
    pub fn status(self) -> u16 {
        match self {
            Self::DataFormat => 400,
            Self::DuplicateKey | Self::CircularReference => 403,
            Self::NotImplemented => 501,
        }
    }

    /// Stable name of the kind, as used in logs and error payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataFormat => "DataFormatError",
            Self::DuplicateKey => "DuplicateKeyError",
            Self::CircularReference => "CircularReferenceError",
            Self::NotImplemented => "NotImplementedError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the JMI core.
///
/// No operation returns a partially built structure alongside an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JmiError {
    /// JMI type 1 input was not an ordered sequence.
    #[error("cannot convert data: expected a JMI type 1 list, found {found}")]
    NotAList {
        /// JSON type that was found instead.
        found: &'static str,
    },
    /// A record (or container) was not a JSON object.
    #[error("expected an object at {location}, found {found}")]
    NotAnObject {
        /// Where the offending value sits (e.g. `records[3]`).
        location: String,
        /// JSON type that was found instead.
        found: &'static str,
    },
    /// A field path was empty or had an empty segment.
    #[error("invalid field path {path:?}")]
    InvalidFieldPath {
        /// The path as supplied.
        path: String,
    },
    /// A required field is missing from a record.
    #[error("record {position} is missing required field {field:?}")]
    MissingField {
        /// Position of the record in the input.
        position: usize,
        /// Field path that was looked up.
        field: String,
    },
    /// A field holds a value that cannot serve as a key or reference.
    #[error("record {position} has an invalid {field:?} value: expected a string or number, found {found}")]
    InvalidFieldValue {
        /// Position of the record in the input.
        position: usize,
        /// Field path that was looked up.
        field: String,
        /// JSON type that was found instead.
        found: &'static str,
    },
    /// Tree construction was asked for on an empty input.
    #[error("cannot build a tree: input contains no root record")]
    NoRoot,
    /// More than one root was found and the root policy rejects that.
    #[error("expected a single root, found {}: {}", roots.len(), roots.join(", "))]
    MultipleRoots {
        /// Root identifiers in input order.
        roots: Vec<String>,
    },
    /// A record names a non-package record as its parent.
    #[error("record {child:?} cannot be contained by {parent:?}: type {parent_type:?} is not a package")]
    NonPackageParent {
        /// Identifier of the contained record.
        child: String,
        /// Identifier of the would-be parent.
        parent: String,
        /// Type of the would-be parent (empty when it has none).
        parent_type: String,
    },
    /// Input had the right outer shape but an inconsistent inner structure.
    #[error("malformed JMI data: {0}")]
    Malformed(String),
    /// Two records produced the same key.
    #[error("invalid data: duplicate key {key:?}")]
    DuplicateKey {
        /// The repeated key value.
        key: String,
    },
    /// Records were left unlinked after tree assembly.
    #[error("a circular or dangling reference exists; unresolved records: {}", unresolved.join(", "))]
    CircularReference {
        /// Identifiers of the unresolved records, in input order.
        unresolved: Vec<String>,
    },
    /// The `(from, to)` conversion pair is not supported.
    #[error("JMI conversion from type {from} to type {to} is not implemented")]
    NotImplemented {
        /// Source JMI type.
        from: u8,
        /// Target JMI type.
        to: u8,
    },
}

impl JmiError {
    /// Machine-checkable class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAList { .. }
            | Self::NotAnObject { .. }
            | Self::InvalidFieldPath { .. }
            | Self::MissingField { .. }
            | Self::InvalidFieldValue { .. }
            | Self::NoRoot
            | Self::MultipleRoots { .. }
            | Self::NonPackageParent { .. }
            | Self::Malformed(_) => ErrorKind::DataFormat,
            Self::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            Self::CircularReference { .. } => ErrorKind::CircularReference,
            Self::NotImplemented { .. } => ErrorKind::NotImplemented,
        }
    }

    /// HTTP-like status for this error (see [`ErrorKind::status`]).
    pub fn status(&self) -> u16 {
        self.kind().status()
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, JmiError>;
