//! Error kinds for the decode and bind passes.
use std::path::PathBuf;

use thiserror::Error;

use crate::descriptor::{Kind, ShapeKind};

/// A type descriptor string does not follow `base[/size[/groupSize]]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("invalid type descriptor {raw:?}: expected at most two size segments")]
    TooManySegments { raw: String },

    #[error("invalid type descriptor {raw:?}: size segment {segment:?} is not a non-negative integer")]
    InvalidSize { raw: String, segment: String },
}

/// A field annotation could not be turned into tag options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("unrecognized tag option {key:?}")]
    UnknownOption { key: String },

    #[error("tag option {key:?} has an empty key")]
    EmptyKey { key: String },
}

/// A captured environment file could not be loaded.
#[derive(Debug, Error)]
pub enum EnvFileError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}:{line}: expected KEY=VALUE, got {text:?}")]
    Malformed { origin: String, line: usize, text: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("{key} is not set; was the command declared with an argument parser?")]
    ListMissing { key: String },

    #[error("type of argument {name:?} is not declared ({key} is not set)")]
    TypeMissing { name: String, key: String },

    #[error("argument {name:?}: {source}")]
    InvalidType {
        name: String,
        #[source]
        source: TypeError,
    },

    #[error("{key}: expected {expected}, got {raw:?}")]
    Conversion { key: String, expected: Kind, raw: String },
}

impl DecodeError {
    /// The declared-name list itself was absent, so no store could be built.
    pub fn is_list_missing(&self) -> bool {
        matches!(self, DecodeError::ListMissing { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error("field {field:?}: argument {name:?} is not declared")]
    Unresolved { field: String, name: String },

    #[error("field {field:?} has wrong type (expected {expected}, got {received})")]
    KindMismatch { field: String, expected: Kind, received: Kind },

    #[error("field {field:?} has wrong shape (expected {expected}, got {received})")]
    ShapeMismatch { field: String, expected: ShapeKind, received: ShapeKind },

    #[error("field {field:?} resolves to an empty argument name")]
    MissingName { field: String },

    #[error("field {field:?}: {source}")]
    Tag {
        field: String,
        #[source]
        source: TagError,
    },

    #[error("in {field}: {source}")]
    Nested {
        field: String,
        #[source]
        source: Box<BindError>,
    },
}

impl BindError {
    /// Innermost error, skipping the nesting wrappers.
    pub fn root(&self) -> &BindError {
        match self {
            BindError::Nested { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Serde deserialization failed; `path` locates the offending value
/// (`.` for the root).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at path {path} → {message}")]
pub struct DeserializeError {
    pub path: String,
    pub message: String,
}

impl<E: std::fmt::Display> From<serde_path_to_error::Error<E>> for DeserializeError {
    fn from(err: serde_path_to_error::Error<E>) -> Self {
        let path = err.path().to_string();
        Self { path, message: err.into_inner().to_string() }
    }
}

/// Error of the one-shot entry points that both decode and bind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Bind(#[from] BindError),
}

pub type Result<T> = std::result::Result<T, Error>;
