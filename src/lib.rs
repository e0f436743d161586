#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

use std::{
    error::Error as StdError,
    fmt::{self, Display},
};

use kdl::KdlError as KdlParseError;

mod atom;
mod codec;
mod ingest;
mod key;
mod name;
mod param;
mod schema;
mod sequence;
mod table;
mod table_as;
mod tree;
mod tuple;
mod value;

pub use atom::{Atom, OptionalAtom};
pub use codec::{Complex, Decode, Encode, Encoded, Number};
pub use ingest::{from_str, merge_str};
pub use key::{Segment, join, split};
pub use name::{Name, NameContext, Scope};
pub use param::{
    Condition, DefaultElement, Element, Parameter, ParameterBase, ParameterKind, Presence,
    Resolve, Visitor,
};
pub use schema::Schema;
pub use sequence::{OptionalSequence, Sequence};
pub use table::{OptionalTable, Resolved, Table, TableFragment, TableSchema};
pub use table_as::{FromTable, OptionalTableAs, TableAs};
pub use tree::ValueTree;
pub use tuple::{OptionalTuple, Tuple, TupleDefaults, TupleElements};
pub use value::{Payload, Value, ValueKind, ValueSeq, ValueTable};

/// Error type for value-tree access, schema declaration, and resolution.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    key: Option<String>,
}

impl Error {
    /// Returns a reference to the error kind for detailed error inspection.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The qualified key the error refers to, when one is known.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Attaches `key` unless a more specific key was recorded already.
    pub(crate) fn at(mut self, key: &str) -> Self {
        if self.key.is_none() {
            self.key = Some(key.to_owned());
        }
        self
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = &self.kind;
        match &self.key {
            Some(key) => write!(f, "`{key}`: {kind}"),
            None => write!(f, "{kind}"),
        }
    }
}
impl StdError for Error {}

impl<K: Into<ErrorKind>> From<K> for Error {
    fn from(value: K) -> Self {
        let kind = value.into();
        Error { kind, key: None }
    }
}

/// Detailed classification of errors.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Failed to parse the KDL document.
    Parse(KdlParseError),
    /// The key is not valid path syntax.
    InvalidKey(String),
    /// Nothing is stored at the key.
    NotFound,
    /// The stored value was declared in a protected region and the write came from outside it.
    ProtectionViolation,
    /// An intermediate path segment is neither a table nor a sequence as required.
    NotAContainer {
        /// Container kind the next segment needs.
        expected: ValueKind,
        /// Kind actually stored.
        found: ValueKind,
    },
    /// A sequence write skipped past the next free index.
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Current sequence length.
        len: usize,
    },
    /// The stored value has a kind the requested type cannot be read from.
    TypeMismatch {
        /// What the reader expected.
        expected: &'static str,
        /// Kind actually stored.
        found: ValueKind,
    },
    /// Canonical text could not be decoded into the requested type.
    DecodeFailure {
        /// Name of the requested type.
        expected: &'static str,
        /// The offending canonical text.
        text: String,
    },
    /// A required parameter is absent from the tree.
    MissingRequiredParameter,
    /// A table adapter found neither a table nor a default.
    CannotResolve {
        /// Name of the adapter's target type.
        type_name: String,
    },
    /// The schema itself is malformed.
    StructuralViolation(String),
    /// A stored sequence has the wrong number of elements.
    LengthMismatch {
        /// Declared length.
        expected: usize,
        /// Stored length.
        found: usize,
    },
    /// Keys present in the tree that no descriptor declares.
    UnknownParameters(Vec<String>),
    /// A KDL node cannot be mapped onto the value tree.
    UnsupportedNode(String),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Parse(kdl_error) => write!(f, "{kdl_error}"),
            ErrorKind::InvalidKey(key) => write!(f, "invalid key '{key}'"),
            ErrorKind::NotFound => write!(f, "can't find key"),
            ErrorKind::ProtectionViolation => {
                write!(f, "value is protected and cannot be modified here")
            }
            ErrorKind::NotAContainer { expected, found } => {
                write!(f, "cannot descend into {found}, expected {expected}")
            }
            ErrorKind::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for sequence of length {len}")
            }
            ErrorKind::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {expected}, found {found}")
            }
            ErrorKind::DecodeFailure { expected, text } => {
                write!(f, "cannot decode '{text}' as {expected}")
            }
            ErrorKind::MissingRequiredParameter => write!(f, "missing required parameter"),
            ErrorKind::CannotResolve { type_name } => {
                write!(f, "cannot resolve table as '{type_name}': no table and no default")
            }
            ErrorKind::StructuralViolation(msg) => write!(f, "schema error: {msg}"),
            ErrorKind::LengthMismatch { expected, found } => {
                write!(f, "expected sequence of length {expected}, found {found}")
            }
            ErrorKind::UnknownParameters(keys) => {
                write!(f, "unsupported parameters: {}", keys.join(", "))
            }
            ErrorKind::UnsupportedNode(msg) => write!(f, "unsupported node: {msg}"),
        }
    }
}

impl From<KdlParseError> for ErrorKind {
    fn from(value: KdlParseError) -> Self {
        Self::Parse(value)
    }
}

impl ErrorKind {
    /// Wraps the kind into an [`Error`] for `key`.
    pub(crate) fn at(self, key: &str) -> Error {
        Error::from(self).at(key)
    }
}

/// Crate-local result type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
