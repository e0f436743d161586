use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use crate::{ErrorKind, Result};

/// Ordered children of a sequence value.
pub type ValueSeq = Vec<Value>;

/// Keyed children of a table value, iterated in key order.
pub type ValueTable = BTreeMap<String, Value>;

/// Canonical text stored for nil.
pub(crate) const NIL: &str = "@nil";

/// Discriminates what a [`Value`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// The nil marker.
    Nil,
    /// A string scalar.
    String,
    /// A boolean scalar.
    Bool,
    /// A numeric scalar.
    Number,
    /// A (real, imaginary) pair.
    Complex,
    /// An ordered list of values.
    Sequence,
    /// A key-sorted map of values.
    Table,
}

impl ValueKind {
    /// Nil, string, bool, and number values all store a single canonical string.
    pub fn is_atom(self) -> bool {
        matches!(
            self,
            ValueKind::Nil | ValueKind::String | ValueKind::Bool | ValueKind::Number
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            ValueKind::Nil => "nil",
            ValueKind::String => "string",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::Complex => "complex",
            ValueKind::Sequence => "sequence",
            ValueKind::Table => "table",
        }
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a [`Value`] carries; the shape is fixed by its [`ValueKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Canonical text of a nil, string, bool, or number.
    Atom(String),
    /// Canonical text of the real and imaginary parts.
    Complex(String, String),
    /// Sequence elements.
    Sequence(ValueSeq),
    /// Table members.
    Table(ValueTable),
}

impl Payload {
    fn fits(&self, kind: ValueKind) -> bool {
        match self {
            Payload::Atom(_) => kind.is_atom(),
            Payload::Complex(..) => kind == ValueKind::Complex,
            Payload::Sequence(_) => kind == ValueKind::Sequence,
            Payload::Table(_) => kind == ValueKind::Table,
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            Payload::Atom(_) => "atom payload",
            Payload::Complex(..) => "complex payload",
            Payload::Sequence(_) => "sequence payload",
            Payload::Table(_) => "table payload",
        }
    }
}

/// One node of a configuration tree.
///
/// Scalars are held as canonical text and only turned into native values by
/// [`Decode`](crate::Decode). A value remembers whether it was declared in a
/// protected (prolog) region; see [`ValueTree`](crate::ValueTree) for how that
/// flag gates later writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    in_prolog: bool,
    kind: ValueKind,
    payload: Payload,
}

impl Value {
    /// Builds a value, rejecting a payload whose shape does not match `kind`.
    pub fn new(in_prolog: bool, kind: ValueKind, payload: Payload) -> Result<Self> {
        if !payload.fits(kind) {
            return Err(ErrorKind::TypeMismatch {
                expected: payload.shape(),
                found: kind,
            }
            .into());
        }
        Ok(Self {
            in_prolog,
            kind,
            payload,
        })
    }

    /// The nil marker.
    pub fn nil(in_prolog: bool) -> Self {
        Self::atom_unchecked(in_prolog, ValueKind::Nil, NIL.to_owned())
    }

    /// A zero-length sequence.
    pub fn empty_sequence(in_prolog: bool) -> Self {
        Self {
            in_prolog,
            kind: ValueKind::Sequence,
            payload: Payload::Sequence(ValueSeq::new()),
        }
    }

    /// A zero-entry table.
    pub fn empty_table(in_prolog: bool) -> Self {
        Self {
            in_prolog,
            kind: ValueKind::Table,
            payload: Payload::Table(ValueTable::new()),
        }
    }

    /// A complex value from the canonical text of both parts.
    pub fn complex(in_prolog: bool, re: String, im: String) -> Self {
        Self {
            in_prolog,
            kind: ValueKind::Complex,
            payload: Payload::Complex(re, im),
        }
    }

    pub(crate) fn atom_unchecked(in_prolog: bool, kind: ValueKind, text: String) -> Self {
        debug_assert!(kind.is_atom());
        Self {
            in_prolog,
            kind,
            payload: Payload::Atom(text),
        }
    }

    /// The kind tag.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Whether the value has kind `kind`.
    pub fn is_a(&self, kind: ValueKind) -> bool {
        self.kind == kind
    }

    /// Whether the value was declared in a protected region.
    pub fn in_prolog(&self) -> bool {
        self.in_prolog
    }

    /// Marks or unmarks the value as protected.
    pub fn set_prolog(&mut self, in_prolog: bool) {
        self.in_prolog = in_prolog;
    }

    /// The raw payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Consumes the value, returning its payload.
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Canonical text of an atom.
    pub fn as_atom(&self) -> Option<&str> {
        match &self.payload {
            Payload::Atom(text) => Some(text),
            _ => None,
        }
    }

    /// Canonical text of both complex parts.
    pub fn as_complex(&self) -> Option<(&str, &str)> {
        match &self.payload {
            Payload::Complex(re, im) => Some((re, im)),
            _ => None,
        }
    }

    /// Sequence elements.
    pub fn as_sequence(&self) -> Option<&ValueSeq> {
        match &self.payload {
            Payload::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Mutable sequence elements.
    pub fn as_sequence_mut(&mut self) -> Option<&mut ValueSeq> {
        match &mut self.payload {
            Payload::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Table members.
    pub fn as_table(&self) -> Option<&ValueTable> {
        match &self.payload {
            Payload::Table(members) => Some(members),
            _ => None,
        }
    }

    /// Mutable table members.
    pub fn as_table_mut(&mut self) -> Option<&mut ValueTable> {
        match &mut self.payload {
            Payload::Table(members) => Some(members),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Atom(text) => f.write_str(text),
            Payload::Complex(re, im) => write!(f, "({re},{im})"),
            Payload::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Payload::Table(members) => {
                if members.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (i, (key, member)) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{key}: {member}")?;
                }
                f.write_str(" }")
            }
        }
    }
}
