use std::{
    collections::BTreeMap,
    ops::{Deref, DerefMut},
};

use crate::{
    ErrorKind, Result,
    key::{self, Segment},
    param::ParameterKind,
};

/// The local name of a descriptor within its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(Segment);

impl Name {
    /// A table member called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Segment::Name(name.into()))
    }

    /// Position `index` of a sequence or tuple.
    pub fn sequence_element(index: usize) -> Self {
        Self(Segment::Index(index))
    }

    /// The underlying key segment.
    pub fn segment(&self) -> &Segment {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Name {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Tracks the enclosing qualified key while a descriptor tree is declared.
///
/// A composite descriptor [`enter`](Self::enter)s its own name before
/// declaring its children, so each child computes its qualified key from the
/// context alone. The returned [`Scope`] leaves again when dropped, including
/// during unwinding.
#[derive(Debug, Default)]
pub struct NameContext {
    stack: Vec<String>,
    declared: BTreeMap<String, ParameterKind>,
    violations: Vec<String>,
}

impl NameContext {
    /// A context positioned at the document root.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context positioned at the already-qualified key `key`.
    ///
    /// Used to declare descriptors for sequence elements and resolved tables
    /// away from the main schema.
    pub fn rooted(key: impl Into<String>) -> Self {
        Self {
            stack: vec![key.into()],
            ..Self::default()
        }
    }

    /// The qualified key of the innermost open scope; empty at the root.
    pub fn current(&self) -> &str {
        self.stack.last().map(String::as_str).unwrap_or("")
    }

    /// Number of open scopes, counting the starting key of a rooted context.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The qualified key `name` would have if declared here.
    pub fn qualify(&self, name: &Name) -> String {
        key::join(self.current(), name.segment())
    }

    /// Opens the scope of `name` until the returned guard is dropped.
    pub fn enter(&mut self, name: &Name) -> Scope<'_> {
        let key = self.qualify(name);
        log::trace!("Entering name scope `{key}`");
        self.stack.push(key);
        Scope { cx: self }
    }

    /// Records a declaration, flagging the key if it was declared before.
    pub(crate) fn register(&mut self, key: &str, kind: ParameterKind) {
        if let Some(previous) = self.declared.insert(key.to_owned(), kind) {
            log::debug!("Duplicate declaration of `{key}` ({previous:?}, then {kind:?})");
            self.violations
                .push(format!("parameter `{key}` is declared more than once"));
        }
    }

    /// Keeps another context's violations without adopting its keys.
    pub(crate) fn absorb(&mut self, other: NameContext) {
        self.violations.extend(other.violations);
    }

    /// Ends declaration, reporting the first structural violation.
    pub fn finish(self) -> Result<()> {
        match self.violations.into_iter().next() {
            Some(violation) => Err(ErrorKind::StructuralViolation(violation).into()),
            None => Ok(()),
        }
    }
}

/// An open name scope; leaves the scope when dropped.
#[derive(Debug)]
pub struct Scope<'a> {
    cx: &'a mut NameContext,
}

impl Deref for Scope<'_> {
    type Target = NameContext;

    fn deref(&self) -> &Self::Target {
        self.cx
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.cx
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.cx.stack.pop() {
            log::trace!("Leaving name scope `{key}`");
        }
    }
}
