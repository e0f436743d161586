use crate::{
    ErrorKind, Result,
    name::{Name, NameContext},
    param::{
        DefaultElement, Element, Lookup, Parameter, ParameterBase, ParameterKind, Presence,
        Resolve, Visitor, builder_methods, require,
    },
    tree::ValueTree,
    value::Value,
};

/// A homogeneous list whose elements are described by `E`.
///
/// Each stored element is resolved by a descriptor declared at `key[i]`, so
/// elements can be atoms, nested sequences, tuples, or tables.
#[derive(Debug)]
pub struct Sequence<E: Element> {
    base: ParameterBase,
    prototype: E,
    len: Option<usize>,
    default: Option<Vec<E::DefaultValue>>,
}

impl<E: Element> Sequence<E> {
    /// A required sequence of any length.
    pub fn new(cx: &mut NameContext, name: impl Into<Name>) -> Self {
        Self::declare(cx, name.into(), Presence::Required, None)
    }

    /// A required sequence that must hold exactly `len` elements.
    pub fn fixed(cx: &mut NameContext, name: impl Into<Name>, len: usize) -> Self {
        Self::declare(cx, name.into(), Presence::Required, Some(len))
    }

    fn declare(cx: &mut NameContext, name: Name, presence: Presence, len: Option<usize>) -> Self {
        let base = ParameterBase::declare(cx, &name, ParameterKind::Sequence, presence);
        Self {
            prototype: prototype(cx, &base),
            base,
            len,
            default: None,
        }
    }

    builder_methods!();

    /// Declared element count, if fixed.
    pub fn len(&self) -> Option<usize> {
        self.len
    }

    /// The descriptor used to document element `0`.
    pub fn element(&self) -> &E {
        &self.prototype
    }

    /// Resolves against `tree`, failing when no value is produced.
    pub fn get<'t>(&self, tree: &'t ValueTree) -> Result<Vec<E::Output<'t>>> {
        require(self, tree)
    }
}

impl<E: DefaultElement> Sequence<E> {
    /// A sequence that falls back to `default` when absent.
    pub fn with_default(
        cx: &mut NameContext,
        name: impl Into<Name>,
        default: Vec<E::DefaultValue>,
    ) -> Self {
        Self {
            default: Some(default),
            ..Self::declare(cx, name.into(), Presence::Default, None)
        }
    }

    /// The declared default, if any.
    pub fn default_value(&self) -> Option<&[E::DefaultValue]> {
        self.default.as_deref()
    }
}

/// Declares the element descriptor at `key[0]` in a context of its own,
/// keeping any structural violations it raises.
fn prototype<E: Element>(cx: &mut NameContext, base: &ParameterBase) -> E {
    let mut element_cx = NameContext::rooted(base.key());
    let prototype = E::declare_element(&mut element_cx, 0);
    cx.absorb(element_cx);
    prototype
}

/// Resolves every element of the stored sequence `value` at `key`.
fn resolve_elements<'t, E: Element>(
    key: &str,
    len: Option<usize>,
    value: &Value,
    tree: &'t ValueTree,
) -> Result<Vec<E::Output<'t>>> {
    let items = value.as_sequence().ok_or_else(|| {
        ErrorKind::TypeMismatch {
            expected: "sequence",
            found: value.kind(),
        }
        .at(key)
    })?;
    if let Some(expected) = len {
        if items.len() != expected {
            return Err(ErrorKind::LengthMismatch {
                expected,
                found: items.len(),
            }
            .at(key));
        }
    }

    log::trace!("Resolving {} elements of `{key}`", items.len());
    let mut cx = NameContext::rooted(key);
    (0..items.len())
        .map(|index| require(&E::declare_element(&mut cx, index), tree))
        .collect()
}

impl<E: Element> Parameter for Sequence<E> {
    fn base(&self) -> &ParameterBase {
        &self.base
    }

    fn walk(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
        self.prototype.walk(visitor);
        visitor.leave(self);
    }

    fn validate(&self, tree: &ValueTree) -> Result<()> {
        self.resolve(tree).map(drop)
    }
}

impl<E: Element> Resolve for Sequence<E> {
    type Output<'t> = Vec<E::Output<'t>>;

    fn resolve<'t>(&self, tree: &'t ValueTree) -> Result<Option<Self::Output<'t>>> {
        match self.base.lookup(tree) {
            Lookup::Found(value) => {
                resolve_elements::<E>(self.key(), self.len, value, tree).map(Some)
            }
            Lookup::Default => {
                log::debug!("Using default for `{}`", self.key());
                Ok(self
                    .default
                    .as_ref()
                    .map(|default| default.iter().map(E::default_output).collect()))
            }
            Lookup::Missing => Err(self.base.missing()),
            Lookup::Nothing => Ok(None),
        }
    }
}

impl<E: Element> Element for Sequence<E> {
    type DefaultValue = Vec<E::DefaultValue>;

    fn declare_element(cx: &mut NameContext, index: usize) -> Self {
        Self::new(cx, Name::sequence_element(index))
    }

    fn default_output<'t>(default: &Self::DefaultValue) -> Self::Output<'t> {
        default.iter().map(E::default_output).collect()
    }
}

impl<E: DefaultElement> DefaultElement for Sequence<E> {
    fn declare_element_with_default(
        cx: &mut NameContext,
        index: usize,
        default: Self::DefaultValue,
    ) -> Self {
        Self::with_default(cx, Name::sequence_element(index), default)
    }
}

/// A homogeneous list that may be absent.
#[derive(Debug)]
pub struct OptionalSequence<E: Element> {
    base: ParameterBase,
    prototype: E,
}

impl<E: Element> OptionalSequence<E> {
    /// An optional sequence.
    pub fn new(cx: &mut NameContext, name: impl Into<Name>) -> Self {
        let base =
            ParameterBase::declare(cx, &name.into(), ParameterKind::Sequence, Presence::Optional);
        Self {
            prototype: prototype(cx, &base),
            base,
        }
    }

    builder_methods!();

    /// The descriptor used to document element `0`.
    pub fn element(&self) -> &E {
        &self.prototype
    }

    /// Resolves against `tree`; `None` when absent or not in use.
    pub fn get<'t>(&self, tree: &'t ValueTree) -> Result<Option<Vec<E::Output<'t>>>> {
        self.resolve(tree)
    }

    /// Whether a value would be produced for `tree`.
    pub fn has_value(&self, tree: &ValueTree) -> bool {
        matches!(self.base.lookup(tree), Lookup::Found(_))
    }
}

impl<E: Element> Parameter for OptionalSequence<E> {
    fn base(&self) -> &ParameterBase {
        &self.base
    }

    fn walk(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
        self.prototype.walk(visitor);
        visitor.leave(self);
    }

    fn validate(&self, tree: &ValueTree) -> Result<()> {
        self.resolve(tree).map(drop)
    }
}

impl<E: Element> Resolve for OptionalSequence<E> {
    type Output<'t> = Vec<E::Output<'t>>;

    fn resolve<'t>(&self, tree: &'t ValueTree) -> Result<Option<Self::Output<'t>>> {
        match self.base.lookup(tree) {
            Lookup::Found(value) => {
                resolve_elements::<E>(self.key(), None, value, tree).map(Some)
            }
            _ => Ok(None),
        }
    }
}
