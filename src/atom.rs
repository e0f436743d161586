use crate::{
    Result,
    codec::Decode,
    name::{Name, NameContext},
    param::{
        DefaultElement, Element, Lookup, Parameter, ParameterBase, ParameterKind, Presence,
        Resolve, Visitor, builder_methods,
    },
    tree::ValueTree,
};

/// A single scalar or complex parameter.
///
/// ```
/// # use kdl_params::{Atom, NameContext};
/// let mut cx = NameContext::new();
/// let threads = Atom::<u32>::with_default(&mut cx, "threads", 4).with_comment("worker threads");
/// let tree = kdl_params::from_str("threads 8").unwrap();
/// assert_eq!(threads.get(&tree).unwrap(), 8);
/// ```
#[derive(Debug)]
pub struct Atom<T> {
    base: ParameterBase,
    default: Option<T>,
}

impl<T: Decode + Clone> Atom<T> {
    /// A required atom.
    pub fn new(cx: &mut NameContext, name: impl Into<Name>) -> Self {
        Self {
            base: ParameterBase::declare(cx, &name.into(), ParameterKind::Atom, Presence::Required),
            default: None,
        }
    }

    /// An atom that falls back to `default` when absent.
    pub fn with_default(cx: &mut NameContext, name: impl Into<Name>, default: T) -> Self {
        Self {
            base: ParameterBase::declare(cx, &name.into(), ParameterKind::Atom, Presence::Default),
            default: Some(default),
        }
    }

    builder_methods!();

    /// The declared default, if any.
    pub fn default_value(&self) -> Option<&T> {
        self.default.as_ref()
    }

    /// Resolves against `tree`, failing when no value is produced.
    pub fn get(&self, tree: &ValueTree) -> Result<T> {
        self.resolve(tree)?.ok_or_else(|| self.base.missing())
    }
}

impl<T: Decode + Clone> Parameter for Atom<T> {
    fn base(&self) -> &ParameterBase {
        &self.base
    }

    fn walk(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
    }

    fn validate(&self, tree: &ValueTree) -> Result<()> {
        self.resolve(tree).map(drop)
    }
}

impl<T: Decode + Clone> Resolve for Atom<T> {
    type Output<'t> = T;

    fn resolve<'t>(&self, tree: &'t ValueTree) -> Result<Option<T>> {
        match self.base.lookup(tree) {
            Lookup::Found(value) => T::decode(value).map(Some).map_err(|e| e.at(self.key())),
            Lookup::Default => {
                log::debug!("Using default for `{}`", self.key());
                Ok(self.default.clone())
            }
            Lookup::Missing => Err(self.base.missing()),
            Lookup::Nothing => Ok(None),
        }
    }
}

impl<T: Decode + Clone> Element for Atom<T> {
    type DefaultValue = T;

    fn declare_element(cx: &mut NameContext, index: usize) -> Self {
        Self::new(cx, Name::sequence_element(index))
    }

    fn default_output<'t>(default: &T) -> Self::Output<'t> {
        default.clone()
    }
}

impl<T: Decode + Clone> DefaultElement for Atom<T> {
    fn declare_element_with_default(cx: &mut NameContext, index: usize, default: T) -> Self {
        Self::with_default(cx, Name::sequence_element(index), default)
    }
}

/// A scalar or complex parameter that may be absent.
#[derive(Debug)]
pub struct OptionalAtom<T> {
    base: ParameterBase,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Decode> OptionalAtom<T> {
    /// An optional atom.
    pub fn new(cx: &mut NameContext, name: impl Into<Name>) -> Self {
        Self {
            base: ParameterBase::declare(cx, &name.into(), ParameterKind::Atom, Presence::Optional),
            _marker: std::marker::PhantomData,
        }
    }

    builder_methods!();

    /// Resolves against `tree`; `None` when absent or not in use.
    pub fn get(&self, tree: &ValueTree) -> Result<Option<T>> {
        self.resolve(tree)
    }

    /// Whether a value would be produced for `tree`.
    pub fn has_value(&self, tree: &ValueTree) -> bool {
        matches!(self.base.lookup(tree), Lookup::Found(_))
    }
}

impl<T: Decode> Parameter for OptionalAtom<T> {
    fn base(&self) -> &ParameterBase {
        &self.base
    }

    fn walk(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
    }

    fn validate(&self, tree: &ValueTree) -> Result<()> {
        self.resolve(tree).map(drop)
    }
}

impl<T: Decode> Resolve for OptionalAtom<T> {
    type Output<'t> = T;

    fn resolve<'t>(&self, tree: &'t ValueTree) -> Result<Option<T>> {
        match self.base.lookup(tree) {
            Lookup::Found(value) => T::decode(value).map(Some).map_err(|e| e.at(self.key())),
            _ => Ok(None),
        }
    }
}
