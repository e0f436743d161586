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

/// A fixed list of element descriptors, one per tuple position.
///
/// Implemented for Rust tuples of [`Element`]s up to arity 8. Position `i` is
/// declared under the name `[i]` of the enclosing tuple.
pub trait TupleElements: Sized {
    /// One resolved value per position.
    type Output<'t>;
    /// One default per position.
    type Defaults: Clone;
    /// Number of positions.
    const ARITY: usize;

    /// Declares every position in the current scope of `cx`.
    fn declare(cx: &mut NameContext) -> Self;

    /// Resolves every position; each must produce a value.
    fn resolve<'t>(&self, tree: &'t ValueTree) -> Result<Self::Output<'t>>;

    /// Turns per-position defaults into the resolved output.
    fn default_output<'t>(defaults: &Self::Defaults) -> Self::Output<'t>;

    /// Calls `f` for every position, in order.
    fn for_each(&self, f: &mut dyn FnMut(&dyn Parameter));
}

/// Tuples whose every position accepts a default.
pub trait TupleDefaults: TupleElements {
    /// Declares every position with its entry of `defaults`.
    fn declare_with_defaults(cx: &mut NameContext, defaults: Self::Defaults) -> Self;
}

macro_rules! impl_tuple {
    ($arity:literal; $($idx:tt $E:ident),+) => {
        impl<$($E: Element),+> TupleElements for ($($E,)+) {
            type Output<'t> = ($($E::Output<'t>,)+);
            type Defaults = ($($E::DefaultValue,)+);
            const ARITY: usize = $arity;

            fn declare(cx: &mut NameContext) -> Self {
                ($($E::declare_element(cx, $idx),)+)
            }

            fn resolve<'t>(&self, tree: &'t ValueTree) -> Result<Self::Output<'t>> {
                Ok(($(require(&self.$idx, tree)?,)+))
            }

            fn default_output<'t>(defaults: &Self::Defaults) -> Self::Output<'t> {
                ($($E::default_output(&defaults.$idx),)+)
            }

            fn for_each(&self, f: &mut dyn FnMut(&dyn Parameter)) {
                $(f(&self.$idx);)+
            }
        }

        impl<$($E: DefaultElement),+> TupleDefaults for ($($E,)+) {
            fn declare_with_defaults(cx: &mut NameContext, defaults: Self::Defaults) -> Self {
                ($($E::declare_element_with_default(cx, $idx, defaults.$idx),)+)
            }
        }
    };
}

impl_tuple!(1; 0 A);
impl_tuple!(2; 0 A, 1 B);
impl_tuple!(3; 0 A, 1 B, 2 C);
impl_tuple!(4; 0 A, 1 B, 2 C, 3 D);
impl_tuple!(5; 0 A, 1 B, 2 C, 3 D, 4 E);
impl_tuple!(6; 0 A, 1 B, 2 C, 3 D, 4 E, 5 F);
impl_tuple!(7; 0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G);
impl_tuple!(8; 0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G, 7 H);

fn check_arity<E: TupleElements>(key: &str, value: &Value) -> Result<()> {
    let items = value.as_sequence().ok_or_else(|| {
        ErrorKind::TypeMismatch {
            expected: "sequence",
            found: value.kind(),
        }
        .at(key)
    })?;
    if items.len() != E::ARITY {
        return Err(ErrorKind::LengthMismatch {
            expected: E::ARITY,
            found: items.len(),
        }
        .at(key));
    }
    Ok(())
}

fn walk_elements<E: TupleElements>(
    parameter: &dyn Parameter,
    elements: &E,
    visitor: &mut dyn Visitor,
) {
    visitor.visit(parameter);
    elements.for_each(&mut |element| element.walk(visitor));
    visitor.leave(parameter);
}

/// A fixed-arity list with an independently typed descriptor per position.
///
/// ```
/// # use kdl_params::{Atom, NameContext, Tuple};
/// let mut cx = NameContext::new();
/// let endpoint = Tuple::<(Atom<String>, Atom<u16>)>::new(&mut cx, "endpoint");
/// let tree = kdl_params::from_str(r#"endpoint "localhost" 8080"#).unwrap();
/// let (host, port) = endpoint.get(&tree).unwrap();
/// assert_eq!((host.as_str(), port), ("localhost", 8080));
/// ```
#[derive(Debug)]
pub struct Tuple<E: TupleElements> {
    base: ParameterBase,
    elements: E,
    defaults: Option<E::Defaults>,
}

impl<E: TupleElements> Tuple<E> {
    /// A required tuple.
    pub fn new(cx: &mut NameContext, name: impl Into<Name>) -> Self {
        let name = name.into();
        let base = ParameterBase::declare(cx, &name, ParameterKind::Tuple, Presence::Required);
        let elements = E::declare(&mut cx.enter(&name));
        Self {
            base,
            elements,
            defaults: None,
        }
    }

    builder_methods!();

    /// The per-position descriptors.
    pub fn elements(&self) -> &E {
        &self.elements
    }

    /// Resolves against `tree`, failing when no value is produced.
    pub fn get<'t>(&self, tree: &'t ValueTree) -> Result<E::Output<'t>> {
        require(self, tree)
    }
}

impl<E: TupleDefaults> Tuple<E> {
    /// A tuple whose positions fall back to `defaults` when the tuple is absent.
    pub fn with_defaults(cx: &mut NameContext, name: impl Into<Name>, defaults: E::Defaults) -> Self {
        let name = name.into();
        let base = ParameterBase::declare(cx, &name, ParameterKind::Tuple, Presence::Default);
        let elements = E::declare_with_defaults(&mut cx.enter(&name), defaults.clone());
        Self {
            base,
            elements,
            defaults: Some(defaults),
        }
    }

    /// The declared defaults, if any.
    pub fn defaults(&self) -> Option<&E::Defaults> {
        self.defaults.as_ref()
    }
}

impl<E: TupleElements> Parameter for Tuple<E> {
    fn base(&self) -> &ParameterBase {
        &self.base
    }

    fn walk(&self, visitor: &mut dyn Visitor) {
        walk_elements(self, &self.elements, visitor);
    }

    fn validate(&self, tree: &ValueTree) -> Result<()> {
        self.resolve(tree).map(drop)
    }
}

impl<E: TupleElements> Resolve for Tuple<E> {
    type Output<'t> = E::Output<'t>;

    fn resolve<'t>(&self, tree: &'t ValueTree) -> Result<Option<E::Output<'t>>> {
        match self.base.lookup(tree) {
            Lookup::Found(value) => {
                check_arity::<E>(self.key(), value)?;
                self.elements.resolve(tree).map(Some)
            }
            Lookup::Default => {
                log::debug!("Using defaults for `{}`", self.key());
                Ok(self.defaults.as_ref().map(E::default_output))
            }
            Lookup::Missing => Err(self.base.missing()),
            Lookup::Nothing => Ok(None),
        }
    }
}

impl<E: TupleElements> Element for Tuple<E> {
    type DefaultValue = E::Defaults;

    fn declare_element(cx: &mut NameContext, index: usize) -> Self {
        Self::new(cx, Name::sequence_element(index))
    }

    fn default_output<'t>(default: &E::Defaults) -> Self::Output<'t> {
        E::default_output(default)
    }
}

impl<E: TupleDefaults> DefaultElement for Tuple<E> {
    fn declare_element_with_default(
        cx: &mut NameContext,
        index: usize,
        default: E::Defaults,
    ) -> Self {
        Self::with_defaults(cx, Name::sequence_element(index), default)
    }
}

/// A fixed-arity list that may be absent.
#[derive(Debug)]
pub struct OptionalTuple<E> {
    base: ParameterBase,
    elements: E,
}

impl<E: TupleElements> OptionalTuple<E> {
    /// An optional tuple.
    pub fn new(cx: &mut NameContext, name: impl Into<Name>) -> Self {
        let name = name.into();
        let base = ParameterBase::declare(cx, &name, ParameterKind::Tuple, Presence::Optional);
        let elements = E::declare(&mut cx.enter(&name));
        Self { base, elements }
    }

    builder_methods!();

    /// The per-position descriptors.
    pub fn elements(&self) -> &E {
        &self.elements
    }

    /// Resolves against `tree`; `None` when absent or not in use.
    pub fn get<'t>(&self, tree: &'t ValueTree) -> Result<Option<E::Output<'t>>> {
        self.resolve(tree)
    }

    /// Whether a value would be produced for `tree`.
    pub fn has_value(&self, tree: &ValueTree) -> bool {
        matches!(self.base.lookup(tree), Lookup::Found(_))
    }
}

impl<E: TupleElements> Parameter for OptionalTuple<E> {
    fn base(&self) -> &ParameterBase {
        &self.base
    }

    fn walk(&self, visitor: &mut dyn Visitor) {
        walk_elements(self, &self.elements, visitor);
    }

    fn validate(&self, tree: &ValueTree) -> Result<()> {
        self.resolve(tree).map(drop)
    }
}

impl<E: TupleElements> Resolve for OptionalTuple<E> {
    type Output<'t> = E::Output<'t>;

    fn resolve<'t>(&self, tree: &'t ValueTree) -> Result<Option<E::Output<'t>>> {
        match self.base.lookup(tree) {
            Lookup::Found(value) => {
                check_arity::<E>(self.key(), value)?;
                self.elements.resolve(tree).map(Some)
            }
            _ => Ok(None),
        }
    }
}
