//! Capabilities shared by every parameter descriptor.

use std::fmt;

use crate::{
    Error, ErrorKind, Result,
    name::{Name, NameContext},
    tree::ValueTree,
    value::Value,
};

/// How a descriptor behaves when its key is absent or its condition is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    /// Must be present.
    Required,
    /// Must be present while the condition holds; otherwise contributes nothing.
    RequiredConditional,
    /// Falls back to a declared default.
    Default,
    /// Falls back to a declared default when absent or when the condition is false.
    DefaultConditional,
    /// May be absent.
    Optional,
    /// May be absent; contributes nothing while the condition is false.
    OptionalConditional,
}

impl Presence {
    /// Whether resolution consults a condition.
    pub fn is_conditional(self) -> bool {
        matches!(
            self,
            Presence::RequiredConditional
                | Presence::DefaultConditional
                | Presence::OptionalConditional
        )
    }

    /// Whether absence is acceptable without a default.
    pub fn is_optional(self) -> bool {
        matches!(self, Presence::Optional | Presence::OptionalConditional)
    }

    /// Whether a default stands in for an absent value.
    pub fn has_default(self) -> bool {
        matches!(self, Presence::Default | Presence::DefaultConditional)
    }

    fn conditional(self) -> Self {
        match self {
            Presence::Required | Presence::RequiredConditional => Presence::RequiredConditional,
            Presence::Default | Presence::DefaultConditional => Presence::DefaultConditional,
            Presence::Optional | Presence::OptionalConditional => Presence::OptionalConditional,
        }
    }
}

/// Structural category of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    /// A single scalar or complex value.
    Atom,
    /// A homogeneous, variable-length list.
    Sequence,
    /// A fixed-arity heterogeneous list.
    Tuple,
    /// A named sub-table.
    Table,
    /// Members spliced into the enclosing table.
    TableFragment,
}

/// A predicate deciding, per tree, whether a conditional descriptor is in use.
pub struct Condition(Box<dyn Fn(&ValueTree) -> bool>);

impl Condition {
    /// Wraps `predicate`.
    pub fn new(predicate: impl Fn(&ValueTree) -> bool + 'static) -> Self {
        Self(Box::new(predicate))
    }

    /// Evaluates the predicate against `tree`.
    pub fn holds(&self, tree: &ValueTree) -> bool {
        (self.0)(tree)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition(..)")
    }
}

/// Where a descriptor's value comes from for one particular tree.
pub(crate) enum Lookup<'t> {
    Found(&'t Value),
    Default,
    Missing,
    Nothing,
}

/// Name, documentation, and presence policy common to all descriptors.
#[derive(Debug)]
pub struct ParameterBase {
    name: String,
    key: String,
    comment: String,
    kind: ParameterKind,
    presence: Presence,
    condition: Option<Condition>,
}

impl ParameterBase {
    /// Qualifies `name` against `cx` and records the declaration there.
    pub(crate) fn declare(
        cx: &mut NameContext,
        name: &Name,
        kind: ParameterKind,
        presence: Presence,
    ) -> Self {
        let key = cx.qualify(name);
        cx.register(&key, kind);
        Self {
            name: name.segment().to_string(),
            key,
            comment: String::new(),
            kind,
            presence,
            condition: None,
        }
    }

    /// A base that shares the enclosing scope's key instead of adding a level.
    pub(crate) fn fragment(cx: &NameContext) -> Self {
        Self {
            name: String::new(),
            key: cx.current().to_owned(),
            comment: String::new(),
            kind: ParameterKind::TableFragment,
            presence: Presence::Required,
            condition: None,
        }
    }

    /// Local name within the parent.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Documentation text.
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Structural category.
    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    /// Presence policy.
    pub fn presence(&self) -> Presence {
        self.presence
    }

    /// Whether the descriptor's condition holds for `tree`; true when unconditional.
    pub fn is_active(&self, tree: &ValueTree) -> bool {
        self.condition
            .as_ref()
            .is_none_or(|condition| condition.holds(tree))
    }

    pub(crate) fn set_comment(&mut self, comment: String) {
        self.comment = comment;
    }

    pub(crate) fn set_condition(&mut self, condition: Condition) {
        self.presence = self.presence.conditional();
        self.condition = Some(condition);
    }

    pub(crate) fn missing(&self) -> Error {
        ErrorKind::MissingRequiredParameter.at(&self.key)
    }

    /// Applies the presence policy to `tree`.
    pub(crate) fn lookup<'t>(&self, tree: &'t ValueTree) -> Lookup<'t> {
        use Presence::*;

        if self.presence.is_conditional() && !self.is_active(tree) {
            log::trace!("Condition for `{}` does not hold", self.key);
            return match self.presence {
                DefaultConditional => Lookup::Default,
                _ => Lookup::Nothing,
            };
        }

        match (tree.find(&self.key).ok(), self.presence) {
            (Some(value), _) => Lookup::Found(value),
            (None, Required | RequiredConditional) => Lookup::Missing,
            (None, Default | DefaultConditional) => Lookup::Default,
            (None, Optional | OptionalConditional) => Lookup::Nothing,
        }
    }
}

/// Object-safe view of any descriptor, for tooling that walks heterogeneous
/// descriptor trees.
pub trait Parameter {
    /// The shared descriptor state.
    fn base(&self) -> &ParameterBase;

    /// Calls `visitor` for this descriptor and, for composites, its children.
    fn walk(&self, visitor: &mut dyn Visitor);

    /// Resolves against `tree`, discarding the result.
    fn validate(&self, tree: &ValueTree) -> Result<()>;

    /// Fully qualified key.
    fn key(&self) -> &str {
        self.base().key()
    }

    /// Local name within the parent.
    fn name(&self) -> &str {
        self.base().name()
    }

    /// Documentation text.
    fn comment(&self) -> &str {
        self.base().comment()
    }

    /// Presence policy.
    fn presence(&self) -> Presence {
        self.base().presence()
    }

    /// Structural category.
    fn kind(&self) -> ParameterKind {
        self.base().kind()
    }
}

/// Receives descriptors during [`Parameter::walk`].
pub trait Visitor {
    /// Called for every descriptor, parents before children.
    fn visit(&mut self, parameter: &dyn Parameter);

    /// Called after a composite's children have been walked.
    fn leave(&mut self, _parameter: &dyn Parameter) {}
}

/// Typed resolution of a descriptor against a tree.
pub trait Resolve: Parameter {
    /// The materialized value; may borrow from the tree.
    type Output<'t>;

    /// Produces the typed value, or `None` when the descriptor contributes nothing.
    fn resolve<'t>(&self, tree: &'t ValueTree) -> Result<Option<Self::Output<'t>>>;
}

/// Descriptors allowed as sequence elements and tuple positions.
///
/// Optional descriptors and table fragments do not implement this, so nesting
/// them positionally is rejected when the schema is compiled.
///
/// ```compile_fail
/// # use kdl_params::{NameContext, OptionalAtom, Sequence};
/// let mut cx = NameContext::new();
/// let tags = Sequence::<OptionalAtom<String>>::new(&mut cx, "tags");
/// ```
pub trait Element: Resolve + Sized {
    /// Type of a default for this element; uninhabited for table-like
    /// descriptors, which cannot be defaulted.
    type DefaultValue: Clone;

    /// Declares the descriptor for position `index` of the enclosing scope.
    fn declare_element(cx: &mut NameContext, index: usize) -> Self;

    /// Turns a default into the resolved output.
    fn default_output<'t>(default: &Self::DefaultValue) -> Self::Output<'t>;
}

/// Elements that accept a per-position default.
pub trait DefaultElement: Element {
    /// Declares position `index` with `default`.
    fn declare_element_with_default(
        cx: &mut NameContext,
        index: usize,
        default: Self::DefaultValue,
    ) -> Self;
}

/// Resolves an element that must produce a value.
pub(crate) fn require<'t, E: Resolve>(element: &E, tree: &'t ValueTree) -> Result<E::Output<'t>> {
    element
        .resolve(tree)?
        .ok_or_else(|| element.base().missing())
}

macro_rules! builder_methods {
    () => {
        /// Attaches documentation text.
        pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
            self.base.set_comment(comment.into());
            self
        }

        /// Makes presence conditional on `condition`, evaluated against the
        /// tree being resolved.
        pub fn when(
            mut self,
            condition: impl Fn(&$crate::ValueTree) -> bool + 'static,
        ) -> Self {
            self.base.set_condition($crate::Condition::new(condition));
            self
        }
    };
}
pub(crate) use builder_methods;
