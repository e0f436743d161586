use std::{convert::Infallible, ops::Deref};

use crate::{
    ErrorKind, Result,
    name::{Name, NameContext},
    param::{
        Element, Lookup, Parameter, ParameterBase, ParameterKind, Presence, Resolve, Visitor,
        builder_methods, require,
    },
    tree::ValueTree,
    value::{Value, ValueKind},
};

/// A user-defined aggregate of descriptors describing one table.
///
/// `declare` constructs every member against `cx`, which is already positioned
/// at the table's own key; `members` lists them for validation and walking.
///
/// ```
/// use kdl_params::{Atom, NameContext, Parameter, TableSchema};
///
/// struct Server {
///     host: Atom<String>,
///     port: Atom<u16>,
/// }
///
/// impl TableSchema for Server {
///     fn declare(cx: &mut NameContext) -> Self {
///         Self {
///             host: Atom::new(cx, "host"),
///             port: Atom::with_default(cx, "port", 8080),
///         }
///     }
///
///     fn members(&self) -> Vec<&dyn Parameter> {
///         vec![&self.host, &self.port]
///     }
/// }
/// ```
pub trait TableSchema: Sized {
    /// Declares the members.
    fn declare(cx: &mut NameContext) -> Self;

    /// The declared members, in declaration order.
    fn members(&self) -> Vec<&dyn Parameter>;
}

/// A schema `C` resolved against one tree.
///
/// Dereferences to `C`, so members are read with
/// `resolved.get(&resolved.member)`.
#[derive(Debug)]
pub struct Resolved<'t, C> {
    schema: C,
    tree: &'t ValueTree,
}

impl<'t, C: TableSchema> Resolved<'t, C> {
    /// Declares `C` at `key` and validates every member against `tree`.
    pub(crate) fn materialize(key: &str, tree: &'t ValueTree) -> Result<Self> {
        log::trace!("Materializing table at `{key}`");
        let mut cx = NameContext::rooted(key);
        let resolved = Self {
            schema: C::declare(&mut cx),
            tree,
        };
        for member in resolved.schema.members() {
            member.validate(tree)?;
        }
        Ok(resolved)
    }

    pub(crate) fn from_parts(schema: C, tree: &'t ValueTree) -> Self {
        Self { schema, tree }
    }
}

impl<'t, C> Resolved<'t, C> {
    /// The tree the schema was resolved against.
    pub fn tree(&self) -> &'t ValueTree {
        self.tree
    }

    /// The member value `parameter` produces, failing when it produces none.
    pub fn get<P: Resolve>(&self, parameter: &P) -> Result<P::Output<'t>> {
        require(parameter, self.tree)
    }

    /// The member value `parameter` produces, if any.
    pub fn get_opt<P: Resolve>(&self, parameter: &P) -> Result<Option<P::Output<'t>>> {
        parameter.resolve(self.tree)
    }

    /// Gives up the tree borrow, keeping the declared schema.
    pub fn into_schema(self) -> C {
        self.schema
    }
}

impl<C> Deref for Resolved<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.schema
    }
}

fn expect_table(key: &str, value: &Value) -> Result<()> {
    if value.is_a(ValueKind::Table) {
        return Ok(());
    }
    Err(ErrorKind::TypeMismatch {
        expected: "table",
        found: value.kind(),
    }
    .at(key))
}

fn walk_members(parameter: &dyn Parameter, members: Vec<&dyn Parameter>, visitor: &mut dyn Visitor) {
    visitor.visit(parameter);
    for member in members {
        member.walk(visitor);
    }
    visitor.leave(parameter);
}

/// A named sub-table described by `C`.
#[derive(Debug)]
pub struct Table<C> {
    base: ParameterBase,
    schema: C,
}

impl<C: TableSchema> Table<C> {
    /// A required table.
    ///
    /// When the key is absent the members are still resolved, so a table made
    /// up only of defaulted members may be left out of the document. Unlike a
    /// required atom or sequence, an absent table never fails with
    /// [`MissingRequiredParameter`](crate::ErrorKind::MissingRequiredParameter)
    /// itself; only its required members do.
    pub fn new(cx: &mut NameContext, name: impl Into<Name>) -> Self {
        let name = name.into();
        let base = ParameterBase::declare(cx, &name, ParameterKind::Table, Presence::Required);
        let schema = C::declare(&mut cx.enter(&name));
        Self { base, schema }
    }

    builder_methods!();

    /// The members as declared in the schema.
    pub fn schema(&self) -> &C {
        &self.schema
    }

    /// Resolves against `tree`, failing when no value is produced.
    pub fn get<'t>(&self, tree: &'t ValueTree) -> Result<Resolved<'t, C>> {
        require(self, tree)
    }
}

impl<C: TableSchema> Parameter for Table<C> {
    fn base(&self) -> &ParameterBase {
        &self.base
    }

    fn walk(&self, visitor: &mut dyn Visitor) {
        walk_members(self, self.schema.members(), visitor);
    }

    fn validate(&self, tree: &ValueTree) -> Result<()> {
        self.resolve(tree).map(drop)
    }
}

impl<C: TableSchema> Resolve for Table<C> {
    type Output<'t> = Resolved<'t, C>;

    fn resolve<'t>(&self, tree: &'t ValueTree) -> Result<Option<Resolved<'t, C>>> {
        match self.base.lookup(tree) {
            Lookup::Found(value) => {
                expect_table(self.key(), value)?;
                Resolved::materialize(self.key(), tree).map(Some)
            }
            Lookup::Missing | Lookup::Default => {
                log::debug!("Table `{}` is absent, resolving its members", self.key());
                Resolved::materialize(self.key(), tree).map(Some)
            }
            Lookup::Nothing => Ok(None),
        }
    }
}

impl<C: TableSchema> Element for Table<C> {
    type DefaultValue = Infallible;

    fn declare_element(cx: &mut NameContext, index: usize) -> Self {
        Self::new(cx, Name::sequence_element(index))
    }

    fn default_output<'t>(default: &Infallible) -> Self::Output<'t> {
        match *default {}
    }
}

/// A named sub-table that may be absent.
#[derive(Debug)]
pub struct OptionalTable<C> {
    base: ParameterBase,
    schema: C,
}

impl<C: TableSchema> OptionalTable<C> {
    /// An optional table.
    pub fn new(cx: &mut NameContext, name: impl Into<Name>) -> Self {
        Self::declare(cx, name.into(), Presence::Optional)
    }

    pub(crate) fn declare(cx: &mut NameContext, name: Name, presence: Presence) -> Self {
        let base = ParameterBase::declare(cx, &name, ParameterKind::Table, presence);
        let schema = C::declare(&mut cx.enter(&name));
        Self { base, schema }
    }

    builder_methods!();

    /// The members as declared in the schema.
    pub fn schema(&self) -> &C {
        &self.schema
    }

    /// Resolves against `tree`; `None` when absent or not in use.
    pub fn get<'t>(&self, tree: &'t ValueTree) -> Result<Option<Resolved<'t, C>>> {
        self.resolve(tree)
    }

    /// Whether a value would be produced for `tree`.
    pub fn has_value(&self, tree: &ValueTree) -> bool {
        matches!(self.base.lookup(tree), Lookup::Found(_))
    }

    pub(crate) fn base_mut(&mut self) -> &mut ParameterBase {
        &mut self.base
    }

    /// Applies the presence policy, resolving the table only when it is stored.
    pub(crate) fn lookup<'t>(&self, tree: &'t ValueTree) -> Result<Lookup<'t>> {
        match self.base.lookup(tree) {
            Lookup::Found(value) => expect_table(self.key(), value).map(|()| Lookup::Found(value)),
            other => Ok(other),
        }
    }
}

impl<C: TableSchema> Parameter for OptionalTable<C> {
    fn base(&self) -> &ParameterBase {
        &self.base
    }

    fn walk(&self, visitor: &mut dyn Visitor) {
        walk_members(self, self.schema.members(), visitor);
    }

    fn validate(&self, tree: &ValueTree) -> Result<()> {
        self.resolve(tree).map(drop)
    }
}

impl<C: TableSchema> Resolve for OptionalTable<C> {
    type Output<'t> = Resolved<'t, C>;

    fn resolve<'t>(&self, tree: &'t ValueTree) -> Result<Option<Resolved<'t, C>>> {
        match self.lookup(tree)? {
            Lookup::Found(_) => Resolved::materialize(self.key(), tree).map(Some),
            _ => Ok(None),
        }
    }
}

/// Members of `C` spliced into the enclosing table without a name of their own.
///
/// Lets several schemas share a common block of parameters. A fragment is
/// only allowed as a table member; it is not an [`Element`].
#[derive(Debug)]
pub struct TableFragment<C> {
    base: ParameterBase,
    schema: C,
}

impl<C: TableSchema> TableFragment<C> {
    /// Declares the members of `C` directly in the current scope of `cx`.
    pub fn new(cx: &mut NameContext) -> Self {
        Self {
            base: ParameterBase::fragment(cx),
            schema: C::declare(cx),
        }
    }

    /// Resolves against `tree`.
    pub fn get<'t>(&self, tree: &'t ValueTree) -> Result<Resolved<'t, C>> {
        require(self, tree)
    }
}

impl<C: TableSchema> Deref for TableFragment<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.schema
    }
}

impl<C: TableSchema> Parameter for TableFragment<C> {
    fn base(&self) -> &ParameterBase {
        &self.base
    }

    fn walk(&self, visitor: &mut dyn Visitor) {
        walk_members(self, self.schema.members(), visitor);
    }

    fn validate(&self, tree: &ValueTree) -> Result<()> {
        self.schema
            .members()
            .into_iter()
            .try_for_each(|member| member.validate(tree))
    }
}

impl<C: TableSchema> Resolve for TableFragment<C> {
    type Output<'t> = Resolved<'t, C>;

    fn resolve<'t>(&self, tree: &'t ValueTree) -> Result<Option<Resolved<'t, C>>> {
        self.validate(tree)?;
        let mut cx = NameContext::rooted(self.key());
        Ok(Some(Resolved::from_parts(C::declare(&mut cx), tree)))
    }
}
