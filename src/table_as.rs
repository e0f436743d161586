use std::convert::Infallible;

use facet_core::Facet;
use facet_reflect::Peek;

use crate::{
    ErrorKind, Result,
    name::{Name, NameContext},
    param::{Condition, Element, Lookup, Parameter, ParameterBase, Presence, Resolve, Visitor},
    table::{OptionalTable, Resolved, TableSchema},
    tree::ValueTree,
};

/// Conversion from a resolved schema `C` into a user type.
///
/// Implemented by the target type, so the adapter finds the conversion from
/// its type parameters alone.
pub trait FromTable<C: TableSchema>: Sized {
    /// Builds `Self` from the members of a resolved table.
    fn from_table(table: Resolved<'_, C>) -> Result<Self>;
}

const PREFACE: &str = "N.B. The following table is converted to type:";

fn type_name<T: Facet<'static>>() -> String {
    T::SHAPE.to_string()
}

/// The documentation preface naming the target type and, when given, the
/// default, followed by the user's own comment.
fn conversion_comment<T: Facet<'static>>(default: Option<&T>, comment: &str) -> String {
    let mut out = format!("{PREFACE}\n        '{}'", type_name::<T>());
    if let Some(default) = default {
        let rendered = facet_pretty::PrettyPrinter::new()
            .with_colors(false)
            .format_peek(Peek::new(default));
        out.push_str("\n        with a default value of:\n           ");
        out.push_str(&rendered.replace('\n', "\n           "));
    }
    if !comment.is_empty() {
        out.push_str("\n\n");
        out.push_str(comment);
    }
    out
}

/// Resolves the stored table at `key` and hands it to `T::from_table`.
fn convert<T: FromTable<C>, C: TableSchema>(key: &str, tree: &ValueTree) -> Result<T> {
    let resolved = Resolved::<C>::materialize(key, tree)?;
    log::trace!("Converting `{key}` to its target type");
    T::from_table(resolved).map_err(|e| e.at(key))
}

/// A table described by `C`, delivered as a `T` built by [`FromTable`].
///
/// ```
/// # use kdl_params::{Atom, FromTable, NameContext, Parameter, Resolved, TableAs, TableSchema};
/// # use facet::Facet;
/// #[derive(Facet, Clone, Debug, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// struct PointConfig {
///     x: Atom<i32>,
///     y: Atom<i32>,
/// }
///
/// impl TableSchema for PointConfig {
///     fn declare(cx: &mut NameContext) -> Self {
///         Self { x: Atom::new(cx, "x"), y: Atom::new(cx, "y") }
///     }
///
///     fn members(&self) -> Vec<&dyn Parameter> {
///         vec![&self.x, &self.y]
///     }
/// }
///
/// impl FromTable<PointConfig> for Point {
///     fn from_table(table: Resolved<'_, PointConfig>) -> kdl_params::Result<Self> {
///         Ok(Point { x: table.get(&table.x)?, y: table.get(&table.y)? })
///     }
/// }
///
/// let mut cx = NameContext::new();
/// let origin = TableAs::<Point, PointConfig>::with_default(&mut cx, "origin", Point { x: 0, y: 0 });
/// let tree = kdl_params::from_str("origin x=3 y=4").unwrap();
/// assert_eq!(origin.get(&tree).unwrap(), Point { x: 3, y: 4 });
/// assert!(origin.comment().starts_with("N.B. The following table is converted to type:"));
/// ```
#[derive(Debug)]
pub struct TableAs<T, C> {
    table: OptionalTable<C>,
    default: Option<T>,
}

impl<T, C> TableAs<T, C>
where
    T: FromTable<C> + Facet<'static> + Clone,
    C: TableSchema,
{
    /// An adapter that fails with [`ErrorKind::CannotResolve`] when the table is absent.
    pub fn new(cx: &mut NameContext, name: impl Into<Name>) -> Self {
        let mut table = OptionalTable::declare(cx, name.into(), Presence::Required);
        table
            .base_mut()
            .set_comment(conversion_comment::<T>(None, ""));
        Self {
            table,
            default: None,
        }
    }

    /// An adapter that yields `default` when the table is absent.
    pub fn with_default(cx: &mut NameContext, name: impl Into<Name>, default: T) -> Self {
        let mut table = OptionalTable::declare(cx, name.into(), Presence::Default);
        table
            .base_mut()
            .set_comment(conversion_comment(Some(&default), ""));
        Self {
            table,
            default: Some(default),
        }
    }

    /// Attaches documentation text after the conversion preface.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        let comment = conversion_comment(self.default.as_ref(), &comment.into());
        self.table.base_mut().set_comment(comment);
        self
    }

    /// Makes presence conditional on `condition`, evaluated against the tree
    /// being resolved.
    pub fn when(mut self, condition: impl Fn(&ValueTree) -> bool + 'static) -> Self {
        self.table
            .base_mut()
            .set_condition(Condition::new(condition));
        self
    }

    /// The declared default, if any.
    pub fn default_value(&self) -> Option<&T> {
        self.default.as_ref()
    }

    /// Resolves against `tree`, failing when no value is produced.
    pub fn get(&self, tree: &ValueTree) -> Result<T> {
        self.resolve(tree)?
            .ok_or_else(|| self.table.base().missing())
    }
}

impl<T, C> Parameter for TableAs<T, C>
where
    T: FromTable<C> + Facet<'static> + Clone,
    C: TableSchema,
{
    fn base(&self) -> &ParameterBase {
        self.table.base()
    }

    fn walk(&self, visitor: &mut dyn Visitor) {
        self.table.walk(visitor);
    }

    fn validate(&self, tree: &ValueTree) -> Result<()> {
        self.resolve(tree).map(drop)
    }
}

impl<T, C> Resolve for TableAs<T, C>
where
    T: FromTable<C> + Facet<'static> + Clone,
    C: TableSchema,
{
    type Output<'t> = T;

    fn resolve<'t>(&self, tree: &'t ValueTree) -> Result<Option<T>> {
        match self.table.lookup(tree)? {
            Lookup::Found(_) => convert::<T, C>(self.key(), tree).map(Some),
            Lookup::Default => {
                log::debug!("Using default for `{}`", self.key());
                Ok(self.default.clone())
            }
            Lookup::Missing => Err(ErrorKind::CannotResolve {
                type_name: type_name::<T>(),
            }
            .at(self.key())),
            Lookup::Nothing => Ok(None),
        }
    }
}

impl<T, C> Element for TableAs<T, C>
where
    T: FromTable<C> + Facet<'static> + Clone,
    C: TableSchema,
{
    type DefaultValue = Infallible;

    fn declare_element(cx: &mut NameContext, index: usize) -> Self {
        Self::new(cx, Name::sequence_element(index))
    }

    fn default_output<'t>(default: &Infallible) -> Self::Output<'t> {
        match *default {}
    }
}

/// A table adapter that yields nothing when the table is absent.
#[derive(Debug)]
pub struct OptionalTableAs<T, C> {
    table: OptionalTable<C>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T, C> OptionalTableAs<T, C>
where
    T: FromTable<C> + Facet<'static>,
    C: TableSchema,
{
    /// An optional adapter.
    pub fn new(cx: &mut NameContext, name: impl Into<Name>) -> Self {
        let mut table = OptionalTable::declare(cx, name.into(), Presence::Optional);
        table
            .base_mut()
            .set_comment(conversion_comment::<T>(None, ""));
        Self {
            table,
            _marker: std::marker::PhantomData,
        }
    }

    /// Attaches documentation text after the conversion preface.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        let comment = conversion_comment::<T>(None, &comment.into());
        self.table.base_mut().set_comment(comment);
        self
    }

    /// Makes presence conditional on `condition`, evaluated against the tree
    /// being resolved.
    pub fn when(mut self, condition: impl Fn(&ValueTree) -> bool + 'static) -> Self {
        self.table
            .base_mut()
            .set_condition(Condition::new(condition));
        self
    }

    /// Resolves against `tree`; `None` when absent or not in use.
    pub fn get(&self, tree: &ValueTree) -> Result<Option<T>> {
        self.resolve(tree)
    }

    /// Whether a value would be produced for `tree`.
    pub fn has_value(&self, tree: &ValueTree) -> bool {
        self.table.has_value(tree)
    }
}

impl<T, C> Parameter for OptionalTableAs<T, C>
where
    T: FromTable<C> + Facet<'static>,
    C: TableSchema,
{
    fn base(&self) -> &ParameterBase {
        self.table.base()
    }

    fn walk(&self, visitor: &mut dyn Visitor) {
        self.table.walk(visitor);
    }

    fn validate(&self, tree: &ValueTree) -> Result<()> {
        self.resolve(tree).map(drop)
    }
}

impl<T, C> Resolve for OptionalTableAs<T, C>
where
    T: FromTable<C> + Facet<'static>,
    C: TableSchema,
{
    type Output<'t> = T;

    fn resolve<'t>(&self, tree: &'t ValueTree) -> Result<Option<T>> {
        match self.table.lookup(tree)? {
            Lookup::Found(_) => convert::<T, C>(self.key(), tree).map(Some),
            _ => Ok(None),
        }
    }
}
