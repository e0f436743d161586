use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Deref,
};

use crate::{
    ErrorKind, Result,
    key::{self, Segment},
    name::NameContext,
    param::{Parameter, ParameterKind, Visitor},
    table::{Resolved, TableSchema},
    tree::ValueTree,
    value::ValueTable,
};

/// The top-level schema of a document, with `C` describing the root table.
///
/// Unknown keys in the tree are ignored by default; call
/// [`deny_unknown`](Self::deny_unknown) to reject them.
///
/// ```
/// # use kdl_params::{Atom, NameContext, Parameter, Schema, TableSchema};
/// struct Root {
///     name: Atom<String>,
/// }
///
/// impl TableSchema for Root {
///     fn declare(cx: &mut NameContext) -> Self {
///         Self { name: Atom::new(cx, "name") }
///     }
///
///     fn members(&self) -> Vec<&dyn Parameter> {
///         vec![&self.name]
///     }
/// }
///
/// let schema = Schema::<Root>::declare().unwrap().deny_unknown();
/// let tree = kdl_params::from_str(r#"name "demo""#).unwrap();
/// let root = schema.resolve(&tree).unwrap();
/// assert_eq!(root.get(&root.name).unwrap(), "demo");
///
/// let tree = kdl_params::from_str(r#"name "demo"; extra 1"#).unwrap();
/// assert!(schema.resolve(&tree).is_err());
/// ```
#[derive(Debug)]
pub struct Schema<C> {
    root: C,
    deny_unknown: bool,
    ignored: BTreeSet<String>,
}

impl<C: TableSchema> Schema<C> {
    /// Declares `C` at the document root.
    ///
    /// Fails with [`ErrorKind::StructuralViolation`] if a key is declared
    /// more than once.
    pub fn declare() -> Result<Self> {
        log::trace!("Declaring schema");
        let mut cx = NameContext::new();
        let root = C::declare(&mut cx);
        cx.finish()?;
        Ok(Self {
            root,
            deny_unknown: false,
            ignored: BTreeSet::new(),
        })
    }

    /// Rejects trees holding keys that no descriptor declares.
    pub fn deny_unknown(mut self) -> Self {
        self.deny_unknown = true;
        self
    }

    /// Exempts `key` and everything below it from the unknown-key check.
    pub fn ignore_key(mut self, key: impl Into<String>) -> Self {
        self.ignored.insert(key.into());
        self
    }

    /// Resolves every member against `tree`.
    pub fn resolve<'t>(&self, tree: &'t ValueTree) -> Result<Resolved<'t, C>> {
        log::trace!("Resolving schema");
        if self.deny_unknown {
            let unknown = self.unknown_keys(tree);
            if !unknown.is_empty() {
                log::debug!("Unknown keys: {unknown:?}");
                return Err(ErrorKind::UnknownParameters(unknown).into());
            }
        }
        Resolved::materialize("", tree)
    }

    /// Resolves against `tree`, discarding the result.
    pub fn validate(&self, tree: &ValueTree) -> Result<()> {
        self.resolve(tree).map(drop)
    }

    /// Qualified keys of every declared descriptor, parents before children.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = KeyCollector::default();
        self.walk(&mut keys);
        keys.order
    }

    /// Walks every declared descriptor.
    pub fn walk(&self, visitor: &mut dyn Visitor) {
        for member in self.root.members() {
            member.walk(visitor);
        }
    }

    /// Keys of `tree` that no descriptor covers, in key order.
    ///
    /// Members of tables are checked recursively; the contents of sequences
    /// and tuples are not.
    pub fn unknown_keys(&self, tree: &ValueTree) -> Vec<String> {
        let mut keys = KeyCollector::default();
        self.walk(&mut keys);
        let mut unknown = Vec::new();
        if let Some(root) = tree.root().as_table() {
            self.collect_unknown("", root, &keys.kinds, &mut unknown);
        }
        unknown
    }

    fn collect_unknown(
        &self,
        prefix: &str,
        members: &ValueTable,
        declared: &BTreeMap<String, ParameterKind>,
        unknown: &mut Vec<String>,
    ) {
        for (name, value) in members {
            let key = key::join(prefix, &Segment::Name(name.clone()));
            if self.ignored.contains(&key) {
                continue;
            }
            match declared.get(&key) {
                None => unknown.push(key),
                Some(ParameterKind::Table | ParameterKind::TableFragment) => {
                    if let Some(table) = value.as_table() {
                        self.collect_unknown(&key, table, declared, unknown);
                    }
                }
                Some(_) => {}
            }
        }
    }
}

impl<C> Deref for Schema<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.root
    }
}

/// Records the key and kind of every visited descriptor.
#[derive(Default)]
struct KeyCollector {
    order: Vec<String>,
    kinds: BTreeMap<String, ParameterKind>,
}

impl Visitor for KeyCollector {
    fn visit(&mut self, parameter: &dyn Parameter) {
        let kind = parameter.kind();
        if kind == ParameterKind::TableFragment {
            return;
        }
        self.order.push(parameter.key().to_owned());
        self.kinds.insert(parameter.key().to_owned(), kind);
    }
}
