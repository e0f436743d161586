//! Populates a [`ValueTree`] from a KDL document.
//!
//! Each node becomes the value at its name, joined to the name of its parent
//! node with a `.`:
//!
//! - a single argument is a scalar, several arguments a sequence;
//! - properties and child nodes are table members;
//! - children that are all named `-` are the elements of a sequence;
//! - `(complex)` with two numeric arguments is a complex number;
//! - a bare node, or a `#null` argument, is nil.
//!
//! Children of a top-level `prolog` node are protected: later documents merged
//! into the same tree cannot override them. Node names may themselves be paths
//! such as `server.port`, which is how a later document overrides one member
//! without replacing the whole table.

use kdl::{KdlDocument, KdlNode, KdlValue};

use crate::{
    ErrorKind, Result,
    codec::{Number, quote},
    tree::ValueTree,
    value::{NIL, Payload, Value, ValueKind},
};

/// Name of the top-level node whose children are protected.
const PROLOG: &str = "prolog";

/// Name shared by the children that make up a sequence.
const ELEMENT: &str = "-";

/// Type annotation selecting a complex number.
const COMPLEX: &str = "complex";

/// Parses `kdl` into a new tree.
pub fn from_str(kdl: &str) -> Result<ValueTree> {
    let mut tree = ValueTree::new();
    merge_str(&mut tree, kdl)?;
    Ok(tree)
}

/// Parses `kdl` into `tree`, overwriting unprotected values stored at the same
/// keys.
pub fn merge_str(tree: &mut ValueTree, kdl: &str) -> Result<()> {
    log::trace!("Entering `merge_str`");

    let document: KdlDocument = kdl.parse()?;
    log::trace!("KDL parsed");

    let mut ingester = Ingester { tree };
    for node in document.nodes() {
        if node.name().value() == PROLOG {
            ingester.prolog(node)?;
        } else {
            ingester.node("", node, false)?;
        }
    }
    log::trace!("Document ingested");
    Ok(())
}

struct Ingester<'a> {
    tree: &'a mut ValueTree,
}

impl Ingester<'_> {
    fn prolog(&mut self, node: &KdlNode) -> Result<()> {
        if !node.entries().is_empty() {
            return Err(
                ErrorKind::UnsupportedNode("`prolog` takes only child nodes".to_owned()).into(),
            );
        }
        log::trace!("Entering prolog");
        for child in node.children().map(KdlDocument::nodes).unwrap_or_default() {
            self.node("", child, true)?;
        }
        Ok(())
    }

    fn node(&mut self, parent: &str, node: &KdlNode, in_prolog: bool) -> Result<()> {
        let name = node.name().value();
        let key = if parent.is_empty() {
            name.to_owned()
        } else {
            format!("{parent}.{name}")
        };
        self.store(&key, node, in_prolog)
    }

    /// Stores the value `node` denotes at `key`.
    fn store(&mut self, key: &str, node: &KdlNode, in_prolog: bool) -> Result<()> {
        log::trace!("Ingesting node at `{key}`");

        let mut arguments = Vec::new();
        let mut properties = Vec::new();
        for entry in node.entries() {
            match entry.name() {
                Some(name) => properties.push((name.value(), entry.value())),
                None => arguments.push(entry.value()),
            }
        }
        let children = node.children().map(KdlDocument::nodes).unwrap_or_default();

        if node.ty().is_some_and(|ty| ty.value() == COMPLEX) {
            return match (arguments.as_slice(), properties.is_empty() && children.is_empty()) {
                ([re, im], true) => {
                    let value = Value::complex(in_prolog, number(key, re)?, number(key, im)?);
                    self.tree.insert_value(key, value)
                }
                _ => Err(unsupported(key, "a complex number takes exactly two arguments")),
            };
        }

        if !arguments.is_empty() {
            if !properties.is_empty() || !children.is_empty() {
                return Err(unsupported(
                    key,
                    "arguments cannot be mixed with properties or children",
                ));
            }
            return match arguments.as_slice() {
                [value] => self.scalar(key, value, in_prolog),
                values => {
                    self.tree.put_empty_sequence(key, in_prolog)?;
                    values.iter().enumerate().try_for_each(|(i, value)| {
                        self.scalar(&format!("{key}[{i}]"), value, in_prolog)
                    })
                }
            };
        }

        if !children.is_empty() && children.iter().all(|c| c.name().value() == ELEMENT) {
            if !properties.is_empty() {
                return Err(unsupported(key, "a sequence cannot have properties"));
            }
            self.tree.put_empty_sequence(key, in_prolog)?;
            for (i, child) in children.iter().enumerate() {
                self.store(&format!("{key}[{i}]"), child, in_prolog)?;
            }
            return Ok(());
        }

        if properties.is_empty() && children.is_empty() {
            return self.tree.put_nil(key, in_prolog);
        }

        self.tree.put_empty_table(key, in_prolog)?;
        for (name, value) in properties {
            self.scalar(&format!("{key}.{name}"), value, in_prolog)?;
        }
        for child in children {
            if child.name().value() == ELEMENT {
                return Err(unsupported(key, "`-` elements cannot be mixed with named children"));
            }
            self.node(key, child, in_prolog)?;
        }
        Ok(())
    }

    fn scalar(&mut self, key: &str, value: &KdlValue, in_prolog: bool) -> Result<()> {
        let (kind, text) = match value {
            KdlValue::String(s) => (ValueKind::String, quote(s)),
            KdlValue::Integer(i) => (ValueKind::Number, i.to_string()),
            KdlValue::Float(f) => (ValueKind::Number, f.to_canonical()),
            KdlValue::Bool(b) => (ValueKind::Bool, b.to_string()),
            KdlValue::Null => (ValueKind::Nil, NIL.to_owned()),
        };
        self.tree.insert(key, in_prolog, kind, Payload::Atom(text))
    }
}

fn number(key: &str, value: &KdlValue) -> Result<String> {
    match value {
        KdlValue::Integer(i) => Ok(i.to_string()),
        KdlValue::Float(f) => Ok(f.to_canonical()),
        other => Err(unsupported(
            key,
            &format!("complex parts must be numbers, got {other}"),
        )),
    }
}

fn unsupported(key: &str, msg: &str) -> crate::Error {
    ErrorKind::UnsupportedNode(msg.to_owned()).at(key)
}
