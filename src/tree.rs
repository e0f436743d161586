use std::{
    collections::btree_map,
    fmt::{self, Display},
};

use crate::{
    ErrorKind, Result,
    codec::{Decode, Encode, Encoded},
    key::{self, Segment},
    value::{Payload, Value, ValueKind},
};

/// A configuration document held as a single root table.
///
/// Values are addressed by keys such as `a.b[2].c`. Writes carry an
/// `in_prolog` flag: a value written with `in_prolog = true` is protected and
/// can afterwards only be overwritten or erased by another protected write.
/// The same holds for any table or sequence holding a protected value.
/// Missing intermediate tables are created on demand, while sequences only grow
/// by appending at their current length.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTree {
    root: Value,
}

impl Default for ValueTree {
    fn default() -> Self {
        Self {
            root: Value::empty_table(false),
        }
    }
}

impl ValueTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// The root table.
    pub fn root(&self) -> &Value {
        &self.root
    }

    fn root_table(&self) -> &crate::ValueTable {
        self.root
            .as_table()
            .expect("the root of a ValueTree is always a table")
    }

    /// Whether the root table has no members.
    pub fn is_empty(&self) -> bool {
        self.root_table().is_empty()
    }

    /// Iterates over the root's direct members in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.root_table().iter()
    }

    /// Whether a value is reachable at `key`. Malformed keys are never found.
    pub fn exists(&self, key: &str) -> bool {
        self.find(key).is_ok()
    }

    /// The value stored at `key`.
    pub fn find(&self, key: &str) -> Result<&Value> {
        let segments = key::split(key)?;
        let mut current = &self.root;
        for segment in &segments {
            let next = match segment {
                Segment::Name(name) => current.as_table().and_then(|table| table.get(name)),
                Segment::Index(index) => current.as_sequence().and_then(|seq| seq.get(*index)),
            };
            current = next.ok_or_else(|| ErrorKind::NotFound.at(key))?;
        }
        Ok(current)
    }

    fn locate_mut(&mut self, segments: &[Segment]) -> Option<&mut Value> {
        let mut current = &mut self.root;
        for segment in segments {
            current = match segment {
                Segment::Name(name) => current.as_table_mut()?.get_mut(name)?,
                Segment::Index(index) => current.as_sequence_mut()?.get_mut(*index)?,
            };
        }
        Some(current)
    }

    /// The value at `key` if it exists and may be modified from outside a
    /// protected region.
    ///
    /// A missing key and a protected value both yield `None`; use
    /// [`update`](Self::update) to tell them apart.
    pub fn locate(&mut self, key: &str) -> Option<&mut Value> {
        self.update(key).ok()
    }

    /// The value at `key` for modification.
    ///
    /// Fails with [`ErrorKind::ProtectionViolation`] if the value, or anything
    /// below it, was declared in a protected region.
    pub fn update(&mut self, key: &str) -> Result<&mut Value> {
        let segments = key::split(key)?;
        match self.locate_mut(&segments) {
            Some(value) if holds_protected(value) => {
                log::debug!("Refusing update of protected value at `{key}`");
                Err(ErrorKind::ProtectionViolation.at(key))
            }
            Some(value) => Ok(value),
            None => Err(ErrorKind::NotFound.at(key)),
        }
    }

    /// Creates or overwrites the value at `key`.
    ///
    /// `payload` must have the shape `kind` calls for.
    pub fn insert(
        &mut self,
        key: &str,
        in_prolog: bool,
        kind: ValueKind,
        payload: Payload,
    ) -> Result<()> {
        let value = Value::new(in_prolog, kind, payload).map_err(|e| e.at(key))?;
        self.insert_value(key, value)
    }

    /// Creates or overwrites the value at `key`, protected according to
    /// `value.in_prolog()`.
    pub fn insert_value(&mut self, key: &str, value: Value) -> Result<()> {
        log::trace!("Inserting {} at `{key}`", value.kind());
        let segments = key::split(key)?;
        let in_prolog = value.in_prolog();
        let Some((last, parents)) = segments.split_last() else {
            return Err(ErrorKind::InvalidKey(key.to_owned()).into());
        };

        let mut current = &mut self.root;
        for segment in parents {
            current = step_or_create(current, segment, in_prolog).map_err(|e| e.at(key))?;
        }

        let found = current.kind();
        let slot = match last {
            Segment::Name(name) => {
                let table = current.as_table_mut().ok_or_else(|| {
                    ErrorKind::NotAContainer {
                        expected: ValueKind::Table,
                        found,
                    }
                    .at(key)
                })?;
                match table.entry(name.clone()) {
                    btree_map::Entry::Vacant(entry) => {
                        entry.insert(value);
                        return Ok(());
                    }
                    btree_map::Entry::Occupied(entry) => entry.into_mut(),
                }
            }
            Segment::Index(index) => {
                let seq = current.as_sequence_mut().ok_or_else(|| {
                    ErrorKind::NotAContainer {
                        expected: ValueKind::Sequence,
                        found,
                    }
                    .at(key)
                })?;
                let len = seq.len();
                if *index == len {
                    seq.push(value);
                    return Ok(());
                }
                seq.get_mut(*index).ok_or_else(|| {
                    ErrorKind::IndexOutOfRange { index: *index, len }.at(key)
                })?
            }
        };

        if !in_prolog && holds_protected(slot) {
            log::debug!("Refusing to overwrite protected value at `{key}`");
            return Err(ErrorKind::ProtectionViolation.at(key));
        }
        *slot = value;
        Ok(())
    }

    /// Removes the value at `key`, returning whether anything was removed.
    ///
    /// Removing a protected value, or a container holding one, requires
    /// `in_prolog`.
    pub fn erase(&mut self, key: &str, in_prolog: bool) -> Result<bool> {
        log::trace!("Erasing `{key}`");
        let segments = key::split(key)?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(ErrorKind::InvalidKey(key.to_owned()).into());
        };
        let Some(parent) = self.locate_mut(parents) else {
            return Ok(false);
        };

        let protected = |value: &Value| !in_prolog && holds_protected(value);
        match last {
            Segment::Name(name) => {
                let Some(table) = parent.as_table_mut() else {
                    return Ok(false);
                };
                match table.get(name) {
                    None => Ok(false),
                    Some(value) if protected(value) => {
                        Err(ErrorKind::ProtectionViolation.at(key))
                    }
                    Some(_) => Ok(table.remove(name).is_some()),
                }
            }
            Segment::Index(index) => {
                let Some(seq) = parent.as_sequence_mut() else {
                    return Ok(false);
                };
                match seq.get(*index) {
                    None => Ok(false),
                    Some(value) if protected(value) => {
                        Err(ErrorKind::ProtectionViolation.at(key))
                    }
                    Some(_) => {
                        seq.remove(*index);
                        Ok(true)
                    }
                }
            }
        }
    }

    /// Decodes the value at `key` into `T`.
    pub fn get<T: Decode>(&self, key: &str) -> Result<T> {
        T::decode(self.find(key)?).map_err(|e| e.at(key))
    }

    /// Encodes `value` and stores it at `key`.
    ///
    /// Sequences are stored by first installing an empty sequence at `key` and
    /// then putting each element at `key[i]`.
    pub fn put<T: Encode + ?Sized>(&mut self, key: &str, value: &T, in_prolog: bool) -> Result<()> {
        self.put_encoded(key, value.encode(), in_prolog)
    }

    fn put_encoded(&mut self, key: &str, encoded: Encoded, in_prolog: bool) -> Result<()> {
        match encoded {
            Encoded::Atom(kind, text) => self.insert(key, in_prolog, kind, Payload::Atom(text)),
            Encoded::Complex(re, im) => {
                self.insert_value(key, Value::complex(in_prolog, re, im))
            }
            Encoded::Sequence(items) => {
                self.put_empty_sequence(key, in_prolog)?;
                for (i, item) in items.into_iter().enumerate() {
                    self.put_encoded(&format!("{key}[{i}]"), item, in_prolog)?;
                }
                Ok(())
            }
        }
    }

    /// Stores a zero-length sequence at `key`.
    pub fn put_empty_sequence(&mut self, key: &str, in_prolog: bool) -> Result<()> {
        self.insert_value(key, Value::empty_sequence(in_prolog))
    }

    /// Stores a zero-entry table at `key`.
    pub fn put_empty_table(&mut self, key: &str, in_prolog: bool) -> Result<()> {
        self.insert_value(key, Value::empty_table(in_prolog))
    }

    /// Stores nil at `key`.
    pub fn put_nil(&mut self, key: &str, in_prolog: bool) -> Result<()> {
        self.insert_value(key, Value::nil(in_prolog))
    }
}

/// Whether `value` or anything below it was declared in a protected region.
fn holds_protected(value: &Value) -> bool {
    value.in_prolog()
        || match value.payload() {
            Payload::Sequence(items) => items.iter().any(holds_protected),
            Payload::Table(members) => members.values().any(holds_protected),
            Payload::Atom(_) | Payload::Complex(..) => false,
        }
}

/// Descends one intermediate segment, creating a missing table member as an
/// empty table and appending a table when indexing one past the end.
fn step_or_create<'v>(
    current: &'v mut Value,
    segment: &Segment,
    in_prolog: bool,
) -> Result<&'v mut Value> {
    let found = current.kind();
    match segment {
        Segment::Name(name) => {
            let table = current.as_table_mut().ok_or(ErrorKind::NotAContainer {
                expected: ValueKind::Table,
                found,
            })?;
            Ok(table
                .entry(name.clone())
                .or_insert_with(|| Value::empty_table(in_prolog)))
        }
        Segment::Index(index) => {
            let seq = current.as_sequence_mut().ok_or(ErrorKind::NotAContainer {
                expected: ValueKind::Sequence,
                found,
            })?;
            let len = seq.len();
            if *index == len {
                seq.push(Value::empty_table(in_prolog));
            }
            seq.get_mut(*index)
                .ok_or_else(|| ErrorKind::IndexOutOfRange { index: *index, len }.into())
        }
    }
}

impl<'a> IntoIterator for &'a ValueTree {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Display for ValueTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self {
            writeln!(f, "{key}: {value}")?;
        }
        Ok(())
    }
}
