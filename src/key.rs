use std::fmt::{self, Display};

use crate::{ErrorKind, Result};

/// One step of a key such as `a.b[2].c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A table member.
    Name(String),
    /// A zero-based sequence position.
    Index(usize),
}

impl Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Name(name) => f.write_str(name),
            Segment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

fn is_name_byte(byte: u8) -> bool {
    !matches!(byte, b'.' | b'[' | b']') && !byte.is_ascii_whitespace()
}

/// Splits a key into table-member names and bracketed indices.
///
/// The first segment must be a name; every later name is introduced by `.`,
/// every index by `[n]`.
pub fn split(key: &str) -> Result<Vec<Segment>> {
    let invalid = || ErrorKind::InvalidKey(key.to_owned());
    let bytes = key.as_bytes();
    let mut idx = 0_usize;
    let mut segments = Vec::new();

    while idx < bytes.len() {
        if !segments.is_empty() {
            if bytes[idx] != b'.' {
                return Err(invalid().into());
            }
            idx += 1;
        }

        let start = idx;
        while idx < bytes.len() && is_name_byte(bytes[idx]) {
            idx += 1;
        }
        if idx == start {
            return Err(invalid().into());
        }
        segments.push(Segment::Name(key[start..idx].to_owned()));

        while idx < bytes.len() && bytes[idx] == b'[' {
            idx += 1;
            let n_start = idx;
            while idx < bytes.len() && bytes[idx].is_ascii_digit() {
                idx += 1;
            }
            if idx == n_start || idx >= bytes.len() || bytes[idx] != b']' {
                return Err(invalid().into());
            }
            let index = key[n_start..idx].parse::<usize>().map_err(|_| invalid())?;
            segments.push(Segment::Index(index));
            idx += 1;
        }
    }

    if segments.is_empty() {
        return Err(invalid().into());
    }
    Ok(segments)
}

/// Appends `segment` to the qualified key `parent`.
pub fn join(parent: &str, segment: &Segment) -> String {
    match segment {
        Segment::Name(name) if parent.is_empty() => name.clone(),
        Segment::Name(name) => format!("{parent}.{name}"),
        Segment::Index(index) => format!("{parent}[{index}]"),
    }
}
