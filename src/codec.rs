//! Canonical text encoding of scalars.
//!
//! Every scalar in a [`ValueTree`](crate::ValueTree) is stored as canonical
//! text: strings double-quoted with escapes, booleans as `true`/`false`, nil as
//! `@nil`, and numbers in a normalised decimal form. Native values are only
//! recovered on read, through [`Decode`].

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use crate::{
    ErrorKind, Result,
    value::{NIL, Value, ValueKind},
};

/// A complex number stored as a (real, imaginary) pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex<T> {
    /// Real part.
    pub re: T,
    /// Imaginary part.
    pub im: T,
}

impl<T> Complex<T> {
    /// Creates `re + im·i`.
    pub fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

impl<T: Display> Display for Complex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.re, self.im)
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Native numeric types the codec understands.
pub trait Number: Copy + Display + sealed::Sealed {
    /// Name used in decode errors.
    const TYPE_NAME: &'static str;

    /// The canonical text of `self`.
    fn to_canonical(self) -> String;

    /// Parses canonical (or merely well-formed) numeric text.
    fn from_canonical(text: &str) -> Option<Self>;
}

/// Encoded form of a native value, ready to be put into a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Encoded {
    /// Canonical text of a nil, string, bool, or number.
    Atom(ValueKind, String),
    /// Canonical text of both complex parts.
    Complex(String, String),
    /// Elements to be put one by one after an empty sequence is installed.
    Sequence(Vec<Encoded>),
}

/// Types that can be written into a tree.
pub trait Encode {
    /// Produces the canonical encoding of `self`.
    fn encode(&self) -> Encoded;
}

/// Types that can be read out of a stored [`Value`].
pub trait Decode: Sized {
    /// Decodes `value`, failing if its kind or text does not fit `Self`.
    fn decode(value: &Value) -> Result<Self>;
}

fn type_mismatch(expected: &'static str, value: &Value) -> crate::Error {
    ErrorKind::TypeMismatch {
        expected,
        found: value.kind(),
    }
    .into()
}

fn decode_failure(expected: &'static str, text: &str) -> crate::Error {
    ErrorKind::DecodeFailure {
        expected,
        text: text.to_owned(),
    }
    .into()
}

fn atom_of<'v>(value: &'v Value, expected: &'static str, kind: ValueKind) -> Result<&'v str> {
    match value.as_atom() {
        Some(text) if value.is_a(kind) => Ok(text),
        _ => Err(type_mismatch(expected, value)),
    }
}

pub(crate) fn quote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for ch in raw.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            ch => out.push(ch),
        }
    }
    out.push('"');
    out
}

fn unquote(text: &str) -> Option<String> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            other => out.push(other),
        }
    }
    Some(out)
}

macro_rules! impl_integer {
    ($($t:ty),* $(,)?) => {$(
        impl sealed::Sealed for $t {}

        impl Number for $t {
            const TYPE_NAME: &'static str = stringify!($t);

            fn to_canonical(self) -> String {
                self.to_string()
            }

            fn from_canonical(text: &str) -> Option<Self> {
                text.parse::<$t>().ok().or_else(|| {
                    // Integral values that were written in exponent form, e.g. `1e3`.
                    let float = text.parse::<f64>().ok()?;
                    let in_range = float >= <$t>::MIN as f64 && float < <$t>::MAX as f64 + 1.0;
                    if !in_range || float.fract() != 0.0 {
                        return None;
                    }
                    Some(float as $t)
                })
            }
        }
    )*};
}

macro_rules! impl_float {
    ($($t:ty),* $(,)?) => {$(
        impl sealed::Sealed for $t {}

        impl Number for $t {
            const TYPE_NAME: &'static str = stringify!($t);

            fn to_canonical(self) -> String {
                if self.is_nan() {
                    "nan".to_owned()
                } else if self.is_infinite() {
                    (if self > 0.0 { "+infinity" } else { "-infinity" }).to_owned()
                } else if self == 0.0 {
                    "0".to_owned()
                } else if self.abs() >= 1e15 || self.abs() < 1e-5 {
                    format!("{self:e}")
                } else if self.fract() == 0.0 {
                    format!("{self:.0}")
                } else {
                    format!("{self}")
                }
            }

            fn from_canonical(text: &str) -> Option<Self> {
                text.parse::<$t>().ok()
            }
        }
    )*};
}

impl_integer!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_float!(f32, f64);

macro_rules! impl_number_codec {
    ($($t:ty),* $(,)?) => {$(
        impl Encode for $t {
            fn encode(&self) -> Encoded {
                Encoded::Atom(ValueKind::Number, self.to_canonical())
            }
        }

        impl Decode for $t {
            fn decode(value: &Value) -> Result<Self> {
                let text = atom_of(value, <$t as Number>::TYPE_NAME, ValueKind::Number)?;
                <$t>::from_canonical(text)
                    .ok_or_else(|| decode_failure(<$t as Number>::TYPE_NAME, text))
            }
        }
    )*};
}

impl_number_codec!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64
);

impl Encode for str {
    fn encode(&self) -> Encoded {
        Encoded::Atom(ValueKind::String, quote(self))
    }
}

impl Encode for String {
    fn encode(&self) -> Encoded {
        self.as_str().encode()
    }
}

impl Decode for String {
    fn decode(value: &Value) -> Result<Self> {
        match (value.kind(), value.as_atom()) {
            (ValueKind::String | ValueKind::Number | ValueKind::Bool, Some(text)) => {
                Ok(unquote(text).unwrap_or_else(|| text.to_owned()))
            }
            _ => Err(type_mismatch("string", value)),
        }
    }
}

impl Encode for bool {
    fn encode(&self) -> Encoded {
        Encoded::Atom(ValueKind::Bool, self.to_string())
    }
}

impl Decode for bool {
    fn decode(value: &Value) -> Result<Self> {
        match atom_of(value, "bool", ValueKind::Bool)? {
            "true" => Ok(true),
            "false" => Ok(false),
            text => Err(decode_failure("bool", text)),
        }
    }
}

impl<T: Number> Encode for Complex<T> {
    fn encode(&self) -> Encoded {
        Encoded::Complex(self.re.to_canonical(), self.im.to_canonical())
    }
}

impl<T: Number> Decode for Complex<T> {
    fn decode(value: &Value) -> Result<Self> {
        let (re, im) = value
            .as_complex()
            .ok_or_else(|| type_mismatch("complex", value))?;
        let part = |text: &str| {
            T::from_canonical(text).ok_or_else(|| decode_failure(T::TYPE_NAME, text))
        };
        Ok(Complex::new(part(re)?, part(im)?))
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self) -> Encoded {
        match self {
            Some(value) => value.encode(),
            None => Encoded::Atom(ValueKind::Nil, NIL.to_owned()),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(value: &Value) -> Result<Self> {
        if value.is_a(ValueKind::Nil) {
            return Ok(None);
        }
        T::decode(value).map(Some)
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self) -> Encoded {
        Encoded::Sequence(self.iter().map(Encode::encode).collect())
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self) -> Encoded {
        self.as_slice().encode()
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self) -> Encoded {
        (**self).encode()
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(value: &Value) -> Result<Self> {
        value
            .as_sequence()
            .ok_or_else(|| type_mismatch("sequence", value))?
            .iter()
            .map(T::decode)
            .collect()
    }
}

impl<T: Decode> Decode for BTreeMap<String, T> {
    fn decode(value: &Value) -> Result<Self> {
        value
            .as_table()
            .ok_or_else(|| type_mismatch("table", value))?
            .iter()
            .map(|(key, member)| Ok::<_, crate::Error>((key.clone(), T::decode(member)?)))
            .collect()
    }
}

impl Decode for Value {
    fn decode(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}
