use core::fmt::{self, Display, Formatter};

/// Key of a register or list in a transactional workload.
pub type Key = String;

/// Operation payload.
///
/// The wire form is untagged JSON: null, a number, a string, or an array.
/// Transactional payloads are arrays of micro-op tuples and are parsed on
/// demand with [`Mop::parse_list`]; the payload itself stays in this
/// JSON-shaped form so serialize-then-parse is the identity.
#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize),
    serde(untagged)
)]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Nil,
    Int(i64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Interpret this value as a list of integers.
    #[must_use]
    pub fn as_int_list(&self) -> Option<Vec<i64>> {
        match self {
            Self::List(items) => items.iter().map(Value::as_int).collect(),
            _ => None,
        }
    }

    /// Build a list value from integers.
    #[must_use]
    pub fn ints<I: IntoIterator<Item = i64>>(items: I) -> Self {
        Self::List(items.into_iter().map(Self::Int).collect())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("_"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A micro-operation inside a transaction payload.
///
/// Wire form is a positional tuple: `["r", k, v]`, `["w", k, v]`,
/// `["append", k, e]`, `["cas", k, [old, new]]`. A read's `v` is null on
/// invocation and the observed scalar or list on completion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mop {
    Read { key: Key, value: Option<Value> },
    Write { key: Key, value: i64 },
    Append { key: Key, element: i64 },
    Cas { key: Key, old: i64, new: i64 },
}

/// Error parsing a [`Value`] into micro-operations, with the position of
/// the offending element in the payload list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MopParseError {
    pub position: usize,
    pub detail: String,
}

impl Display for MopParseError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "micro-op {}: {}", self.position, self.detail)
    }
}

impl std::error::Error for MopParseError {}

impl Mop {
    #[must_use]
    pub fn read(key: impl Into<Key>) -> Self {
        Self::Read {
            key: key.into(),
            value: None,
        }
    }

    #[must_use]
    pub fn read_int(key: impl Into<Key>, value: i64) -> Self {
        Self::Read {
            key: key.into(),
            value: Some(Value::Int(value)),
        }
    }

    #[must_use]
    pub fn read_list<I: IntoIterator<Item = i64>>(key: impl Into<Key>, items: I) -> Self {
        Self::Read {
            key: key.into(),
            value: Some(Value::ints(items)),
        }
    }

    #[must_use]
    pub fn write(key: impl Into<Key>, value: i64) -> Self {
        Self::Write {
            key: key.into(),
            value,
        }
    }

    #[must_use]
    pub fn append(key: impl Into<Key>, element: i64) -> Self {
        Self::Append {
            key: key.into(),
            element,
        }
    }

    #[must_use]
    pub fn cas(key: impl Into<Key>, old: i64, new: i64) -> Self {
        Self::Cas {
            key: key.into(),
            old,
            new,
        }
    }

    #[must_use]
    pub fn key(&self) -> &Key {
        match self {
            Self::Read { key, .. }
            | Self::Write { key, .. }
            | Self::Append { key, .. }
            | Self::Cas { key, .. } => key,
        }
    }

    /// Lower this micro-op to its wire-level tuple.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Read { key, value } => Value::List(vec![
                Value::Str("r".to_string()),
                Value::Str(key.clone()),
                value.clone().unwrap_or(Value::Nil),
            ]),
            Self::Write { key, value } => Value::List(vec![
                Value::Str("w".to_string()),
                Value::Str(key.clone()),
                Value::Int(*value),
            ]),
            Self::Append { key, element } => Value::List(vec![
                Value::Str("append".to_string()),
                Value::Str(key.clone()),
                Value::Int(*element),
            ]),
            Self::Cas { key, old, new } => Value::List(vec![
                Value::Str("cas".to_string()),
                Value::Str(key.clone()),
                Value::List(vec![Value::Int(*old), Value::Int(*new)]),
            ]),
        }
    }

    /// Parse one wire-level tuple.
    fn parse(position: usize, value: &Value) -> Result<Self, MopParseError> {
        let err = |detail: String| MopParseError { position, detail };
        let Value::List(items) = value else {
            return Err(err(format!("expected a [f, key, arg] tuple, got {value}")));
        };
        let [Value::Str(tag), Value::Str(key), arg] = items.as_slice() else {
            return Err(err(format!(
                "expected a [f, key, arg] tuple of length 3, got {value}"
            )));
        };
        match tag.as_str() {
            "r" => Ok(Self::Read {
                key: key.clone(),
                value: match arg {
                    Value::Nil => None,
                    other => Some(other.clone()),
                },
            }),
            "w" => arg.as_int().map_or_else(
                || Err(err(format!("write argument must be an integer, got {arg}"))),
                |v| {
                    Ok(Self::Write {
                        key: key.clone(),
                        value: v,
                    })
                },
            ),
            "append" => arg.as_int().map_or_else(
                || {
                    Err(err(format!(
                        "append argument must be an integer, got {arg}"
                    )))
                },
                |e| {
                    Ok(Self::Append {
                        key: key.clone(),
                        element: e,
                    })
                },
            ),
            "cas" => match arg {
                Value::List(pair) => match pair.as_slice() {
                    [Value::Int(old), Value::Int(new)] => Ok(Self::Cas {
                        key: key.clone(),
                        old: *old,
                        new: *new,
                    }),
                    _ => Err(err(format!("cas argument must be [old, new], got {arg}"))),
                },
                _ => Err(err(format!("cas argument must be [old, new], got {arg}"))),
            },
            other => Err(err(format!("unknown micro-op tag {other:?}"))),
        }
    }

    /// Parse a transaction payload into its micro-op list.
    ///
    /// # Errors
    ///
    /// Returns [`MopParseError`] when the payload is not a list of
    /// well-formed micro-op tuples.
    pub fn parse_list(value: &Value) -> Result<Vec<Self>, MopParseError> {
        let Value::List(items) = value else {
            return Err(MopParseError {
                position: 0,
                detail: format!("transaction payload must be a list, got {value}"),
            });
        };
        items
            .iter()
            .enumerate()
            .map(|(i, v)| Self::parse(i, v))
            .collect()
    }

    /// Lower a micro-op list to a wire-level payload.
    #[must_use]
    pub fn to_list(mops: &[Self]) -> Value {
        Value::List(mops.iter().map(Self::to_value).collect())
    }
}

impl Display for Mop {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Read { key, value } => match value {
                Some(v) => write!(f, "r {key} {v}"),
                None => write!(f, "r {key} _"),
            },
            Self::Write { key, value } => write!(f, "w {key} {value}"),
            Self::Append { key, element } => write!(f, "append {key} {element}"),
            Self::Cas { key, old, new } => write!(f, "cas {key} {old} {new}"),
        }
    }
}

/// A version a key has taken on: the initial (unwritten) state, or the
/// value installed by a write (for registers) or an append (for lists,
/// where a list state is identified by its last element).
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Version {
    Init,
    Val(i64),
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Init => f.write_str("nil"),
            Self::Val(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mop_value_roundtrip() {
        let mops = vec![
            Mop::read("x"),
            Mop::read_list("y", [1, 2]),
            Mop::write("x", 3),
            Mop::append("y", 4),
            Mop::cas("z", 1, 2),
        ];
        let value = Mop::to_list(&mops);
        assert_eq!(Mop::parse_list(&value).unwrap(), mops);
    }

    #[test]
    fn mop_parse_rejects_bad_tag() {
        let value = Value::List(vec![Value::List(vec![
            Value::Str("q".to_string()),
            Value::Str("x".to_string()),
            Value::Nil,
        ])]);
        let err = Mop::parse_list(&value).unwrap_err();
        assert_eq!(err.position, 0);
        assert!(err.detail.contains("unknown micro-op tag"));
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::Nil.to_string(), "_");
        assert_eq!(Value::ints([1, 2]).to_string(), "[1 2]");
        assert_eq!(Mop::read_int("x", 9).to_string(), "r x 9");
        assert_eq!(Mop::cas("x", 1, 2).to_string(), "cas x 1 2");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn value_wire_roundtrip() {
        let value = Mop::to_list(&[Mop::append("x", 1), Mop::read_list("y", [2, 1])]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"[["append","x",1],["r","y",[2,1]]]"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn nil_wire_is_null() {
        let json = serde_json::to_string(&Value::Nil).unwrap();
        assert_eq!(json, "null");
        let back: Value = serde_json::from_str("null").unwrap();
        assert_eq!(back, Value::Nil);
    }
}
