//! Opaque artifact payloads.
//!
//! The cache never looks inside an AST or a type-information record. Both are
//! carried as a [`Value`]: a dynamically typed tree of primitives, arrays and
//! insertion-ordered hashes that the manifest can archive without knowing
//! what the parser or inferencer put in it.

use rkyv::{Archive, Deserialize, Serialize};


/// A dynamically typed payload value.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
#[rkyv(serialize_bounds(
    __S: rkyv::ser::Writer + rkyv::ser::Allocator,
    __S::Error: rkyv::rancor::Source,
))]
#[rkyv(deserialize_bounds(__D::Error: rkyv::rancor::Source))]
#[rkyv(bytecheck(
    bounds(
        __C: rkyv::validation::ArchiveContext,
        __C::Error: rkyv::rancor::Source,
    )
))]
pub enum Value {
    /// Absence of a value.
    Nil,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(String),
    /// An interned name, e.g. a node type tag.
    Symbol(String),
    /// An ordered sequence.
    Array(#[rkyv(omit_bounds)] Vec<Value>),
    /// A mapping that preserves insertion order.
    Hash(#[rkyv(omit_bounds)] Vec<(Value, Value)>),
}

impl Value {
    /// Creates a symbol.
    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    /// Creates a hash keyed by symbols, in the given order.
    ///
    /// A repeated key keeps its first position and takes the last value.
    pub fn hash<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut pairs: Vec<(Value, Value)> = Vec::new();
        for (key, value) in entries {
            let key = Value::Symbol(key.into());
            let value = value.into();
            match pairs.iter_mut().find(|(existing, _)| *existing == key) {
                Some(slot) => slot.1 = value,
                None => pairs.push((key, value)),
            }
        }
        Value::Hash(pairs)
    }

    /// Looks up a hash entry by symbol or string key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let Value::Hash(pairs) = self else {
            return None;
        };
        pairs.iter().find_map(|(k, v)| match k {
            Value::Symbol(name) | Value::Str(name) if name == key => Some(v),
            _ => None,
        })
    }

    /// Returns the text of a string or symbol.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Nil, Into::into)
    }
}
