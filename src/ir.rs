// Strongly-typed decoded values. Raw store strings stop at the decoder.
use serde_json::Value as Json;

use crate::descriptor::Kind;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Value {
    /// Converts a raw store value to `kind`. Booleans accept `true`/`false`
    /// in any case; numbers use the standard textual forms.
    pub fn parse(kind: Kind, raw: &str) -> Option<Value> {
        match kind {
            Kind::Str => Some(Value::Str(raw.to_string())),
            Kind::Bool if raw.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
            Kind::Bool if raw.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
            Kind::Bool => None,
            Kind::Int => raw.parse().ok().map(Value::Int),
            Kind::Float => raw.parse().ok().map(Value::Float),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Str(_) => Kind::Str,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Value::Str(s) => Json::from(s.as_str()),
            Value::Bool(b) => Json::from(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => Json::from(*f), // non-finite → null
        }
    }
}

/// One slot of an argument: `None` when declared but not set.
pub type Slot = Option<Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Scalar(Slot),
    Sequence(Vec<Slot>),
    Group(Vec<Vec<Slot>>),
}

impl Decoded {
    pub fn to_json(&self) -> Json {
        fn slot(s: &Slot) -> Json {
            s.as_ref().map_or(Json::Null, Value::to_json)
        }
        match self {
            Decoded::Scalar(s) => slot(s),
            Decoded::Sequence(xs) => Json::Array(xs.iter().map(slot).collect()),
            Decoded::Group(groups) => Json::Array(
                groups.iter().map(|g| Json::Array(g.iter().map(slot).collect())).collect(),
            ),
        }
    }
}

// --------------------------------- Leaves -------------------------------- //

/// Rust type a leaf of a given kind lands in. `Default` is the kind's zero
/// value, used for unset slots of non-optional targets.
pub trait Leaf: Sized + Clone + Default {
    const KIND: Kind;
    fn from_value(value: &Value) -> Option<Self>;
}

impl Leaf for String {
    const KIND: Kind = Kind::Str;
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl Leaf for bool {
    const KIND: Kind = Kind::Bool;
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl Leaf for i64 {
    const KIND: Kind = Kind::Int;
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl Leaf for f64 {
    const KIND: Kind = Kind::Float;
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

pub(crate) fn leaf_opt<T: Leaf>(slot: &Slot) -> Option<T> {
    slot.as_ref().and_then(T::from_value)
}

pub(crate) fn leaf_or_zero<T: Leaf>(slot: &Slot) -> T {
    leaf_opt(slot).unwrap_or_default()
}
