//! Decoded arguments of one pass, keyed by lower-cased name.
//!
//! Built once by the decoder, read-only afterwards. Accessors are typed per
//! kind and shape; asking for the wrong kind or shape is a miss, the same as
//! asking for a name that was never declared.
use indexmap::IndexMap;
use serde_json::{Map, Value as Json};

use crate::descriptor::{Kind, TypeDescriptor};
use crate::ir::{leaf_opt, leaf_or_zero, Decoded, Leaf};

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub descriptor: TypeDescriptor,
    pub value: Decoded,
}

/// Result of a scalar lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Not declared (or declared with another kind/shape).
    Missing,
    /// Declared, no value given.
    Unset,
    Set(T),
}

impl<T> Lookup<T> {
    pub fn is_declared(&self) -> bool {
        !matches!(self, Lookup::Missing)
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Lookup::Set(_))
    }

    pub fn value(self) -> Option<T> {
        match self {
            Lookup::Set(v) => Some(v),
            _ => None,
        }
    }

    /// Value, or the kind's zero value when missing or unset.
    pub fn or_zero(self) -> T
    where
        T: Default,
    {
        self.value().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgStore {
    entries: IndexMap<String, Entry>,
}

impl ArgStore {
    /// Later inserts of the same name replace the earlier entry in place.
    pub(crate) fn insert(&mut self, name: &str, entry: Entry) {
        self.entries.insert(name.to_lowercase(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declared names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    fn typed(&self, name: &str, kind: Kind) -> Option<&Decoded> {
        self.entry(name).filter(|e| e.descriptor.kind == kind).map(|e| &e.value)
    }

    // ---------------------------- generic access ---------------------------- //

    pub fn scalar<T: Leaf>(&self, name: &str) -> Lookup<T> {
        match self.typed(name, T::KIND) {
            Some(Decoded::Scalar(slot)) => match leaf_opt(slot) {
                Some(v) => Lookup::Set(v),
                None => Lookup::Unset,
            },
            _ => Lookup::Missing,
        }
    }

    /// Sequence of the declared length, unset slots as zero values.
    pub fn sequence<T: Leaf>(&self, name: &str) -> Option<Vec<T>> {
        match self.typed(name, T::KIND)? {
            Decoded::Sequence(slots) => Some(slots.iter().map(leaf_or_zero).collect()),
            _ => None,
        }
    }

    /// One inner sequence per outer slot, unset slots as zero values.
    pub fn group<T: Leaf>(&self, name: &str) -> Option<Vec<Vec<T>>> {
        match self.typed(name, T::KIND)? {
            Decoded::Group(groups) => Some(
                groups.iter().map(|g| g.iter().map(leaf_or_zero).collect()).collect(),
            ),
            _ => None,
        }
    }

    // ----------------------------- typed access ----------------------------- //

    pub fn string(&self, name: &str) -> Lookup<String> {
        self.scalar(name)
    }

    pub fn bool(&self, name: &str) -> Lookup<bool> {
        self.scalar(name)
    }

    pub fn int(&self, name: &str) -> Lookup<i64> {
        self.scalar(name)
    }

    pub fn float(&self, name: &str) -> Lookup<f64> {
        self.scalar(name)
    }

    pub fn strings(&self, name: &str) -> Option<Vec<String>> {
        self.sequence(name)
    }

    pub fn bools(&self, name: &str) -> Option<Vec<bool>> {
        self.sequence(name)
    }

    pub fn ints(&self, name: &str) -> Option<Vec<i64>> {
        self.sequence(name)
    }

    pub fn floats(&self, name: &str) -> Option<Vec<f64>> {
        self.sequence(name)
    }

    pub fn string_groups(&self, name: &str) -> Option<Vec<Vec<String>>> {
        self.group(name)
    }

    pub fn bool_groups(&self, name: &str) -> Option<Vec<Vec<bool>>> {
        self.group(name)
    }

    pub fn int_groups(&self, name: &str) -> Option<Vec<Vec<i64>>> {
        self.group(name)
    }

    pub fn float_groups(&self, name: &str) -> Option<Vec<Vec<f64>>> {
        self.group(name)
    }

    /// Every declared argument as JSON, in declaration order: unset slots are
    /// `null`, sequences are arrays, groups are arrays of arrays.
    pub fn snapshot(&self) -> Map<String, Json> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.value.to_json()))
            .collect()
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::parse_type_descriptor;
    use crate::ir::Value;
    use pretty_assertions::assert_eq;

    fn entry(ty: &str, value: Decoded) -> Entry {
        Entry { descriptor: parse_type_descriptor(ty).unwrap(), value }
    }

    fn sample() -> ArgStore {
        let mut store = ArgStore::default();
        store.insert("name", entry("str", Decoded::Scalar(Some(Value::Str("omni".into())))));
        store.insert("port", entry("int", Decoded::Scalar(None)));
        store.insert(
            "numbers",
            entry("int/3", Decoded::Sequence(vec![Some(Value::Int(1)), None, Some(Value::Int(3))])),
        );
        store.insert("empty", entry("str/0", Decoded::Sequence(vec![])));
        store.insert(
            "pairs",
            entry(
                "bool/2/2",
                Decoded::Group(vec![vec![Some(Value::Bool(true)), None], vec![Some(Value::Bool(true))]]),
            ),
        );
        store
    }

    #[test]
    fn scalar_distinguishes_missing_unset_and_set() {
        let store = sample();
        assert_eq!(store.string("name"), Lookup::Set("omni".to_string()));
        assert_eq!(store.int("port"), Lookup::Unset);
        assert!(store.int("port").is_declared());
        assert_eq!(store.int("port").or_zero(), 0);
        assert_eq!(store.int("nope"), Lookup::Missing);
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let store = sample();
        assert_eq!(store.string("NAME"), Lookup::Set("omni".to_string()));
        assert!(store.contains("Numbers"));
    }

    #[test]
    fn wrong_kind_or_shape_is_a_miss() {
        let store = sample();
        assert_eq!(store.int("name"), Lookup::Missing);
        assert_eq!(store.strings("name"), None);
        assert_eq!(store.int("numbers"), Lookup::Missing);
        assert_eq!(store.int_groups("numbers"), None);
    }

    #[test]
    fn sequences_fill_unset_slots_with_zero() {
        let store = sample();
        assert_eq!(store.ints("numbers"), Some(vec![1, 0, 3]));
        assert_eq!(store.strings("empty"), Some(vec![]));
        assert_eq!(store.bool_groups("pairs"), Some(vec![vec![true, false], vec![true]]));
    }

    #[test]
    fn snapshot_follows_declaration_order() {
        let snap = sample().snapshot();
        assert_eq!(snap.keys().collect::<Vec<_>>(), vec!["name", "port", "numbers", "empty", "pairs"]);
        assert_eq!(
            Json::Object(snap),
            serde_json::json!({
                "name": "omni",
                "port": null,
                "numbers": [1, null, 3],
                "empty": [],
                "pairs": [[true, null], [true]],
            })
        );
    }
}
