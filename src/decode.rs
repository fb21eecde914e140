//! One decode pass: external store → [`ArgStore`].
//!
//! Key layout (`<P>` prefix, `<N>` upper-cased argument name):
//! - `<P>_LIST`                 whitespace-separated declared names
//! - `<P>_<N>_TYPE`             descriptor, see [`crate::descriptor`]
//! - `<P>_<N>_VALUE`            scalar value
//! - `<P>_<N>_VALUE_<i>`        sequence slot
//! - `<P>_<N>_TYPE_<i>`         per-index descriptor of a group (required)
//! - `<P>_<N>_VALUE_<i>_<j>`    group slot
//!
//! Missing values are "declared but unset"; missing types and the missing
//! list are errors. The first error aborts the pass.
use indexmap::IndexSet;
use tracing::debug;

use crate::descriptor::{parse_type_descriptor, Kind, Shape, TypeDescriptor};
use crate::env::{EnvSource, ProcessEnv};
use crate::error::DecodeError;
use crate::ir::{Decoded, Slot, Value};
use crate::store::{ArgStore, Entry};

pub const DEFAULT_PREFIX: &str = "OMNI_ARG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Common prefix of every key, without the trailing `_`.
    pub prefix: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self { prefix: DEFAULT_PREFIX.to_string() }
    }
}

pub struct Decoder<S> {
    source: S,
    config: DecoderConfig,
}

impl<S: EnvSource> Decoder<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, DecoderConfig::default())
    }

    pub fn with_config(source: S, config: DecoderConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn decode(&self) -> Result<ArgStore, DecodeError> {
        let mut store = ArgStore::default();
        for name in self.declared_names()? {
            let descriptor = self.arg_type(&name, None)?;
            let value = match descriptor.shape {
                Shape::Scalar => Decoded::Scalar(self.value(&name, descriptor.kind, &[])?),
                Shape::Sequence(len) => Decoded::Sequence(
                    (0..len)
                        .map(|i| self.value(&name, descriptor.kind, &[i]))
                        .collect::<Result<_, _>>()?,
                ),
                Shape::Group(outer) => Decoded::Group(
                    (0..outer)
                        .map(|i| self.group_slot(&name, descriptor.kind, i))
                        .collect::<Result<_, _>>()?,
                ),
            };
            debug!(arg = %name, descriptor = %descriptor, "decoded argument");
            store.insert(&name, Entry { descriptor, value });
        }
        Ok(store)
    }

    /// Lower-cased declared names; duplicates collapse onto their first
    /// position.
    fn declared_names(&self) -> Result<IndexSet<String>, DecodeError> {
        let key = self.key(&["LIST"]);
        let list = self.source.lookup(&key).ok_or(DecodeError::ListMissing { key })?;
        Ok(list.split_whitespace().map(str::to_lowercase).collect())
    }

    fn arg_type(&self, name: &str, index: Option<usize>) -> Result<TypeDescriptor, DecodeError> {
        let upper = name.to_uppercase();
        let key = match index {
            None => self.key(&[&upper, "TYPE"]),
            Some(i) => self.key(&[&upper, "TYPE", &i.to_string()]),
        };
        let raw = self.source.lookup(&key).ok_or_else(|| DecodeError::TypeMissing {
            name: name.to_string(),
            key: key.clone(),
        })?;
        parse_type_descriptor(&raw).map_err(|source| DecodeError::InvalidType { name: name.to_string(), source })
    }

    fn group_slot(&self, name: &str, kind: Kind, outer: usize) -> Result<Vec<Slot>, DecodeError> {
        let inner = self.arg_type(name, Some(outer))?.inner_len();
        (0..inner).map(|j| self.value(name, kind, &[outer, j])).collect()
    }

    fn value(&self, name: &str, kind: Kind, indices: &[usize]) -> Result<Slot, DecodeError> {
        let mut parts = vec![name.to_uppercase(), "VALUE".to_string()];
        parts.extend(indices.iter().map(usize::to_string));
        let key = self.key(&parts.iter().map(String::as_str).collect::<Vec<_>>());

        let Some(raw) = self.source.lookup(&key) else {
            return Ok(None);
        };
        match Value::parse(kind, &raw) {
            Some(value) => Ok(Some(value)),
            None => Err(DecodeError::Conversion { key, expected: kind, raw }),
        }
    }

    fn key(&self, parts: &[&str]) -> String {
        let mut key = self.config.prefix.clone();
        for part in parts {
            key.push('_');
            key.push_str(part);
        }
        key
    }
}

/// Decodes from the process environment with the default prefix.
pub fn decode_env() -> Result<ArgStore, DecodeError> {
    Decoder::new(ProcessEnv).decode()
}

pub fn decode_from<S: EnvSource>(source: S) -> Result<ArgStore, DecodeError> {
    Decoder::new(source).decode()
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnv;
    use crate::store::Lookup;
    use pretty_assertions::assert_eq;

    fn env(pairs: &[(&str, &str)]) -> MapEnv {
        pairs.iter().copied().collect()
    }

    #[test]
    fn missing_list_is_fatal_and_distinguishable() {
        let err = decode_from(MapEnv::new()).unwrap_err();
        assert!(err.is_list_missing());
        assert_eq!(err, DecodeError::ListMissing { key: "OMNI_ARG_LIST".into() });
    }

    #[test]
    fn empty_list_yields_empty_store() {
        let store = decode_from(env(&[("OMNI_ARG_LIST", "")])).unwrap();
        assert!(store.is_empty());
        let store = decode_from(env(&[("OMNI_ARG_LIST", "  \t ")])).unwrap();
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn missing_type_names_the_key() {
        let err = decode_from(env(&[("OMNI_ARG_LIST", "port")])).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TypeMissing { name: "port".into(), key: "OMNI_ARG_PORT_TYPE".into() }
        );
    }

    #[test]
    fn scalars_may_be_unset() {
        let store = decode_from(env(&[
            ("OMNI_ARG_LIST", "Name port"),
            ("OMNI_ARG_NAME_TYPE", "str"),
            ("OMNI_ARG_NAME_VALUE", "omni"),
            ("OMNI_ARG_PORT_TYPE", "int"),
        ]))
        .unwrap();
        assert_eq!(store.string("name"), Lookup::Set("omni".to_string()));
        assert_eq!(store.int("port"), Lookup::Unset);
    }

    #[test]
    fn sequences_have_declared_length() {
        let store = decode_from(env(&[
            ("OMNI_ARG_LIST", "numbers strings"),
            ("OMNI_ARG_NUMBERS_TYPE", "int/3"),
            ("OMNI_ARG_NUMBERS_VALUE_0", "1"),
            ("OMNI_ARG_NUMBERS_VALUE_2", "3"),
            ("OMNI_ARG_STRINGS_TYPE", "str/0"),
        ]))
        .unwrap();
        assert_eq!(store.ints("numbers"), Some(vec![1, 0, 3]));
        assert_eq!(store.strings("strings"), Some(vec![]));
        assert_eq!(
            store.entry("numbers").unwrap().value,
            Decoded::Sequence(vec![Some(Value::Int(1)), None, Some(Value::Int(3))])
        );
    }

    #[test]
    fn groups_read_per_index_sizes() {
        let store = decode_from(env(&[
            ("OMNI_ARG_LIST", "g"),
            ("OMNI_ARG_G_TYPE", "str/2/2"),
            ("OMNI_ARG_G_TYPE_0", "str/2"),
            ("OMNI_ARG_G_VALUE_0_0", "a1"),
            ("OMNI_ARG_G_VALUE_0_1", "a2"),
            ("OMNI_ARG_G_TYPE_1", "str/3"),
            ("OMNI_ARG_G_VALUE_1_0", "b1"),
            ("OMNI_ARG_G_VALUE_1_1", "b2"),
            ("OMNI_ARG_G_VALUE_1_2", "b3"),
        ]))
        .unwrap();
        assert_eq!(
            store.string_groups("g"),
            Some(vec![vec!["a1".to_string(), "a2".to_string()], vec!["b1".into(), "b2".into(), "b3".into()]])
        );
    }

    #[test]
    fn group_sub_types_are_required() {
        let err = decode_from(env(&[
            ("OMNI_ARG_LIST", "g"),
            ("OMNI_ARG_G_TYPE", "int/2/1"),
            ("OMNI_ARG_G_TYPE_0", "int/1"),
            ("OMNI_ARG_G_VALUE_0_0", "7"),
        ]))
        .unwrap_err();
        assert_eq!(err, DecodeError::TypeMissing { name: "g".into(), key: "OMNI_ARG_G_TYPE_1".into() });
    }

    #[test]
    fn conversion_failures_name_the_raw_value() {
        for (ty, raw, kind) in [("bool", "invalid", Kind::Bool), ("int", "4.5", Kind::Int), ("float", "x", Kind::Float)] {
            let err = decode_from(env(&[
                ("OMNI_ARG_LIST", "v"),
                ("OMNI_ARG_V_TYPE", ty),
                ("OMNI_ARG_V_VALUE", raw),
            ]))
            .unwrap_err();
            assert_eq!(
                err,
                DecodeError::Conversion { key: "OMNI_ARG_V_VALUE".into(), expected: kind, raw: raw.into() }
            );
            assert!(err.to_string().contains(raw));
        }
    }

    #[test]
    fn invalid_descriptor_is_an_error() {
        let err = decode_from(env(&[("OMNI_ARG_LIST", "v"), ("OMNI_ARG_V_TYPE", "int/1/2/3")])).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidType { ref name, .. } if name == "v"));
    }

    #[test]
    fn duplicate_names_decode_once() {
        let store = decode_from(env(&[
            ("OMNI_ARG_LIST", "a b A"),
            ("OMNI_ARG_A_TYPE", "bool"),
            ("OMNI_ARG_A_VALUE", "TrUe"),
            ("OMNI_ARG_B_TYPE", "float"),
            ("OMNI_ARG_B_VALUE", "2.5"),
        ]))
        .unwrap();
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(store.bool("a"), Lookup::Set(true));
        assert_eq!(store.float("b"), Lookup::Set(2.5));
    }

    #[test]
    fn custom_prefix() {
        let source = env(&[("HOST_LIST", "x"), ("HOST_X_TYPE", "int"), ("HOST_X_VALUE", "5")]);
        let store = Decoder::with_config(&source, DecoderConfig { prefix: "HOST".into() })
            .decode()
            .unwrap();
        assert_eq!(store.int("x"), Lookup::Set(5));
    }
}
