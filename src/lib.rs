//! Typed command arguments from a flat environment.
//!
//! A host process describes every argument in environment variables
//! (`OMNI_ARG_LIST`, `OMNI_ARG_<NAME>_TYPE`, `OMNI_ARG_<NAME>_VALUE…`). One
//! decode pass turns them into an [`ArgStore`]; the store can then be read
//! through typed accessors, bound onto caller-defined [`Aggregate`]s, or
//! deserialized with serde.
//!
//! ```ignore
//! let mut cfg = Config::default();
//! let store = omniarg::parse_args(&mut [&mut cfg])?;
//! ```
pub mod bind;
pub mod decode;
pub mod descriptor;
pub mod env;
pub mod error;
pub mod ir;
pub mod naming;
pub mod path_de;
pub mod store;
pub mod tag;

pub use bind::{Aggregate, Field, FieldValue, Fields};
pub use decode::{decode_env, decode_from, Decoder, DecoderConfig, DEFAULT_PREFIX};
pub use descriptor::{parse_type_descriptor, Kind, Shape, ShapeKind, TypeDescriptor};
pub use env::{EnvSource, MapEnv, ProcessEnv};
pub use error::{BindError, DecodeError, DeserializeError, EnvFileError, Error, Result, TagError, TypeError};
pub use ir::{Decoded, Value};
pub use naming::{arg_name_for, sanitize_arg_name, to_param_name};
pub use store::{ArgStore, Entry, Lookup};
pub use tag::{extract_and_parse_tag, extract_tag, parse_tag, TagKey, TagOptions, TagValue};

/// Decodes the process environment, then binds each target in order.
pub fn parse_args(targets: &mut [&mut dyn Aggregate]) -> Result<ArgStore> {
    parse_args_from(ProcessEnv, targets)
}

pub fn parse_args_from<S: EnvSource>(source: S, targets: &mut [&mut dyn Aggregate]) -> Result<ArgStore> {
    let store = decode_from(source)?;
    store.bind_all(targets)?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default, PartialEq)]
    struct Flags {
        verbose: bool,
        retries: Option<i64>,
    }

    impl Aggregate for Flags {
        fn bind_fields(&mut self, f: &Fields<'_>) -> std::result::Result<(), BindError> {
            f.leaf(Field::new("Verbose"), &mut self.verbose)?;
            f.leaf(Field::new("Retries"), &mut self.retries)
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Target {
        path: String,
    }

    impl Aggregate for Target {
        fn bind_fields(&mut self, f: &Fields<'_>) -> std::result::Result<(), BindError> {
            f.leaf(Field::new("Path").annotation(r#"json:"path" omniarg:"target""#), &mut self.path)
        }
    }

    fn source() -> MapEnv {
        MapEnv::new()
            .with("OMNI_ARG_LIST", "verbose retries target")
            .with("OMNI_ARG_VERBOSE_TYPE", "bool")
            .with("OMNI_ARG_VERBOSE_VALUE", "TrUe")
            .with("OMNI_ARG_RETRIES_TYPE", "int")
            .with("OMNI_ARG_TARGET_TYPE", "str")
            .with("OMNI_ARG_TARGET_VALUE", "/srv")
    }

    #[test]
    fn parses_and_binds_every_target() {
        let mut flags = Flags::default();
        let mut target = Target::default();
        let store = parse_args_from(source(), &mut [&mut flags, &mut target]).unwrap();
        assert_eq!(flags, Flags { verbose: true, retries: None });
        assert_eq!(target.path, "/srv");
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn decode_errors_come_first() {
        let mut flags = Flags::default();
        let err = parse_args_from(source().with("OMNI_ARG_VERBOSE_VALUE", "invalid"), &mut [&mut flags]).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::Conversion { expected: Kind::Bool, .. })));

        let err = parse_args_from(MapEnv::new(), &mut [&mut flags]).unwrap_err();
        assert!(matches!(err, Error::Decode(ref e) if e.is_list_missing()));
    }

    #[test]
    fn bind_errors_are_wrapped() {
        let mut flags = Flags::default();
        let err = parse_args_from(source().with("OMNI_ARG_RETRIES_TYPE", "float"), &mut [&mut flags]).unwrap_err();
        assert_eq!(
            err,
            Error::Bind(BindError::KindMismatch { field: "Retries".into(), expected: Kind::Int, received: Kind::Float })
        );
    }
}
