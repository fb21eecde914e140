//! Structural binding of an [`ArgStore`] onto caller-owned aggregates.
//!
//! Each target type implements [`Aggregate`] by listing its fields through
//! [`Fields`]: terminal fields go through [`Fields::leaf`], nested aggregates
//! through [`Fields::nested`] / [`Fields::nested_opt`].
//!
//! ```ignore
//! struct Db { host: String, port: Option<i64> }
//!
//! impl Aggregate for Db {
//!     fn bind_fields(&mut self, f: &Fields<'_>) -> Result<(), BindError> {
//!         f.leaf(Field::new("Host"), &mut self.host)?;
//!         f.leaf(Field::new("Port"), &mut self.port)
//!     }
//! }
//! ```
//!
//! Field names come from the identifier (`LogFile` → `log_file`) unless the
//! tag overrides them; nested aggregates prefix their fields with their own
//! resolved name and `_`. The expected kind and shape come from the field's
//! Rust type; `Option` marks a leaf as nullable without changing its shape.
use tracing::{debug, trace};

use crate::descriptor::{Kind, ShapeKind};
use crate::error::{BindError, TagError};
use crate::ir::{leaf_opt, leaf_or_zero, Decoded, Leaf, Slot};
use crate::naming::{sanitize_arg_name, to_param_name, SEPARATOR};
use crate::store::ArgStore;
use crate::tag::{extract_and_parse_tag, parse_tag, TagOptions, TAG_NAMESPACE};

// ------------------------------ Aggregates ------------------------------- //

pub trait Aggregate {
    fn bind_fields(&mut self, fields: &Fields<'_>) -> Result<(), BindError>;
}

impl<A: Aggregate + ?Sized> Aggregate for Box<A> {
    fn bind_fields(&mut self, fields: &Fields<'_>) -> Result<(), BindError> {
        (**self).bind_fields(fields)
    }
}

/// A field as declared on its aggregate: identifier plus optional tag.
#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    ident: &'a str,
    tag: Option<TagSource<'a>>,
}

#[derive(Debug, Clone, Copy)]
enum TagSource<'a> {
    /// Contents of the `omniarg` namespace (`db_host required=true`).
    Contents(&'a str),
    /// Full annotation; the `omniarg` namespace is extracted from it.
    Annotation(&'a str),
}

impl<'a> Field<'a> {
    pub const fn new(ident: &'a str) -> Self {
        Self { ident, tag: None }
    }

    pub const fn tag(self, contents: &'a str) -> Self {
        Self { tag: Some(TagSource::Contents(contents)), ..self }
    }

    pub const fn annotation(self, raw: &'a str) -> Self {
        Self { tag: Some(TagSource::Annotation(raw)), ..self }
    }

    pub fn ident(&self) -> &'a str {
        self.ident
    }

    fn options(&self) -> Result<Option<TagOptions>, TagError> {
        match self.tag {
            None => Ok(None),
            Some(TagSource::Contents(contents)) => parse_tag(contents).map(Some),
            Some(TagSource::Annotation(raw)) => extract_and_parse_tag(raw, TAG_NAMESPACE),
        }
    }
}

// ------------------------------ Leaf types -------------------------------- //

/// Terminal field type. Kind and shape are fixed by the Rust type:
/// `T` / `Option<T>` → scalar, `Vec<_>` → sequence, `Vec<Vec<_>>` → group.
pub trait FieldValue: Sized {
    const KIND: Kind;
    const SHAPE: ShapeKind;
    /// Unset slots become `None` instead of the zero value.
    const OPTIONAL: bool;

    /// Called only once kind and shape have been checked.
    fn from_decoded(value: &Decoded) -> Self;
}

fn scalar<T: Default>(value: &Decoded, slot: fn(&Slot) -> T) -> T {
    match value {
        Decoded::Scalar(s) => slot(s),
        _ => T::default(),
    }
}

fn sequence<T>(value: &Decoded, slot: fn(&Slot) -> T) -> Vec<T> {
    match value {
        Decoded::Sequence(slots) => slots.iter().map(slot).collect(),
        _ => Vec::new(),
    }
}

fn group<T>(value: &Decoded, slot: fn(&Slot) -> T) -> Vec<Vec<T>> {
    match value {
        Decoded::Group(groups) => groups.iter().map(|g| g.iter().map(slot).collect()).collect(),
        _ => Vec::new(),
    }
}

macro_rules! field_values {
    ($($leaf:ty),* $(,)?) => {$(
        impl FieldValue for $leaf {
            const KIND: Kind = <$leaf as Leaf>::KIND;
            const SHAPE: ShapeKind = ShapeKind::Scalar;
            const OPTIONAL: bool = false;
            fn from_decoded(value: &Decoded) -> Self {
                scalar(value, leaf_or_zero::<$leaf>)
            }
        }

        impl FieldValue for Option<$leaf> {
            const KIND: Kind = <$leaf as Leaf>::KIND;
            const SHAPE: ShapeKind = ShapeKind::Scalar;
            const OPTIONAL: bool = true;
            fn from_decoded(value: &Decoded) -> Self {
                scalar(value, leaf_opt::<$leaf>)
            }
        }

        impl FieldValue for Vec<$leaf> {
            const KIND: Kind = <$leaf as Leaf>::KIND;
            const SHAPE: ShapeKind = ShapeKind::Sequence;
            const OPTIONAL: bool = false;
            fn from_decoded(value: &Decoded) -> Self {
                sequence(value, leaf_or_zero::<$leaf>)
            }
        }

        impl FieldValue for Vec<Option<$leaf>> {
            const KIND: Kind = <$leaf as Leaf>::KIND;
            const SHAPE: ShapeKind = ShapeKind::Sequence;
            const OPTIONAL: bool = true;
            fn from_decoded(value: &Decoded) -> Self {
                sequence(value, leaf_opt::<$leaf>)
            }
        }

        impl FieldValue for Vec<Vec<$leaf>> {
            const KIND: Kind = <$leaf as Leaf>::KIND;
            const SHAPE: ShapeKind = ShapeKind::Group;
            const OPTIONAL: bool = false;
            fn from_decoded(value: &Decoded) -> Self {
                group(value, leaf_or_zero::<$leaf>)
            }
        }

        impl FieldValue for Vec<Vec<Option<$leaf>>> {
            const KIND: Kind = <$leaf as Leaf>::KIND;
            const SHAPE: ShapeKind = ShapeKind::Group;
            const OPTIONAL: bool = true;
            fn from_decoded(value: &Decoded) -> Self {
                group(value, leaf_opt::<$leaf>)
            }
        }
    )*};
}

field_values!(String, bool, i64, f64);

// -------------------------------- Binding -------------------------------- //

/// Binding context for one aggregate: the store plus the name prefix
/// accumulated from enclosing aggregates.
pub struct Fields<'s> {
    store: &'s ArgStore,
    prefix: String,
}

impl<'s> Fields<'s> {
    fn new(store: &'s ArgStore, prefix: String) -> Self {
        Self { store, prefix }
    }

    pub fn store(&self) -> &'s ArgStore {
        self.store
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full argument name of `field`, or `None` when its tag skips it.
    pub fn resolve(&self, field: &Field<'_>) -> Result<Option<String>, BindError> {
        let tag = field
            .options()
            .map_err(|source| BindError::Tag { field: field.ident.to_string(), source })?;
        if tag.as_ref().is_some_and(|t| t.skip) {
            return Ok(None);
        }

        let base = match tag.as_ref().and_then(TagOptions::name_override) {
            Some(name) => name.to_string(),
            None => to_param_name(field.ident),
        };
        let name = sanitize_arg_name(&base, SEPARATOR);
        if name.is_empty() {
            return Err(BindError::MissingName { field: field.ident.to_string() });
        }
        Ok(Some(format!("{}{}", self.prefix, name)))
    }

    /// Binds a terminal field. The target is replaced, never merged.
    pub fn leaf<T: FieldValue>(&self, field: Field<'_>, target: &mut T) -> Result<(), BindError> {
        let Some(name) = self.resolve(&field)? else {
            trace!(field = field.ident, "skipped");
            return Ok(());
        };
        let entry = self.store.entry(&name).ok_or_else(|| BindError::Unresolved {
            field: field.ident.to_string(),
            name: name.clone(),
        })?;

        if entry.descriptor.kind != T::KIND {
            return Err(BindError::KindMismatch {
                field: field.ident.to_string(),
                expected: T::KIND,
                received: entry.descriptor.kind,
            });
        }
        let received = entry.descriptor.shape.kind();
        if received != T::SHAPE {
            return Err(BindError::ShapeMismatch {
                field: field.ident.to_string(),
                expected: T::SHAPE,
                received,
            });
        }

        trace!(field = field.ident, arg = %name, shape = %T::SHAPE, optional = T::OPTIONAL, "bound");
        *target = T::from_decoded(&entry.value);
        Ok(())
    }

    /// Recurses into a nested aggregate, prefixing its fields with this
    /// field's resolved name.
    pub fn nested<A: Aggregate + ?Sized>(&self, field: Field<'_>, target: &mut A) -> Result<(), BindError> {
        match self.resolve(&field)? {
            Some(name) => self.descend(&field, name, target),
            None => Ok(()),
        }
    }

    /// Like [`Fields::nested`] for an optional aggregate; `None` is replaced
    /// by `A::default()` first so nested values have somewhere to land.
    pub fn nested_opt<A: Aggregate + Default>(
        &self,
        field: Field<'_>,
        target: &mut Option<A>,
    ) -> Result<(), BindError> {
        let Some(name) = self.resolve(&field)? else {
            return Ok(());
        };
        let inner = target.get_or_insert_with(|| {
            debug!(field = field.ident, "allocating nested aggregate");
            A::default()
        });
        self.descend(&field, name, inner)
    }

    fn descend<A: Aggregate + ?Sized>(&self, field: &Field<'_>, name: String, target: &mut A) -> Result<(), BindError> {
        let inner = Fields::new(self.store, format!("{name}{SEPARATOR}"));
        target.bind_fields(&inner).map_err(|source| BindError::Nested {
            field: field.ident.to_string(),
            source: Box::new(source),
        })
    }
}

impl ArgStore {
    pub fn bind<A: Aggregate + ?Sized>(&self, target: &mut A) -> Result<(), BindError> {
        target.bind_fields(&Fields::new(self, String::new()))
    }

    /// Binds each target in order; the first failure stops the rest.
    pub fn bind_all(&self, targets: &mut [&mut dyn Aggregate]) -> Result<(), BindError> {
        for target in targets.iter_mut() {
            self.bind(&mut **target)?;
        }
        Ok(())
    }

    /// Builds a fresh `A` and binds it.
    pub fn extract<A: Aggregate + Default>(&self) -> Result<A, BindError> {
        let mut target = A::default();
        self.bind(&mut target)?;
        Ok(target)
    }
}

// ------------------------------- Tests ------------------------------------ //
