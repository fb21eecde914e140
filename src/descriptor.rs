//! Type descriptors exported by the host next to each argument.
//!
//! Grammar: `base[/sizeA[/sizeB]]`.
//! - `int`       → scalar
//! - `int/3`     → sequence of 3 slots
//! - `int/2/5`   → group of 2 outer slots; each outer slot has its own
//!   per-index descriptor (`<N>_TYPE_<i>`) giving the inner length.
//!   `sizeB` is validated as an integer and otherwise ignored.
use std::fmt;

use crate::error::TypeError;

// ------------------------------- Kinds ----------------------------------- //

/// Base kind of every leaf of an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Str,
    Bool,
    Int,
    Float,
}

impl Kind {
    /// Unknown base names fall back to `Str`.
    pub fn from_base(base: &str) -> Self {
        match base {
            "bool" => Kind::Bool,
            "int" => Kind::Int,
            "float" => Kind::Float,
            _ => Kind::Str,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Str => "str",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ------------------------------- Shapes ---------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Sequence(usize),
    /// Outer length; inner lengths come from the per-index descriptors.
    Group(usize),
}

/// Shape without its sizes, as seen from a target field's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Scalar,
    Sequence,
    Group,
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Scalar => ShapeKind::Scalar,
            Shape::Sequence(_) => ShapeKind::Sequence,
            Shape::Group(_) => ShapeKind::Group,
        }
    }

    /// Declared length, `None` for scalars.
    pub fn size(&self) -> Option<usize> {
        match self {
            Shape::Scalar => None,
            Shape::Sequence(n) | Shape::Group(n) => Some(*n),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShapeKind::Scalar => "single value",
            ShapeKind::Sequence => "sequence",
            ShapeKind::Group => "grouped sequence",
        })
    }
}

// ----------------------------- Descriptor -------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Descriptor exactly as read from the store.
    pub raw: String,
    /// Base name as written, before the `Str` fallback.
    pub base: String,
    pub kind: Kind,
    pub shape: Shape,
}

impl TypeDescriptor {
    /// Inner length when this descriptor describes one outer slot of a group.
    pub(crate) fn inner_len(&self) -> usize {
        self.shape.size().unwrap_or(0)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

pub fn parse_type_descriptor(raw: &str) -> Result<TypeDescriptor, TypeError> {
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() > 3 {
        return Err(TypeError::TooManySegments { raw: raw.to_string() });
    }

    let size = |segment: &str| -> Result<usize, TypeError> {
        segment.parse::<usize>().map_err(|_| TypeError::InvalidSize {
            raw: raw.to_string(),
            segment: segment.to_string(),
        })
    };

    let base = parts[0];
    let shape = match parts.as_slice() {
        [_] => Shape::Scalar,
        [_, len] => Shape::Sequence(size(*len)?),
        [_, outer, group] => {
            size(*group)?;
            Shape::Group(size(*outer)?)
        }
        _ => unreachable!("split yields between one and three segments here"),
    };

    Ok(TypeDescriptor {
        raw: raw.to_string(),
        base: base.to_string(),
        kind: Kind::from_base(base),
        shape,
    })
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scalar_descriptors_have_no_size() {
        let d = parse_type_descriptor("bool").unwrap();
        assert_eq!(d.kind, Kind::Bool);
        assert_eq!(d.shape, Shape::Scalar);
        assert_eq!(d.shape.size(), None);
    }

    #[test]
    fn sequence_recovers_base_and_size() {
        for (raw, kind, n) in [("str/0", Kind::Str, 0), ("int/3", Kind::Int, 3), ("float/12", Kind::Float, 12)] {
            let d = parse_type_descriptor(raw).unwrap();
            assert_eq!(d.kind, kind, "{raw}");
            assert_eq!(d.shape, Shape::Sequence(n), "{raw}");
            assert_eq!(d.raw, raw);
        }
    }

    #[test]
    fn group_keeps_outer_size_and_validates_inner() {
        let d = parse_type_descriptor("str/2/5").unwrap();
        assert_eq!(d.shape, Shape::Group(2));
        assert_eq!(d.shape.kind(), ShapeKind::Group);

        let err = parse_type_descriptor("str/2/x").unwrap_err();
        assert_eq!(err, TypeError::InvalidSize { raw: "str/2/x".into(), segment: "x".into() });
    }

    #[test]
    fn malformed_descriptors_fail() {
        assert!(matches!(parse_type_descriptor("int/1/2/3"), Err(TypeError::TooManySegments { .. })));
        assert!(matches!(parse_type_descriptor("int/abc"), Err(TypeError::InvalidSize { .. })));
        assert!(matches!(parse_type_descriptor("int/-1"), Err(TypeError::InvalidSize { .. })));
        assert!(matches!(parse_type_descriptor("int/"), Err(TypeError::InvalidSize { .. })));
    }

    #[test]
    fn unknown_base_falls_back_to_string() {
        let d = parse_type_descriptor("path/2").unwrap();
        assert_eq!(d.base, "path");
        assert_eq!(d.kind, Kind::Str);
        assert_eq!(d.shape, Shape::Sequence(2));
    }
}
