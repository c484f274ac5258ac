use crate::types::handles::{RawObject, RawPointer};
use crate::types::type_tag::TypeTag;
use std::ffi::{c_long, c_ulong};

/// A host-side copy of one native scalar, tagged by the variant.
///
/// This is what crosses the backend seam in both directions: values written
/// into a generic value container or a property, and values read back out.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Bool(bool),
    Char(i8),
    UChar(u8),
    Int(i32),
    UInt(u32),
    Long(c_long),
    ULong(c_ulong),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Pointer(RawPointer),
    /// A native object reference; `None` is the null object.
    Object(Option<RawObject>),
}

impl Primitive {
    pub fn tag(&self) -> TypeTag {
        match self {
            Primitive::Bool(_) => TypeTag::Bool,
            Primitive::Char(_) => TypeTag::Char,
            Primitive::UChar(_) => TypeTag::UChar,
            Primitive::Int(_) => TypeTag::Int,
            Primitive::UInt(_) => TypeTag::UInt,
            Primitive::Long(_) => TypeTag::Long,
            Primitive::ULong(_) => TypeTag::ULong,
            Primitive::Int64(_) => TypeTag::Int64,
            Primitive::UInt64(_) => TypeTag::UInt64,
            Primitive::Float(_) => TypeTag::Float,
            Primitive::Double(_) => TypeTag::Double,
            Primitive::String(_) => TypeTag::String,
            Primitive::Pointer(_) => TypeTag::Pointer,
            Primitive::Object(_) => TypeTag::Object,
        }
    }

    /// The value a freshly initialised native container of `tag` holds.
    pub fn zero(tag: TypeTag) -> Option<Self> {
        let value = match tag {
            TypeTag::Bool => Primitive::Bool(false),
            TypeTag::Char => Primitive::Char(0),
            TypeTag::UChar => Primitive::UChar(0),
            TypeTag::Int => Primitive::Int(0),
            TypeTag::UInt => Primitive::UInt(0),
            TypeTag::Long => Primitive::Long(0),
            TypeTag::ULong => Primitive::ULong(0),
            TypeTag::Int64 => Primitive::Int64(0),
            TypeTag::UInt64 => Primitive::UInt64(0),
            TypeTag::Float => Primitive::Float(0.0),
            TypeTag::Double => Primitive::Double(0.0),
            // Bare value containers hold NULL instead; see `Value::get_string`.
            TypeTag::String => Primitive::String(String::new()),
            TypeTag::Pointer => Primitive::Pointer(RawPointer::null()),
            TypeTag::Object => Primitive::Object(None),
            _ => return None,
        };
        Some(value)
    }

    /// Numeric view used for the transformations the native value system
    /// performs between numeric and boolean kinds.
    pub(crate) fn as_f64(&self) -> Option<f64> {
        Some(match *self {
            Primitive::Bool(b) => f64::from(u8::from(b)),
            Primitive::Char(v) => f64::from(v),
            Primitive::UChar(v) => f64::from(v),
            Primitive::Int(v) => f64::from(v),
            Primitive::UInt(v) => f64::from(v),
            Primitive::Long(v) => v as f64,
            Primitive::ULong(v) => v as f64,
            Primitive::Int64(v) => v as f64,
            Primitive::UInt64(v) => v as f64,
            Primitive::Float(v) => f64::from(v),
            Primitive::Double(v) => v,
            _ => return None,
        })
    }

    pub(crate) fn as_i64(&self) -> Option<i64> {
        Some(match *self {
            Primitive::Bool(b) => i64::from(b),
            Primitive::Char(v) => i64::from(v),
            Primitive::UChar(v) => i64::from(v),
            Primitive::Int(v) => i64::from(v),
            Primitive::UInt(v) => i64::from(v),
            Primitive::Long(v) => v as i64,
            Primitive::ULong(v) => v as i64,
            Primitive::Int64(v) => v,
            Primitive::UInt64(v) => v as i64,
            Primitive::Float(v) => v as i64,
            Primitive::Double(v) => v as i64,
            _ => return None,
        })
    }

    /// Convert to `target` the way the native value transformation table
    /// does: numeric and boolean kinds convert into each other with C cast
    /// semantics, every other kind only converts to itself.
    pub fn transform(&self, target: TypeTag) -> Option<Primitive> {
        if self.tag() == target {
            return Some(self.clone());
        }
        if !target.is_numeric() && target != TypeTag::Bool {
            return None;
        }
        let int = self.as_i64()?;
        let float = self.as_f64()?;
        Some(match target {
            TypeTag::Bool => Primitive::Bool(int != 0),
            TypeTag::Char => Primitive::Char(int as i8),
            TypeTag::UChar => Primitive::UChar(int as u8),
            TypeTag::Int | TypeTag::Enum => Primitive::Int(int as i32),
            TypeTag::UInt | TypeTag::Flags => Primitive::UInt(int as u32),
            TypeTag::Long => Primitive::Long(int as c_long),
            TypeTag::ULong => Primitive::ULong(int as c_ulong),
            TypeTag::Int64 => Primitive::Int64(int),
            TypeTag::UInt64 => Primitive::UInt64(int as u64),
            TypeTag::Float => Primitive::Float(float as f32),
            TypeTag::Double => Primitive::Double(float),
            _ => return None,
        })
    }
}

impl From<i32> for Primitive {
    fn from(v: i32) -> Self {
        Primitive::Int(v)
    }
}

impl From<&str> for Primitive {
    fn from(v: &str) -> Self {
        Primitive::String(v.to_owned())
    }
}

impl From<String> for Primitive {
    fn from(v: String) -> Self {
        Primitive::String(v)
    }
}

impl From<bool> for Primitive {
    fn from(v: bool) -> Self {
        Primitive::Bool(v)
    }
}

impl From<f64> for Primitive {
    fn from(v: f64) -> Self {
        Primitive::Double(v)
    }
}
