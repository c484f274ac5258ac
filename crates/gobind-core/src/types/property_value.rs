use crate::core::object::Object;
use crate::types::handles::{RawObject, RawPointer};
use crate::types::primitive::Primitive;

/// A value accepted by [`Object::set_property`].
///
/// | host value | native representation |
/// |---|---|
/// | `bool` | gboolean |
/// | `u8`, `i32`, `u32` | gint |
/// | `f32`, `f64` | gdouble |
/// | strings | NUL-terminated copy |
/// | [`RawPointer`] | passed through |
/// | [`Object`] / [`RawObject`] | the object pointer |
/// | other integers | gint, truncated |
///
/// The native side converts the value to the property's declared type, so
/// an integer can set a double property and a double can set an integer one.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Byte(u8),
    Int(i32),
    UInt(u32),
    Float32(f32),
    Float64(f64),
    String(String),
    Pointer(RawPointer),
    Object(RawObject),
    Integer(i64),
}

impl PropertyValue {
    pub fn to_primitive(&self) -> Primitive {
        match self {
            PropertyValue::Bool(v) => Primitive::Bool(*v),
            PropertyValue::Byte(v) => Primitive::Int(i32::from(*v)),
            PropertyValue::Int(v) => Primitive::Int(*v),
            PropertyValue::UInt(v) => Primitive::Int(*v as i32),
            PropertyValue::Float32(v) => Primitive::Double(f64::from(*v)),
            PropertyValue::Float64(v) => Primitive::Double(*v),
            PropertyValue::String(v) => Primitive::String(v.clone()),
            PropertyValue::Pointer(v) => Primitive::Pointer(*v),
            PropertyValue::Object(v) => Primitive::Object(Some(*v)),
            PropertyValue::Integer(v) => Primitive::Int(*v as i32),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(v: $ty) -> Self {
                    PropertyValue::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    u8 => Byte,
    i32 => Int,
    u32 => UInt,
    f32 => Float32,
    f64 => Float64,
    String => String,
    RawPointer => Pointer,
    RawObject => Object,
}

macro_rules! impl_from_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(v: $ty) -> Self {
                    PropertyValue::Integer(v as i64)
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i64, isize, u16, u64, usize);

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_owned())
    }
}

impl From<&String> for PropertyValue {
    fn from(v: &String) -> Self {
        PropertyValue::String(v.clone())
    }
}

impl From<&Object> for PropertyValue {
    fn from(v: &Object) -> Self {
        PropertyValue::Object(v.as_raw())
    }
}
