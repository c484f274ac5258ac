use crate::backend::NativeBackend;
use crate::error::{BindError, BindResult};
use crate::types::handles::{RawObject, RawPointer, RawValue};
use crate::types::primitive::Primitive;
use crate::types::type_tag::TypeTag;
use std::ffi::{c_long, c_ulong};
use std::fmt;
use std::sync::Arc;

/// A native generic value container together with its runtime type tag.
///
/// A `Value` owns its native storage and releases it exactly once: either
/// through an explicit [`release`](Value::release) or, as a safety net, when
/// it is dropped. Prefer the explicit call where the release point matters.
/// After release the value reports [`TypeTag::Invalid`] and every typed
/// accessor fails with [`BindError::ReleasedValue`].
pub struct Value {
    raw: Option<RawValue>,
    backend: Arc<dyn NativeBackend>,
}

macro_rules! typed_accessors {
    ($($(#[$meta:meta])* $set:ident, $get:ident => $ty:ty, $variant:ident;)*) => {
        $(
            $(#[$meta])*
            pub fn $set(&self, value: $ty) -> BindResult<()> {
                self.set(&Primitive::$variant(value))
            }

            $(#[$meta])*
            pub fn $get(&self) -> BindResult<$ty> {
                match self.get_as(TypeTag::$variant)? {
                    Primitive::$variant(value) => Ok(value),
                    other => Err(BindError::ValueTypeMismatch {
                        expected: TypeTag::$variant,
                        found: other.tag(),
                    }),
                }
            }
        )*
    };
}

impl Value {
    /// Allocate an empty value. It holds [`TypeTag::Invalid`] until the
    /// native side initialises it.
    pub fn alloc(backend: Arc<dyn NativeBackend>) -> BindResult<Self> {
        let raw = backend.value_alloc().ok_or(BindError::NilPtr)?;
        Ok(Self {
            raw: Some(raw),
            backend,
        })
    }

    /// Allocate a value initialised to hold `tag`.
    pub fn init(backend: Arc<dyn NativeBackend>, tag: TypeTag) -> BindResult<Self> {
        let raw = backend.value_init(tag).ok_or(BindError::NilPtr)?;
        Ok(Self {
            raw: Some(raw),
            backend,
        })
    }

    /// Build a value from a host primitive. Only integers and strings are
    /// supported.
    pub fn from_native(backend: Arc<dyn NativeBackend>, value: &Primitive) -> BindResult<Self> {
        match value {
            Primitive::Int(v) => {
                let val = Value::init(backend, TypeTag::Int)?;
                val.set_int(*v)?;
                Ok(val)
            }
            Primitive::String(v) => {
                let val = Value::init(backend, TypeTag::String)?;
                val.set_string(v)?;
                Ok(val)
            }
            other => Err(BindError::UnsupportedType(other.tag())),
        }
    }

    /// Read the value back as a host primitive. Only the int and string tags
    /// are supported; a string value holding NULL reads as the empty string.
    pub fn to_native(&self) -> BindResult<Primitive> {
        match self.type_tag() {
            TypeTag::Int => Ok(Primitive::Int(self.get_int()?)),
            TypeTag::String => match self.get_string() {
                Ok(s) => Ok(Primitive::String(s)),
                Err(BindError::NilPtr) => Ok(Primitive::String(String::new())),
                Err(e) => Err(e),
            },
            other => Err(BindError::UnsupportedType(other)),
        }
    }

    /// Unset the value and free its native storage. Calling this more than
    /// once is a no-op.
    pub fn release(&mut self) {
        if let Some(raw) = self.raw.take() {
            log::trace!("release {:?}", raw);
            self.backend.value_unset(raw);
        }
    }

    pub fn is_released(&self) -> bool {
        self.raw.is_none()
    }

    pub fn as_raw(&self) -> Option<RawValue> {
        self.raw
    }

    pub fn type_tag(&self) -> TypeTag {
        match self.raw {
            Some(raw) => self.backend.value_type(raw),
            None => TypeTag::Invalid,
        }
    }

    /// Store `data`, which must match the tag the value holds.
    pub fn set(&self, data: &Primitive) -> BindResult<()> {
        let raw = self.live()?;
        self.check_tag(raw, data.tag())?;
        self.backend.value_set(raw, data)
    }

    /// Read whatever the value holds.
    pub fn get(&self) -> BindResult<Primitive> {
        let raw = self.live()?;
        self.backend.value_get(raw)
    }

    typed_accessors! {
        set_bool, get_bool => bool, Bool;
        set_char, get_char => i8, Char;
        set_uchar, get_uchar => u8, UChar;
        set_int, get_int => i32, Int;
        set_uint, get_uint => u32, UInt;
        set_long, get_long => c_long, Long;
        set_ulong, get_ulong => c_ulong, ULong;
        set_int64, get_int64 => i64, Int64;
        set_uint64, get_uint64 => u64, UInt64;
        set_float, get_float => f32, Float;
        set_double, get_double => f64, Double;
        set_pointer, get_pointer => RawPointer, Pointer;
        set_object, get_object => Option<RawObject>, Object;
    }

    pub fn set_string(&self, value: &str) -> BindResult<()> {
        self.set(&Primitive::String(value.to_owned()))
    }

    /// Fails with [`BindError::NilPtr`] when the value holds a NULL string.
    pub fn get_string(&self) -> BindResult<String> {
        match self.get_as(TypeTag::String)? {
            Primitive::String(value) => Ok(value),
            other => Err(BindError::ValueTypeMismatch {
                expected: TypeTag::String,
                found: other.tag(),
            }),
        }
    }

    fn get_as(&self, tag: TypeTag) -> BindResult<Primitive> {
        let raw = self.live()?;
        self.check_tag(raw, tag)?;
        self.backend.value_get(raw)
    }

    fn live(&self) -> BindResult<RawValue> {
        self.raw.ok_or(BindError::ReleasedValue)
    }

    fn check_tag(&self, raw: RawValue, expected: TypeTag) -> BindResult<()> {
        let found = self.backend.value_type(raw);
        if found == expected {
            Ok(())
        } else {
            Err(BindError::ValueTypeMismatch { expected, found })
        }
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("raw", &self.raw)
            .field("tag", &self.type_tag())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::in_process::InProcessBackend;

    #[test]
    fn alloc_starts_invalid() {
        let backend = InProcessBackend::new();
        let value = Value::alloc(backend).unwrap();
        assert_eq!(value.type_tag(), TypeTag::Invalid);
        assert!(matches!(
            value.set_int(1),
            Err(BindError::ValueTypeMismatch { expected: TypeTag::Int, found: TypeTag::Invalid })
        ));
    }

    #[test]
    fn init_sets_the_tag() {
        let backend = InProcessBackend::new();
        let value = Value::init(backend, TypeTag::Double).unwrap();
        assert_eq!(value.type_tag(), TypeTag::Double);
        assert_eq!(value.get_double().unwrap(), 0.0);
    }

    #[test]
    fn init_of_a_non_value_type_is_nil_ptr() {
        let backend = InProcessBackend::new();
        let err = Value::init(backend.clone(), TypeTag::Invalid).unwrap_err();
        assert!(err.is_nil_ptr());
        let err = Value::init(backend, TypeTag::Boxed).unwrap_err();
        assert!(err.is_nil_ptr());
    }

    #[test]
    fn typed_set_and_get() {
        let backend = InProcessBackend::new();
        let b = Value::init(backend.clone(), TypeTag::Bool).unwrap();
        b.set_bool(true).unwrap();
        assert!(b.get_bool().unwrap());

        let u = Value::init(backend.clone(), TypeTag::UInt64).unwrap();
        u.set_uint64(u64::MAX).unwrap();
        assert_eq!(u.get_uint64().unwrap(), u64::MAX);

        let c = Value::init(backend.clone(), TypeTag::Char).unwrap();
        c.set_char(-5).unwrap();
        assert_eq!(c.get_char().unwrap(), -5);

        let p = Value::init(backend, TypeTag::Pointer).unwrap();
        assert!(p.get_pointer().unwrap().is_null());
    }

    #[test]
    fn wrong_typed_access_is_a_mismatch() {
        let backend = InProcessBackend::new();
        let value = Value::init(backend, TypeTag::String).unwrap();
        let err = value.get_int().unwrap_err();
        assert!(matches!(
            err,
            BindError::ValueTypeMismatch { expected: TypeTag::Int, found: TypeTag::String }
        ));
    }

    #[test]
    fn fresh_string_value_is_null() {
        let backend = InProcessBackend::new();
        let value = Value::init(backend, TypeTag::String).unwrap();
        assert!(value.get_string().unwrap_err().is_nil_ptr());
        assert_eq!(value.to_native().unwrap(), Primitive::String(String::new()));
    }

    #[test]
    fn release_is_idempotent() {
        let backend = InProcessBackend::new();
        let mut value = Value::init(backend.clone(), TypeTag::Int).unwrap();
        value.set_int(4).unwrap();
        assert_eq!(backend.live_values(), 1);

        value.release();
        value.release();
        assert!(value.is_released());
        assert_eq!(value.type_tag(), TypeTag::Invalid);
        assert_eq!(backend.live_values(), 0);
        assert!(matches!(value.get_int(), Err(BindError::ReleasedValue)));
    }

    #[test]
    fn drop_releases_the_native_value() {
        let backend = InProcessBackend::new();
        {
            let _value = Value::init(backend.clone(), TypeTag::Int).unwrap();
            assert_eq!(backend.live_values(), 1);
        }
        assert_eq!(backend.live_values(), 0);
    }

    #[test]
    fn from_native_rejects_unsupported_kinds() {
        let backend = InProcessBackend::new();
        for primitive in [
            Primitive::Bool(true),
            Primitive::Double(1.0),
            Primitive::Float(1.0),
            Primitive::UInt(3),
            Primitive::Int64(3),
            Primitive::Pointer(RawPointer::null()),
            Primitive::Object(None),
        ] {
            let tag = primitive.tag();
            let err = Value::from_native(backend.clone(), &primitive).unwrap_err();
            assert!(matches!(err, BindError::UnsupportedType(t) if t == tag));
        }
        assert_eq!(backend.live_values(), 0);
    }

    #[test]
    fn to_native_rejects_unsupported_tags() {
        let backend = InProcessBackend::new();
        let value = Value::init(backend, TypeTag::Double).unwrap();
        let err = value.to_native().unwrap_err();
        assert!(matches!(err, BindError::UnsupportedType(TypeTag::Double)));
    }
}
