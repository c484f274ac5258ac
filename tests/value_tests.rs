mod common;

use gobind::prelude::*;
use std::sync::Arc;

fn backend() -> Arc<InProcessBackend> {
    common::init_logging();
    InProcessBackend::new()
}

#[test]
fn int_and_string_survive_the_native_trip() {
    let backend = backend();
    for input in [Primitive::Int(-17), Primitive::Int(i32::MAX), Primitive::from("héllo")] {
        let value = Value::from_native(backend.clone(), &input).unwrap();
        assert_eq!(value.type_tag(), input.tag());
        assert_eq!(value.to_native().unwrap(), input);
    }
    assert_eq!(backend.live_values(), 0);
}

#[test]
fn other_kinds_are_unsupported_both_ways() {
    let backend = backend();
    let err = Value::from_native(backend.clone(), &Primitive::Bool(true)).unwrap_err();
    assert!(err.is_unsupported_type());

    let value = Value::init(backend.clone(), TypeTag::Bool).unwrap();
    value.set_bool(true).unwrap();
    let err = value.to_native().unwrap_err();
    assert!(matches!(err, BindError::UnsupportedType(TypeTag::Bool)));
}

#[test]
fn release_twice_then_query_the_tag() {
    let backend = backend();
    let mut value = Value::from_native(backend.clone(), &Primitive::from("x")).unwrap();
    value.release();
    value.release();
    assert_eq!(value.type_tag(), TypeTag::Invalid);
    assert!(matches!(value.get_string(), Err(BindError::ReleasedValue)));
    assert!(matches!(value.to_native(), Err(BindError::UnsupportedType(TypeTag::Invalid))));
    drop(value);
    assert_eq!(backend.live_values(), 0);
}

#[test]
fn string_with_interior_nul_is_rejected() {
    let backend = backend();
    let value = Value::init(backend, TypeTag::String).unwrap();
    let err = value.set_string("a\0b").unwrap_err();
    assert!(matches!(err, BindError::StringConversion(_)));
    assert!(value.get_string().unwrap_err().is_nil_ptr());
}

#[test]
fn object_and_pointer_values_pass_handles_through() {
    let backend = backend();
    let target = backend.new_object(false);

    let obj = Value::init(backend.clone(), TypeTag::Object).unwrap();
    assert_eq!(obj.get_object().unwrap(), None);
    obj.set_object(Some(target)).unwrap();
    assert_eq!(obj.get_object().unwrap(), Some(target));

    let mut slot = 7u32;
    let ptr = Value::init(backend, TypeTag::Pointer).unwrap();
    ptr.set_pointer(RawPointer::from(&mut slot as *mut u32)).unwrap();
    assert_eq!(ptr.get_pointer().unwrap().as_ptr() as *mut u32, &mut slot as *mut u32);
}

#[test]
fn every_numeric_accessor_stores_its_own_width() {
    let backend = backend();
    let long = Value::init(backend.clone(), TypeTag::Long).unwrap();
    long.set_long(-3).unwrap();
    assert_eq!(long.get_long().unwrap(), -3);

    let ulong = Value::init(backend.clone(), TypeTag::ULong).unwrap();
    ulong.set_ulong(3).unwrap();
    assert_eq!(ulong.get_ulong().unwrap(), 3);

    let float = Value::init(backend.clone(), TypeTag::Float).unwrap();
    float.set_float(1.5).unwrap();
    assert_eq!(float.get_float().unwrap(), 1.5);

    let uchar = Value::init(backend.clone(), TypeTag::UChar).unwrap();
    uchar.set_uchar(200).unwrap();
    assert_eq!(uchar.get_uchar().unwrap(), 200);

    let uint = Value::init(backend, TypeTag::UInt).unwrap();
    assert!(matches!(
        uint.set_int(1),
        Err(BindError::ValueTypeMismatch { expected: TypeTag::Int, found: TypeTag::UInt })
    ));
}
