use crate::backend::NativeBackend;
use crate::error::{BindError, BindResult};
use crate::types::handles::RawObject;
use crate::types::property_value::PropertyValue;
use std::ffi::c_void;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A wrapper around a native object instance.
///
/// # Object Lifecycle
///
/// The wrapper does not own the instance. The native reference count is the
/// only count there is: [`add_ref`](Object::add_ref), [`unref`](Object::unref)
/// and [`ref_sink`](Object::ref_sink) change it directly and dropping or
/// cloning an `Object` changes nothing. A freshly created instance may be
/// *floating*; sink it before storing it anywhere long-lived.
///
/// # Properties and signals
///
/// [`set_property`](Object::set_property) sets exactly one property per call.
/// [`emit`](Object::emit) emits a signal that takes no arguments. Handlers
/// are connected through a [`CallbackRegistry`](crate::core::registry::CallbackRegistry).
#[derive(Clone)]
pub struct Object {
    raw: RawObject,
    backend: Arc<dyn NativeBackend>,
}

impl Object {
    pub fn new(backend: Arc<dyn NativeBackend>, raw: RawObject) -> Self {
        Self { raw, backend }
    }

    /// Wrap a native instance pointer, rejecting null.
    pub fn from_raw(backend: Arc<dyn NativeBackend>, ptr: *mut c_void) -> BindResult<Self> {
        let raw = RawObject::from_ptr(ptr).ok_or(BindError::NilPtr)?;
        Ok(Self::new(backend, raw))
    }

    pub fn as_raw(&self) -> RawObject {
        self.raw
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.raw.as_ptr()
    }

    pub fn backend(&self) -> &Arc<dyn NativeBackend> {
        &self.backend
    }

    pub fn add_ref(&self) {
        self.backend.object_ref(self.raw);
    }

    pub fn unref(&self) {
        self.backend.object_unref(self.raw);
    }

    pub fn ref_sink(&self) {
        self.backend.object_ref_sink(self.raw);
    }

    pub fn is_floating(&self) -> bool {
        self.backend.object_is_floating(self.raw)
    }

    pub fn force_floating(&self) {
        self.backend.object_force_floating(self.raw);
    }

    /// Stop the emission of `signal` that is currently running on this
    /// object. Handlers not yet reached are skipped.
    pub fn stop_emission(&self, signal: &str) -> BindResult<()> {
        self.backend.signal_stop_emission_by_name(self.raw, signal)
    }

    /// Set one named property.
    ///
    /// Unlike a variadic native setter this takes a single name/value pair;
    /// make one call per property.
    pub fn set_property(&self, name: &str, value: impl Into<PropertyValue>) -> BindResult<()> {
        let value = value.into().to_primitive();
        log::debug!("set property '{}' on {:?} to {:?}", name, self.raw, value);
        self.backend.object_set_property(self.raw, name, &value)
    }

    /// Emit a signal that takes no arguments.
    pub fn emit(&self, signal: &str) -> BindResult<()> {
        log::trace!("emit '{}' on {:?}", signal, self.raw);
        self.backend.signal_emit_by_name(self.raw, signal)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Object {}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object").field("raw", &self.raw).finish()
    }
}

/// An object that starts life with a floating reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitiallyUnowned {
    object: Object,
}

impl InitiallyUnowned {
    pub fn new(object: Object) -> Self {
        Self { object }
    }

    /// Convert the floating reference into a normal one, if it is still
    /// floating, and hand back the plain object.
    pub fn take_ownership(self) -> Object {
        if self.object.is_floating() {
            self.object.ref_sink();
        }
        self.object
    }
}

impl Deref for InitiallyUnowned {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::in_process::InProcessBackend;
    use crate::types::primitive::Primitive;
    use crate::types::type_tag::TypeTag;
    use std::ptr;

    fn setup() -> (Arc<InProcessBackend>, Object) {
        let backend = InProcessBackend::new();
        let raw = backend.new_object(false);
        let object = Object::new(backend.clone(), raw);
        (backend, object)
    }

    #[test]
    fn null_pointer_is_nil_ptr() {
        let backend = InProcessBackend::new();
        let err = Object::from_raw(backend, ptr::null_mut()).unwrap_err();
        assert!(err.is_nil_ptr());
    }

    #[test]
    fn ref_and_unref_delegate() {
        let (backend, object) = setup();
        assert_eq!(backend.ref_count(object.as_raw()), Some(1));
        object.add_ref();
        object.add_ref();
        assert_eq!(backend.ref_count(object.as_raw()), Some(3));
        object.unref();
        assert_eq!(backend.ref_count(object.as_raw()), Some(2));
    }

    #[test]
    fn clones_do_not_touch_the_native_count() {
        let (backend, object) = setup();
        let copy = object.clone();
        drop(copy);
        assert_eq!(backend.ref_count(object.as_raw()), Some(1));
    }

    #[test]
    fn floating_lifecycle() {
        let backend = InProcessBackend::new();
        let object = Object::new(backend.clone(), backend.new_object(true));
        assert!(object.is_floating());
        object.ref_sink();
        assert!(!object.is_floating());
        assert_eq!(backend.ref_count(object.as_raw()), Some(1));
        object.ref_sink();
        assert_eq!(backend.ref_count(object.as_raw()), Some(2));
        object.force_floating();
        assert!(object.is_floating());
    }

    #[test]
    fn initially_unowned_sinks_once() {
        let backend = InProcessBackend::new();
        let unowned =
            InitiallyUnowned::new(Object::new(backend.clone(), backend.new_object(true)));
        assert!(unowned.is_floating());
        let object = unowned.take_ownership();
        assert!(!object.is_floating());
        assert_eq!(backend.ref_count(object.as_raw()), Some(1));
    }

    #[test]
    fn set_property_uses_conversion_table() {
        let (backend, object) = setup();
        let raw = object.as_raw();
        backend.install_property(raw, "label", TypeTag::String);
        backend.install_property(raw, "width", TypeTag::Int);
        backend.install_property(raw, "opacity", TypeTag::Double);
        backend.install_property(raw, "visible", TypeTag::Bool);

        object.set_property("label", "OK").unwrap();
        object.set_property("width", 120u32).unwrap();
        object.set_property("opacity", 0.5f32).unwrap();
        object.set_property("visible", true).unwrap();

        assert_eq!(backend.property(raw, "label"), Some(Primitive::from("OK")));
        assert_eq!(backend.property(raw, "width"), Some(Primitive::Int(120)));
        assert_eq!(backend.property(raw, "opacity"), Some(Primitive::Double(0.5)));
        assert_eq!(backend.property(raw, "visible"), Some(Primitive::Bool(true)));
    }

    #[test]
    fn set_unknown_property_fails() {
        let (_backend, object) = setup();
        let err = object.set_property("missing", 1).unwrap_err();
        assert!(matches!(err, BindError::UnknownProperty(name) if name == "missing"));
    }

    #[test]
    fn property_name_with_nul_is_rejected() {
        let (backend, object) = setup();
        backend.install_property(object.as_raw(), "a", TypeTag::Int);
        let err = object.set_property("a\0b", 1).unwrap_err();
        assert!(matches!(err, BindError::StringConversion(_)));
    }

    #[test]
    fn emit_unknown_signal_fails() {
        let (_backend, object) = setup();
        let err = object.emit("nope").unwrap_err();
        assert!(matches!(err, BindError::UnknownSignal(_)));
    }
}
