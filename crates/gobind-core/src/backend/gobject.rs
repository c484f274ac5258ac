//! [`NativeBackend`] over libgobject-2.0.
//!
//! Handles are real instance and `GValue` pointers. Signal handlers are
//! `GClosure`s whose meta-marshal carries the call id and a weak reference to
//! the dispatch sink; the closure's finalize notifier frees that carrier when
//! GObject drops the handler.

use crate::backend::{
    Connection, ConnectFlags, DispatchSink, Invocation, NativeArg, NativeBackend,
};
use crate::error::{BindError, BindResult, CallId};
use crate::internal::marshal::{from_gboolean, read_native_string, to_gboolean, to_native_string};
use crate::types::handles::{RawObject, RawPointer, RawValue};
use crate::types::primitive::Primitive;
use crate::types::type_tag::TypeTag;
use gobind_sys as sys;
use std::ffi::CStr;
use std::mem::{self, MaybeUninit};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;
use std::sync::{Arc, Weak};

/// `G_SIGNAL_TYPE_STATIC_SCOPE`, or-ed into parameter and return types.
const SIGNAL_TYPE_STATIC_SCOPE: sys::GType = 1;

/// Closure marshal data: which registry entry to run, and where.
struct ClosureCarrier {
    call_id: CallId,
    sink: Weak<dyn DispatchSink>,
}

#[derive(Debug, Default)]
pub struct GObjectBackend;

impl GObjectBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(GObjectBackend)
    }
}

unsafe fn instance_type(object: RawObject) -> sys::GType {
    unsafe {
        let instance = object.as_ptr() as *const sys::GTypeInstance;
        (*(*instance).g_class).g_type
    }
}

unsafe fn fundamental_tag(gtype: sys::GType) -> TypeTag {
    if gtype == sys::G_TYPE_INVALID {
        return TypeTag::Invalid;
    }
    TypeTag::from_gtype(unsafe { sys::g_type_fundamental(gtype) })
}

/// Resolve `signal` on the instance's type to its id and detail quark.
unsafe fn parse_signal(object: RawObject, signal: &CStr) -> Option<(sys::guint, sys::GQuark)> {
    let mut signal_id = 0;
    let mut detail = 0;
    let found = unsafe {
        sys::g_signal_parse_name(
            signal.as_ptr(),
            instance_type(object),
            &mut signal_id,
            &mut detail,
            sys::GFALSE,
        )
    };
    from_gboolean(found).then_some((signal_id, detail))
}

/// Store `data` into an initialised `GValue` of the same fundamental type.
unsafe fn write_gvalue(gvalue: *mut sys::GValue, data: &Primitive) -> BindResult<()> {
    unsafe {
        match data {
            Primitive::Bool(v) => sys::g_value_set_boolean(gvalue, to_gboolean(*v)),
            Primitive::Char(v) => sys::g_value_set_schar(gvalue, *v),
            Primitive::UChar(v) => sys::g_value_set_uchar(gvalue, *v),
            Primitive::Int(v) => sys::g_value_set_int(gvalue, *v),
            Primitive::UInt(v) => sys::g_value_set_uint(gvalue, *v),
            Primitive::Long(v) => sys::g_value_set_long(gvalue, *v),
            Primitive::ULong(v) => sys::g_value_set_ulong(gvalue, *v),
            Primitive::Int64(v) => sys::g_value_set_int64(gvalue, *v),
            Primitive::UInt64(v) => sys::g_value_set_uint64(gvalue, *v),
            Primitive::Float(v) => sys::g_value_set_float(gvalue, *v),
            Primitive::Double(v) => sys::g_value_set_double(gvalue, *v),
            Primitive::String(v) => {
                // GObject copies the string.
                let c_str = to_native_string(v)?;
                sys::g_value_set_string(gvalue, c_str.as_ptr());
            }
            Primitive::Pointer(v) => sys::g_value_set_pointer(gvalue, v.as_ptr()),
            Primitive::Object(v) => {
                sys::g_value_set_object(gvalue, v.map_or(ptr::null_mut(), RawObject::as_ptr))
            }
        }
    }
    Ok(())
}

unsafe fn read_gvalue(gvalue: *const sys::GValue) -> BindResult<Primitive> {
    unsafe {
        let tag = fundamental_tag((*gvalue).g_type);
        Ok(match tag {
            TypeTag::Bool => Primitive::Bool(from_gboolean(sys::g_value_get_boolean(gvalue))),
            TypeTag::Char => Primitive::Char(sys::g_value_get_schar(gvalue)),
            TypeTag::UChar => Primitive::UChar(sys::g_value_get_uchar(gvalue)),
            TypeTag::Int => Primitive::Int(sys::g_value_get_int(gvalue)),
            TypeTag::UInt => Primitive::UInt(sys::g_value_get_uint(gvalue)),
            TypeTag::Long => Primitive::Long(sys::g_value_get_long(gvalue)),
            TypeTag::ULong => Primitive::ULong(sys::g_value_get_ulong(gvalue)),
            TypeTag::Int64 => Primitive::Int64(sys::g_value_get_int64(gvalue)),
            TypeTag::UInt64 => Primitive::UInt64(sys::g_value_get_uint64(gvalue)),
            TypeTag::Float => Primitive::Float(sys::g_value_get_float(gvalue)),
            TypeTag::Double => Primitive::Double(sys::g_value_get_double(gvalue)),
            TypeTag::Enum => Primitive::Int(sys::g_value_get_enum(gvalue)),
            TypeTag::Flags => Primitive::UInt(sys::g_value_get_flags(gvalue)),
            TypeTag::String => Primitive::String(read_native_string(sys::g_value_get_string(gvalue))?),
            TypeTag::Pointer => Primitive::Pointer(RawPointer::new(sys::g_value_get_pointer(gvalue))),
            TypeTag::Boxed => Primitive::Pointer(RawPointer::new(sys::g_value_get_boxed(gvalue))),
            TypeTag::Object => Primitive::Object(RawObject::from_ptr(sys::g_value_get_object(gvalue))),
            other => return Err(BindError::UnsupportedType(other)),
        })
    }
}

/// One signal parameter as an argument slot.
unsafe fn arg_from_gvalue(gvalue: *const sys::GValue) -> NativeArg {
    unsafe {
        let tag = fundamental_tag((*gvalue).g_type);
        let word = match tag {
            TypeTag::Bool => sys::g_value_get_boolean(gvalue) as usize,
            TypeTag::Char => sys::g_value_get_schar(gvalue) as isize as usize,
            TypeTag::UChar => usize::from(sys::g_value_get_uchar(gvalue)),
            TypeTag::Int => sys::g_value_get_int(gvalue) as isize as usize,
            TypeTag::UInt => sys::g_value_get_uint(gvalue) as usize,
            TypeTag::Long => sys::g_value_get_long(gvalue) as usize,
            TypeTag::ULong => sys::g_value_get_ulong(gvalue) as usize,
            TypeTag::Int64 => sys::g_value_get_int64(gvalue) as usize,
            TypeTag::UInt64 => sys::g_value_get_uint64(gvalue) as usize,
            TypeTag::Float => sys::g_value_get_float(gvalue).to_bits() as usize,
            TypeTag::Double => sys::g_value_get_double(gvalue).to_bits() as usize,
            TypeTag::Enum => sys::g_value_get_enum(gvalue) as isize as usize,
            TypeTag::Flags => sys::g_value_get_flags(gvalue) as usize,
            TypeTag::String => sys::g_value_get_string(gvalue) as usize,
            TypeTag::Pointer => sys::g_value_get_pointer(gvalue) as usize,
            TypeTag::Boxed => sys::g_value_get_boxed(gvalue) as usize,
            TypeTag::Object => sys::g_value_get_object(gvalue) as usize,
            TypeTag::Interface | TypeTag::Param => (*gvalue).data[0].v_pointer as usize,
            TypeTag::Invalid | TypeTag::None => 0,
        };
        NativeArg::new(word, tag)
    }
}

unsafe extern "C" fn meta_marshal(
    _closure: *mut sys::GClosure,
    return_value: *mut sys::GValue,
    n_param_values: sys::guint,
    param_values: *const sys::GValue,
    _invocation_hint: sys::gpointer,
    marshal_data: sys::gpointer,
) {
    let carrier = unsafe { &*(marshal_data as *const ClosureCarrier) };
    let Some(sink) = carrier.sink.upgrade() else {
        log::warn!("registry for call {} is gone", carrier.call_id);
        return;
    };

    // The first parameter is the emitting instance.
    let params: &[sys::GValue] = if param_values.is_null() {
        &[]
    } else {
        unsafe { slice::from_raw_parts(param_values, n_param_values as usize) }
    };
    let args: Vec<NativeArg> = params
        .iter()
        .skip(1)
        .map(|gvalue| unsafe { arg_from_gvalue(gvalue) })
        .collect();

    let mut invocation = Invocation::new(carrier.call_id, &args);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| sink.dispatch(&mut invocation)));
    if outcome.is_err() {
        log::error!("handler for call {} panicked", carrier.call_id);
    }

    if !return_value.is_null() {
        unsafe {
            if fundamental_tag((*return_value).g_type) == TypeTag::Bool {
                sys::g_value_set_boolean(return_value, to_gboolean(invocation.return_value()));
            }
        }
    }
}

unsafe extern "C" fn free_carrier(data: sys::gpointer, _closure: *mut sys::GClosure) {
    drop(unsafe { Box::from_raw(data as *mut ClosureCarrier) });
}

impl NativeBackend for GObjectBackend {
    fn object_ref(&self, object: RawObject) {
        unsafe { sys::g_object_ref(object.as_ptr()) };
    }

    fn object_unref(&self, object: RawObject) {
        unsafe { sys::g_object_unref(object.as_ptr()) };
    }

    fn object_ref_sink(&self, object: RawObject) {
        unsafe { sys::g_object_ref_sink(object.as_ptr()) };
    }

    fn object_is_floating(&self, object: RawObject) -> bool {
        from_gboolean(unsafe { sys::g_object_is_floating(object.as_ptr()) })
    }

    fn object_force_floating(&self, object: RawObject) {
        unsafe { sys::g_object_force_floating(object.as_ptr() as *mut sys::GObject) };
    }

    fn object_set_property(
        &self,
        object: RawObject,
        name: &str,
        value: &Primitive,
    ) -> BindResult<()> {
        let c_name = to_native_string(name)?;
        unsafe {
            let instance = object.as_ptr() as *const sys::GTypeInstance;
            let pspec =
                sys::g_object_class_find_property((*instance).g_class as sys::gpointer, c_name.as_ptr());
            if pspec.is_null() {
                return Err(BindError::UnknownProperty(name.to_owned()));
            }

            let mut gvalue = MaybeUninit::<sys::GValue>::zeroed();
            let gvalue = gvalue.as_mut_ptr();
            sys::g_value_init(gvalue, value.tag().gtype());
            let written = write_gvalue(gvalue, value);
            if written.is_ok() {
                // GObject transforms the value to the declared property type.
                sys::g_object_set_property(object.as_ptr() as *mut sys::GObject, c_name.as_ptr(), gvalue);
            }
            sys::g_value_unset(gvalue);
            written
        }
    }

    fn value_alloc(&self) -> Option<RawValue> {
        let ptr = unsafe { sys::g_malloc0(mem::size_of::<sys::GValue>()) };
        RawValue::from_ptr(ptr)
    }

    fn value_init(&self, tag: TypeTag) -> Option<RawValue> {
        if !tag.is_value_type() {
            return None;
        }
        let raw = self.value_alloc()?;
        unsafe { sys::g_value_init(raw.as_ptr() as *mut sys::GValue, tag.gtype()) };
        Some(raw)
    }

    fn value_unset(&self, value: RawValue) {
        let gvalue = value.as_ptr() as *mut sys::GValue;
        unsafe {
            if (*gvalue).g_type != sys::G_TYPE_INVALID {
                sys::g_value_unset(gvalue);
            }
            sys::g_free(gvalue as sys::gpointer);
        }
    }

    fn value_type(&self, value: RawValue) -> TypeTag {
        unsafe { fundamental_tag((*(value.as_ptr() as *const sys::GValue)).g_type) }
    }

    fn value_set(&self, value: RawValue, data: &Primitive) -> BindResult<()> {
        let found = self.value_type(value);
        if found != data.tag() {
            return Err(BindError::ValueTypeMismatch {
                expected: data.tag(),
                found,
            });
        }
        unsafe { write_gvalue(value.as_ptr() as *mut sys::GValue, data) }
    }

    fn value_get(&self, value: RawValue) -> BindResult<Primitive> {
        unsafe { read_gvalue(value.as_ptr() as *const sys::GValue) }
    }

    fn signal_connect(
        &self,
        object: RawObject,
        signal: &str,
        call_id: CallId,
        flags: ConnectFlags,
        sink: Weak<dyn DispatchSink>,
    ) -> BindResult<Connection> {
        let c_signal = to_native_string(signal)?;
        if unsafe { parse_signal(object, &c_signal) }.is_none() {
            return Err(BindError::UnknownSignal(signal.to_owned()));
        }

        let carrier = Box::into_raw(Box::new(ClosureCarrier { call_id, sink })) as sys::gpointer;
        let handler_id = unsafe {
            let closure =
                sys::g_closure_new_simple(mem::size_of::<sys::GClosure>() as sys::guint, ptr::null_mut());
            sys::g_closure_set_meta_marshal(closure, carrier, meta_marshal);
            sys::g_closure_add_finalize_notifier(closure, carrier, free_carrier);
            sys::g_signal_connect_closure(
                object.as_ptr(),
                c_signal.as_ptr(),
                closure,
                to_gboolean(flags.contains(ConnectFlags::AFTER)),
            )
        };
        Ok(Connection::new(u64::from(handler_id)))
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn signal_emit_by_name(&self, object: RawObject, signal: &str) -> BindResult<()> {
        let c_signal = to_native_string(signal)?;
        let (signal_id, detail) = unsafe { parse_signal(object, &c_signal) }
            .ok_or_else(|| BindError::UnknownSignal(signal.to_owned()))?;

        unsafe {
            let mut query = MaybeUninit::<sys::GSignalQuery>::zeroed();
            sys::g_signal_query(signal_id, query.as_mut_ptr());
            let query = query.assume_init();
            if query.n_params != 0 {
                return Err(BindError::SignalArity {
                    signal: signal.to_owned(),
                    n_params: query.n_params,
                });
            }

            let mut instance = MaybeUninit::<sys::GValue>::zeroed();
            let instance = instance.as_mut_ptr();
            sys::g_value_init(instance, instance_type(object));
            sys::g_value_set_object(instance, object.as_ptr());

            let return_type = query.return_type & !SIGNAL_TYPE_STATIC_SCOPE;
            let mut ret = MaybeUninit::<sys::GValue>::zeroed();
            let ret = ret.as_mut_ptr();
            let ret = if return_type == sys::G_TYPE_NONE {
                ptr::null_mut()
            } else {
                sys::g_value_init(ret, return_type);
                ret
            };

            sys::g_signal_emitv(instance, signal_id, detail, ret);

            if !ret.is_null() {
                sys::g_value_unset(ret);
            }
            sys::g_value_unset(instance);
        }
        Ok(())
    }

    fn signal_stop_emission_by_name(&self, object: RawObject, signal: &str) -> BindResult<()> {
        let c_signal = to_native_string(signal)?;
        if unsafe { parse_signal(object, &c_signal) }.is_none() {
            return Err(BindError::UnknownSignal(signal.to_owned()));
        }
        unsafe { sys::g_signal_stop_emission_by_name(object.as_ptr(), c_signal.as_ptr()) };
        Ok(())
    }

    fn signal_handler_block(&self, object: RawObject, connection: Connection) {
        unsafe { sys::g_signal_handler_block(object.as_ptr(), connection.handler_id() as sys::gulong) };
    }

    fn signal_handler_unblock(&self, object: RawObject, connection: Connection) {
        unsafe {
            sys::g_signal_handler_unblock(object.as_ptr(), connection.handler_id() as sys::gulong)
        };
    }

    fn signal_handler_disconnect(&self, object: RawObject, connection: Connection) {
        unsafe {
            sys::g_signal_handler_disconnect(object.as_ptr(), connection.handler_id() as sys::gulong)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::object::Object;
    use crate::core::registry::CallbackRegistry;
    use crate::core::value::Value;
    use crate::types::handler::Handler;
    use std::ffi::{CString, c_uint};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[link(name = "gio-2.0")]
    unsafe extern "C" {
        fn g_cancellable_new() -> sys::gpointer;
        fn g_socket_client_new() -> sys::gpointer;
        fn g_socket_client_get_timeout(client: sys::gpointer) -> sys::guint;
        fn g_socket_client_get_enable_proxy(client: sys::gpointer) -> sys::gboolean;
        fn g_socket_client_get_proxy_resolver(client: sys::gpointer) -> sys::gpointer;
        fn g_simple_proxy_resolver_new(
            default_proxy: *const sys::gchar,
            ignore_hosts: *mut *mut sys::gchar,
        ) -> sys::gpointer;
        fn g_application_new(application_id: *const sys::gchar, flags: c_uint) -> sys::gpointer;
    }

    fn wrap(backend: &Arc<GObjectBackend>, ptr: sys::gpointer) -> Object {
        Object::from_raw(backend.clone(), ptr).unwrap()
    }

    fn counter() -> (Arc<AtomicUsize>, Handler) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let handler = Handler::plain(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        (hits, handler)
    }

    #[test]
    fn values_round_trip_through_gvalue() {
        let backend = GObjectBackend::new();

        let int = Value::from_native(backend.clone(), &Primitive::Int(-42)).unwrap();
        assert_eq!(int.type_tag(), TypeTag::Int);
        assert_eq!(int.to_native().unwrap(), Primitive::Int(-42));

        let text = Value::from_native(backend.clone(), &Primitive::from("grüße")).unwrap();
        assert_eq!(text.type_tag(), TypeTag::String);
        assert_eq!(text.to_native().unwrap(), Primitive::from("grüße"));

        let double = Value::init(backend.clone(), TypeTag::Double).unwrap();
        double.set_double(2.5).unwrap();
        assert_eq!(double.get_double().unwrap(), 2.5);
        assert!(matches!(
            double.get_int(),
            Err(BindError::ValueTypeMismatch { expected: TypeTag::Int, found: TypeTag::Double })
        ));

        let mut empty = Value::init(backend.clone(), TypeTag::String).unwrap();
        assert!(empty.get_string().unwrap_err().is_nil_ptr());
        assert_eq!(empty.to_native().unwrap(), Primitive::String(String::new()));
        empty.release();
        empty.release();
        assert_eq!(empty.type_tag(), TypeTag::Invalid);

        let fresh = Value::alloc(backend.clone()).unwrap();
        assert_eq!(fresh.type_tag(), TypeTag::Invalid);
        assert!(Value::init(backend, TypeTag::Boxed).unwrap_err().is_nil_ptr());
    }

    #[test]
    fn set_property_reaches_the_native_object() {
        let backend = GObjectBackend::new();
        let client = wrap(&backend, unsafe { g_socket_client_new() });
        let resolver = wrap(&backend, unsafe {
            g_simple_proxy_resolver_new(ptr::null(), ptr::null_mut())
        });

        // An int value, transformed by GObject into the uint property.
        client.set_property("timeout", 7u32).unwrap();
        client.set_property("enable-proxy", false).unwrap();
        client.set_property("proxy-resolver", &resolver).unwrap();

        unsafe {
            assert_eq!(g_socket_client_get_timeout(client.as_ptr()), 7);
            assert!(!from_gboolean(g_socket_client_get_enable_proxy(client.as_ptr())));
            assert_eq!(g_socket_client_get_proxy_resolver(client.as_ptr()), resolver.as_ptr());
        }

        let err = client.set_property("no-such-property", 1).unwrap_err();
        assert!(matches!(err, BindError::UnknownProperty(name) if name == "no-such-property"));

        client.unref();
        resolver.unref();
    }

    #[test]
    fn connect_emit_block_and_disconnect() {
        let backend = GObjectBackend::new();
        let cancellable = wrap(&backend, unsafe { g_cancellable_new() });
        let registry = CallbackRegistry::new();
        let (hits, handler) = counter();

        assert_eq!(Arc::weak_count(&registry), 1);
        let id = registry.connect(&cancellable, "cancelled", handler).unwrap();
        // The closure carrier holds the registry weakly.
        assert_eq!(Arc::weak_count(&registry), 2);

        cancellable.emit("cancelled").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        registry.handler_block(id).unwrap();
        cancellable.emit("cancelled").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        registry.handler_unblock(id).unwrap();
        cancellable.emit("cancelled").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        registry.handler_disconnect(id).unwrap();
        cancellable.emit("cancelled").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        // Disconnecting finalised the closure and freed its carrier.
        assert_eq!(Arc::weak_count(&registry), 1);

        let err = registry
            .connect(&cancellable, "no-such-signal", Handler::plain(|| {}))
            .unwrap_err();
        assert!(matches!(err, BindError::UnknownSignal(_)));
        assert_eq!(registry.len(), 1);

        cancellable.unref();
    }

    #[test]
    fn true_result_stops_later_handlers() {
        let backend = GObjectBackend::new();
        let app_id = CString::new("org.example.GobindTest").unwrap();
        let app = wrap(&backend, unsafe { g_application_new(app_id.as_ptr(), 0) });
        let registry = CallbackRegistry::new();

        let first = Arc::new(AtomicUsize::new(0));
        let f = first.clone();
        registry
            .connect(
                &app,
                "name-lost",
                Handler::plain_with_return(move || {
                    f.fetch_add(1, Ordering::SeqCst);
                    true
                }),
            )
            .unwrap();
        let (later, handler) = counter();
        registry.connect(&app, "name-lost", handler).unwrap();

        app.emit("name-lost").unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(later.load(Ordering::SeqCst), 0);

        app.unref();
    }

    #[test]
    fn signal_arguments_arrive_as_slots() {
        let backend = GObjectBackend::new();
        let client = wrap(&backend, unsafe { g_socket_client_new() });
        let registry = CallbackRegistry::new();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let out = seen.clone();
        registry
            .connect(
                &client,
                "notify",
                Handler::with_context(move |ctx| {
                    let tags: Vec<TypeTag> = ctx.args().map(|arg| arg.tag()).collect();
                    out.lock().unwrap().push((ctx.target().as_raw(), tags));
                }),
            )
            .unwrap();

        client.set_property("timeout", 9u32).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], (client.as_raw(), vec![TypeTag::Param]));

        client.unref();
    }

    #[test]
    fn emitting_a_signal_with_parameters_is_rejected() {
        let backend = GObjectBackend::new();
        let plain = wrap(&backend, unsafe {
            sys::g_object_new(sys::G_TYPE_OBJECT, ptr::null::<sys::gchar>())
        });

        let err = plain.emit("notify").unwrap_err();
        assert!(matches!(
            err,
            BindError::SignalArity { ref signal, n_params: 1 } if signal == "notify"
        ));
        assert!(matches!(
            plain.emit("no-such-signal"),
            Err(BindError::UnknownSignal(_))
        ));

        plain.unref();
    }

    #[test]
    fn panicking_handler_is_contained() {
        let backend = GObjectBackend::new();
        let cancellable = wrap(&backend, unsafe { g_cancellable_new() });
        let registry = CallbackRegistry::new();
        registry
            .connect(&cancellable, "cancelled", Handler::plain(|| panic!("handler failure")))
            .unwrap();
        let (hits, handler) = counter();
        registry.connect(&cancellable, "cancelled", handler).unwrap();

        cancellable.emit("cancelled").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        cancellable.unref();
    }
}
