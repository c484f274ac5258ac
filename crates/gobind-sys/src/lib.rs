//! Raw declarations for the parts of libgobject-2.0 (and the two libglib-2.0
//! allocator entry points) that `gobind-core` binds.
//!
//! Everything here mirrors the C headers one to one. Nothing is safe to call
//! without upholding the GObject preconditions documented for each function.
//! The link directives are only emitted with the `link` feature, so the crate
//! can be type-checked on machines that do not have the native library.

#![allow(non_camel_case_types)]
#![allow(non_upper_case_globals)]

use std::ffi::{c_char, c_double, c_float, c_int, c_long, c_uint, c_ulong, c_void};

pub type gboolean = c_int;
pub type gint = c_int;
pub type guint = c_uint;
pub type glong = c_long;
pub type gulong = c_ulong;
pub type gint64 = i64;
pub type guint64 = u64;
pub type gfloat = c_float;
pub type gdouble = c_double;
pub type gchar = c_char;
pub type gschar = i8;
pub type guchar = u8;
pub type gsize = usize;
pub type gpointer = *mut c_void;
pub type GType = gsize;
pub type GQuark = u32;

pub const GFALSE: gboolean = 0;
pub const GTRUE: gboolean = 1;

pub const G_TYPE_FUNDAMENTAL_SHIFT: usize = 2;

pub const fn g_type_make_fundamental(x: usize) -> GType {
    x << G_TYPE_FUNDAMENTAL_SHIFT
}

pub const G_TYPE_INVALID: GType = g_type_make_fundamental(0);
pub const G_TYPE_NONE: GType = g_type_make_fundamental(1);
pub const G_TYPE_INTERFACE: GType = g_type_make_fundamental(2);
pub const G_TYPE_CHAR: GType = g_type_make_fundamental(3);
pub const G_TYPE_UCHAR: GType = g_type_make_fundamental(4);
pub const G_TYPE_BOOLEAN: GType = g_type_make_fundamental(5);
pub const G_TYPE_INT: GType = g_type_make_fundamental(6);
pub const G_TYPE_UINT: GType = g_type_make_fundamental(7);
pub const G_TYPE_LONG: GType = g_type_make_fundamental(8);
pub const G_TYPE_ULONG: GType = g_type_make_fundamental(9);
pub const G_TYPE_INT64: GType = g_type_make_fundamental(10);
pub const G_TYPE_UINT64: GType = g_type_make_fundamental(11);
pub const G_TYPE_ENUM: GType = g_type_make_fundamental(12);
pub const G_TYPE_FLAGS: GType = g_type_make_fundamental(13);
pub const G_TYPE_FLOAT: GType = g_type_make_fundamental(14);
pub const G_TYPE_DOUBLE: GType = g_type_make_fundamental(15);
pub const G_TYPE_STRING: GType = g_type_make_fundamental(16);
pub const G_TYPE_POINTER: GType = g_type_make_fundamental(17);
pub const G_TYPE_BOXED: GType = g_type_make_fundamental(18);
pub const G_TYPE_PARAM: GType = g_type_make_fundamental(19);
pub const G_TYPE_OBJECT: GType = g_type_make_fundamental(20);

#[repr(C)]
#[derive(Copy, Clone)]
pub union GValueData {
    pub v_int: gint,
    pub v_uint: guint,
    pub v_long: glong,
    pub v_ulong: gulong,
    pub v_int64: gint64,
    pub v_uint64: guint64,
    pub v_float: gfloat,
    pub v_double: gdouble,
    pub v_pointer: gpointer,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct GValue {
    pub g_type: GType,
    pub data: [GValueData; 2],
}

#[repr(C)]
pub struct GTypeClass {
    pub g_type: GType,
}

#[repr(C)]
pub struct GTypeInstance {
    pub g_class: *mut GTypeClass,
}

#[repr(C)]
pub struct GObject {
    pub g_type_instance: GTypeInstance,
    _private: [u8; 0],
}

#[repr(C)]
pub struct GParamSpec {
    _private: [u8; 0],
}

/// Only the leading fields are declared; `size_of::<GClosure>()` matches the
/// C struct and is what `g_closure_new_simple` expects.
#[repr(C)]
pub struct GClosure {
    /// ref_count:15, meta_marshal_nouse:1, n_guards:1, n_fnotifiers:2,
    /// n_inotifiers:8, in_inotify:1, floating:1, derivative_flag:1,
    /// in_marshal:1, is_invalid:1
    pub flags: u32,
    pub marshal: Option<GClosureMarshal>,
    pub data: gpointer,
    pub notifiers: *mut c_void,
}

pub type GClosureMarshal = unsafe extern "C" fn(
    closure: *mut GClosure,
    return_value: *mut GValue,
    n_param_values: guint,
    param_values: *const GValue,
    invocation_hint: gpointer,
    marshal_data: gpointer,
);

pub type GClosureNotify = unsafe extern "C" fn(data: gpointer, closure: *mut GClosure);

#[repr(C)]
pub struct GSignalQuery {
    pub signal_id: guint,
    pub signal_name: *const gchar,
    pub itype: GType,
    pub signal_flags: c_uint,
    pub return_type: GType,
    pub n_params: guint,
    pub param_types: *const GType,
}

#[cfg_attr(feature = "link", link(name = "glib-2.0"))]
unsafe extern "C" {
    pub fn g_malloc0(n_bytes: gsize) -> gpointer;
    pub fn g_free(mem: gpointer);
}

#[cfg_attr(feature = "link", link(name = "gobject-2.0"))]
unsafe extern "C" {
    // Type system
    pub fn g_type_fundamental(type_id: GType) -> GType;

    // Object lifecycle
    pub fn g_object_new(object_type: GType, first_property_name: *const gchar, ...) -> gpointer;
    pub fn g_object_ref(object: gpointer) -> gpointer;
    pub fn g_object_unref(object: gpointer);
    pub fn g_object_ref_sink(object: gpointer) -> gpointer;
    pub fn g_object_is_floating(object: gpointer) -> gboolean;
    pub fn g_object_force_floating(object: *mut GObject);

    // Properties
    pub fn g_object_class_find_property(
        oclass: gpointer,
        property_name: *const gchar,
    ) -> *mut GParamSpec;
    pub fn g_object_set_property(
        object: *mut GObject,
        property_name: *const gchar,
        value: *const GValue,
    );

    // Values
    pub fn g_value_init(value: *mut GValue, g_type: GType) -> *mut GValue;
    pub fn g_value_unset(value: *mut GValue);
    pub fn g_value_set_boolean(value: *mut GValue, v_boolean: gboolean);
    pub fn g_value_get_boolean(value: *const GValue) -> gboolean;
    pub fn g_value_set_schar(value: *mut GValue, v_char: gschar);
    pub fn g_value_get_schar(value: *const GValue) -> gschar;
    pub fn g_value_set_uchar(value: *mut GValue, v_uchar: guchar);
    pub fn g_value_get_uchar(value: *const GValue) -> guchar;
    pub fn g_value_set_int(value: *mut GValue, v_int: gint);
    pub fn g_value_get_int(value: *const GValue) -> gint;
    pub fn g_value_set_uint(value: *mut GValue, v_uint: guint);
    pub fn g_value_get_uint(value: *const GValue) -> guint;
    pub fn g_value_set_long(value: *mut GValue, v_long: glong);
    pub fn g_value_get_long(value: *const GValue) -> glong;
    pub fn g_value_set_ulong(value: *mut GValue, v_ulong: gulong);
    pub fn g_value_get_ulong(value: *const GValue) -> gulong;
    pub fn g_value_set_int64(value: *mut GValue, v_int64: gint64);
    pub fn g_value_get_int64(value: *const GValue) -> gint64;
    pub fn g_value_set_uint64(value: *mut GValue, v_uint64: guint64);
    pub fn g_value_get_uint64(value: *const GValue) -> guint64;
    pub fn g_value_set_float(value: *mut GValue, v_float: gfloat);
    pub fn g_value_get_float(value: *const GValue) -> gfloat;
    pub fn g_value_set_double(value: *mut GValue, v_double: gdouble);
    pub fn g_value_get_double(value: *const GValue) -> gdouble;
    pub fn g_value_set_string(value: *mut GValue, v_string: *const gchar);
    pub fn g_value_get_string(value: *const GValue) -> *const gchar;
    pub fn g_value_set_pointer(value: *mut GValue, v_pointer: gpointer);
    pub fn g_value_get_pointer(value: *const GValue) -> gpointer;
    pub fn g_value_set_object(value: *mut GValue, v_object: gpointer);
    pub fn g_value_get_object(value: *const GValue) -> gpointer;
    pub fn g_value_get_enum(value: *const GValue) -> gint;
    pub fn g_value_get_flags(value: *const GValue) -> guint;
    pub fn g_value_get_boxed(value: *const GValue) -> gpointer;

    // Closures
    pub fn g_closure_new_simple(sizeof_closure: guint, data: gpointer) -> *mut GClosure;
    pub fn g_closure_set_meta_marshal(
        closure: *mut GClosure,
        marshal_data: gpointer,
        meta_marshal: GClosureMarshal,
    );
    pub fn g_closure_add_finalize_notifier(
        closure: *mut GClosure,
        notify_data: gpointer,
        notify_func: GClosureNotify,
    );

    // Signals
    pub fn g_signal_connect_closure(
        instance: gpointer,
        detailed_signal: *const gchar,
        closure: *mut GClosure,
        after: gboolean,
    ) -> gulong;
    pub fn g_signal_parse_name(
        detailed_signal: *const gchar,
        itype: GType,
        signal_id_p: *mut guint,
        detail_p: *mut GQuark,
        force_detail_quark: gboolean,
    ) -> gboolean;
    pub fn g_signal_query(signal_id: guint, query: *mut GSignalQuery);
    pub fn g_signal_emitv(
        instance_and_params: *const GValue,
        signal_id: guint,
        detail: GQuark,
        return_value: *mut GValue,
    );
    pub fn g_signal_stop_emission_by_name(instance: gpointer, detailed_signal: *const gchar);
    pub fn g_signal_handler_block(instance: gpointer, handler_id: gulong);
    pub fn g_signal_handler_unblock(instance: gpointer, handler_id: gulong);
    pub fn g_signal_handler_disconnect(instance: gpointer, handler_id: gulong);
}
