use crate::error::{BindError, BindResult};
use std::ffi::{CStr, CString, c_char, c_int};

pub const NATIVE_FALSE: c_int = 0;
pub const NATIVE_TRUE: c_int = 1;

pub fn to_gboolean(value: bool) -> c_int {
    if value { NATIVE_TRUE } else { NATIVE_FALSE }
}

pub fn from_gboolean(value: c_int) -> bool {
    value != NATIVE_FALSE
}

/// Copy a host string into a NUL-terminated buffer the native side can read.
/// The returned `CString` owns the copy; keep it alive for the duration of the
/// native call.
pub fn to_native_string(value: &str) -> BindResult<CString> {
    Ok(CString::new(value)?)
}

/// Copy a native NUL-terminated string into a host `String`.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated buffer that stays valid
/// for the duration of this call.
pub unsafe fn read_native_string(ptr: *const c_char) -> BindResult<String> {
    if ptr.is_null() {
        return Err(BindError::NilPtr);
    }
    let c_str = unsafe { CStr::from_ptr(ptr) };
    Ok(c_str.to_str()?.to_owned())
}
