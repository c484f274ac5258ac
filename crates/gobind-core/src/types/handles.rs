use std::ffi::c_void;
use std::fmt;
use std::ptr::{self, NonNull};

/// Non-null handle to a native object instance.
///
/// The handle carries no ownership: reference counting stays with the
/// native library. Backends that do not hand out real pointers may mint
/// handles from plain addresses with [`RawObject::from_addr`]; such handles
/// are never dereferenced by this crate.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawObject(NonNull<c_void>);

impl RawObject {
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(RawObject)
    }

    pub fn from_addr(addr: usize) -> Option<Self> {
        Self::from_ptr(ptr::without_provenance_mut(addr))
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl fmt::Debug for RawObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawObject({:p})", self.0)
    }
}

/// Non-null handle to a native generic value container.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawValue(NonNull<c_void>);

impl RawValue {
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(RawValue)
    }

    pub fn from_addr(addr: usize) -> Option<Self> {
        Self::from_ptr(ptr::without_provenance_mut(addr))
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawValue({:p})", self.0)
    }
}

/// Opaque pointer passed through the boundary untouched. May be null.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawPointer(*mut c_void);

impl RawPointer {
    pub const fn null() -> Self {
        RawPointer(ptr::null_mut())
    }

    pub const fn new(ptr: *mut c_void) -> Self {
        RawPointer(ptr)
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }

    pub fn addr(self) -> usize {
        self.0 as usize
    }
}

impl Default for RawPointer {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for RawPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawPointer({:p})", self.0)
    }
}

impl<T> From<*mut T> for RawPointer {
    fn from(ptr: *mut T) -> Self {
        RawPointer(ptr.cast())
    }
}

// Handles are plain addresses; thread-safety of what they point at is the
// native library's concern.
unsafe impl Send for RawObject {}
unsafe impl Sync for RawObject {}
unsafe impl Send for RawValue {}
unsafe impl Sync for RawValue {}
unsafe impl Send for RawPointer {}
unsafe impl Sync for RawPointer {}
