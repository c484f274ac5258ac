use crate::backend::NativeArg;
use crate::core::object::Object;
use crate::error::{BindResult, CallId};
use crate::internal::marshal::{from_gboolean, read_native_string};
use crate::types::handles::{RawObject, RawPointer};
use crate::types::type_tag::TypeTag;
use std::any::Any;
use std::ffi::{c_char, c_int, c_uint};
use std::marker::PhantomData;

/// What a handler sees while it runs: the object the handler was connected
/// on, the user data it was connected with, and the signal's arguments.
///
/// The context only lives for the duration of one dispatch.
pub struct CallbackContext<'a> {
    call_id: CallId,
    target: &'a Object,
    data: Option<&'a (dyn Any + Send + Sync)>,
    args: &'a [NativeArg],
}

impl<'a> CallbackContext<'a> {
    pub(crate) fn new(
        call_id: CallId,
        target: &'a Object,
        data: Option<&'a (dyn Any + Send + Sync)>,
        args: &'a [NativeArg],
    ) -> Self {
        Self {
            call_id,
            target,
            data,
            args,
        }
    }

    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    pub fn target(&self) -> &'a Object {
        self.target
    }

    pub fn data(&self) -> Option<&'a (dyn Any + Send + Sync)> {
        self.data
    }

    /// The user data downcast to `T`, if present and of that type.
    pub fn data_as<T: Any>(&self) -> Option<&'a T> {
        self.data.and_then(|data| data.downcast_ref::<T>())
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    pub fn arg(&self, index: usize) -> Option<CallbackArg<'a>> {
        self.args.get(index).map(|arg| CallbackArg::new(*arg))
    }

    pub fn args(&self) -> impl Iterator<Item = CallbackArg<'a>> + 'a {
        self.args.iter().map(|arg| CallbackArg::new(*arg))
    }
}

/// One signal argument slot.
///
/// The accessors reinterpret the slot according to what the caller expects
/// the signal to deliver; they do not compare against [`tag`](Self::tag).
/// Integer reinterpretations are always defined (they truncate the machine
/// word). Reading a string dereferences the word, which is why
/// [`as_string`](Self::as_string) is `unsafe`.
#[derive(Debug, Clone, Copy)]
pub struct CallbackArg<'a> {
    arg: NativeArg,
    _invocation: PhantomData<&'a ()>,
}

impl<'a> CallbackArg<'a> {
    fn new(arg: NativeArg) -> Self {
        Self {
            arg,
            _invocation: PhantomData,
        }
    }

    /// The fundamental type the native signal declared for this slot.
    pub fn tag(&self) -> TypeTag {
        self.arg.tag()
    }

    pub fn word(&self) -> usize {
        self.arg.word()
    }

    pub fn as_int(&self) -> i32 {
        self.arg.word() as c_int
    }

    pub fn as_uint(&self) -> u32 {
        self.arg.word() as c_uint
    }

    pub fn as_bool(&self) -> bool {
        from_gboolean(self.arg.word() as c_int)
    }

    pub fn as_pointer(&self) -> RawPointer {
        RawPointer::new(self.arg.word() as *mut _)
    }

    pub fn as_object(&self) -> Option<RawObject> {
        RawObject::from_addr(self.arg.word())
    }

    /// Copy the NUL-terminated string the slot points at.
    ///
    /// # Safety
    /// The slot must hold a string argument (or NULL, which yields
    /// [`BindError::NilPtr`](crate::error::BindError::NilPtr)).
    pub unsafe fn as_string(&self) -> BindResult<String> {
        unsafe { read_native_string(self.arg.word() as *const c_char) }
    }
}
