//! The seam between the safe wrappers and the native object system.
//!
//! [`NativeBackend`] is the fixed primitive surface the wrappers delegate to:
//! object lifecycle, generic values, single-property set and the signal
//! machinery. Two implementations ship with the crate:
//!
//! - [`InProcessBackend`](in_process::InProcessBackend), a pure Rust model of
//!   that surface used by the test suites and by hosts without libgobject;
//! - `GObjectBackend` (feature `system`), which calls libgobject-2.0.

use crate::error::{BindResult, CallId};
use crate::types::handles::{RawObject, RawValue};
use crate::types::primitive::Primitive;
use crate::types::type_tag::TypeTag;
use bitflags::bitflags;
use std::sync::Weak;

#[cfg(feature = "system")]
pub mod gobject;
pub mod in_process;

bitflags! {
    /// Flags applied when wiring a handler to a signal.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConnectFlags: u32 {
        /// Run the handler after the handlers connected without this flag.
        const AFTER = 1 << 0;
    }
}

/// Per-registration context returned by the native glue when a handler is
/// wired up. Holds the native handler id used for block/unblock/disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    handler_id: u64,
}

impl Connection {
    pub fn new(handler_id: u64) -> Self {
        Self { handler_id }
    }

    pub fn handler_id(&self) -> u64 {
        self.handler_id
    }
}

/// One positional signal argument as the native glue delivered it: a machine
/// word plus the fundamental type the signal declared for that slot.
///
/// For pointer-like kinds (strings, objects, pointers, boxed) the word is an
/// address owned by the glue for the duration of the invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeArg {
    word: usize,
    tag: TypeTag,
}

impl NativeArg {
    pub fn new(word: usize, tag: TypeTag) -> Self {
        Self { word, tag }
    }

    pub fn word(&self) -> usize {
        self.word
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }
}

/// A single call from the native glue into the host: the call id the handler
/// was registered under, the argument slots, and the boolean return slot.
#[derive(Debug)]
pub struct Invocation<'a> {
    call_id: CallId,
    args: &'a [NativeArg],
    return_value: bool,
}

impl<'a> Invocation<'a> {
    pub fn new(call_id: CallId, args: &'a [NativeArg]) -> Self {
        Self {
            call_id,
            args,
            return_value: false,
        }
    }

    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    pub fn args(&self) -> &'a [NativeArg] {
        self.args
    }

    /// The value marshaled back to the signal; `false` (continue
    /// propagation) unless a handler set it.
    pub fn return_value(&self) -> bool {
        self.return_value
    }

    pub fn set_return_value(&mut self, value: bool) {
        self.return_value = value;
    }
}

/// Receiver for native callbacks. The glue holds it weakly so a dropped
/// registry turns later emissions into no-ops.
pub trait DispatchSink: Send + Sync {
    fn dispatch(&self, invocation: &mut Invocation<'_>);
}

/// Primitive operations of the native object/value/signal library.
///
/// Reference-count operations are infallible pass-throughs. Operations that
/// take a name return `Err` when the name cannot cross the boundary or the
/// native side does not know it.
pub trait NativeBackend: Send + Sync {
    // Object lifecycle
    fn object_ref(&self, object: RawObject);
    fn object_unref(&self, object: RawObject);
    fn object_ref_sink(&self, object: RawObject);
    fn object_is_floating(&self, object: RawObject) -> bool;
    fn object_force_floating(&self, object: RawObject);

    // Properties
    fn object_set_property(&self, object: RawObject, name: &str, value: &Primitive)
        -> BindResult<()>;

    // Generic values
    /// Allocate an empty (invalid-tagged) value. `None` when the native
    /// allocator returns null.
    fn value_alloc(&self) -> Option<RawValue>;
    /// Allocate a value initialised to hold `tag`. `None` when the native
    /// side cannot provide one.
    fn value_init(&self, tag: TypeTag) -> Option<RawValue>;
    /// Unset the value and free its storage. The handle is dead afterwards.
    fn value_unset(&self, value: RawValue);
    fn value_type(&self, value: RawValue) -> TypeTag;
    /// Store `data`. The value must already hold `data.tag()`.
    fn value_set(&self, value: RawValue, data: &Primitive) -> BindResult<()>;
    /// Read the stored value; `Err(NilPtr)` for a null string.
    fn value_get(&self, value: RawValue) -> BindResult<Primitive>;

    // Signals
    fn signal_connect(
        &self,
        object: RawObject,
        signal: &str,
        call_id: CallId,
        flags: ConnectFlags,
        sink: Weak<dyn DispatchSink>,
    ) -> BindResult<Connection>;
    fn signal_emit_by_name(&self, object: RawObject, signal: &str) -> BindResult<()>;
    fn signal_stop_emission_by_name(&self, object: RawObject, signal: &str) -> BindResult<()>;
    fn signal_handler_block(&self, object: RawObject, connection: Connection);
    fn signal_handler_unblock(&self, object: RawObject, connection: Connection);
    fn signal_handler_disconnect(&self, object: RawObject, connection: Connection);
}
