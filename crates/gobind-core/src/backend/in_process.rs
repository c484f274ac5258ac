//! A pure Rust model of the native primitive surface.
//!
//! `InProcessBackend` keeps objects, values, properties and signal handlers
//! in plain maps and hands out fake (never dereferenced) addresses as
//! handles. It models exactly the behaviour the binding layer relies on:
//!
//! - reference counts and the floating flag; an object whose count drops to
//!   zero is finalised together with its handlers;
//! - properties with a declared type; set values are converted the way the
//!   native value transformation table converts numeric and boolean kinds;
//! - signals returning nothing or a boolean; handlers run in connection
//!   order with `AFTER` handlers last, blocked handlers are skipped, boolean
//!   signals stop at the first handler returning `true`, and
//!   `stop_emission` ends the running emission after the current handler.

use crate::backend::{
    Connection, ConnectFlags, DispatchSink, Invocation, NativeArg, NativeBackend,
};
use crate::core::object::Object;
use crate::error::{BindError, BindResult, CallId};
use crate::internal::marshal::{to_gboolean, to_native_string};
use crate::types::handles::{RawObject, RawValue};
use crate::types::primitive::Primitive;
use crate::types::type_tag::TypeTag;
use rustc_hash::FxHashMap;
use std::ffi::CString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

const FIRST_ADDR: usize = 0x1000;
const ADDR_STRIDE: usize = 0x10;

struct PropertySlot {
    tag: TypeTag,
    value: Primitive,
}

struct HandlerSlot {
    handler_id: u64,
    call_id: CallId,
    after: bool,
    block_count: u32,
    sink: Weak<dyn DispatchSink>,
}

struct SignalSlot {
    return_tag: TypeTag,
    handlers: Vec<HandlerSlot>,
}

struct ObjectState {
    ref_count: u32,
    floating: bool,
    properties: FxHashMap<String, PropertySlot>,
    signals: FxHashMap<String, SignalSlot>,
}

impl ObjectState {
    fn handler_mut(&mut self, handler_id: u64) -> Option<&mut HandlerSlot> {
        self.signals
            .values_mut()
            .flat_map(|signal| signal.handlers.iter_mut())
            .find(|handler| handler.handler_id == handler_id)
    }
}

struct ValueSlot {
    tag: TypeTag,
    /// `None` models a NULL string.
    data: Option<Primitive>,
}

/// A running emission. Emissions from different threads interleave in
/// `State::emissions`, so each is addressed by `id`, never by position.
struct Emission {
    id: u64,
    thread: ThreadId,
    object: RawObject,
    signal: String,
    stopped: bool,
}

struct State {
    next_addr: usize,
    next_handler_id: u64,
    next_emission_id: u64,
    objects: FxHashMap<RawObject, ObjectState>,
    values: FxHashMap<RawValue, ValueSlot>,
    emissions: Vec<Emission>,
}

impl State {
    fn next_addr(&mut self) -> usize {
        let addr = self.next_addr;
        self.next_addr += ADDR_STRIDE;
        addr
    }

    fn object(&self, object: RawObject) -> BindResult<&ObjectState> {
        self.objects.get(&object).ok_or(BindError::NilPtr)
    }

    fn object_mut(&mut self, object: RawObject) -> BindResult<&mut ObjectState> {
        self.objects.get_mut(&object).ok_or(BindError::NilPtr)
    }
}

/// Argument slots for one emission. Owns the string copies the slots point at.
struct ArgStorage {
    _strings: Vec<CString>,
    args: Vec<NativeArg>,
}

impl ArgStorage {
    fn new(values: &[Primitive]) -> BindResult<Self> {
        let mut strings = Vec::new();
        let mut args = Vec::with_capacity(values.len());
        for value in values {
            let word = match value {
                Primitive::Bool(v) => to_gboolean(*v) as usize,
                Primitive::Char(v) => *v as isize as usize,
                Primitive::UChar(v) => usize::from(*v),
                Primitive::Int(v) => *v as isize as usize,
                Primitive::UInt(v) => *v as usize,
                Primitive::Long(v) => *v as usize,
                Primitive::ULong(v) => *v as usize,
                Primitive::Int64(v) => *v as usize,
                Primitive::UInt64(v) => *v as usize,
                Primitive::Float(v) => v.to_bits() as usize,
                Primitive::Double(v) => v.to_bits() as usize,
                Primitive::String(v) => {
                    let c_str = to_native_string(v)?;
                    let word = c_str.as_ptr() as usize;
                    strings.push(c_str);
                    word
                }
                Primitive::Pointer(v) => v.addr(),
                Primitive::Object(v) => v.map_or(0, RawObject::addr),
            };
            args.push(NativeArg::new(word, value.tag()));
        }
        Ok(Self {
            _strings: strings,
            args,
        })
    }
}

/// Removes its emission record even if a handler panics.
struct EmissionGuard<'a> {
    backend: &'a InProcessBackend,
    id: u64,
}

impl Drop for EmissionGuard<'_> {
    fn drop(&mut self) {
        let id = self.id;
        self.backend.state().emissions.retain(|e| e.id != id);
    }
}

pub struct InProcessBackend {
    state: Mutex<State>,
}

impl InProcessBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                next_addr: FIRST_ADDR,
                next_handler_id: 1,
                next_emission_id: 0,
                objects: FxHashMap::default(),
                values: FxHashMap::default(),
                emissions: Vec::new(),
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an instance with a reference count of one.
    pub fn new_object(&self, floating: bool) -> RawObject {
        let mut state = self.state();
        let addr = state.next_addr();
        let Some(raw) = RawObject::from_addr(addr) else {
            unreachable!("addresses start at {:#x}", FIRST_ADDR);
        };
        state.objects.insert(
            raw,
            ObjectState {
                ref_count: 1,
                floating,
                properties: FxHashMap::default(),
                signals: FxHashMap::default(),
            },
        );
        raw
    }

    /// Create an instance and wrap it.
    pub fn create_object(self: &Arc<Self>, floating: bool) -> Object {
        let raw = self.new_object(floating);
        Object::new(self.clone(), raw)
    }

    /// Declare a property of type `tag`, initialised to the zero value.
    pub fn install_property(&self, object: RawObject, name: &str, tag: TypeTag) {
        let mut state = self.state();
        let Some(obj) = state.objects.get_mut(&object) else {
            log::warn!("install_property on finalised object {:?}", object);
            return;
        };
        let Some(value) = Primitive::zero(tag) else {
            log::warn!("property '{}' cannot hold {}", name, tag);
            return;
        };
        obj.properties.insert(name.to_owned(), PropertySlot { tag, value });
    }

    pub fn property(&self, object: RawObject, name: &str) -> Option<Primitive> {
        let state = self.state();
        let obj = state.objects.get(&object)?;
        obj.properties.get(name).map(|slot| slot.value.clone())
    }

    /// Declare a signal. `return_tag` is [`TypeTag::None`] or
    /// [`TypeTag::Bool`].
    pub fn install_signal(&self, object: RawObject, name: &str, return_tag: TypeTag) {
        let mut state = self.state();
        let Some(obj) = state.objects.get_mut(&object) else {
            log::warn!("install_signal on finalised object {:?}", object);
            return;
        };
        obj.signals.insert(
            name.to_owned(),
            SignalSlot {
                return_tag,
                handlers: Vec::new(),
            },
        );
    }

    /// `None` once the object has been finalised.
    pub fn ref_count(&self, object: RawObject) -> Option<u32> {
        self.state().objects.get(&object).map(|obj| obj.ref_count)
    }

    pub fn is_alive(&self, object: RawObject) -> bool {
        self.state().objects.contains_key(&object)
    }

    /// Number of allocated generic values not yet unset.
    pub fn live_values(&self) -> usize {
        self.state().values.len()
    }

    pub fn handler_count(&self, object: RawObject, signal: &str) -> usize {
        let state = self.state();
        state
            .objects
            .get(&object)
            .and_then(|obj| obj.signals.get(signal))
            .map_or(0, |slot| slot.handlers.len())
    }

    pub fn is_blocked(&self, object: RawObject, connection: Connection) -> bool {
        let mut state = self.state();
        state
            .objects
            .get_mut(&object)
            .and_then(|obj| obj.handler_mut(connection.handler_id()))
            .is_some_and(|handler| handler.block_count > 0)
    }

    /// Emit `signal` with positional arguments and return the value the
    /// handlers marshaled back (`false` for signals without a return value).
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn emit_with_args(
        &self,
        object: RawObject,
        signal: &str,
        args: &[Primitive],
    ) -> BindResult<bool> {
        to_native_string(signal)?;
        let storage = ArgStorage::new(args)?;

        let (return_tag, order, emission_id) = {
            let mut state = self.state();
            let obj = state.object(object)?;
            let slot = obj
                .signals
                .get(signal)
                .ok_or_else(|| BindError::UnknownSignal(signal.to_owned()))?;
            let mut order: Vec<&HandlerSlot> = slot.handlers.iter().filter(|h| !h.after).collect();
            order.extend(slot.handlers.iter().filter(|h| h.after));
            let order: Vec<u64> = order.into_iter().map(|h| h.handler_id).collect();
            let return_tag = slot.return_tag;
            let emission_id = state.next_emission_id;
            state.next_emission_id += 1;
            state.emissions.push(Emission {
                id: emission_id,
                thread: thread::current().id(),
                object,
                signal: signal.to_owned(),
                stopped: false,
            });
            (return_tag, order, emission_id)
        };
        let _guard = EmissionGuard {
            backend: self,
            id: emission_id,
        };
        log::trace!("emission of '{}' on {:?}: {} handlers", signal, object, order.len());

        let mut ret = false;
        for handler_id in order {
            // Earlier handlers may have blocked, disconnected or stopped.
            let target = {
                let mut state = self.state();
                let stopped = state
                    .emissions
                    .iter()
                    .any(|e| e.id == emission_id && e.stopped);
                if stopped {
                    break;
                }
                let Some(obj) = state.objects.get_mut(&object) else {
                    break;
                };
                obj.handler_mut(handler_id)
                    .filter(|handler| handler.block_count == 0)
                    .map(|handler| (handler.call_id, handler.sink.clone()))
            };
            let Some((call_id, sink)) = target else {
                continue;
            };
            let Some(sink) = sink.upgrade() else {
                log::warn!("registry for call {} is gone", call_id);
                continue;
            };
            let mut invocation = Invocation::new(call_id, &storage.args);
            sink.dispatch(&mut invocation);
            if return_tag == TypeTag::Bool {
                ret = invocation.return_value();
                if ret {
                    break;
                }
            }
        }
        Ok(ret)
    }
}

impl NativeBackend for InProcessBackend {
    fn object_ref(&self, object: RawObject) {
        match self.state().objects.get_mut(&object) {
            Some(obj) => obj.ref_count += 1,
            None => log::warn!("ref on finalised object {:?}", object),
        }
    }

    fn object_unref(&self, object: RawObject) {
        let mut state = self.state();
        let Some(obj) = state.objects.get_mut(&object) else {
            log::warn!("unref on finalised object {:?}", object);
            return;
        };
        obj.ref_count -= 1;
        if obj.ref_count == 0 {
            state.objects.remove(&object);
            log::debug!("finalised {:?}", object);
        }
    }

    fn object_ref_sink(&self, object: RawObject) {
        match self.state().objects.get_mut(&object) {
            Some(obj) if obj.floating => obj.floating = false,
            Some(obj) => obj.ref_count += 1,
            None => log::warn!("ref_sink on finalised object {:?}", object),
        }
    }

    fn object_is_floating(&self, object: RawObject) -> bool {
        self.state()
            .objects
            .get(&object)
            .is_some_and(|obj| obj.floating)
    }

    fn object_force_floating(&self, object: RawObject) {
        if let Some(obj) = self.state().objects.get_mut(&object) {
            obj.floating = true;
        }
    }

    fn object_set_property(
        &self,
        object: RawObject,
        name: &str,
        value: &Primitive,
    ) -> BindResult<()> {
        to_native_string(name)?;
        if let Primitive::String(s) = value {
            to_native_string(s)?;
        }
        let mut state = self.state();
        let obj = state.object_mut(object)?;
        let slot = obj
            .properties
            .get_mut(name)
            .ok_or_else(|| BindError::UnknownProperty(name.to_owned()))?;
        slot.value = value
            .transform(slot.tag)
            .ok_or(BindError::ValueTypeMismatch {
                expected: slot.tag,
                found: value.tag(),
            })?;
        Ok(())
    }

    fn value_alloc(&self) -> Option<RawValue> {
        let mut state = self.state();
        let raw = RawValue::from_addr(state.next_addr())?;
        state.values.insert(
            raw,
            ValueSlot {
                tag: TypeTag::Invalid,
                data: None,
            },
        );
        Some(raw)
    }

    fn value_init(&self, tag: TypeTag) -> Option<RawValue> {
        if !tag.is_value_type() {
            return None;
        }
        let data = match tag {
            TypeTag::String => None,
            _ => Some(Primitive::zero(tag)?),
        };
        let mut state = self.state();
        let raw = RawValue::from_addr(state.next_addr())?;
        state.values.insert(raw, ValueSlot { tag, data });
        Some(raw)
    }

    fn value_unset(&self, value: RawValue) {
        if self.state().values.remove(&value).is_none() {
            log::warn!("unset of unknown value {:?}", value);
        }
    }

    fn value_type(&self, value: RawValue) -> TypeTag {
        self.state()
            .values
            .get(&value)
            .map_or(TypeTag::Invalid, |slot| slot.tag)
    }

    fn value_set(&self, value: RawValue, data: &Primitive) -> BindResult<()> {
        if let Primitive::String(s) = data {
            to_native_string(s)?;
        }
        let mut state = self.state();
        let slot = state.values.get_mut(&value).ok_or(BindError::NilPtr)?;
        if slot.tag != data.tag() {
            return Err(BindError::ValueTypeMismatch {
                expected: data.tag(),
                found: slot.tag,
            });
        }
        slot.data = Some(data.clone());
        Ok(())
    }

    fn value_get(&self, value: RawValue) -> BindResult<Primitive> {
        let state = self.state();
        let slot = state.values.get(&value).ok_or(BindError::NilPtr)?;
        slot.data.clone().ok_or(BindError::NilPtr)
    }

    fn signal_connect(
        &self,
        object: RawObject,
        signal: &str,
        call_id: CallId,
        flags: ConnectFlags,
        sink: Weak<dyn DispatchSink>,
    ) -> BindResult<Connection> {
        to_native_string(signal)?;
        let mut state = self.state();
        let handler_id = state.next_handler_id;
        let obj = state.object_mut(object)?;
        let slot = obj
            .signals
            .get_mut(signal)
            .ok_or_else(|| BindError::UnknownSignal(signal.to_owned()))?;
        slot.handlers.push(HandlerSlot {
            handler_id,
            call_id,
            after: flags.contains(ConnectFlags::AFTER),
            block_count: 0,
            sink,
        });
        state.next_handler_id += 1;
        Ok(Connection::new(handler_id))
    }

    fn signal_emit_by_name(&self, object: RawObject, signal: &str) -> BindResult<()> {
        self.emit_with_args(object, signal, &[]).map(|_| ())
    }

    fn signal_stop_emission_by_name(&self, object: RawObject, signal: &str) -> BindResult<()> {
        to_native_string(signal)?;
        let mut state = self.state();
        if !state.object(object)?.signals.contains_key(signal) {
            return Err(BindError::UnknownSignal(signal.to_owned()));
        }
        // Innermost emission of this signal running on the calling thread.
        let current = thread::current().id();
        match state
            .emissions
            .iter_mut()
            .rev()
            .find(|e| e.thread == current && e.object == object && e.signal == signal)
        {
            Some(emission) => emission.stopped = true,
            None => log::warn!("no emission of '{}' to stop on {:?}", signal, object),
        }
        Ok(())
    }

    fn signal_handler_block(&self, object: RawObject, connection: Connection) {
        let mut state = self.state();
        match state
            .objects
            .get_mut(&object)
            .and_then(|obj| obj.handler_mut(connection.handler_id()))
        {
            Some(handler) => handler.block_count += 1,
            None => log::warn!("no handler {} on {:?}", connection.handler_id(), object),
        }
    }

    fn signal_handler_unblock(&self, object: RawObject, connection: Connection) {
        let mut state = self.state();
        match state
            .objects
            .get_mut(&object)
            .and_then(|obj| obj.handler_mut(connection.handler_id()))
        {
            Some(handler) if handler.block_count > 0 => handler.block_count -= 1,
            Some(_) => log::warn!("handler {} is not blocked", connection.handler_id()),
            None => log::warn!("no handler {} on {:?}", connection.handler_id(), object),
        }
    }

    fn signal_handler_disconnect(&self, object: RawObject, connection: Connection) {
        let mut state = self.state();
        let Some(obj) = state.objects.get_mut(&object) else {
            log::warn!("disconnect on finalised object {:?}", object);
            return;
        };
        let id = connection.handler_id();
        let removed = obj.signals.values_mut().any(|slot| {
            let before = slot.handlers.len();
            slot.handlers.retain(|handler| handler.handler_id != id);
            slot.handlers.len() != before
        });
        if !removed {
            log::warn!("no handler {} on {:?}", id, object);
        }
    }
}
