use crate::backend::{Connection, ConnectFlags, DispatchSink, Invocation};
use crate::core::callback_context::CallbackContext;
use crate::core::object::Object;
use crate::error::{BindError, BindResult, CallId};
use crate::types::handler::Handler;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Tuning for a [`CallbackRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Number of entries to reserve up front.
    pub initial_capacity: usize,
    /// Keep the handler, target and user data of disconnected entries alive
    /// until the registry is dropped. Off by default: a disconnected slot
    /// keeps only its signal name and native connection.
    pub retain_disconnected_payloads: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
            retain_disconnected_payloads: false,
        }
    }
}

#[derive(Clone)]
struct Payload {
    handler: Handler,
    target: Object,
    data: Option<Arc<dyn Any + Send + Sync>>,
}

enum EntryState {
    Registered(Payload),
    /// Disconnected. `_retained` only keeps the payload alive when
    /// [`RegistryConfig::retain_disconnected_payloads`] is set.
    Dead { _retained: Option<Payload> },
}

struct CallbackEntry {
    signal: String,
    connection: Connection,
    state: EntryState,
}

/// Table of registered signal handlers, keyed by call id.
///
/// The native glue only carries an integer back through its own call stack;
/// that integer is the index of the entry in this table. Indices are handed
/// out in order starting at 0 and are never reused: a disconnected entry
/// stays in its slot as a tombstone.
///
/// The registry is an explicit object rather than process-wide state. Share
/// it (it is always behind an `Arc`) with every component that connects or
/// dispatches. Index assignment and append happen under one lock, so
/// connecting from several threads is safe. Handlers run without the lock
/// held and may connect further handlers.
pub struct CallbackRegistry {
    entries: Mutex<Vec<CallbackEntry>>,
    config: RegistryConfig,
    this: Weak<CallbackRegistry>,
}

impl CallbackRegistry {
    pub fn new() -> Arc<Self> {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Arc<Self> {
        Arc::new_cyclic(|this| CallbackRegistry {
            entries: Mutex::new(Vec::with_capacity(config.initial_capacity)),
            config,
            this: this.clone(),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Connect `handler` to `signal` on `object`. Returns the call id.
    pub fn connect(&self, object: &Object, signal: &str, handler: Handler) -> BindResult<CallId> {
        self.connect_with_flags(object, signal, handler, None, ConnectFlags::empty())
    }

    /// Like [`connect`](Self::connect), making `data` available to the
    /// handler through [`CallbackContext::data`].
    pub fn connect_with_data<D>(
        &self,
        object: &Object,
        signal: &str,
        handler: Handler,
        data: D,
    ) -> BindResult<CallId>
    where
        D: Any + Send + Sync,
    {
        self.connect_with_flags(object, signal, handler, Some(Arc::new(data)), ConnectFlags::empty())
    }

    /// Connect a handler that runs after the handlers connected without
    /// [`ConnectFlags::AFTER`].
    pub fn connect_after(&self, object: &Object, signal: &str, handler: Handler) -> BindResult<CallId> {
        self.connect_with_flags(object, signal, handler, None, ConnectFlags::AFTER)
    }

    pub fn connect_after_with_data<D>(
        &self,
        object: &Object,
        signal: &str,
        handler: Handler,
        data: D,
    ) -> BindResult<CallId>
    where
        D: Any + Send + Sync,
    {
        self.connect_with_flags(object, signal, handler, Some(Arc::new(data)), ConnectFlags::AFTER)
    }

    pub fn connect_with_flags(
        &self,
        object: &Object,
        signal: &str,
        handler: Handler,
        data: Option<Arc<dyn Any + Send + Sync>>,
        flags: ConnectFlags,
    ) -> BindResult<CallId> {
        let mut entries = self.entries.lock()?;
        // The native side is keyed by the slot this entry is about to take.
        let call_id = entries.len();
        let sink: Weak<dyn DispatchSink> = self.this.clone();
        let connection =
            object
                .backend()
                .signal_connect(object.as_raw(), signal, call_id, flags, sink)?;
        entries.push(CallbackEntry {
            signal: signal.to_owned(),
            connection,
            state: EntryState::Registered(Payload {
                handler,
                target: object.clone(),
                data,
            }),
        });
        log::debug!(
            "connected '{}' on {:?} as call {} (handler {})",
            signal,
            object.as_raw(),
            call_id,
            connection.handler_id()
        );
        Ok(call_id)
    }

    /// Entry point for the native glue: run the handler registered under the
    /// invocation's call id and store its boolean result, if it has one, in
    /// the invocation's return slot.
    ///
    /// Unknown and disconnected call ids are logged and leave the return
    /// slot untouched.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn dispatch(&self, invocation: &mut Invocation<'_>) {
        let call_id = invocation.call_id();
        let payload = match self.payload(call_id) {
            Ok(payload) => payload,
            Err(err) => {
                log::warn!("dropping dispatch for call {}: {}", call_id, err);
                return;
            }
        };
        log::trace!(
            "dispatch call {} with {} args ({:?})",
            call_id,
            invocation.args().len(),
            payload.handler
        );
        let ctx = CallbackContext::new(
            call_id,
            &payload.target,
            payload.data.as_deref(),
            invocation.args(),
        );
        if let Some(ret) = payload.handler.invoke(&ctx) {
            invocation.set_return_value(ret);
        }
    }

    pub fn handler_block(&self, call_id: CallId) -> BindResult<()> {
        let (target, connection) = self.live_connection(call_id)?;
        target.backend().signal_handler_block(target.as_raw(), connection);
        Ok(())
    }

    pub fn handler_unblock(&self, call_id: CallId) -> BindResult<()> {
        let (target, connection) = self.live_connection(call_id)?;
        target.backend().signal_handler_unblock(target.as_raw(), connection);
        Ok(())
    }

    /// Disconnect the handler on the native side and mark the entry dead.
    /// The call id is not reused.
    pub fn handler_disconnect(&self, call_id: CallId) -> BindResult<()> {
        let (payload, connection) = {
            let mut entries = self.entries.lock()?;
            let entry = entries
                .get_mut(call_id)
                .ok_or(BindError::UnknownCallback(call_id))?;
            let payload = match &entry.state {
                EntryState::Registered(payload) => payload.clone(),
                EntryState::Dead { .. } => return Err(BindError::StaleCallback(call_id)),
            };
            let retained = self
                .config
                .retain_disconnected_payloads
                .then(|| payload.clone());
            entry.state = EntryState::Dead {
                _retained: retained,
            };
            log::debug!("disconnected call {} from '{}'", call_id, entry.signal);
            (payload, entry.connection)
        };
        payload
            .target
            .backend()
            .signal_handler_disconnect(payload.target.as_raw(), connection);
        Ok(())
    }

    /// Number of call ids handed out, dead ones included.
    pub fn len(&self) -> usize {
        self.entries_for_query().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries still connected.
    pub fn live_count(&self) -> usize {
        self.entries_for_query()
            .iter()
            .filter(|entry| matches!(entry.state, EntryState::Registered(_)))
            .count()
    }

    pub fn is_connected(&self, call_id: CallId) -> bool {
        matches!(
            self.entries_for_query().get(call_id).map(|entry| &entry.state),
            Some(EntryState::Registered(_))
        )
    }

    pub fn signal_name(&self, call_id: CallId) -> BindResult<String> {
        let entries = self.entries.lock()?;
        entries
            .get(call_id)
            .map(|entry| entry.signal.clone())
            .ok_or(BindError::UnknownCallback(call_id))
    }

    /// The native connection of `call_id`, dead or alive.
    pub fn connection(&self, call_id: CallId) -> BindResult<Connection> {
        let entries = self.entries.lock()?;
        entries
            .get(call_id)
            .map(|entry| entry.connection)
            .ok_or(BindError::UnknownCallback(call_id))
    }

    /// Read-only queries see the table even after a panic poisoned the lock;
    /// entries are only ever appended or flipped to dead under it.
    fn entries_for_query(&self) -> MutexGuard<'_, Vec<CallbackEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn payload(&self, call_id: CallId) -> BindResult<Payload> {
        let entries = self.entries.lock()?;
        match entries.get(call_id).map(|entry| &entry.state) {
            Some(EntryState::Registered(payload)) => Ok(payload.clone()),
            Some(EntryState::Dead { .. }) => Err(BindError::StaleCallback(call_id)),
            None => Err(BindError::UnknownCallback(call_id)),
        }
    }

    fn live_connection(&self, call_id: CallId) -> BindResult<(Object, Connection)> {
        let entries = self.entries.lock()?;
        let entry = entries
            .get(call_id)
            .ok_or(BindError::UnknownCallback(call_id))?;
        match &entry.state {
            EntryState::Registered(payload) => Ok((payload.target.clone(), entry.connection)),
            EntryState::Dead { .. } => Err(BindError::StaleCallback(call_id)),
        }
    }
}

impl DispatchSink for CallbackRegistry {
    fn dispatch(&self, invocation: &mut Invocation<'_>) {
        CallbackRegistry::dispatch(self, invocation);
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("len", &self.len())
            .field("live", &self.live_count())
            .field("config", &self.config)
            .finish()
    }
}
