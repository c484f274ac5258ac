//! Safe wrappers over the GObject object, value and signal primitives.
//!
//! Everything native goes through a [`NativeBackend`](backend::NativeBackend).
//! Enable the `system` feature for the libgobject-backed implementation; the
//! in-process backend is always available.

pub mod backend;
pub mod core;
pub mod error;
pub mod internal;
pub mod types;

pub mod prelude {
    pub use crate::backend::in_process::InProcessBackend;
    #[cfg(feature = "system")]
    pub use crate::backend::gobject::GObjectBackend;
    pub use crate::backend::{
        ConnectFlags, Connection, DispatchSink, Invocation, NativeArg, NativeBackend,
    };
    pub use crate::core::callback_context::*;
    pub use crate::core::object::*;
    pub use crate::core::registry::*;
    pub use crate::core::value::*;
    pub use crate::error::{BindError, BindResult, CallId};
    pub use crate::types::handler::*;
    pub use crate::types::handles::*;
    pub use crate::types::primitive::*;
    pub use crate::types::property_value::*;
    pub use crate::types::type_tag::*;
}
