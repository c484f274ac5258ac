//! Object, property and signal bindings for the GObject type system.
//!
//! The crate wraps three native primitives: the generic value container
//! ([`Value`](core::value::Value)), object instances
//! ([`Object`](core::object::Object)) and signal handlers, which are kept in
//! a [`CallbackRegistry`](core::registry::CallbackRegistry) and invoked by
//! call id.
//!
//! ```
//! use gobind::prelude::*;
//!
//! let backend = InProcessBackend::new();
//! let button = backend.create_object(false);
//! backend.install_signal(button.as_raw(), "clicked", TypeTag::None);
//!
//! let registry = CallbackRegistry::new();
//! let id = registry
//!     .connect(&button, "clicked", Handler::plain(|| println!("clicked")))
//!     .unwrap();
//! assert_eq!(id, 0);
//! button.emit("clicked").unwrap();
//! ```

pub use gobind_core::{backend, core, error, internal, types};

pub mod prelude {
    pub use gobind_core::prelude::*;
}
