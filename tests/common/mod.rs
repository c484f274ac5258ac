//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use gobind::prelude::*;
use std::sync::Arc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A backend, a registry and one object carrying the signals and properties
/// of a push button.
pub struct Fixture {
    pub backend: Arc<InProcessBackend>,
    pub registry: Arc<CallbackRegistry>,
    pub button: Object,
}

impl Fixture {
    pub fn new() -> Self {
        init_logging();
        let backend = InProcessBackend::new();
        let button = backend.create_object(false);
        let raw = button.as_raw();
        backend.install_signal(raw, "clicked", TypeTag::None);
        backend.install_signal(raw, "activate", TypeTag::None);
        backend.install_signal(raw, "delete-event", TypeTag::Bool);
        backend.install_property(raw, "label", TypeTag::String);
        backend.install_property(raw, "width-request", TypeTag::Int);
        backend.install_property(raw, "opacity", TypeTag::Double);
        backend.install_property(raw, "sensitive", TypeTag::Bool);
        backend.install_property(raw, "user-data", TypeTag::Pointer);
        backend.install_property(raw, "parent", TypeTag::Object);
        Self {
            backend,
            registry: CallbackRegistry::new(),
            button,
        }
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        let mut fixture = Self::new();
        fixture.registry = CallbackRegistry::with_config(config);
        fixture
    }
}
