use crate::types::type_tag::TypeTag;
use std::ffi::NulError;
use std::str::Utf8Error;
use std::sync::{MutexGuard, PoisonError};
use thiserror::Error;

/// Integer key identifying one registered callback.
pub type CallId = usize;

pub type BindResult<T> = Result<T, BindError>;

#[derive(Error, Debug)]
pub enum BindError {
    #[error("native call returned unexpected nil pointer")]
    NilPtr,

    #[error("type not supported for generic conversion: {0}")]
    UnsupportedType(TypeTag),

    #[error("value holds {found}, expected {expected}")]
    ValueTypeMismatch { expected: TypeTag, found: TypeTag },

    #[error("value has already been released")]
    ReleasedValue,

    #[error("String conversion error: {0}")]
    StringConversion(#[from] NulError),

    #[error("UTF-8 conversion error: {0}")]
    Utf8Conversion(#[from] Utf8Error),

    #[error("object has no property named '{0}'")]
    UnknownProperty(String),

    #[error("object has no signal named '{0}'")]
    UnknownSignal(String),

    #[error("signal '{signal}' takes {n_params} arguments and cannot be emitted without them")]
    SignalArity { signal: String, n_params: u32 },

    #[error("no callback registered with id {0}")]
    UnknownCallback(CallId),

    #[error("callback {0} has been disconnected")]
    StaleCallback(CallId),

    #[error("Mutex poisoned")]
    MutexPoisoned,
}

impl BindError {
    pub fn is_nil_ptr(&self) -> bool {
        matches!(self, BindError::NilPtr)
    }

    pub fn is_unsupported_type(&self) -> bool {
        matches!(self, BindError::UnsupportedType(_))
    }
}

impl<T> From<PoisonError<MutexGuard<'_, T>>> for BindError {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        BindError::MutexPoisoned
    }
}
