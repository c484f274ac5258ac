use crate::core::callback_context::CallbackContext;
use std::fmt;
use std::sync::Arc;

pub type PlainFn = dyn Fn() + Send + Sync;
pub type PlainWithReturnFn = dyn Fn() -> bool + Send + Sync;
pub type ContextFn = dyn for<'a> Fn(&CallbackContext<'a>) + Send + Sync;
pub type ContextWithReturnFn = dyn for<'a> Fn(&CallbackContext<'a>) -> bool + Send + Sync;

/// A signal handler, tagged by the shape of its signature.
///
/// The shape decides at registration time whether the handler receives the
/// callback context and whether its result is marshaled back to the native
/// signal. Handlers without a result leave the return slot at `false`.
#[derive(Clone)]
pub enum Handler {
    Plain(Arc<PlainFn>),
    PlainWithReturn(Arc<PlainWithReturnFn>),
    WithContext(Arc<ContextFn>),
    WithReturn(Arc<ContextWithReturnFn>),
}

impl Handler {
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Handler::Plain(Arc::new(f))
    }

    pub fn plain_with_return<F>(f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Handler::PlainWithReturn(Arc::new(f))
    }

    pub fn with_context<F>(f: F) -> Self
    where
        F: for<'a> Fn(&CallbackContext<'a>) + Send + Sync + 'static,
    {
        Handler::WithContext(Arc::new(f))
    }

    pub fn with_return<F>(f: F) -> Self
    where
        F: for<'a> Fn(&CallbackContext<'a>) -> bool + Send + Sync + 'static,
    {
        Handler::WithReturn(Arc::new(f))
    }

    pub fn accepts_context(&self) -> bool {
        matches!(self, Handler::WithContext(_) | Handler::WithReturn(_))
    }

    pub fn returns_value(&self) -> bool {
        matches!(self, Handler::PlainWithReturn(_) | Handler::WithReturn(_))
    }

    /// Run the handler. `Some` carries the value to marshal back.
    pub(crate) fn invoke(&self, ctx: &CallbackContext<'_>) -> Option<bool> {
        match self {
            Handler::Plain(f) => {
                f();
                None
            }
            Handler::PlainWithReturn(f) => Some(f()),
            Handler::WithContext(f) => {
                f(ctx);
                None
            }
            Handler::WithReturn(f) => Some(f(ctx)),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self {
            Handler::Plain(_) => "Plain",
            Handler::PlainWithReturn(_) => "PlainWithReturn",
            Handler::WithContext(_) => "WithContext",
            Handler::WithReturn(_) => "WithReturn",
        };
        f.debug_tuple("Handler").field(&shape).finish()
    }
}
