//! Native invoke entry point.
//!
//! One process-wide handler receives `(window id, payload)` from any
//! window's script and answers `(ok, payload)`. Registering replaces the
//! previous handler. The handler runs on the thread that received the call
//! and no bridge lock is held while it runs.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use tether_common::{BridgeError, WindowId};
use tracing::{debug, error, warn};

use crate::lifecycle::panic_message;

pub type NativeHandler = Arc<dyn Fn(WindowId, &str) -> (bool, String) + Send + Sync>;

#[derive(Default)]
pub struct NativeInvokeBridge {
    handler: RwLock<Option<NativeHandler>>,
}

impl NativeInvokeBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the handler, replacing any previous one.
    pub fn register_handler<F>(&self, handler: F)
    where
        F: Fn(WindowId, &str) -> (bool, String) + Send + Sync + 'static,
    {
        let previous = self
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::new(handler));
        debug!(replaced = previous.is_some(), "native invoke handler registered");
    }

    pub fn has_handler(&self) -> bool {
        self.current().is_some()
    }

    /// Dispatch a call, reporting a missing handler as an error.
    ///
    /// The window id is passed through unchecked; validating it is the
    /// handler's business.
    pub fn try_dispatch(&self, window: WindowId, payload: &str) -> Result<(bool, String), BridgeError> {
        let handler = self.current().ok_or(BridgeError::DispatchUnhandled)?;

        match panic::catch_unwind(AssertUnwindSafe(|| handler(window, payload))) {
            Ok(outcome) => Ok(outcome),
            Err(panic) => {
                error!(
                    window_id = %window,
                    "native invoke handler panicked: {}",
                    panic_message(&*panic)
                );
                Ok((false, String::new()))
            }
        }
    }

    /// Dispatch a call. Without a handler this yields `(false, "")`.
    pub fn dispatch(&self, window: WindowId, payload: &str) -> (bool, String) {
        match self.try_dispatch(window, payload) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(window_id = %window, "native invoke dropped: {e}");
                (false, String::new())
            }
        }
    }

    fn current(&self) -> Option<NativeHandler> {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
