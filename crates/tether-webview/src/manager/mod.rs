//! Window coordination.
//!
//! `WindowManager` creates, tracks, and destroys windows through a
//! [`WindowBackend`], and routes script calls to host bindings and the
//! native invoke handler. It is cheap to clone and usable from any thread:
//! every platform call is marshaled onto the UI thread.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tether_common::{BridgeError, PlatformError, WindowEvent, WindowId, WindowState};
use tether_config::BridgeConfig;
use tokio::sync::broadcast;

use crate::backend::WindowBackend;
use crate::bindings::BindingRegistry;
use crate::lifecycle::LifecycleDispatcher;
use crate::native::NativeInvokeBridge;
use crate::ui::UiHandle;

mod handle;
mod handlers;
mod registry;
mod windows;


pub use handle::WindowHandle;
pub use registry::WindowRegistry;

/// Shared coordinator state. Lock order: registry, then backend, then
/// bindings. No lock is held while observers or callables run.
pub(crate) struct Inner {
    pub(crate) ui: UiHandle,
    backend: Mutex<Box<dyn WindowBackend>>,
    pub(crate) windows: WindowRegistry,
    pub(crate) bindings: BindingRegistry,
    pub(crate) lifecycle: LifecycleDispatcher,
    pub(crate) native: NativeInvokeBridge,
    pub(crate) config: BridgeConfig,
    /// Set once shutdown starts; no window may open after that.
    shutting_down: AtomicBool,
}

impl Inner {
    fn backend(&self) -> MutexGuard<'_, Box<dyn WindowBackend>> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a platform operation on a live window. The window cannot be
    /// destroyed while `op` runs.
    pub(crate) fn with_window<R, F>(&self, id: WindowId, op: F) -> Result<R, BridgeError>
    where
        F: FnOnce(&mut dyn WindowBackend, &mut WindowState) -> Result<R, PlatformError>,
    {
        self.windows.with_window_mut(id, |state| {
            let mut backend = self.backend();
            op(&mut **backend, state).map_err(BridgeError::from)
        })
    }
}

/// Coordinates the main window, its child windows, and the call bridge.
#[derive(Clone)]
pub struct WindowManager {
    inner: Arc<Inner>,
}

impl WindowManager {
    /// Create a coordinator driving `backend`. Platform calls are queued
    /// through `ui`; the matching [`UiLoop`](crate::UiLoop) must run on the
    /// thread that owns the platform.
    pub fn new<B: WindowBackend>(backend: B, ui: UiHandle, config: BridgeConfig) -> Self {
        let inner = Arc::new(Inner {
            ui,
            backend: Mutex::new(Box::new(backend)),
            windows: WindowRegistry::new(config.first_child_id),
            bindings: BindingRegistry::new(),
            lifecycle: LifecycleDispatcher::new(),
            native: NativeInvokeBridge::new(),
            config,
            shutting_down: AtomicBool::new(false),
        });

        // Bindings never outlive their window.
        let weak = Arc::downgrade(&inner);
        inner.lifecycle.on_close(move |id| {
            if let Some(inner) = weak.upgrade() {
                inner.bindings.remove_window(id);
            }
        });

        Self { inner }
    }

    pub(crate) fn from_inner(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    pub fn ui(&self) -> &UiHandle {
        &self.inner.ui
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn windows(&self) -> &WindowRegistry {
        &self.inner.windows
    }

    pub fn bindings(&self) -> &BindingRegistry {
        &self.inner.bindings
    }

    pub fn lifecycle(&self) -> &LifecycleDispatcher {
        &self.inner.lifecycle
    }

    pub fn native(&self) -> &NativeInvokeBridge {
        &self.inner.native
    }

    /// Register an open observer. See [`LifecycleDispatcher::on_open`].
    pub fn on_window_opened<F>(&self, observer: F)
    where
        F: Fn(WindowId, &WindowHandle) + Send + Sync + 'static,
    {
        self.inner.lifecycle.on_open(observer);
    }

    /// Register a close observer. See [`LifecycleDispatcher::on_close`].
    pub fn on_window_closed<F>(&self, observer: F)
    where
        F: Fn(WindowId) + Send + Sync + 'static,
    {
        self.inner.lifecycle.on_close(observer);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WindowEvent> {
        self.inner.lifecycle.subscribe()
    }

    /// Handle to a live window.
    pub fn lookup(&self, id: WindowId) -> Result<WindowHandle, BridgeError> {
        let id = canonical(id);
        if self.inner.windows.contains(id) {
            Ok(WindowHandle::new(id, Arc::downgrade(&self.inner)))
        } else {
            Err(BridgeError::WindowNotFound(id))
        }
    }

    pub fn main_window(&self) -> Result<WindowHandle, BridgeError> {
        self.lookup(WindowId::MAIN)
    }

    /// Tracked attributes of a live window.
    pub fn state(&self, id: WindowId) -> Result<WindowState, BridgeError> {
        let id = canonical(id);
        self.inner
            .windows
            .state(id)
            .ok_or(BridgeError::WindowNotFound(id))
    }

    /// Run `op` on the UI thread with access to the coordinator state.
    pub(crate) fn on_ui<R, F>(&self, op: F) -> Result<R, BridgeError>
    where
        R: Send + 'static,
        F: FnOnce(&Arc<Inner>) -> Result<R, BridgeError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        self.inner.ui.call(move || op(&inner))?
    }

    pub(crate) async fn on_ui_async<R, F>(&self, op: F) -> Result<R, BridgeError>
    where
        R: Send + 'static,
        F: FnOnce(&Arc<Inner>) -> Result<R, BridgeError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        self.inner.ui.call_async(move || op(&inner)).await?
    }
}

/// Every id `<= 0` addresses the main window, stored under
/// [`WindowId::MAIN`].
pub(crate) fn canonical(id: WindowId) -> WindowId {
    if id.is_main() {
        WindowId::MAIN
    } else {
        id
    }
}
