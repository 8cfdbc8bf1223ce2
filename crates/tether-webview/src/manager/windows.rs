//! Window creation and teardown.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tether_common::{BridgeError, WindowId, WindowState};
use tether_config::WindowConfig;
use tracing::{debug, info, warn};

use super::{canonical, Inner, WindowHandle, WindowManager};
use crate::{rpc, window_url};

impl WindowManager {
    /// Create the main window. Its id is always [`WindowId::MAIN`].
    pub fn open_main(&self, config: WindowConfig) -> Result<WindowHandle, BridgeError> {
        self.on_ui(move |inner| inner.open_window(WindowId::MAIN, None, config))
    }

    /// Open a child window under `parent` with the next free id.
    pub fn open(&self, parent: WindowId, url: &str) -> Result<WindowId, BridgeError> {
        let config = WindowConfig::with_url(url);
        self.open_child(parent, None, config).map(|handle| handle.id())
    }

    /// Open a child window under `parent` with a caller-chosen id.
    pub fn open_with_id(
        &self,
        parent: WindowId,
        id: WindowId,
        url: &str,
    ) -> Result<WindowId, BridgeError> {
        let config = WindowConfig::with_url(url);
        self.open_child(parent, Some(id), config)
            .map(|handle| handle.id())
    }

    /// Open a child window with full control over its initial settings.
    /// `id` of `None` picks the next free id.
    pub fn open_child(
        &self,
        parent: WindowId,
        id: Option<WindowId>,
        config: WindowConfig,
    ) -> Result<WindowHandle, BridgeError> {
        let parent = canonical(parent);
        self.on_ui(move |inner| inner.open_child(parent, id, config))
    }

    /// Destroy a window. Destroying the main window closes every child
    /// first and then stops the UI loop.
    pub fn destroy(&self, id: WindowId) -> Result<(), BridgeError> {
        let id = canonical(id);
        self.on_ui(move |inner| {
            if id.is_main() {
                inner.shutdown(true)
            } else {
                inner.close_child(id, true)
            }
        })
    }

    /// Close everything and stop the UI loop.
    pub fn shutdown(&self) -> Result<(), BridgeError> {
        self.destroy(WindowId::MAIN)
    }

    /// Report a window the platform already closed (e.g. by the user).
    /// The window is unregistered without asking the platform to close it
    /// again.
    pub fn handle_window_closed(&self, id: WindowId) -> Result<(), BridgeError> {
        let id = canonical(id);
        debug!(window_id = %id, "platform closed window");
        self.on_ui(move |inner| {
            if id.is_main() {
                inner.shutdown(false)
            } else {
                inner.close_child(id, false)
            }
        })
    }
}

impl Inner {
    fn open_child(
        self: &Arc<Self>,
        parent: WindowId,
        id: Option<WindowId>,
        mut config: WindowConfig,
    ) -> Result<WindowHandle, BridgeError> {
        if self.shutting_down.load(Ordering::SeqCst) || !self.windows.contains(parent) {
            return Err(BridgeError::WindowNotFound(parent));
        }
        let id = match id {
            Some(id) if id.is_main() => return Err(BridgeError::InvalidWindowId(id)),
            Some(id) => id,
            None => self.windows.allocate_id(),
        };
        if !config.url.is_empty() {
            config.url = window_url::tag_url(&config.url, id);
        }
        self.open_window(id, Some(parent), config)
    }

    /// Create and register a window, then notify open observers.
    fn open_window(
        self: &Arc<Self>,
        id: WindowId,
        parent: Option<WindowId>,
        config: WindowConfig,
    ) -> Result<WindowHandle, BridgeError> {
        let url = if config.url.is_empty() {
            "about:blank".to_string()
        } else {
            config.url.clone()
        };

        self.windows.insert_with(id, || {
            let mut backend = self.backend();
            backend.create_window(id, parent, &config)?;
            if let Err(e) = backend.add_init_script(id, &rpc::native_invoke_stub()) {
                warn!(window_id = %id, "native invoke stub not installed: {e}");
            }

            let mut state = WindowState::new(id, parent, url.clone());
            state.title = config.title.clone();
            state.apply_size(config.size());
            Ok(state)
        })?;
        info!(window_id = %id, parent = ?parent, url = %url, "window opened");

        let handle = WindowHandle::new(id, Arc::downgrade(self));
        self.lifecycle.notify_open(id, &handle);
        Ok(handle)
    }

    fn close_child(&self, id: WindowId, release: bool) -> Result<(), BridgeError> {
        self.close_window(id, release, false)?;

        if self.config.close_main_with_last_child
            && self.windows.child_ids().is_empty()
            && self.windows.contains(WindowId::MAIN)
        {
            info!("last child window closed, closing main window");
            self.shutdown(true)?;
        }
        Ok(())
    }

    /// Unregister a window, asking the platform to close it when
    /// `release` is set. With `force`, a platform failure is logged and
    /// the window is unregistered anyway.
    fn close_window(&self, id: WindowId, release: bool, force: bool) -> Result<(), BridgeError> {
        self.windows.remove_with(id, |_| {
            if !release {
                return Ok(());
            }
            match self.backend().destroy_window(id) {
                Ok(()) => Ok(()),
                Err(e) if force => {
                    warn!(window_id = %id, "platform close failed, dropping window: {e}");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        })?;
        info!(window_id = %id, "window closed");

        self.lifecycle.notify_close(id);
        Ok(())
    }

    /// Close every child, then the main window, then stop the UI loop.
    /// Child opens are refused from here on, close observers included.
    fn shutdown(&self, release_main: bool) -> Result<(), BridgeError> {
        if !self.windows.contains(WindowId::MAIN) {
            return Err(BridgeError::WindowNotFound(WindowId::MAIN));
        }
        self.shutting_down.store(true, Ordering::SeqCst);

        loop {
            let children = self.windows.child_ids();
            if children.is_empty() {
                break;
            }
            for child in children {
                // A close observer may already have closed it.
                if let Err(e) = self.close_window(child, true, true) {
                    debug!(window_id = %child, "skipping child during shutdown: {e}");
                }
            }
        }
        self.close_window(WindowId::MAIN, release_main, true)?;

        self.lifecycle.publish_shutdown();
        self.ui.quit();
        info!("shutdown complete");
        Ok(())
    }
}
