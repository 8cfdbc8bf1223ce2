//! In-memory window backend.
//!
//! Keeps the state a real platform would hold so the coordinator can run
//! without a display: in tests, and in the demo binary. Clones share the
//! same state, so a clone kept by the caller can inspect what the
//! coordinator did.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tether_common::{PlatformError, SizeHint, WindowId, WindowPosition, WindowSize};
use tether_config::WindowConfig;
use tracing::trace;

use crate::backend::WindowBackend;

/// What the headless platform knows about one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessWindow {
    pub parent: Option<WindowId>,
    pub title: String,
    pub size: WindowSize,
    pub position: WindowPosition,
    pub visible: bool,
    pub url: String,
    pub html: Option<String>,
    pub debug: bool,
    pub init_scripts: Vec<String>,
    pub evaluated: Vec<String>,
}

#[derive(Debug, Default)]
struct HeadlessState {
    windows: BTreeMap<WindowId, HeadlessWindow>,
    destroyed: Vec<WindowId>,
    threads: HashSet<ThreadId>,
    fail_create: bool,
    fail_destroy: bool,
    fail_scripts: bool,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a live window.
    pub fn window(&self, id: WindowId) -> Option<HeadlessWindow> {
        self.lock().windows.get(&id).cloned()
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.lock().windows.keys().copied().collect()
    }

    /// Scripts evaluated in a live window, oldest first.
    pub fn evaluated(&self, id: WindowId) -> Vec<String> {
        self.lock()
            .windows
            .get(&id)
            .map(|w| w.evaluated.clone())
            .unwrap_or_default()
    }

    /// Windows destroyed through the backend, in order.
    pub fn destroyed(&self) -> Vec<WindowId> {
        self.lock().destroyed.clone()
    }

    /// Every thread that has called into the backend.
    pub fn threads(&self) -> HashSet<ThreadId> {
        self.lock().threads.clone()
    }

    /// Make subsequent window creation fail.
    pub fn set_fail_create(&self, fail: bool) {
        self.lock().fail_create = fail;
    }

    /// Make subsequent window destruction fail.
    pub fn set_fail_destroy(&self, fail: bool) {
        self.lock().fail_destroy = fail;
    }

    /// Make subsequent init scripts and evaluations fail.
    pub fn set_fail_scripts(&self, fail: bool) {
        self.lock().fail_scripts = fail;
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock state, record the calling thread, and hand out the window.
    fn with_window<R>(
        &mut self,
        id: WindowId,
        op: impl FnOnce(&mut HeadlessWindow) -> R,
    ) -> Result<R, PlatformError> {
        let mut state = self.lock();
        state.threads.insert(thread::current().id());
        let window = state
            .windows
            .get_mut(&id)
            .ok_or(PlatformError::NoSuchWindow(id))?;
        Ok(op(window))
    }

    fn with_script_window(
        &mut self,
        id: WindowId,
        op: impl FnOnce(&mut HeadlessWindow),
    ) -> Result<(), PlatformError> {
        if self.lock().fail_scripts {
            return Err(PlatformError::ScriptFailed(format!(
                "scripts disabled on window {id}"
            )));
        }
        self.with_window(id, op)
    }
}

impl WindowBackend for HeadlessBackend {
    fn create_window(
        &mut self,
        id: WindowId,
        parent: Option<WindowId>,
        config: &WindowConfig,
    ) -> Result<(), PlatformError> {
        let mut state = self.lock();
        state.threads.insert(thread::current().id());
        if state.fail_create {
            return Err(PlatformError::CreateFailed(format!(
                "window {id} refused by headless backend"
            )));
        }
        if state.windows.contains_key(&id) {
            return Err(PlatformError::CreateFailed(format!(
                "native window {id} already exists"
            )));
        }

        let url = if config.url.is_empty() {
            "about:blank".to_string()
        } else {
            config.url.clone()
        };
        trace!(window_id = %id, url = %url, "headless window created");
        state.windows.insert(
            id,
            HeadlessWindow {
                parent,
                title: config.title.clone(),
                size: config.size(),
                position: WindowPosition::default(),
                visible: true,
                url,
                html: None,
                debug: config.debug,
                init_scripts: Vec::new(),
                evaluated: Vec::new(),
            },
        );
        Ok(())
    }

    fn destroy_window(&mut self, id: WindowId) -> Result<(), PlatformError> {
        let mut state = self.lock();
        state.threads.insert(thread::current().id());
        if state.fail_destroy {
            return Err(PlatformError::DestroyFailed(format!(
                "window {id} refused to close"
            )));
        }
        if state.windows.remove(&id).is_none() {
            return Err(PlatformError::NoSuchWindow(id));
        }
        state.destroyed.push(id);
        trace!(window_id = %id, "headless window destroyed");
        Ok(())
    }

    fn set_title(&mut self, id: WindowId, title: &str) -> Result<(), PlatformError> {
        self.with_window(id, |w| w.title = title.to_string())
    }

    fn set_size(&mut self, id: WindowId, size: WindowSize) -> Result<(), PlatformError> {
        self.with_window(id, |w| w.size = size)
    }

    fn set_position_and_size(
        &mut self,
        id: WindowId,
        position: WindowPosition,
        size: WindowSize,
    ) -> Result<(), PlatformError> {
        self.with_window(id, |w| {
            if matches!(size.hint, SizeHint::None | SizeHint::Fixed) {
                w.position = position;
            }
            w.size = size;
        })
    }

    fn set_visible(&mut self, id: WindowId, visible: bool) -> Result<(), PlatformError> {
        self.with_window(id, |w| w.visible = visible)
    }

    fn navigate(&mut self, id: WindowId, url: &str) -> Result<(), PlatformError> {
        self.with_window(id, |w| {
            w.url = url.to_string();
            w.html = None;
        })
    }

    fn set_html(&mut self, id: WindowId, html: &str) -> Result<(), PlatformError> {
        self.with_window(id, |w| {
            w.url = "about:blank".to_string();
            w.html = Some(html.to_string());
        })
    }

    fn add_init_script(&mut self, id: WindowId, js: &str) -> Result<(), PlatformError> {
        self.with_script_window(id, |w| w.init_scripts.push(js.to_string()))
    }

    fn eval(&mut self, id: WindowId, js: &str) -> Result<(), PlatformError> {
        self.with_script_window(id, |w| w.evaluated.push(js.to_string()))
    }
}
