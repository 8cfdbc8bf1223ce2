use std::fmt;
use std::sync::Weak;

use tether_common::{
    BridgeError, PlatformError, SizeHint, WindowId, WindowPosition, WindowSize, WindowState,
};

use super::{Inner, WindowManager};
use crate::backend::WindowBackend;

/// Handle to a window. Cheap to clone and safe to keep: once the window
/// is destroyed every operation fails with `WindowNotFound`.
#[derive(Clone)]
pub struct WindowHandle {
    id: WindowId,
    inner: Weak<Inner>,
}

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowHandle").field("id", &self.id).finish()
    }
}

impl WindowHandle {
    pub(crate) fn new(id: WindowId, inner: Weak<Inner>) -> Self {
        Self { id, inner }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn is_main(&self) -> bool {
        self.id.is_main()
    }

    /// Whether the window is still registered.
    pub fn is_alive(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.windows.contains(self.id))
    }

    /// The coordinator owning this window.
    pub fn manager(&self) -> Result<WindowManager, BridgeError> {
        self.inner
            .upgrade()
            .map(WindowManager::from_inner)
            .ok_or(BridgeError::WindowNotFound(self.id))
    }

    pub fn state(&self) -> Result<WindowState, BridgeError> {
        self.manager()?.state(self.id)
    }

    pub fn set_title(&self, title: &str) -> Result<(), BridgeError> {
        let title = title.to_string();
        self.with_window(move |backend, state| {
            backend.set_title(state.id, &title)?;
            state.title = title;
            Ok(())
        })
    }

    /// Resize the window, or set its min/max bounds depending on `hint`.
    pub fn set_size(&self, width: u32, height: u32, hint: SizeHint) -> Result<(), BridgeError> {
        let size = WindowSize::new(width, height, hint);
        self.with_window(move |backend, state| {
            backend.set_size(state.id, size)?;
            state.apply_size(size);
            Ok(())
        })
    }

    /// Move the window's top-left corner to `(x, y)` and resize it. With a
    /// min/max `hint` only the bounds change.
    pub fn set_position_and_size(
        &self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        hint: SizeHint,
    ) -> Result<(), BridgeError> {
        let position = WindowPosition::new(x, y);
        let size = WindowSize::new(width, height, hint);
        self.with_window(move |backend, state| {
            backend.set_position_and_size(state.id, position, size)?;
            state.apply_position_and_size(position, size);
            Ok(())
        })
    }

    pub fn set_visible(&self, visible: bool) -> Result<(), BridgeError> {
        self.with_window(move |backend, state| {
            backend.set_visible(state.id, visible)?;
            state.visible = visible;
            Ok(())
        })
    }

    pub fn show(&self) -> Result<(), BridgeError> {
        self.set_visible(true)
    }

    pub fn hide(&self) -> Result<(), BridgeError> {
        self.set_visible(false)
    }

    pub fn navigate(&self, url: &str) -> Result<(), BridgeError> {
        let url = url.to_string();
        self.with_window(move |backend, state| {
            backend.navigate(state.id, &url)?;
            state.url = url;
            Ok(())
        })
    }

    /// Replace the document with inline HTML.
    pub fn set_html(&self, html: &str) -> Result<(), BridgeError> {
        let html = html.to_string();
        self.with_window(move |backend, state| {
            backend.set_html(state.id, &html)?;
            state.url = "about:blank".to_string();
            Ok(())
        })
    }

    /// Run `js` before page scripts on every later navigation.
    pub fn init(&self, js: &str) -> Result<(), BridgeError> {
        let js = js.to_string();
        self.with_window(move |backend, state| backend.add_init_script(state.id, &js))
    }

    /// Evaluate `js` in the current document.
    pub fn eval(&self, js: &str) -> Result<(), BridgeError> {
        let js = js.to_string();
        self.with_window(move |backend, state| backend.eval(state.id, &js))
    }

    pub async fn eval_async(&self, js: &str) -> Result<(), BridgeError> {
        let js = js.to_string();
        self.with_window_async(move |backend, state| backend.eval(state.id, &js))
            .await
    }

    /// Expose `f` to this window's script as `window[name]`.
    pub fn bind<F>(&self, name: &str, f: F) -> Result<(), BridgeError>
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        self.manager()?.bind(self.id, name, f)
    }

    pub async fn bind_async<F>(&self, name: &str, f: F) -> Result<(), BridgeError>
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        self.manager()?.bind_async(self.id, name, f).await
    }

    pub fn unbind(&self, name: &str) -> Result<(), BridgeError> {
        self.manager()?.unbind(self.id, name)
    }

    /// Open a child window of this window.
    pub fn open_child(&self, url: &str) -> Result<WindowId, BridgeError> {
        self.manager()?.open(self.id, url)
    }

    pub fn open_child_with_id(&self, id: WindowId, url: &str) -> Result<WindowId, BridgeError> {
        self.manager()?.open_with_id(self.id, id, url)
    }

    /// Destroy the window. For the main window this shuts everything down.
    pub fn destroy(&self) -> Result<(), BridgeError> {
        self.manager()?.destroy(self.id)
    }

    fn with_window<R, F>(&self, op: F) -> Result<R, BridgeError>
    where
        R: Send + 'static,
        F: FnOnce(&mut dyn WindowBackend, &mut WindowState) -> Result<R, PlatformError>
            + Send
            + 'static,
    {
        let id = self.id;
        self.manager()?.on_ui(move |inner| inner.with_window(id, op))
    }

    async fn with_window_async<R, F>(&self, op: F) -> Result<R, BridgeError>
    where
        R: Send + 'static,
        F: FnOnce(&mut dyn WindowBackend, &mut WindowState) -> Result<R, PlatformError>
            + Send
            + 'static,
    {
        let id = self.id;
        let manager = self.manager()?;
        manager
            .on_ui_async(move |inner| inner.with_window(id, op))
            .await
    }
}
