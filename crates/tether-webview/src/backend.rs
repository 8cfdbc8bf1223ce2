//! Platform window layer.
//!
//! The coordinator never talks to a GUI toolkit directly. A `WindowBackend`
//! owns the native windows and webviews; the coordinator only calls it from
//! the UI thread, one call at a time.

use tether_common::{PlatformError, WindowId, WindowPosition, WindowSize};
use tether_config::WindowConfig;

/// Operations the coordinator needs from the platform.
///
/// Inbound platform events travel the other way, through
/// [`WindowManager::handle_script_message`](crate::WindowManager::handle_script_message)
/// and [`WindowManager::handle_window_closed`](crate::WindowManager::handle_window_closed).
pub trait WindowBackend: Send + 'static {
    /// Create a native window with a webview, apply the initial title and
    /// size, and start navigating to `config.url`.
    fn create_window(
        &mut self,
        id: WindowId,
        parent: Option<WindowId>,
        config: &WindowConfig,
    ) -> Result<(), PlatformError>;

    /// Close the native window and release its resources.
    fn destroy_window(&mut self, id: WindowId) -> Result<(), PlatformError>;

    fn set_title(&mut self, id: WindowId, title: &str) -> Result<(), PlatformError>;

    fn set_size(&mut self, id: WindowId, size: WindowSize) -> Result<(), PlatformError>;

    /// Move and resize in one step. With a min/max hint only the bounds
    /// change and the position is ignored.
    fn set_position_and_size(
        &mut self,
        id: WindowId,
        position: WindowPosition,
        size: WindowSize,
    ) -> Result<(), PlatformError>;

    fn set_visible(&mut self, id: WindowId, visible: bool) -> Result<(), PlatformError>;

    fn navigate(&mut self, id: WindowId, url: &str) -> Result<(), PlatformError>;

    /// Replace the document with inline HTML.
    fn set_html(&mut self, id: WindowId, html: &str) -> Result<(), PlatformError>;

    /// Register a script that runs before page scripts on every navigation.
    fn add_init_script(&mut self, id: WindowId, js: &str) -> Result<(), PlatformError>;

    /// Evaluate a script in the current document.
    fn eval(&mut self, id: WindowId, js: &str) -> Result<(), PlatformError>;
}
