//! Multi-window webview coordinator.
//!
//! Sits between host code and a platform webview layer to provide:
//! - A UI-thread task queue that marshals window operations from any thread
//! - A registry of live windows (main + children) keyed by id
//! - Open/close lifecycle observers
//! - Named host bindings callable from page script
//! - A single native invoke entry point reachable from every window

pub mod backend;
pub mod bindings;
pub mod headless;
pub mod lifecycle;
pub mod manager;
pub mod native;
pub mod rpc;
pub mod ui;
pub mod window_url;

pub use backend::WindowBackend;
pub use bindings::{Binding, BindingRegistry};
pub use headless::HeadlessBackend;
pub use lifecycle::LifecycleDispatcher;
pub use manager::{WindowHandle, WindowManager, WindowRegistry};
pub use native::{NativeHandler, NativeInvokeBridge};
pub use ui::{UiHandle, UiLoop};
