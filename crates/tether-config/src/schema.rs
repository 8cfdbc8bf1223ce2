//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

use serde::{Deserialize, Serialize};
use tether_common::{SizeHint, WindowSize};

/// Root configuration for Tether.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TetherConfig {
    pub window: WindowConfig,
    pub bridge: BridgeConfig,
    pub logging: LoggingConfig,
}

/// Initial settings for a window (the main window, or a child opened
/// without explicit settings).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub hint: SizeHint,
    /// Initial navigation target.
    pub url: String,
    /// Enable developer tools in the platform webview.
    pub debug: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Tether".into(),
            width: 480,
            height: 320,
            hint: SizeHint::None,
            url: "http://localhost:3030/webview.html".into(),
            debug: false,
        }
    }
}

impl WindowConfig {
    /// A config that loads `url` with all other settings defaulted.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn size(&self) -> WindowSize {
        WindowSize::new(self.width, self.height, self.hint)
    }
}

/// Coordinator and call-bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    /// First id handed out to child windows opened without an explicit id.
    pub first_child_id: i32,
    /// How long a non-UI thread waits for the UI thread before giving up.
    pub call_timeout_ms: u64,
    /// Close the main window once its last child window closes.
    pub close_main_with_last_child: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            first_child_id: 100,
            call_timeout_ms: 5000,
            close_main_with_last_child: false,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

// =============================================================================
// Tests
// =============================================================================
