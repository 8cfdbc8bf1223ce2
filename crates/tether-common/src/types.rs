use serde::{Deserialize, Serialize};

use crate::id::WindowId;

/// How the platform should interpret a size request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SizeHint {
    /// Width and height are the current size.
    #[default]
    None,
    /// Width and height are the minimum bounds.
    Min,
    /// Width and height are the maximum bounds.
    Max,
    /// Size cannot be changed by the user.
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
    pub hint: SizeHint,
}

impl WindowSize {
    pub fn new(width: u32, height: u32, hint: SizeHint) -> Self {
        Self {
            width,
            height,
            hint,
        }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(480, 320, SizeHint::None)
    }
}

/// Top-left corner of a window in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WindowPosition {
    pub x: i32,
    pub y: i32,
}

impl WindowPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Snapshot of the attributes tracked for one window.
///
/// The coordinator records what it last asked the platform to do; it is
/// best-effort and does not observe user-driven changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowState {
    pub id: WindowId,
    pub parent: Option<WindowId>,
    pub title: String,
    pub size: WindowSize,
    /// Set once the window has been placed explicitly.
    pub position: Option<WindowPosition>,
    /// Last `SizeHint::Min` bounds, if any were set.
    pub min_size: Option<WindowSize>,
    /// Last `SizeHint::Max` bounds, if any were set.
    pub max_size: Option<WindowSize>,
    pub visible: bool,
    pub url: String,
}

impl WindowState {
    pub fn new(id: WindowId, parent: Option<WindowId>, url: impl Into<String>) -> Self {
        Self {
            id,
            parent,
            title: String::new(),
            size: WindowSize::default(),
            position: None,
            min_size: None,
            max_size: None,
            visible: true,
            url: url.into(),
        }
    }

    /// Record a size request. Min/max hints set bounds, the others resize.
    pub fn apply_size(&mut self, size: WindowSize) {
        match size.hint {
            SizeHint::Min => self.min_size = Some(size),
            SizeHint::Max => self.max_size = Some(size),
            SizeHint::None | SizeHint::Fixed => self.size = size,
        }
    }

    /// Record a move-and-resize request. Min/max hints only set bounds and
    /// leave the window where it is.
    pub fn apply_position_and_size(&mut self, position: WindowPosition, size: WindowSize) {
        if matches!(size.hint, SizeHint::None | SizeHint::Fixed) {
            self.position = Some(position);
        }
        self.apply_size(size);
    }
}
