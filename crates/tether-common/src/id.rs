use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a window. Child windows use positive ids; every id `<= 0`
/// denotes the main window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub i32);

impl WindowId {
    /// Sentinel id reported for the main window.
    pub const MAIN: WindowId = WindowId(-1);

    pub fn is_main(self) -> bool {
        self.0 <= 0
    }

    pub fn as_i32(self) -> i32 {
        self.0
    }
}

impl From<i32> for WindowId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_main() {
            write!(f, "main")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
