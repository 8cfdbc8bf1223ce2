pub mod errors;
pub mod events;
pub mod id;
pub mod types;

pub use errors::{BridgeError, ConfigError, PlatformError, TetherError};
pub use events::{EventBus, WindowEvent};
pub use id::WindowId;
pub use types::{SizeHint, WindowPosition, WindowSize, WindowState};

pub type Result<T> = std::result::Result<T, TetherError>;
