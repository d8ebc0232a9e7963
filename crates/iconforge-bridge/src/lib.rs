//! iconforge Device Bridge
//!
//! Optional preview deployment: find a connected device, make sure the
//! icon review app is running and push a bundled icon to it.

pub mod device;
pub mod error;
pub mod previewer;

pub use device::{bridge_executable, DeviceBridge, BRIDGE_TOOL, SDK_ENV};
pub use error::{BridgeError, BridgeResult};
pub use previewer::{PreviewRequest, Previewer, PREVIEWER_TOOL, PREVIEW_PACKAGE, PREVIEW_PORT};
