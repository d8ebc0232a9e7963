//! Icon preview deployment
//!
//! Sends a bundled icon to the review app on a connected device through
//! the `asset-previewer` tool.

use std::path::{Path, PathBuf};

use iconforge_core::{tool::tool_path, ToolRunner};
use tracing::{info, info_span};

use crate::device::DeviceBridge;
use crate::error::{BridgeError, BridgeResult};

/// Previewer executable name
pub const PREVIEWER_TOOL: &str = "asset-previewer";

/// Package id of the on-device icon review app
pub const PREVIEW_PACKAGE: &str = "com.magicleap.iconreview";

/// Port the review app listens on
pub const PREVIEW_PORT: u16 = 9400;

/// Folder layout of the icon being sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    /// Icon name shown in the review app
    pub name: String,
    /// Review app view to open
    pub view: String,
    /// Model folder as referenced by the manifests
    pub manifest_model_folder: String,
    /// Portal folder as referenced by the manifests
    pub manifest_portal_folder: String,
    /// Model folder inside the zip
    pub zip_model_folder: String,
    /// Portal folder inside the zip
    pub zip_portal_folder: String,
}

impl Default for PreviewRequest {
    fn default() -> Self {
        Self {
            name: "Icon".into(),
            view: "detail".into(),
            manifest_model_folder: "Icon/Model".into(),
            manifest_portal_folder: "Icon/Portal".into(),
            zip_model_folder: "Model".into(),
            zip_portal_folder: "Portal".into(),
        }
    }
}

/// Drives the previewer tool
pub struct Previewer<R: ToolRunner> {
    program: PathBuf,
    port: u16,
    runner: R,
}

impl<R: ToolRunner> Previewer<R> {
    /// Previewer from `tools_dir`, or from `PATH` when unset
    pub fn new(tools_dir: Option<&Path>, runner: R) -> Self {
        Self {
            program: tool_path(tools_dir, PREVIEWER_TOOL),
            port: PREVIEW_PORT,
            runner,
        }
    }

    /// Use a non-default review app port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Command line for sending `archive`
    pub fn arguments(&self, device_ip: &str, request: &PreviewRequest, archive: &Path) -> Vec<String> {
        vec![
            "send-icon".into(),
            "--name".into(),
            request.name.clone(),
            "--view".into(),
            request.view.clone(),
            "--manifest-model-folder".into(),
            request.manifest_model_folder.clone(),
            "--manifest-portal-folder".into(),
            request.manifest_portal_folder.clone(),
            "--zip-model-folder".into(),
            request.zip_model_folder.clone(),
            "--zip-portal-folder".into(),
            request.zip_portal_folder.clone(),
            "--device-ip".into(),
            device_ip.to_string(),
            "--port".into(),
            self.port.to_string(),
            archive.display().to_string(),
        ]
    }

    /// Push `archive` to the device at `device_ip`
    pub fn send_icon(&self, device_ip: &str, request: &PreviewRequest, archive: &Path) -> BridgeResult<()> {
        let args = self.arguments(device_ip, request, archive);
        let output = self.runner.run(&self.program, &args)?;
        if !output.success() {
            return Err(BridgeError::CommandFailed {
                command: format!("{} send-icon", PREVIEWER_TOOL),
                code: output.status,
                output: output.combined().trim().to_string(),
            });
        }
        info!(device_ip, archive = %archive.display(), "Sent icon to device");
        Ok(())
    }

    /// Send `archive` to the first connected device, starting the review
    /// app there if needed. Returns the device serial.
    pub fn deploy<B: ToolRunner>(
        &self,
        bridge: &DeviceBridge<B>,
        request: &PreviewRequest,
        archive: &Path,
    ) -> BridgeResult<String> {
        let _span = info_span!("preview", archive = %archive.display()).entered();

        let device = bridge.devices()?.into_iter().next().ok_or(BridgeError::NoDevice)?;
        if !bridge.is_package_running(&device, PREVIEW_PACKAGE)? {
            bridge.launch(&device, PREVIEW_PACKAGE, false)?;
        }

        let ip = bridge
            .device_ip(&device)?
            .ok_or_else(|| BridgeError::NoDeviceIp { device: device.clone() })?;
        self.send_icon(&ip, request, archive)?;
        Ok(device)
    }
}
