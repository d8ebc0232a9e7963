//! Device bridge client
//!
//! Thin wrapper around the SDK's `mldb` executable. Only the handful of
//! commands needed to get an icon onto a headset are exposed.

use std::path::{Path, PathBuf};

use iconforge_core::{tool::tool_path, ToolRunner};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, BridgeResult};

/// Bridge executable name
pub const BRIDGE_TOOL: &str = "mldb";

/// Environment variable naming the SDK directory
pub const SDK_ENV: &str = "MLSDK";

/// One entry of `ps -j`
#[derive(Debug, Clone, Deserialize)]
struct ProcessEntry {
    #[serde(default)]
    package: String,
    #[serde(default)]
    state: String,
}

/// Location of the bridge executable inside an SDK directory
pub fn bridge_executable(sdk: &Path) -> BridgeResult<PathBuf> {
    if !sdk.exists() {
        return Err(BridgeError::SdkNotFound(sdk.to_path_buf()));
    }
    let dir = sdk.join("tools").join(BRIDGE_TOOL);
    Ok(tool_path(Some(&dir), BRIDGE_TOOL))
}

/// Runs bridge commands against connected devices
pub struct DeviceBridge<R: ToolRunner> {
    program: PathBuf,
    runner: R,
}

impl<R: ToolRunner> DeviceBridge<R> {
    /// Bridge using the executable at `program`
    pub fn new(program: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    /// Bridge for the SDK at `sdk`, with its device server started
    pub fn from_sdk(sdk: &Path, runner: R) -> BridgeResult<Self> {
        let bridge = Self::new(bridge_executable(sdk)?, runner);
        bridge.start_server()?;
        Ok(bridge)
    }

    /// Path of the bridge executable
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn invoke(&self, args: Vec<String>) -> BridgeResult<String> {
        debug!(program = %self.program.display(), ?args, "Bridge command");
        let output = self.runner.run(&self.program, &args)?;
        if !output.success() {
            return Err(BridgeError::CommandFailed {
                command: format!("{} {}", BRIDGE_TOOL, args.join(" ")),
                code: output.status,
                output: output.combined().trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// Run `command` against one device
    pub fn run(&self, device: &str, command: &str, args: &[&str]) -> BridgeResult<String> {
        let mut full = vec!["-s".to_string(), device.to_string(), command.to_string()];
        full.extend(args.iter().map(|a| a.to_string()));
        self.invoke(full)
    }

    /// Start the bridge server if it is not running
    pub fn start_server(&self) -> BridgeResult<()> {
        self.invoke(vec!["start-server".into()]).map(|_| ())
    }

    /// Serial numbers of connected devices
    pub fn devices(&self) -> BridgeResult<Vec<String>> {
        let output = self.invoke(vec!["devices".into()])?;

        // first line is a header
        let devices: Vec<String> = output
            .lines()
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| line.split('\t').next())
            .map(|serial| serial.trim().to_string())
            .collect();

        if devices.is_empty() {
            warn!("No connected devices found");
        }
        Ok(devices)
    }

    /// Whether `package` is in the Running state on `device`
    pub fn is_package_running(&self, device: &str, package: &str) -> BridgeResult<bool> {
        let output = self.run(device, "ps", &["-j"])?;
        let entries: Vec<ProcessEntry> = serde_json::from_str(output.trim())?;
        Ok(entries
            .iter()
            .any(|e| e.package == package && e.state == "Running"))
    }

    /// Launch `package`, restarting it first when `force` is set
    pub fn launch(&self, device: &str, package: &str, force: bool) -> BridgeResult<()> {
        let mut args = Vec::with_capacity(2);
        if force {
            args.push("-f");
        }
        args.push(package);
        self.run(device, "launch", &args)?;
        info!(device, package, "Launched package");
        Ok(())
    }

    /// IP address from the device's wifi status, if it has one
    pub fn device_ip(&self, device: &str) -> BridgeResult<Option<String>> {
        let output = self.run(device, "wifi", &["status"])?;
        let ip = output
            .split_whitespace()
            .find_map(|token| token.strip_prefix("IpAddr="))
            .filter(|ip| !ip.is_empty())
            .map(String::from);

        if ip.is_none() {
            warn!(device, "No device IP address found");
        }
        Ok(ip)
    }
}
