//! NetworkManager-backed transport.
//!
//! Hosting uses `nmcli device wifi hotspot`, which puts the interface in
//! shared mode with NetworkManager's default gateway of `10.42.0.1`.
//! Platforms without NetworkManager report themselves as unsupported.

use std::net::{IpAddr, Ipv4Addr};

use async_trait::async_trait;
use tokio::process::Command;

use super::{HotspotCredentials, NearbyTransport};
use crate::error::{Error, Result};

/// Connection profile name used for the hosted network.
const CONNECTION_NAME: &str = "vidshare-hotspot";

/// Gateway address NetworkManager assigns in shared mode.
const SHARED_GATEWAY: Ipv4Addr = Ipv4Addr::new(10, 42, 0, 1);

/// Permissions that allow creating a protected shared network.
const REQUIRED_PERMISSIONS: &[&str] = &[
    "org.freedesktop.NetworkManager.wifi.share.protected",
    "org.freedesktop.NetworkManager.settings.modify.system",
];

/// Transport driving the system wireless stack.
#[derive(Debug, Clone, Default)]
pub struct SystemTransport {
    interface: Option<String>,
}

impl SystemTransport {
    /// Use NetworkManager's default wireless interface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a specific wireless interface (e.g. `wlan0`).
    #[must_use]
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    fn nmcli_available() -> bool {
        std::env::var_os("PATH").is_some_and(|paths| {
            std::env::split_paths(&paths).any(|dir| dir.join("nmcli").is_file())
        })
    }

    fn interface_args(&self) -> Vec<&str> {
        self.interface
            .as_deref()
            .map_or_else(Vec::new, |iface| vec!["ifname", iface])
    }
}

async fn nmcli(args: &[&str]) -> Result<String> {
    tracing::debug!(?args, "Running nmcli");
    let output = Command::new("nmcli")
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| Error::Hotspot(format!("failed to run nmcli: {e}")))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(Error::Hotspot(stderr.trim().to_string()))
    }
}

/// Parse `nmcli -t -f PERMISSION,VALUE general permissions` output.
fn missing_permissions(output: &str) -> Vec<&'static str> {
    REQUIRED_PERMISSIONS
        .iter()
        .copied()
        .filter(|required| {
            !output.lines().any(|line| {
                line.split_once(':').is_some_and(|(name, value)| {
                    name == *required && matches!(value.trim(), "yes" | "auth")
                })
            })
        })
        .collect()
}

#[async_trait]
impl NearbyTransport for SystemTransport {
    fn name(&self) -> &'static str {
        "networkmanager"
    }

    fn is_supported(&self) -> bool {
        cfg!(target_os = "linux") && Self::nmcli_available()
    }

    async fn check_permissions(&self) -> Result<()> {
        let output = nmcli(&["-t", "-f", "PERMISSION,VALUE", "general", "permissions"]).await?;
        let missing = missing_permissions(&output);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::PermissionDenied(format!(
                "missing NetworkManager permissions: {}",
                missing.join(", ")
            )))
        }
    }

    async fn start_access_point(&self, credentials: &HotspotCredentials) -> Result<()> {
        let mut args = vec!["device", "wifi", "hotspot", "con-name", CONNECTION_NAME];
        args.extend(self.interface_args());
        args.extend(["ssid", credentials.ssid.as_str()]);
        if credentials.is_secured {
            args.extend(["password", credentials.password.as_str()]);
        }
        nmcli(&args).await.map(|_| ())
    }

    async fn stop_access_point(&self) -> Result<()> {
        nmcli(&["connection", "down", CONNECTION_NAME]).await?;
        nmcli(&["connection", "delete", CONNECTION_NAME]).await.map(|_| ())
    }

    async fn join_access_point(&self, credentials: &HotspotCredentials) -> Result<()> {
        if !self.is_supported() {
            return Err(Error::UnsupportedPlatform(
                "joining a hotspot requires NetworkManager".to_string(),
            ));
        }
        let mut args = vec!["device", "wifi", "connect", credentials.ssid.as_str()];
        if credentials.is_secured {
            args.extend(["password", credentials.password.as_str()]);
        }
        args.extend(self.interface_args());
        nmcli(&args).await.map(|_| ())
    }

    fn gateway_address(&self) -> Option<IpAddr> {
        Some(IpAddr::V4(SHARED_GATEWAY))
    }
}
