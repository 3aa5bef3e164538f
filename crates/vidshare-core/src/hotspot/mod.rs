//! Ad-hoc access point control for offline sharing.
//!
//! The radio itself is reached through the [`NearbyTransport`] capability.
//! Two implementations exist:
//!
//! - [`SystemTransport`] - NetworkManager (`nmcli`) on Linux, unsupported elsewhere
//! - [`SimulatedTransport`] - in-memory, for tests and machines without a radio
//!
//! The composition root picks one at construction time and hands it to the
//! [`HotspotController`] (sender) or the download client (receiver).
//!
//! ## State machine
//!
//! ```text
//! Inactive -> CheckingPermissions -> Active -> Inactive
//! ```
//!
//! Failure at any point returns the controller to `Inactive`, and `stop`
//! always ends in `Inactive` even if the platform teardown fails.

mod simulated;
mod system;

pub use simulated::SimulatedTransport;
pub use system::SystemTransport;

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

use crate::error::{Error, Result};
use crate::HOTSPOT_PASSWORD_LENGTH;

/// Characters used for generated passwords.
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Credentials of an access point.
///
/// Also serves as the create configuration: `create` brings up exactly the
/// network these credentials describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotCredentials {
    /// Network name
    pub ssid: String,
    /// WPA passphrase
    pub password: String,
    /// Whether the network is password protected
    pub is_secured: bool,
}

/// Platform capability for hosting and joining access points.
#[async_trait]
pub trait NearbyTransport: Send + Sync + fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether this platform can host an access point at all.
    ///
    /// Must fail closed: anything uncertain returns `false`.
    fn is_supported(&self) -> bool;

    /// Check that the process may manage the radio.
    async fn check_permissions(&self) -> Result<()>;

    /// Bring up an access point with the given credentials.
    async fn start_access_point(&self, credentials: &HotspotCredentials) -> Result<()>;

    /// Tear down the access point started by this transport.
    async fn stop_access_point(&self) -> Result<()>;

    /// Join an access point hosted by another device.
    async fn join_access_point(&self, credentials: &HotspotCredentials) -> Result<()>;

    /// Address peers reach this device at while its access point is up.
    fn gateway_address(&self) -> Option<IpAddr>;
}

/// Lifecycle state of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotspotState {
    /// No access point
    Inactive,
    /// Verifying the platform allows hosting
    CheckingPermissions,
    /// Access point is up
    Active(HotspotCredentials),
}

/// Snapshot of the controller for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotStatus {
    /// Whether an access point is up
    pub is_active: bool,
    /// Network name, while active
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    /// Whether the network is secured, while active
    pub is_secured: bool,
}

/// Owns the single access point a device may host.
pub struct HotspotController {
    transport: Arc<dyn NearbyTransport>,
    create_timeout: Duration,
    state: watch::Sender<HotspotState>,
    op_lock: Mutex<()>,
}

impl fmt::Debug for HotspotController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HotspotController")
            .field("transport", &self.transport.name())
            .field("create_timeout", &self.create_timeout)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl HotspotController {
    /// Create a controller over the given transport.
    pub fn new(transport: Arc<dyn NearbyTransport>, create_timeout: Duration) -> Self {
        let (state, _) = watch::channel(HotspotState::Inactive);
        Self {
            transport,
            create_timeout,
            state,
            op_lock: Mutex::new(()),
        }
    }

    /// The transport in use.
    pub fn transport(&self) -> &Arc<dyn NearbyTransport> {
        &self.transport
    }

    /// Whether this device can host an access point.
    pub fn is_supported(&self) -> bool {
        self.transport.is_supported()
    }

    /// Current state.
    pub fn state(&self) -> HotspotState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<HotspotState> {
        self.state.subscribe()
    }

    /// Status snapshot.
    pub fn status(&self) -> HotspotStatus {
        match &*self.state.borrow() {
            HotspotState::Active(credentials) => HotspotStatus {
                is_active: true,
                ssid: Some(credentials.ssid.clone()),
                is_secured: credentials.is_secured,
            },
            _ => HotspotStatus {
                is_active: false,
                ssid: None,
                is_secured: false,
            },
        }
    }

    /// Address receivers should use to reach this device while active.
    pub fn gateway_address(&self) -> Option<IpAddr> {
        matches!(*self.state.borrow(), HotspotState::Active(_))
            .then(|| self.transport.gateway_address())
            .flatten()
    }

    /// Generate fresh credentials.
    ///
    /// The SSID is `<prefix>_<last 6 digits of the epoch-ms timestamp>` and the
    /// password is drawn from `[A-Za-z0-9]`.
    ///
    /// # Example
    ///
    /// ```
    /// use vidshare_core::hotspot::HotspotController;
    ///
    /// let creds = HotspotController::generate_credentials("VidShare");
    /// assert!(creds.ssid.starts_with("VidShare_"));
    /// assert_eq!(creds.password.len(), 12);
    /// ```
    pub fn generate_credentials(prefix: &str) -> HotspotCredentials {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let mut rng = rand::thread_rng();
        let password = (0..HOTSPOT_PASSWORD_LENGTH)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect();

        HotspotCredentials {
            ssid: format!("{prefix}_{:06}", now_ms % 1_000_000),
            password,
            is_secured: true,
        }
    }

    /// Bring up an access point.
    ///
    /// Any access point already active is torn down first. The whole
    /// permission check and start sequence is bounded by the create timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`], [`Error::PermissionDenied`],
    /// [`Error::Timeout`] or the transport's error. The controller is
    /// `Inactive` after any error.
    pub async fn create(&self, credentials: &HotspotCredentials) -> Result<()> {
        let _guard = self.op_lock.lock().await;

        if matches!(*self.state.borrow(), HotspotState::Active(_)) {
            tracing::info!("Replacing active hotspot");
            self.teardown().await;
        }

        if !self.transport.is_supported() {
            return Err(Error::UnsupportedPlatform(format!(
                "{} transport cannot host an access point",
                self.transport.name()
            )));
        }

        self.state.send_replace(HotspotState::CheckingPermissions);

        let attempt = tokio::time::timeout(self.create_timeout, async {
            self.transport.check_permissions().await?;
            self.transport.start_access_point(credentials).await
        })
        .await;

        match attempt {
            Ok(Ok(())) => {
                tracing::info!(ssid = %credentials.ssid, transport = self.transport.name(), "Hotspot active");
                self.state
                    .send_replace(HotspotState::Active(credentials.clone()));
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Hotspot creation failed");
                self.state.send_replace(HotspotState::Inactive);
                Err(e)
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.create_timeout, "Hotspot creation timed out");
                if let Err(e) = self.transport.stop_access_point().await {
                    tracing::debug!(error = %e, "Cleanup after timeout failed");
                }
                self.state.send_replace(HotspotState::Inactive);
                Err(Error::Timeout(self.create_timeout))
            }
        }
    }

    /// Tear down the access point.
    ///
    /// Safe to call when nothing is active. Always ends `Inactive`.
    pub async fn stop(&self) {
        let _guard = self.op_lock.lock().await;
        self.teardown().await;
    }

    async fn teardown(&self) {
        if matches!(*self.state.borrow(), HotspotState::Inactive) {
            return;
        }
        if let Err(e) = self.transport.stop_access_point().await {
            tracing::warn!(error = %e, "Hotspot teardown failed; marking inactive anyway");
        } else {
            tracing::info!("Hotspot stopped");
        }
        self.state.send_replace(HotspotState::Inactive);
    }
}

impl Drop for HotspotController {
    fn drop(&mut self) {
        let ssid = match &*self.state.borrow() {
            HotspotState::Active(credentials) => credentials.ssid.clone(),
            _ => return,
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let transport = Arc::clone(&self.transport);
                tracing::info!(ssid = %ssid, "Hotspot dropped while active; tearing down");
                handle.spawn(async move {
                    if let Err(e) = transport.stop_access_point().await {
                        tracing::warn!(ssid = %ssid, error = %e, "Hotspot teardown on drop failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(ssid = %ssid, "Hotspot dropped outside a runtime; access point left up");
            }
        }
    }
}
