//! In-memory transport.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{HotspotCredentials, NearbyTransport};
use crate::error::{Error, Result};

/// A transport that records calls instead of touching a radio.
///
/// Peers on a simulated access point reach each other over loopback, so
/// the gateway address is `127.0.0.1`. Builder methods inject the failure
/// modes a real platform can produce.
#[derive(Debug, Default)]
pub struct SimulatedTransport {
    unsupported: bool,
    deny_permissions: bool,
    fail_start: Option<String>,
    fail_stop: bool,
    fail_join: bool,
    start_delay: Option<Duration>,
    active: Mutex<Option<HotspotCredentials>>,
    joined: Mutex<Vec<String>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl SimulatedTransport {
    /// A transport where everything succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the platform as unable to host.
    #[must_use]
    pub fn unsupported(mut self) -> Self {
        self.unsupported = true;
        self
    }

    /// Refuse the permission check.
    #[must_use]
    pub fn deny_permissions(mut self) -> Self {
        self.deny_permissions = true;
        self
    }

    /// Fail every start with the given message.
    #[must_use]
    pub fn fail_start(mut self, message: impl Into<String>) -> Self {
        self.fail_start = Some(message.into());
        self
    }

    /// Fail every teardown.
    #[must_use]
    pub fn fail_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Fail every join.
    #[must_use]
    pub fn fail_join(mut self) -> Self {
        self.fail_join = true;
        self
    }

    /// Delay each start, to exercise timeouts.
    #[must_use]
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    /// SSID currently broadcast, if any.
    pub fn active_ssid(&self) -> Option<String> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.ssid.clone())
    }

    /// SSIDs joined so far, oldest first.
    pub fn joined_networks(&self) -> Vec<String> {
        self.joined
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful starts.
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of teardown calls.
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NearbyTransport for SimulatedTransport {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn is_supported(&self) -> bool {
        !self.unsupported
    }

    async fn check_permissions(&self) -> Result<()> {
        if self.deny_permissions {
            return Err(Error::PermissionDenied(
                "simulated permission refusal".to_string(),
            ));
        }
        Ok(())
    }

    async fn start_access_point(&self, credentials: &HotspotCredentials) -> Result<()> {
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.fail_start {
            return Err(Error::Hotspot(message.clone()));
        }
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(credentials.clone());
        self.starts.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(ssid = %credentials.ssid, "Simulated access point up");
        Ok(())
    }

    async fn stop_access_point(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = None;
        if self.fail_stop {
            return Err(Error::Hotspot("simulated teardown failure".to_string()));
        }
        Ok(())
    }

    async fn join_access_point(&self, credentials: &HotspotCredentials) -> Result<()> {
        if self.fail_join {
            return Err(Error::Hotspot(format!(
                "could not join '{}'",
                credentials.ssid
            )));
        }
        self.joined
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(credentials.ssid.clone());
        Ok(())
    }

    fn gateway_address(&self) -> Option<IpAddr> {
        Some(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }
}
