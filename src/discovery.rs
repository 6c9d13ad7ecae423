//! Bridge discovery and controller lifecycle.

use crate::client::BridgeClient;
use crate::error::Result;
use crate::modes::RenderingMode;
use crate::transport::{Outcome, PendingRequest};

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

// =============================================================================
// Probe Response
// =============================================================================

/// Device information returned by `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeInfo {
    /// Serial number; becomes the controller id.
    pub serial: String,
    /// Display name.
    pub name: String,
    /// Panel resolution as `[width, height]`.
    #[serde(default)]
    pub resolution: (u32, u32),
    /// Pixel model of the panel.
    #[serde(default)]
    pub rendering_mode: RenderingMode,
    /// URL of the device image.
    #[serde(default)]
    pub image: String,
    /// Whether the bridge is currently playing a GIF.
    #[serde(default)]
    pub gif_mode: bool,
    /// Path of the GIF the bridge has active.
    #[serde(default)]
    pub gif_path: String,
    /// Whether the GIF player thread is alive.
    #[serde(default)]
    pub gif_running: bool,
}

// =============================================================================
// Controller
// =============================================================================

/// Host registry that tracks controllers.
///
/// Callbacks run without any discovery lock held, so an implementation may
/// query the [`DiscoveryService`] from inside them.
pub trait ControllerRegistry: Send + Sync {
    /// Register a newly discovered controller.
    fn add_controller(&self, controller: &BridgeController);

    /// Push a controller's current status.
    fn update_controller(&self, controller: &BridgeController);

    /// Announce a controller so the host creates a device for it.
    fn announce_controller(&self, controller: &BridgeController);
}

/// One bridge device as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeController {
    /// Device serial.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Panel resolution.
    pub resolution: (u32, u32),
    /// Pixel model of the panel.
    pub rendering_mode: RenderingMode,
    /// URL of the device image.
    pub image: String,
    /// Whether the bridge answered the last probe.
    pub online: bool,
    /// When the controller was last seen online.
    pub last_update: SystemTime,
    /// Whether the host has been told about this controller.
    pub announced: bool,
}

impl BridgeController {
    /// Build a controller from a probe response. It starts online.
    pub fn from_info(info: &BridgeInfo) -> Self {
        Self {
            id: info.serial.clone(),
            name: info.name.clone(),
            resolution: info.resolution,
            rendering_mode: info.rendering_mode,
            image: info.image.clone(),
            online: true,
            last_update: SystemTime::now(),
            announced: false,
        }
    }

    /// Set the online flag, refreshing `last_update` when online.
    pub fn set_online(&mut self, online: bool) {
        if online {
            self.last_update = SystemTime::now();
        }
        if self.online != online {
            info!("{} is now {}", self.id, if online { "online" } else { "offline" });
        }
        self.online = online;
    }

    /// Mark the controller announced. Returns `true` only the first time.
    pub fn take_announcement(&mut self) -> bool {
        !std::mem::replace(&mut self.announced, true)
    }
}

// =============================================================================
// Probe Handling
// =============================================================================

/// Registry calls owed after a probe, collected while the state is locked.
struct StatusUpdate {
    controller: BridgeController,
    added: bool,
    announce: bool,
}

impl StatusUpdate {
    fn publish(&self, registry: &dyn ControllerRegistry) {
        if self.added {
            registry.add_controller(&self.controller);
        }
        registry.update_controller(&self.controller);
        if self.announce {
            registry.announce_controller(&self.controller);
        }
    }
}

// =============================================================================
// DiscoveryService
// =============================================================================

#[derive(Debug, Default)]
struct DiscoveryState {
    info: Option<BridgeInfo>,
    controller: Option<BridgeController>,
}

/// Polls the bridge and keeps the controller registry in sync.
///
/// Probes run in the background; their results land in shared state, so
/// [`controller`](Self::controller) reflects the most recent answer that has
/// arrived.
pub struct DiscoveryService {
    client: BridgeClient,
    registry: Arc<dyn ControllerRegistry>,
    last_update: Option<Instant>,
    state: Arc<Mutex<DiscoveryState>>,
}

impl DiscoveryService {
    /// Create a service that reports to `registry`.
    pub fn new(client: BridgeClient, registry: Arc<dyn ControllerRegistry>) -> Self {
        Self {
            client,
            registry,
            last_update: None,
            state: Arc::new(Mutex::new(DiscoveryState::default())),
        }
    }

    /// Reset the poll clock so the next update probes immediately.
    pub fn initialize(&mut self) {
        info!("Initializing Plugin!");
        self.last_update = None;
    }

    /// Probe the bridge if the poll interval has elapsed since the last probe.
    ///
    /// Returns the pending probe, or `None` if it was not time yet.
    pub fn update(&mut self, now: Instant) -> Option<PendingRequest> {
        let interval = self.client.config().discovery_interval();
        if self.last_update.is_some_and(|last| now.duration_since(last) < interval) {
            return None;
        }
        self.last_update = Some(now);

        let state = Arc::clone(&self.state);
        let registry = Arc::clone(&self.registry);
        Some(self.client.probe(Box::new(move |outcome| {
            read_info(&state, registry.as_ref(), outcome);
        })))
    }

    /// The controller for this bridge, if one has been discovered.
    pub fn controller(&self) -> Option<BridgeController> {
        self.state.lock().controller.clone()
    }

    /// The last device information the bridge reported.
    pub fn info(&self) -> Option<BridgeInfo> {
        self.state.lock().info.clone()
    }

    /// Whether a controller exists and is online.
    pub fn is_online(&self) -> bool {
        self.state.lock().controller.as_ref().is_some_and(|controller| controller.online)
    }

    /// Icon shown for the discovery service.
    pub fn icon_url(&self) -> String {
        self.client.icon_url()
    }
}

impl BridgeInfo {
    /// Parse a probe response body.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Json`](crate::BridgeError::Json) if the body is not a device description.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}

fn read_info(state: &Mutex<DiscoveryState>, registry: &dyn ControllerRegistry, outcome: Outcome) {
    let info = outcome.ok_body().and_then(|body| match BridgeInfo::from_body(body) {
        Ok(info) => Some(info),
        Err(e) => {
            warn!("unreadable device info: {}", e);
            None
        }
    });

    // Registry callbacks may read the service, so they run after the lock is released.
    let update = apply_info(&mut state.lock(), info);
    if let Some(update) = update {
        update.publish(registry);
    }
}

fn apply_info(state: &mut DiscoveryState, info: Option<BridgeInfo>) -> Option<StatusUpdate> {
    let online = info.is_some();
    let mut added = false;

    if let Some(info) = info {
        if state.controller.is_none() {
            debug!("discovered {} ({})", info.name, info.serial);
            state.controller = Some(BridgeController::from_info(&info));
            added = true;
        }
        debug!(
            "bridge gif state: mode {}, running {}, path {:?}",
            info.gif_mode, info.gif_running, info.gif_path
        );
        state.info = Some(info);
    }

    let controller = state.controller.as_mut()?;
    controller.set_online(online);
    let announce = controller.take_announcement();
    Some(StatusUpdate {
        controller: controller.clone(),
        added,
        announce,
    })
}
