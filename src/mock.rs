//! Mock collaborators for testing.

use crate::device::Device;
use crate::discovery::{BridgeController, ControllerRegistry};
use crate::modes::ImageFormat;
use crate::transport::{Dispatch, Outcome, PendingRequest, Request, Response, ResultHandler, Transport};
use parking_lot::Mutex;

// =============================================================================
// MockTransport
// =============================================================================

/// How the mock bridge answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Answer with this status and body.
    Status(u16, Vec<u8>),
    /// Behave as if the request timed out.
    Fail,
}

impl Reply {
    /// Shorthand for [`Reply::Status`].
    pub fn status(status: u16, body: Vec<u8>) -> Self {
        Reply::Status(status, body)
    }

    fn outcome(&self) -> Outcome {
        match self {
            Reply::Status(status, body) => Outcome::Response(Response {
                status: *status,
                body: body.clone(),
            }),
            Reply::Fail => Outcome::Failed("mock transport failure".to_string()),
        }
    }
}

/// A request the mock transport received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// The request as issued.
    pub request: Request,
    /// How it was dispatched.
    pub dispatch: Dispatch,
}

impl RecordedRequest {
    /// Path component of the request URL, e.g. `/gif/stop`.
    pub fn path(&self) -> &str {
        path_of(&self.request.url)
    }
}

struct Queued {
    on_result: ResultHandler,
    outcome: Outcome,
    pending: PendingRequest,
}

/// A [`Transport`] that records requests instead of sending them.
///
/// Blocking requests are answered immediately. Background requests are
/// queued until [`MockTransport::flush`], so tests control when their
/// handlers run.
///
/// # Example
///
/// ```
/// use kraken_bridge::{BridgeClient, BridgeConfig, MockTransport};
/// use std::sync::Arc;
///
/// let transport = Arc::new(MockTransport::new());
/// let client = BridgeClient::new(transport.clone(), BridgeConfig::default());
/// client.set_brightness(50);
/// assert_eq!(transport.count("/brightness"), 1);
/// ```
pub struct MockTransport {
    reply: Mutex<Reply>,
    requests: Mutex<Vec<RecordedRequest>>,
    queued: Mutex<Vec<Queued>>,
}

impl MockTransport {
    /// A transport that answers every request with an empty 200.
    pub fn new() -> Self {
        Self {
            reply: Mutex::new(Reply::Status(200, Vec::new())),
            requests: Mutex::new(Vec::new()),
            queued: Mutex::new(Vec::new()),
        }
    }

    /// Change the answer for subsequent requests.
    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock() = reply;
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Requests sent to `path`.
    pub fn sent_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|recorded| recorded.path() == path)
            .cloned()
            .collect()
    }

    /// Number of requests sent to `path`.
    pub fn count(&self, path: &str) -> usize {
        self.sent_to(path).len()
    }

    /// The most recent request sent to `path`.
    pub fn last(&self, path: &str) -> Option<RecordedRequest> {
        self.sent_to(path).pop()
    }

    /// Forget recorded requests.
    pub fn clear(&self) {
        self.requests.lock().clear();
    }

    /// Deliver every queued background outcome, in issue order.
    pub fn flush(&self) {
        let queued: Vec<Queued> = std::mem::take(&mut *self.queued.lock());
        for item in queued {
            (item.on_result)(item.outcome);
            item.pending.finish();
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: Request, dispatch: Dispatch, on_result: ResultHandler) -> PendingRequest {
        let outcome = self.reply.lock().outcome();
        self.requests.lock().push(RecordedRequest { request, dispatch });

        match dispatch {
            Dispatch::Blocking => {
                on_result(outcome);
                PendingRequest::completed()
            }
            Dispatch::Background => {
                let pending = PendingRequest::in_flight();
                self.queued.lock().push(Queued {
                    on_result,
                    outcome,
                    pending: pending.clone(),
                });
                pending
            }
        }
    }
}

fn path_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    match rest.find('/') {
        Some(index) => &rest[index..],
        None => "/",
    }
}

// =============================================================================
// MockDevice
// =============================================================================

/// A [`Device`] that records what the session asked of it.
#[derive(Debug, Clone)]
pub struct MockDevice {
    /// Visible bounds last set.
    pub size: (u32, u32),
    /// Name last set.
    pub name: String,
    /// Image last set.
    pub image: Option<String>,
    /// Brightness reported to the session.
    pub brightness: u8,
    /// Rotation reported to the session.
    pub rotation: i32,
    /// Every capture request, in order.
    pub captures: Vec<(u32, u32, ImageFormat)>,
}

impl MockDevice {
    /// A device at full brightness with no rotation.
    pub fn new() -> Self {
        Self {
            size: (0, 0),
            name: String::new(),
            image: None,
            brightness: 100,
            rotation: 0,
            captures: Vec::new(),
        }
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for MockDevice {
    fn capture(&mut self, width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        self.captures.push((width, height, format));
        (0..width * height * 3).map(|i| (i % 256) as u8).collect()
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }

    fn rotation(&self) -> i32 {
        self.rotation
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn set_image(&mut self, encoded: &str) {
        self.image = Some(encoded.to_string());
    }
}

// =============================================================================
// MockRegistry
// =============================================================================

/// Something the discovery service told the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A controller was registered.
    Added(String),
    /// A controller's status was pushed.
    Updated {
        /// Controller id.
        id: String,
        /// Online flag at the time of the update.
        online: bool,
    },
    /// A controller was announced.
    Announced(String),
}

/// A [`ControllerRegistry`] that records events.
#[derive(Debug, Default)]
pub struct MockRegistry {
    events: Mutex<Vec<RegistryEvent>>,
}

impl MockRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event so far.
    pub fn events(&self) -> Vec<RegistryEvent> {
        self.events.lock().clone()
    }

    /// Number of announcements so far.
    pub fn announcements(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, RegistryEvent::Announced(_)))
            .count()
    }
}

impl ControllerRegistry for MockRegistry {
    fn add_controller(&self, controller: &BridgeController) {
        self.events.lock().push(RegistryEvent::Added(controller.id.clone()));
    }

    fn update_controller(&self, controller: &BridgeController) {
        self.events.lock().push(RegistryEvent::Updated {
            id: controller.id.clone(),
            online: controller.online,
        });
    }

    fn announce_controller(&self, controller: &BridgeController) {
        self.events.lock().push(RegistryEvent::Announced(controller.id.clone()));
    }
}
