//! Client for the Kraken LCD rendering bridge.
//!
//! This crate mirrors a virtual lighting device onto an NZXT Kraken LCD by way
//! of a small local HTTP service (the bridge). It keeps three things
//! consistent while the user edits settings:
//!
//! - which configuration fields the host shows, and the canvas values saved
//!   while they are hidden
//! - the GIF configuration the bridge is playing
//! - the cadence at which captured frames are pushed
//!
//! A separate [`DiscoveryService`] polls the bridge and keeps the host's
//! controller registry up to date.
//!
//! # Example
//!
//! ```no_run
//! use kraken_bridge::{BridgeClient, BridgeConfig, DiscoveryService, HttpTransport, MockDevice, MockRegistry, Session};
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! fn main() -> Result<(), kraken_bridge::BridgeError> {
//!     let config = BridgeConfig::from_env()?;
//!     let transport = Arc::new(HttpTransport::from_config(&config)?);
//!     let client = BridgeClient::new(transport, config);
//!
//!     let mut discovery = DiscoveryService::new(client.clone(), Arc::new(MockRegistry::new()));
//!     discovery.initialize();
//!     discovery.update(Instant::now());
//!
//!     let mut session = Session::new(MockDevice::new(), client);
//!     if let Some(controller) = discovery.controller() {
//!         session.initialize(&controller);
//!     }
//!
//!     // once per host frame
//!     session.render(discovery.is_online(), Instant::now());
//!
//!     session.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! [`MockTransport`], [`MockDevice`] and [`MockRegistry`] stand in for the
//! bridge and the host:
//!
//! ```
//! use kraken_bridge::{BridgeClient, BridgeConfig, Field, FieldValue, MockDevice, MockTransport, Session};
//! use std::sync::Arc;
//!
//! let transport = Arc::new(MockTransport::new());
//! let client = BridgeClient::new(transport.clone(), BridgeConfig::default());
//! let mut session = Session::new(MockDevice::new(), client);
//!
//! session.set_field(Field::ScreenSize, FieldValue::Number(40)).unwrap();
//! assert_eq!(session.device().size, (41, 41));
//! ```

#![warn(missing_docs)]

mod client;
mod config;
mod device;
mod discovery;
mod error;
mod fields;
mod gif;
mod mock;
mod modes;
mod pipeline;
mod session;
mod snapshot;
mod transport;

pub mod encoding;

// Re-export public API
pub use client::BridgeClient;
pub use config::{BridgeConfig, DEFAULT_BRIDGE_URL};
pub use device::Device;
pub use discovery::{BridgeController, BridgeInfo, ControllerRegistry, DiscoveryService};
pub use error::{BridgeError, Result};
pub use fields::{Field, FieldSet, FieldValue};
pub use gif::{GifPayload, GifPlayback};
pub use mock::{MockDevice, MockRegistry, MockTransport, RecordedRequest, RegistryEvent, Reply};
pub use modes::{DisplayMode, FpsSetting, ImageFormat, RenderingMode};
pub use pipeline::{FramePayload, Schedule};
pub use session::Session;
pub use snapshot::CanvasSnapshot;
pub use transport::{
    Dispatch, HttpTransport, Method, Outcome, PendingRequest, Request, Response, ResultHandler, Transport, ignore,
};

/// Name the device is published under.
pub const PLUGIN_NAME: &str = "Kraken LCD Bridge";
/// Plugin version reported to the host.
pub const PLUGIN_VERSION: &str = "0.0.2";
/// Plugin publisher.
pub const PLUGIN_PUBLISHER: &str = "Brokenmass";
/// Initial size of the device on the canvas.
pub const DEFAULT_SIZE: (u32, u32) = (6, 6);
/// Initial position of the device on the canvas.
pub const DEFAULT_POSITION: (u32, u32) = (165, 60);
/// Initial scale of the device on the canvas.
pub const DEFAULT_SCALE: f32 = 1.0;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    const INFO: &str = r#"{"serial":"KRAKEN-01","name":"NZXT Kraken Z3","resolution":[320,320],"renderingMode":"RGB","image":"http://127.0.0.1:30003/images/z3.png"}"#;

    fn host() -> (Arc<MockTransport>, Arc<MockRegistry>, BridgeClient) {
        let transport = Arc::new(MockTransport::new());
        let registry = Arc::new(MockRegistry::new());
        let client = BridgeClient::new(transport.clone(), BridgeConfig::default());
        (transport, registry, client)
    }

    #[test]
    fn test_discover_initialize_render() {
        let (transport, registry, client) = host();
        transport.set_reply(Reply::status(200, INFO.as_bytes().to_vec()));

        let mut discovery = DiscoveryService::new(client.clone(), registry.clone());
        discovery.initialize();
        discovery.update(Instant::now());
        transport.flush();
        let controller = discovery.controller().unwrap();

        let mut session = Session::new(MockDevice::new(), client);
        session.initialize(&controller);
        assert_eq!(session.device().name, "NZXT Kraken Z3");

        session.set_field(Field::Fps, FieldValue::text("20")).unwrap();
        let now = Instant::now();
        assert!(session.render(discovery.is_online(), now));
        assert_eq!(session.next_call(), Some(now + Duration::from_millis(35)));
        assert_eq!(transport.count("/frame"), 1);
        assert_eq!(registry.announcements(), 1);
    }

    #[test]
    fn test_startup_with_gif_path_configures_bridge() {
        let (transport, _, client) = host();
        let mut fields = FieldSet::with_defaults();
        fields.set(Field::GifPath, FieldValue::text("C:/gifs/loop.gif")).unwrap();
        fields.set(Field::GifZoom, FieldValue::Number(150)).unwrap();

        let info: BridgeInfo = serde_json::from_str(INFO).unwrap();
        let mut session = Session::with_fields(MockDevice::new(), client, fields);
        session.initialize(&BridgeController::from_info(&info));

        let config = transport.sent_to("/gif/config");
        assert_eq!(config.len(), 1);
        assert_eq!(config[0].dispatch, Dispatch::Background);
        let body = config[0].request.body.as_ref().unwrap();
        assert_eq!(body["path"], "C:/gifs/loop.gif");
        assert_eq!(body["zoom"], 150);
    }

    #[test]
    fn test_offline_bridge_stops_frames() {
        let (transport, registry, client) = host();
        transport.set_reply(Reply::status(200, INFO.as_bytes().to_vec()));
        let mut discovery = DiscoveryService::new(client.clone(), registry);
        let start = Instant::now();
        discovery.update(start);
        transport.flush();

        transport.set_reply(Reply::Fail);
        discovery.update(start + Duration::from_secs(2));
        transport.flush();

        let mut session = Session::new(MockDevice::new(), client);
        assert!(!session.render(discovery.is_online(), start));
        assert!(discovery.controller().is_some());
    }

    #[test]
    fn test_gif_round_trip_through_modes() {
        let (transport, _, client) = host();
        let mut session = Session::new(MockDevice::new(), client);
        session.on_composition_changed();

        session.set_field(Field::GifPath, FieldValue::text("/gifs/a.gif")).unwrap();
        transport.clear();

        session.set_field(Field::DisplayMode, FieldValue::text("GIF")).unwrap();
        session.set_field(Field::GifPath, FieldValue::text("/gifs/a.gif")).unwrap();
        assert_eq!(transport.count("/gif"), 0);

        session.set_field(Field::GifZoom, FieldValue::Number(120)).unwrap();
        assert_eq!(transport.count("/gif"), 1);

        session.set_field(Field::DisplayMode, FieldValue::text("SignalRGB Canvas")).unwrap();
        assert_eq!(transport.count("/gif/stop"), 1);
        assert!(session.fields().is_exposed(Field::SensorSource));
    }
}
