//! GIF playback change detection.
//!
//! The bridge plays GIFs on its own. The client only has to tell it when the
//! configuration changes, and must not restart playback for a path it has
//! already sent.

use crate::device::Device;
use crate::fields::Field;
use crate::modes::DisplayMode;
use crate::session::Session;

use log::info;
use serde::Serialize;

/// The GIF configuration last sent to the bridge.
///
/// Updated when a request is issued, not when it is answered, so a second
/// change in the same tick compares against what is already on its way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifPlayback {
    /// Path last sent; empty forces the next activation to send.
    pub path: String,
    /// Rotation last sent.
    pub rotation: String,
    /// Frame rate setting last sent.
    pub fps: String,
}

impl Default for GifPlayback {
    fn default() -> Self {
        Self {
            path: String::new(),
            rotation: "0".to_string(),
            fps: String::new(),
        }
    }
}

/// Body of `/gif` and `/gif/config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GifPayload {
    /// Path of the GIF on the bridge host.
    pub path: String,
    /// Rotation in degrees.
    pub rotation: i64,
    /// Raw frame rate setting.
    pub fps: String,
    /// `Fill`, `Fit` or `Stretch`.
    pub fit_mode: String,
    /// Zoom in percent.
    pub zoom: i64,
    /// Horizontal offset.
    pub offset_x: i64,
    /// Vertical offset.
    pub offset_y: i64,
}

impl<D: Device> Session<D> {
    /// Start playback if the path is set and differs from the last one sent.
    pub fn on_gif_path_changed(&mut self) {
        let path = self.gif_path().to_string();
        if path.is_empty() || path == self.playback.path {
            return;
        }

        info!("activating GIF {}", path);
        self.playback = GifPlayback {
            path,
            rotation: self.gif_rotation().to_string(),
            fps: self.fields.text(Field::Fps).unwrap_or_default().to_string(),
        };
        let payload = self.gif_payload();
        self.client.start_gif(&payload);
    }

    /// Resend when the rotation differs from the one last sent.
    pub fn on_gif_rotation_changed(&mut self) {
        if !self.gif_path().is_empty() && self.gif_rotation() != self.playback.rotation {
            self.playback.path.clear();
            self.on_gif_path_changed();
        }
    }

    /// Resend the current configuration.
    pub fn on_gif_fit_mode_changed(&mut self) {
        self.resend_gif_if_active();
    }

    /// Resend the current configuration.
    pub fn on_gif_zoom_changed(&mut self) {
        self.resend_gif_if_active();
    }

    /// Resend the current configuration.
    pub fn on_gif_offset_x_changed(&mut self) {
        self.resend_gif_if_active();
    }

    /// Resend the current configuration.
    pub fn on_gif_offset_y_changed(&mut self) {
        self.resend_gif_if_active();
    }

    /// Re-arm the frame schedule and, in GIF mode, resend playback.
    pub fn on_fps_changed(&mut self) {
        self.schedule.reset();
        if self.display_mode() == DisplayMode::Gif {
            self.playback.path.clear();
            self.on_gif_path_changed();
        }
    }

    // fit, zoom and offsets are not tracked, so any edit is pushed
    fn resend_gif_if_active(&mut self) {
        if self.display_mode() == DisplayMode::Gif && !self.playback.path.is_empty() {
            self.playback.path.clear();
            self.on_gif_path_changed();
        }
    }

    /// The configuration `/gif` would carry right now.
    pub fn gif_payload(&self) -> GifPayload {
        GifPayload {
            path: self.gif_path().to_string(),
            rotation: self.gif_rotation().trim().parse().unwrap_or(0),
            fps: self.fields.text(Field::Fps).unwrap_or_default().to_string(),
            fit_mode: self.fields.text(Field::GifFitMode).unwrap_or("Fill").to_string(),
            zoom: self.fields.number(Field::GifZoom).unwrap_or(100),
            offset_x: self.fields.number(Field::GifOffsetX).unwrap_or(0),
            offset_y: self.fields.number(Field::GifOffsetY).unwrap_or(0),
        }
    }

    pub(crate) fn gif_path(&self) -> &str {
        self.fields.text(Field::GifPath).unwrap_or_default()
    }

    fn gif_rotation(&self) -> &str {
        self.fields.text(Field::GifRotation).unwrap_or("0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BridgeClient;
    use crate::config::BridgeConfig;
    use crate::fields::FieldValue;
    use crate::mock::{MockDevice, MockTransport};
    use crate::transport::Dispatch;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Instant;

    fn gif_session() -> (Session<MockDevice>, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let client = BridgeClient::new(transport.clone(), BridgeConfig::default());
        let mut session = Session::new(MockDevice::new(), client);
        session.set_field(Field::DisplayMode, FieldValue::text("GIF")).unwrap();
        (session, transport)
    }

    #[test]
    fn test_same_path_is_not_resent() {
        let (mut session, transport) = gif_session();
        session.set_field(Field::GifPath, FieldValue::text("/gifs/p1.gif")).unwrap();
        assert_eq!(transport.count("/gif"), 1);

        session.set_field(Field::GifPath, FieldValue::text("/gifs/p1.gif")).unwrap();
        session.on_gif_path_changed();
        assert_eq!(transport.count("/gif"), 1);

        session.set_field(Field::GifPath, FieldValue::text("/gifs/p2.gif")).unwrap();
        assert_eq!(transport.count("/gif"), 2);
    }

    #[test]
    fn test_empty_path_sends_nothing() {
        let (mut session, transport) = gif_session();
        session.on_gif_path_changed();
        session.set_field(Field::GifZoom, FieldValue::Number(150)).unwrap();
        session.set_field(Field::GifRotation, FieldValue::text("90")).unwrap();
        assert_eq!(transport.count("/gif"), 0);
    }

    #[test]
    fn test_zoom_always_resends() {
        let (mut session, transport) = gif_session();
        session.set_field(Field::GifPath, FieldValue::text("/gifs/p1.gif")).unwrap();

        session.set_field(Field::GifZoom, FieldValue::Number(100)).unwrap();
        session.set_field(Field::GifZoom, FieldValue::Number(100)).unwrap();
        assert_eq!(transport.count("/gif"), 3);

        session.set_field(Field::GifFitMode, FieldValue::text("Fit")).unwrap();
        session.set_field(Field::GifOffsetX, FieldValue::Number(-5)).unwrap();
        session.set_field(Field::GifOffsetY, FieldValue::Number(7)).unwrap();
        assert_eq!(transport.count("/gif"), 6);

        let last = transport.last("/gif").unwrap();
        assert_eq!(last.dispatch, Dispatch::Blocking);
        assert_eq!(
            last.request.body,
            Some(json!({
                "path": "/gifs/p1.gif",
                "rotation": 0,
                "fps": "SIGNALRGB LIMITED",
                "fitMode": "Fit",
                "zoom": 100,
                "offsetX": -5,
                "offsetY": 7,
            }))
        );
    }

    #[test]
    fn test_fit_changes_ignored_in_canvas_mode() {
        let transport = Arc::new(MockTransport::new());
        let client = BridgeClient::new(transport.clone(), BridgeConfig::default());
        let mut session = Session::new(MockDevice::new(), client);

        session.set_field(Field::GifZoom, FieldValue::Number(200)).unwrap();
        session.set_field(Field::GifFitMode, FieldValue::text("Stretch")).unwrap();
        assert_eq!(transport.count("/gif"), 0);
    }

    #[test]
    fn test_rotation_resends_only_when_different() {
        let (mut session, transport) = gif_session();
        session.set_field(Field::GifPath, FieldValue::text("/gifs/p1.gif")).unwrap();

        session.set_field(Field::GifRotation, FieldValue::text("0")).unwrap();
        assert_eq!(transport.count("/gif"), 1);

        session.set_field(Field::GifRotation, FieldValue::text("180")).unwrap();
        assert_eq!(transport.count("/gif"), 2);
        assert_eq!(session.playback().rotation, "180");

        let body = transport.last("/gif").unwrap().request.body.unwrap();
        assert_eq!(body["rotation"], json!(180));
    }

    #[test]
    fn test_playback_updated_before_send() {
        let (mut session, _) = gif_session();
        session.set_field(Field::Fps, FieldValue::text("10")).unwrap();
        session.set_field(Field::GifRotation, FieldValue::text("270")).unwrap();
        session.set_field(Field::GifPath, FieldValue::text("/gifs/p1.gif")).unwrap();

        assert_eq!(
            session.playback(),
            &GifPlayback {
                path: "/gifs/p1.gif".to_string(),
                rotation: "270".to_string(),
                fps: "10".to_string(),
            }
        );
    }

    #[test]
    fn test_fps_change_resets_schedule_and_resends() {
        let (mut session, transport) = gif_session();
        session.set_field(Field::GifPath, FieldValue::text("/gifs/p1.gif")).unwrap();
        session.schedule.advance(Instant::now(), crate::modes::FpsSetting::Fixed(1.0), std::time::Duration::ZERO);
        assert!(session.next_call().is_some());

        session.set_field(Field::Fps, FieldValue::text("20")).unwrap();
        assert_eq!(session.next_call(), None);
        assert_eq!(transport.count("/gif"), 2);
        assert_eq!(transport.last("/gif").unwrap().request.body.unwrap()["fps"], json!("20"));
    }

    #[test]
    fn test_fps_change_in_canvas_mode_only_resets() {
        let transport = Arc::new(MockTransport::new());
        let client = BridgeClient::new(transport.clone(), BridgeConfig::default());
        let mut session = Session::new(MockDevice::new(), client);
        session.set_field(Field::GifPath, FieldValue::text("/gifs/p1.gif")).unwrap();
        transport.clear();

        session.set_field(Field::Fps, FieldValue::text("5")).unwrap();
        assert_eq!(transport.count("/gif"), 0);
    }
}
