//! Per-device session and the display-mode state machine.

use crate::client::BridgeClient;
use crate::device::Device;
use crate::discovery::BridgeController;
use crate::error::Result;
use crate::fields::{Field, FieldSet, FieldValue};
use crate::gif::GifPlayback;
use crate::modes::{DisplayMode, RenderingMode};
use crate::pipeline::Schedule;
use crate::snapshot::CanvasSnapshot;

use log::{debug, info, warn};
use std::time::Instant;

/// All state the bridge client keeps for one device.
///
/// Built once per device. Every host callback goes through `&mut self`, so
/// the field set, snapshot, playback state and schedule only change inside
/// a single handler invocation.
///
/// # Example
///
/// ```
/// use kraken_bridge::{BridgeClient, BridgeConfig, DisplayMode, Field, FieldValue, MockDevice, MockTransport, Session};
/// use std::sync::Arc;
///
/// let transport = Arc::new(MockTransport::new());
/// let client = BridgeClient::new(transport.clone(), BridgeConfig::default());
/// let mut session = Session::new(MockDevice::new(), client);
///
/// session.set_field(Field::DisplayMode, FieldValue::text("GIF"))?;
/// assert_eq!(session.display_mode(), DisplayMode::Gif);
/// assert!(!session.fields().is_exposed(Field::Composition));
/// # Ok::<(), kraken_bridge::BridgeError>(())
/// ```
#[derive(Debug)]
pub struct Session<D> {
    pub(crate) device: D,
    pub(crate) client: BridgeClient,
    pub(crate) fields: FieldSet,
    pub(crate) snapshot: CanvasSnapshot,
    pub(crate) playback: GifPlayback,
    pub(crate) schedule: Schedule,
}

impl<D: Device> Session<D> {
    /// Create a session with the host's initial field registration.
    pub fn new(device: D, client: BridgeClient) -> Self {
        Self::with_fields(device, client, FieldSet::with_defaults())
    }

    /// Create a session over fields the host has already populated.
    pub fn with_fields(device: D, client: BridgeClient, fields: FieldSet) -> Self {
        Self {
            device,
            client,
            fields,
            snapshot: CanvasSnapshot::default(),
            playback: GifPlayback::default(),
            schedule: Schedule::default(),
        }
    }

    /// The device this session drives.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the device.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// The currently exposed fields.
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Canvas values saved at the last switch to GIF mode.
    pub fn snapshot(&self) -> &CanvasSnapshot {
        &self.snapshot
    }

    /// The GIF configuration last sent to the bridge.
    pub fn playback(&self) -> &GifPlayback {
        &self.playback
    }

    /// Earliest instant another frame may be sent; `None` means now.
    pub fn next_call(&self) -> Option<Instant> {
        self.schedule.next_call()
    }

    /// Current display mode.
    pub fn display_mode(&self) -> DisplayMode {
        self.fields
            .text(Field::DisplayMode)
            .map(DisplayMode::from_value)
            .unwrap_or_default()
    }

    /// Live value if `field` is exposed, otherwise the saved snapshot value.
    ///
    /// Fields with neither fall back to their registration default.
    pub fn resolve(&self, field: Field) -> FieldValue {
        self.fields
            .get(field)
            .or_else(|| self.snapshot.value(field))
            .cloned()
            .unwrap_or_else(|| field.default_value())
    }

    /// Store a value written by the host and run its change handler.
    ///
    /// # Errors
    ///
    /// Fails without running any handler if the field is hidden or the value
    /// has the wrong kind.
    pub fn set_field(&mut self, field: Field, value: FieldValue) -> Result<()> {
        self.fields.set(field, value)?;
        self.on_field_changed(field);
        Ok(())
    }

    /// Run the change handler for `field`.
    pub fn on_field_changed(&mut self, field: Field) {
        match field {
            Field::DisplayMode => self.on_display_mode_changed(),
            Field::Fps => self.on_fps_changed(),
            Field::ScreenSize => self.on_screen_size_changed(),
            Field::Composition => self.on_composition_changed(),
            Field::TextOverlay => self.on_text_overlay_changed(),
            Field::GifPath => self.on_gif_path_changed(),
            Field::GifRotation => self.on_gif_rotation_changed(),
            Field::GifFitMode => self.on_gif_fit_mode_changed(),
            Field::GifZoom => self.on_gif_zoom_changed(),
            Field::GifOffsetX => self.on_gif_offset_x_changed(),
            Field::GifOffsetY => self.on_gif_offset_y_changed(),
            _ => {}
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Bring the device in line with `controller` and the current fields.
    pub fn initialize(&mut self, controller: &BridgeController) {
        info!("initializing {} ({})", controller.name, controller.id);

        self.device.set_name(&controller.name);
        self.on_screen_size_changed();
        self.on_composition_changed();
        self.on_display_mode_changed();

        if controller.rendering_mode == RenderingMode::Rgba {
            self.fields.hide(Field::ColorPalette);
        }

        match self.client.download_image(&controller.image) {
            Ok(image) => self.device.set_image(&image),
            Err(e) => warn!("Could not retrieve device image: {}", e),
        }

        self.on_brightness_changed();

        if !self.gif_path().is_empty() {
            let payload = self.gif_payload();
            self.client.configure_gif(&payload);
        }
    }

    /// Stop GIF playback on the bridge.
    pub fn shutdown(&mut self) {
        debug!("shutting down, stopping GIF playback");
        self.client.stop_gif();
    }

    // =========================================================================
    // Field Handlers
    // =========================================================================

    /// Resize the device bounds to the screen size plus a border pixel.
    pub fn on_screen_size_changed(&mut self) {
        let size = self.screen_size().saturating_add(1);
        self.device.set_size(size, size);
    }

    /// Push the device's brightness to the bridge.
    pub fn on_brightness_changed(&mut self) {
        self.client.set_brightness(self.device.brightness());
    }

    /// Apply the current display mode.
    ///
    /// Switching to GIF saves and hides the canvas fields, then starts
    /// playback if a path is set. Switching to canvas re-exposes the canvas
    /// fields, stops playback and forgets the last sent path.
    pub fn on_display_mode_changed(&mut self) {
        self.schedule.reset();

        match self.display_mode() {
            DisplayMode::Gif => {
                info!("switching to GIF mode");
                self.snapshot.capture(&self.fields);
                for field in Field::CANVAS_ROOTS {
                    self.fields.hide(field);
                }
                self.on_gif_path_changed();
            }
            DisplayMode::Canvas => {
                info!("switching to canvas mode");
                for field in Field::CANVAS_ROOTS {
                    self.expose(field);
                }
                self.on_composition_changed();
                self.client.stop_gif();
                self.playback.path.clear();
            }
        }
    }

    /// Show or hide the overlay fields for the current composition mode.
    pub fn on_composition_changed(&mut self) {
        let enabled = self
            .fields
            .text(Field::Composition)
            .is_some_and(|composition| composition != "OFF");

        for &field in Field::Composition.dependents() {
            if enabled {
                self.expose(field);
            } else {
                self.fields.hide(field);
            }
        }
        self.on_text_overlay_changed();
    }

    /// Show or hide the text fields for the current text overlay flag.
    pub fn on_text_overlay_changed(&mut self) {
        let enabled = self
            .fields
            .get(Field::TextOverlay)
            .and_then(FieldValue::as_flag)
            .unwrap_or(false);

        for &field in Field::TextOverlay.dependents() {
            if enabled {
                self.expose(field);
            } else {
                self.fields.hide(field);
            }
        }
    }

    fn expose(&mut self, field: Field) {
        let seed = self
            .snapshot
            .value(field)
            .cloned()
            .unwrap_or_else(|| field.default_value());
        if self.fields.expose(field, seed) {
            debug!("exposed {}", field);
        }
    }

    pub(crate) fn screen_size(&self) -> u32 {
        self.fields
            .number(Field::ScreenSize)
            .and_then(|size| u32::try_from(size).ok())
            .unwrap_or(40)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::mock::{MockDevice, MockTransport, Reply};
    use crate::modes::RenderingMode;
    use std::sync::Arc;
    use std::time::SystemTime;

    fn session() -> (Session<MockDevice>, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let client = BridgeClient::new(transport.clone(), BridgeConfig::default());
        (Session::new(MockDevice::new(), client), transport)
    }

    fn controller(rendering_mode: RenderingMode) -> BridgeController {
        BridgeController {
            id: "KRAKEN-01".to_string(),
            name: "Kraken Elite".to_string(),
            resolution: (640, 640),
            rendering_mode,
            image: "http://127.0.0.1:30003/images/2023elite.png".to_string(),
            online: true,
            last_update: SystemTime::now(),
            announced: false,
        }
    }

    fn text_fields_exposed(session: &Session<MockDevice>) -> bool {
        Field::TextOverlay
            .dependents()
            .iter()
            .any(|&field| session.fields().is_exposed(field))
    }

    #[test]
    fn test_screen_size_adds_border_pixel() {
        let (mut session, _) = session();
        session.set_field(Field::ScreenSize, FieldValue::Number(40)).unwrap();
        assert_eq!(session.device().size, (41, 41));

        session.set_field(Field::ScreenSize, FieldValue::Number(80)).unwrap();
        assert_eq!(session.device().size, (81, 81));
    }

    #[test]
    fn test_screen_size_saturates() {
        let (mut session, _) = session();
        session.set_field(Field::ScreenSize, FieldValue::Number(i64::from(u32::MAX))).unwrap();
        assert_eq!(session.device().size, (u32::MAX, u32::MAX));
    }

    #[test]
    fn test_composition_cascade() {
        let (mut session, _) = session();
        session.on_composition_changed();
        assert!(session.fields().is_exposed(Field::Spinner));
        assert!(session.fields().is_exposed(Field::TextOverlay));
        assert!(text_fields_exposed(&session));

        session.set_field(Field::TextOverlay, FieldValue::Flag(false)).unwrap();
        assert!(session.fields().is_exposed(Field::Spinner));
        assert!(!text_fields_exposed(&session));

        session.set_field(Field::TextOverlay, FieldValue::Flag(true)).unwrap();
        assert!(text_fields_exposed(&session));

        session.set_field(Field::Composition, FieldValue::text("OFF")).unwrap();
        assert!(!session.fields().is_exposed(Field::OverlayTransparency));
        assert!(!session.fields().is_exposed(Field::TextOverlay));
        assert!(!text_fields_exposed(&session));
    }

    #[test]
    fn test_composition_off_never_exposes_text_fields() {
        let (mut session, _) = session();
        session.on_composition_changed();
        session.set_field(Field::Composition, FieldValue::text("OFF")).unwrap();

        // the overlay flag is hidden, so even a direct handler call keeps its children hidden
        session.on_text_overlay_changed();
        assert!(!text_fields_exposed(&session));
        assert!(session.set_field(Field::TextOverlay, FieldValue::Flag(true)).is_err());
        assert!(!text_fields_exposed(&session));
    }

    #[test]
    fn test_canvas_gif_canvas_restores_values() {
        let (mut session, transport) = session();
        session.on_composition_changed();
        session.set_field(Field::Composition, FieldValue::text("MIX")).unwrap();
        session.set_field(Field::Spinner, FieldValue::text("PUMP")).unwrap();
        session.set_field(Field::TitleText, FieldValue::text("Loop")).unwrap();
        session.set_field(Field::SensorFontSize, FieldValue::Number(200)).unwrap();
        session.set_field(Field::ImageFormat, FieldValue::text("JPEG")).unwrap();

        let before: Vec<(Field, Option<FieldValue>)> = Field::CANVAS_ONLY
            .into_iter()
            .map(|field| (field, session.fields().get(field).cloned()))
            .collect();

        session.set_field(Field::DisplayMode, FieldValue::text("GIF")).unwrap();
        for field in Field::CANVAS_ONLY {
            assert!(!session.fields().is_exposed(field), "{field} still exposed");
        }
        assert_eq!(session.snapshot().value(Field::TitleText), Some(&FieldValue::text("Loop")));

        session.set_field(Field::DisplayMode, FieldValue::text("SignalRGB Canvas")).unwrap();
        let after: Vec<(Field, Option<FieldValue>)> = Field::CANVAS_ONLY
            .into_iter()
            .map(|field| (field, session.fields().get(field).cloned()))
            .collect();

        assert_eq!(before, after);
        assert_eq!(transport.count("/gif/stop"), 1);
    }

    #[test]
    fn test_gif_mode_resolves_from_snapshot() {
        let (mut session, _) = session();
        session.on_composition_changed();
        session.set_field(Field::Spinner, FieldValue::text("CPU")).unwrap();
        session.set_field(Field::DisplayMode, FieldValue::text("GIF")).unwrap();

        assert_eq!(session.fields().get(Field::Spinner), None);
        assert_eq!(session.resolve(Field::Spinner), FieldValue::text("CPU"));
        assert_eq!(session.resolve(Field::ScreenSize), FieldValue::Number(40));
    }

    #[test]
    fn test_return_to_canvas_clears_last_path() {
        let (mut session, transport) = session();
        session.set_field(Field::DisplayMode, FieldValue::text("GIF")).unwrap();
        session.set_field(Field::GifPath, FieldValue::text("/tmp/a.gif")).unwrap();
        assert_eq!(session.playback().path, "/tmp/a.gif");
        assert_eq!(transport.count("/gif"), 1);

        session.set_field(Field::DisplayMode, FieldValue::text("SignalRGB Canvas")).unwrap();
        assert!(session.playback().path.is_empty());

        session.set_field(Field::DisplayMode, FieldValue::text("GIF")).unwrap();
        assert_eq!(transport.count("/gif"), 2);
    }

    #[test]
    fn test_initialize_sequence() {
        let (mut session, transport) = session();
        transport.set_reply(Reply::status(200, b"png".to_vec()));
        session.device_mut().brightness = 60;

        session.initialize(&controller(RenderingMode::Rgb));

        let device = session.device();
        assert_eq!(device.name, "Kraken Elite");
        assert_eq!(device.size, (41, 41));
        assert_eq!(device.image.as_deref(), Some("cG5n"));
        assert!(session.fields().is_exposed(Field::ColorPalette));
        assert!(session.fields().is_exposed(Field::TitleText));
        assert_eq!(transport.count("/gif/stop"), 1);
        assert_eq!(transport.count("/gif/config"), 0);

        let brightness = transport.last("/brightness").unwrap();
        assert_eq!(brightness.request.body, Some(serde_json::json!({ "brightness": 60 })));
    }

    #[test]
    fn test_initialize_rgba_hides_palette_and_survives_missing_image() {
        let (mut session, transport) = session();
        transport.set_reply(Reply::status(404, Vec::new()));

        session.initialize(&controller(RenderingMode::Rgba));

        assert!(!session.fields().is_exposed(Field::ColorPalette));
        assert_eq!(session.device().image, None);
        assert_eq!(transport.count("/brightness"), 1);
    }

    #[test]
    fn test_shutdown_stops_gif() {
        let (mut session, transport) = session();
        session.shutdown();
        assert_eq!(transport.count("/gif/stop"), 1);
    }

    #[test]
    fn test_unknown_value_kind_runs_no_handler() {
        let (mut session, transport) = session();
        assert!(session.set_field(Field::DisplayMode, FieldValue::Flag(true)).is_err());
        assert!(transport.requests().is_empty());
    }
}
