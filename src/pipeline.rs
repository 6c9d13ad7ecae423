//! Frame capture and delivery.

use crate::device::Device;
use crate::encoding::encode_bytes;
use crate::fields::{Field, FieldValue};
use crate::modes::{FpsSetting, ImageFormat};
use crate::session::Session;

use log::trace;
use serde::Serialize;
use std::time::{Duration, Instant};

/// When the next frame may go out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Schedule {
    next_call: Option<Instant>,
}

impl Schedule {
    /// Allow the next tick to send immediately.
    pub fn reset(&mut self) {
        self.next_call = None;
    }

    /// Whether a frame may be sent at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.next_call.is_none_or(|next| now >= next)
    }

    /// Earliest send instant, or `None` if unthrottled.
    pub fn next_call(&self) -> Option<Instant> {
        self.next_call
    }

    /// Record a send at `now`. Settings without a numeric rate leave the
    /// schedule as it is.
    pub(crate) fn advance(&mut self, now: Instant, fps: FpsSetting, lead: Duration) {
        if let Some(interval) = fps.frame_interval(lead) {
            self.next_call = Some(now + interval);
        }
    }
}

/// Body of `POST /frame`.
///
/// Built fresh on every tick; canvas fields that are hidden carry their
/// saved snapshot value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FramePayload {
    /// Base64 pixel buffer.
    pub raw: String,
    /// Device rotation in degrees.
    pub rotation: i32,
    /// Palette for quantization.
    pub color_palette: FieldValue,
    /// Composition mode.
    pub composition: FieldValue,
    /// Overlay transparency.
    pub overlay_transparency: FieldValue,
    /// Spinner style.
    pub spinner: FieldValue,
    /// Text overlay flag.
    pub text_overlay: FieldValue,
    /// Overlay title.
    pub title_text: FieldValue,
    /// Title font size.
    pub title_font_size: FieldValue,
    /// Sensor value font size.
    pub sensor_font_size: FieldValue,
    /// Sensor label font size.
    pub sensor_label_font_size: FieldValue,
    /// Sensor shown by the overlay.
    pub sensor_source: FieldValue,
}

impl<D: Device> Session<D> {
    /// Handle one scheduling tick.
    ///
    /// Returns `false` without touching the device when the controller is
    /// offline or the frame interval has not elapsed. Otherwise captures,
    /// sends and returns `true`. A send that fails is dropped; the next tick
    /// carries the current state again.
    pub fn render(&mut self, online: bool, now: Instant) -> bool {
        if !online || !self.schedule.is_due(now) {
            return false;
        }

        let payload = self.build_frame();
        let fps = self.fps_setting();
        let lead = Duration::from_millis(self.client.config().frame_lead_ms);
        self.schedule.advance(now, fps, lead);

        trace!("tick: next call {:?}", self.schedule.next_call());
        self.client.send_frame(&payload, fps.dispatch());
        true
    }

    /// Capture the canvas and assemble the frame body.
    pub fn build_frame(&mut self) -> FramePayload {
        let size = self.screen_size();
        let format = self
            .resolve(Field::ImageFormat)
            .as_text()
            .map(ImageFormat::from_value)
            .unwrap_or_default();
        let buffer = self.device.capture(size, size, format);

        FramePayload {
            raw: encode_bytes(&buffer),
            rotation: self.device.rotation(),
            color_palette: self.resolve(Field::ColorPalette),
            composition: self.resolve(Field::Composition),
            overlay_transparency: self.resolve(Field::OverlayTransparency),
            spinner: self.resolve(Field::Spinner),
            text_overlay: self.resolve(Field::TextOverlay),
            title_text: self.resolve(Field::TitleText),
            title_font_size: self.resolve(Field::TitleFontSize),
            sensor_font_size: self.resolve(Field::SensorFontSize),
            sensor_label_font_size: self.resolve(Field::SensorLabelFontSize),
            sensor_source: self.resolve(Field::SensorSource),
        }
    }

    fn fps_setting(&self) -> FpsSetting {
        self.fields
            .text(Field::Fps)
            .map(FpsSetting::from_value)
            .unwrap_or(FpsSetting::HostLimited)
    }
}
