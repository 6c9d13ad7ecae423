//! Typed views over the combobox settings the state machine branches on.

use crate::transport::Dispatch;
use serde::Deserialize;
use std::time::Duration;

// =============================================================================
// Display Mode
// =============================================================================

/// What the panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Frames captured from the host canvas.
    #[default]
    Canvas,
    /// A GIF played by the bridge itself.
    Gif,
}

impl DisplayMode {
    /// Parse the host's combobox value. Anything but `GIF` is canvas mode.
    pub fn from_value(value: &str) -> Self {
        if value == "GIF" {
            DisplayMode::Gif
        } else {
            DisplayMode::Canvas
        }
    }

    /// Combobox label for this mode.
    pub fn label(self) -> &'static str {
        match self {
            DisplayMode::Canvas => "SignalRGB Canvas",
            DisplayMode::Gif => "GIF",
        }
    }
}

// =============================================================================
// Frame Rate
// =============================================================================

/// The frame rate setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FpsSetting {
    /// Send as fast as the host ticks, without waiting for the bridge.
    Maximum,
    /// Leave pacing to the host.
    HostLimited,
    /// Throttle to this many frames per second.
    Fixed(f64),
}

impl FpsSetting {
    /// Parse the host's combobox value.
    ///
    /// Values that are not a positive number fall back to host pacing.
    pub fn from_value(value: &str) -> Self {
        if value == "MAXIMUM" {
            return FpsSetting::Maximum;
        }
        match value.trim().parse::<f64>() {
            Ok(fps) if fps.is_finite() && fps > 0.0 => FpsSetting::Fixed(fps),
            _ => FpsSetting::HostLimited,
        }
    }

    /// How frame sends are dispatched under this setting.
    pub fn dispatch(self) -> Dispatch {
        match self {
            FpsSetting::Maximum => Dispatch::Background,
            _ => Dispatch::Blocking,
        }
    }

    /// Time to wait after a send, shortened by `lead`. `None` means unthrottled.
    pub fn frame_interval(self, lead: Duration) -> Option<Duration> {
        match self {
            FpsSetting::Fixed(fps) => {
                let millis = 1000.0 / fps - lead.as_secs_f64() * 1000.0;
                let nanos = (millis * 1_000_000.0).round().max(0.0);
                Some(Duration::from_nanos(nanos as u64))
            }
            _ => None,
        }
    }
}

// =============================================================================
// Image Format
// =============================================================================

/// Encoding the host uses for captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// Lossless PNG.
    #[default]
    Png,
    /// JPEG.
    Jpeg,
}

impl ImageFormat {
    /// Parse the host's combobox value, defaulting to PNG.
    pub fn from_value(value: &str) -> Self {
        match value {
            "JPEG" => ImageFormat::Jpeg,
            _ => ImageFormat::Png,
        }
    }
}

// =============================================================================
// Rendering Mode
// =============================================================================

/// Pixel model the LCD reports through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RenderingMode {
    /// Alpha-capable panel; palette quantization does not apply.
    Rgba,
    /// Opaque color per pixel. Unrecognized modes fall back to this.
    #[default]
    #[serde(other)]
    Rgb,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mode_parse() {
        assert_eq!(DisplayMode::from_value("GIF"), DisplayMode::Gif);
        assert_eq!(DisplayMode::from_value("SignalRGB Canvas"), DisplayMode::Canvas);
        assert_eq!(DisplayMode::from_value(""), DisplayMode::Canvas);
        assert_eq!(DisplayMode::from_value(DisplayMode::Gif.label()), DisplayMode::Gif);
    }

    #[test]
    fn test_fps_parse() {
        assert_eq!(FpsSetting::from_value("MAXIMUM"), FpsSetting::Maximum);
        assert_eq!(FpsSetting::from_value("SIGNALRGB LIMITED"), FpsSetting::HostLimited);
        assert_eq!(FpsSetting::from_value("0"), FpsSetting::HostLimited);
        assert_eq!(FpsSetting::from_value("20"), FpsSetting::Fixed(20.0));
        assert_eq!(FpsSetting::from_value("0.1"), FpsSetting::Fixed(0.1));
    }

    #[test]
    fn test_fps_dispatch() {
        assert_eq!(FpsSetting::Maximum.dispatch(), Dispatch::Background);
        assert_eq!(FpsSetting::HostLimited.dispatch(), Dispatch::Blocking);
        assert_eq!(FpsSetting::Fixed(5.0).dispatch(), Dispatch::Blocking);
    }

    #[test]
    fn test_frame_interval() {
        let lead = Duration::from_millis(15);
        assert_eq!(FpsSetting::Fixed(5.0).frame_interval(lead), Some(Duration::from_millis(185)));
        assert_eq!(FpsSetting::Fixed(0.1).frame_interval(lead), Some(Duration::from_millis(9985)));
        assert_eq!(FpsSetting::Fixed(1000.0).frame_interval(lead), Some(Duration::ZERO));
        assert_eq!(FpsSetting::Maximum.frame_interval(lead), None);
        assert_eq!(FpsSetting::HostLimited.frame_interval(lead), None);
    }

    #[test]
    fn test_rendering_mode_deserialize() {
        let mode: RenderingMode = serde_json::from_str(r#""RGBA""#).unwrap();
        assert_eq!(mode, RenderingMode::Rgba);
        let mode: RenderingMode = serde_json::from_str(r#""RGB""#).unwrap();
        assert_eq!(mode, RenderingMode::Rgb);
        let mode: RenderingMode = serde_json::from_str(r#""BGR""#).unwrap();
        assert_eq!(mode, RenderingMode::Rgb);
    }
}
