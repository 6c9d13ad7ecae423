//! The host's per-device surface.

use crate::modes::ImageFormat;

/// Host capabilities the session drives.
///
/// This allows for mock implementations in tests.
pub trait Device {
    /// Capture a `width` x `height` buffer of the canvas in `format`.
    fn capture(&mut self, width: u32, height: u32, format: ImageFormat) -> Vec<u8>;

    /// Resize the device's visible bounds on the canvas.
    fn set_size(&mut self, width: u32, height: u32);

    /// Current brightness as a percentage.
    fn brightness(&self) -> u8;

    /// Current rotation of the device on the canvas, in degrees.
    fn rotation(&self) -> i32;

    /// Set the name shown for the device.
    fn set_name(&mut self, name: &str);

    /// Set the device image from base64 text.
    fn set_image(&mut self, encoded: &str);
}
