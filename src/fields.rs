//! Configurable fields and the set of fields currently exposed to the host.

use crate::error::{BridgeError, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Field
// =============================================================================

/// A user-configurable property of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    /// Canvas mirroring or GIF playback.
    DisplayMode,
    /// Frame rate setting.
    Fps,
    /// Edge length of the captured square.
    ScreenSize,
    /// Encoding used for captured frames.
    ImageFormat,
    /// Path of the GIF the bridge plays.
    GifPath,
    /// GIF rotation in degrees.
    GifRotation,
    /// How the GIF is fitted to the panel.
    GifFitMode,
    /// GIF zoom in percent.
    GifZoom,
    /// Horizontal GIF offset.
    GifOffsetX,
    /// Vertical GIF offset.
    GifOffsetY,
    /// Palette used when quantizing frames.
    ColorPalette,
    /// How the overlay is composed over the canvas.
    Composition,
    /// Overlay transparency in percent.
    OverlayTransparency,
    /// Spinner ring style.
    Spinner,
    /// Whether the text overlay is drawn.
    TextOverlay,
    /// Title shown by the text overlay.
    TitleText,
    /// Title font size.
    TitleFontSize,
    /// Sensor value font size.
    SensorFontSize,
    /// Sensor label font size.
    SensorLabelFontSize,
    /// Which sensor the overlay shows.
    SensorSource,
}

impl Field {
    /// Every field, in host declaration order.
    pub const ALL: [Field; 20] = [
        Field::DisplayMode,
        Field::Fps,
        Field::ScreenSize,
        Field::ImageFormat,
        Field::GifPath,
        Field::GifRotation,
        Field::GifFitMode,
        Field::GifZoom,
        Field::GifOffsetX,
        Field::GifOffsetY,
        Field::ColorPalette,
        Field::Composition,
        Field::OverlayTransparency,
        Field::Spinner,
        Field::TextOverlay,
        Field::TitleText,
        Field::TitleFontSize,
        Field::SensorFontSize,
        Field::SensorLabelFontSize,
        Field::SensorSource,
    ];

    /// Fields that only apply while mirroring the canvas.
    pub const CANVAS_ONLY: [Field; 11] = [
        Field::ImageFormat,
        Field::ColorPalette,
        Field::Composition,
        Field::OverlayTransparency,
        Field::Spinner,
        Field::TextOverlay,
        Field::TitleText,
        Field::TitleFontSize,
        Field::SensorFontSize,
        Field::SensorLabelFontSize,
        Field::SensorSource,
    ];

    /// Top-level canvas fields; everything else hangs off `Composition`.
    pub const CANVAS_ROOTS: [Field; 3] = [Field::ImageFormat, Field::ColorPalette, Field::Composition];

    /// Fields the host registers up front.
    pub const INITIAL: [Field; 12] = [
        Field::DisplayMode,
        Field::Fps,
        Field::ScreenSize,
        Field::ImageFormat,
        Field::GifPath,
        Field::GifRotation,
        Field::GifFitMode,
        Field::GifZoom,
        Field::GifOffsetX,
        Field::GifOffsetY,
        Field::ColorPalette,
        Field::Composition,
    ];

    /// Fields gated by this one. Hiding a field hides its dependents too.
    pub fn dependents(self) -> &'static [Field] {
        match self {
            Field::Composition => &[Field::OverlayTransparency, Field::Spinner, Field::TextOverlay],
            Field::TextOverlay => &[
                Field::TitleText,
                Field::TitleFontSize,
                Field::SensorFontSize,
                Field::SensorLabelFontSize,
                Field::SensorSource,
            ],
            _ => &[],
        }
    }

    /// Property name used by the host and on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Field::DisplayMode => "displayMode",
            Field::Fps => "fps",
            Field::ScreenSize => "screenSize",
            Field::ImageFormat => "imageFormat",
            Field::GifPath => "gifPath",
            Field::GifRotation => "gifRotation",
            Field::GifFitMode => "gifFitMode",
            Field::GifZoom => "gifZoom",
            Field::GifOffsetX => "gifOffsetX",
            Field::GifOffsetY => "gifOffsetY",
            Field::ColorPalette => "colorPalette",
            Field::Composition => "composition",
            Field::OverlayTransparency => "overlayTransparency",
            Field::Spinner => "spinner",
            Field::TextOverlay => "textOverlay",
            Field::TitleText => "titleText",
            Field::TitleFontSize => "titleFontSize",
            Field::SensorFontSize => "sensorFontSize",
            Field::SensorLabelFontSize => "sensorLabelFontSize",
            Field::SensorSource => "sensorSource",
        }
    }

    /// Value the host assigns when the property is first registered.
    pub fn default_value(self) -> FieldValue {
        match self {
            Field::DisplayMode => FieldValue::text("SignalRGB Canvas"),
            Field::Fps => FieldValue::text("SIGNALRGB LIMITED"),
            Field::ScreenSize => FieldValue::Number(40),
            Field::ImageFormat => FieldValue::text("PNG"),
            Field::GifPath => FieldValue::text(""),
            Field::GifRotation => FieldValue::text("0"),
            Field::GifFitMode => FieldValue::text("Fill"),
            Field::GifZoom => FieldValue::Number(100),
            Field::GifOffsetX | Field::GifOffsetY => FieldValue::Number(0),
            Field::ColorPalette => FieldValue::text("WEB"),
            Field::Composition => FieldValue::text("OVERLAY"),
            Field::OverlayTransparency => FieldValue::Number(0),
            Field::Spinner => FieldValue::text("STATIC"),
            Field::TextOverlay => FieldValue::Flag(true),
            Field::TitleText => FieldValue::text("SignalRGB"),
            Field::TitleFontSize => FieldValue::Number(40),
            Field::SensorFontSize => FieldValue::Number(160),
            Field::SensorLabelFontSize => FieldValue::Number(40),
            Field::SensorSource => FieldValue::text("Liquid"),
        }
    }

    /// Whether `value` has the kind this field stores.
    pub fn accepts(self, value: &FieldValue) -> bool {
        std::mem::discriminant(&self.default_value()) == std::mem::discriminant(value)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| BridgeError::UnknownField(s.to_string()))
    }
}

// =============================================================================
// FieldValue
// =============================================================================

/// The value of a field as the host stores it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text fields and combobox selections.
    Text(String),
    /// Numeric fields.
    Number(i64),
    /// Boolean fields.
    Flag(bool),
}

impl FieldValue {
    /// Shorthand for [`FieldValue::Text`].
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// The text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The number, if this is a numeric value.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            FieldValue::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// The flag, if this is a boolean value.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(flag) => Some(*flag),
            _ => None,
        }
    }
}

// =============================================================================
// FieldSet
// =============================================================================

/// The fields currently exposed to the host and their values.
///
/// A hidden field reads as absent. Its last value is retained, the way the
/// host's property store keeps it, and comes back when the field is exposed
/// again.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    visible: BTreeSet<Field>,
    values: HashMap<Field, FieldValue>,
}

impl FieldSet {
    /// An empty set with nothing exposed.
    pub fn new() -> Self {
        Self::default()
    }

    /// The host's initial registration: [`Field::INITIAL`] with default values.
    pub fn with_defaults() -> Self {
        let mut set = Self::new();
        for field in Field::INITIAL {
            set.expose(field, field.default_value());
        }
        set
    }

    /// Whether `field` is currently exposed.
    pub fn is_exposed(&self, field: Field) -> bool {
        self.visible.contains(&field)
    }

    /// The live value of `field`, or `None` while it is hidden.
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        if self.is_exposed(field) {
            self.values.get(&field)
        } else {
            None
        }
    }

    /// Text value of an exposed field.
    pub fn text(&self, field: Field) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    /// Numeric value of an exposed field.
    pub fn number(&self, field: Field) -> Option<i64> {
        self.get(field).and_then(FieldValue::as_number)
    }

    /// Store a new value for an exposed field.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::FieldHidden`] if the field is not exposed
    /// - [`BridgeError::InvalidValue`] if the value has the wrong kind
    pub fn set(&mut self, field: Field, value: FieldValue) -> Result<()> {
        if !self.is_exposed(field) {
            return Err(BridgeError::FieldHidden(field));
        }
        if !field.accepts(&value) {
            return Err(BridgeError::InvalidValue {
                field,
                value: format!("{value:?}"),
            });
        }
        self.values.insert(field, value);
        Ok(())
    }

    /// Expose `field`. A field with no retained value starts at `seed`.
    ///
    /// Returns `true` if the field was hidden before.
    pub fn expose(&mut self, field: Field, seed: FieldValue) -> bool {
        self.values.entry(field).or_insert(seed);
        self.visible.insert(field)
    }

    /// Hide `field` and, transitively, everything it gates.
    pub fn hide(&mut self, field: Field) {
        self.visible.remove(&field);
        for &dependent in field.dependents() {
            self.hide(dependent);
        }
    }

    /// Exposed fields in declaration order.
    pub fn exposed(&self) -> impl Iterator<Item = Field> + '_ {
        self.visible.iter().copied()
    }
}
