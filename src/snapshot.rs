//! Saved canvas settings.

use crate::fields::{Field, FieldSet, FieldValue};
use std::collections::BTreeMap;

/// Last-known values of the canvas-only fields.
///
/// Always holds a value for every field in [`Field::CANVAS_ONLY`]; the frame
/// payload reads from here whenever the live field is hidden. Only the
/// canvas to GIF transition writes to it.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasSnapshot {
    values: BTreeMap<Field, FieldValue>,
}

impl Default for CanvasSnapshot {
    fn default() -> Self {
        Self {
            values: Field::CANVAS_ONLY
                .into_iter()
                .map(|field| (field, field.default_value()))
                .collect(),
        }
    }
}

impl CanvasSnapshot {
    /// Copy every canvas field that is currently exposed.
    ///
    /// Hidden fields keep their previous snapshot value.
    pub fn capture(&mut self, fields: &FieldSet) {
        for field in Field::CANVAS_ONLY {
            if let Some(value) = fields.get(field) {
                self.values.insert(field, value.clone());
            }
        }
    }

    /// Saved value for a canvas field; `None` for any other field.
    pub fn value(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }
}
