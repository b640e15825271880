//! Geometry captured during junction detection, for inspection in an editor.
//!
//! Nothing is recorded unless the `debug` feature is enabled.

use crate::math::{Aabb, Point2d};
#[cfg(feature = "debug")]
use serde_json::{json, Value};

#[cfg(feature = "debug")]
thread_local!(
    static DEBUG_FRAME: std::cell::RefCell<Vec<Value>> = Default::default();
);

#[cfg(feature = "debug")]
fn record(item: Value) {
    DEBUG_FRAME.with(|frame| frame.borrow_mut().push(item));
}

/// Records an axis-aligned box, such as a junction footprint.
#[allow(unused)]
pub fn debug_box(name: &str, area: Aabb) {
    #[cfg(feature = "debug")]
    record(json!({
        "type": "box",
        "name": name,
        "min": [area.min.x, area.min.y],
        "max": [area.max.x, area.max.y],
    }));
}

/// Records an open polyline, such as a ribbon edge.
#[allow(unused)]
pub fn debug_polyline(name: &str, points: impl IntoIterator<Item = Point2d>) {
    #[cfg(feature = "debug")]
    record(json!({
        "type": "polyline",
        "name": name,
        "points": points.into_iter().map(|p| [p.x, p.y]).collect::<Vec<_>>(),
    }));
}

/// Drains everything recorded on this thread since the last call.
#[cfg(feature = "debug")]
pub fn take_debug_frame() -> Value {
    Value::Array(DEBUG_FRAME.with(|frame| frame.take()))
}
