//! Turns a pointer position over a drop target into a drop intent.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::common::config::PlacementSettings;
use crate::model::geometry::{Point, Rect};

/// Where, relative to a hovered target, a drop would land.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    Before,
    After,
    Left,
    Right,
    Center,
    Append,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalSide {
    Before,
    After,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalSide {
    Left,
    Right,
}

/// What the pointer is over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetKind {
    Component,
    Row,
    /// The canvas body outside any node.
    Canvas,
}

/// Rows and the canvas body only ever accept appends. For a component the
/// top and bottom bands win over the side bands:
///
/// ```text
///  +------------------------------+
///  |            before            |  vertical_band
///  +------+----------------+------+
///  | left |     center     | right|
///  +------+----------------+------+
///  |            after             |  vertical_band
///  +------------------------------+
///   horizontal_band        horizontal_band
/// ```
pub fn detect_intent(
    pointer: Point,
    bounds: Rect,
    target: TargetKind,
    settings: &PlacementSettings,
) -> Intent {
    if target != TargetKind::Component {
        return Intent::Append;
    }
    let (fx, fy) = bounds.normalize(pointer);
    intent_from_fractions(fx, fy, settings)
}

fn intent_from_fractions(fx: f64, fy: f64, settings: &PlacementSettings) -> Intent {
    let vertical = settings.vertical_band;
    let horizontal = settings.horizontal_band;
    if fy < vertical {
        Intent::Before
    } else if fy >= 1.0 - vertical {
        Intent::After
    } else if fx < horizontal {
        Intent::Left
    } else if fx >= 1.0 - horizontal {
        Intent::Right
    } else {
        Intent::Center
    }
}
