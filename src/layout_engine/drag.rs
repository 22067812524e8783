use serde::{Deserialize, Serialize};

use super::canvas::CanvasTree;
use super::position::{Intent, TargetKind, detect_intent};
use super::resolver::DragPayload;
use crate::common::config::PlacementSettings;
use crate::model::geometry::{Point, Rect};
use crate::model::tree::NodeId;

/// Where a drop would land if the pointer were released now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoverIndicator {
    pub target: NodeId,
    pub intent: Intent,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    target: NodeId,
    bounds: Rect,
    depth: u8,
}

/// State of one drag, from pick-up to drop or cancel. Hovering is advisory
/// and never touches the canvas.
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    payload: Option<DragPayload>,
    hover: Option<HoverIndicator>,
    config: PlacementSettings,
}

impl DragSession {
    pub fn new(config: PlacementSettings) -> Self { Self { payload: None, hover: None, config } }

    pub fn begin(&mut self, payload: DragPayload) {
        self.payload = Some(payload);
        self.hover = None;
    }

    pub fn is_active(&self) -> bool { self.payload.is_some() }

    pub fn hover(&self) -> Option<HoverIndicator> { self.hover }

    /// Picks the hovered target among `candidates` and the intent under the
    /// pointer. Candidates outside the pointer, no longer on the canvas, or
    /// part of the dragged node are skipped. A row's field wins over the
    /// row, and later candidates win ties.
    pub fn on_pointer_move(
        &mut self,
        canvas: &CanvasTree,
        pointer: Point,
        candidates: &[(NodeId, Rect)],
    ) -> Option<HoverIndicator> {
        let Some(payload) = &self.payload else {
            return None;
        };
        let dragged = payload.source();

        let best = candidates
            .iter()
            .filter(|(_, bounds)| bounds.contains(pointer))
            .filter_map(|&(target, bounds)| {
                let depth = if target == canvas.root() {
                    0
                } else if !canvas.contains(target) {
                    return None;
                } else if canvas.parent_row(target).is_some() {
                    2
                } else {
                    1
                };
                Some(Candidate { target, bounds, depth })
            })
            .filter(|c| {
                dragged.is_none_or(|node| node != c.target && canvas.parent_row(c.target) != Some(node))
            })
            .fold(None::<Candidate>, |best, c| match best {
                Some(b) if b.depth > c.depth => Some(b),
                _ => Some(c),
            });

        self.hover = best.map(|c| {
            let kind = if c.target == canvas.root() {
                TargetKind::Canvas
            } else if canvas.is_row(c.target) {
                TargetKind::Row
            } else {
                TargetKind::Component
            };
            HoverIndicator {
                target: c.target,
                intent: detect_intent(pointer, c.bounds, kind, &self.config),
            }
        });
        self.hover
    }

    /// The pointer left every target; the drag goes on.
    pub fn leave(&mut self) { self.hover = None; }

    /// Ends the drag, handing back what was dragged and where it would land.
    pub fn finish(&mut self) -> Option<(DragPayload, Option<HoverIndicator>)> {
        let payload = self.payload.take()?;
        Some((payload, self.hover.take()))
    }

    pub fn reset(&mut self) {
        self.payload = None;
        self.hover = None;
    }

    pub fn update_config(&mut self, config: PlacementSettings) { self.config = config; }
}
