//! Scripted editing sessions.
//!
//! A script is a JSON array of steps run in order against one engine.
//! Nodes are named by field id, since node ids only exist at runtime:
//!
//! ```json
//! [
//!   {"step": "add", "kind": "text-input"},
//!   {"step": "drop", "source": {"palette": "email"},
//!    "target": {"field": "text_input_1"}, "intent": "right"},
//!   {"step": "delete", "target": {"row_of": "email_2"}}
//! ]
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::layout_engine::{DragPayload, EventResponse, Intent, LayoutEngine};
use crate::model::{ComponentKind, InitialProperties, NodeId};

/// A node on the canvas, named the way a script can know it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum NodeRef {
    Field(String),
    /// The row holding the given field.
    RowOf(String),
    /// The canvas body.
    Canvas,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SourceRef {
    Palette(ComponentKind),
    Field(String),
    RowOf(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScriptStep {
    Add {
        kind: ComponentKind,
        #[serde(default)]
        initial_properties: Option<InitialProperties>,
    },
    Drop {
        source: SourceRef,
        target: NodeRef,
        intent: Intent,
        #[serde(default)]
        initial_properties: Option<InitialProperties>,
    },
    Delete {
        target: NodeRef,
    },
    Duplicate {
        target: NodeRef,
    },
    Clear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Committed,
    Unchanged,
    Rejected(String),
    /// A field named by the step is not on the canvas.
    Unresolved(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub index: usize,
    pub outcome: StepOutcome,
    /// The canvas after the step.
    pub tree: String,
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            StepOutcome::Committed => writeln!(f, "step {}: ok", self.index + 1)?,
            StepOutcome::Unchanged => writeln!(f, "step {}: no change", self.index + 1)?,
            StepOutcome::Rejected(msg) => writeln!(f, "step {}: rejected: {msg}", self.index + 1)?,
            StepOutcome::Unresolved(msg) => writeln!(f, "step {}: skipped: {msg}", self.index + 1)?,
        }
        write!(f, "{}", self.tree)
    }
}

pub fn parse_script(buf: &str) -> anyhow::Result<Vec<ScriptStep>> { Ok(serde_json::from_str(buf)?) }

pub fn run_script(engine: &mut LayoutEngine, steps: &[ScriptStep]) -> Vec<StepReport> {
    steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let outcome = match run_step(engine, step) {
                Ok(response) => outcome_of(response),
                Err(missing) => StepOutcome::Unresolved(missing),
            };
            StepReport { index, outcome, tree: engine.draw_tree() }
        })
        .collect()
}

fn outcome_of(response: EventResponse) -> StepOutcome {
    match response.rejection {
        Some(rejection) => StepOutcome::Rejected(rejection.message),
        None if response.committed => StepOutcome::Committed,
        None => StepOutcome::Unchanged,
    }
}

fn run_step(engine: &mut LayoutEngine, step: &ScriptStep) -> Result<EventResponse, String> {
    Ok(match step {
        ScriptStep::Add { kind, initial_properties } => {
            engine.add_component(*kind, initial_properties.clone())
        }
        ScriptStep::Drop { source, target, intent, initial_properties } => {
            let payload = match source {
                SourceRef::Palette(kind) => DragPayload::Palette {
                    kind: *kind,
                    initial_properties: initial_properties.clone(),
                },
                SourceRef::Field(field) => {
                    DragPayload::Canvas { node: resolve(engine, &NodeRef::Field(field.clone()))? }
                }
                SourceRef::RowOf(field) => {
                    DragPayload::Canvas { node: resolve(engine, &NodeRef::RowOf(field.clone()))? }
                }
            };
            let target = resolve(engine, target)?;
            engine.drop_at(payload, target, *intent)
        }
        ScriptStep::Delete { target } => {
            let target = resolve(engine, target)?;
            engine.delete_node(target)
        }
        ScriptStep::Duplicate { target } => {
            let target = resolve(engine, target)?;
            engine.duplicate_node(target)
        }
        ScriptStep::Clear => engine.clear(),
    })
}

fn resolve(engine: &LayoutEngine, node: &NodeRef) -> Result<NodeId, String> {
    let canvas = engine.canvas();
    match node {
        NodeRef::Canvas => Ok(canvas.root()),
        NodeRef::Field(field) => {
            canvas.find_by_field_id(field).ok_or_else(|| format!("no field {field:?}"))
        }
        NodeRef::RowOf(field) => {
            let node = canvas.find_by_field_id(field).ok_or_else(|| format!("no field {field:?}"))?;
            canvas.parent_row(node).ok_or_else(|| format!("field {field:?} is not in a row"))
        }
    }
}
