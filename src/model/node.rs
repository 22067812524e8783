use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::model::tree::NodeId;

/// Everything the palette can offer.
///
/// `RowLayout` and `ColumnLayout` are meta-layouts: rows are only ever formed
/// implicitly by dropping fields side by side, so these two kinds can never be
/// placed on the canvas.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ComponentKind {
    TextInput,
    TextArea,
    Number,
    Email,
    Password,
    Phone,
    Url,
    Select,
    MultiSelect,
    Checkbox,
    RadioGroup,
    Toggle,
    Date,
    Time,
    DateTime,
    FileUpload,
    Slider,
    Rating,
    Signature,
    Heading,
    Paragraph,
    Divider,
    Hidden,
    RowLayout,
    ColumnLayout,
}

impl ComponentKind {
    pub fn is_meta_layout(self) -> bool {
        matches!(self, ComponentKind::RowLayout | ComponentKind::ColumnLayout)
    }

    /// Label given to a freshly dropped component.
    pub fn default_label(self) -> &'static str {
        use ComponentKind::*;
        match self {
            TextInput => "Text Input",
            TextArea => "Text Area",
            Number => "Number",
            Email => "Email",
            Password => "Password",
            Phone => "Phone",
            Url => "URL",
            Select => "Select",
            MultiSelect => "Multi Select",
            Checkbox => "Checkbox",
            RadioGroup => "Radio Group",
            Toggle => "Toggle",
            Date => "Date",
            Time => "Time",
            DateTime => "Date & Time",
            FileUpload => "File Upload",
            Slider => "Slider",
            Rating => "Rating",
            Signature => "Signature",
            Heading => "Heading",
            Paragraph => "Paragraph",
            Divider => "Divider",
            Hidden => "Hidden Field",
            RowLayout => "Row",
            ColumnLayout => "Column",
        }
    }

    /// Prefix used when generating field ids, e.g. `text_input_3`.
    pub fn field_prefix(self) -> String {
        let name: &'static str = self.into();
        name.replace('-', "_")
    }
}

/// Validation rules are carried for the renderer and never evaluated here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    MinLength(usize),
    MaxLength(usize),
    Pattern(String),
    Min(f64),
    Max(f64),
    Email,
    Url,
}

/// A form field placed on the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub kind: ComponentKind,
    pub label: String,
    pub field_id: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub validation: Vec<ValidationRule>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl Component {
    pub fn new(kind: ComponentKind, field_id: impl Into<String>) -> Self {
        Component {
            kind,
            label: kind.default_label().to_owned(),
            field_id: field_id.into(),
            required: false,
            validation: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Applies palette overrides on top of the defaults.
    pub fn apply(&mut self, initial: &InitialProperties) {
        if let Some(label) = &initial.label {
            self.label = label.clone();
        }
        if let Some(field_id) = &initial.field_id {
            self.field_id = field_id.clone();
        }
        if let Some(required) = initial.required {
            self.required = required;
        }
        self.validation.extend(initial.validation.iter().cloned());
        self.properties.extend(initial.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Optional overrides carried by a palette drag.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitialProperties {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub field_id: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub validation: Vec<ValidationRule>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// Payload stored per node in the arena. The hidden canvas root has none.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeData {
    Component(Component),
    Row,
}

impl NodeData {
    pub fn is_row(&self) -> bool { matches!(self, NodeData::Row) }

    pub fn as_component(&self) -> Option<&Component> {
        match self {
            NodeData::Component(c) => Some(c),
            NodeData::Row => None,
        }
    }
}

/// Owned projection of one top-level node, as handed to the renderer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanvasNode {
    Component(ComponentNode),
    Row(RowNode),
}

impl CanvasNode {
    pub fn id(&self) -> NodeId {
        match self {
            CanvasNode::Component(c) => c.id,
            CanvasNode::Row(r) => r.id,
        }
    }

    pub fn is_row(&self) -> bool { matches!(self, CanvasNode::Row(_)) }

    /// Ids of this node and everything below it, in document order.
    pub fn ids(&self) -> Vec<NodeId> {
        match self {
            CanvasNode::Component(c) => vec![c.id],
            CanvasNode::Row(r) => std::iter::once(r.id).chain(r.children.iter().map(|c| c.id)).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentNode {
    pub id: NodeId,
    #[serde(flatten)]
    pub component: Component,
}

/// Rows hold components only, so nesting a row in a row cannot be expressed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowNode {
    pub id: NodeId,
    pub children: Vec<ComponentNode>,
}

/// Description of a node to build, used for templates and tests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeSpec {
    Component(Component),
    Row(Vec<Component>),
}

impl From<Component> for NodeSpec {
    fn from(component: Component) -> Self { NodeSpec::Component(component) }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn kinds_parse_from_kebab_case() {
        assert_eq!(ComponentKind::RowLayout, ComponentKind::from_str("row-layout").unwrap());
        assert_eq!(ComponentKind::TextInput, ComponentKind::from_str("text-input").unwrap());
        assert_eq!("date-time", ComponentKind::DateTime.to_string());
        assert!(ComponentKind::from_str("grid").is_err());
    }

    #[test]
    fn only_layouts_are_meta() {
        let meta: Vec<_> = ComponentKind::iter().filter(|k| k.is_meta_layout()).collect();
        assert_eq!(vec![ComponentKind::RowLayout, ComponentKind::ColumnLayout], meta);
    }

    #[test]
    fn field_prefix_is_snake_case() {
        assert_eq!("multi_select", ComponentKind::MultiSelect.field_prefix());
        assert_eq!("email", ComponentKind::Email.field_prefix());
    }

    #[test]
    fn initial_properties_override_defaults() {
        let mut component = Component::new(ComponentKind::Email, "email_1");
        component.apply(&InitialProperties {
            label: Some("Work email".into()),
            required: Some(true),
            validation: vec![ValidationRule::Email],
            properties: [("placeholder".to_owned(), serde_json::json!("you@example.com"))]
                .into_iter()
                .collect(),
            ..Default::default()
        });
        assert_eq!("Work email", component.label);
        assert_eq!("email_1", component.field_id);
        assert!(component.required);
        assert_eq!(vec![ValidationRule::Email], component.validation);
        assert_eq!(Some(&serde_json::json!("you@example.com")), component.properties.get("placeholder"));
    }

    #[test]
    fn component_serializes_kind_as_kebab_case() {
        let component = Component::new(ComponentKind::RadioGroup, "radio_group_1");
        let json = serde_json::to_value(&component).unwrap();
        assert_eq!(serde_json::json!("radio-group"), json["kind"]);
    }
}
