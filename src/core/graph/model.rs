//! Rendering-surface entities: nodes, edges and their identifiers

use crate::core::schema::{Position, Table};
use derive_more::{Display, From};
use serde::{Deserialize, Deserializer, Serialize};
use std::rc::Rc;

/// Node type tag the rendering surface dispatches on
pub const TABLE_NODE_TYPE: &str = "table-node";

/// Handle values producers emit when they mean "no handle"
const PLACEHOLDER_HANDLES: [&str; 3] = ["", "null", "undefined"];

/// String-normalized node identifier.
///
/// Producers hand us ids as strings or numbers; both collapse into the same
/// textual form so set membership checks agree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display, From)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Normalize a loosely typed id. `null`, objects and arrays yield `None`.
    pub fn from_value(value: &serde_json::Value) -> Option<NodeId> {
        match value {
            serde_json::Value::String(s) => Some(NodeId::new(s.as_str())),
            serde_json::Value::Number(n) => Some(NodeId::new(number_to_id(n))),
            _ => None,
        }
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&String> for NodeId {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

fn number_to_id(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(NodeId::from_value(&value).unwrap_or_default())
    }
}

/// Anything carrying a node id, so sanitization accepts full nodes or bare ids
pub trait GraphNode {
    fn node_id(&self) -> &NodeId;
}

impl GraphNode for NodeId {
    fn node_id(&self) -> &NodeId {
        self
    }
}

impl GraphNode for Node {
    fn node_id(&self) -> &NodeId {
        &self.id
    }
}

/// Payload the table node component renders from
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub table: Table,
    #[serde(skip)]
    pub all_tables: Rc<[Table]>,
    pub selected: bool,
}

/// One rendered table box. Derived from the model, never edited directly.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: Position,
    pub data: NodeData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl Node {
    pub fn table(&self) -> &Table {
        &self.data.table
    }

    pub fn is_selected(&self) -> bool {
        self.data.selected
    }
}

/// Where an edge came from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Derived from a field's foreign key, regenerated with the model
    ForeignKey,
    /// Drawn by the user with a connect gesture
    #[default]
    Manual,
}

/// Connector between two nodes.
///
/// An empty `id` means the producer did not supply one; sanitization
/// stamps a deterministic id before the edge reaches the surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub source: NodeId,
    #[serde(default)]
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            label: None,
            kind: EdgeKind::Manual,
        }
    }

    pub fn with_handles(mut self, source: Option<String>, target: Option<String>) -> Self {
        self.source_handle = source;
        self.target_handle = target;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Same endpoints and same handles, ignoring id and label
    pub fn connects_like(&self, other: &Edge) -> bool {
        self.source == other.source
            && self.target == other.target
            && self.source_handle == other.source_handle
            && self.target_handle == other.target_handle
    }
}

/// True for values that must be treated as "no explicit handle"
pub fn is_placeholder_handle(value: &str) -> bool {
    PLACEHOLDER_HANDLES.contains(&value.trim())
}

/// Handle id on the outgoing side of a field row
pub fn source_handle_for(field_id: &str) -> String {
    format!("{field_id}-source")
}

/// Handle id on the incoming side of a field row
pub fn target_handle_for(field_id: &str) -> String {
    format!("{field_id}-target")
}
