//! Selection state and the outward callback surface.

use crate::core::graph::model::{Edge, NodeId};
use crate::core::schema::{Field, Table, TableId, TableOps};
use crate::core::validation::SchemaReport;
use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    #[display("table")]
    Table,
    #[display("field")]
    Field,
    #[display("relationship")]
    Relationship,
}

/// `(type, id, name)` triple forwarded to collaboration hooks uninterpreted
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRef {
    pub element_type: ElementType,
    pub element_id: String,
    pub element_name: String,
}

impl ElementRef {
    pub fn table(table: &Table) -> Self {
        Self {
            element_type: ElementType::Table,
            element_id: table.id.clone(),
            element_name: table.name.clone(),
        }
    }

    pub fn field(table: &Table, field: &Field) -> Self {
        Self {
            element_type: ElementType::Field,
            element_id: field.id.clone(),
            element_name: format!("{}.{}", table.name, field.name),
        }
    }

    pub fn relationship(edge: &Edge) -> Self {
        Self {
            element_type: ElementType::Relationship,
            element_id: edge.id.clone(),
            element_name: edge.label.clone().unwrap_or_else(|| edge.id.clone()),
        }
    }
}

/// Hooks into the surrounding application. All default to no-ops.
pub trait EditorCallbacks {
    /// Any reconciled change to the table list; the caller persists it
    fn on_table_update(&mut self, _tables: &[Table]) {}

    /// Fired next to `on_table_update` when a drag or resize settles
    fn on_save(&mut self, _tables: &[Table]) {}

    fn on_table_select(&mut self, _table: Option<&Table>) {}

    fn on_add_comment(&mut self, _element: &ElementRef) {}

    fn on_mark_as_task(&mut self, _element: &ElementRef) {}

    fn on_navigate_to_element(&mut self, _element: &ElementRef) {}

    fn on_validate(&mut self, _report: &SchemaReport) {}
}

/// Callbacks that ignore everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallbacks;

impl EditorCallbacks for NoopCallbacks {}

/// Currently selected table, echoed into every node's `selected` flag
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SelectionBridge {
    selected: Option<TableId>,
}

impl SelectionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_selected(&self, table_id: &str) -> bool {
        self.selected.as_deref() == Some(table_id)
    }

    pub fn selected_table<'a>(&self, tables: &'a [Table]) -> Option<&'a Table> {
        self.selected
            .as_deref()
            .and_then(|id| tables.table_by_id(id))
    }

    /// Node click. Returns whether the selection changed.
    pub fn select_node(&mut self, tables: &[Table], node: &NodeId) -> bool {
        let Some(table) = tables.table_by_id(node.as_str()) else {
            tracing::debug!("Click on unknown node {}", node);
            return false;
        };
        self.set(Some(table.id.clone()))
    }

    /// Pane click. Returns whether the selection changed.
    pub fn clear(&mut self) -> bool {
        self.set(None)
    }

    /// Drop the selection if its table no longer exists
    pub fn retain_existing(&mut self, tables: &[Table]) -> bool {
        let stale = self
            .selected
            .as_deref()
            .is_some_and(|id| tables.table_by_id(id).is_none());
        stale && self.set(None)
    }

    fn set(&mut self, selected: Option<TableId>) -> bool {
        if self.selected == selected {
            return false;
        }
        self.selected = selected;
        true
    }
}
