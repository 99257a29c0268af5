//! Interaction reconciler: turns rendering-surface events into model deltas.
//!
//! In-flight drags and resizes only move the on-screen node. The model is
//! written once, when the gesture settles, and only if the node really moved
//! or changed size.

use crate::core::config::CanvasConfig;
use crate::core::graph::model::{Edge, EdgeKind, NodeId, is_placeholder_handle};
use crate::core::graph::sync::GraphSynchronizer;
use crate::core::schema::{Position, Size, Table, TableId, TableOps};
use serde::Deserialize;
use std::collections::HashMap;

/// Node event from the rendering surface
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeChange {
    Position {
        id: NodeId,
        #[serde(default)]
        position: Option<Position>,
        #[serde(default)]
        dragging: Option<bool>,
    },
    Dimensions {
        id: NodeId,
        #[serde(default)]
        dimensions: Option<Size>,
        #[serde(default)]
        resizing: Option<bool>,
    },
    Select {
        id: NodeId,
        #[serde(default)]
        selected: bool,
    },
}

/// Edge event from the rendering surface
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EdgeChange {
    Remove {
        id: String,
    },
    Select {
        id: String,
        #[serde(default)]
        selected: bool,
    },
}

/// Connect gesture: the user dragged from one handle to another
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(default)]
    pub source: NodeId,
    #[serde(default)]
    pub target: NodeId,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
}

impl Connection {
    pub fn new(
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        source_handle: impl Into<String>,
        target_handle: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_handle: Some(source_handle.into()),
            target_handle: Some(target_handle.into()),
        }
    }
}

/// Parse a batch of node changes, skipping entries that do not parse.
/// Anything other than an array yields no changes.
pub fn parse_node_changes(value: &serde_json::Value) -> Vec<NodeChange> {
    parse_batch(value, "node change")
}

pub fn parse_edge_changes(value: &serde_json::Value) -> Vec<EdgeChange> {
    parse_batch(value, "edge change")
}

pub fn parse_connection(value: &serde_json::Value) -> Option<Connection> {
    serde_json::from_value(value.clone())
        .map_err(|e| tracing::warn!("Ignoring malformed connection: {}", e))
        .ok()
}

fn parse_batch<T: serde::de::DeserializeOwned>(value: &serde_json::Value, what: &str) -> Vec<T> {
    let Some(items) = value.as_array() else {
        tracing::warn!("Expected an array of {}s, got {}", what, value);
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(change) => Some(change),
            Err(e) => {
                tracing::warn!("Ignoring malformed {}: {}", what, e);
                None
            }
        })
        .collect()
}

/// What the session should do after one event
#[derive(Clone, Debug, PartialEq)]
pub enum Reconciled {
    /// Nothing to do
    Ignored,
    /// Gesture in flight; only the on-screen node changed
    Transient,
    /// Gesture ended without a real change; the node snaps back to the model
    Released,
    /// Gesture settled; replace the table list and persist
    LayoutSettled(Vec<Table>),
    Selected(TableId),
    EdgeAdded(Edge),
    EdgeRemoved(String),
}

/// Deterministic id for a user-drawn edge
pub fn manual_edge_id(connection: &Connection) -> String {
    format!(
        "manual-{}-{}-{}-{}",
        connection.source,
        connection.source_handle.as_deref().unwrap_or_default(),
        connection.target,
        connection.target_handle.as_deref().unwrap_or_default()
    )
}

fn released_or_ignored(had_gesture: bool) -> Reconciled {
    if had_gesture {
        Reconciled::Released
    } else {
        Reconciled::Ignored
    }
}

pub struct InteractionReconciler {
    position_epsilon: f64,
    dimension_tolerance: f64,
    drag_origins: HashMap<NodeId, Position>,
    resize_origins: HashMap<NodeId, Size>,
}

impl InteractionReconciler {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            position_epsilon: config.position_epsilon,
            dimension_tolerance: config.dimension_tolerance,
            drag_origins: HashMap::new(),
            resize_origins: HashMap::new(),
        }
    }

    pub fn is_dragging(&self, id: &NodeId) -> bool {
        self.drag_origins.contains_key(id)
    }

    pub fn node_change(
        &mut self,
        sync: &mut GraphSynchronizer,
        tables: &[Table],
        change: NodeChange,
    ) -> Reconciled {
        match change {
            NodeChange::Position {
                id,
                position,
                dragging,
            } => self.position_change(sync, tables, id, position, dragging.unwrap_or(false)),
            NodeChange::Dimensions {
                id,
                dimensions,
                resizing,
            } => self.dimensions_change(sync, tables, id, dimensions, resizing),
            NodeChange::Select { id, selected } => {
                if selected && tables.table_by_id(id.as_str()).is_some() {
                    Reconciled::Selected(id.as_str().to_string())
                } else {
                    Reconciled::Ignored
                }
            }
        }
    }

    fn position_change(
        &mut self,
        sync: &mut GraphSynchronizer,
        tables: &[Table],
        id: NodeId,
        position: Option<Position>,
        dragging: bool,
    ) -> Reconciled {
        if dragging {
            let Some(table) = tables.table_by_id(id.as_str()) else {
                tracing::warn!("Position change for unknown node {}", id);
                return Reconciled::Ignored;
            };
            self.drag_origins
                .entry(id.clone())
                .or_insert(table.position);
            if let Some(position) = position {
                sync.set_transient_position(&id, position);
            }
            return Reconciled::Transient;
        }

        // Gesture state goes first so a table removed mid-drag cannot pin it
        let origin = self.drag_origins.remove(&id);
        let last_seen = sync.clear_transient_position(&id);
        let Some(table) = tables.table_by_id(id.as_str()) else {
            tracing::warn!("Drag ended on unknown node {}", id);
            return released_or_ignored(origin.is_some() || last_seen.is_some());
        };

        let origin = origin.unwrap_or(table.position);
        let Some(target) = position.or(last_seen) else {
            return Reconciled::Released;
        };

        if target.distance_to(&origin) <= self.position_epsilon {
            tracing::trace!("Drag of {} ended where it started", id);
            return Reconciled::Released;
        }

        match tables.with_replaced(table.moved_to(target)) {
            Ok(updated) => {
                tracing::info!(
                    "Table {} moved to ({:.1}, {:.1})",
                    table.name,
                    target.x,
                    target.y
                );
                Reconciled::LayoutSettled(updated)
            }
            Err(e) => {
                tracing::warn!("Could not apply move of {}: {}", id, e);
                Reconciled::Released
            }
        }
    }

    /// Measurements reported without a resize gesture are layout noise and
    /// never written back; only a gesture that started with `resizing: true`
    /// or ends with an explicit `resizing: false` can persist a size.
    fn dimensions_change(
        &mut self,
        sync: &mut GraphSynchronizer,
        tables: &[Table],
        id: NodeId,
        dimensions: Option<Size>,
        resizing: Option<bool>,
    ) -> Reconciled {
        if resizing == Some(true) {
            let Some(table) = tables.table_by_id(id.as_str()) else {
                tracing::warn!("Dimension change for unknown node {}", id);
                return Reconciled::Ignored;
            };
            let current = sync.effective_size(table);
            self.resize_origins.entry(id.clone()).or_insert(current);
            if let Some(size) = dimensions {
                sync.set_transient_size(&id, size);
            }
            return Reconciled::Transient;
        }

        let origin = self.resize_origins.remove(&id);
        let last_seen = sync.clear_transient_size(&id);
        let Some(table) = tables.table_by_id(id.as_str()) else {
            tracing::warn!("Resize ended on unknown node {}", id);
            return released_or_ignored(origin.is_some() || last_seen.is_some());
        };
        if origin.is_none() && resizing.is_none() {
            return Reconciled::Ignored;
        }

        let origin = origin.unwrap_or_else(|| sync.effective_size(table));
        let Some(target) = dimensions.or(last_seen) else {
            return Reconciled::Released;
        };

        if target.approx_eq(&origin, self.dimension_tolerance) {
            return Reconciled::Released;
        }

        match tables.with_replaced(table.resized(target)) {
            Ok(updated) => {
                tracing::info!(
                    "Table {} resized to {:.0}x{:.0}",
                    table.name,
                    target.width,
                    target.height
                );
                Reconciled::LayoutSettled(updated)
            }
            Err(e) => {
                tracing::warn!("Could not apply resize of {}: {}", id, e);
                Reconciled::Released
            }
        }
    }

    pub fn edge_change(&mut self, sync: &GraphSynchronizer, change: EdgeChange) -> Reconciled {
        match change {
            EdgeChange::Remove { id } => match sync.edge(&id) {
                Some(edge) if edge.kind == EdgeKind::Manual => Reconciled::EdgeRemoved(id),
                Some(_) => {
                    tracing::debug!("Edge {} is derived from a foreign key, not removing", id);
                    Reconciled::Ignored
                }
                None => Reconciled::Ignored,
            },
            EdgeChange::Select { .. } => Reconciled::Ignored,
        }
    }

    /// Accept a connect gesture only with real handles on both ends, known
    /// endpoints, and no identical edge already present.
    pub fn connect(&mut self, sync: &GraphSynchronizer, connection: Connection) -> Reconciled {
        let handle_ok = |h: &Option<String>| h.as_deref().is_some_and(|h| !is_placeholder_handle(h));
        if !handle_ok(&connection.source_handle) || !handle_ok(&connection.target_handle) {
            tracing::warn!(
                "Discarding connection {} -> {}: missing handle",
                connection.source,
                connection.target
            );
            return Reconciled::Ignored;
        }

        if sync.node(&connection.source).is_none() || sync.node(&connection.target).is_none() {
            tracing::warn!(
                "Discarding connection {} -> {}: unknown node",
                connection.source,
                connection.target
            );
            return Reconciled::Ignored;
        }

        let edge = Edge::new(
            manual_edge_id(&connection),
            connection.source.clone(),
            connection.target.clone(),
        )
        .with_handles(connection.source_handle, connection.target_handle);

        if sync.edges().iter().any(|e| e.connects_like(&edge)) {
            tracing::warn!("Discarding duplicate connection {}", edge.id);
            return Reconciled::Ignored;
        }

        Reconciled::EdgeAdded(edge)
    }
}
