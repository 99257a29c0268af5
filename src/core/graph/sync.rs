//! Graph synchronizer: owns the derived node and edge arrays.
//!
//! Regeneration is requested with a [`Priority`]. Immediate requests run in
//! the same turn; transition requests wait for [`GraphSynchronizer::run_idle`].
//! Either kind waits while a drag or resize gesture is in flight, and a
//! superseded request simply recomputes from the state passed at flush time.

use crate::core::config::CanvasConfig;
use crate::core::graph::edges::{Fingerprint, derive_foreign_key_edges};
use crate::core::graph::model::{Edge, EdgeKind, Node, NodeData, NodeId, TABLE_NODE_TYPE};
use crate::core::graph::sanitize::prepare_edges;
use crate::core::schema::{Position, Size, Table};
use std::collections::HashMap;
use std::rc::Rc;

/// Scheduling class of a regeneration request
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Deferred until the host reports an idle moment
    Transition,
    /// Runs before the current turn returns
    Immediate,
}

/// Counters for how much work regeneration actually did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub node_passes: usize,
    pub edge_passes: usize,
    pub skipped_edge_passes: usize,
    pub deferred: usize,
}

pub struct GraphSynchronizer {
    config: CanvasConfig,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    foreign_key_edges: Vec<Edge>,
    manual_edges: Vec<Edge>,
    fingerprint: Option<Fingerprint>,
    pending: Option<Priority>,
    transient_positions: HashMap<NodeId, Position>,
    transient_sizes: HashMap<NodeId, Size>,
    stats: SyncStats,
}

impl GraphSynchronizer {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            edges: Vec::new(),
            foreign_key_edges: Vec::new(),
            manual_edges: Vec::new(),
            fingerprint: None,
            pending: None,
            transient_positions: HashMap::new(),
            transient_sizes: HashMap::new(),
            stats: SyncStats::default(),
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// True while any node has an uncommitted drag position or resize
    pub fn is_dragging(&self) -> bool {
        !self.transient_positions.is_empty() || !self.transient_sizes.is_empty()
    }

    /// Record a regeneration request; runs now when `priority` is immediate.
    ///
    /// Returns whether a regeneration pass ran.
    pub fn schedule(&mut self, priority: Priority, tables: &[Table], selected: Option<&str>) -> bool {
        self.pending = self.pending.max(Some(priority));
        if priority == Priority::Immediate {
            self.flush(tables, selected)
        } else {
            false
        }
    }

    /// Run whatever regeneration is pending. Called by the host when idle.
    pub fn run_idle(&mut self, tables: &[Table], selected: Option<&str>) -> bool {
        self.flush(tables, selected)
    }

    fn flush(&mut self, tables: &[Table], selected: Option<&str>) -> bool {
        if self.pending.is_none() {
            return false;
        }
        self.drop_stale_transients(tables);
        if self.is_dragging() {
            self.stats.deferred += 1;
            tracing::debug!("Deferring graph regeneration until the gesture settles");
            return false;
        }
        self.pending = None;
        self.regenerate(tables, selected);
        true
    }

    /// Overrides for nodes whose table is gone would defer regeneration forever
    fn drop_stale_transients(&mut self, tables: &[Table]) {
        let exists = |id: &NodeId| tables.iter().any(|t| t.id == id.as_str());
        self.transient_positions.retain(|id, _| exists(id));
        self.transient_sizes.retain(|id, _| exists(id));
    }

    fn regenerate(&mut self, tables: &[Table], selected: Option<&str>) {
        let all_tables: Rc<[Table]> = Rc::from(tables);
        self.nodes = tables
            .iter()
            .map(|table| self.build_node(table, &all_tables, selected))
            .collect();
        self.stats.node_passes += 1;

        let fingerprint = Fingerprint::of(tables);
        if self.fingerprint.as_ref() == Some(&fingerprint) {
            self.stats.skipped_edge_passes += 1;
            tracing::trace!("Foreign key fingerprint unchanged, reusing edges");
        } else {
            self.foreign_key_edges = derive_foreign_key_edges(tables);
            self.fingerprint = Some(fingerprint);
            self.stats.edge_passes += 1;
            tracing::debug!(
                "Derived {} foreign key edges from {} tables",
                self.foreign_key_edges.len(),
                tables.len()
            );
        }

        self.manual_edges = prepare_edges(&self.nodes, &self.manual_edges);
        let candidates: Vec<Edge> = self
            .foreign_key_edges
            .iter()
            .chain(self.manual_edges.iter())
            .cloned()
            .collect();
        self.edges = prepare_edges(&self.nodes, &candidates);
    }

    fn build_node(&self, table: &Table, all_tables: &Rc<[Table]>, selected: Option<&str>) -> Node {
        let id = NodeId::from(&table.id);
        let position = self
            .transient_positions
            .get(&id)
            .copied()
            .unwrap_or(table.position);
        let size = self
            .transient_sizes
            .get(&id)
            .copied()
            .unwrap_or_else(|| self.effective_size(table));

        Node {
            id,
            node_type: TABLE_NODE_TYPE.to_string(),
            position,
            data: NodeData {
                table: table.clone(),
                all_tables: Rc::clone(all_tables),
                selected: selected == Some(table.id.as_str()),
            },
            width: Some(size.width),
            height: Some(size.height),
        }
    }

    /// Size the node renders at: an explicit override wins, otherwise the
    /// width comes from the size preference and the height from the field count
    pub fn effective_size(&self, table: &Table) -> Size {
        if let Some(size) = table.size {
            return size;
        }
        let width = table
            .size_preference
            .map(|p| p.width())
            .unwrap_or(self.config.default_node_width);
        Size::new(width, self.config.node_height(table.fields.len()))
    }

    /// Move a node on screen without touching the model
    pub fn set_transient_position(&mut self, id: &NodeId, position: Position) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| &n.id == id) else {
            return false;
        };
        node.position = position;
        self.transient_positions.insert(id.clone(), position);
        true
    }

    pub fn clear_transient_position(&mut self, id: &NodeId) -> Option<Position> {
        self.transient_positions.remove(id)
    }

    /// Resize a node on screen without touching the model
    pub fn set_transient_size(&mut self, id: &NodeId, size: Size) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| &n.id == id) else {
            return false;
        };
        node.width = Some(size.width);
        node.height = Some(size.height);
        self.transient_sizes.insert(id.clone(), size);
        true
    }

    pub fn clear_transient_size(&mut self, id: &NodeId) -> Option<Size> {
        self.transient_sizes.remove(id)
    }

    /// Add a user-drawn edge. Rejected when it would not survive sanitization.
    ///
    /// The edge is sanitized together with the current edges, so a clashing
    /// id is re-stamped the same way any other duplicate is.
    pub fn insert_manual_edge(&mut self, edge: Edge) -> bool {
        let mut candidates = self.edges.clone();
        candidates.push(Edge {
            kind: EdgeKind::Manual,
            ..edge
        });
        let mut prepared = prepare_edges(&self.nodes, &candidates);
        if prepared.len() != candidates.len() {
            return false;
        }
        let Some(edge) = prepared.pop() else {
            return false;
        };
        self.manual_edges.push(edge.clone());
        self.edges.push(edge);
        true
    }

    /// Remove a user-drawn edge. Foreign key edges follow the model and stay.
    pub fn remove_manual_edge(&mut self, id: &str) -> Option<Edge> {
        let index = self.manual_edges.iter().position(|e| e.id == id)?;
        self.edges.retain(|e| e.id != id);
        Some(self.manual_edges.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Field, SizePreference};

    fn schema() -> Vec<Table> {
        vec![
            Table::with_id("t1", "orders")
                .with_position(10.0, 20.0)
                .add_field(Field::with_id("f0", "id", "INT").primary_key())
                .add_field(Field::with_id("f1", "user_id", "INT").references("users", "id")),
            Table::with_id("t2", "users")
                .with_position(300.0, 20.0)
                .add_field(Field::with_id("f2", "id", "INT").primary_key()),
        ]
    }

    fn synced(tables: &[Table]) -> GraphSynchronizer {
        let mut sync = GraphSynchronizer::new(CanvasConfig::default());
        assert!(sync.schedule(Priority::Immediate, tables, None));
        sync
    }

    #[test]
    fn test_nodes_mirror_tables() {
        let tables = schema();
        let sync = synced(&tables);

        assert_eq!(sync.nodes().len(), 2);
        let node = &sync.nodes()[0];
        assert_eq!(node.id, "t1");
        assert_eq!(node.node_type, TABLE_NODE_TYPE);
        assert_eq!(node.position, Position::new(10.0, 20.0));
        assert_eq!(node.height, Some(60.0 + 2.0 * 28.0));
        assert_eq!(node.width, Some(280.0));
        assert_eq!(node.data.all_tables.len(), 2);
        assert_eq!(sync.edges().len(), 1);
    }

    #[test]
    fn test_explicit_size_overrides_derived_height() {
        let mut tables = schema();
        tables[0] = tables[0].resized(Size::new(400.0, 90.0));
        tables[1].size_preference = Some(SizePreference::Huge);
        let sync = synced(&tables);

        assert_eq!(sync.nodes()[0].width, Some(400.0));
        assert_eq!(sync.nodes()[0].height, Some(90.0));
        assert_eq!(sync.nodes()[1].width, Some(520.0));
        assert_eq!(sync.nodes()[1].height, Some(88.0));
    }

    #[test]
    fn test_selection_flag() {
        let tables = schema();
        let mut sync = synced(&tables);
        sync.schedule(Priority::Immediate, &tables, Some("t2"));

        assert!(!sync.nodes()[0].is_selected());
        assert!(sync.nodes()[1].is_selected());
    }

    #[test]
    fn test_unchanged_fingerprint_skips_edge_pass() {
        let mut tables = schema();
        let mut sync = synced(&tables);

        tables[1].comment = Some("people".into());
        tables[0].position = Position::new(50.0, 50.0);
        sync.schedule(Priority::Immediate, &tables, None);

        let stats = sync.stats();
        assert_eq!(stats.node_passes, 2);
        assert_eq!(stats.edge_passes, 1);
        assert_eq!(stats.skipped_edge_passes, 1);
        assert_eq!(sync.nodes()[1].table().comment.as_deref(), Some("people"));
    }

    #[test]
    fn test_transition_waits_for_idle() {
        let tables = schema();
        let mut sync = synced(&tables);

        let mut renamed = tables.clone();
        renamed[1].name = "accounts".into();
        assert!(!sync.schedule(Priority::Transition, &renamed, None));
        assert_eq!(sync.edges().len(), 1);
        assert!(sync.is_pending());

        assert!(sync.run_idle(&renamed, None));
        assert!(sync.edges().is_empty());
        assert!(!sync.run_idle(&renamed, None));
    }

    #[test]
    fn test_superseded_requests_coalesce() {
        let tables = schema();
        let mut sync = synced(&tables);

        sync.schedule(Priority::Transition, &tables, None);
        sync.schedule(Priority::Transition, &tables, None);
        sync.run_idle(&tables, None);

        assert_eq!(sync.stats().node_passes, 2);
    }

    #[test]
    fn test_regeneration_deferred_during_drag() {
        let tables = schema();
        let mut sync = synced(&tables);
        let id = NodeId::from("t1");

        assert!(sync.set_transient_position(&id, Position::new(99.0, 99.0)));
        assert!(!sync.schedule(Priority::Immediate, &tables, None));
        assert_eq!(sync.stats().deferred, 1);
        assert_eq!(sync.node(&id).unwrap().position, Position::new(99.0, 99.0));

        sync.clear_transient_position(&id);
        assert!(sync.run_idle(&tables, None));
        assert_eq!(sync.node(&id).unwrap().position, Position::new(10.0, 20.0));
    }

    #[test]
    fn test_unknown_node_has_no_transient_position() {
        let tables = schema();
        let mut sync = synced(&tables);

        assert!(!sync.set_transient_position(&NodeId::from("nope"), Position::default()));
        assert!(!sync.is_dragging());
    }

    #[test]
    fn test_manual_edges_survive_regeneration_until_endpoint_removed() {
        let tables = schema();
        let mut sync = synced(&tables);

        let edge = Edge::new("m1", "t2", "t1")
            .with_handles(Some("f2-source".into()), Some("f0-target".into()));
        assert!(sync.insert_manual_edge(edge));
        assert_eq!(sync.edges().len(), 2);

        sync.schedule(Priority::Immediate, &tables, None);
        assert_eq!(sync.edges().len(), 2);

        let without_users = vec![tables[0].clone()];
        sync.schedule(Priority::Immediate, &without_users, None);
        assert!(sync.edges().is_empty());

        sync.schedule(Priority::Immediate, &tables, None);
        assert_eq!(sync.edges().len(), 1);
    }

    #[test]
    fn test_manual_edge_with_taken_id_is_restamped() {
        let tables = schema();
        let mut sync = synced(&tables);

        let first = Edge::new("m1", "t2", "t1")
            .with_handles(Some("f2-source".into()), Some("f0-target".into()));
        let second = Edge::new("m1", "t2", "t1")
            .with_handles(Some("f2-source".into()), Some("f1-target".into()));
        assert!(sync.insert_manual_edge(first));
        assert!(sync.insert_manual_edge(second));

        let ids: Vec<&str> = sync.edges().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["fk-t1-f1-t2", "m1", "edge-t2-t1-2"]);
        assert!(sync.edges()[1..].iter().all(|e| e.kind == EdgeKind::Manual));
    }

    #[test]
    fn test_manual_edge_to_unknown_node_is_rejected() {
        let tables = schema();
        let mut sync = synced(&tables);

        let edge = Edge::new("m1", "t2", "t9")
            .with_handles(Some("f2-source".into()), Some("x-target".into()));
        assert!(!sync.insert_manual_edge(edge));
        assert_eq!(sync.edges().len(), 1);
    }

    #[test]
    fn test_stale_transient_does_not_block_regeneration() {
        let tables = schema();
        let mut sync = synced(&tables);
        sync.set_transient_position(&NodeId::from("t2"), Position::new(5.0, 5.0));
        assert!(sync.is_dragging());

        let without_users = vec![tables[0].clone()];
        sync.schedule(Priority::Transition, &without_users, None);

        assert!(sync.run_idle(&without_users, None));
        assert!(!sync.is_dragging());
        assert_eq!(sync.nodes().len(), 1);
    }

    #[test]
    fn test_foreign_key_edges_cannot_be_removed() {
        let tables = schema();
        let mut sync = synced(&tables);

        assert!(sync.remove_manual_edge("fk-t1-f1-t2").is_none());
        assert_eq!(sync.edges().len(), 1);
    }
}
