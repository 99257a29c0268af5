//! Editor session: the single owner of the table list.
//!
//! Every mutation replaces the whole table array in one step and only then
//! schedules regeneration, so derived nodes and edges never observe a
//! half-applied batch. Structural edits regenerate at transition priority;
//! settles and selection changes regenerate immediately.

use crate::core::auto_layout::{LayoutConfig, apply_layout, calculate_layout};
use crate::core::config::CanvasConfig;
use crate::core::graph::{
    Connection, DiagramError, Edge, EdgeChange, EditorCallbacks, ElementRef, ElementType,
    GraphSynchronizer, InteractionReconciler, Node, NodeChange, NodeId, Priority, Reconciled,
    RenderBoundary, SelectionBridge, parse_connection, parse_edge_changes, parse_node_changes,
};
use crate::core::schema::{Field, SchemaError, Table, TableOps};
use crate::core::validation::{SchemaReport, validate_schema};

pub struct EditorSession<C: EditorCallbacks> {
    tables: Vec<Table>,
    selection: SelectionBridge,
    sync: GraphSynchronizer,
    reconciler: InteractionReconciler,
    boundary: RenderBoundary,
    callbacks: C,
}

impl<C: EditorCallbacks> EditorSession<C> {
    pub fn new(tables: Vec<Table>, config: CanvasConfig, callbacks: C) -> Self {
        let reconciler = InteractionReconciler::new(&config);
        let mut session = Self {
            tables,
            selection: SelectionBridge::new(),
            sync: GraphSynchronizer::new(config),
            reconciler,
            boundary: RenderBoundary::new(),
            callbacks,
        };
        session.schedule(Priority::Immediate);
        session
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn nodes(&self) -> &[Node] {
        self.sync.nodes()
    }

    pub fn edges(&self) -> &[Edge] {
        self.sync.edges()
    }

    pub fn synchronizer(&self) -> &GraphSynchronizer {
        &self.sync
    }

    pub fn selected_table(&self) -> Option<&Table> {
        self.selection.selected_table(&self.tables)
    }

    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    pub fn boundary(&self) -> &RenderBoundary {
        &self.boundary
    }

    fn schedule(&mut self, priority: Priority) -> bool {
        self.sync
            .schedule(priority, &self.tables, self.selection.selected_id())
    }

    /// Flush deferred regeneration. The host calls this when idle.
    pub fn run_idle(&mut self) -> bool {
        self.sync
            .run_idle(&self.tables, self.selection.selected_id())
    }

    /// Inbound replacement from the persistence collaborator
    pub fn replace_tables(&mut self, tables: Vec<Table>) {
        self.tables = tables;
        if self.selection.retain_existing(&self.tables) {
            self.callbacks.on_table_select(None);
        }
        self.schedule(Priority::Transition);
    }

    /// Apply a structural edit computed from the current tables.
    ///
    /// On error nothing changes and no callback fires.
    pub fn apply_batch(
        &mut self,
        edit: impl FnOnce(&[Table]) -> Result<Vec<Table>, SchemaError>,
    ) -> Result<(), SchemaError> {
        let updated = edit(&self.tables)?;
        self.tables = updated;
        if self.selection.retain_existing(&self.tables) {
            self.callbacks.on_table_select(None);
        }
        self.callbacks.on_table_update(&self.tables);
        self.schedule(Priority::Transition);
        Ok(())
    }

    pub fn add_table(&mut self, table: Table) -> Result<(), SchemaError> {
        self.apply_batch(|tables| tables.with_added(table))
    }

    pub fn remove_table(&mut self, table_id: &str) -> Result<Table, SchemaError> {
        let (tables, removed) = self.tables.with_removed(table_id)?;
        self.apply_batch(|_| Ok(tables))?;
        Ok(removed)
    }

    /// Rename a table and every foreign key that referenced it by name
    pub fn rename_table(&mut self, table_id: &str, new_name: &str) -> Result<(), SchemaError> {
        self.apply_batch(|tables| tables.with_renamed(table_id, new_name))
    }

    /// Replace one table record wholesale
    pub fn update_table(&mut self, table: Table) -> Result<(), SchemaError> {
        self.apply_batch(|tables| tables.with_replaced(table))
    }

    pub fn add_field(&mut self, table_id: &str, field: Field) -> Result<(), SchemaError> {
        self.edit_table(table_id, |table| table.with_field_added(field))
    }

    pub fn update_field(
        &mut self,
        table_id: &str,
        index: usize,
        field: Field,
    ) -> Result<(), SchemaError> {
        self.edit_table(table_id, |table| table.with_field_updated(index, field))
    }

    pub fn remove_field(&mut self, table_id: &str, index: usize) -> Result<Field, SchemaError> {
        let mut removed = None;
        self.edit_table(table_id, |table| {
            let (table, field) = table.with_field_removed(index)?;
            removed = Some(field);
            Ok(table)
        })?;
        removed.ok_or_else(|| SchemaError::TableNotFound(table_id.to_string()))
    }

    pub fn move_field(&mut self, table_id: &str, from: usize, to: usize) -> Result<(), SchemaError> {
        self.edit_table(table_id, |table| table.with_field_moved(from, to))
    }

    fn edit_table(
        &mut self,
        table_id: &str,
        edit: impl FnOnce(&Table) -> Result<Table, SchemaError>,
    ) -> Result<(), SchemaError> {
        self.apply_batch(|tables| {
            let table = tables
                .table_by_id(table_id)
                .ok_or_else(|| SchemaError::TableNotFound(table_id.to_string()))?;
            tables.with_replaced(edit(table)?)
        })
    }

    /// Node changes from the surface, applied in order within one turn.
    ///
    /// All settles in the batch are folded into a single table replacement
    /// with one `on_table_update` and one `on_save`.
    pub fn handle_node_changes(&mut self, changes: Vec<NodeChange>) {
        let mut settled = false;
        let mut released = false;
        let mut selected = None;

        for change in changes {
            match self
                .reconciler
                .node_change(&mut self.sync, &self.tables, change)
            {
                Reconciled::LayoutSettled(tables) => {
                    self.tables = tables;
                    settled = true;
                }
                Reconciled::Released => released = true,
                Reconciled::Selected(id) => selected = Some(id),
                _ => {}
            }
        }

        if let Some(id) = selected {
            self.node_click(&NodeId::from(id));
        }
        if settled {
            self.callbacks.on_table_update(&self.tables);
            self.callbacks.on_save(&self.tables);
        }
        if settled || released {
            self.schedule(Priority::Immediate);
        }
    }

    pub fn handle_node_changes_json(&mut self, changes: &serde_json::Value) {
        self.handle_node_changes(parse_node_changes(changes));
    }

    pub fn handle_edge_changes(&mut self, changes: Vec<EdgeChange>) {
        for change in changes {
            if let Reconciled::EdgeRemoved(id) = self.reconciler.edge_change(&self.sync, change) {
                self.sync.remove_manual_edge(&id);
            }
        }
    }

    pub fn handle_edge_changes_json(&mut self, changes: &serde_json::Value) {
        self.handle_edge_changes(parse_edge_changes(changes));
    }

    /// Returns whether a new edge was added
    pub fn handle_connect(&mut self, connection: Connection) -> bool {
        match self.reconciler.connect(&self.sync, connection) {
            Reconciled::EdgeAdded(edge) => self.sync.insert_manual_edge(edge),
            _ => false,
        }
    }

    pub fn handle_connect_json(&mut self, connection: &serde_json::Value) -> bool {
        parse_connection(connection).is_some_and(|c| self.handle_connect(c))
    }

    pub fn node_click(&mut self, node: &NodeId) {
        if self.selection.select_node(&self.tables, node) {
            self.callbacks
                .on_table_select(self.selection.selected_table(&self.tables));
            self.schedule(Priority::Immediate);
        }
    }

    pub fn pane_click(&mut self) {
        if self.selection.clear() {
            self.callbacks.on_table_select(None);
            self.schedule(Priority::Immediate);
        }
    }

    /// Forward a navigation request and select the table it points at
    pub fn navigate_to(&mut self, element: ElementRef) {
        if element.element_type == ElementType::Table {
            self.node_click(&NodeId::from(&element.element_id));
        }
        self.callbacks.on_navigate_to_element(&element);
    }

    pub fn add_comment(&mut self, element: ElementRef) {
        self.callbacks.on_add_comment(&element);
    }

    pub fn mark_as_task(&mut self, element: ElementRef) {
        self.callbacks.on_mark_as_task(&element);
    }

    /// Run advisory diagnostics and hand them to `on_validate`
    pub fn validate(&mut self) -> SchemaReport {
        let report = validate_schema(&self.tables);
        self.callbacks.on_validate(&report);
        report
    }

    /// Arrange all tables and persist the result as a layout-only edit
    pub fn auto_layout(&mut self, config: &LayoutConfig) {
        let layout = calculate_layout(&self.tables, self.sync.edges(), config);
        self.tables = apply_layout(&self.tables, &layout);
        self.callbacks.on_table_update(&self.tables);
        self.callbacks.on_save(&self.tables);
        self.schedule(Priority::Immediate);
    }

    /// Hand nodes and edges to the renderer inside the error boundary
    pub fn render<T>(
        &mut self,
        render: impl FnOnce(&[Node], &[Edge]) -> Result<T, DiagramError>,
    ) -> Option<T> {
        let sync = &self.sync;
        self.boundary.render(|| render(sync.nodes(), sync.edges()))
    }

    /// Error delivered through the renderer's error callback
    pub fn report_render_error(&mut self, error: DiagramError) {
        self.boundary.report(error);
    }

    /// Banner retry: clear the failure and regenerate the graph
    pub fn retry_render(&mut self) -> bool {
        let was_failed = self.boundary.retry();
        if was_failed {
            self.schedule(Priority::Immediate);
        }
        was_failed
    }
}
