#[cfg(test)]
mod tests {
    use crate::core::auto_layout::LayoutConfig;
    use crate::core::config::CanvasConfig;
    use crate::core::graph::{
        Connection, DiagramError, EdgeChange, EdgeKind, EditorCallbacks, ElementRef, NodeChange,
        is_placeholder_handle,
    };
    use crate::core::validation::{IssueKind, SchemaReport};
    use crate::core::{EditorSession, Field, Position, SchemaError, Size, Table, create_demo_schema};
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        updates: Vec<Vec<Table>>,
        saves: Vec<Vec<Table>>,
        selections: Vec<Option<String>>,
        comments: Vec<ElementRef>,
        tasks: Vec<ElementRef>,
        navigations: Vec<ElementRef>,
        reports: Vec<SchemaReport>,
    }

    impl EditorCallbacks for Recorder {
        fn on_table_update(&mut self, tables: &[Table]) {
            self.updates.push(tables.to_vec());
        }

        fn on_save(&mut self, tables: &[Table]) {
            self.saves.push(tables.to_vec());
        }

        fn on_table_select(&mut self, table: Option<&Table>) {
            self.selections.push(table.map(|t| t.id.clone()));
        }

        fn on_add_comment(&mut self, element: &ElementRef) {
            self.comments.push(element.clone());
        }

        fn on_mark_as_task(&mut self, element: &ElementRef) {
            self.tasks.push(element.clone());
        }

        fn on_navigate_to_element(&mut self, element: &ElementRef) {
            self.navigations.push(element.clone());
        }

        fn on_validate(&mut self, report: &SchemaReport) {
            self.reports.push(report.clone());
        }
    }

    fn orders_and_users() -> Vec<Table> {
        vec![
            Table::with_id("t1", "orders")
                .with_position(0.0, 0.0)
                .add_field(Field::with_id("f1", "user_id", "INT").references("users", "id")),
            Table::with_id("t2", "users")
                .with_position(400.0, 0.0)
                .add_field(Field::with_id("f2", "id", "INT").primary_key()),
        ]
    }

    fn session(tables: Vec<Table>) -> EditorSession<Recorder> {
        EditorSession::new(tables, CanvasConfig::default(), Recorder::default())
    }

    #[test]
    fn test_initial_graph() {
        let session = session(orders_and_users());

        assert_eq!(session.nodes().len(), 2);
        assert_eq!(session.edges().len(), 1);
        let edge = &session.edges()[0];
        assert_eq!(edge.id, "fk-t1-f1-t2");
        assert_eq!(edge.source, "t1");
        assert_eq!(edge.target, "t2");
    }

    #[test]
    fn test_rename_without_cascade_drops_edge() {
        let mut session = session(orders_and_users());

        let mut tables = session.tables().to_vec();
        tables[1].name = "accounts".into();
        session.replace_tables(tables);
        assert_eq!(session.edges().len(), 1);

        assert!(session.run_idle());
        assert!(session.edges().is_empty());
        assert!(session.callbacks().updates.is_empty());
    }

    #[test]
    fn test_rename_with_cascade_keeps_edge() {
        let mut session = session(orders_and_users());

        session.rename_table("t2", "accounts").unwrap();
        session.run_idle();

        assert_eq!(session.edges().len(), 1);
        assert_eq!(
            session.tables()[0].fields[0]
                .foreign_key
                .as_ref()
                .unwrap()
                .table,
            "accounts"
        );
        assert_eq!(session.callbacks().updates.len(), 1);
    }

    #[test]
    fn test_rename_to_existing_name_fails_without_side_effects() {
        let mut session = session(orders_and_users());

        let result = session.rename_table("t2", "orders");

        assert_eq!(result, Err(SchemaError::DuplicateTableName("orders".into())));
        assert_eq!(session.tables(), orders_and_users().as_slice());
        assert!(session.callbacks().updates.is_empty());
    }

    #[test]
    fn test_drag_debounce_writes_once() {
        let mut session = session(orders_and_users());

        for step in 1..=20 {
            session.handle_node_changes(vec![NodeChange::Position {
                id: "t1".into(),
                position: Some(Position::new(step as f64 * 3.0, step as f64)),
                dragging: Some(true),
            }]);
        }
        assert!(session.callbacks().updates.is_empty());
        assert!(session.callbacks().saves.is_empty());
        assert_eq!(session.tables()[0].position, Position::new(0.0, 0.0));
        assert_eq!(session.nodes()[0].position, Position::new(60.0, 20.0));

        session.handle_node_changes(vec![NodeChange::Position {
            id: "t1".into(),
            position: Some(Position::new(61.0, 21.0)),
            dragging: Some(false),
        }]);

        let callbacks = session.callbacks();
        assert_eq!(callbacks.updates.len(), 1);
        assert_eq!(callbacks.saves.len(), 1);
        assert_eq!(callbacks.saves[0][0].position, Position::new(61.0, 21.0));
        assert_eq!(session.tables()[0].position, Position::new(61.0, 21.0));
        assert_eq!(session.nodes()[0].position, Position::new(61.0, 21.0));
    }

    #[test]
    fn test_structural_edit_deferred_during_drag() {
        let mut session = session(orders_and_users());

        session.handle_node_changes(vec![NodeChange::Position {
            id: "t2".into(),
            position: Some(Position::new(420.0, 10.0)),
            dragging: Some(true),
        }]);
        session
            .add_field("t2", Field::with_id("f3", "email", "TEXT"))
            .unwrap();
        assert!(!session.run_idle());
        assert_eq!(session.nodes()[1].table().fields.len(), 1);
        assert_eq!(session.nodes()[1].position, Position::new(420.0, 10.0));

        session.handle_node_changes(vec![NodeChange::Position {
            id: "t2".into(),
            position: None,
            dragging: Some(false),
        }]);

        let node = &session.nodes()[1];
        assert_eq!(node.table().fields.len(), 2);
        assert_eq!(node.position, Position::new(420.0, 10.0));
        assert_eq!(node.height, Some(60.0 + 2.0 * 28.0));
        assert!(!session.synchronizer().is_pending());
    }

    #[test]
    fn test_table_removed_mid_drag_does_not_stall_regeneration() {
        let mut session = session(orders_and_users());

        session.handle_node_changes(vec![NodeChange::Position {
            id: "t2".into(),
            position: Some(Position::new(450.0, 30.0)),
            dragging: Some(true),
        }]);
        let orders = session.tables()[0].clone();
        session.replace_tables(vec![orders]);

        session.handle_node_changes(vec![NodeChange::Position {
            id: "t2".into(),
            position: Some(Position::new(460.0, 30.0)),
            dragging: Some(false),
        }]);
        assert!(!session.synchronizer().is_dragging());
        assert_eq!(session.nodes().len(), 1);

        session
            .add_field("t1", Field::with_id("f3", "total", "DECIMAL"))
            .unwrap();
        assert!(session.run_idle());
        assert_eq!(session.nodes()[0].table().fields.len(), 2);
        assert!(session.callbacks().saves.is_empty());
    }

    #[test]
    fn test_table_removed_mid_resize_does_not_stall_regeneration() {
        let mut session = session(orders_and_users());

        session.handle_node_changes_json(&json!([
            {"type": "dimensions", "id": "t2", "dimensions": {"width": 400.0, "height": 200.0}, "resizing": true}
        ]));
        session.remove_table("t2").unwrap();
        assert!(session.run_idle());
        assert_eq!(session.nodes().len(), 1);

        session.handle_node_changes_json(&json!([
            {"type": "dimensions", "id": "t2", "resizing": false}
        ]));
        assert!(!session.synchronizer().is_dragging());
        assert!(session.callbacks().saves.is_empty());
    }

    #[test]
    fn test_multi_node_settle_saves_once() {
        let mut session = session(orders_and_users());

        session.handle_node_changes(vec![
            NodeChange::Position {
                id: "t1".into(),
                position: Some(Position::new(10.0, 10.0)),
                dragging: Some(true),
            },
            NodeChange::Position {
                id: "t2".into(),
                position: Some(Position::new(410.0, 10.0)),
                dragging: Some(true),
            },
        ]);
        session.handle_node_changes(vec![
            NodeChange::Position {
                id: "t1".into(),
                position: None,
                dragging: Some(false),
            },
            NodeChange::Position {
                id: "t2".into(),
                position: None,
                dragging: Some(false),
            },
        ]);

        let saves = &session.callbacks().saves;
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0][0].position, Position::new(10.0, 10.0));
        assert_eq!(saves[0][1].position, Position::new(410.0, 10.0));
    }

    #[test]
    fn test_resize_settle_persists_size() {
        let mut session = session(orders_and_users());

        session.handle_node_changes_json(&json!([
            {"type": "dimensions", "id": "t1", "dimensions": {"width": 330.0, "height": 140.0}, "resizing": true}
        ]));
        session.handle_node_changes_json(&json!([
            {"type": "dimensions", "id": "t1", "dimensions": {"width": 340.0, "height": 150.0}, "resizing": false}
        ]));

        assert_eq!(session.callbacks().saves.len(), 1);
        assert_eq!(session.tables()[0].size, Some(Size::new(340.0, 150.0)));
        assert_eq!(session.nodes()[0].width, Some(340.0));
        assert_eq!(session.nodes()[0].height, Some(150.0));
    }

    #[test]
    fn test_malformed_events_are_noops() {
        let mut session = session(orders_and_users());

        session.handle_node_changes_json(&json!("not an array"));
        session.handle_node_changes_json(&json!([{"type": "position"}, 42, null]));
        session.handle_edge_changes_json(&json!({"type": "remove"}));
        assert!(!session.handle_connect_json(&json!(null)));

        assert_eq!(session.tables(), orders_and_users().as_slice());
        assert_eq!(session.edges().len(), 1);
        assert!(session.callbacks().updates.is_empty());
    }

    #[test]
    fn test_duplicate_connection_yields_one_edge() {
        let mut session = session(orders_and_users());
        let connection = Connection::new("t2", "t1", "f2-source", "f1-target");

        assert!(session.handle_connect(connection.clone()));
        assert!(!session.handle_connect(connection));

        let manual: Vec<_> = session
            .edges()
            .iter()
            .filter(|e| e.kind == EdgeKind::Manual)
            .collect();
        assert_eq!(manual.len(), 1);
    }

    #[test]
    fn test_connect_with_sentinel_handle_is_discarded() {
        let mut session = session(orders_and_users());

        assert!(!session.handle_connect_json(&json!({
            "source": "t2",
            "target": "t1",
            "sourceHandle": "null",
            "targetHandle": "f1-target"
        })));
        assert_eq!(session.edges().len(), 1);
    }

    #[test]
    fn test_manual_edge_removal() {
        let mut session = session(orders_and_users());
        session.handle_connect(Connection::new("t2", "t1", "f2-source", "f1-target"));
        let manual_id = session
            .edges()
            .iter()
            .find(|e| e.kind == EdgeKind::Manual)
            .map(|e| e.id.clone())
            .unwrap();

        session.handle_edge_changes(vec![
            EdgeChange::Remove { id: manual_id },
            EdgeChange::Remove {
                id: "fk-t1-f1-t2".into(),
            },
        ]);

        assert_eq!(session.edges().len(), 1);
        assert_eq!(session.edges()[0].kind, EdgeKind::ForeignKey);
    }

    #[test]
    fn test_node_and_pane_click() {
        let mut session = session(orders_and_users());

        session.node_click(&"t2".into());
        assert_eq!(session.selected_table().map(|t| t.name.as_str()), Some("users"));
        assert!(session.nodes()[1].is_selected());
        assert!(!session.nodes()[0].is_selected());

        session.pane_click();
        assert!(session.selected_table().is_none());
        assert!(session.nodes().iter().all(|n| !n.is_selected()));

        assert_eq!(
            session.callbacks().selections,
            vec![Some("t2".to_string()), None]
        );
    }

    #[test]
    fn test_removing_selected_table_clears_selection() {
        let mut session = session(orders_and_users());
        session.node_click(&"t2".into());

        let removed = session.remove_table("t2").unwrap();
        session.run_idle();

        assert_eq!(removed.name, "users");
        assert!(session.selected_table().is_none());
        assert_eq!(session.nodes().len(), 1);
        assert!(session.edges().is_empty());
        assert_eq!(session.callbacks().selections.last(), Some(&None));
    }

    #[test]
    fn test_field_operations() {
        let mut session = session(orders_and_users());

        session
            .add_field("t1", Field::with_id("f0", "id", "INT").primary_key())
            .unwrap();
        session.move_field("t1", 1, 0).unwrap();
        assert_eq!(session.tables()[0].fields[0].name, "id");

        let removed = session.remove_field("t1", 1).unwrap();
        assert_eq!(removed.name, "user_id");
        session.run_idle();
        assert!(session.edges().is_empty());

        assert!(matches!(
            session.update_field("t1", 9, Field::with_id("x", "x", "INT")),
            Err(SchemaError::FieldIndexOutOfRange { index: 9, .. })
        ));
        assert!(matches!(
            session.add_field("nope", Field::with_id("x", "x", "INT")),
            Err(SchemaError::TableNotFound(_))
        ));
        assert_eq!(session.callbacks().updates.len(), 3);
    }

    #[test]
    fn test_pass_through_hooks() {
        let mut session = session(orders_and_users());
        let tables = session.tables().to_vec();

        session.add_comment(ElementRef::table(&tables[0]));
        session.mark_as_task(ElementRef::field(&tables[0], &tables[0].fields[0]));
        session.navigate_to(ElementRef::table(&tables[1]));

        let callbacks = session.callbacks();
        assert_eq!(callbacks.comments[0].element_name, "orders");
        assert_eq!(callbacks.tasks[0].element_name, "orders.user_id");
        assert_eq!(callbacks.navigations[0].element_id, "t2");
        assert_eq!(session.selected_table().map(|t| t.id.as_str()), Some("t2"));
    }

    #[test]
    fn test_validate_reports_to_hook() {
        let mut session = session(orders_and_users());

        let report = session.validate();

        assert!(report.is_valid());
        assert!(
            report
                .issues
                .iter()
                .any(|i| i.table_id == "t1" && i.kind == IssueKind::MissingPrimaryKey)
        );
        assert_eq!(session.callbacks().reports.len(), 1);
    }

    #[test]
    fn test_auto_layout_is_a_layout_edit() {
        let mut session = session(create_demo_schema());

        session.auto_layout(&LayoutConfig::default());

        assert_eq!(session.callbacks().updates.len(), 1);
        assert_eq!(session.callbacks().saves.len(), 1);
        for (node, table) in session.nodes().iter().zip(session.tables()) {
            assert_eq!(node.position, table.position);
        }
        assert_eq!(session.edges().len(), 3);
    }

    #[test]
    fn test_render_boundary_contains_errors() {
        let mut session = session(orders_and_users());

        let rendered = session.render(|nodes, edges| Ok((nodes.len(), edges.len())));
        assert_eq!(rendered, Some((2, 1)));

        session.report_render_error(DiagramError::Surface {
            code: "008".into(),
            message: "handle not found".into(),
        });
        assert!(session.boundary().is_failed());
        assert_eq!(session.render(|nodes, _| Ok(nodes.len())), None);

        assert!(session.retry_render());
        assert_eq!(session.render(|nodes, _| Ok(nodes.len())), Some(2));
    }

    #[test]
    fn test_rendered_edges_never_dangle_or_carry_sentinels() {
        let mut session = session(create_demo_schema());
        session.handle_connect_json(&json!({
            "source": "users",
            "target": "comments",
            "sourceHandle": "users_id-source",
            "targetHandle": "comments_user-target"
        }));
        session.remove_table("posts").unwrap();
        session.run_idle();

        let ids: Vec<&str> = session.nodes().iter().map(|n| n.id.as_str()).collect();
        for edge in session.edges() {
            assert!(ids.contains(&edge.source.as_str()));
            assert!(ids.contains(&edge.target.as_str()));
            for handle in [&edge.source_handle, &edge.target_handle].into_iter().flatten() {
                assert!(!is_placeholder_handle(handle));
            }
        }
        assert_eq!(session.edges().len(), 2);
    }
}
