use archischema_canvas::core::config::CanvasConfig;
use archischema_canvas::core::graph::{Connection, EditorCallbacks, NodeChange};
use archischema_canvas::core::validation::SchemaReport;
use archischema_canvas::core::{EditorSession, Position, Table, create_demo_schema};

/// Logs every outward callback instead of persisting anything
struct LoggingCallbacks;

impl EditorCallbacks for LoggingCallbacks {
    fn on_table_update(&mut self, tables: &[Table]) {
        tracing::info!("Table list updated ({} tables)", tables.len());
    }

    fn on_save(&mut self, tables: &[Table]) {
        tracing::info!("Save requested for {} tables", tables.len());
    }

    fn on_table_select(&mut self, table: Option<&Table>) {
        match table {
            Some(table) => tracing::info!("Selected table {}", table.name),
            None => tracing::info!("Selection cleared"),
        }
    }

    fn on_validate(&mut self, report: &SchemaReport) {
        for message in report.all_messages() {
            tracing::warn!("{}", message);
        }
    }
}

fn main() {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = CanvasConfig::from_env();
    tracing::info!(
        "Canvas config: node width {}, row height {}, epsilon {}",
        config.default_node_width,
        config.field_row_height,
        config.position_epsilon
    );

    let mut session = EditorSession::new(create_demo_schema(), config, LoggingCallbacks);

    // Simulated drag of the comments table, settled in one write
    for step in 1..=5 {
        session.handle_node_changes(vec![NodeChange::Position {
            id: "comments".into(),
            position: Some(Position::new(450.0 + step as f64 * 20.0, 420.0)),
            dragging: Some(true),
        }]);
    }
    session.handle_node_changes(vec![NodeChange::Position {
        id: "comments".into(),
        position: None,
        dragging: Some(false),
    }]);

    session.handle_connect(Connection::new(
        "users",
        "comments",
        "users_id-source",
        "comments_user-target",
    ));
    session.node_click(&"posts".into());
    session.validate();

    let rendered = session.render(|nodes, edges| {
        Ok(serde_json::json!({ "nodes": nodes, "edges": edges }))
    });
    match rendered.map(|graph| serde_json::to_string_pretty(&graph)) {
        Some(Ok(json)) => println!("{json}"),
        Some(Err(e)) => tracing::error!("Failed to serialize graph: {}", e),
        None => tracing::error!("{}", session.boundary().banner().unwrap_or_default()),
    }
}
