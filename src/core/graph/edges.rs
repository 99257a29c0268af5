//! Foreign-key edge derivation.
//!
//! Edges are a pure function of the table list: each resolvable foreign key
//! yields one edge whose id depends only on the source table, source field
//! and target table, so unrelated edits re-derive identical ids.

use crate::core::graph::model::{Edge, EdgeKind, source_handle_for, target_handle_for};
use crate::core::schema::Table;
use derive_more::Display;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

/// Resolved name lookup built once per derivation pass.
///
/// Duplicate table names resolve to the first table in list order.
struct NameIndex<'a> {
    tables: HashMap<&'a str, &'a Table>,
}

impl<'a> NameIndex<'a> {
    fn new(tables: &'a [Table]) -> Self {
        let mut index = HashMap::with_capacity(tables.len());
        for table in tables {
            index.entry(table.name.as_str()).or_insert(table);
        }
        Self { tables: index }
    }

    fn resolve(&self, name: &str) -> Option<&'a Table> {
        self.tables.get(name).copied()
    }
}

/// Characters that delimit components in composite ids and fingerprints
const SEPARATORS: &[char] = &['%', '-', ':', '>', '|'];

/// Fingerprint marker for an unresolved target; escaping never yields a bare `%`
const UNRESOLVED: &str = "%";

/// Percent-escape separator characters so joined components read back one way
fn escape_component(value: &str) -> Cow<'_, str> {
    if !value.contains(SEPARATORS) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '-' => escaped.push_str("%2D"),
            ':' => escaped.push_str("%3A"),
            '>' => escaped.push_str("%3E"),
            '|' => escaped.push_str("%7C"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Deterministic id of a foreign-key edge.
///
/// Components are escaped, so ids that contain `-` (uuids) never collide.
pub fn foreign_key_edge_id(source_table: &str, source_field: &str, target_table: &str) -> String {
    format!(
        "fk-{}-{}-{}",
        escape_component(source_table),
        escape_component(source_field),
        escape_component(target_table)
    )
}

/// Compute one edge per resolvable foreign key.
///
/// Foreign keys naming a table that does not exist are skipped silently;
/// reporting them is the validator's job. A foreign key whose referenced
/// field is missing still links the two tables, just without a target handle.
pub fn derive_foreign_key_edges(tables: &[Table]) -> Vec<Edge> {
    let index = NameIndex::new(tables);
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for table in tables {
        for (field, fk) in table.foreign_keys() {
            let Some(target) = index.resolve(&fk.table) else {
                continue;
            };

            let id = foreign_key_edge_id(&table.id, &field.id, &target.id);
            if !seen.insert(id.clone()) {
                tracing::warn!(
                    "Skipping foreign key edge with colliding id {} (duplicate field id in table {})",
                    id,
                    table.name
                );
                continue;
            }

            let target_handle = target
                .find_field(&fk.field)
                .map(|(_, f)| target_handle_for(&f.id));

            edges.push(Edge {
                id,
                source: table.id.as_str().into(),
                target: target.id.as_str().into(),
                source_handle: Some(source_handle_for(&field.id)),
                target_handle,
                label: Some(format!("{} → {}", field.name, fk.field)),
                kind: EdgeKind::ForeignKey,
            });
        }
    }

    edges
}

/// Cheap signature of every foreign-key relationship and how it resolves.
///
/// Two table lists with equal fingerprints derive identical edge sets, so
/// edits that do not touch keys (comments, positions, unrelated fields)
/// skip the derivation pass entirely.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Display)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(tables: &[Table]) -> Self {
        let index = NameIndex::new(tables);
        let mut parts: Vec<String> = tables
            .iter()
            .flat_map(|table| {
                let index = &index;
                table.foreign_keys().map(move |(field, fk)| {
                    let target = index.resolve(&fk.table);
                    let target_id = target
                        .map(|t| escape_component(&t.id))
                        .unwrap_or(Cow::Borrowed(UNRESOLVED));
                    let target_field = target
                        .and_then(|t| t.find_field(&fk.field))
                        .map(|(_, f)| escape_component(&f.id))
                        .unwrap_or(Cow::Borrowed(UNRESOLVED));
                    format!(
                        "{}:{}:{}:{}:{}>{}:{}",
                        escape_component(&table.id),
                        escape_component(&field.id),
                        escape_component(&field.name),
                        escape_component(&fk.table),
                        escape_component(&fk.field),
                        target_id,
                        target_field
                    )
                })
            })
            .collect();
        parts.sort();
        Fingerprint(parts.join("|"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
