//! Auto-layout for automatic table arrangement
//!
//! Force-directed placement over the relationship graph: related tables are
//! pulled together, every pair of tables pushes apart, and a weak pull to
//! the center keeps isolated tables from drifting away. A final pass
//! separates boxes that still overlap.

use crate::core::graph::Edge;
use crate::core::schema::{Position, Table, TableId};
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

/// Layout configuration
#[derive(Clone, Debug)]
pub struct LayoutConfig {
    pub horizontal_spacing: f64,
    pub vertical_spacing: f64,
    /// Top-left corner of the laid out area
    pub start_x: f64,
    pub start_y: f64,
    /// Footprint assumed for every table when spacing
    pub table_width: f64,
    pub table_height: f64,
    pub iterations: usize,
    /// Maximum step per iteration, decays by `cooling_rate`
    pub initial_temperature: f64,
    pub cooling_rate: f64,
    pub ideal_edge_length: f64,
    pub repulsion_strength: f64,
    pub attraction_strength: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_spacing: 80.0,
            vertical_spacing: 100.0,
            start_x: 100.0,
            start_y: 100.0,
            table_width: 280.0,
            table_height: 250.0,
            iterations: 300,
            initial_temperature: 100.0,
            cooling_rate: 0.95,
            ideal_edge_length: 400.0,
            repulsion_strength: 50000.0,
            attraction_strength: 0.1,
        }
    }
}

/// New position for every table, in table order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutResult {
    pub positions: Vec<(TableId, Position)>,
}

impl LayoutResult {
    pub fn position_of(&self, table_id: &str) -> Option<Position> {
        self.positions
            .iter()
            .find(|(id, _)| id == table_id)
            .map(|(_, p)| *p)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Vec2 {
    x: f64,
    y: f64,
}

impl Vec2 {
    fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    fn normalize(&self) -> Self {
        let len = self.length();
        if len < 0.0001 {
            Self::default()
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    fn add(&self, other: Vec2) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    fn sub(&self, other: Vec2) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    fn scale(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

/// Relationship graph: one node per table, one undirected edge per
/// distinct pair of related tables. Self references and edges to unknown
/// tables are left out.
fn relationship_graph(tables: &[Table], edges: &[Edge]) -> UnGraph<usize, ()> {
    let mut graph = UnGraph::with_capacity(tables.len(), edges.len());
    let index: HashMap<&str, NodeIndex> = tables
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), graph.add_node(i)))
        .collect();

    for edge in edges {
        let (Some(&a), Some(&b)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) else {
            continue;
        };
        if a != b && graph.find_edge(a, b).is_none() {
            graph.add_edge(a, b, ());
        }
    }
    graph
}

/// Compute positions for `tables`, attracting tables joined by `edges`
pub fn calculate_layout(tables: &[Table], edges: &[Edge], config: &LayoutConfig) -> LayoutResult {
    let count = tables.len();
    match count {
        0 => return LayoutResult::default(),
        1 => {
            return LayoutResult {
                positions: vec![(
                    tables[0].id.clone(),
                    Position::new(config.start_x, config.start_y),
                )],
            };
        }
        _ => {}
    }

    let graph = relationship_graph(tables, edges);
    let links: Vec<(usize, usize)> = graph
        .edge_indices()
        .filter_map(|e| graph.edge_endpoints(e))
        .map(|(a, b)| (graph[a], graph[b]))
        .collect();

    let mut positions = initial_positions(tables, config);
    let center = Vec2::new(config.start_x + 600.0, config.start_y + 400.0);
    let min_distance = config.table_width + config.horizontal_spacing;
    let mut temperature = config.initial_temperature;

    for _ in 0..config.iterations {
        let mut forces = vec![Vec2::default(); count];

        for i in 0..count {
            for j in (i + 1)..count {
                let delta = positions[i].sub(positions[j]);
                let distance = delta.length().max(1.0);
                let strength = if distance < min_distance {
                    config.repulsion_strength * 2.0
                } else {
                    config.repulsion_strength
                };
                let force = delta.normalize().scale(strength / (distance * distance));
                forces[i] = forces[i].add(force);
                forces[j] = forces[j].sub(force);
            }
        }

        for &(a, b) in &links {
            let delta = positions[b].sub(positions[a]);
            let displacement = delta.length().max(1.0) - config.ideal_edge_length;
            let force = delta
                .normalize()
                .scale(config.attraction_strength * displacement);
            forces[a] = forces[a].add(force);
            forces[b] = forces[b].sub(force);
        }

        for (position, force) in positions.iter_mut().zip(forces.iter_mut()) {
            *force = force.add(center.sub(*position).scale(0.01));
            let magnitude = force.length();
            if magnitude > 0.01 {
                *position = position.add(force.normalize().scale(magnitude.min(temperature)));
            }
        }

        temperature *= config.cooling_rate;
        if temperature < 0.1 {
            break;
        }
    }

    let positions = separate_overlaps(positions, config);

    let min_x = positions.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let min_y = positions.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);

    LayoutResult {
        positions: tables
            .iter()
            .zip(positions)
            .map(|(table, p)| {
                (
                    table.id.clone(),
                    Position::new(p.x - min_x + config.start_x, p.y - min_y + config.start_y),
                )
            })
            .collect(),
    }
}

/// Keep existing placement when there is one, otherwise start on a circle
fn initial_positions(tables: &[Table], config: &LayoutConfig) -> Vec<Vec2> {
    let count = tables.len();
    let placed = tables
        .iter()
        .any(|t| t.position.x != 0.0 || t.position.y != 0.0);

    if placed {
        return tables
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let jitter = (i as f64 * 0.1).sin() * 10.0;
                Vec2::new(t.position.x + jitter, t.position.y + jitter)
            })
            .collect();
    }

    let center = Vec2::new(config.start_x + 600.0, config.start_y + 400.0);
    let radius = (count as f64 * 100.0).max(300.0);
    (0..count)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / count as f64;
            Vec2::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

fn separate_overlaps(mut positions: Vec<Vec2>, config: &LayoutConfig) -> Vec<Vec2> {
    let min_dx = config.table_width + config.horizontal_spacing;
    let min_dy = config.table_height + config.vertical_spacing;

    for _ in 0..50 {
        let mut moved = false;
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let dx = (positions[i].x - positions[j].x).abs();
                let dy = (positions[i].y - positions[j].y).abs();
                if dx >= min_dx || dy >= min_dy {
                    continue;
                }
                moved = true;

                let delta = positions[i].sub(positions[j]);
                let push = if delta.length() < 1.0 {
                    Vec2::new(min_dx * 0.5, min_dy * 0.5)
                } else {
                    let n = delta.normalize();
                    Vec2::new(n.x * (min_dx - dx) * 0.5, n.y * (min_dy - dy) * 0.5)
                };
                positions[i] = positions[i].add(push);
                positions[j] = positions[j].sub(push);
            }
        }
        if !moved {
            break;
        }
    }
    positions
}

/// Table list with the computed positions applied
pub fn apply_layout(tables: &[Table], layout: &LayoutResult) -> Vec<Table> {
    tables
        .iter()
        .map(|t| match layout.position_of(&t.id) {
            Some(position) => t.moved_to(position),
            None => t.clone(),
        })
        .collect()
}

/// Convenience wrapper: layout with defaults and apply
pub fn auto_layout(tables: &[Table], edges: &[Edge]) -> Vec<Table> {
    let layout = calculate_layout(tables, edges, &LayoutConfig::default());
    apply_layout(tables, &layout)
}
