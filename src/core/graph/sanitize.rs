//! Edge sanitization before anything reaches the rendering surface.
//!
//! The surface throws on edges whose endpoints are not mounted nodes and on
//! handle ids it cannot find, so every edge set passes through
//! [`normalize_handles`] and [`sanitize_edges`] first. Both are pure and
//! idempotent.

use crate::core::graph::model::{Edge, GraphNode, NodeId, is_placeholder_handle};
use std::collections::HashSet;

/// Drop edges with unknown endpoints and give every survivor a unique id.
///
/// Edges with an empty or duplicate id are re-stamped with
/// `edge-{source}-{target}-{position}`, where position is the edge's index
/// in the input.
pub fn sanitize_edges<N: GraphNode>(nodes: &[N], edges: &[Edge]) -> Vec<Edge> {
    let valid: HashSet<&str> = nodes.iter().map(|n| n.node_id().as_str()).collect();

    let mut used_ids: HashSet<String> = HashSet::with_capacity(edges.len());
    let mut result = Vec::with_capacity(edges.len());

    for (position, edge) in edges.iter().enumerate() {
        if !endpoint_is_valid(&edge.source, &valid) || !endpoint_is_valid(&edge.target, &valid) {
            tracing::warn!(
                "Dropping edge {:?} ({} -> {}): endpoint not in node set",
                edge.id,
                edge.source,
                edge.target
            );
            continue;
        }

        let mut edge = edge.clone();
        if edge.id.trim().is_empty() || used_ids.contains(&edge.id) {
            let id = synthesize_id(&edge, position, &used_ids);
            tracing::debug!("Re-stamping edge {:?} as {}", edge.id, id);
            edge.id = id;
        }
        used_ids.insert(edge.id.clone());
        result.push(edge);
    }

    result
}

fn endpoint_is_valid(id: &NodeId, valid: &HashSet<&str>) -> bool {
    !id.is_empty() && valid.contains(id.as_str())
}

fn synthesize_id(edge: &Edge, position: usize, used: &HashSet<String>) -> String {
    let base = format!("edge-{}-{}-{}", edge.source, edge.target, position);
    if !used.contains(&base) {
        return base;
    }
    (1..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or(base)
}

/// Strip placeholder handle values (`""`, `"null"`, `"undefined"`).
///
/// A placeholder becomes `None`, which is never serialized, so the surface
/// falls back to the node's default handle instead of failing the lookup.
pub fn normalize_handles(edges: &[Edge]) -> Vec<Edge> {
    edges
        .iter()
        .map(|edge| {
            let mut edge = edge.clone();
            edge.source_handle = clean_handle(edge.source_handle.take());
            edge.target_handle = clean_handle(edge.target_handle.take());
            edge
        })
        .collect()
}

fn clean_handle(handle: Option<String>) -> Option<String> {
    handle.filter(|h| !is_placeholder_handle(h))
}

/// Full pass used by the synchronizer: normalize handles, then sanitize
pub fn prepare_edges<N: GraphNode>(nodes: &[N], edges: &[Edge]) -> Vec<Edge> {
    sanitize_edges(nodes, &normalize_handles(edges))
}
