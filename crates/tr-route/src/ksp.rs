//! Yen's K-shortest simple paths.
//!
//! Standard Yen over the Dijkstra core: for each accepted path, every
//! prefix becomes a *root*; the edges that previously-accepted paths take
//! out of that root are banned and a spur path is searched from the root's
//! last vertex.  Root vertices are banned from the spur so composite paths
//! stay simple.
//!
//! Candidates are kept in a sorted pool ordered by (length, edge ids), so
//! equal-length alternatives are returned in a deterministic order.

use rustc_hash::FxHashSet;

use tr_core::VertexId;

use crate::dijkstra::{Dijkstra, GraphPath};

/// Up to `k` shortest simple paths from `from` to `to`, in non-decreasing
/// length order.  Returns an empty vec when the vertices are disconnected.
pub fn k_shortest_paths(
    dij: &Dijkstra<'_>,
    from: VertexId,
    to: VertexId,
    k: usize,
) -> Vec<GraphPath> {
    let Some(first) = dij.shortest_path(from, to) else {
        return Vec::new();
    };
    if k <= 1 || first.edges.is_empty() {
        return vec![first];
    }
    let graph = dij.graph();

    let mut accepted: Vec<GraphPath> = vec![first];
    let mut candidates: Vec<GraphPath> = Vec::new();

    while accepted.len() < k {
        let prev = accepted[accepted.len() - 1].clone();

        for spur_idx in 0..prev.vertices.len() - 1 {
            let spur_node = prev.vertices[spur_idx];
            let root_vertices = &prev.vertices[..=spur_idx];
            let root_edges = &prev.edges[..spur_idx];

            // Ban the frontier edge of every accepted path sharing this root.
            let mut banned_edges = FxHashSet::default();
            for p in &accepted {
                if p.edges.len() > spur_idx && p.edges[..spur_idx] == *root_edges {
                    banned_edges.insert(p.edges[spur_idx]);
                }
            }
            // Ban root-interior vertices so the spur cannot re-enter the root.
            let banned_vertices: FxHashSet<VertexId> =
                root_vertices[..spur_idx].iter().copied().collect();

            let Some(spur) =
                dij.shortest_path_with_bans(spur_node, to, &banned_edges, &banned_vertices)
            else {
                continue;
            };
            if spur.edges.is_empty() {
                continue;
            }

            let root_len: f64 = root_edges
                .iter()
                .map(|e| graph.edge_length_km[e.index()])
                .sum();
            let root = GraphPath {
                vertices:  root_vertices.to_vec(),
                edges:     root_edges.to_vec(),
                length_km: root_len,
            };
            let total = root.join(&spur);

            if !accepted.iter().any(|p| p.edges == total.edges)
                && !candidates.iter().any(|p| p.edges == total.edges)
            {
                candidates.push(total);
            }
        }

        if candidates.is_empty() {
            break;
        }
        candidates.sort_by(|a, b| {
            a.length_km
                .total_cmp(&b.length_km)
                .then_with(|| a.edges.cmp(&b.edges))
        });
        accepted.push(candidates.remove(0));
    }

    accepted
}
