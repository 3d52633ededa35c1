//! Shortest-cycle search inside a strongly connected component.
//!
//! Short witnesses are easier to explain, so both searches are BFS by path
//! length. Ties break to the lowest start vertex, then to edge insertion
//! order, which keeps reported cycles byte-identical across runs.

use crate::graph::dep_graph::DepGraph;

/// Marker for vertices inside the component under search.
fn membership(n: usize, scc: &[u32]) -> Vec<bool> {
    let mut member = vec![false; n];
    for &v in scc {
        member[v as usize] = true;
    }
    member
}

/// Shortest path `from -> .. -> to` inside `member`, as the list of
/// intermediate vertices (empty when a direct edge exists). `None` when
/// `to` is unreachable.
fn shortest_path(graph: &DepGraph, member: &[bool], from: u32, to: u32) -> Option<Vec<u32>> {
    const UNSET: u32 = u32::MAX;
    if graph.has_edge(from, to) {
        return Some(Vec::new());
    }
    let mut parent = vec![UNSET; member.len()];
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(from);
    parent[from as usize] = from;
    while let Some(u) = queue.pop_front() {
        for &(w, _) in graph.out(u) {
            if w == to {
                // Reconstruct from -> .. -> u.
                let mut path = vec![u];
                let mut cursor = u;
                while cursor != from {
                    cursor = parent[cursor as usize];
                    path.push(cursor);
                }
                path.pop(); // drop `from` itself
                path.reverse();
                return Some(path);
            }
            if member[w as usize] && parent[w as usize] == UNSET {
                parent[w as usize] = u;
                queue.push_back(w);
            }
        }
    }
    None
}

/// A shortest cycle within `scc`, returned closed: `[v0, .., vk, v0]`.
///
/// `scc` must be sorted ascending (as produced by
/// [`sccs`](crate::graph::tarjan::sccs)); the search starts from each
/// member in that order so length ties resolve to the lowest start index.
#[must_use]
pub fn find_cycle(graph: &DepGraph, scc: &[u32]) -> Option<Vec<u32>> {
    let member = membership(graph.len(), scc);
    let mut best: Option<Vec<u32>> = None;
    for &start in scc {
        if let Some(path) = shortest_path(graph, &member, start, start) {
            let mut cycle = Vec::with_capacity(path.len() + 2);
            cycle.push(start);
            cycle.extend(path);
            cycle.push(start);
            let shorter = best.as_ref().is_none_or(|b| cycle.len() < b.len());
            if shorter {
                let len = cycle.len();
                best = Some(cycle);
                // A two-edge cycle cannot be beaten.
                if len == 3 {
                    break;
                }
            }
        }
    }
    best
}

/// A shortest cycle whose first edge is drawn from `first` and whose
/// remaining edges are drawn from `rest`.
///
/// Used to prove an anomaly requires a specific edge type: a G1c witness
/// must contain a write-read edge, a G-single witness exactly one
/// anti-dependency edge, and so on.
#[must_use]
pub fn find_cycle_with_first(
    first: &DepGraph,
    rest: &DepGraph,
    scc: &[u32],
) -> Option<Vec<u32>> {
    let member = membership(first.len().max(rest.len()), scc);
    let mut best: Option<Vec<u32>> = None;
    for &start in scc {
        for &(mid, _) in first.out(start) {
            if !member[mid as usize] {
                continue;
            }
            let Some(path) = shortest_path(rest, &member, mid, start) else {
                continue;
            };
            let mut cycle = Vec::with_capacity(path.len() + 3);
            cycle.push(start);
            cycle.push(mid);
            cycle.extend(path);
            cycle.push(start);
            if best.as_ref().is_none_or(|b| cycle.len() < b.len()) {
                best = Some(cycle);
            }
        }
        // Within one start, candidates arrived in insertion order; across
        // starts, the ascending scan fixes ties. Minimal possible length
        // short-circuits the rest of the component.
        if best.as_ref().is_some_and(|b| b.len() == 3) {
            break;
        }
    }
    best
}
