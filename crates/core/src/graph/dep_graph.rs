use hashbrown::HashMap;

use crate::graph::rel::{Rel, RelSet};

/// Linear builder for a [`DepGraph`].
///
/// Vertices are operation indexes, dense from 0. `link` is idempotent per
/// `(source, target, rel)`; relations between the same pair accumulate into
/// one edge. Edge iteration order is the insertion order, so everything
/// derived downstream is reproducible.
#[derive(Debug, Clone)]
pub struct DepGraphBuilder {
    adj: Vec<Vec<(u32, RelSet)>>,
    pos: HashMap<(u32, u32), u32>,
    edge_count: usize,
}

impl DepGraphBuilder {
    #[must_use]
    pub fn new(vertex_count: usize) -> Self {
        Self {
            adj: vec![Vec::new(); vertex_count],
            pos: HashMap::new(),
            edge_count: 0,
        }
    }

    /// Add `source -> target` tagged with `rel`.
    ///
    /// # Panics
    ///
    /// Self-edges violate an internal invariant of the extractors; the
    /// panic names the operation index.
    pub fn link(&mut self, source: u32, target: u32, rel: Rel) {
        self.link_set(source, target, RelSet::of(rel));
    }

    /// Add `source -> target` tagged with every relation in `rels`.
    pub fn link_set(&mut self, source: u32, target: u32, rels: RelSet) {
        assert!(source != target, "self-edge on op {source}");
        if rels.is_empty() {
            return;
        }
        match self.pos.entry((source, target)) {
            hashbrown::hash_map::Entry::Occupied(entry) => {
                let slot = &mut self.adj[source as usize][*entry.get() as usize];
                slot.1 = slot.1.union(rels);
            }
            hashbrown::hash_map::Entry::Vacant(entry) => {
                let row = &mut self.adj[source as usize];
                entry.insert(u32::try_from(row.len()).expect("edge count fits u32"));
                row.push((target, rels));
                self.edge_count += 1;
            }
        }
    }

    /// Freeze into an immutable graph, computing predecessor lists.
    #[must_use]
    pub fn freeze(self) -> DepGraph {
        let mut preds: Vec<Vec<u32>> = vec![Vec::new(); self.adj.len()];
        for (source, row) in self.adj.iter().enumerate() {
            for &(target, _) in row {
                preds[target as usize].push(u32::try_from(source).expect("vertex fits u32"));
            }
        }
        DepGraph {
            adj: self.adj,
            preds,
            pos: self.pos,
            edge_count: self.edge_count,
        }
    }
}

/// A frozen labeled directed multigraph over operation indexes.
///
/// Read-only once frozen and safe to share across checker threads.
#[derive(Debug, Clone, Default)]
pub struct DepGraph {
    adj: Vec<Vec<(u32, RelSet)>>,
    preds: Vec<Vec<u32>>,
    pos: HashMap<(u32, u32), u32>,
    edge_count: usize,
}

impl DepGraph {
    /// Number of vertices (the history length).
    #[must_use]
    pub fn len(&self) -> usize {
        self.adj.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    #[must_use]
    pub const fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Out-edges of `v`, in insertion order.
    #[must_use]
    pub fn out(&self, v: u32) -> &[(u32, RelSet)] {
        self.adj.get(v as usize).map_or(&[], Vec::as_slice)
    }

    /// In-neighbors of `v`.
    #[must_use]
    pub fn preds(&self, v: u32) -> &[u32] {
        self.preds.get(v as usize).map_or(&[], Vec::as_slice)
    }

    /// Relations on the edge `source -> target`; empty if absent.
    #[must_use]
    pub fn rels(&self, source: u32, target: u32) -> RelSet {
        self.pos
            .get(&(source, target))
            .map_or(RelSet::EMPTY, |&i| self.adj[source as usize][i as usize].1)
    }

    #[must_use]
    pub fn has_edge(&self, source: u32, target: u32) -> bool {
        self.pos.contains_key(&(source, target))
    }

    /// The sub-graph of edges bearing at least one relation in `mask`,
    /// with labels restricted to `mask`.
    #[must_use]
    pub fn project(&self, mask: RelSet) -> Self {
        let mut builder = DepGraphBuilder::new(self.len());
        for (source, row) in self.adj.iter().enumerate() {
            let source = u32::try_from(source).expect("vertex fits u32");
            for &(target, rels) in row {
                let kept = rels.intersect(mask);
                if !kept.is_empty() {
                    builder.link_set(source, target, kept);
                }
            }
        }
        builder.freeze()
    }

    /// The sub-graph with the relations in `mask` removed.
    #[must_use]
    pub fn without(&self, mask: RelSet) -> Self {
        let keep: RelSet = Rel::ALL
            .into_iter()
            .filter(|r| !mask.contains(*r))
            .collect();
        self.project(keep)
    }

    /// Merge two graphs over the same vertex space.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut builder = DepGraphBuilder::new(self.len().max(other.len()));
        for graph in [self, other] {
            for (source, row) in graph.adj.iter().enumerate() {
                let source = u32::try_from(source).expect("vertex fits u32");
                for &(target, rels) in row {
                    builder.link_set(source, target, rels);
                }
            }
        }
        builder.freeze()
    }

    /// Contract every vertex failing `keep`, linking each kept predecessor
    /// directly to each kept successor reachable through contracted
    /// vertices. Kept vertices are never traversed through. The collapsed
    /// edge carries the union of relations along the discovery path.
    pub fn collapse(&self, keep: impl Fn(u32) -> bool) -> Self {
        let n = self.len();
        let mut builder = DepGraphBuilder::new(n);
        let mut visited = vec![false; n];

        for source in 0..n {
            let source = u32::try_from(source).expect("vertex fits u32");
            if !keep(source) {
                continue;
            }
            visited.iter_mut().for_each(|v| *v = false);
            let mut queue: std::collections::VecDeque<(u32, RelSet)> =
                self.out(source).iter().copied().collect();
            while let Some((v, rels)) = queue.pop_front() {
                if keep(v) {
                    if v != source {
                        builder.link_set(source, v, rels);
                    }
                    continue;
                }
                if visited[v as usize] {
                    continue;
                }
                visited[v as usize] = true;
                for &(w, edge_rels) in self.out(v) {
                    queue.push_back((w, rels.union(edge_rels)));
                }
            }
        }
        builder.freeze()
    }

    /// All edges in deterministic order, mostly for tests and debugging.
    #[must_use]
    pub fn edges(&self) -> Vec<(u32, u32, RelSet)> {
        self.adj
            .iter()
            .enumerate()
            .flat_map(|(source, row)| {
                let source = u32::try_from(source).expect("vertex fits u32");
                row.iter().map(move |&(target, rels)| (source, target, rels))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(u32, u32, Rel)]) -> DepGraph {
        let n = edges
            .iter()
            .map(|&(a, b, _)| a.max(b) + 1)
            .max()
            .unwrap_or(0) as usize;
        let mut builder = DepGraphBuilder::new(n);
        for &(a, b, rel) in edges {
            builder.link(a, b, rel);
        }
        builder.freeze()
    }

    #[test]
    fn link_is_idempotent_and_labels_union() {
        let mut builder = DepGraphBuilder::new(3);
        builder.link(0, 1, Rel::Ww);
        builder.link(0, 1, Rel::Ww);
        builder.link(0, 1, Rel::Wr);
        let g = builder.freeze();
        assert_eq!(g.edge_count(), 1);
        assert_eq!(
            g.rels(0, 1),
            [Rel::Ww, Rel::Wr].into_iter().collect::<RelSet>()
        );
    }

    #[test]
    #[should_panic(expected = "self-edge on op 2")]
    fn self_edges_are_rejected() {
        let mut builder = DepGraphBuilder::new(3);
        builder.link(2, 2, Rel::Ww);
    }

    #[test]
    fn freeze_iteration_matches_insertion_order() {
        let g = graph(&[(0, 2, Rel::Ww), (0, 1, Rel::Wr), (1, 2, Rel::Rw)]);
        assert_eq!(
            g.edges(),
            vec![
                (0, 2, RelSet::of(Rel::Ww)),
                (0, 1, RelSet::of(Rel::Wr)),
                (1, 2, RelSet::of(Rel::Rw)),
            ]
        );
        assert_eq!(g.preds(2), &[0, 1]);
    }

    #[test]
    fn project_restricts_edges_and_labels() {
        let mut builder = DepGraphBuilder::new(3);
        builder.link(0, 1, Rel::Ww);
        builder.link(0, 1, Rel::Process);
        builder.link(1, 2, Rel::Process);
        let g = builder.freeze();

        let data = g.project(RelSet::DATA);
        assert_eq!(data.edge_count(), 1);
        assert_eq!(data.rels(0, 1), RelSet::of(Rel::Ww));
        assert!(!data.has_edge(1, 2));

        let order = g.without(RelSet::DATA);
        assert_eq!(order.edge_count(), 2);
        assert_eq!(order.rels(0, 1), RelSet::of(Rel::Process));
    }

    #[test]
    fn union_merges_labels() {
        let a = graph(&[(0, 1, Rel::Ww)]);
        let b = graph(&[(0, 1, Rel::Wr), (1, 0, Rel::Rw)]);
        let u = a.union(&b);
        assert_eq!(
            u.rels(0, 1),
            [Rel::Ww, Rel::Wr].into_iter().collect::<RelSet>()
        );
        assert!(u.has_edge(1, 0));
    }

    #[test]
    fn collapse_preserves_reachability() {
        // 0 -> 1 -> 2 -> 3 with 1, 2 contracted: expect 0 -> 3.
        let g = graph(&[
            (0, 1, Rel::Process),
            (1, 2, Rel::Process),
            (2, 3, Rel::Process),
        ]);
        let c = g.collapse(|v| v == 0 || v == 3);
        assert!(c.has_edge(0, 3));
        assert_eq!(c.edge_count(), 1);
        assert_eq!(c.rels(0, 3), RelSet::of(Rel::Process));
    }

    #[test]
    fn collapse_does_not_tunnel_through_kept_vertices() {
        // 0 -> 1 -> 2, all kept: no 0 -> 2 shortcut.
        let g = graph(&[(0, 1, Rel::Process), (1, 2, Rel::Process)]);
        let c = g.collapse(|_| true);
        assert!(c.has_edge(0, 1));
        assert!(c.has_edge(1, 2));
        assert!(!c.has_edge(0, 2));
    }
}
