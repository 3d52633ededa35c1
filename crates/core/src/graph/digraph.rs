use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

/// A plain directed graph over arbitrary hashable vertices.
///
/// Used for per-key version orders, whose vertices are versions rather
/// than operations. The op-level multigraph lives in
/// [`DepGraph`](crate::graph::DepGraph).
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    adj: HashMap<T, HashSet<T>>,
}

impl<T> Default for DiGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    fn default() -> Self {
        Self {
            adj: HashMap::default(),
        }
    }
}

impl<T> DiGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    pub fn add_vertex(&mut self, v: T) {
        self.adj.entry(v).or_default();
    }

    pub fn add_edge(&mut self, source: T, target: T) {
        self.adj.entry(source).or_default().insert(target.clone());
        self.adj.entry(target).or_default();
    }

    pub fn remove_edge(&mut self, source: &T, target: &T) {
        if let Some(targets) = self.adj.get_mut(source) {
            targets.remove(target);
        }
    }

    #[must_use]
    pub fn has_edge(&self, source: &T, target: &T) -> bool {
        self.adj
            .get(source)
            .is_some_and(|targets| targets.contains(target))
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.adj.len()
    }

    pub fn successors(&self, source: &T) -> impl Iterator<Item = &T> {
        self.adj.get(source).into_iter().flatten()
    }

    /// Merge `other`'s edges into `self`; true if anything changed.
    pub fn union(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for (source, targets) in &other.adj {
            let entry = self.adj.entry(source.clone()).or_default();
            let before = entry.len();
            entry.extend(targets.iter().cloned());
            changed |= entry.len() != before;
        }
        changed
    }

    /// Kahn's algorithm. `None` means the graph has a cycle.
    #[must_use]
    pub fn topological_sort(&self) -> Option<Vec<T>> {
        let mut in_degree: HashMap<&T, usize> =
            self.adj.keys().map(|vertex| (vertex, 0)).collect();
        for targets in self.adj.values() {
            for target in targets {
                *in_degree.entry(target).or_insert(0) += 1;
            }
        }

        let mut queue: Vec<&T> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&vertex, _)| vertex)
            .collect();
        let mut order = Vec::with_capacity(self.adj.len());

        while let Some(vertex) = queue.pop() {
            order.push(vertex.clone());
            if let Some(targets) = self.adj.get(vertex) {
                for target in targets {
                    let deg = in_degree.get_mut(target).expect("all vertices counted");
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push(target);
                    }
                }
            }
        }

        (order.len() == self.adj.len()).then_some(order)
    }

    #[must_use]
    pub fn has_cycle(&self) -> bool {
        self.topological_sort().is_none()
    }

    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        !self.has_cycle()
    }

    /// An edge `(a, b)` lying on some cycle, or `None` if acyclic.
    ///
    /// Strips acyclic vertices with Kahn's algorithm; every surviving edge
    /// lies on a cycle. Requires `T: Ord` so the reported edge is the
    /// smallest such pair, keeping witnesses reproducible.
    #[must_use]
    pub fn find_cycle_edge(&self) -> Option<(T, T)>
    where
        T: Ord,
    {
        let mut in_degree: HashMap<&T, usize> =
            self.adj.keys().map(|vertex| (vertex, 0)).collect();
        for targets in self.adj.values() {
            for target in targets {
                *in_degree.entry(target).or_insert(0) += 1;
            }
        }

        let mut queue: Vec<&T> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&vertex, _)| vertex)
            .collect();
        let mut removed: HashSet<&T> = HashSet::new();

        while let Some(vertex) = queue.pop() {
            removed.insert(vertex);
            if let Some(targets) = self.adj.get(vertex) {
                for target in targets {
                    let deg = in_degree.get_mut(target).expect("all vertices counted");
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push(target);
                    }
                }
            }
        }

        self.adj
            .iter()
            .filter(|(source, _)| !removed.contains(source))
            .flat_map(|(source, targets)| {
                targets
                    .iter()
                    .filter(|target| !removed.contains(*target))
                    .map(move |target| (source.clone(), target.clone()))
            })
            .min()
    }

    /// All edges, sorted. Emission boundaries must not depend on hash
    /// iteration order.
    #[must_use]
    pub fn edges_sorted(&self) -> Vec<(T, T)>
    where
        T: Ord,
    {
        let mut edges: Vec<(T, T)> = self
            .adj
            .iter()
            .flat_map(|(source, targets)| {
                targets
                    .iter()
                    .map(move |target| (source.clone(), target.clone()))
            })
            .collect();
        edges.sort();
        edges
    }
}
