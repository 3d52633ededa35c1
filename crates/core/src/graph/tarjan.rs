//! Iterative Tarjan strongly-connected-components over a [`DepGraph`].
//!
//! A single depth-first pass in O(V+E). The implementation is iterative
//! with an explicit frame stack: dependency graphs of long histories can
//! chain thousands of operations, and a recursive walk would overflow.
//!
//! Determinism: roots are visited in ascending vertex order and neighbors
//! in edge insertion order, so the component list is a fixed function of
//! the builder's insertion sequence. Components are returned sorted by
//! their smallest member, each with members ascending.

use crate::graph::dep_graph::DepGraph;

const UNSET: u32 = u32::MAX;

/// All non-trivial strongly connected components (size >= 2; self-edges
/// are forbidden upstream, so singleton components never witness cycles).
#[must_use]
pub fn sccs(graph: &DepGraph) -> Vec<Vec<u32>> {
    let n = graph.len();
    let mut index = vec![UNSET; n];
    let mut lowlink = vec![0u32; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<u32> = Vec::new();
    let mut next_index = 0u32;
    let mut components: Vec<Vec<u32>> = Vec::new();

    // (vertex, position in its out-edge list)
    let mut frames: Vec<(u32, usize)> = Vec::new();

    for root in 0..n {
        let root = u32::try_from(root).expect("vertex fits u32");
        if index[root as usize] != UNSET {
            continue;
        }

        index[root as usize] = next_index;
        lowlink[root as usize] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root as usize] = true;
        frames.push((root, 0));

        while let Some(frame) = frames.last_mut() {
            let v = frame.0;
            if let Some(&(w, _)) = graph.out(v).get(frame.1) {
                frame.1 += 1;
                if index[w as usize] == UNSET {
                    index[w as usize] = next_index;
                    lowlink[w as usize] = next_index;
                    next_index += 1;
                    stack.push(w);
                    on_stack[w as usize] = true;
                    frames.push((w, 0));
                } else if on_stack[w as usize] {
                    lowlink[v as usize] = lowlink[v as usize].min(index[w as usize]);
                }
            } else {
                frames.pop();
                if let Some(&mut (parent, _)) = frames.last_mut() {
                    lowlink[parent as usize] = lowlink[parent as usize].min(lowlink[v as usize]);
                }
                if lowlink[v as usize] == index[v as usize] {
                    let mut component = Vec::new();
                    while let Some(w) = stack.pop() {
                        on_stack[w as usize] = false;
                        component.push(w);
                        if w == v {
                            break;
                        }
                    }
                    if component.len() >= 2 {
                        component.sort_unstable();
                        components.push(component);
                    }
                }
            }
        }
    }

    components.sort_by_key(|c| c[0]);
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::dep_graph::DepGraphBuilder;
    use crate::graph::rel::Rel;

    fn graph(n: usize, edges: &[(u32, u32)]) -> DepGraph {
        let mut builder = DepGraphBuilder::new(n);
        for &(a, b) in edges {
            builder.link(a, b, Rel::Ww);
        }
        builder.freeze()
    }

    #[test]
    fn acyclic_graph_has_no_components() {
        let g = graph(4, &[(0, 1), (1, 2), (2, 3), (0, 3)]);
        assert!(sccs(&g).is_empty());
    }

    #[test]
    fn two_cycle() {
        let g = graph(3, &[(0, 1), (1, 0)]);
        assert_eq!(sccs(&g), vec![vec![0, 1]]);
    }

    #[test]
    fn nested_and_disjoint_components() {
        // 0 -> 1 -> 2 -> 0 and 3 -> 4 -> 3, bridged 2 -> 3.
        let g = graph(5, &[(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 3)]);
        assert_eq!(sccs(&g), vec![vec![0, 1, 2], vec![3, 4]]);
    }

    #[test]
    fn long_chain_cycle_does_not_overflow() {
        let n = 50_000u32;
        let edges: Vec<(u32, u32)> = (0..n).map(|i| (i, (i + 1) % n)).collect();
        let g = graph(n as usize, &edges);
        let components = sccs(&g);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].len(), n as usize);
    }

    #[test]
    fn component_order_is_by_smallest_member() {
        let g = graph(6, &[(4, 5), (5, 4), (1, 2), (2, 1)]);
        assert_eq!(sccs(&g), vec![vec![1, 2], vec![4, 5]]);
    }
}
