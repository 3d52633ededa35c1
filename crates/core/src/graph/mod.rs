//! Graph kernel: the typed dependency multigraph over operations, its
//! cycle machinery, and a plain directed graph for version orders.

pub mod cycle;
pub mod dep_graph;
pub mod digraph;
pub mod rel;
pub mod tarjan;

pub use cycle::{find_cycle, find_cycle_with_first};
pub use dep_graph::{DepGraph, DepGraphBuilder};
pub use digraph::DiGraph;
pub use rel::{Rel, RelSet};
pub use tarjan::sccs;
