//! Cycle search and classification over the combined dependency graph.
//!
//! Dependency anomalies (G0, G1c, G-single, G2) are searched inside each
//! strongly connected component of the ww/wr/rw projection, using
//! first-edge-constrained searches to prove the characteristic edge of
//! each class is really present. The found cycle is then classified by
//! the multiset of relations on its edges, taking the weakest
//! interpretation of every edge, so a subsumed class is always reported
//! in place of a subsuming one for the same witness.
//!
//! Ordering violations are cycles of process/realtime/per-key edges only:
//! some operation observed a state that contradicts the order the
//! operations demonstrably ran in.

use std::collections::BTreeSet;

use crate::checker::anomaly::{Anomaly, AnomalyKind, CycleStep, CycleWitness, Evidence};
use crate::checker::compose::CheckCtx;
use crate::graph::{find_cycle, find_cycle_with_first, sccs, DepGraph, Rel, RelSet};
use crate::txn::EvidenceMap;

/// Classify a closed cycle by the relations on its edges.
fn classify(graph: &DepGraph, cycle: &[u32]) -> AnomalyKind {
    let mut ww = 0usize;
    let mut wr = 0usize;
    let mut rw = 0usize;
    let mut other = 0usize;
    for pair in cycle.windows(2) {
        match graph.rels(pair[0], pair[1]).primary() {
            Some(Rel::Ww) => ww += 1,
            Some(Rel::Wr) => wr += 1,
            Some(Rel::Rw) => rw += 1,
            _ => other += 1,
        }
    }
    if ww + wr + rw == 0 {
        AnomalyKind::RealtimeViolation
    } else if rw >= 2 {
        AnomalyKind::G2
    } else if rw == 1 {
        AnomalyKind::GSingle
    } else if wr >= 1 {
        AnomalyKind::G1c
    } else {
        AnomalyKind::G0
    }
}

/// Turn a closed vertex sequence into a witness with per-edge evidence.
fn witness(
    graph: &DepGraph,
    evidence: &EvidenceMap,
    kind: AnomalyKind,
    cycle: &[u32],
) -> CycleWitness {
    let steps = cycle
        .windows(2)
        .map(|pair| {
            let rel = graph
                .rels(pair[0], pair[1])
                .primary()
                .expect("cycle edges exist in the graph");
            CycleStep {
                from: pair[0] as usize,
                to: pair[1] as usize,
                rel,
                evidence: evidence
                    .get(&(pair[0], pair[1], rel))
                    .cloned()
                    .unwrap_or(Evidence::Unlabeled),
            }
        })
        .collect();
    CycleWitness { kind, steps }
}

/// Search the combined graph for every requested cycle anomaly.
///
/// Sets `timed_out` and returns the partial findings if the deadline
/// expires mid-search.
#[must_use]
pub fn cycle_anomalies(
    graph: &DepGraph,
    requested: &BTreeSet<AnomalyKind>,
    evidence: &EvidenceMap,
    ctx: &CheckCtx,
    timed_out: &mut bool,
) -> Vec<Anomaly> {
    if ctx.expired() {
        *timed_out = true;
        return Vec::new();
    }

    let data = graph.project(RelSet::DATA);
    let ww = graph.project(RelSet::of(Rel::Ww));
    let wr = graph.project(RelSet::of(Rel::Wr));
    let rw = graph.project(RelSet::of(Rel::Rw));
    let ww_wr = graph.project(RelSet::of(Rel::Ww).union(RelSet::of(Rel::Wr)));

    let mut found: Vec<Anomaly> = Vec::new();
    let mut seen: BTreeSet<(AnomalyKind, Vec<u32>)> = BTreeSet::new();

    let components = sccs(&data);
    tracing::debug!(
        components = components.len(),
        edges = data.edge_count(),
        "searching dependency cycles"
    );

    for scc in &components {
        if ctx.expired() {
            *timed_out = true;
            break;
        }

        let mut candidates: Vec<Vec<u32>> = Vec::new();
        if requested.contains(&AnomalyKind::G0) {
            candidates.extend(find_cycle(&ww, scc));
        }
        if requested.contains(&AnomalyKind::G1c) {
            candidates.extend(find_cycle_with_first(&wr, &ww_wr, scc));
        }
        if requested.contains(&AnomalyKind::GSingle) {
            candidates.extend(find_cycle_with_first(&rw, &ww_wr, scc));
        }
        if requested.contains(&AnomalyKind::G2) {
            candidates.extend(find_cycle_with_first(&rw, &data, scc));
        }
        // A component that cycles only through relations weaker than the
        // requested classes still witnesses *some* dependency cycle; fall
        // back to the unconstrained search so the report is never empty.
        if candidates.is_empty() {
            candidates.extend(find_cycle(&data, scc));
        }

        for cycle in candidates {
            let kind = classify(graph, &cycle);
            if !requested.contains(&kind) {
                continue;
            }
            if seen.insert((kind, cycle.clone())) {
                found.push(Anomaly::Cycle(witness(graph, evidence, kind, &cycle)));
            }
        }
    }

    // Pure ordering cycles: no data dependency involved.
    if requested.contains(&AnomalyKind::RealtimeViolation) && !*timed_out {
        let order = graph.project(RelSet::ORDER);
        for scc in sccs(&order) {
            if ctx.expired() {
                *timed_out = true;
                break;
            }
            if let Some(cycle) = find_cycle(&order, &scc) {
                let kind = AnomalyKind::RealtimeViolation;
                if seen.insert((kind, cycle.clone())) {
                    found.push(Anomaly::Cycle(witness(graph, evidence, kind, &cycle)));
                }
            }
        }
    }

    found
}
