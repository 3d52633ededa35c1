//! Dependency-edge emission: write-read edges from observations, and
//! write-write / read-write edges from the merged version orders.

use crate::checker::anomaly::Evidence;
use crate::graph::{DepGraphBuilder, Rel};
use crate::history::Version;
use crate::txn::index::TxnIndex;
use crate::txn::version_order::VersionOrders;
use crate::txn::EvidenceMap;

/// For each `(key, version)` read by `T2` and written by `T1`, add
/// `T1 -wr-> T2`. Reads of the initial state have no writer and emit
/// nothing here; they surface as anti-dependencies instead.
pub fn link_wr(builder: &mut DepGraphBuilder, evidence: &mut EvidenceMap, index: &TxnIndex) {
    for (key, key_index) in &index.keys {
        for read in &key_index.reads {
            let Version::Val(version) = read.value.version() else {
                continue;
            };
            let Some(writers) = key_index.writers.get(&version) else {
                continue;
            };
            for &writer in writers {
                if writer == read.op {
                    continue;
                }
                builder.link(writer, read.op, Rel::Wr);
                evidence
                    .entry((writer, read.op, Rel::Wr))
                    .or_insert_with(|| Evidence::WriteRead {
                        key: key.clone(),
                        version,
                    });
            }
        }
    }
}

/// For each version-order edge `v1 -> v2` on a key: every writer of `v1`
/// write-write-precedes every writer of `v2`, and every reader of `v1`
/// read-write-precedes every writer of `v2`.
///
/// Read-read edges are never emitted; any rr relation is implied by
/// wr-compose-ww or wr-compose-rw.
pub fn link_ww_rw(
    builder: &mut DepGraphBuilder,
    evidence: &mut EvidenceMap,
    index: &TxnIndex,
    orders: &VersionOrders,
) {
    for (key, edges) in &orders.per_key {
        let Some(key_index) = index.keys.get(key) else {
            continue;
        };
        for &(v1, v2) in edges {
            let Version::Val(next) = v2 else {
                continue; // nothing precedes the initial state
            };
            let Some(next_writers) = key_index.writers.get(&next) else {
                continue;
            };

            if let Version::Val(prev) = v1 {
                if let Some(prev_writers) = key_index.writers.get(&prev) {
                    for &a in prev_writers {
                        for &b in next_writers {
                            if a != b {
                                builder.link(a, b, Rel::Ww);
                                evidence.entry((a, b, Rel::Ww)).or_insert_with(|| {
                                    Evidence::WriteWrite {
                                        key: key.clone(),
                                        v1,
                                        v2,
                                    }
                                });
                            }
                        }
                    }
                }
            }

            if let Some(readers) = key_index.readers.get(&v1) {
                for &r in readers {
                    for &b in next_writers {
                        if r != b {
                            builder.link(r, b, Rel::Rw);
                            evidence.entry((r, b, Rel::Rw)).or_insert_with(|| {
                                Evidence::ReadWrite {
                                    key: key.clone(),
                                    v1,
                                    v2,
                                }
                            });
                        }
                    }
                }
            }
        }
    }
}
