/*
 * SPDX-FileCopyrightText: 2025 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::graph::RootedGraph;
use crate::uf::{ClaimStatus, UnionFind};
use dashmap::DashMap;
use dsi_progress_logger::ProgressLog;

/// A depth-first search task rooted at a single unexplored node.
///
/// The worker keeps an explicit stack of frames, one per component on its
/// visit path. A frame repeatedly picks a live member of its component from
/// the work list and scans the member's arcs, claiming each target:
/// * a dead target is an arc into an already emitted component and is
///   discarded;
/// * a first visit pushes a new frame;
/// * a target already claimed by this worker closes a cycle, and the frames
///   on the path down to the target's component are united into one.
///
/// A member whose arcs are exhausted is removed from the work list and
/// marked as fully explored. When the work list itself is exhausted the
/// component is maximal: the worker that performs the dead transition walks
/// the membership ring and inserts the finished component into the shared
/// result map, exactly once.
///
/// Workers cooperate freely on the same component: arcs are partitioned
/// between them by the traversal flags, and unions merge ownership across
/// workers. No worker owns a component except at the instant it is emitted.
pub(crate) struct Worker<'a, G> {
    graph: &'a G,
    uf: &'a UnionFind,
    sccs: &'a DashMap<usize, Vec<usize>>,
    worker: usize,
}

struct Frame {
    node: usize,
    scan: Option<Scan>,
}

/// Cursor over the arcs of a member picked from the work list.
#[derive(Clone, Copy)]
struct Scan {
    member: usize,
    next_arc: usize,
}

impl<'a, G: RootedGraph> Worker<'a, G> {
    pub(crate) fn new(
        graph: &'a G,
        uf: &'a UnionFind,
        sccs: &'a DashMap<usize, Vec<usize>>,
        worker: usize,
    ) -> Self {
        Self {
            graph,
            uf,
            sccs,
            worker,
        }
    }

    pub(crate) fn run(&self, root: usize, pl: &mut impl ProgressLog) {
        if self.uf.make_claim(root, self.worker) == ClaimStatus::Dead {
            return;
        }
        let mut stack = vec![Frame {
            node: root,
            scan: None,
        }];

        'search: while !stack.is_empty() {
            let top = stack.len() - 1;
            let node = stack[top].node;

            if stack[top].scan.is_none() {
                match self.uf.pick_from_list(node) {
                    Some(member) => {
                        stack[top].scan = Some(Scan {
                            member,
                            next_arc: 0,
                        })
                    }
                    None => {
                        // Every member is fully explored: the component is
                        // maximal, and the dead transition elects the
                        // harvesting worker.
                        if self.uf.mark_dead(node) {
                            let repr = self.uf.find(node);
                            self.sccs.insert(repr, self.uf.members(repr));
                        }
                        stack.pop();
                        continue 'search;
                    }
                }
            }

            loop {
                // The scan is set above and replaced only on this path
                let Scan { member, next_arc } = stack[top].scan.unwrap();
                let arcs = self.graph.successors(member);
                if next_arc >= arcs.len() {
                    break;
                }
                stack[top].scan = Some(Scan {
                    member,
                    next_arc: next_arc + 1,
                });
                let arc = &arcs[next_arc];
                if !arc.try_traverse() {
                    // Another worker is already walking this arc
                    continue;
                }
                match self.uf.make_claim(arc.to(), self.worker) {
                    ClaimStatus::Dead => {}
                    ClaimStatus::Success => {
                        stack.push(Frame {
                            node: arc.to(),
                            scan: None,
                        });
                        continue 'search;
                    }
                    ClaimStatus::Found => {
                        // A cycle: unite the components on the visit path
                        // until the top one contains the target.
                        let target = arc.to();
                        while !self.uf.same_set(stack.last().unwrap().node, target) {
                            let popped = stack.pop().unwrap();
                            // A live component claimed by this worker always
                            // intersects the remaining visit path, so the
                            // stack cannot empty before the loop stops.
                            let below = stack.last().unwrap().node;
                            self.uf.unite(popped.node, below);
                        }
                        if stack.len() != top + 1 {
                            // Frames collapsed; resume the merged one. The
                            // members they were scanning stay live in the
                            // work list and will be picked again.
                            continue 'search;
                        }
                    }
                }
            }

            // The member's arcs are exhausted: retire it from the work list.
            let member = stack[top].scan.take().unwrap().member;
            if self.uf.remove_from_list(member) {
                self.graph.set_explored(member);
                pl.light_update();
            }
        }
    }
}
