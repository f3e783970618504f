/*
 * SPDX-FileCopyrightText: 2025 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::Partition;
use crate::graph::RootedGraph;
use dsi_progress_logger::ProgressLog;
use sux::bits::BitVec;

const UNVISITED: usize = usize::MAX;

/// Tarjan's algorithm for strongly connected components.
///
/// The visit starts from the nodes flagged as roots, so the partition covers
/// exactly the nodes reachable from them, like the
/// [parallel decomposition](super::par_uf) does. The implementation is
/// iterative and uses an explicit stack of arc cursors, so it is safe on
/// arbitrarily deep visit paths.
pub fn tarjan(graph: &impl RootedGraph, pl: &mut impl ProgressLog) -> Partition {
    let num_nodes = graph.num_nodes();
    pl.item_name("node");
    pl.expected_updates(Some(num_nodes));
    pl.start("Computing strongly connected components...");

    let mut index = vec![UNVISITED; num_nodes].into_boxed_slice();
    let mut low = vec![0; num_nodes].into_boxed_slice();
    let mut on_stack = BitVec::new(num_nodes);
    let mut component_stack = Vec::with_capacity(16);
    let mut components = vec![];
    let mut next_index = 0;
    // Entries on this stack are pairs of a node on the visit path and the
    // position of the next arc to scan.
    let mut stack: Vec<(usize, usize)> = Vec::with_capacity(16);

    for root in 0..num_nodes {
        if !graph.is_root(root) || index[root] != UNVISITED {
            continue;
        }
        index[root] = next_index;
        low[root] = next_index;
        next_index += 1;
        component_stack.push(root);
        on_stack.set(root, true);
        pl.light_update();
        stack.push((root, 0));

        'recurse: while let Some(top) = stack.last_mut() {
            let node = top.0;
            let arcs = graph.successors(node);
            while top.1 < arcs.len() {
                let succ = arcs[top.1].to();
                top.1 += 1;
                if index[succ] == UNVISITED {
                    index[succ] = next_index;
                    low[succ] = next_index;
                    next_index += 1;
                    component_stack.push(succ);
                    on_stack.set(succ, true);
                    pl.light_update();
                    stack.push((succ, 0));
                    continue 'recurse;
                } else if on_stack.get(succ) && index[succ] < low[node] {
                    low[node] = index[succ];
                }
            }

            stack.pop();
            if let Some(parent) = stack.last_mut() {
                if low[node] < low[parent.0] {
                    low[parent.0] = low[node];
                }
            }
            if low[node] == index[node] {
                // The node leads its component
                let mut component = vec![];
                loop {
                    // The component stack holds at least the current node
                    let member = component_stack.pop().unwrap();
                    on_stack.set(member, false);
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                components.push(component);
            }
        }
    }

    pl.done();
    Partition::from_components(components)
}
