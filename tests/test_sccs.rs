/*
 * SPDX-FileCopyrightText: 2025 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use dsi_progress_logger::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use ufscc::graph::{RootedGraph, VecGraph};
use ufscc::sccs;
use ufscc::thread_pool;
use ufscc::uf::MAX_WORKERS;

/// Nodes reachable from the flagged roots, by a plain sequential sweep.
fn reachable(graph: &VecGraph) -> HashSet<usize> {
    let mut seen: HashSet<usize> = (0..graph.num_nodes())
        .filter(|&node| graph.is_root(node))
        .collect();
    let mut queue: Vec<usize> = seen.iter().copied().collect();
    while let Some(node) = queue.pop() {
        for arc in graph.successors(node) {
            if seen.insert(arc.to()) {
                queue.push(arc.to());
            }
        }
    }
    seen
}

fn random_graph(rng: &mut SmallRng, num_nodes: usize, max_outdegree: usize) -> VecGraph {
    let mut graph = VecGraph::empty(num_nodes);
    for u in 0..num_nodes {
        for _ in 0..rng.random_range(0..=max_outdegree) {
            graph.add_arc(u, rng.random_range(0..num_nodes));
        }
    }
    graph
}

#[test]
fn test_two_pairs() -> Result<()> {
    let graph = VecGraph::from_arcs([(0, 1), (0, 0), (1, 0), (1, 2), (2, 3), (3, 2)]);

    let partition = sccs::par_uf(&graph, &thread_pool![4], no_logging![])?;

    assert_eq!(partition.num_components(), 2);
    assert_eq!(partition.components(), vec![vec![0, 1], vec![2, 3]]);

    Ok(())
}

#[test]
fn test_mutually_connected_triple() -> Result<()> {
    let mut graph = VecGraph::empty(3);
    for u in 0..3 {
        for v in 0..3 {
            graph.add_arc(u, v);
        }
    }

    let partition = sccs::par_uf(&graph, &thread_pool![4], no_logging![])?;

    assert_eq!(partition.components(), vec![vec![0, 1, 2]]);

    Ok(())
}

#[test]
fn test_ring() -> Result<()> {
    let graph = VecGraph::from_arcs([(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0)]);

    let partition = sccs::par_uf(&graph, &thread_pool![4], no_logging![])?;

    assert_eq!(partition.components(), vec![vec![0, 1, 2, 3, 4, 5]]);

    Ok(())
}

#[test]
fn test_bowtie() -> Result<()> {
    let graph = VecGraph::from_arcs([(0, 2), (1, 2), (2, 3), (2, 4), (3, 0), (4, 1)]);

    let partition = sccs::par_uf(&graph, &thread_pool![4], no_logging![])?;

    assert_eq!(partition.components(), vec![vec![0, 1, 2, 3, 4]]);

    Ok(())
}

#[test]
fn test_star_with_side_cycle() -> Result<()> {
    // 0 and 1 point at the center 2; 2 points at 3 and 4; 3 closes a cycle
    // back to 0, while 4 has no way back.
    let graph = VecGraph::from_arcs([(0, 2), (1, 2), (2, 3), (2, 4), (3, 0)]);

    let partition = sccs::par_uf(&graph, &thread_pool![4], no_logging![])?;

    assert_eq!(partition.components(), vec![vec![0, 2, 3], vec![1], vec![4]]);

    Ok(())
}

#[test]
fn test_self_loop_singleton() -> Result<()> {
    let graph = VecGraph::from_arcs([(0, 0)]);

    let partition = sccs::par_uf(&graph, &thread_pool![2], no_logging![])?;

    assert_eq!(partition.components(), vec![vec![0]]);

    Ok(())
}

#[test]
fn test_acyclic_chain() -> Result<()> {
    let graph = VecGraph::from_arcs([(0, 1), (1, 2)]);

    let partition = sccs::par_uf(&graph, &thread_pool![2], no_logging![])?;

    assert_eq!(partition.components(), vec![vec![0], vec![1], vec![2]]);

    Ok(())
}

#[test]
fn test_scheduling_invariance() -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(0);
    let mut graph = random_graph(&mut rng, 100, 3);
    let expected = sccs::tarjan(&graph, no_logging![]);

    for num_threads in [1, 2, 4, 8] {
        let partition = sccs::par_uf(&graph, &thread_pool![num_threads], no_logging![])?;
        assert_eq!(partition, expected);
        graph.reset();
    }

    Ok(())
}

#[test]
fn test_ground_truth_random() -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(0);
    let pool = thread_pool![8];

    for num_nodes in [10, 20, 50, 100] {
        for max_outdegree in 1..5 {
            for _ in 0..4 {
                let graph = random_graph(&mut rng, num_nodes, max_outdegree);
                let expected = sccs::tarjan(&graph, no_logging![]);
                let partition = sccs::par_uf(&graph, &pool, no_logging![])?;
                assert_eq!(partition, expected);
            }
        }
    }

    Ok(())
}

#[test]
fn test_partition_property() -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(1);

    for _ in 0..8 {
        let graph = random_graph(&mut rng, 80, 3);
        let partition = sccs::par_uf(&graph, &thread_pool![4], no_logging![])?;

        // The components are pairwise disjoint and cover exactly the nodes
        // reachable from the roots.
        let mut covered = HashSet::new();
        for component in partition.iter() {
            for &node in component {
                assert!(covered.insert(node), "node {node} appears twice");
            }
        }
        assert_eq!(covered, reachable(&graph));
    }

    Ok(())
}

#[test]
fn test_root_subset() -> Result<()> {
    // Only node 0 is submitted; 3 and 4 are unreachable from it.
    let mut graph = VecGraph::from_arcs([(0, 1), (1, 2), (3, 4), (4, 3)]);
    for node in 1..5 {
        graph.set_root(node, false);
    }

    let expected = sccs::tarjan(&graph, no_logging![]);
    let partition = sccs::par_uf(&graph, &thread_pool![4], no_logging![])?;

    assert_eq!(partition, expected);
    assert_eq!(partition.components(), vec![vec![0], vec![1], vec![2]]);

    Ok(())
}

#[test]
fn test_explored_markers() -> Result<()> {
    let mut graph = VecGraph::from_arcs([(0, 1), (1, 2), (3, 4), (4, 3)]);
    for node in 1..5 {
        graph.set_root(node, false);
    }

    sccs::par_uf(&graph, &thread_pool![4], no_logging![])?;

    for node in 0..3 {
        assert!(graph.is_explored(node));
    }
    for node in 3..5 {
        assert!(!graph.is_explored(node));
    }

    Ok(())
}

#[test]
fn test_too_many_workers() {
    let graph = VecGraph::from_arcs([(0, 1)]);

    let result = sccs::par_uf(&graph, &thread_pool![MAX_WORKERS + 1], no_logging![]);

    assert_eq!(result.unwrap_err().requested, MAX_WORKERS + 1);
}

#[test]
fn test_repeated_runs() -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(2);
    let mut graph = random_graph(&mut rng, 60, 3);
    let pool = thread_pool![8];

    let first = sccs::par_uf(&graph, &pool, no_logging![])?;
    for _ in 0..4 {
        graph.reset();
        assert_eq!(sccs::par_uf(&graph, &pool, no_logging![])?, first);
    }

    Ok(())
}

#[test]
fn test_sizes() -> Result<()> {
    let graph = VecGraph::from_arcs([(0, 1), (1, 2), (2, 3), (3, 1)]);

    let mut partition = sccs::par_uf(&graph, &thread_pool![2], no_logging![])?;

    assert_eq!(partition.compute_sizes(), vec![1, 3].into_boxed_slice());
    assert_eq!(partition.component_of(2), Some(1));
    assert_eq!(partition.component_of(4), None);

    let sizes = partition.sort_by_size();
    assert_eq!(sizes, vec![3, 1].into_boxed_slice());
    assert_eq!(partition.components(), vec![vec![1, 2, 3], vec![0]]);

    Ok(())
}

#[test]
fn test_tarjan_fixtures() -> Result<()> {
    let graph = VecGraph::from_arcs([(0, 1), (0, 0), (1, 0), (1, 2), (2, 3), (3, 2)]);
    let partition = sccs::tarjan(&graph, no_logging![]);
    assert_eq!(partition.components(), vec![vec![0, 1], vec![2, 3]]);

    let graph = VecGraph::from_arcs([(0, 2), (1, 2), (2, 3), (2, 4), (3, 0)]);
    let partition = sccs::tarjan(&graph, no_logging![]);
    assert_eq!(partition.components(), vec![vec![0, 2, 3], vec![1], vec![4]]);

    Ok(())
}
