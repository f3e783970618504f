/*
 * SPDX-FileCopyrightText: 2025 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::Partition;
use super::worker::Worker;
use crate::graph::RootedGraph;
use crate::uf::{MAX_WORKERS, UnionFind};
use dashmap::DashMap;
use dsi_progress_logger::ConcurrentProgressLog;
use log::info;
use rayon::ThreadPool;
use thiserror::Error;

/// The thread pool is wider than the worker bitmask.
///
/// Claim tracking records each visiting worker in a fixed-width bitmask, so
/// a pool with more than [`MAX_WORKERS`] threads cannot be used: truncating
/// the worker ids would corrupt claim tracking and produce wrong components.
#[derive(Error, Debug)]
#[error("a pool of {requested} threads exceeds the {MAX_WORKERS} concurrently active workers the claim bitmask can track")]
pub struct TooManyWorkers {
    /// The width of the rejected pool.
    pub requested: usize,
}

/// Parallel decomposition in strongly connected components by concurrent
/// union-find.
///
/// One task is submitted for every node that is flagged as root and not yet
/// fully explored, in iteration order; the order affects only the
/// scheduling, never the result. The call returns once the pool is
/// quiescent, that is, when all submitted tasks have completed.
///
/// The returned partition covers exactly the nodes reachable from the
/// submitted roots, and is identical, membership-wise, across repeated runs
/// and across pool widths.
///
/// # Arguments
/// * `graph`: the graph to decompose.
/// * `thread_pool`: the pool running the workers; at most [`MAX_WORKERS`]
///   threads wide.
/// * `pl`: a concurrent progress logger.
pub fn par_uf<G: RootedGraph + Sync>(
    graph: &G,
    thread_pool: &ThreadPool,
    pl: &mut impl ConcurrentProgressLog,
) -> Result<Partition, TooManyWorkers> {
    let num_workers = thread_pool.current_num_threads();
    if num_workers > MAX_WORKERS {
        return Err(TooManyWorkers {
            requested: num_workers,
        });
    }

    let num_nodes = graph.num_nodes();
    pl.item_name("node");
    pl.expected_updates(Some(num_nodes));
    pl.start("Computing strongly connected components...");

    let uf = UnionFind::new(num_nodes);
    let sccs = DashMap::new();

    thread_pool.install(|| {
        // The scope returns at quiescence: every task spawned below, and
        // every task those might spawn, has completed.
        rayon::scope(|scope| {
            for node in 0..num_nodes {
                if !graph.is_root(node) || graph.is_explored(node) {
                    continue;
                }
                let uf = &uf;
                let sccs = &sccs;
                let mut pl = pl.clone();
                scope.spawn(move |_| {
                    // Tasks run on pool threads, so the thread index is a
                    // worker id below the pool width
                    let worker = rayon::current_thread_index().unwrap();
                    Worker::new(graph, uf, sccs, worker).run(node, &mut pl);
                });
            }
        });
    });

    pl.done();

    let components = sccs.into_iter().map(|(_, members)| members).collect();
    let partition = Partition::from_components(components);
    info!(
        "Found {} strongly connected components using {} workers",
        partition.num_components(),
        num_workers
    );
    Ok(partition)
}
