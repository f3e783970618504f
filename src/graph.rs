/*
 * SPDX-FileCopyrightText: 2025 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The graph model consumed by the decomposition.
//!
//! Nodes are identified by contiguous integers. Besides its outgoing arcs,
//! every node carries a *root* flag, marking it as eligible for independent
//! worker submission, and a *fully explored* marker that the engine sets once
//! the node has been completely visited. Every [`Arc`] carries a traversal
//! flag so that concurrent workers scanning the same node partition its arcs
//! between themselves instead of repeating work.
//!
//! The decomposition is generic over the [`RootedGraph`] trait; [`VecGraph`]
//! is a mutable vector-backed implementation suitable for graphs built
//! in memory.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};

/// A directed arc with a per-pass traversal flag.
///
/// Arcs compare equal, and hash identically, when they point at the same
/// target, regardless of the state of the traversal flag.
#[derive(Debug)]
pub struct Arc {
    to: usize,
    traversed: AtomicBool,
}

impl Arc {
    /// Creates a new arc pointing at `to`, not yet traversed.
    pub fn new(to: usize) -> Self {
        Self {
            to,
            traversed: AtomicBool::new(false),
        }
    }

    /// Returns the target of the arc.
    #[inline(always)]
    pub fn to(&self) -> usize {
        self.to
    }

    /// Returns whether the arc has already been traversed in the current
    /// pass.
    #[inline(always)]
    pub fn is_traversed(&self) -> bool {
        self.traversed.load(Ordering::Acquire)
    }

    /// Marks the arc as traversed, returning true to the first caller only.
    #[inline(always)]
    pub fn try_traverse(&self) -> bool {
        !self.traversed.swap(true, Ordering::AcqRel)
    }
}

impl Clone for Arc {
    fn clone(&self) -> Self {
        Self {
            to: self.to,
            traversed: AtomicBool::new(self.is_traversed()),
        }
    }
}

impl PartialEq for Arc {
    fn eq(&self, other: &Self) -> bool {
        self.to == other.to
    }
}

impl Eq for Arc {}

impl Hash for Arc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to.hash(state);
    }
}

/// A directed graph with the per-node markers the decomposition needs.
///
/// This is the seam towards the graph collaborator: the engine only
/// enumerates nodes, reads their arcs and flags, and sets the explored
/// marker. How the graph is built, stored, or discovered is not its concern.
pub trait RootedGraph {
    /// Returns the number of nodes of the graph.
    fn num_nodes(&self) -> usize;

    /// Returns the outgoing arcs of a node.
    fn successors(&self, node: usize) -> &[Arc];

    /// Returns whether the node is eligible for independent worker
    /// submission.
    fn is_root(&self, node: usize) -> bool;

    /// Returns whether the node has been fully explored.
    fn is_explored(&self, node: usize) -> bool;

    /// Marks the node as fully explored.
    ///
    /// Called by the engine when the post-order visit of the node is
    /// complete; never reset during a pass.
    fn set_explored(&self, node: usize);
}

#[derive(Debug)]
struct Node {
    arcs: Vec<Arc>,
    root: bool,
    explored: AtomicBool,
}

impl Node {
    fn new() -> Self {
        Self {
            arcs: vec![],
            root: true,
            explored: AtomicBool::new(false),
        }
    }
}

impl Clone for Node {
    fn clone(&self) -> Self {
        Self {
            arcs: self.arcs.clone(),
            root: self.root,
            explored: AtomicBool::new(self.explored.load(Ordering::Acquire)),
        }
    }
}

/// A mutable [`RootedGraph`] implementation based on a vector of arc lists.
///
/// New nodes are flagged as roots; use [`set_root`](VecGraph::set_root) to
/// restrict the decomposition to the part of the graph reachable from a
/// subset of the nodes. Arcs may be added in any order, and arcs with the
/// same source and target may be repeated.
///
/// # Examples
///
/// ```
/// use ufscc::graph::{RootedGraph, VecGraph};
///
/// let graph = VecGraph::from_arcs([(0, 1), (1, 0), (1, 2)]);
/// assert_eq!(graph.num_nodes(), 3);
/// assert_eq!(graph.num_arcs(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct VecGraph {
    /// The number of arcs in the graph.
    num_arcs: u64,
    nodes: Vec<Node>,
}

impl core::default::Default for VecGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl VecGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self {
            num_arcs: 0,
            nodes: vec![],
        }
    }

    /// Creates a new graph with `n` isolated nodes.
    pub fn empty(n: usize) -> Self {
        Self {
            num_arcs: 0,
            nodes: Vec::from_iter((0..n).map(|_| Node::new())),
        }
    }

    /// Adds an isolated node to the graph and returns true if it is a new
    /// node.
    pub fn add_node(&mut self, node: usize) -> bool {
        let len = self.nodes.len();
        self.nodes.extend((len..=node).map(|_| Node::new()));
        len <= node
    }

    /// Adds an arc to the graph.
    ///
    /// # Panics
    ///
    /// This method will panic if one of the given nodes is greater or equal
    /// than the number of nodes in the graph.
    pub fn add_arc(&mut self, u: usize, v: usize) {
        let max = u.max(v);
        if max >= self.nodes.len() {
            panic!(
                "Node {} does not exist (the graph has {} nodes)",
                max,
                self.nodes.len(),
            );
        }
        self.nodes[u].arcs.push(Arc::new(v));
        self.num_arcs += 1;
    }

    /// Creates a new graph from an iterator of arcs, adding the missing
    /// nodes.
    pub fn from_arcs(arcs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut graph = Self::new();
        for (u, v) in arcs {
            graph.add_node(u);
            graph.add_node(v);
            graph.add_arc(u, v);
        }
        graph
    }

    /// Sets the root flag of a node.
    pub fn set_root(&mut self, node: usize, root: bool) {
        self.nodes[node].root = root;
    }

    /// Returns the number of arcs of the graph.
    pub fn num_arcs(&self) -> u64 {
        self.num_arcs
    }

    /// Clears the traversal flags and the explored markers, making the graph
    /// usable for another pass.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            *node.explored.get_mut() = false;
            for arc in &mut node.arcs {
                *arc.traversed.get_mut() = false;
            }
        }
    }
}

impl RootedGraph for VecGraph {
    #[inline(always)]
    fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[inline(always)]
    fn successors(&self, node: usize) -> &[Arc] {
        &self.nodes[node].arcs
    }

    #[inline(always)]
    fn is_root(&self, node: usize) -> bool {
        self.nodes[node].root
    }

    #[inline(always)]
    fn is_explored(&self, node: usize) -> bool {
        self.nodes[node].explored.load(Ordering::Acquire)
    }

    #[inline(always)]
    fn set_explored(&self, node: usize) {
        self.nodes[node].explored.store(true, Ordering::Release);
    }
}
