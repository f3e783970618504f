/*
 * SPDX-FileCopyrightText: 2025 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The concurrent union-find forest at the heart of the decomposition.
//!
//! Every node of the graph has a slot in the forest holding its parent
//! pointer, a 64-bit bitmask of the workers that have already visited its
//! component, and two cyclic singly-linked lists threading the members of
//! the forming component: the *work list*, which tracks the members whose
//! arcs still have to be explored and is compacted past tombstones, and the
//! *membership ring*, which is never compacted and is walked to emit the
//! finished component.
//!
//! All coordination happens through compare-and-swap transitions of two
//! per-slot status cells: `live → locked → live` grants exclusive mutation
//! rights over the parent pointer and the list pointers, `live → dead`
//! resolves a component once and for all, and `live → tomb` removes a fully
//! explored member from the work list. Contention is resolved by spinning;
//! no operation ever blocks.
//!
//! [`unite`](UnionFind::unite) always makes the root with the larger id the
//! child of the root with the smaller one, so the sequence of ids along any
//! chain of parents is strictly decreasing: repeated union attempts
//! terminate, and the representative of a finished component is its
//! smallest member.

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// The width of the worker bitmask, and thus the maximum number of
/// concurrently active workers.
pub const MAX_WORKERS: usize = u64::BITS as usize;

/// Outcome of [`make_claim`](UnionFind::make_claim).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    /// The component has been resolved and emitted; there is nothing left to
    /// do on it.
    Dead,
    /// The worker has already visited this component on its current path: an
    /// arc leading into it closes a cycle.
    Found,
    /// First visit of the component by this worker.
    Success,
}

const UF_LIVE: u8 = 0;
const UF_LOCK: u8 = 1;
const UF_DEAD: u8 = 2;

const LIST_LIVE: u8 = 0;
const LIST_LOCK: u8 = 1;
const LIST_TOMB: u8 = 2;

struct Slot {
    /// Parent in the forest; 0 means the slot is a representative.
    parent: AtomicUsize,
    /// Bitmask of the workers that have visited this component. Bits are
    /// only ever added.
    worker_set: AtomicU64,
    /// Next member in the work list; 0 means the slot is alone.
    list_next: AtomicUsize,
    /// Next member in the membership ring; 0 means the slot is alone.
    member_next: AtomicUsize,
    uf_status: AtomicU8,
    list_status: AtomicU8,
}

impl Slot {
    fn new() -> Self {
        Self {
            parent: AtomicUsize::new(0),
            worker_set: AtomicU64::new(0),
            list_next: AtomicUsize::new(0),
            member_next: AtomicUsize::new(0),
            uf_status: AtomicU8::new(UF_LIVE),
            list_status: AtomicU8::new(LIST_LIVE),
        }
    }
}

/// A concurrent union-find forest over the nodes `0..num_nodes`.
///
/// Slots are indexed by node id offset by one, so that 0 can act as the
/// "no parent" sentinel of the parent pointers and the "alone" sentinel of
/// the list pointers; the offset is not visible through the API, which
/// speaks node ids throughout.
pub struct UnionFind {
    slots: Box<[CachePadded<Slot>]>,
}

impl UnionFind {
    /// Creates a new forest of `num_nodes` singletons.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            slots: (0..=num_nodes)
                .map(|_| CachePadded::new(Slot::new()))
                .collect(),
        }
    }

    /// Returns the number of nodes of the forest.
    pub fn num_nodes(&self) -> usize {
        self.slots.len() - 1
    }

    /// Returns the representative of the component of `node`.
    ///
    /// The result may be stale as soon as it is returned; callers that
    /// depend on it re-validate (see [`unite`](UnionFind::unite)) or resolve
    /// again.
    pub fn find(&self, node: usize) -> usize {
        self.find_slot(node + 1) - 1
    }

    fn find_slot(&self, slot: usize) -> usize {
        let mut root = slot;
        loop {
            let parent = self.slots[root].parent.load(Ordering::Acquire);
            if parent == 0 {
                break;
            }
            root = parent;
        }
        // Compress the path behind us. Parents only ever move towards
        // smaller ids, so overwriting a parent with an ancestor keeps the
        // forest acyclic even when racing with concurrent unions.
        let mut cur = slot;
        while cur != root {
            let next = self.slots[cur].parent.load(Ordering::Acquire);
            if next == 0 {
                break;
            }
            if next != root {
                self.slots[cur].parent.store(root, Ordering::Release);
            }
            cur = next;
        }
        root
    }

    /// Returns whether `a` and `b` are currently in the same component.
    ///
    /// A true result is definite; a false result is advisory when
    /// interleaved with concurrent unions, and callers whose correctness
    /// depends on it must re-check.
    pub fn same_set(&self, a: usize, b: usize) -> bool {
        let (a, b) = (a + 1, b + 1);
        loop {
            let ra = self.find_slot(a);
            if ra == self.find_slot(b) {
                return true;
            }
            // If ra is still a representative the two components were
            // disjoint at the instant of the comparison.
            if self.slots[ra].parent.load(Ordering::Acquire) == 0 {
                return false;
            }
        }
    }

    /// Unites the components of `a` and `b`, splicing their lists together.
    ///
    /// The root with the larger id becomes the child of the root with the
    /// smaller id, and the worker sets are merged upwards. If either
    /// component turns out to be already resolved there is nothing to merge
    /// and the union is abandoned.
    pub fn unite(&self, a: usize, b: usize) {
        let (a, b) = (a + 1, b + 1);

        // Lock the subordinate root.
        let (q, r) = loop {
            let ra = self.find_slot(a);
            let rb = self.find_slot(b);
            if ra == rb {
                return;
            }
            if self.slots[ra].uf_status.load(Ordering::Acquire) == UF_DEAD
                || self.slots[rb].uf_status.load(Ordering::Acquire) == UF_DEAD
            {
                // A resolved component cannot be merged.
                return;
            }
            // The larger id goes below the smaller one.
            let (q, r) = if ra < rb { (rb, ra) } else { (ra, rb) };
            if self.lock_uf(q) {
                break (q, r);
            }
        };

        // Lock one live member of each original work list; an exhausted
        // list means the component is already resolved and there is nothing
        // to merge.
        let Some(la) = self.lock_list(a) else {
            self.unlock_uf(q);
            return;
        };
        let Some(lb) = self.lock_list(b) else {
            self.unlock_list(la);
            self.unlock_uf(q);
            return;
        };

        // Splice the two cyclic work lists in O(1) by exchanging the
        // successors of the locked members, and the membership rings
        // likewise.
        let na = match self.slots[la].list_next.load(Ordering::Acquire) {
            0 => la,
            next => next,
        };
        let nb = match self.slots[lb].list_next.load(Ordering::Acquire) {
            0 => lb,
            next => next,
        };
        self.slots[la].list_next.store(nb, Ordering::Release);
        self.slots[lb].list_next.store(na, Ordering::Release);

        let ma = match self.slots[la].member_next.load(Ordering::Acquire) {
            0 => la,
            next => next,
        };
        let mb = match self.slots[lb].member_next.load(Ordering::Acquire) {
            0 => lb,
            next => next,
        };
        self.slots[la].member_next.store(mb, Ordering::Release);
        self.slots[lb].member_next.store(ma, Ordering::Release);

        self.slots[q].parent.store(r, Ordering::Release);

        // Hand the subordinate's claims to the dominant root, chasing any
        // re-rooting performed by unions we raced with.
        let worker_q = self.slots[q].worker_set.load(Ordering::Acquire);
        if self.slots[r].worker_set.load(Ordering::Acquire) & worker_q != worker_q {
            let mut root = r;
            loop {
                self.slots[root].worker_set.fetch_or(worker_q, Ordering::AcqRel);
                if self.slots[root].parent.load(Ordering::Acquire) == 0 {
                    break;
                }
                root = self.find_slot(root);
            }
        }

        self.unlock_list(la);
        self.unlock_list(lb);
        self.unlock_uf(q);
    }

    /// Returns a live member of the work list of the component of `node`,
    /// or `None` if every member has been removed.
    ///
    /// The scan spins past transiently locked members and shortens the list
    /// past tombstones. `None` means the component is maximal: no member has
    /// unexplored arcs left and no further merge can reach it.
    pub fn pick_from_list(&self, node: usize) -> Option<usize> {
        self.pick_slot(node + 1).map(|slot| slot - 1)
    }

    fn pick_slot(&self, start: usize) -> Option<usize> {
        let mut a = start;
        loop {
            // Wait out transient locks on `a`.
            loop {
                match self.slots[a].list_status.load(Ordering::Acquire) {
                    LIST_LIVE => return Some(a),
                    LIST_TOMB => break,
                    _ => core::hint::spin_loop(),
                }
            }
            let b = match self.slots[a].list_next.load(Ordering::Acquire) {
                0 => a,
                next => next,
            };
            if b == a {
                // The list has collapsed onto a tombstone: every member has
                // been fully explored.
                return None;
            }
            loop {
                match self.slots[b].list_status.load(Ordering::Acquire) {
                    LIST_LIVE => return Some(b),
                    LIST_TOMB => break,
                    _ => core::hint::spin_loop(),
                }
            }
            let c = match self.slots[b].list_next.load(Ordering::Acquire) {
                0 => b,
                next => next,
            };
            // Shorten the list past the tombstone.
            let _ = self.slots[a]
                .list_next
                .compare_exchange(b, c, Ordering::AcqRel, Ordering::Relaxed);
            a = c;
        }
    }

    /// Removes a fully explored member from the work list of its component.
    ///
    /// Returns true only to the caller that performed the `live → tomb`
    /// transition.
    pub fn remove_from_list(&self, node: usize) -> bool {
        let slot = node + 1;
        loop {
            match self.slots[slot].list_status.load(Ordering::Acquire) {
                LIST_LIVE => {
                    if self.slots[slot]
                        .list_status
                        .compare_exchange(LIST_LIVE, LIST_TOMB, Ordering::AcqRel, Ordering::Relaxed)
                        .is_ok()
                    {
                        return true;
                    }
                }
                LIST_TOMB => return false,
                _ => core::hint::spin_loop(),
            }
        }
    }

    /// Claims the component of `node` for a worker.
    ///
    /// Resolves the current root and reports the component as
    /// [`Dead`](ClaimStatus::Dead) or already
    /// [`Found`](ClaimStatus::Found) by this worker; otherwise sets the
    /// worker's bit, chasing any re-rooting observed mid-operation, and
    /// returns [`Success`](ClaimStatus::Success).
    pub fn make_claim(&self, node: usize, worker: usize) -> ClaimStatus {
        debug_assert!(worker < MAX_WORKERS);
        let bit = 1u64 << worker;
        let mut root = self.find_slot(node + 1);
        if self.slots[root].uf_status.load(Ordering::Acquire) == UF_DEAD {
            return ClaimStatus::Dead;
        }
        if self.slots[root].worker_set.load(Ordering::Acquire) & bit != 0 {
            return ClaimStatus::Found;
        }
        loop {
            self.slots[root].worker_set.fetch_or(bit, Ordering::AcqRel);
            if self.slots[root].parent.load(Ordering::Acquire) == 0 {
                break;
            }
            root = self.find_slot(root);
        }
        ClaimStatus::Success
    }

    /// Returns whether the component of `node` has been resolved.
    pub fn is_dead(&self, node: usize) -> bool {
        let root = self.find_slot(node + 1);
        self.slots[root].uf_status.load(Ordering::Acquire) == UF_DEAD
    }

    /// Resolves the component of `node`.
    ///
    /// Returns true only to the caller that performed the `live → dead`
    /// transition; that caller owns the emission of the component.
    pub fn mark_dead(&self, node: usize) -> bool {
        let mut performed = false;
        loop {
            let root = self.find_slot(node + 1);
            match self.slots[root].uf_status.load(Ordering::Acquire) {
                UF_DEAD => return performed,
                UF_LIVE => {
                    performed |= self.slots[root]
                        .uf_status
                        .compare_exchange(UF_LIVE, UF_DEAD, Ordering::AcqRel, Ordering::Relaxed)
                        .is_ok();
                }
                // A union holds the root; it will either release it
                // unchanged or re-root it.
                _ => core::hint::spin_loop(),
            }
        }
    }

    /// Returns the members of the component of `node`.
    ///
    /// The membership ring is stable once the component is
    /// [dead](UnionFind::mark_dead), which is the only moment this is
    /// meant to be called.
    pub fn members(&self, node: usize) -> Vec<usize> {
        let root = self.find_slot(node + 1);
        let mut members = vec![root - 1];
        let mut cur = match self.slots[root].member_next.load(Ordering::Acquire) {
            0 => root,
            next => next,
        };
        while cur != root {
            members.push(cur - 1);
            cur = match self.slots[cur].member_next.load(Ordering::Acquire) {
                0 => root,
                next => next,
            };
        }
        members
    }

    fn lock_uf(&self, slot: usize) -> bool {
        if self.slots[slot]
            .uf_status
            .compare_exchange(UF_LIVE, UF_LOCK, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            // The lock is only good if the slot is still a representative.
            if self.slots[slot].parent.load(Ordering::Acquire) == 0 {
                return true;
            }
            self.slots[slot].uf_status.store(UF_LIVE, Ordering::Release);
        }
        false
    }

    fn unlock_uf(&self, slot: usize) {
        self.slots[slot].uf_status.store(UF_LIVE, Ordering::Release);
    }

    fn lock_list(&self, start: usize) -> Option<usize> {
        loop {
            let picked = self.pick_slot(start)?;
            if self.slots[picked]
                .list_status
                .compare_exchange(LIST_LIVE, LIST_LOCK, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Some(picked);
            }
        }
    }

    fn unlock_list(&self, slot: usize) {
        self.slots[slot].list_status.store(LIST_LIVE, Ordering::Release);
    }
}
