//! An externally-keyed red-black tree stored as parallel arrays.
//!
//! A [`TransposeTree`] keeps its per-node fields (left child, right child,
//! node colour) in three growable arrays indexed by node ordinal, instead
//! of allocating a node object per entry. The child arrays are
//! [`InflatableBlock`]s, so child ordinals occupy only as many bits as the
//! current population requires. Keys and values stay in arrays the caller
//! owns; the tree only ever asks the caller to compare two ordinals, so it
//! works for any key representation without a copy.
//!
//! Balancing is the 2-3 left-leaning red-black scheme from Sedgewick's
//! LLRB paper: <https://www.cs.princeton.edu/~rs/talks/LLRB/LLRB.pdf>.
//!
//! # Composing a map
//!
//! Reserve a slot with [`insertion_point`](TransposeTree::insertion_point),
//! write your key (and value) there, then splice the slot into the tree:
//!
//! ```rust
//! use transpose_tree::{Slots, TransposeTree};
//!
//! let mut tree = TransposeTree::new(4);
//! let mut keys: Slots<&str> = Slots::new();
//!
//! for key in ["Einstein", "Jordan", "Obama", "Darwin"] {
//!     let slot = tree.insertion_point();
//!     keys.set(slot, key);
//!     let keys = &keys;
//!     tree.insert(|a, b| keys[a].cmp(&keys[b])).unwrap();
//! }
//!
//! let found = tree.lookup(|i: usize| "Darwin".cmp(keys[i]));
//! assert_eq!(found.map(|i| keys[i]), Some("Darwin"));
//!
//! let in_order: Vec<&str> = tree.indexes().map(|i| keys[i]).collect();
//! assert_eq!(in_order, ["Darwin", "Einstein", "Jordan", "Obama"]);
//! ```
//!
//! There is no deletion.

use std::cmp::Ordering;

use thiserror::Error;

use crate::bits::{BitBlock, Variant};
use crate::block::Block;
use crate::inflate::{bitwise_growth, BlockFactory, InflatableBlock, Storage};

/// Absent child, as stored in the child arrays. An UnsignedOrNull bit block
/// packs it as the all-ones pattern at any width.
const NIL: i64 = -1;

/// Raised when an insertion compares equal to a node already in the tree.
/// Callers implementing upsert catch this (or [`lookup`] first) and update
/// their value array at the existing ordinal instead.
///
/// [`lookup`]: TransposeTree::lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot insert a duplicate key; the existing node is at index {0}")]
pub struct DuplicateKey(pub usize);

/// Directs a search without ever handing the tree a key.
///
/// `compare_with(i)` answers what a comparator would answer for
/// `compare(desired_key, key_at(i))`: [`Ordering::Less`] sends the search
/// left, [`Ordering::Greater`] right, and [`Ordering::Equal`] is a match.
/// A locator may answer `Equal` for a contiguous range of keys to select
/// that whole range; range iteration then visits exactly those nodes in
/// ascending order.
///
/// Any `Fn(usize) -> Ordering` closure is a locator.
pub trait NodeLocator {
    /// Compare the desired key against the key at node `index`.
    fn compare_with(&self, index: usize) -> Ordering;
}

impl<F: Fn(usize) -> Ordering> NodeLocator for F {
    fn compare_with(&self, index: usize) -> Ordering {
        self(index)
    }
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A left-leaning red-black tree whose node fields live in parallel
/// width-adaptive arrays.
///
/// Node ordinals are assigned in insertion order and are stable for the
/// life of the tree; order among live nodes is defined purely by the tree
/// links and the caller's comparator.
#[derive(Debug, Clone)]
pub struct TransposeTree {
    population: usize,
    root: usize,
    left: InflatableBlock,
    right: InflatableBlock,
    // 1 = black. New nodes are red, NIL reads as black.
    black: BitBlock,
}

impl TransposeTree {
    /// Create a tree with the default [`bitwise_growth`] child storage.
    pub fn new(initial_capacity: usize) -> Self {
        Self::with_factory(initial_capacity, bitwise_growth)
    }

    /// Create a tree whose child arrays inflate through `block_factory`.
    pub fn with_factory(initial_capacity: usize, block_factory: BlockFactory) -> Self {
        TransposeTree {
            population: 0,
            root: 0,
            left: InflatableBlock::with_factory(initial_capacity, block_factory),
            right: InflatableBlock::with_factory(initial_capacity, block_factory),
            black: BitBlock::new(Variant::Unsigned, 1, initial_capacity),
        }
    }

    /// Number of nodes in the tree.
    pub fn population(&self) -> usize {
        self.population
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.population == 0
    }

    /// The ordinal where the caller should store key and value data for the
    /// next node, before calling [`insert`](Self::insert).
    pub fn insertion_point(&self) -> usize {
        self.population
    }

    /// Splice the node at [`insertion_point`](Self::insertion_point) into
    /// the tree and grow the population by one.
    ///
    /// `compare(a, b)` orders the caller's key at ordinal `a` against the
    /// key at ordinal `b`; it must be a consistent total order. On
    /// [`DuplicateKey`] the population is unchanged and the caller's slot
    /// at the insertion point is not committed.
    pub fn insert<C>(&mut self, compare: C) -> Result<(), DuplicateKey>
    where
        C: Fn(usize, usize) -> Ordering,
    {
        let node = self.population;
        self.initialize_node(node);
        self.root = if node == 0 {
            0
        } else {
            self.insert_below(self.root, &compare)?
        };
        self.set_black(self.root, true);
        self.population += 1;
        Ok(())
    }

    /// The node matching `locator`, if any.
    pub fn lookup<L: NodeLocator>(&self, locator: L) -> Option<usize> {
        match self.descend(&locator) {
            Some((index, Ordering::Equal)) => Some(index),
            _ => None,
        }
    }

    /// The node matching `locator`, or the node that would be its parent if
    /// there is none. `None` only when the tree is empty.
    pub fn locate<L: NodeLocator>(&self, locator: L) -> Option<usize> {
        self.descend(&locator).map(|(index, _)| index)
    }

    /// In-order iterator over every node ordinal.
    pub fn indexes(&self) -> Indexes<'_, fn(usize) -> Ordering> {
        self.indexes_matching(every_node as fn(usize) -> Ordering)
    }

    /// In-order iterator over the ordinals for which `locator` answers
    /// [`Ordering::Equal`]. A locator that matches a contiguous key range
    /// yields exactly that range, ascending.
    pub fn indexes_matching<L: NodeLocator>(&self, locator: L) -> Indexes<'_, L> {
        Indexes {
            tree: self,
            walk: IndexWalk::new(self, locator),
        }
    }

    /// A detached in-order cursor. Unlike [`indexes`](Self::indexes) it
    /// holds no borrow of the tree, so the tree can be mutated between
    /// steps; the cursor snapshots the population and panics if a step
    /// observes that it changed.
    pub fn walk<L: NodeLocator>(&self, locator: L) -> IndexWalk<L> {
        IndexWalk::new(self, locator)
    }

    /// The node with the smallest key, if any.
    pub fn first(&self) -> Option<usize> {
        self.extreme(Side::Left)
    }

    /// The node with the largest key, if any.
    pub fn last(&self) -> Option<usize> {
        self.extreme(Side::Right)
    }

    /// Compact the per-node arrays down to the population plus
    /// `room_percentage` percent of headroom.
    pub fn shrinkwrap(&mut self, room_percentage: u32) {
        self.left.shrinkwrap(room_percentage);
        self.right.shrinkwrap(room_percentage);
        self.black.shrinkwrap(room_percentage);
    }

    /// Bytes currently held by the tree's own storage (child arrays and
    /// colour bits; the caller's key/value arrays are not included).
    pub fn memory_usage(&self) -> usize {
        self.left.heap_bytes() + self.right.heap_bytes() + self.black.heap_bytes()
    }

    /// The storage currently backing the left and right child arrays.
    /// Useful for reporting how far the index width has grown.
    pub fn child_storage(&self) -> (&Storage, &Storage) {
        (self.left.current_storage(), self.right.current_storage())
    }

    /// Splice `population` into the subtree rooted at `index`, returning
    /// the subtree's possibly-rotated new root.
    fn insert_below<C>(&mut self, index: usize, compare: &C) -> Result<usize, DuplicateKey>
    where
        C: Fn(usize, usize) -> Ordering,
    {
        let node = self.population;
        let side = match compare(node, index) {
            Ordering::Less => Side::Left,
            Ordering::Greater => Side::Right,
            Ordering::Equal => return Err(DuplicateKey(index)),
        };
        let child = self.child(side, index);
        if child == NIL {
            self.set_child(side, index, node as i64);
        } else {
            let subroot = self.insert_below(child as usize, compare)?;
            self.set_child(side, index, subroot as i64);
        }
        Ok(self.rebalance(index))
    }

    fn rebalance(&mut self, mut index: usize) -> usize {
        // Called on every level of every insertion; the child reads are
        // cached in locals and reloaded only after a rotation moves them.
        let mut my_left = self.left.get(index);
        let mut my_right = self.right.get(index);

        if self.is_red(my_right) && !self.is_red(my_left) {
            index = self.rotate(index, Side::Right);
            my_left = self.left.get(index);
            my_right = self.right.get(index);
        }
        if self.is_red(my_left) && self.is_red(self.left.get(my_left as usize)) {
            index = self.rotate(index, Side::Left);
            my_left = self.left.get(index);
            my_right = self.right.get(index);
        }
        if self.is_red(my_left) && self.is_red(my_right) {
            self.flip_colour(index);
            self.flip_colour(my_left as usize);
            self.flip_colour(my_right as usize);
        }
        index
    }

    /// Rotate the child on `from` up over `index`, which becomes its
    /// `opposite(from)` child. The riser takes over `index`'s colour and
    /// `index` turns red. Returns the riser.
    fn rotate(&mut self, index: usize, from: Side) -> usize {
        let to = from.opposite();
        let riser = self.child(from, index) as usize;
        let transferred = self.child(to, riser);
        self.set_child(from, index, transferred);
        self.set_child(to, riser, index as i64);
        self.set_black(riser, self.is_black(index));
        self.set_black(index, false);
        riser
    }

    fn descend<L: NodeLocator>(&self, locator: &L) -> Option<(usize, Ordering)> {
        if self.population == 0 {
            return None;
        }
        let mut index = self.root;
        loop {
            let ordering = locator.compare_with(index);
            let side = match ordering {
                Ordering::Equal => return Some((index, ordering)),
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
            };
            let child = self.child(side, index);
            if child == NIL {
                return Some((index, ordering));
            }
            index = child as usize;
        }
    }

    fn extreme(&self, side: Side) -> Option<usize> {
        if self.population == 0 {
            return None;
        }
        let mut index = self.root;
        loop {
            let child = self.child(side, index);
            if child == NIL {
                return Some(index);
            }
            index = child as usize;
        }
    }

    fn initialize_node(&mut self, index: usize) {
        debug_assert!(index <= self.insertion_point());
        self.left.set(index, NIL);
        self.right.set(index, NIL);
        self.set_black(index, false); // new nodes start red
    }

    fn child(&self, side: Side, index: usize) -> i64 {
        match side {
            Side::Left => self.left.get(index),
            Side::Right => self.right.get(index),
        }
    }

    fn set_child(&mut self, side: Side, index: usize, child: i64) {
        match side {
            Side::Left => self.left.set(index, child),
            Side::Right => self.right.set(index, child),
        }
    }

    fn is_red(&self, index: i64) -> bool {
        index != NIL && self.black.get(index as usize) == 0
    }

    fn is_black(&self, index: usize) -> bool {
        self.black.get(index) == 1
    }

    fn set_black(&mut self, index: usize, black: bool) {
        self.black
            .set(index, i64::from(black))
            .expect("colour bits are always 0 or 1");
    }

    fn flip_colour(&mut self, index: usize) {
        let flipped = 1 - self.black.get(index);
        self.black
            .set(index, flipped)
            .expect("colour bits are always 0 or 1");
    }
}

fn every_node(_: usize) -> Ordering {
    Ordering::Equal
}

/// A detached in-order cursor over a [`TransposeTree`].
///
/// Holds no borrow of the tree; pass the tree back into
/// [`next_index`](Self::next_index) for each step. The cursor records the
/// population at creation and panics if a step finds it changed, because
/// rebalancing shifts node depths and would invalidate the resume stack.
/// The tree itself stays valid after such a panic.
pub struct IndexWalk<L: NodeLocator> {
    locator: L,
    original_population: usize,
    resume: Vec<usize>,
    next: i64,
}

impl<L: NodeLocator> IndexWalk<L> {
    fn new(tree: &TransposeTree, locator: L) -> Self {
        let mut walk = IndexWalk {
            locator,
            original_population: tree.population,
            resume: Vec::new(),
            next: NIL,
        };
        if tree.population > 0 {
            walk.next = walk.dive(tree, tree.root);
            walk.stop_unless_matching();
        }
        walk
    }

    /// The next matching ordinal in key order, or `None` when exhausted.
    ///
    /// Panics if the tree's population has changed since the walk began.
    pub fn next_index(&mut self, tree: &TransposeTree) -> Option<usize> {
        assert!(
            tree.population == self.original_population,
            "TransposeTree modified during iteration"
        );
        if self.next == NIL {
            return None;
        }
        let result = self.next as usize;
        let right = tree.right.get(result);
        self.next = if right != NIL {
            self.dive(tree, right as usize)
        } else {
            self.resume.pop().map_or(NIL, |index| index as i64)
        };
        self.stop_unless_matching();
        Some(result)
    }

    /// Walk from `start` to the in-order first candidate below it,
    /// recording the path for resumption. Ties dive left so that a range
    /// locator starts at its smallest match.
    fn dive(&mut self, tree: &TransposeTree, start: usize) -> i64 {
        let mut index = start;
        loop {
            let side = match self.locator.compare_with(index) {
                Ordering::Equal | Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
            };
            let child = tree.child(side, index);
            if child == NIL {
                return index as i64;
            }
            self.resume.push(index);
            index = child as usize;
        }
    }

    fn stop_unless_matching(&mut self) {
        if self.next != NIL && self.locator.compare_with(self.next as usize) != Ordering::Equal {
            self.next = NIL;
        }
    }
}

/// Borrowing in-order iterator over a [`TransposeTree`], produced by
/// [`indexes`](TransposeTree::indexes) and
/// [`indexes_matching`](TransposeTree::indexes_matching).
pub struct Indexes<'a, L: NodeLocator> {
    tree: &'a TransposeTree,
    walk: IndexWalk<L>,
}

impl<L: NodeLocator> Iterator for Indexes<'_, L> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        self.walk.next_index(self.tree)
    }
}

#[cfg(test)]
impl TransposeTree {
    /// Assert the red-black shape rules: black root, no red right child,
    /// no red node with a red left child, and the same number of black
    /// nodes on every root-to-NIL path.
    pub(crate) fn check_red_black(&self) {
        if self.population == 0 {
            return;
        }
        assert!(self.is_black(self.root), "root {} must be black", self.root);
        self.check_subtree(self.root as i64);
    }

    /// Returns the black height of the subtree, counting the NIL sentinel.
    fn check_subtree(&self, index: i64) -> usize {
        if index == NIL {
            return 1;
        }
        let node = index as usize;
        let left = self.left.get(node);
        let right = self.right.get(node);
        assert!(!self.is_red(right), "node {} has a red right child", node);
        if self.is_red(index) {
            assert!(
                !self.is_red(left),
                "red node {} has a red left child",
                node
            );
        }
        let left_height = self.check_subtree(left);
        let right_height = self.check_subtree(right);
        assert_eq!(
            left_height, right_height,
            "black height differs below node {}",
            node
        );
        left_height + usize::from(self.is_black(node))
    }
}
