//! # transpose-tree
//!
//! Memory-compact ordered maps for workloads with very many small entries,
//! where per-node allocations, object headers and pointer-sized links cost
//! more than the payload itself.
//!
//! ## Features
//!
//! - **Width-adaptive storage**: integer sequences that start at 1 bit per
//!   entry and inflate in place only when a value no longer fits.
//! - **Node-less ordering**: a left-leaning red-black tree whose per-node
//!   fields live in three parallel arrays indexed by node ordinal, not in
//!   per-node structs.
//! - **External keys**: the tree never reads a key; callers keep keys and
//!   values in their own parallel arrays and answer comparison callbacks,
//!   so any key representation works without copies.
//!
//! ## Architecture
//!
//! The crate is two tightly coupled layers:
//!
//! 1. **Blocks** ([`FixedBlock`], [`BitBlock`], [`InflatableBlock`]):
//!    growable integer sequences speaking `i64` at the interface while
//!    packing entries into 1..=64 bits of storage, with transparent width
//!    promotion.
//! 2. **Tree** ([`TransposeTree`]): the ordering structure, storing its
//!    left/right child ordinals in inflatable blocks (so link width tracks
//!    the population) and node colours in a packed bit set.
//!
//! ## Example
//!
//! ```rust
//! use transpose_tree::{Slots, TransposeTree};
//!
//! let mut tree = TransposeTree::new(4);
//! let mut keys: Slots<String> = Slots::new();
//! let mut values: Slots<u32> = Slots::new();
//!
//! for (key, value) in [("Einstein", 1879), ("Darwin", 1809), ("Jordan", 1963)] {
//!     let slot = tree.insertion_point();
//!     keys.set(slot, key.to_string());
//!     values.set(slot, value);
//!     let keys = &keys;
//!     tree.insert(|a, b| keys[a].cmp(&keys[b])).unwrap();
//! }
//!
//! let einstein = tree.lookup(|i: usize| "Einstein".cmp(&keys[i]));
//! assert_eq!(einstein.map(|i| values[i]), Some(1879));
//!
//! let sorted: Vec<&str> = tree.indexes().map(|i| keys[i].as_str()).collect();
//! assert_eq!(sorted, ["Darwin", "Einstein", "Jordan"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bits;
pub mod block;
pub mod fixed;
pub mod inflate;
pub mod slots;
pub mod tree;

#[cfg(test)]
mod proptests;

pub use bits::{smart_entry_size, BitBlock, Variant};
pub use block::{Block, Entries, ValueBeyondLimit};
pub use fixed::{ByteBlock, Element, FixedBlock, IntBlock, LongBlock, ShortBlock};
pub use inflate::{bitwise_growth, byte_aligned_growth, BlockFactory, InflatableBlock, Storage};
pub use slots::Slots;
pub use tree::{DuplicateKey, IndexWalk, Indexes, NodeLocator, TransposeTree};
