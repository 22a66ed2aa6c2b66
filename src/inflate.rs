//! Width promotion.
//!
//! An [`InflatableBlock`] wraps one concrete block and presents an interface
//! that never rejects a value: when a `set` would overflow the inner block,
//! the adapter builds a wider successor through its [`BlockFactory`],
//! replays the existing entries into it in order, applies the write, and
//! swaps the successor in. Callers only ever observe the 64-bit interface.

use crate::bits::{smart_entry_size, BitBlock, Variant};
use crate::block::{Block, Entries, ValueBeyondLimit};
use crate::fixed::{ByteBlock, IntBlock, LongBlock, ShortBlock};

/// The concrete storage alternatives an [`InflatableBlock`] can hold.
#[derive(Debug, Clone)]
pub enum Storage {
    /// 8-bit fixed-width entries.
    Byte(ByteBlock),
    /// 16-bit fixed-width entries.
    Short(ShortBlock),
    /// 32-bit fixed-width entries.
    Int(IntBlock),
    /// 64-bit fixed-width entries.
    Long(LongBlock),
    /// Bit-packed entries of 1..=32 bits.
    Bits(BitBlock),
}

macro_rules! with_inner {
    ($storage:expr, $inner:pat => $body:expr) => {
        match $storage {
            Storage::Byte($inner) => $body,
            Storage::Short($inner) => $body,
            Storage::Int($inner) => $body,
            Storage::Long($inner) => $body,
            Storage::Bits($inner) => $body,
        }
    };
}

impl Storage {
    /// Bits of storage per entry.
    pub fn bits_per_entry(&self) -> u32 {
        match self {
            Storage::Byte(_) => 8,
            Storage::Short(_) => 16,
            Storage::Int(_) => 32,
            Storage::Long(_) => 64,
            Storage::Bits(block) => block.bits_per_entry(),
        }
    }

    /// Bytes currently held by the backing buffer.
    pub fn heap_bytes(&self) -> usize {
        with_inner!(self, block => block.heap_bytes())
    }
}

impl Block for Storage {
    fn len(&self) -> usize {
        with_inner!(self, block => block.len())
    }

    fn capacity(&self) -> usize {
        with_inner!(self, block => block.capacity())
    }

    fn get(&self, index: usize) -> i64 {
        with_inner!(self, block => block.get(index))
    }

    fn set(&mut self, index: usize, value: i64) -> Result<(), ValueBeyondLimit> {
        with_inner!(self, block => block.set(index, value))
    }

    fn is_valid(&self, value: i64) -> bool {
        with_inner!(self, block => block.is_valid(value))
    }

    fn accommodate(&mut self, index: usize) {
        with_inner!(self, block => block.accommodate(index))
    }

    fn shrinkwrap(&mut self, room_percentage: u32) {
        with_inner!(self, block => block.shrinkwrap(room_percentage))
    }

    fn clear(&mut self) {
        with_inner!(self, block => block.clear())
    }
}

/// Chooses a successor block able to hold `value_to_accommodate` along with
/// everything the predecessor held.
pub type BlockFactory = fn(value_to_accommodate: i64, capacity: usize) -> Storage;

/// The default factory: an [`Variant::UnsignedOrNull`] bit block at the
/// narrowest smart width while 32 bits or fewer suffice, then a 64-bit
/// fixed-width block. Keeps reference-packing structures in the 1..21-bit
/// range until their indices genuinely outgrow it.
pub fn bitwise_growth(value_to_accommodate: i64, capacity: usize) -> Storage {
    let required = Variant::UnsignedOrNull.bits_required_for(value_to_accommodate);
    if required <= 32 {
        Storage::Bits(BitBlock::new(
            Variant::UnsignedOrNull,
            smart_entry_size(required),
            capacity,
        ))
    } else {
        Storage::Long(LongBlock::new(capacity))
    }
}

/// A factory for callers who prefer byte-aligned storage: the narrowest of
/// the four fixed-width blocks that fits the value.
pub fn byte_aligned_growth(value_to_accommodate: i64, capacity: usize) -> Storage {
    if ByteBlock::is_valid_value(value_to_accommodate) {
        Storage::Byte(ByteBlock::new(capacity))
    } else if ShortBlock::is_valid_value(value_to_accommodate) {
        Storage::Short(ShortBlock::new(capacity))
    } else if IntBlock::is_valid_value(value_to_accommodate) {
        Storage::Int(IntBlock::new(capacity))
    } else {
        Storage::Long(LongBlock::new(capacity))
    }
}

/// A block that transparently widens its storage instead of rejecting
/// values.
///
/// # Example
///
/// ```rust
/// use transpose_tree::InflatableBlock;
///
/// let mut block = InflatableBlock::new(4);
/// block.add(3);             // fits in 3 bits
/// block.add(5_000_000_000); // silently inflates to 64-bit storage
/// assert_eq!(block.get(0), 3);
/// assert_eq!(block.get(1), 5_000_000_000);
/// ```
#[derive(Debug, Clone)]
pub struct InflatableBlock {
    inner: Storage,
    factory: BlockFactory,
}

impl InflatableBlock {
    /// Create a block with the default [`bitwise_growth`] factory. The
    /// initial storage is the narrowest the factory offers.
    pub fn new(initial_capacity: usize) -> Self {
        Self::with_factory(initial_capacity, bitwise_growth)
    }

    /// Create a block that inflates through `factory`.
    pub fn with_factory(initial_capacity: usize, factory: BlockFactory) -> Self {
        InflatableBlock {
            inner: factory(0, initial_capacity),
            factory,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the block has no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Storage slots currently available without reallocating.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// The entry at `index`. Panics if `index >= len()`.
    pub fn get(&self, index: usize) -> i64 {
        self.inner.get(index)
    }

    /// Store `value` at `index`, inflating the storage first if it does not
    /// fit. Panics if `index > len()`.
    pub fn set(&mut self, index: usize, value: i64) {
        if self.inner.set(index, value).is_err() {
            self.inflate(index, value);
        }
    }

    /// Append `value` at the end of the block.
    pub fn add(&mut self, value: i64) {
        self.set(self.len(), value);
    }

    /// Ensure capacity for at least `index + 1` entries.
    pub fn accommodate(&mut self, index: usize) {
        self.inner.accommodate(index);
    }

    /// Resize the inner block's buffer to the population plus
    /// `room_percentage` percent of headroom.
    pub fn shrinkwrap(&mut self, room_percentage: u32) {
        self.inner.shrinkwrap(room_percentage);
    }

    /// Drop all entries and release the inner buffer.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Iterate the entries in index order.
    pub fn iter(&self) -> Entries<'_, Storage> {
        self.inner.iter()
    }

    /// The block currently backing this adapter. Useful for reporting on
    /// memory usage.
    pub fn current_storage(&self) -> &Storage {
        &self.inner
    }

    /// Bytes currently held by the backing buffer.
    pub fn heap_bytes(&self) -> usize {
        self.inner.heap_bytes()
    }

    fn inflate(&mut self, index: usize, value: i64) {
        let mut replacement = (self.factory)(value, self.inner.len() + 1);
        for existing in self.inner.iter() {
            replacement
                .add(existing)
                .expect("an inflated block must accommodate every existing value");
        }
        replacement
            .set(index, value)
            .expect("an inflated block must accommodate the value that triggered inflation");
        self.inner = replacement;
    }
}
