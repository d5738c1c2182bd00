//! Provide hash containers, re-exports *hashbrown* and *foldhash*.
//!
//! The default [`HashMap`]/[`HashSet`] aliases use [`FixedHashState`],
//! which produces stable hashes across runs through a fixed seed.

use core::fmt::Debug;
use core::hash::{BuildHasher, Hasher};

use foldhash::fast::{FixedState, FoldHasher};

// -----------------------------------------------------------------------------
// Aliases

/// A [`hashbrown::HashMap`] with a fixed hash seed.
pub type HashMap<K, V, S = FixedHashState> = hashbrown::HashMap<K, V, S>;

/// A [`hashbrown::HashSet`] with a fixed hash seed.
pub type HashSet<T, S = FixedHashState> = hashbrown::HashSet<T, S>;

// -----------------------------------------------------------------------------
// FixedHasher

/// A fixed hash seed.
const FIXED_HASH_STATE: FixedState = FixedState::with_seed(0xC74E_61D5_53BE_0226);

/// A fixed hasher provided hash results that only related on the input.
///
/// A type alias for [`foldhash::fast::FoldHasher`] .
///
/// Which can be created through [`FixedHashState::build_hasher`].
pub type FixedHasher = FoldHasher<'static>;

/// Fixed Hash State based upon a random but fixed seed.
///
/// Based on `foldhash`, but changed the fixed seed.
///
/// # Examples
///
/// ```
/// use core::hash::{Hash, Hasher, BuildHasher};
/// use morph_utils::hash::FixedHashState;
///
/// let mut hasher = FixedHashState.build_hasher();
/// 3.hash(&mut hasher);
/// let result = hasher.finish();
///
/// println!("Hash Result {result}"); // Fixed Result
/// ```
#[derive(Copy, Clone, Default, Debug)]
pub struct FixedHashState;

impl BuildHasher for FixedHashState {
    type Hasher = FixedHasher;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        FIXED_HASH_STATE.build_hasher()
    }
}

// -----------------------------------------------------------------------------
// NoOpHasher

/// A no-op hash that directly pass value through `u64`.
///
/// Which can be created through [`NoOpHashState::build_hasher`].
#[derive(Copy, Clone, Default, Debug)]
pub struct NoOpHasher {
    hash: u64,
}

impl Hasher for NoOpHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        // Usually recommended to use `write_u64` directly
        for byte in bytes.iter().rev() {
            // rotate left ensure that `write_u32(10)` is eq to `write_u64(10)`.
            self.hash = self.hash.rotate_left(8).wrapping_add(*byte as u64);
        }
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.hash = i;
    }
}

/// A fixed hasher without any additional operations.
///
/// Only storing one `u64` and assigning values directly by `write_u64`.
///
/// Suitable for keys that already are hashes, such as `TypeId`.
///
/// # Examples
///
/// ```
/// use core::hash::{Hash, Hasher, BuildHasher};
/// use morph_utils::hash::NoOpHashState;
///
/// let mut hasher = NoOpHashState.build_hasher();
/// 3.hash(&mut hasher);
/// let result = hasher.finish();
///
/// assert_eq!(result, 3_u64);
/// ```
#[derive(Copy, Clone, Default, Debug)]
pub struct NoOpHashState;

impl BuildHasher for NoOpHashState {
    type Hasher = NoOpHasher;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        NoOpHasher { hash: 0 }
    }
}

// -----------------------------------------------------------------------------
// Re-export crates

pub use foldhash;
pub use hashbrown;
