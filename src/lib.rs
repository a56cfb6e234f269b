//! Small allocator-aware containers for constrained targets.
//!
//! - [`vector::Vector`]: a growable contiguous sequence backed by an injected allocator.
//! - [`fixed_map::FixedMap`]: a hash map with a compile-time number of chained buckets.
//! - [`ring::Ring`]: a fixed-capacity circular queue that overwrites its oldest element.
//!
//! Heap-using containers are generic over [`allocator::Allocator`] and default to
//! [`allocator::Global`]. [`allocator::FnAllocator`] plugs a C-style
//! `malloc`/`realloc`/`free` triple into the same slot.

#![no_std]

#[cfg(test)]
extern crate std;

mod util;
pub mod allocator;
pub mod pair;
pub mod vector;
pub mod fixed_map;
pub mod ring;

pub use allocator::{AllocError, Allocator, FnAllocator, Global};
pub use fixed_map::{FixedMap, InsertError};
pub use pair::Pair;
pub use ring::Ring;
pub use vector::Vector;
