#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]
#![deny(unconditional_recursion)]
#![allow(clippy::duplicated_attributes)]
#![allow(clippy::len_without_is_empty)]

#[cfg(not(target_pointer_width = "64"))]
compile_error!("`target_pointer_width` must be 64");

pub mod bits;
pub mod collab;
pub mod config;
pub mod estimator;
pub mod layout;
pub mod npm;
pub mod pool;
pub mod sparse;
pub mod topk;

pub mod prelude {
    pub use crate::bits::*;
    pub use crate::collab::*;
    pub use crate::config::CounterConfig;
    pub use crate::estimator::should_use_sparse;
    pub use crate::layout::{plan, PlaneDescriptor};
    pub use crate::npm::{NPlaneMutable, NpmOptions, Plane, PlaneVariant};
    pub use crate::pool::{
        AcquireRequest, Backing, CounterPool, FieldPool, Janitor, PoolMemoryReport, PoolRegistry,
    };
    pub use crate::sparse::SparseCounter;
    pub use crate::topk::BHeap;
    pub use crate::DivCeilUnchecked;
}

/// A trait for performing division with ceiling rounding without checking for division by zero.
pub trait DivCeilUnchecked {
    /// Divides `self` by `rhs` and returns the result rounded up to the nearest integer.
    ///
    /// # Examples
    ///
    /// ```
    /// use facetcore::DivCeilUnchecked;
    /// assert_eq!(5usize.div_ceil_unchecked(2), 3);
    /// assert_eq!(10usize.div_ceil_unchecked(3), 4);
    /// ```
    fn div_ceil_unchecked(self, rhs: Self) -> Self;
}

impl DivCeilUnchecked for usize {
    #[inline(always)]
    fn div_ceil_unchecked(self, rhs: Self) -> Self {
        (self + rhs - 1) / rhs
    }
}
impl DivCeilUnchecked for u64 {
    #[inline(always)]
    fn div_ceil_unchecked(self, rhs: Self) -> Self {
        (self + rhs - 1) / rhs
    }
}
