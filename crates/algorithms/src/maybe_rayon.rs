//! Row-loop execution shim.
//!
//! With the `parallel` feature, per-row loops inside a single raster
//! operation run on rayon's pool. Without it (the default, matching the
//! pipeline's one-feature-at-a-time model) `into_par_iter()` is plain
//! `into_iter()` and the rest of the chain resolves to `Iterator` methods.
#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
