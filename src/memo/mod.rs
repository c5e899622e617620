//! Memoization Module
//!
//! Caches the results of async producers keyed by their arguments.

mod category;
mod memoizer;

pub use category::Category;
pub use memoizer::{Memoized, Memoizer};
