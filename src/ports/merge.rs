// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merge strategy trait definition.

use crate::domain::{Result, Tree};

/// Combines an accumulated tree with the next source's tree.
///
/// Sources are folded left to right, so `src` has the higher precedence.
/// Implementations may mutate and return `dst`; `src` is borrowed and must not
/// be modified. The operation is not commutative.
pub trait MergeStrategy: Send + Sync {
    /// Merges `src` into `dst` and returns the result.
    ///
    /// # Errors
    ///
    /// Custom strategies may refuse a merge with a merge error.
    fn merge(&self, dst: Tree, src: &Tree) -> Result<Tree>;
}
