// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default merge strategy.

use crate::domain::{Result, Tree, Value};
use crate::ports::MergeStrategy;

/// Recursive last-source-wins merge.
///
/// For every key of `src`: when both sides hold a map the two maps are merged
/// recursively; otherwise the value from `src` replaces the one in `dst`.
/// Lists are replaced, never concatenated. This strategy never fails.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::{Tree, Value};
/// use cfgweave::ports::MergeStrategy;
/// use cfgweave::service::DeepMerge;
///
/// let mut a = Tree::new();
/// a.insert("host".to_string(), Value::from("a"));
/// let mut b = Tree::new();
/// b.insert("host".to_string(), Value::from("b"));
/// b.insert("port".to_string(), Value::from(1));
///
/// let merged = DeepMerge.merge(a, &b).unwrap();
/// assert_eq!(merged, b);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DeepMerge;

impl MergeStrategy for DeepMerge {
    fn merge(&self, dst: Tree, src: &Tree) -> Result<Tree> {
        Ok(deep_merge(dst, src))
    }
}

/// Merges `src` into `dst`, recursing only where both sides are maps.
pub fn deep_merge(mut dst: Tree, src: &Tree) -> Tree {
    for (key, incoming) in src {
        if let (Some(Value::Map(existing)), Value::Map(incoming)) = (dst.get_mut(key), incoming) {
            let merged = deep_merge(std::mem::take(existing), incoming);
            *existing = merged;
            continue;
        }
        dst.insert(key.clone(), incoming.clone());
    }
    dst
}
