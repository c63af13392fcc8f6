// SPDX-License-Identifier: MIT OR Apache-2.0

//! Path operations on configuration trees.

use crate::domain::config_key::ConfigKey;
use crate::domain::value::{Tree, Value};

/// Finds the node addressed by `key`.
///
/// The root key addresses the tree itself, which is not a `Value`, so it
/// yields `None` here; callers wanting the whole tree read it directly.
pub fn lookup<'a>(tree: &'a Tree, key: &ConfigKey) -> Option<&'a Value> {
    let mut segments = key.segments();
    let mut current = tree.get(segments.next()?)?;
    for segment in segments {
        current = current.as_map()?.get(segment)?;
    }
    Some(current)
}

/// Inserts `value` at `path`, creating intermediate maps as needed.
///
/// Any scalar or list found where an intermediate map is required is replaced
/// by a fresh map. A scalar never replaces an existing map at the final
/// segment either, so deeper paths win over shallower ones regardless of
/// insertion order. An empty path is ignored.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::{insert_nested, Tree, Value};
///
/// let mut tree = Tree::new();
/// insert_nested(&mut tree, &["db", "host"], Value::from("localhost"));
/// insert_nested(&mut tree, &["db"], Value::from("ignored"));
/// assert!(tree["db"].is_map());
/// ```
pub fn insert_nested<S: AsRef<str>>(tree: &mut Tree, path: &[S], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = tree;
    for segment in parents {
        let child = current
            .entry(segment.as_ref().to_string())
            .or_insert_with(|| Value::Map(Tree::new()));
        if !child.is_map() {
            *child = Value::Map(Tree::new());
        }
        let Value::Map(next) = child else {
            return;
        };
        current = next;
    }

    let last = last.as_ref();
    if !value.is_map() && current.get(last).is_some_and(Value::is_map) {
        tracing::debug!("keeping nested map at '{}' over a shallower scalar", last);
        return;
    }
    current.insert(last.to_string(), value);
}

/// Lists the dotted path of every leaf, in key order.
///
/// Lists count as leaves; empty maps contribute nothing.
pub fn leaf_keys(tree: &Tree) -> Vec<String> {
    let mut keys = Vec::new();
    collect_leaf_keys(tree, &ConfigKey::from(""), &mut keys);
    keys
}

fn collect_leaf_keys(tree: &Tree, prefix: &ConfigKey, keys: &mut Vec<String>) {
    for (name, value) in tree {
        let key = prefix.child(name);
        match value {
            Value::Map(child) => collect_leaf_keys(child, &key, keys),
            _ => keys.push(key.into_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        let mut tree = Tree::new();
        insert_nested(&mut tree, &["server", "port"], Value::from(8080));
        insert_nested(&mut tree, &["server", "tls", "enabled"], Value::from(true));
        insert_nested(&mut tree, &["name"], Value::from("svc"));
        insert_nested(
            &mut tree,
            &["hosts"],
            Value::List(vec![Value::from("a"), Value::from("b")]),
        );
        tree
    }

    #[test]
    fn test_lookup() {
        let tree = sample();
        assert_eq!(
            lookup(&tree, &ConfigKey::from("server.port")),
            Some(&Value::Integer(8080))
        );
        assert!(lookup(&tree, &ConfigKey::from("server")).unwrap().is_map());
        assert_eq!(lookup(&tree, &ConfigKey::from("server.port.x")), None);
        assert_eq!(lookup(&tree, &ConfigKey::from("missing")), None);
        assert_eq!(lookup(&tree, &ConfigKey::from("")), None);
    }

    #[test]
    fn test_insert_replaces_intermediate_scalar() {
        let mut tree = Tree::new();
        insert_nested(&mut tree, &["db"], Value::from("scalar"));
        insert_nested(&mut tree, &["db", "host"], Value::from("h"));
        assert_eq!(
            lookup(&tree, &ConfigKey::from("db.host")),
            Some(&Value::from("h"))
        );
    }

    #[test]
    fn test_insert_keeps_deeper_map() {
        let mut tree = Tree::new();
        insert_nested(&mut tree, &["db", "host"], Value::from("h"));
        insert_nested(&mut tree, &["db"], Value::from("scalar"));
        assert!(tree["db"].is_map());
    }

    #[test]
    fn test_insert_empty_path_is_noop() {
        let mut tree = Tree::new();
        let empty: [&str; 0] = [];
        insert_nested(&mut tree, &empty, Value::from(1));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_leaf_keys() {
        let mut tree = sample();
        tree.insert("empty".to_string(), Value::Map(Tree::new()));
        assert_eq!(
            leaf_keys(&tree),
            vec!["hosts", "name", "server.port", "server.tls.enabled"]
        );
    }
}
