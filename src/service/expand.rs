// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default placeholder expansion.
//!
//! Tokens have the shape `${source.key}` or `${source.key|default}`. The
//! effective lookup name is `key` itself for the `env` source and
//! `SOURCE_KEY` (both upper-cased) for any other source, so
//! `${redis.port|6379}` asks the lookup for `REDIS_PORT`.

use crate::domain::{ConfigError, Result, Tree, Value};
use crate::ports::VariableExpander;

/// What to substitute when a token misses and has no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnresolvedPolicy {
    /// Substitute the empty string.
    #[default]
    Empty,
    /// Fail with [`ConfigError::UnresolvedPlaceholder`].
    Fail,
}

/// The built-in `${source.key|default}` expander.
///
/// Tokens do not nest: the first `}` after `${` closes the token.
///
/// # Examples
///
/// ```
/// use cfgweave::ports::VariableExpander;
/// use cfgweave::service::DefaultExpander;
///
/// let lookup = |name: &str| (name == "REDIS_PORT").then(|| "6380".to_string());
/// let expander = DefaultExpander::new();
///
/// assert_eq!(expander.expand("${redis.port|6379}", &lookup).unwrap(), "6380");
/// assert_eq!(expander.expand("${env.HOST|127.0.0.1}", &lookup).unwrap(), "127.0.0.1");
/// assert!(expander.expand("${env.HOST", &lookup).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExpander {
    policy: UnresolvedPolicy,
}

impl DefaultExpander {
    /// Creates a lenient expander: misses without a default become `""`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an expander that rejects misses without a default.
    pub fn strict() -> Self {
        Self {
            policy: UnresolvedPolicy::Fail,
        }
    }

    /// Returns the policy for unresolved tokens.
    pub fn policy(&self) -> UnresolvedPolicy {
        self.policy
    }

    fn resolve(
        &self,
        input: &str,
        token: &str,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<String> {
        let malformed = |message: &str| ConfigError::PlaceholderError {
            input: input.to_string(),
            message: message.to_string(),
        };

        let token = token.trim();
        if token.is_empty() {
            return Err(malformed("empty placeholder"));
        }

        let (main, default) = match token.split_once('|') {
            Some((main, default)) => (main.trim(), Some(default.trim())),
            None => (token, None),
        };
        let (source, key) = main
            .split_once('.')
            .ok_or_else(|| malformed("expected ${source.key}"))?;
        let (source, key) = (source.trim(), key.trim());
        if source.is_empty() {
            return Err(malformed("empty source"));
        }
        if key.is_empty() {
            return Err(malformed("empty key"));
        }

        let name = lookup_name(source, key);
        if let Some(value) = lookup(&name) {
            return Ok(value);
        }
        match (default, self.policy) {
            (Some(default), _) => Ok(default.to_string()),
            (None, UnresolvedPolicy::Empty) => Ok(String::new()),
            (None, UnresolvedPolicy::Fail) => Err(ConfigError::UnresolvedPlaceholder { name }),
        }
    }
}

impl VariableExpander for DefaultExpander {
    fn expand(&self, input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<String> {
        if !input.contains("${") {
            return Ok(input.to_string());
        }

        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find('}').ok_or_else(|| ConfigError::PlaceholderError {
                input: input.to_string(),
                message: "placeholder not closed".to_string(),
            })?;
            out.push_str(&self.resolve(input, &after[..end], lookup)?);
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Returns the name a token asks the lookup for.
pub fn lookup_name(source: &str, key: &str) -> String {
    if source == "env" {
        key.to_string()
    } else {
        format!("{}_{}", source.to_uppercase(), key.to_uppercase())
    }
}

/// Expands every string leaf of `tree` in place, including strings inside
/// nested maps and lists.
pub fn expand_tree(
    tree: &mut Tree,
    expander: &dyn VariableExpander,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<()> {
    for value in tree.values_mut() {
        expand_value(value, expander, lookup)?;
    }
    Ok(())
}

fn expand_value(
    value: &mut Value,
    expander: &dyn VariableExpander,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<()> {
    match value {
        Value::String(s) => *s = expander.expand(s, lookup)?,
        Value::Map(child) => expand_tree(child, expander, lookup)?,
        Value::List(items) => {
            for item in items {
                expand_value(item, expander, lookup)?;
            }
        }
        _ => {}
    }
    Ok(())
}
