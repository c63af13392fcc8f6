// SPDX-License-Identifier: MIT OR Apache-2.0

//! Placeholder expansion trait definition.
//!
//! Expansion never reads ambient state: the variable lookup is always passed
//! in, which keeps expanders pure and testable.

use crate::domain::Result;
use std::sync::Arc;

/// Resolves an effective variable name such as `HOST` or `REDIS_PORT`.
pub type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Rewrites `${source.key|default}` tokens inside a string.
pub trait VariableExpander: Send + Sync {
    /// Returns `input` with every token replaced.
    ///
    /// # Errors
    ///
    /// Returns a placeholder error for malformed tokens.
    fn expand(&self, input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<String>;
}

/// Builds a lookup that reads process environment variables as `prefix + name`.
///
/// # Examples
///
/// ```
/// use cfgweave::ports::env_lookup;
///
/// let lookup = env_lookup("CFGWEAVE_DOCTEST_");
/// assert_eq!(lookup("SURELY_UNSET_VARIABLE"), None);
/// ```
pub fn env_lookup(prefix: impl Into<String>) -> Lookup {
    let prefix = prefix.into();
    Arc::new(move |name: &str| std::env::var(format!("{}{}", prefix, name)).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl VariableExpander for Upper {
        fn expand(&self, input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<String> {
            Ok(lookup(input).unwrap_or_else(|| input.to_uppercase()))
        }
    }

    #[test]
    fn test_lookup_is_injected() {
        let hit = |name: &str| (name == "x").then(|| "found".to_string());
        assert_eq!(Upper.expand("x", &hit).unwrap(), "found");
        assert_eq!(Upper.expand("y", &hit).unwrap(), "Y");
    }

    #[test]
    fn test_env_lookup_uses_prefix() {
        std::env::set_var("CFGWEAVE_PORT_TEST_VALUE", "6380");
        let lookup = env_lookup("CFGWEAVE_PORT_TEST_");
        assert_eq!(lookup("VALUE").as_deref(), Some("6380"));
        assert_eq!(lookup("MISSING"), None);
        std::env::remove_var("CFGWEAVE_PORT_TEST_VALUE");
    }
}
