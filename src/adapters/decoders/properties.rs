// SPDX-License-Identifier: MIT OR Apache-2.0

//! Java properties format.
//!
//! The grammar follows `java.util.Properties`:
//!
//! ```text
//! # comment
//! ! also a comment
//! app.name = MyApp
//! timeout: 5000
//! path /tmp/test
//! message = hello\u4F60\u597D
//! long.value = first \
//!              second
//! ```
//!
//! A physical line ending in an odd number of backslashes continues on the
//! next one; the continuation's leading whitespace is dropped. Keys and values
//! understand `\t`, `\n`, `\r`, `\\` and `\uXXXX`; any other escaped character
//! stands for itself.

use crate::domain::{insert_nested, ConfigError, Result, Tree, Value};
use crate::ports::Decoder;
use std::collections::BTreeMap;

/// Parses properties text into a flat key/value map.
///
/// Later duplicates of a key replace earlier ones.
///
/// # Errors
///
/// Returns a grammar error for a trailing lone backslash inside a key or value,
/// a malformed `\uXXXX` escape, or a continuation on the final line.
///
/// # Examples
///
/// ```
/// use cfgweave::adapters::decoders::parse_properties;
///
/// let props = parse_properties("path = C:\\\\test\\\\file\nmessage = hello\\u4F60\\u597D").unwrap();
/// assert_eq!(props["path"], "C:\\test\\file");
/// assert_eq!(props["message"], "hello你好");
/// ```
pub fn parse_properties(text: &str) -> Result<BTreeMap<String, String>> {
    let mut entries = BTreeMap::new();

    for (line_no, line) in logical_lines(text)? {
        let line = line.trim();
        if line.is_empty() || is_comment(line) {
            continue;
        }

        let (raw_key, raw_value) = split_key_value(line);
        let key = unescape(raw_key).map_err(|message| ConfigError::GrammarError {
            line: line_no,
            message: format!("invalid key {:?}: {}", raw_key, message),
        })?;
        let value = unescape(raw_value).map_err(|message| ConfigError::GrammarError {
            line: line_no,
            message: format!("invalid value for key {:?}: {}", key, message),
        })?;

        entries.insert(key, value);
    }

    Ok(entries)
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with('!')
}

/// Joins continued physical lines. Each logical line carries the one-based
/// number of the physical line it starts on.
fn logical_lines(text: &str) -> Result<Vec<(usize, String)>> {
    let mut lines = Vec::new();
    let mut buf = String::new();
    let mut start = 0;
    let mut continuing = false;

    for (idx, raw) in text.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if continuing {
            buf.push_str(line.trim_start());
        } else {
            buf.clear();
            start = idx + 1;
            buf.push_str(line.trim());
            if is_comment(&buf) {
                lines.push((start, std::mem::take(&mut buf)));
                continue;
            }
        }

        let trailing = buf.chars().rev().take_while(|c| *c == '\\').count();
        if trailing % 2 == 1 {
            buf.pop();
            continuing = true;
        } else {
            continuing = false;
            lines.push((start, std::mem::take(&mut buf)));
        }
    }

    if continuing {
        return Err(ConfigError::GrammarError {
            line: start,
            message: "unterminated line continuation at end of input".to_string(),
        });
    }
    Ok(lines)
}

/// Splits at the first `=` or `:`, else at the first whitespace, else the
/// whole line is the key. Both halves are trimmed.
fn split_key_value(line: &str) -> (&str, &str) {
    if let Some(idx) = line.find(&['=', ':'][..]) {
        return (line[..idx].trim(), line[idx + 1..].trim());
    }
    if let Some(idx) = line.find(char::is_whitespace) {
        return (line[..idx].trim(), line[idx..].trim());
    }
    (line, "")
}

fn unescape(s: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let Some(escaped) = chars.next() else {
            return Err("invalid escape sequence at end of string".to_string());
        };
        match escaped {
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            'u' => {
                let rest = chars.as_str();
                let unit = rest
                    .get(..4)
                    .and_then(hex4)
                    .ok_or_else(|| format!("invalid unicode escape \\u{}", preview(rest)))?;
                let mut rest = &rest[4..];

                let ch = if (0xD800..0xDC00).contains(&unit) {
                    let low = rest
                        .strip_prefix("\\u")
                        .and_then(|r| r.get(..4))
                        .and_then(hex4)
                        .filter(|low| (0xDC00..0xE000).contains(low));
                    low.and_then(|low| {
                        rest = &rest[6..];
                        char::from_u32(0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00))
                    })
                } else {
                    char::from_u32(unit)
                };

                out.push(ch.ok_or_else(|| format!("invalid unicode code point \\u{:04X}", unit))?);
                chars = rest.chars();
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

fn hex4(digits: &str) -> Option<u32> {
    if digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        u32::from_str_radix(digits, 16).ok()
    } else {
        None
    }
}

fn preview(rest: &str) -> String {
    rest.chars().take(4).collect()
}

/// Decoder for the `properties` format.
///
/// Dotted keys become nested maps, so `db.host=x` is reachable as `db.host`.
/// All leaves are strings.
#[derive(Debug, Clone, Default)]
pub struct PropertiesDecoder;

impl PropertiesDecoder {
    /// Creates a new properties decoder.
    pub fn new() -> Self {
        PropertiesDecoder
    }
}

impl Decoder for PropertiesDecoder {
    fn format(&self) -> &str {
        "properties"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Tree> {
        let text = std::str::from_utf8(bytes).map_err(|e| ConfigError::parse_error("properties", e))?;
        Ok(nest_properties(parse_properties(text)?))
    }
}

/// Nests flat dotted keys into a tree of string leaves.
pub fn nest_properties(entries: BTreeMap<String, String>) -> Tree {
    let mut tree = Tree::new();
    for (key, value) in entries {
        let path: Vec<&str> = key.split('.').filter(|s| !s.is_empty()).collect();
        insert_nested(&mut tree, &path, Value::String(value));
    }
    tree
}
