//! Composite index keys.
//!
//! Layout (all text, byte-ordered):
//!
//! ```text
//! original   \0 i \0 {entity} \0 {field} \x01 {steps} \0 {value} \0 {primary}
//! compacted  \0 c \0 {entity} \0 {field} \x01 {steps} \0 {value}
//! step       [ {index} \x01    |    { {map key} \x01
//! ```
//!
//! User text (map keys, values, primary keys) is escaped so the separator,
//! step marker and escape byte never appear raw. The escape keeps ordering,
//! so a scan from a prefix to `prefix + char::MAX` walks the keys under that
//! prefix in value order.
//!
//! `char::MAX` itself has no escape: a key whose next character after the
//! prefix is U+10FFFF would sort past the bound. Text values and primary
//! keys holding it are therefore rejected before any key is built. Map keys
//! are always followed by a step marker, so they may hold it.
mod path;

#[cfg(test)]
mod tests;

pub use path::{FieldPath, PathStep};

use thiserror::Error as ThisError;

///
/// CONSTANTS
///

pub const SEP: char = '\u{0}';
pub const STEP: char = '\u{1}';
pub const ESC: char = '\u{2}';

/// Namespace tag of narrow index keys.
pub const INDEX_TAG: char = 'i';

/// Namespace tag of compacted index records.
pub const COMPACT_TAG: char = 'c';

/// Trailing sentinel that turns a prefix into an exclusive scan bound.
/// Never allowed in text values or primary keys.
pub const KEY_MAX_CHAR: char = char::MAX;

///
/// KeyDecodeError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum KeyDecodeError {
    #[error("key is not in the '{tag}' namespace")]
    Namespace { tag: char },

    #[error("key has {found} components, expected {expected}")]
    Arity { found: usize, expected: usize },

    #[error("field path is not terminated")]
    UnterminatedPath,

    #[error("invalid path step '{0}'")]
    Step(String),

    #[error("invalid escape sequence")]
    Escape,
}

/// True for the characters the key layout reserves.
#[must_use]
pub const fn is_reserved(c: char) -> bool {
    matches!(c, SEP | STEP | ESC)
}

#[must_use]
pub fn contains_reserved(s: &str) -> bool {
    s.chars().any(is_reserved)
}

/// Escape reserved characters: `\0 -> \x02 0`, `\x01 -> \x02 1`, `\x02 -> \x02 2`.
pub fn escape_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            SEP => {
                out.push(ESC);
                out.push('0');
            }
            STEP => {
                out.push(ESC);
                out.push('1');
            }
            ESC => {
                out.push(ESC);
                out.push('2');
            }
            c => out.push(c),
        }
    }
}

#[must_use]
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    escape_into(s, &mut out);
    out
}

pub fn unescape(s: &str) -> Result<String, KeyDecodeError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        match c {
            ESC => match chars.next() {
                Some('0') => out.push(SEP),
                Some('1') => out.push(STEP),
                Some('2') => out.push(ESC),
                _ => return Err(KeyDecodeError::Escape),
            },
            SEP | STEP => return Err(KeyDecodeError::Escape),
            c => out.push(c),
        }
    }

    Ok(out)
}

/// Exclusive upper bound for a prefix scan.
#[must_use]
pub fn upper_bound(start: &str) -> String {
    let mut end = String::with_capacity(start.len() + KEY_MAX_CHAR.len_utf8());
    end.push_str(start);
    end.push(KEY_MAX_CHAR);
    end
}

/// `\0{tag}\0{entity}\0`
#[must_use]
pub fn namespace_prefix(tag: char, entity: &str) -> String {
    let mut out = String::with_capacity(entity.len() + 4);
    out.push(SEP);
    out.push(tag);
    out.push(SEP);
    out.push_str(entity);
    out.push(SEP);
    out
}

/// Prefix shared by every key under one top-level field.
#[must_use]
pub fn field_prefix(tag: char, entity: &str, field: &str) -> String {
    let mut out = namespace_prefix(tag, entity);
    out.push_str(field);
    out.push(STEP);
    out
}

/// Prefix shared by every key under `path`, including deeper paths.
#[must_use]
pub fn path_prefix(tag: char, entity: &str, path: &FieldPath) -> String {
    let mut out = field_prefix(tag, entity, path.field());
    path.encode_steps_into(&mut out);
    out
}

/// Prefix shared by every leaf stored exactly at `path` (value follows).
#[must_use]
pub fn value_prefix(tag: char, entity: &str, path: &FieldPath) -> String {
    let mut out = path_prefix(tag, entity, path);
    out.push(SEP);
    out
}

///
/// IndexKey
///
/// One narrow index entry: a leaf value of one document at one path.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct IndexKey {
    pub entity: String,
    pub path: FieldPath,
    /// Canonical value text (see `encode::canonical`).
    pub value: String,
    pub primary: String,
}

impl IndexKey {
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = value_prefix(INDEX_TAG, &self.entity, &self.path);
        escape_into(&self.value, &mut out);
        out.push(SEP);
        escape_into(&self.primary, &mut out);
        out
    }

    pub fn decode(key: &str) -> Result<Self, KeyDecodeError> {
        let parts = split_namespace(key, INDEX_TAG, 4)?;

        Ok(Self {
            entity: parts[0].to_string(),
            path: FieldPath::decode(parts[1])?,
            value: unescape(parts[2])?,
            primary: unescape(parts[3])?,
        })
    }

    /// The compacted key this entry folds into.
    #[must_use]
    pub fn compact_key(&self) -> CompactKey {
        CompactKey {
            entity: self.entity.clone(),
            path: self.path.clone(),
            value: self.value.clone(),
        }
    }
}

///
/// CompactKey
///
/// An [`IndexKey`] truncated before the primary key. Every narrow entry
/// sharing entity, path and value folds into the same compacted record.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CompactKey {
    pub entity: String,
    pub path: FieldPath,
    pub value: String,
}

impl CompactKey {
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = value_prefix(COMPACT_TAG, &self.entity, &self.path);
        escape_into(&self.value, &mut out);
        out
    }

    pub fn decode(key: &str) -> Result<Self, KeyDecodeError> {
        let parts = split_namespace(key, COMPACT_TAG, 3)?;

        Ok(Self {
            entity: parts[0].to_string(),
            path: FieldPath::decode(parts[1])?,
            value: unescape(parts[2])?,
        })
    }
}

fn split_namespace(key: &str, tag: char, expected: usize) -> Result<Vec<&str>, KeyDecodeError> {
    let head: String = [SEP, tag, SEP].iter().collect();
    let rest = key
        .strip_prefix(head.as_str())
        .ok_or(KeyDecodeError::Namespace { tag })?;
    let parts: Vec<&str> = rest.split(SEP).collect();

    if parts.len() != expected {
        return Err(KeyDecodeError::Arity {
            found: parts.len(),
            expected,
        });
    }

    Ok(parts)
}
