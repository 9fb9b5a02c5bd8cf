//! Field-query evaluator.
//!
//! A predicate is `<path> <op> <literal>`, e.g. `Name == Alice`,
//! `Meta.city != "New York"`, `grid[0] >= 2`. The literal is converted to
//! the leaf kind declared for the path and rendered as canonical text, so
//! the comparison runs directly against index key values.
//!
//! Paths that stop above the leaf level match any position below them:
//! `Tags == x` matches `x` at every list index.

use crate::{
    compact::CompactedRecord,
    encode::canonical::{encode_f64, encode_i64, encode_u64},
    error::{Error, ErrorCode},
    key::{self, COMPACT_TAG, CompactKey, FieldPath, INDEX_TAG, IndexKey, PathStep, SEP},
    model::KindTag,
    schema::SchemaDescriptor,
    store::{KvEntry, KvStore},
};
use std::{cmp::Ordering, collections::BTreeMap, fmt};
use thiserror::Error as ThisError;
use tracing::warn;

///
/// QueryError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum QueryError {
    #[error("query syntax error in '{predicate}': expected '<field> <operator> <value>'")]
    Syntax { predicate: String },

    #[error("unknown operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("field '{field}' not found or not indexed")]
    UnknownField { field: String },

    #[error("path '{path}' goes deeper than the field")]
    PathOverflow { path: String },

    #[error("invalid step '{step}' in path '{path}'")]
    PathStep { path: String, step: String },

    #[error("cannot parse '{literal}' as bool")]
    ParseBool { literal: String },

    #[error("cannot parse '{literal}' as int")]
    ParseInt { literal: String },

    #[error("cannot parse '{literal}' as uint")]
    ParseUint { literal: String },

    #[error("cannot parse '{literal}' as float")]
    ParseFloat { literal: String },
}

impl QueryError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Syntax { .. } => ErrorCode::QuerySyntax,
            Self::UnknownOperator { .. } => ErrorCode::QueryUnknownOperator,
            Self::UnknownField { .. } => ErrorCode::QueryUnknownField,
            Self::PathOverflow { .. } => ErrorCode::QueryPathOverflow,
            Self::PathStep { .. } => ErrorCode::QueryPathStep,
            Self::ParseBool { .. } => ErrorCode::QueryParseBool,
            Self::ParseInt { .. } => ErrorCode::QueryParseInt,
            Self::ParseUint { .. } => ErrorCode::QueryParseUint,
            Self::ParseFloat { .. } => ErrorCode::QueryParseFloat,
        }
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

///
/// Operator
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let op = match s {
            "==" | "=" | "eq" => Self::Eq,
            "!=" | "ne" => Self::Ne,
            "<" | "lt" => Self::Lt,
            "<=" | "le" => Self::Le,
            ">" | "gt" => Self::Gt,
            ">=" | "ge" => Self::Ge,
            _ => return None,
        };

        Some(op)
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Whether `value.cmp(literal)` satisfies the operator.
    #[must_use]
    pub const fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => matches!(ordering, Ordering::Equal),
            Self::Ne => !matches!(ordering, Ordering::Equal),
            Self::Lt => matches!(ordering, Ordering::Less),
            Self::Le => !matches!(ordering, Ordering::Greater),
            Self::Gt => matches!(ordering, Ordering::Greater),
            Self::Ge => !matches!(ordering, Ordering::Less),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

///
/// Predicate
///
/// A parsed and kind-checked query.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Predicate {
    pub path: FieldPath,
    pub operator: Operator,
    /// Kind of the leaves under `path`.
    pub kind: KindTag,
    /// Literal rendered as canonical value text.
    pub value: String,
    /// True when `path` names leaves directly rather than a container.
    pub exact: bool,
}

impl Predicate {
    pub fn parse(text: &str, descriptor: &SchemaDescriptor) -> Result<Self, QueryError> {
        let syntax = || QueryError::Syntax {
            predicate: text.to_string(),
        };

        let (path, rest) = text.trim().split_once(char::is_whitespace).ok_or_else(syntax)?;
        let (operator, literal) = rest
            .trim_start()
            .split_once(char::is_whitespace)
            .ok_or_else(syntax)?;
        let literal = unquote(literal.trim());
        if literal.is_empty() && !rest.contains('"') {
            return Err(syntax());
        }

        let operator = Operator::parse(operator).ok_or_else(|| QueryError::UnknownOperator {
            operator: operator.to_string(),
        })?;
        let path = parse_path(path, descriptor)?;
        let (kind, exact) = leaf_kind(&path, descriptor);
        let value = convert_literal(kind, literal)?;

        Ok(Self {
            path,
            operator,
            kind,
            value,
            exact,
        })
    }

    /// Whether an index value (canonical text) satisfies the predicate.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        self.operator.accepts(value.cmp(self.value.as_str()))
    }

    /// `[start, end)` scan bounds in the `tag` namespace.
    ///
    /// Exact paths narrow the range by value; container paths and `!=`
    /// scan every key under the path.
    #[must_use]
    pub fn scan_range(&self, tag: char, entity: &str) -> (String, String) {
        if !self.exact || self.operator == Operator::Ne {
            let start = key::path_prefix(tag, entity, &self.path);
            let end = key::upper_bound(&start);
            return (start, end);
        }

        let values = key::value_prefix(tag, entity, &self.path);
        let mut at = values.clone();
        key::escape_into(&self.value, &mut at);
        let mut at_sep = at.clone();
        at_sep.push(SEP);

        match self.operator {
            Operator::Eq if tag == COMPACT_TAG => (at, at_sep),
            Operator::Eq => {
                let end = key::upper_bound(&at_sep);
                (at_sep, end)
            }
            Operator::Lt => (values, at),
            Operator::Le => (values, key::upper_bound(&at_sep)),
            Operator::Gt => (key::upper_bound(&at_sep), key::upper_bound(&values)),
            Operator::Ge | Operator::Ne => (at, key::upper_bound(&values)),
        }
    }

    /// Collect matching primary keys from both index namespaces.
    pub fn candidates<S>(
        &self,
        store: &S,
        descriptor: &SchemaDescriptor,
    ) -> Result<Candidates, Error>
    where
        S: KvStore + ?Sized,
    {
        let entity = descriptor.name();
        let mut candidates = Candidates::new();

        for (key, _) in scan(store, self.scan_range(INDEX_TAG, entity))? {
            match IndexKey::decode(&key) {
                Ok(decoded) if self.matches(&decoded.value) => {
                    candidates.entry(decoded.primary).or_default().confirmed = true;
                }
                Ok(_) => {}
                Err(err) => warn!(key = ?key, error = %err, "skipping malformed index key"),
            }
        }

        for (key, bytes) in scan(store, self.scan_range(COMPACT_TAG, entity))? {
            let decoded = match CompactKey::decode(&key) {
                Ok(decoded) => decoded,
                Err(err) => {
                    warn!(key = ?key, error = %err, "skipping malformed compacted key");
                    continue;
                }
            };
            if !self.matches(&decoded.value) {
                continue;
            }

            let record = CompactedRecord::decode(&bytes)?;
            for (primary, hash) in record.iter() {
                candidates
                    .entry(primary.clone())
                    .or_default()
                    .checks
                    .push(CompactedMatch {
                        path: decoded.path.clone(),
                        value: decoded.value.clone(),
                        hash: hash.clone(),
                    });
            }
        }

        Ok(candidates)
    }
}

///
/// Candidate
///
/// One primary key reached by a scan. Narrow index entries are maintained
/// with every write and confirm the match; compacted entries may be stale
/// and are checked against the current document.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Candidate {
    pub confirmed: bool,
    pub checks: Vec<CompactedMatch>,
}

///
/// CompactedMatch
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompactedMatch {
    pub path: FieldPath,
    pub value: String,
    /// Content hash recorded when the entry was folded.
    pub hash: String,
}

/// Candidates keyed (and therefore ordered) by primary key.
pub type Candidates = BTreeMap<String, Candidate>;

fn scan<S>(store: &S, (start, end): (String, String)) -> Result<Vec<KvEntry>, Error>
where
    S: KvStore + ?Sized,
{
    store
        .range_scan(&start, &end)
        .map_err(|err| Error::store(ErrorCode::QueryScan, err))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| Error::store(ErrorCode::QueryIterate, err))
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}

/// Parse `Field`, `Field[3]`, `Field.key`, `Field[0].key[2]` against the
/// descriptor's shape maps.
fn parse_path(text: &str, descriptor: &SchemaDescriptor) -> Result<FieldPath, QueryError> {
    let split = text.find(['.', '[']).unwrap_or(text.len());
    let (field, mut rest) = text.split_at(split);

    if field == descriptor.primary_field() || descriptor.field_kind(field).is_none() {
        return Err(QueryError::UnknownField {
            field: field.to_string(),
        });
    }

    let mut path = FieldPath::new(field);
    let step_error = |step: &str| QueryError::PathStep {
        path: text.to_string(),
        step: step.to_string(),
    };

    while !rest.is_empty() {
        let shape = path.shape();
        let kind = descriptor.depth_kind(&shape).unwrap_or(KindTag::Unsupported);
        if kind.is_scalar() {
            return Err(QueryError::PathOverflow {
                path: text.to_string(),
            });
        }

        if let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']').ok_or_else(|| step_error(rest))?;
            let raw = &after[..close];
            if kind != KindTag::List {
                return Err(step_error(raw));
            }
            let index = raw.parse::<usize>().map_err(|_| step_error(raw))?;
            path = path.child(PathStep::Index(index));
            rest = &after[close + 1..];
        } else if let Some(after) = rest.strip_prefix('.') {
            let end = after.find(['.', '[']).unwrap_or(after.len());
            let raw = &after[..end];
            if kind != KindTag::Map || raw.is_empty() {
                return Err(step_error(raw));
            }
            let key_ok = match descriptor.map_key_kind(&shape) {
                Some(KindTag::Int) => raw.parse::<i64>().is_ok(),
                Some(KindTag::Uint) => raw.parse::<u64>().is_ok(),
                _ => true,
            };
            if !key_ok {
                return Err(step_error(raw));
            }
            path = path.child(PathStep::Key(raw.to_string()));
            rest = &after[end..];
        } else {
            return Err(step_error(rest));
        }
    }

    Ok(path)
}

/// Scalar kind reached by following containers below `path`, and whether
/// `path` already names that level.
fn leaf_kind(path: &FieldPath, descriptor: &SchemaDescriptor) -> (KindTag, bool) {
    let mut shape = path.shape();
    let mut exact = true;

    loop {
        match descriptor.depth_kind(&shape) {
            Some(KindTag::List) => shape.push_str("[]"),
            Some(KindTag::Map) => shape.push_str("{}"),
            Some(kind) => return (kind, exact),
            None => return (KindTag::Unsupported, exact),
        }
        exact = false;
    }
}

fn convert_literal(kind: KindTag, literal: &str) -> Result<String, QueryError> {
    let owned = || literal.to_string();

    match kind {
        KindTag::Bool => literal
            .parse::<bool>()
            .map(|b| b.to_string())
            .map_err(|_| QueryError::ParseBool { literal: owned() }),
        KindTag::Int => literal
            .parse::<i64>()
            .ok()
            .and_then(|i| encode_i64(i).ok())
            .ok_or_else(|| QueryError::ParseInt { literal: owned() }),
        KindTag::Uint => literal
            .parse::<u64>()
            .ok()
            .and_then(|u| encode_u64(u).ok())
            .ok_or_else(|| QueryError::ParseUint { literal: owned() }),
        KindTag::Float => literal
            .parse::<f64>()
            .ok()
            .filter(|f| !f.is_nan())
            .map(encode_f64)
            .ok_or_else(|| QueryError::ParseFloat { literal: owned() }),
        _ => Ok(owned()),
    }
}
