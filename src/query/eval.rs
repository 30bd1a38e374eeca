use bson::{Bson, Document};
use std::cell::Cell;
use std::cmp::Ordering;

use super::path::resolve;
use super::registry::OperatorRegistry;
use super::types::{MAX_QUERY_DEPTH, Operand, Query};
use crate::errors::DbError;

/// Evaluates predicates against records using one registry.
///
/// Operators receive the matcher so they can evaluate sub-predicates
/// (`$or`, `$and`, `$not` and any caller-defined combinators).
pub struct Matcher<'r> {
    registry: &'r OperatorRegistry,
    max_depth: usize,
    depth: Cell<usize>,
}

impl<'r> Matcher<'r> {
    #[must_use]
    pub fn new(registry: &'r OperatorRegistry) -> Self {
        Self::with_max_depth(registry, MAX_QUERY_DEPTH)
    }

    #[must_use]
    pub fn with_max_depth(registry: &'r OperatorRegistry, max_depth: usize) -> Self {
        Self { registry, max_depth, depth: Cell::new(0) }
    }

    #[must_use]
    pub fn registry(&self) -> &'r OperatorRegistry {
        self.registry
    }

    /// Does `record` satisfy `query` when operators are scoped to `key`?
    ///
    /// Entries run in order. A nested predicate under a plain field name ends
    /// the evaluation of its level: its result is returned as is and later
    /// siblings are never looked at.
    ///
    /// # Errors
    /// Propagates operator errors and fails with `DbError::QueryTooDeep` once
    /// nesting exceeds the configured limit.
    pub fn matches(
        &self,
        record: &Document,
        query: &Query,
        key: Option<&str>,
    ) -> Result<bool, DbError> {
        let depth = self.depth.get();
        if depth >= self.max_depth {
            return Err(DbError::QueryTooDeep(self.max_depth));
        }
        self.depth.set(depth + 1);
        let out = self.match_entries(record, query, key);
        self.depth.set(depth);
        out
    }

    fn match_entries(
        &self,
        record: &Document,
        query: &Query,
        key: Option<&str>,
    ) -> Result<bool, DbError> {
        for (k, v) in query.iter() {
            if let Some(op) = self.registry.query_operator(k) {
                if !op.evaluate(self, record, v, key)? {
                    return Ok(false);
                }
            } else if let Operand::Query(nested) = v {
                return self.matches(record, nested, Some(k));
            } else {
                match resolve(record, k)? {
                    Some(found) if operand_equals(found, v) => {}
                    _ => return Ok(false),
                }
            }
        }
        Ok(true)
    }
}

/// Strict equality: no coercion between types, but all numeric variants
/// compare by value.
#[must_use]
pub fn strict_equals(a: &Bson, b: &Bson) -> bool {
    use bson::Bson as T;
    match (a, b) {
        (T::Int32(_) | T::Int64(_), T::Int32(_) | T::Int64(_)) => as_i64(a) == as_i64(b),
        (T::Int32(_) | T::Int64(_) | T::Double(_), T::Int32(_) | T::Int64(_) | T::Double(_)) => {
            as_f64(a) == as_f64(b)
        }
        (T::Array(x), T::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| strict_equals(l, r))
        }
        (T::Document(x), T::Document(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, l)| y.get(k).is_some_and(|r| strict_equals(l, r)))
        }
        _ => a == b,
    }
}

fn operand_equals(value: &Bson, operand: &Operand) -> bool {
    match operand {
        Operand::Value(v) => strict_equals(value, v),
        Operand::Where(_) => false,
        other => other.to_bson().is_some_and(|v| strict_equals(value, &v)),
    }
}

/// Ordering between two values of the same kind; `None` when they are not
/// comparable (different kinds, NaN, documents, arrays...).
#[must_use]
pub fn compare_values(a: &Bson, b: &Bson) -> Option<Ordering> {
    use bson::Bson as T;
    match (a, b) {
        (T::Int32(_) | T::Int64(_), T::Int32(_) | T::Int64(_)) => Some(as_i64(a).cmp(&as_i64(b))),
        (T::Int32(_) | T::Int64(_) | T::Double(_), T::Int32(_) | T::Int64(_) | T::Double(_)) => {
            as_f64(a).partial_cmp(&as_f64(b))
        }
        (T::String(x), T::String(y)) => Some(x.cmp(y)),
        (T::Boolean(x), T::Boolean(y)) => Some(x.cmp(y)),
        (T::DateTime(x), T::DateTime(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

pub(crate) fn as_i64(v: &Bson) -> i64 {
    match v {
        Bson::Int32(i) => i64::from(*i),
        Bson::Int64(i) => *i,
        _ => 0,
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn as_f64(v: &Bson) -> f64 {
    match v {
        Bson::Int32(i) => f64::from(*i),
        Bson::Int64(i) => *i as f64,
        Bson::Double(f) => *f,
        _ => f64::NAN,
    }
}

fn context_path<'k>(key: Option<&'k str>, op: &str) -> Result<&'k str, DbError> {
    key.ok_or_else(|| DbError::InvalidPath(format!("{op} must be scoped to a field")))
}

fn clauses<'q>(operand: &'q Operand, op: &str) -> Result<Vec<&'q Query>, DbError> {
    let items = operand
        .as_list()
        .ok_or_else(|| DbError::TypeMismatch(format!("{op} expects a list of predicates")))?;
    items
        .iter()
        .map(|item| {
            item.as_query()
                .ok_or_else(|| DbError::TypeMismatch(format!("{op} clauses must be predicates")))
        })
        .collect()
}

pub(crate) fn any_clause(
    matcher: &Matcher<'_>,
    record: &Document,
    operand: &Operand,
    key: Option<&str>,
) -> Result<bool, DbError> {
    for clause in clauses(operand, "$or")? {
        if matcher.matches(record, clause, key)? {
            return Ok(true);
        }
    }
    Ok(false)
}

pub(crate) fn all_clauses(
    matcher: &Matcher<'_>,
    record: &Document,
    operand: &Operand,
    key: Option<&str>,
) -> Result<bool, DbError> {
    for clause in clauses(operand, "$and")? {
        if !matcher.matches(record, clause, key)? {
            return Ok(false);
        }
    }
    Ok(true)
}

pub(crate) fn negate(
    matcher: &Matcher<'_>,
    record: &Document,
    operand: &Operand,
    key: Option<&str>,
) -> Result<bool, DbError> {
    let query = operand
        .as_query()
        .ok_or_else(|| DbError::TypeMismatch("$not expects a predicate".into()))?;
    Ok(!matcher.matches(record, query, key)?)
}

pub(crate) fn exists(
    record: &Document,
    operand: &Operand,
    key: Option<&str>,
) -> Result<bool, DbError> {
    let Operand::Value(Bson::Boolean(wanted)) = operand else {
        return Err(DbError::TypeMismatch("$exists expects a boolean".into()));
    };
    let path = context_path(key, "$exists")?;
    Ok(resolve(record, path)?.is_some() == *wanted)
}

pub(crate) fn where_fn(record: &Document, operand: &Operand) -> Result<bool, DbError> {
    match operand {
        Operand::Where(f) => Ok(f.call(record)),
        _ => Err(DbError::TypeMismatch("$where expects a function".into())),
    }
}

pub(crate) fn not_equal(
    record: &Document,
    operand: &Operand,
    key: Option<&str>,
) -> Result<bool, DbError> {
    let path = context_path(key, "$ne")?;
    Ok(!resolve(record, path)?.is_some_and(|v| operand_equals(v, operand)))
}

pub(crate) fn compare(
    record: &Document,
    operand: &Operand,
    key: Option<&str>,
    op: &str,
    accept: impl Fn(Ordering) -> bool,
) -> Result<bool, DbError> {
    let path = context_path(key, op)?;
    let bound = operand
        .to_bson()
        .ok_or_else(|| DbError::TypeMismatch(format!("{op} expects a value")))?;
    Ok(match resolve(record, path)? {
        None | Some(Bson::Null) => false,
        Some(v) => compare_values(v, &bound).is_some_and(accept),
    })
}

/// `$in` / `$nin`: the field must hold an array. Literal operands are looked
/// up by strict equality, regex operands are tried against every string
/// element. `invert` flips only the membership outcome; a non-array field is
/// a non-match either way.
pub(crate) fn membership(
    record: &Document,
    operand: &Operand,
    key: Option<&str>,
    op: &str,
    invert: bool,
) -> Result<bool, DbError> {
    let path = context_path(key, op)?;
    let candidates = operand
        .as_list()
        .ok_or_else(|| DbError::TypeMismatch(format!("{op} expects a list")))?;
    let Some(Bson::Array(items)) = resolve(record, path)? else {
        return Ok(false);
    };
    let mut found = false;
    for candidate in candidates {
        let hit = match candidate {
            Operand::Value(Bson::RegularExpression(re)) => {
                regex_matches_any(re.pattern.as_str(), re.options.as_str(), items)?
            }
            other => items.iter().any(|item| operand_equals(item, other)),
        };
        if hit {
            found = true;
            break;
        }
    }
    Ok(found != invert)
}

#[cfg(feature = "regex")]
fn regex_matches_any(pattern: &str, options: &str, items: &[Bson]) -> Result<bool, DbError> {
    let mut re = regex::RegexBuilder::new(pattern);
    for flag in options.chars() {
        match flag {
            'i' => re.case_insensitive(true),
            'm' => re.multi_line(true),
            's' => re.dot_matches_new_line(true),
            'x' => re.ignore_whitespace(true),
            _ => &mut re,
        };
    }
    let re = re.build().map_err(|e| DbError::QueryError(format!("invalid regex: {e}")))?;
    Ok(items.iter().any(|item| matches!(item, Bson::String(s) if re.is_match(s))))
}

#[cfg(not(feature = "regex"))]
fn regex_matches_any(_pattern: &str, _options: &str, _items: &[Bson]) -> Result<bool, DbError> {
    Err(DbError::QueryError("regular expressions require the `regex` feature".into()))
}
