//! Dotted field paths over nested records.
//!
//! Reads never create anything: a non-document value in the middle of a path
//! makes the whole path absent. Writes replace such values with an empty
//! document before descending.

use bson::{Bson, Document};

use crate::errors::DbError;

fn check_path(path: &str) -> Result<(), DbError> {
    if path.is_empty() {
        return Err(DbError::InvalidPath("path must not be empty".into()));
    }
    Ok(())
}

/// Resolve `path` inside `record`. `Ok(None)` means the field is absent.
///
/// # Errors
/// Returns `DbError::InvalidPath` if `path` is empty.
pub fn resolve<'a>(record: &'a Document, path: &str) -> Result<Option<&'a Bson>, DbError> {
    check_path(path)?;
    let mut cur = record;
    let mut iter = path.split('.').peekable();
    while let Some(seg) = iter.next() {
        if iter.peek().is_none() {
            return Ok(cur.get(seg));
        }
        match cur.get(seg) {
            Some(Bson::Document(d)) => cur = d,
            _ => return Ok(None),
        }
    }
    Ok(None)
}

/// Mutable counterpart of [`resolve`]; never creates intermediate documents.
///
/// # Errors
/// Returns `DbError::InvalidPath` if `path` is empty.
pub fn resolve_mut<'a>(
    record: &'a mut Document,
    path: &str,
) -> Result<Option<&'a mut Bson>, DbError> {
    check_path(path)?;
    Ok(existing_parent(record, path).and_then(|(parent, last)| parent.get_mut(last)))
}

/// Store `value` at `path`, creating (or overwriting non-document) intermediate
/// segments with empty documents. Returns the stored value.
///
/// # Errors
/// Returns `DbError::InvalidPath` if `path` is empty.
pub fn assign<'a>(record: &'a mut Document, path: &str, value: Bson) -> Result<&'a Bson, DbError> {
    check_path(path)?;
    let (parent, last) = traverse_to_parent(record, path);
    let slot = parent.entry(last.to_string()).or_insert(Bson::Null);
    *slot = value;
    Ok(slot)
}

/// Remove the value at `path`, returning it if it was present.
///
/// # Errors
/// Returns `DbError::InvalidPath` if `path` is empty.
pub fn remove(record: &mut Document, path: &str) -> Result<Option<Bson>, DbError> {
    check_path(path)?;
    Ok(existing_parent(record, path).and_then(|(parent, last)| parent.remove(last)))
}

fn existing_parent<'a, 'p>(
    record: &'a mut Document,
    path: &'p str,
) -> Option<(&'a mut Document, &'p str)> {
    let (parents, last) = match path.rsplit_once('.') {
        Some((parents, last)) => (Some(parents), last),
        None => (None, path),
    };
    let mut cur = record;
    for seg in parents.into_iter().flat_map(|p| p.split('.')) {
        match cur.get_mut(seg) {
            Some(Bson::Document(d)) => cur = d,
            _ => return None,
        }
    }
    Some((cur, last))
}

fn ensure_subdoc<'a>(root: &'a mut Document, key: &str) -> &'a mut Document {
    if !matches!(root.get(key), Some(Bson::Document(_))) {
        root.insert(key.to_string(), Bson::Document(Document::new()));
    }
    match root.get_mut(key) {
        Some(Bson::Document(d)) => d,
        _ => unreachable!(),
    }
}

fn traverse_to_parent<'a, 'p>(root: &'a mut Document, path: &'p str) -> (&'a mut Document, &'p str) {
    let mut cur = root;
    let mut iter = path.split('.').peekable();
    while let Some(seg) = iter.next() {
        if iter.peek().is_none() {
            return (cur, seg);
        }
        cur = ensure_subdoc(cur, seg);
    }
    (cur, path)
}
