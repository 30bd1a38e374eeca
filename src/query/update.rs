use bson::{Bson, Document};

use super::eval::{as_f64, as_i64};
use super::path::{assign, remove, resolve, resolve_mut};
use super::registry::OperatorRegistry;
use crate::errors::DbError;

/// Apply every registered operator of `update` to `record`, in document order.
/// Unknown operator names are skipped.
///
/// # Errors
/// Fails on the first operator error; operators that already ran keep their effect.
pub fn apply_update(
    registry: &OperatorRegistry,
    record: &mut Document,
    update: &Document,
) -> Result<(), DbError> {
    for (name, operand) in update {
        let Some(op) = registry.update_operator(name) else {
            log::debug!("ignoring unregistered update operator {name}");
            continue;
        };
        let Bson::Document(args) = operand else {
            return Err(DbError::TypeMismatch(format!("{name} expects a document of fields")));
        };
        op.apply(record, args)?;
    }
    Ok(())
}

pub(crate) fn set_fields(record: &mut Document, args: &Document) -> Result<(), DbError> {
    for (path, value) in args {
        assign(record, path, value.clone())?;
    }
    Ok(())
}

/// A missing field counts as 0, so `$inc` creates it with the delta instead
/// of yielding NaN. A non-numeric field or delta is a `TypeMismatch`.
pub(crate) fn inc_fields(record: &mut Document, args: &Document) -> Result<(), DbError> {
    for (path, delta) in args {
        let next = match resolve(record, path)? {
            Some(cur) => add_numbers(cur, delta, path)?,
            None => add_numbers(&Bson::Int32(0), delta, path)?,
        };
        assign(record, path, next)?;
    }
    Ok(())
}

fn is_number(v: &Bson) -> bool {
    matches!(v, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

/// Integer widths are kept when possible; `Int32` overflow widens to `Int64`
/// and `Int64` overflow falls back to `Double`.
fn add_numbers(cur: &Bson, delta: &Bson, path: &str) -> Result<Bson, DbError> {
    if !is_number(cur) {
        return Err(DbError::TypeMismatch(format!("$inc target `{path}` is not numeric")));
    }
    if !is_number(delta) {
        return Err(DbError::TypeMismatch(format!("$inc amount for `{path}` is not numeric")));
    }
    Ok(match (cur, delta) {
        (Bson::Int32(a), Bson::Int32(b)) => {
            a.checked_add(*b).map_or_else(|| Bson::Int64(i64::from(*a) + i64::from(*b)), Bson::Int32)
        }
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => as_i64(cur)
            .checked_add(as_i64(delta))
            .map_or_else(|| Bson::Double(as_f64(cur) + as_f64(delta)), Bson::Int64),
        _ => Bson::Double(as_f64(cur) + as_f64(delta)),
    })
}

pub(crate) fn push_values(record: &mut Document, args: &Document) -> Result<(), DbError> {
    for (path, value) in args {
        match resolve_mut(record, path)? {
            Some(Bson::Array(items)) => items.push(value.clone()),
            Some(other) => {
                return Err(DbError::TypeMismatch(format!(
                    "$push target `{path}` is {:?}, not an array",
                    other.element_type()
                )));
            }
            None => {
                return Err(DbError::TypeMismatch(format!("$push target `{path}` is absent")));
            }
        }
    }
    Ok(())
}

pub(crate) fn unset_fields(record: &mut Document, args: &Document) -> Result<(), DbError> {
    for path in args.keys() {
        remove(record, path)?;
    }
    Ok(())
}

pub(crate) fn rename_fields(record: &mut Document, args: &Document) -> Result<(), DbError> {
    for (from, to) in args {
        let Bson::String(to) = to else {
            return Err(DbError::TypeMismatch(format!("$rename target for `{from}` must be a string")));
        };
        if let Some(value) = remove(record, from)? {
            assign(record, to, value)?;
        }
    }
    Ok(())
}
