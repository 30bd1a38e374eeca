use bson::{Bson, Document};

use super::types::{Operand, Query};
use crate::errors::DbError;
use crate::utils::json::parse_json_to_bson_document;

/// Build a predicate from a BSON document, rejecting `$where` given as
/// source text: only functions attached with [`Query::with`] are accepted.
///
/// # Errors
/// Returns `DbError::QueryError` if any `$where` entry holds a non-function value.
pub fn parse_query(doc: Document) -> Result<Query, DbError> {
    let query = Query::from(doc);
    reject_where_source(&query)?;
    Ok(query)
}

fn reject_where_source(query: &Query) -> Result<(), DbError> {
    for (key, operand) in query.iter() {
        if key == "$where" && !matches!(operand, Operand::Where(_)) {
            return Err(DbError::QueryError(
                "$where accepts only predicate functions, not source text".into(),
            ));
        }
        check_operand(operand)?;
    }
    Ok(())
}

fn check_operand(operand: &Operand) -> Result<(), DbError> {
    match operand {
        Operand::Query(q) => reject_where_source(q),
        Operand::List(items) => items.iter().try_for_each(check_operand),
        Operand::Value(_) | Operand::Where(_) => Ok(()),
    }
}

/// # Errors
/// Returns an error if the JSON string is not an object or holds a `$where` source string.
pub fn parse_query_json(json: &str) -> Result<Query, DbError> {
    parse_query(parse_json_to_bson_document(json)?)
}

/// Parse an update document. Each operator must map to a document of fields;
/// unknown operator names are kept and skipped at apply time.
///
/// # Errors
/// Returns an error if the JSON string is not an object or an operator's
/// argument is not an object.
pub fn parse_update_json(json: &str) -> Result<Document, DbError> {
    let doc = parse_json_to_bson_document(json)?;
    for (name, args) in &doc {
        if !matches!(args, Bson::Document(_)) {
            return Err(DbError::QueryError(format!("{name} expects an object of fields")));
        }
    }
    Ok(doc)
}
