use bson::Document;
use serde_json::Value;

use crate::errors::DbError;

/// Convert a `serde_json::Value` that must be an object into a `bson::Document`.
/// Extended JSON forms such as `{"$regularExpression": {...}}` are decoded.
///
/// # Errors
/// Returns `DbError::QueryError` if the value is not an object and
/// `DbError::Bson` if an extended JSON value is malformed.
pub fn json_value_to_bson_document(val: Value) -> Result<Document, DbError> {
    let Value::Object(obj) = val else {
        return Err(DbError::QueryError("expected JSON object".into()));
    };
    Ok(Document::try_from(obj)?)
}

/// Parse a JSON string into a `bson::Document`. The JSON must be a top-level object.
///
/// # Errors
/// Returns `DbError::Json` for malformed text and `DbError::QueryError` for non-objects.
pub fn parse_json_to_bson_document(json: &str) -> Result<Document, DbError> {
    let val: Value = serde_json::from_str(json)?;
    json_value_to_bson_document(val)
}

/// Parse a JSON array of objects into records, keeping their order.
///
/// # Errors
/// Returns an error if the text is not an array of objects.
pub fn parse_json_records(json: &str) -> Result<Vec<Document>, DbError> {
    let val: Value = serde_json::from_str(json)?;
    let Value::Array(items) = val else {
        return Err(DbError::QueryError("expected JSON array of objects".into()));
    };
    items.into_iter().map(json_value_to_bson_document).collect()
}
