//! Named query and update operators.
//!
//! Built-ins are the closed [`BuiltinQueryOp`] / [`BuiltinUpdateOp`] enums.
//! Callers extend or shadow them by name; nothing can be unregistered.

use bson::Document;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::eval::{self, Matcher};
use super::types::Operand;
use super::update;
use crate::errors::DbError;

/// A query operator receives the whole record, its operand and the field path
/// it is scoped to (`None` at the top level of a predicate).
pub trait QueryOperator: Send + Sync {
    /// # Errors
    /// Implementations return an error for malformed operands or paths.
    fn evaluate(
        &self,
        matcher: &Matcher<'_>,
        record: &Document,
        operand: &Operand,
        key: Option<&str>,
    ) -> Result<bool, DbError>;
}

impl<F> QueryOperator for F
where
    F: Fn(&Matcher<'_>, &Document, &Operand, Option<&str>) -> Result<bool, DbError> + Send + Sync,
{
    fn evaluate(
        &self,
        matcher: &Matcher<'_>,
        record: &Document,
        operand: &Operand,
        key: Option<&str>,
    ) -> Result<bool, DbError> {
        self(matcher, record, operand, key)
    }
}

/// An update operator mutates a record given its `path -> argument` mapping.
pub trait UpdateOperator: Send + Sync {
    /// # Errors
    /// Implementations return an error when the record or arguments have the wrong shape.
    fn apply(&self, record: &mut Document, operand: &Document) -> Result<(), DbError>;
}

impl<F> UpdateOperator for F
where
    F: Fn(&mut Document, &Document) -> Result<(), DbError> + Send + Sync,
{
    fn apply(&self, record: &mut Document, operand: &Document) -> Result<(), DbError> {
        self(record, operand)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinQueryOp {
    Or,
    And,
    Not,
    Exists,
    Where,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
}

impl BuiltinQueryOp {
    pub const ALL: [Self; 12] = [
        Self::Or,
        Self::And,
        Self::Not,
        Self::Exists,
        Self::Where,
        Self::Ne,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::In,
        Self::Nin,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Or => "$or",
            Self::And => "$and",
            Self::Not => "$not",
            Self::Exists => "$exists",
            Self::Where => "$where",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::In => "$in",
            Self::Nin => "$nin",
        }
    }
}

impl QueryOperator for BuiltinQueryOp {
    fn evaluate(
        &self,
        matcher: &Matcher<'_>,
        record: &Document,
        operand: &Operand,
        key: Option<&str>,
    ) -> Result<bool, DbError> {
        use std::cmp::Ordering::{Greater, Less};
        match self {
            Self::Or => eval::any_clause(matcher, record, operand, key),
            Self::And => eval::all_clauses(matcher, record, operand, key),
            Self::Not => eval::negate(matcher, record, operand, key),
            Self::Exists => eval::exists(record, operand, key),
            Self::Where => eval::where_fn(record, operand),
            Self::Ne => eval::not_equal(record, operand, key),
            Self::Gt => eval::compare(record, operand, key, self.name(), |o| o == Greater),
            Self::Gte => eval::compare(record, operand, key, self.name(), |o| o != Less),
            Self::Lt => eval::compare(record, operand, key, self.name(), |o| o == Less),
            Self::Lte => eval::compare(record, operand, key, self.name(), |o| o != Greater),
            Self::In => eval::membership(record, operand, key, self.name(), false),
            Self::Nin => eval::membership(record, operand, key, self.name(), true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinUpdateOp {
    Set,
    Inc,
    Push,
    Unset,
    Rename,
}

impl BuiltinUpdateOp {
    pub const ALL: [Self; 5] = [Self::Set, Self::Inc, Self::Push, Self::Unset, Self::Rename];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Set => "$set",
            Self::Inc => "$inc",
            Self::Push => "$push",
            Self::Unset => "$unset",
            Self::Rename => "$rename",
        }
    }
}

impl UpdateOperator for BuiltinUpdateOp {
    fn apply(&self, record: &mut Document, operand: &Document) -> Result<(), DbError> {
        match self {
            Self::Set => update::set_fields(record, operand),
            Self::Inc => update::inc_fields(record, operand),
            Self::Push => update::push_values(record, operand),
            Self::Unset => update::unset_fields(record, operand),
            Self::Rename => update::rename_fields(record, operand),
        }
    }
}

/// Query and update operators by name.
#[derive(Clone)]
pub struct OperatorRegistry {
    query: HashMap<String, Arc<dyn QueryOperator>>,
    update: HashMap<String, Arc<dyn UpdateOperator>>,
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        let mut query: HashMap<String, Arc<dyn QueryOperator>> = HashMap::new();
        for op in BuiltinQueryOp::ALL {
            query.insert(op.name().to_string(), Arc::new(op));
        }
        let mut update: HashMap<String, Arc<dyn UpdateOperator>> = HashMap::new();
        for op in BuiltinUpdateOp::ALL {
            update.insert(op.name().to_string(), Arc::new(op));
        }
        Self { query, update }
    }
}

impl OperatorRegistry {
    /// Registry holding only the built-in operators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-ins merged with caller operators; a caller entry replaces the
    /// built-in of the same name.
    pub fn with_overrides<Q, U>(query: Q, update: U) -> Self
    where
        Q: IntoIterator<Item = (String, Arc<dyn QueryOperator>)>,
        U: IntoIterator<Item = (String, Arc<dyn UpdateOperator>)>,
    {
        let mut reg = Self::default();
        reg.query.extend(query);
        reg.update.extend(update);
        reg
    }

    /// Returns the operator previously registered under `name`, if any.
    pub fn register_query_operator(
        &mut self,
        name: impl Into<String>,
        op: Arc<dyn QueryOperator>,
    ) -> Option<Arc<dyn QueryOperator>> {
        self.query.insert(name.into(), op)
    }

    pub fn register_update_operator(
        &mut self,
        name: impl Into<String>,
        op: Arc<dyn UpdateOperator>,
    ) -> Option<Arc<dyn UpdateOperator>> {
        self.update.insert(name.into(), op)
    }

    /// Register a closure as a query operator.
    pub fn register_query_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Matcher<'_>, &Document, &Operand, Option<&str>) -> Result<bool, DbError>
            + Send
            + Sync
            + 'static,
    {
        self.query.insert(name.into(), Arc::new(f));
    }

    /// Register a closure as an update operator.
    pub fn register_update_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut Document, &Document) -> Result<(), DbError> + Send + Sync + 'static,
    {
        self.update.insert(name.into(), Arc::new(f));
    }

    #[must_use]
    pub fn query_operator(&self, name: &str) -> Option<&dyn QueryOperator> {
        self.query.get(name).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn update_operator(&self, name: &str) -> Option<&dyn UpdateOperator> {
        self.update.get(name).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn is_query_operator(&self, name: &str) -> bool {
        self.query.contains_key(name)
    }

    #[must_use]
    pub fn is_update_operator(&self, name: &str) -> bool {
        self.update.contains_key(name)
    }

    #[must_use]
    pub fn query_operator_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.query.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn update_operator_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.update.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("query", &self.query_operator_names())
            .field("update", &self.update_operator_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let reg = OperatorRegistry::new();
        for op in BuiltinQueryOp::ALL {
            assert!(reg.is_query_operator(op.name()));
        }
        for op in BuiltinUpdateOp::ALL {
            assert!(reg.is_update_operator(op.name()));
        }
        assert!(!reg.is_query_operator("$set"));
        assert!(!reg.is_update_operator("$or"));
    }

    #[test]
    fn override_replaces_builtin() {
        let reg = OperatorRegistry::with_overrides(
            vec![
                ("$exists".to_string(), Arc::new(BuiltinQueryOp::Ne) as Arc<dyn QueryOperator>),
                ("$either".to_string(), Arc::new(BuiltinQueryOp::Or) as Arc<dyn QueryOperator>),
            ],
            Vec::new(),
        );
        assert_eq!(reg.query_operator_names().len(), BuiltinQueryOp::ALL.len() + 1);
        assert!(reg.is_query_operator("$either"));
    }

    #[test]
    fn closures_register_as_operators() {
        let mut reg = OperatorRegistry::new();
        reg.register_query_fn("$never", |_, _, _, _| Ok(false));
        reg.register_update_fn("$noop", |_, _| Ok(()));
        assert!(reg.is_query_operator("$never"));
        assert!(reg.is_update_operator("$noop"));
    }

    #[test]
    fn register_returns_shadowed_operator() {
        let mut reg = OperatorRegistry::new();
        let prev = reg.register_update_operator("$set", Arc::new(BuiltinUpdateOp::Unset));
        assert!(prev.is_some());
        let prev = reg.register_update_operator("$mul", Arc::new(BuiltinUpdateOp::Set));
        assert!(prev.is_none());
    }
}
