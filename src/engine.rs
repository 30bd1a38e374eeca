use bson::Document;
use std::sync::Arc;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::errors::DbError;
use crate::query::{
    Matcher, Operand, OperatorRegistry, Query, QueryOperator, UpdateOperator, apply_update,
    parse_query_json, parse_update_json,
};
use crate::utils::devlog;

/// An in-memory collection of records plus the operators used to query and
/// update it.
///
/// `find` hands out borrows into the collection, so a result always reflects
/// the live record; use [`QueryEngine::snapshot`] for detached copies.
#[derive(Debug, Clone, Default)]
pub struct QueryEngine {
    records: Vec<Document>,
    registry: OperatorRegistry,
    config: EngineConfig,
}

impl QueryEngine {
    #[must_use]
    pub fn new(records: Vec<Document>) -> Self {
        Self { records, ..Self::default() }
    }

    /// Built-in operators merged with the given overrides (same name wins).
    pub fn with_operators<Q, U>(records: Vec<Document>, query_ops: Q, update_ops: U) -> Self
    where
        Q: IntoIterator<Item = (String, Arc<dyn QueryOperator>)>,
        U: IntoIterator<Item = (String, Arc<dyn UpdateOperator>)>,
    {
        Self {
            records,
            registry: OperatorRegistry::with_overrides(query_ops, update_ops),
            config: EngineConfig::default(),
        }
    }

    #[must_use]
    pub fn builder() -> QueryEngineBuilder {
        QueryEngineBuilder::default()
    }

    fn matcher(&self) -> Matcher<'_> {
        Matcher::with_max_depth(&self.registry, self.config.max_query_depth)
    }

    fn matching_indices(&self, query: &Query) -> Result<Vec<usize>, DbError> {
        let matcher = self.matcher();
        let mut out = Vec::new();
        for (i, record) in self.records.iter().enumerate() {
            if matcher.matches(record, query, None)? {
                out.push(i);
            }
        }
        Ok(out)
    }

    fn bench(&self, op: &str, started: Instant, scanned: usize, matched: usize) {
        log::trace!("{op}: scanned {scanned} of {} records, {matched} matched", self.records.len());
        if self.config.bench_logs {
            devlog::bench(op, started, scanned, matched);
        }
    }

    /// All matching records, in collection order.
    ///
    /// # Errors
    /// Propagates the first evaluation error; no partial result is returned.
    pub fn find(&self, query: &Query) -> Result<Vec<&Document>, DbError> {
        let started = Instant::now();
        let matcher = self.matcher();
        let mut out = Vec::new();
        for record in &self.records {
            if matcher.matches(record, query, None)? {
                out.push(record);
            }
        }
        self.bench("find", started, self.records.len(), out.len());
        Ok(out)
    }

    /// Like [`Self::find`], handing out mutable borrows into the collection.
    ///
    /// # Errors
    /// Propagates the first evaluation error.
    pub fn find_mut(&mut self, query: &Query) -> Result<Vec<&mut Document>, DbError> {
        let started = Instant::now();
        let hits = self.matching_indices(query)?;
        self.bench("find_mut", started, self.records.len(), hits.len());
        let mut wanted = hits.into_iter().peekable();
        let mut out = Vec::new();
        for (i, record) in self.records.iter_mut().enumerate() {
            if wanted.peek() == Some(&i) {
                wanted.next();
                out.push(record);
            }
        }
        Ok(out)
    }

    /// First matching record in collection order.
    ///
    /// # Errors
    /// Propagates evaluation errors raised before the first match.
    pub fn find_one(&self, query: &Query) -> Result<Option<&Document>, DbError> {
        let started = Instant::now();
        let matcher = self.matcher();
        for (i, record) in self.records.iter().enumerate() {
            if matcher.matches(record, query, None)? {
                self.bench("find_one", started, i + 1, 1);
                return Ok(Some(record));
            }
        }
        self.bench("find_one", started, self.records.len(), 0);
        Ok(None)
    }

    /// Number of matching records.
    ///
    /// # Errors
    /// Propagates the first evaluation error.
    pub fn count(&self, query: &Query) -> Result<usize, DbError> {
        let started = Instant::now();
        let n = self.matching_indices(query)?.len();
        self.bench("count", started, self.records.len(), n);
        Ok(n)
    }

    /// Owned copies of the matching records.
    ///
    /// # Errors
    /// Propagates the first evaluation error.
    pub fn snapshot(&self, query: &Query) -> Result<Vec<Document>, DbError> {
        Ok(self.find(query)?.into_iter().cloned().collect())
    }

    /// Apply `update` to every match in place and return the updated records.
    ///
    /// # Errors
    /// Stops at the first failing operator; records updated before it keep
    /// their changes.
    pub fn update(&mut self, query: &Query, update: &Document) -> Result<Vec<&Document>, DbError> {
        let started = Instant::now();
        let hits = self.matching_indices(query)?;
        for &i in &hits {
            apply_update(&self.registry, &mut self.records[i], update)?;
        }
        self.bench("update", started, self.records.len(), hits.len());
        Ok(hits.iter().map(|&i| &self.records[i]).collect())
    }

    /// [`Self::find`] with a JSON predicate.
    ///
    /// # Errors
    /// Returns parse errors from the JSON text as well as evaluation errors.
    pub fn find_json(&self, query: &str) -> Result<Vec<&Document>, DbError> {
        let query = parse_query_json(query)?;
        self.find(&query)
    }

    /// [`Self::update`] with JSON predicate and update document.
    ///
    /// # Errors
    /// Returns parse errors from either JSON text as well as update errors.
    pub fn update_json(&mut self, query: &str, update: &str) -> Result<Vec<&Document>, DbError> {
        let query = parse_query_json(query)?;
        let update = parse_update_json(update)?;
        self.update(&query, &update)
    }

    #[must_use]
    pub fn records(&self) -> &[Document] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Document] {
        &mut self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<Document> {
        self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[derive(Debug, Default)]
pub struct QueryEngineBuilder {
    records: Vec<Document>,
    registry: OperatorRegistry,
    config: EngineConfig,
}

impl QueryEngineBuilder {
    #[must_use]
    pub fn records(mut self, records: Vec<Document>) -> Self {
        self.records = records;
        self
    }

    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn query_operator(mut self, name: impl Into<String>, op: Arc<dyn QueryOperator>) -> Self {
        self.registry.register_query_operator(name, op);
        self
    }

    #[must_use]
    pub fn update_operator(mut self, name: impl Into<String>, op: Arc<dyn UpdateOperator>) -> Self {
        self.registry.register_update_operator(name, op);
        self
    }

    #[must_use]
    pub fn query_fn<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Matcher<'_>, &Document, &Operand, Option<&str>) -> Result<bool, DbError>
            + Send
            + Sync
            + 'static,
    {
        self.registry.register_query_fn(name, f);
        self
    }

    #[must_use]
    pub fn update_fn<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut Document, &Document) -> Result<(), DbError> + Send + Sync + 'static,
    {
        self.registry.register_update_fn(name, f);
        self
    }

    #[must_use]
    pub fn build(self) -> QueryEngine {
        QueryEngine { records: self.records, registry: self.registry, config: self.config }
    }
}
