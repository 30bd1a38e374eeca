use bson::{Bson, Document};
use std::fmt;
use std::sync::Arc;

/// Default nesting limit for predicate evaluation.
pub(crate) const MAX_QUERY_DEPTH: usize = 64;

/// A first-class predicate used by `$where`.
#[derive(Clone)]
pub struct WhereFn(Arc<dyn Fn(&Document) -> bool + Send + Sync>);

impl WhereFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    #[must_use]
    pub fn call(&self, record: &Document) -> bool {
        (self.0)(record)
    }
}

impl fmt::Debug for WhereFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WhereFn(..)")
    }
}

/// Right-hand side of a query entry.
#[derive(Debug, Clone)]
pub enum Operand {
    Value(Bson),
    Query(Query),
    List(Vec<Operand>),
    Where(WhereFn),
}

impl Operand {
    /// Plain BSON form of this operand; `None` if it holds a function.
    #[must_use]
    pub fn to_bson(&self) -> Option<Bson> {
        match self {
            Self::Value(v) => Some(v.clone()),
            Self::Query(q) => q.to_document().map(Bson::Document),
            Self::List(items) => {
                items.iter().map(Self::to_bson).collect::<Option<Vec<_>>>().map(Bson::Array)
            }
            Self::Where(_) => None,
        }
    }

    #[must_use]
    pub fn as_query(&self) -> Option<&Query> {
        match self {
            Self::Query(q) => Some(q),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Operand]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

impl From<Bson> for Operand {
    fn from(v: Bson) -> Self {
        match v {
            Bson::Document(d) => Self::Query(Query::from(d)),
            Bson::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            other => Self::Value(other),
        }
    }
}

impl From<Query> for Operand {
    fn from(q: Query) -> Self {
        Self::Query(q)
    }
}

impl From<Vec<Query>> for Operand {
    fn from(clauses: Vec<Query>) -> Self {
        Self::List(clauses.into_iter().map(Self::Query).collect())
    }
}

impl From<Vec<Operand>> for Operand {
    fn from(items: Vec<Operand>) -> Self {
        Self::List(items)
    }
}

impl From<WhereFn> for Operand {
    fn from(f: WhereFn) -> Self {
        Self::Where(f)
    }
}

/// An ordered query predicate. Entries are evaluated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Query {
    entries: Vec<(String, Operand)>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.push(key, operand);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, operand: impl Into<Operand>) {
        self.entries.push((key.into(), operand.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Operand)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn to_document(&self) -> Option<Document> {
        let mut out = Document::new();
        for (k, v) in &self.entries {
            out.insert(k.clone(), v.to_bson()?);
        }
        Some(out)
    }
}

impl From<Document> for Query {
    fn from(doc: Document) -> Self {
        Self { entries: doc.into_iter().map(|(k, v)| (k, Operand::from(v))).collect() }
    }
}
