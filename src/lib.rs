//! In-memory document query and update engine.
//!
//! Records are `bson::Document`s held in a [`QueryEngine`]. Predicates
//! ([`Query`]) and update documents are evaluated with a registry of named
//! operators that callers can extend or shadow.
//!
//! ```
//! use bson::doc;
//! use memquery::{Query, QueryEngine};
//!
//! let mut engine = QueryEngine::new(vec![doc! {"a": 5, "b": 5}, doc! {"a": 3, "b": 2}]);
//! let hits = engine.find(&Query::from(doc! {"$or": [{"a": 3}, {"b": 2}]})).unwrap();
//! assert_eq!(hits.len(), 1);
//!
//! engine.update(&Query::from(doc! {"a": 5}), &doc! {"$inc": {"b": 1}}).unwrap();
//! assert_eq!(engine.records()[0].get_i32("b").unwrap(), 6);
//! ```

pub mod config;
pub mod engine;
pub mod errors;
pub mod logger;
pub mod query;
pub mod utils;

pub use config::EngineConfig;
pub use engine::{QueryEngine, QueryEngineBuilder};
pub use errors::DbError;
pub use query::{
    BuiltinQueryOp, BuiltinUpdateOp, Matcher, Operand, OperatorRegistry, Query, QueryOperator,
    UpdateOperator, WhereFn, apply_update, parse_query, parse_query_json, parse_update_json,
};
