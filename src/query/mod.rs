// Submodules for separation of concerns
mod eval;
mod parse;
pub mod path;
mod registry;
mod types;
mod update;

// Public API re-exports
pub use eval::{Matcher, compare_values, strict_equals};
pub use parse::{parse_query, parse_query_json, parse_update_json};
pub use registry::{
    BuiltinQueryOp, BuiltinUpdateOp, OperatorRegistry, QueryOperator, UpdateOperator,
};
pub use types::{Operand, Query, WhereFn};
pub(crate) use types::MAX_QUERY_DEPTH;
pub use update::apply_update;
