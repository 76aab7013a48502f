//! Filter-key compilation
//!
//! Turns identifier-style filter keys (`nameLikeOrAgeGreaterThan`) into
//! predicate trees over schema-resolved field paths, and resolver
//! arguments into a [`QuerySpec`].

mod ast;
mod compiler;
mod errors;
mod resolver;
mod tokenizer;

pub use ast::{
    Arity, Condition, Filter, FilterValue, Operator, QuerySpec, SortDirection, SortRule,
};
pub use compiler::{
    FilterCompiler, DEFAULT_MAX_LIMIT, ID_ARGUMENT, LIMIT_ARGUMENT, ORDER_BY_ARGUMENT,
    SINCE_ARGUMENT,
};
pub use errors::{FilterError, FilterResult};
pub use resolver::resolve_path;
