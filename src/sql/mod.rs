//! SQL construction - builder, filter predicates and reference rewriting
//!
//! All generated SQL reads from one logical relation, [`BASE_TABLE`].

pub mod builder;
pub mod filter_clause;
pub mod format;
pub mod rewriter;

pub use builder::QueryBuilder;
pub use filter_clause::build_filter_clause;
pub use rewriter::inject_filter;

/// Name under which every dataset is exposed to SQL
pub const BASE_TABLE: &str = "dataset";
