//! # cookbook_filter
//!
//! Selection filters for products, dishes and menus: a predicate tree, its
//! normalization to disjunctive normal form, an ownership-scoping check and
//! per-aggregate translation into sea-query conditions.
//!
//! ```text
//! let filter = wire::from_json(body)?;
//! let result = FilterCompiler::new().compile(&filter, Aggregate::Product)?;
//! executor.run(result.condition.to_select().order_by(..).limit(..));
//! ```

pub mod algebra;
pub mod compiler;
pub mod condition;
pub mod config;
pub mod filter;
pub mod normalizer;
pub mod tag;
pub mod validator;
pub mod wire;

pub use algebra::IterableNode;
pub use compiler::{CompileError, CompileResult, CompilerConfig, FilterCompiler};
pub use condition::{Aggregate, ConditionExpression, ConditionTranslator, SqlDialect, TranslateError};
pub use filter::{CompOp, ConstructionError, Field, Filter, FilterKind, OwnerId, Relation};
pub use normalizer::{to_dnf, NormalizationInvariantError, NormalizedFilter};
pub use tag::Tag;
pub use validator::{validate, StructureError, StructureViolation, ValidatedFilter};
pub use wire::ParseError;
