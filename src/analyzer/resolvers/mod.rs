pub mod coercion_resolver;
pub use coercion_resolver::*;

pub mod literal_resolver;
pub use literal_resolver::*;

pub mod column_resolver;
pub use column_resolver::*;

pub mod function_resolver;
pub use function_resolver::*;

pub mod aggregate_resolver;
pub use aggregate_resolver::*;

pub mod subquery_resolver;
pub use subquery_resolver::*;

pub mod expr_resolver;
pub use expr_resolver::*;

pub mod wildcard_resolver;
pub use wildcard_resolver::*;

pub mod from_resolver;
pub use from_resolver::*;

pub mod order_by_resolver;
pub use order_by_resolver::*;

pub mod select_resolver;
pub use select_resolver::*;

pub mod set_operation_resolver;
pub use set_operation_resolver::*;

pub mod recursive_term_validator;
pub use recursive_term_validator::*;

pub mod with_resolver;
pub use with_resolver::*;

pub mod query_resolver;
pub use query_resolver::*;

pub mod dml_resolver;
pub use dml_resolver::*;

pub mod statement_resolver;
pub use statement_resolver::*;
