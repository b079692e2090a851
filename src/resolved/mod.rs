//! Typed, name-bound output tree. Nodes own their children; columns are
//! referenced by [`ColumnId`].

pub mod resolved_column;
pub use resolved_column::*;

pub mod resolved_expr;
pub use resolved_expr::*;

pub mod resolved_scan;
pub use resolved_scan::*;

pub mod resolved_statement;
pub use resolved_statement::*;
