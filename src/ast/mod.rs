//! Untyped syntax tree handed over by the parser. The analyzer reads it and
//! never mutates it.

pub mod span;
pub use span::*;

pub mod expr;
pub use expr::*;

pub mod query;
pub use query::*;

pub mod statement;
pub use statement::*;
