//! Semantic analysis core for SQL.
//!
//! Takes an untyped [`ast::Statement`] and a [`catalog::Catalog`] and
//! produces a typed, name-bound [`resolved::ResolvedStatement`]. Around the
//! resolver sit the type lattice ([`types`]), the cast dispatcher and
//! coercion rules ([`cast`]).

pub mod types;

pub mod cast;

pub mod catalog;

pub mod ast;

pub mod resolved;

pub mod analyzer;
pub use analyzer::{AnalysisContext, AnalyzerError, AnalyzerOptions, AnalyzerOutput};

/// Resolves one statement against `catalog`.
pub fn analyze_statement(
    statement: &ast::Statement,
    options: &AnalyzerOptions,
    catalog: &dyn catalog::Catalog,
) -> Result<AnalyzerOutput, AnalyzerError> {
    AnalysisContext::analyze_statement(statement, options, catalog)
}

/// Resolves a standalone expression with no names in scope.
pub fn analyze_expression(
    expr: &ast::Expr,
    options: &AnalyzerOptions,
    catalog: &dyn catalog::Catalog,
) -> Result<AnalyzerOutput, AnalyzerError> {
    AnalysisContext::analyze_expression(expr, options, catalog)
}
