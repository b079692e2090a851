use indexmap::IndexMap;

use crate::{
    resolved::{ColumnAccess, ColumnId, ResolvedExpr, ResolvedStatement},
    types::Type,
};

/// Result of one analysis session.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerOutput {
    pub statement: Option<ResolvedStatement>,
    /// Set by the standalone expression entry points.
    pub expression: Option<ResolvedExpr>,
    pub deprecation_warnings: Vec<String>,
    /// Undeclared named parameters with their inferred types.
    pub undeclared_parameters: IndexMap<String, Type>,
    /// Inferred types of undeclared positional parameters, by position.
    pub undeclared_positional_parameters: Vec<Type>,
    pub max_column_id: u32,
    pub column_access: IndexMap<ColumnId, ColumnAccess>,
}

impl AnalyzerOutput {
    pub fn statement(&self) -> Option<&ResolvedStatement> {
        self.statement.as_ref()
    }

    pub fn expression(&self) -> Option<&ResolvedExpr> {
        self.expression.as_ref()
    }
}
