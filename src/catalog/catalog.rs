use std::sync::Arc;

use crate::{
    analyzer::AnalyzerError,
    cast::{Conversion, FindConversionOptions},
    catalog::{Function, Table, TableValuedFunction},
    types::Type,
};

/// Read-only source of tables, functions and named types. The analyzer
/// never mutates a catalog.
pub trait Catalog {
    fn name(&self) -> &str;

    /// `path` is the possibly multi-part table name as written.
    fn find_table(&self, path: &[String]) -> Option<Arc<Table>>;

    fn find_function(&self, name: &str) -> Option<Arc<Function>>;

    fn find_table_valued_function(&self, name: &str) -> Option<Arc<TableValuedFunction>>;

    /// Named enum, proto or extended types.
    fn find_type(&self, name: &str) -> Option<Type>;

    fn find_conversion(
        &self,
        from: &Type,
        to: &Type,
        _options: &FindConversionOptions,
    ) -> Result<Conversion, AnalyzerError> {
        Err(conversion_not_found(from, to))
    }

    fn suggest_table(&self, _path: &[String]) -> Option<String> {
        None
    }

    fn suggest_function(&self, _name: &str) -> Option<String> {
        None
    }
}

pub fn conversion_not_found(from: &Type, to: &Type) -> AnalyzerError {
    AnalyzerError::sql(format!("Conversion from {} to {} not found", from.debug_string(), to.debug_string()))
}
