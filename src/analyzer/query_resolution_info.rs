use crate::resolved::ComputedColumn;

/// Aggregate and analytic calls collected while one SELECT block's
/// expressions are resolved.
#[derive(Debug, Default)]
pub struct QueryResolutionInfo {
    pub aggregate_columns: Vec<ComputedColumn>,
    pub analytic_columns: Vec<ComputedColumn>,
}

impl QueryResolutionInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_aggregates(&self) -> bool {
        !self.aggregate_columns.is_empty()
    }

    pub fn has_analytic(&self) -> bool {
        !self.analytic_columns.is_empty()
    }
}
