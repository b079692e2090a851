use indexmap::IndexSet;

use crate::resolved::ResolvedColumn;

/// Outer columns referenced from inside one subquery, in first-use order.
#[derive(Debug, Default, Clone)]
pub struct CorrelatedColumns {
    columns: IndexSet<ResolvedColumn>,
}

impl CorrelatedColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adding a column twice is a no-op.
    pub fn capture(&mut self, column: &ResolvedColumn) {
        if !self.columns.contains(column) {
            self.columns.insert(column.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn into_vec(self) -> Vec<ResolvedColumn> {
        self.columns.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resolved::ColumnId, types::Type};

    #[test]
    fn capture_is_idempotent() {
        let a = ResolvedColumn { id: ColumnId(1), table_name: "t".into(), name: "a".into(), ty: Type::Int64 };
        let b = ResolvedColumn { id: ColumnId(2), table_name: "t".into(), name: "b".into(), ty: Type::Int64 };
        let mut set = CorrelatedColumns::new();
        set.capture(&b);
        set.capture(&a);
        set.capture(&b);
        assert_eq!(set.into_vec(), vec![b, a]);
    }
}
