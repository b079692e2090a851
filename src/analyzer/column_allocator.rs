use crate::{
    resolved::{ColumnId, ResolvedColumn},
    types::Type,
};

/// Hands out session-unique column ids. Ids start at 1 and are never
/// reused.
#[derive(Debug, Default)]
pub struct ColumnAllocator {
    last: u32,
}

impl ColumnAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, table_name: &str, name: &str, ty: Type) -> ResolvedColumn {
        self.last += 1;
        ResolvedColumn { id: ColumnId(self.last), table_name: table_name.to_string(), name: name.to_string(), ty }
    }

    /// Highest id handed out so far, 0 when none.
    pub fn max_column_id(&self) -> u32 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_monotonically() {
        let mut alloc = ColumnAllocator::new();
        assert_eq!(alloc.max_column_id(), 0);
        let a = alloc.allocate("t", "a", Type::Int64);
        let b = alloc.allocate("t", "a", Type::Int64);
        assert!(b.id > a.id);
        assert_ne!(a, b);
        assert_eq!(alloc.max_column_id(), 2);
    }
}
