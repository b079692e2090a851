use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: Type,
    /// Read-only columns cannot be targets of INSERT or UPDATE.
    pub writable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self { name: name.into(), ty, writable: true }
    }

    pub fn read_only(name: impl Into<String>, ty: Type) -> Self {
        Self { name: name.into(), ty, writable: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self { name: name.into(), columns }
    }

    /// Case-insensitive column lookup returning the column's ordinal.
    pub fn find_column(&self, name: &str) -> Option<(usize, &Column)> {
        self.columns.iter().enumerate().find(|(_, c)| c.name.eq_ignore_ascii_case(name))
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_lookup_ignores_case() {
        let t = Table::new("People", vec![Column::new("id", Type::Int64), Column::new("Name", Type::String)]);
        assert_eq!(t.find_column("NAME").map(|(i, _)| i), Some(1));
        assert!(t.find_column("age").is_none());
    }
}
