use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
    analyzer::AnalyzerError,
    resolved::{OutputColumn, ResolvedColumn},
};

#[derive(Debug, Clone, PartialEq)]
pub struct NamedColumn {
    pub name: String,
    pub column: ResolvedColumn,
    /// Named by an explicit `AS` alias.
    pub explicit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnMatch<'a> {
    None,
    Found(&'a ResolvedColumn),
    Ambiguous,
}

/// Columns and range variables produced by a FROM item or a query, in
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameList {
    columns: Vec<NamedColumn>,
    range_variables: IndexMap<String, (String, Arc<NameList>)>,
}

/// Internal names such as `$col1` cannot be referenced.
pub fn is_internal_name(name: &str) -> bool {
    name.starts_with('$')
}

impl NameList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output columns of a query, all addressable by name.
    pub fn from_output(columns: &[OutputColumn]) -> Self {
        let mut list = NameList::new();
        for c in columns {
            list.add_column(&c.name, c.column.clone(), false);
        }
        list
    }

    pub fn add_column(&mut self, name: &str, column: ResolvedColumn, explicit: bool) {
        self.columns.push(NamedColumn { name: name.to_string(), column, explicit });
    }

    pub fn add_range_variable(&mut self, alias: &str, list: Arc<NameList>) -> Result<(), AnalyzerError> {
        let key = alias.to_lowercase();
        if self.range_variables.contains_key(&key) {
            return Err(AnalyzerError::sql(format!("Duplicate table alias {alias} in the same FROM clause")));
        }
        self.range_variables.insert(key, (alias.to_string(), list));
        Ok(())
    }

    /// Appends `other`'s columns and range variables (joins, comma lists).
    pub fn merge(&mut self, other: NameList) -> Result<(), AnalyzerError> {
        self.columns.extend(other.columns);
        for (_, (alias, list)) in other.range_variables {
            self.add_range_variable(&alias, list)?;
        }
        Ok(())
    }

    pub fn columns(&self) -> &[NamedColumn] {
        &self.columns
    }

    pub fn resolved_columns(&self) -> Vec<ResolvedColumn> {
        self.columns.iter().map(|c| c.column.clone()).collect()
    }

    pub fn range_variables(&self) -> impl Iterator<Item = (&str, &Arc<NameList>)> {
        self.range_variables.values().map(|(alias, list)| (alias.as_str(), list))
    }

    pub fn range_variable(&self, alias: &str) -> Option<&Arc<NameList>> {
        self.range_variables.get(&alias.to_lowercase()).map(|(_, list)| list)
    }

    pub fn find_column(&self, name: &str) -> ColumnMatch<'_> {
        if is_internal_name(name) {
            return ColumnMatch::None;
        }
        let mut found: Option<&ResolvedColumn> = None;
        for c in self.columns.iter().filter(|c| c.name.eq_ignore_ascii_case(name)) {
            match found {
                None => found = Some(&c.column),
                // the same column exposed twice (e.g. through `*` and by
                // name) is not ambiguous
                Some(prev) if prev.id == c.column.id => {}
                Some(_) => return ColumnMatch::Ambiguous,
            }
        }
        found.map_or(ColumnMatch::None, ColumnMatch::Found)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str()).filter(|n| !is_internal_name(n))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resolved::ColumnId, types::Type};

    fn col(id: u32, name: &str) -> ResolvedColumn {
        ResolvedColumn { id: ColumnId(id), table_name: "t".into(), name: name.into(), ty: Type::Int64 }
    }

    #[test]
    fn duplicate_names_are_ambiguous() {
        let mut list = NameList::new();
        list.add_column("a", col(1, "a"), false);
        list.add_column("A", col(2, "a"), false);
        list.add_column("b", col(3, "b"), false);
        list.add_column("$col4", col(4, "$col4"), false);
        assert_eq!(list.find_column("a"), ColumnMatch::Ambiguous);
        assert_eq!(list.find_column("B"), ColumnMatch::Found(&col(3, "b")));
        assert_eq!(list.find_column("$col4"), ColumnMatch::None);
        assert_eq!(list.column_names().collect::<Vec<_>>(), vec!["a", "A", "b"]);
    }

    #[test]
    fn merging_rejects_duplicate_aliases() {
        let mut left = NameList::new();
        left.add_range_variable("t", Arc::new(NameList::new())).unwrap();
        let mut right = NameList::new();
        right.add_range_variable("T", Arc::new(NameList::new())).unwrap();
        let err = left.merge(right).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate table alias T in the same FROM clause");
    }
}
