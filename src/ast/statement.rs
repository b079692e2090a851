use crate::ast::{Expr, Query, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<Expr>>),
    Query(Box<Query>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Target column, optionally qualified by the table alias.
    pub target: Vec<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Query(Query),
    Insert {
        table: Vec<String>,
        /// Empty means every writable column in table order.
        columns: Vec<String>,
        source: InsertSource,
        span: Span,
    },
    Update {
        table: Vec<String>,
        alias: Option<String>,
        assignments: Vec<Assignment>,
        where_clause: Option<Expr>,
        span: Span,
    },
    Delete {
        table: Vec<String>,
        alias: Option<String>,
        where_clause: Option<Expr>,
        span: Span,
    },
}

impl Statement {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Query(_) => "QUERY",
            Statement::Insert { .. } => "INSERT",
            Statement::Update { .. } => "UPDATE",
            Statement::Delete { .. } => "DELETE",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Statement::Query(q) => q.span,
            Statement::Insert { span, .. } | Statement::Update { span, .. } | Statement::Delete { span, .. } => *span,
        }
    }

    pub fn insert_values(table: &str, columns: &[&str], rows: Vec<Vec<Expr>>) -> Self {
        Statement::Insert {
            table: split_path(table),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            source: InsertSource::Values(rows),
            span: Span::default(),
        }
    }

    pub fn update(table: &str, assignments: Vec<(&str, Expr)>, where_clause: Expr) -> Self {
        Statement::Update {
            table: split_path(table),
            alias: None,
            assignments: assignments
                .into_iter()
                .map(|(target, value)| Assignment { target: split_path(target), value })
                .collect(),
            where_clause: Some(where_clause),
            span: Span::default(),
        }
    }

    pub fn delete(table: &str, where_clause: Expr) -> Self {
        Statement::Delete { table: split_path(table), alias: None, where_clause: Some(where_clause), span: Span::default() }
    }
}

fn split_path(dotted: &str) -> Vec<String> {
    dotted.split('.').map(str::to_string).collect()
}
